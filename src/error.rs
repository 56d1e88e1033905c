//! Error types for canadianccv
//!
//! This module defines all error types used throughout the library.
//! Schema problems are fatal at load time; section, field and value misses
//! are fatal for explicit lookups but are downgraded to warnings by ingestion.

use std::fmt;
use thiserror::Error;

/// Result type alias using the canadianccv Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for canadianccv operations
#[derive(Error, Debug)]
pub enum Error {
    /// The schema definition itself is inconsistent
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// A referenced section is not defined
    #[error("section error: {0}")]
    Section(String),

    /// A referenced field, type or value is not defined
    #[error("field error: {0}")]
    Field(String),

    /// A lookup matched more than one schema node
    #[error("ambiguous {key}: candidates are {}", .candidates.join(", "))]
    Ambiguous {
        /// The key that could not be resolved to a single node
        key: String,
        /// Human readable descriptions of the competing nodes
        candidates: Vec<String>,
    },

    /// A field uses a data type the exchange format cannot carry
    #[error("\"{data_type}\" data type is not currently supported (field \"{field_label}\", id {field_id})")]
    Unsupported {
        /// Label of the data type
        data_type: String,
        /// Id of the offending field
        field_id: String,
        /// Label of the offending field
        field_label: String,
    },

    /// A field value failed its rules
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The content model cannot accept a record
    #[error("content error: {0}")]
    Content(String),

    /// Encoding error (content to exchange document)
    #[error("encoding error: {0}")]
    Encode(String),

    /// Decoding error (exchange document to content)
    #[error("decoding error: {0}")]
    Decode(String),

    /// Resource loading error
    #[error("resource error: {0}")]
    Resource(String),

    /// Limit exceeded error
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// XML parsing error
    #[error("XML error: {0}")]
    Xml(String),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for a schema error without location
    pub fn schema(message: impl Into<String>) -> Self {
        Error::Schema(SchemaError::new(message))
    }
}

/// Inconsistency found while loading the schema definition
#[derive(Debug, Clone)]
pub struct SchemaError {
    /// Error message
    pub message: String,
    /// Schema node (id or label) the error refers to
    pub location: Option<String>,
    /// Which schema document the node came from
    pub source: Option<String>,
}

impl SchemaError {
    /// Create a new schema error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: None,
            source: None,
        }
    }

    /// Set the location
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Set the source document
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(ref loc) = self.location {
            write!(f, " (at {})", loc)?;
        }

        if let Some(ref src) = self.source {
            write!(f, " [{}]", src)?;
        }

        Ok(())
    }
}

impl std::error::Error for SchemaError {}

/// Field value rejected by its rules
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Semicolon-joined rule diagnostics
    pub message: String,
    /// Label of the field that failed
    pub field: Option<String>,
    /// Label of the section holding the field
    pub section: Option<String>,
}

impl ValidationError {
    /// Create a new validation error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            field: None,
            section: None,
        }
    }

    /// Set the field label
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Set the section label
    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.field, &self.section) {
            (Some(field), Some(section)) => {
                write!(f, "errors validating \"{}\" in \"{}\": ", field, section)?
            }
            (Some(field), None) => write!(f, "errors validating \"{}\": ", field)?,
            _ => {}
        }

        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ValidationError {}
