//! Engine configuration
//!
//! Settings shared by ingestion and the translators. A `Config` is built
//! with `with_*` setters or read from a TOML file.

use crate::error::{Error, Result};
use crate::schema::Language;
use serde::Deserialize;
use std::path::Path;

/// Default text wrap width
pub const DEFAULT_WIDTH: usize = 80;

/// Default indentation step of the text format
pub const DEFAULT_INDENT: usize = 4;

/// Configuration for ingestion and translation
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Label language used for schema lookups
    language: Language,
    /// Maximum line width before the text format wraps a value
    width: usize,
    /// Indentation step of the text format
    indent: usize,
    /// Fail on partial section inference instead of warning
    strict_inference: bool,
    /// Run field rules during ingestion
    validate: bool,
    /// chrono format string of the `dateTimeGenerated` attribute
    timestamp_format: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            language: Language::English,
            width: DEFAULT_WIDTH,
            indent: DEFAULT_INDENT,
            strict_inference: false,
            validate: true,
            timestamp_format: "%Y-%m-%d %H:%M:%S".to_string(),
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text)?;
        config.check()?;
        Ok(config)
    }

    /// Read a configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Resource(format!(
                "Failed to read config '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_toml_str(&text)
    }

    fn check(&self) -> Result<()> {
        if self.indent < 2 {
            return Err(Error::Resource(format!(
                "indent must be at least 2, got {}",
                self.indent
            )));
        }
        Ok(())
    }

    /// Get the language
    pub fn language(&self) -> Language {
        self.language
    }

    /// Get the wrap width
    pub fn width(&self) -> usize {
        self.width
    }

    /// Get the indentation step
    pub fn indent(&self) -> usize {
        self.indent
    }

    /// Check if partial inference is an error
    pub fn strict_inference(&self) -> bool {
        self.strict_inference
    }

    /// Check if ingestion validates fields
    pub fn validate(&self) -> bool {
        self.validate
    }

    /// Get the timestamp format
    pub fn timestamp_format(&self) -> &str {
        &self.timestamp_format
    }

    /// Set the language
    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    /// Set the wrap width
    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    /// Set the indentation step (minimum 2)
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent.max(2);
        self
    }

    /// Set strict inference
    pub fn with_strict_inference(mut self, strict: bool) -> Self {
        self.strict_inference = strict;
        self
    }

    /// Set whether ingestion validates fields
    pub fn with_validate(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    /// Set the timestamp format
    pub fn with_timestamp_format(mut self, format: impl Into<String>) -> Self {
        self.timestamp_format = format.into();
        self
    }
}
