//! # canadianccv
//!
//! Schema-driven validation and translation of Canadian Common CV (CCV)
//! data.
//!
//! The government-published CCV schema (sections, fields, data types,
//! controlled vocabularies, reference tables and rules) is loaded into a
//! read-only [`SchemaIndex`]. Records written as plain mappings keyed by
//! human labels are matched to their section, validated fail-soft and
//! stored in a [`ContentModel`], which translates to the generic-cv XML
//! exchange document or back to the mapping format.
//!
//! ## Features
//!
//! - Label and id lookups over the whole schema tree
//! - Section inference from a record's field names, cached per name set
//! - Controlled vocabulary and reference table resolution with metadata chains
//! - Fail-soft rule, format and lookup validation
//! - XML exchange export and import
//! - Text mapping export and section templates
//!
//! ## Example
//!
//! ```rust,ignore
//! use canadianccv::{Config, ContentModel, SchemaIndex, SchemaSources};
//! use canadianccv::converters::{Encoder, XmlEncoder};
//! use std::sync::Arc;
//!
//! let config = Config::default();
//! let sources = SchemaSources::from_dir("schema");
//! let schema = Arc::new(SchemaIndex::load(&sources, config.language(), &Default::default())?);
//!
//! let mut model = ContentModel::new(schema, config);
//! model.add_file("cv/courses.yaml")?;
//!
//! let xml = XmlEncoder::new().with_pretty(true).encode(&model)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Infrastructure
pub mod error;
pub mod limits;
pub mod locations;
pub mod loaders;
pub mod documents;
pub mod config;

// Schema, content and translation
pub mod schema;
pub mod content;
pub mod converters;

// Re-exports for convenience
pub use config::Config;
pub use content::{ContentModel, IngestReport};
pub use error::{Error, Result};
pub use schema::{Language, SchemaIndex, SchemaSources};

/// Version of the canadianccv library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Namespace of the generic-cv exchange document
pub const GENERIC_CV_NAMESPACE: &str = "http://www.cihr-irsc.gc.ca/generic-cv/1.0.0";
