//! Content model translators
//!
//! Supported output formats:
//! - Xml: the generic-cv exchange document
//! - Yaml: indentation-oriented text that reads back as the ingest mapping
//! - Json: the same mapping as JSON
//!
//! The [`template`] module renders commented section templates for the
//! text format.

pub mod mapping;
pub mod template;
pub mod xml;

pub use mapping::{to_value, JsonEncoder, MappingEncoder};
pub use template::{section_template, TemplateOptions};
pub use xml::{import_document, EncodeReport, XmlEncoder};

use crate::config::Config;
use crate::content::ContentModel;
use crate::error::{Error, Result};
use std::str::FromStr;

/// Trait for translators writing a whole content model
pub trait Encoder {
    /// Translate the model to text
    fn encode(&self, model: &ContentModel) -> Result<String>;

    /// File extension of the produced text
    fn extension(&self) -> &'static str;
}

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Exchange XML document
    #[default]
    Xml,
    /// Text mapping format
    Yaml,
    /// JSON mapping
    Json,
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "xml" => Ok(Self::Xml),
            "yaml" | "yml" | "text" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            other => Err(Error::Encode(format!("unknown output format \"{}\"", other))),
        }
    }
}

/// Create an encoder for a format, configured from `config`
pub fn create_encoder(format: OutputFormat, config: &Config, pretty: bool) -> Box<dyn Encoder> {
    match format {
        OutputFormat::Xml => Box::new(XmlEncoder::new().with_pretty(pretty)),
        OutputFormat::Yaml => Box::new(MappingEncoder::from_config(config)),
        OutputFormat::Json => Box::new(JsonEncoder::new().with_pretty(pretty)),
    }
}
