//! Limits and constraints for CV document processing
//!
//! Schema definitions and exchange documents are small (hundreds to low
//! thousands of nodes); these limits reject inputs that are clearly not one.

use crate::error::{Error, Result};

/// Input limits configuration
#[derive(Debug, Clone)]
pub struct Limits {
    /// Maximum XML nesting depth
    pub max_xml_depth: usize,

    /// Maximum size in bytes of any one input document
    pub max_document_size: usize,

    /// Maximum number of schema nodes (sections, fields, table values)
    pub max_schema_nodes: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_xml_depth: 256,
            max_document_size: 64 * 1024 * 1024, // 64 MB
            max_schema_nodes: 1_000_000,
        }
    }
}

impl Limits {
    /// Create a new Limits with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create strict limits (more restrictive)
    pub fn strict() -> Self {
        Self {
            max_xml_depth: 64,
            max_document_size: 10 * 1024 * 1024, // 10 MB
            max_schema_nodes: 100_000,
        }
    }

    /// Check if XML depth is within limits
    pub fn check_xml_depth(&self, depth: usize) -> Result<()> {
        if depth > self.max_xml_depth {
            Err(Error::LimitExceeded(format!(
                "XML depth {} exceeds maximum {}",
                depth, self.max_xml_depth
            )))
        } else {
            Ok(())
        }
    }

    /// Check if a document size is within limits
    pub fn check_document_size(&self, size: usize) -> Result<()> {
        if size > self.max_document_size {
            Err(Error::LimitExceeded(format!(
                "document size {} bytes exceeds maximum {} bytes",
                size, self.max_document_size
            )))
        } else {
            Ok(())
        }
    }

    /// Check if the number of schema nodes is within limits
    pub fn check_schema_nodes(&self, count: usize) -> Result<()> {
        if count > self.max_schema_nodes {
            Err(Error::LimitExceeded(format!(
                "schema node count {} exceeds maximum {}",
                count, self.max_schema_nodes
            )))
        } else {
            Ok(())
        }
    }
}
