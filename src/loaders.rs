//! Resource loading utilities
//!
//! This module handles loading of schema definitions, record files and
//! exchange documents from their locations.

use crate::error::{Error, Result};
use crate::limits::Limits;
use crate::locations::Location;
use std::fs;

/// Resource loader for schema definitions and CV documents
#[derive(Debug, Default)]
pub struct Loader {
    /// Resource limits
    limits: Limits,
}

impl Loader {
    /// Create a new loader with default settings
    pub fn new() -> Self {
        Self {
            limits: Limits::default(),
        }
    }

    /// Set the limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Get the limits
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Load a resource as a string
    pub fn load(&self, location: &Location) -> Result<String> {
        let content = match location {
            Location::Path(path) => fs::read_to_string(path).map_err(|e| {
                Error::Resource(format!("Failed to read file '{}': {}", path.display(), e))
            })?,
            Location::String(s) => s.clone(),
        };

        self.limits.check_document_size(content.len())?;

        Ok(content)
    }
}
