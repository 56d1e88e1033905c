//! Resource locations
//!
//! Schema definitions and record files are read either from disk or from
//! in-memory text (tests, embedding applications).

use std::path::{Path, PathBuf};

/// Resource location - a file path or in-memory content
#[derive(Debug, Clone)]
pub enum Location {
    /// File system path
    Path(PathBuf),
    /// In-memory document content
    String(String),
}

impl Location {
    /// Create a location pointing at a file
    pub fn path(path: impl AsRef<Path>) -> Self {
        Location::Path(path.as_ref().to_path_buf())
    }

    /// Create a location holding document text directly
    pub fn text(content: impl Into<String>) -> Self {
        Location::String(content.into())
    }

    /// Short description for error messages and logs
    pub fn describe(&self) -> String {
        match self {
            Location::Path(p) => p.display().to_string(),
            Location::String(_) => "<memory>".to_string(),
        }
    }

    /// File extension, lower-cased, if this is a path
    pub fn extension(&self) -> Option<String> {
        match self {
            Location::Path(p) => p
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_ascii_lowercase()),
            Location::String(_) => None,
        }
    }

    /// Check if this is a local file
    pub fn is_file(&self) -> bool {
        matches!(self, Location::Path(_))
    }
}

impl From<PathBuf> for Location {
    fn from(path: PathBuf) -> Self {
        Location::Path(path)
    }
}

impl From<&Path> for Location {
    fn from(path: &Path) -> Self {
        Location::Path(path.to_path_buf())
    }
}
