//! Schema nodes: sections and fields
//!
//! Nodes are immutable once the [`SchemaIndex`](super::SchemaIndex) is built
//! and refer to each other by id.

use super::rules::Rule;
use super::types::DataType;
use crate::error::{Error, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Label language of a loaded schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// English labels (`englishName`)
    #[default]
    English,
    /// French labels (`frenchName`)
    French,
}

impl Language {
    /// Attribute prefix used by the schema documents
    pub fn attribute_prefix(&self) -> &'static str {
        match self {
            Language::English => "english",
            Language::French => "french",
        }
    }

    /// Value of the exchange document `lang` attribute
    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::French => "fr",
        }
    }
}

impl FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "english" | "en" => Ok(Language::English),
            "french" | "fr" => Ok(Language::French),
            _ => Err(Error::Resource(format!(
                "Unknown language: {}. Use: english, french",
                s
            ))),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.attribute_prefix())
    }
}

/// How a section holds data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    /// Pure grouping node: neither it nor any ancestor declares fields
    Container,
    /// Declares fields and has no field-bearing ancestor; each ingested
    /// record is appended as a new entry
    Record,
    /// Nested under a field-bearing ancestor; its entries live inside that
    /// ancestor's record
    Dependent,
}

/// Sort direction of a section sort key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Smallest first
    Ascending,
    /// Largest first
    Descending,
}

/// A field a section's entries are ordered by
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    /// Id of the field on this section
    pub field_id: String,
    /// Sort direction
    pub direction: Direction,
}

/// A named grouping node of the schema tree
#[derive(Debug, Clone)]
pub struct Section {
    /// Stable external id
    pub id: String,
    /// Label in the schema language
    pub label: String,
    /// Description in the schema language
    pub description: Option<String>,
    /// Declared display order among siblings
    pub order: i64,
    /// Parent section id
    pub parent_id: Option<String>,
    /// Parent section label
    pub parent_label: Option<String>,
    /// Ancestor section ids, nearest first
    pub ancestors: Vec<String>,
    /// Field ids in declaration order
    pub fields: Vec<String>,
    /// Child section ids in declaration order
    pub sections: Vec<String>,
    /// Multi-field sort keys, most significant first
    pub sort_keys: Vec<SortKey>,
    /// Container, record-holding or dependent
    pub kind: SectionKind,
    pub(crate) field_labels: IndexMap<String, String>,
    pub(crate) section_labels: IndexMap<String, String>,
}

impl Section {
    /// Check if the section declares fields itself
    pub fn has_fields(&self) -> bool {
        !self.fields.is_empty()
    }

    /// Check if this is a pure grouping section
    pub fn is_container(&self) -> bool {
        self.kind == SectionKind::Container
    }

    /// Check if entries must be nested under a field-bearing ancestor
    pub fn is_dependent(&self) -> bool {
        self.kind == SectionKind::Dependent
    }

    /// Id of the field with the given label
    pub fn field_id(&self, label: &str) -> Option<&str> {
        self.field_labels.get(label).map(|s| s.as_str())
    }

    /// Id of the child section with the given label
    pub fn subsection_id(&self, label: &str) -> Option<&str> {
        self.section_labels.get(label).map(|s| s.as_str())
    }

    /// Labels of the fields in declaration order
    pub fn field_labels(&self) -> impl Iterator<Item = &str> {
        self.field_labels.keys().map(|s| s.as_str())
    }

    /// Human readable position in the tree, e.g. `"Degrees" under "Education"`
    pub fn describe(&self) -> String {
        match &self.parent_label {
            Some(parent) => format!("\"{}\" under \"{}\"", self.label, parent),
            None => format!("\"{}\" at the top level", self.label),
        }
    }
}

/// Which lookup table a field's values come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// Controlled vocabulary (list of values) table id
    Vocabulary(String),
    /// Reference table id
    Reference(String),
}

impl Lookup {
    /// Table id
    pub fn table_id(&self) -> &str {
        match self {
            Lookup::Vocabulary(id) | Lookup::Reference(id) => id,
        }
    }
}

/// A typed data slot belonging to exactly one section
#[derive(Debug, Clone)]
pub struct Field {
    /// Stable external id
    pub id: String,
    /// Label in the schema language
    pub label: String,
    /// Description in the schema language
    pub description: Option<String>,
    /// Declared display order within the section
    pub order: i64,
    /// Owning section id
    pub section_id: String,
    /// Id of the declared type
    pub type_id: String,
    /// Resolved data type
    pub data_type: DataType,
    /// Lookup table for vocabulary and reference fields
    pub lookup: Option<Lookup>,
    /// Validation rules in declaration order
    pub rules: Vec<Rule>,
}

impl Field {
    /// Check if field values must resolve through a lookup table
    pub fn is_lookup(&self) -> bool {
        self.lookup.is_some()
    }
}
