//! Lookup tables: controlled vocabularies and reference tables
//!
//! A controlled vocabulary is a flat label/id bijection. A reference table
//! value additionally carries a chain of classification metadata that walks
//! from the outermost classification table down to the leaf table.

use crate::error::{Error, Result};
use indexmap::IndexMap;
use std::collections::HashMap;

/// One entry of a lookup table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableValue {
    /// Stable external id
    pub id: String,
    /// Label in the schema language
    pub label: String,
}

/// One level of a reference value's metadata chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainLink {
    /// Id of the table this level belongs to
    pub id: String,
    /// Value label at this level
    pub label: String,
}

/// What kind of table a classification level refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelKind {
    /// A controlled vocabulary ("List Of Values")
    Vocabulary,
    /// Another reference table
    Reference,
}

impl LevelKind {
    /// Parse the parenthetical type tag of a classification header
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim() {
            "List Of Values" => Some(LevelKind::Vocabulary),
            "Reference Table" => Some(LevelKind::Reference),
            _ => None,
        }
    }
}

/// A classification level of a reference table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLevel {
    /// Id of the referenced table
    pub id: String,
    /// Clean label of the referenced table
    pub label: String,
    /// Kind of the referenced table
    pub kind: LevelKind,
}

/// A reference table value with its metadata chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceValue {
    /// Leaf value id
    pub id: String,
    /// Leaf value label
    pub label: String,
    /// Metadata chain, outermost classification first, leaf last
    pub chain: Vec<ChainLink>,
}

fn sorted_labels<'a>(labels: impl Iterator<Item = &'a String>) -> Vec<&'a str> {
    let mut labels: Vec<&str> = labels.map(|s| s.as_str()).collect();
    labels.sort_by_key(|l| l.to_lowercase());
    labels
}

/// A flat label/id lookup table
#[derive(Debug, Clone)]
pub struct ControlledVocabulary {
    /// Table id
    pub id: String,
    /// Table label
    pub label: String,
    values: IndexMap<String, TableValue>,
    by_label: HashMap<String, String>,
}

impl ControlledVocabulary {
    /// Create a vocabulary, rejecting duplicate value ids or labels
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        values: impl IntoIterator<Item = TableValue>,
    ) -> Result<Self> {
        let mut table = Self {
            id: id.into(),
            label: label.into(),
            values: IndexMap::new(),
            by_label: HashMap::new(),
        };

        for value in values {
            if table.by_label.contains_key(&value.label) {
                return Err(Error::schema(format!(
                    "\"{}\" is not unique in controlled vocabulary \"{}\"",
                    value.label, table.label
                )));
            }
            if table.values.contains_key(&value.id) {
                return Err(Error::schema(format!(
                    "value id {} is not unique in controlled vocabulary \"{}\"",
                    value.id, table.label
                )));
            }
            table.by_label.insert(value.label.clone(), value.id.clone());
            table.values.insert(value.id.clone(), value);
        }

        Ok(table)
    }

    /// Resolve a label to its value id (exact match)
    pub fn resolve(&self, label: &str) -> Result<&str> {
        self.by_label
            .get(label)
            .map(|s| s.as_str())
            .ok_or_else(|| self.invalid_value(label))
    }

    /// Label of a value id
    pub fn label_for(&self, id: &str) -> Result<&str> {
        self.values
            .get(id)
            .map(|v| v.label.as_str())
            .ok_or_else(|| {
                Error::Field(format!(
                    "value id {} does not exist in \"{}\"",
                    id, self.label
                ))
            })
    }

    /// Values in declaration order
    pub fn values(&self) -> impl Iterator<Item = &TableValue> {
        self.values.values()
    }

    /// Labels sorted case-insensitively, for prompts
    pub fn labels(&self) -> Vec<&str> {
        sorted_labels(self.by_label.keys())
    }

    fn invalid_value(&self, label: &str) -> Error {
        Error::Field(format!(
            "\"{}\" is not a valid value for \"{}\" (valid options: {})",
            label,
            self.label,
            self.labels().join(", ")
        ))
    }
}

/// A lookup table whose values carry classification metadata chains
#[derive(Debug, Clone)]
pub struct ReferenceTable {
    /// Table id
    pub id: String,
    /// Table label
    pub label: String,
    /// Classification levels, outermost first
    pub levels: Vec<TableLevel>,
    values: IndexMap<String, ReferenceValue>,
    by_label: HashMap<String, String>,
}

impl ReferenceTable {
    /// Create a reference table, checking every chain has one link per
    /// classification level plus the leaf
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        levels: Vec<TableLevel>,
        values: impl IntoIterator<Item = ReferenceValue>,
    ) -> Result<Self> {
        let mut table = Self {
            id: id.into(),
            label: label.into(),
            levels,
            values: IndexMap::new(),
            by_label: HashMap::new(),
        };

        for value in values {
            if value.chain.len() != table.levels.len() + 1 {
                return Err(Error::schema(format!(
                    "value \"{}\" of reference table \"{}\" has {} metadata links, expected {}",
                    value.label,
                    table.label,
                    value.chain.len(),
                    table.levels.len() + 1
                )));
            }
            if table.by_label.contains_key(&value.label) {
                return Err(Error::schema(format!(
                    "\"{}\" is not unique in reference table \"{}\"",
                    value.label, table.label
                )));
            }
            table.by_label.insert(value.label.clone(), value.id.clone());
            table.values.insert(value.id.clone(), value);
        }

        Ok(table)
    }

    /// Number of classification levels above the leaf
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    /// Resolve a leaf label to its id and metadata chain
    pub fn resolve(&self, label: &str) -> Result<(&str, &[ChainLink])> {
        let id = self.by_label.get(label).ok_or_else(|| {
            Error::Field(format!(
                "\"{}\" is not a valid value for \"{}\" (valid options: {})",
                label,
                self.label,
                self.labels().join(", ")
            ))
        })?;
        let value = &self.values[id.as_str()];
        Ok((value.id.as_str(), value.chain.as_slice()))
    }

    /// Look up a value by leaf id
    pub fn value(&self, id: &str) -> Result<&ReferenceValue> {
        self.values.get(id).ok_or_else(|| {
            Error::Field(format!(
                "value id {} does not exist in \"{}\"",
                id, self.label
            ))
        })
    }

    /// Label of a leaf value id
    pub fn label_for(&self, id: &str) -> Result<&str> {
        self.value(id).map(|v| v.label.as_str())
    }

    /// Values in declaration order
    pub fn values(&self) -> impl Iterator<Item = &ReferenceValue> {
        self.values.values()
    }

    /// Leaf labels sorted case-insensitively, for prompts
    pub fn labels(&self) -> Vec<&str> {
        sorted_labels(self.by_label.keys())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(id: &str, label: &str) -> TableValue {
        TableValue {
            id: id.to_string(),
            label: label.to_string(),
        }
    }

    fn link(id: &str, label: &str) -> ChainLink {
        ChainLink {
            id: id.to_string(),
            label: label.to_string(),
        }
    }

    #[test]
    fn test_vocabulary_lookup() {
        let lov = ControlledVocabulary::new(
            "t1",
            "Course Level",
            vec![value("1", "Undergraduate"), value("2", "Graduate")],
        )
        .unwrap();

        assert_eq!(lov.resolve("Graduate").unwrap(), "2");
        assert_eq!(lov.label_for("1").unwrap(), "Undergraduate");
        assert_eq!(lov.labels(), vec!["Graduate", "Undergraduate"]);

        let err = lov.resolve("graduate").unwrap_err().to_string();
        assert!(err.contains("valid options: Graduate, Undergraduate"));
    }

    #[test]
    fn test_vocabulary_rejects_duplicates() {
        let result = ControlledVocabulary::new(
            "t1",
            "Course Level",
            vec![value("1", "Graduate"), value("2", "Graduate")],
        );
        assert!(matches!(result, Err(Error::Schema(_))));
    }

    #[test]
    fn test_reference_chain_length() {
        let levels = vec![TableLevel {
            id: "country".to_string(),
            label: "Country".to_string(),
            kind: LevelKind::Vocabulary,
        }];

        let good = ReferenceValue {
            id: "ns".to_string(),
            label: "Nova Scotia".to_string(),
            chain: vec![link("country", "Canada"), link("sub", "Nova Scotia")],
        };
        let table = ReferenceTable::new("sub", "Subdivision", levels.clone(), vec![good]).unwrap();
        let (id, chain) = table.resolve("Nova Scotia").unwrap();
        assert_eq!(id, "ns");
        assert_eq!(chain.len(), table.depth() + 1);
        assert_eq!(chain[0].label, "Canada");

        let bad = ReferenceValue {
            id: "on".to_string(),
            label: "Ontario".to_string(),
            chain: vec![link("sub", "Ontario")],
        };
        assert!(ReferenceTable::new("sub", "Subdivision", levels, vec![bad]).is_err());
    }

    #[test]
    fn test_level_kind_tags() {
        assert_eq!(LevelKind::from_tag("List Of Values"), Some(LevelKind::Vocabulary));
        assert_eq!(LevelKind::from_tag(" Reference Table "), Some(LevelKind::Reference));
        assert_eq!(LevelKind::from_tag("Other"), None);
    }
}
