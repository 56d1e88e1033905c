//! CCV schema index
//!
//! The [`SchemaIndex`] is built once from the three schema definition
//! documents (sections/fields, controlled vocabularies, reference tables)
//! and is read-only afterwards. Content models and translators borrow it
//! (usually through an `Arc`).

mod builder;
mod inference;
mod nodes;
pub mod rules;
mod tables;
mod types;

pub use builder::SchemaSources;
pub use inference::{Inference, InferenceMode};
pub use nodes::{Direction, Field, Language, Lookup, Section, SectionKind, SortKey};
pub use rules::{Comparator, Rule};
pub use tables::{
    ChainLink, ControlledVocabulary, LevelKind, ReferenceTable, ReferenceValue, TableLevel,
    TableValue,
};
pub use types::{DataType, TypeDef};

use crate::error::{Error, Result};
use indexmap::IndexMap;
use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

/// The type a field's values are encoded with, after redirecting lookup
/// types to the field's own table
#[derive(Debug, Clone, Copy)]
pub enum FieldType<'a> {
    /// A scalar or bilingual type
    Scalar(&'a DataType),
    /// The controlled vocabulary bound to the field
    Vocabulary(&'a ControlledVocabulary),
    /// The reference table bound to the field
    Reference(&'a ReferenceTable),
}

/// Read-only index over a loaded CCV schema
#[derive(Debug)]
pub struct SchemaIndex {
    pub(crate) language: Language,
    pub(crate) sections: IndexMap<String, Section>,
    pub(crate) section_labels: HashMap<String, Vec<String>>,
    pub(crate) roots: Vec<String>,
    pub(crate) fields: IndexMap<String, Field>,
    pub(crate) types: IndexMap<String, TypeDef>,
    pub(crate) type_labels: HashMap<String, String>,
    pub(crate) vocabularies: IndexMap<String, ControlledVocabulary>,
    pub(crate) vocabulary_labels: HashMap<String, String>,
    pub(crate) references: IndexMap<String, ReferenceTable>,
    pub(crate) reference_labels: HashMap<String, String>,
    /// Entry (field or subsection) label -> ids of sections declaring it
    pub(crate) entries: HashMap<String, BTreeSet<String>>,
    pub(crate) inference_cache: RwLock<HashMap<String, Inference>>,
}

impl SchemaIndex {
    /// Label language of the loaded schema
    pub fn language(&self) -> Language {
        self.language
    }

    // ------------------------------------------------------------------
    // Sections

    /// Look up a section by id
    pub fn section_by_id(&self, id: &str) -> Result<&Section> {
        self.sections
            .get(id)
            .ok_or_else(|| Error::Section(format!("no section with id \"{}\"", id)))
    }

    /// Look up a section by label, disambiguating with the parent label
    pub fn section_by_label(&self, label: &str, parent_label: Option<&str>) -> Result<&Section> {
        let ids = self
            .section_labels
            .get(label)
            .ok_or_else(|| Error::Section(format!("\"{}\" section is not defined", label)))?;

        let candidates: Vec<&Section> = ids.iter().map(|id| &self.sections[id.as_str()]).collect();

        let matching: Vec<&Section> = match parent_label {
            Some(parent) => candidates
                .iter()
                .copied()
                .filter(|s| s.parent_label.as_deref() == Some(parent))
                .collect(),
            None => candidates.clone(),
        };

        match (matching.len(), candidates.len(), parent_label) {
            (1, _, _) => Ok(matching[0]),
            (0, 1, Some(parent)) => Err(Error::Section(format!(
                "\"{}\" section is not defined under \"{}\"",
                label, parent
            ))),
            _ => Err(Error::Ambiguous {
                key: format!("section \"{}\" (add the parent section label)", label),
                candidates: candidates.iter().map(|s| s.describe()).collect(),
            }),
        }
    }

    /// All sections in document order
    pub fn sections(&self) -> impl Iterator<Item = &Section> {
        self.sections.values()
    }

    /// Top-level sections in display order
    pub fn root_sections(&self) -> Vec<&Section> {
        let mut roots: Vec<&Section> = self.roots.iter().map(|id| &self.sections[id.as_str()]).collect();
        roots.sort_by_key(|s| s.order);
        roots
    }

    /// Top-level section with the given label
    pub fn root_section(&self, label: &str) -> Option<&Section> {
        self.roots
            .iter()
            .map(|id| &self.sections[id.as_str()])
            .find(|s| s.label == label)
    }

    /// Child sections in display order
    pub fn subsections(&self, section: &Section) -> Vec<&Section> {
        let mut children: Vec<&Section> = section
            .sections
            .iter()
            .map(|id| &self.sections[id.as_str()])
            .collect();
        children.sort_by_key(|s| s.order);
        children
    }

    /// Child section of `section` with the given label
    pub fn subsection(&self, section: &Section, label: &str) -> Result<&Section> {
        section
            .subsection_id(label)
            .and_then(|id| self.sections.get(id))
            .ok_or_else(|| {
                Error::Section(format!(
                    "\"{}\" subsection does not exist in \"{}\" section",
                    label, section.label
                ))
            })
    }

    // ------------------------------------------------------------------
    // Fields and types

    /// Field of a section by label
    pub fn field(&self, section: &Section, label: &str) -> Result<&Field> {
        section
            .field_id(label)
            .and_then(|id| self.fields.get(id))
            .ok_or_else(|| {
                Error::Field(format!(
                    "\"{}\" field does not exist in \"{}\" section",
                    label, section.label
                ))
            })
    }

    /// Field by id
    pub fn field_by_id(&self, id: &str) -> Result<&Field> {
        self.fields
            .get(id)
            .ok_or_else(|| Error::Field(format!("no field with id \"{}\"", id)))
    }

    /// Fields of a section in display order
    pub fn fields_of(&self, section: &Section) -> Vec<&Field> {
        let mut fields: Vec<&Field> = section
            .fields
            .iter()
            .map(|id| &self.fields[id.as_str()])
            .collect();
        fields.sort_by_key(|f| f.order);
        fields
    }

    /// Type by id
    pub fn type_by_id(&self, id: &str) -> Result<&TypeDef> {
        self.types
            .get(id)
            .ok_or_else(|| Error::Field(format!("no data type with id \"{}\"", id)))
    }

    /// Type by label
    pub fn type_by_label(&self, label: &str) -> Result<&TypeDef> {
        self.type_labels
            .get(label)
            .and_then(|id| self.types.get(id))
            .ok_or_else(|| Error::Field(format!("\"{}\" data type is not defined", label)))
    }

    /// Encoding type of a field; lookup types redirect to the field's table
    pub fn field_type<'a>(&'a self, field: &'a Field) -> Result<FieldType<'a>> {
        match (&field.data_type, &field.lookup) {
            (DataType::Vocabulary, Some(lookup)) => {
                self.vocabulary_by_id(lookup.table_id()).map(FieldType::Vocabulary)
            }
            (DataType::Reference, Some(lookup)) => {
                self.reference_by_id(lookup.table_id()).map(FieldType::Reference)
            }
            (data_type, _) => Ok(FieldType::Scalar(data_type)),
        }
    }

    // ------------------------------------------------------------------
    // Lookup tables

    /// Controlled vocabulary by id
    pub fn vocabulary_by_id(&self, id: &str) -> Result<&ControlledVocabulary> {
        self.vocabularies
            .get(id)
            .ok_or_else(|| Error::Field(format!("no controlled vocabulary with id \"{}\"", id)))
    }

    /// Controlled vocabulary by label
    pub fn vocabulary_by_label(&self, label: &str) -> Result<&ControlledVocabulary> {
        self.vocabulary_labels
            .get(label)
            .and_then(|id| self.vocabularies.get(id))
            .ok_or_else(|| Error::Field(format!("\"{}\" controlled vocabulary is not defined", label)))
    }

    /// Reference table by id
    pub fn reference_by_id(&self, id: &str) -> Result<&ReferenceTable> {
        self.references
            .get(id)
            .ok_or_else(|| Error::Field(format!("no reference table with id \"{}\"", id)))
    }

    /// Reference table by label
    pub fn reference_by_label(&self, label: &str) -> Result<&ReferenceTable> {
        self.reference_labels
            .get(label)
            .and_then(|id| self.references.get(id))
            .ok_or_else(|| Error::Field(format!("\"{}\" reference table is not defined", label)))
    }

    /// Resolve a vocabulary label to its value id within one table
    pub fn resolve_vocabulary(&self, table_id: &str, label: &str) -> Result<&str> {
        self.vocabulary_by_id(table_id)?.resolve(label)
    }

    /// Resolve a reference label to its leaf id and metadata chain
    pub fn resolve_reference(&self, table_id: &str, label: &str) -> Result<(&str, &[ChainLink])> {
        self.reference_by_id(table_id)?.resolve(label)
    }

    /// Label of a lookup value id for a field
    pub fn lookup_label<'a>(&'a self, field: &'a Field, value_id: &str) -> Result<&'a str> {
        match self.field_type(field)? {
            FieldType::Vocabulary(table) => table.label_for(value_id),
            FieldType::Reference(table) => table.label_for(value_id),
            FieldType::Scalar(_) => Err(Error::Field(format!(
                "\"{}\" field does not use a lookup table",
                field.label
            ))),
        }
    }

    /// Valid labels of a lookup field, sorted for prompts
    pub fn lookup_labels<'a>(&'a self, field: &'a Field) -> Result<Vec<&'a str>> {
        match self.field_type(field)? {
            FieldType::Vocabulary(table) => Ok(table.labels()),
            FieldType::Reference(table) => Ok(table.labels()),
            FieldType::Scalar(_) => Ok(Vec::new()),
        }
    }

    /// Number of sections, fields and lookup tables
    pub fn stats(&self) -> (usize, usize, usize) {
        (
            self.sections.len(),
            self.fields.len(),
            self.vocabularies.len() + self.references.len(),
        )
    }
}
