//! Records and field values

use crate::schema::Language;
use indexmap::IndexMap;
use serde::Serialize;

/// A stored field value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Single-language text (also lookup labels, dates and numbers)
    Text(String),
    /// English/French pair; either half may be empty
    Bilingual {
        /// English text
        english: String,
        /// French text
        french: String,
    },
}

impl FieldValue {
    /// Single-language text value
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    /// Bilingual value with only the given language filled
    pub fn bilingual_in(language: Language, value: impl Into<String>) -> Self {
        match language {
            Language::English => FieldValue::Bilingual {
                english: value.into(),
                french: String::new(),
            },
            Language::French => FieldValue::Bilingual {
                english: String::new(),
                french: value.into(),
            },
        }
    }

    /// Text used for comparisons and sorting; the English half of a
    /// bilingual value unless it is empty
    pub fn display_text(&self) -> &str {
        match self {
            FieldValue::Text(text) => text,
            FieldValue::Bilingual { english, french } if english.is_empty() => french,
            FieldValue::Bilingual { english, .. } => english,
        }
    }

    /// Every text part of the value
    pub fn parts(&self) -> impl Iterator<Item = &str> {
        let (first, second) = match self {
            FieldValue::Text(text) => (text.as_str(), None),
            FieldValue::Bilingual { english, french } => (english.as_str(), Some(french.as_str())),
        };
        std::iter::once(first).chain(second)
    }

    /// Check if every part is blank
    pub fn is_empty(&self) -> bool {
        self.parts().all(|p| p.trim().is_empty())
    }

    /// Number of `;`-separated non-empty items, the maximum over parts
    pub fn entry_count(&self) -> usize {
        self.parts()
            .map(|p| p.split(';').filter(|item| !item.trim().is_empty()).count())
            .max()
            .unwrap_or(0)
    }
}

/// One instance of data for a section
///
/// Field values and child records are keyed by schema id. Child records are
/// always stored as lists; container children hold exactly one grouping
/// record.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Record {
    section_id: String,
    fields: IndexMap<String, FieldValue>,
    sections: IndexMap<String, Vec<Record>>,
}

impl Record {
    /// Create an empty record for a section
    pub fn new(section_id: impl Into<String>) -> Self {
        Self {
            section_id: section_id.into(),
            fields: IndexMap::new(),
            sections: IndexMap::new(),
        }
    }

    /// Id of the section this record belongs to
    pub fn section_id(&self) -> &str {
        &self.section_id
    }

    /// Field values keyed by field id, in insertion order
    pub fn fields(&self) -> &IndexMap<String, FieldValue> {
        &self.fields
    }

    /// Value of a field
    pub fn field(&self, field_id: &str) -> Option<&FieldValue> {
        self.fields.get(field_id)
    }

    /// Set a field value
    pub fn set_field(&mut self, field_id: impl Into<String>, value: FieldValue) {
        self.fields.insert(field_id.into(), value);
    }

    /// Child records keyed by section id, in insertion order
    pub fn sections(&self) -> &IndexMap<String, Vec<Record>> {
        &self.sections
    }

    /// Child records of one subsection
    pub fn children(&self, section_id: &str) -> &[Record] {
        self.sections
            .get(section_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Append a child record
    pub fn push_child(&mut self, child: Record) {
        self.sections
            .entry(child.section_id.clone())
            .or_default()
            .push(child);
    }

    /// The single grouping child of a container subsection, created on
    /// first use
    pub fn grouping_child(&mut self, section_id: &str) -> &mut Record {
        let list = self.sections.entry(section_id.to_string()).or_default();
        if list.is_empty() {
            list.push(Record::new(section_id));
        }
        &mut list[0]
    }

    pub(crate) fn take_sections(&mut self) -> IndexMap<String, Vec<Record>> {
        std::mem::take(&mut self.sections)
    }

    pub(crate) fn take_fields(&mut self) -> IndexMap<String, FieldValue> {
        std::mem::take(&mut self.fields)
    }

    /// Check if the record holds neither fields nor children
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.sections.values().all(|v| v.is_empty())
    }
}
