//! Flattening records into ordered entry lists

use super::record::{FieldValue, Record};
use super::ContentModel;
use crate::error::{Error, Result};
use crate::schema::{Direction, Field, Section, SortKey};
use std::cmp::Ordering;

/// One schema-ordered entry of a flattened record
#[derive(Debug, Clone)]
pub enum Entry<'a> {
    /// A field and its stored value
    Field {
        /// Schema field
        field: &'a Field,
        /// Stored value
        value: &'a FieldValue,
    },
    /// A subsection and the flattened entries of each of its records
    Section {
        /// Schema section
        section: &'a Section,
        /// One entry list per stored record, in sort-key order
        instances: Vec<Vec<Entry<'a>>>,
    },
}

impl<'a> Entry<'a> {
    /// Label of the schema node
    pub fn label(&self) -> &'a str {
        match self {
            Entry::Field { field, .. } => &field.label,
            Entry::Section { section, .. } => &section.label,
        }
    }

    /// Declared display order of the schema node
    pub fn order(&self) -> i64 {
        match self {
            Entry::Field { field, .. } => field.order,
            Entry::Section { section, .. } => section.order,
        }
    }
}

impl ContentModel {
    /// Ordered entries of the whole model (`None`) or of one section
    ///
    /// For a section, the result is a single [`Entry::Section`] holding
    /// every stored record of that section, or nothing when none is stored.
    /// Dependent sections are only reachable through their parent's records.
    pub fn get(&self, section: Option<&Section>) -> Result<Vec<Entry<'_>>> {
        let Some(section) = section else {
            return self.flatten(self.root());
        };

        let section = self.schema().section_by_id(&section.id)?;
        if section.is_dependent() {
            return Err(Error::Content(format!(
                "{} is stored inside its parent's records",
                section.describe()
            )));
        }

        let mut node = self.root();
        for ancestor in section.ancestors.iter().rev() {
            match node.children(ancestor).first() {
                Some(child) => node = child,
                None => return Ok(Vec::new()),
            }
        }

        let records = node.children(&section.id);
        if records.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![self.section_entry(section, records)?])
    }

    /// Entries of one record: fields first, then subsections, each in
    /// declared display order
    pub fn flatten<'a>(&'a self, record: &'a Record) -> Result<Vec<Entry<'a>>> {
        let schema = self.schema();

        let mut fields = record
            .fields()
            .iter()
            .map(|(id, value)| Ok(Entry::Field { field: schema.field_by_id(id)?, value }))
            .collect::<Result<Vec<_>>>()?;
        fields.sort_by_key(Entry::order);

        let mut sections = Vec::new();
        for (id, records) in record.sections() {
            if records.is_empty() {
                continue;
            }
            let section = schema.section_by_id(id)?;
            sections.push(self.section_entry(section, records)?);
        }
        sections.sort_by_key(Entry::order);

        fields.extend(sections);
        Ok(fields)
    }

    fn section_entry<'a>(&'a self, section: &'a Section, records: &'a [Record]) -> Result<Entry<'a>> {
        let mut ordered: Vec<&Record> = records.iter().collect();
        if !section.sort_keys.is_empty() {
            ordered.sort_by(|a, b| compare_records(a, b, &section.sort_keys));
        }

        let instances = ordered
            .into_iter()
            .map(|record| self.flatten(record))
            .collect::<Result<Vec<_>>>()?;

        Ok(Entry::Section { section, instances })
    }
}

fn compare_records(a: &Record, b: &Record, keys: &[SortKey]) -> Ordering {
    for key in keys {
        let ordering = compare_values(a.field(&key.field_id), b.field(&key.field_id));
        let ordering = match key.direction {
            Direction::Ascending => ordering,
            Direction::Descending => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Missing values sort lowest; integers compare numerically
fn compare_values(a: Option<&FieldValue>, b: Option<&FieldValue>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => {
            let (a, b) = (a.display_text(), b.display_text());
            match (a.parse::<i64>(), b.parse::<i64>()) {
                (Ok(x), Ok(y)) => x.cmp(&y),
                _ => a.cmp(b),
            }
        }
    }
}
