//! Raw record ingestion
//!
//! Turns one raw mapping into a [`Record`] of a known section. Problems
//! with individual keys or values never fail the record: they are logged,
//! collected and the offending entry is dropped.

use super::record::{FieldValue, Record};
use super::{merge_grouping, ContentModel, Warnings, CATEGORY_KEY, SECTION_KEY};
use crate::error::{Error, Result, ValidationError};
use crate::schema::{rules, DataType, Field, FieldType, Language, Section};
use indexmap::IndexMap;
use serde_json::{Map, Value};

impl ContentModel {
    /// Build a record of `section` from a raw mapping
    ///
    /// Keys are classified as fields, subsections or unknown; unknown keys
    /// are dropped. With `validate`, each field's rules, format and lookup
    /// are checked and failing fields are dropped. Blank fields are never
    /// stored.
    pub fn ingest(&self, section: &Section, raw: &Map<String, Value>, validate: bool) -> Result<Record> {
        self.ingest_with(section, raw, validate, &mut Warnings::default())
    }

    pub(crate) fn ingest_with(
        &self,
        section: &Section,
        raw: &Map<String, Value>,
        validate: bool,
        warnings: &mut Warnings,
    ) -> Result<Record> {
        let schema = self.schema();
        let language = schema.language();

        let mut values: IndexMap<String, FieldValue> = IndexMap::new();
        let mut subsections: Vec<(&Section, &Value)> = Vec::new();

        for (key, value) in raw {
            if key == SECTION_KEY || key == CATEGORY_KEY {
                continue;
            }

            if let Some(field_id) = section.field_id(key) {
                let field = schema.field_by_id(field_id)?;
                match field_value(field, value, language) {
                    Ok(value) => {
                        values.insert(field.id.clone(), value);
                    }
                    Err(message) => warnings.warn(
                        ValidationError::new(message)
                            .with_field(&field.label)
                            .with_section(&section.label)
                            .to_string(),
                    ),
                }
            } else if let Some(section_id) = section.subsection_id(key) {
                subsections.push((schema.section_by_id(section_id)?, value));
            } else {
                warnings.warn(format!(
                    "\"{}\" is not a valid field or subsection in \"{}\"",
                    key, section.label
                ));
            }
        }

        let mut record = Record::new(&section.id);

        // Every declared field is checked so that required rules see absent values
        for field in schema.fields_of(section) {
            let value = values
                .get(&field.id)
                .cloned()
                .unwrap_or_else(|| empty_value(field));

            if validate {
                match self.check_field(section, field, &value, &values) {
                    Ok(()) => {}
                    Err(Error::Validation(e)) => {
                        warnings.warn(e.to_string());
                        continue;
                    }
                    Err(e) => return Err(e),
                }
            }

            if !value.is_empty() {
                record.set_field(&field.id, value);
            }
        }

        for (subsection, value) in subsections {
            for item in items(value) {
                let Some(map) = item else {
                    warnings.warn(format!(
                        "\"{}\" in \"{}\" must hold a mapping or a list of mappings",
                        subsection.label, section.label
                    ));
                    continue;
                };

                let child = self.ingest_with(subsection, map, validate, warnings)?;
                if subsection.is_container() {
                    merge_grouping(schema, record.grouping_child(&subsection.id), child)?;
                } else {
                    record.push_child(child);
                }
            }
        }

        Ok(record)
    }

    /// Check one field value against its rules, format and lookup table
    ///
    /// Siblings are the record's raw values, before any of them is dropped.
    /// Failures are reported as [`Error::Validation`] naming the field.
    fn check_field(
        &self,
        section: &Section,
        field: &Field,
        value: &FieldValue,
        siblings: &IndexMap<String, FieldValue>,
    ) -> Result<()> {
        let mut messages = Vec::new();

        if let Some(message) = rules::validate_all(&field.rules, value, siblings) {
            messages.push(message);
        }

        if !value.is_empty() {
            let resolved = match self.schema().field_type(field)? {
                FieldType::Vocabulary(table) => table.resolve(value.display_text()).map(|_| ()),
                FieldType::Reference(table) => table.resolve(value.display_text()).map(|_| ()),
                FieldType::Scalar(data_type) => {
                    messages.extend(
                        value
                            .parts()
                            .filter(|p| !p.is_empty())
                            .filter_map(|p| data_type.check_format(p)),
                    );
                    Ok(())
                }
            };
            if let Err(e) = resolved {
                messages.push(match e {
                    Error::Field(message) => message,
                    other => other.to_string(),
                });
            }
        }

        if messages.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(messages.join("; "))
                .with_field(&field.label)
                .with_section(&section.label)
                .into())
        }
    }
}

/// The mappings a subsection value stands for: a mapping is one item, a
/// list holds several; `None` marks an item of the wrong shape
pub(crate) fn items(value: &Value) -> Vec<Option<&Map<String, Value>>> {
    match value {
        Value::Object(map) => vec![Some(map)],
        Value::Array(list) => list.iter().map(Value::as_object).collect(),
        Value::Null => Vec::new(),
        _ => vec![None],
    }
}

fn empty_value(field: &Field) -> FieldValue {
    match field.data_type {
        DataType::Bilingual => FieldValue::Bilingual {
            english: String::new(),
            french: String::new(),
        },
        _ => FieldValue::Text(String::new()),
    }
}

fn field_value(field: &Field, value: &Value, language: Language) -> std::result::Result<FieldValue, String> {
    match (&field.data_type, value) {
        (DataType::Bilingual, Value::Object(halves)) => {
            let mut english = String::new();
            let mut french = String::new();
            for (key, half) in halves {
                match key.to_lowercase().as_str() {
                    "english" | "en" => english = scalar_text(half)?,
                    "french" | "fr" => french = scalar_text(half)?,
                    _ => return Err(format!("\"{}\" is not a language of a bilingual value", key)),
                }
            }
            Ok(FieldValue::Bilingual { english, french })
        }
        (DataType::Bilingual, other) => Ok(FieldValue::bilingual_in(language, scalar_text(other)?)),
        (_, Value::Object(_)) => Err("expected a single value, found a mapping".to_string()),
        (_, other) => scalar_text(other).map(FieldValue::Text),
    }
}

/// Text of a scalar; a list of scalars is joined with `"; "`
fn scalar_text(value: &Value) -> std::result::Result<String, String> {
    match value {
        Value::Null => Ok(String::new()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) => Ok(normalize_text(s)),
        Value::Array(items) => {
            let parts = items
                .iter()
                .map(|item| match item {
                    Value::Array(_) | Value::Object(_) => {
                        Err("lists of values may only hold single values".to_string())
                    }
                    scalar => scalar_text(scalar),
                })
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(parts
                .into_iter()
                .filter(|p| !p.is_empty())
                .collect::<Vec<_>>()
                .join("; "))
        }
        Value::Object(_) => Err("expected a single value, found a mapping".to_string()),
    }
}

/// Trim surrounding whitespace and fold single line breaks into spaces;
/// runs of two or more line breaks are kept
pub(crate) fn normalize_text(raw: &str) -> String {
    let text = raw.replace("\r\n", "\n");
    let text = text.trim();

    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\n' {
            out.push(c);
            continue;
        }

        let mut run = 1;
        while chars.peek() == Some(&'\n') {
            chars.next();
            run += 1;
        }

        if run == 1 {
            let kept = out.trim_end_matches(|c| c == ' ' || c == '\t').len();
            out.truncate(kept);
            out.push(' ');
            while matches!(chars.peek(), Some(' ') | Some('\t')) {
                chars.next();
            }
        } else {
            out.extend(std::iter::repeat('\n').take(run));
        }
    }

    out
}
