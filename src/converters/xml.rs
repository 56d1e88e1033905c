//! Exchange document translator
//!
//! Writes a content model as the generic-cv XML exchange document and reads
//! such a document back into a model.

use super::Encoder;
use crate::content::{merge_grouping, ContentModel, Entry, FieldValue, Record, Warnings};
use crate::documents::{Document, Element};
use crate::error::{Error, Result};
use crate::limits::Limits;
use crate::schema::{DataType, Field, FieldType, Language, SchemaIndex, Section};
use crate::GENERIC_CV_NAMESPACE;
use chrono::{Local, NaiveDateTime};
use std::fmt::Write;

/// Namespace prefix of the exchange document root
pub const GENERIC_CV_PREFIX: &str = "generic-cv";

/// Records an export left out
///
/// A record is skipped when one of its fields cannot be written, so the
/// rest of the document is still produced.
#[derive(Debug, Default)]
pub struct EncodeReport {
    /// Error that stopped each skipped record, in document order
    pub skipped: Vec<Error>,
}

impl EncodeReport {
    /// Check if every record was written
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Encoder for the XML exchange document
#[derive(Debug, Clone, Default)]
pub struct XmlEncoder {
    pretty: bool,
    timestamp: Option<NaiveDateTime>,
}

impl XmlEncoder {
    /// Create an encoder writing compact XML stamped with the current time
    pub fn new() -> Self {
        Self::default()
    }

    /// Indent the output
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Stamp documents with a fixed generation time
    pub fn with_timestamp(mut self, timestamp: NaiveDateTime) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Build the exchange document tree for a model, with the records that
    /// had to be left out
    pub fn to_element(&self, model: &ContentModel) -> Result<(Element, EncodeReport)> {
        let schema = model.schema();
        let format = model.config().timestamp_format();
        let generated = self
            .timestamp
            .unwrap_or_else(|| Local::now().naive_local());

        let mut timestamp = String::new();
        write!(timestamp, "{}", generated.format(format))
            .map_err(|_| Error::Encode(format!("invalid timestamp format \"{}\"", format)))?;

        let mut root = Element::new(format!("{0}:{0}", GENERIC_CV_PREFIX))
            .with_namespace(GENERIC_CV_PREFIX, GENERIC_CV_NAMESPACE)
            .with_attribute("lang", schema.language().code())
            .with_attribute("dateTimeGenerated", timestamp);

        let mut report = EncodeReport::default();
        for entry in model.get(None)? {
            append_entry(schema, &mut root, &entry, &mut report)?;
        }

        Ok((root, report))
    }

    /// Write the exchange document, with the records that had to be left out
    pub fn encode_with_report(&self, model: &ContentModel) -> Result<(String, EncodeReport)> {
        let (root, report) = self.to_element(model)?;
        Ok((root.to_xml_string(self.pretty)?, report))
    }
}

impl Encoder for XmlEncoder {
    fn encode(&self, model: &ContentModel) -> Result<String> {
        self.encode_with_report(model).map(|(xml, _)| xml)
    }

    fn extension(&self) -> &'static str {
        "xml"
    }
}

/// Append one entry; a record whose fields cannot be written is left out
/// and its error kept in `report`
fn append_entry(
    schema: &SchemaIndex,
    parent: &mut Element,
    entry: &Entry,
    report: &mut EncodeReport,
) -> Result<()> {
    match entry {
        Entry::Field { field, value } => parent.add_child(field_element(schema, field, value)?),
        Entry::Section { section, instances } => {
            for instance in instances {
                let mut element = section_element(section);
                let written = instance
                    .iter()
                    .try_for_each(|child| append_entry(schema, &mut element, child, report));

                match written {
                    Ok(()) => {}
                    Err(e @ (Error::Unsupported { .. } | Error::Encode(_))) => {
                        tracing::warn!("Leaving a record of {} out of the export: {}", section.describe(), e);
                        report.skipped.push(e);
                        continue;
                    }
                    Err(e) => return Err(e),
                }

                // Groupings emptied by skipped records are dropped
                if section.is_container() && element.children.is_empty() {
                    continue;
                }
                parent.add_child(element);
            }
        }
    }
    Ok(())
}

/// Empty `<section>` element for a schema section
pub fn section_element(section: &Section) -> Element {
    Element::new("section")
        .with_attribute("id", &section.id)
        .with_attribute("label", &section.label)
}

/// `<field>` element carrying one value in its type-dependent shape
///
/// Fails with [`Error::Unsupported`] for types the exchange format cannot
/// carry and with [`Error::Encode`] for lookup values that do not resolve.
pub fn field_element(schema: &SchemaIndex, field: &Field, value: &FieldValue) -> Result<Element> {
    let encode_error = |e: Error| {
        Error::Encode(format!(
            "field \"{}\" (id {}): {}",
            field.label, field.id, e
        ))
    };

    let value_element = match schema.field_type(field)? {
        FieldType::Vocabulary(table) => {
            let label = value.display_text();
            let id = table.resolve(label).map_err(encode_error)?;
            Element::new("lov").with_attribute("id", id).with_text(label)
        }
        FieldType::Reference(table) => {
            let (id, chain) = table.resolve(value.display_text()).map_err(encode_error)?;
            let level_labels = table
                .levels
                .iter()
                .map(|level| level.label.as_str())
                .chain(std::iter::once(table.label.as_str()));

            let mut element = Element::new("refTable").with_attribute("refValueId", id);
            for (link, level_label) in chain.iter().zip(level_labels) {
                element.add_child(
                    Element::new("linkedWith")
                        .with_attribute("label", level_label)
                        .with_attribute("value", &link.label)
                        .with_attribute("refOrLovId", &link.id),
                );
            }
            element
        }
        FieldType::Scalar(DataType::Bilingual) => {
            let (english, french) = match value {
                FieldValue::Bilingual { english, french } => (english.as_str(), french.as_str()),
                FieldValue::Text(text) => match schema.language() {
                    Language::English => (text.as_str(), ""),
                    Language::French => ("", text.as_str()),
                },
            };
            Element::new("value")
                .with_attribute("type", "Bilingual")
                .with_child(text_element("english", english))
                .with_child(text_element("french", french))
        }
        FieldType::Scalar(data_type) if !data_type.is_supported() => {
            return Err(Error::Unsupported {
                data_type: data_type.label().to_string(),
                field_id: field.id.clone(),
                field_label: field.label.clone(),
            })
        }
        FieldType::Scalar(data_type) => {
            let mut element = Element::new("value");
            if let Some(format) = data_type.value_format() {
                element = element.with_attribute("format", format);
            }
            element
                .with_attribute("type", data_type.value_type())
                .with_text(value.display_text())
        }
    };

    Ok(Element::new("field")
        .with_attribute("id", &field.id)
        .with_attribute("label", &field.label)
        .with_child(value_element))
}

fn text_element(name: &str, text: &str) -> Element {
    let element = Element::new(name);
    if text.is_empty() {
        element
    } else {
        element.with_text(text)
    }
}

/// Read an exchange document into a model, returning fail-soft diagnostics
pub fn import_document(model: &mut ContentModel, xml: &str) -> Result<Vec<String>> {
    let root = Document::parse(xml.as_bytes(), &Limits::default())?.into_root()?;
    import_element(model, &root)
}

/// Read a parsed exchange document root into a model
///
/// Unknown sections and fields are skipped with a warning; same-named
/// sibling sections accumulate as a list of records.
pub fn import_element(model: &mut ContentModel, root: &Element) -> Result<Vec<String>> {
    if root.local_name() != GENERIC_CV_PREFIX {
        return Err(Error::Decode(format!(
            "expected a <{}> root element, found <{}>",
            GENERIC_CV_PREFIX, root.name
        )));
    }
    if let Some(namespace) = root.namespace() {
        if namespace != GENERIC_CV_NAMESPACE {
            return Err(Error::Decode(format!(
                "unexpected root namespace \"{}\"",
                namespace
            )));
        }
    }

    let schema = model.schema_handle();
    let mut warnings = Warnings::default();

    for child in root.find_children("section") {
        let Some(section) = child_section(&schema, child, None, &mut warnings) else {
            continue;
        };
        let record = read_section(&schema, section, child, &mut warnings)?;
        model.insert(section, record)?;
    }

    Ok(warnings.into_inner())
}

/// Schema section of a `<section>` element, if it may appear under `parent`
fn child_section<'s>(
    schema: &'s SchemaIndex,
    element: &Element,
    parent: Option<&Section>,
    warnings: &mut Warnings,
) -> Option<&'s Section> {
    let id = element.get_attribute("id").unwrap_or_default();
    let label = element.get_attribute("label").unwrap_or_default();

    let Ok(section) = schema.section_by_id(id) else {
        warnings.warn(format!("section \"{}\" (id {}) is not defined", label, id));
        return None;
    };

    if section.parent_id.as_deref() != parent.map(|p| p.id.as_str()) {
        warnings.warn(format!(
            "{} cannot appear under {}",
            section.describe(),
            parent.map(|p| p.describe()).unwrap_or_else(|| "the document root".to_string())
        ));
        return None;
    }
    Some(section)
}

fn read_section(
    schema: &SchemaIndex,
    section: &Section,
    element: &Element,
    warnings: &mut Warnings,
) -> Result<Record> {
    let mut record = Record::new(&section.id);

    for child in &element.children {
        match child.local_name() {
            "field" => {
                let id = child.get_attribute("id").unwrap_or_default();
                let field = match schema.field_by_id(id) {
                    Ok(field) if field.section_id == section.id => field,
                    _ => {
                        warnings.warn(format!(
                            "field \"{}\" (id {}) is not defined in \"{}\"",
                            child.get_attribute("label").unwrap_or_default(),
                            id,
                            section.label
                        ));
                        continue;
                    }
                };
                match read_value(schema, field, child)? {
                    Some(value) if !value.is_empty() => record.set_field(&field.id, value),
                    Some(_) => {}
                    None => warnings.warn(format!(
                        "field \"{}\" in \"{}\" has no value of the expected shape",
                        field.label, section.label
                    )),
                }
            }
            "section" => {
                let Some(subsection) = child_section(schema, child, Some(section), warnings) else {
                    continue;
                };
                let sub_record = read_section(schema, subsection, child, warnings)?;
                if subsection.is_container() {
                    merge_grouping(schema, record.grouping_child(&subsection.id), sub_record)?;
                } else {
                    record.push_child(sub_record);
                }
            }
            other => warnings.warn(format!(
                "unexpected <{}> element in \"{}\"",
                other, section.label
            )),
        }
    }

    Ok(record)
}

fn read_value(schema: &SchemaIndex, field: &Field, element: &Element) -> Result<Option<FieldValue>> {
    let value = match schema.field_type(field)? {
        FieldType::Vocabulary(table) => element.find_child("lov").map(|lov| {
            let text = lov.text().trim();
            if text.is_empty() {
                // Fall back to the value id
                let label = lov
                    .get_attribute("id")
                    .and_then(|id| table.label_for(id).ok())
                    .unwrap_or_default();
                FieldValue::text(label)
            } else {
                FieldValue::text(text)
            }
        }),
        FieldType::Reference(table) => element.find_child("refTable").and_then(|reference| {
            let links: Vec<&Element> = reference.find_children("linkedWith").collect();
            links
                .iter()
                .find(|link| link.get_attribute("refOrLovId") == Some(table.id.as_str()))
                .or_else(|| links.last())
                .and_then(|link| link.get_attribute("value"))
                .map(FieldValue::text)
        }),
        FieldType::Scalar(DataType::Bilingual) => element.find_child("value").map(|value| {
            let half = |name: &str| {
                value
                    .find_child(name)
                    .map(|e| e.text().trim().to_string())
                    .unwrap_or_default()
            };
            FieldValue::Bilingual {
                english: half("english"),
                french: half("french"),
            }
        }),
        FieldType::Scalar(_) => element
            .find_child("value")
            .map(|value| FieldValue::text(value.text().trim())),
    };
    Ok(value)
}
