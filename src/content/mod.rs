//! CV content model
//!
//! A [`ContentModel`] holds the records of one CV, arranged under the
//! schema's section tree. Records come in as raw mappings (from YAML or
//! TOML files, or any `serde_json::Value`), are matched to a section,
//! validated fail-soft and appended. Reading the model back walks it in
//! schema display order through [`ContentModel::get`].

mod entries;
mod ingest;
mod record;

pub use entries::Entry;
pub use record::{FieldValue, Record};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::loaders::Loader;
use crate::locations::Location;
use crate::schema::{InferenceMode, SchemaIndex, Section};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;

/// Reserved key naming the target section of a record
pub const SECTION_KEY: &str = "_section";
/// Reserved key naming the parent of the target section
pub const CATEGORY_KEY: &str = "_category";

/// Outcome of ingesting several records
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Labels of the sections records were added to, in ingestion order
    pub added: Vec<String>,
    /// Records that could not be added
    pub skipped: usize,
    /// Fail-soft diagnostics, in the order they were logged
    pub warnings: Vec<String>,
}

/// Collects fail-soft diagnostics while logging each one once
#[derive(Debug, Default)]
pub(crate) struct Warnings(Vec<String>);

impl Warnings {
    pub(crate) fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{}", message);
        self.0.push(message);
    }

    pub(crate) fn into_inner(self) -> Vec<String> {
        self.0
    }
}

/// The records of one CV
#[derive(Debug, Clone)]
pub struct ContentModel {
    schema: Arc<SchemaIndex>,
    config: Config,
    /// Pseudo-record whose children are the top-level containers
    root: Record,
}

impl ContentModel {
    /// Create an empty model over a loaded schema
    pub fn new(schema: Arc<SchemaIndex>, config: Config) -> Self {
        Self {
            schema,
            config,
            root: Record::default(),
        }
    }

    /// The schema the model is built against
    pub fn schema(&self) -> &SchemaIndex {
        &self.schema
    }

    /// Shared handle to the schema
    pub fn schema_handle(&self) -> Arc<SchemaIndex> {
        Arc::clone(&self.schema)
    }

    /// Model settings
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The pseudo-record holding the top-level containers
    pub fn root(&self) -> &Record {
        &self.root
    }

    /// Check if nothing has been added yet
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Add one raw record, returning the labels of the sections it went to
    ///
    /// The section is taken from the reserved `_section`/`_category` keys
    /// when present, otherwise inferred from the record's keys. A mapping
    /// whose keys are all top-level section labels is read as a whole
    /// document instead.
    pub fn add(&mut self, raw: &Map<String, Value>) -> Result<Vec<String>> {
        self.add_with(raw, &mut Warnings::default())
    }

    fn add_with(&mut self, raw: &Map<String, Value>, warnings: &mut Warnings) -> Result<Vec<String>> {
        let validate = self.config.validate();

        if self.is_document(raw) {
            return self.add_document_with(raw, validate, warnings);
        }

        let schema = Arc::clone(&self.schema);
        let section = self.target_section(&schema, raw, warnings)?;

        if section.is_dependent() {
            return Err(Error::Content(format!(
                "a subsection like \"{}\" cannot be added on its own",
                section.label
            )));
        }
        tracing::info!("Section identified as {}", section.describe());

        let record = self.ingest_with(section, raw, validate, warnings)?;
        self.insert(section, record)?;
        Ok(vec![section.label.clone()])
    }

    fn is_document(&self, raw: &Map<String, Value>) -> bool {
        let mut keys = raw
            .keys()
            .filter(|k| k.as_str() != SECTION_KEY && k.as_str() != CATEGORY_KEY)
            .peekable();
        !raw.contains_key(SECTION_KEY)
            && keys.peek().is_some()
            && keys.all(|k| self.schema.root_section(k).is_some())
    }

    fn target_section<'s>(
        &self,
        schema: &'s SchemaIndex,
        raw: &Map<String, Value>,
        warnings: &mut Warnings,
    ) -> Result<&'s Section> {
        if let Some(label) = raw.get(SECTION_KEY) {
            let label = label.as_str().ok_or_else(|| {
                Error::Content(format!("\"{}\" must name a section label", SECTION_KEY))
            })?;
            let parent = raw.get(CATEGORY_KEY).and_then(Value::as_str);
            return schema.section_by_label(label, parent);
        }

        let names: Vec<&str> = raw
            .keys()
            .map(|k| k.as_str())
            .filter(|k| *k != CATEGORY_KEY)
            .collect();

        if self.config.strict_inference() {
            return schema
                .section_from_field_names(&names, InferenceMode::Strict)?
                .ok_or_else(|| Error::Section("could not identify the section of a record".into()));
        }

        match schema.section_from_field_names(&names, InferenceMode::Strict) {
            Ok(Some(section)) => Ok(section),
            Ok(None) => Err(Error::Section("could not identify the section of a record".into())),
            Err(strict) => {
                warnings.warn(strict.to_string());
                schema
                    .section_from_field_names(&names, InferenceMode::Permissive)?
                    .ok_or(strict)
            }
        }
    }

    /// Add a mapping keyed by top-level section labels, as produced by
    /// the mapping translator
    pub fn add_document(&mut self, raw: &Map<String, Value>) -> Result<IngestReport> {
        let mut warnings = Warnings::default();
        let added = self.add_document_with(raw, self.config.validate(), &mut warnings)?;
        Ok(IngestReport {
            added,
            skipped: 0,
            warnings: warnings.into_inner(),
        })
    }

    fn add_document_with(
        &mut self,
        raw: &Map<String, Value>,
        validate: bool,
        warnings: &mut Warnings,
    ) -> Result<Vec<String>> {
        let schema = Arc::clone(&self.schema);
        let mut added = Vec::new();

        for (label, value) in raw {
            let Some(section) = schema.root_section(label) else {
                warnings.warn(format!("\"{}\" is not a top-level section", label));
                continue;
            };
            for item in ingest::items(value) {
                match item {
                    Some(map) => {
                        let record = self.ingest_with(section, map, validate, warnings)?;
                        self.insert(section, record)?;
                        added.push(section.label.clone());
                    }
                    None => warnings.warn(format!(
                        "\"{}\" must hold a mapping of entries",
                        section.label
                    )),
                }
            }
        }
        Ok(added)
    }

    /// Add many raw records, continuing past per-record errors
    pub fn add_all<'a>(&mut self, records: impl IntoIterator<Item = &'a Value>) -> IngestReport {
        let mut report = IngestReport::default();
        let mut warnings = Warnings::default();

        // Nested lists are flattened in order
        let mut pending: Vec<&Value> = records.into_iter().collect();
        pending.reverse();

        while let Some(value) = pending.pop() {
            match value {
                Value::Object(map) => match self.add_with(map, &mut warnings) {
                    Ok(labels) => report.added.extend(labels),
                    Err(e) => {
                        warnings.warn(format!("record skipped: {}", e));
                        report.skipped += 1;
                    }
                },
                Value::Array(items) => pending.extend(items.iter().rev()),
                Value::Null => {}
                other => {
                    warnings.warn(format!("record skipped: expected a mapping, found {}", other));
                    report.skipped += 1;
                }
            }
        }

        report.warnings = warnings.into_inner();
        report
    }

    /// Add every record of a YAML text (one record, a list of records or
    /// several documents)
    pub fn add_yaml(&mut self, text: &str) -> Result<IngestReport> {
        let mut values = Vec::new();
        for document in serde_yaml::Deserializer::from_str(text) {
            values.push(Value::deserialize(document)?);
        }
        Ok(self.add_all(values.iter()))
    }

    /// Add the record of a TOML text
    pub fn add_toml(&mut self, text: &str) -> Result<IngestReport> {
        let value: Value = toml::from_str(text)?;
        Ok(self.add_all(std::iter::once(&value)))
    }

    /// Add the records of a file, choosing the parser by extension
    ///
    /// Files that are neither YAML nor TOML are skipped.
    pub fn add_file(&mut self, path: impl AsRef<Path>) -> Result<IngestReport> {
        let location = Location::path(path.as_ref());
        let parse: fn(&mut Self, &str) -> Result<IngestReport> =
            match location.extension().as_deref() {
                Some("yml") | Some("yaml") => Self::add_yaml,
                Some("toml") => Self::add_toml,
                _ => {
                    tracing::info!("Skipping {} (not a YAML or TOML file)", location.describe());
                    return Ok(IngestReport::default());
                }
            };

        tracing::info!("Adding entries from {}", location.describe());
        let text = Loader::new().load(&location)?;
        parse(self, &text)
    }

    /// Place a record under its section's container path
    pub(crate) fn insert(&mut self, section: &Section, record: Record) -> Result<()> {
        let schema = Arc::clone(&self.schema);
        let mut node = &mut self.root;
        for ancestor in section.ancestors.iter().rev() {
            node = node.grouping_child(ancestor);
        }

        if section.is_container() {
            let target = node.grouping_child(&section.id);
            merge_grouping(&schema, target, record)
        } else {
            node.push_child(record);
            Ok(())
        }
    }
}

/// Merge a container record into an existing grouping record: container
/// children merge recursively, record children append
pub(crate) fn merge_grouping(schema: &SchemaIndex, target: &mut Record, mut source: Record) -> Result<()> {
    for (id, value) in source.take_fields() {
        target.set_field(id, value);
    }
    for (id, children) in source.take_sections() {
        let section = schema.section_by_id(&id)?;
        for child in children {
            if section.is_container() {
                merge_grouping(schema, target.grouping_child(&id), child)?;
            } else {
                target.push_child(child);
            }
        }
    }
    Ok(())
}
