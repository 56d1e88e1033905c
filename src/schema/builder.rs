//! Schema loading
//!
//! Parses the three schema definition documents with roxmltree and flattens
//! them into the lookup structures of a [`SchemaIndex`]. Any inconsistency
//! aborts loading; there is no partially built schema.

use super::nodes::{Direction, Field, Language, Lookup, Section, SectionKind, SortKey};
use super::rules::{Rule, RuleContext};
use super::tables::{
    ChainLink, ControlledVocabulary, LevelKind, ReferenceTable, ReferenceValue, TableLevel,
    TableValue,
};
use super::types::{DataType, TypeDef};
use super::SchemaIndex;
use crate::error::{Error, Result, SchemaError};
use crate::limits::Limits;
use crate::loaders::Loader;
use crate::locations::Location;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use roxmltree::{Document, Node};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::RwLock;

const SECTIONS_SOURCE: &str = "cv definition";
const VOCABULARIES_SOURCE: &str = "controlled vocabularies";
const REFERENCES_SOURCE: &str = "reference tables";

/// Classification header id in reference table definitions
const HEADER_ID: &str = "-1";

/// `"Country (List Of Values)"` -> ("Country", "List Of Values")
static CLASSIFIED_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(.*?)\s*\(([^()]*)\)\s*$").unwrap());

/// Locations of the three schema definition documents
#[derive(Debug, Clone)]
pub struct SchemaSources {
    /// Sections, fields, types and rules
    pub sections: Location,
    /// Controlled vocabulary tables
    pub vocabularies: Location,
    /// Reference tables
    pub references: Location,
}

impl SchemaSources {
    /// Create sources from three locations
    pub fn new(sections: Location, vocabularies: Location, references: Location) -> Self {
        Self {
            sections,
            vocabularies,
            references,
        }
    }

    /// Conventional file names inside one directory
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self::new(
            Location::path(dir.join("cv.xml")),
            Location::path(dir.join("cv-lov.xml")),
            Location::path(dir.join("cv-ref-table.xml")),
        )
    }
}

impl SchemaIndex {
    /// Load the schema from its sources
    pub fn load(sources: &SchemaSources, language: Language, loader: &Loader) -> Result<Self> {
        let sections = loader.load(&sources.sections)?;
        let vocabularies = loader.load(&sources.vocabularies)?;
        let references = loader.load(&sources.references)?;

        let index = Self::build(&sections, &vocabularies, &references, language, loader.limits())?;

        let (sections, fields, tables) = index.stats();
        tracing::info!(
            "Loaded CCV schema: {} sections, {} fields, {} lookup tables",
            sections,
            fields,
            tables
        );

        Ok(index)
    }

    /// Build the schema from document text
    pub fn from_strings(
        sections: &str,
        vocabularies: &str,
        references: &str,
        language: Language,
    ) -> Result<Self> {
        Self::build(sections, vocabularies, references, language, &Limits::default())
    }

    fn build(
        sections: &str,
        vocabularies: &str,
        references: &str,
        language: Language,
        limits: &Limits,
    ) -> Result<Self> {
        let cv = parse_document(sections, SECTIONS_SOURCE, limits)?;
        let lov = parse_document(vocabularies, VOCABULARIES_SOURCE, limits)?;
        let refs = parse_document(references, REFERENCES_SOURCE, limits)?;

        let labeler = Labeler::new(language);
        let mut index = SchemaIndex {
            language,
            sections: IndexMap::new(),
            section_labels: HashMap::new(),
            roots: Vec::new(),
            fields: IndexMap::new(),
            types: IndexMap::new(),
            type_labels: HashMap::new(),
            vocabularies: IndexMap::new(),
            vocabulary_labels: HashMap::new(),
            references: IndexMap::new(),
            reference_labels: HashMap::new(),
            entries: HashMap::new(),
            inference_cache: RwLock::new(HashMap::new()),
        };

        index.load_types(&cv, &labeler)?;
        index.load_vocabularies(&lov, &labeler)?;
        index.load_references(&refs, &labeler)?;
        let constraints = index.load_sections(&cv, &labeler)?;
        index.load_rules(&cv, &labeler, constraints)?;

        Ok(index)
    }

    fn load_types(&mut self, cv: &Document, labeler: &Labeler) -> Result<()> {
        for node in cv.descendants().filter(|n| n.has_tag_name("type")) {
            let id = required(node, "id", SECTIONS_SOURCE)?;
            let label = labeler.require(node, SECTIONS_SOURCE)?;

            unique_insert(&mut self.type_labels, label.clone(), id.to_string(), "data type", SECTIONS_SOURCE)?;
            let data_type = DataType::from_label(&label);
            let def = TypeDef {
                id: id.to_string(),
                label,
                data_type,
            };
            if self.types.insert(id.to_string(), def).is_some() {
                return Err(duplicate("data type id", id, SECTIONS_SOURCE));
            }
        }
        Ok(())
    }

    fn load_vocabularies(&mut self, lov: &Document, labeler: &Labeler) -> Result<()> {
        for node in lov.descendants().filter(|n| n.has_tag_name("table")) {
            let id = required(node, "id", VOCABULARIES_SOURCE)?;
            let label = labeler.require(node, VOCABULARIES_SOURCE)?;

            let values = node
                .children()
                .filter(|c| c.is_element())
                .map(|c| {
                    Ok(TableValue {
                        id: required(c, "id", VOCABULARIES_SOURCE)?.to_string(),
                        label: labeler.require(c, VOCABULARIES_SOURCE)?,
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            let table = ControlledVocabulary::new(id, label.clone(), values)?;
            unique_insert(
                &mut self.vocabulary_labels,
                label,
                id.to_string(),
                "controlled vocabulary",
                VOCABULARIES_SOURCE,
            )?;
            if self.vocabularies.insert(id.to_string(), table).is_some() {
                return Err(duplicate("controlled vocabulary id", id, VOCABULARIES_SOURCE));
            }
        }
        Ok(())
    }

    fn load_references(&mut self, refs: &Document, labeler: &Labeler) -> Result<()> {
        let mut builder = ReferenceBuilder::collect(refs, labeler, &self.vocabulary_labels)?;

        let ids: Vec<String> = builder.raw.keys().cloned().collect();
        for id in &ids {
            builder.build(id, &mut Vec::new())?;
        }

        for id in ids {
            if let Some(table) = builder.built.remove(&id) {
                self.reference_labels.insert(table.label.clone(), id.clone());
                self.references.insert(id, table);
            }
        }
        Ok(())
    }

    /// Loads sections and fields; returns constraints still to be turned
    /// into rules once every field is known
    fn load_sections(&mut self, cv: &Document, labeler: &Labeler) -> Result<Vec<PendingConstraint>> {
        let mut constraints = Vec::new();
        let mut label_parent_pairs: HashMap<(String, Option<String>), String> = HashMap::new();

        for node in cv.descendants().filter(|n| n.has_tag_name("section")) {
            let id = required(node, "id", SECTIONS_SOURCE)?.to_string();
            let label = labeler.require(node, SECTIONS_SOURCE)?;

            let ancestor_nodes: Vec<Node> = node
                .ancestors()
                .skip(1)
                .filter(|n| n.has_tag_name("section"))
                .collect();
            let ancestors = ancestor_nodes
                .iter()
                .map(|n| required(*n, "id", SECTIONS_SOURCE).map(str::to_string))
                .collect::<Result<Vec<_>>>()?;
            let parent_label = match ancestor_nodes.first() {
                Some(parent) => Some(labeler.require(*parent, SECTIONS_SOURCE)?),
                None => None,
            };

            let key = (label.clone(), parent_label.clone());
            if label_parent_pairs.insert(key, id.clone()).is_some() {
                return Err(Error::Schema(
                    SchemaError::new(format!(
                        "section \"{}\" is not unique under \"{}\"",
                        label,
                        parent_label.as_deref().unwrap_or("<root>")
                    ))
                    .with_location(id.clone())
                    .with_source(SECTIONS_SOURCE),
                ));
            }

            let mut section = Section {
                id: id.clone(),
                label: label.clone(),
                description: labeler.description(node),
                order: order_of(node),
                parent_id: ancestors.first().cloned(),
                parent_label,
                ancestors,
                fields: Vec::new(),
                sections: Vec::new(),
                sort_keys: Vec::new(),
                kind: SectionKind::Container,
                field_labels: IndexMap::new(),
                section_labels: IndexMap::new(),
            };

            for child in node.children().filter(|c| c.is_element()) {
                match child.tag_name().name() {
                    "field" => {
                        let field = self.parse_field(child, &section, labeler, &mut constraints)?;
                        let field_id = field.id.clone();
                        if section
                            .field_labels
                            .insert(field.label.clone(), field_id.clone())
                            .is_some()
                        {
                            return Err(duplicate("field label", &field.label, SECTIONS_SOURCE));
                        }
                        self.entries
                            .entry(field.label.clone())
                            .or_insert_with(BTreeSet::new)
                            .insert(id.clone());
                        if self.fields.insert(field_id.clone(), field).is_some() {
                            return Err(duplicate("field id", &field_id, SECTIONS_SOURCE));
                        }
                        section.fields.push(field_id);
                    }
                    "section" => {
                        let child_id = required(child, "id", SECTIONS_SOURCE)?.to_string();
                        let child_label = labeler.require(child, SECTIONS_SOURCE)?;
                        section
                            .section_labels
                            .insert(child_label.clone(), child_id.clone());
                        section.sections.push(child_id);
                        self.entries
                            .entry(child_label)
                            .or_insert_with(BTreeSet::new)
                            .insert(id.clone());
                    }
                    _ => {}
                }
            }

            for sort in node.children().filter(|c| c.has_tag_name("sortOn")) {
                let field_id = required(sort, "fieldId", SECTIONS_SOURCE)?;
                if !section.fields.iter().any(|f| f == field_id) {
                    return Err(Error::Schema(
                        SchemaError::new(format!(
                            "section \"{}\" sorts on field {} which it does not declare",
                            section.label, field_id
                        ))
                        .with_source(SECTIONS_SOURCE),
                    ));
                }
                let direction = match sort.attribute("order").unwrap_or("asc") {
                    "desc" | "descending" => Direction::Descending,
                    _ => Direction::Ascending,
                };
                section.sort_keys.push(SortKey {
                    field_id: field_id.to_string(),
                    direction,
                });
            }

            if section.parent_id.is_none() {
                self.roots.push(id.clone());
            }
            self.section_labels
                .entry(label)
                .or_default()
                .push(id.clone());
            if self.sections.insert(id.clone(), section).is_some() {
                return Err(duplicate("section id", &id, SECTIONS_SOURCE));
            }
        }

        // Kinds depend on whether any ancestor declares fields
        let kinds: Vec<(String, SectionKind)> = self
            .sections
            .values()
            .map(|s| {
                let dependent = s
                    .ancestors
                    .iter()
                    .any(|a| self.sections.get(a).map(|p| p.has_fields()).unwrap_or(false));
                let kind = if dependent {
                    SectionKind::Dependent
                } else if s.has_fields() {
                    SectionKind::Record
                } else {
                    SectionKind::Container
                };
                (s.id.clone(), kind)
            })
            .collect();
        for (id, kind) in kinds {
            if let Some(section) = self.sections.get_mut(&id) {
                section.kind = kind;
            }
        }

        Ok(constraints)
    }

    fn parse_field(
        &self,
        node: Node,
        section: &Section,
        labeler: &Labeler,
        constraints: &mut Vec<PendingConstraint>,
    ) -> Result<Field> {
        let id = required(node, "id", SECTIONS_SOURCE)?.to_string();
        let label = labeler.require(node, SECTIONS_SOURCE)?;
        let type_id = required(node, "dataType", SECTIONS_SOURCE)?;

        let type_def = self.types.get(type_id).ok_or_else(|| {
            Error::Schema(
                SchemaError::new(format!(
                    "field \"{}\" uses undefined data type {}",
                    label, type_id
                ))
                .with_location(id.clone())
                .with_source(SECTIONS_SOURCE),
            )
        })?;

        let lookup_id = node.attribute("lookupId").filter(|s| !s.trim().is_empty());
        let lookup = match type_def.data_type {
            DataType::Vocabulary => Some(Lookup::Vocabulary(resolve_table(
                lookup_id,
                &label,
                &self.vocabularies,
                &self.vocabulary_labels,
                "controlled vocabulary",
            )?)),
            DataType::Reference => Some(Lookup::Reference(resolve_table(
                lookup_id,
                &label,
                &self.references,
                &self.reference_labels,
                "reference table",
            )?)),
            _ => None,
        };

        for constraint in node.children().filter(|c| c.has_tag_name("constraint")) {
            constraints.push(PendingConstraint {
                field_id: id.clone(),
                rule_id: required(constraint, "validatorRule", SECTIONS_SOURCE)?.to_string(),
                parameters: constraint.attribute("parameters").unwrap_or("").to_string(),
            });
        }

        Ok(Field {
            id,
            label,
            description: labeler.description(node),
            order: order_of(node),
            section_id: section.id.clone(),
            type_id: type_id.to_string(),
            data_type: type_def.data_type.clone(),
            lookup,
            rules: Vec::new(),
        })
    }

    fn load_rules(
        &mut self,
        cv: &Document,
        labeler: &Labeler,
        constraints: Vec<PendingConstraint>,
    ) -> Result<()> {
        let mut definitions: HashMap<String, String> = HashMap::new();
        for node in cv.descendants().filter(|n| n.has_tag_name("rule")) {
            let id = required(node, "id", SECTIONS_SOURCE)?;
            let label = labeler.require(node, SECTIONS_SOURCE)?;
            unique_insert(&mut definitions, id.to_string(), label, "rule id", SECTIONS_SOURCE)?;
        }

        let built = {
            let ctx = BuildContext {
                fields: &self.fields,
                vocabularies: &self.vocabularies,
            };
            constraints
                .into_iter()
                .map(|c| {
                    let label = definitions.get(&c.rule_id).ok_or_else(|| {
                        Error::schema(format!(
                            "constraint on field {} refers to undefined rule {}",
                            c.field_id, c.rule_id
                        ))
                    })?;
                    let kind = c.rule_id.trim().parse::<u32>().map_err(|_| {
                        Error::schema(format!("rule id \"{}\" is not numeric", c.rule_id))
                    })?;
                    let rule = Rule::build(kind, label, &c.parameters, &ctx)?;
                    Ok((c.field_id, rule))
                })
                .collect::<Result<Vec<_>>>()?
        };

        for (field_id, rule) in built {
            if let Some(field) = self.fields.get_mut(&field_id) {
                field.rules.push(rule);
            }
        }
        Ok(())
    }
}

struct PendingConstraint {
    field_id: String,
    rule_id: String,
    parameters: String,
}

struct BuildContext<'a> {
    fields: &'a IndexMap<String, Field>,
    vocabularies: &'a IndexMap<String, ControlledVocabulary>,
}

impl RuleContext for BuildContext<'_> {
    fn field_label(&self, field_id: &str) -> Option<String> {
        self.fields.get(field_id).map(|f| f.label.clone())
    }

    fn vocabulary_label(&self, table_id: &str, value_id: &str) -> Option<String> {
        self.vocabularies
            .get(table_id)
            .and_then(|t| t.label_for(value_id).ok())
            .map(str::to_string)
    }
}

/// Reads `{language}Name` / `{language}Description` attributes
struct Labeler {
    name_attr: String,
    description_attr: String,
}

impl Labeler {
    fn new(language: Language) -> Self {
        let prefix = language.attribute_prefix();
        Self {
            name_attr: format!("{}Name", prefix),
            description_attr: format!("{}Description", prefix),
        }
    }

    fn label(&self, node: Node) -> Option<String> {
        node.attribute(self.name_attr.as_str())
            .or_else(|| node.attribute(self.description_attr.as_str()))
            .map(|s| s.trim().to_string())
    }

    fn description(&self, node: Node) -> Option<String> {
        node.attribute(self.description_attr.as_str())
            .map(|s| s.trim().to_string())
    }

    fn require(&self, node: Node, source: &str) -> Result<String> {
        self.label(node).ok_or_else(|| {
            Error::Schema(
                SchemaError::new(format!(
                    "<{}> element has neither {} nor {}",
                    node.tag_name().name(),
                    self.name_attr,
                    self.description_attr
                ))
                .with_location(node.attribute("id").unwrap_or("?").to_string())
                .with_source(source),
            )
        })
    }
}

/// Builds reference tables bottom-up, memoized per table id
struct ReferenceBuilder<'a, 'input, 'l> {
    labeler: &'l Labeler,
    vocabulary_labels: &'l HashMap<String, String>,
    raw: IndexMap<String, RawReference<'a, 'input>>,
    labels: HashMap<String, String>,
    built: HashMap<String, ReferenceTable>,
}

#[derive(Clone, Copy)]
struct RawReference<'a, 'input> {
    /// Classification headers, metadata values and rows
    table: Option<Node<'a, 'input>>,
    /// Leaf values
    values: Option<Node<'a, 'input>>,
}

impl<'a, 'input, 'l> ReferenceBuilder<'a, 'input, 'l> {
    fn collect(
        refs: &'a Document<'input>,
        labeler: &'l Labeler,
        vocabulary_labels: &'l HashMap<String, String>,
    ) -> Result<Self> {
        let mut raw: IndexMap<String, RawReference> = IndexMap::new();
        let mut names: IndexMap<String, String> = IndexMap::new();

        for node in refs.descendants() {
            let is_table = node.has_tag_name("table");
            if !is_table && !node.has_tag_name("refTable") {
                continue;
            }
            let id = required(node, "id", REFERENCES_SOURCE)?.to_string();
            let entry = raw.entry(id.clone()).or_insert(RawReference {
                table: None,
                values: None,
            });
            let slot = if is_table { &mut entry.table } else { &mut entry.values };
            if slot.replace(node).is_some() {
                return Err(duplicate("reference table id", &id, REFERENCES_SOURCE));
            }
            if !names.contains_key(&id) {
                if let Some(label) = labeler.label(node) {
                    names.insert(id, label);
                }
            }
        }

        let mut labels = HashMap::new();
        for id in raw.keys() {
            let label = names.get(id).ok_or_else(|| {
                Error::Schema(
                    SchemaError::new("reference table has no label")
                        .with_location(id.clone())
                        .with_source(REFERENCES_SOURCE),
                )
            })?;
            unique_insert(&mut labels, label.clone(), id.clone(), "reference table", REFERENCES_SOURCE)?;
        }

        Ok(Self {
            labeler,
            vocabulary_labels,
            raw,
            labels,
            built: HashMap::new(),
        })
    }

    fn label_of(&self, id: &str) -> String {
        self.labels
            .iter()
            .find(|(_, v)| v.as_str() == id)
            .map(|(k, _)| k.clone())
            .unwrap_or_else(|| id.to_string())
    }

    fn build(&mut self, id: &str, stack: &mut Vec<String>) -> Result<()> {
        if self.built.contains_key(id) {
            return Ok(());
        }
        if stack.iter().any(|s| s == id) {
            stack.push(id.to_string());
            return Err(Error::schema(format!(
                "reference tables depend on each other in a cycle: {}",
                stack.join(" -> ")
            )));
        }
        let raw = *self.raw.get(id).ok_or_else(|| {
            Error::schema(format!("reference table {} is not defined", id))
        })?;
        stack.push(id.to_string());

        let label = self.label_of(id);
        let mut levels = Vec::new();
        let mut metadata: HashMap<String, String> = HashMap::new();
        let mut rows: HashMap<String, Vec<String>> = HashMap::new();

        if let Some(table) = raw.table {
            let headers = table
                .children()
                .filter(|c| c.is_element())
                .take_while(|c| c.attribute("id") == Some(HEADER_ID));
            for header in headers {
                levels.push(self.parse_level(header, &label, stack)?);
            }

            for value in table.descendants().filter(|n| n.has_tag_name("value")) {
                let value_id = required(value, "id", REFERENCES_SOURCE)?;
                if value_id == HEADER_ID {
                    continue;
                }
                metadata.insert(value_id.to_string(), self.labeler.require(value, REFERENCES_SOURCE)?);
            }

            for row in table.descendants().filter(|n| n.has_tag_name("field")) {
                let leaf_id = required(row, "id", REFERENCES_SOURCE)?;
                let links = row
                    .children()
                    .filter(|c| c.is_element())
                    .map(|c| required(c, "id", REFERENCES_SOURCE).map(str::to_string))
                    .collect::<Result<Vec<_>>>()?;
                rows.insert(leaf_id.to_string(), links);
            }
        }

        let mut values = Vec::new();
        if let Some(leaves) = raw.values {
            for leaf in leaves.children().filter(|c| c.is_element()) {
                let leaf_id = required(leaf, "id", REFERENCES_SOURCE)?.to_string();
                let leaf_label = self.labeler.require(leaf, REFERENCES_SOURCE)?;

                let mut chain = Vec::with_capacity(levels.len() + 1);
                if !levels.is_empty() {
                    let links = rows.get(&leaf_id).ok_or_else(|| {
                        Error::schema(format!(
                            "value \"{}\" of reference table \"{}\" has no metadata row",
                            leaf_label, label
                        ))
                    })?;
                    if links.len() != levels.len() {
                        return Err(Error::schema(format!(
                            "value \"{}\" of reference table \"{}\" links {} metadata values, expected {}",
                            leaf_label,
                            label,
                            links.len(),
                            levels.len()
                        )));
                    }
                    for (level, link) in levels.iter().zip(links) {
                        let link_label = metadata.get(link).ok_or_else(|| {
                            Error::schema(format!(
                                "value \"{}\" of reference table \"{}\" links unknown metadata value {}",
                                leaf_label, label, link
                            ))
                        })?;
                        chain.push(ChainLink {
                            id: level.id.clone(),
                            label: link_label.clone(),
                        });
                    }
                }
                chain.push(ChainLink {
                    id: id.to_string(),
                    label: leaf_label.clone(),
                });

                values.push(ReferenceValue {
                    id: leaf_id,
                    label: leaf_label,
                    chain,
                });
            }
        }

        let table = ReferenceTable::new(id, label, levels, values)?;
        stack.pop();
        self.built.insert(id.to_string(), table);
        Ok(())
    }

    fn parse_level(&mut self, header: Node, table_label: &str, stack: &mut Vec<String>) -> Result<TableLevel> {
        let raw_label = self.labeler.require(header, REFERENCES_SOURCE)?;
        // The type tag is always written in English
        let tagged = header.attribute("englishName").unwrap_or(raw_label.as_str());

        let unclassified = || {
            Error::schema(format!(
                "classification header \"{}\" of reference table \"{}\" has no type tag",
                raw_label, table_label
            ))
        };

        let tag = CLASSIFIED_LABEL
            .captures(tagged)
            .and_then(|c| c.get(2))
            .map(|m| m.as_str())
            .ok_or_else(unclassified)?;
        let kind = LevelKind::from_tag(tag).ok_or_else(|| {
            Error::schema(format!(
                "classification header \"{}\" has unknown type tag \"{}\"",
                raw_label, tag
            ))
        })?;
        let clean = CLASSIFIED_LABEL
            .captures(&raw_label)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| raw_label.clone());

        let id = match kind {
            LevelKind::Vocabulary => self.vocabulary_labels.get(&clean).cloned().ok_or_else(|| {
                Error::schema(format!(
                    "reference table \"{}\" is classified by undefined controlled vocabulary \"{}\"",
                    table_label, clean
                ))
            })?,
            LevelKind::Reference => {
                let id = self.labels.get(&clean).cloned().ok_or_else(|| {
                    Error::schema(format!(
                        "reference table \"{}\" is classified by undefined reference table \"{}\"",
                        table_label, clean
                    ))
                })?;
                self.build(&id, stack)?;
                id
            }
        };

        Ok(TableLevel {
            id,
            label: clean,
            kind,
        })
    }
}

fn parse_document<'input>(text: &'input str, source: &str, limits: &Limits) -> Result<Document<'input>> {
    let doc = Document::parse(text).map_err(|e| {
        Error::Schema(SchemaError::new(format!("malformed XML: {}", e)).with_source(source))
    })?;
    limits.check_schema_nodes(doc.descendants().count())?;
    Ok(doc)
}

fn required<'a>(node: Node<'a, '_>, attr: &str, source: &str) -> Result<&'a str> {
    node.attribute(attr).ok_or_else(|| {
        Error::Schema(
            SchemaError::new(format!(
                "<{}> element is missing the \"{}\" attribute",
                node.tag_name().name(),
                attr
            ))
            .with_location(node.attribute("id").unwrap_or("?").to_string())
            .with_source(source),
        )
    })
}

fn order_of(node: Node) -> i64 {
    node.attribute("orderIndex")
        .and_then(|s| s.trim().parse::<i64>().ok())
        .unwrap_or(0)
}

fn duplicate(what: &str, key: &str, source: &str) -> Error {
    Error::Schema(SchemaError::new(format!("{} \"{}\" is not unique", what, key)).with_source(source))
}

fn unique_insert(
    map: &mut HashMap<String, String>,
    key: String,
    value: String,
    what: &str,
    source: &str,
) -> Result<()> {
    if map.contains_key(&key) {
        return Err(duplicate(what, &key, source));
    }
    map.insert(key, value);
    Ok(())
}

fn resolve_table<T>(
    lookup_id: Option<&str>,
    field_label: &str,
    tables: &IndexMap<String, T>,
    labels: &HashMap<String, String>,
    what: &str,
) -> Result<String> {
    match lookup_id {
        Some(id) if tables.contains_key(id) => Ok(id.to_string()),
        Some(id) => Err(Error::schema(format!(
            "field \"{}\" refers to undefined {} {}",
            field_label, what, id
        ))),
        // Tables without an explicit lookup are named after the field
        None => labels.get(field_label).cloned().ok_or_else(|| {
            Error::schema(format!(
                "field \"{}\" has no lookup table and no {} shares its label",
                field_label, what
            ))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TYPES: &str = r#"<type id="t_str" englishName="String"/><type id="t_lov" englishName="LOV"/><type id="t_ref" englishName="Reference"/>"#;

    fn cv(body: &str) -> String {
        format!("<cv>{}<rules><rule id=\"8\" englishName=\"Max Length\"/></rules>{}</cv>", TYPES, body)
    }

    const LOV: &str = r#"<lovs>
        <table id="country" englishName="Country"><code id="ca" englishName="Canada"/></table>
    </lovs>"#;

    #[test]
    fn test_minimal_schema() {
        let schema = SchemaIndex::from_strings(
            &cv(r#"<section id="s1" englishName="Top"><section id="s2" englishName="Item" orderIndex="2">
                <field id="f1" englishName="Name" dataType="t_str"><constraint id="c" validatorRule="8" parameters="10"/></field>
            </section></section>"#),
            LOV,
            "<refs/>",
            Language::English,
        )
        .unwrap();

        let item = schema.section_by_id("s2").unwrap();
        assert_eq!(item.kind, SectionKind::Record);
        assert_eq!(item.parent_label.as_deref(), Some("Top"));
        assert_eq!(schema.section_by_id("s1").unwrap().kind, SectionKind::Container);

        let field = schema.field(item, "Name").unwrap();
        assert_eq!(field.rules, vec![Rule::MaxLength(10)]);
    }

    #[test]
    fn test_lookup_fallback_by_field_label() {
        let schema = SchemaIndex::from_strings(
            &cv(r#"<section id="s1" englishName="Place"><field id="f1" englishName="Country" dataType="t_lov"/></section>"#),
            LOV,
            "<refs/>",
            Language::English,
        )
        .unwrap();

        let field = schema.field_by_id("f1").unwrap();
        assert_eq!(field.lookup, Some(Lookup::Vocabulary("country".to_string())));
    }

    #[test]
    fn test_duplicate_section_under_same_parent() {
        let result = SchemaIndex::from_strings(
            &cv(r#"<section id="s1" englishName="Top"><section id="a" englishName="X"/><section id="b" englishName="X"/></section>"#),
            LOV,
            "<refs/>",
            Language::English,
        );
        assert!(matches!(result, Err(Error::Schema(_))));
    }

    #[test]
    fn test_undefined_rule_is_schema_error() {
        let result = SchemaIndex::from_strings(
            &cv(r#"<section id="s1" englishName="Top"><field id="f1" englishName="Name" dataType="t_str"><constraint id="c" validatorRule="99"/></field></section>"#),
            LOV,
            "<refs/>",
            Language::English,
        );
        assert!(matches!(result, Err(Error::Schema(_))));
    }

    #[test]
    fn test_reference_cycle_detected() {
        let refs = r#"<refs>
            <table id="a" englishName="A"><h id="-1" englishName="B (Reference Table)"/></table>
            <table id="b" englishName="B"><h id="-1" englishName="A (Reference Table)"/></table>
        </refs>"#;
        let err = SchemaIndex::from_strings(&cv(""), LOV, refs, Language::English).unwrap_err();
        assert!(err.to_string().contains("cycle"), "{}", err);
    }

    #[test]
    fn test_unsupported_types_load() {
        let body = r#"<type id="t_dt" englishName="Datetime"/><section id="s1" englishName="Top"><field id="f1" englishName="When" dataType="t_dt"/></section>"#;
        let schema = SchemaIndex::from_strings(&cv(body), LOV, "<refs/>", Language::English).unwrap();
        assert_eq!(schema.field_by_id("f1").unwrap().data_type, DataType::Datetime);
    }

    #[test]
    fn test_malformed_document() {
        let err = SchemaIndex::from_strings("<cv>", LOV, "<refs/>", Language::English).unwrap_err();
        assert!(err.to_string().contains("cv definition"));
    }
}
