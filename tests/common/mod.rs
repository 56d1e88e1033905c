//! Shared fixtures for integration tests

#![allow(dead_code)]

use canadianccv::{Config, ContentModel, Language, SchemaIndex, SchemaSources};
use canadianccv::loaders::Loader;
use chrono::NaiveDateTime;
use std::path::PathBuf;
use std::sync::Arc;

pub fn fixtures_dir() -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path
}

pub fn schema() -> Arc<SchemaIndex> {
    let sources = SchemaSources::from_dir(fixtures_dir());
    Arc::new(SchemaIndex::load(&sources, Language::English, &Loader::new()).expect("fixture schema should load"))
}

pub fn model() -> ContentModel {
    ContentModel::new(schema(), Config::default())
}

pub fn timestamp() -> NaiveDateTime {
    NaiveDateTime::parse_from_str("2024-05-01 09:30:00", "%Y-%m-%d %H:%M:%S").unwrap()
}

/// Parse a YAML snippet into a raw record
pub fn record(yaml: &str) -> serde_json::Map<String, serde_json::Value> {
    match serde_yaml::from_str::<serde_json::Value>(yaml).expect("valid yaml") {
        serde_json::Value::Object(map) => map,
        other => panic!("expected a mapping, got {}", other),
    }
}
