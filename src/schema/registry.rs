//! Embedded JSON Schema documents
//!
//! Schemas live in `schemas/<name>.schema.json` and are compiled into the
//! binary. A workspace cannot override them: stored records must always be
//! checked against the rules this build was written for.

use rust_embed::Embed;
use std::collections::BTreeMap;

#[derive(Embed)]
#[folder = "schemas/"]
struct EmbeddedSchemas;

const SUFFIX: &str = ".schema.json";

/// Registry of schema documents keyed by name (`diagnostic`, `project`, ...)
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    schemas: BTreeMap<String, String>,
}

impl SchemaRegistry {
    /// Get the raw schema text for a name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.schemas.get(name).map(String::as_str)
    }

    /// Get a schema parsed as JSON
    pub fn get_json(&self, name: &str) -> Option<serde_json::Value> {
        let raw = self.get(name)?;
        match serde_json::from_str(raw) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::error!(schema = name, error = %e, "embedded schema is not valid JSON");
                None
            }
        }
    }

    pub fn has_schema(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    /// Names of all registered schemas, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        let mut schemas = BTreeMap::new();
        for file in EmbeddedSchemas::iter() {
            let filename = file.as_ref();
            let Some(name) = filename.strip_suffix(SUFFIX) else {
                continue;
            };
            if let Some(content) = EmbeddedSchemas::get(filename) {
                if let Ok(text) = std::str::from_utf8(&content.data) {
                    schemas.insert(name.to_string(), text.to_string());
                }
            }
        }
        Self { schemas }
    }
}
