//! Schema validation with field-level and source-located error reporting
//!
//! Two kinds of results come out of here:
//! - [`FieldErrors`]: `field -> message`, used by the wizard to show a
//!   message next to each offending field.
//! - [`ValidationError`]: a miette diagnostic pointing into a YAML/JSON
//!   document, used when whole files are checked (`--file`, imports).

use jsonschema::{error::ValidationErrorKind, validator_for, ValidationError as JsonSchemaError};
use miette::{Diagnostic, NamedSource, SourceSpan};
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

use crate::schema::registry::SchemaRegistry;

/// Field name -> first error message for that field
pub type FieldErrors = BTreeMap<String, String>;

/// Key used in [`FieldErrors`] for errors not attributable to a single field
pub const ROOT_FIELD: &str = "_root";

/// Document validation error with source location information
#[derive(Debug, Error, Diagnostic)]
#[error("Schema validation failed: {summary}")]
#[diagnostic(code(agency::schema::validation_error))]
pub struct ValidationError {
    summary: String,

    #[source_code]
    src: NamedSource<String>,

    #[related]
    violations: Vec<SchemaViolation>,
}

/// A single schema violation
#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
pub struct SchemaViolation {
    #[label("{}", self.hint)]
    span: SourceSpan,

    message: String,
    hint: String,

    #[help]
    help: Option<String>,
}

impl SchemaViolation {
    pub fn new(message: String, hint: String, span: SourceSpan, help: Option<String>) -> Self {
        Self {
            span,
            message,
            hint,
            help,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl ValidationError {
    pub fn new(filename: &str, source: &str, violations: Vec<SchemaViolation>) -> Self {
        let count = violations.len();
        let summary = if count == 1 {
            "1 error".to_string()
        } else {
            format!("{} errors", count)
        };
        Self {
            summary,
            src: NamedSource::new(filename, source.to_string()),
            violations,
        }
    }

    pub fn violation_count(&self) -> usize {
        self.violations.len()
    }

    pub fn violations(&self) -> &[SchemaViolation] {
        &self.violations
    }
}

/// Errors raised while preparing a schema (not while checking a value)
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("no schema named '{0}'")]
    Unknown(String),

    #[error("schema '{name}' failed to compile: {message}")]
    Compile { name: String, message: String },
}

/// A compiled schema, possibly restricted to a subset of fields
pub struct CompiledSchema {
    inner: jsonschema::Validator,
}

impl CompiledSchema {
    pub fn compile(name: &str, schema: &JsonValue) -> Result<Self, SchemaError> {
        let inner = validator_for(schema).map_err(|e| SchemaError::Compile {
            name: name.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self { inner })
    }

    /// Check a value, collecting the first message for each failing field
    pub fn check(&self, value: &JsonValue) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        for error in self.inner.iter_errors(value) {
            let field = field_of(&error);
            errors
                .entry(field)
                .or_insert_with(|| field_message(&error));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub fn is_valid(&self, value: &JsonValue) -> bool {
        self.inner.is_valid(value)
    }
}

/// Build a schema that only checks the given top-level fields.
///
/// Keeps the `properties` entries and `required` names of the subset and
/// drops `additionalProperties`, so the rest of the record is ignored.
pub fn subset_schema(schema: &JsonValue, fields: &[&str]) -> JsonValue {
    let mut properties = serde_json::Map::new();
    if let Some(props) = schema.get("properties").and_then(|p| p.as_object()) {
        for field in fields {
            if let Some(prop) = props.get(*field) {
                properties.insert((*field).to_string(), prop.clone());
            }
        }
    }

    let required: Vec<JsonValue> = schema
        .get("required")
        .and_then(|r| r.as_array())
        .map(|arr| {
            arr.iter()
                .filter(|v| v.as_str().is_some_and(|name| fields.contains(&name)))
                .cloned()
                .collect()
        })
        .unwrap_or_default();

    let mut subset = serde_json::Map::new();
    if let Some(draft) = schema.get("$schema") {
        subset.insert("$schema".to_string(), draft.clone());
    }
    subset.insert("type".to_string(), JsonValue::String("object".to_string()));
    subset.insert("properties".to_string(), JsonValue::Object(properties));
    subset.insert("required".to_string(), JsonValue::Array(required));
    JsonValue::Object(subset)
}

/// Schema validator with compiled schemas
pub struct Validator {
    registry: SchemaRegistry,
    compiled: HashMap<String, CompiledSchema>,
}

impl Validator {
    /// Create a new validator with every schema from the registry compiled
    pub fn new(registry: &SchemaRegistry) -> Self {
        let mut compiled = HashMap::new();
        for name in registry.names() {
            if let Some(schema_json) = registry.get_json(name) {
                match CompiledSchema::compile(name, &schema_json) {
                    Ok(schema) => {
                        compiled.insert(name.to_string(), schema);
                    }
                    Err(e) => tracing::error!(error = %e, "skipping schema"),
                }
            }
        }
        Self {
            registry: registry.clone(),
            compiled,
        }
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Validate a whole value against a named schema
    pub fn validate_value(&self, schema: &str, value: &JsonValue) -> Result<(), FieldErrors> {
        match self.compiled.get(schema) {
            Some(compiled) => compiled.check(value),
            None => {
                let mut errors = FieldErrors::new();
                errors.insert(ROOT_FIELD.to_string(), format!("no schema named '{}'", schema));
                Err(errors)
            }
        }
    }

    /// Compile a validator that only checks `fields` of a named schema
    pub fn compile_subset(&self, schema: &str, fields: &[&str]) -> Result<CompiledSchema, SchemaError> {
        let full = self
            .registry
            .get_json(schema)
            .ok_or_else(|| SchemaError::Unknown(schema.to_string()))?;
        CompiledSchema::compile(schema, &subset_schema(&full, fields))
    }

    /// Parse a YAML or JSON document and validate it, returning the parsed value
    pub fn validate_document(
        &self,
        content: &str,
        filename: &str,
        schema: &str,
    ) -> Result<JsonValue, ValidationError> {
        // JSON documents are valid YAML, so one parser covers both
        let yaml_value: serde_yml::Value = match serde_yml::from_str(content) {
            Ok(v) => v,
            Err(e) => {
                let span = find_error_span(content, e.location());
                let violation = SchemaViolation::new(
                    format!("parse error: {}", e),
                    "invalid document".to_string(),
                    span,
                    Some("Check syntax - indentation, colons, quotes and brackets".to_string()),
                );
                return Err(ValidationError::new(filename, content, vec![violation]));
            }
        };

        let json_value: JsonValue = match serde_json::to_value(&yaml_value) {
            Ok(v) => v,
            Err(e) => {
                let violation = SchemaViolation::new(
                    format!("Failed to convert document to JSON: {}", e),
                    "conversion error".to_string(),
                    (0, content.len()).into(),
                    None,
                );
                return Err(ValidationError::new(filename, content, vec![violation]));
            }
        };

        let Some(compiled) = self.compiled.get(schema) else {
            let violation = SchemaViolation::new(
                format!("no schema named '{}'", schema),
                "unknown schema".to_string(),
                (0, 0).into(),
                None,
            );
            return Err(ValidationError::new(filename, content, vec![violation]));
        };

        let violations: Vec<SchemaViolation> = compiled
            .inner
            .iter_errors(&json_value)
            .map(|e| error_to_violation(content, &e))
            .collect();

        if violations.is_empty() {
            Ok(json_value)
        } else {
            Err(ValidationError::new(filename, content, violations))
        }
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(&SchemaRegistry::default())
    }
}

/// Top-level field an error belongs to
fn field_of(error: &JsonSchemaError) -> String {
    if let ValidationErrorKind::Required { property } = &error.kind {
        let path = error.instance_path.to_string();
        // Required errors on nested objects belong to the enclosing top-level field
        if let Some(first) = path.split('/').find(|s| !s.is_empty()) {
            return first.to_string();
        }
        return property
            .as_str()
            .map(String::from)
            .unwrap_or_else(|| property.to_string());
    }

    error
        .instance_path
        .to_string()
        .split('/')
        .find(|s| !s.is_empty())
        .map(String::from)
        .unwrap_or_else(|| ROOT_FIELD.to_string())
}

/// Short message shown next to a field
fn field_message(error: &JsonSchemaError) -> String {
    match &error.kind {
        ValidationErrorKind::Required { .. } => "This field is required".to_string(),
        ValidationErrorKind::MinLength { limit } if *limit <= 1 => {
            "This field is required".to_string()
        }
        ValidationErrorKind::MinLength { limit } => {
            format!("Must be at least {} characters", limit)
        }
        ValidationErrorKind::MaxLength { limit } => {
            format!("Must be at most {} characters", limit)
        }
        ValidationErrorKind::MinItems { limit } if *limit == 1 => {
            "Choose at least one option".to_string()
        }
        ValidationErrorKind::MinItems { limit } => format!("Choose at least {} options", limit),
        ValidationErrorKind::MaxItems { limit } => format!("Choose at most {} options", limit),
        ValidationErrorKind::UniqueItems => "Options must not repeat".to_string(),
        ValidationErrorKind::Enum { options } => {
            format!("Must be one of: {}", format_enum_options(options))
        }
        ValidationErrorKind::Pattern { .. } => "Invalid format".to_string(),
        ValidationErrorKind::Minimum { limit } => format!("Must be at least {}", limit),
        ValidationErrorKind::Maximum { limit } => format!("Must be at most {}", limit),
        ValidationErrorKind::Type { kind } => format!("Wrong type: expected {:?}", kind),
        ValidationErrorKind::AdditionalProperties { unexpected } => {
            format!("Unknown field(s): {}", unexpected.join(", "))
        }
        _ => error.to_string(),
    }
}

fn error_to_violation(content: &str, error: &JsonSchemaError) -> SchemaViolation {
    let path = error.instance_path.to_string();
    let message = format_schema_error(error);
    let hint = format_error_hint(error);
    let help = generate_help_message(error);
    let span = find_path_span(content, &path);

    SchemaViolation::new(message, hint, span, help)
}

/// Format a JSON Schema error into a document-level message
fn format_schema_error(error: &JsonSchemaError) -> String {
    let path = if error.instance_path.to_string().is_empty() {
        "document root".to_string()
    } else {
        format!("'{}'", error.instance_path)
    };

    match &error.kind {
        ValidationErrorKind::Required { property } => {
            let prop_str = property
                .as_str()
                .map(|s| s.to_string())
                .unwrap_or_else(|| property.to_string());
            format!("Missing required field: {} at {}", prop_str, path)
        }
        _ => format!("{} at {}", field_message(error), path),
    }
}

fn format_enum_options(options: &JsonValue) -> String {
    if let Some(arr) = options.as_array() {
        arr.iter()
            .map(|v| v.as_str().map(|s| s.to_string()).unwrap_or_else(|| v.to_string()))
            .collect::<Vec<_>>()
            .join(", ")
    } else {
        options.to_string()
    }
}

/// Short hint for the error label
fn format_error_hint(error: &JsonSchemaError) -> String {
    match &error.kind {
        ValidationErrorKind::Required { .. } => "required field missing".to_string(),
        ValidationErrorKind::Type { .. } => "wrong type".to_string(),
        ValidationErrorKind::Enum { .. } => "invalid value".to_string(),
        ValidationErrorKind::Pattern { .. } => "pattern mismatch".to_string(),
        ValidationErrorKind::MinLength { .. } => "too short".to_string(),
        ValidationErrorKind::MaxLength { .. } => "too long".to_string(),
        ValidationErrorKind::MaxItems { .. } => "too many options".to_string(),
        ValidationErrorKind::AdditionalProperties { .. } => "unknown field".to_string(),
        _ => "validation error".to_string(),
    }
}

fn generate_help_message(error: &JsonSchemaError) -> Option<String> {
    match &error.kind {
        ValidationErrorKind::Required { property } => {
            let prop_str = property
                .as_str()
                .map(|s| s.to_string())
                .unwrap_or_else(|| property.to_string());
            Some(format!("Add the '{}' field to your file", prop_str))
        }
        ValidationErrorKind::Enum { options } => {
            Some(format!("Valid values: {}", format_enum_options(options)))
        }
        ValidationErrorKind::Pattern { pattern } => {
            if pattern.contains("PRJ-") {
                Some("ID format: PRJ-[26 ULID characters]".to_string())
            } else if pattern.contains("[0-9]{4}-") {
                Some("Dates use the YYYY-MM-DD format".to_string())
            } else if pattern.contains("[0-9]{6,12}") {
                Some("NIT must be 6 to 12 digits, without dots or check digit".to_string())
            } else {
                None
            }
        }
        ValidationErrorKind::AdditionalProperties { unexpected } => {
            if unexpected.len() == 1 {
                Some(format!("Remove the '{}' field or check spelling", unexpected[0]))
            } else {
                Some("Remove unknown fields or check spelling".to_string())
            }
        }
        _ => None,
    }
}

/// Find the span (byte offset, length) for a parser error location
fn find_error_span(content: &str, location: Option<serde_yml::Location>) -> SourceSpan {
    if let Some(loc) = location {
        let line = loc.line().saturating_sub(1);
        let column = loc.column().saturating_sub(1);

        let mut offset = 0;
        for (i, line_content) in content.lines().enumerate() {
            if i == line {
                // Parser columns count characters, offsets count bytes
                offset += line_content
                    .char_indices()
                    .nth(column)
                    .map_or(line_content.len(), |(byte, _)| byte);
                break;
            }
            offset += line_content.len() + 1;
        }

        let mut offset = offset.min(content.len());
        while !content.is_char_boundary(offset) {
            offset -= 1;
        }
        let rest_of_content = &content[offset..];
        let len = rest_of_content
            .find('\n')
            .unwrap_or(rest_of_content.len())
            .max(1);

        (offset, len).into()
    } else {
        first_line_span(content)
    }
}

fn first_line_span(content: &str) -> SourceSpan {
    let len = content.find('\n').unwrap_or(content.len()).max(1);
    (0, len).into()
}

/// Find the span for a JSON pointer path in YAML or JSON content
fn find_path_span(content: &str, json_path: &str) -> SourceSpan {
    let parts: Vec<&str> = json_path.split('/').filter(|s| !s.is_empty()).collect();

    let Some(last) = parts.last() else {
        return first_line_span(content);
    };

    // Array index: point at the parent key
    if last.parse::<usize>().is_ok() && parts.len() >= 2 {
        if let Some(span) = find_key_span(content, parts[parts.len() - 2]) {
            return span;
        }
    }

    find_key_span(content, last).unwrap_or_else(|| first_line_span(content))
}

/// Find the line holding `key:` (YAML) or `"key":` (JSON)
fn find_key_span(content: &str, key: &str) -> Option<SourceSpan> {
    let yaml_pattern = format!("{}:", key);
    let json_pattern = format!("\"{}\"", key);

    let mut offset = 0;
    for line in content.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with(&yaml_pattern) || trimmed.starts_with(&json_pattern) {
            let indent = line.len() - trimmed.len();
            return Some((offset + indent, trimmed.len()).into());
        }
        offset += line.len() + 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validator_compiles_all_schemas() {
        let validator = Validator::default();
        for name in ["diagnostic", "quick", "project", "brief", "quote"] {
            assert!(validator.compiled.contains_key(name), "{} not compiled", name);
        }
    }

    #[test]
    fn test_subset_only_checks_named_fields() {
        let validator = Validator::default();
        let contact = validator
            .compile_subset("quick", &["name", "email"])
            .unwrap();

        // Other required fields are missing but not part of the subset
        let value = json!({ "name": "Laura Gómez", "email": "laura@example.com" });
        assert!(contact.check(&value).is_ok());

        let bad = json!({ "name": "L", "email": "not-an-email" });
        let errors = contact.check(&bad).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors["name"].contains("at least 2"));
        assert_eq!(errors["email"], "Invalid format");
    }

    #[test]
    fn test_missing_field_reported_by_name() {
        let validator = Validator::default();
        let subset = validator.compile_subset("quick", &["company"]).unwrap();
        let errors = subset.check(&json!({})).unwrap_err();
        assert_eq!(errors["company"], "This field is required");
    }

    #[test]
    fn test_array_item_error_maps_to_field() {
        let validator = Validator::default();
        let subset = validator.compile_subset("quick", &["main_goals"]).unwrap();

        let errors = subset
            .check(&json!({ "main_goals": ["sales", "world_domination"] }))
            .unwrap_err();
        assert!(errors["main_goals"].starts_with("Must be one of"));

        let errors = subset
            .check(&json!({ "main_goals": ["sales", "leads", "loyalty", "launch"] }))
            .unwrap_err();
        assert_eq!(errors["main_goals"], "Choose at most 3 options");
    }

    #[test]
    fn test_unknown_schema_is_root_error() {
        let validator = Validator::default();
        let errors = validator.validate_value("invoice", &json!({})).unwrap_err();
        assert!(errors.contains_key(ROOT_FIELD));
    }

    #[test]
    fn test_validate_document_reports_spans() {
        let validator = Validator::default();
        let yaml = "client: Café La 14\nitems:\n  - description: Logo\n    quantity: -1\n    price: 100\n";
        let err = validator
            .validate_document(yaml, "quote.yaml", "quote")
            .unwrap_err();
        assert_eq!(err.violation_count(), 1);
        assert!(err.violations()[0].message().contains("at least 0"));
    }

    #[test]
    fn test_validate_document_accepts_json() {
        let validator = Validator::default();
        let doc = r#"{"client": "Café La 14", "items": [{"description": "Logo", "quantity": 1, "price": 900000}]}"#;
        let value = validator.validate_document(doc, "quote.json", "quote").unwrap();
        assert_eq!(value["client"], "Café La 14");
    }

    #[test]
    fn test_validate_document_parse_error() {
        let validator = Validator::default();
        let err = validator
            .validate_document("client: [unterminated", "q.yaml", "quote")
            .unwrap_err();
        assert!(err.violations()[0].message().starts_with("parse error"));
    }

    #[test]
    fn test_parse_error_after_multibyte_text() {
        let validator = Validator::default();
        for doc in ["client: ñ: x\n", "notes: ñññ: a\n", "client: Diseño: logo\n"] {
            assert!(validator.validate_document(doc, "q.yaml", "quote").is_err());
        }
    }

    #[test]
    fn test_error_span_counts_characters_as_bytes() {
        let content = "client: ñañ: x\n";
        let location = serde_yml::from_str::<serde_yml::Value>(content)
            .unwrap_err()
            .location();
        let span = find_error_span(content, location);
        assert!(content.is_char_boundary(span.offset()));
        assert!(span.offset() <= content.len());
    }
}
