//! Lenient model text → validated record conversion.
//!
//! Parsing is two-stage: the cleaned text is decoded into untyped JSON, then
//! the record is built field by field with empty-string defaults, after a
//! single check of the declared required fields.

use crate::error::SchemaError;
use once_cell::sync::Lazy;
use regex::Regex;
use schemars::JsonSchema;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

static THINK_BLOCK: Lazy<Regex> = Lazy::new(|| static_regex(r"(?s)<think>.*?</think>\s*"));
static LEADING_FENCE: Lazy<Regex> = Lazy::new(|| static_regex(r"(?i)^```(?:json)?\s*"));
static TRAILING_FENCE: Lazy<Regex> = Lazy::new(|| static_regex(r"\s*```$"));

// Patterns are literals exercised by this module's tests.
#[allow(clippy::expect_used)]
fn static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid static regex")
}

/// Strips reasoning blocks and markdown fences from raw model output.
#[must_use]
pub fn clean_model_output(raw: &str) -> String {
    let without_think = THINK_BLOCK.replace_all(raw, "");
    let trimmed = without_think.trim();
    let without_lead = LEADING_FENCE.replace(trimmed, "");
    let without_trail = TRAILING_FENCE.replace(without_lead.trim(), "");
    without_trail.trim().to_string()
}

/// Decodes cleaned model output into untyped JSON.
///
/// # Errors
///
/// Returns `SchemaError::InvalidJson` if the cleaned text does not decode.
pub fn decode_json(raw: &str) -> Result<Value, SchemaError> {
    let cleaned = clean_model_output(raw);
    serde_json::from_str(&cleaned).map_err(|e| SchemaError::invalid_json(e.to_string(), &cleaned))
}

/// Read access to one decoded JSON object with string coercion.
#[derive(Debug, Clone, Copy)]
pub struct FieldReader<'a> {
    object: &'a Map<String, Value>,
}

impl<'a> FieldReader<'a> {
    /// Wraps a decoded JSON object.
    #[must_use]
    pub const fn new(object: &'a Map<String, Value>) -> Self {
        Self { object }
    }

    /// Field value as text; absent and null fields read as `""`.
    #[must_use]
    pub fn text(&self, key: &str) -> String {
        self.object.get(key).map(coerce_text).unwrap_or_default()
    }

    /// Whether the field is present with a non-blank value.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        !self.text(key).trim().is_empty()
    }
}

/// Coerces any JSON value to the string a record stores.
///
/// Strings pass through, numbers and booleans are stringified, null is empty,
/// arrays and objects become compact JSON.
#[must_use]
pub fn coerce_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// A typed target record that model output is validated against.
pub trait RecordSchema: Serialize + JsonSchema + Sized {
    /// Record type name used in errors and logs.
    const NAME: &'static str;

    /// JSON keys that must be present and non-blank.
    const REQUIRED: &'static [&'static str];

    /// Builds the record from a validated object. Absent fields become `""`.
    fn from_fields(fields: &FieldReader<'_>) -> Self;

    /// JSON Schema of the record, for embedding into prompts.
    #[must_use]
    fn schema_json() -> Value {
        serde_json::to_value(schemars::schema_for!(Self)).unwrap_or_else(|_| Value::Object(Map::new()))
    }
}

/// A record produced from one spreadsheet row.
pub trait RowRecord: RecordSchema {
    /// Column holding the text sent to the model.
    const INPUT_COLUMN: &'static str;

    /// Extra columns carried through to the record without the model.
    const METADATA_COLUMNS: &'static [&'static str] = &[];

    /// Copies row-level data the model does not produce onto the record.
    fn attach_metadata(&mut self, _source_text: &str, _metadata: &BTreeMap<String, String>) {}

    /// Every column the input spreadsheet must contain.
    #[must_use]
    fn required_columns() -> Vec<&'static str> {
        std::iter::once(Self::INPUT_COLUMN)
            .chain(Self::METADATA_COLUMNS.iter().copied())
            .collect()
    }
}

/// Parses raw model output into a validated record.
///
/// # Errors
///
/// Returns `SchemaError::InvalidJson` when the cleaned text is not a JSON
/// object and `SchemaError::MissingRequiredField` when a required field is
/// absent or blank.
pub fn parse_record<T: RecordSchema>(raw: &str) -> Result<T, SchemaError> {
    let cleaned = clean_model_output(raw);
    let value: Value = serde_json::from_str(&cleaned)
        .map_err(|e| SchemaError::invalid_json(e.to_string(), &cleaned))?;

    let Value::Object(object) = value else {
        return Err(SchemaError::invalid_json(
            format!("expected a JSON object for {}", T::NAME),
            &cleaned,
        ));
    };

    let fields = FieldReader::new(&object);
    if let Some(field) = T::REQUIRED.iter().copied().find(|field| !fields.has(field)) {
        return Err(SchemaError::MissingRequiredField {
            record: T::NAME,
            field,
        });
    }

    Ok(T::from_fields(&fields))
}
