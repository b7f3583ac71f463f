//! Untyped extraction items as a model returns them for a document chunk.

use crate::error::SchemaError;
use crate::schema::{coerce_text, decode_json};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const ATTRIBUTES_SUFFIX: &str = "_attributes";
const RESERVED_KEYS: &[&str] = &["attributes", "confidence", "span"];

/// Location of an extraction in the source document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    /// 1-based page the extraction was found on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,
    /// Character offset where the extraction starts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<usize>,
    /// Character offset where the extraction ends.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<usize>,
}

/// One labelled fact produced by a model call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawExtraction {
    /// Label such as `report_number` or `asset`.
    #[serde(rename = "extraction_class", alias = "class", default)]
    pub class: Option<String>,
    /// Source text the label was attached to.
    #[serde(rename = "extraction_text", alias = "text", default)]
    pub text: String,
    /// Free-form key/value details.
    #[serde(default)]
    pub attributes: Map<String, Value>,
    /// Model confidence; absent means unknown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Where the text was found, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

impl RawExtraction {
    /// Creates an extraction with a class and text and nothing else.
    #[must_use]
    pub fn new(class: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            class: Some(class.into()),
            text: text.into(),
            ..Self::default()
        }
    }

    /// Sets one attribute.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Sets the confidence.
    #[must_use]
    pub const fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Sets the page the extraction was found on, keeping any offsets.
    #[must_use]
    pub fn with_page(mut self, page: usize) -> Self {
        let mut span = self.span.unwrap_or_default();
        span.page = Some(page);
        self.span = Some(span);
        self
    }

    /// Page from the span, if known.
    #[must_use]
    pub fn page(&self) -> Option<usize> {
        self.span.and_then(|span| span.page)
    }

    /// Confidence used for ranking: absent or NaN counts as zero.
    #[must_use]
    pub fn rank(&self) -> f64 {
        self.confidence.filter(|c| !c.is_nan()).unwrap_or(0.0)
    }

    /// Class with surrounding whitespace removed, `None` when blank.
    #[must_use]
    pub fn class_label(&self) -> Option<&str> {
        self.class.as_deref().map(str::trim).filter(|c| !c.is_empty())
    }
}

/// Parses a model's list of extractions.
///
/// Accepts a top-level array or an object with an `extractions` array. Each
/// entry is either the explicit form (`extraction_class`, `extraction_text`,
/// `attributes`, `confidence`) or the compact form
/// `{"<class>": "<text>", "<class>_attributes": {...}}`. Entries that are not
/// objects are skipped.
///
/// # Errors
///
/// Returns `SchemaError::InvalidJson` if the text does not decode or has
/// neither accepted shape.
pub fn parse_extractions(raw: &str) -> Result<Vec<RawExtraction>, SchemaError> {
    let value = decode_json(raw)?;
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut object) => match object.remove("extractions") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(SchemaError::invalid_json(
                    "expected an array or an object with an 'extractions' array",
                    &Value::Object(object).to_string(),
                ))
            }
        },
        other => {
            return Err(SchemaError::invalid_json(
                "expected an array of extractions",
                &other.to_string(),
            ))
        }
    };

    let mut extractions = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::Object(object) => extractions.extend(from_object(object)),
            other => tracing::debug!(entry = %other, "skipping non-object extraction entry"),
        }
    }
    Ok(extractions)
}

fn from_object(object: Map<String, Value>) -> Vec<RawExtraction> {
    let explicit = ["extraction_class", "class", "extraction_text", "text"]
        .iter()
        .any(|key| object.contains_key(*key));

    if explicit {
        return serde_json::from_value(Value::Object(object.clone()))
            .map_or_else(|_| vec![lenient_explicit(&object)], |e| vec![e]);
    }

    compact_entries(&object)
}

// Field-by-field fallback for explicit entries whose values have the wrong
// JSON types (numeric text, string confidence).
fn lenient_explicit(object: &Map<String, Value>) -> RawExtraction {
    let pick = |a: &str, b: &str| object.get(a).or_else(|| object.get(b));
    RawExtraction {
        class: pick("extraction_class", "class")
            .map(coerce_text)
            .filter(|c| !c.is_empty()),
        text: pick("extraction_text", "text").map(coerce_text).unwrap_or_default(),
        attributes: match object.get("attributes") {
            Some(Value::Object(map)) => map.clone(),
            _ => Map::new(),
        },
        confidence: object.get("confidence").and_then(|c| match c {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }),
        span: None,
    }
}

fn compact_entries(object: &Map<String, Value>) -> Vec<RawExtraction> {
    object
        .iter()
        .filter(|(key, _)| !key.ends_with(ATTRIBUTES_SUFFIX) && !RESERVED_KEYS.contains(&key.as_str()))
        .map(|(class, text)| {
            let attributes = match object.get(&format!("{class}{ATTRIBUTES_SUFFIX}")) {
                Some(Value::Object(map)) => map.clone(),
                _ => Map::new(),
            };
            RawExtraction {
                class: Some(class.clone()),
                text: coerce_text(text),
                attributes,
                confidence: None,
                span: None,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_top_level_array() {
        let raw = r#"```json
[
  {"extraction_class": "report_number", "extraction_text": "湘华信估字[2024]第0815号", "confidence": 0.9},
  {"class": "asset", "text": "住宅", "attributes": {"owner": "李四", "total_price": "320万元"}}
]
```"#;
        let items = parse_extractions(raw).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].class_label(), Some("report_number"));
        assert!((items[0].rank() - 0.9).abs() < f64::EPSILON);
        assert_eq!(items[1].text, "住宅");
        assert_eq!(items[1].attributes["owner"], "李四");
        assert!(items[1].confidence.is_none());
    }

    #[test]
    fn test_parse_wrapped_object_skips_non_objects() {
        let raw = r#"{"extractions": [1, "noise", {"extraction_class": "bank", "extraction_text": "中国农业银行"}]}"#;
        let items = parse_extractions(raw).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].text, "中国农业银行");
    }

    #[test]
    fn test_parse_compact_form() {
        let raw = r#"{"extractions": [{"asset": "车位", "asset_attributes": {"owner": "王五"}}]}"#;
        let items = parse_extractions(raw).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].class_label(), Some("asset"));
        assert_eq!(items[0].text, "车位");
        assert_eq!(items[0].attributes["owner"], "王五");
    }

    #[test]
    fn test_parse_lenient_types() {
        let raw = r#"[{"extraction_class": "report_date", "extraction_text": 20240818, "confidence": "0.7"}]"#;
        let items = parse_extractions(raw).unwrap();
        assert_eq!(items[0].text, "20240818");
        assert_eq!(items[0].confidence, Some(0.7));
    }

    #[test]
    fn test_parse_rejects_scalar() {
        assert!(matches!(parse_extractions("42"), Err(SchemaError::InvalidJson { .. })));
        assert!(matches!(
            parse_extractions(r#"{"items": []}"#),
            Err(SchemaError::InvalidJson { .. })
        ));
    }

    #[test]
    fn test_rank_and_blank_class() {
        let nan = RawExtraction::new("  ", "x").with_confidence(f64::NAN);
        assert!(nan.rank().abs() < f64::EPSILON);
        assert_eq!(nan.class_label(), None);
        assert_eq!(RawExtraction::new("a", "x").with_page(3).page(), Some(3));
    }
}
