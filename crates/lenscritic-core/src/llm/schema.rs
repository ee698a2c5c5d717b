//! The critique response schema and post-parse validation.
//!
//! One field table drives the JSON Schema embedded in the prompt, the
//! Gemini `responseSchema`, and the check every provider response goes
//! through before it becomes a [`CritiqueResult`].

use serde_json::{json, Map, Value};

use crate::error::CritiqueError;
use crate::types::{CritiqueResult, Provider};

/// Primitive type of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    /// Score in [0, 100]
    Score,
    StringList,
}

/// Critique fields in output order.
pub const FIELDS: &[(&str, FieldKind)] = &[
    ("title", FieldKind::String),
    ("overallScore", FieldKind::Score),
    ("compositionScore", FieldKind::Score),
    ("lightingScore", FieldKind::Score),
    ("creativityScore", FieldKind::Score),
    ("technicalScore", FieldKind::Score),
    ("summary", FieldKind::String),
    ("strengths", FieldKind::StringList),
    ("weaknesses", FieldKind::StringList),
    ("improvements", FieldKind::StringList),
    ("technicalAnalysis", FieldKind::String),
    ("compositionAnalysis", FieldKind::String),
];

/// Fields a critique cannot be shown without.
pub const REQUIRED_FIELDS: &[&str] = &[
    "title",
    "overallScore",
    "summary",
    "strengths",
    "improvements",
];

/// JSON Schema (lowercase types) embedded in the prompt text.
pub fn prompt_schema() -> Value {
    build_schema("object", |kind| match kind {
        FieldKind::String => json!({ "type": "string" }),
        FieldKind::Score => json!({ "type": "number" }),
        FieldKind::StringList => json!({ "type": "array", "items": { "type": "string" } }),
    })
}

/// OpenAPI-style schema with Gemini's uppercase type names.
pub fn gemini_schema() -> Value {
    build_schema("OBJECT", |kind| match kind {
        FieldKind::String => json!({ "type": "STRING" }),
        FieldKind::Score => json!({ "type": "NUMBER" }),
        FieldKind::StringList => json!({ "type": "ARRAY", "items": { "type": "STRING" } }),
    })
}

fn build_schema(object_type: &str, field_schema: impl Fn(FieldKind) -> Value) -> Value {
    let properties: Map<String, Value> = FIELDS
        .iter()
        .map(|(name, kind)| (name.to_string(), field_schema(*kind)))
        .collect();
    json!({
        "type": object_type,
        "properties": properties,
        "required": REQUIRED_FIELDS,
    })
}

/// Names of fields that are missing (if required) or of the wrong shape.
///
/// `null` counts as absent. Scores must be finite numbers within [0, 100].
pub fn invalid_fields(object: &Map<String, Value>) -> Vec<String> {
    let mut invalid = Vec::new();
    for (name, kind) in FIELDS {
        let value = object.get(*name).filter(|v| !v.is_null());
        let ok = match value {
            None => !REQUIRED_FIELDS.contains(name),
            Some(value) => matches_kind(value, *kind),
        };
        if !ok {
            invalid.push(name.to_string());
        }
    }
    invalid
}

fn matches_kind(value: &Value, kind: FieldKind) -> bool {
    match kind {
        FieldKind::String => value.is_string(),
        FieldKind::Score => value
            .as_f64()
            .is_some_and(|score| score.is_finite() && (0.0..=100.0).contains(&score)),
        FieldKind::StringList => value
            .as_array()
            .is_some_and(|items| items.iter().all(Value::is_string)),
    }
}

/// Parse provider text as a critique and validate it against the schema.
pub fn parse_critique(provider: Provider, text: &str) -> Result<CritiqueResult, CritiqueError> {
    let value: Value = serde_json::from_str(text).map_err(|e| CritiqueError::Parse {
        provider,
        message: e.to_string(),
    })?;

    let Value::Object(mut object) = value else {
        return Err(CritiqueError::Parse {
            provider,
            message: "expected a JSON object".to_string(),
        });
    };

    let invalid = invalid_fields(&object);
    if !invalid.is_empty() {
        return Err(CritiqueError::InvalidResult {
            provider,
            fields: invalid,
        });
    }

    // Optional fields sent as null are treated as absent.
    object.retain(|_, v| !v.is_null());
    serde_json::from_value(Value::Object(object)).map_err(|e| CritiqueError::Parse {
        provider,
        message: e.to_string(),
    })
}
