//! Response validation: exact status match, then JSON Schema conformance

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::model::{ResponseBody, ResponseOutcome};

/// Upper bound on collected schema violations per response.
const MAX_SCHEMA_ERRORS: usize = 20;

/// Keywords that mark a value as an actual JSON Schema.
const SCHEMA_KEYWORDS: &[&str] = &[
    "$schema",
    "$ref",
    "type",
    "properties",
    "required",
    "items",
    "additionalProperties",
    "patternProperties",
    "enum",
    "const",
    "oneOf",
    "anyOf",
    "allOf",
    "not",
    "minimum",
    "maximum",
    "minLength",
    "maxLength",
    "minItems",
    "maxItems",
    "pattern",
    "format",
];

const JSON_TYPES: &[&str] = &[
    "object", "array", "string", "number", "integer", "boolean", "null",
];

/// Status comparison
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StatusCheck {
    pub expected: u16,
    pub actual: Option<u16>,
    pub matched: bool,
}

/// Schema conformance result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SchemaCheck {
    Passed,
    Failed { errors: Vec<String> },
    Skipped { reason: String },
}

impl SchemaCheck {
    fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Outcome of validating one response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Validation {
    pub passed: bool,
    pub status: StatusCheck,
    pub schema: SchemaCheck,
}

impl Validation {
    /// One-line human summary, e.g.
    /// "expected 201, got 500 (schema skipped due to status mismatch)".
    #[must_use]
    pub fn summary(&self) -> String {
        let actual = self
            .status
            .actual
            .map_or_else(|| "no response".to_string(), |s| s.to_string());
        let status = if self.status.matched {
            format!("status {actual} as expected")
        } else {
            format!("expected {}, got {actual}", self.status.expected)
        };
        match &self.schema {
            SchemaCheck::Passed => format!("{status}, schema ok"),
            SchemaCheck::Failed { errors } => {
                format!("{status}, schema violations: {}", errors.join("; "))
            }
            SchemaCheck::Skipped { reason } => format!("{status} (schema {reason})"),
        }
    }
}

/// Validate an outcome against the expected status and optional schema.
///
/// The status must match exactly. The schema is only checked when it did, and
/// only when `expected_schema` is a real JSON Schema; descriptive values such
/// as `{"id": "integer"}` are skipped with a reason.
#[must_use]
pub fn validate(
    outcome: &ResponseOutcome,
    expected_status: u16,
    expected_schema: &serde_json::Value,
) -> Validation {
    let status = StatusCheck {
        expected: expected_status,
        actual: outcome.status_code,
        matched: outcome.status_code == Some(expected_status),
    };

    if outcome.status_code.is_none() {
        return Validation {
            passed: false,
            status,
            schema: SchemaCheck::skipped("skipped: no response received"),
        };
    }
    if !status.matched {
        return Validation {
            passed: false,
            status,
            schema: SchemaCheck::skipped("skipped due to status mismatch"),
        };
    }

    let schema = check_schema(&outcome.body, expected_schema);
    Validation {
        passed: !schema.is_failed(),
        status,
        schema,
    }
}

fn check_schema(body: &ResponseBody, schema: &serde_json::Value) -> SchemaCheck {
    if is_empty_schema(schema) {
        return SchemaCheck::skipped("skipped: no schema expected");
    }
    if !looks_like_schema(schema) {
        return SchemaCheck::skipped("skipped: expected_schema is descriptive, not a JSON Schema");
    }
    let validator = match jsonschema::validator_for(schema) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "invalid expected_schema");
            return SchemaCheck::skipped(format!("skipped: invalid schema ({e})"));
        }
    };
    let instance = match body {
        ResponseBody::Json(value) => value,
        ResponseBody::Empty => {
            return SchemaCheck::Failed {
                errors: vec!["Expected JSON matching schema, got empty body".into()],
            };
        }
        ResponseBody::Text(text) => {
            let head: String = text.chars().take(200).collect();
            return SchemaCheck::Failed {
                errors: vec![format!("Expected JSON matching schema, got: {head}")],
            };
        }
    };
    let errors: Vec<String> = validator
        .iter_errors(instance)
        .take(MAX_SCHEMA_ERRORS)
        .map(|e| e.to_string())
        .collect();
    if errors.is_empty() {
        SchemaCheck::Passed
    } else {
        SchemaCheck::Failed { errors }
    }
}

fn is_empty_schema(schema: &serde_json::Value) -> bool {
    match schema {
        serde_json::Value::Null | serde_json::Value::Bool(true) => true,
        serde_json::Value::Object(map) => map.is_empty(),
        serde_json::Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Whether `value` reads as a JSON Schema rather than a prose description.
fn looks_like_schema(value: &serde_json::Value) -> bool {
    let Some(map) = value.as_object() else {
        return false;
    };
    if !map.keys().any(|k| SCHEMA_KEYWORDS.contains(&k.as_str())) {
        return false;
    }
    // {"type": "a user object"} or {"type": {...}} describe a field named "type"
    match map.get("type") {
        None => true,
        Some(serde_json::Value::String(t)) => JSON_TYPES.contains(&t.as_str()),
        Some(serde_json::Value::Array(ts)) => ts
            .iter()
            .all(|t| t.as_str().is_some_and(|t| JSON_TYPES.contains(&t))),
        Some(_) => false,
    }
}
