//! Test cases and their templated field values

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};

use super::HttpMethod;

/// Value of a templated field.
///
/// Generated cases describe what a field should hold
/// ("string - pick from an existing API response") instead of carrying a value.
/// Strings deserialize as placeholders; every other JSON value is concrete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum FieldValue {
    Placeholder(String),
    Concrete(serde_json::Value),
}

impl FieldValue {
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder(_))
    }

    /// JSON form; placeholders become their literal description text.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Placeholder(text) => serde_json::Value::String(text.clone()),
            Self::Concrete(value) => value.clone(),
        }
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(s) => Self::Placeholder(s),
            other => Self::Concrete(other),
        }
    }
}

/// Field name → templated value
pub type Fields = BTreeMap<String, FieldValue>;

/// Test category as produced by the case generator
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
    JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum TestType {
    #[serde(alias = "Positive")]
    Positive,
    #[serde(alias = "Negative")]
    Negative,
    #[serde(alias = "Edge")]
    Edge,
    #[serde(alias = "Schema")]
    Schema,
    #[serde(alias = "Auth")]
    Auth,
    #[default]
    #[serde(other)]
    Unknown,
}

impl TestType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Edge => "edge",
            Self::Schema => "schema",
            Self::Auth => "auth",
            Self::Unknown => "unknown",
        }
    }

    /// Guess a category from a test name ("login with invalid token" → negative).
    #[must_use]
    pub fn infer(test_name: &str) -> Self {
        let name = test_name.to_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| name.contains(w));
        // "invalid" contains "valid": negatives are checked first
        if has(&["negative", "invalid", "error", "fail"]) {
            Self::Negative
        } else if has(&["positive", "valid", "success"]) {
            Self::Positive
        } else if has(&["edge", "boundary", "limit"]) {
            Self::Edge
        } else if has(&["schema"]) {
            Self::Schema
        } else if has(&["auth", "token", "login", "permission"]) {
            Self::Auth
        } else {
            Self::Unknown
        }
    }

    /// Explicit type, or the one inferred from `test_name` when unknown.
    #[must_use]
    pub fn effective(self, test_name: &str) -> Self {
        match self {
            Self::Unknown => Self::infer(test_name),
            known => known,
        }
    }
}

impl std::fmt::Display for TestType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One executable, possibly templated request/expectation for an operation.
///
/// Never mutated once stored: the sequencer resolves a copy into a
/// [`ResolvedRequest`](super::ResolvedRequest).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TestCase {
    /// Assigned by the store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default)]
    pub endpoint_id: u64,
    pub test_name: String,
    #[serde(default)]
    pub test_type: TestType,
    pub method: HttpMethod,
    #[serde(default)]
    pub url: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    #[schemars(with = "Fields")]
    pub headers: Fields,
    #[serde(default, deserialize_with = "null_as_empty")]
    #[schemars(with = "Fields")]
    pub query_params: Fields,
    #[serde(default, deserialize_with = "null_as_empty")]
    #[schemars(with = "Fields")]
    pub path_params: Fields,
    #[serde(default, deserialize_with = "null_as_empty")]
    #[schemars(with = "Fields")]
    pub input_payload: Fields,
    #[serde(deserialize_with = "lenient_status")]
    #[schemars(with = "u16")]
    pub expected_status: u16,
    #[serde(default)]
    pub expected_schema: serde_json::Value,
}

impl TestCase {
    /// Category used for reporting.
    #[must_use]
    pub fn effective_type(&self) -> TestType {
        self.test_type.effective(&self.test_name)
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Fields, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Fields>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Accept `201`, `"201"` and `"201 Created"`.
fn lenient_status<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let value = serde_json::Value::deserialize(deserializer)?;
    let parsed = match &value {
        serde_json::Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
        serde_json::Value::String(s) => s
            .split_whitespace()
            .next()
            .and_then(|code| code.parse::<u16>().ok()),
        _ => None,
    };
    parsed
        .filter(|code| (100..600).contains(code))
        .ok_or_else(|| D::Error::custom(format!("invalid expected_status: {value}")))
}

/// How an endpoint's representative case is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exemplar {
    /// First stored case (setup step of a planned run)
    FirstStored,
    /// First `positive` case, else the first stored one (smoke flow)
    PreferPositive,
}

/// Pick the representative case of an endpoint from its stored cases.
#[must_use]
pub fn select_exemplar(cases: &[TestCase], rule: Exemplar) -> Option<&TestCase> {
    match rule {
        Exemplar::FirstStored => cases.first(),
        Exemplar::PreferPositive => cases
            .iter()
            .find(|c| c.test_type == TestType::Positive)
            .or_else(|| cases.first()),
    }
}
