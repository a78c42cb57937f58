//! Concrete requests, their outcomes, and history records

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::HttpMethod;

/// A request with every placeholder substituted, ready to send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ResolvedRequest {
    pub url: String,
    pub method: HttpMethod,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub query_params: BTreeMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl ResolvedRequest {
    #[must_use]
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            headers: BTreeMap::new(),
            query_params: BTreeMap::new(),
            payload: None,
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// Response body: parsed JSON, or the raw text when it is not JSON.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ResponseBody {
    #[default]
    Empty,
    Json(serde_json::Value),
    Text(String),
}

impl ResponseBody {
    /// Parse raw bytes: empty → `Empty`, valid JSON → `Json`, else `Text`.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Self::Empty;
        }
        match serde_json::from_slice(bytes) {
            Ok(value) => Self::Json(value),
            Err(_) => Self::Text(String::from_utf8_lossy(bytes).into_owned()),
        }
    }

    #[must_use]
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Empty => serde_json::Value::Null,
            Self::Json(value) => value.clone(),
            Self::Text(text) => serde_json::Value::String(text.clone()),
        }
    }
}

/// What came back from one execution, including failed transports.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct ResponseOutcome {
    /// `None` when no response was received
    pub status_code: Option<u16>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: ResponseBody,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub elapsed_ms: u64,
    /// Status in `[200, 300)`
    pub success: bool,
    pub attempts: u32,
}

impl ResponseOutcome {
    #[must_use]
    pub fn from_status(
        status: u16,
        headers: BTreeMap<String, String>,
        body: ResponseBody,
        elapsed_ms: u64,
        attempts: u32,
    ) -> Self {
        Self {
            status_code: Some(status),
            headers,
            body,
            error: None,
            elapsed_ms,
            success: (200..300).contains(&status),
            attempts,
        }
    }

    #[must_use]
    pub fn from_error(error: impl Into<String>, elapsed_ms: u64, attempts: u32) -> Self {
        Self {
            status_code: None,
            headers: BTreeMap::new(),
            body: ResponseBody::Empty,
            error: Some(error.into()),
            elapsed_ms,
            success: false,
            attempts,
        }
    }

    /// No response was received. A status outcome may still carry an
    /// `error` note, e.g. when its body could not be read.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.status_code.is_none()
    }
}

/// One history entry: what was sent and what came back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExecutionRecord {
    pub request: ResolvedRequest,
    pub response: ResponseOutcome,
}
