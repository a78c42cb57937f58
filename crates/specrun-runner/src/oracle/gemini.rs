//! Gemini `generateContent` REST client

use std::time::Duration;

use serde_json::{Value, json};

use specrun_core::OracleSettings;

use super::{OracleError, TextGenerator};

pub struct GeminiGenerator {
    client: reqwest::blocking::Client,
    url: String,
    api_key: String,
}

impl GeminiGenerator {
    /// # Errors
    ///
    /// Returns error if the API key variable is unset or the HTTP client
    /// cannot be built.
    pub fn from_settings(settings: &OracleSettings) -> Result<Self, OracleError> {
        let api_key = settings
            .api_key()
            .ok_or_else(|| OracleError::MissingKey(settings.api_key_env.clone()))?;
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| OracleError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            url: generate_url(&settings.endpoint, &settings.model),
            api_key,
        })
    }
}

fn generate_url(endpoint: &str, model: &str) -> String {
    format!(
        "{}/v1beta/models/{model}:generateContent",
        endpoint.trim_end_matches('/')
    )
}

impl TextGenerator for GeminiGenerator {
    fn generate(&self, prompt: &str) -> Result<String, OracleError> {
        let body = json!({"contents": [{"parts": [{"text": prompt}]}]});
        let resp = self
            .client
            .post(&self.url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .map_err(|e| OracleError::Transport(e.to_string()))?;

        let status = resp.status();
        let text = resp
            .text()
            .map_err(|e| OracleError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(OracleError::Status(status.as_u16(), truncate(&text, 200)));
        }
        let value: Value =
            serde_json::from_str(&text).map_err(|e| OracleError::Transport(e.to_string()))?;
        candidate_text(&value).ok_or(OracleError::Empty)
    }
}

/// Concatenated text parts of the first candidate.
fn candidate_text(response: &Value) -> Option<String> {
    let parts = response
        .pointer("/candidates/0/content/parts")?
        .as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect();
    (!text.trim().is_empty()).then_some(text)
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((i, _)) => format!("{}…", &s[..i]),
        None => s.to_string(),
    }
}
