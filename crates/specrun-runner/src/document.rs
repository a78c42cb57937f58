//! Interface document loading (OpenAPI 3.x / Swagger 2.0, JSON or YAML)

use std::path::Path;

/// Read and parse an interface document.
///
/// # Errors
///
/// Returns error if the file cannot be read or is neither JSON nor YAML.
pub fn load_document(path: &Path) -> Result<serde_json::Value, RunnerError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| RunnerError::Io(format!("{}: {e}", path.display())))?;
    let doc = parse_spec(path, &content)?;
    if !doc.is_object() {
        return Err(RunnerError::Parse(format!(
            "{}: document root is not an object",
            path.display()
        )));
    }
    Ok(doc)
}

/// Parse a spec document from JSON or YAML.
///
/// Detection strategy: try extension first (`.yaml`/`.yml`/`.json`), then fall
/// back to content sniffing (leading `{` → JSON, otherwise YAML).
///
/// # Errors
///
/// Returns error if the content does not parse in the detected format.
pub fn parse_spec(path: &Path, content: &str) -> Result<serde_json::Value, RunnerError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "yaml" | "yml" => parse_yaml(content),
        "json" => parse_json(content),
        _ => {
            if content.trim_start().starts_with('{') {
                parse_json(content)
            } else {
                parse_yaml(content)
            }
        }
    }
}

fn parse_json(content: &str) -> Result<serde_json::Value, RunnerError> {
    serde_json::from_str(content).map_err(|e| RunnerError::Parse(format!("Invalid JSON: {e}")))
}

fn parse_yaml(content: &str) -> Result<serde_json::Value, RunnerError> {
    serde_yml::from_str(content).map_err(|e| RunnerError::Parse(format!("Invalid YAML: {e}")))
}

#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("HTTP error: {0}")]
    Http(String),
}
