//! Project configuration for test runs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Project configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// OpenAPI / Swagger document (local file)
    pub spec: PathBuf,

    /// Base URL of the service under test
    pub base_url: String,

    /// Where operations and generated cases are kept
    #[serde(default = "default_store_dir")]
    pub store_dir: PathBuf,

    /// Where run reports are written
    #[serde(default = "default_report_dir")]
    pub report_dir: PathBuf,

    /// HTTP headers merged into every request (case headers win)
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    #[serde(default)]
    pub http: HttpSettings,

    #[serde(default)]
    pub oracle: OracleSettings,
}

/// Transport, retry and pacing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub timeout_secs: u64,
    /// Retries after the first attempt, for connection failures and timeouts only
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Pause between two executed plan items
    pub pacing_ms: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_retries: 3,
            base_delay_ms: 500,
            max_delay_ms: 8000,
            pacing_ms: 1000,
        }
    }
}

impl HttpSettings {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    #[must_use]
    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }
}

/// Text-generation service backing the case oracle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleSettings {
    pub endpoint: String,
    pub model: String,
    /// Environment variable holding the API key; the key itself is never stored
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-2.5-flash".to_string(),
            api_key_env: "GOOGLE_GENAI_API_KEY".to_string(),
            timeout_secs: 120,
        }
    }
}

impl OracleSettings {
    /// API key from the configured environment variable, if set and non-empty.
    #[must_use]
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }
}

fn default_store_dir() -> PathBuf {
    PathBuf::from(".specrun/store")
}

fn default_report_dir() -> PathBuf {
    PathBuf::from(".specrun/reports")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            spec: PathBuf::from("openapi.yaml"),
            base_url: "http://localhost:3000".to_string(),
            store_dir: default_store_dir(),
            report_dir: default_report_dir(),
            headers: BTreeMap::new(),
            http: HttpSettings::default(),
            oracle: OracleSettings::default(),
        }
    }
}

impl Config {
    /// Load config from file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e.to_string()))?;

        if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
        }
    }

    /// Load from default location (.specrun.toml)
    ///
    /// # Errors
    ///
    /// Returns error if a candidate file exists but cannot be read or parsed
    pub fn load_default() -> Result<Self, ConfigError> {
        let candidates = [".specrun.toml", ".specrun.json", "specrun.toml"];

        for name in candidates {
            let path = Path::new(name);
            if path.exists() {
                return Self::load(path);
            }
        }

        // No config file, return default
        Ok(Self::default())
    }

    /// Explicit path if given, otherwise the default candidates.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load(p),
            None => Self::load_default(),
        }
    }

    /// Create example config file
    #[must_use]
    pub fn example() -> &'static str {
        r#"# specrun configuration

# OpenAPI / Swagger document (JSON or YAML)
spec = "openapi.yaml"

# Service under test
base_url = "http://localhost:3000"

# Storage for operations and generated cases
store_dir = ".specrun/store"

# Run reports: {report_dir}/{host_port}_{timestamp}_{mode}/
report_dir = ".specrun/reports"

# Headers merged into every request (test case headers win)
[headers]
Accept = "application/json"
# X-Tenant = "acme"

[http]
timeout_secs = 30
max_retries = 3
base_delay_ms = 500
max_delay_ms = 8000
# Pause between test executions
pacing_ms = 1000

# Case generation / enrichment oracle
[oracle]
endpoint = "https://generativelanguage.googleapis.com"
model = "gemini-2.5-flash"
# Name of the environment variable holding the API key
api_key_env = "GOOGLE_GENAI_API_KEY"
timeout_secs = 120
"#
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read {0}: {1}")]
    Io(PathBuf, String),
    #[error("Parse error: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.base_url, "http://localhost:3000");
        assert_eq!(config.spec, PathBuf::from("openapi.yaml"));
        assert_eq!(config.http.max_retries, 3);
        assert_eq!(config.oracle.model, "gemini-2.5-flash");
    }

    #[test]
    fn parse_toml() {
        let toml = r#"
spec = "api.yaml"
base_url = "http://localhost:8000"

[headers]
X-Tenant = "acme"

[http]
max_retries = 1
pacing_ms = 0
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(config.spec, PathBuf::from("api.yaml"));
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.headers.get("X-Tenant"), Some(&"acme".to_string()));
        assert_eq!(config.http.max_retries, 1);
        assert_eq!(config.http.pacing(), Duration::ZERO);
        // unspecified keys keep their defaults
        assert_eq!(config.http.timeout_secs, 30);
        assert_eq!(config.http.base_delay_ms, 500);
        assert_eq!(config.store_dir, PathBuf::from(".specrun/store"));
        assert_eq!(config.oracle, OracleSettings::default());
    }

    #[test]
    fn example_parses() {
        let config: Config = toml::from_str(Config::example()).unwrap();
        assert_eq!(config.headers.get("Accept"), Some(&"application/json".to_string()));
        assert_eq!(config.http, HttpSettings::default());
        assert_eq!(config.oracle, OracleSettings::default());
    }

    #[test]
    fn load_json_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("specrun.json");
        std::fs::write(
            &path,
            r#"{"spec": "s.json", "base_url": "http://api.test", "oracle": {"model": "m"}}"#,
        )
        .unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.base_url, "http://api.test");
        assert_eq!(config.oracle.model, "m");
        assert_eq!(config.oracle.timeout_secs, 120);
    }

    #[test]
    fn load_missing_file() {
        let err = Config::load(Path::new("/nonexistent/.specrun.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_, _)));
    }

    #[test]
    fn api_key_from_env() {
        let settings = OracleSettings {
            api_key_env: "SPECRUN_TEST_KEY_THAT_IS_NOT_SET".into(),
            ..OracleSettings::default()
        };
        assert_eq!(settings.api_key(), None);
    }
}
