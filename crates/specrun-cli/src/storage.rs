//! Persistent report storage under `report_dir`
//!
//! Every `run` and `smoke` is saved regardless of `--output` mode.
//! Directory layout: `{host_port}_{timestamp}_{mode}/`

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use specrun_core::clock::timestamp_compact;
use specrun_core::{Config, SuiteReport};

/// Save `report` to `{report_dir}/{host_port}_{timestamp}_{mode}/`.
///
/// Writes `report.json`, `report.txt` (both with sensitive headers masked) and
/// `config.toml`, the config the run used. Returns the report directory.
pub fn save_report(report: &SuiteReport, config: &Config, mode: &str) -> anyhow::Result<PathBuf> {
    let dir = report_dir(&config.report_dir, &config.base_url, mode, SystemTime::now());
    std::fs::create_dir_all(&dir)?;
    report.write_to(&dir)?;

    let config_toml = toml::to_string_pretty(config)?;
    std::fs::write(dir.join("config.toml"), config_toml)?;

    Ok(dir)
}

fn report_dir(base: &Path, base_url: &str, mode: &str, at: SystemTime) -> PathBuf {
    base.join(build_dir_name(base_url, mode, at))
}

/// `{host_port}_{timestamp}_{mode}` e.g. `localhost_8080_20260205T193000_run`
fn build_dir_name(base_url: &str, mode: &str, at: SystemTime) -> String {
    let host_port = extract_host_port(base_url);
    let ts = timestamp_compact(at);
    format!("{host_port}_{ts}_{mode}")
}

/// `"http://localhost:8080/path"` → `"localhost_8080"`
fn extract_host_port(url: &str) -> String {
    let host = url
        .split("://")
        .nth(1)
        .unwrap_or(url)
        .split('/')
        .next()
        .unwrap_or_default();
    if host.is_empty() {
        "unknown".to_string()
    } else {
        host.replace(':', "_")
    }
}
