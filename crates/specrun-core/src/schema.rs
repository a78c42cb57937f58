//! JSON Schema of the report format
//!
//! `report.json` consumers (dashboards, CI annotations) validate against this.

use crate::report::SuiteReport;

/// Generate JSON Schema for [`SuiteReport`].
#[must_use]
pub fn generate_schema() -> String {
    let schema = schemars::schema_for!(SuiteReport);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}
