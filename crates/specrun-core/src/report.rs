//! Result aggregation and report rendering
//!
//! A [`Reporter`] collects [`ExecutionResult`]s for one suite run and is
//! finalized into a [`SuiteReport`]. Both the JSON and the text report are
//! rendered from that one value.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::clock::timestamp_iso;
use crate::model::HttpMethod;
use crate::redact::mask_headers;
use crate::verdict::{ExecutionResult, ResultStatus};

const RULE: &str = "============================================================";
const UNDERLINE: &str = "--------------------";

/// Pass/fail counts for one test type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct TypeStats {
    pub total: u64,
    pub passed: u64,
    pub failed: u64,
}

/// Suite timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TimingStats {
    pub total_duration_seconds: f64,
    pub average_test_time_ms: f64,
    pub start_time: String,
    pub end_time: String,
}

/// Aggregate numbers of a suite run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Summary {
    pub total_tests: u64,
    pub passed_tests: u64,
    /// Everything that did not pass, skipped items included
    pub failed_tests: u64,
    pub execution_errors: u64,
    pub skipped_not_found: u64,
    pub fallback_used: u64,
    /// Percent, two decimals
    pub success_rate: f64,
    pub test_types: BTreeMap<String, TypeStats>,
    /// Validation failures by the status class they returned
    #[serde(default)]
    pub failure_categories: BTreeMap<String, u64>,
    pub execution_time: TimingStats,
}

/// The report line of a test that did not pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FailureDetail {
    pub test_name: String,
    pub test_type: String,
    pub status: ResultStatus,
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<HttpMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl FailureDetail {
    fn from_result(r: &ExecutionResult) -> Self {
        Self {
            test_name: r.test_name.clone(),
            test_type: r.test_type.to_string(),
            status: r.status,
            endpoint: r.endpoint.clone(),
            method: r.method,
            expected_status: r.expected_status,
            actual_status: r.status_code,
            error_message: r.error_message.clone(),
        }
    }
}

/// Finished suite: summary, failures, warnings and every result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SuiteReport {
    pub suite_name: String,
    pub summary: Summary,
    pub failed: Vec<FailureDetail>,
    /// Plan integrity and other non-fatal findings
    #[serde(default)]
    pub warnings: Vec<String>,
    pub results: Vec<ExecutionResult>,
}

/// Collects results of one suite run.
#[derive(Debug)]
pub struct Reporter {
    suite_name: String,
    started_at: SystemTime,
    started: Instant,
    results: Vec<ExecutionResult>,
    warnings: Vec<String>,
}

impl Reporter {
    #[must_use]
    pub fn start(suite_name: impl Into<String>) -> Self {
        Self {
            suite_name: suite_name.into(),
            started_at: SystemTime::now(),
            started: Instant::now(),
            results: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn add(&mut self, result: ExecutionResult) {
        self.results.push(result);
    }

    pub fn extend(&mut self, results: impl IntoIterator<Item = ExecutionResult>) {
        self.results.extend(results);
    }

    pub fn warn(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    #[must_use]
    pub fn finalize(self) -> SuiteReport {
        let elapsed = self.started.elapsed();
        let ended_at = self.started_at + elapsed;
        SuiteReport::build(
            self.suite_name,
            self.results,
            self.warnings,
            TimeWindow {
                start: self.started_at,
                end: ended_at,
            },
        )
    }
}

/// Wall-clock bounds of a suite run
#[derive(Debug, Clone, Copy)]
pub struct TimeWindow {
    pub start: SystemTime,
    pub end: SystemTime,
}

impl SuiteReport {
    /// Aggregate `results` into a report.
    #[must_use]
    pub fn build(
        suite_name: String,
        results: Vec<ExecutionResult>,
        warnings: Vec<String>,
        window: TimeWindow,
    ) -> Self {
        let total = results.len() as u64;
        let count =
            |status: ResultStatus| results.iter().filter(|r| r.status == status).count() as u64;
        let passed = count(ResultStatus::Passed);

        let mut test_types: BTreeMap<String, TypeStats> = BTreeMap::new();
        for r in &results {
            let stats = test_types.entry(r.test_type.to_string()).or_default();
            stats.total += 1;
            if r.status.is_passed() {
                stats.passed += 1;
            } else {
                stats.failed += 1;
            }
        }

        let mut failure_categories: BTreeMap<String, u64> = BTreeMap::new();
        for r in &results {
            if r.status != ResultStatus::FailedValidation {
                continue;
            }
            if let Some(code) = r.status_code {
                *failure_categories
                    .entry(failure_category(code).to_string())
                    .or_default() += 1;
            }
        }

        let duration = window
            .end
            .duration_since(window.start)
            .unwrap_or_default()
            .as_secs_f64();
        let average_ms = if results.is_empty() {
            0.0
        } else {
            results.iter().map(|r| r.elapsed_ms as f64).sum::<f64>() / results.len() as f64
        };

        let summary = Summary {
            total_tests: total,
            passed_tests: passed,
            failed_tests: total - passed,
            execution_errors: count(ResultStatus::ExecutionError),
            skipped_not_found: count(ResultStatus::SkippedNotFound),
            fallback_used: results.iter().filter(|r| r.fallback_used).count() as u64,
            success_rate: if total == 0 {
                0.0
            } else {
                round2(passed as f64 / total as f64 * 100.0)
            },
            test_types,
            failure_categories,
            execution_time: TimingStats {
                total_duration_seconds: round2(duration),
                average_test_time_ms: round2(average_ms),
                start_time: timestamp_iso(window.start),
                end_time: timestamp_iso(window.end),
            },
        };

        let failed = results
            .iter()
            .filter(|r| !r.status.is_passed())
            .map(FailureDetail::from_result)
            .collect();

        Self {
            suite_name,
            summary,
            failed,
            warnings,
            results,
        }
    }

    /// Every result passed (and there was at least one).
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.summary.total_tests > 0 && self.summary.failed_tests == 0
    }

    /// Copy with sensitive request/response headers masked.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut report = self.clone();
        for r in &mut report.results {
            if let Some(req) = r.request.as_mut() {
                mask_headers(&mut req.headers);
            }
            if let Some(resp) = r.response.as_mut() {
                mask_headers(&mut resp.headers);
            }
        }
        report
    }

    /// Pretty JSON form.
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails.
    pub fn to_json(&self) -> Result<String, ReportError> {
        serde_json::to_string_pretty(self).map_err(|e| ReportError::Serialize(e.to_string()))
    }

    /// Sectioned plain-text form.
    #[must_use]
    pub fn to_text(&self) -> String {
        let s = &self.summary;
        let t = &s.execution_time;
        let mut lines = Vec::new();

        lines.push(RULE.to_string());
        lines.push(format!("API TEST REPORT: {}", self.suite_name));
        lines.push(RULE.to_string());
        lines.push(String::new());

        lines.push("SUMMARY".into());
        lines.push(UNDERLINE.into());
        lines.push(format!("Total Tests: {}", s.total_tests));
        lines.push(format!("Passed: {}", s.passed_tests));
        lines.push(format!("Failed: {}", s.failed_tests));
        lines.push(format!("  Execution errors: {}", s.execution_errors));
        lines.push(format!("  Skipped (not found): {}", s.skipped_not_found));
        lines.push(format!("Success Rate: {:.2}%", s.success_rate));
        lines.push(format!("Enrichment fallbacks: {}", s.fallback_used));
        lines.push(format!("Total Duration: {:.2}s", t.total_duration_seconds));
        lines.push(format!("Average Test Time: {:.2}ms", t.average_test_time_ms));
        lines.push(format!("Start: {}", t.start_time));
        lines.push(format!("End: {}", t.end_time));
        lines.push(String::new());

        lines.push("TEST TYPE BREAKDOWN".into());
        lines.push(UNDERLINE.into());
        for (name, stats) in &s.test_types {
            lines.push(format!(
                "{name}: {}/{} passed ({} failed)",
                stats.passed, stats.total, stats.failed
            ));
        }
        lines.push(String::new());

        if !s.failure_categories.is_empty() {
            lines.push("FAILURE CATEGORIES".into());
            lines.push(UNDERLINE.into());
            for (category, n) in &s.failure_categories {
                lines.push(format!("{category}: {n}"));
            }
            lines.push(String::new());
        }

        if !self.warnings.is_empty() {
            lines.push("WARNINGS".into());
            lines.push(UNDERLINE.into());
            for w in &self.warnings {
                lines.push(format!("- {w}"));
            }
            lines.push(String::new());
        }

        if !self.failed.is_empty() {
            lines.push("FAILED TESTS".into());
            lines.push(UNDERLINE.into());
            for f in &self.failed {
                lines.push(format!("[{}] {}", f.status, f.test_name));
                match f.method {
                    Some(method) => lines.push(format!("  Endpoint: {method} {}", f.endpoint)),
                    None => lines.push("  Endpoint: -".into()),
                }
                lines.push(format!(
                    "  Expected: {}, Actual: {}",
                    opt_status(f.expected_status),
                    opt_status(f.actual_status)
                ));
                if let Some(msg) = &f.error_message {
                    lines.push(format!("  Error: {msg}"));
                }
            }
            lines.push(String::new());
        }

        lines.push("ALL TEST RESULTS".into());
        lines.push(UNDERLINE.into());
        for r in &self.results {
            let mut line = format!("[{}] {} ({})", r.status, r.test_name, r.test_type);
            if let Some(code) = r.status_code {
                line.push_str(&format!(" - {code}"));
            }
            line.push_str(&format!(" - {}ms", r.elapsed_ms));
            if r.fallback_used {
                line.push_str(" [fallback]");
            }
            lines.push(line);
        }
        lines.push(RULE.to_string());

        lines.join("\n")
    }

    /// Write redacted `report.json` and `report.txt` into `dir`.
    ///
    /// # Errors
    ///
    /// Returns error if the directory or either file cannot be written.
    pub fn write_to(&self, dir: &Path) -> Result<Vec<PathBuf>, ReportError> {
        std::fs::create_dir_all(dir)
            .map_err(|e| ReportError::Io(format!("create {}: {e}", dir.display())))?;
        let report = self.redacted();

        let json_path = dir.join("report.json");
        std::fs::write(&json_path, report.to_json()?)
            .map_err(|e| ReportError::Io(format!("write {}: {e}", json_path.display())))?;

        let text_path = dir.join("report.txt");
        std::fs::write(&text_path, report.to_text())
            .map_err(|e| ReportError::Io(format!("write {}: {e}", text_path.display())))?;

        Ok(vec![json_path, text_path])
    }
}

/// Category of an unexpected status code.
#[must_use]
pub fn failure_category(status: u16) -> &'static str {
    match status {
        401 | 403 => "authentication",
        500.. => "server",
        408 => "timeout",
        400 | 422 => "validation",
        404 => "not-found",
        _ => "other",
    }
}

fn opt_status(code: Option<u16>) -> String {
    code.map_or_else(|| "none".to_string(), |c| c.to_string())
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialize(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        ExecutionPlanItem, Fields, ResolvedRequest, ResponseBody, ResponseOutcome, TestCase,
        TestType,
    };
    use crate::verdict::validate;
    use std::time::Duration;

    fn case(name: &str, test_type: TestType, expected: u16) -> TestCase {
        TestCase {
            id: Some(1),
            endpoint_id: 1,
            test_name: name.into(),
            test_type,
            method: HttpMethod::Get,
            url: "/users".into(),
            headers: Fields::new(),
            query_params: Fields::new(),
            path_params: Fields::new(),
            input_payload: Fields::new(),
            expected_status: expected,
            expected_schema: serde_json::Value::Null,
        }
    }

    fn executed(
        i: usize,
        name: &str,
        test_type: TestType,
        expected: u16,
        actual: u16,
    ) -> ExecutionResult {
        let tc = case(name, test_type, expected);
        let req = ResolvedRequest::new(HttpMethod::Get, "http://api.test/users")
            .with_header("Authorization", "Bearer s3cret");
        let resp =
            ResponseOutcome::from_status(actual, BTreeMap::new(), ResponseBody::Empty, 10, 1);
        let v = validate(&resp, expected, &serde_json::Value::Null);
        ExecutionResult::executed(i, ExecutionPlanItem::TestCaseRef(i as u64), &tc, req, resp, v)
    }

    fn window() -> TimeWindow {
        let start = SystemTime::UNIX_EPOCH + Duration::from_secs(20_489 * 86_400 + 19 * 3600);
        TimeWindow {
            start,
            end: start + Duration::from_millis(2500),
        }
    }

    fn five_results() -> Vec<ExecutionResult> {
        vec![
            executed(0, "list users", TestType::Positive, 200, 200),
            executed(1, "list users paged", TestType::Positive, 200, 200),
            executed(2, "limit at boundary", TestType::Edge, 200, 200),
            executed(3, "invalid page", TestType::Negative, 400, 500),
            ExecutionResult::not_found(4, ExecutionPlanItem::TestCaseRef(42)),
        ]
    }

    #[test]
    fn aggregation_counts() {
        let report = SuiteReport::build("users".into(), five_results(), vec![], window());
        let s = &report.summary;
        assert_eq!(s.total_tests, 5);
        assert_eq!(s.passed_tests, 3);
        assert_eq!(s.failed_tests, 2);
        assert_eq!(s.success_rate, 60.0);
        assert_eq!(s.skipped_not_found, 1);
        assert_eq!(s.execution_errors, 0);
        assert_eq!(s.test_types["positive"].passed, 2);
        assert_eq!(s.test_types["negative"].failed, 1);
        assert_eq!(s.test_types["unknown"].total, 1);
        assert_eq!(s.execution_time.total_duration_seconds, 2.5);
        assert_eq!(s.execution_time.average_test_time_ms, 8.0);
        assert_eq!(s.execution_time.start_time, "2026-02-05T19:00:00Z");
        assert_eq!(report.failed.len(), 2);
        assert_eq!(report.failed[0].actual_status, Some(500));
        assert!(!report.all_passed());
        // the skipped item has no status to categorize
        assert_eq!(s.failure_categories, BTreeMap::from([("server".to_string(), 1)]));
    }

    #[test]
    fn failures_are_categorized_by_status() {
        let results = vec![
            executed(0, "no token", TestType::Negative, 200, 401),
            executed(1, "wrong role", TestType::Negative, 200, 403),
            executed(2, "bad body", TestType::Positive, 201, 422),
            executed(3, "missing", TestType::Positive, 200, 404),
            executed(4, "slow", TestType::Positive, 200, 408),
            executed(5, "teapot", TestType::Positive, 200, 418),
            executed(6, "crash", TestType::Positive, 200, 502),
            executed(7, "fine", TestType::Positive, 200, 200),
        ];
        let report = SuiteReport::build("r".into(), results, vec![], window());
        let categories = &report.summary.failure_categories;
        assert_eq!(categories["authentication"], 2);
        assert_eq!(categories["validation"], 1);
        assert_eq!(categories["not-found"], 1);
        assert_eq!(categories["timeout"], 1);
        assert_eq!(categories["other"], 1);
        assert_eq!(categories["server"], 1);
        assert_eq!(categories.values().sum::<u64>(), 7);
    }

    #[test]
    fn success_rate_rounds_to_two_decimals() {
        let results = vec![
            executed(0, "a", TestType::Positive, 200, 200),
            executed(1, "b", TestType::Positive, 200, 500),
            executed(2, "c", TestType::Positive, 200, 500),
        ];
        let report = SuiteReport::build("r".into(), results, vec![], window());
        assert_eq!(report.summary.success_rate, 33.33);
    }

    #[test]
    fn empty_suite() {
        let report = SuiteReport::build("empty".into(), vec![], vec![], window());
        assert_eq!(report.summary.total_tests, 0);
        assert_eq!(report.summary.success_rate, 0.0);
        assert_eq!(report.summary.execution_time.average_test_time_ms, 0.0);
        assert!(!report.all_passed());
    }

    #[test]
    fn reporter_collects() {
        let mut reporter = Reporter::start("live");
        reporter.add(executed(0, "ok", TestType::Positive, 200, 200));
        reporter.warn("case #9 is never referenced by the plan");
        let report = reporter.finalize();
        assert_eq!(report.summary.total_tests, 1);
        assert!(report.all_passed());
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn redacted_masks_headers() {
        let report = SuiteReport::build("r".into(), five_results(), vec![], window());
        let redacted = report.redacted();
        let req = redacted.results[0].request.as_ref().unwrap();
        assert_eq!(req.headers["Authorization"], "***");
        // original untouched
        let orig = report.results[0].request.as_ref().unwrap();
        assert_eq!(orig.headers["Authorization"], "Bearer s3cret");
    }

    #[test]
    fn json_roundtrips() {
        let report = SuiteReport::build("r".into(), five_results(), vec!["w".into()], window());
        let json = report.to_json().unwrap();
        let back: SuiteReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.summary, report.summary);
        assert_eq!(back.results.len(), 5);
    }

    #[test]
    fn text_layout() {
        let report = SuiteReport::build(
            "users".into(),
            five_results(),
            vec!["plan never references case #7".into()],
            window(),
        );
        insta::assert_snapshot!(report.to_text(), @r"
        ============================================================
        API TEST REPORT: users
        ============================================================

        SUMMARY
        --------------------
        Total Tests: 5
        Passed: 3
        Failed: 2
          Execution errors: 0
          Skipped (not found): 1
        Success Rate: 60.00%
        Enrichment fallbacks: 0
        Total Duration: 2.50s
        Average Test Time: 8.00ms
        Start: 2026-02-05T19:00:00Z
        End: 2026-02-05T19:00:02Z

        TEST TYPE BREAKDOWN
        --------------------
        edge: 1/1 passed (0 failed)
        negative: 0/1 passed (1 failed)
        positive: 2/2 passed (0 failed)
        unknown: 0/1 passed (1 failed)

        FAILURE CATEGORIES
        --------------------
        server: 1

        WARNINGS
        --------------------
        - plan never references case #7

        FAILED TESTS
        --------------------
        [FAIL] invalid page
          Endpoint: GET http://api.test/users
          Expected: 400, Actual: 500
          Error: expected 400, got 500 (schema skipped due to status mismatch)
        [SKIP] <test case #42>
          Endpoint: -
          Expected: none, Actual: none
          Error: test case #42 not found

        ALL TEST RESULTS
        --------------------
        [PASS] list users (positive) - 200 - 10ms
        [PASS] list users paged (positive) - 200 - 10ms
        [PASS] limit at boundary (edge) - 200 - 10ms
        [FAIL] invalid page (negative) - 500 - 10ms
        [SKIP] <test case #42> (unknown) - 0ms
        ============================================================
        ");
    }

    #[test]
    fn write_to_dir() {
        let dir = tempfile::tempdir().unwrap();
        let report = SuiteReport::build("r".into(), five_results(), vec![], window());
        let paths = report.write_to(&dir.path().join("run")).unwrap();
        assert_eq!(paths.len(), 2);
        let json = std::fs::read_to_string(&paths[0]).unwrap();
        assert!(json.contains("\"***\""));
        assert!(!json.contains("s3cret"));
        let text = std::fs::read_to_string(&paths[1]).unwrap();
        assert!(text.starts_with(RULE));
    }
}
