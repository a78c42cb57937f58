//! Per-item execution results

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::Validation;
use crate::model::{
    ExecutionPlanItem, HttpMethod, ResolvedRequest, ResponseOutcome, TestCase, TestType,
};

/// Final state of one plan item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Passed,
    /// Response received but status or schema did not match
    FailedValidation,
    /// No response: connection failure, timeout, malformed request
    ExecutionError,
    /// Plan referenced an unknown endpoint or case
    SkippedNotFound,
}

impl ResultStatus {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Passed => "PASS",
            Self::FailedValidation => "FAIL",
            Self::ExecutionError => "ERROR",
            Self::SkippedNotFound => "SKIP",
        }
    }

    #[must_use]
    pub const fn is_passed(self) -> bool {
        matches!(self, Self::Passed)
    }
}

impl std::fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Everything reported about one executed (or skipped) plan item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExecutionResult {
    /// Position in the plan, 0-based
    pub plan_index: usize,
    pub plan_item: ExecutionPlanItem,
    pub test_name: String,
    pub test_type: TestType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<HttpMethod>,
    /// Resolved request URL
    #[serde(default)]
    pub endpoint: String,
    pub status: ResultStatus,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_status: Option<u16>,
    #[serde(default)]
    pub elapsed_ms: u64,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<Validation>,
    /// Oracle enrichment failed; the template was sent as-is
    #[serde(default)]
    pub fallback_used: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
    /// Key under which the exchange was recorded in history
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<ResolvedRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ResponseOutcome>,
}

impl ExecutionResult {
    /// Result for a plan item whose endpoint or case does not exist.
    #[must_use]
    pub fn not_found(plan_index: usize, plan_item: ExecutionPlanItem) -> Self {
        let (endpoint_id, case_id) = match plan_item {
            ExecutionPlanItem::EndpointRef(id) => (Some(id), None),
            ExecutionPlanItem::TestCaseRef(id) => (None, Some(id)),
        };
        Self {
            plan_index,
            plan_item,
            test_name: format!("<{plan_item}>"),
            test_type: TestType::Unknown,
            endpoint_id,
            case_id,
            method: None,
            endpoint: String::new(),
            status: ResultStatus::SkippedNotFound,
            success: false,
            status_code: None,
            expected_status: None,
            elapsed_ms: 0,
            attempts: 0,
            error_message: Some(format!("{plan_item} not found")),
            validation: None,
            fallback_used: false,
            fallback_reason: None,
            history_key: None,
            request: None,
            response: None,
        }
    }

    /// Result for an executed case.
    ///
    /// An outcome without a response is an execution error; otherwise the
    /// validation decides between passed and failed.
    #[must_use]
    pub fn executed(
        plan_index: usize,
        plan_item: ExecutionPlanItem,
        case: &TestCase,
        request: ResolvedRequest,
        response: ResponseOutcome,
        validation: Validation,
    ) -> Self {
        let status = if response.is_error() {
            ResultStatus::ExecutionError
        } else if validation.passed {
            ResultStatus::Passed
        } else {
            ResultStatus::FailedValidation
        };
        let error_message = match status {
            ResultStatus::ExecutionError => response.error.clone(),
            ResultStatus::FailedValidation => Some(validation.summary()),
            _ => None,
        };
        Self {
            plan_index,
            plan_item,
            test_name: case.test_name.clone(),
            test_type: case.effective_type(),
            endpoint_id: Some(case.endpoint_id),
            case_id: case.id,
            method: Some(request.method),
            endpoint: request.url.clone(),
            status,
            success: status.is_passed(),
            status_code: response.status_code,
            expected_status: Some(case.expected_status),
            elapsed_ms: response.elapsed_ms,
            attempts: response.attempts,
            error_message,
            validation: Some(validation),
            fallback_used: false,
            fallback_reason: None,
            history_key: None,
            request: Some(request),
            response: Some(response),
        }
    }

    #[must_use]
    pub fn with_fallback(mut self, reason: Option<String>) -> Self {
        self.fallback_used = reason.is_some();
        self.fallback_reason = reason;
        self
    }

    #[must_use]
    pub fn with_history_key(mut self, key: String) -> Self {
        self.history_key = Some(key);
        self
    }
}
