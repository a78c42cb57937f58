use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One step of an execution plan.
///
/// Serialized as `{"endpoint_ref": 7}` / `{"test_case_ref": 12}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPlanItem {
    /// Run the endpoint's exemplar case as a setup step
    EndpointRef(u64),
    /// Run one specific test case
    TestCaseRef(u64),
}

impl std::fmt::Display for ExecutionPlanItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EndpointRef(id) => write!(f, "endpoint #{id}"),
            Self::TestCaseRef(id) => write!(f, "test case #{id}"),
        }
    }
}
