//! Domain model: operations, test cases, execution plans and HTTP exchanges

mod case;
mod exchange;
mod operation;
mod plan;

pub use case::{Exemplar, FieldValue, Fields, TestCase, TestType, select_exemplar};
pub use exchange::{ExecutionRecord, ResolvedRequest, ResponseBody, ResponseOutcome};
pub use operation::{HttpMethod, Operation, ParamLocation, Parameter, RequestBody, ResponseSpec};
pub use plan::ExecutionPlanItem;
