//! Verdict module - response validation and per-item results

mod result;
mod validation;

pub use result::{ExecutionResult, ResultStatus};
pub use validation::{SchemaCheck, StatusCheck, Validation, validate};
