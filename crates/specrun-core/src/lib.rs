//! specrun-core: domain model, validation and reporting for API test runs
//!
//! This crate holds everything that does not touch the network: operation and
//! test-case types, the execution history ledger, response validation, result
//! aggregation, storage and configuration.

pub mod clock;
pub mod config;
pub mod coverage;
pub mod history;
pub mod model;
pub mod redact;
pub mod report;
pub mod schema;
pub mod store;
pub mod verdict;

pub use config::{Config, ConfigError, HttpSettings, OracleSettings};
pub use coverage::{CoverageDelta, coverage_delta};
pub use history::{HistoryEntry, HistoryStore};
pub use model::{
    ExecutionPlanItem, ExecutionRecord, Exemplar, FieldValue, Fields, HttpMethod, Operation,
    ParamLocation, Parameter, RequestBody, ResolvedRequest, ResponseBody, ResponseOutcome,
    ResponseSpec, TestCase, TestType, select_exemplar,
};
pub use report::{ReportError, Reporter, SuiteReport, Summary};
pub use store::{CaseStore, JsonDirStore, MemoryStore, StoreError};
pub use verdict::{ExecutionResult, ResultStatus, SchemaCheck, Validation, validate};
