//! specrun-runner: spec resolution, oracle gateway, HTTP execution and plan sequencing

pub mod client;
pub mod document;
pub mod oracle;
pub mod resolver;
pub mod sequencer;

pub use client::{
    Connectivity, HttpExecutor, ReqwestTransport, RetryPolicy, Transport, TransportError,
};
pub use document::{RunnerError, load_document};
pub use oracle::{
    CaseBatch, CaseOracle, ConcreteFields, Enrichment, GeminiGenerator, OracleError, OracleGateway,
    TemplateFields, TextGenerator,
};
pub use resolver::{ResolveIssue, Resolved, resolve, resolve_document};
pub use sequencer::{CancelFlag, Sequencer};
