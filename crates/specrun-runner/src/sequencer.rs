//! Plan interpreter
//!
//! Walks an execution plan strictly in order, one item at a time:
//! resolve the item to a stored case, enrich its placeholders from the
//! history so far, send it, record it, validate it.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use specrun_core::{
    CaseStore, ExecutionPlanItem, ExecutionRecord, ExecutionResult, Exemplar, HistoryStore,
    ResolvedRequest, TestCase, select_exemplar, validate,
};

use crate::client::{HttpExecutor, Transport, value_to_param_string};
use crate::oracle::{CaseOracle, ConcreteFields, TemplateFields};

/// Cooperative cancellation, checked between plan items.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What a step is recorded under in the history.
#[derive(Debug, Clone, Copy)]
enum HistoryKey {
    TestName,
    Url,
}

pub struct Sequencer<'a, T> {
    oracle: &'a dyn CaseOracle,
    store: &'a dyn CaseStore,
    http: &'a mut HttpExecutor<T>,
    base_url: String,
    headers: BTreeMap<String, String>,
    pacing: Duration,
    cancel: CancelFlag,
    sent_any: bool,
}

impl<'a, T: Transport> Sequencer<'a, T> {
    pub fn new(
        oracle: &'a dyn CaseOracle,
        store: &'a dyn CaseStore,
        http: &'a mut HttpExecutor<T>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            oracle,
            store,
            http,
            base_url: base_url.into(),
            headers: BTreeMap::new(),
            pacing: Duration::ZERO,
            cancel: CancelFlag::default(),
            sent_any: false,
        }
    }

    /// Headers sent with every request; a case's own header of the same name wins.
    #[must_use]
    pub fn with_headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    #[must_use]
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Execute `plan` in order. `scope` is the endpoint whose cases the plan
    /// was made for; case ids are looked up there first.
    ///
    /// Items that reference nothing are reported as skipped and the walk goes on.
    pub fn execute(
        &mut self,
        plan: &[ExecutionPlanItem],
        scope: Option<u64>,
        history: &mut HistoryStore,
    ) -> Vec<ExecutionResult> {
        let mut results = Vec::with_capacity(plan.len());
        for (index, &item) in plan.iter().enumerate() {
            if self.cancel.is_cancelled() {
                tracing::info!(
                    executed = results.len(),
                    remaining = plan.len() - index,
                    "run cancelled"
                );
                break;
            }
            let result = match self.resolve_item(item, scope) {
                Some(case) => self.run_case(index, item, &case, HistoryKey::TestName, history),
                None => {
                    tracing::warn!(%item, "plan item not found, skipping");
                    ExecutionResult::not_found(index, item)
                }
            };
            results.push(result);
        }
        results
    }

    /// Smoke flow: one exemplar per endpoint, preferring a positive case,
    /// recorded under the resolved url.
    pub fn run_smoke(&mut self, order: &[u64], history: &mut HistoryStore) -> Vec<ExecutionResult> {
        let mut results = Vec::new();
        let mut seen = Vec::new();
        for &endpoint_id in order {
            if seen.contains(&endpoint_id) {
                continue;
            }
            seen.push(endpoint_id);
            if self.cancel.is_cancelled() {
                tracing::info!(executed = results.len(), "smoke run cancelled");
                break;
            }
            let item = ExecutionPlanItem::EndpointRef(endpoint_id);
            let index = results.len();
            let result = match self.exemplar(endpoint_id, Exemplar::PreferPositive) {
                Some(case) => self.run_case(index, item, &case, HistoryKey::Url, history),
                None => {
                    tracing::warn!(
                        endpoint = endpoint_id,
                        "no cases stored for endpoint, skipping"
                    );
                    ExecutionResult::not_found(index, item)
                }
            };
            results.push(result);
        }
        results
    }

    fn resolve_item(&self, item: ExecutionPlanItem, scope: Option<u64>) -> Option<TestCase> {
        match item {
            ExecutionPlanItem::EndpointRef(endpoint_id) => {
                self.exemplar(endpoint_id, Exemplar::FirstStored)
            }
            ExecutionPlanItem::TestCaseRef(case_id) => {
                let log = |e: &specrun_core::StoreError| {
                    tracing::warn!(case = case_id, error = %e, "case lookup failed");
                };
                let scoped = scope.and_then(|endpoint_id| {
                    self.store
                        .get_case_by_id(endpoint_id, case_id)
                        .inspect_err(log)
                        .ok()
                        .flatten()
                });
                scoped.or_else(|| self.store.find_case(case_id).inspect_err(log).ok().flatten())
            }
        }
    }

    fn exemplar(&self, endpoint_id: u64, rule: Exemplar) -> Option<TestCase> {
        match self.store.list_cases(endpoint_id) {
            Ok(cases) => select_exemplar(&cases, rule).cloned(),
            Err(e) => {
                tracing::warn!(endpoint = endpoint_id, error = %e, "case lookup failed");
                None
            }
        }
    }

    fn run_case(
        &mut self,
        index: usize,
        item: ExecutionPlanItem,
        case: &TestCase,
        key: HistoryKey,
        history: &mut HistoryStore,
    ) -> ExecutionResult {
        let template = TemplateFields::from_case(case);
        let enrichment = self.oracle.enrich_fields(&template, &history.snapshot());
        let request = self.build_request(case, enrichment.fields);

        if self.sent_any && !self.pacing.is_zero() {
            std::thread::sleep(self.pacing);
        }
        self.sent_any = true;

        tracing::info!(
            test = %case.test_name,
            method = %request.method,
            url = %request.url,
            "executing"
        );
        let response = self.http.execute(&request);

        let key = match key {
            HistoryKey::TestName => case.test_name.as_str(),
            HistoryKey::Url => request.url.as_str(),
        }
        .to_string();
        let history_key = history.record(
            &key,
            ExecutionRecord {
                request: request.clone(),
                response: response.clone(),
            },
        );

        let validation = validate(&response, case.expected_status, &case.expected_schema);
        let result = ExecutionResult::executed(index, item, case, request, response, validation)
            .with_fallback(enrichment.fallback_reason)
            .with_history_key(history_key);
        tracing::info!(
            test = %result.test_name,
            status = %result.status,
            code = ?result.status_code,
            elapsed_ms = result.elapsed_ms,
            "finished"
        );
        result
    }

    fn build_request(&self, case: &TestCase, fields: ConcreteFields) -> ResolvedRequest {
        let mut headers: BTreeMap<String, String> = self
            .headers
            .iter()
            .filter(|(name, _)| !fields.headers.keys().any(|k| k.eq_ignore_ascii_case(name)))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        headers.extend(fields.headers);

        ResolvedRequest {
            url: complete_url(&self.base_url, &fields.url, &fields.path_params),
            method: case.method,
            headers,
            query_params: fields.query_params,
            payload: case.method.sends_body().then_some(fields.input_payload),
        }
    }
}

/// Substitute `{name}` segments from `path_params` and prefix relative urls
/// with `base_url`.
#[must_use]
pub fn complete_url(
    base_url: &str,
    url: &str,
    path_params: &BTreeMap<String, serde_json::Value>,
) -> String {
    let mut url = url.trim().to_string();
    for (name, value) in path_params {
        url = url.replace(&format!("{{{name}}}"), &value_to_param_string(value));
    }
    if url.starts_with("http://") || url.starts_with("https://") {
        return url;
    }
    let base = base_url.trim_end_matches('/');
    let path = url.trim_start_matches('/');
    if path.is_empty() {
        base.to_string()
    } else {
        format!("{base}/{path}")
    }
}
