//! Case oracle gateway
//!
//! The oracle is an untrusted text producer. Everything it returns is parsed
//! loosely and every failure degrades to something the run can still use:
//! no cases, the unenriched template, stored plan order.

mod gemini;
mod prompts;

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use specrun_core::{ExecutionPlanItem, FieldValue, Fields, HttpMethod, Operation, TestCase};

use crate::client::value_to_param_string;

pub use gemini::GeminiGenerator;

/// Raw text generation: one prompt in, one completion out.
pub trait TextGenerator {
    /// # Errors
    ///
    /// Returns error if the service is unreachable, rejects the request or
    /// answers with no text.
    fn generate(&self, prompt: &str) -> Result<String, OracleError>;
}

#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("oracle transport error: {0}")]
    Transport(String),
    #[error("oracle returned HTTP {0}: {1}")]
    Status(u16, String),
    #[error("oracle returned no text")]
    Empty,
    #[error("API key not set (environment variable {0})")]
    MissingKey(String),
}

/// Fields of a case handed to the oracle for placeholder substitution.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateFields {
    pub test_description: String,
    pub test_type: String,
    pub method: HttpMethod,
    pub url: String,
    pub headers: Fields,
    pub query_params: Fields,
    pub path_params: Fields,
    pub input_payload: Fields,
}

impl TemplateFields {
    #[must_use]
    pub fn from_case(case: &TestCase) -> Self {
        Self {
            test_description: case.test_name.clone(),
            test_type: case.effective_type().to_string(),
            method: case.method,
            url: case.url.clone(),
            headers: case.headers.clone(),
            query_params: case.query_params.clone(),
            path_params: case.path_params.clone(),
            input_payload: case.input_payload.clone(),
        }
    }

    /// The template as-is; placeholders stay as their description text.
    #[must_use]
    pub fn literal(&self) -> ConcreteFields {
        ConcreteFields {
            url: self.url.clone(),
            headers: self
                .headers
                .iter()
                .map(|(k, v)| (k.clone(), value_to_param_string(&v.to_json())))
                .collect(),
            query_params: to_values(&self.query_params),
            path_params: to_values(&self.path_params),
            input_payload: Value::Object(
                self.input_payload
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }

    /// Whether `field` still holds description text instead of a value.
    fn has_placeholder(&self, field: &str) -> bool {
        let any = |fields: &Fields| fields.values().any(FieldValue::is_placeholder);
        match field {
            "url" => self.url.contains('{'),
            "headers" => any(&self.headers),
            "query_params" => any(&self.query_params),
            "path_params" => any(&self.path_params),
            "input_payload" => any(&self.input_payload),
            _ => false,
        }
    }

    fn to_prompt_json(&self) -> Value {
        serde_json::json!({
            "test_description": self.test_description,
            "test_type": self.test_type,
            "method": self.method,
            "url": self.url,
            "headers": self.headers,
            "query_params": self.query_params,
            "path_params": self.path_params,
            "input_payload": self.input_payload,
        })
    }
}

fn to_values(fields: &Fields) -> BTreeMap<String, Value> {
    fields.iter().map(|(k, v)| (k.clone(), v.to_json())).collect()
}

/// Field values ready to go on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct ConcreteFields {
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub query_params: BTreeMap<String, Value>,
    pub path_params: BTreeMap<String, Value>,
    pub input_payload: Value,
}

/// Result of one enrichment call.
#[derive(Debug, Clone, PartialEq)]
pub struct Enrichment {
    pub fields: ConcreteFields,
    pub fallback_used: bool,
    pub fallback_reason: Option<String>,
}

impl Enrichment {
    #[must_use]
    pub fn fallback(template: &TemplateFields, reason: impl Into<String>) -> Self {
        Self {
            fields: template.literal(),
            fallback_used: true,
            fallback_reason: Some(reason.into()),
        }
    }
}

/// Cases generated for one operation.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseBatch {
    pub endpoint_id: Option<u64>,
    pub label: String,
    pub cases: Vec<TestCase>,
    /// Set when the oracle produced nothing usable
    pub error: Option<String>,
}

/// Everything the run asks of the oracle.
pub trait CaseOracle {
    /// Candidate cases, one batch per operation.
    fn generate_cases(&self, operations: &[Operation]) -> Vec<CaseBatch>;

    /// Substitute placeholders using what earlier steps observed.
    fn enrich_fields(&self, template: &TemplateFields, history: &Value) -> Enrichment;

    /// Execution plan for `cases`, with setup endpoints drawn from `operations`.
    fn plan_order(&self, operations: &[Operation], cases: &[TestCase]) -> Vec<ExecutionPlanItem>;

    /// Endpoint ids in dependency order. Always a permutation of the known ids.
    fn order_endpoints(&self, operations: &[Operation]) -> Vec<u64>;
}

/// [`CaseOracle`] backed by a [`TextGenerator`].
pub struct OracleGateway<G> {
    generator: G,
    base_url: String,
}

impl<G: TextGenerator> OracleGateway<G> {
    pub fn new(generator: G, base_url: impl Into<String>) -> Self {
        Self {
            generator,
            base_url: base_url.into(),
        }
    }

    #[must_use]
    pub fn generator(&self) -> &G {
        &self.generator
    }

    fn ask_json(&self, prompt: &str) -> Result<Value, String> {
        let raw = self.generator.generate(prompt).map_err(|e| e.to_string())?;
        let cleaned = clean_output(&raw);
        serde_json::from_str(&cleaned).map_err(|e| format!("unparseable oracle output: {e}"))
    }
}

impl<G: TextGenerator> CaseOracle for OracleGateway<G> {
    fn generate_cases(&self, operations: &[Operation]) -> Vec<CaseBatch> {
        operations
            .iter()
            .map(|op| {
                let label = op.label();
                let prompt = prompts::generate_cases(op);
                match self.ask_json(&prompt) {
                    Ok(value) => {
                        let cases = parse_cases(op, &value);
                        tracing::info!(operation = %label, cases = cases.len(), "generated cases");
                        let error = cases
                            .is_empty()
                            .then(|| "oracle output contained no valid cases".to_string());
                        CaseBatch {
                            endpoint_id: op.id,
                            label,
                            cases,
                            error,
                        }
                    }
                    Err(reason) => {
                        tracing::warn!(operation = %label, %reason, "case generation failed");
                        CaseBatch {
                            endpoint_id: op.id,
                            label,
                            cases: Vec::new(),
                            error: Some(reason),
                        }
                    }
                }
            })
            .collect()
    }

    fn enrich_fields(&self, template: &TemplateFields, history: &Value) -> Enrichment {
        let prompt = prompts::enrich(&self.base_url, &template.to_prompt_json(), history);
        let value = match self.ask_json(&prompt) {
            Ok(v) => v,
            Err(reason) => {
                tracing::warn!(test = %template.test_description, %reason, "enrichment fallback");
                return Enrichment::fallback(template, reason);
            }
        };
        let Value::Object(map) = value else {
            let reason = "oracle output is not a JSON object".to_string();
            tracing::warn!(test = %template.test_description, %reason, "enrichment fallback");
            return Enrichment::fallback(template, reason);
        };
        let (fields, kept) = merge_enriched(template.literal(), &map);
        // Template text went out unchanged: nothing was taken, or a kept
        // field still carries a placeholder.
        let unresolved: Vec<&str> = if kept.len() == ENRICHED_FIELDS.len() {
            kept
        } else {
            kept.into_iter()
                .filter(|f| template.has_placeholder(f))
                .collect()
        };
        if unresolved.is_empty() {
            tracing::debug!(test = %template.test_description, "enriched");
            return Enrichment {
                fields,
                fallback_used: false,
                fallback_reason: None,
            };
        }
        let reason = format!("oracle omitted/mistyped: {}", unresolved.join(", "));
        tracing::warn!(test = %template.test_description, %reason, "partial enrichment");
        Enrichment {
            fields,
            fallback_used: true,
            fallback_reason: Some(reason),
        }
    }

    fn plan_order(&self, operations: &[Operation], cases: &[TestCase]) -> Vec<ExecutionPlanItem> {
        let prompt = prompts::plan_order(operations, cases);
        let plan = match self.ask_json(&prompt) {
            Ok(value) => parse_plan(&value),
            Err(reason) => {
                tracing::warn!(%reason, "plan ordering failed");
                Vec::new()
            }
        };
        if plan.is_empty() {
            tracing::warn!("empty plan from oracle, using stored case order");
            return stored_plan(cases);
        }
        plan
    }

    fn order_endpoints(&self, operations: &[Operation]) -> Vec<u64> {
        let known: Vec<u64> = operations.iter().filter_map(|op| op.id).collect();
        let proposed = match self.generator.generate(&prompts::order_endpoints(operations)) {
            Ok(raw) => parse_id_list(&clean_output(&raw)),
            Err(e) => {
                tracing::warn!(error = %e, "endpoint ordering failed, using stored order");
                Vec::new()
            }
        };
        complete_order(&proposed, &known)
    }
}

/// Strip markdown fences and a leading language tag line.
#[must_use]
pub fn clean_output(raw: &str) -> String {
    let mut text = raw.trim();
    if let Some(start) = text.find("```") {
        let inner = &text[start + 3..];
        text = match inner.find("```") {
            Some(end) => &inner[..end],
            None => inner,
        };
    }
    let text = text.trim_matches('`').trim();
    match text.split_once('\n') {
        Some((first, rest)) if is_language_tag(first.trim()) => rest.trim().to_string(),
        _ if is_language_tag(text) => String::new(),
        _ => text.to_string(),
    }
}

fn is_language_tag(line: &str) -> bool {
    !line.is_empty()
        && line.chars().all(|c| c.is_ascii_alphabetic())
        && !matches!(line, "true" | "false" | "null")
}

/// Cases from generator output shaped as an array, an object keyed by
/// `"METHOD /path"`, or a single case object.
fn parse_cases(op: &Operation, value: &Value) -> Vec<TestCase> {
    let label = op.label();
    let raw: Vec<&Value> = match value {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) if map.contains_key("test_name") => vec![value],
        Value::Object(map) => {
            let keyed = map
                .iter()
                .find(|(k, _)| k.trim().eq_ignore_ascii_case(&label))
                .map(|(_, v)| v);
            match keyed {
                Some(Value::Array(items)) => items.iter().collect(),
                Some(other) => vec![other],
                None => map
                    .values()
                    .filter_map(Value::as_array)
                    .flatten()
                    .collect(),
            }
        }
        _ => Vec::new(),
    };

    raw.into_iter()
        .enumerate()
        .filter_map(|(i, item)| {
            let Value::Object(map) = item else {
                tracing::warn!(operation = %label, index = i, "dropping non-object case");
                return None;
            };
            let mut map = map.clone();
            map.remove("id");
            map.entry("method")
                .or_insert_with(|| Value::String(op.method.as_str().to_string()));
            map.entry("url")
                .or_insert_with(|| Value::String(op.path.clone()));
            match serde_json::from_value::<TestCase>(Value::Object(map)) {
                Ok(mut case) => {
                    case.endpoint_id = op.id.unwrap_or_default();
                    Some(case)
                }
                Err(e) => {
                    tracing::warn!(
                        operation = %label,
                        index = i,
                        error = %e,
                        "dropping malformed case"
                    );
                    None
                }
            }
        })
        .collect()
}

const ENRICHED_FIELDS: [&str; 5] = [
    "url",
    "headers",
    "query_params",
    "path_params",
    "input_payload",
];

/// Take each enriched field only when the oracle returned it with the right
/// type. Also returns the names of the fields kept from the template.
fn merge_enriched(
    mut fields: ConcreteFields,
    map: &serde_json::Map<String, Value>,
) -> (ConcreteFields, Vec<&'static str>) {
    let mut kept = Vec::new();
    match map.get("url").or_else(|| map.get("endpoint")) {
        Some(Value::String(url)) if !url.trim().is_empty() => {
            fields.url = url.trim().to_string();
        }
        _ => kept.push("url"),
    }
    match map.get("headers") {
        Some(Value::Object(headers)) => {
            fields.headers = headers
                .iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), value_to_param_string(v)))
                .collect();
        }
        _ => kept.push("headers"),
    }
    match map.get("query_params") {
        Some(Value::Object(query)) => {
            fields.query_params = query.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        }
        _ => kept.push("query_params"),
    }
    match map.get("path_params") {
        Some(Value::Object(path)) => {
            fields.path_params = path.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        }
        _ => kept.push("path_params"),
    }
    match map.get("input_payload").or_else(|| map.get("payload")) {
        Some(payload @ (Value::Object(_) | Value::Array(_))) => {
            fields.input_payload = payload.clone();
        }
        _ => kept.push("input_payload"),
    }
    (fields, kept)
}

/// Plan entries; anything that is not a one-key reference object is dropped.
fn parse_plan(value: &Value) -> Vec<ExecutionPlanItem> {
    let Value::Array(items) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let map = item.as_object()?;
            let parsed = id_under(map, &["all_testcases", "test_case_ref"])
                .map(ExecutionPlanItem::TestCaseRef)
                .or_else(|| {
                    id_under(map, &["all_endpoints", "endpoint_ref"])
                        .map(ExecutionPlanItem::EndpointRef)
                });
            if parsed.is_none() {
                tracing::warn!(entry = %item, "dropping plan entry");
            }
            parsed
        })
        .collect()
}

fn id_under(map: &serde_json::Map<String, Value>, keys: &[&str]) -> Option<u64> {
    keys.iter().find_map(|k| map.get(*k).and_then(as_id))
}

fn as_id(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Every stored case once, in stored order.
#[must_use]
pub fn stored_plan(cases: &[TestCase]) -> Vec<ExecutionPlanItem> {
    cases
        .iter()
        .filter_map(|c| c.id)
        .map(ExecutionPlanItem::TestCaseRef)
        .collect()
}

/// A JSON list of ids, else every run of digits in the text.
fn parse_id_list(text: &str) -> Vec<u64> {
    if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(text) {
        let ids: Vec<u64> = items.iter().filter_map(as_id).collect();
        if !ids.is_empty() {
            return ids;
        }
    }
    text.split(|c: char| !c.is_ascii_digit())
        .filter(|run| !run.is_empty())
        .filter_map(|run| run.parse().ok())
        .collect()
}

/// Known ids in proposed order, duplicates removed, unmentioned ids appended.
fn complete_order(proposed: &[u64], known: &[u64]) -> Vec<u64> {
    let known_set: BTreeSet<u64> = known.iter().copied().collect();
    let mut seen = BTreeSet::new();
    let mut order: Vec<u64> = proposed
        .iter()
        .copied()
        .filter(|id| known_set.contains(id) && seen.insert(*id))
        .collect();
    order.extend(known.iter().copied().filter(|id| seen.insert(*id)));
    order
}


#[cfg(test)]
mod tests {
    use super::fake::CannedGenerator;
    use super::*;
    use serde_json::json;
    use specrun_core::TestType;

    fn op(id: u64, method: HttpMethod, path: &str) -> Operation {
        Operation {
            id: Some(id),
            ..Operation::new(method, path)
        }
    }

    fn template() -> TemplateFields {
        let case: TestCase = serde_json::from_value(json!({
            "test_name": "get user with valid token",
            "test_type": "positive",
            "method": "GET",
            "url": "/users/{id}",
            "headers": {"Authorization": "string - bearer token from login response"},
            "path_params": {"id": "integer - id from create user response"},
            "query_params": {"verbose": true},
            "expected_status": 200
        }))
        .unwrap();
        TemplateFields::from_case(&case)
    }

    #[test]
    fn clean_output_strips_fences_and_tag() {
        assert_eq!(clean_output("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(clean_output("```python\n[1, 2]```"), "[1, 2]");
        assert_eq!(clean_output("Here you go:\n```\n[3]\n```\nThanks"), "[3]");
        assert_eq!(clean_output("  {\"b\": 2}  "), "{\"b\": 2}");
        // a bare literal is data, not a language tag
        assert_eq!(clean_output("null"), "null");
        assert_eq!(clean_output("true\n"), "true");
    }

    #[test]
    fn literal_keeps_placeholders_as_text() {
        let fields = template().literal();
        assert_eq!(fields.url, "/users/{id}");
        assert_eq!(
            fields.headers["Authorization"],
            "string - bearer token from login response"
        );
        assert_eq!(fields.query_params["verbose"], json!(true));
        assert_eq!(fields.input_payload, json!({}));
    }

    #[test]
    fn enrichment_replaces_fields() {
        let gateway = OracleGateway::new(
            CannedGenerator::new([r#"```json
{"url": "http://api.test/users/7", "headers": {"Authorization": "Bearer abc"}, "path_params": {"id": 7}}
```"#]),
            "http://api.test",
        );
        let enriched = gateway.enrich_fields(&template(), &json!([]));
        assert!(!enriched.fallback_used);
        assert_eq!(enriched.fields.url, "http://api.test/users/7");
        assert_eq!(enriched.fields.headers["Authorization"], "Bearer abc");
        assert_eq!(enriched.fields.path_params["id"], json!(7));
        // not returned: kept from the template
        assert_eq!(enriched.fields.query_params["verbose"], json!(true));
    }

    #[test]
    fn enrichment_ignores_wrong_types() {
        let gateway = OracleGateway::new(
            CannedGenerator::new([r#"{"url": 5, "headers": "nope", "input_payload": "text"}"#]),
            "http://api.test",
        );
        let enriched = gateway.enrich_fields(&template(), &json!([]));
        assert!(enriched.fallback_used);
        assert_eq!(
            enriched.fallback_reason.as_deref(),
            Some("oracle omitted/mistyped: url, headers, query_params, path_params, input_payload")
        );
        assert_eq!(enriched.fields, template().literal());
    }

    #[test]
    fn empty_enrichment_is_flagged() {
        let gateway = OracleGateway::new(CannedGenerator::new(["{}"]), "http://api.test");
        let enriched = gateway.enrich_fields(&template(), &json!([]));
        assert!(enriched.fallback_used);
        assert_eq!(enriched.fields, template().literal());
    }

    #[test]
    fn kept_placeholder_fields_are_flagged() {
        let gateway = OracleGateway::new(
            CannedGenerator::new([r#"{"headers": {"Authorization": "Bearer abc"}}"#]),
            "http://api.test",
        );
        let enriched = gateway.enrich_fields(&template(), &json!([]));
        assert!(enriched.fallback_used);
        assert_eq!(
            enriched.fallback_reason.as_deref(),
            Some("oracle omitted/mistyped: url, path_params")
        );
        assert_eq!(enriched.fields.headers["Authorization"], "Bearer abc");
        assert_eq!(
            enriched.fields.path_params["id"],
            json!("integer - id from create user response")
        );
    }

    #[test]
    fn garbage_falls_back_to_template() {
        for reply in ["I cannot help with that", "[1, 2, 3]"] {
            let gateway = OracleGateway::new(CannedGenerator::new([reply]), "http://api.test");
            let enriched = gateway.enrich_fields(&template(), &json!([]));
            assert!(enriched.fallback_used, "{reply}");
            assert!(enriched.fallback_reason.is_some());
            assert_eq!(enriched.fields, template().literal());
        }
    }

    #[test]
    fn transport_failure_falls_back() {
        let gateway = OracleGateway::new(
            CannedGenerator::failing(OracleError::Status(503, "overloaded".into())),
            "http://api.test",
        );
        let enriched = gateway.enrich_fields(&template(), &json!([]));
        assert!(enriched.fallback_used);
        assert!(enriched.fallback_reason.unwrap().contains("503"));
    }

    #[test]
    fn enrich_prompt_carries_history() {
        let gateway = OracleGateway::new(CannedGenerator::new(["{}"]), "http://api.test");
        gateway.enrich_fields(&template(), &json!([{"key": "login", "token": "tok-123"}]));
        let prompts = gateway.generator().prompts.borrow();
        assert!(prompts[0].contains("tok-123"));
        assert!(prompts[0].contains("get user with valid token"));
        assert!(prompts[0].contains("http://api.test"));
    }

    #[test]
    fn generate_cases_keyed_by_label() {
        let gateway = OracleGateway::new(
            CannedGenerator::new([r#"```json
{"POST /users": [
  {"test_name": "create user", "test_type": "positive", "url": "/users",
   "input_payload": {"email": "string - random valid email"}, "expected_status": "201"},
  {"test_name": "missing status"},
  {"test_name": "create user without email", "test_type": "negative",
   "input_payload": null, "expected_status": 422, "expected_schema": {"type": "object"}}
]}
```"#]),
            "http://api.test",
        );
        let batches = gateway.generate_cases(&[op(4, HttpMethod::Post, "/users")]);
        assert_eq!(batches.len(), 1);
        let batch = &batches[0];
        assert_eq!(batch.label, "POST /users");
        assert_eq!(batch.endpoint_id, Some(4));
        assert!(batch.error.is_none());
        assert_eq!(batch.cases.len(), 2);
        assert_eq!(batch.cases[0].expected_status, 201);
        assert_eq!(batch.cases[0].endpoint_id, 4);
        assert_eq!(batch.cases[1].method, HttpMethod::Post);
        assert_eq!(batch.cases[1].url, "/users");
        assert!(batch.cases[1].input_payload.is_empty());
        assert_eq!(batch.cases[1].test_type, TestType::Negative);
    }

    #[test]
    fn generated_method_in_mixed_case_is_kept() {
        let op = op(5, HttpMethod::Post, "/orders");
        let cases = parse_cases(
            &op,
            &json!([{"test_name": "create order", "method": "Post", "expected_status": 201}]),
        );
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].method, HttpMethod::Post);
    }

    #[test]
    fn generate_cases_failure_is_per_operation() {
        let gateway = OracleGateway::new(
            CannedGenerator::new([
                "not json at all",
                r#"[{"test_name": "list", "expected_status": 200}]"#,
            ]),
            "http://api.test",
        );
        let batches = gateway.generate_cases(&[
            op(1, HttpMethod::Get, "/a"),
            op(2, HttpMethod::Get, "/b"),
        ]);
        assert!(batches[0].cases.is_empty());
        assert!(batches[0].error.is_some());
        assert_eq!(batches[1].cases.len(), 1);
        assert_eq!(batches[1].cases[0].url, "/b");
    }

    #[test]
    fn plan_accepts_both_key_styles() {
        let value = json!([
            {"all_endpoints": 2},
            {"all_testcases": 7},
            {"test_case_ref": "8"},
            {"endpoint_ref": 3},
            {"something": 1},
            "garbage"
        ]);
        assert_eq!(
            parse_plan(&value),
            vec![
                ExecutionPlanItem::EndpointRef(2),
                ExecutionPlanItem::TestCaseRef(7),
                ExecutionPlanItem::TestCaseRef(8),
                ExecutionPlanItem::EndpointRef(3),
            ]
        );
    }

    #[test]
    fn unusable_plan_falls_back_to_stored_order() {
        let gateway = OracleGateway::new(CannedGenerator::new(["{\"order\": 1}"]), "x");
        let mut a: TestCase = serde_json::from_value(
            json!({"test_name": "a", "method": "GET", "expected_status": 200}),
        )
        .unwrap();
        a.id = Some(11);
        let mut b = a.clone();
        b.id = Some(12);
        assert_eq!(
            gateway.plan_order(&[], &[a, b]),
            vec![
                ExecutionPlanItem::TestCaseRef(11),
                ExecutionPlanItem::TestCaseRef(12)
            ]
        );
    }

    #[test]
    fn order_endpoints_from_list() {
        let ops = [
            op(1, HttpMethod::Get, "/a"),
            op(2, HttpMethod::Post, "/login"),
            op(3, HttpMethod::Delete, "/a/{id}"),
        ];
        let gateway =
            OracleGateway::new(CannedGenerator::new(["```python\n[2, 1, 1, 99]\n```"]), "x");
        // duplicates and unknown ids dropped, unmentioned appended
        assert_eq!(gateway.order_endpoints(&ops), vec![2, 1, 3]);
    }

    #[test]
    fn order_endpoints_from_prose() {
        let ops = [op(1, HttpMethod::Get, "/a"), op(2, HttpMethod::Post, "/login")];
        let gateway = OracleGateway::new(
            CannedGenerator::new(["Run endpoint 2 first, then endpoint 1."]),
            "x",
        );
        assert_eq!(gateway.order_endpoints(&ops), vec![2, 1]);
    }

    #[test]
    fn order_endpoints_falls_back_to_stored() {
        let ops = [op(5, HttpMethod::Get, "/a"), op(6, HttpMethod::Get, "/b")];
        let gateway = OracleGateway::new(
            CannedGenerator::failing(OracleError::Transport("down".into())),
            "x",
        );
        assert_eq!(gateway.order_endpoints(&ops), vec![5, 6]);
    }
}
