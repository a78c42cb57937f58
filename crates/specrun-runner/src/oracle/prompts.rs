//! Prompt text sent to the text generator

use serde_json::{Value, json};

use specrun_core::{Operation, TestCase};

fn pretty(value: &impl serde::Serialize) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

/// Id, method, path and summary only; enough to reason about dependencies.
fn outline(operations: &[Operation]) -> Value {
    Value::Array(
        operations
            .iter()
            .map(|op| {
                json!({
                    "id": op.id,
                    "method": op.method,
                    "path": op.path,
                    "summary": op.summary,
                    "parameters": op.parameters.iter().map(|p| &p.name).collect::<Vec<_>>(),
                    "has_body": op.request_body.is_some(),
                })
            })
            .collect(),
    )
}

pub(super) fn generate_cases(op: &Operation) -> String {
    let label = op.label();
    let mut lines = Vec::new();
    lines.push("You are an API test designer.".to_string());
    lines.push(
        "Write test cases for the operation below: positive, negative, edge, schema and auth cases where they apply."
            .to_string(),
    );
    lines.push(String::new());
    lines.push("Rules:".to_string());
    lines.push("- Do not invent concrete values. Describe each value as a placeholder string,".to_string());
    lines.push("  e.g. \"string - random valid email\" or \"integer - id from the create response\".".to_string());
    lines.push("- Every case has: test_name, test_type, method, url, headers, query_params,".to_string());
    lines.push("  path_params, input_payload, expected_status, expected_schema.".to_string());
    lines.push("- test_type is one of positive, negative, edge, schema, auth.".to_string());
    lines.push("- expected_status is an integer status code.".to_string());
    lines.push("- expected_schema is a JSON Schema for the response body, or {} when none applies.".to_string());
    lines.push("- Use {} for empty headers, query_params, path_params and input_payload.".to_string());
    lines.push(format!("- Return JSON only: an object with the single key \"{label}\" holding an array of cases."));
    lines.push(String::new());
    lines.push("Operation:".to_string());
    lines.push(pretty(op));
    lines.join("\n")
}

pub(super) fn enrich(base_url: &str, template: &Value, history: &Value) -> String {
    let mut lines = Vec::new();
    lines.push("You fill in test data for API requests.".to_string());
    lines.push("Replace every placeholder in the request below with a value that fits its test_type:".to_string());
    lines.push("- positive: realistic valid values; values that depend on earlier calls (ids, tokens)".to_string());
    lines.push("  MUST be copied from the 'response' of the matching execution log entry.".to_string());
    lines.push("- negative: invalid, malformed or out-of-range values; a missing field becomes \"\" or null.".to_string());
    lines.push("- edge: boundary values (empty or very long strings, extreme numbers, special characters).".to_string());
    lines.push("- auth: valid tokens only from the 'response' of the authentication call in the logs;".to_string());
    lines.push("  for invalid auth use an empty, expired or deliberately wrong token. Never invent a valid token.".to_string());
    lines.push(String::new());
    lines.push("Rules:".to_string());
    lines.push("- Modify only url, headers, query_params, path_params and input_payload.".to_string());
    lines.push("- Keep every field name; do not add or remove fields.".to_string());
    lines.push(format!("- The server base URL is {base_url}; return url as an absolute URL."));
    lines.push("- Return a single JSON object with those five keys and nothing else.".to_string());
    lines.push(String::new());
    lines.push("Execution logs:".to_string());
    lines.push(pretty(history));
    lines.push(String::new());
    lines.push("Request with placeholders:".to_string());
    lines.push(pretty(template));
    lines.join("\n")
}

pub(super) fn plan_order(operations: &[Operation], cases: &[TestCase]) -> String {
    let cases: Vec<Value> = cases
        .iter()
        .map(|c| {
            json!({
                "id": c.id,
                "test_name": c.test_name,
                "test_type": c.effective_type(),
                "method": c.method,
                "url": c.url,
            })
        })
        .collect();

    let mut lines = Vec::new();
    lines.push("You plan the execution order of API tests.".to_string());
    lines.push("Order the test cases below so that every case can run:".to_string());
    lines.push("- Insert endpoints from the endpoint list as setup steps when a case needs data".to_string());
    lines.push("  (a token, a created resource id). Login runs before protected calls, logout last.".to_string());
    lines.push("- Create/register runs before get, update and delete.".to_string());
    lines.push("- Negative cases run after their positive case; edge cases before destructive ones.".to_string());
    lines.push("- Negative authentication cases run at the very end.".to_string());
    lines.push("- Every test case appears exactly once.".to_string());
    lines.push(String::new());
    lines.push("Return JSON only: an array of one-key objects, {\"all_endpoints\": <endpoint id>}".to_string());
    lines.push("for a setup step or {\"all_testcases\": <test case id>} for a test case.".to_string());
    lines.push(String::new());
    lines.push("Endpoints:".to_string());
    lines.push(pretty(&outline(operations)));
    lines.push(String::new());
    lines.push("Test cases:".to_string());
    lines.push(pretty(&cases));
    lines.join("\n")
}

pub(super) fn order_endpoints(operations: &[Operation]) -> String {
    let mut lines = Vec::new();
    lines.push("You plan the execution order of API endpoints for a smoke test.".to_string());
    lines.push("Respect dependencies: register before login, login before protected calls,".to_string());
    lines.push("create before get, update and delete.".to_string());
    lines.push("Return JSON only: an array of endpoint ids (integers).".to_string());
    lines.push(String::new());
    lines.push("Endpoints:".to_string());
    lines.push(pretty(&outline(operations)));
    lines.join("\n")
}
