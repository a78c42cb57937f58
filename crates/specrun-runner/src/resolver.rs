//! Reference resolution: raw interface document → self-contained operations
//!
//! Every `$ref` reachable from an operation is inlined. Resolution tracks the
//! chain of pointers currently being expanded; a pointer that reappears on its
//! own chain is emitted as the raw `{"$ref": ...}` marker, which stops cycles
//! while still inlining a shared schema at every place it is used.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use specrun_core::{HttpMethod, Operation, ParamLocation, Parameter, RequestBody, ResponseSpec};

const DEFAULT_MEDIA_TYPE: &str = "application/json";
const FORM_MEDIA_TYPE: &str = "application/x-www-form-urlencoded";

/// Swagger 2.0 parameter keys that make up a non-body parameter's schema.
const SWAGGER2_SCHEMA_KEYS: &[&str] = &[
    "type",
    "format",
    "items",
    "enum",
    "default",
    "minimum",
    "maximum",
    "exclusiveMinimum",
    "exclusiveMaximum",
    "multipleOf",
    "minLength",
    "maxLength",
    "pattern",
    "minItems",
    "maxItems",
    "uniqueItems",
];

/// An operation that could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveIssue {
    /// "GET /users", or "document" for document-level problems
    pub location: String,
    pub message: String,
}

impl std::fmt::Display for ResolveIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

/// Resolution output: operations that resolved, plus the ones that did not.
#[derive(Debug, Clone, Default)]
pub struct Resolved {
    pub operations: Vec<Operation>,
    pub issues: Vec<ResolveIssue>,
}

/// Resolve every `path × method` of `doc` into an [`Operation`].
///
/// Malformed operations are skipped; see [`resolve_document`] for the reasons.
#[must_use]
pub fn resolve(doc: &Value) -> Vec<Operation> {
    resolve_document(doc).operations
}

/// Resolve `doc`, keeping a record of skipped operations.
#[must_use]
pub fn resolve_document(doc: &Value) -> Resolved {
    let mut out = Resolved::default();
    let Some(paths) = doc.get("paths").and_then(Value::as_object) else {
        out.issues.push(ResolveIssue {
            location: "document".into(),
            message: "no `paths` object".into(),
        });
        return out;
    };

    let ctx = DocContext::new(doc);
    let mut refs = RefResolver::new(doc);

    for (path, raw_item) in paths {
        let item = refs.deref(raw_item);
        let Some(item) = item.as_object() else {
            out.issues.push(ResolveIssue {
                location: path.clone(),
                message: "path item is not an object".into(),
            });
            continue;
        };
        let shared_params = item
            .get("parameters")
            .map(|p| refs.resolve_value(p))
            .unwrap_or(Value::Null);

        for method in HttpMethod::ALL {
            let Some(raw_op) = item.get(&method.as_str().to_ascii_lowercase()) else {
                continue;
            };
            let label = format!("{method} {path}");
            let resolved_op = refs.resolve_value(raw_op);
            match build_operation(&ctx, path, method, &resolved_op, &shared_params) {
                Ok(op) => out.operations.push(op),
                Err(message) => {
                    tracing::warn!(operation = %label, %message, "skipping operation");
                    out.issues.push(ResolveIssue {
                        location: label,
                        message,
                    });
                }
            }
        }
    }
    out
}

/// Document-wide defaults consulted while building operations.
struct DocContext {
    swagger2: bool,
    produces: Vec<String>,
    consumes: Vec<String>,
    security: Option<Value>,
}

impl DocContext {
    fn new(doc: &Value) -> Self {
        Self {
            swagger2: doc
                .get("swagger")
                .and_then(Value::as_str)
                .is_some_and(|v| v.starts_with('2')),
            produces: string_list(doc.get("produces")),
            consumes: string_list(doc.get("consumes")),
            security: doc.get("security").cloned(),
        }
    }
}

/// Resolves local JSON pointers against one document.
struct RefResolver<'a> {
    root: &'a Value,
    /// Pointers currently being expanded, outermost first
    chain: Vec<String>,
}

impl<'a> RefResolver<'a> {
    fn new(root: &'a Value) -> Self {
        Self {
            root,
            chain: Vec::new(),
        }
    }

    /// Follow a top-level `$ref` without resolving the target's contents.
    fn deref<'v>(&self, value: &'v Value) -> &'v Value
    where
        'a: 'v,
    {
        match value.get("$ref").and_then(Value::as_str) {
            Some(reference) => lookup_pointer(self.root, reference).unwrap_or(value),
            None => value,
        }
    }

    fn resolve_value(&mut self, value: &Value) -> Value {
        match value {
            Value::Object(map) => {
                if let Some(reference) = map.get("$ref").and_then(Value::as_str) {
                    return self.resolve_ref(reference, value);
                }
                Value::Object(
                    map.iter()
                        .map(|(k, v)| (k.clone(), self.resolve_value(v)))
                        .collect(),
                )
            }
            Value::Array(items) => {
                Value::Array(items.iter().map(|v| self.resolve_value(v)).collect())
            }
            other => other.clone(),
        }
    }

    fn resolve_ref(&mut self, reference: &str, original: &Value) -> Value {
        if self.chain.iter().any(|r| r == reference) {
            let mut marker = Map::new();
            marker.insert("$ref".into(), Value::String(reference.to_string()));
            return Value::Object(marker);
        }
        let Some(target) = lookup_pointer(self.root, reference) else {
            tracing::warn!(reference, "unresolvable $ref kept verbatim");
            return original.clone();
        };
        self.chain.push(reference.to_string());
        let resolved = self.resolve_value(target);
        self.chain.pop();
        resolved
    }
}

/// Look up a local reference (`#/components/schemas/User`).
///
/// Returns `None` for remote references and missing segments.
fn lookup_pointer<'v>(root: &'v Value, reference: &str) -> Option<&'v Value> {
    let fragment = reference.strip_prefix('#')?;
    if fragment.is_empty() {
        return Some(root);
    }
    // serde_json handles the ~0 / ~1 escapes
    root.pointer(fragment)
}

fn build_operation(
    ctx: &DocContext,
    path: &str,
    method: HttpMethod,
    op: &Value,
    shared_params: &Value,
) -> Result<Operation, String> {
    let obj = op
        .as_object()
        .ok_or_else(|| "operation is not an object".to_string())?;

    let raw_params = merge_parameters(shared_params, obj.get("parameters"))?;
    let consumes = non_empty_or(string_list(obj.get("consumes")), &ctx.consumes);
    let produces = non_empty_or(string_list(obj.get("produces")), &ctx.produces);

    let mut parameters = Vec::new();
    let mut request_body = obj.get("requestBody").map(parse_request_body).transpose()?;
    let mut form_fields: Vec<(String, Value, bool)> = Vec::new();

    for raw in &raw_params {
        let name = raw
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| "parameter without a name".to_string())?;
        let location = raw
            .get("in")
            .and_then(Value::as_str)
            .ok_or_else(|| format!("parameter '{name}' has no `in`"))?;
        let required = raw.get("required").and_then(Value::as_bool).unwrap_or(false);
        match location {
            "body" => {
                let schema = raw.get("schema").cloned().unwrap_or_else(empty_schema);
                request_body = Some(RequestBody {
                    required,
                    description: text(raw.get("description")),
                    content: media_map(&consumes, &schema),
                });
            }
            "formData" => {
                form_fields.push((name.to_string(), parameter_schema(raw), required));
            }
            other => {
                let location = ParamLocation::parse(other)
                    .ok_or_else(|| format!("parameter '{name}' has unknown location '{other}'"))?;
                parameters.push(Parameter {
                    name: name.to_string(),
                    location,
                    // path parameters are always required
                    required: required || location == ParamLocation::Path,
                    description: text(raw.get("description")),
                    schema: parameter_schema(raw),
                });
            }
        }
    }

    if !form_fields.is_empty() && request_body.is_none() {
        request_body = Some(form_body(form_fields, &consumes));
    }

    let responses = match obj.get("responses") {
        None => BTreeMap::new(),
        Some(Value::Object(map)) => map
            .iter()
            .map(|(status, resp)| (status.clone(), parse_response(ctx, resp, &produces)))
            .collect(),
        Some(_) => return Err("`responses` is not an object".into()),
    };

    Ok(Operation {
        id: None,
        path: path.to_string(),
        method,
        summary: text(obj.get("summary")),
        description: text(obj.get("description")),
        tags: string_list(obj.get("tags")),
        operation_id: text(obj.get("operationId")),
        deprecated: obj.get("deprecated").and_then(Value::as_bool).unwrap_or(false),
        parameters,
        request_body,
        responses,
        security: obj.get("security").cloned().or_else(|| ctx.security.clone()),
        extensions: obj
            .iter()
            .filter(|(k, _)| k.starts_with("x-"))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    })
}

/// Path-level parameters first; an operation-level parameter with the same
/// `(name, in)` replaces the shared one in place.
fn merge_parameters(shared: &Value, own: Option<&Value>) -> Result<Vec<Value>, String> {
    let as_list = |v: &Value| -> Result<Vec<Value>, String> {
        match v {
            Value::Null => Ok(Vec::new()),
            Value::Array(items) => Ok(items.clone()),
            _ => Err("`parameters` is not an array".into()),
        }
    };
    let mut merged = as_list(shared)?;
    for param in as_list(own.unwrap_or(&Value::Null))? {
        let key = param_key(&param);
        match merged.iter_mut().find(|p| key.is_some() && param_key(p) == key) {
            Some(slot) => *slot = param,
            None => merged.push(param),
        }
    }
    Ok(merged)
}

fn param_key(param: &Value) -> Option<(String, String)> {
    Some((
        param.get("name")?.as_str()?.to_string(),
        param.get("in")?.as_str()?.to_string(),
    ))
}

/// OpenAPI 3 `schema`, or the inline Swagger 2 type keywords.
fn parameter_schema(raw: &Value) -> Value {
    if let Some(schema) = raw.get("schema") {
        return schema.clone();
    }
    let inline: Map<String, Value> = SWAGGER2_SCHEMA_KEYS
        .iter()
        .filter_map(|&k| raw.get(k).map(|v| (k.to_string(), v.clone())))
        .collect();
    if inline.is_empty() {
        serde_json::json!({"type": "string"})
    } else {
        Value::Object(inline)
    }
}

fn parse_request_body(raw: &Value) -> Result<RequestBody, String> {
    let obj = raw
        .as_object()
        .ok_or_else(|| "`requestBody` is not an object".to_string())?;
    Ok(RequestBody {
        required: obj.get("required").and_then(Value::as_bool).unwrap_or(false),
        description: text(obj.get("description")),
        content: content_map(obj.get("content")),
    })
}

fn parse_response(ctx: &DocContext, raw: &Value, produces: &[String]) -> ResponseSpec {
    let mut content = content_map(raw.get("content"));
    if ctx.swagger2 || content.is_empty() {
        if let Some(schema) = raw.get("schema") {
            content = media_map(produces, schema);
        }
    }
    ResponseSpec {
        description: text(raw.get("description")),
        content,
    }
}

/// OpenAPI 3 `content`: media type → `schema` (empty schema when absent).
fn content_map(content: Option<&Value>) -> BTreeMap<String, Value> {
    content
        .and_then(Value::as_object)
        .map(|media| {
            media
                .iter()
                .map(|(ty, obj)| {
                    let schema = obj.get("schema").cloned().unwrap_or_else(empty_schema);
                    (ty.clone(), schema)
                })
                .collect()
        })
        .unwrap_or_default()
}

fn media_map(types: &[String], schema: &Value) -> BTreeMap<String, Value> {
    if types.is_empty() {
        return BTreeMap::from([(DEFAULT_MEDIA_TYPE.to_string(), schema.clone())]);
    }
    types.iter().map(|t| (t.clone(), schema.clone())).collect()
}

/// Swagger 2 `formData` parameters folded into one object schema.
fn form_body(fields: Vec<(String, Value, bool)>, consumes: &[String]) -> RequestBody {
    let required: Vec<Value> = fields
        .iter()
        .filter(|(_, _, req)| *req)
        .map(|(name, _, _)| Value::String(name.clone()))
        .collect();
    let properties: Map<String, Value> = fields
        .into_iter()
        .map(|(name, schema, _)| (name, schema))
        .collect();
    let mut schema = Map::new();
    schema.insert("type".into(), Value::String("object".into()));
    schema.insert("properties".into(), Value::Object(properties));
    if !required.is_empty() {
        schema.insert("required".into(), Value::Array(required));
    }
    let types = if consumes.is_empty() {
        vec![FORM_MEDIA_TYPE.to_string()]
    } else {
        consumes.to_vec()
    };
    RequestBody {
        required: schema.contains_key("required"),
        description: None,
        content: media_map(&types, &Value::Object(schema)),
    }
}

fn empty_schema() -> Value {
    Value::Object(Map::new())
}

fn text(v: Option<&Value>) -> Option<String> {
    v.and_then(Value::as_str).map(str::to_string)
}

fn string_list(v: Option<&Value>) -> Vec<String> {
    v.and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn non_empty_or(own: Vec<String>, fallback: &[String]) -> Vec<String> {
    if own.is_empty() { fallback.to_vec() } else { own }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn petstore() -> Value {
        json!({
            "openapi": "3.0.0",
            "paths": {
                "/pets/{petId}": {
                    "parameters": [
                        {"name": "petId", "in": "path", "schema": {"type": "integer"}},
                        {"$ref": "#/components/parameters/Trace"}
                    ],
                    "get": {
                        "summary": "Get a pet",
                        "tags": ["pets"],
                        "operationId": "getPet",
                        "x-rate-limit": 10,
                        "parameters": [
                            {"name": "petId", "in": "path", "required": true,
                             "schema": {"type": "string", "format": "uuid"}}
                        ],
                        "responses": {
                            "200": {
                                "description": "ok",
                                "content": {"application/json": {
                                    "schema": {"$ref": "#/components/schemas/Pet"}
                                }}
                            },
                            "404": {"$ref": "#/components/responses/NotFound"}
                        }
                    },
                    "delete": {"responses": {"204": {"description": "gone"}}}
                },
                "/pets": {
                    "post": {
                        "requestBody": {
                            "required": true,
                            "content": {"application/json": {
                                "schema": {"$ref": "#/components/schemas/Pet"}
                            }}
                        },
                        "responses": {"201": {"description": "created"}}
                    }
                }
            },
            "components": {
                "parameters": {
                    "Trace": {"name": "X-Trace", "in": "header", "schema": {"type": "string"}}
                },
                "responses": {
                    "NotFound": {
                        "description": "missing",
                        "content": {"application/json": {
                            "schema": {"$ref": "#/components/schemas/Error"}
                        }}
                    }
                },
                "schemas": {
                    "Pet": {
                        "type": "object",
                        "required": ["id"],
                        "properties": {
                            "id": {"type": "integer"},
                            "owner": {"$ref": "#/components/schemas/Owner"},
                            "vet": {"$ref": "#/components/schemas/Owner"}
                        }
                    },
                    "Owner": {"type": "object", "properties": {"name": {"type": "string"}}},
                    "Error": {"type": "object", "properties": {"message": {"type": "string"}}}
                }
            }
        })
    }

    fn find<'a>(ops: &'a [Operation], method: HttpMethod, path: &str) -> &'a Operation {
        ops.iter()
            .find(|o| o.method == method && o.path == path)
            .unwrap()
    }

    fn contains_ref(v: &Value) -> bool {
        match v {
            Value::Object(map) => map.contains_key("$ref") || map.values().any(contains_ref),
            Value::Array(items) => items.iter().any(contains_ref),
            _ => false,
        }
    }

    #[test]
    fn resolves_operations() {
        let resolved = resolve_document(&petstore());
        assert!(resolved.issues.is_empty(), "{:?}", resolved.issues);
        let ops = resolved.operations;
        assert_eq!(ops.len(), 3);

        let get = find(&ops, HttpMethod::Get, "/pets/{petId}");
        assert_eq!(get.summary.as_deref(), Some("Get a pet"));
        assert_eq!(get.tags, vec!["pets"]);
        assert_eq!(get.operation_id.as_deref(), Some("getPet"));
        assert_eq!(get.extensions["x-rate-limit"], json!(10));

        let schema = &get.responses["200"].content["application/json"];
        assert_eq!(schema["required"], json!(["id"]));
        assert_eq!(schema["properties"]["owner"]["properties"]["name"]["type"], "string");
        // shared schema inlined at both sites
        assert_eq!(schema["properties"]["vet"], schema["properties"]["owner"]);

        let not_found = &get.responses["404"];
        assert_eq!(not_found.description.as_deref(), Some("missing"));
        assert_eq!(
            not_found.content["application/json"]["properties"]["message"]["type"],
            "string"
        );

        for op in &ops {
            assert!(!contains_ref(&serde_json::to_value(op).unwrap()), "{}", op.label());
        }
    }

    #[test]
    fn operation_parameters_override_path_level() {
        let ops = resolve(&petstore());
        let get = find(&ops, HttpMethod::Get, "/pets/{petId}");
        assert_eq!(get.parameters.len(), 2);
        let pet_id = &get.parameters[0];
        assert_eq!(pet_id.name, "petId");
        assert_eq!(pet_id.schema["format"], "uuid");
        assert!(pet_id.required);
        let trace = &get.parameters[1];
        assert_eq!(trace.name, "X-Trace");
        assert_eq!(trace.location, ParamLocation::Header);

        // path-level parameters reach every method
        let delete = find(&ops, HttpMethod::Delete, "/pets/{petId}");
        assert_eq!(delete.parameters[0].schema["type"], "integer");
    }

    #[test]
    fn request_body_resolved() {
        let ops = resolve(&petstore());
        let post = find(&ops, HttpMethod::Post, "/pets");
        let body = post.request_body.as_ref().unwrap();
        assert!(body.required);
        assert_eq!(body.content["application/json"]["type"], "object");
    }

    #[test]
    fn cycle_terminates_with_marker() {
        let doc = json!({
            "paths": {"/a": {"get": {"responses": {"200": {"content": {"application/json": {
                "schema": {"$ref": "#/components/schemas/A"}
            }}}}}}},
            "components": {"schemas": {
                "A": {"type": "object", "properties": {"b": {"$ref": "#/components/schemas/B"}}},
                "B": {"type": "object", "properties": {"a": {"$ref": "#/components/schemas/A"}}}
            }}
        });
        let ops = resolve(&doc);
        let schema = &ops[0].responses["200"].content["application/json"];
        assert_eq!(
            schema["properties"]["b"]["properties"]["a"],
            json!({"$ref": "#/components/schemas/A"})
        );
    }

    #[test]
    fn self_reference_terminates() {
        let doc = json!({
            "paths": {"/tree": {"get": {"responses": {"200": {"content": {"application/json": {
                "schema": {"$ref": "#/components/schemas/Node"}
            }}}}}}},
            "components": {"schemas": {
                "Node": {"type": "object", "properties": {
                    "children": {"type": "array", "items": {"$ref": "#/components/schemas/Node"}}
                }}
            }}
        });
        let ops = resolve(&doc);
        let schema = &ops[0].responses["200"].content["application/json"];
        assert_eq!(
            schema["properties"]["children"]["items"],
            json!({"$ref": "#/components/schemas/Node"})
        );
    }

    #[test]
    fn unresolvable_refs_kept_verbatim() {
        let doc = json!({
            "paths": {"/x": {"get": {"responses": {
                "200": {"content": {"application/json": {"schema": {"$ref": "#/components/schemas/Nope"}}}},
                "400": {"content": {"application/json": {"schema": {"$ref": "other.yaml#/Err"}}}}
            }}}}
        });
        let ops = resolve(&doc);
        assert_eq!(
            ops[0].responses["200"].content["application/json"],
            json!({"$ref": "#/components/schemas/Nope"})
        );
        assert_eq!(
            ops[0].responses["400"].content["application/json"],
            json!({"$ref": "other.yaml#/Err"})
        );
    }

    #[test]
    fn pointer_escapes() {
        let doc = json!({
            "paths": {"/x": {"get": {"responses": {"200": {"content": {"application/json": {
                "schema": {"$ref": "#/definitions/a~1b~0c"}
            }}}}}}},
            "definitions": {"a/b~c": {"type": "string"}}
        });
        let ops = resolve(&doc);
        assert_eq!(
            ops[0].responses["200"].content["application/json"],
            json!({"type": "string"})
        );
    }

    #[test]
    fn malformed_operation_is_isolated() {
        let doc = json!({
            "paths": {
                "/bad": {
                    "get": "not an operation",
                    "post": {"parameters": [{"in": "query"}]},
                    "put": {"parameters": [{"name": "q", "in": "matrix"}]}
                },
                "/good": {"get": {"responses": {"200": {"description": "ok"}}}}
            }
        });
        let resolved = resolve_document(&doc);
        assert_eq!(resolved.operations.len(), 1);
        assert_eq!(resolved.operations[0].label(), "GET /good");
        assert_eq!(resolved.issues.len(), 3);
        assert_eq!(resolved.issues[0].location, "GET /bad");
        assert!(resolved.issues[2].message.contains("matrix"));
    }

    #[test]
    fn missing_paths_is_an_issue() {
        let resolved = resolve_document(&json!({"openapi": "3.0.0"}));
        assert!(resolved.operations.is_empty());
        assert_eq!(resolved.issues[0].location, "document");
    }

    #[test]
    fn swagger2_body_and_response_schema() {
        let doc = json!({
            "swagger": "2.0",
            "produces": ["application/json", "application/xml"],
            "security": [{"api_key": []}],
            "paths": {
                "/users": {
                    "post": {
                        "consumes": ["application/json"],
                        "parameters": [
                            {"name": "body", "in": "body", "required": true,
                             "schema": {"$ref": "#/definitions/User"}},
                            {"name": "dryRun", "in": "query", "type": "boolean"}
                        ],
                        "responses": {"201": {"description": "created",
                                              "schema": {"$ref": "#/definitions/User"}}}
                    }
                },
                "/upload": {
                    "post": {
                        "parameters": [
                            {"name": "file", "in": "formData", "type": "file", "required": true},
                            {"name": "note", "in": "formData", "type": "string"}
                        ],
                        "responses": {"200": {"description": "ok"}}
                    }
                }
            },
            "definitions": {
                "User": {"type": "object", "properties": {"id": {"type": "integer"}}}
            }
        });
        let ops = resolve(&doc);
        assert_eq!(ops.len(), 2);

        let users = find(&ops, HttpMethod::Post, "/users");
        let body = users.request_body.as_ref().unwrap();
        assert!(body.required);
        assert_eq!(body.content.len(), 1);
        assert_eq!(body.content["application/json"]["properties"]["id"]["type"], "integer");
        assert_eq!(users.parameters.len(), 1);
        assert_eq!(users.parameters[0].schema, json!({"type": "boolean"}));

        let created = &users.responses["201"];
        assert_eq!(created.content.len(), 2);
        assert_eq!(created.content["application/xml"]["type"], "object");
        assert_eq!(users.security, Some(json!([{"api_key": []}])));

        let upload = find(&ops, HttpMethod::Post, "/upload");
        let form = &upload.request_body.as_ref().unwrap().content[FORM_MEDIA_TYPE];
        assert_eq!(form["required"], json!(["file"]));
        assert_eq!(form["properties"]["note"]["type"], "string");
    }

    #[test]
    fn output_independent_of_document() {
        let mut doc = petstore();
        let before = resolve(&doc);
        doc["components"]["schemas"]["Pet"]["required"] = json!(["name"]);
        let get = find(&before, HttpMethod::Get, "/pets/{petId}");
        assert_eq!(get.responses["200"].content["application/json"]["required"], json!(["id"]));
    }

    /// Document whose `S{i}` schemas reference each other along `edges`.
    fn graph_doc(edges: &[Vec<usize>]) -> Value {
        let n = edges.len();
        let schemas: Map<String, Value> = edges
            .iter()
            .enumerate()
            .map(|(i, targets)| {
                let props: Map<String, Value> = targets
                    .iter()
                    .enumerate()
                    .map(|(k, t)| {
                        (
                            format!("p{k}"),
                            json!({"$ref": format!("#/components/schemas/S{}", t % n)}),
                        )
                    })
                    .collect();
                (format!("S{i}"), json!({"type": "object", "properties": props}))
            })
            .collect();
        json!({
            "paths": {"/g": {"get": {"responses": {"200": {"content": {"application/json": {
                "schema": {"$ref": "#/components/schemas/S0"}
            }}}}}}},
            "components": {"schemas": schemas}
        })
    }

    proptest! {
        #[test]
        fn resolution_terminates_and_is_idempotent(
            edges in prop::collection::vec(prop::collection::vec(0usize..6, 0..3), 1..6)
        ) {
            let doc = graph_doc(&edges);
            let first = resolve(&doc);
            let second = resolve(&doc);
            prop_assert_eq!(first.len(), 1);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn acyclic_graphs_inline_completely(
            raw in prop::collection::vec(prop::collection::vec(1usize..6, 0..3), 1..6)
        ) {
            // only forward edges: i → j with j > i
            let n = raw.len();
            let edges: Vec<Vec<usize>> = raw
                .iter()
                .enumerate()
                .map(|(i, ts)| ts.iter().map(|t| i + t).filter(|&j| j < n).collect())
                .collect();
            let ops = resolve(&graph_doc(&edges));
            let schema = &ops[0].responses["200"].content["application/json"];
            prop_assert!(!contains_ref(schema));
        }
    }
}
