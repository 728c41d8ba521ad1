//! Version detection and endpoint extraction.

use serde_json::{Map, Value};

use api_harness_core::models::{Endpoint, ParsedDocument, SpecInfo, SpecVersion};

use super::refs::Resolver;
use super::ParseError;

const METHODS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// Identify the document format from its root object.
pub fn detect_version(root: &Value) -> Result<SpecVersion, ParseError> {
    let obj = root
        .as_object()
        .ok_or_else(|| ParseError::invalid("document root must be an object"))?;

    if let Some(swagger) = obj.get("swagger") {
        return match version_string(swagger).as_deref() {
            Some("2.0") => Ok(SpecVersion::SwaggerV2),
            Some(v) => Err(ParseError::invalid(format!(
                "unsupported swagger version '{}'",
                v
            ))),
            None => Err(ParseError::invalid("swagger field must be a string")),
        };
    }

    if let Some(openapi) = obj.get("openapi") {
        let version = version_string(openapi)
            .ok_or_else(|| ParseError::invalid("openapi field must be a string"))?;
        return if version.starts_with("3.0") {
            Ok(SpecVersion::OpenApiV3)
        } else if version.starts_with("3.1") {
            Ok(SpecVersion::OpenApiV3_1)
        } else {
            Err(ParseError::invalid(format!(
                "unsupported openapi version '{}'",
                version
            )))
        };
    }

    Err(ParseError::invalid(
        "not a valid OpenAPI or Swagger document: missing 'openapi' or 'swagger' field",
    ))
}

// YAML may decode `openapi: 3.0` as a number.
fn version_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Extract metadata and endpoints from a decoded document.
pub fn extract_document(root: &Value) -> Result<ParsedDocument, ParseError> {
    let spec_version = detect_version(root)?;
    let info = extract_info(root, spec_version)?;

    let paths = match root.get("paths") {
        Some(Value::Object(paths)) => paths,
        Some(Value::Null) | None if spec_version == SpecVersion::OpenApiV3_1 => {
            return Ok(ParsedDocument {
                info,
                endpoints: Vec::new(),
            })
        }
        Some(_) => return Err(ParseError::invalid("'paths' must be an object")),
        None => return Err(ParseError::invalid("document has no 'paths' object")),
    };

    let resolver = Resolver::new(root);
    let mut endpoints = Vec::new();

    for (path, item) in paths {
        let item = resolver.resolve(item)?;
        let item = item
            .as_object()
            .ok_or_else(|| ParseError::invalid(format!("path item '{}' must be an object", path)))?;

        let shared_params = item.get("parameters").and_then(Value::as_array);

        for method in METHODS {
            let Some(op) = item.get(method) else {
                continue;
            };
            let op = op.as_object().ok_or_else(|| {
                ParseError::invalid(format!("{} {} must be an object", method, path))
            })?;
            endpoints.push(build_endpoint(&resolver, path, method, op, shared_params)?);
        }
    }

    Ok(ParsedDocument { info, endpoints })
}

fn extract_info(root: &Value, spec_version: SpecVersion) -> Result<SpecInfo, ParseError> {
    let info = root
        .get("info")
        .and_then(Value::as_object)
        .ok_or_else(|| ParseError::invalid("document has no 'info' object"))?;

    Ok(SpecInfo {
        title: str_field(info, "title").unwrap_or_else(|| "Untitled".to_string()),
        version: info
            .get("version")
            .and_then(version_string)
            .unwrap_or_default(),
        description: str_field(info, "description"),
        spec_version,
    })
}

fn build_endpoint(
    resolver: &Resolver<'_>,
    path: &str,
    method: &str,
    op: &Map<String, Value>,
    shared_params: Option<&Vec<Value>>,
) -> Result<Endpoint, ParseError> {
    let mut endpoint = Endpoint::new(method, path);
    endpoint.operation_id = str_field(op, "operationId");
    endpoint.summary = str_field(op, "summary");
    endpoint.description = str_field(op, "description");
    endpoint.deprecated = op.get("deprecated").and_then(Value::as_bool).unwrap_or(false);
    endpoint.tags = op
        .get("tags")
        .and_then(Value::as_array)
        .map(|tags| {
            tags.iter()
                .filter_map(|t| t.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    let op_params = op.get("parameters").and_then(Value::as_array);
    let params = merge_parameters(resolver, shared_params, op_params)?;
    if !params.is_empty() {
        endpoint.parameters = Some(Value::Array(params));
    }

    if let Some(body) = op.get("requestBody") {
        endpoint.request_body = Some(resolver.resolve(body)?);
    }
    if let Some(responses) = op.get("responses") {
        endpoint.responses = Some(resolver.resolve(responses)?);
    }

    Ok(endpoint)
}

/// Path-level parameters first, replaced by operation-level parameters that
/// share the same `name` and `in`.
fn merge_parameters(
    resolver: &Resolver<'_>,
    shared: Option<&Vec<Value>>,
    own: Option<&Vec<Value>>,
) -> Result<Vec<Value>, ParseError> {
    let own: Vec<Value> = own
        .map(|ps| ps.iter().map(|p| resolver.resolve(p)).collect())
        .transpose()?
        .unwrap_or_default();

    let mut merged = Vec::new();
    if let Some(shared) = shared {
        for p in shared {
            let p = resolver.resolve(p)?;
            if !own.iter().any(|o| same_parameter(o, &p)) {
                merged.push(p);
            }
        }
    }
    merged.extend(own);
    Ok(merged)
}

fn same_parameter(a: &Value, b: &Value) -> bool {
    a.get("name").is_some() && a.get("name") == b.get("name") && a.get("in") == b.get("in")
}

fn str_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use api_harness_core::models::ParseErrorKind;
    use serde_json::json;

    #[test]
    fn test_detect_versions() {
        assert_eq!(
            detect_version(&json!({"swagger": "2.0"})).unwrap(),
            SpecVersion::SwaggerV2
        );
        assert_eq!(
            detect_version(&json!({"openapi": "3.0.3"})).unwrap(),
            SpecVersion::OpenApiV3
        );
        assert_eq!(
            detect_version(&json!({"openapi": "3.1.0"})).unwrap(),
            SpecVersion::OpenApiV3_1
        );
        assert!(detect_version(&json!({"openapi": "4.0.0"})).is_err());
        assert!(detect_version(&json!({"swagger": "1.2"})).is_err());
        assert!(detect_version(&json!({"title": "nope"})).is_err());
        assert!(detect_version(&json!([1, 2])).is_err());
    }

    #[test]
    fn test_extracts_swagger_v2() {
        let doc = json!({
            "swagger": "2.0",
            "info": { "title": "Legacy", "version": "0.9" },
            "paths": {
                "/orders": {
                    "get": { "summary": "List orders", "tags": ["orders"] },
                    "post": { "operationId": "createOrder", "deprecated": true }
                }
            }
        });
        let parsed = extract_document(&doc).unwrap();
        assert_eq!(parsed.info.spec_version, SpecVersion::SwaggerV2);
        assert_eq!(parsed.endpoints.len(), 2);
        assert_eq!(parsed.endpoints[0].method, "GET");
        assert_eq!(parsed.endpoints[0].tags, vec!["orders".to_string()]);
        assert_eq!(parsed.endpoints[1].operation_id.as_deref(), Some("createOrder"));
        assert!(parsed.endpoints[1].deprecated);
    }

    #[test]
    fn test_merges_path_level_parameters() {
        let doc = json!({
            "openapi": "3.0.0",
            "info": { "title": "T", "version": "1" },
            "components": {
                "parameters": {
                    "Id": { "name": "id", "in": "path", "required": true }
                }
            },
            "paths": {
                "/users/{id}": {
                    "parameters": [
                        { "$ref": "#/components/parameters/Id" },
                        { "name": "verbose", "in": "query" }
                    ],
                    "get": {
                        "parameters": [ { "name": "verbose", "in": "query", "required": true } ]
                    }
                }
            }
        });
        let parsed = extract_document(&doc).unwrap();
        let params = parsed.endpoints[0].parameters.as_ref().unwrap();
        let params = params.as_array().unwrap();
        assert_eq!(params.len(), 2);
        assert_eq!(params[0]["name"], "id");
        assert_eq!(params[1]["required"], true);
    }

    #[test]
    fn test_openapi_31_without_paths() {
        let doc = json!({
            "openapi": "3.1.0",
            "info": { "title": "Hooks", "version": "1" },
            "webhooks": {}
        });
        let parsed = extract_document(&doc).unwrap();
        assert!(parsed.endpoints.is_empty());
    }

    #[test]
    fn test_openapi_30_requires_paths() {
        let doc = json!({ "openapi": "3.0.0", "info": { "title": "T", "version": "1" } });
        assert_eq!(
            extract_document(&doc).unwrap_err().kind,
            ParseErrorKind::InvalidFormat
        );
    }

    #[test]
    fn test_circular_response_reference() {
        let doc = json!({
            "openapi": "3.0.0",
            "info": { "title": "T", "version": "1" },
            "components": {
                "schemas": {
                    "A": { "$ref": "#/components/schemas/B" },
                    "B": { "$ref": "#/components/schemas/A" }
                }
            },
            "paths": {
                "/loop": {
                    "get": {
                        "responses": {
                            "200": { "content": { "application/json": { "schema": { "$ref": "#/components/schemas/A" } } } }
                        }
                    }
                }
            }
        });
        assert_eq!(
            extract_document(&doc).unwrap_err().kind,
            ParseErrorKind::CircularReference
        );
    }

    #[test]
    fn test_numeric_yaml_version() {
        let doc = json!({
            "openapi": "3.0.1",
            "info": { "title": "T", "version": 2 },
            "paths": {}
        });
        assert_eq!(extract_document(&doc).unwrap().info.version, "2");
    }
}
