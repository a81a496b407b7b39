//! HTTP method resolution and request body shaping.
//!
//! Both steps are pure functions over the catalog so they can be tested
//! without a server.
//!
//! ## Body shaping
//!
//! A data argument that parses as a JSON object is sent verbatim. Anything
//! else is shaped by the endpoint's request schema: a non-object schema
//! passes the value through, an object schema with exactly one required
//! property wraps it as `{ "<property>": value }`. That lets `volume 75`
//! stand in for `volume '{"volume": 75}'`.

use std::fmt;

use reqwest::Method;
use serde_json::{Map, Number, Value};

use crate::catalog::{takes_body, Catalog};

/// Method overrides given on the command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct MethodFlags {
    pub patch: bool,
    pub delete: bool,
}

/// Pick the HTTP method for a request. First match wins:
///
/// 1. `--delete` → DELETE
/// 2. `--patch` → PATCH
/// 3. a data argument was given → POST
/// 4. endpoint not in the catalog → GET
/// 5. endpoint supports GET → GET
/// 6. the endpoint's first documented method
pub fn resolve_method(
    flags: MethodFlags,
    has_data: bool,
    endpoint: &str,
    catalog: &Catalog,
) -> Method {
    if flags.delete {
        return Method::DELETE;
    }
    if flags.patch {
        return Method::PATCH;
    }
    if has_data {
        return Method::POST;
    }

    let Some(methods) = catalog.methods(endpoint) else {
        return Method::GET;
    };
    if methods.contains_key(&Method::GET) {
        return Method::GET;
    }
    methods
        .keys()
        .next()
        .cloned()
        .unwrap_or(Method::GET)
}

/// Why a data argument could not be turned into a request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyError {
    /// The value is not an object and no request schema is documented.
    MissingSchema { endpoint: String, method: Method },
    /// The schema is an object with zero or several required fields, so the
    /// field name for a bare value can't be chosen.
    ObjectRequired { endpoint: String, method: Method },
}

impl fmt::Display for BodyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BodyError::MissingSchema { endpoint, method } => {
                write!(f, "No {method} data schema for {endpoint}")
            }
            BodyError::ObjectRequired { endpoint, method } => {
                write!(f, "{endpoint} {method} requires an object")
            }
        }
    }
}

impl std::error::Error for BodyError {}

/// Schema-level failure of [`shape_value`], before endpoint context is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeError {
    MissingSchema,
    AmbiguousObject,
}

/// Build the JSON body for `(endpoint, method)` from the raw data argument.
///
/// Returns `Ok(None)` when the method carries no body or no data was given.
pub fn build_body(
    method: &Method,
    raw: Option<&str>,
    endpoint: &str,
    catalog: &Catalog,
) -> Result<Option<Value>, BodyError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    if !takes_body(method) {
        return Ok(None);
    }

    shape_value(raw, catalog.schema(endpoint, method))
        .map(Some)
        .map_err(|e| match e {
            ShapeError::MissingSchema => BodyError::MissingSchema {
                endpoint: endpoint.to_string(),
                method: method.clone(),
            },
            ShapeError::AmbiguousObject => BodyError::ObjectRequired {
                endpoint: endpoint.to_string(),
                method: method.clone(),
            },
        })
}

/// Turn raw command-line text into a body value guided by `schema`.
pub fn shape_value(raw: &str, schema: Option<&Value>) -> Result<Value, ShapeError> {
    let loaded = serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.into()));
    if loaded.is_object() {
        return Ok(loaded);
    }

    let schema = schema.ok_or(ShapeError::MissingSchema)?;
    if schema.get("type").and_then(Value::as_str) != Some("object") {
        return Ok(loaded);
    }

    let required = match schema.get("required").and_then(Value::as_array) {
        Some(required) if required.len() == 1 => &required[0],
        _ => return Err(ShapeError::AmbiguousObject),
    };
    let Some(key) = required.as_str() else {
        return Err(ShapeError::AmbiguousObject);
    };

    let field_type = schema
        .get("properties")
        .and_then(|p| p.get(key))
        .and_then(|p| p.get("type"))
        .and_then(Value::as_str);

    let value = if field_type == Some("number") {
        coerce_number(&loaded).unwrap_or(loaded)
    } else {
        loaded
    };

    let mut body = Map::new();
    body.insert(key.to_string(), value);
    Ok(Value::Object(body))
}

/// Best-effort numeric coercion; integral values are narrowed to integers.
fn coerce_number(value: &Value) -> Option<Value> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !n.is_finite() {
        return None;
    }

    if n.fract() == 0.0 && n >= i64::MIN as f64 && n < i64::MAX as f64 {
        return Some(Value::from(n as i64));
    }
    Number::from_f64(n).map(Value::Number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn volume_schema() -> Value {
        json!({
            "type": "object",
            "required": ["volume"],
            "properties": { "volume": { "type": "number" } }
        })
    }

    fn catalog_with(endpoint: &str, methods: Value) -> Catalog {
        let mut paths = Map::new();
        paths.insert(format!("/api/v1/{endpoint}"), methods);
        let doc = json!({ "paths": paths });
        Catalog::from_document(&doc, "/api/v1")
    }

    // --- resolve_method ---

    #[test]
    fn delete_flag_wins() {
        let flags = MethodFlags {
            patch: false,
            delete: true,
        };
        assert_eq!(
            resolve_method(flags, true, "x", &Catalog::default()),
            Method::DELETE
        );
    }

    #[test]
    fn patch_flag_beats_data() {
        let flags = MethodFlags {
            patch: true,
            delete: false,
        };
        assert_eq!(
            resolve_method(flags, true, "x", &Catalog::default()),
            Method::PATCH
        );
    }

    #[test]
    fn data_means_post_regardless_of_catalog() {
        let catalog = catalog_with("volume", json!({ "get": {} }));
        let flags = MethodFlags::default();
        assert_eq!(resolve_method(flags, true, "volume", &catalog), Method::POST);
        assert_eq!(
            resolve_method(flags, true, "unknown", &catalog),
            Method::POST
        );
    }

    #[test]
    fn unknown_endpoint_is_get() {
        let catalog = catalog_with("next", json!({ "post": {} }));
        assert_eq!(
            resolve_method(MethodFlags::default(), false, "undocumented", &catalog),
            Method::GET
        );
    }

    #[test]
    fn get_preferred_when_supported() {
        let catalog = catalog_with("volume", json!({ "post": {}, "get": {} }));
        assert_eq!(
            resolve_method(MethodFlags::default(), false, "volume", &catalog),
            Method::GET
        );
    }

    #[test]
    fn first_documented_method_otherwise() {
        let catalog = catalog_with("next", json!({ "post": {}, "delete": {} }));
        assert_eq!(
            resolve_method(MethodFlags::default(), false, "next", &catalog),
            Method::POST
        );
    }

    // --- shape_value ---

    #[test]
    fn object_passes_through_unchanged() {
        let raw = r#"{"volume": 12.5, "extra": [1, 2]}"#;
        let body = shape_value(raw, None).unwrap();
        assert_eq!(body, json!({"volume": 12.5, "extra": [1, 2]}));
    }

    #[test]
    fn number_wrapped_as_integer() {
        let body = shape_value("75", Some(&volume_schema())).unwrap();
        assert_eq!(body, json!({"volume": 75}));
        assert!(body["volume"].is_i64() || body["volume"].is_u64());
    }

    #[test]
    fn integral_float_narrowed() {
        let body = shape_value("75.0", Some(&volume_schema())).unwrap();
        assert_eq!(body, json!({"volume": 75}));
    }

    #[test]
    fn fractional_number_kept() {
        let body = shape_value("12.5", Some(&volume_schema())).unwrap();
        assert_eq!(body, json!({"volume": 12.5}));
    }

    #[test]
    fn quoted_number_coerced() {
        let body = shape_value(r#""-3""#, Some(&volume_schema())).unwrap();
        assert_eq!(body, json!({"volume": -3}));
    }

    #[test]
    fn unparseable_number_wrapped_as_text() {
        let body = shape_value("loud", Some(&volume_schema())).unwrap();
        assert_eq!(body, json!({"volume": "loud"}));
    }

    #[test]
    fn string_field_not_coerced() {
        let schema = json!({
            "type": "object",
            "required": ["videoId"],
            "properties": { "videoId": { "type": "string" } }
        });
        let body = shape_value("dQw4w9WgXcQ", Some(&schema)).unwrap();
        assert_eq!(body, json!({"videoId": "dQw4w9WgXcQ"}));
    }

    #[test]
    fn missing_schema_rejected() {
        assert_eq!(shape_value("75", None), Err(ShapeError::MissingSchema));
    }

    #[test]
    fn non_object_schema_passes_raw_value() {
        let schema = json!({ "type": "number" });
        assert_eq!(shape_value("75", Some(&schema)).unwrap(), json!(75));
        assert_eq!(shape_value("[1,2]", Some(&schema)).unwrap(), json!([1, 2]));
        assert_eq!(
            shape_value("hello", Some(&json!({}))).unwrap(),
            json!("hello")
        );
    }

    #[test]
    fn several_required_fields_rejected() {
        let schema = json!({
            "type": "object",
            "required": ["index", "toIndex"],
            "properties": {
                "index": { "type": "number" },
                "toIndex": { "type": "number" }
            }
        });
        assert_eq!(
            shape_value("3", Some(&schema)),
            Err(ShapeError::AmbiguousObject)
        );
    }

    #[test]
    fn no_required_fields_rejected() {
        let schema = json!({ "type": "object", "properties": { "a": { "type": "number" } } });
        assert_eq!(
            shape_value("3", Some(&schema)),
            Err(ShapeError::AmbiguousObject)
        );
    }

    // --- build_body ---

    #[test]
    fn scalar_wrapped_using_catalog_schema() {
        let catalog = catalog_with(
            "volume",
            json!({
                "post": {
                    "requestBody": {
                        "content": {
                            "application/json": {
                                "schema": {
                                    "type": "object",
                                    "required": ["level"],
                                    "properties": { "level": { "type": "number" } }
                                }
                            }
                        }
                    }
                }
            }),
        );
        let body = build_body(&Method::POST, Some("50"), "volume", &catalog).unwrap();
        assert_eq!(body, Some(json!({"level": 50})));
    }

    #[test]
    fn no_body_without_data_or_for_get() {
        let catalog = Catalog::default();
        assert_eq!(build_body(&Method::POST, None, "x", &catalog), Ok(None));
        assert_eq!(build_body(&Method::GET, Some("1"), "x", &catalog), Ok(None));
        assert_eq!(
            build_body(&Method::DELETE, Some("1"), "x", &catalog),
            Ok(None)
        );
    }

    #[test]
    fn patch_uses_patch_schema() {
        let catalog = catalog_with(
            "repeat",
            json!({
                "patch": {
                    "requestBody": {
                        "content": {
                            "application/json": {
                                "schema": {
                                    "type": "object",
                                    "required": ["iteration"],
                                    "properties": { "iteration": { "type": "number" } }
                                }
                            }
                        }
                    }
                }
            }),
        );
        assert_eq!(
            build_body(&Method::PATCH, Some("2"), "repeat", &catalog),
            Ok(Some(json!({"iteration": 2})))
        );
        assert_eq!(
            build_body(&Method::POST, Some("2"), "repeat", &catalog),
            Err(BodyError::MissingSchema {
                endpoint: "repeat".into(),
                method: Method::POST
            })
        );
    }

    #[test]
    fn error_messages() {
        let missing = BodyError::MissingSchema {
            endpoint: "volume".into(),
            method: Method::POST,
        };
        assert_eq!(missing.to_string(), "No POST data schema for volume");
        let ambiguous = BodyError::ObjectRequired {
            endpoint: "move".into(),
            method: Method::PATCH,
        };
        assert_eq!(ambiguous.to_string(), "move PATCH requires an object");
    }
}
