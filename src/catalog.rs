//! Endpoint catalog built from the server's discovery document.
//!
//! The control server describes itself with an OpenAPI-style document at
//! `GET /doc`. Only the `paths` mapping is used:
//!
//! ```json
//! {
//!   "paths": {
//!     "/api/v1/volume": {
//!       "get":  { "description": "Get volume" },
//!       "post": {
//!         "description": "Set volume",
//!         "requestBody": {
//!           "description": "volume level",
//!           "content": { "application/json": { "schema": { "type": "object" } } }
//!         }
//!       }
//!     }
//!   }
//! }
//! ```
//!
//! This module is pure data — no I/O.

use indexmap::IndexMap;
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// Metadata recorded for one HTTP method of an endpoint.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MethodDescriptor {
    pub description: String,
    /// Human description of the request body (POST/PATCH with a `requestBody` only).
    pub data: Option<String>,
    /// JSON Schema of the `application/json` request body, if documented.
    pub schema: Option<Value>,
}

/// Endpoint name → method → descriptor, in document order.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    endpoints: IndexMap<String, IndexMap<Method, MethodDescriptor>>,
}

impl Catalog {
    /// Build the catalog from a parsed discovery document.
    ///
    /// Paths outside `api_prefix` and paths ending in `-info` are skipped.
    /// When several paths collapse onto the same endpoint name their method
    /// maps are merged, the later entry winning for a repeated method.
    pub fn from_document(doc: &Value, api_prefix: &str) -> Self {
        let Some(paths) = doc.get("paths").and_then(Value::as_object) else {
            debug!("discovery document has no paths mapping");
            return Self::default();
        };

        let mut endpoints: IndexMap<String, IndexMap<Method, MethodDescriptor>> = IndexMap::new();

        for (path, item) in paths {
            let Some(rest) = path.strip_prefix(api_prefix) else {
                continue;
            };
            if path.ends_with("-info") {
                continue;
            }
            let Some(operations) = item.as_object() else {
                debug!(path = %path, "skipping path item that is not an object");
                continue;
            };

            let name = rest.trim_start_matches('/').to_string();
            let methods = endpoints.entry(name.clone()).or_default();

            for (key, raw) in operations {
                let Ok(method) = Method::from_bytes(key.to_ascii_uppercase().as_bytes()) else {
                    debug!(path = %path, key = %key, "skipping non-method key");
                    continue;
                };
                let Ok(op) = serde_json::from_value::<Operation>(raw.clone()) else {
                    debug!(path = %path, method = %method, "skipping malformed operation");
                    continue;
                };
                methods.insert(method.clone(), describe(&name, &method, op));
            }
        }

        Self { endpoints }
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// Methods documented for `endpoint`, or `None` if the endpoint is unknown.
    pub fn methods(&self, endpoint: &str) -> Option<&IndexMap<Method, MethodDescriptor>> {
        self.endpoints.get(endpoint)
    }

    /// The request body schema recorded for `(endpoint, method)`.
    pub fn schema(&self, endpoint: &str, method: &Method) -> Option<&Value> {
        self.endpoints
            .get(endpoint)?
            .get(method)?
            .schema
            .as_ref()
    }

    /// Render the `--list` output.
    ///
    /// Single-method endpoints print on one line (`  play: Play`); others get
    /// one indented line per method. POST/PATCH methods with a body
    /// description get a ` (data: ...)` suffix.
    pub fn render_listing(&self) -> String {
        if self.is_empty() {
            return "No endpoints found!".to_string();
        }

        let mut out = String::from("Available API endpoints:");
        for (endpoint, methods) in &self.endpoints {
            out.push_str("\n  ");
            out.push_str(endpoint);

            for (method, details) in methods {
                if methods.len() == 1 {
                    out.push_str(&format!(": {}", details.description));
                } else {
                    out.push_str(&format!("\n    {}: {}", method, details.description));
                }

                if takes_body(method) {
                    if let Some(data) = details.data.as_deref().filter(|d| !d.is_empty()) {
                        out.push_str(&format!(" (data: {data})"));
                    }
                }
            }
        }
        out
    }
}

/// Methods whose request body is documented and shaped from the data argument.
pub fn takes_body(method: &Method) -> bool {
    *method == Method::POST || *method == Method::PATCH
}

fn describe(endpoint: &str, method: &Method, op: Operation) -> MethodDescriptor {
    let description = op.description.unwrap_or_else(|| endpoint.to_string());

    let (data, schema) = match op.request_body {
        Some(body) if takes_body(method) => {
            let schema = body
                .content
                .get("application/json")
                .map(|media| media.schema.clone());
            let data = body.description.unwrap_or_else(|| "no description".into());
            (Some(data), schema)
        }
        _ => (None, None),
    };

    MethodDescriptor {
        description,
        data,
        schema,
    }
}

// --- Document deserialization helpers ---

#[derive(Deserialize)]
struct Operation {
    description: Option<String>,
    #[serde(rename = "requestBody")]
    request_body: Option<RequestBody>,
}

#[derive(Deserialize)]
struct RequestBody {
    description: Option<String>,
    #[serde(default)]
    content: IndexMap<String, MediaType>,
}

#[derive(Deserialize)]
struct MediaType {
    #[serde(default = "empty_schema")]
    schema: Value,
}

fn empty_schema() -> Value {
    Value::Object(serde_json::Map::new())
}
