//! HTTP client for the media player's control server.
//!
//! [`ControlClient`] wraps `reqwest::Client` and provides the three calls a
//! run needs, in the order they are made:
//!
//! | Method   | Path                   | Auth   | Description                       |
//! |----------|------------------------|--------|-----------------------------------|
//! | GET      | `/doc`                 | No     | OpenAPI-style discovery document  |
//! | POST     | `/auth/{user}`         | No     | Issues `{ "accessToken": ... }`   |
//! | any      | `{api}/{endpoint}`     | Bearer | The request the user asked for    |
//!
//! ## Error handling
//!
//! Non-2xx responses become [`ClientError::Status`] carrying the status code,
//! reason phrase and URL. Response bodies that are not JSON are not an error;
//! they are returned as [`ResponseBody::Text`].

use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::config::ClientConfig;

/// HTTP client bound to one control server.
pub struct ControlClient {
    http: reqwest::Client,
    server: String,
    api: String,
}

/// A fetched discovery document, kept as text so `--verbose` can echo it.
#[derive(Debug)]
pub struct DiscoveryDocument {
    pub status: StatusCode,
    pub url: String,
    pub body: ResponseBody,
}

/// A successful response to the dispatched request.
#[derive(Debug)]
pub struct Response {
    pub status: StatusCode,
    pub url: String,
    pub body: ResponseBody,
}

/// Decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// Empty or whitespace-only body.
    Empty,
    Json(Value),
    /// Body that did not parse as JSON, trimmed.
    Text(String),
}

impl ResponseBody {
    fn decode(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return ResponseBody::Empty;
        }
        match serde_json::from_str(trimmed) {
            Ok(value) => ResponseBody::Json(value),
            Err(_) => ResponseBody::Text(trimmed.to_string()),
        }
    }

    /// Text to print, or `None` when there is nothing to show.
    ///
    /// Objects and arrays are pretty-printed with two-space indentation;
    /// JSON strings are printed without quotes; other scalars as JSON.
    pub fn render(&self) -> Option<String> {
        match self {
            ResponseBody::Empty => None,
            ResponseBody::Text(text) => Some(text.clone()),
            ResponseBody::Json(Value::String(s)) => Some(s.clone()),
            ResponseBody::Json(value @ (Value::Object(_) | Value::Array(_))) => {
                Some(serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string()))
            }
            ResponseBody::Json(value) => Some(value.to_string()),
        }
    }
}

#[derive(Deserialize)]
struct AuthResponse {
    #[serde(rename = "accessToken")]
    access_token: Option<String>,
}

impl ControlClient {
    /// Create a client for the server described by `config`.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let mut default_headers = reqwest::header::HeaderMap::new();
        default_headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        let http = reqwest::Client::builder()
            .default_headers(default_headers)
            .connect_timeout(Duration::from_secs(10))
            .timeout(config.timeout)
            .build()
            .map_err(|e| ClientError::Protocol(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            server: config.server.clone(),
            api: config.api.clone(),
        })
    }

    /// The configured API prefix, e.g. `/api/v1`.
    pub fn api(&self) -> &str {
        &self.api
    }

    pub fn doc_url(&self) -> String {
        format!("{}/doc", self.server)
    }

    pub fn auth_url(&self, username: &str) -> String {
        format!("{}/auth/{}", self.server, username)
    }

    pub fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}{}/{}", self.server, self.api, endpoint)
    }

    /// `GET /doc` — fetch the discovery document.
    pub async fn fetch_doc(&self) -> Result<DiscoveryDocument, ClientError> {
        let url = self.doc_url();
        debug!(%url, "fetching discovery document");
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(ClientError::Request)?;

        let status = resp.status();
        if status != StatusCode::OK {
            return Err(ClientError::status(status, url));
        }
        let text = resp.text().await.map_err(ClientError::Request)?;
        Ok(DiscoveryDocument {
            status,
            url,
            body: ResponseBody::decode(&text),
        })
    }

    /// `POST /auth/{username}` — obtain a bearer token for this run.
    ///
    /// Returns the token and the response status.
    pub async fn authenticate(&self, username: &str) -> Result<(String, StatusCode), ClientError> {
        let url = self.auth_url(username);
        debug!(%url, "authenticating");
        let resp = self
            .http
            .post(&url)
            .send()
            .await
            .map_err(ClientError::Request)?;

        let status = resp.status();
        if status != StatusCode::OK {
            return Err(ClientError::status(status, url));
        }
        let text = resp.text().await.map_err(ClientError::Request)?;
        let auth: AuthResponse = serde_json::from_str(&text)
            .map_err(|e| ClientError::Protocol(format!("Invalid auth response from {url}: {e}")))?;
        match auth.access_token {
            Some(token) if !token.is_empty() => Ok((token, status)),
            _ => Err(ClientError::Protocol(format!(
                "Auth response from {url} has no accessToken"
            ))),
        }
    }

    /// `{method} {api}/{endpoint}` — the request the user asked for.
    pub async fn dispatch(
        &self,
        token: &str,
        endpoint: &str,
        method: Method,
        body: Option<&Value>,
    ) -> Result<Response, ClientError> {
        let url = self.endpoint_url(endpoint);
        debug!(%url, %method, has_body = body.is_some(), "dispatching request");

        let mut req = self.http.request(method, &url).bearer_auth(token);
        if let Some(body) = body {
            req = req.json(body);
        }
        let resp = req.send().await.map_err(ClientError::Request)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ClientError::status(status, url));
        }
        let text = resp.text().await.map_err(ClientError::Request)?;
        debug!(%status, bytes = text.len(), "response received");
        Ok(Response {
            status,
            url,
            body: ResponseBody::decode(&text),
        })
    }
}

/// Errors returned by [`ControlClient`] methods.
#[derive(Debug)]
pub enum ClientError {
    /// HTTP transport error (connection refused, timeout, DNS failure, etc.).
    Request(reqwest::Error),
    /// The server answered with an unexpected status.
    Status {
        status: u16,
        reason: String,
        url: String,
    },
    /// The response could not be used (e.g. no access token).
    Protocol(String),
}

impl ClientError {
    fn status(status: StatusCode, url: String) -> Self {
        ClientError::Status {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("").to_string(),
            url,
        }
    }
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::Request(e) => write!(f, "Request failed: {}", e),
            ClientError::Status {
                status,
                reason,
                url,
            } => write!(f, "Request failed: {} {}\n{}", status, reason, url),
            ClientError::Protocol(msg) => write!(f, "Protocol error: {}", msg),
        }
    }
}

impl std::error::Error for ClientError {}
