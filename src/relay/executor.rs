//! Relay execution.
//!
//! # Responsibilities
//! - Validate the caller's descriptor
//! - Perform exactly one upstream call
//! - Fold every outcome into a [`RelayResult`]
//!
//! # Outcomes
//! ```text
//! Received → Validated → Dispatched ─┬─ response read       → upstream status
//!     │                              ├─ head read, body err → 502
//!     └─ missing url/method → 400    └─ no response         → 500
//! ```
//!
//! # Design Decisions
//! - 4xx/5xx from the upstream are responses, not errors; `error_for_status`
//!   is never called
//! - No retries, no caching
//! - Only header names are logged; values and bodies may carry credentials

use axum::http::{header, HeaderMap, Method};
use reqwest::redirect::Policy;
use reqwest::Client;
use serde_json::{Map, Value};
use std::error::Error as StdError;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::config::RelayConfig;
use crate::observability::metrics;
use crate::relay::types::{RelayRequest, RelayResult, MSG_INVALID_METHOD, MSG_REQUIRED};

/// Terminal state of a relay, for logs and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    Forwarded,
    InvalidRequest,
    UpstreamError,
    TransportError,
}

impl RelayOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            RelayOutcome::Forwarded => "forwarded",
            RelayOutcome::InvalidRequest => "invalid_request",
            RelayOutcome::UpstreamError => "upstream_error",
            RelayOutcome::TransportError => "transport_error",
        }
    }
}

/// Failure while reading a body whose status line already arrived.
#[derive(Debug, Error)]
enum BodyReadError {
    #[error("upstream body stream failed: {source}")]
    Stream {
        partial: Vec<u8>,
        #[source]
        source: reqwest::Error,
    },

    #[error("upstream body exceeded {limit} bytes")]
    TooLarge { partial: Vec<u8>, limit: usize },
}

impl BodyReadError {
    fn partial(&self) -> &[u8] {
        match self {
            BodyReadError::Stream { partial, .. } | BodyReadError::TooLarge { partial, .. } => {
                partial
            }
        }
    }
}

/// Forwards caller-described requests to arbitrary upstreams.
pub struct RelayExecutor {
    client: Client,
    max_response_bytes: usize,
}

impl RelayExecutor {
    /// Build an executor with its own connection pool.
    pub fn new(config: &RelayConfig) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder().redirect(Policy::limited(config.max_redirects));
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            client: builder.build()?,
            max_response_bytes: config.max_response_bytes,
        })
    }

    /// Build an executor around an existing client.
    pub fn with_client(client: Client, max_response_bytes: usize) -> Self {
        Self {
            client,
            max_response_bytes,
        }
    }

    /// Relay one request. Never fails; every outcome is an envelope.
    pub async fn execute(&self, req: RelayRequest) -> RelayResult {
        let start = Instant::now();

        tracing::info!(
            url = req.url.as_deref().unwrap_or(""),
            method = req.method.as_deref().unwrap_or(""),
            headers = ?req.header_names(),
            has_body = req.body.is_some(),
            "Relay request received"
        );

        let (result, outcome) = self.dispatch(req).await;

        metrics::record_relay(outcome.as_str(), result.status, start);
        result
    }

    async fn dispatch(&self, req: RelayRequest) -> (RelayResult, RelayOutcome) {
        let RelayRequest {
            url,
            method,
            headers,
            body,
        } = req;

        let (url, method) = match (non_empty(url), non_empty(method)) {
            (Some(url), Some(method)) => (url, method),
            _ => {
                return (
                    RelayResult::bad_request(MSG_REQUIRED),
                    RelayOutcome::InvalidRequest,
                )
            }
        };

        let method = match normalize_method(&method) {
            Some(m) => m,
            None => {
                tracing::warn!(method = %method, "Rejected invalid method token");
                return (
                    RelayResult::bad_request(MSG_INVALID_METHOD),
                    RelayOutcome::InvalidRequest,
                );
            }
        };

        let headers = headers.unwrap_or_default();
        let mut builder = self.client.request(method.clone(), url.as_str());
        let mut has_content_type = false;
        for (name, value) in &headers {
            if let Some(value) = header_value_string(value) {
                has_content_type |= name.eq_ignore_ascii_case(header::CONTENT_TYPE.as_str());
                builder = builder.header(name.as_str(), value);
            }
        }

        match body {
            None => {}
            Some(Value::String(text)) => builder = builder.body(text),
            Some(other) => {
                if !has_content_type {
                    builder = builder.header(header::CONTENT_TYPE, "application/json");
                }
                builder = builder.body(other.to_string());
            }
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                let message = describe_error(&e);
                tracing::error!(url = %url, method = %method, error = %message, "Relay transport failure");
                return (
                    RelayResult::transport_failure(message),
                    RelayOutcome::TransportError,
                );
            }
        };

        let status = response.status();
        let status_text = status.canonical_reason().unwrap_or("").to_string();
        let response_headers = collect_headers(response.headers());

        match read_body(response, self.max_response_bytes).await {
            Ok(bytes) => {
                tracing::debug!(url = %url, status = status.as_u16(), bytes = bytes.len(), "Relay completed");
                (
                    RelayResult::forwarded(
                        status.as_u16(),
                        status_text,
                        response_headers,
                        decode_body(&bytes),
                    ),
                    RelayOutcome::Forwarded,
                )
            }
            Err(e) => {
                tracing::warn!(
                    url = %url,
                    status = status.as_u16(),
                    error = %describe_error(&e),
                    "Upstream responded but body could not be read"
                );
                (
                    RelayResult::upstream_failed(decode_body(e.partial())),
                    RelayOutcome::UpstreamError,
                )
            }
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Canonical (upper-case) method, or `None` for an illegal token.
fn normalize_method(raw: &str) -> Option<Method> {
    Method::from_bytes(raw.trim().to_ascii_uppercase().as_bytes()).ok()
}

fn header_value_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(header_value_string)
                .collect::<Vec<_>>()
                .join(", "),
        ),
        other => Some(other.to_string()),
    }
}

/// Response headers as JSON. Repeated headers are joined with ", ",
/// except `set-cookie` which stays a list.
pub(crate) fn collect_headers(headers: &HeaderMap) -> Map<String, Value> {
    let mut out = Map::new();
    for name in headers.keys() {
        let values: Vec<String> = headers
            .get_all(name)
            .iter()
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .collect();

        let value = if name == header::SET_COOKIE {
            Value::Array(values.into_iter().map(Value::String).collect())
        } else {
            Value::String(values.join(", "))
        };
        out.insert(name.as_str().to_string(), value);
    }
    out
}

async fn read_body(mut response: reqwest::Response, limit: usize) -> Result<Vec<u8>, BodyReadError> {
    let mut buf = Vec::new();
    loop {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                if buf.len() + chunk.len() > limit {
                    let room = limit - buf.len();
                    buf.extend_from_slice(&chunk[..room]);
                    return Err(BodyReadError::TooLarge { partial: buf, limit });
                }
                buf.extend_from_slice(&chunk);
            }
            Ok(None) => return Ok(buf),
            Err(source) => {
                return Err(BodyReadError::Stream {
                    partial: buf,
                    source,
                })
            }
        }
    }
}

/// JSON when the body parses as JSON, text otherwise.
pub(crate) fn decode_body(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::String(String::new());
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

/// Error and its sources joined into one line.
fn describe_error(err: &(dyn StdError + 'static)) -> String {
    let mut parts: Vec<String> = vec![err.to_string()];
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !parts.iter().any(|p| p.contains(&text)) {
            parts.push(text);
        }
        source = cause.source();
    }
    parts.retain(|p| !p.is_empty());
    parts.join(": ")
}
