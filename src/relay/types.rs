//! Relay descriptor and result envelope.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Caller-supplied description of an upstream call. Untrusted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelayRequest {
    /// Absolute upstream URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// HTTP method token, any case.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    /// Header name → value. Non-string values are stringified, `null` is dropped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<Map<String, Value>>,

    /// Strings are sent verbatim; any other JSON value is sent as JSON.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl RelayRequest {
    /// Parse a request body leniently, field by field. A body that is not a
    /// JSON object becomes an empty descriptor, which the executor rejects
    /// with 400. Fields of the wrong type are dropped individually, so a
    /// malformed `headers` never hides a valid `url` and `method`.
    pub fn from_slice_lenient(bytes: &[u8]) -> Self {
        let mut fields = match serde_json::from_slice::<Value>(bytes) {
            Ok(Value::Object(fields)) => fields,
            _ => return Self::default(),
        };

        let text = |value: Option<Value>| match value {
            Some(Value::String(s)) => Some(s),
            _ => None,
        };

        Self {
            url: text(fields.remove("url")),
            method: text(fields.remove("method")),
            headers: match fields.remove("headers") {
                Some(Value::Object(map)) => Some(map),
                _ => None,
            },
            body: fields.remove("body").filter(|b| !b.is_null()),
        }
    }

    /// Header names only, for logging.
    pub fn header_names(&self) -> Vec<&str> {
        self.headers
            .as_ref()
            .map(|h| h.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }
}

/// Normalized outcome of a relay, returned to the caller as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayResult {
    /// HTTP status of the outer response.
    pub status: u16,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<Map<String, Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

pub const MSG_REQUIRED: &str = "URL and Method are required";
pub const MSG_INVALID_METHOD: &str = "Invalid HTTP method";
pub const MSG_UPSTREAM_FAILED: &str = "Upstream request failed";
pub const MSG_FORWARD_FALLBACK: &str = "Error forwarding request";

impl RelayResult {
    /// Upstream answered; its status is forwarded verbatim.
    pub fn forwarded(
        status: u16,
        status_text: impl Into<String>,
        headers: Map<String, Value>,
        data: Value,
    ) -> Self {
        Self {
            status,
            status_text: Some(status_text.into()),
            headers: Some(headers),
            data: Some(data),
            message: None,
            details: None,
        }
    }

    /// Malformed descriptor; nothing was sent.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::failure(400, message.into(), None)
    }

    /// Upstream responded but the client raised while handling it.
    pub fn upstream_failed(details: Value) -> Self {
        Self::failure(502, MSG_UPSTREAM_FAILED.to_string(), Some(details))
    }

    /// No upstream response was obtained.
    pub fn transport_failure(message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            MSG_FORWARD_FALLBACK.to_string()
        } else {
            message
        };
        Self::failure(500, message, None)
    }

    fn failure(status: u16, message: String, details: Option<Value>) -> Self {
        Self {
            status,
            status_text: None,
            headers: None,
            data: None,
            message: Some(message),
            details,
        }
    }
}
