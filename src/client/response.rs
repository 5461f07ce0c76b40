//! Normalized response returned for every engine call.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::warn;

/// Error text for a request rejected by an open circuit.
pub const CIRCUIT_OPEN_MESSAGE: &str = "Service temporarily unavailable (circuit breaker open)";

/// Error text for a call that ended on a network failure.
pub const NETWORK_ERROR_MESSAGE: &str = "Network error: Unable to connect to server";

/// Error text for a call aborted by its caller.
pub const CANCELLED_MESSAGE: &str = "Request cancelled";

/// Status reported for a call aborted by its caller.
pub const CANCELLED_STATUS: u16 = 499;

/// Why a response is failure-shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Rejected locally by an open circuit (503).
    CircuitOpen,
    /// The last attempt timed out (500).
    Timeout,
    /// The server could not be reached (500).
    Network,
    /// Upstream answered 5xx on every attempt.
    Upstream,
    /// Upstream answered 4xx.
    Client,
    /// Non-retryable transport failure (500).
    Transport,
    /// The caller cancelled the call (499).
    Cancelled,
    /// The request could not be built (400).
    InvalidRequest,
}

/// Result of one logical engine call.
///
/// Callers branch on `status_code`; `error` carries a human-readable message
/// whenever the outcome is failure-shaped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
}

impl Response {
    /// Builds a response from a completed (non-5xx) upstream exchange.
    pub(crate) fn from_upstream(status: u16, data: Value, headers: HashMap<String, String>) -> Self {
        let (error, failure) = if status >= 400 {
            let message = upstream_error_detail(&data).unwrap_or_else(|| "Request failed".to_string());
            (Some(message), Some(FailureKind::Client))
        } else {
            (None, None)
        };

        Self {
            status_code: status,
            data: Some(data),
            error,
            headers: Some(headers),
            failure,
        }
    }

    /// Builds a synthetic failure response.
    pub(crate) fn failure(status: u16, kind: FailureKind, error: impl Into<String>) -> Self {
        Self {
            status_code: status,
            data: None,
            error: Some(error.into()),
            headers: None,
            failure: Some(kind),
        }
    }

    pub(crate) fn circuit_open() -> Self {
        Self::failure(503, FailureKind::CircuitOpen, CIRCUIT_OPEN_MESSAGE)
    }

    pub(crate) fn cancelled() -> Self {
        Self::failure(CANCELLED_STATUS, FailureKind::Cancelled, CANCELLED_MESSAGE)
    }

    pub(crate) fn invalid_request(error: impl Into<String>) -> Self {
        Self::failure(400, FailureKind::InvalidRequest, error)
    }

    /// 2xx or 3xx.
    pub fn is_success(&self) -> bool {
        (200..400).contains(&self.status_code)
    }

    /// 5xx, including synthesized network and circuit failures.
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status_code)
    }

    /// True when the failure happened before any upstream answer was read.
    pub fn is_transport_failure(&self) -> bool {
        matches!(
            self.failure,
            Some(
                FailureKind::CircuitOpen
                    | FailureKind::Timeout
                    | FailureKind::Network
                    | FailureKind::Transport
            )
        )
    }

    pub fn is_cancelled(&self) -> bool {
        self.failure == Some(FailureKind::Cancelled)
    }

    /// Case-insensitive response header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.as_ref().and_then(|headers| {
            headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
        })
    }

    /// Decodes `data` into `T`. `None` when there is no body.
    pub fn json<T: DeserializeOwned>(&self) -> Option<Result<T, serde_json::Error>> {
        self.data.clone().map(serde_json::from_value)
    }
}

/// Decodes a body by its declared content type. JSON that fails to parse
/// becomes an empty object; other content types come back as text.
pub(crate) fn decode_body(content_type: Option<&str>, body: &[u8]) -> Value {
    let is_json = content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("application/json"));

    if is_json {
        match serde_json::from_slice(body) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Failed to parse JSON response");
                Value::Object(Map::new())
            }
        }
    } else {
        Value::String(String::from_utf8_lossy(body).into_owned())
    }
}

/// Pulls the upstream error message out of a decoded body (`detail`, then
/// `error`).
pub(crate) fn upstream_error_detail(data: &Value) -> Option<String> {
    ["detail", "error"].iter().find_map(|field| match data.get(field) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.is_empty() => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    })
}
