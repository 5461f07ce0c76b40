//! Failure classification for transport errors.

use super::transport::{TransportError, TransportErrorKind};

/// Message fragments that mark an untyped error as a network failure.
const NETWORK_ERROR_PATTERNS: [&str; 7] = [
    "etimedout",
    "econnrefused",
    "enotfound",
    "econnreset",
    "network",
    "fetch failed",
    "timeout",
];

/// How the engine treats a failed exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// The attempt ran out of time. Retryable.
    Timeout,
    /// The server could not be reached. Retryable.
    Network,
    /// Anything else. Not retried.
    Other,
}

impl FailureClass {
    pub fn is_retryable(&self) -> bool {
        matches!(self, FailureClass::Timeout | FailureClass::Network)
    }
}

/// Returns true when `message` contains one of the known network failure
/// fragments, ignoring case.
pub fn is_network_error_message(message: &str) -> bool {
    let message = message.to_lowercase();
    NETWORK_ERROR_PATTERNS
        .iter()
        .any(|pattern| message.contains(pattern))
}

/// Classifies a transport error, preferring the typed kind and falling back
/// to message matching for untyped causes.
pub fn classify(error: &TransportError) -> FailureClass {
    match error.kind {
        TransportErrorKind::Timeout => FailureClass::Timeout,
        TransportErrorKind::Connect => FailureClass::Network,
        TransportErrorKind::Other if is_network_error_message(&error.message) => {
            FailureClass::Network
        }
        TransportErrorKind::Other => FailureClass::Other,
    }
}
