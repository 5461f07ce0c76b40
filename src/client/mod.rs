//! Resilient HTTP client.
//!
//! Every call the application makes to the verification API goes through
//! [`HttpClient`], which applies per-attempt timeouts, retry with
//! exponential backoff, and a circuit breaker per `(method, origin, path)`.

pub mod backoff;
pub mod breaker;
pub mod classify;
pub mod engine;
pub mod response;
pub mod transport;

#[cfg(test)]
pub(crate) mod stub;


pub use breaker::{circuit_key, CircuitSnapshot, CircuitState};
pub use engine::HttpClient;
pub use response::{FailureKind, Response};
pub use transport::{
    ReqwestTransport, RequestMethod, Transport, TransportError, TransportErrorKind,
    TransportRequest, TransportResponse,
};
pub use tokio_util::sync::CancellationToken;
