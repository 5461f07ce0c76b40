//! The request engine.
//!
//! [`HttpClient`] resolves a logical call against the base URL and drives it
//! through the circuit breaker, a bounded retry loop and a per-attempt
//! timeout. Every outcome, including network failures and cancellation, is
//! returned as a [`Response`]; nothing is propagated as an error.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;
use uuid::Uuid;

use super::backoff;
use super::breaker::{circuit_key, Admission, CircuitBreaker, CircuitSnapshot};
use super::classify::{classify, FailureClass};
use super::response::{decode_body, upstream_error_detail, FailureKind, Response, NETWORK_ERROR_MESSAGE};
use super::transport::{ReqwestTransport, RequestMethod, Transport, TransportRequest};
use crate::config::ClientConfig;
use crate::error::{IdControlError, Result};

/// Why a single attempt did not produce a usable response.
#[derive(Debug)]
enum AttemptFailure {
    Timeout(String),
    Network(String),
    Upstream {
        status: u16,
        message: String,
        data: Value,
        headers: HashMap<String, String>,
    },
    Transport(String),
    Cancelled,
}

impl AttemptFailure {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            AttemptFailure::Timeout(_) | AttemptFailure::Network(_) | AttemptFailure::Upstream { .. }
        )
    }

    fn message(&self) -> &str {
        match self {
            AttemptFailure::Timeout(m) | AttemptFailure::Network(m) | AttemptFailure::Transport(m) => m,
            AttemptFailure::Upstream { message, .. } => message,
            AttemptFailure::Cancelled => "cancelled",
        }
    }

    fn status(&self) -> Option<u16> {
        match self {
            AttemptFailure::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }

    fn into_response(self) -> Response {
        match self {
            AttemptFailure::Timeout(message) => Response::failure(500, FailureKind::Timeout, message),
            AttemptFailure::Network(_) => {
                Response::failure(500, FailureKind::Network, NETWORK_ERROR_MESSAGE)
            }
            AttemptFailure::Transport(message) => {
                Response::failure(500, FailureKind::Transport, message)
            }
            AttemptFailure::Upstream {
                status,
                message,
                data,
                headers,
            } => Response {
                status_code: status,
                data: Some(data),
                error: Some(message),
                headers: Some(headers),
                failure: Some(FailureKind::Upstream),
            },
            AttemptFailure::Cancelled => Response::cancelled(),
        }
    }
}

/// Resilient HTTP client shared by every API call.
pub struct HttpClient {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    breaker: CircuitBreaker,
    token: RwLock<Option<String>>,
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.config.base_url)
            .field("breaker", &self.breaker)
            .finish_non_exhaustive()
    }
}

impl HttpClient {
    /// Creates a client backed by `reqwest`.
    ///
    /// Fails when `config.base_url` is not an absolute URL.
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::validate_base_url(&config.base_url)?;
        let transport = ReqwestTransport::new(config.connect_timeout())?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Creates a client that sends through `transport`.
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        Self::validate_base_url(&config.base_url)?;

        Ok(Self {
            breaker: CircuitBreaker::from_config(&config),
            config,
            transport,
            token: RwLock::new(None),
        })
    }

    fn validate_base_url(base_url: &str) -> Result<()> {
        Url::parse(base_url)
            .map(|_| ())
            .map_err(|source| IdControlError::InvalidBaseUrl {
                url: base_url.to_string(),
                source,
            })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Sets the bearer token sent with every request.
    pub fn set_token(&self, token: impl Into<String>) {
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = Some(token.into());
    }

    pub fn clear_token(&self) {
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    pub fn has_token(&self) -> bool {
        self.token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Resolves `path` against the base URL. Absolute `http(s)` URLs are used
    /// as they are.
    pub fn resolve_url(&self, path: &str) -> std::result::Result<Url, url::ParseError> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return Url::parse(path);
        }

        let base = self.config.base_url.trim_end_matches('/');
        if path.starts_with('/') {
            Url::parse(&format!("{}{}", base, path))
        } else {
            Url::parse(&format!("{}/{}", base, path))
        }
    }

    /// Snapshot of every tracked circuit.
    pub fn circuit_breaker_status(&self) -> HashMap<String, CircuitSnapshot> {
        self.breaker.snapshot()
    }

    /// Returns true when any circuit is open.
    pub fn has_open_circuit(&self) -> bool {
        self.breaker.any_open()
    }

    /// `GET path`.
    pub async fn get(&self, path: &str) -> Response {
        self.execute(RequestMethod::Get, path, None, None).await
    }

    /// `POST path`, serializing `body` to JSON.
    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: Option<&B>) -> Response {
        self.send_serialized(RequestMethod::Post, path, body).await
    }

    /// `PUT path`, serializing `body` to JSON.
    pub async fn put<B: Serialize + ?Sized>(&self, path: &str, body: Option<&B>) -> Response {
        self.send_serialized(RequestMethod::Put, path, body).await
    }

    /// `PATCH path`, serializing `body` to JSON.
    pub async fn patch<B: Serialize + ?Sized>(&self, path: &str, body: Option<&B>) -> Response {
        self.send_serialized(RequestMethod::Patch, path, body).await
    }

    /// `DELETE path`.
    pub async fn delete(&self, path: &str) -> Response {
        self.execute(RequestMethod::Delete, path, None, None).await
    }

    async fn send_serialized<B: Serialize + ?Sized>(
        &self,
        method: RequestMethod,
        path: &str,
        body: Option<&B>,
    ) -> Response {
        let value = match body.map(serde_json::to_value).transpose() {
            Ok(value) => value,
            Err(e) => {
                return Response::invalid_request(format!(
                    "Failed to serialize request body: {}",
                    e
                ))
            }
        };
        self.execute(method, path, value.as_ref(), None).await
    }

    /// Executes one logical call.
    pub async fn execute(
        &self,
        method: RequestMethod,
        path: &str,
        body: Option<&Value>,
        headers: Option<&HashMap<String, String>>,
    ) -> Response {
        self.execute_cancellable(method, path, body, headers, &CancellationToken::new())
            .await
    }

    /// Executes one logical call that `cancel` can abort, both mid-attempt and
    /// during a backoff sleep. A cancelled call is not counted by the circuit
    /// breaker.
    pub async fn execute_cancellable(
        &self,
        method: RequestMethod,
        path: &str,
        body: Option<&Value>,
        headers: Option<&HashMap<String, String>>,
        cancel: &CancellationToken,
    ) -> Response {
        let request_id = Uuid::new_v4();

        let url = match self.resolve_url(path) {
            Ok(url) => url,
            Err(e) => {
                warn!(request_id = %request_id, path = %path, error = %e, "Invalid request URL");
                return Response::invalid_request(format!("Invalid request URL '{}': {}", path, e));
            }
        };
        let key = circuit_key(method, &url);
        let log_url = sanitized(&url);

        match self.breaker.check(&key) {
            Admission::Allowed => {}
            Admission::Probe => {
                debug!(request_id = %request_id, key = %key, "Sending half-open probe");
            }
            Admission::Rejected { retry_after } => {
                warn!(
                    request_id = %request_id,
                    key = %key,
                    retry_after_ms = retry_after.as_millis() as u64,
                    "Circuit open, request rejected"
                );
                return Response::circuit_open();
            }
        }

        let body = match body.map(serde_json::to_vec).transpose() {
            Ok(body) => body,
            Err(e) => {
                return Response::invalid_request(format!(
                    "Failed to serialize request body: {}",
                    e
                ))
            }
        };
        let request = TransportRequest {
            method,
            url,
            headers: self.build_headers(headers),
            body,
        };

        debug!(request_id = %request_id, method = %method, url = %log_url, "Sending request");

        let max_retries = self.config.max_retries;
        let mut last_failure: Option<AttemptFailure> = None;

        for attempt in 0..=max_retries {
            if attempt > 0 {
                let delay = backoff::retry_delay(attempt, self.config.retry_delay_ms);
                info!(
                    request_id = %request_id,
                    attempt,
                    max_retries,
                    delay_ms = delay.as_millis() as u64,
                    "Retrying request"
                );
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => {
                        info!(request_id = %request_id, "Request cancelled during backoff");
                        return Response::cancelled();
                    }
                    () = tokio::time::sleep(delay) => {}
                }
            }

            let failure = match self.attempt(&request, &request_id, cancel).await {
                Ok(response) => {
                    self.breaker.record_success(&key);
                    return response;
                }
                Err(AttemptFailure::Cancelled) => {
                    info!(request_id = %request_id, "Request cancelled");
                    return Response::cancelled();
                }
                Err(failure) => failure,
            };

            let retry = failure.is_retryable() && attempt < max_retries;
            if retry {
                warn!(
                    request_id = %request_id,
                    method = %method,
                    url = %log_url,
                    attempt = attempt + 1,
                    attempts = max_retries + 1,
                    error = %failure.message(),
                    "Request attempt failed"
                );
            }
            last_failure = Some(failure);
            if !retry {
                break;
            }
        }

        self.breaker.record_failure(&key);

        let failure = last_failure
            .unwrap_or_else(|| AttemptFailure::Transport("Unknown error".to_string()));
        error!(
            request_id = %request_id,
            method = %method,
            url = %log_url,
            status_code = failure.status(),
            error = %failure.message(),
            attempts = max_retries + 1,
            "Request failed"
        );

        failure.into_response()
    }

    /// Runs one bounded exchange. A 5xx answer is reported as a failure so the
    /// loop can retry it; any other answer is returned decoded.
    async fn attempt(
        &self,
        request: &TransportRequest,
        request_id: &Uuid,
        cancel: &CancellationToken,
    ) -> std::result::Result<Response, AttemptFailure> {
        let timeout = self.config.request_timeout();

        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(AttemptFailure::Cancelled),
            outcome = tokio::time::timeout(timeout, self.transport.send(request.clone())) => outcome,
        };

        let response = match outcome {
            Err(_) => {
                return Err(AttemptFailure::Timeout(format!(
                    "Request timeout after {}ms ({})",
                    self.config.request_timeout_ms, request_id
                )))
            }
            Ok(Err(e)) => {
                return Err(match classify(&e) {
                    FailureClass::Timeout => {
                        AttemptFailure::Timeout(format!("Request timeout: {}", e.message))
                    }
                    FailureClass::Network => AttemptFailure::Network(e.message),
                    FailureClass::Other => AttemptFailure::Transport(e.message),
                })
            }
            Ok(Ok(response)) => response,
        };

        let data = decode_body(response.content_type(), &response.body);
        let status = response.status;

        if (500..600).contains(&status) {
            let message = upstream_error_detail(&data)
                .unwrap_or_else(|| format!("Request failed with status {}", status));
            return Err(AttemptFailure::Upstream {
                status,
                message,
                data,
                headers: response.headers,
            });
        }

        Ok(Response::from_upstream(status, data, response.headers))
    }

    /// Default headers, with caller headers merged over them by
    /// case-insensitive name.
    fn build_headers(&self, extra: Option<&HashMap<String, String>>) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());

        if let Some(token) = self
            .token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_deref()
        {
            headers.insert("Authorization".to_string(), format!("Bearer {}", token));
        }

        for (name, value) in extra.into_iter().flatten() {
            headers.retain(|k, _| !k.eq_ignore_ascii_case(name));
            headers.insert(name.clone(), value.clone());
        }

        headers
    }
}

/// URL without its query string, for logs.
fn sanitized(url: &Url) -> String {
    let mut url = url.clone();
    url.set_query(None);
    url.set_fragment(None);
    url.to_string()
}
