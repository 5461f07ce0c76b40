//! Scripted transport for tests.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::transport::{
    Transport, TransportError, TransportErrorKind, TransportRequest, TransportResponse,
};

/// What the stub does for one call.
pub(crate) enum StubReply {
    Respond(TransportResponse),
    Fail(TransportError),
    /// Answers after the given delay.
    Delayed(Duration, TransportResponse),
    Hang,
}

type Script = Box<dyn Fn(usize, &TransportRequest) -> StubReply + Send + Sync>;

/// Transport that counts calls, records requests, and answers from a script.
/// The script receives the zero-based call index.
pub(crate) struct StubTransport {
    calls: AtomicUsize,
    requests: Mutex<Vec<TransportRequest>>,
    script: Script,
}

impl StubTransport {
    pub(crate) fn new<F>(script: F) -> Self
    where
        F: Fn(usize, &TransportRequest) -> StubReply + Send + Sync + 'static,
    {
        Self {
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            script: Box::new(script),
        }
    }

    /// Always answers `status` with a JSON body.
    pub(crate) fn json(status: u16, body: Value) -> Self {
        Self::new(move |_, _| StubReply::Respond(json_response(status, &body)))
    }

    /// Always fails with `kind` and `message`.
    pub(crate) fn failing(kind: TransportErrorKind, message: &'static str) -> Self {
        Self::new(move |_, _| StubReply::Fail(TransportError::new(kind, message)))
    }

    /// Never answers.
    pub(crate) fn hanging() -> Self {
        Self::new(|_, _| StubReply::Hang)
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn last_request(&self) -> Option<TransportRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = (self.script)(index, &request);
        self.requests.lock().unwrap().push(request);

        match reply {
            StubReply::Respond(response) => Ok(response),
            StubReply::Fail(error) => Err(error),
            StubReply::Delayed(delay, response) => {
                tokio::time::sleep(delay).await;
                Ok(response)
            }
            StubReply::Hang => std::future::pending().await,
        }
    }
}

pub(crate) fn json_response(status: u16, body: &Value) -> TransportResponse {
    raw_response(status, "application/json", body.to_string().into_bytes())
}

pub(crate) fn raw_response(status: u16, content_type: &str, body: Vec<u8>) -> TransportResponse {
    let mut headers = HashMap::new();
    headers.insert("content-type".to_string(), content_type.to_string());
    TransportResponse {
        status,
        headers,
        body,
    }
}
