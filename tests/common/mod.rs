//! Local mock of the verification API for integration tests.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// Handle to a running mock API.
pub struct MockApi {
    pub base_url: String,
    hits: Arc<AtomicUsize>,
}

#[allow(dead_code)]
impl MockApi {
    /// Requests received so far, across all routes.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Starts the mock API on an ephemeral port.
pub async fn start_mock_api() -> MockApi {
    let hits = Arc::new(AtomicUsize::new(0));

    let router = Router::new()
        .route("/status/:code", get(status))
        .route("/invalid-json", get(invalid_json))
        .route("/text", get(text))
        .route("/delay/:ms", get(delay))
        .route("/echo", post(echo))
        .route("/auth/verify_sms/", post(verify_sms))
        .route("/auth/user/me", get(current_user))
        .with_state(hits.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    MockApi {
        base_url: format!("http://{}", addr),
        hits,
    }
}

/// Returns an address nothing listens on.
#[allow(dead_code)]
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

type Hits = Arc<AtomicUsize>;

async fn status(State(hits): State<Hits>, Path(code): Path<u16>) -> impl IntoResponse {
    hits.fetch_add(1, Ordering::SeqCst);
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = match code {
        404 => json!({"detail": "Not found"}),
        400..=599 => json!({}),
        _ => json!({"ok": true}),
    };
    (status, Json(body))
}

async fn invalid_json(State(hits): State<Hits>) -> impl IntoResponse {
    hits.fetch_add(1, Ordering::SeqCst);
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        "{not json",
    )
}

async fn text(State(hits): State<Hits>) -> impl IntoResponse {
    hits.fetch_add(1, Ordering::SeqCst);
    (StatusCode::OK, [(header::CONTENT_TYPE, "text/plain")], "pong")
}

async fn delay(State(hits): State<Hits>, Path(ms): Path<u64>) -> impl IntoResponse {
    hits.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(ms)).await;
    Json(json!({"delayed": ms}))
}

async fn echo(State(hits): State<Hits>, headers: HeaderMap, body: Bytes) -> impl IntoResponse {
    hits.fetch_add(1, Ordering::SeqCst);
    let header_value = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);

    Json(json!({
        "authorization": header_value(header::AUTHORIZATION),
        "content_type": header_value(header::CONTENT_TYPE),
        "body": body,
    }))
}

async fn verify_sms(State(hits): State<Hits>, Json(request): Json<Value>) -> impl IntoResponse {
    hits.fetch_add(1, Ordering::SeqCst);
    if request["sms_code"] == "1234" {
        (
            StatusCode::OK,
            Json(json!({
                "access_token": "access-1",
                "refresh_token": "refresh-1",
                "token_type": "bearer"
            })),
        )
    } else {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"detail": "Invalid SMS code"})),
        )
    }
}

async fn current_user(State(hits): State<Hits>, headers: HeaderMap) -> impl IntoResponse {
    hits.fetch_add(1, Ordering::SeqCst);
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        == Some("Bearer access-1");

    if authorized {
        (
            StatusCode::OK,
            Json(json!({
                "id": 1,
                "phone_number": "77001234567",
                "first_name": "Aigerim",
                "last_name": "Sadykova",
                "role": "financier"
            })),
        )
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Not authenticated"})),
        )
    }
}
