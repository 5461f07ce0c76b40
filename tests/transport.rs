//! Request engine against a real local HTTP server.

mod common;

use common::{closed_addr, start_mock_api};
use idcontrol::api::{ApiClient, UserRole};
use idcontrol::client::{FailureKind, HttpClient};
use idcontrol::config::ClientConfig;
use serde_json::{json, Value};
use std::sync::Arc;

fn fast_config(base_url: &str) -> ClientConfig {
    ClientConfig::new(base_url)
        .with_max_retries(2)
        .with_retry_delay_ms(10)
        .with_request_timeout_ms(2000)
}

#[tokio::test]
async fn test_404_is_not_retried() {
    let api = start_mock_api().await;
    let client = HttpClient::new(fast_config(&api.base_url)).unwrap();

    let response = client.get("/status/404").await;

    assert_eq!(response.status_code, 404);
    assert_eq!(response.error.as_deref(), Some("Not found"));
    assert_eq!(api.hits(), 1);
}

#[tokio::test]
async fn test_500_is_retried_until_exhausted() {
    let api = start_mock_api().await;
    let client = HttpClient::new(fast_config(&api.base_url)).unwrap();

    let response = client.get("/status/500").await;

    assert_eq!(response.status_code, 500);
    assert_eq!(response.failure, Some(FailureKind::Upstream));
    assert_eq!(api.hits(), 3);
}

#[tokio::test]
async fn test_invalid_json_body_becomes_empty_object() {
    let api = start_mock_api().await;
    let client = HttpClient::new(fast_config(&api.base_url)).unwrap();

    let response = client.get("/invalid-json").await;

    assert_eq!(response.status_code, 200);
    assert_eq!(response.data, Some(json!({})));
    assert!(response.error.is_none());
}

#[tokio::test]
async fn test_text_body_is_returned_raw() {
    let api = start_mock_api().await;
    let client = HttpClient::new(fast_config(&api.base_url)).unwrap();

    let response = client.get("text").await;

    assert_eq!(response.data, Some(Value::String("pong".to_string())));
}

#[tokio::test]
async fn test_connection_refused_is_network_error() {
    let addr = closed_addr().await;
    let client = HttpClient::new(fast_config(&format!("http://{}", addr))).unwrap();

    let response = client.get("/anything").await;

    assert_eq!(response.status_code, 500);
    assert_eq!(response.failure, Some(FailureKind::Network));
    assert_eq!(
        response.error.as_deref(),
        Some("Network error: Unable to connect to server")
    );
}

#[tokio::test]
async fn test_slow_upstream_times_out() {
    let api = start_mock_api().await;
    let config = ClientConfig::new(&api.base_url)
        .with_max_retries(0)
        .with_request_timeout_ms(100);
    let client = HttpClient::new(config).unwrap();

    let response = client.get("/delay/2000").await;

    assert_eq!(response.status_code, 500);
    assert_eq!(response.failure, Some(FailureKind::Timeout));
    assert!(response.error.unwrap().contains("timeout"));
}

#[tokio::test]
async fn test_post_sends_json_and_bearer() {
    let api = start_mock_api().await;
    let client = HttpClient::new(fast_config(&api.base_url)).unwrap();
    client.set_token("secret");

    let response = client.post("/echo", Some(&json!({"phone_number": "7700"}))).await;

    assert_eq!(response.status_code, 200);
    let echoed = response.data.unwrap();
    assert_eq!(echoed["authorization"], "Bearer secret");
    assert_eq!(echoed["content_type"], "application/json");
    assert_eq!(echoed["body"], json!({"phone_number": "7700"}));
}

#[tokio::test]
async fn test_circuit_opens_against_failing_upstream() {
    let api = start_mock_api().await;
    let config = fast_config(&api.base_url)
        .with_max_retries(0)
        .with_circuit_breaker_threshold(2);
    let client = HttpClient::new(config).unwrap();

    client.get("/status/503").await;
    client.get("/status/503").await;
    let response = client.get("/status/503").await;

    assert_eq!(response.status_code, 503);
    assert_eq!(response.failure, Some(FailureKind::CircuitOpen));
    assert_eq!(api.hits(), 2);
}

#[tokio::test]
async fn test_api_client_sign_in_flow() {
    let api = start_mock_api().await;
    let http = Arc::new(HttpClient::new(fast_config(&api.base_url)).unwrap());
    let client = ApiClient::new(http);

    let unauthorized = client.current_user().await;
    assert_eq!(unauthorized.status_code, 401);
    assert_eq!(unauthorized.error.as_deref(), Some("Not authenticated"));

    let rejected = client.verify_sms("77001234567", "0000").await;
    assert_eq!(rejected.error.as_deref(), Some("Invalid SMS code"));
    assert!(!client.is_authenticated());

    let signed_in = client.verify_sms("77001234567", "1234").await;
    assert!(signed_in.is_success());
    assert!(client.is_authenticated());

    let user = client.current_user().await;
    assert_eq!(user.status_code, 200);
    assert_eq!(user.data.unwrap().role, UserRole::Financier);
    assert_eq!(client.user_role(), Some(UserRole::Financier));
}
