#![allow(clippy::unwrap_used)]
// Integration tests for `PrivateClient` and `CommerceClient` using wiremock.

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use waitroom_api::{CommerceClient, Error, PrivateClient, TransportConfig};

fn base(server: &MockServer) -> Url {
    Url::parse(&server.uri()).unwrap()
}

// ── Private API ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_num_active_tokens_sends_api_key() {
    let server = MockServer::start().await;
    let key = SecretString::from("op-key".to_string());
    let client = PrivateClient::new(base(&server), Some(&key), &TransportConfig::default()).unwrap();

    Mock::given(method("GET"))
        .and(path("/num_active_tokens"))
        .and(query_param("event_id", "Sample"))
        .and(header("x-api-key", "op-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "active_tokens": 5 })))
        .mount(&server)
        .await;

    assert_eq!(client.num_active_tokens("Sample").await.unwrap(), 5);
}

#[tokio::test]
async fn test_expired_tokens_list() {
    let server = MockServer::start().await;
    let client = PrivateClient::with_client(reqwest::Client::new(), base(&server));

    Mock::given(method("GET"))
        .and(path("/expired_tokens"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["r1", "r2", "r3"])))
        .mount(&server)
        .await;

    let expired = client.expired_tokens("Sample").await.unwrap();
    assert_eq!(expired, vec!["r1", "r2", "r3"]);
}

#[tokio::test]
async fn test_private_api_forbidden() {
    let server = MockServer::start().await;
    let client = PrivateClient::with_client(reqwest::Client::new(), base(&server));

    Mock::given(method("GET"))
        .and(path("/num_active_tokens"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({ "message": "Forbidden" })))
        .mount(&server)
        .await;

    let result = client.num_active_tokens("Sample").await;
    assert!(
        matches!(result, Err(Error::Authentication { .. })),
        "expected Authentication error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_increment_serving_counter_posts_amount() {
    let server = MockServer::start().await;
    let key = SecretString::from("op-key".to_string());
    let client = PrivateClient::new(base(&server), Some(&key), &TransportConfig::default()).unwrap();

    Mock::given(method("POST"))
        .and(path("/increment_serving_counter"))
        .and(header("x-api-key", "op-key"))
        .and(body_json(json!({ "event_id": "Sample", "increment_by": 25 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "serving_num": 125 })))
        .expect(1)
        .mount(&server)
        .await;

    assert_eq!(client.increment_serving_counter("Sample", 25).await.unwrap(), 125);
}

#[tokio::test]
async fn test_increment_serving_counter_wrong_event() {
    let server = MockServer::start().await;
    let client = PrivateClient::with_client(reqwest::Client::new(), base(&server));

    Mock::given(method("POST"))
        .and(path("/increment_serving_counter"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "error": "Invalid event ID" })),
        )
        .mount(&server)
        .await;

    let result = client.increment_serving_counter("Other", 1).await;
    assert!(
        matches!(result, Err(Error::Rejected { ref message, .. }) if message == "Invalid event ID"),
        "expected Rejected error, got: {result:?}"
    );
}

// ── Commerce API ────────────────────────────────────────────────────

#[tokio::test]
async fn test_checkout_returns_receipt() {
    let server = MockServer::start().await;
    let client = CommerceClient::with_client(reqwest::Client::new(), base(&server));

    Mock::given(method("GET"))
        .and(path("/checkout"))
        .and(header("authorization", "tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": "Success" })))
        .mount(&server)
        .await;

    let token = SecretString::from("tok-1".to_string());
    let receipt = client.checkout(&token).await.unwrap();
    assert_eq!(receipt, json!({ "result": "Success" }));
}

#[tokio::test]
async fn test_checkout_unauthorized() {
    let server = MockServer::start().await;
    let client = CommerceClient::with_client(reqwest::Client::new(), base(&server));

    Mock::given(method("GET"))
        .and(path("/checkout"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "Unauthorized" })))
        .mount(&server)
        .await;

    let token = SecretString::from("stale".to_string());
    let result = client.checkout(&token).await;
    assert!(
        matches!(result, Err(Error::Authentication { .. })),
        "expected Authentication error, got: {result:?}"
    );
}
