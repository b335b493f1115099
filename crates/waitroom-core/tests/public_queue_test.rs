#![allow(clippy::unwrap_used)]
// `QueueApi` over a real `PublicClient`, backed by wiremock.

use serde_json::json;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use waitroom_api::PublicClient;
use waitroom_core::{CoreError, QueueApi, RequestId};

async fn setup() -> (MockServer, PublicClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&format!("{}/api", server.uri())).unwrap();
    (server, PublicClient::with_client(reqwest::Client::new(), base_url))
}

async fn serving(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/api/serving_num"))
        .and(query_param("event_id", "Sample"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_serving_counter_passes_through() {
    let (server, client) = setup().await;
    serving(&server, json!({ "serving_counter": 42 })).await;

    let counter = QueueApi::serving_counter(&client, "Sample").await.unwrap();
    assert_eq!(counter, Some(42));
}

#[tokio::test]
async fn test_negative_serving_counter_is_an_api_error() {
    let (server, client) = setup().await;
    serving(&server, json!({ "serving_counter": -3 })).await;

    let err = QueueApi::serving_counter(&client, "Sample").await.unwrap_err();
    assert!(
        matches!(err, CoreError::Api { ref message, status: None } if message.contains("-3")),
        "unexpected error: {err:?}"
    );
}

#[tokio::test]
async fn test_negative_queue_number_is_an_api_error() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/queue_num"))
        .and(query_param("request_id", "req-1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "queue_number": -1, "event_id": "Sample" })),
        )
        .mount(&server)
        .await;

    let request_id = RequestId::new("req-1").unwrap();
    let err = QueueApi::queue_position(&client, "Sample", &request_id)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Api { status: None, .. }));
}
