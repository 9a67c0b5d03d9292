//! Integration tests for body encoding and decoding

use super::*;
use resilient_http::{ClientError, HttpRequest};
use serde::{Deserialize, Serialize};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::Mock;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename = "response")]
struct Payload {
    abc: i32,
}

#[tokio::test]
async fn test_decode_json_response() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/json"))
        .respond_with(status_response(200).set_body_json(json!({"abc": 123})))
        .mount(&mock_server)
        .await;

    let client = client(1, 10);
    let request = HttpRequest::get(&format!("{}/json", mock_server.uri())).unwrap();

    let payload: Payload = client.execute_decode(request).await.unwrap();
    assert_eq!(payload, Payload { abc: 123 });
}

#[tokio::test]
async fn test_decode_xml_response() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/xml"))
        .respond_with(
            status_response(200)
                .insert_header("Content-Type", "application/xml")
                .set_body_string("<response><abc>123</abc></response>"),
        )
        .mount(&mock_server)
        .await;

    let client = client(1, 10);
    let request = HttpRequest::get(&format!("{}/xml", mock_server.uri())).unwrap();

    let payload: Payload = client.execute_decode(request).await.unwrap();
    assert_eq!(payload, Payload { abc: 123 });
}

#[tokio::test]
async fn test_decode_error_on_malformed_body() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(
            status_response(200)
                .insert_header("Content-Type", "application/json")
                .set_body_string("{\"abc\":"),
        )
        .mount(&mock_server)
        .await;

    let client = client(1, 10);
    let request = HttpRequest::get(&format!("{}/broken", mock_server.uri())).unwrap();

    let result: Result<Payload, ClientError> = client.execute_decode(request).await;
    assert!(matches!(result, Err(ClientError::Decode { .. })));
    assert_eq!(client.breaker().failure_count(), 0);
}

#[tokio::test]
async fn test_json_request_body_is_sent() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/items"))
        .and(header("Content-Type", "application/json"))
        .and(body_json(json!({"abc": 7})))
        .respond_with(status_response(201))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client(1, 10);
    let request = HttpRequest::post(&format!("{}/items", mock_server.uri()))
        .unwrap()
        .json(&Payload { abc: 7 })
        .unwrap();

    let response = client.execute(request).await.unwrap();
    assert_eq!(response.status, 201);
}
