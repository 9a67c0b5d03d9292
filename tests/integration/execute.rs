//! Integration tests for request execution

use super::*;
use resilient_http::{
    Cancellation, Cancelled, CircuitState, ClientError, HttpRequest, RetryConfig,
};
use std::time::Instant;
use wiremock::matchers::{header, method, path};
use wiremock::Mock;

#[tokio::test]
async fn test_retries_through_server_error_and_rate_limit() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/ok"))
        .respond_with(status_response(503))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ok"))
        .respond_with(status_response(429).insert_header("Retry-After", "1"))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ok"))
        .respond_with(status_response(201))
        .mount(&mock_server)
        .await;

    // Default schedule: three attempts, one second initial backoff, factor 2.
    let config = ClientConfig::builder()
        .retry(RetryConfig::default())
        .build()
        .expect("Failed to build config");
    let client = ResilientClient::new(config).expect("Failed to build client");
    let request = HttpRequest::get(&format!("{}/ok", mock_server.uri())).unwrap();

    let started = Instant::now();
    let response = client.execute(request).await.expect("request should succeed");
    let elapsed = started.elapsed();

    // One jittered second of local backoff, then exactly the one second hint.
    assert_eq!(response.status, 201);
    assert!(elapsed >= Duration::from_secs(2), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(2900), "{elapsed:?}");
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 3);
    assert_eq!(client.breaker().failure_count(), 0);
}

#[tokio::test]
async fn test_client_error_returns_immediately() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(status_response(404).set_body_string("no such thing"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client(5, 10);
    let request = HttpRequest::get(&format!("{}/missing", mock_server.uri())).unwrap();

    let result = client.execute(request).await;

    match result {
        Err(ClientError::Client { status, body }) => {
            assert_eq!(status, 404);
            assert_eq!(body.as_deref(), Some("no such thing"));
        }
        other => panic!("expected client error, got {:?}", other),
    }
    assert_eq!(client.breaker().failure_count(), 0);
}

#[tokio::test]
async fn test_server_error_after_all_attempts() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(status_response(500))
        .expect(3)
        .mount(&mock_server)
        .await;

    let client = client(3, 10);
    let request = HttpRequest::get(&format!("{}/flaky", mock_server.uri())).unwrap();

    let error = client.execute(request).await.unwrap_err();

    assert!(matches!(error, ClientError::Server { status: 500, .. }));
    assert!(error.is_retryable());
    assert_eq!(client.breaker().failure_count(), 3);
}

#[tokio::test]
async fn test_breaker_opens_and_stops_calling_server() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(status_response(502))
        .expect(2)
        .mount(&mock_server)
        .await;

    let client = client(1, 2);
    let url = format!("{}/down", mock_server.uri());

    for _ in 0..2 {
        let error = client.execute(HttpRequest::get(&url).unwrap()).await.unwrap_err();
        assert_eq!(error.status(), Some(502));
    }
    assert_eq!(client.breaker().state(), CircuitState::Open);

    let error = client.execute(HttpRequest::get(&url).unwrap()).await.unwrap_err();
    assert!(error.is_breaker_open());
}

#[tokio::test]
async fn test_deadline_cancels_slow_response() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(status_response(200).set_delay(Duration::from_secs(10)))
        .mount(&mock_server)
        .await;

    let client = client(3, 10);
    let request = HttpRequest::get(&format!("{}/slow", mock_server.uri())).unwrap();

    let started = Instant::now();
    let error = client
        .execute_with(request, &Cancellation::timeout(Duration::from_millis(200)))
        .await
        .unwrap_err();

    assert!(matches!(error, ClientError::Cancelled(Cancelled::DeadlineExceeded)));
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(client.breaker().failure_count(), 0);
}

#[tokio::test]
async fn test_network_error_is_retried() {
    let client = client(2, 10);
    let request = HttpRequest::get("http://127.0.0.1:1/unreachable").unwrap();

    let error = client.execute(request).await.unwrap_err();

    assert!(matches!(error, ClientError::Network { .. }));
    assert_eq!(client.breaker().failure_count(), 2);
    assert_eq!(client.metrics().get_metrics().total_attempts, 2);
}

#[tokio::test]
async fn test_default_headers_are_sent() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/ok"))
        .and(header("User-Agent", "resilient-http-tests"))
        .respond_with(status_response(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client(1, 10);
    let request = HttpRequest::get(&format!("{}/ok", mock_server.uri())).unwrap();

    let response = client.execute(request).await.unwrap();
    assert_eq!(response.status, 200);
}
