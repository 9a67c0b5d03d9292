//! Integration tests using WireMock
//!
//! These tests drive `ResilientClient` over the real reqwest transport
//! against a local mock server, covering retry, breaker, cancellation and
//! body decoding end to end.

mod decode;
mod execute;

use resilient_http::{ClientConfig, ResilientClient};
use std::time::Duration;
use wiremock::{MockServer, ResponseTemplate};

/// Helper to start a mock server
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// Helper to build a client with a fast retry schedule
pub fn client(attempts: u32, breaker_threshold: u32) -> ResilientClient {
    let config = ClientConfig::builder()
        .attempts(attempts)
        .initial_sleep(Duration::from_millis(10))
        .factor(2)
        .breaker_threshold(breaker_threshold)
        .breaker_timeout(Duration::from_secs(3600))
        .request_timeout(Duration::from_secs(5))
        .header("User-Agent", "resilient-http-tests")
        .build()
        .expect("Failed to build config");

    ResilientClient::new(config).expect("Failed to build client")
}

/// Helper to create a status-only response template
pub fn status_response(status: u16) -> ResponseTemplate {
    ResponseTemplate::new(status)
}
