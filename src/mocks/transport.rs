//! Mock transport for testing.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::errors::{ClientError, ClientResult};
use crate::transport::{HttpRequest, HttpResponse, Transport};

/// A mock response to return.
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// Response body.
    pub body: Bytes,
    /// Time to wait before answering.
    pub delay: Option<Duration>,
}

impl MockResponse {
    /// Creates an empty response with `status`.
    pub fn status(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Bytes::new(),
            delay: None,
        }
    }

    /// Creates a 200 response with a JSON body.
    pub fn json(body: &serde_json::Value) -> Self {
        Self::status(200)
            .header("content-type", "application/json")
            .body(body.to_string())
    }

    /// Creates a 200 response with an XML body.
    pub fn xml(body: &str) -> Self {
        Self::status(200)
            .header("content-type", "application/xml")
            .body(body.to_string())
    }

    /// Creates an error response with a plain text body.
    pub fn error(status: u16, message: &str) -> Self {
        Self::status(status).body(message.to_string())
    }

    /// Creates a 429 response with an integer `Retry-After`.
    pub fn rate_limited(retry_after: u64) -> Self {
        Self::status(429)
            .header("retry-after", retry_after.to_string())
            .body("Rate limit exceeded")
    }

    /// Adds a header.
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_string(), value.into());
        self
    }

    /// Sets the body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Delays the response.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[derive(Debug, Clone)]
enum MockReply {
    Response(MockResponse),
    NetworkError(String),
}

/// Mock transport that replays scripted replies in order.
///
/// Once the queue is drained, the default response is returned, or a 500 if
/// none was set.
pub struct MockTransport {
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    requests: Arc<Mutex<Vec<HttpRequest>>>,
    default_response: Option<MockResponse>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockTransport {
    /// Creates a new mock transport.
    pub fn new() -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            default_response: None,
        }
    }

    /// Adds a response to the queue.
    pub fn enqueue_response(&self, response: MockResponse) {
        lock(&self.replies).push_back(MockReply::Response(response));
    }

    /// Adds a network failure to the queue.
    pub fn enqueue_network_error(&self, message: &str) {
        lock(&self.replies).push_back(MockReply::NetworkError(message.to_string()));
    }

    /// Sets a default response for when the queue is empty.
    pub fn set_default_response(mut self, response: MockResponse) -> Self {
        self.default_response = Some(response);
        self
    }

    /// Gets all recorded requests.
    pub fn get_requests(&self) -> Vec<HttpRequest> {
        lock(&self.requests).clone()
    }

    /// Gets the last recorded request.
    pub fn last_request(&self) -> Option<HttpRequest> {
        lock(&self.requests).last().cloned()
    }

    /// Returns the number of requests made.
    pub fn request_count(&self) -> usize {
        lock(&self.requests).len()
    }

    fn next_reply(&self) -> MockReply {
        lock(&self.replies).pop_front().unwrap_or_else(|| {
            MockReply::Response(
                self.default_response
                    .clone()
                    .unwrap_or_else(|| MockResponse::error(500, "No mock response configured")),
            )
        })
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: HttpRequest) -> ClientResult<HttpResponse> {
        lock(&self.requests).push(request);

        match self.next_reply() {
            MockReply::NetworkError(message) => Err(ClientError::Network { message }),
            MockReply::Response(response) => {
                if let Some(delay) = response.delay {
                    tokio::time::sleep(delay).await;
                }
                Ok(HttpResponse {
                    status: response.status,
                    headers: response.headers,
                    body: response.body,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_transport_replays_in_order() {
        let transport = MockTransport::new();
        transport.enqueue_response(MockResponse::status(503));
        transport.enqueue_network_error("connection reset");
        transport.enqueue_response(MockResponse::json(&serde_json::json!({"status": "ok"})));

        let request = HttpRequest::get("http://localhost/test").unwrap();

        let first = transport.send(request.clone()).await.unwrap();
        assert_eq!(first.status, 503);

        let second = transport.send(request.clone()).await;
        assert!(matches!(second, Err(ClientError::Network { .. })));

        let third = transport.send(request).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&third.body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(transport.request_count(), 3);
    }

    #[tokio::test]
    async fn test_mock_transport_default_response() {
        let transport = MockTransport::new().set_default_response(MockResponse::status(204));
        let request = HttpRequest::delete("http://localhost/items/1").unwrap();

        let response = transport.send(request).await.unwrap();

        assert_eq!(response.status, 204);
        assert_eq!(
            transport.last_request().unwrap().url.as_str(),
            "http://localhost/items/1"
        );
    }

    #[test]
    fn test_mock_response_helpers() {
        let xml = MockResponse::xml("<response/>");
        assert_eq!(xml.headers.get("content-type").unwrap(), "application/xml");

        let rate_limited = MockResponse::rate_limited(60);
        assert_eq!(rate_limited.status, 429);
        assert_eq!(rate_limited.headers.get("retry-after"), Some(&"60".to_string()));
    }
}
