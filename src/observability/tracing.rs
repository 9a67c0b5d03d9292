//! Request spans for the resilient client.

use std::time::Duration;
use tokio::time::Instant;
use tracing::Span;
use uuid::Uuid;

use crate::transport::HttpRequest;

/// A span covering one logical call, retries included.
#[derive(Debug)]
pub struct RequestSpan {
    /// Unique id for this call, recorded on the span.
    pub request_id: String,
    /// The `tracing` span.
    pub span: Span,
    started_at: Instant,
}

impl RequestSpan {
    /// Opens an `info` span for `request` with a fresh request id.
    pub fn new(request: &HttpRequest) -> Self {
        let request_id = Uuid::new_v4().to_string();
        let span = tracing::info_span!(
            "http_request",
            request_id = %request_id,
            method = %request.method,
            url = %request.url,
        );

        Self {
            request_id,
            span,
            started_at: Instant::now(),
        }
    }

    /// Time since the span was opened.
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_ids_are_unique() {
        let request = HttpRequest::get("http://localhost/items").unwrap();
        let first = RequestSpan::new(&request);
        let second = RequestSpan::new(&request);

        assert_ne!(first.request_id, second.request_id);
        assert!(Uuid::parse_str(&first.request_id).is_ok());
    }
}
