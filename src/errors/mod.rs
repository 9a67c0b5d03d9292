//! Error types for resilient request execution.
//!
//! Every failure a caller can observe from [`ResilientClient`](crate::ResilientClient)
//! is a [`ClientError`]. Variants are split along the lines the retry and
//! breaker machinery cares about: what may be retried, what ends a call at
//! once, and what never reached the transport.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Maximum number of body bytes kept on an error for diagnostics.
pub(crate) const MAX_ERROR_BODY_LEN: usize = 1024;

/// Returned when a circuit breaker rejects a call without running it.
///
/// This is a unit value so callers can compare against it directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("breaker open")]
pub struct BreakerOpen;

/// Why a call stopped waiting on its attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Cancelled {
    /// The caller's cancellation token fired.
    #[error("operation cancelled")]
    Token,
    /// The caller's deadline passed.
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

/// Error type for client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The circuit breaker for this dependency is open.
    #[error(transparent)]
    BreakerOpen(#[from] BreakerOpen),

    /// The transport failed before a response was received.
    #[error("Network error: {message}")]
    Network {
        /// Error message from the transport.
        message: String,
    },

    /// The server asked us to slow down (HTTP 420 or 429).
    #[error("Rate limited (HTTP {status})")]
    RateLimited {
        /// HTTP status code.
        status: u16,
        /// Server-directed delay from the `Retry-After` header.
        retry_after: Option<Duration>,
        /// Truncated response body.
        body: Option<String>,
    },

    /// The server failed (HTTP 5xx).
    #[error("Server error (HTTP {status})")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Server-directed delay from the `Retry-After` header.
        retry_after: Option<Duration>,
        /// Truncated response body.
        body: Option<String>,
    },

    /// The request was rejected (HTTP 4xx). Never retried.
    #[error("Client error (HTTP {status})")]
    Client {
        /// HTTP status code.
        status: u16,
        /// Truncated response body.
        body: Option<String>,
    },

    /// The caller cancelled the call or its deadline passed.
    #[error("Request stopped: {0}")]
    Cancelled(#[source] Cancelled),

    /// The response body could not be decoded.
    #[error("Decode failed ({content_type}): {message}")]
    Decode {
        /// Content type the decoder was chosen for.
        content_type: String,
        /// Error message from the decoder.
        message: String,
    },

    /// A request body could not be encoded.
    #[error("Encode failed: {message}")]
    Encode {
        /// Error message from the encoder.
        message: String,
    },

    /// Invalid configuration or request.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Error message describing the configuration issue.
        message: String,
    },
}

impl ClientError {
    /// Returns true if this error is retried by the client.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClientError::BreakerOpen(_)
                | ClientError::Network { .. }
                | ClientError::RateLimited { .. }
                | ClientError::Server { .. }
        )
    }

    /// Returns true if the circuit breaker rejected the call.
    pub fn is_breaker_open(&self) -> bool {
        matches!(self, ClientError::BreakerOpen(_))
    }

    /// Returns the HTTP status code, if the error came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::RateLimited { status, .. }
            | ClientError::Server { status, .. }
            | ClientError::Client { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the server-directed retry delay, if one was sent.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ClientError::RateLimited { retry_after, .. }
            | ClientError::Server { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Short label used for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientError::BreakerOpen(_) => "breaker_open",
            ClientError::Network { .. } => "network",
            ClientError::RateLimited { .. } => "rate_limited",
            ClientError::Server { .. } => "server",
            ClientError::Client { .. } => "client",
            ClientError::Cancelled(_) => "cancelled",
            ClientError::Decode { .. } => "decode",
            ClientError::Encode { .. } => "encode",
            ClientError::Configuration { .. } => "configuration",
        }
    }
}

impl From<Cancelled> for ClientError {
    fn from(cause: Cancelled) -> Self {
        ClientError::Cancelled(cause)
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            ClientError::Configuration {
                message: err.to_string(),
            }
        } else {
            ClientError::Network {
                message: err.to_string(),
            }
        }
    }
}

impl From<url::ParseError> for ClientError {
    fn from(err: url::ParseError) -> Self {
        ClientError::Configuration {
            message: format!("Invalid URL: {}", err),
        }
    }
}

/// Converts a response body into a bounded diagnostic string.
pub(crate) fn truncate_body(body: &[u8]) -> Option<String> {
    if body.is_empty() {
        return None;
    }
    let end = body.len().min(MAX_ERROR_BODY_LEN);
    Some(String::from_utf8_lossy(&body[..end]).into_owned())
}
