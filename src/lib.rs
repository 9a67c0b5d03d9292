//! Resilient HTTP request execution.
//!
//! Wraps a single outbound HTTP call with bounded retry, exponential backoff
//! with jitter, server-directed backoff (`Retry-After`) and a circuit
//! breaker, so a failing downstream service stops being hammered.
//!
//! # Features
//!
//! - **Retry**: explicit attempt budget, growing backoff, jitter
//! - **Circuit breaking**: lock-free breaker shared per dependency
//! - **Cancellation**: tokens and deadlines abort in-flight attempts and backoff
//! - **Content negotiation**: JSON or XML bodies by `Content-Type`
//! - **Observability**: `tracing` spans per call, pluggable metrics
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use resilient_http::{ClientConfig, HttpRequest, ResilientClient};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Status {
//!     healthy: bool,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ResilientClient::new(ClientConfig::from_env()?)?;
//!
//!     let request = HttpRequest::get("https://service.internal/status")?;
//!     let status: Status = client.execute_decode(request).await?;
//!     println!("healthy: {}", status.healthy);
//!     Ok(())
//! }
//! ```
//!
//! The building blocks are usable on their own:
//!
//! ```rust
//! use resilient_http::resilience::{CircuitBreaker, Outcome, RetryPolicy};
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let breaker = CircuitBreaker::with_threshold(3, Duration::from_secs(30));
//! let mut policy = RetryPolicy::double(3);
//!
//! let result: Result<u32, resilient_http::ClientError> = policy
//!     .run(|| breaker.call(|| async { Outcome::Success(7) }))
//!     .await;
//! assert_eq!(result.unwrap(), 7);
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod client;
pub mod config;
pub mod content;
pub mod errors;
pub mod observability;
pub mod resilience;
pub mod transport;

// Re-exports for convenience
pub use client::{ResilientClient, ResilientClientBuilder};
pub use config::{ClientConfig, ClientConfigBuilder};
pub use content::{ContentType, ContentTypePolicy};
pub use errors::{BreakerOpen, Cancelled, ClientError, ClientResult};
pub use resilience::{
    with_cancellation, Cancellation, CircuitBreaker, CircuitBreakerConfig, CircuitState, Outcome,
    RetryConfig, RetryPolicy,
};
pub use transport::{HttpRequest, HttpResponse, Method, ReqwestTransport, Transport};

/// Mock implementations for testing.
#[cfg(any(test, feature = "mocks"))]
pub mod mocks;
