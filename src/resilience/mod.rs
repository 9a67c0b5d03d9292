//! Resilience primitives: circuit breaker, retry policy, and cancellation.
//!
//! # Data Flow
//! ```text
//! attempt closure (classifies one transport call into an Outcome)
//!     → CircuitBreaker::call      (gate, count failures)
//!     → with_cancellation         (race against caller signal)
//!     → RetryPolicy::run          (backoff, retry or stop)
//! ```
//!
//! None of these primitives log. Only the client layer does.

mod cancellation;
mod circuit_breaker;
mod outcome;
mod retry;

pub use cancellation::{with_cancellation, Cancellation};
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerHook, CircuitState};
pub use outcome::Outcome;
pub use retry::{
    RetryConfig, RetryContext, RetryHook, RetryPolicy, DEFAULT_ATTEMPTS, DEFAULT_FACTOR,
    DEFAULT_INITIAL_SLEEP,
};
