//! Circuit breaker pattern implementation.
//!
//! The breaker keeps two atomics: a consecutive-failure counter and the
//! timestamp of the last failure (or last half-open trial call). Nothing else is
//! stored, and no lock is held while the wrapped call runs, so a single
//! breaker can be shared by every task talking to the same dependency.
//!
//! # State Transitions
//! ```text
//! Closed → Open:      failure_count reaches threshold
//! Open → Half-Open:   timeout elapsed since last failure, one trial call released
//! Half-Open → Open:   trial call fails (timer restarts)
//! Half-Open → Closed: trial call succeeds (failure_count reset)
//! ```
//!
//! Counter races under concurrent calls are tolerated. The breaker is a
//! heuristic, not an exact gate.

use std::future::Future;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use super::Outcome;
use crate::errors::BreakerOpen;

/// Circuit breaker state, derived from the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Circuit is closed - requests are allowed.
    Closed,
    /// Circuit is open - requests are rejected.
    Open,
    /// Timeout has elapsed - the next request is let through as a trial call.
    HalfOpen,
}

impl CircuitState {
    /// Returns the state as a lowercase label.
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

/// Configuration for the circuit breaker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that trip the breaker.
    pub threshold: u32,
    /// Time a tripped breaker waits before letting one trial call through.
    pub timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            threshold: 5,
            timeout: Duration::from_secs(30),
        }
    }
}

impl CircuitBreakerConfig {
    /// Creates a new configuration.
    pub fn new(threshold: u32, timeout: Duration) -> Self {
        Self { threshold, timeout }
    }

    /// Sets the failure threshold.
    pub fn threshold(mut self, threshold: u32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Sets the half-open timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Hook for circuit breaker state changes.
pub trait CircuitBreakerHook: Send + Sync {
    /// Called when the circuit state changes.
    fn on_state_change(&self, old_state: CircuitState, new_state: CircuitState);
}

/// Circuit breaker for one downstream dependency.
pub struct CircuitBreaker {
    threshold: u32,
    timeout: Duration,
    failure_count: AtomicU32,
    /// Nanoseconds since `epoch`.
    last_failure_at: AtomicU64,
    epoch: Instant,
    hook: Option<Arc<dyn CircuitBreakerHook>>,
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("threshold", &self.threshold)
            .field("timeout", &self.timeout)
            .field("failure_count", &self.failure_count())
            .finish_non_exhaustive()
    }
}

impl CircuitBreaker {
    /// Creates a new circuit breaker.
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            threshold: config.threshold,
            timeout: config.timeout,
            failure_count: AtomicU32::new(0),
            last_failure_at: AtomicU64::new(0),
            epoch: Instant::now(),
            hook: None,
        }
    }

    /// Creates a breaker with a given threshold and timeout.
    pub fn with_threshold(threshold: u32, timeout: Duration) -> Self {
        Self::new(CircuitBreakerConfig::new(threshold, timeout))
    }

    /// Sets a state change hook.
    pub fn with_hook(mut self, hook: Arc<dyn CircuitBreakerHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Returns the failure threshold.
    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Returns the half-open timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the current consecutive failure count.
    pub fn failure_count(&self) -> u32 {
        self.failure_count.load(Ordering::Acquire)
    }

    /// Returns the current state without releasing a trial call.
    pub fn state(&self) -> CircuitState {
        if self.failure_count() < self.threshold {
            CircuitState::Closed
        } else if self.elapsed_since_last_failure() > self.timeout {
            CircuitState::HalfOpen
        } else {
            CircuitState::Open
        }
    }

    /// Checks if a call may proceed.
    ///
    /// Once tripped, the first caller to observe an expired timeout restarts
    /// the timer and is let through as the half-open trial call.
    pub fn allowed(&self) -> bool {
        if self.failure_count() < self.threshold {
            return true;
        }

        let last = self.last_failure_at.load(Ordering::Acquire);
        let now = self.now_nanos();
        if Duration::from_nanos(now.saturating_sub(last)) <= self.timeout {
            return false;
        }

        let released = self
            .last_failure_at
            .compare_exchange(last, now, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if released {
            self.notify(CircuitState::Open, CircuitState::HalfOpen);
        }
        released
    }

    /// Records a failed call.
    pub fn record_failure(&self) {
        let failures = self
            .failure_count
            .fetch_add(1, Ordering::AcqRel)
            .saturating_add(1);
        self.last_failure_at
            .store(self.now_nanos(), Ordering::Release);

        if failures == self.threshold {
            self.notify(CircuitState::Closed, CircuitState::Open);
        } else if failures > self.threshold {
            self.notify(CircuitState::HalfOpen, CircuitState::Open);
        }
    }

    /// Records a successful call.
    pub fn record_success(&self) {
        let previous = self.failure_count.swap(0, Ordering::AcqRel);
        if previous >= self.threshold {
            self.notify(CircuitState::HalfOpen, CircuitState::Closed);
        }
    }

    /// Runs `f` through the breaker.
    ///
    /// A rejected call returns `Outcome::Retryable(BreakerOpen)` without
    /// running `f`. `Ignored` outcomes leave the counters untouched.
    pub async fn call<F, Fut, T, E>(&self, f: F) -> Outcome<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Outcome<T, E>>,
        E: From<BreakerOpen>,
    {
        if !self.allowed() {
            return Outcome::Retryable(E::from(BreakerOpen), None);
        }

        let outcome = f().await;
        if outcome.is_success() {
            self.record_success();
        } else if outcome.counts_as_failure() {
            self.record_failure();
        }
        outcome
    }

    fn elapsed_since_last_failure(&self) -> Duration {
        let last = self.last_failure_at.load(Ordering::Acquire);
        Duration::from_nanos(self.now_nanos().saturating_sub(last))
    }

    fn now_nanos(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }

    fn notify(&self, old_state: CircuitState, new_state: CircuitState) {
        if let Some(hook) = &self.hook {
            hook.on_state_change(old_state, new_state);
        }
    }
}
