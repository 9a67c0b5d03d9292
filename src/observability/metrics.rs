//! Metrics collection for the resilient client.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::resilience::{CircuitBreakerHook, CircuitState, RetryContext, RetryHook};

/// Metrics collector for tracking client behaviour.
pub trait MetricsCollector: Send + Sync {
    /// Records one transport attempt. `status` is `None` for network failures.
    fn record_attempt(&self, method: &str, status: Option<u16>, duration: Duration);

    /// Records a retry about to sleep for `delay`.
    fn record_retry(&self, attempt: u32, delay: Duration);

    /// Records a call that completed successfully.
    fn record_success(&self);

    /// Records a call that failed, keyed by error kind.
    fn record_failure(&self, kind: &str);

    /// Records an attempt rejected by an open breaker.
    fn record_breaker_rejection(&self);

    /// Records a circuit breaker state change.
    fn record_circuit_breaker_state(&self, state: CircuitState);

    /// Gets current metrics snapshot.
    fn get_metrics(&self) -> ClientMetrics;
}

/// Aggregated client metrics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientMetrics {
    /// Transport attempts made.
    pub total_attempts: u64,
    /// Attempts that ended in a network failure.
    pub network_failures: u64,
    /// Retries scheduled.
    pub total_retries: u64,
    /// Calls that succeeded.
    pub successful_calls: u64,
    /// Calls that failed.
    pub failed_calls: u64,
    /// Attempts rejected without reaching the transport.
    pub breaker_rejections: u64,
    /// Average attempt duration in milliseconds.
    pub avg_attempt_ms: f64,
    /// Attempts by response status.
    pub attempts_by_status: HashMap<u16, u64>,
    /// Failed calls by error kind.
    pub failures_by_kind: HashMap<String, u64>,
    /// Last reported circuit breaker state.
    pub circuit_breaker_state: String,
}

/// Default in-memory metrics collector.
pub struct DefaultMetricsCollector {
    total_attempts: AtomicU64,
    network_failures: AtomicU64,
    total_retries: AtomicU64,
    successful_calls: AtomicU64,
    failed_calls: AtomicU64,
    breaker_rejections: AtomicU64,
    total_attempt_ms: AtomicU64,
    attempts_by_status: RwLock<HashMap<u16, u64>>,
    failures_by_kind: RwLock<HashMap<String, u64>>,
    circuit_breaker_state: RwLock<CircuitState>,
}

impl Default for DefaultMetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultMetricsCollector {
    /// Creates a new metrics collector.
    pub fn new() -> Self {
        Self {
            total_attempts: AtomicU64::new(0),
            network_failures: AtomicU64::new(0),
            total_retries: AtomicU64::new(0),
            successful_calls: AtomicU64::new(0),
            failed_calls: AtomicU64::new(0),
            breaker_rejections: AtomicU64::new(0),
            total_attempt_ms: AtomicU64::new(0),
            attempts_by_status: RwLock::new(HashMap::new()),
            failures_by_kind: RwLock::new(HashMap::new()),
            circuit_breaker_state: RwLock::new(CircuitState::Closed),
        }
    }

    /// Resets all counters. The breaker state is kept.
    pub fn reset(&self) {
        self.total_attempts.store(0, Ordering::SeqCst);
        self.network_failures.store(0, Ordering::SeqCst);
        self.total_retries.store(0, Ordering::SeqCst);
        self.successful_calls.store(0, Ordering::SeqCst);
        self.failed_calls.store(0, Ordering::SeqCst);
        self.breaker_rejections.store(0, Ordering::SeqCst);
        self.total_attempt_ms.store(0, Ordering::SeqCst);

        if let Ok(mut statuses) = self.attempts_by_status.write() {
            statuses.clear();
        }
        if let Ok(mut kinds) = self.failures_by_kind.write() {
            kinds.clear();
        }
    }
}

impl MetricsCollector for DefaultMetricsCollector {
    fn record_attempt(&self, _method: &str, status: Option<u16>, duration: Duration) {
        self.total_attempts.fetch_add(1, Ordering::SeqCst);
        self.total_attempt_ms
            .fetch_add(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX), Ordering::SeqCst);

        match status {
            Some(status) => {
                if let Ok(mut statuses) = self.attempts_by_status.write() {
                    *statuses.entry(status).or_insert(0) += 1;
                }
            }
            None => {
                self.network_failures.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    fn record_retry(&self, _attempt: u32, _delay: Duration) {
        self.total_retries.fetch_add(1, Ordering::SeqCst);
    }

    fn record_success(&self) {
        self.successful_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn record_failure(&self, kind: &str) {
        self.failed_calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut kinds) = self.failures_by_kind.write() {
            *kinds.entry(kind.to_string()).or_insert(0) += 1;
        }
    }

    fn record_breaker_rejection(&self) {
        self.breaker_rejections.fetch_add(1, Ordering::SeqCst);
    }

    fn record_circuit_breaker_state(&self, state: CircuitState) {
        if let Ok(mut current) = self.circuit_breaker_state.write() {
            *current = state;
        }
    }

    fn get_metrics(&self) -> ClientMetrics {
        let total = self.total_attempts.load(Ordering::SeqCst);
        let total_ms = self.total_attempt_ms.load(Ordering::SeqCst);
        let avg = if total > 0 {
            total_ms as f64 / total as f64
        } else {
            0.0
        };

        ClientMetrics {
            total_attempts: total,
            network_failures: self.network_failures.load(Ordering::SeqCst),
            total_retries: self.total_retries.load(Ordering::SeqCst),
            successful_calls: self.successful_calls.load(Ordering::SeqCst),
            failed_calls: self.failed_calls.load(Ordering::SeqCst),
            breaker_rejections: self.breaker_rejections.load(Ordering::SeqCst),
            avg_attempt_ms: avg,
            attempts_by_status: self
                .attempts_by_status
                .read()
                .map(|r| r.clone())
                .unwrap_or_default(),
            failures_by_kind: self
                .failures_by_kind
                .read()
                .map(|r| r.clone())
                .unwrap_or_default(),
            circuit_breaker_state: self
                .circuit_breaker_state
                .read()
                .map(|s| s.as_str().to_string())
                .unwrap_or_else(|_| "unknown".to_string()),
        }
    }
}

/// No-op metrics collector for when metrics are disabled.
pub struct NoopMetricsCollector;

impl MetricsCollector for NoopMetricsCollector {
    fn record_attempt(&self, _method: &str, _status: Option<u16>, _duration: Duration) {}
    fn record_retry(&self, _attempt: u32, _delay: Duration) {}
    fn record_success(&self) {}
    fn record_failure(&self, _kind: &str) {}
    fn record_breaker_rejection(&self) {}
    fn record_circuit_breaker_state(&self, _state: CircuitState) {}
    fn get_metrics(&self) -> ClientMetrics {
        ClientMetrics::default()
    }
}

/// Forwards breaker and retry hooks into a [`MetricsCollector`].
#[derive(Clone)]
pub struct MetricsHook {
    collector: Arc<dyn MetricsCollector>,
}

impl MetricsHook {
    /// Wraps a collector.
    pub fn new(collector: Arc<dyn MetricsCollector>) -> Self {
        Self { collector }
    }
}

impl CircuitBreakerHook for MetricsHook {
    fn on_state_change(&self, _old_state: CircuitState, new_state: CircuitState) {
        self.collector.record_circuit_breaker_state(new_state);
    }
}

impl RetryHook for MetricsHook {
    fn on_retry(&self, context: &RetryContext) {
        self.collector.record_retry(context.attempt, context.delay);
    }
}
