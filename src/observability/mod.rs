//! Observability module for tracing, metrics, and logging.

pub mod logging;
pub mod metrics;
pub mod tracing;

pub use logging::{LogConfig, LogFormat, LogLevel};
pub use metrics::{
    ClientMetrics, DefaultMetricsCollector, MetricsCollector, MetricsHook, NoopMetricsCollector,
};
pub use self::tracing::RequestSpan;
