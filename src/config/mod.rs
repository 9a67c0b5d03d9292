//! Configuration module for the resilient client.
//!
//! All settings are fixed at construction. Nothing here is read lazily or
//! stored globally: [`ClientConfig::from_env`] reads the environment once
//! into a plain value that is then passed to the client.

use std::time::Duration;

use crate::content::ContentTypePolicy;
use crate::errors::{ClientError, ClientResult};
use crate::resilience::{CircuitBreakerConfig, RetryConfig};
use crate::transport::DEFAULT_REQUEST_TIMEOUT;

/// Environment variable for the number of attempts.
pub const ENV_ATTEMPTS: &str = "RESILIENT_HTTP_ATTEMPTS";
/// Environment variable for the initial backoff in milliseconds.
pub const ENV_INITIAL_SLEEP_MS: &str = "RESILIENT_HTTP_INITIAL_SLEEP_MS";
/// Environment variable for the backoff multiplier.
pub const ENV_FACTOR: &str = "RESILIENT_HTTP_FACTOR";
/// Environment variable for the breaker threshold.
pub const ENV_BREAKER_THRESHOLD: &str = "RESILIENT_HTTP_BREAKER_THRESHOLD";
/// Environment variable for the breaker timeout in milliseconds.
pub const ENV_BREAKER_TIMEOUT_MS: &str = "RESILIENT_HTTP_BREAKER_TIMEOUT_MS";
/// Environment variable for the per-attempt request timeout in milliseconds.
pub const ENV_TIMEOUT_MS: &str = "RESILIENT_HTTP_TIMEOUT_MS";
/// Environment variable for the content type policy (`json`, `xml`, other).
pub const ENV_CONTENT_TYPE: &str = "HTTP_CONTENT_TYPE";

/// Configuration for [`ResilientClient`](crate::ResilientClient).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Retry schedule used for every call.
    pub retry: RetryConfig,
    /// Circuit breaker settings for the client's dependency.
    pub circuit_breaker: CircuitBreakerConfig,
    /// Body format negotiation.
    pub content_type_policy: ContentTypePolicy,
    /// Per-attempt timeout for the default transport.
    pub request_timeout: Duration,
    /// Headers added to every request unless the request sets them.
    pub default_headers: Vec<(String, String)>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            content_type_policy: ContentTypePolicy::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            default_headers: Vec::new(),
        }
    }
}

impl ClientConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    /// Creates a configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `RESILIENT_HTTP_ATTEMPTS`: total attempts per call
    /// - `RESILIENT_HTTP_INITIAL_SLEEP_MS`: initial backoff
    /// - `RESILIENT_HTTP_FACTOR`: backoff multiplier
    /// - `RESILIENT_HTTP_BREAKER_THRESHOLD`: consecutive failures to trip
    /// - `RESILIENT_HTTP_BREAKER_TIMEOUT_MS`: wait before a half-open trial call
    /// - `RESILIENT_HTTP_TIMEOUT_MS`: per-attempt request timeout
    /// - `HTTP_CONTENT_TYPE`: `json`, `xml`, or unset for both
    ///
    /// Unset or unparsable values keep their defaults.
    pub fn from_env() -> ClientResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Creates a configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> ClientResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let parse_u32 = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u32>().ok());
        let parse_ms = |key: &str| {
            lookup(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_millis)
        };

        let mut builder = ClientConfigBuilder::new();

        if let Some(attempts) = parse_u32(ENV_ATTEMPTS) {
            builder = builder.attempts(attempts);
        }
        if let Some(sleep) = parse_ms(ENV_INITIAL_SLEEP_MS) {
            builder = builder.initial_sleep(sleep);
        }
        if let Some(factor) = parse_u32(ENV_FACTOR) {
            builder = builder.factor(factor);
        }
        if let Some(threshold) = parse_u32(ENV_BREAKER_THRESHOLD) {
            builder = builder.breaker_threshold(threshold);
        }
        if let Some(timeout) = parse_ms(ENV_BREAKER_TIMEOUT_MS) {
            builder = builder.breaker_timeout(timeout);
        }
        if let Some(timeout) = parse_ms(ENV_TIMEOUT_MS) {
            builder = builder.request_timeout(timeout);
        }
        if let Some(policy) = lookup(ENV_CONTENT_TYPE) {
            builder = builder.content_type_policy(ContentTypePolicy::from_name(&policy));
        }

        builder.build()
    }

    /// Checks the configuration for values the client cannot work with.
    pub fn validate(&self) -> ClientResult<()> {
        if self.retry.factor == 0 {
            return Err(ClientError::Configuration {
                message: "Backoff factor must be at least 1".to_string(),
            });
        }
        if self.circuit_breaker.threshold == 0 {
            return Err(ClientError::Configuration {
                message: "Breaker threshold must be at least 1".to_string(),
            });
        }
        if self.request_timeout.is_zero() {
            return Err(ClientError::Configuration {
                message: "Request timeout cannot be zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Builder for `ClientConfig`.
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Creates a new configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the whole retry configuration.
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.config.retry = retry;
        self
    }

    /// Sets the number of attempts.
    pub fn attempts(mut self, attempts: u32) -> Self {
        self.config.retry.attempts = attempts;
        self
    }

    /// Sets the initial backoff.
    pub fn initial_sleep(mut self, sleep: Duration) -> Self {
        self.config.retry.initial_sleep = sleep;
        self
    }

    /// Sets the backoff multiplier.
    pub fn factor(mut self, factor: u32) -> Self {
        self.config.retry.factor = factor;
        self
    }

    /// Sets the whole circuit breaker configuration.
    pub fn circuit_breaker(mut self, breaker: CircuitBreakerConfig) -> Self {
        self.config.circuit_breaker = breaker;
        self
    }

    /// Sets the breaker threshold.
    pub fn breaker_threshold(mut self, threshold: u32) -> Self {
        self.config.circuit_breaker.threshold = threshold;
        self
    }

    /// Sets the breaker timeout.
    pub fn breaker_timeout(mut self, timeout: Duration) -> Self {
        self.config.circuit_breaker.timeout = timeout;
        self
    }

    /// Sets the content type policy.
    pub fn content_type_policy(mut self, policy: ContentTypePolicy) -> Self {
        self.config.content_type_policy = policy;
        self
    }

    /// Sets the per-attempt request timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Adds a default header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.push((name.into(), value.into()));
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> ClientResult<ClientConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
