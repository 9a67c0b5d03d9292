//! Resilient HTTP client.
//!
//! [`ResilientClient`] sends one request through the retry policy, the
//! circuit breaker and the caller's cancellation signal, and turns every
//! non-success status into a [`ClientError`].

use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::Instrument;

use crate::config::ClientConfig;
use crate::content::{self, ContentType, ContentTypePolicy};
use crate::errors::{truncate_body, ClientError, ClientResult};
use crate::observability::{
    DefaultMetricsCollector, MetricsCollector, MetricsHook, RequestSpan,
};
use crate::resilience::{
    with_cancellation, Cancellation, CircuitBreaker, CircuitBreakerConfig, Outcome, RetryConfig,
    RetryPolicy,
};
use crate::transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport, TransportConfig};

/// HTTP client that retries with backoff and stops calling a failing
/// dependency.
///
/// Cloning is cheap; clones share the transport, breaker and metrics.
#[derive(Clone)]
pub struct ResilientClient {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    breaker: Arc<CircuitBreaker>,
    metrics: Arc<dyn MetricsCollector>,
}

impl std::fmt::Debug for ResilientClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilientClient")
            .field("config", &self.config)
            .field("breaker", &self.breaker)
            .finish_non_exhaustive()
    }
}

impl ResilientClient {
    /// Creates a client over the default reqwest transport.
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        Self::builder().config(config).build()
    }

    /// Creates a client from the environment.
    pub fn from_env() -> ClientResult<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Creates a new client builder.
    pub fn builder() -> ResilientClientBuilder {
        ResilientClientBuilder::new()
    }

    /// Replaces the breaker, so several clients can guard one dependency.
    pub fn with_breaker(mut self, breaker: Arc<CircuitBreaker>) -> Self {
        self.breaker = breaker;
        self
    }

    /// Returns the circuit breaker guarding this client's dependency.
    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    /// Returns the metrics collector.
    pub fn metrics(&self) -> &dyn MetricsCollector {
        self.metrics.as_ref()
    }

    /// Returns the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Sends `request`, retrying retryable failures.
    ///
    /// # Errors
    ///
    /// Any status of 400 or above is returned as an error once retries are
    /// spent or the failure is terminal.
    pub async fn execute(&self, request: HttpRequest) -> ClientResult<HttpResponse> {
        self.execute_with(request, &Cancellation::none()).await
    }

    /// Sends `request`, stopping as soon as `cancel` fires.
    ///
    /// An in-flight attempt is dropped on cancellation and no further
    /// attempts start.
    pub async fn execute_with(
        &self,
        request: HttpRequest,
        cancel: &Cancellation,
    ) -> ClientResult<HttpResponse> {
        let request = self.with_default_headers(request);
        let span = RequestSpan::new(&request);
        let instrumented = span.span.clone();

        async move {
            let mut attempts: u32 = 0;
            let result = self.run(&request, cancel, &mut attempts).await;
            let elapsed = span.elapsed();

            match &result {
                Ok(response) => {
                    self.metrics.record_success();
                    tracing::debug!(
                        status = response.status,
                        attempts,
                        elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                        "request succeeded"
                    );
                }
                Err(error) => {
                    self.metrics.record_failure(error.kind());
                    log_failure(error, attempts, elapsed);
                }
            }
            result
        }
        .instrument(instrumented)
        .await
    }

    /// Sends `request` and decodes the body into `T`.
    ///
    /// The format is picked from the response `Content-Type` under the
    /// configured [`ContentTypePolicy`].
    pub async fn execute_decode<T: DeserializeOwned>(&self, request: HttpRequest) -> ClientResult<T> {
        self.execute_decode_with(request, &Cancellation::none()).await
    }

    /// Like [`execute_decode`](Self::execute_decode), with cancellation.
    pub async fn execute_decode_with<T: DeserializeOwned>(
        &self,
        request: HttpRequest,
        cancel: &Cancellation,
    ) -> ClientResult<T> {
        let response = self.execute_with(request, cancel).await?;
        let content_type =
            ContentType::negotiate(response.content_type(), self.config.content_type_policy);
        content::decode(content_type, &response.body)
    }

    async fn run(
        &self,
        request: &HttpRequest,
        cancel: &Cancellation,
        attempts: &mut u32,
    ) -> ClientResult<HttpResponse> {
        let mut policy = RetryPolicy::new(self.config.retry.clone())
            .with_hook(Arc::new(MetricsHook::new(self.metrics.clone())));

        let retries = policy.run(|| {
            *attempts += 1;
            let request = request.clone();
            async move {
                let outcome =
                    with_cancellation(cancel, self.breaker.call(|| self.attempt(request))).await;
                if let Outcome::Retryable(ClientError::BreakerOpen(_), _) = &outcome {
                    self.metrics.record_breaker_rejection();
                    tracing::debug!("breaker open, attempt skipped");
                }
                outcome
            }
        });

        // The backoff sleep lives inside the policy, so race the whole run.
        tokio::select! {
            biased;
            cause = cancel.cancelled() => Err(ClientError::from(cause)),
            result = retries => result,
        }
    }

    async fn attempt(&self, request: HttpRequest) -> Outcome<HttpResponse, ClientError> {
        let method = request.method;
        let started = Instant::now();

        match self.transport.send(request).await {
            Ok(response) => {
                self.metrics
                    .record_attempt(method.as_str(), Some(response.status), started.elapsed());
                classify(response)
            }
            Err(error @ ClientError::Network { .. }) => {
                self.metrics
                    .record_attempt(method.as_str(), None, started.elapsed());
                tracing::debug!(error = %error, "attempt failed");
                Outcome::Retryable(error, None)
            }
            // Not the dependency's fault: stop without touching the breaker.
            Err(error) => Outcome::Ignored(error),
        }
    }

    fn with_default_headers(&self, mut request: HttpRequest) -> HttpRequest {
        for (name, value) in &self.config.default_headers {
            if request.header_value(name).is_none() {
                request.headers.insert(name.clone(), value.clone());
            }
        }
        request
    }
}

/// Maps one response onto an attempt outcome.
fn classify(response: HttpResponse) -> Outcome<HttpResponse, ClientError> {
    let status = response.status;
    if status < 400 {
        return Outcome::Success(response);
    }

    let body = truncate_body(&response.body);
    let retry_after = parse_retry_after(response.header("retry-after"));

    match status {
        420 | 429 => Outcome::Retryable(
            ClientError::RateLimited {
                status,
                retry_after,
                body,
            },
            retry_after,
        ),
        500.. => Outcome::Retryable(
            ClientError::Server {
                status,
                retry_after,
                body,
            },
            retry_after,
        ),
        _ => Outcome::Ignored(ClientError::Client { status, body }),
    }
}

/// Integer seconds only. HTTP-date values fall back to local backoff.
fn parse_retry_after(value: Option<&str>) -> Option<Duration> {
    value?.trim().parse::<u64>().ok().map(Duration::from_secs)
}

fn log_failure(error: &ClientError, attempts: u32, elapsed: Duration) {
    let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
    match error {
        ClientError::Client { .. } | ClientError::Cancelled(_) | ClientError::BreakerOpen(_) => {
            tracing::warn!(
                kind = error.kind(),
                status = error.status(),
                attempts,
                elapsed_ms,
                error = %error,
                "request failed"
            );
        }
        _ => {
            tracing::error!(
                kind = error.kind(),
                status = error.status(),
                attempts,
                elapsed_ms,
                error = %error,
                "request failed"
            );
        }
    }
}

/// Builder for [`ResilientClient`].
#[derive(Default)]
pub struct ResilientClientBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn Transport>>,
    breaker: Option<Arc<CircuitBreaker>>,
    metrics: Option<Arc<dyn MetricsCollector>>,
}

impl ResilientClientBuilder {
    /// Creates a new client builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the whole configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the retry configuration.
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.config.retry = retry;
        self
    }

    /// Sets the circuit breaker configuration. Ignored if a shared breaker
    /// is given.
    pub fn circuit_breaker(mut self, breaker: CircuitBreakerConfig) -> Self {
        self.config.circuit_breaker = breaker;
        self
    }

    /// Uses an existing breaker shared with other clients.
    pub fn breaker(mut self, breaker: Arc<CircuitBreaker>) -> Self {
        self.breaker = Some(breaker);
        self
    }

    /// Sets the content type policy.
    pub fn content_type_policy(mut self, policy: ContentTypePolicy) -> Self {
        self.config.content_type_policy = policy;
        self
    }

    /// Adds a default header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.push((name.into(), value.into()));
        self
    }

    /// Sets the transport.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sets the metrics collector.
    pub fn metrics(mut self, metrics: Arc<dyn MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Builds the client.
    pub fn build(self) -> ClientResult<ResilientClient> {
        self.config.validate()?;

        let metrics = self
            .metrics
            .unwrap_or_else(|| Arc::new(DefaultMetricsCollector::new()));

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::with_config(TransportConfig {
                timeout: self.config.request_timeout,
                ..Default::default()
            })?),
        };

        let breaker = self.breaker.unwrap_or_else(|| {
            Arc::new(
                CircuitBreaker::new(self.config.circuit_breaker.clone())
                    .with_hook(Arc::new(MetricsHook::new(metrics.clone()))),
            )
        });

        Ok(ResilientClient {
            config: self.config,
            transport,
            breaker,
            metrics,
        })
    }
}
