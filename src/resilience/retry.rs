//! Retry logic with exponential backoff and jitter.

use rand::Rng;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::Outcome;

/// Default number of attempts.
pub const DEFAULT_ATTEMPTS: u32 = 3;

/// Default initial backoff.
pub const DEFAULT_INITIAL_SLEEP: Duration = Duration::from_secs(1);

/// Default backoff multiplier.
pub const DEFAULT_FACTOR: u32 = 2;

/// Configuration for retry behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total attempts, including the first. Zero still runs once.
    pub attempts: u32,
    /// Backoff before the first retry.
    pub initial_sleep: Duration,
    /// Backoff multiplier applied after every retry.
    pub factor: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            initial_sleep: DEFAULT_INITIAL_SLEEP,
            factor: DEFAULT_FACTOR,
        }
    }
}

impl RetryConfig {
    /// Creates a new configuration.
    pub fn new(attempts: u32, initial_sleep: Duration, factor: u32) -> Self {
        Self {
            attempts,
            initial_sleep,
            factor,
        }
    }

    /// One second initial backoff, doubling after every retry.
    pub fn double(attempts: u32) -> Self {
        Self {
            attempts,
            ..Self::default()
        }
    }
}

/// Context passed to retry hooks.
#[derive(Debug, Clone)]
pub struct RetryContext {
    /// Attempt that just failed (1-indexed).
    pub attempt: u32,
    /// Delay before the next attempt, jitter included.
    pub delay: Duration,
    /// Attempts left after this one.
    pub attempts_remaining: u32,
}

/// Hook invoked before every backoff sleep.
pub trait RetryHook: Send + Sync {
    /// Called before sleeping ahead of the next attempt.
    fn on_retry(&self, context: &RetryContext);
}

/// Mutable backoff schedule for one logical call.
///
/// A policy is spent by [`run`](Self::run): it carries the attempt count and
/// the growing sleep, so build a fresh one per call and never share it.
pub struct RetryPolicy {
    attempts_remaining: u32,
    sleep: Duration,
    factor: u32,
    hook: Option<Arc<dyn RetryHook>>,
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("attempts_remaining", &self.attempts_remaining)
            .field("sleep", &self.sleep)
            .field("factor", &self.factor)
            .finish_non_exhaustive()
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(config.clone())
    }
}

impl RetryPolicy {
    /// Creates a new policy.
    pub fn new(config: RetryConfig) -> Self {
        Self {
            attempts_remaining: config.attempts,
            sleep: config.initial_sleep,
            factor: config.factor,
            hook: None,
        }
    }

    /// Creates a policy with one second initial backoff and factor 2.
    pub fn double(attempts: u32) -> Self {
        Self::new(RetryConfig::double(attempts))
    }

    /// Sets a retry hook.
    pub fn with_hook(mut self, hook: Arc<dyn RetryHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Returns the attempts left.
    pub fn attempts_remaining(&self) -> u32 {
        self.attempts_remaining
    }

    /// Returns the current base backoff.
    pub fn sleep(&self) -> Duration {
        self.sleep
    }

    /// Overrides the base backoff used before the next attempt.
    pub fn set_sleep(&mut self, sleep: Duration) {
        self.sleep = sleep;
    }

    /// Runs `f` until it succeeds, returns a terminal outcome, or attempts
    /// run out.
    ///
    /// A retryable outcome carrying a server hint replaces the current sleep
    /// and is waited out as is, without jitter. Growth by `factor` still
    /// applies after it.
    pub async fn run<F, Fut, T, E>(&mut self, mut f: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Outcome<T, E>>,
    {
        let mut attempt: u32 = 1;

        loop {
            let (error, hint) = match f().await {
                Outcome::Success(value) => return Ok(value),
                Outcome::Ignored(error) | Outcome::Terminal(error) => return Err(error),
                Outcome::Retryable(error, hint) => (error, hint),
            };

            if let Some(hint) = hint {
                self.sleep = hint;
            }

            self.attempts_remaining = self.attempts_remaining.saturating_sub(1);
            if self.attempts_remaining == 0 {
                return Err(error);
            }

            // A server hint is waited out exactly; jitter only pads local backoff.
            let delay = match hint {
                Some(hint) => hint,
                None => self.sleep.saturating_add(self.jitter()),
            };
            if let Some(hook) = &self.hook {
                hook.on_retry(&RetryContext {
                    attempt,
                    delay,
                    attempts_remaining: self.attempts_remaining,
                });
            }

            tokio::time::sleep(delay).await;
            self.sleep = self.sleep.saturating_mul(self.factor);
            attempt = attempt.saturating_add(1);
        }
    }

    /// Uniform in `[0, sleep)`, scaled by `1 / factor`.
    fn jitter(&self) -> Duration {
        let nanos = u64::try_from(self.sleep.as_nanos()).unwrap_or(u64::MAX);
        if nanos == 0 {
            return Duration::ZERO;
        }
        let raw = rand::thread_rng().gen_range(0..nanos);
        Duration::from_nanos(raw / u64::from(self.factor.max(1)))
    }
}
