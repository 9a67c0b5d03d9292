//! Caller-driven cancellation for individual attempts.
//!
//! [`with_cancellation`] races an attempt against a [`Cancellation`]. When
//! the signal wins, the attempt future is dropped and a terminal outcome is
//! returned, so the retry loop ends without waiting for the attempt. The
//! transport may or may not observe the drop; only the caller's wait is
//! guaranteed to end.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::Outcome;
use crate::errors::Cancelled;

/// A cancellation token and/or deadline supplied by the caller.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    token: Option<CancellationToken>,
    deadline: Option<Instant>,
}

impl Cancellation {
    /// A signal that never fires.
    pub fn none() -> Self {
        Self::default()
    }

    /// Fires when `token` is cancelled.
    pub fn token(token: CancellationToken) -> Self {
        Self {
            token: Some(token),
            deadline: None,
        }
    }

    /// Fires at `deadline`.
    pub fn deadline(deadline: Instant) -> Self {
        Self {
            token: None,
            deadline: Some(deadline),
        }
    }

    /// Fires once `timeout` has elapsed from now.
    pub fn timeout(timeout: Duration) -> Self {
        Self::deadline(Instant::now() + timeout)
    }

    /// Adds a token to this signal.
    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.token = Some(token);
        self
    }

    /// Adds a deadline to this signal.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Returns the cause if the signal has already fired.
    pub fn check(&self) -> Option<Cancelled> {
        if self.token.as_ref().is_some_and(CancellationToken::is_cancelled) {
            return Some(Cancelled::Token);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Some(Cancelled::DeadlineExceeded);
        }
        None
    }

    /// Waits until the signal fires. Never resolves for [`Cancellation::none`].
    pub async fn cancelled(&self) -> Cancelled {
        match (&self.token, self.deadline) {
            (Some(token), Some(deadline)) => {
                tokio::select! {
                    biased;
                    () = token.cancelled() => Cancelled::Token,
                    () = tokio::time::sleep_until(deadline) => Cancelled::DeadlineExceeded,
                }
            }
            (Some(token), None) => {
                token.cancelled().await;
                Cancelled::Token
            }
            (None, Some(deadline)) => {
                tokio::time::sleep_until(deadline).await;
                Cancelled::DeadlineExceeded
            }
            (None, None) => std::future::pending().await,
        }
    }
}

/// Runs `attempt` unless `cancel` fires first.
///
/// The signal is checked before the attempt is polled, so an already
/// cancelled signal never starts the attempt.
pub async fn with_cancellation<Fut, T, E>(cancel: &Cancellation, attempt: Fut) -> Outcome<T, E>
where
    Fut: Future<Output = Outcome<T, E>>,
    E: From<Cancelled>,
{
    if let Some(cause) = cancel.check() {
        return Outcome::Terminal(E::from(cause));
    }

    tokio::select! {
        biased;
        cause = cancel.cancelled() => Outcome::Terminal(E::from(cause)),
        outcome = attempt => outcome,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ClientError;
    use crate::resilience::RetryPolicy;

    #[tokio::test]
    async fn test_cancelled_token_stops_hanging_attempt() {
        let token = CancellationToken::new();
        token.cancel();
        let cancel = Cancellation::token(token);

        let mut calls = 0;
        let result: Result<(), ClientError> = RetryPolicy::double(3)
            .run(|| {
                calls += 1;
                with_cancellation(&cancel, std::future::pending())
            })
            .await;

        assert!(matches!(result, Err(ClientError::Cancelled(Cancelled::Token))));
        assert_eq!(calls, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_stops_hanging_attempt() {
        let cancel = Cancellation::timeout(Duration::from_millis(200));
        let start = Instant::now();

        let outcome: Outcome<(), ClientError> =
            with_cancellation(&cancel, std::future::pending()).await;

        assert!(matches!(
            outcome,
            Outcome::Terminal(ClientError::Cancelled(Cancelled::DeadlineExceeded))
        ));
        assert!(start.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_completed_attempt_passes_through() {
        let outcome: Outcome<u32, ClientError> =
            with_cancellation(&Cancellation::none(), async { Outcome::Success(5) }).await;
        assert_eq!(outcome.into_result().ok(), Some(5));

        let outcome: Outcome<u32, ClientError> = with_cancellation(&Cancellation::none(), async {
            Outcome::Ignored(ClientError::Client {
                status: 400,
                body: None,
            })
        })
        .await;
        assert!(matches!(outcome, Outcome::Ignored(ClientError::Client { status: 400, .. })));
    }

    #[tokio::test]
    async fn test_cancel_while_waiting() {
        let token = CancellationToken::new();
        let cancel = Cancellation::token(token.clone());

        let handle = tokio::spawn(async move {
            let outcome: Outcome<(), ClientError> =
                with_cancellation(&cancel, std::future::pending()).await;
            outcome
        });

        tokio::task::yield_now().await;
        token.cancel();

        let outcome = handle.await.unwrap();
        assert!(matches!(outcome, Outcome::Terminal(ClientError::Cancelled(Cancelled::Token))));
    }

    #[tokio::test]
    async fn test_already_cancelled_never_polls_attempt() {
        let token = CancellationToken::new();
        token.cancel();
        let polled = std::sync::atomic::AtomicBool::new(false);

        let outcome: Outcome<(), ClientError> =
            with_cancellation(&Cancellation::token(token), async {
                polled.store(true, std::sync::atomic::Ordering::SeqCst);
                Outcome::Success(())
            })
            .await;

        assert!(matches!(outcome, Outcome::Terminal(ClientError::Cancelled(Cancelled::Token))));
        assert!(!polled.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_reports_cause() {
        let token = CancellationToken::new();
        let cancel = Cancellation::timeout(Duration::from_secs(1)).with_token(token.clone());
        assert_eq!(cancel.check(), None);

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cancel.check(), Some(Cancelled::DeadlineExceeded));

        token.cancel();
        assert_eq!(cancel.check(), Some(Cancelled::Token));
    }
}
