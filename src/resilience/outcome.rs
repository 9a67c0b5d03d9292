//! Tagged result of a single attempt.

use std::time::Duration;

/// Outcome of one attempt, as seen by the breaker and the retry policy.
///
/// | Variant     | Breaker           | Retry policy          |
/// |-------------|-------------------|-----------------------|
/// | `Success`   | resets failures   | returns the value     |
/// | `Retryable` | counts a failure  | retries if attempts remain |
/// | `Ignored`   | untouched         | stops immediately     |
/// | `Terminal`  | counts a failure  | stops immediately     |
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T, E> {
    /// The attempt succeeded.
    Success(T),
    /// The attempt failed and may be retried. The duration, when present,
    /// is a server-directed delay that replaces the local backoff.
    Retryable(E, Option<Duration>),
    /// The attempt failed for a caller-side reason that says nothing about
    /// the dependency's health.
    Ignored(E),
    /// The attempt failed and must not be retried.
    Terminal(E),
}

impl<T, E> Outcome<T, E> {
    /// Returns true for `Success`.
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    /// Returns true if the breaker should count this outcome as a failure.
    pub fn counts_as_failure(&self) -> bool {
        matches!(self, Outcome::Retryable(..) | Outcome::Terminal(_))
    }

    /// Collapses the outcome into a plain result.
    pub fn into_result(self) -> Result<T, E> {
        match self {
            Outcome::Success(value) => Ok(value),
            Outcome::Retryable(error, _) | Outcome::Ignored(error) | Outcome::Terminal(error) => {
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_classification() {
        let ok: Outcome<i32, &str> = Outcome::Success(1);
        assert!(ok.is_success());
        assert!(!ok.counts_as_failure());

        let retry: Outcome<i32, &str> = Outcome::Retryable("boom", None);
        assert!(!retry.is_success());
        assert!(retry.counts_as_failure());

        let ignored: Outcome<i32, &str> = Outcome::Ignored("404");
        assert!(!ignored.is_success());
        assert!(!ignored.counts_as_failure());

        let terminal: Outcome<i32, &str> = Outcome::Terminal("fatal");
        assert!(terminal.counts_as_failure());
    }

    #[test]
    fn test_outcome_into_result() {
        assert_eq!(Outcome::<i32, &str>::Success(3).into_result(), Ok(3));
        assert_eq!(
            Outcome::<i32, &str>::Retryable("x", Some(Duration::from_secs(1))).into_result(),
            Err("x")
        );
        assert_eq!(Outcome::<i32, &str>::Ignored("x").into_result(), Err("x"));
    }
}
