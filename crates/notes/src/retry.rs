//! Bounded retry with exponential backoff.
//!
//! All waits go through [`Clock::sleep`], so tests can run the full retry
//! schedule on a `ManualClock` without real delays.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use common::Clock;

use crate::NoteError;

/// Classifies errors the retry loop may repeat.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for NoteError {
    fn is_retryable(&self) -> bool {
        matches!(self, NoteError::Transient(_))
    }
}

/// Exponential delay schedule: `initial * 2^(n-1)`, capped at `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub initial: Duration,
    pub max: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self { initial, max }
    }

    /// Returns the wait after the `attempt`-th failure (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2_u32.saturating_pow(attempt.saturating_sub(1));
        self.initial.saturating_mul(factor).min(self.max)
    }
}

/// How many times to run an operation and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }
}

impl Default for RetryPolicy {
    /// 3 attempts, waiting 1s then 2s, never more than 8s.
    fn default() -> Self {
        Self::new(
            3,
            Backoff::new(Duration::from_secs(1), Duration::from_secs(8)),
        )
    }
}

/// Why a retried operation gave up.
#[derive(Debug)]
pub enum RetryError<E> {
    /// A non-retryable error; returned on the attempt it occurred.
    Fatal(E),
    /// Every attempt failed with a retryable error.
    Exhausted { attempts: u32, last_error: E },
}

/// Runs a write followed by its verification, repeating both on
/// retryable failures.
pub struct RetryingWriter<C: Clock> {
    policy: RetryPolicy,
    clock: C,
}

impl<C: Clock> RetryingWriter<C> {
    pub fn new(policy: RetryPolicy, clock: C) -> Self {
        Self { policy, clock }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Calls `write` then `verify` until both succeed.
    ///
    /// Both closures receive the 1-based attempt number. Returns the number
    /// of attempts used.
    pub async fn execute<E, W, WF, V, VF>(
        &self,
        mut write: W,
        mut verify: V,
    ) -> std::result::Result<u32, RetryError<E>>
    where
        E: Retryable + fmt::Display,
        W: FnMut(u32) -> WF,
        WF: Future<Output = std::result::Result<(), E>>,
        V: FnMut(u32) -> VF,
        VF: Future<Output = std::result::Result<(), E>>,
    {
        let mut attempt = 0;

        loop {
            attempt += 1;

            let outcome = match write(attempt).await {
                Ok(()) => verify(attempt).await,
                Err(e) => Err(e),
            };

            let error = match outcome {
                Ok(()) => return Ok(attempt),
                Err(e) if !e.is_retryable() => return Err(RetryError::Fatal(e)),
                Err(e) => e,
            };

            if attempt >= self.policy.max_attempts {
                tracing::error!(
                    attempts = attempt,
                    error = %error,
                    "retries exhausted"
                );
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last_error: error,
                });
            }

            let delay = self.policy.backoff.delay(attempt);
            tracing::warn!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "attempt failed, retrying"
            );
            self.clock.sleep(delay).await;
        }
    }
}

/// Bounded polling for a value that may not be visible yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Poller {
    pub checks: u32,
    pub backoff: Backoff,
}

impl Poller {
    pub fn new(checks: u32, initial: Duration) -> Self {
        Self {
            checks: checks.max(1),
            backoff: Backoff::new(initial, initial.saturating_mul(2_u32.saturating_pow(checks))),
        }
    }

    /// Runs `check` until it yields `Some`, sleeping between checks.
    ///
    /// Returns `Ok(None)` if every check came back empty. Check errors are
    /// returned immediately.
    pub async fn poll<T, E, C, F, Fut>(
        &self,
        clock: &C,
        mut check: F,
    ) -> std::result::Result<Option<T>, E>
    where
        C: Clock,
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<Option<T>, E>>,
    {
        for n in 1..=self.checks {
            if let Some(value) = check().await? {
                return Ok(Some(value));
            }
            if n < self.checks {
                clock.sleep(self.backoff.delay(n)).await;
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::ManualClock;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let backoff = Backoff::new(Duration::from_secs(1), Duration::from_secs(8));
        let delays: Vec<_> = (1..=6).map(|n| backoff.delay(n).as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 8, 8]);
        assert_eq!(backoff.delay(40), Duration::from_secs(8));
    }

    #[tokio::test]
    async fn succeeds_on_first_attempt_without_sleeping() {
        let clock = ManualClock::default();
        let writer = RetryingWriter::new(RetryPolicy::default(), clock.clone());

        let attempts = writer
            .execute(
                |_| async { Ok::<_, NoteError>(()) },
                |_| async { Ok::<_, NoteError>(()) },
            )
            .await
            .unwrap();

        assert_eq!(attempts, 1);
        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn transient_failures_back_off_then_succeed() {
        let clock = ManualClock::default();
        let writer = RetryingWriter::new(RetryPolicy::default(), clock.clone());

        let attempts = writer
            .execute(
                |attempt| async move {
                    if attempt < 3 {
                        Err(NoteError::Transient("connection reset".into()))
                    } else {
                        Ok(())
                    }
                },
                |_| async { Ok(()) },
            )
            .await
            .unwrap();

        assert_eq!(attempts, 3);
        assert_eq!(clock.sleeps(), vec![ms(1000), ms(2000)]);
    }

    #[tokio::test]
    async fn fatal_error_stops_immediately() {
        let clock = ManualClock::default();
        let writer = RetryingWriter::new(RetryPolicy::default(), clock.clone());
        let calls = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&calls);
        let result = writer
            .execute(
                move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    async { Err(NoteError::Auth("no session".into())) }
                },
                |_| async { Ok(()) },
            )
            .await;

        assert!(matches!(result, Err(RetryError::Fatal(NoteError::Auth(_)))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn failing_verification_exhausts_attempts() {
        let clock = ManualClock::default();
        let policy = RetryPolicy::new(4, Backoff::new(ms(100), ms(250)));
        let writer = RetryingWriter::new(policy, clock.clone());

        let result = writer
            .execute(
                |_| async { Ok(()) },
                |_| async { Err(NoteError::Transient("not visible".into())) },
            )
            .await;

        match result {
            Err(RetryError::Exhausted {
                attempts,
                last_error,
            }) => {
                assert_eq!(attempts, 4);
                assert!(last_error.to_string().contains("not visible"));
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
        assert_eq!(clock.sleeps(), vec![ms(100), ms(200), ms(250)]);
    }

    #[tokio::test]
    async fn poller_sleeps_between_checks_only() {
        let clock = ManualClock::default();
        let poller = Poller::new(3, ms(300));
        let calls = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&calls);
        let found = poller
            .poll(&clock, move || {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                async move { Ok::<_, NoteError>((n == 3).then_some(n)) }
            })
            .await
            .unwrap();
        assert_eq!(found, Some(3));
        assert_eq!(clock.sleeps(), vec![ms(300), ms(600)]);

        let clock = ManualClock::default();
        let missing = poller
            .poll(&clock, || async { Ok::<Option<u32>, NoteError>(None) })
            .await
            .unwrap();
        assert_eq!(missing, None);
        assert_eq!(clock.total_slept(), ms(900));
    }
}
