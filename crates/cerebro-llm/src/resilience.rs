//! Timeout, cancellation and retry around a single upstream call
//!
//! Every attempt runs under its own [`CancellationToken`]. When the caller
//! supplies an [`AbortSignal`], the attempt token is a child of the signal's
//! token and is dropped (unlinked) when the attempt ends. A per-attempt
//! deadline cancels the token on expiry; the operation is expected to observe
//! the token and return promptly.

use std::future::Future;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;

use crate::classify::is_transient;
use crate::error::LlmError;

/// Total attempts per call, including the first
pub const MAX_ATTEMPTS: u32 = 3;

/// Backoff base, doubled per attempt
const BASE_DELAY: Duration = Duration::from_millis(1000);

/// Upper bound on a single backoff delay
const MAX_DELAY: Duration = Duration::from_millis(30_000);

/// Reason reported when a signal is aborted without one
const DEFAULT_ABORT_REASON: &str = "aborted";

/// Caller-owned cancellation signal carrying a reason
#[derive(Debug, Clone, Default)]
pub struct AbortSignal {
    token: CancellationToken,
    reason: Arc<OnceLock<String>>,
}

impl AbortSignal {
    /// Create a signal that has not been aborted
    pub fn new() -> Self {
        Self::default()
    }

    /// Abort with a reason; only the first reason is kept
    pub fn abort(&self, reason: impl Into<String>) {
        let _ = self.reason.set(reason.into());
        self.token.cancel();
    }

    /// Whether the signal has been aborted
    pub fn is_aborted(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Reason given at abort time
    pub fn reason(&self) -> String {
        self.reason
            .get()
            .cloned()
            .unwrap_or_else(|| DEFAULT_ABORT_REASON.to_owned())
    }

    /// Wait until the signal is aborted
    pub async fn aborted(&self) {
        self.token.cancelled().await;
    }

    /// Token linked to this signal, unlinked again when dropped
    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }

    /// Error surfaced to the caller once aborted
    pub fn error(&self) -> LlmError {
        LlmError::Cancelled { reason: self.reason() }
    }
}

impl From<CancellationToken> for AbortSignal {
    fn from(token: CancellationToken) -> Self {
        Self {
            token,
            reason: Arc::default(),
        }
    }
}

/// Retry policy with per-attempt timeout and full-jitter exponential backoff
#[derive(Debug, Clone, Copy)]
pub struct Resilience {
    timeout: Duration,
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl Resilience {
    /// Policy with the given per-attempt timeout and default backoff
    pub const fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            max_attempts: MAX_ATTEMPTS,
            base_delay: BASE_DELAY,
            max_delay: MAX_DELAY,
        }
    }

    /// Override the backoff base and cap
    #[must_use]
    pub const fn with_backoff(mut self, base_delay: Duration, max_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self.max_delay = max_delay;
        self
    }

    /// Override the total number of attempts, at least one
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = if max_attempts == 0 { 1 } else { max_attempts };
        self
    }

    /// Per-attempt timeout
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Exclusive upper bound of the backoff delay after attempt `attempt`
    ///
    /// `min(max_delay, base_delay * 2^attempt)`
    pub fn backoff_ceiling(&self, attempt: u32) -> Duration {
        let base = duration_millis(self.base_delay);
        let cap = duration_millis(self.max_delay);
        let exponential = base.saturating_mul(2u64.saturating_pow(attempt));
        Duration::from_millis(exponential.min(cap))
    }

    /// Random delay in `[0, backoff_ceiling(attempt))`
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let ceiling = duration_millis(self.backoff_ceiling(attempt));
        if ceiling == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::rng().random_range(0..ceiling))
    }

    /// Run `operation` with timeout, cancellation and retries
    ///
    /// `operation` is invoked once per attempt with that attempt's token.
    /// Fails with the caller's reason if `signal` is aborted, with the last
    /// error once attempts are exhausted, or immediately on a permanent error.
    pub async fn call<T, F, Fut>(&self, mut operation: F, signal: Option<&AbortSignal>) -> Result<T, LlmError>
    where
        F: FnMut(CancellationToken) -> Fut,
        Fut: Future<Output = Result<T, LlmError>>,
    {
        let mut attempt = 1;

        loop {
            if let Some(signal) = signal
                && signal.is_aborted()
            {
                return Err(signal.error());
            }

            let error = match self.attempt(&mut operation, signal).await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if let Some(signal) = signal
                && signal.is_aborted()
            {
                return Err(signal.error());
            }

            if attempt >= self.max_attempts || !is_transient(&error) {
                return Err(error);
            }

            let delay = self.backoff_delay(attempt);
            tracing::warn!(
                attempt,
                max_attempts = self.max_attempts,
                delay_ms = duration_millis(delay),
                error = %error,
                "transient upstream failure, retrying"
            );

            Self::pause(delay, signal).await?;
            attempt += 1;
        }
    }

    /// Run a single attempt under a fresh token and deadline
    async fn attempt<T, F, Fut>(&self, operation: &mut F, signal: Option<&AbortSignal>) -> Result<T, LlmError>
    where
        F: FnMut(CancellationToken) -> Fut,
        Fut: Future<Output = Result<T, LlmError>>,
    {
        let token = signal.map_or_else(CancellationToken::new, AbortSignal::child_token);

        let pending = operation(token.clone());
        let deadline = tokio::time::sleep(self.timeout);
        tokio::pin!(pending);
        tokio::pin!(deadline);

        let mut timed_out = false;
        let result = loop {
            tokio::select! {
                biased;
                result = &mut pending => break result,
                () = &mut deadline, if !timed_out => {
                    timed_out = true;
                    token.cancel();
                }
            }
        };

        match result {
            Err(_) if timed_out => Err(LlmError::Timeout { after: self.timeout }),
            other => other,
        }
    }

    /// Sleep between attempts, returning early if the caller aborts
    async fn pause(delay: Duration, signal: Option<&AbortSignal>) -> Result<(), LlmError> {
        match signal {
            Some(signal) => {
                tokio::select! {
                    () = tokio::time::sleep(delay) => Ok(()),
                    () = signal.aborted() => Err(signal.error()),
                }
            }
            None => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
        }
    }
}

/// Race `future` against `token`, failing once the token is cancelled
///
/// Network calls run through this so that a timed-out or aborted attempt
/// drops its in-flight request.
pub async fn until_cancelled<T, Fut>(token: &CancellationToken, future: Fut) -> Result<T, LlmError>
where
    Fut: Future<Output = Result<T, LlmError>>,
{
    tokio::select! {
        biased;
        () = token.cancelled() => Err(LlmError::Cancelled {
            reason: "attempt cancelled".to_owned(),
        }),
        result = future => result,
    }
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use tokio::time::Instant;

    use super::*;

    fn policy() -> Resilience {
        Resilience::new(Duration::from_secs(5))
    }

    fn unavailable() -> LlmError {
        LlmError::upstream(Some(503), "service unavailable")
    }

    #[test]
    fn backoff_ceiling_doubles_until_cap() {
        let policy = policy();
        assert_eq!(policy.backoff_ceiling(1), Duration::from_millis(2000));
        assert_eq!(policy.backoff_ceiling(2), Duration::from_millis(4000));
        assert_eq!(policy.backoff_ceiling(4), Duration::from_millis(16_000));
        assert_eq!(policy.backoff_ceiling(5), Duration::from_millis(30_000));
        assert_eq!(policy.backoff_ceiling(64), Duration::from_millis(30_000));
    }

    #[test]
    fn backoff_delay_stays_within_bounds() {
        let policy = policy();
        for attempt in 0..10 {
            let ceiling = policy.backoff_ceiling(attempt);
            for _ in 0..200 {
                let delay = policy.backoff_delay(attempt);
                assert!(delay < ceiling, "attempt {attempt}: {delay:?} >= {ceiling:?}");
                assert!(delay <= Duration::from_millis(30_000));
            }
        }
    }

    #[test]
    fn zero_backoff_is_zero() {
        let policy = policy().with_backoff(Duration::ZERO, Duration::ZERO);
        assert_eq!(policy.backoff_delay(3), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn success_on_first_attempt() {
        let calls = &AtomicU32::new(0);
        let result = policy()
            .call(
                move |_| async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, LlmError>("ok")
                },
                None,
            )
            .await;

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_on_third_attempt() {
        let calls = &AtomicU32::new(0);
        let result = policy()
            .call(
                move |_| async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(unavailable())
                    } else {
                        Ok("recovered")
                    }
                },
                None,
            )
            .await;

        assert_eq!(result.unwrap(), "recovered");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_three_attempts() {
        let calls = &AtomicU32::new(0);
        let result = policy()
            .call(
                move |_| async move {
                    // A fourth attempt would succeed, but must never happen
                    if calls.fetch_add(1, Ordering::SeqCst) < 3 {
                        Err(unavailable())
                    } else {
                        Ok(())
                    }
                },
                None,
            )
            .await;

        assert!(matches!(result, Err(LlmError::Upstream { status: Some(503), .. })));
        assert_eq!(calls.load(Ordering::SeqCst), MAX_ATTEMPTS);
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_error_is_not_retried() {
        let calls = &AtomicU32::new(0);
        let result = policy()
            .call(
                move |_| async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(LlmError::upstream(Some(400), "bad request"))
                },
                None,
            )
            .await;

        assert!(matches!(result, Err(LlmError::Upstream { status: Some(400), .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn single_attempt_policy_does_not_retry() {
        let calls = &AtomicU32::new(0);
        let result = policy()
            .with_max_attempts(0)
            .call(
                move |_| async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(unavailable())
                },
                None,
            )
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn pre_aborted_signal_makes_no_attempt() {
        let calls = &AtomicU32::new(0);
        let signal = AbortSignal::new();
        signal.abort("user pressed stop");

        let result = policy()
            .call(
                move |_| async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                },
                Some(&signal),
            )
            .await;

        let Err(LlmError::Cancelled { reason }) = result else {
            panic!("expected cancellation, got {result:?}");
        };
        assert_eq!(reason, "user pressed stop");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_cancels_token_and_retries() {
        let calls = &AtomicU32::new(0);
        let result = policy()
            .call(
                move |token| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async move {
                        token.cancelled().await;
                        Err::<(), _>(LlmError::Cancelled {
                            reason: "attempt cancelled".to_owned(),
                        })
                    }
                },
                None,
            )
            .await;

        assert!(matches!(result, Err(LlmError::Timeout { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), MAX_ATTEMPTS);
    }

    #[tokio::test(start_paused = true)]
    async fn abort_mid_flight_surfaces_reason() {
        let calls = &AtomicU32::new(0);
        let signal = AbortSignal::new();

        let aborter = signal.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            aborter.abort("shutting down");
        });

        let result = policy()
            .call(
                move |token| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async move { until_cancelled(&token, std::future::pending::<Result<(), LlmError>>()).await }
                },
                Some(&signal),
            )
            .await;

        let Err(LlmError::Cancelled { reason }) = result else {
            panic!("expected cancellation, got {result:?}");
        };
        assert_eq!(reason, "shutting down");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn abort_after_failure_skips_retry() {
        let calls = &AtomicU32::new(0);
        let signal = &AbortSignal::new();

        let result = policy()
            .call(
                move |_| async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    signal.abort("gave up");
                    Err::<(), _>(unavailable())
                },
                Some(signal),
            )
            .await;

        assert!(matches!(result, Err(LlmError::Cancelled { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn abort_releases_backoff_sleep() {
        let signal = AbortSignal::new();
        let aborter = signal.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            aborter.abort("stop");
        });

        let started = Instant::now();
        let result = Resilience::pause(Duration::from_secs(60), Some(&signal)).await;

        assert!(matches!(result, Err(LlmError::Cancelled { .. })));
        assert!(started.elapsed() < Duration::from_secs(60));
    }

    #[test]
    fn default_reason_when_cancelled_through_token() {
        let token = CancellationToken::new();
        let signal = AbortSignal::from(token.clone());
        token.cancel();
        assert!(signal.is_aborted());
        assert_eq!(signal.reason(), "aborted");
    }
}
