//! Retry coordination with jittered exponential backoff.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use super::ApiError;
use crate::config::{BASE_DELAY_MS, MAX_ATTEMPTS, MAX_DELAY_MS, RATE_LIMIT_FLOOR_MS};

/// Tuning knobs for the retry loop.
#[derive(Debug, Clone)]
pub struct RetryOptions {
    /// Total call attempts, first try included.
    pub max_attempts: u32,
    /// First backoff delay; doubles per retry.
    pub base_delay: Duration,
    /// Backoff ceiling.
    pub max_delay: Duration,
    /// Minimum delay after a remote throttling signal.
    pub rate_limit_floor: Duration,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            base_delay: Duration::from_millis(BASE_DELAY_MS),
            max_delay: Duration::from_millis(MAX_DELAY_MS),
            rate_limit_floor: Duration::from_millis(RATE_LIMIT_FLOOR_MS),
        }
    }
}

/// Callback invoked before each retry sleep, with the error that caused
/// the retry, the upcoming attempt number (1-based) and the delay.
pub type RetryObserver = Arc<dyn Fn(&ApiError, u32, Duration) + Send + Sync>;

/// Drives one remote operation to completion or terminal failure.
pub struct RetryCoordinator {
    options: RetryOptions,
    observer: Option<RetryObserver>,
}

impl RetryCoordinator {
    /// Create a coordinator with the given options.
    pub fn new(options: RetryOptions) -> Self {
        Self {
            options,
            observer: None,
        }
    }

    /// Attach an observer notified before each retry sleep.
    pub fn with_observer(mut self, observer: RetryObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Run `op` until it succeeds, fails terminally, or the attempt
    /// budget runs out.
    ///
    /// A rejected credential triggers `refresh` exactly once per
    /// execution and does not consume an attempt; the second rejection
    /// after a refresh is terminal. When the refresh itself fails, the
    /// original credential error is re-raised, not the refresh error.
    pub async fn execute<T, Op, Fut, Refresh, RFut>(
        &self,
        label: &str,
        mut op: Op,
        refresh: Refresh,
    ) -> Result<T, ApiError>
    where
        Op: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
        Refresh: Fn() -> RFut,
        RFut: Future<Output = Result<(), ApiError>>,
    {
        let mut attempt: u32 = 0;
        let mut refreshed = false;

        loop {
            let error = match op().await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if error.is_credential() && !refreshed {
                warn!(operation = label, "Credential rejected, refreshing once");
                refreshed = true;
                if let Err(refresh_error) = refresh().await {
                    warn!(
                        operation = label,
                        error = %refresh_error,
                        "Token refresh failed, raising the original rejection"
                    );
                    return Err(error);
                }
                continue;
            }

            if !error.is_retryable() || attempt + 1 >= self.options.max_attempts {
                return Err(error);
            }

            let delay = self.backoff_delay(attempt, &error);
            attempt += 1;
            warn!(
                operation = label,
                attempt,
                max_attempts = self.options.max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Transient failure, retrying"
            );
            if let Some(observer) = &self.observer {
                observer(&error, attempt, delay);
            }
            tokio::time::sleep(delay).await;
        }
    }

    /// Delay before the retry following failed attempt `attempt`
    /// (0-based): exponential in the attempt number, plus up to 25%
    /// jitter, capped, then floored for throttling errors.
    fn backoff_delay(&self, attempt: u32, error: &ApiError) -> Duration {
        let base = self.options.base_delay.as_millis() as u64;
        let exponential = base.saturating_mul(1u64 << attempt.min(20));
        let jitter = if exponential > 0 {
            rand::thread_rng().gen_range(0..=exponential / 4)
        } else {
            0
        };
        let capped = Duration::from_millis(exponential.saturating_add(jitter))
            .min(self.options.max_delay);

        if matches!(error, ApiError::RateLimited { .. }) {
            capped.max(self.options.rate_limit_floor)
        } else {
            capped
        }
    }
}
