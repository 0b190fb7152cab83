//! Retry policy with exponential backoff.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{error, warn};

/// Maximum number of attempts for the topic bootstrap
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Delay before the second attempt
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_secs(1);
/// Upper bound for any single delay
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(10);

/// How many times an operation is attempted and how long to wait in between.
///
/// `max_attempts` counts every attempt, including the first one. The delay
/// after the n-th failed attempt is `initial_backoff * multiplier^(n-1)`,
/// capped at `max_backoff`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after `failed_attempt` (1-based) before trying again.
    pub fn backoff_for(&self, failed_attempt: u32) -> Duration {
        let exponent = failed_attempt.saturating_sub(1);
        let factor = self.multiplier.max(1).saturating_pow(exponent);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// Run `operation` until it succeeds or the attempts are exhausted.
    ///
    /// The closure receives the 1-based attempt number. The error of the last
    /// attempt is returned when every attempt failed.
    pub async fn run<T, E, F, Fut>(&self, name: &str, mut operation: F) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) if attempt >= max_attempts => {
                    error!("{name} failed after {attempt} attempts: {err}");
                    return Err(err);
                }
                Err(err) => {
                    let delay = self.backoff_for(attempt);
                    warn!(
                        "{name} failed (attempt {}/{}), retrying in {:?}: {err}",
                        attempt, max_attempts, delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
