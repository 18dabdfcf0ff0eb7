use serde::Deserialize;
use std::future::Future;
use std::time::Duration;

use crate::services::provider::ProviderError;

/// Outcome of a single failed attempt, before the retry loop decides what to do
#[derive(Debug)]
pub enum AttemptError {
    /// Provider reported its request quota was exceeded
    Quota(String),
    /// Network error or non-2xx status
    Transport(String),
    /// Deterministic failure, returned as-is without retrying
    Fatal(ProviderError),
}

/// How the delay grows between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffStrategy {
    #[default]
    Fixed,
    Exponential,
}

/// Bounded retry policy shared by the geocoding and routing clients
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    pub backoff: BackoffStrategy,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration, backoff: BackoffStrategy) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
            backoff,
        }
    }

    /// Five attempts, 1s apart
    pub fn geocoding_default() -> Self {
        Self::new(5, Duration::from_secs(1), BackoffStrategy::Fixed)
    }

    /// Three attempts, 1s apart
    pub fn routing_default() -> Self {
        Self::new(3, Duration::from_secs(1), BackoffStrategy::Fixed)
    }

    /// Delay to wait after the given (1-based) failed attempt
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match self.backoff {
            BackoffStrategy::Fixed => self.delay,
            BackoffStrategy::Exponential => {
                let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
                self.delay.saturating_mul(factor)
            }
        }
    }

    /// Drive `op` until it succeeds, fails fatally, or attempts run out
    ///
    /// `op` receives the 1-based attempt number. Exhausting the attempts on a
    /// quota error yields [`ProviderError::RateLimited`]; on a transport error,
    /// [`ProviderError::Unavailable`]. No delay follows the final attempt.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, ProviderError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, AttemptError>>,
    {
        let mut attempt = 1;
        loop {
            let failure = match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(AttemptError::Fatal(err)) => return Err(err),
                Err(failure) => failure,
            };

            if attempt >= self.max_attempts {
                tracing::warn!(
                    "{} failed after {} attempts: {:?}",
                    operation,
                    attempt,
                    failure
                );
                return Err(match failure {
                    AttemptError::Quota(_) => ProviderError::RateLimited { attempts: attempt },
                    AttemptError::Transport(reason) => ProviderError::Unavailable {
                        attempts: attempt,
                        reason,
                    },
                    AttemptError::Fatal(err) => err,
                });
            }

            let delay = self.delay_after(attempt);
            tracing::warn!(
                "{} attempt {}/{} failed ({:?}), retrying in {:?}",
                operation,
                attempt,
                self.max_attempts,
                failure,
                delay
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::routing_default()
    }
}
