//! Retry/backoff policy for catalog calls.
//!
//! One [`RetryPolicy`] wraps a single catalog call attempt and decides what to
//! do with each failure:
//!
//! - [`RateLimited`](ErrorKind::RateLimited): sleep for
//!   `min(base * 2^n, max)` where `n` counts *only* rate-limit failures, then
//!   try again. There is no separate rate-limit budget: waits simply plateau
//!   at the cap.
//! - [`Unauthorized`](ErrorKind::Unauthorized): run the credential refresh
//!   (shared with any concurrent refresh, see
//!   [`TokenSource`](crate::token::TokenSource)) and try again immediately.
//!   This does not advance the backoff exponent. If the refresh itself fails,
//!   that failure is returned.
//! - Anything else is returned straight away.
//!
//! Independently of the failure kind, the call is abandoned after
//! `max_attempts` attempts in total and the last error is returned.

use crate::error::{ErrorKind, Result};
use std::future::Future;
use std::time::Duration;

pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(60);
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(600);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    base_delay: Duration,
    max_delay: Duration,
    max_attempts: u32,
}
impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}
impl RetryPolicy {
    /// `max_attempts` is clamped to at least one attempt.
    pub fn new(base_delay: Duration, max_delay: Duration, max_attempts: u32) -> Self {
        Self {
            base_delay,
            max_delay,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Wait before retrying after the `rate_limited`-th consecutive rate-limit
    /// failure (zero-based).
    pub fn backoff(&self, rate_limited: u32) -> Duration {
        let factor = 1u32.checked_shl(rate_limited).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Run `attempt` until it succeeds or the policy gives up.
    ///
    /// `refresh` is invoked on [`Unauthorized`](ErrorKind::Unauthorized);
    /// pass a closure returning an error when the caller has no way to
    /// refresh credentials. A failed refresh is returned immediately.
    pub async fn run<T, A, AFut, R, RFut>(&self, label: &str, mut attempt: A, mut refresh: R) -> Result<T>
    where
        A: FnMut() -> AFut,
        AFut: Future<Output = Result<T>>,
        R: FnMut() -> RFut,
        RFut: Future<Output = Result<()>>,
    {
        let mut attempts = 0u32;
        let mut rate_limited = 0u32;
        loop {
            attempts += 1;
            let err = match attempt().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            let kind: &ErrorKind = &err;
            if attempts >= self.max_attempts {
                tracing::warn!(call = label, attempts, error = %kind, "Giving up on catalog call");
                return Err(err);
            }
            match kind {
                ErrorKind::RateLimited => {
                    let delay = self.backoff(rate_limited);
                    rate_limited += 1;
                    tracing::warn!(call = label, attempt = attempts, delay_secs = delay.as_secs(), "Catalog rate limit hit; backing off");
                    tokio::time::sleep(delay).await;
                },
                ErrorKind::Unauthorized => {
                    tracing::info!(call = label, attempt = attempts, "Catalog credentials rejected; refreshing");
                    refresh().await?;
                },
                _ => return Err(err),
            }
        }
    }
}
