//! Retry on Throttling
//!
//! Each query call runs through a small state machine:
//!
//! ```text
//! Pending → Sent ─┬─→ Succeeded
//!                 ├─→ Failed            (any error other than 429)
//!                 └─→ Retrying → Sent   (429, attempts left)
//! ```
//!
//! A 429 waits a random interval drawn uniformly from
//! `[min_backoff, max_backoff]` before the next attempt. The last attempt's
//! outcome is returned as-is. The random source is owned by the executor and
//! can be seeded, so backoff sequences are reproducible in tests.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use super::error::ClientResult;

/// Retry limits for throttled calls
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Lower bound of the randomized backoff
    pub min_backoff: Duration,
    /// Upper bound of the randomized backoff
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            min_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_millis(2000),
        }
    }
}

/// Runs operations under a [`RetryPolicy`] with jittered backoff
pub struct RetryExecutor {
    policy: RetryPolicy,
    rng: Mutex<StdRng>,
}

impl RetryExecutor {
    /// Executor with an entropy-seeded random source
    pub fn new(policy: RetryPolicy) -> Self {
        Self::with_rng(policy, StdRng::from_entropy())
    }

    /// Executor with a deterministic random source
    pub fn with_seed(policy: RetryPolicy, seed: u64) -> Self {
        Self::with_rng(policy, StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(policy: RetryPolicy, rng: StdRng) -> Self {
        Self {
            policy,
            rng: Mutex::new(rng),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Draw the next backoff interval
    pub fn next_backoff(&self) -> Duration {
        let min = self.policy.min_backoff.as_millis() as u64;
        let max = (self.policy.max_backoff.as_millis() as u64).max(min);
        let millis = match self.rng.lock() {
            Ok(mut rng) => rng.gen_range(min..=max),
            Err(poisoned) => poisoned.into_inner().gen_range(min..=max),
        };
        Duration::from_millis(millis)
    }

    /// Run `op`, retrying while it reports a rate-limited error
    pub async fn execute<T, F, Fut>(&self, mut op: F) -> ClientResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ClientResult<T>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match op().await {
                Err(e) if e.is_rate_limited() && attempt < max_attempts => {
                    let delay = self.next_backoff();
                    tracing::warn!(
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Rate limited, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                result => {
                    if let Err(e) = &result {
                        tracing::debug!(attempt, error = %e, "Query attempt failed");
                    }
                    return result;
                }
            }
        }
    }
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}
