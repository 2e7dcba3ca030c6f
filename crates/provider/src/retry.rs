//! Retry combinator for mutating API calls
//!
//! Some mutations are rejected while another operation is in flight on
//! the same entity. [`retry_when`] re-issues such a call with backoff,
//! as long as the caller's predicate says the error is retryable and the
//! time and attempt budgets allow it.

use std::future::Future;
use std::time::Duration;

use cirrus_common::Error;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::backoff::Backoff;

/// Budget for retrying one mutating call
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    #[serde(with = "secs")]
    pub budget: Duration,
    pub max_attempts: Option<u32>,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            budget: Duration::from_secs(20 * 60),
            max_attempts: None,
            backoff: Backoff::default(),
        }
    }
}

impl RetryPolicy {
    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }
}

#[derive(Error, Debug)]
pub enum RetryError {
    #[error(transparent)]
    Permanent(Error),

    #[error("{what}: gave up after {attempts} attempts: {last}")]
    Exhausted {
        what: String,
        attempts: u32,
        #[source]
        last: Error,
    },

    #[error("{what} cancelled")]
    Cancelled { what: String },
}

impl RetryError {
    /// The API error that ended the retry loop, if any
    pub fn api_error(&self) -> Option<&Error> {
        match self {
            RetryError::Permanent(e) => Some(e),
            RetryError::Exhausted { last, .. } => Some(last),
            RetryError::Cancelled { .. } => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.api_error().is_some_and(Error::is_not_found)
    }
}

/// Retry `op` while `is_retryable` holds for the error it returns.
pub async fn retry_when<T, Op, Fut, R>(
    what: &str,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut op: Op,
    is_retryable: R,
) -> Result<T, RetryError>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T, Error>>,
    R: Fn(&Error) -> bool,
{
    let deadline = Instant::now() + policy.budget;
    let mut attempts: u32 = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(RetryError::Cancelled {
                what: what.to_string(),
            });
        }

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(RetryError::Cancelled { what: what.to_string() });
            }
            result = op() => result,
        };
        attempts += 1;

        let err = match result {
            Ok(value) => {
                debug!("{} succeeded after {} attempts", what, attempts);
                return Ok(value);
            }
            Err(e) if !is_retryable(&e) => return Err(RetryError::Permanent(e)),
            Err(e) => e,
        };

        let now = Instant::now();
        let out_of_attempts = policy.max_attempts.is_some_and(|max| attempts >= max);
        if out_of_attempts || now >= deadline {
            return Err(RetryError::Exhausted {
                what: what.to_string(),
                attempts,
                last: err,
            });
        }

        let delay = policy.backoff.next_delay(attempts - 1, deadline - now);
        warn!("{} failed (attempt {}), retrying in {:?}: {}", what, attempts, delay, err);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(RetryError::Cancelled { what: what.to_string() });
            }
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

/// Conflict errors whose message contains `needle`
pub fn conflict_containing(needle: &'static str) -> impl Fn(&Error) -> bool {
    move |e| e.is_conflict_containing(needle)
}

/// Validation errors whose message contains `needle`
pub fn validation_containing(needle: &'static str) -> impl Fn(&Error) -> bool {
    move |e| e.is_validation_containing(needle)
}

mod secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}
