//! Convergence waiter
//!
//! Blocks a CRUD handler until a remote resource settles after a
//! mutating call. Each poll is classified into [`Phase::Pending`],
//! [`Phase::Target`] or [`Phase::Unexpected`]; pending observations are
//! followed by a backoff delay, everything else ends the wait.
//!
//! ```text
//!   poll ──err (not NotFound)──────────────▶ Poll error
//!     │
//!     ├─ None ── Gone::Success ────────────▶ Ok(None)
//!     │      └── Gone::NotFound ───────────▶ NotFound
//!     ├─ Target ───────────────────────────▶ Ok(Some(entity))
//!     ├─ Unexpected ───────────────────────▶ UnexpectedState
//!     └─ Pending ── deadline passed ───────▶ Timeout
//!               └── sleep(backoff) ─▶ poll
//! ```
//!
//! The deadline also bounds each poll call: one still in flight when it
//! passes ends the wait with a timeout.
//!
//! A wait never retries a failed poll and never issues a mutation.
//! Time is read from `tokio::time`, so a paused runtime makes every
//! schedule deterministic.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use cirrus_common::Error;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backoff::Backoff;

/// Classification of one observed status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// The remote operation is still in progress.
    Pending,
    /// The remote operation completed successfully.
    Target,
    /// Neither pending nor target; the wait fails.
    Unexpected,
}

/// What a missing entity means for this wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gone {
    /// Disappearance completes the wait (delete waits).
    Success,
    /// Disappearance is a failure.
    NotFound,
}

/// An entity that reports a typed lifecycle status
pub trait Observed {
    type Status: fmt::Display;

    fn status(&self) -> Self::Status;
}

/// Configuration for a single wait. Built fresh per CRUD call.
#[derive(Clone)]
pub struct ConvergenceSpec<S> {
    resource: String,
    classify: fn(&S) -> Phase,
    gone: Gone,
    timeout: Duration,
    backoff: Backoff,
}

impl<S> ConvergenceSpec<S> {
    pub fn new(resource: impl Into<String>, classify: fn(&S) -> Phase) -> Self {
        Self {
            resource: resource.into(),
            classify,
            gone: Gone::NotFound,
            timeout: Duration::from_secs(20 * 60),
            backoff: Backoff::default(),
        }
    }

    /// Treat disappearance of the entity as success
    pub fn until_gone(mut self) -> Self {
        self.gone = Gone::Success;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn classify(&self, status: &S) -> Phase {
        (self.classify)(status)
    }
}

impl<S> fmt::Debug for ConvergenceSpec<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConvergenceSpec")
            .field("resource", &self.resource)
            .field("gone", &self.gone)
            .field("timeout", &self.timeout)
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}

/// Terminal wait failures
#[derive(Error, Debug)]
pub enum WaitError {
    #[error("polling {resource}: {source}")]
    Poll {
        resource: String,
        #[source]
        source: Error,
    },

    #[error("{resource} not found")]
    NotFound { resource: String },

    #[error("{resource} reached unexpected state {observed}")]
    UnexpectedState { resource: String, observed: String },

    #[error("timeout while waiting for {resource} after {timeout:?} (last state: {})", last_status.as_deref().unwrap_or("none"))]
    Timeout {
        resource: String,
        timeout: Duration,
        last_status: Option<String>,
    },

    #[error("wait for {resource} cancelled")]
    Cancelled { resource: String },
}

/// A failed wait together with the last entity it observed
#[derive(Debug)]
pub struct WaitFailure<T> {
    pub error: WaitError,
    pub last: Option<T>,
}

impl<T> WaitFailure<T> {
    fn new(error: WaitError, last: Option<T>) -> Self {
        Self { error, last }
    }
}

impl<T> From<WaitFailure<T>> for WaitError {
    fn from(failure: WaitFailure<T>) -> Self {
        failure.error
    }
}

/// Poll until `spec` is satisfied. Gives up at the deadline or once `cancel` fires.
///
/// `poll` must be a read-only call. An [`Error::NotFound`] result is
/// treated the same as `Ok(None)`.
pub async fn wait<T, P, Fut>(
    spec: &ConvergenceSpec<T::Status>,
    cancel: &CancellationToken,
    mut poll: P,
) -> Result<Option<T>, WaitFailure<T>>
where
    T: Observed,
    P: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, Error>>,
{
    let started = Instant::now();
    let deadline = started + spec.timeout;
    let resource = spec.resource.clone();
    let mut last: Option<T> = None;
    let mut attempt: u32 = 0;

    info!("Waiting for {} (timeout {:?})", resource, spec.timeout);

    loop {
        if cancel.is_cancelled() {
            warn!("Wait for {} cancelled", resource);
            return Err(WaitFailure::new(WaitError::Cancelled { resource }, last));
        }

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("Wait for {} cancelled", resource);
                return Err(WaitFailure::new(WaitError::Cancelled { resource }, last));
            }
            outcome = poll() => outcome,
            // A hung poll must not outlive the deadline
            _ = tokio::time::sleep_until(deadline) => {
                warn!("Timed out waiting for {} while a poll was in flight", resource);
                let last_status = last.as_ref().map(|e| e.status().to_string());
                return Err(WaitFailure::new(
                    WaitError::Timeout {
                        resource,
                        timeout: spec.timeout,
                        last_status,
                    },
                    last,
                ));
            }
        };
        attempt += 1;

        let entity = match outcome {
            Ok(entity) => entity,
            Err(e) if e.is_not_found() => None,
            Err(e) => {
                return Err(WaitFailure::new(
                    WaitError::Poll {
                        resource,
                        source: e,
                    },
                    last,
                ));
            }
        };

        let Some(entity) = entity else {
            return match spec.gone {
                Gone::Success => {
                    info!("{} is gone after {} polls", resource, attempt);
                    Ok(None)
                }
                Gone::NotFound => Err(WaitFailure::new(WaitError::NotFound { resource }, last)),
            };
        };

        let status = entity.status();
        match spec.classify(&status) {
            Phase::Target => {
                info!("{} reached {} after {} polls", resource, status, attempt);
                return Ok(Some(entity));
            }
            Phase::Unexpected => {
                warn!("{} reached unexpected state {}", resource, status);
                return Err(WaitFailure::new(
                    WaitError::UnexpectedState {
                        resource,
                        observed: status.to_string(),
                    },
                    Some(entity),
                ));
            }
            Phase::Pending => {
                debug!("{} still {} (poll {})", resource, status, attempt);
            }
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(WaitFailure::new(
                WaitError::Timeout {
                    resource,
                    timeout: spec.timeout,
                    last_status: Some(status.to_string()),
                },
                Some(entity),
            ));
        }
        last = Some(entity);

        let delay = spec.backoff.next_delay(attempt - 1, deadline - now);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("Wait for {} cancelled", resource);
                return Err(WaitFailure::new(WaitError::Cancelled { resource }, last));
            }
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
