//! Bounded polling of a remote check.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

/// Errors that may clear up on their own if the check is repeated.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

/// What a failed check does to the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Any error ends the loop.
    Abort,
    /// Transient errors count as one "not yet" attempt; others end the loop.
    RetryTransient,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
    pub on_error: ErrorPolicy,
}

impl PollPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
            on_error: ErrorPolicy::Abort,
        }
    }

    pub fn retry_transient(mut self) -> Self {
        self.on_error = ErrorPolicy::RetryTransient;
        self
    }

    /// Instance creation: every 5 seconds for 10 minutes.
    pub fn instance_active() -> Self {
        Self::new(Duration::from_secs(5), 120)
    }

    /// Installation: every 30 seconds for an hour. The status service
    /// is not listening until it has been installed, so refused
    /// connections are expected early on.
    pub fn service_ready() -> Self {
        Self::new(Duration::from_secs(30), 120).retry_transient()
    }

    pub fn identity() -> Self {
        Self::new(Duration::from_secs(30), 120).retry_transient()
    }

    /// Wall-clock time the loop may spend sleeping between attempts.
    pub fn budget(&self) -> Duration {
        self.interval * self.max_attempts.saturating_sub(1)
    }
}

#[derive(Debug)]
pub enum PollError<E> {
    /// `ready` never accepted a value.
    Timeout { attempts: u32, elapsed: Duration },
    /// The check failed in a way the policy doesn't retry.
    Check(E),
}

/// Call `check` until `ready` accepts its value.
///
/// The first call happens immediately; later calls are `policy.interval`
/// apart. After `policy.max_attempts` calls (at least one) without success
/// the loop fails with [`PollError::Timeout`]. `ready` sees every value
/// the check produces, in order.
pub async fn poll<T, E, F, Fut, P>(
    policy: &PollPolicy,
    mut check: F,
    mut ready: P,
) -> Result<T, PollError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: FnMut(&T) -> bool,
    E: Transient + Display,
{
    let started = Instant::now();
    let max_attempts = policy.max_attempts.max(1);
    let mut attempts = 0;

    loop {
        attempts += 1;

        match check().await {
            Ok(value) => {
                if ready(&value) {
                    debug!(attempts, "poll: ready");
                    return Ok(value);
                }
                debug!(attempt = attempts, max_attempts, "poll: not ready yet");
            }
            Err(e) if policy.on_error == ErrorPolicy::RetryTransient && e.is_transient() => {
                warn!(attempt = attempts, max_attempts, error = %e, "poll: transient failure");
            }
            Err(e) => return Err(PollError::Check(e)),
        }

        if attempts >= max_attempts {
            return Err(PollError::Timeout {
                attempts,
                elapsed: started.elapsed(),
            });
        }

        tokio::time::sleep(policy.interval).await;
    }
}
