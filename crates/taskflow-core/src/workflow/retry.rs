//! Retry decisions and backoff for task attempts.
//!
//! Retry logic is stateless: `RetryHandler` looks at the policy, the attempt
//! number and the error, and returns what to do next. The backoff delay is a
//! pure function of the retry number, and the actual waiting goes through a
//! [`Sleeper`] so tests can observe delays without sleeping.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use taskflow_types::error::TaskError;
use taskflow_types::task::RetryPolicy;

/// Largest exponent applied by exponential backoff (delay * 2^16).
const MAX_BACKOFF_EXPONENT: u32 = 16;

// ---------------------------------------------------------------------------
// RetryDecision
// ---------------------------------------------------------------------------

/// What to do after a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait `delay`, then run retry number `retry` (1-based).
    Retry { retry: u32, delay: Duration },
    /// Record the failure as final.
    GiveUp,
}

// ---------------------------------------------------------------------------
// RetryHandler
// ---------------------------------------------------------------------------

/// Stateless retry handler for task failures.
pub struct RetryHandler;

impl RetryHandler {
    /// Whether another attempt is allowed.
    ///
    /// `attempt` is 0-based: the first execution is attempt 0, so with
    /// `max_retries = N` attempts `0..N` may be followed by a retry.
    pub fn should_retry(policy: &RetryPolicy, attempt: u32, error: &TaskError) -> bool {
        error.is_retryable() && attempt < policy.max_retries
    }

    /// Delay before retry number `retry` (1-based).
    ///
    /// Exponential: `retry_delay * 2^(retry - 1)`. Fixed: `retry_delay`.
    pub fn backoff_delay(policy: &RetryPolicy, retry: u32) -> Duration {
        let base = policy.retry_delay();
        if !policy.exponential_backoff {
            return base;
        }
        let exponent = retry.saturating_sub(1).min(MAX_BACKOFF_EXPONENT);
        base.saturating_mul(1u32 << exponent)
    }

    /// Decide the next step after attempt `attempt` (0-based) failed.
    pub fn decide(policy: &RetryPolicy, attempt: u32, error: &TaskError) -> RetryDecision {
        if Self::should_retry(policy, attempt, error) {
            let retry = attempt + 1;
            RetryDecision::Retry {
                retry,
                delay: Self::backoff_delay(policy, retry),
            }
        } else {
            RetryDecision::GiveUp
        }
    }
}

// ---------------------------------------------------------------------------
// Sleeper
// ---------------------------------------------------------------------------

/// Waits out backoff delays. Injected into the executor.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + 'static>>;
}

/// Real sleeping on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + 'static>> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Records requested delays and returns immediately.
#[derive(Debug, Clone, Default)]
pub struct RecordingSleeper {
    delays: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays requested so far, in request order.
    pub fn delays(&self) -> Vec<Duration> {
        self.delays
            .lock()
            .map(|d| d.clone())
            .unwrap_or_else(|e| e.into_inner().clone())
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + 'static>> {
        match self.delays.lock() {
            Ok(mut delays) => delays.push(duration),
            Err(poisoned) => poisoned.into_inner().push(duration),
        }
        Box::pin(std::future::ready(()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
