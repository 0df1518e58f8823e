//! Bounded retry for network-dependent operations.
//!
//! Only metadata refreshes go through here. Applying updates is never
//! retried: a partially applied install is not known to be idempotent.

use crate::error::{Error, Result};
use crate::types::RetryConfig;
use std::thread;
use std::time::Duration;

/// Callback trait for retry progress notifications.
pub trait RetryCallback {
    /// Called before waiting for the next attempt.
    ///
    /// # Arguments
    /// * `attempt` - Attempt that just failed (1-indexed)
    /// * `max_attempts` - Maximum number of attempts
    /// * `error` - The error that triggered the retry
    /// * `delay` - Time until the next attempt
    fn on_retry(&self, attempt: u32, max_attempts: u32, error: &Error, delay: Duration);
}

/// No-op callback that does nothing.
pub struct NoCallback;

impl RetryCallback for NoCallback {
    fn on_retry(&self, _attempt: u32, _max_attempts: u32, _error: &Error, _delay: Duration) {}
}

/// Waits between attempts.
pub trait Sleeper {
    /// Block for `duration`.
    fn sleep(&self, duration: Duration);
}

/// Sleeper backed by [`thread::sleep`].
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Execute an operation with retry logic.
///
/// The operation runs up to `config.max_attempts` times. Between attempts the
/// callback is notified and the thread sleeps; there is no sleep after the
/// final attempt.
///
/// # Returns
/// The first successful result, or [`Error::ExhaustedRetries`] wrapping the
/// error of the last attempt.
pub fn with_retry<T, F>(
    config: &RetryConfig,
    callback: Option<&dyn RetryCallback>,
    operation: F,
) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    with_retry_using(config, callback, &ThreadSleeper, operation)
}

/// Same as [`with_retry`] with an explicit sleep primitive.
pub fn with_retry_using<T, F>(
    config: &RetryConfig,
    callback: Option<&dyn RetryCallback>,
    sleeper: &dyn Sleeper,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        let error = match operation() {
            Ok(result) => return Ok(result),
            Err(e) => e,
        };

        if attempt >= max_attempts {
            return Err(Error::ExhaustedRetries {
                attempts: attempt,
                source: Box::new(error),
            });
        }

        let delay = config.delay_for_attempt(attempt - 1);
        if let Some(cb) = callback {
            cb.on_retry(attempt, max_attempts, &error, delay);
        }
        sleeper.sleep(delay);
    }
}
