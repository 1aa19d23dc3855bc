//! Bounded retry for filesystem operations that can hit a locked file.

use std::io;
use std::thread;
use std::time::Duration;

use thiserror::Error;

use crate::config::WorkerSettings;

/// Retry policy: fixed attempt count, delay growing by `backoff` each time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
    pub backoff: f64,
}

/// All attempts of a retried operation failed.
#[derive(Error, Debug)]
#[error("{operation} failed after {attempts} attempt(s): {source}")]
pub struct RetryError {
    pub operation: String,
    pub attempts: u32,
    #[source]
    pub source: io::Error,
}

impl RetryPolicy {
    pub fn from_settings(settings: &WorkerSettings) -> Self {
        Self {
            attempts: settings.retry_attempts.max(1),
            delay: Duration::from_millis(settings.retry_delay_ms),
            backoff: settings.retry_backoff.max(1.0),
        }
    }

    /// Single attempt, no waiting.
    pub fn once() -> Self {
        Self {
            attempts: 1,
            delay: Duration::ZERO,
            backoff: 1.0,
        }
    }

    /// Delay before attempt `n + 1` (zero-based `n`).
    pub fn delay_after(&self, n: u32) -> Duration {
        self.delay.mul_f64(self.backoff.powi(n as i32))
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempts run out.
    pub fn run<T, F, R>(&self, operation: &str, mut op: F, retryable: R) -> Result<T, RetryError>
    where
        F: FnMut() -> io::Result<T>,
        R: Fn(&io::Error) -> bool,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 0;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) => {
                    attempt += 1;
                    if attempt >= attempts || !retryable(&e) {
                        return Err(RetryError {
                            operation: operation.to_string(),
                            attempts: attempt,
                            source: e,
                        });
                    }
                    let wait = self.delay_after(attempt - 1);
                    tracing::debug!(
                        "{} failed (attempt {}/{}): {}; retrying in {:?}",
                        operation,
                        attempt,
                        attempts,
                        e,
                        wait
                    );
                    thread::sleep(wait);
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&WorkerSettings::default())
    }
}

/// Errors worth retrying. A missing file will not come back.
pub fn is_transient(e: &io::Error) -> bool {
    e.kind() != io::ErrorKind::NotFound
}
