//! Bounded retry for contended commits.

use std::time::Duration;

use tracing::warn;

use crate::error::EngineError;

/// Backoff strategy between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackoffStrategy {
    /// Same delay every time.
    Fixed,
    /// `base * 2^(attempt - 1)`, capped at `max_delay`.
    #[default]
    Exponential,
}

/// How many times a contended operation is re-run, and how long to wait
/// between runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first (at least 1).
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub strategy: BackoffStrategy,
}

/// Backoff never grows past this multiple of the base delay.
pub const MAX_BACKOFF_FACTOR: u32 = 64;

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::exponential(5, Duration::from_millis(2))
    }
}

impl RetryPolicy {
    /// Fail on the first conflict.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: delay,
            max_delay: delay,
            strategy: BackoffStrategy::Fixed,
        }
    }

    pub fn exponential(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay: base_delay * MAX_BACKOFF_FACTOR,
            strategy: BackoffStrategy::Exponential,
        }
    }

    /// Delay before re-running after the `attempt`-th failure (1-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        match self.strategy {
            BackoffStrategy::Fixed => self.base_delay,
            BackoffStrategy::Exponential => {
                let factor = 1u32.checked_shl(attempt - 1).unwrap_or(u32::MAX);
                self.base_delay.saturating_mul(factor).min(self.max_delay)
            }
        }
    }

    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempt budget runs out. `op` receives the 1-indexed attempt number.
    ///
    /// A `ConcurrentUpdate` that outlives the budget is reported with the
    /// number of attempts made.
    ///
    /// Backoff sleeps the calling thread, so async callers must run this on
    /// the blocking pool.
    pub fn run<T, F>(&self, operation: &'static str, mut op: F) -> Result<T, EngineError>
    where
        F: FnMut(u32) -> Result<T, EngineError>,
    {
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && self.should_retry(attempt) => {
                    warn!(operation, attempt, error = %err, "contention; retrying");
                    std::thread::sleep(self.delay_for_attempt(attempt));
                    attempt += 1;
                }
                Err(EngineError::ConcurrentUpdate(msg)) => {
                    warn!(operation, attempts = attempt, "retry budget exhausted");
                    return Err(EngineError::ConcurrentUpdate(format!(
                        "{operation} gave up after {attempt} attempt(s): {msg}"
                    )));
                }
                Err(err) => return Err(err),
            }
        }
    }
}
