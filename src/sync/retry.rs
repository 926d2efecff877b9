//! Bounded retry with exponential backoff.
//!
//! One policy serves both retry paths: backend saves/imports and offline
//! queue replay. Only errors reporting [`DiagflowError::is_retryable`] are
//! attempted again.

use std::{future::Future, time::Duration};

use tracing::warn;

use crate::{DiagflowError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_backoff: Duration,
    multiplier: f64,
    max_backoff: Duration,
    jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
            multiplier: 2.0,
            max_backoff: Duration::from_secs(30),
            jitter: false,
        }
    }
}

impl RetryPolicy {
    /// A policy making at most `max_attempts` calls (at least one).
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Default::default()
        }
    }

    /// A single attempt, no waiting.
    pub fn no_retry() -> Self {
        Self::new(1)
    }

    pub fn initial_backoff(
        mut self,
        backoff: Duration,
    ) -> Self {
        self.initial_backoff = backoff;
        self
    }

    pub fn multiplier(
        mut self,
        multiplier: f64,
    ) -> Self {
        self.multiplier = multiplier.max(1.0);
        self
    }

    pub fn max_backoff(
        mut self,
        backoff: Duration,
    ) -> Self {
        self.max_backoff = backoff;
        self
    }

    pub fn jitter(
        mut self,
        jitter: bool,
    ) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay to wait after the failed attempt number `attempt` (1-based).
    pub fn delay_for(
        &self,
        attempt: u32,
    ) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let base = self.initial_backoff.as_secs_f64() * self.multiplier.powi(exponent);
        let capped = base.min(self.max_backoff.as_secs_f64());
        let delay = if self.jitter {
            capped + rand::random::<f64>() * capped * 0.1
        } else {
            capped
        };
        Duration::from_secs_f64(delay)
    }

    /// Runs `op` until it succeeds, fails with a non-retryable error, or the attempt budget is spent.
    ///
    /// `op` receives the 1-based attempt number. The last error is returned on exhaustion.
    pub async fn run<T, F, Fut>(
        &self,
        label: &str,
        mut op: F,
    ) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    let delay = self.delay_for(attempt);
                    warn!("{} failed (attempt {}/{}), retrying in {:?}: {}", label, attempt, self.max_attempts, delay, e);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(exhausted(e, attempt)),
            }
        }
    }
}

fn exhausted(
    error: DiagflowError,
    attempts: u32,
) -> DiagflowError {
    if attempts > 1 {
        warn!("giving up after {} attempts: {}", attempts, error);
    }
    error
}
