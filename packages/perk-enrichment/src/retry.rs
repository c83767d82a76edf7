//! Retry policy for external calls.
//!
//! One policy type is shared by every call site (probe GETs, LLM chat,
//! web search, record store). It retries only errors that report
//! themselves [`Retryable`], on an exponential schedule, for at most
//! `max_attempts` attempts.

use backoff::future::retry_notify;
use backoff::Error as BackoffError;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use crate::error::Retryable;

/// Bounded exponential backoff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first. Default: 3.
    pub max_attempts: u32,

    /// Wait before the second attempt. Default: 1000.
    pub initial_interval_ms: u64,

    /// Default: 2.0.
    pub multiplier: f64,

    /// Cap on any single wait. Default: 8000.
    pub max_interval_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_interval_ms: 1000,
            multiplier: 2.0,
            max_interval_ms: 8000,
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// A single attempt, never retried.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_initial_interval_ms(mut self, ms: u64) -> Self {
        self.initial_interval_ms = ms;
        self
    }

    pub fn with_max_interval_ms(mut self, ms: u64) -> Self {
        self.max_interval_ms = ms;
        self
    }

    fn schedule(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(self.initial_interval_ms))
            .with_multiplier(self.multiplier)
            .with_max_interval(Duration::from_millis(self.max_interval_ms))
            .with_randomization_factor(0.0)
            .with_max_elapsed_time(None)
            .build()
    }

    /// Run `operation`, retrying retryable errors.
    ///
    /// The last error is returned once attempts are exhausted.
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0u32;

        retry_notify(
            self.schedule(),
            || {
                attempt += 1;
                let current = attempt;
                let call = operation();
                async move {
                    match call.await {
                        Ok(value) => Ok(value),
                        Err(e) if e.is_retryable() && current < max_attempts => {
                            Err(BackoffError::transient(e))
                        }
                        Err(e) => Err(BackoffError::permanent(e)),
                    }
                }
            },
            |err: E, wait: Duration| {
                tracing::warn!(
                    call = %label,
                    error = %err,
                    retry_in_ms = wait.as_millis() as u64,
                    "Retryable failure, backing off"
                );
            },
        )
        .await
    }
}
