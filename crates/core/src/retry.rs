// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded retry policy shared by the allocator and the flush scheduler
//!
//! Retries are bounded by attempt count, never by wall-clock time, so the
//! worst-case latency of a call is `max_attempts` store attempts plus the sum
//! of the backoff delays between them.

use crate::clock::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Pause schedule between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backoff {
    /// Same delay after every failed attempt
    Fixed(#[serde(with = "humantime_serde")] Duration),
    /// `initial * factor^(attempt - 1)`, capped at `max`
    Exponential {
        #[serde(with = "humantime_serde")]
        initial: Duration,
        factor: u32,
        #[serde(with = "humantime_serde")]
        max: Duration,
    },
}

impl Backoff {
    /// Delay to wait after the `attempt`-th failure (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match *self {
            Backoff::Fixed(delay) => delay,
            Backoff::Exponential {
                initial,
                factor,
                max,
            } => {
                let exponent = attempt.saturating_sub(1);
                let multiplier = factor.max(1).checked_pow(exponent).unwrap_or(u32::MAX);
                initial
                    .checked_mul(multiplier)
                    .map_or(max, |delay| delay.min(max))
            }
        }
    }
}

/// How many times to try an operation and how long to pause in between
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    /// Purchase policy: three attempts, 100ms apart
    pub fn allocator() -> Self {
        Self::new(3, Backoff::Fixed(Duration::from_millis(100)))
    }

    /// A single attempt, no retries
    pub fn once() -> Self {
        Self::new(1, Backoff::Fixed(Duration::ZERO))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::allocator()
    }
}

/// Why a retried operation gave up
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RetryError<E: fmt::Debug + fmt::Display> {
    /// The error was not retryable; no further attempts were made
    #[error("failed on attempt {attempts}: {error}")]
    Fatal { attempts: u32, error: E },
    /// Every attempt failed with a retryable error
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: E },
}

impl<E: fmt::Debug + fmt::Display> RetryError<E> {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Fatal { attempts, .. } | RetryError::Exhausted { attempts, .. } => {
                *attempts
            }
        }
    }

    pub fn into_inner(self) -> E {
        match self {
            RetryError::Fatal { error, .. } => error,
            RetryError::Exhausted { last, .. } => last,
        }
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// policy runs out of attempts.
///
/// `op` receives the 1-based attempt number. The clock sleeps only between
/// attempts, never after the last one.
pub async fn retry<C, T, E, F, Fut, R>(
    policy: &RetryPolicy,
    clock: &C,
    is_retryable: R,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    C: Clock,
    E: fmt::Debug + fmt::Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) if !is_retryable(&error) => {
                return Err(RetryError::Fatal {
                    attempts: attempt,
                    error,
                })
            }
            Err(last) if attempt >= max_attempts => {
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last,
                })
            }
            Err(error) => {
                let delay = policy.backoff.delay_after(attempt);
                tracing::debug!(
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "retrying"
                );
                clock.sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
