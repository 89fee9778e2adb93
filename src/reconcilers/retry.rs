// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Bounded fixed-delay retry for gateway calls.
//!
//! Only transient gateway errors (transport failures) are retried. Existence
//! outcomes and rejections are returned immediately so the caller can act on them.

use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

use crate::constants::{DEFAULT_BASE_CREATE_ATTEMPTS, DEFAULT_BASE_CREATE_RETRY_DELAY_SECS};
use crate::errors::GatewayError;

/// Retry policy: at most `max_attempts` calls, `delay` apart.
///
/// The delay is applied with `tokio::time::sleep`, so tests can drive it with
/// a paused Tokio clock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first (treated as at least 1)
    pub max_attempts: u32,
    /// Fixed delay between attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    /// Two attempts, five seconds apart.
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_BASE_CREATE_ATTEMPTS,
            delay: Duration::from_secs(DEFAULT_BASE_CREATE_RETRY_DELAY_SECS),
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// A policy with no delay between attempts.
    #[must_use]
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }
}

/// Run `operation`, retrying transient failures according to `policy`.
///
/// # Arguments
///
/// * `policy` - Attempt bound and delay
/// * `operation_name` - Human-readable name for logging (e.g., "create MtdBase")
/// * `operation` - Async function performing one attempt
///
/// # Errors
///
/// Returns the first non-transient error, or the last transient error once
/// all attempts are used.
pub async fn retry_transient<T, F, Fut>(
    policy: &RetryPolicy,
    operation_name: &str,
    mut operation: F,
) -> Result<T, GatewayError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GatewayError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let start_time = Instant::now();
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(
                        operation = operation_name,
                        attempt = attempt,
                        elapsed = ?start_time.elapsed(),
                        "Gateway call succeeded after retries"
                    );
                }
                return Ok(value);
            }
            Err(e) if !e.is_transient() => return Err(e),
            Err(e) if attempt >= max_attempts => {
                error!(
                    operation = operation_name,
                    attempt = attempt,
                    error = %e,
                    "Retries exhausted, giving up"
                );
                return Err(e);
            }
            Err(e) => {
                warn!(
                    operation = operation_name,
                    attempt = attempt,
                    retry_after = ?policy.delay,
                    error = %e,
                    "Transient gateway error, will retry"
                );
                tokio::time::sleep(policy.delay).await;
            }
        }
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod retry_tests;
