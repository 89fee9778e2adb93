// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `retry.rs`

#[cfg(test)]
mod tests {
    use super::super::{retry_transient, RetryPolicy};
    use crate::errors::GatewayError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Test that the default policy matches the base create-or-get bound
    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 2, "Two attempts by default");
        assert_eq!(policy.delay, Duration::from_secs(5), "Five second delay");
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let calls = AtomicU32::new(0);
        let result = retry_transient(&RetryPolicy::immediate(3), "op", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, GatewayError>(7)
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_non_transient_error_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_transient(&RetryPolicy::immediate(3), "op", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(GatewayError::rejected("createMtdBase", "INVALID_NAME"))
        })
        .await;

        assert!(matches!(result, Err(GatewayError::Rejected { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_transient_error_is_retried_until_bound() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_transient(&RetryPolicy::immediate(2), "op", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(GatewayError::transport("createMtdBase", "timeout"))
        })
        .await;

        assert!(result.unwrap_err().is_transient());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_delay_between_attempts() {
        let calls = AtomicU32::new(0);
        let start = tokio::time::Instant::now();
        let policy = RetryPolicy::new(2, Duration::from_secs(5));

        let result = retry_transient(&policy, "op", || async {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(GatewayError::transport("getMtdBase", "connection reset"))
            } else {
                Ok("base")
            }
        })
        .await;

        assert_eq!(result.unwrap(), "base");
        assert_eq!(start.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_zero_attempts_still_calls_once() {
        let calls = AtomicU32::new(0);
        let _ = retry_transient(&RetryPolicy::immediate(0), "op", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(GatewayError::transport("op", "down"))
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
