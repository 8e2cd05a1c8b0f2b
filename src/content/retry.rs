// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bounded retry for gateway fetches.
//!
//! Only rate-limit responses are retried. Not-found and other permanent
//! failures end the fetch immediately.

use std::future::Future;
use std::time::Duration;

use super::{ContentError, ContentResult};

/// Default number of fetch attempts.
pub const DEFAULT_FETCH_ATTEMPTS: u32 = 3;

/// Default fixed delay between rate-limited attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Retry policy for content fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Always at least 1.
    pub max_attempts: u32,
    /// Fixed delay after a rate-limited attempt.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_FETCH_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

/// Outcome of a single fetch attempt.
#[derive(Debug)]
pub enum AttemptError {
    /// Transient: the source asked us to slow down (HTTP 429).
    RateLimited,
    /// Permanent: the address is unknown to the source.
    NotFound,
    /// Permanent: any other failure.
    Failed(String),
}

/// Run `attempt` until it succeeds, fails permanently, or the policy is exhausted.
pub async fn fetch_with_retry<F, Fut>(
    policy: RetryPolicy,
    cid: &str,
    mut attempt: F,
) -> ContentResult<Vec<u8>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Vec<u8>, AttemptError>>,
{
    let max_attempts = policy.max_attempts.max(1);

    for n in 1..=max_attempts {
        match attempt(n).await {
            Ok(bytes) => return Ok(bytes),
            Err(AttemptError::RateLimited) => {
                tracing::warn!(cid = %cid, attempt = n, max_attempts, "Content fetch rate limited");
                if n < max_attempts {
                    tokio::time::sleep(policy.delay).await;
                }
            }
            Err(AttemptError::NotFound) => return Err(ContentError::NotFound(cid.to_string())),
            Err(AttemptError::Failed(reason)) => {
                return Err(ContentError::FetchFailed {
                    cid: cid.to_string(),
                    reason,
                })
            }
        }
    }

    Err(ContentError::FetchFailed {
        cid: cid.to_string(),
        reason: format!("rate limited on all {max_attempts} attempts"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::ZERO)
    }

    #[tokio::test]
    async fn always_rate_limited_gives_up_after_three_attempts() {
        let calls = AtomicU32::new(0);
        let result = fetch_with_retry(fast_policy(), "bafy123", |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(AttemptError::RateLimited) }
        })
        .await;

        assert!(matches!(result, Err(ContentError::FetchFailed { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn not_found_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result = fetch_with_retry(fast_policy(), "bafy123", |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(AttemptError::NotFound) }
        })
        .await;

        assert!(matches!(result, Err(ContentError::NotFound(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn permanent_failure_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result = fetch_with_retry(fast_policy(), "bafy123", |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(AttemptError::Failed("HTTP 500".to_string())) }
        })
        .await;

        assert!(matches!(result, Err(ContentError::FetchFailed { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn recovers_after_rate_limit() {
        let result = fetch_with_retry(fast_policy(), "bafy123", |n| async move {
            if n < 3 {
                Err(AttemptError::RateLimited)
            } else {
                Ok(vec![1, 2, 3])
            }
        })
        .await;

        assert_eq!(result.unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn zero_attempts_is_clamped() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }
}
