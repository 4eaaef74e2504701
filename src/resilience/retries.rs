//! Retry logic.
//!
//! # Responsibilities
//! - Determine if a failed upstream call may be retried
//! - Bound the number of attempts and the delay between them
//!
//! # Design Decisions
//! - Off unless `retries.enabled`; a failed request is otherwise final
//! - Never retry non-idempotent methods (POST, PATCH)
//! - Only transport failures (connect errors, timeouts) are retried;
//!   any status the upstream returns is relayed as-is

use std::time::Duration;

use axum::http::Method;

use crate::config::RetryConfig;
use crate::error::ProxyError;
use crate::resilience::backoff::{calculate_backoff, max_backoff};

/// Whether a request with this method may be sent again after `error`.
pub fn is_retryable(method: &Method, error: &ProxyError) -> bool {
    method.is_idempotent() && error.is_transient()
}

/// Attempt budget for a single request.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay_ms: u64,
    max_delay_ms: u64,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: if config.enabled { config.max_attempts.max(1) } else { 1 },
            base_delay_ms: config.base_delay_ms,
            max_delay_ms: config.max_delay_ms,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Longest a request can spend upstream when every attempt runs for
    /// `per_attempt` and every backoff hits its jitter ceiling.
    pub fn worst_case_duration(&self, per_attempt: Duration) -> Duration {
        (1..self.max_attempts).fold(
            per_attempt.saturating_mul(self.max_attempts),
            |total, attempt| {
                total.saturating_add(max_backoff(attempt, self.base_delay_ms, self.max_delay_ms))
            },
        )
    }

    /// Delay before the next attempt, or `None` when the request must fail now.
    pub fn next_delay(&self, attempts: u32, method: &Method, error: &ProxyError) -> Option<Duration> {
        if attempts >= self.max_attempts || !is_retryable(method, error) {
            return None;
        }
        Some(calculate_backoff(attempts, self.base_delay_ms, self.max_delay_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timeout() -> ProxyError {
        ProxyError::UpstreamTimeout(Duration::from_secs(1))
    }

    #[test]
    fn test_disabled_means_single_attempt() {
        let policy = RetryPolicy::from_config(&RetryConfig::default());
        assert_eq!(policy.max_attempts(), 1);
        assert!(policy.next_delay(1, &Method::GET, &timeout()).is_none());
    }

    #[test]
    fn test_idempotent_only() {
        let config = RetryConfig {
            enabled: true,
            max_attempts: 3,
            base_delay_ms: 10,
            max_delay_ms: 100,
        };
        let policy = RetryPolicy::from_config(&config);

        assert!(policy.next_delay(1, &Method::GET, &timeout()).is_some());
        assert!(policy.next_delay(2, &Method::PUT, &timeout()).is_some());
        assert!(policy.next_delay(3, &Method::GET, &timeout()).is_none());
        assert!(policy.next_delay(1, &Method::POST, &timeout()).is_none());
        assert!(policy
            .next_delay(1, &Method::GET, &ProxyError::PayloadTooLarge(1))
            .is_none());
    }

    #[test]
    fn test_worst_case_covers_every_attempt_and_backoff() {
        let per_attempt = Duration::from_secs(30);
        let single = RetryPolicy::from_config(&RetryConfig::default());
        assert_eq!(single.worst_case_duration(per_attempt), per_attempt);

        let config = RetryConfig {
            enabled: true,
            ..RetryConfig::default()
        };
        let policy = RetryPolicy::from_config(&config);
        // 3 x 30s plus 110ms and 220ms of backoff.
        assert_eq!(
            policy.worst_case_duration(per_attempt),
            Duration::from_millis(90_330)
        );
    }
}
