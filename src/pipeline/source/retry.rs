//! Bounded retry with exponential backoff for transient source failures.
//!
//! `delay = min(initial_delay_ms * 2^attempt, max_delay_ms) + random_jitter`.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Initial delay before the first retry (ms).
    pub initial_delay_ms: u64,
    /// Maximum delay cap (ms).
    pub max_delay_ms: u64,
    /// Retries after the first attempt; 0 disables retrying.
    pub max_retries: u32,
    /// Maximum random jitter added to each delay (ms).
    pub jitter_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay_ms: 500,
            max_delay_ms: 10_000,
            max_retries: 3,
            jitter_ms: 250,
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `attempt` (0-based), jitter excluded.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let ms = self.initial_delay_ms.saturating_mul(factor).min(self.max_delay_ms);
        Duration::from_millis(ms)
    }

    fn delay(&self, attempt: u32) -> Duration {
        let jitter = if self.jitter_ms > 0 {
            rand::thread_rng().gen_range(0..=self.jitter_ms)
        } else {
            0
        };
        self.base_delay(attempt) + Duration::from_millis(jitter)
    }
}

/// Run `op`, retrying while `is_transient` says the error may clear up.
/// Permanent errors and exhausted retries are returned as-is.
pub async fn retry_async<T, E, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    is_transient: impl Fn(&E) -> bool,
    mut op: F,
) -> Result<T, E>
where
    E: std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < policy.max_retries && is_transient(&e) => {
                let delay = policy.delay(attempt);
                tracing::warn!(
                    operation,
                    attempt = attempt + 1,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Transient source error, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Connection-level sqlx failures worth another attempt.
pub fn is_transient_sqlx(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::WorkerCrashed => true,
        // admin_shutdown, crash_shutdown, cannot_connect_now, serialization_failure, deadlock
        sqlx::Error::Database(db) => matches!(
            db.code().as_deref(),
            Some("57P01") | Some("57P02") | Some("57P03") | Some("40001") | Some("40P01")
        ),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            initial_delay_ms: 1,
            max_delay_ms: 2,
            max_retries,
            jitter_ms: 0,
        }
    }

    #[test]
    fn backoff_doubles_until_cap() {
        let policy = RetryPolicy {
            initial_delay_ms: 100,
            max_delay_ms: 1_000,
            max_retries: 10,
            jitter_ms: 0,
        };
        assert_eq!(policy.base_delay(0), Duration::from_millis(100));
        assert_eq!(policy.base_delay(1), Duration::from_millis(200));
        assert_eq!(policy.base_delay(3), Duration::from_millis(800));
        assert_eq!(policy.base_delay(4), Duration::from_millis(1_000));
        assert_eq!(policy.base_delay(200), Duration::from_millis(1_000));
    }

    #[test]
    fn default_policy_is_bounded() {
        let policy = RetryPolicy::default();
        assert!(policy.max_delay_ms > policy.initial_delay_ms);
        assert!(policy.max_retries > 0 && policy.max_retries <= 5);
    }

    #[tokio::test]
    async fn transient_errors_are_retried_until_success() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<u32, String> = retry_async(
            &fast_policy(3),
            "test",
            |e: &String| e == "transient",
            move || async move {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                if n < 2 { Err("transient".to_string()) } else { Ok(n) }
            },
        )
        .await;
        assert_eq!(result, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_errors_fail_immediately() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), String> = retry_async(
            &fast_policy(5),
            "test",
            |e: &String| e == "transient",
            move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err("password authentication failed".to_string())
            },
        )
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_are_bounded() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), String> = retry_async(
            &fast_policy(2),
            "test",
            |_: &String| true,
            move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err("transient".to_string())
            },
        )
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn sqlx_error_classification() {
        assert!(is_transient_sqlx(&sqlx::Error::PoolTimedOut));
        assert!(is_transient_sqlx(&sqlx::Error::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "reset"
        ))));
        assert!(!is_transient_sqlx(&sqlx::Error::RowNotFound));
        assert!(!is_transient_sqlx(&sqlx::Error::Configuration("bad url".into())));
    }
}
