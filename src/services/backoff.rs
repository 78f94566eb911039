//! Bounded exponential backoff for credential derivation retries.

use std::time::Duration;

/// Baseline delay for the first derivation retry.
pub const DERIVE_BACKOFF_BASELINE: Duration = Duration::from_secs(5);

/// Upper bound on a single derivation retry delay.
pub const DERIVE_BACKOFF_LIMIT: Duration = Duration::from_secs(3 * 60);

/// Retry schedule for token derivation.
///
/// The delay for attempt `n` (zero-based) is `baseline * 2^(2n)` clamped to
/// `limit`; each retry quadruples the wait until the limit takes over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffPolicy {
    baseline: Duration,
    limit: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(DERIVE_BACKOFF_BASELINE, DERIVE_BACKOFF_LIMIT)
    }
}

impl BackoffPolicy {
    /// Create a policy with a custom baseline and limit.
    pub fn new(baseline: Duration, limit: Duration) -> Self {
        assert!(
            limit >= baseline,
            "backoff limit must be >= backoff baseline"
        );
        Self { baseline, limit }
    }

    /// Delay before retry `attempt` (zero-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        // The shift saturates well past the point where the limit clamps.
        let exp = (2 * u64::from(attempt)).min(63) as u32;
        let factor = 1u128 << exp;
        let millis = self
            .baseline
            .as_millis()
            .saturating_mul(factor)
            .min(self.limit.as_millis());

        Duration::from_millis(millis as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_attempt_is_baseline() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.delay(0), Duration::from_secs(5));
    }

    #[test]
    fn test_each_retry_quadruples() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.delay(1), Duration::from_secs(20));
        assert_eq!(policy.delay(2), Duration::from_secs(80));
    }

    #[test]
    fn test_limit_clamps_schedule() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.delay(3), Duration::from_secs(180));
        assert_eq!(policy.delay(10), Duration::from_secs(180));
        assert_eq!(policy.delay(u32::MAX), Duration::from_secs(180));
    }

    #[test]
    fn test_custom_schedule() {
        let policy = BackoffPolicy::new(Duration::from_millis(10), Duration::from_millis(100));
        assert_eq!(policy.delay(0), Duration::from_millis(10));
        assert_eq!(policy.delay(1), Duration::from_millis(40));
        assert_eq!(policy.delay(2), Duration::from_millis(100));
    }

    #[test]
    #[should_panic(expected = "backoff limit")]
    fn test_limit_below_baseline_panics() {
        BackoffPolicy::new(Duration::from_secs(10), Duration::from_secs(1));
    }
}
