//! # Backoff policy for reconnect attempts.
//!
//! [`BackoffPolicy`] controls how reconnect delays grow across consecutive
//! failures. The delay for attempt `n` (0-indexed) is `first × factor^n`,
//! clamped to `max`, then jitter is applied, then the result is clamped up to
//! `floor`. The base delay depends only on the attempt number, so jitter
//! output never feeds back into later calculations.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use meetvisor::{BackoffPolicy, JitterPolicy};
//!
//! let backoff = BackoffPolicy {
//!     first: Duration::from_millis(200),
//!     max: Duration::from_secs(10),
//!     floor: Duration::from_millis(100),
//!     factor: 2.0,
//!     jitter: JitterPolicy::None,
//! };
//!
//! assert_eq!(backoff.next(0), Duration::from_millis(200));
//! assert_eq!(backoff.next(1), Duration::from_millis(400));
//! // 200ms × 2^10 exceeds max=10s → capped
//! assert_eq!(backoff.next(10), Duration::from_secs(10));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Reconnect backoff policy.
#[derive(Clone, Copy, Debug)]
pub struct BackoffPolicy {
    /// Base delay before the first retry.
    pub first: Duration,
    /// Maximum delay cap.
    pub max: Duration,
    /// Lower bound applied after jitter; no computed delay ever falls below
    /// this value.
    pub floor: Duration,
    /// Multiplicative growth factor (`>= 1.0` recommended).
    pub factor: f64,
    /// Jitter policy applied to the clamped base delay.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// Returns a policy with `first = 200ms`, `factor = 2.0`, `max = 10s`,
    /// `floor = 100ms` and full jitter.
    fn default() -> Self {
        Self {
            first: Duration::from_millis(200),
            max: Duration::from_secs(10),
            floor: Duration::from_millis(100),
            factor: 2.0,
            jitter: JitterPolicy::Full,
        }
    }
}

impl BackoffPolicy {
    /// Computes the delay for the given attempt number (0-indexed).
    ///
    /// The base is `first × factor^attempt` clamped to [`BackoffPolicy::max`];
    /// jitter applies to the clamped base and the result never falls below
    /// [`BackoffPolicy::floor`].
    pub fn next(&self, attempt: u32) -> Duration {
        let max_secs = self.max.as_secs_f64();
        let exp = attempt.min(i32::MAX as u32) as i32;
        let unclamped_secs = self.first.as_secs_f64() * self.factor.powi(exp);

        let base =
            if !unclamped_secs.is_finite() || unclamped_secs < 0.0 || unclamped_secs > max_secs {
                self.max
            } else {
                Duration::from_secs_f64(unclamped_secs)
            };

        self.jitter.apply(base).max(self.floor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(first_ms: u64, max: Duration, factor: f64) -> BackoffPolicy {
        BackoffPolicy {
            first: Duration::from_millis(first_ms),
            max,
            floor: Duration::ZERO,
            factor,
            jitter: JitterPolicy::None,
        }
    }

    #[test]
    fn test_attempt_zero_returns_first() {
        let policy = plain(100, Duration::from_secs(30), 2.0);
        assert_eq!(policy.next(0), Duration::from_millis(100));
    }

    #[test]
    fn test_exponential_growth_no_jitter() {
        let policy = plain(100, Duration::from_secs(30), 2.0);
        assert_eq!(policy.next(0), Duration::from_millis(100));
        assert_eq!(policy.next(1), Duration::from_millis(200));
        assert_eq!(policy.next(2), Duration::from_millis(400));
        assert_eq!(policy.next(3), Duration::from_millis(800));
    }

    #[test]
    fn test_clamped_to_max() {
        let policy = plain(100, Duration::from_secs(1), 2.0);
        assert_eq!(policy.next(10), Duration::from_secs(1));
    }

    #[test]
    fn test_first_exceeds_max() {
        let policy = plain(10_000, Duration::from_secs(5), 2.0);
        assert_eq!(policy.next(0), Duration::from_secs(5));
    }

    #[test]
    fn test_floor_holds_under_full_jitter() {
        let policy = BackoffPolicy {
            first: Duration::from_millis(400),
            max: Duration::from_secs(30),
            floor: Duration::from_millis(150),
            factor: 2.0,
            jitter: JitterPolicy::Full,
        };
        for attempt in 0..50 {
            let delay = policy.next(attempt);
            assert!(delay >= Duration::from_millis(150), "attempt {attempt}: {delay:?}");
        }
    }

    #[test]
    fn test_full_jitter_never_exceeds_base() {
        let policy = BackoffPolicy {
            first: Duration::from_millis(1000),
            max: Duration::from_secs(30),
            floor: Duration::ZERO,
            factor: 1.0,
            jitter: JitterPolicy::Full,
        };
        for _ in 0..50 {
            assert!(policy.next(0) <= Duration::from_millis(1000));
        }
    }

    #[test]
    fn test_equal_jitter_keeps_half() {
        let policy = BackoffPolicy {
            first: Duration::from_millis(1000),
            max: Duration::from_secs(30),
            floor: Duration::ZERO,
            factor: 1.0,
            jitter: JitterPolicy::Equal,
        };
        for _ in 0..50 {
            let delay = policy.next(0);
            assert!(delay >= Duration::from_millis(500));
            assert!(delay <= Duration::from_millis(1000));
        }
    }

    #[test]
    fn test_huge_attempt_clamps_to_max() {
        let policy = plain(100, Duration::from_secs(60), 2.0);
        assert_eq!(policy.next(u32::MAX), Duration::from_secs(60));
    }

    #[test]
    fn test_monotonic_until_cap_without_jitter() {
        let policy = plain(100, Duration::from_secs(60), 2.0);
        let mut prev = Duration::ZERO;
        for attempt in 0..16 {
            let delay = policy.next(attempt);
            assert!(delay >= prev, "attempt {attempt}: {delay:?} < {prev:?}");
            prev = delay;
        }
    }
}
