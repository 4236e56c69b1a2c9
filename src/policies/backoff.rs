//! # Backoff policy for retrying engine attempts.
//!
//! [`BackoffPolicy`] controls how retry delays grow after repeated failures.
//! The delay for attempt `n` (0-indexed) is `first × factor^n`, clamped to
//! `max`, then jitter is applied. Because the base delay is derived purely
//! from the attempt number, jitter output never feeds back into subsequent
//! calculations — delays cannot shrink over time through a feedback loop.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use signalvisor::{BackoffPolicy, JitterPolicy};
//!
//! let backoff = BackoffPolicy {
//!     first: Duration::from_millis(100),
//!     max: Duration::from_secs(10),
//!     factor: 2.0,
//!     jitter: JitterPolicy::None,
//! };
//!
//! assert_eq!(backoff.next(0), Duration::from_millis(100));
//! assert_eq!(backoff.next(1), Duration::from_millis(200));
//! // 100ms × 2^10 = 102_400ms → capped at max=10s
//! assert_eq!(backoff.next(10), Duration::from_secs(10));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Retry backoff policy.
#[derive(Clone, Copy, Debug)]
pub struct BackoffPolicy {
    /// Delay before the first retry.
    pub first: Duration,
    /// Maximum delay cap.
    pub max: Duration,
    /// Multiplicative growth factor (`>= 1.0`; validated by the config builder).
    pub factor: f64,
    /// Jitter applied to the clamped base delay.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// Returns exponential backoff: first=100ms, factor=2.0, max=30s, jitter=Equal.
    fn default() -> Self {
        Self {
            first: Duration::from_millis(100),
            max: Duration::from_secs(30),
            factor: 2.0,
            jitter: JitterPolicy::Equal,
        }
    }
}

impl BackoffPolicy {
    /// Computes the delay for the given retry (0-indexed).
    ///
    /// The base is `first × factor^attempt`, clamped to [`BackoffPolicy::max`];
    /// overflow and non-finite intermediates clamp to `max` as well.
    pub fn next(&self, attempt: u32) -> Duration {
        let max_secs = self.max.as_secs_f64();
        let exp = attempt.min(i32::MAX as u32) as i32;
        let raw_secs = self.first.as_secs_f64() * self.factor.powi(exp);

        let base = if !raw_secs.is_finite() || raw_secs < 0.0 || raw_secs > max_secs {
            self.max
        } else {
            Duration::from_secs_f64(raw_secs)
        };

        self.jitter.apply(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(first_ms: u64, max: Duration, factor: f64) -> BackoffPolicy {
        BackoffPolicy {
            first: Duration::from_millis(first_ms),
            max,
            factor,
            jitter: JitterPolicy::None,
        }
    }

    #[test]
    fn attempt_zero_returns_first() {
        let policy = plain(100, Duration::from_secs(30), 2.0);
        assert_eq!(policy.next(0), Duration::from_millis(100));
    }

    #[test]
    fn exponential_growth_without_jitter() {
        let policy = plain(100, Duration::from_secs(30), 2.0);
        assert_eq!(policy.next(1), Duration::from_millis(200));
        assert_eq!(policy.next(2), Duration::from_millis(400));
        assert_eq!(policy.next(3), Duration::from_millis(800));
    }

    #[test]
    fn constant_factor_keeps_delay_flat() {
        let policy = plain(500, Duration::from_secs(30), 1.0);
        for attempt in 0..10 {
            assert_eq!(policy.next(attempt), Duration::from_millis(500));
        }
    }

    #[test]
    fn clamps_to_max() {
        let policy = plain(100, Duration::from_secs(1), 2.0);
        assert_eq!(policy.next(10), Duration::from_secs(1));
    }

    #[test]
    fn first_exceeding_max_clamps() {
        let policy = plain(10_000, Duration::from_secs(5), 2.0);
        assert_eq!(policy.next(0), Duration::from_secs(5));
    }

    #[test]
    fn huge_attempt_clamps_to_max() {
        let policy = plain(100, Duration::from_secs(60), 2.0);
        assert_eq!(policy.next(u32::MAX), Duration::from_secs(60));
    }

    #[test]
    fn equal_jitter_stays_within_bounds() {
        let policy = BackoffPolicy {
            first: Duration::from_millis(1000),
            max: Duration::from_secs(30),
            factor: 1.0,
            jitter: JitterPolicy::Equal,
        };
        for attempt in 0..50 {
            let delay = policy.next(attempt);
            assert!(delay >= Duration::from_millis(500));
            assert!(delay <= Duration::from_millis(1000));
        }
    }

    #[test]
    fn full_jitter_never_exceeds_base() {
        let policy = BackoffPolicy {
            first: Duration::from_millis(100),
            max: Duration::from_secs(30),
            factor: 2.0,
            jitter: JitterPolicy::Full,
        };
        for attempt in 0..15 {
            let base_ms = (100.0 * 2.0f64.powi(attempt)).min(30_000.0);
            assert!(policy.next(attempt as u32) <= Duration::from_millis(base_ms as u64));
        }
    }
}
