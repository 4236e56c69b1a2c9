//! # Graceful-degradation policy.
//!
//! [`DegradePolicy`] decides what an engine returns once every attempt has
//! failed: a synthesized **degraded report** built from the last good result
//! (stale-but-labeled data, damped confidence), or a hard error report.
//!
//! The damping factor and confidence floor are tunable per unit; downstream
//! consumers distinguish genuine from stale signal strength through the
//! reduced confidence and the `degraded` flag.

use crate::report::Report;

/// Policy applied when retries are exhausted.
#[derive(Clone, Copy, Debug)]
pub struct DegradePolicy {
    /// When `true`, exhaustion yields a degraded report instead of a hard error.
    pub enabled: bool,
    /// Multiplier applied to the last good confidence (`(0, 1]`).
    pub damping: f64,
    /// Minimum confidence of a degraded report (`[0, 1]`).
    pub floor: f64,
}

impl Default for DegradePolicy {
    /// Returns degradation enabled with damping=0.7 and floor=0.1.
    fn default() -> Self {
        Self {
            enabled: true,
            damping: 0.7,
            floor: 0.1,
        }
    }
}

impl DegradePolicy {
    /// Synthesizes the degraded report for an exhausted unit.
    ///
    /// Callers check [`DegradePolicy::enabled`] first; this method only
    /// encodes the synthesis math.
    pub fn synthesize(&self, last_good: Option<&Report>, reason: impl Into<String>) -> Report {
        Report::degraded_from(last_good, reason, self.damping, self.floor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{ReportData, Signal};

    #[test]
    fn synthesize_damps_prior_confidence() {
        let policy = DegradePolicy {
            enabled: true,
            damping: 0.5,
            floor: 0.05,
        };
        let good = Report::success(Signal::Bullish, 0.9, ReportData::Metric(1.0));
        let d = policy.synthesize(Some(&good), "upstream down");
        assert!((d.confidence - 0.45).abs() < 1e-9);
        assert!(d.degraded);
    }

    #[test]
    fn synthesize_floors_when_prior_is_weak() {
        let policy = DegradePolicy {
            enabled: true,
            damping: 0.5,
            floor: 0.2,
        };
        let good = Report::success(Signal::Neutral, 0.1, ReportData::Empty);
        let d = policy.synthesize(Some(&good), "upstream down");
        assert_eq!(d.confidence, 0.2);
    }
}
