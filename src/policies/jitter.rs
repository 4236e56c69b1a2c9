//! # Jitter policy for retry delays.
//!
//! [`JitterPolicy`] adds randomness to backoff delays so that engines which
//! failed together do not retry in lockstep (thundering herd).
//!
//! - [`JitterPolicy::None`] — exact backoff delay, predictable timing
//! - [`JitterPolicy::Full`] — random delay in `[0, base]`
//! - [`JitterPolicy::Equal`] — `base/2 + random[0, base/2]` (balanced default)

use rand::Rng;
use std::time::Duration;

/// Randomization strategy for retry delays.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JitterPolicy {
    /// No jitter. Use for single-unit retries or deterministic tests.
    None,

    /// Random delay in `[0, base]`. Maximum load spreading, can shrink the
    /// delay to near zero.
    Full,

    /// `base/2 + random[0, base/2]`. Preserves ~75% of the base on average
    /// while still decorrelating retries.
    #[default]
    Equal,
}

impl JitterPolicy {
    /// Applies jitter to the given base delay.
    pub fn apply(&self, base: Duration) -> Duration {
        match self {
            JitterPolicy::None => base,
            JitterPolicy::Full => full_jitter(base),
            JitterPolicy::Equal => equal_jitter(base),
        }
    }
}

fn full_jitter(base: Duration) -> Duration {
    let ms = base.as_millis() as u64;
    if ms == 0 {
        return Duration::ZERO;
    }
    let mut rng = rand::rng();
    Duration::from_millis(rng.random_range(0..=ms))
}

fn equal_jitter(base: Duration) -> Duration {
    let ms = base.as_millis() as u64;
    if ms == 0 {
        return Duration::ZERO;
    }
    let half = ms / 2;
    let jitter = if half == 0 {
        0
    } else {
        rand::rng().random_range(0..=half)
    };
    Duration::from_millis(half + jitter)
}
