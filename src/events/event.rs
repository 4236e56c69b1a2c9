//! # Lifecycle events emitted by the orchestration core.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Run events**: whole-run flow (`RunStarted`, `RunCompleted`)
//! - **Unit events**: per-engine execution flow (started, succeeded, failed,
//!   degraded, timeout, backoff)
//! - **Registry events**: registration lifecycle (registered, unregistered)
//!
//! The [`Event`] struct carries metadata such as timestamps, the unit id,
//! attempt numbers, reasons, and compact millisecond durations.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore the exact order when events are
//! delivered out of order across subscribers.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use signalvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::EngineFailed)
//!     .with_engine("momentum")
//!     .with_reason("upstream 503")
//!     .with_attempt(2)
//!     .with_timeout(Duration::from_secs(5));
//!
//! assert_eq!(ev.kind, EventKind::EngineFailed);
//! assert_eq!(ev.engine.as_deref(), Some("momentum"));
//! assert_eq!(ev.reason.as_deref(), Some("upstream 503"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::engines::Phase;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Run events ===
    /// A run (`run_all` / `run_phase`) began.
    ///
    /// Sets: `at`, `seq`.
    RunStarted,

    /// A run finished; the full result map is available.
    ///
    /// Sets: `elapsed_ms`, `at`, `seq`.
    RunCompleted,

    // === Unit events ===
    /// A unit is starting an attempt.
    ///
    /// Sets: `engine`, `attempt` (1-based), `at`, `seq`.
    EngineStarted,

    /// A unit attempt produced a genuine successful report.
    ///
    /// Sets: `engine`, `attempt`, `elapsed_ms`, `at`, `seq`.
    EngineSucceeded,

    /// A unit attempt failed (error, soft failure, or timeout).
    ///
    /// Sets: `engine`, `attempt`, `reason`, `at`, `seq`.
    EngineFailed,

    /// Retries exhausted; a degraded report was synthesized.
    ///
    /// Sets: `engine`, `reason`, `at`, `seq`.
    EngineDegraded,

    /// A unit attempt exceeded its configured timeout.
    ///
    /// Published in addition to `EngineFailed` for that attempt.
    /// Sets: `engine`, `attempt`, `timeout_ms`, `at`, `seq`.
    TimeoutHit,

    /// A retry was scheduled after a failed attempt.
    ///
    /// Sets: `engine`, `attempt` (the failed one), `delay_ms`, `reason`,
    /// `at`, `seq`.
    BackoffScheduled,

    // === Registry events ===
    /// A unit was registered (or re-registered, last writer wins).
    ///
    /// Sets: `engine`, `phase`, `at`, `seq`.
    EngineRegistered,

    /// A unit was unregistered and dropped from future plans.
    ///
    /// Sets: `engine`, `at`, `seq`.
    EngineUnregistered,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Unit id, if applicable.
    pub engine: Option<Arc<str>>,
    /// Unit phase (registry events).
    pub phase: Option<Phase>,
    /// Attempt count (starting from 1).
    pub attempt: Option<u32>,
    /// Attempt timeout in milliseconds (compact).
    pub timeout_ms: Option<u32>,
    /// Backoff delay before the next attempt in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Elapsed execution time in milliseconds (compact).
    pub elapsed_ms: Option<u32>,
    /// Human-readable reason (errors, degradation cause, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with the current timestamp and
    /// the next global sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            engine: None,
            phase: None,
            attempt: None,
            timeout_ms: None,
            delay_ms: None,
            elapsed_ms: None,
            reason: None,
        }
    }

    /// Attaches a unit id.
    #[inline]
    pub fn with_engine(mut self, engine: impl Into<Arc<str>>) -> Self {
        self.engine = Some(engine.into());
        self
    }

    /// Attaches a phase.
    #[inline]
    pub fn with_phase(mut self, phase: Phase) -> Self {
        self.phase = Some(phase);
        self
    }

    /// Attaches an attempt count.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a timeout duration (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        self.timeout_ms = Some(compact_ms(d));
        self
    }

    /// Attaches a backoff delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay_ms = Some(compact_ms(d));
        self
    }

    /// Attaches an elapsed duration (stored as milliseconds).
    #[inline]
    pub fn with_elapsed(mut self, d: Duration) -> Self {
        self.elapsed_ms = Some(compact_ms(d));
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

#[inline]
fn compact_ms(d: Duration) -> u32 {
    d.as_millis().min(u128::from(u32::MAX)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seq_is_monotonic() {
        let a = Event::new(EventKind::RunStarted);
        let b = Event::new(EventKind::RunCompleted);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn builders_set_fields() {
        let ev = Event::new(EventKind::BackoffScheduled)
            .with_engine("breadth")
            .with_attempt(1)
            .with_delay(Duration::from_millis(150))
            .with_reason("timeout");
        assert_eq!(ev.engine.as_deref(), Some("breadth"));
        assert_eq!(ev.attempt, Some(1));
        assert_eq!(ev.delay_ms, Some(150));
        assert_eq!(ev.reason.as_deref(), Some("timeout"));
    }

    #[test]
    fn durations_compact_saturating() {
        let ev = Event::new(EventKind::TimeoutHit).with_timeout(Duration::from_secs(u64::MAX));
        assert_eq!(ev.timeout_ms, Some(u32::MAX));
    }
}
