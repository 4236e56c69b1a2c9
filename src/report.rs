//! # Report: the immutable result of one engine execution.
//!
//! A [`Report`] bundles the analytic outcome of a unit: a [`Signal`], a
//! confidence score in `[0, 1]`, a typed [`ReportData`] payload for the tile
//! layer, and error/degradation metadata. Reports are constructed through
//! the helpers here so the invariants hold by construction:
//!
//! - `success = false` ⇒ `confidence = 0` and `degraded = false`;
//! - `degraded = true` ⇒ `success = true`, confidence damped from the last
//!   good value (or a floor default), and `errors` carries the reason.
//!
//! All types serialize with serde so the UI layer can render tiles straight
//! from orchestrator results.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Directional signal attached to a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    /// Positive/upward reading.
    Bullish,
    /// Negative/downward reading.
    Bearish,
    /// No directional conviction.
    #[default]
    Neutral,
}

impl Signal {
    /// Returns a short stable label for logs and tile captions.
    pub fn as_label(&self) -> &'static str {
        match self {
            Signal::Bullish => "bullish",
            Signal::Bearish => "bearish",
            Signal::Neutral => "neutral",
        }
    }
}

/// Typed report payload.
///
/// Consumers pattern-match exhaustively instead of probing loosely-typed
/// fields; each engine category settles on one variant shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ReportData {
    /// No payload (placeholder and degraded-default).
    #[default]
    Empty,
    /// A single scalar metric.
    Metric(f64),
    /// A time/value series for sparkline tiles.
    Series(Vec<f64>),
    /// Labeled components, e.g. factor contributions.
    Breakdown(Vec<(String, f64)>),
    /// Free-form annotation.
    Note(String),
}

/// Immutable result of one unit execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Whether the execution produced a usable result.
    pub success: bool,
    /// Confidence in `[0, 1]`. Zero for hard failures.
    pub confidence: f64,
    /// Directional signal.
    pub signal: Signal,
    /// Typed payload for the consumer.
    pub data: ReportData,
    /// True when synthesized from stale data after a failed computation.
    pub degraded: bool,
    /// Ordered failure messages; empty on a genuine success.
    pub errors: Vec<String>,
    /// Wall-clock completion timestamp.
    pub at: SystemTime,
}

impl Report {
    /// Creates a successful report. Confidence is clamped to `[0, 1]`.
    pub fn success(signal: Signal, confidence: f64, data: ReportData) -> Self {
        Self {
            success: true,
            confidence: confidence.clamp(0.0, 1.0),
            signal,
            data,
            degraded: false,
            errors: Vec::new(),
            at: SystemTime::now(),
        }
    }

    /// Creates a hard error report: `success = false`, `confidence = 0`.
    pub fn failure(errors: Vec<String>) -> Self {
        Self {
            success: false,
            confidence: 0.0,
            signal: Signal::Neutral,
            data: ReportData::Empty,
            degraded: false,
            errors,
            at: SystemTime::now(),
        }
    }

    /// Synthesizes a degraded report from the last good one.
    ///
    /// Payload and signal are copied from `last_good` when present, otherwise
    /// a neutral default is used. Confidence is `last_good.confidence ×
    /// damping`, floored at `floor`, so downstream consumers can tell stale
    /// from genuine signal strength.
    pub fn degraded_from(
        last_good: Option<&Report>,
        reason: impl Into<String>,
        damping: f64,
        floor: f64,
    ) -> Self {
        let (signal, data, base) = match last_good {
            Some(prev) => (prev.signal, prev.data.clone(), prev.confidence),
            None => (Signal::Neutral, ReportData::Empty, 0.0),
        };
        Self {
            success: true,
            confidence: (base * damping).max(floor).clamp(0.0, 1.0),
            signal,
            data,
            degraded: true,
            errors: vec![reason.into()],
            at: SystemTime::now(),
        }
    }

    /// True for a compute result that "completed" but reported failure.
    ///
    /// The runner treats these as soft failures, eligible for retry.
    pub fn is_soft_failure(&self) -> bool {
        !self.success
    }
}
