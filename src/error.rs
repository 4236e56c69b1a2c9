//! Error types used by the signalvisor core.
//!
//! This module defines three error enums:
//!
//! - [`EngineError`] — failures of a single compute attempt.
//! - [`RegistryError`] — structural registration/lookup failures.
//! - [`ConfigError`] — configuration builder validation failures.
//!
//! Per-attempt failures are contained inside [`Report`](crate::Report)s and
//! never abort an orchestrator run; only structural errors (cycles, phase
//! ordering, unknown ids) surface as `Err` to the caller. `EngineError`
//! provides helper methods (`as_label`, `as_message`) for logs/metrics and
//! [`EngineError::is_retryable`] for the retry loop.

use std::time::Duration;
use thiserror::Error;

use crate::engines::Phase;

/// # Errors produced by a single compute attempt.
///
/// Timeouts and plain failures are retryable; fatal errors and cancellation
/// stop the attempt loop immediately.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum EngineError {
    /// The attempt exceeded its configured timeout.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// The compute function failed but may succeed if retried.
    ///
    /// Also produced when compute returns a report with `success = false`
    /// (a soft failure, retry-eligible like a thrown error).
    #[error("compute failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Non-recoverable error; the attempt loop stops without retrying.
    #[error("fatal error (no retry): {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },

    /// The run was cancelled (deadline hit or caller cancellation).
    #[error("run cancelled")]
    Canceled,
}

impl EngineError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use std::time::Duration;
    /// use signalvisor::EngineError;
    ///
    /// let err = EngineError::Timeout { timeout: Duration::from_millis(50) };
    /// assert_eq!(err.as_label(), "engine_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            EngineError::Timeout { .. } => "engine_timeout",
            EngineError::Fail { .. } => "engine_failed",
            EngineError::Fatal { .. } => "engine_fatal",
            EngineError::Canceled => "engine_canceled",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            EngineError::Timeout { timeout } => format!("timeout: {timeout:?}"),
            EngineError::Fail { error } => format!("error: {error}"),
            EngineError::Fatal { error } => format!("fatal: {error}"),
            EngineError::Canceled => "run cancelled".to_string(),
        }
    }

    /// Indicates whether the error type is safe to retry.
    ///
    /// Returns `true` for [`EngineError::Fail`] and [`EngineError::Timeout`],
    /// `false` otherwise.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Fail { .. } | EngineError::Timeout { .. })
    }
}

/// # Structural errors raised by the registry and scheduler.
///
/// These are the only failures surfaced as `Err` to callers; registration
/// rejects without committing partial state.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Declared dependencies form a cycle. The path names every unit on the
    /// cycle, first id repeated at the end.
    #[error("dependency cycle: {}", cycle.join(" -> "))]
    DependencyCycle {
        /// Unit ids along the cycle, closing back on the first.
        cycle: Vec<String>,
    },

    /// A dependency's phase does not run strictly before the dependent's.
    #[error(
        "unit '{unit}' ({unit_phase:?}) depends on '{dependency}' ({dependency_phase:?}), \
         which does not run in an earlier phase"
    )]
    PhaseOrder {
        /// The dependent unit id.
        unit: String,
        /// Phase of the dependent unit.
        unit_phase: Phase,
        /// The dependency unit id.
        dependency: String,
        /// Phase of the dependency.
        dependency_phase: Phase,
    },

    /// The descriptor id does not match the engine's own id.
    #[error("descriptor id '{descriptor}' does not match engine id '{engine}'")]
    IdMismatch {
        /// Id carried by the descriptor.
        descriptor: String,
        /// Id reported by the engine.
        engine: String,
    },

    /// A request referenced an unregistered unit id.
    #[error("unknown unit: {id}")]
    UnknownUnit {
        /// The id that was not found.
        id: String,
    },
}

impl RegistryError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RegistryError::DependencyCycle { .. } => "registry_cycle",
            RegistryError::PhaseOrder { .. } => "registry_phase_order",
            RegistryError::IdMismatch { .. } => "registry_id_mismatch",
            RegistryError::UnknownUnit { .. } => "registry_unknown_unit",
        }
    }
}

/// # Configuration validation errors.
///
/// Produced by [`EngineConfigBuilder::build`](crate::EngineConfigBuilder::build);
/// invalid configurations fail fast instead of being silently clamped.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Per-attempt timeout must be greater than zero.
    #[error("timeout must be positive")]
    NonPositiveTimeout,

    /// Backoff growth factor must be at least 1.0.
    #[error("backoff factor must be >= 1.0, got {0}")]
    FactorTooSmall(f64),

    /// Confidence damping must lie in (0, 1].
    #[error("degrade damping must be within (0, 1], got {0}")]
    DampingOutOfRange(f64),

    /// Degraded confidence floor must lie in [0, 1].
    #[error("confidence floor must be within [0, 1], got {0}")]
    FloorOutOfRange(f64),
}
