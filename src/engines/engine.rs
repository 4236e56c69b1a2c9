//! # Engine trait: the single contract unit authors implement.
//!
//! An [`Engine`] has a stable [`id`](Engine::id) and an async, cancelable
//! [`compute`](Engine::compute) that produces a [`Report`] or fails with an
//! [`EngineError`]. Everything else — timeout, retries, caching, degradation
//! — belongs to the runner wrapping the engine, not to the engine itself.
//!
//! Compute receives a [`CancellationToken`]; long-running fetches should
//! check it and bail out promptly when the attempt is timed out or the run
//! deadline fires.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::EngineError;
use crate::report::Report;

/// Shared handle to an engine.
pub type EngineRef = Arc<dyn Engine>;

/// # Asynchronous, cancelable computation unit.
///
/// Returning `Ok` with a `success = false` report counts as a **soft
/// failure**: the runner retries it exactly like a returned error.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use tokio_util::sync::CancellationToken;
/// use signalvisor::{Engine, EngineError, Report, ReportData, Signal};
///
/// struct Momentum;
///
/// #[async_trait]
/// impl Engine for Momentum {
///     fn id(&self) -> &str { "momentum" }
///
///     async fn compute(&self, ctx: CancellationToken) -> Result<Report, EngineError> {
///         if ctx.is_cancelled() {
///             return Err(EngineError::Canceled);
///         }
///         Ok(Report::success(Signal::Bullish, 0.8, ReportData::Metric(1.2)))
///     }
/// }
/// ```
#[async_trait]
pub trait Engine: Send + Sync + 'static {
    /// Returns the stable unit id (also the default cache key).
    fn id(&self) -> &str;

    /// Executes one computation until completion or cancellation.
    async fn compute(&self, ctx: CancellationToken) -> Result<Report, EngineError>;

    /// Cache key for this engine's reports.
    ///
    /// Defaults to the engine id; engines whose inputs vary can override it
    /// to partition the cache.
    fn cache_key(&self) -> &str {
        self.id()
    }
}
