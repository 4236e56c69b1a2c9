//! # Simple logging subscriber for debugging and demos.
//!
//! [`LogWriter`] renders lifecycle events through `tracing::info!` in a
//! compact, human-readable form:
//!
//! ```text
//! [run-started]
//! [starting] engine=momentum attempt=1
//! [failed] engine=momentum reason="upstream 503" attempt=1
//! [backoff] engine=momentum delay_ms=150 after_attempt=1
//! [timeout] engine=breadth timeout_ms=50
//! [degraded] engine=breadth reason="timed out after 50ms"
//! [succeeded] engine=momentum elapsed_ms=12
//! [run-completed] elapsed_ms=840
//! ```
//!
//! Not intended for production use — implement a custom
//! [`Subscribe`](crate::Subscribe) for structured metrics collection.

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Built-in tracing-backed event logger. Enabled via the `logging` feature.
#[derive(Default)]
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        match e.kind {
            EventKind::RunStarted => {
                tracing::info!("[run-started]");
            }
            EventKind::RunCompleted => {
                tracing::info!(elapsed_ms = ?e.elapsed_ms, "[run-completed]");
            }
            EventKind::EngineStarted => {
                tracing::info!(engine = ?e.engine, attempt = ?e.attempt, "[starting]");
            }
            EventKind::EngineSucceeded => {
                tracing::info!(engine = ?e.engine, elapsed_ms = ?e.elapsed_ms, "[succeeded]");
            }
            EventKind::EngineFailed => {
                tracing::info!(
                    engine = ?e.engine,
                    reason = ?e.reason,
                    attempt = ?e.attempt,
                    "[failed]"
                );
            }
            EventKind::EngineDegraded => {
                tracing::info!(engine = ?e.engine, reason = ?e.reason, "[degraded]");
            }
            EventKind::TimeoutHit => {
                tracing::info!(engine = ?e.engine, timeout_ms = ?e.timeout_ms, "[timeout]");
            }
            EventKind::BackoffScheduled => {
                tracing::info!(
                    engine = ?e.engine,
                    delay_ms = ?e.delay_ms,
                    after_attempt = ?e.attempt,
                    "[backoff]"
                );
            }
            EventKind::EngineRegistered => {
                tracing::info!(engine = ?e.engine, phase = ?e.phase, "[registered]");
            }
            EventKind::EngineUnregistered => {
                tracing::info!(engine = ?e.engine, "[unregistered]");
            }
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}
