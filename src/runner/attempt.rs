//! # Run a single attempt of an engine computation.
//!
//! Executes one attempt of an [`Engine`] with a per-attempt timeout, racing
//! the compute against the run-level cancellation token, and publishes
//! lifecycle events to the [`Bus`].
//!
//! ## Event flow
//! ```text
//! Genuine success:
//!   compute() → Ok(report, success=true)  → publish EngineSucceeded
//!
//! Soft failure:
//!   compute() → Ok(report, success=false) → publish EngineFailed
//!                                         → Err(Fail) (retry-eligible)
//!
//! Failure:
//!   compute() → Err(Fail/Fatal)           → publish EngineFailed
//!
//! Timeout:
//!   deadline elapsed → cancel child       → publish TimeoutHit
//!                                         → publish EngineFailed
//!                                         → Err(Timeout)
//!
//! Run cancelled:
//!   run token fired → cancel child        → Err(Canceled), no terminal event
//! ```
//!
//! ## Rules
//! - Derives a **child token** per attempt; cancelling it never affects the
//!   run token.
//! - Publishes **exactly one** terminal event per attempt
//!   (`EngineSucceeded` or `EngineFailed`); `TimeoutHit` is published in
//!   addition on timeout. Cancellation publishes nothing — the runner
//!   resolves the whole execution afterwards.

use std::time::Duration;

use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::engines::Engine;
use crate::error::EngineError;
use crate::events::{Bus, Event, EventKind};
use crate::report::Report;

/// Executes a single attempt of `engine`, publishing lifecycle events to `bus`.
pub(crate) async fn run_once(
    engine: &dyn Engine,
    run_token: &CancellationToken,
    timeout: Duration,
    attempt: u32,
    bus: &Bus,
) -> Result<Report, EngineError> {
    let child = run_token.child_token();
    let started = Instant::now();

    let res = tokio::select! {
        out = time::timeout(timeout, engine.compute(child.clone())) => match out {
            Ok(r) => r,
            Err(_elapsed) => {
                child.cancel();
                bus.publish(
                    Event::new(EventKind::TimeoutHit)
                        .with_engine(engine.id())
                        .with_timeout(timeout)
                        .with_attempt(attempt),
                );
                Err(EngineError::Timeout { timeout })
            }
        },
        _ = run_token.cancelled() => {
            child.cancel();
            Err(EngineError::Canceled)
        }
    };

    match res {
        Ok(report) if report.success => {
            bus.publish(
                Event::new(EventKind::EngineSucceeded)
                    .with_engine(engine.id())
                    .with_attempt(attempt)
                    .with_elapsed(started.elapsed()),
            );
            Ok(report)
        }
        Ok(report) => {
            // Soft failure: the compute "completed" but reported failure.
            let reason = if report.errors.is_empty() {
                "compute reported failure".to_string()
            } else {
                report.errors.join("; ")
            };
            publish_failed(bus, engine.id(), attempt, &reason);
            Err(EngineError::Fail { error: reason })
        }
        Err(EngineError::Canceled) => Err(EngineError::Canceled),
        Err(e) => {
            publish_failed(bus, engine.id(), attempt, &e.to_string());
            Err(e)
        }
    }
}

fn publish_failed(bus: &Bus, id: &str, attempt: u32, reason: &str) {
    bus.publish(
        Event::new(EventKind::EngineFailed)
            .with_engine(id)
            .with_attempt(attempt)
            .with_reason(reason),
    );
}
