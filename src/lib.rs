//! # signalvisor
//!
//! **Signalvisor** is the resilient orchestration core for dashboards that
//! run dozens of independent analytic engines. Each engine produces a small
//! [`Report`] (signal, confidence, payload); signalvisor supplies everything
//! around the arithmetic: safe execution (timeout, retry with backoff,
//! caching, single-flight, graceful degradation), a validated registry of
//! units, a phased scheduler with bounded concurrency, and result
//! subscriptions for the UI layer.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │    Engine    │   │    Engine    │   │    Engine    │
//!     │ (user unit 1)│   │ (user unit 2)│   │ (user unit N)│
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  EngineRegistry (validated unit table)                            │
//! │  - EngineDescriptor (id, priority, phase, dependencies, tags)     │
//! │  - cycle + phase-order validation at registration                 │
//! │  - one EngineRunner per unit (cache, state, in-flight gate)       │
//! └──────────────────────────────┬────────────────────────────────────┘
//!                                ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Orchestrator                                                     │
//! │  - ExecutionPlan: phases grouped into ordered stages              │
//! │  - stage-sequential execution, bounded intra-stage concurrency    │
//! │  - run deadline, fault isolation, result map (last write wins)    │
//! │  - ReportSubscriptions: per-unit callbacks after each commit      │
//! └──────┬───────────────────────────────────────────────────────┬────┘
//!        ▼                                                       │
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐     │
//!     │ EngineRunner │   │ EngineRunner │   │ EngineRunner │     │
//!     │ (retry loop) │   │ (retry loop) │   │ (retry loop) │     │
//!     └┬─────────────┘   └┬─────────────┘   └┬─────────────┘     │
//!      │ Publishes        │ Publishes        │ Publishes         │
//!      │ - EngineStarted  │ - EngineFailed   │ - TimeoutHit      │
//!      │ - EngineSucceeded│ - BackoffSched.  │ - EngineDegraded  │
//!      ▼                  ▼                  ▼                   ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                     Bus (broadcast channel)                       │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                       ┌────────────────────────┐
//!                       │   subscriber listener  │
//!                       │    (in Orchestrator)   │
//!                       └───────────┬────────────┘
//!                                   ▼
//!                             SubscriberSet
//!                         (per-sub queues+workers)
//!                        ┌─────────┼─────────┐
//!                        ▼         ▼         ▼
//!                    sub1.on   sub2.on   subN.on
//!                     _event()  _event()  _event()
//! ```
//!
//! ### One execution
//! ```text
//! EngineRunner::execute(run_token)
//!   ├─► in-flight? ──────────────► join the leader's Report (single-flight)
//!   ├─► cache fresh? ────────────► return cached Report (no computation)
//!   └─► attempt loop:
//!         ├─► attempt += 1, publish EngineStarted
//!         ├─► race compute vs timeout vs run_token
//!         │     ├─ Ok(success)  ─► cache + last-good, return
//!         │     ├─ soft failure ─► EngineFailed, retry-eligible
//!         │     ├─ timeout      ─► TimeoutHit + EngineFailed, retry-eligible
//!         │     └─ fatal/cancel ─► stop retrying
//!         ├─► delay = min(max, first × factor^(attempt-1)) + jitter
//!         ├─► publish BackoffScheduled, cancellable sleep
//!         └─► exhausted:
//!               ├─ degrade on  ─► degraded Report (stale data, damped conf.)
//!               └─ degrade off ─► error Report (success=false, confidence=0)
//! ```
//!
//! ## Features
//! | Area             | Description                                                    | Key types / traits                        |
//! |------------------|----------------------------------------------------------------|-------------------------------------------|
//! | **Units**        | Define engines as trait impls or closures.                     | [`Engine`], [`EngineFn`], [`EngineRef`]    |
//! | **Resilience**   | Timeout, retry/backoff/jitter, cache, degradation per unit.    | [`EngineConfig`], [`BackoffPolicy`], [`DegradePolicy`] |
//! | **Registry**     | Validated unit table with filtered queries.                    | [`EngineRegistry`], [`EngineDescriptor`], [`QueryFilter`] |
//! | **Scheduling**   | Phased plan, bounded concurrency, run deadline.                | [`Orchestrator`], [`ExecutionPlan`], [`Phase`] |
//! | **Results**      | Typed reports and per-unit push subscriptions.                 | [`Report`], [`ReportData`], [`SubscriptionHandle`] |
//! | **Observability**| Lifecycle events with monotonic ordering.                      | [`Event`], [`EventKind`], [`Subscribe`]    |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use signalvisor::{
//!     EngineDescriptor, EngineFn, Orchestrator, OrchestratorConfig, Phase,
//!     Report, ReportData, Signal,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let orch = Orchestrator::builder(OrchestratorConfig::default()).build();
//!
//!     // A foundation unit and a dependent analysis unit.
//!     orch.registry()
//!         .register(
//!             EngineFn::arc("vix-level", |_ctx| async {
//!                 Ok(Report::success(Signal::Neutral, 0.7, ReportData::Metric(17.4)))
//!             }),
//!             EngineDescriptor::new("vix-level", Phase::Foundation),
//!         )
//!         .await?;
//!     orch.registry()
//!         .register(
//!             EngineFn::arc("vol-regime", |_ctx| async {
//!                 Ok(Report::success(Signal::Bearish, 0.6, ReportData::Note("elevated".into())))
//!             }),
//!             EngineDescriptor::new("vol-regime", Phase::Market).with_dependency("vix-level"),
//!         )
//!         .await?;
//!
//!     let results = orch.run_all().await;
//!     assert_eq!(results.len(), 2);
//!     assert!(results["vol-regime"].success);
//!     Ok(())
//! }
//! ```

mod config;
mod engines;
mod error;
mod events;
mod policies;
mod registry;
mod report;
mod runner;
mod scheduler;
mod subscribers;

// ---- Public re-exports ----

pub use config::{EngineConfig, EngineConfigBuilder, OrchestratorConfig};
pub use engines::{Engine, EngineDescriptor, EngineFn, EngineRef, Phase};
pub use error::{ConfigError, EngineError, RegistryError};
pub use events::{Bus, Event, EventKind};
pub use policies::{BackoffPolicy, DegradePolicy, JitterPolicy};
pub use registry::{EngineRegistry, QueryFilter};
pub use report::{Report, ReportData, Signal};
pub use runner::{EngineRunner, EngineState};
pub use scheduler::{
    ExecutionPlan, Orchestrator, OrchestratorBuilder, PlanStage, ReportSubscriptions,
    SubscriptionHandle,
};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
