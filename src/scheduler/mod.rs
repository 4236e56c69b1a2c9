//! Phased scheduling and result delivery.
//!
//! This module contains the run-side of the core:
//! - [`plan`]: builds the ordered [`ExecutionPlan`] from registry descriptors;
//! - [`orchestrator`]: executes plans stage by stage with bounded intra-stage
//!   concurrency, a run deadline, and fault isolation;
//! - [`subscriptions`]: the per-unit report subscription bus.

mod orchestrator;
mod plan;
mod subscriptions;

pub use orchestrator::{Orchestrator, OrchestratorBuilder};
pub use plan::{ExecutionPlan, PlanStage};
pub use subscriptions::{ReportSubscriptions, SubscriptionHandle};
