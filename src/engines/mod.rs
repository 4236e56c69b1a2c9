//! Engine abstractions and unit metadata.
//!
//! This module provides the unit-facing types:
//! - [`Engine`] - trait for implementing async, cancelable compute units
//! - [`EngineFn`] - closure-backed engine implementation
//! - [`EngineRef`] - shared handle to an engine (`Arc<dyn Engine>`)
//! - [`Phase`] - named stage of the execution plan
//! - [`EngineDescriptor`] - registration metadata (identity, priority, phase,
//!   dependencies, tags, per-unit config override)

mod descriptor;
mod engine;
mod engine_fn;

pub use descriptor::{EngineDescriptor, Phase};
pub use engine::{Engine, EngineRef};
pub use engine_fn::EngineFn;
