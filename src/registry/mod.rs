//! Unit registry: descriptor table, validation, and filtered queries.
//!
//! This module owns the mapping from unit ids to their descriptors and
//! runners:
//! - [`registry`]: the [`EngineRegistry`] itself (register/unregister/get/
//!   query, runner ownership);
//! - [`graph`]: dependency-graph cycle detection used at registration time.
//!
//! The registry is an explicitly constructed instance passed to whichever
//! component needs it (the orchestrator, tests) — there is no global
//! singleton.

mod graph;
mod registry;

pub use registry::{EngineRegistry, QueryFilter};
