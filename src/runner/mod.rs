//! Resilient per-unit execution.
//!
//! This module contains the wrapper that turns a raw [`Engine`](crate::Engine)
//! compute call into a safe, never-throwing execution:
//!
//! - [`runner`]: the [`EngineRunner`] — single-flight guarding, cache check,
//!   timeout-guarded attempts, retry with backoff, degraded/error synthesis;
//! - [`attempt`]: executes one attempt with timeout/cancellation and event
//!   publishing;
//! - [`cache`]: the per-unit TTL report cache;
//! - [`state`]: the unit lifecycle state.
//!
//! The only public API from this module is [`EngineRunner`] and
//! [`EngineState`]; the orchestrator drives runners, unit authors never see
//! them directly.

mod attempt;
mod cache;
mod runner;
mod state;

pub use runner::EngineRunner;
pub use state::EngineState;
