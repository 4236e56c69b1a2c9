//! Retry and degradation policies.
//!
//! This module groups the knobs that control **how long** to wait between
//! failed attempts and **what to return** once attempts are exhausted.
//!
//! ## Contents
//! - [`BackoffPolicy`] how retry delays evolve (first / factor / max + jitter)
//! - [`JitterPolicy`]  randomization strategy to avoid thundering herd
//! - [`DegradePolicy`] whether/how to synthesize a degraded report on exhaustion
//!
//! ## Quick wiring
//! ```text
//! EngineConfig { max_retries, timeout, cache_ttl, backoff: BackoffPolicy, degrade: DegradePolicy }
//!      └─► runner::EngineRunner uses:
//!           - backoff.next(attempt) to schedule the next attempt
//!           - degrade.synthesize(last_good, reason) once retries are exhausted
//! ```
//!
//! ## Defaults
//! - `BackoffPolicy::default()` → first=100ms, factor=2.0, max=30s, jitter=Equal.
//! - `DegradePolicy::default()` → enabled, damping=0.7, floor=0.1.

mod backoff;
mod degrade;
mod jitter;

pub use backoff::BackoffPolicy;
pub use degrade::DegradePolicy;
pub use jitter::JitterPolicy;
