//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to lifecycle events emitted by the orchestrator,
//! registry, and per-unit runners.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Orchestrator` (run lifecycle), `EngineRegistry`
//!   (registration), `EngineRunner` and its attempt helper (unit lifecycle).
//! - **Consumers**: the orchestrator's subscriber listener, which fans events
//!   out to the [`SubscriberSet`](crate::SubscriberSet), and any direct
//!   [`Bus::subscribe`] receiver.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
