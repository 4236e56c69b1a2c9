//! # Per-unit report subscriptions.
//!
//! [`ReportSubscriptions`] lets external callers register interest in one
//! unit's result stream and receive a push after each execution, once the
//! orchestrator has committed the result to its map.
//!
//! ## Rules
//! - Delivery iterates a **snapshot** of the listener list taken under the
//!   lock, then invokes callbacks outside it — unsubscribing (or
//!   subscribing) during delivery never invalidates iteration.
//! - A panicking callback is caught and logged; remaining subscribers still
//!   receive the report (isolation).
//! - [`SubscriptionHandle::unsubscribe`] is idempotent and holds only a weak
//!   reference to the bus — dropping the bus first is fine, and dropping a
//!   handle without unsubscribing leaks nothing but the callback slot.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::report::Report;

type Callback = Arc<dyn Fn(&Report) + Send + Sync>;

struct Slot {
    token: u64,
    callback: Callback,
}

type Table = Mutex<HashMap<String, Vec<Slot>>>;

fn lock(table: &Table) -> MutexGuard<'_, HashMap<String, Vec<Slot>>> {
    table.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Per-unit listener lists with snapshot dispatch.
#[derive(Default)]
pub struct ReportSubscriptions {
    table: Arc<Table>,
    next_token: AtomicU64,
}

impl ReportSubscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback for one unit's reports and returns the handle
    /// used to unsubscribe.
    pub fn subscribe(
        &self,
        unit: impl Into<String>,
        callback: impl Fn(&Report) + Send + Sync + 'static,
    ) -> SubscriptionHandle {
        let unit = unit.into();
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        lock(&self.table)
            .entry(unit.clone())
            .or_default()
            .push(Slot {
                token,
                callback: Arc::new(callback),
            });
        SubscriptionHandle {
            unit,
            token,
            table: Arc::downgrade(&self.table),
        }
    }

    /// Delivers a report to every subscriber of `unit`.
    pub fn publish(&self, unit: &str, report: &Report) {
        // Snapshot under the lock; call outside it so callbacks may
        // subscribe/unsubscribe freely.
        let callbacks: Vec<Callback> = match lock(&self.table).get(unit) {
            Some(slots) => slots.iter().map(|s| Arc::clone(&s.callback)).collect(),
            None => return,
        };

        for cb in callbacks {
            if let Err(panic_err) =
                std::panic::catch_unwind(AssertUnwindSafe(|| cb(report)))
            {
                tracing::warn!(unit, panic = ?panic_err, "report subscriber panicked");
            }
        }
    }

    /// Number of active subscriptions for a unit.
    pub fn subscriber_count(&self, unit: &str) -> usize {
        lock(&self.table).get(unit).map_or(0, Vec::len)
    }
}

/// Caller-held handle for one subscription.
///
/// Unsubscribing is the caller's responsibility; dropping the handle does
/// **not** unsubscribe.
pub struct SubscriptionHandle {
    unit: String,
    token: u64,
    table: Weak<Table>,
}

impl SubscriptionHandle {
    /// Removes the subscription. Safe to call multiple times and safe to
    /// call from inside a delivery callback.
    pub fn unsubscribe(&self) {
        let Some(table) = self.table.upgrade() else {
            return;
        };
        let mut table = lock(&table);
        if let Some(slots) = table.get_mut(&self.unit) {
            slots.retain(|s| s.token != self.token);
            if slots.is_empty() {
                table.remove(&self.unit);
            }
        }
    }
}
