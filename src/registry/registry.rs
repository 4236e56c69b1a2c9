//! # EngineRegistry: validated table of computation units.
//!
//! The registry owns the [`EngineDescriptor`]s and the per-unit
//! [`EngineRunner`]s built from them. Registration validates the structural
//! invariants before committing anything:
//!
//! - descriptor id matches the engine's own id;
//! - declared dependency edges stay acyclic (DFS with a visiting marker,
//!   rejected with the full cycle path);
//! - every resolvable dependency lives in a strictly earlier phase — checked
//!   in both directions, so a registration that would break an existing
//!   dependent's ordering is rejected too.
//!
//! Dependencies on not-yet-registered ids are allowed (forward declaration);
//! their phase check runs when the missing id registers.
//!
//! ## Rules
//! - Registration is idempotent by id: last writer wins, replacing the
//!   previous runner (and its cache/state) wholesale.
//! - Unregistration drops the runner; executions already in flight hold
//!   their own `Arc` and finish undisturbed, but the unit disappears from
//!   subsequent plans.
//! - Queries return descriptors sorted by priority, ties broken by id.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::config::EngineConfig;
use crate::engines::{EngineDescriptor, EngineRef, Phase};
use crate::error::RegistryError;
use crate::events::{Bus, Event, EventKind};
use crate::registry::graph::find_cycle;
use crate::runner::EngineRunner;

/// One registered unit: metadata plus its resilient executor.
struct RegisteredEngine {
    descriptor: EngineDescriptor,
    runner: Arc<EngineRunner>,
}

/// Filter for [`EngineRegistry::query`]. Empty filter matches everything.
#[derive(Clone, Debug, Default)]
pub struct QueryFilter {
    phase: Option<Phase>,
    tag: Option<String>,
}

impl QueryFilter {
    /// Matches every unit.
    pub fn all() -> Self {
        Self::default()
    }

    /// Restricts matches to one phase.
    pub fn with_phase(mut self, phase: Phase) -> Self {
        self.phase = Some(phase);
        self
    }

    /// Restricts matches to units carrying the tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    fn matches(&self, descriptor: &EngineDescriptor) -> bool {
        if let Some(phase) = self.phase {
            if descriptor.phase != phase {
                return false;
            }
        }
        if let Some(tag) = &self.tag {
            if !descriptor.has_tag(tag) {
                return false;
            }
        }
        true
    }
}

/// Validated, explicitly constructed unit table.
pub struct EngineRegistry {
    units: RwLock<HashMap<String, RegisteredEngine>>,
    bus: Bus,
    defaults: EngineConfig,
}

impl EngineRegistry {
    /// Creates a registry publishing to `bus`, with `defaults` applied to
    /// units whose descriptor carries no config override.
    pub fn new(bus: Bus, defaults: EngineConfig) -> Arc<Self> {
        Arc::new(Self {
            units: RwLock::new(HashMap::new()),
            bus,
            defaults,
        })
    }

    /// Registers (or replaces) a unit after validating the structural
    /// invariants. Nothing is committed on rejection.
    pub async fn register(
        &self,
        engine: EngineRef,
        descriptor: EngineDescriptor,
    ) -> Result<(), RegistryError> {
        if engine.id() != descriptor.id {
            return Err(RegistryError::IdMismatch {
                descriptor: descriptor.id,
                engine: engine.id().to_string(),
            });
        }

        let mut units = self.units.write().await;

        // Cycle check over the prospective edge set (current table with this
        // descriptor inserted/replaced).
        let mut edges: BTreeMap<String, BTreeSet<String>> = units
            .values()
            .map(|u| (u.descriptor.id.clone(), u.descriptor.dependencies.clone()))
            .collect();
        edges.insert(descriptor.id.clone(), descriptor.dependencies.clone());
        if let Some(cycle) = find_cycle(&edges) {
            return Err(RegistryError::DependencyCycle { cycle });
        }

        // Phase ordering, forward direction: every resolvable dependency must
        // run strictly earlier.
        for dep in &descriptor.dependencies {
            let dep_phase = if *dep == descriptor.id {
                Some(descriptor.phase)
            } else {
                units.get(dep).map(|u| u.descriptor.phase)
            };
            if let Some(dep_phase) = dep_phase {
                if !dep_phase.precedes(descriptor.phase) {
                    return Err(RegistryError::PhaseOrder {
                        unit: descriptor.id.clone(),
                        unit_phase: descriptor.phase,
                        dependency: dep.clone(),
                        dependency_phase: dep_phase,
                    });
                }
            }
        }

        // Reverse direction: units already depending on this id (forward
        // declarations) must still see it in an earlier phase.
        for unit in units.values() {
            if unit.descriptor.id != descriptor.id
                && unit.descriptor.dependencies.contains(&descriptor.id)
                && !descriptor.phase.precedes(unit.descriptor.phase)
            {
                return Err(RegistryError::PhaseOrder {
                    unit: unit.descriptor.id.clone(),
                    unit_phase: unit.descriptor.phase,
                    dependency: descriptor.id.clone(),
                    dependency_phase: descriptor.phase,
                });
            }
        }

        let cfg = descriptor
            .config
            .clone()
            .unwrap_or_else(|| self.defaults.clone());
        let runner = Arc::new(EngineRunner::new(engine, cfg, self.bus.clone()));

        let id = descriptor.id.clone();
        let phase = descriptor.phase;
        units.insert(id.clone(), RegisteredEngine { descriptor, runner });
        self.bus.publish(
            Event::new(EventKind::EngineRegistered)
                .with_engine(id)
                .with_phase(phase),
        );
        Ok(())
    }

    /// Removes a unit. Returns `true` when it was present. Idempotent.
    pub async fn unregister(&self, id: &str) -> bool {
        let removed = self.units.write().await.remove(id).is_some();
        if removed {
            self.bus
                .publish(Event::new(EventKind::EngineUnregistered).with_engine(id));
        }
        removed
    }

    /// Returns the descriptor for a unit id.
    pub async fn get(&self, id: &str) -> Option<EngineDescriptor> {
        self.units
            .read()
            .await
            .get(id)
            .map(|u| u.descriptor.clone())
    }

    /// Returns the runner for a unit id (orchestrator internal).
    pub(crate) async fn runner(&self, id: &str) -> Option<Arc<EngineRunner>> {
        self.units.read().await.get(id).map(|u| Arc::clone(&u.runner))
    }

    /// Returns descriptors matching the filter, sorted by priority then id.
    pub async fn query(&self, filter: &QueryFilter) -> Vec<EngineDescriptor> {
        let units = self.units.read().await;
        let mut out: Vec<EngineDescriptor> = units
            .values()
            .filter(|u| filter.matches(&u.descriptor))
            .map(|u| u.descriptor.clone())
            .collect();
        sort_descriptors(&mut out);
        out
    }

    /// Returns every descriptor, sorted by priority then id.
    pub async fn all_descriptors(&self) -> Vec<EngineDescriptor> {
        self.query(&QueryFilter::all()).await
    }

    /// Number of registered units.
    pub async fn len(&self) -> usize {
        self.units.read().await.len()
    }

    /// True when no units are registered.
    pub async fn is_empty(&self) -> bool {
        self.units.read().await.is_empty()
    }
}

/// Total, stable order: priority ascending, ties broken by id.
fn sort_descriptors(descriptors: &mut [EngineDescriptor]) {
    descriptors.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));
}
