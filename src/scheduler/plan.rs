//! # Execution plan: phases grouped into ordered stages.
//!
//! A plan is the ordered list of stages derived from unit descriptors:
//! units are grouped by their phase's rank, ranks run strictly in sequence,
//! and every unit inside one stage is eligible to run concurrently.
//! Dependency edges need no dynamic resolution here — registration already
//! guarantees each dependency lives in a strictly earlier rank.
//!
//! ```text
//! stage 0 (rank 0): [foundation units]
//! stage 1 (rank 1): [market | technical | sentiment units, interleaved]
//! stage 2 (rank 2): [synthesis units]
//! stage 3 (rank 3): [execution units]
//! ```
//!
//! Unit ids within a stage are ordered by priority then id — the stable
//! order in which workers are spawned (completion order still varies with
//! concurrency).

use std::collections::BTreeMap;

use crate::engines::{EngineDescriptor, Phase};

/// One stage of the plan: all units sharing a phase rank.
#[derive(Clone, Debug)]
pub struct PlanStage {
    /// Phase rank shared by every unit in this stage.
    pub rank: u8,
    /// Phases contributing units to this stage.
    pub phases: Vec<Phase>,
    /// Unit ids, sorted by priority then id.
    pub units: Vec<String>,
}

/// Ordered list of stages for one run.
#[derive(Clone, Debug, Default)]
pub struct ExecutionPlan {
    stages: Vec<PlanStage>,
}

impl ExecutionPlan {
    /// Builds a plan from descriptors (already sorted by priority/id by the
    /// registry; the grouping preserves that order within each stage).
    pub fn build(descriptors: &[EngineDescriptor]) -> Self {
        let mut by_rank: BTreeMap<u8, PlanStage> = BTreeMap::new();

        for d in descriptors {
            let rank = d.phase.rank();
            let stage = by_rank.entry(rank).or_insert_with(|| PlanStage {
                rank,
                phases: Vec::new(),
                units: Vec::new(),
            });
            if !stage.phases.contains(&d.phase) {
                stage.phases.push(d.phase);
            }
            stage.units.push(d.id.clone());
        }

        Self {
            stages: by_rank.into_values().collect(),
        }
    }

    /// The stages in execution order.
    pub fn stages(&self) -> &[PlanStage] {
        &self.stages
    }

    /// True when the plan contains no units.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Total number of units across all stages.
    pub fn unit_count(&self) -> usize {
        self.stages.iter().map(|s| s.units.len()).sum()
    }
}
