//! # Unit metadata: phases and descriptors.
//!
//! [`Phase`] names a stage of the fixed execution sequence; [`EngineDescriptor`]
//! carries everything the registry needs to know about a unit besides its
//! compute function: identity, priority, phase, declared dependencies, tags,
//! and an optional per-unit configuration override.
//!
//! ## Phase sequence
//! ```text
//! rank 0: Foundation                      (base data everything builds on)
//! rank 1: Market | Technical | Sentiment  (analysis groups, interleaved)
//! rank 2: Synthesis                       (combines group outputs)
//! rank 3: Execution                       (actionable output)
//! ```
//! Phases with the same rank run together; ranks run strictly in sequence.
//! A dependency must live in a strictly earlier rank than its dependent —
//! validated at registration, not resolved dynamically.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;

/// Named stage of the execution plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Base inputs computed before any analysis.
    Foundation,
    /// Market-structure analysis group.
    Market,
    /// Technical-indicator analysis group.
    Technical,
    /// Sentiment/flow analysis group.
    Sentiment,
    /// Combines the analysis groups into composite readings.
    Synthesis,
    /// Final actionable output.
    Execution,
}

impl Phase {
    /// All phases in plan order.
    pub const ALL: [Phase; 6] = [
        Phase::Foundation,
        Phase::Market,
        Phase::Technical,
        Phase::Sentiment,
        Phase::Synthesis,
        Phase::Execution,
    ];

    /// Stage rank. Phases sharing a rank run interleaved; ranks run in order.
    pub fn rank(self) -> u8 {
        match self {
            Phase::Foundation => 0,
            Phase::Market | Phase::Technical | Phase::Sentiment => 1,
            Phase::Synthesis => 2,
            Phase::Execution => 3,
        }
    }

    /// True when `self` runs in a strictly earlier stage than `other`.
    pub fn precedes(self, other: Phase) -> bool {
        self.rank() < other.rank()
    }

    /// Returns a short stable label for logs and events.
    pub fn as_label(self) -> &'static str {
        match self {
            Phase::Foundation => "foundation",
            Phase::Market => "market",
            Phase::Technical => "technical",
            Phase::Sentiment => "sentiment",
            Phase::Synthesis => "synthesis",
            Phase::Execution => "execution",
        }
    }
}

/// Registration metadata for one unit.
///
/// Built fluently:
/// ```rust
/// use signalvisor::{EngineDescriptor, Phase};
///
/// let desc = EngineDescriptor::new("trend-composite", Phase::Synthesis)
///     .with_name("Trend composite")
///     .with_priority(10)
///     .with_dependency("momentum")
///     .with_dependency("vix-level")
///     .with_tag("trend");
/// assert_eq!(desc.dependencies.len(), 2);
/// ```
#[derive(Clone, Debug)]
pub struct EngineDescriptor {
    /// Stable unit id; must match the engine's own id at registration.
    pub id: String,
    /// Human-readable display name (defaults to the id).
    pub name: String,
    /// Execution ordering weight; lower runs first, ties broken by id.
    pub priority: u32,
    /// Stage this unit runs in.
    pub phase: Phase,
    /// Ids of units that must complete in an earlier stage.
    pub dependencies: BTreeSet<String>,
    /// Free-form labels for filtered queries.
    pub tags: Vec<String>,
    /// Per-unit configuration override; `None` inherits orchestrator defaults.
    pub config: Option<EngineConfig>,
}

impl EngineDescriptor {
    /// Creates a descriptor with default priority (100) and no dependencies.
    pub fn new(id: impl Into<String>, phase: Phase) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            priority: 100,
            phase,
            dependencies: BTreeSet::new(),
            tags: Vec::new(),
            config: None,
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the priority (lower runs first).
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    /// Declares a dependency on another unit id.
    pub fn with_dependency(mut self, id: impl Into<String>) -> Self {
        self.dependencies.insert(id.into());
        self
    }

    /// Adds a query tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Overrides the orchestrator-default [`EngineConfig`] for this unit.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// True when the descriptor carries the given tag.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_order_matches_plan_sequence() {
        assert!(Phase::Foundation.precedes(Phase::Market));
        assert!(Phase::Market.precedes(Phase::Synthesis));
        assert!(Phase::Synthesis.precedes(Phase::Execution));
        // Analysis groups share a rank: neither precedes the other.
        assert!(!Phase::Market.precedes(Phase::Technical));
        assert!(!Phase::Technical.precedes(Phase::Market));
    }

    #[test]
    fn descriptor_defaults() {
        let d = EngineDescriptor::new("breadth", Phase::Market);
        assert_eq!(d.name, "breadth");
        assert_eq!(d.priority, 100);
        assert!(d.dependencies.is_empty());
        assert!(d.config.is_none());
    }
}
