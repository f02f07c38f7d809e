//! Edge types for the associative memory graph.

use serde::{Deserialize, Serialize};

use super::space::MemorySpace;
use crate::error::{Error, Result};

const SECONDS_PER_DAY: f32 = 86_400.0;

/// Identity of an edge within a space: (source, target, relation).
///
/// Re-upserting the same key updates the stored edge instead of creating a
/// parallel one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeKey {
    /// Source node id.
    pub source: String,
    /// Target node id.
    pub target: String,
    /// Relation label.
    pub relation: String,
}

impl EdgeKey {
    /// Builds a key from its parts.
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        relation: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            relation: relation.into(),
        }
    }
}

impl std::fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -[{}]-> {}", self.source, self.relation, self.target)
    }
}

/// A directed, weighted association between two nodes of the same space.
///
/// Weight lives in [0,1] and represents association strength. Only the
/// consolidation pass and the observation write path may change it;
/// retrieval never does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEdge {
    source: String,
    target: String,
    space: MemorySpace,
    relation: String,
    weight: f32,
    created_at: i64,
    last_reinforced_at: i64,
}

impl MemoryEdge {
    /// Creates an edge, rejecting weights outside [0,1].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidWeight`] for out-of-range or non-finite
    /// weights. Validation happens here so downstream propagation math can
    /// assume well-formed weights.
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        space: MemorySpace,
        relation: impl Into<String>,
        weight: f32,
        now: i64,
    ) -> Result<Self> {
        if !weight.is_finite() || !(0.0..=1.0).contains(&weight) {
            return Err(Error::InvalidWeight(weight));
        }
        Ok(Self {
            source: source.into(),
            target: target.into(),
            space,
            relation: relation.into(),
            weight,
            created_at: now,
            last_reinforced_at: now,
        })
    }

    /// Returns this edge's identity key.
    #[must_use]
    pub fn key(&self) -> EdgeKey {
        EdgeKey::new(self.source.clone(), self.target.clone(), self.relation.clone())
    }

    /// Returns the source node id.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns the target node id.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Returns the memory space.
    #[must_use]
    pub const fn space(&self) -> MemorySpace {
        self.space
    }

    /// Returns the relation label.
    #[must_use]
    pub fn relation(&self) -> &str {
        &self.relation
    }

    /// Returns the association strength in [0,1].
    #[must_use]
    pub const fn weight(&self) -> f32 {
        self.weight
    }

    /// Returns the creation timestamp (unix seconds).
    #[must_use]
    pub const fn created_at(&self) -> i64 {
        self.created_at
    }

    /// Returns the timestamp the current weight is anchored at.
    ///
    /// Set on creation and on reinforcement; advanced by each consolidation
    /// pass after decaying, so elapsed time is never counted twice.
    #[must_use]
    pub const fn last_reinforced_at(&self) -> i64 {
        self.last_reinforced_at
    }

    /// Days elapsed since the weight anchor, never negative.
    #[must_use]
    pub fn elapsed_days(&self, now: i64) -> f32 {
        (now - self.last_reinforced_at).max(0) as f32 / SECONDS_PER_DAY
    }

    /// Strengthens the association and refreshes the weight anchor.
    ///
    /// Capped additions are commutative: two reinforcements in either order
    /// land on the same weight.
    pub fn reinforce(&mut self, delta: f32, now: i64) {
        self.weight = (self.weight + delta).min(1.0);
        self.last_reinforced_at = self.last_reinforced_at.max(now);
    }

    /// Applies exponential decay for the elapsed interval and re-anchors.
    ///
    /// `elapsed_scale` comes from the source node's decay profile. Because
    /// the anchor advances to `now`, an immediate second pass sees zero
    /// elapsed time and is a no-op, and split passes compose to the same
    /// weight as one combined pass.
    pub fn apply_decay(&mut self, decay_rate: f32, elapsed_scale: f32, now: i64) {
        let days = self.elapsed_days(now) * elapsed_scale;
        if days > 0.0 {
            self.weight *= decay_rate.powf(days);
        }
        self.last_reinforced_at = self.last_reinforced_at.max(now);
    }

    /// Folds a re-upsert of the same key into this edge.
    ///
    /// Weight takes the stronger of the two observations (commutative),
    /// anchors keep the most recent timestamp, `created_at` keeps the
    /// original.
    pub(crate) fn merge_upsert(&mut self, incoming: Self) {
        debug_assert_eq!(self.key(), incoming.key());
        debug_assert_eq!(self.space, incoming.space);
        self.weight = self.weight.max(incoming.weight);
        self.last_reinforced_at = self.last_reinforced_at.max(incoming.last_reinforced_at);
    }
}
