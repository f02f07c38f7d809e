//! Node types for the associative memory graph.

use serde::{Deserialize, Serialize};

use super::space::MemorySpace;

/// Semantic kind of a memory node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// A named thing: a person, a system, a project.
    Entity,
    /// A dated occurrence: a conversation, an incident, an event.
    Episode,
    /// A standalone assertion about the world.
    Fact,
}

impl NodeKind {
    /// Decay profile newly created nodes of this kind start with.
    ///
    /// Entities outlive the episodes that mention them; episodes fade
    /// fastest unless reinforced.
    #[must_use]
    pub const fn default_profile(self) -> DecayProfile {
        match self {
            Self::Entity => DecayProfile::Durable,
            Self::Fact => DecayProfile::Standard,
            Self::Episode => DecayProfile::Ephemeral,
        }
    }
}

/// Baseline decay behavior for associations leaving a node.
///
/// The consolidation pass scales elapsed time by this profile before
/// applying the decay exponent, so durable knowledge erodes slower than
/// one-off episodes under the same configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecayProfile {
    /// Half-speed decay.
    Durable,
    /// Unscaled decay.
    #[default]
    Standard,
    /// Double-speed decay.
    Ephemeral,
}

impl DecayProfile {
    /// Multiplier applied to elapsed days during consolidation.
    #[must_use]
    pub const fn elapsed_scale(self) -> f32 {
        match self {
            Self::Durable => 0.5,
            Self::Standard => 1.0,
            Self::Ephemeral => 2.0,
        }
    }
}

/// A node in the memory graph.
///
/// Identity is the pair (id, space): the same id may exist independently in
/// both spaces and the two copies never interact. The id and space of a
/// stored node are immutable; upserts only refresh the mutable fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryNode {
    id: String,
    space: MemorySpace,
    kind: NodeKind,
    summary: String,
    created_at: i64,
    last_accessed_at: i64,
    decay_profile: DecayProfile,
}

impl MemoryNode {
    /// Creates a node with `created_at` and `last_accessed_at` set to `now`
    /// and the kind's default decay profile.
    pub fn new(
        id: impl Into<String>,
        space: MemorySpace,
        kind: NodeKind,
        summary: impl Into<String>,
        now: i64,
    ) -> Self {
        Self {
            id: id.into(),
            space,
            kind,
            summary: summary.into(),
            created_at: now,
            last_accessed_at: now,
            decay_profile: kind.default_profile(),
        }
    }

    /// Overrides the decay profile.
    #[must_use]
    pub fn with_decay_profile(mut self, profile: DecayProfile) -> Self {
        self.decay_profile = profile;
        self
    }

    /// Returns the node id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the memory space this node lives in.
    #[must_use]
    pub const fn space(&self) -> MemorySpace {
        self.space
    }

    /// Returns the semantic kind.
    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Returns the content summary.
    #[must_use]
    pub fn summary(&self) -> &str {
        &self.summary
    }

    /// Returns the creation timestamp (unix seconds).
    #[must_use]
    pub const fn created_at(&self) -> i64 {
        self.created_at
    }

    /// Returns the last-accessed timestamp (unix seconds).
    #[must_use]
    pub const fn last_accessed_at(&self) -> i64 {
        self.last_accessed_at
    }

    /// Returns the decay profile.
    #[must_use]
    pub const fn decay_profile(&self) -> DecayProfile {
        self.decay_profile
    }

    /// Marks the node as accessed at `now`. Timestamps never move backwards.
    pub fn touch(&mut self, now: i64) {
        self.last_accessed_at = self.last_accessed_at.max(now);
    }

    /// Folds a re-upsert of the same (id, space) into this node.
    ///
    /// Mutable fields take the incoming value, `last_accessed_at` keeps the
    /// most recent of the two, `created_at` keeps the original.
    pub(crate) fn merge_upsert(&mut self, incoming: Self) {
        debug_assert_eq!(self.id, incoming.id);
        debug_assert_eq!(self.space, incoming.space);
        self.kind = incoming.kind;
        self.summary = incoming.summary;
        self.decay_profile = incoming.decay_profile;
        self.last_accessed_at = self.last_accessed_at.max(incoming.last_accessed_at);
    }
}
