//! Memory space isolation boundary.

use serde::{Deserialize, Serialize};

/// Isolation boundary for all nodes, edges and queries.
///
/// Every stored item and every call carries exactly one space. No edge,
/// traversal or result ever crosses spaces; the space is always an explicit
/// parameter, never an ambient "current mode".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemorySpace {
    /// Private life: people, preferences, household facts.
    Personal,
    /// Professional life: systems, tickets, incidents, colleagues.
    Work,
}

impl MemorySpace {
    /// Both spaces, in stable order. Used by maintenance sweeps.
    pub const ALL: [Self; 2] = [Self::Personal, Self::Work];

    /// Stable index for per-space storage arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Personal => 0,
            Self::Work => 1,
        }
    }

    /// The opposite space.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::Personal => Self::Work,
            Self::Work => Self::Personal,
        }
    }

    /// Lowercase name, matching the serialized form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Personal => "personal",
            Self::Work => "work",
        }
    }
}

impl std::fmt::Display for MemorySpace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
