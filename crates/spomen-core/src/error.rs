//! Error types for Spomen.
//!
//! This module provides a unified error type for all memory operations.
//! Error codes follow the pattern `SPOMEN-XXX` for easy debugging.

use thiserror::Error;

use crate::config::ConfigError;
use crate::graph::MemorySpace;
use crate::storage::SnapshotError;

/// Result type alias for Spomen operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in memory operations.
///
/// A rejected question offer is *not* an error (see
/// [`crate::curiosity::OfferOutcome`]); rejection is an expected outcome of
/// the admission policy. Likewise an empty recall result is a valid value,
/// not an error.
#[derive(Error, Debug)]
pub enum Error {
    /// Cross-space access attempt (SPOMEN-001).
    ///
    /// The node exists, but in a different memory space than the one the
    /// caller asked for. Always a caller bug; never silently corrected.
    #[error("[SPOMEN-001] Node '{id}' belongs to the {actual} space, not {requested}")]
    SpaceMismatch {
        /// Node id the caller asked for.
        id: String,
        /// Space the caller passed.
        requested: MemorySpace,
        /// Space the node is actually stored in.
        actual: MemorySpace,
    },

    /// Node not found in any space (SPOMEN-002).
    #[error("[SPOMEN-002] Node '{0}' not found")]
    NodeNotFound(String),

    /// Edge endpoint missing from the edge's space (SPOMEN-003).
    // `from`/`to` rather than `source`: thiserror reserves a field named
    // `source` for the error cause.
    #[error("[SPOMEN-003] Edge '{from}' -> '{to}' references missing node '{missing}'")]
    EdgeEndpointMissing {
        /// Edge source id.
        from: String,
        /// Edge target id.
        to: String,
        /// Whichever endpoint was absent.
        missing: String,
    },

    /// Edge weight outside the unit interval (SPOMEN-004).
    #[error("[SPOMEN-004] Edge weight {0} outside [0.0, 1.0]")]
    InvalidWeight(f32),

    /// Configuration error (SPOMEN-005).
    ///
    /// Raised at construction time only; a validated configuration never
    /// fails at query time.
    #[error("[SPOMEN-005] Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Snapshot error (SPOMEN-006).
    #[error("[SPOMEN-006] Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    /// IO error (SPOMEN-007).
    #[error("[SPOMEN-007] IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns the error code (e.g., "SPOMEN-001").
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::SpaceMismatch { .. } => "SPOMEN-001",
            Self::NodeNotFound(_) => "SPOMEN-002",
            Self::EdgeEndpointMissing { .. } => "SPOMEN-003",
            Self::InvalidWeight(_) => "SPOMEN-004",
            Self::Config(_) => "SPOMEN-005",
            Self::Snapshot(_) => "SPOMEN-006",
            Self::Io(_) => "SPOMEN-007",
        }
    }
}
