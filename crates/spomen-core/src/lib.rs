//! # Spomen Core
//!
//! Associative memory and curiosity subsystem for AI agents.
//!
//! Spomen stores what an agent learns as a temporal knowledge graph split
//! into two strictly isolated memory spaces, retrieves associations by
//! spreading activation, erodes unused links through a nightly
//! consolidation pass, and turns detected uncertainty into rate-limited
//! clarification questions.
//!
//! ## Features
//!
//! - **Two-space graph store**: Personal and Work never mix; every call
//!   names its space explicitly
//! - **Spreading activation**: deterministic, decay-attenuated graph walk
//!   with sum-capped activation levels
//! - **Consolidation**: reinforce co-fired edges, decay the rest, prune the
//!   weak, all idempotently
//! - **Curiosity**: pure uncertainty detectors feeding a per-conversation
//!   question queue with delivery caps, cooldowns, and TTL expiry
//! - **Snapshots**: checksummed atomic persistence of graph and rate state
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use spomen_core::{
//!     AssociativeMemory, MemoryConfig, MemoryEdge, MemoryNode, MemorySpace, NodeKind,
//! };
//!
//! let memory = AssociativeMemory::new(MemoryConfig::default())?;
//! let now = 1_700_000_000;
//!
//! memory.upsert_node(MemoryNode::new(
//!     "PRD", MemorySpace::Work, NodeKind::Entity, "quarterly PRD review", now,
//! ));
//! memory.upsert_node(MemoryNode::new(
//!     "CPU bottleneck", MemorySpace::Work, NodeKind::Fact, "profiling result", now,
//! ));
//! memory.upsert_edge(MemoryEdge::new(
//!     "PRD", "CPU bottleneck", MemorySpace::Work, "observed_with", 0.8, now,
//! )?)?;
//!
//! let outcome = memory.recall(MemorySpace::Work, &["PRD"]);
//! for hit in &outcome.ranked {
//!     println!("{} {:.2}", hit.node.id(), hit.activation);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
// Numeric casts here feed f32/f64 scoring math (counts, timestamps) or
// shard/offset indexing; prefer local try_from where an overflow would be a
// real bug.
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]

pub mod activation;
pub mod config;
pub mod consolidation;
pub mod curiosity;
pub mod error;
pub mod graph;
pub mod memory;
pub mod storage;

mod text;

#[cfg(test)]
mod config_tests;

pub use activation::{
    spread, ActivatedNode, ActivationOutcome, TriggerDecision, TriggerPolicy, TriggerReason,
};
pub use config::{
    ActivationConfig, ConfigError, ConsolidationConfig, CuriosityConfig, MemoryConfig,
    TriggerConfig,
};
pub use consolidation::{ConsolidationReport, Consolidator, ReinforcementLog};
pub use curiosity::{
    ClarificationKind, ConversationRateState, OfferOutcome, Question, QuestionQueue,
    QuestionStatus, QueueStats, RejectReason, Signal, Slot, UncertaintyReason, UncertaintyScore,
    UncertaintyScorer,
};
pub use error::{Error, Result};
pub use graph::{
    DecayProfile, EdgeKey, GraphStore, MemoryEdge, MemoryNode, MemorySpace, NodeKind,
};
pub use memory::AssociativeMemory;
pub use storage::{MemoryState, SnapshotError};
