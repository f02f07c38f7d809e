//! Two-space associative graph: nodes, weighted edges, sharded store.
//!
//! # Features
//!
//! - Strict space isolation with `SpaceMismatch` on cross-space access
//! - Idempotent upserts keyed by id (nodes) and (source, target, relation)
//!   (edges)
//! - Per-id serialization of concurrent mutations, no global lock
//! - Deterministic adjacency and export ordering

mod edge;
mod node;
mod space;
mod store;

#[cfg(test)]
mod node_tests;

pub use edge::{EdgeKey, MemoryEdge};
pub use node::{DecayProfile, MemoryNode, NodeKind};
pub use space::MemorySpace;
pub use store::{GraphStore, DEFAULT_NUM_SHARDS};
