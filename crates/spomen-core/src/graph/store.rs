//! Space-scoped graph storage with sharded concurrent access.
//!
//! Nodes live in one concurrent map per space; edges are distributed over
//! lock shards by node id, indexed in both directions (outgoing by source,
//! incoming by target). Mutations to the same id serialize on its map entry
//! or shard; there is no lock spanning both spaces.
//!
//! # Lock Ordering
//!
//! When an edge operation needs two shards (source and target hash apart),
//! locks are always acquired in ascending shard index order to prevent
//! deadlocks. Shard locks are never held while acquiring a node-map guard,
//! so node-then-shard acquisitions cannot form a cycle.

use std::hash::{Hash, Hasher};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHasher};
use tracing::warn;

use super::edge::{EdgeKey, MemoryEdge};
use super::node::MemoryNode;
use super::space::MemorySpace;
use crate::error::{Error, Result};

/// Default number of edge shards per space.
pub const DEFAULT_NUM_SHARDS: usize = 16;

#[derive(Default)]
struct EdgeShard {
    /// Outgoing edges, keyed by source id (sources hashed to this shard).
    outgoing: FxHashMap<String, Vec<MemoryEdge>>,
    /// Incoming edge keys, keyed by target id (targets hashed to this shard).
    incoming: FxHashMap<String, Vec<EdgeKey>>,
}

struct SpaceStore {
    nodes: DashMap<String, MemoryNode>,
    edge_shards: Vec<RwLock<EdgeShard>>,
}

impl SpaceStore {
    fn new(num_shards: usize) -> Self {
        Self {
            nodes: DashMap::new(),
            edge_shards: (0..num_shards).map(|_| RwLock::new(EdgeShard::default())).collect(),
        }
    }
}

/// Persistent node/edge storage for both memory spaces.
///
/// All operations are space-scoped. Asking for a node through the wrong
/// space is a [`Error::SpaceMismatch`], never a silent miss, so callers
/// cannot discover cross-space data by accident.
pub struct GraphStore {
    spaces: [SpaceStore; 2],
    num_shards: usize,
}

impl GraphStore {
    /// Creates an empty store with the default shard count.
    #[must_use]
    pub fn new() -> Self {
        Self::with_shards(DEFAULT_NUM_SHARDS)
    }

    /// Creates an empty store with a specific shard count per space.
    ///
    /// # Panics
    ///
    /// Panics if `num_shards` is 0.
    #[must_use]
    pub fn with_shards(num_shards: usize) -> Self {
        assert!(num_shards > 0, "num_shards must be at least 1");
        Self {
            spaces: [SpaceStore::new(num_shards), SpaceStore::new(num_shards)],
            num_shards,
        }
    }

    fn space_store(&self, space: MemorySpace) -> &SpaceStore {
        &self.spaces[space.index()]
    }

    fn shard_of(&self, id: &str) -> usize {
        let mut hasher = FxHasher::default();
        id.hash(&mut hasher);
        (hasher.finish() as usize) % self.num_shards
    }

    /// Inserts a node, or refreshes the mutable fields of an existing one.
    ///
    /// Identity is (id, space): the same id may exist independently in both
    /// spaces. The entry lock serializes concurrent upserts to one id.
    pub fn upsert_node(&self, node: MemoryNode) {
        let store = self.space_store(node.space());
        match store.nodes.entry(node.id().to_owned()) {
            Entry::Occupied(mut occupied) => occupied.get_mut().merge_upsert(node),
            Entry::Vacant(vacant) => {
                vacant.insert(node);
            }
        }
    }

    /// Returns a node by id within a space.
    ///
    /// # Errors
    ///
    /// [`Error::SpaceMismatch`] if the id exists only in the other space,
    /// [`Error::NodeNotFound`] if it exists nowhere.
    pub fn get(&self, id: &str, space: MemorySpace) -> Result<MemoryNode> {
        if let Some(node) = self.space_store(space).nodes.get(id) {
            return Ok(node.clone());
        }
        if self.space_store(space.other()).nodes.contains_key(id) {
            return Err(Error::SpaceMismatch {
                id: id.to_owned(),
                requested: space,
                actual: space.other(),
            });
        }
        Err(Error::NodeNotFound(id.to_owned()))
    }

    /// Looks a node up strictly within one space, without the cross-space
    /// probe. Retrieval paths use this so isolation failures degrade to
    /// "absent" instead of disclosing the other space.
    pub(crate) fn peek(&self, id: &str, space: MemorySpace) -> Option<MemoryNode> {
        self.space_store(space).nodes.get(id).map(|node| node.clone())
    }

    /// True if the id exists in the given space.
    #[must_use]
    pub fn contains(&self, id: &str, space: MemorySpace) -> bool {
        self.space_store(space).nodes.contains_key(id)
    }

    /// Inserts an edge, or folds it into the stored edge of the same
    /// (source, target, relation) key.
    ///
    /// # Errors
    ///
    /// [`Error::EdgeEndpointMissing`] if either endpoint is absent from the
    /// edge's space. An edge can therefore never span spaces.
    pub fn upsert_edge(&self, edge: MemoryEdge) -> Result<()> {
        let store = self.space_store(edge.space());
        // Existence checks release their map guards before any shard lock.
        let missing = if !store.nodes.contains_key(edge.source()) {
            Some(edge.source().to_owned())
        } else if !store.nodes.contains_key(edge.target()) {
            Some(edge.target().to_owned())
        } else {
            None
        };
        if let Some(missing) = missing {
            return Err(Error::EdgeEndpointMissing {
                from: edge.source().to_owned(),
                to: edge.target().to_owned(),
                missing,
            });
        }

        let key = edge.key();
        let source_shard = self.shard_of(edge.source());
        let target_shard = self.shard_of(edge.target());

        if source_shard == target_shard {
            let mut guard = store.edge_shards[source_shard].write();
            Self::upsert_outgoing(&mut guard, edge);
            Self::index_incoming(&mut guard, key);
        } else {
            let (first, second) = if source_shard < target_shard {
                (source_shard, target_shard)
            } else {
                (target_shard, source_shard)
            };
            let mut first_guard = store.edge_shards[first].write();
            let mut second_guard = store.edge_shards[second].write();
            if source_shard < target_shard {
                Self::upsert_outgoing(&mut first_guard, edge);
                Self::index_incoming(&mut second_guard, key);
            } else {
                Self::upsert_outgoing(&mut second_guard, edge);
                Self::index_incoming(&mut first_guard, key);
            }
        }
        Ok(())
    }

    fn upsert_outgoing(shard: &mut EdgeShard, edge: MemoryEdge) {
        let key = edge.key();
        let slot = shard.outgoing.entry(edge.source().to_owned()).or_default();
        if let Some(existing) = slot.iter_mut().find(|e| e.key() == key) {
            existing.merge_upsert(edge);
        } else {
            slot.push(edge);
        }
    }

    fn index_incoming(shard: &mut EdgeShard, key: EdgeKey) {
        let slot = shard.incoming.entry(key.target.clone()).or_default();
        if !slot.contains(&key) {
            slot.push(key);
        }
    }

    /// Returns the outgoing edges of a node, sorted by (target, relation)
    /// for deterministic traversal order. Empty if the node has none.
    pub(crate) fn outgoing(&self, id: &str, space: MemorySpace) -> Vec<MemoryEdge> {
        let shard = self.space_store(space).edge_shards[self.shard_of(id)].read();
        let mut edges = shard.outgoing.get(id).cloned().unwrap_or_default();
        drop(shard);
        edges.sort_by(|a, b| a.target().cmp(b.target()).then_with(|| a.relation().cmp(b.relation())));
        edges
    }

    /// Returns each outgoing edge of a node together with its resolved
    /// target node, sorted by (target, relation).
    ///
    /// Dangling edges (target concurrently removed) are skipped with a
    /// warning rather than surfaced.
    ///
    /// # Errors
    ///
    /// Same space semantics as [`GraphStore::get`].
    pub fn neighbors(&self, id: &str, space: MemorySpace) -> Result<Vec<(MemoryEdge, MemoryNode)>> {
        // Validates existence and space before touching adjacency.
        let _ = self.get(id, space)?;
        let mut pairs = Vec::new();
        for edge in self.outgoing(id, space) {
            match self.peek(edge.target(), space) {
                Some(node) => pairs.push((edge, node)),
                None => {
                    warn!(
                        source = id,
                        target = edge.target(),
                        space = %space,
                        "skipping dangling edge during neighbor lookup"
                    );
                }
            }
        }
        Ok(pairs)
    }

    /// Number of edges touching a node (outgoing + incoming).
    #[must_use]
    pub fn degree(&self, id: &str, space: MemorySpace) -> usize {
        let store = self.space_store(space);
        let out = store.edge_shards[self.shard_of(id)]
            .read()
            .outgoing
            .get(id)
            .map_or(0, Vec::len);
        let inc = store.edge_shards[self.shard_of(id)]
            .read()
            .incoming
            .get(id)
            .map_or(0, Vec::len);
        out + inc
    }

    /// Marks the given nodes as accessed at `now`; the read path never does
    /// this implicitly. Unknown ids are skipped with a warning. Returns how
    /// many nodes were touched.
    pub fn touch<'a, I>(&self, space: MemorySpace, ids: I, now: i64) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        let store = self.space_store(space);
        let mut touched = 0;
        for id in ids {
            if let Some(mut node) = store.nodes.get_mut(id) {
                node.touch(now);
                touched += 1;
            } else {
                warn!(id, space = %space, "touch skipped unknown node");
            }
        }
        touched
    }

    /// Removes an edge unconditionally. Returns true if it existed.
    pub fn remove_edge(&self, space: MemorySpace, key: &EdgeKey) -> bool {
        self.remove_edge_inner(space, key, None)
    }

    /// Removes an edge only while its weight is still below `threshold`.
    ///
    /// The consolidation pass collects prune candidates without holding
    /// shard locks across phases; re-checking under the lock keeps a
    /// concurrently reinforced edge alive.
    pub(crate) fn remove_edge_below(
        &self,
        space: MemorySpace,
        key: &EdgeKey,
        threshold: f32,
    ) -> bool {
        self.remove_edge_inner(space, key, Some(threshold))
    }

    fn remove_edge_inner(&self, space: MemorySpace, key: &EdgeKey, below: Option<f32>) -> bool {
        let store = self.space_store(space);
        let source_shard = self.shard_of(&key.source);
        let target_shard = self.shard_of(&key.target);

        let removed = if source_shard == target_shard {
            let mut guard = store.edge_shards[source_shard].write();
            let removed = Self::remove_outgoing(&mut guard, key, below);
            if removed {
                Self::unindex_incoming(&mut guard, key);
            }
            removed
        } else {
            let (first, second) = if source_shard < target_shard {
                (source_shard, target_shard)
            } else {
                (target_shard, source_shard)
            };
            let mut first_guard = store.edge_shards[first].write();
            let mut second_guard = store.edge_shards[second].write();
            let (out_guard, in_guard) = if source_shard < target_shard {
                (&mut first_guard, &mut second_guard)
            } else {
                (&mut second_guard, &mut first_guard)
            };
            let removed = Self::remove_outgoing(out_guard, key, below);
            if removed {
                Self::unindex_incoming(in_guard, key);
            }
            removed
        };
        removed
    }

    fn remove_outgoing(shard: &mut EdgeShard, key: &EdgeKey, below: Option<f32>) -> bool {
        let Some(slot) = shard.outgoing.get_mut(&key.source) else {
            return false;
        };
        let Some(pos) = slot.iter().position(|e| &e.key() == key) else {
            return false;
        };
        if let Some(threshold) = below {
            if slot[pos].weight() >= threshold {
                return false;
            }
        }
        slot.remove(pos);
        if slot.is_empty() {
            shard.outgoing.remove(&key.source);
        }
        true
    }

    fn unindex_incoming(shard: &mut EdgeShard, key: &EdgeKey) {
        if let Some(slot) = shard.incoming.get_mut(&key.target) {
            slot.retain(|k| k != key);
            if slot.is_empty() {
                shard.incoming.remove(&key.target);
            }
        }
    }

    /// Removes a node whose degree is still below `min_degree`, purging any
    /// leftover edges touching it afterwards. Returns true on removal.
    pub(crate) fn remove_node_below_degree(
        &self,
        id: &str,
        space: MemorySpace,
        min_degree: usize,
    ) -> bool {
        let removed = self
            .space_store(space)
            .nodes
            .remove_if(id, |node_id, _| self.degree(node_id, space) < min_degree)
            .is_some();
        if removed {
            for key in self.edges_touching(id, space) {
                self.remove_edge(space, &key);
            }
        }
        removed
    }

    fn edges_touching(&self, id: &str, space: MemorySpace) -> Vec<EdgeKey> {
        let guard = self.space_store(space).edge_shards[self.shard_of(id)].read();
        let mut keys: Vec<EdgeKey> = guard
            .outgoing
            .get(id)
            .map(|edges| edges.iter().map(MemoryEdge::key).collect())
            .unwrap_or_default();
        if let Some(incoming) = guard.incoming.get(id) {
            keys.extend(incoming.iter().cloned());
        }
        keys
    }

    /// Applies `apply` to every edge of a space, one edge at a time under
    /// its shard's write lock. Returns the keys for which `apply` answered
    /// false (prune candidates); the edges themselves stay in place so a
    /// second phase can remove them under proper two-shard locking.
    pub(crate) fn update_edges<F>(&self, space: MemorySpace, mut apply: F) -> Vec<EdgeKey>
    where
        F: FnMut(&mut MemoryEdge) -> bool,
    {
        let store = self.space_store(space);
        let mut condemned = Vec::new();
        for shard in &store.edge_shards {
            let mut guard = shard.write();
            for edges in guard.outgoing.values_mut() {
                for edge in edges.iter_mut() {
                    if !apply(edge) {
                        condemned.push(edge.key());
                    }
                }
            }
        }
        condemned
    }

    /// All node ids of a space, sorted.
    #[must_use]
    pub fn node_ids(&self, space: MemorySpace) -> Vec<String> {
        let mut ids: Vec<String> = self
            .space_store(space)
            .nodes
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Number of nodes in a space.
    #[must_use]
    pub fn node_count(&self, space: MemorySpace) -> usize {
        self.space_store(space).nodes.len()
    }

    /// Number of edges in a space.
    #[must_use]
    pub fn edge_count(&self, space: MemorySpace) -> usize {
        self.space_store(space)
            .edge_shards
            .iter()
            .map(|shard| shard.read().outgoing.values().map(Vec::len).sum::<usize>())
            .sum()
    }

    /// Every node of both spaces, sorted by (space, id). Snapshot order is
    /// part of the on-disk determinism guarantee.
    #[must_use]
    pub fn export_nodes(&self) -> Vec<MemoryNode> {
        let mut nodes = Vec::new();
        for space in MemorySpace::ALL {
            for entry in self.space_store(space).nodes.iter() {
                nodes.push(entry.value().clone());
            }
        }
        nodes.sort_by(|a, b| {
            a.space()
                .index()
                .cmp(&b.space().index())
                .then_with(|| a.id().cmp(b.id()))
        });
        nodes
    }

    /// Every edge of both spaces, sorted by (space, key).
    #[must_use]
    pub fn export_edges(&self) -> Vec<MemoryEdge> {
        let mut edges = Vec::new();
        for space in MemorySpace::ALL {
            for shard in &self.space_store(space).edge_shards {
                let guard = shard.read();
                for slot in guard.outgoing.values() {
                    edges.extend(slot.iter().cloned());
                }
            }
        }
        edges.sort_by(|a, b| {
            a.space()
                .index()
                .cmp(&b.space().index())
                .then_with(|| a.key().cmp(&b.key()))
        });
        edges
    }

    /// Rebuilds a store from exported nodes and edges.
    ///
    /// Edges referencing absent nodes are dropped with a warning instead of
    /// failing the whole load; a truncated write should cost associations,
    /// not the graph.
    #[must_use]
    pub fn from_export(nodes: Vec<MemoryNode>, edges: Vec<MemoryEdge>) -> Self {
        let store = Self::new();
        for node in nodes {
            store.upsert_node(node);
        }
        for edge in edges {
            let key = edge.key();
            let space = edge.space();
            if let Err(err) = store.upsert_edge(edge) {
                warn!(edge = %key, space = %space, error = %err, "dropping edge during restore");
            }
        }
        store
    }
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new()
    }
}
