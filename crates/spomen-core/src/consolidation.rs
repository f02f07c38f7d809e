//! Consolidation: the nightly reinforce/decay/prune pass.
//!
//! Retrieval leaves traces (co-fired edges) in a [`ReinforcementLog`];
//! consolidation replays that log, then lets everything else erode. Per
//! edge, atomically: one reinforcement delta if the edge co-fired, then
//! exponential decay over the days since the edge's weight anchor, then a
//! prune check. Reinforcement runs first so a freshly strengthened edge is
//! not decayed in the same breath, and decay re-anchors the edge so elapsed
//! time is never counted twice: re-running a pass immediately is a no-op,
//! and an interrupted pass resumes safely on the next schedule.

use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::{debug, info};

use crate::activation::ActivationOutcome;
use crate::config::ConsolidationConfig;
use crate::graph::{EdgeKey, GraphStore, MemorySpace};

const SECONDS_PER_DAY: i64 = 86_400;

/// Record of which edges co-fired in recall results since the last pass.
///
/// Set semantics per pass: an edge is reinforced once however many result
/// sets it appeared in; occurrence counts are kept for reporting only.
#[derive(Debug, Default)]
pub struct ReinforcementLog {
    counts: FxHashMap<EdgeKey, u32>,
}

impl ReinforcementLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a single co-fired edge.
    pub fn record(&mut self, key: EdgeKey) {
        *self.counts.entry(key).or_insert(0) += 1;
    }

    /// Records every co-fired edge of a recall outcome.
    pub fn record_outcome(&mut self, outcome: &ActivationOutcome) {
        for key in &outcome.co_fired {
            self.record(key.clone());
        }
    }

    /// True if the edge co-fired since the last drain.
    #[must_use]
    pub fn contains(&self, key: &EdgeKey) -> bool {
        self.counts.contains_key(key)
    }

    /// Number of distinct edges recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// True if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Clears the log after a completed pass.
    pub fn clear(&mut self) {
        self.counts.clear();
    }
}

/// What one consolidation pass did to a space.
#[derive(Debug, Clone, Serialize)]
pub struct ConsolidationReport {
    /// Space the pass ran over.
    pub space: MemorySpace,
    /// Edges visited.
    pub edges_seen: usize,
    /// Edges that received the reinforcement delta.
    pub reinforced: usize,
    /// Edges whose weight actually dropped.
    pub decayed: usize,
    /// Edges removed for falling below the prune threshold.
    pub pruned: usize,
    /// Orphaned nodes removed past the retention floor.
    pub nodes_removed: usize,
    /// Distinct co-fired edges in the drained log.
    pub log_entries: usize,
}

/// Runs consolidation passes over a [`GraphStore`].
///
/// Scheduling is the caller's concern; this type only mutates graph state
/// and never looks at questions or past recall results.
pub struct Consolidator {
    config: ConsolidationConfig,
}

impl Consolidator {
    /// Creates a consolidator from a validated configuration section.
    #[must_use]
    pub fn new(config: ConsolidationConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration in use.
    #[must_use]
    pub const fn config(&self) -> &ConsolidationConfig {
        &self.config
    }

    /// Consolidates one space at time `now`.
    ///
    /// Phases: (1) per edge under its shard lock, reinforce-if-co-fired then
    /// decay then mark for pruning; (2) remove marked edges, re-checking the
    /// threshold under the lock so a concurrently strengthened edge
    /// survives; (3) remove nodes left under the minimum degree, unless
    /// they were accessed within the retention floor.
    pub fn run(
        &self,
        store: &GraphStore,
        space: MemorySpace,
        log: &ReinforcementLog,
        now: i64,
    ) -> ConsolidationReport {
        // Decay speed depends on the source node's profile; snapshot the
        // scales up front so the edge closure touches no node locks.
        let mut scales: FxHashMap<String, f32> = FxHashMap::default();
        for id in store.node_ids(space) {
            if let Some(node) = store.peek(&id, space) {
                scales.insert(id, node.decay_profile().elapsed_scale());
            }
        }

        let mut edges_seen = 0usize;
        let mut reinforced = 0usize;
        let mut decayed = 0usize;
        let condemned = store.update_edges(space, |edge| {
            edges_seen += 1;
            if log.contains(&edge.key()) {
                edge.reinforce(self.config.reinforcement_delta, now);
                reinforced += 1;
            }
            let scale = scales.get(edge.source()).copied().unwrap_or(1.0);
            let before = edge.weight();
            edge.apply_decay(self.config.decay_rate, scale, now);
            if edge.weight() < before {
                decayed += 1;
            }
            edge.weight() >= self.config.prune_threshold
        });

        let mut pruned = 0usize;
        for key in &condemned {
            if store.remove_edge_below(space, key, self.config.prune_threshold) {
                debug!(edge = %key, space = %space, "pruned weakened association");
                pruned += 1;
            }
        }

        let cutoff = now - i64::from(self.config.retention_days) * SECONDS_PER_DAY;
        let mut nodes_removed = 0usize;
        for id in store.node_ids(space) {
            let Some(node) = store.peek(&id, space) else {
                continue;
            };
            if node.last_accessed_at() >= cutoff {
                continue;
            }
            if store.degree(&id, space) < self.config.min_degree
                && store.remove_node_below_degree(&id, space, self.config.min_degree)
            {
                debug!(id, space = %space, "removed orphaned node");
                nodes_removed += 1;
            }
        }

        let report = ConsolidationReport {
            space,
            edges_seen,
            reinforced,
            decayed,
            pruned,
            nodes_removed,
            log_entries: log.len(),
        };
        info!(
            space = %space,
            edges_seen = report.edges_seen,
            reinforced = report.reinforced,
            decayed = report.decayed,
            pruned = report.pruned,
            nodes_removed = report.nodes_removed,
            "consolidation pass complete"
        );
        report
    }
}
