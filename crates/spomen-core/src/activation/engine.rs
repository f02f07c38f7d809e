//! Spreading-activation retrieval over the memory graph.

use std::collections::{BTreeMap, BTreeSet};

use rustc_hash::FxHashSet;
use tracing::warn;

use crate::config::ActivationConfig;
use crate::graph::{EdgeKey, GraphStore, MemoryNode, MemorySpace};

/// A non-seed node reached by propagation, with its final activation.
#[derive(Debug, Clone)]
pub struct ActivatedNode {
    /// The reached node, cloned out of the store.
    pub node: MemoryNode,
    /// Final activation level in [0,1], summed over all paths.
    pub activation: f32,
    /// Wave in which the node was first reached (1 = direct neighbor).
    pub hops: u32,
}

/// Result of one recall query. Transient; never persisted.
#[derive(Debug, Clone, Default)]
pub struct ActivationOutcome {
    /// Non-seed nodes ranked by activation (desc), recency, then id.
    pub ranked: Vec<ActivatedNode>,
    /// Edges connecting the returned set (seeds included), deduplicated and
    /// sorted. Feed these to a reinforcement log so consolidation can
    /// strengthen co-accessed associations.
    pub co_fired: Vec<EdgeKey>,
    /// Seed ids that were not present in the queried space.
    pub unknown_seeds: u32,
    /// Edges skipped because they claimed a different space.
    pub cross_space_skips: u32,
    /// Edges skipped because their target node was gone.
    pub dangling_skips: u32,
    /// Propagation waves actually run.
    pub waves: u32,
}

impl ActivationOutcome {
    /// Ids of the ranked nodes, in rank order.
    #[must_use]
    pub fn ranked_ids(&self) -> Vec<&str> {
        self.ranked.iter().map(|entry| entry.node.id()).collect()
    }

    /// True if the query activated nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }
}

/// Runs spreading activation from `seeds` within one space.
///
/// Each seed starts at activation 1.0. Propagation advances in breadth-first
/// waves, at most `max_hops` of them: a firing node `n` contributes
/// `a(n) * weight * decay_per_hop` along each outgoing edge, so a path of
/// `L` hops delivers the product of its weights attenuated by
/// `decay_per_hop^L`. Contributions over all paths are summed per node and
/// capped at 1.0. A node fires at most once per query; it joins the next
/// frontier only if the wave delivered at least `epsilon` to it (late,
/// smaller contributions still raise its score, they just stop spreading).
///
/// Read-only: the store is never mutated, and `last_accessed_at` is only
/// updated by an explicit [`GraphStore::touch`] on the returned ids.
///
/// Unknown seeds are skipped with a warning, not an error. That includes
/// seeds that exist only in the other space, so recall can never be used to
/// probe across the isolation boundary. Cross-space and dangling edges are
/// skipped and counted as data-integrity warnings.
#[must_use]
pub fn spread(
    store: &GraphStore,
    space: MemorySpace,
    seeds: &[&str],
    config: &ActivationConfig,
) -> ActivationOutcome {
    let mut outcome = ActivationOutcome::default();

    let mut seed_ids: Vec<&str> = Vec::new();
    for seed in seeds {
        if store.contains(seed, space) {
            if !seed_ids.contains(seed) {
                seed_ids.push(seed);
            }
        } else {
            outcome.unknown_seeds += 1;
            warn!(seed, space = %space, "seed not present in queried space, skipping");
        }
    }
    if seed_ids.is_empty() {
        return outcome;
    }
    seed_ids.sort_unstable();

    let mut activation: BTreeMap<String, f32> = BTreeMap::new();
    let mut first_hop: BTreeMap<String, u32> = BTreeMap::new();
    let mut fired: FxHashSet<String> = FxHashSet::default();
    let mut traversed: Vec<EdgeKey> = Vec::new();
    let mut frontier: Vec<String> = Vec::new();

    for seed in &seed_ids {
        activation.insert((*seed).to_owned(), 1.0);
        fired.insert((*seed).to_owned());
        frontier.push((*seed).to_owned());
    }

    for wave in 1..=config.max_hops {
        // BTreeMap keeps accumulation and admission order independent of
        // hash state, which the determinism guarantee relies on.
        let mut incoming: BTreeMap<String, f32> = BTreeMap::new();
        for source_id in &frontier {
            let source_level = activation.get(source_id).copied().unwrap_or(0.0);
            for edge in store.outgoing(source_id, space) {
                if edge.space() != space {
                    outcome.cross_space_skips += 1;
                    warn!(
                        edge = %edge.key(),
                        expected = %space,
                        found = %edge.space(),
                        "cross-space edge excluded from propagation"
                    );
                    continue;
                }
                if !store.contains(edge.target(), space) {
                    outcome.dangling_skips += 1;
                    warn!(edge = %edge.key(), space = %space, "dangling edge excluded from propagation");
                    continue;
                }
                let contribution = source_level * edge.weight() * config.decay_per_hop;
                if contribution <= 0.0 {
                    continue;
                }
                *incoming.entry(edge.target().to_owned()).or_insert(0.0) += contribution;
                traversed.push(edge.key());
            }
        }

        if incoming.is_empty() {
            break;
        }
        outcome.waves = wave;

        let mut next_frontier: Vec<String> = Vec::new();
        for (target, contribution) in incoming {
            let level = activation.entry(target.clone()).or_insert(0.0);
            *level = (*level + contribution).min(1.0);
            first_hop.entry(target.clone()).or_insert(wave);
            if contribution >= config.epsilon && fired.insert(target.clone()) {
                next_frontier.push(target);
            }
        }

        if next_frontier.is_empty() {
            break;
        }
        frontier = next_frontier;
    }

    let seed_set: FxHashSet<&str> = seed_ids.iter().copied().collect();
    let mut ranked: Vec<ActivatedNode> = Vec::new();
    for (id, level) in &activation {
        if *level <= 0.0 || seed_set.contains(id.as_str()) {
            continue;
        }
        if let Some(node) = store.peek(id, space) {
            ranked.push(ActivatedNode {
                node,
                activation: *level,
                hops: first_hop.get(id).copied().unwrap_or(0),
            });
        }
    }
    ranked.sort_by(|a, b| {
        b.activation
            .total_cmp(&a.activation)
            .then_with(|| b.node.last_accessed_at().cmp(&a.node.last_accessed_at()))
            .then_with(|| a.node.id().cmp(b.node.id()))
    });
    ranked.truncate(config.top_k);

    let mut in_result: FxHashSet<&str> = seed_set;
    for entry in &ranked {
        in_result.insert(entry.node.id());
    }
    let co_fired: BTreeSet<EdgeKey> = traversed
        .into_iter()
        .filter(|key| {
            in_result.contains(key.source.as_str()) && in_result.contains(key.target.as_str())
        })
        .collect();

    outcome.co_fired = co_fired.into_iter().collect();
    outcome.ranked = ranked;
    outcome
}
