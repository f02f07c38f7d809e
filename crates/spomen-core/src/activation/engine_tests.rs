//! Tests for the spreading-activation engine.

use super::*;
use crate::config::ActivationConfig;
use crate::graph::{EdgeKey, GraphStore, MemoryEdge, MemoryNode, MemorySpace, NodeKind};

const T0: i64 = 1_700_000_000;

fn config(max_hops: u32, decay_per_hop: f32, epsilon: f32, top_k: usize) -> ActivationConfig {
    ActivationConfig {
        max_hops,
        decay_per_hop,
        epsilon,
        top_k,
    }
}

fn add_node(store: &GraphStore, id: &str, space: MemorySpace) {
    store.upsert_node(MemoryNode::new(id, space, NodeKind::Fact, id, T0));
}

fn link(store: &GraphStore, source: &str, target: &str, space: MemorySpace, weight: f32) {
    store
        .upsert_edge(MemoryEdge::new(source, target, space, "related_to", weight, T0).unwrap())
        .unwrap();
}

/// Work-space chain: PRD -0.8-> CPU bottleneck -0.6-> ST06.
fn incident_graph() -> GraphStore {
    let store = GraphStore::new();
    for id in ["PRD", "CPU bottleneck", "ST06"] {
        add_node(&store, id, MemorySpace::Work);
    }
    link(&store, "PRD", "CPU bottleneck", MemorySpace::Work, 0.8);
    link(&store, "CPU bottleneck", "ST06", MemorySpace::Work, 0.6);
    store
}

#[test]
fn test_two_hop_chain_attenuates_per_hop() {
    let store = incident_graph();
    let outcome = spread(&store, MemorySpace::Work, &["PRD"], &config(2, 0.9, 0.05, 8));

    assert_eq!(outcome.ranked_ids(), vec!["CPU bottleneck", "ST06"]);
    assert_eq!(outcome.waves, 2);

    let cpu = &outcome.ranked[0];
    assert!((cpu.activation - 0.72).abs() < 1e-3, "got {}", cpu.activation);
    assert_eq!(cpu.hops, 1);

    // 0.72 * 0.6 * 0.9, the path product attenuated once per hop.
    let st06 = &outcome.ranked[1];
    assert!((st06.activation - 0.3888).abs() < 1e-3, "got {}", st06.activation);
    assert_eq!(st06.hops, 2);
}

#[test]
fn test_max_hops_bounds_reach() {
    let store = incident_graph();
    let outcome = spread(&store, MemorySpace::Work, &["PRD"], &config(1, 0.9, 0.05, 8));

    assert_eq!(outcome.ranked_ids(), vec!["CPU bottleneck"]);
    assert_eq!(outcome.waves, 1);
}

#[test]
fn test_converging_paths_sum_and_cap_at_one() {
    let store = GraphStore::new();
    for id in ["s", "a", "b", "t"] {
        add_node(&store, id, MemorySpace::Work);
    }
    link(&store, "s", "a", MemorySpace::Work, 1.0);
    link(&store, "s", "b", MemorySpace::Work, 1.0);
    link(&store, "a", "t", MemorySpace::Work, 1.0);
    link(&store, "b", "t", MemorySpace::Work, 1.0);

    let outcome = spread(&store, MemorySpace::Work, &["s"], &config(2, 1.0, 0.05, 8));

    let t = outcome
        .ranked
        .iter()
        .find(|entry| entry.node.id() == "t")
        .expect("t reached");
    // Two full-strength paths deliver 2.0; the level clamps instead.
    assert!((t.activation - 1.0).abs() < f32::EPSILON);
    assert_eq!(t.hops, 2);
}

#[test]
fn test_activation_never_crosses_spaces() {
    let store = incident_graph();
    // The same seed id exists in Personal with its own neighborhood.
    add_node(&store, "PRD", MemorySpace::Personal);
    add_node(&store, "garden notes", MemorySpace::Personal);
    link(&store, "PRD", "garden notes", MemorySpace::Personal, 0.9);

    let work = spread(&store, MemorySpace::Work, &["PRD"], &config(2, 0.9, 0.05, 8));
    assert_eq!(work.ranked_ids(), vec!["CPU bottleneck", "ST06"]);
    for entry in &work.ranked {
        assert_eq!(entry.node.space(), MemorySpace::Work);
    }

    let personal = spread(&store, MemorySpace::Personal, &["PRD"], &config(2, 0.9, 0.05, 8));
    assert_eq!(personal.ranked_ids(), vec!["garden notes"]);
}

#[test]
fn test_epsilon_prunes_propagation_not_scores() {
    let store = GraphStore::new();
    for id in ["s", "a", "b"] {
        add_node(&store, id, MemorySpace::Work);
    }
    link(&store, "s", "a", MemorySpace::Work, 0.1);
    link(&store, "a", "b", MemorySpace::Work, 1.0);

    let outcome = spread(&store, MemorySpace::Work, &["s"], &config(2, 0.9, 0.1, 8));

    // 0.09 still ranks, but falls short of epsilon, so "a" never fires on.
    assert_eq!(outcome.ranked_ids(), vec!["a"]);
    assert!((outcome.ranked[0].activation - 0.09).abs() < 1e-6);
    assert_eq!(outcome.waves, 1);
}

#[test]
fn test_ranking_breaks_ties_by_recency_then_id() {
    let store = GraphStore::new();
    for id in ["s", "a", "b"] {
        add_node(&store, id, MemorySpace::Work);
    }
    link(&store, "s", "a", MemorySpace::Work, 0.5);
    link(&store, "s", "b", MemorySpace::Work, 0.5);

    let cfg = config(1, 1.0, 0.05, 8);

    // Equal activation and equal recency: id ascending.
    let outcome = spread(&store, MemorySpace::Work, &["s"], &cfg);
    assert_eq!(outcome.ranked_ids(), vec!["a", "b"]);

    // A fresher access promotes "b" past the id order.
    store.touch(MemorySpace::Work, ["b"], T0 + 100);
    let outcome = spread(&store, MemorySpace::Work, &["s"], &cfg);
    assert_eq!(outcome.ranked_ids(), vec!["b", "a"]);
}

#[test]
fn test_repeat_queries_are_deterministic() {
    let store = incident_graph();
    let cfg = config(2, 0.9, 0.05, 8);

    let first = spread(&store, MemorySpace::Work, &["PRD"], &cfg);
    let second = spread(&store, MemorySpace::Work, &["PRD"], &cfg);

    assert_eq!(first.ranked_ids(), second.ranked_ids());
    for (a, b) in first.ranked.iter().zip(&second.ranked) {
        assert_eq!(a.activation.to_bits(), b.activation.to_bits());
        assert_eq!(a.hops, b.hops);
    }
    assert_eq!(first.co_fired, second.co_fired);
}

#[test]
fn test_unknown_and_other_space_seeds_are_skipped() {
    let store = incident_graph();
    add_node(&store, "diary", MemorySpace::Personal);

    // "diary" exists, but not in Work; it is indistinguishable from "ghost".
    let outcome = spread(
        &store,
        MemorySpace::Work,
        &["PRD", "ghost", "diary"],
        &config(2, 0.9, 0.05, 8),
    );

    assert_eq!(outcome.unknown_seeds, 2);
    assert_eq!(outcome.ranked_ids(), vec!["CPU bottleneck", "ST06"]);
}

#[test]
fn test_all_seeds_unknown_yields_empty_outcome() {
    let store = incident_graph();
    let outcome = spread(&store, MemorySpace::Work, &["ghost"], &config(2, 0.9, 0.05, 8));

    assert!(outcome.is_empty());
    assert_eq!(outcome.unknown_seeds, 1);
    assert_eq!(outcome.waves, 0);
}

#[test]
fn test_seeds_never_appear_in_ranking() {
    let store = GraphStore::new();
    for id in ["s", "a"] {
        add_node(&store, id, MemorySpace::Work);
    }
    link(&store, "s", "a", MemorySpace::Work, 0.8);
    link(&store, "a", "s", MemorySpace::Work, 0.8);

    let outcome = spread(&store, MemorySpace::Work, &["s"], &config(3, 0.9, 0.05, 8));

    assert_eq!(outcome.ranked_ids(), vec!["a"]);
}

#[test]
fn test_cycles_terminate_because_nodes_fire_once() {
    let store = GraphStore::new();
    for id in ["a", "b", "c"] {
        add_node(&store, id, MemorySpace::Work);
    }
    link(&store, "a", "b", MemorySpace::Work, 1.0);
    link(&store, "b", "c", MemorySpace::Work, 1.0);
    link(&store, "c", "a", MemorySpace::Work, 1.0);

    let outcome = spread(&store, MemorySpace::Work, &["a"], &config(10, 1.0, 0.05, 8));

    assert_eq!(outcome.ranked_ids(), vec!["b", "c"]);
    // Wave 3 closes the loop back into the seed, then the frontier dies.
    assert_eq!(outcome.waves, 3);
    for entry in &outcome.ranked {
        assert!(entry.activation <= 1.0);
    }
}

#[test]
fn test_top_k_keeps_the_strongest() {
    let store = GraphStore::new();
    add_node(&store, "s", MemorySpace::Work);
    let weights = [0.9, 0.8, 0.7, 0.6, 0.5];
    for (i, weight) in weights.iter().enumerate() {
        let id = format!("l{i}");
        add_node(&store, &id, MemorySpace::Work);
        link(&store, "s", &id, MemorySpace::Work, *weight);
    }

    let outcome = spread(&store, MemorySpace::Work, &["s"], &config(1, 1.0, 0.05, 3));

    assert_eq!(outcome.ranked_ids(), vec!["l0", "l1", "l2"]);
}

#[test]
fn test_co_fired_connects_the_returned_set() {
    let store = incident_graph();
    let outcome = spread(&store, MemorySpace::Work, &["PRD"], &config(2, 0.9, 0.05, 8));

    assert_eq!(
        outcome.co_fired,
        vec![
            EdgeKey::new("CPU bottleneck", "ST06", "related_to"),
            EdgeKey::new("PRD", "CPU bottleneck", "related_to"),
        ]
    );
}

#[test]
fn test_co_fired_excludes_edges_to_truncated_nodes() {
    let store = GraphStore::new();
    add_node(&store, "s", MemorySpace::Work);
    for (id, weight) in [("strong", 0.9), ("weak", 0.2)] {
        add_node(&store, id, MemorySpace::Work);
        link(&store, "s", id, MemorySpace::Work, weight);
    }

    let outcome = spread(&store, MemorySpace::Work, &["s"], &config(1, 1.0, 0.05, 1));

    assert_eq!(outcome.ranked_ids(), vec!["strong"]);
    assert_eq!(outcome.co_fired, vec![EdgeKey::new("s", "strong", "related_to")]);
}

#[test]
fn test_duplicate_seeds_count_once() {
    let store = incident_graph();
    let outcome = spread(
        &store,
        MemorySpace::Work,
        &["PRD", "PRD"],
        &config(1, 0.9, 0.05, 8),
    );

    // A doubled seed must not double the delivered contribution.
    assert!((outcome.ranked[0].activation - 0.72).abs() < 1e-3);
}

mod proptest_tests {
    use super::*;
    use proptest::prelude::*;

    /// Strategy for a random edge list over `n` nodes with weights in (0, 1].
    fn edges_strategy(n: usize) -> impl Strategy<Value = Vec<(usize, usize, f32)>> {
        proptest::collection::vec((0..n, 0..n, 0.05f32..=1.0), 0..=n * 2)
    }

    fn build(n: usize, edges: &[(usize, usize, f32)]) -> GraphStore {
        let store = GraphStore::new();
        for i in 0..n {
            add_node(&store, &format!("n{i}"), MemorySpace::Work);
            // A mirrored Personal node with the same id must never leak in.
            add_node(&store, &format!("n{i}"), MemorySpace::Personal);
        }
        for (source, target, weight) in edges {
            link(
                &store,
                &format!("n{source}"),
                &format!("n{target}"),
                MemorySpace::Work,
                *weight,
            );
        }
        store
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        /// Property: activations stay in (0, 1], results respect top_k, and
        /// every returned node belongs to the queried space.
        #[test]
        fn prop_outcome_is_bounded_and_space_pure(
            n in 3usize..=10,
            edges in edges_strategy(10),
            top_k in 1usize..=6,
        ) {
            let edges: Vec<_> = edges
                .into_iter()
                .filter(|(s, t, _)| *s < n && *t < n)
                .collect();
            let store = build(n, &edges);
            let cfg = config(3, 0.9, 0.05, top_k);

            let outcome = spread(&store, MemorySpace::Work, &["n0"], &cfg);

            prop_assert!(outcome.ranked.len() <= top_k);
            for entry in &outcome.ranked {
                prop_assert!(entry.activation > 0.0 && entry.activation <= 1.0);
                prop_assert_eq!(entry.node.space(), MemorySpace::Work);
                prop_assert!(entry.node.id() != "n0", "seed leaked into ranking");
                prop_assert!(entry.hops >= 1 && entry.hops <= 3);
            }
        }

        /// Property: the same query against the same store returns the same
        /// ranking, bit for bit.
        #[test]
        fn prop_spread_is_deterministic(
            n in 3usize..=10,
            edges in edges_strategy(10),
        ) {
            let edges: Vec<_> = edges
                .into_iter()
                .filter(|(s, t, _)| *s < n && *t < n)
                .collect();
            let store = build(n, &edges);
            let cfg = config(3, 0.9, 0.05, 8);

            let first = spread(&store, MemorySpace::Work, &["n0", "n1"], &cfg);
            let second = spread(&store, MemorySpace::Work, &["n0", "n1"], &cfg);

            prop_assert_eq!(first.ranked_ids(), second.ranked_ids());
            for (a, b) in first.ranked.iter().zip(&second.ranked) {
                prop_assert_eq!(a.activation.to_bits(), b.activation.to_bits());
            }
        }
    }
}
