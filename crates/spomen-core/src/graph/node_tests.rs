//! Tests for node lifecycle and decay profiles.

use super::*;

const T0: i64 = 1_700_000_000;

#[test]
fn test_new_node_carries_identity_and_timestamps() {
    let node = MemoryNode::new("ST06", MemorySpace::Work, NodeKind::Entity, "SAP instance", T0);

    assert_eq!(node.id(), "ST06");
    assert_eq!(node.space(), MemorySpace::Work);
    assert_eq!(node.kind(), NodeKind::Entity);
    assert_eq!(node.summary(), "SAP instance");
    assert_eq!(node.created_at(), T0);
    assert_eq!(node.last_accessed_at(), T0);
}

#[test]
fn test_kind_maps_to_default_profile() {
    assert_eq!(NodeKind::Entity.default_profile(), DecayProfile::Durable);
    assert_eq!(NodeKind::Fact.default_profile(), DecayProfile::Standard);
    assert_eq!(NodeKind::Episode.default_profile(), DecayProfile::Ephemeral);

    let entity = MemoryNode::new("a", MemorySpace::Work, NodeKind::Entity, "", T0);
    assert_eq!(entity.decay_profile(), DecayProfile::Durable);
}

#[test]
fn test_profile_scales_order_by_volatility() {
    assert!((DecayProfile::Durable.elapsed_scale() - 0.5).abs() < f32::EPSILON);
    assert!((DecayProfile::Standard.elapsed_scale() - 1.0).abs() < f32::EPSILON);
    assert!((DecayProfile::Ephemeral.elapsed_scale() - 2.0).abs() < f32::EPSILON);
}

#[test]
fn test_with_decay_profile_overrides_default() {
    let node = MemoryNode::new("note", MemorySpace::Personal, NodeKind::Fact, "", T0)
        .with_decay_profile(DecayProfile::Ephemeral);
    assert_eq!(node.decay_profile(), DecayProfile::Ephemeral);
}

#[test]
fn test_touch_is_monotonic() {
    let mut node = MemoryNode::new("a", MemorySpace::Work, NodeKind::Fact, "", T0);

    node.touch(T0 + 100);
    assert_eq!(node.last_accessed_at(), T0 + 100);

    // A stale clock never moves the access time backwards.
    node.touch(T0 + 50);
    assert_eq!(node.last_accessed_at(), T0 + 100);
}

#[test]
fn test_space_other_flips_and_index_is_stable() {
    assert_eq!(MemorySpace::Personal.other(), MemorySpace::Work);
    assert_eq!(MemorySpace::Work.other(), MemorySpace::Personal);
    assert_eq!(MemorySpace::ALL[MemorySpace::Personal.index()], MemorySpace::Personal);
    assert_eq!(MemorySpace::ALL[MemorySpace::Work.index()], MemorySpace::Work);
}
