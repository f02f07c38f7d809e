//! Tests for configuration loading and validation.

use crate::config::{ConfigError, MemoryConfig, MAX_HOPS_CEILING};

fn assert_rejects(key: &str, mutate: impl FnOnce(&mut MemoryConfig)) {
    let mut config = MemoryConfig::default();
    mutate(&mut config);
    match config.validate() {
        Err(ConfigError::InvalidValue { key: got, .. }) => assert_eq!(got, key),
        other => panic!("expected InvalidValue for {key}, got {other:?}"),
    }
}

#[test]
fn test_defaults_are_valid() {
    let config = MemoryConfig::default();
    config.validate().unwrap();

    assert_eq!(config.activation.max_hops, 2);
    assert!((config.activation.decay_per_hop - 0.9).abs() < f32::EPSILON);
    assert!((config.consolidation.decay_rate - 0.95).abs() < f32::EPSILON);
    assert_eq!(config.consolidation.retention_days, 14);
    assert!((config.curiosity.uncertainty_threshold - 0.45).abs() < f32::EPSILON);
    assert_eq!(config.curiosity.max_questions_per_conversation, 2);
    assert_eq!(config.trigger.min_message_len, 15);
}

#[test]
fn test_from_toml_overrides_only_named_keys() {
    let config = MemoryConfig::from_toml(
        r#"
        [activation]
        max_hops = 3
        top_k = 16

        [curiosity]
        uncertainty_threshold = 0.6
        "#,
    )
    .unwrap();

    assert_eq!(config.activation.max_hops, 3);
    assert_eq!(config.activation.top_k, 16);
    assert!((config.curiosity.uncertainty_threshold - 0.6).abs() < 1e-6);

    // Untouched keys keep their defaults.
    assert!((config.activation.decay_per_hop - 0.9).abs() < f32::EPSILON);
    assert_eq!(config.curiosity.cooldown_seconds, 60);
    assert_eq!(config.consolidation.min_degree, 1);
}

#[test]
fn test_from_toml_covers_every_section() {
    let config = MemoryConfig::from_toml(
        r#"
        [activation]
        max_hops = 4
        decay_per_hop = 0.8
        epsilon = 0.01
        top_k = 5

        [consolidation]
        decay_rate = 0.9
        prune_threshold = 0.1
        reinforcement_delta = 0.2
        min_degree = 2
        retention_days = 7

        [curiosity]
        uncertainty_threshold = 0.5
        w_pre = 0.7
        w_post = 0.3
        max_questions_per_conversation = 1
        cooldown_seconds = 120
        question_ttl_seconds = 3600

        [trigger]
        min_message_len = 10
        max_triggers_per_conversation = 5
        trigger_cooldown_seconds = 15
        "#,
    )
    .unwrap();
    config.validate().unwrap();

    assert_eq!(config.activation.max_hops, 4);
    assert_eq!(config.consolidation.retention_days, 7);
    assert_eq!(config.curiosity.question_ttl_seconds, 3600);
    assert_eq!(config.trigger.max_triggers_per_conversation, 5);
}

#[test]
fn test_from_toml_rejects_malformed_input() {
    let result = MemoryConfig::from_toml("[activation\nmax_hops = ");
    assert!(matches!(result, Err(ConfigError::ParseError(_))));
}

#[test]
fn test_to_toml_roundtrips_through_from_toml() {
    let mut config = MemoryConfig::default();
    config.activation.max_hops = 4;
    config.consolidation.prune_threshold = 0.2;
    config.curiosity.max_questions_per_conversation = 5;

    let rendered = config.to_toml().unwrap();
    let reparsed = MemoryConfig::from_toml(&rendered).unwrap();

    assert_eq!(reparsed.activation.max_hops, 4);
    assert!((reparsed.consolidation.prune_threshold - 0.2).abs() < f32::EPSILON);
    assert_eq!(reparsed.curiosity.max_questions_per_conversation, 5);
    assert_eq!(
        reparsed.trigger.trigger_cooldown_seconds,
        config.trigger.trigger_cooldown_seconds
    );
}

#[test]
fn test_load_from_path_reads_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("spomen.toml");
    std::fs::write(&path, "[activation]\nmax_hops = 5\n").unwrap();

    let config = MemoryConfig::load_from_path(&path).unwrap();
    assert_eq!(config.activation.max_hops, 5);
    assert!((config.activation.epsilon - 0.05).abs() < f32::EPSILON);
}

#[test]
fn test_load_from_missing_path_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = MemoryConfig::load_from_path(dir.path().join("absent.toml")).unwrap();
    assert_eq!(config.activation.max_hops, 2);
}

#[test]
fn test_validate_rejects_activation_ranges() {
    assert_rejects("activation.max_hops", |c| c.activation.max_hops = 0);
    assert_rejects("activation.max_hops", |c| {
        c.activation.max_hops = MAX_HOPS_CEILING + 1;
    });
    assert_rejects("activation.decay_per_hop", |c| c.activation.decay_per_hop = 0.0);
    assert_rejects("activation.decay_per_hop", |c| c.activation.decay_per_hop = 1.5);
    assert_rejects("activation.decay_per_hop", |c| c.activation.decay_per_hop = f32::NAN);
    assert_rejects("activation.epsilon", |c| c.activation.epsilon = 1.0);
    assert_rejects("activation.epsilon", |c| c.activation.epsilon = -0.1);
    assert_rejects("activation.top_k", |c| c.activation.top_k = 0);
    assert_rejects("activation.top_k", |c| c.activation.top_k = 10_001);
}

#[test]
fn test_validate_rejects_consolidation_ranges() {
    assert_rejects("consolidation.decay_rate", |c| c.consolidation.decay_rate = 0.0);
    assert_rejects("consolidation.decay_rate", |c| c.consolidation.decay_rate = 1.1);
    assert_rejects("consolidation.prune_threshold", |c| {
        c.consolidation.prune_threshold = 1.0;
    });
    assert_rejects("consolidation.reinforcement_delta", |c| {
        c.consolidation.reinforcement_delta = 0.0;
    });
}

#[test]
fn test_validate_rejects_curiosity_ranges() {
    assert_rejects("curiosity.uncertainty_threshold", |c| {
        c.curiosity.uncertainty_threshold = 1.5;
    });
    assert_rejects("curiosity.w_pre", |c| c.curiosity.w_pre = -0.1);
    assert_rejects("curiosity.w_pre", |c| c.curiosity.w_post = f32::INFINITY);
    assert_rejects("curiosity.w_pre", |c| {
        c.curiosity.w_pre = 0.0;
        c.curiosity.w_post = 0.0;
    });
    assert_rejects("curiosity.cooldown_seconds", |c| c.curiosity.cooldown_seconds = -1);
    assert_rejects("curiosity.question_ttl_seconds", |c| {
        c.curiosity.question_ttl_seconds = 0;
    });
}

#[test]
fn test_validate_rejects_trigger_ranges() {
    assert_rejects("trigger.trigger_cooldown_seconds", |c| {
        c.trigger.trigger_cooldown_seconds = -5;
    });
}

#[test]
fn test_boundary_values_are_accepted() {
    let mut config = MemoryConfig::default();
    config.activation.max_hops = MAX_HOPS_CEILING;
    config.activation.decay_per_hop = 1.0;
    config.activation.epsilon = 0.0;
    config.consolidation.decay_rate = 1.0;
    config.consolidation.prune_threshold = 0.0;
    config.consolidation.reinforcement_delta = 1.0;
    config.curiosity.uncertainty_threshold = 1.0;
    config.curiosity.cooldown_seconds = 0;
    config.curiosity.question_ttl_seconds = 1;
    config.trigger.trigger_cooldown_seconds = 0;

    config.validate().unwrap();
}
