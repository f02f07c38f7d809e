//! Spomen configuration module.
//!
//! Provides configuration file support via `spomen.toml`, environment
//! variables, and runtime overrides.
//!
//! # Priority (highest to lowest)
//!
//! 1. Environment variables (`SPOMEN_*`)
//! 2. Configuration file (`spomen.toml`)
//! 3. Default values
//!
//! Every value is range-checked by [`MemoryConfig::validate`] before an
//! engine is built from it; an invalid combination fails construction and
//! can never surface at query time.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Upper bound on `max_hops`, guarding against runaway traversal depth.
pub const MAX_HOPS_CEILING: u32 = 100;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to parse configuration file.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Invalid configuration value.
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue {
        /// Configuration key that failed validation.
        key: String,
        /// Validation error message.
        message: String,
    },
}

/// Spreading-activation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivationConfig {
    /// Maximum number of propagation waves per query.
    pub max_hops: u32,
    /// Attenuation applied per traversed hop, in (0,1].
    pub decay_per_hop: f32,
    /// Minimum summed wave contribution for a node to keep propagating.
    pub epsilon: f32,
    /// Maximum number of ranked associations returned.
    pub top_k: usize,
}

impl Default for ActivationConfig {
    fn default() -> Self {
        Self {
            max_hops: 2,
            decay_per_hop: 0.9,
            epsilon: 0.05,
            top_k: 8,
        }
    }
}

/// Nightly consolidation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsolidationConfig {
    /// Per-day multiplicative decay applied to edge weights, in (0,1].
    pub decay_rate: f32,
    /// Edges decayed below this weight are removed.
    pub prune_threshold: f32,
    /// Weight added to each co-fired edge, capped at 1.0.
    pub reinforcement_delta: f32,
    /// Nodes with fewer edges than this become removal candidates.
    pub min_degree: usize,
    /// Nodes accessed within this many days are never removed.
    pub retention_days: u32,
}

impl Default for ConsolidationConfig {
    fn default() -> Self {
        Self {
            decay_rate: 0.95,
            prune_threshold: 0.05,
            reinforcement_delta: 0.1,
            min_degree: 1,
            retention_days: 14,
        }
    }
}

/// Uncertainty scoring and question-queue parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CuriosityConfig {
    /// Combined score at or above which a question is admissible.
    pub uncertainty_threshold: f32,
    /// Weight of the pre-response score in the combined score.
    pub w_pre: f32,
    /// Weight of the post-response score in the combined score.
    pub w_post: f32,
    /// Hard cap of questions surfaced per conversation.
    pub max_questions_per_conversation: u32,
    /// Minimum seconds between two surfaced questions in one conversation.
    pub cooldown_seconds: i64,
    /// Seconds a pending question stays eligible before expiring.
    pub question_ttl_seconds: i64,
}

impl Default for CuriosityConfig {
    fn default() -> Self {
        Self {
            uncertainty_threshold: 0.45,
            w_pre: 0.6,
            w_post: 0.4,
            max_questions_per_conversation: 2,
            cooldown_seconds: 60,
            question_ttl_seconds: 86_400,
        }
    }
}

/// Recall trigger policy parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    /// Messages shorter than this (in characters) never trigger recall.
    pub min_message_len: usize,
    /// Maximum recall runs per conversation.
    pub max_triggers_per_conversation: u32,
    /// Minimum seconds between two recall runs in one conversation.
    pub trigger_cooldown_seconds: i64,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            min_message_len: 15,
            max_triggers_per_conversation: 3,
            trigger_cooldown_seconds: 30,
        }
    }
}

/// Root configuration for the memory subsystem.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Spreading-activation section.
    pub activation: ActivationConfig,
    /// Consolidation section.
    pub consolidation: ConsolidationConfig,
    /// Curiosity section.
    pub curiosity: CuriosityConfig,
    /// Recall trigger section.
    pub trigger: TriggerConfig,
}

impl MemoryConfig {
    /// Loads configuration from `spomen.toml` in the working directory.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration parsing fails.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path("spomen.toml")
    }

    /// Loads configuration from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration parsing fails.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("SPOMEN_").split("_").lowercase(false));

        figment
            .extract()
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Creates a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::string(toml_str));

        figment
            .extract()
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Serializes the configuration to TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.activation.max_hops == 0 || self.activation.max_hops > MAX_HOPS_CEILING {
            return Err(ConfigError::InvalidValue {
                key: "activation.max_hops".to_string(),
                message: format!(
                    "value {} is out of range [1, {MAX_HOPS_CEILING}]",
                    self.activation.max_hops
                ),
            });
        }

        let decay = self.activation.decay_per_hop;
        if !decay.is_finite() || decay <= 0.0 || decay > 1.0 {
            return Err(ConfigError::InvalidValue {
                key: "activation.decay_per_hop".to_string(),
                message: format!("value {decay} is out of range (0, 1]"),
            });
        }

        let epsilon = self.activation.epsilon;
        if !epsilon.is_finite() || !(0.0..1.0).contains(&epsilon) {
            return Err(ConfigError::InvalidValue {
                key: "activation.epsilon".to_string(),
                message: format!("value {epsilon} is out of range [0, 1)"),
            });
        }

        if self.activation.top_k == 0 || self.activation.top_k > 10_000 {
            return Err(ConfigError::InvalidValue {
                key: "activation.top_k".to_string(),
                message: format!("value {} is out of range [1, 10000]", self.activation.top_k),
            });
        }

        let rate = self.consolidation.decay_rate;
        if !rate.is_finite() || rate <= 0.0 || rate > 1.0 {
            return Err(ConfigError::InvalidValue {
                key: "consolidation.decay_rate".to_string(),
                message: format!("value {rate} is out of range (0, 1]"),
            });
        }

        let prune = self.consolidation.prune_threshold;
        if !prune.is_finite() || !(0.0..1.0).contains(&prune) {
            return Err(ConfigError::InvalidValue {
                key: "consolidation.prune_threshold".to_string(),
                message: format!("value {prune} is out of range [0, 1)"),
            });
        }

        let delta = self.consolidation.reinforcement_delta;
        if !delta.is_finite() || delta <= 0.0 || delta > 1.0 {
            return Err(ConfigError::InvalidValue {
                key: "consolidation.reinforcement_delta".to_string(),
                message: format!("value {delta} is out of range (0, 1]"),
            });
        }

        let threshold = self.curiosity.uncertainty_threshold;
        if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::InvalidValue {
                key: "curiosity.uncertainty_threshold".to_string(),
                message: format!("value {threshold} is out of range [0, 1]"),
            });
        }

        let (w_pre, w_post) = (self.curiosity.w_pre, self.curiosity.w_post);
        if !w_pre.is_finite() || !w_post.is_finite() || w_pre < 0.0 || w_post < 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "curiosity.w_pre".to_string(),
                message: format!("weights ({w_pre}, {w_post}) must be finite and >= 0"),
            });
        }
        if w_pre + w_post <= 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "curiosity.w_pre".to_string(),
                message: "w_pre + w_post must be positive".to_string(),
            });
        }

        if self.curiosity.cooldown_seconds < 0 {
            return Err(ConfigError::InvalidValue {
                key: "curiosity.cooldown_seconds".to_string(),
                message: format!("value {} must be >= 0", self.curiosity.cooldown_seconds),
            });
        }

        if self.curiosity.question_ttl_seconds < 1 {
            return Err(ConfigError::InvalidValue {
                key: "curiosity.question_ttl_seconds".to_string(),
                message: format!("value {} must be >= 1", self.curiosity.question_ttl_seconds),
            });
        }

        if self.trigger.trigger_cooldown_seconds < 0 {
            return Err(ConfigError::InvalidValue {
                key: "trigger.trigger_cooldown_seconds".to_string(),
                message: format!("value {} must be >= 0", self.trigger.trigger_cooldown_seconds),
            });
        }

        Ok(())
    }
}
