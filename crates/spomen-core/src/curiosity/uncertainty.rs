//! Uncertainty scoring over query and response text.
//!
//! Three pure detectors, no model calls:
//! - **ambiguous reference**: vague pronouns in a short query, or a query
//!   that opens with an unanchored pronoun;
//! - **missing required slot**: the query implies an action on a target,
//!   or names a scoped resource, but upstream resolution produced no
//!   matching referent;
//! - **hedging language**: uncertainty markers in the generated response,
//!   normalized by response length.
//!
//! Each detector contributes a value in [0, 1] plus a symbolic reason.
//! The stage scores combine as a fixed weighted sum, so no single detector
//! can veto or dominate another. Everything here is token matching on
//! normalized text and runs in well under a millisecond.

use tracing::debug;

use crate::config::CuriosityConfig;
use crate::text::{contains_phrase, count_phrase_hits, normalize, word_count};

/// Vague referents that carry no antecedent of their own.
const VAGUE_REFERENCES: &[&str] = &[
    "it", "this", "that", "these", "those", "them", "something", "the thing", "the stuff",
];

/// Pronouns that make a query ambiguous when they open it.
const LEADING_PRONOUNS: &[&str] = &["it", "this", "that", "these", "those", "they"];

const LINKING_VERBS: &[&str] = &["is", "are", "was", "were", "has", "have", "does", "do"];

/// Imperatives that need a resolved target to be actionable.
const ACTION_VERBS: &[&str] = &[
    "check", "fix", "restart", "configure", "update", "install", "remove", "delete", "change",
    "show", "display", "list", "get", "deploy", "investigate", "help",
];

/// Resource nouns that are meaningless without an environment.
const SCOPED_NOUNS: &[&str] = &[
    "system", "server", "instance", "database", "application", "environment", "cluster",
];

/// Markers of hedged or uncertain phrasing in a response.
const HEDGING_MARKERS: &[&str] = &[
    "maybe",
    "perhaps",
    "possibly",
    "probably",
    "might",
    "could be",
    "may be",
    "may not",
    "might not",
    "i think",
    "i believe",
    "i assume",
    "i guess",
    "seems like",
    "appears to",
    "looks like",
    "depends on",
    "it depends",
    "assuming",
    "generally",
    "typically",
    "usually",
    "in most cases",
    "in some cases",
    "its possible",
    "not sure",
    "unclear",
    "uncertain",
    "dont know",
    "cant say",
    "cant tell",
    "hard to say",
];

/// A referent class the upstream language layer may resolve from a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// The concrete object an action applies to.
    Target,
    /// The deployment environment a resource lives in.
    Environment,
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Target => write!(f, "target"),
            Self::Environment => write!(f, "environment"),
        }
    }
}

/// Why a detector fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UncertaintyReason {
    /// The query leans on a pronoun or vague noun with no antecedent.
    AmbiguousReference,
    /// The query needs a referent of this class and none was resolved.
    MissingRequiredSlot {
        /// The unresolved referent class.
        slot: Slot,
    },
    /// The response hedges instead of committing.
    HedgingLanguage,
}

impl std::fmt::Display for UncertaintyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AmbiguousReference => write!(f, "ambiguous-reference"),
            Self::MissingRequiredSlot { slot } => write!(f, "missing-required-slot:{slot}"),
            Self::HedgingLanguage => write!(f, "hedging-language"),
        }
    }
}

/// One detector's verdict.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Signal {
    /// The symbolic reason.
    pub reason: UncertaintyReason,
    /// Contribution in [0, 1].
    pub contribution: f32,
}

/// A stage score: the capped sum of its detectors plus their signals in
/// detection order.
#[derive(Debug, Clone, Default)]
pub struct UncertaintyScore {
    /// Score in [0, 1].
    pub value: f32,
    /// Triggered detectors, ordered.
    pub signals: Vec<Signal>,
}

impl UncertaintyScore {
    fn from_signals(signals: Vec<Signal>) -> Self {
        let value = signals
            .iter()
            .map(|signal| signal.contribution)
            .sum::<f32>()
            .min(1.0);
        Self { value, signals }
    }
}

/// What kind of clarification would resolve the dominant signal.
///
/// A phrasing hint for the caller; question text generation stays outside
/// this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClarificationKind {
    /// Ask which object the action applies to.
    WhichTarget,
    /// Ask which environment is meant.
    WhichEnvironment,
    /// Ask what a vague reference points at.
    WhatSpecifically,
    /// No dominant signal; ask an open clarification.
    General,
}

impl ClarificationKind {
    /// Derives the kind from the strongest signal; earlier signals win ties.
    #[must_use]
    pub fn suggest(score: &UncertaintyScore) -> Self {
        let mut best: Option<&Signal> = None;
        for signal in &score.signals {
            if best.map_or(true, |current| signal.contribution > current.contribution) {
                best = Some(signal);
            }
        }
        match best.map(|signal| signal.reason) {
            Some(UncertaintyReason::MissingRequiredSlot { slot: Slot::Target }) => Self::WhichTarget,
            Some(UncertaintyReason::MissingRequiredSlot { slot: Slot::Environment }) => {
                Self::WhichEnvironment
            }
            Some(UncertaintyReason::AmbiguousReference) => Self::WhatSpecifically,
            Some(UncertaintyReason::HedgingLanguage) | None => Self::General,
        }
    }
}

/// Pure pre/post uncertainty scorer with fixed combination weights.
pub struct UncertaintyScorer {
    w_pre: f32,
    w_post: f32,
    threshold: f32,
}

impl UncertaintyScorer {
    /// Creates a scorer from a validated configuration section.
    #[must_use]
    pub fn new(config: &CuriosityConfig) -> Self {
        Self {
            w_pre: config.w_pre,
            w_post: config.w_post,
            threshold: config.uncertainty_threshold,
        }
    }

    /// Admission threshold for the combined score.
    #[must_use]
    pub const fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Scores the query before a response exists.
    ///
    /// `recognized` lists the referent classes upstream resolution managed
    /// to fill; a missing class only counts against queries that need it.
    #[must_use]
    pub fn score_pre(&self, query: &str, recognized: &[Slot]) -> UncertaintyScore {
        let normalized = normalize(query);
        let words = word_count(&normalized);
        let mut signals = Vec::new();

        let ambiguity = ambiguous_reference(&normalized, words);
        if ambiguity > 0.0 {
            signals.push(Signal {
                reason: UncertaintyReason::AmbiguousReference,
                contribution: ambiguity,
            });
        }

        if wants_target(&normalized) && !recognized.contains(&Slot::Target) {
            signals.push(Signal {
                reason: UncertaintyReason::MissingRequiredSlot { slot: Slot::Target },
                contribution: 0.5,
            });
        }
        if wants_environment(&normalized) && !recognized.contains(&Slot::Environment) {
            signals.push(Signal {
                reason: UncertaintyReason::MissingRequiredSlot { slot: Slot::Environment },
                contribution: 0.3,
            });
        }

        UncertaintyScore::from_signals(signals)
    }

    /// Scores the generated response against its query.
    #[must_use]
    pub fn score_post(&self, query: &str, response: &str) -> UncertaintyScore {
        let normalized_query = normalize(query);
        let normalized_response = normalize(response);
        let words = word_count(&normalized_response);
        if words == 0 {
            return UncertaintyScore::default();
        }

        let mut hits = count_phrase_hits(&normalized_response, HEDGING_MARKERS);
        // A hedge that echoes the query's unresolved referent is hedging
        // about the very thing the user left vague; weigh it as one extra
        // marker.
        if hits > 0
            && VAGUE_REFERENCES.iter().any(|token| {
                contains_phrase(&normalized_query, token)
                    && contains_phrase(&normalized_response, token)
            })
        {
            hits += 1;
        }

        // One marker per fifty words is already significant.
        let per_fifty = (hits as f32 / words as f32) * 50.0;
        let value = (per_fifty * 0.3).min(1.0);

        let mut signals = Vec::new();
        if value > 0.0 {
            signals.push(Signal {
                reason: UncertaintyReason::HedgingLanguage,
                contribution: value,
            });
        }
        UncertaintyScore { value, signals }
    }

    /// Combines the stage scores into the final one:
    /// `clamp(w_pre * pre + w_post * post, 0, 1)`, signals concatenated in
    /// stage order.
    #[must_use]
    pub fn combine(&self, pre: &UncertaintyScore, post: &UncertaintyScore) -> UncertaintyScore {
        let value = (self.w_pre * pre.value + self.w_post * post.value).clamp(0.0, 1.0);
        let mut signals = Vec::with_capacity(pre.signals.len() + post.signals.len());
        signals.extend_from_slice(&pre.signals);
        signals.extend_from_slice(&post.signals);
        debug!(
            value,
            pre = pre.value,
            post = post.value,
            signals = signals.len(),
            "uncertainty combined"
        );
        UncertaintyScore { value, signals }
    }

    /// True if the combined score clears the admission threshold.
    #[must_use]
    pub fn should_ask(&self, score: &UncertaintyScore) -> bool {
        score.value >= self.threshold
    }
}

fn ambiguous_reference(normalized: &str, words: usize) -> f32 {
    let mut score = 0.0;
    if words < 8 {
        let hits = count_phrase_hits(normalized, VAGUE_REFERENCES);
        score += 0.3 * hits as f32;
    }
    let mut iter = normalized.split_whitespace();
    if let (Some(first), Some(second)) = (iter.next(), iter.next()) {
        if LEADING_PRONOUNS.contains(&first) && LINKING_VERBS.contains(&second) {
            score += 0.5;
        }
    }
    if words <= 3 && words > 0 {
        score += 0.3;
    }
    score.min(1.0)
}

/// True if the query opens with an imperative that acts on something.
fn wants_target(normalized: &str) -> bool {
    normalized
        .split_whitespace()
        .take(3)
        .any(|word| ACTION_VERBS.contains(&word))
}

/// True if the query names a resource that only exists per environment.
fn wants_environment(normalized: &str) -> bool {
    SCOPED_NOUNS.iter().any(|noun| contains_phrase(normalized, noun))
}
