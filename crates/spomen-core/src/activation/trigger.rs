//! Recall trigger policy: should this message run associative recall at all?
//!
//! Spreading activation is cheap but not free, and surfacing associations on
//! every greeting gets in the way. This policy filters small talk, requires
//! a minimum of substance, and budgets recall runs per conversation, so the
//! expensive path fires only on messages worth associating.

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::config::TriggerConfig;
use crate::text::{contains_any_phrase, contains_phrase, normalize};

/// Short openers that never warrant recall on their own.
const GREETINGS: &[&str] = &[
    "hi", "hello", "hey", "yo", "sup", "morning", "evening", "good morning", "good evening",
];

/// Whole-message acknowledgements.
const ACKNOWLEDGEMENTS: &[&str] = &[
    "ok", "okay", "yes", "no", "yep", "nope", "thanks", "thank you", "cool", "nice", "got it",
    "sure", "great",
];

/// Phrases that explicitly ask for remembered context.
const MEMORY_CUES: &[&str] = &[
    "remember",
    "recall",
    "last time",
    "we discussed",
    "we talked about",
    "you mentioned",
    "you said",
    "earlier",
    "previously",
    "like before",
];

/// Markers of technical content worth associating.
const TECH_MARKERS: &[&str] = &[
    "error", "server", "deploy", "deployment", "config", "database", "bug", "crash", "cpu",
    "memory", "transaction", "pipeline", "incident", "ticket", "timeout", "latency", "rollback",
    "migration", "outage",
];

/// Why the policy did (or did not) fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// The message explicitly asks for remembered context.
    ExplicitMemoryCue,
    /// The message is substantial technical content.
    TechnicalContent,
    /// Greeting or acknowledgement; nothing to associate.
    SmallTalk,
    /// Below the configured minimum length.
    MessageTooShort,
    /// The conversation already used its recall budget.
    BudgetExhausted,
    /// Too soon after the previous recall in this conversation.
    CoolingDown,
    /// Nothing in the message suggested an association lookup.
    NoSignal,
}

/// Outcome of a trigger check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerDecision {
    /// Whether recall should run for this message.
    pub should_run: bool,
    /// The dominant reason for the decision.
    pub reason: TriggerReason,
}

impl TriggerDecision {
    const fn run(reason: TriggerReason) -> Self {
        Self { should_run: true, reason }
    }

    const fn skip(reason: TriggerReason) -> Self {
        Self { should_run: false, reason }
    }
}

/// Per-conversation recall budget and content heuristics.
///
/// A positive decision records the run against the conversation's budget, so
/// decide-and-record is a single call.
pub struct TriggerPolicy {
    config: TriggerConfig,
    history: Mutex<FxHashMap<String, Vec<i64>>>,
}

impl TriggerPolicy {
    /// Creates a policy from a validated configuration section.
    #[must_use]
    pub fn new(config: TriggerConfig) -> Self {
        Self {
            config,
            history: Mutex::new(FxHashMap::default()),
        }
    }

    /// Decides whether `message` should run recall, charging the budget on a
    /// positive answer.
    pub fn should_recall(&self, conversation_id: &str, message: &str, now: i64) -> TriggerDecision {
        let normalized = normalize(message);
        let words: Vec<&str> = normalized.split_whitespace().collect();

        if is_small_talk(&normalized, &words) {
            return TriggerDecision::skip(TriggerReason::SmallTalk);
        }
        if message.trim().len() < self.config.min_message_len {
            return TriggerDecision::skip(TriggerReason::MessageTooShort);
        }

        let mut history = self.history.lock();
        let fired = history.entry(conversation_id.to_owned()).or_default();
        if fired.len() >= self.config.max_triggers_per_conversation as usize {
            debug!(conversation_id, "recall budget exhausted");
            return TriggerDecision::skip(TriggerReason::BudgetExhausted);
        }
        if let Some(last) = fired.last() {
            if now < last + self.config.trigger_cooldown_seconds {
                debug!(conversation_id, "recall cooling down");
                return TriggerDecision::skip(TriggerReason::CoolingDown);
            }
        }

        let decision = if contains_any_phrase(&normalized, MEMORY_CUES) {
            TriggerDecision::run(TriggerReason::ExplicitMemoryCue)
        } else if is_technical(&normalized, words.len()) {
            TriggerDecision::run(TriggerReason::TechnicalContent)
        } else {
            TriggerDecision::skip(TriggerReason::NoSignal)
        };

        if decision.should_run {
            fired.push(now);
        }
        decision
    }

    /// Number of recall runs charged to a conversation so far.
    #[must_use]
    pub fn runs(&self, conversation_id: &str) -> usize {
        self.history.lock().get(conversation_id).map_or(0, Vec::len)
    }

    /// Forgets a conversation's budget, e.g. when the caller rotates ids.
    pub fn reset(&self, conversation_id: &str) {
        self.history.lock().remove(conversation_id);
    }
}

fn is_small_talk(normalized: &str, words: &[&str]) -> bool {
    let trimmed = normalized.trim();
    if words.len() <= 3 {
        if GREETINGS.contains(&trimmed) {
            return true;
        }
        if let Some(first) = words.first() {
            if GREETINGS.contains(first) {
                return true;
            }
        }
    }
    words.len() <= 2 && ACKNOWLEDGEMENTS.contains(&trimmed)
}

fn is_technical(normalized: &str, word_count: usize) -> bool {
    let hits = TECH_MARKERS
        .iter()
        .filter(|marker| contains_phrase(normalized, marker))
        .count();
    hits >= 2 || (hits >= 1 && word_count >= 12)
}
