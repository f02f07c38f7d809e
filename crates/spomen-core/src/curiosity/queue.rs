//! Per-conversation clarification question queue.
//!
//! Admission and delivery are separate concerns: [`QuestionQueue::offer`]
//! only applies the score threshold and duplicate suppression, while
//! [`QuestionQueue::poll`] is the single place rate-limiting state mutates.
//! Expiry sweeps run lazily on every offer and poll, and may additionally
//! be driven by an external timer through [`QuestionQueue::expire`]; both
//! placements observe identical results.
//!
//! Conversations never contend with each other: each lives under its own
//! map entry, and the entry guard makes offer/poll/expire on one
//! conversation linearizable.

use std::cmp::Ordering;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::CuriosityConfig;

/// Weight of age in the priority formula, in score units per second.
///
/// Small enough that any real score difference dominates; between equal
/// scores, the earlier-created question wins because its anchor timestamp
/// is smaller.
const AGE_TIEBREAK: f64 = 1e-9;

/// Lifecycle of a question. `Asked` and `Expired` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QuestionStatus {
    /// Queued, waiting for a delivery window.
    Pending,
    /// Surfaced to the caller by a poll.
    Asked,
    /// Timed out before any poll delivered it. Expired questions leave the
    /// queue; they survive only in the expired counter of [`QueueStats`].
    Expired,
}

/// A clarification question owned by one conversation.
#[derive(Debug, Clone)]
pub struct Question {
    id: Uuid,
    conversation_id: String,
    text: String,
    score: f32,
    priority: f64,
    status: QuestionStatus,
    created_at: i64,
    expires_at: i64,
}

impl Question {
    /// Unique question id.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Owning conversation.
    #[must_use]
    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    /// The question text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Uncertainty score that admitted the question.
    #[must_use]
    pub const fn score(&self) -> f32 {
        self.score
    }

    /// Delivery priority; higher polls first.
    #[must_use]
    pub const fn priority(&self) -> f64 {
        self.priority
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn status(&self) -> QuestionStatus {
        self.status
    }

    /// Admission timestamp, unix seconds.
    #[must_use]
    pub const fn created_at(&self) -> i64 {
        self.created_at
    }

    /// Instant after which the question can no longer be delivered.
    #[must_use]
    pub const fn expires_at(&self) -> i64 {
        self.expires_at
    }
}

/// Why an offer did not enqueue a question.
#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    /// The score did not clear the admission threshold.
    BelowThreshold {
        /// Offered score.
        score: f32,
        /// Configured admission threshold.
        threshold: f32,
    },
    /// The same text is already pending in this conversation.
    Duplicate {
        /// Id of the pending question with identical text.
        existing: Uuid,
    },
}

/// Outcome of [`QuestionQueue::offer`]. Rejection is expected flow, not an
/// error.
#[derive(Debug, Clone)]
pub enum OfferOutcome {
    /// A new pending question was enqueued.
    Admitted(Question),
    /// Nothing was enqueued.
    Rejected(RejectReason),
}

impl OfferOutcome {
    /// The admitted question, if any.
    #[must_use]
    pub fn admitted(&self) -> Option<&Question> {
        match self {
            Self::Admitted(question) => Some(question),
            Self::Rejected(_) => None,
        }
    }

    /// True if a question was enqueued.
    #[must_use]
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted(_))
    }
}

/// Per-conversation delivery bookkeeping. Survives restarts via snapshots,
/// unlike the pending questions themselves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationRateState {
    /// Questions delivered so far.
    pub questions_asked: u32,
    /// When the last question was delivered.
    pub last_asked_at: Option<i64>,
    /// No delivery before this instant.
    pub cooldown_until: i64,
}

/// Counters for one conversation's queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    /// Questions currently pending.
    pub pending: usize,
    /// Questions delivered over the conversation's lifetime.
    pub asked: u32,
    /// Questions that timed out undelivered.
    pub expired: usize,
}

#[derive(Debug)]
struct PendingEntry {
    question: Question,
    seq: u64,
}

#[derive(Debug, Default)]
struct ConversationQueue {
    pending: Vec<PendingEntry>,
    rate: ConversationRateState,
    seq: u64,
    expired: usize,
}

impl ConversationQueue {
    /// Drops pending questions past their deadline. Expiry is strict:
    /// a question polled exactly at `expires_at` is still deliverable.
    fn sweep(&mut self, now: i64) -> usize {
        let before = self.pending.len();
        self.pending.retain_mut(|entry| {
            if now <= entry.question.expires_at {
                return true;
            }
            entry.question.status = QuestionStatus::Expired;
            debug!(question_id = %entry.question.id, "question expired undelivered");
            false
        });
        let swept = before - self.pending.len();
        self.expired += swept;
        swept
    }

    /// Index of the highest-priority pending entry; equal priorities go to
    /// the earlier insertion.
    fn best_index(&self) -> Option<usize> {
        let mut best: Option<usize> = None;
        for (idx, entry) in self.pending.iter().enumerate() {
            let better = match best {
                None => true,
                Some(current) => {
                    let incumbent = &self.pending[current];
                    match entry.question.priority.total_cmp(&incumbent.question.priority) {
                        Ordering::Greater => true,
                        Ordering::Equal => entry.seq < incumbent.seq,
                        Ordering::Less => false,
                    }
                }
            };
            if better {
                best = Some(idx);
            }
        }
        best
    }
}

/// Rate-limited, TTL-bound question queue scoped by conversation id.
pub struct QuestionQueue {
    config: CuriosityConfig,
    conversations: DashMap<String, ConversationQueue>,
}

impl QuestionQueue {
    /// Creates a queue from a validated configuration section.
    #[must_use]
    pub fn new(config: CuriosityConfig) -> Self {
        Self {
            config,
            conversations: DashMap::new(),
        }
    }

    /// Returns the configuration in use.
    #[must_use]
    pub const fn config(&self) -> &CuriosityConfig {
        &self.config
    }

    /// Offers a question for later delivery.
    ///
    /// Pure admission: the score threshold and duplicate suppression apply
    /// here, rate limits do not. A below-threshold score or a duplicate of
    /// a pending text yields [`OfferOutcome::Rejected`].
    pub fn offer(&self, conversation_id: &str, text: &str, score: f32, now: i64) -> OfferOutcome {
        if score < self.config.uncertainty_threshold {
            debug!(
                conversation_id,
                score,
                threshold = self.config.uncertainty_threshold,
                "question below admission threshold"
            );
            return OfferOutcome::Rejected(RejectReason::BelowThreshold {
                score,
                threshold: self.config.uncertainty_threshold,
            });
        }

        let mut queue = self
            .conversations
            .entry(conversation_id.to_owned())
            .or_default();
        queue.sweep(now);

        if let Some(existing) = queue
            .pending
            .iter()
            .find(|entry| entry.question.text == text)
        {
            let existing = existing.question.id;
            debug!(conversation_id, %existing, "duplicate question suppressed");
            return OfferOutcome::Rejected(RejectReason::Duplicate { existing });
        }

        let question = Question {
            id: Uuid::new_v4(),
            conversation_id: conversation_id.to_owned(),
            text: text.to_owned(),
            score,
            priority: priority_for(score, now),
            status: QuestionStatus::Pending,
            created_at: now,
            expires_at: now + self.config.question_ttl_seconds,
        };
        let admitted = question.clone();
        let seq = queue.seq;
        queue.seq += 1;
        queue.pending.push(PendingEntry { question, seq });
        info!(
            question_id = %admitted.id,
            conversation_id,
            score,
            priority = admitted.priority,
            "question queued"
        );
        OfferOutcome::Admitted(admitted)
    }

    /// Delivers the highest-priority pending question, if the conversation
    /// is allowed one right now.
    ///
    /// The sole mutation point for rate state: a delivery increments the
    /// asked count, stamps `last_asked_at`, and starts the cooldown.
    pub fn poll(&self, conversation_id: &str, now: i64) -> Option<Question> {
        let mut queue = self.conversations.get_mut(conversation_id)?;
        queue.sweep(now);

        if queue.rate.questions_asked >= self.config.max_questions_per_conversation {
            debug!(conversation_id, "question budget exhausted");
            return None;
        }
        if now < queue.rate.cooldown_until {
            debug!(
                conversation_id,
                until = queue.rate.cooldown_until,
                "question cooldown active"
            );
            return None;
        }

        let idx = queue.best_index()?;
        let mut entry = queue.pending.swap_remove(idx);
        entry.question.status = QuestionStatus::Asked;
        queue.rate.questions_asked += 1;
        queue.rate.last_asked_at = Some(now);
        queue.rate.cooldown_until = now + self.config.cooldown_seconds;
        info!(
            question_id = %entry.question.id,
            conversation_id,
            asked = queue.rate.questions_asked,
            "question delivered"
        );
        Some(entry.question)
    }

    /// Expires overdue pending questions across all conversations.
    ///
    /// Idempotent; the lazy sweeps in offer/poll make calling this
    /// optional, an external timer yields the same observable results.
    pub fn expire(&self, now: i64) -> usize {
        let mut swept = 0;
        for mut queue in self.conversations.iter_mut() {
            swept += queue.sweep(now);
        }
        if swept > 0 {
            debug!(swept, "expired pending questions");
        }
        swept
    }

    /// Counters for one conversation, after sweeping it at `now`.
    #[must_use]
    pub fn stats(&self, conversation_id: &str, now: i64) -> QueueStats {
        match self.conversations.get_mut(conversation_id) {
            Some(mut queue) => {
                queue.sweep(now);
                QueueStats {
                    pending: queue.pending.len(),
                    asked: queue.rate.questions_asked,
                    expired: queue.expired,
                }
            }
            None => QueueStats::default(),
        }
    }

    /// Drops a conversation's pending questions and rate state, for callers
    /// that rotate conversation ids.
    pub fn reset(&self, conversation_id: &str) {
        if self.conversations.remove(conversation_id).is_some() {
            debug!(conversation_id, "conversation queue reset");
        }
    }

    /// Rate states of all known conversations, sorted by id.
    #[must_use]
    pub fn export_rate_states(&self) -> Vec<(String, ConversationRateState)> {
        let mut states: Vec<(String, ConversationRateState)> = self
            .conversations
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().rate.clone()))
            .collect();
        states.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        states
    }

    /// Restores rate states from a snapshot. Pending questions are
    /// transient and are not restored.
    pub fn import_rate_states(&self, states: Vec<(String, ConversationRateState)>) {
        for (conversation_id, rate) in states {
            self.conversations.entry(conversation_id).or_default().rate = rate;
        }
    }
}

/// Delivery priority: monotone in score, and between equal scores monotone
/// in age (older first).
fn priority_for(score: f32, created_at: i64) -> f64 {
    f64::from(score) - created_at as f64 * AGE_TIEBREAK
}
