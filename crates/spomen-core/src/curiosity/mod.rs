//! Curiosity: uncertainty detection and the clarification question queue.
//!
//! # Features
//!
//! - **Pure uncertainty detectors**: pattern-based scoring of query and
//!   response text, no model calls
//! - **Admission/delivery separation**: offers apply the score threshold,
//!   polls apply rate limits
//! - **Per-conversation isolation**: queues never contend across
//!   conversation ids
//! - **Bounded interruption**: delivery cap, cooldown, and TTL keep
//!   questions rare and fresh

mod queue;
mod uncertainty;


pub use queue::{
    ConversationRateState, OfferOutcome, Question, QuestionQueue, QuestionStatus, QueueStats,
    RejectReason,
};
pub use uncertainty::{
    ClarificationKind, Signal, Slot, UncertaintyReason, UncertaintyScore, UncertaintyScorer,
};
