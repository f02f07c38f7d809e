//! Associative recall: spreading activation plus the trigger policy that
//! decides when to run it.

mod engine;
mod trigger;

#[cfg(test)]
mod engine_tests;

pub use engine::{spread, ActivatedNode, ActivationOutcome};
pub use trigger::{TriggerDecision, TriggerPolicy, TriggerReason};
