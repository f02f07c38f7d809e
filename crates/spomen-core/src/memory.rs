//! `AssociativeMemory`: unified front for the memory subsystem.
//!
//! Wires the graph store, the activation engine parameters, the
//! consolidator, the uncertainty scorer, the question queue, and the recall
//! trigger policy behind one constructor that validates configuration once.
//! Components stay individually accessible for callers that need only a
//! slice of the subsystem.

use std::path::Path;

use parking_lot::Mutex;

use crate::activation::{spread, ActivationOutcome, TriggerDecision, TriggerPolicy};
use crate::config::MemoryConfig;
use crate::consolidation::{ConsolidationReport, Consolidator, ReinforcementLog};
use crate::curiosity::{
    OfferOutcome, Question, QuestionQueue, Slot, UncertaintyScore, UncertaintyScorer,
};
use crate::error::Result;
use crate::graph::{GraphStore, MemoryEdge, MemoryNode, MemorySpace};
use crate::storage::{load_snapshot_from_file, save_snapshot_to_file, MemoryState};

/// Unified associative memory for one agent.
///
/// Retrieval, questioning, and consolidation share the two-space graph;
/// everything is keyed by an explicit [`MemorySpace`] parameter, never by
/// ambient mode state.
pub struct AssociativeMemory {
    config: MemoryConfig,
    graph: GraphStore,
    consolidator: Consolidator,
    scorer: UncertaintyScorer,
    queue: QuestionQueue,
    trigger: TriggerPolicy,
    // One log per space so recalls in one space never wait on the other's
    // consolidation pass.
    reinforcement: [Mutex<ReinforcementLog>; 2],
}

impl AssociativeMemory {
    /// Creates an empty memory from a configuration.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Config`] if any configuration value is out of
    /// range; construction is the only place configuration can fail.
    pub fn new(config: MemoryConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_validated(config, GraphStore::new()))
    }

    /// Restores a memory from a snapshot file.
    ///
    /// The graph and per-conversation rate states come from the snapshot;
    /// pending questions are transient and start empty.
    ///
    /// # Errors
    ///
    /// Returns an error on invalid configuration, unreadable files, or a
    /// corrupted snapshot.
    pub fn open<P: AsRef<Path>>(path: P, config: MemoryConfig) -> Result<Self> {
        config.validate()?;
        let state = load_snapshot_from_file(path)?;
        let memory = Self::from_validated(config, state.restore_graph());
        memory.queue.import_rate_states(state.rate_states);
        Ok(memory)
    }

    /// Writes the graph and rate states to a snapshot file.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or file operations fail.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let state = MemoryState::capture(&self.graph, self.queue.export_rate_states());
        save_snapshot_to_file(path, &state)?;
        Ok(())
    }

    fn from_validated(config: MemoryConfig, graph: GraphStore) -> Self {
        Self {
            consolidator: Consolidator::new(config.consolidation.clone()),
            scorer: UncertaintyScorer::new(&config.curiosity),
            queue: QuestionQueue::new(config.curiosity.clone()),
            trigger: TriggerPolicy::new(config.trigger.clone()),
            reinforcement: [
                Mutex::new(ReinforcementLog::new()),
                Mutex::new(ReinforcementLog::new()),
            ],
            graph,
            config,
        }
    }

    /// Records or updates a node.
    pub fn upsert_node(&self, node: MemoryNode) {
        self.graph.upsert_node(node);
    }

    /// Records or updates an edge.
    ///
    /// # Errors
    ///
    /// Returns an error if either endpoint is missing from the edge's
    /// space.
    pub fn upsert_edge(&self, edge: MemoryEdge) -> Result<()> {
        self.graph.upsert_edge(edge)
    }

    /// Runs spreading activation from `seeds` and remembers which edges
    /// co-fired, so the next consolidation pass reinforces them.
    pub fn recall(&self, space: MemorySpace, seeds: &[&str]) -> ActivationOutcome {
        let outcome = spread(&self.graph, space, seeds, &self.config.activation);
        if !outcome.co_fired.is_empty() {
            self.reinforcement[space.index()]
                .lock()
                .record_outcome(&outcome);
        }
        outcome
    }

    /// Marks nodes as accessed at `now`; the explicit follow-up to a
    /// recall whose results were actually used.
    pub fn touch<'a, I>(&self, space: MemorySpace, ids: I, now: i64) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.graph.touch(space, ids, now)
    }

    /// Checks the recall trigger policy for a message, charging the
    /// conversation's budget on a positive decision.
    pub fn should_recall(&self, conversation_id: &str, message: &str, now: i64) -> TriggerDecision {
        self.trigger.should_recall(conversation_id, message, now)
    }

    /// Scores a query/response pair for uncertainty.
    ///
    /// Before a response exists, pass `None`; the post stage then
    /// contributes zero to the weighted combination.
    #[must_use]
    pub fn evaluate(
        &self,
        query: &str,
        recognized: &[Slot],
        response: Option<&str>,
    ) -> UncertaintyScore {
        let pre = self.scorer.score_pre(query, recognized);
        let post = response.map_or_else(UncertaintyScore::default, |text| {
            self.scorer.score_post(query, text)
        });
        self.scorer.combine(&pre, &post)
    }

    /// Offers a clarification question for later delivery.
    pub fn offer_question(
        &self,
        conversation_id: &str,
        text: &str,
        score: f32,
        now: i64,
    ) -> OfferOutcome {
        self.queue.offer(conversation_id, text, score, now)
    }

    /// Delivers the next question for a conversation, if rate limits allow
    /// one.
    pub fn poll_question(&self, conversation_id: &str, now: i64) -> Option<Question> {
        self.queue.poll(conversation_id, now)
    }

    /// Expires overdue questions across all conversations.
    pub fn expire_questions(&self, now: i64) -> usize {
        self.queue.expire(now)
    }

    /// Runs one consolidation pass over a space and drains its
    /// reinforcement log.
    ///
    /// Recalls in the same space block on the log for the duration, so a
    /// co-firing observed mid-pass is counted toward the next pass, never
    /// lost.
    pub fn consolidate(&self, space: MemorySpace, now: i64) -> ConsolidationReport {
        let mut log = self.reinforcement[space.index()].lock();
        let report = self.consolidator.run(&self.graph, space, &log, now);
        log.clear();
        report
    }

    /// Distinct co-fired edges waiting for the next pass in a space.
    #[must_use]
    pub fn pending_reinforcements(&self, space: MemorySpace) -> usize {
        self.reinforcement[space.index()].lock().len()
    }

    /// The underlying graph store.
    #[must_use]
    pub const fn graph(&self) -> &GraphStore {
        &self.graph
    }

    /// The question queue.
    #[must_use]
    pub const fn queue(&self) -> &QuestionQueue {
        &self.queue
    }

    /// The uncertainty scorer.
    #[must_use]
    pub const fn scorer(&self) -> &UncertaintyScorer {
        &self.scorer
    }

    /// The recall trigger policy.
    #[must_use]
    pub const fn trigger(&self) -> &TriggerPolicy {
        &self.trigger
    }

    /// The configuration in use.
    #[must_use]
    pub const fn config(&self) -> &MemoryConfig {
        &self.config
    }
}

impl std::fmt::Debug for AssociativeMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssociativeMemory")
            .field("personal_nodes", &self.graph.node_count(MemorySpace::Personal))
            .field("work_nodes", &self.graph.node_count(MemorySpace::Work))
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for AssociativeMemory {
    /// An empty memory with default configuration, which always validates.
    fn default() -> Self {
        Self::from_validated(MemoryConfig::default(), GraphStore::new())
    }
}
