//! Scheduler engine facade
//!
//! Ties the collection, relationship graph, review update engine, due-set
//! selector, and recompute job together behind the boundary contracts a
//! collaborator surface (CLI, HTTP) consumes: submit review, get due set,
//! trigger recompute, get statistics, plus card and edge authoring.
//!
//! The engine is logically single-writer-per-card and performs no internal
//! locking beyond the recompute overlap guard; serializing concurrent
//! writes to the same card is the storage collaborator's job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::card::{Card, CardCollection, CardId, CardPhase, Grade};
use crate::fsrs::{FsrsParameters, ReviewScheduler};
use crate::graph::{RelationEdge, RelationKind, RelationshipGraph};
use crate::recompute::{RecomputeJob, RecomputeReport, RetrievabilityStats, current_stats};
use crate::select::{DueSet, bury_dependents_after_lapse, due_cards};

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Engine error taxonomy.
///
/// Clock skew is deliberately absent: negative elapsed time is clamped,
/// never rejected.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Grade outside 1-4; rejected before any mutation
    #[error("invalid grade: {0} (expected 1=again, 2=hard, 3=good, 4=easy)")]
    InvalidGrade(i32),
    /// Card id not present in the collection; no mutation
    #[error("unknown card: {0}")]
    UnknownCard(CardId),
    /// Internal card invariant violated (history mismatch, non-positive
    /// stability). Batch jobs skip and count these; submissions reject them.
    #[error("malformed card state: {0}")]
    MalformedCardState(String),
}

/// Engine result type
pub type Result<T> = std::result::Result<T, EngineError>;

// ============================================================================
// REVIEW RECEIPT
// ============================================================================

/// Updated card fields returned to the collaborator after a submitted review
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewReceipt {
    /// The reviewed card
    pub card_id: CardId,
    /// Its deck
    pub deck: String,
    /// The grade applied
    pub grade: Grade,
    /// New stability (days)
    pub stability: f64,
    /// New difficulty
    pub difficulty: f64,
    /// Retrievability observed at review time
    pub retrievability_at_review: f64,
    /// New scheduling interval (days)
    pub interval_days: f64,
    /// When the card next comes due
    pub due_at: DateTime<Utc>,
    /// Whether this review was a lapse
    pub lapsed: bool,
    /// Dependents scheduled for burial tomorrow because of this lapse
    pub buried_dependents: Vec<CardId>,
}

// ============================================================================
// ENGINE
// ============================================================================

/// The scheduling engine over one card collection and its relationship graph
#[derive(Debug, Default)]
pub struct SchedulerEngine {
    cards: CardCollection,
    graph: RelationshipGraph,
    scheduler: ReviewScheduler,
    recompute: RecomputeJob,
}

impl SchedulerEngine {
    /// Create an empty engine with the given parameters
    pub fn new(params: FsrsParameters) -> Self {
        Self {
            scheduler: ReviewScheduler::new(params),
            ..Default::default()
        }
    }

    /// Create an engine over existing state (e.g. loaded from a store)
    pub fn with_state(
        cards: CardCollection,
        graph: RelationshipGraph,
        params: FsrsParameters,
    ) -> Self {
        Self {
            cards,
            graph,
            scheduler: ReviewScheduler::new(params),
            recompute: RecomputeJob::new(),
        }
    }

    /// The card collection
    pub fn cards(&self) -> &CardCollection {
        &self.cards
    }

    /// The relationship graph
    pub fn graph(&self) -> &RelationshipGraph {
        &self.graph
    }

    /// The scheduler parameters
    pub fn params(&self) -> &FsrsParameters {
        self.scheduler.params()
    }

    /// Tear down into collection and edge list for persistence
    pub fn into_state(self) -> (CardCollection, Vec<RelationEdge>) {
        (self.cards, self.graph.edges())
    }

    // ========================================================================
    // BOUNDARY CONTRACTS
    // ========================================================================

    /// Submit a graded review.
    ///
    /// Validates the raw grade and the card id before anything mutates; a
    /// rejected review leaves the card unchanged and still due. On a lapse,
    /// direct dependents are scheduled for burial tomorrow.
    pub fn submit_review(
        &mut self,
        card_id: CardId,
        grade: i32,
        reviewed_at: DateTime<Utc>,
    ) -> Result<ReviewReceipt> {
        let grade = Grade::from_i32(grade).ok_or(EngineError::InvalidGrade(grade))?;
        let card = self
            .cards
            .get(card_id)
            .ok_or(EngineError::UnknownCard(card_id))?
            .clone();

        let outcome = self.scheduler.apply_review(card, grade, reviewed_at)?;
        let receipt_card = &outcome.card;
        let mut receipt = ReviewReceipt {
            card_id,
            deck: receipt_card.deck.clone(),
            grade,
            stability: receipt_card.stability,
            difficulty: receipt_card.difficulty,
            retrievability_at_review: outcome.retrievability_at_review,
            interval_days: receipt_card.interval_days,
            due_at: receipt_card.due_at,
            lapsed: outcome.lapsed,
            buried_dependents: vec![],
        };
        self.cards.insert(outcome.card);

        if receipt.lapsed {
            receipt.buried_dependents = bury_dependents_after_lapse(
                &mut self.cards,
                &self.graph,
                card_id,
                self.scheduler.params(),
                reviewed_at,
            );
        }
        info!(
            card_id,
            grade = %grade,
            lapsed = receipt.lapsed,
            due_at = %receipt.due_at,
            "review submitted"
        );
        Ok(receipt)
    }

    /// The ordered set of cards eligible for review at `now`.
    ///
    /// Applies peer burial as a side effect; treat one call as a
    /// transaction together with its returned set.
    pub fn due_cards(&mut self, now: DateTime<Utc>) -> DueSet {
        due_cards(&mut self.cards, &self.graph, self.scheduler.params(), now)
    }

    /// Refresh every card's retrievability against `now` and return the
    /// run report with aggregates
    pub fn trigger_recompute(&mut self, now: DateTime<Utc>) -> RecomputeReport {
        self.recompute.try_run(&mut self.cards, now)
    }

    /// Per-deck and overall retrievability aggregates over the current
    /// (possibly recompute-stale) values, without touching any card
    pub fn statistics(&self) -> RetrievabilityStats {
        current_stats(&self.cards)
    }

    // ========================================================================
    // AUTHORING (collaborator operations)
    // ========================================================================

    /// Author a new card, assigning the next free id. Returns the id.
    pub fn add_card(
        &mut self,
        deck: impl Into<String>,
        card_format: impl Into<String>,
        field_names: Vec<String>,
        field_values: Vec<String>,
        created_at: DateTime<Utc>,
    ) -> CardId {
        let id = self.cards.next_id();
        let card = Card {
            id,
            deck: deck.into(),
            card_format: card_format.into(),
            field_names,
            field_values,
            created_at,
            due_at: created_at,
            ..Default::default()
        };
        self.cards.insert(card);
        id
    }

    /// Look up a card
    pub fn get_card(&self, id: CardId) -> Result<&Card> {
        self.cards.get(id).ok_or(EngineError::UnknownCard(id))
    }

    /// Suspend a card: indefinitely excluded from the due set until resumed
    pub fn suspend(&mut self, id: CardId) -> Result<()> {
        let card = self.cards.get_mut(id).ok_or(EngineError::UnknownCard(id))?;
        card.phase = CardPhase::Suspended;
        Ok(())
    }

    /// Lift a suspension. The card resumes in the phase its history implies.
    pub fn resume(&mut self, id: CardId) -> Result<()> {
        let params = self.scheduler.params().clone();
        let card = self.cards.get_mut(id).ok_or(EngineError::UnknownCard(id))?;
        if card.phase == CardPhase::Suspended {
            card.phase = if !card.has_been_reviewed() {
                CardPhase::New
            } else if card.interval_days > params.learning_window_days {
                CardPhase::Review
            } else {
                CardPhase::Learning
            };
        }
        Ok(())
    }

    /// Add a relationship edge. For `Prereq`, `source` is the prerequisite
    /// and `target` the dependent.
    pub fn relate(&mut self, source: CardId, target: CardId, kind: RelationKind) -> Result<()> {
        self.require_cards(source, target)?;
        match kind {
            RelationKind::Peer => self.graph.add_peer(source, target),
            RelationKind::Prereq => self.graph.add_prereq(target, source),
        }
        Ok(())
    }

    /// Remove a relationship edge
    pub fn unrelate(&mut self, source: CardId, target: CardId, kind: RelationKind) -> Result<()> {
        self.require_cards(source, target)?;
        match kind {
            RelationKind::Peer => self.graph.remove_peer(source, target),
            RelationKind::Prereq => self.graph.remove_prereq(target, source),
        }
        Ok(())
    }

    fn require_cards(&self, a: CardId, b: CardId) -> Result<()> {
        for id in [a, b] {
            if !self.cards.contains(id) {
                return Err(EngineError::UnknownCard(id));
            }
        }
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
