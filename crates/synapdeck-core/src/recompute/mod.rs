//! Retrievability recompute job
//!
//! Batch refresh of every card's retrievability estimate against the
//! current time, plus the per-deck and overall aggregates that reporting
//! consumes. Only the retrievability field is ever written — an idempotent,
//! derived value — so overlapping a run with ordinary review submissions
//! is harmless. A mutex still prevents overlapping runs to avoid wasted
//! work and inconsistent stats snapshots.
//!
//! Malformed records are skipped and counted, never fatal: one bad card
//! must not abort the batch.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::card::CardCollection;
use crate::fsrs::{elapsed_days, retrievability};

// ============================================================================
// AGGREGATES
// ============================================================================

/// Retrievability aggregates over a set of cards
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievabilityAggregate {
    /// Number of cards sampled
    pub count: u64,
    /// Mean retrievability
    pub mean: f64,
    /// Minimum retrievability
    pub min: f64,
    /// Maximum retrievability
    pub max: f64,
    /// Population standard deviation
    pub std_dev: f64,
    /// Cards below 50% recall probability
    pub below_50: u64,
    /// Cards below 80% recall probability
    pub below_80: u64,
    /// Cards above 90% recall probability
    pub above_90: u64,
}

impl RetrievabilityAggregate {
    /// Compute aggregates from raw retrievability samples
    pub fn from_samples(samples: &[f64]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        let count = samples.len() as u64;
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        let variance =
            samples.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / samples.len() as f64;
        Self {
            count,
            mean,
            min: samples.iter().copied().fold(f64::INFINITY, f64::min),
            max: samples.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            std_dev: variance.sqrt(),
            below_50: samples.iter().filter(|&&r| r < 0.5).count() as u64,
            below_80: samples.iter().filter(|&&r| r < 0.8).count() as u64,
            above_90: samples.iter().filter(|&&r| r > 0.9).count() as u64,
        }
    }
}

/// Per-deck and overall retrievability aggregates
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievabilityStats {
    /// Aggregate over every sampled card
    pub overall: RetrievabilityAggregate,
    /// Aggregates keyed by deck label
    pub per_deck: BTreeMap<String, RetrievabilityAggregate>,
}

// ============================================================================
// REPORT
// ============================================================================

/// How a recompute trigger ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RecomputeStatus {
    /// Ran to completion
    Completed,
    /// Another run was already in flight; nothing was touched
    Skipped,
}

/// Result of one recompute trigger
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecomputeReport {
    /// Completion status
    pub status: RecomputeStatus,
    /// Wall-clock duration of the run in milliseconds
    pub duration_ms: i64,
    /// Cards whose retrievability was refreshed or confirmed current
    pub cards_processed: u64,
    /// Malformed records skipped
    pub errors: u64,
    /// Aggregates over the recomputed values
    pub stats: RetrievabilityStats,
}

impl RecomputeReport {
    fn skipped() -> Self {
        Self {
            status: RecomputeStatus::Skipped,
            duration_ms: 0,
            cards_processed: 0,
            errors: 0,
            stats: RetrievabilityStats::default(),
        }
    }
}

// ============================================================================
// JOB
// ============================================================================

/// The recompute job with its overlap guard
#[derive(Debug, Default)]
pub struct RecomputeJob {
    guard: Mutex<()>,
}

impl RecomputeJob {
    /// Create a job
    pub fn new() -> Self {
        Self::default()
    }

    /// Refresh every non-suspended card's retrievability against `now` and
    /// aggregate the results. Returns a `Skipped` report if a run is
    /// already in flight.
    pub fn try_run(&self, cards: &mut CardCollection, now: DateTime<Utc>) -> RecomputeReport {
        let Ok(_lock) = self.guard.try_lock() else {
            info!("recompute already in flight, skipping");
            return RecomputeReport::skipped();
        };
        let started = Instant::now();

        let mut processed: u64 = 0;
        let mut errors: u64 = 0;
        let mut per_deck: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        let mut all: Vec<f64> = Vec::new();

        for card in cards.iter_mut() {
            if card.is_suspended() {
                continue;
            }
            if let Err(e) = card.validate() {
                warn!(card_id = card.id, error = %e, "skipping malformed card");
                errors += 1;
                continue;
            }
            // validate() guarantees last_reviewed and positive stability
            // for any card with history
            if let Some(last) = card.last_reviewed.filter(|_| card.has_been_reviewed()) {
                card.retrievability = retrievability(elapsed_days(last, now), card.stability);
            }
            // Never-reviewed cards keep their new-card prior
            processed += 1;
            per_deck
                .entry(card.deck.clone())
                .or_default()
                .push(card.retrievability);
            all.push(card.retrievability);
        }

        let stats = RetrievabilityStats {
            overall: RetrievabilityAggregate::from_samples(&all),
            per_deck: per_deck
                .into_iter()
                .map(|(deck, samples)| (deck, RetrievabilityAggregate::from_samples(&samples)))
                .collect(),
        };

        let duration_ms = started.elapsed().as_millis() as i64;
        info!(
            cards_processed = processed,
            errors, duration_ms, "recompute finished"
        );

        RecomputeReport {
            status: RecomputeStatus::Completed,
            duration_ms,
            cards_processed: processed,
            errors,
            stats,
        }
    }
}

/// Aggregate current retrievability values without touching any card.
/// The read-only companion to [`RecomputeJob::try_run`] for statistics queries.
pub fn current_stats(cards: &CardCollection) -> RetrievabilityStats {
    let mut per_deck: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    let mut all = Vec::new();
    for card in cards.iter() {
        if card.is_suspended() || card.validate().is_err() {
            continue;
        }
        per_deck
            .entry(card.deck.clone())
            .or_default()
            .push(card.retrievability);
        all.push(card.retrievability);
    }
    RetrievabilityStats {
        overall: RetrievabilityAggregate::from_samples(&all),
        per_deck: per_deck
            .into_iter()
            .map(|(deck, samples)| (deck, RetrievabilityAggregate::from_samples(&samples)))
            .collect(),
    }
}

// ============================================================================
// TESTS
// ============================================================================
