//! Review update engine
//!
//! Applies a graded review to a card's memory state: initial values on the
//! first review, the FSRS post-review transition afterwards, then the next
//! interval and due date from the target retention. The whole operation is
//! a value transformation; a rejected review changes nothing.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::card::{Card, CardPhase, Grade, review_date};
use crate::engine::EngineError;

use super::algorithm::{
    DEFAULT_RETENTION, FSRS_WEIGHTS, MIN_INTERVAL_DAYS, elapsed_days, initial_difficulty_with_weights,
    initial_stability_with_weights, next_difficulty_with_weights, next_forget_stability_with_weights,
    next_interval, next_recall_stability_with_weights, retrievability,
};

// ============================================================================
// PARAMETERS
// ============================================================================

/// Immutable scheduler configuration.
///
/// Built once and injected; the weight vector and the magic constants never
/// live in module-level mutable state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FsrsParameters {
    /// FSRS weight vector
    pub weights: [f64; 19],
    /// Desired retention rate when the next review comes due (0.0 - 1.0)
    pub target_retention: f64,
    /// Offset past midnight at which the review day rolls over, in minutes.
    /// Reviews before the rollover belong to the previous day's session.
    pub rollover_minutes: i64,
    /// Interval (days) below which a card is still in short-term learning
    pub learning_window_days: f64,
    /// Floor for the scheduling interval, in days
    pub minimum_interval_days: f64,
}

impl Default for FsrsParameters {
    fn default() -> Self {
        Self {
            weights: FSRS_WEIGHTS,
            target_retention: DEFAULT_RETENTION,
            rollover_minutes: 0,
            learning_window_days: 1.0,
            minimum_interval_days: MIN_INTERVAL_DAYS,
        }
    }
}

impl FsrsParameters {
    /// The rollover offset as a duration
    pub fn rollover(&self) -> Duration {
        Duration::minutes(self.rollover_minutes)
    }

    /// The review day a timestamp belongs to
    pub fn review_date(&self, t: DateTime<Utc>) -> NaiveDate {
        review_date(t, self.rollover())
    }

    /// The instant the next review day starts, relative to `t`
    pub fn next_rollover(&self, t: DateTime<Utc>) -> DateTime<Utc> {
        let next_day = self
            .review_date(t)
            .succ_opt()
            .unwrap_or_else(|| self.review_date(t));
        next_day.and_time(chrono::NaiveTime::MIN).and_utc() + self.rollover()
    }
}

// ============================================================================
// REVIEW OUTCOME
// ============================================================================

/// Result of applying one graded review.
///
/// Carries the updated card plus enough context for the caller to log the
/// transition and to invoke burial of dependents after a lapse.
#[derive(Debug, Clone)]
pub struct ReviewOutcome {
    /// The updated card
    pub card: Card,
    /// Stability before the update (0.0 for a first review)
    pub previous_stability: f64,
    /// Difficulty before the update (0.0 for a first review)
    pub previous_difficulty: f64,
    /// Retrievability observed at review time (1.0 for a first review)
    pub retrievability_at_review: f64,
    /// Whether this review was a lapse (graded Again with prior history)
    pub lapsed: bool,
}

// ============================================================================
// REVIEW SCHEDULER
// ============================================================================

/// The review update engine: applies grades to card memory state
#[derive(Debug, Clone, Default)]
pub struct ReviewScheduler {
    params: FsrsParameters,
}

impl ReviewScheduler {
    /// Create a scheduler with the given parameters
    pub fn new(params: FsrsParameters) -> Self {
        Self { params }
    }

    /// The injected parameters
    pub fn params(&self) -> &FsrsParameters {
        &self.params
    }

    /// Apply a graded review at `reviewed_at`, producing the updated card.
    ///
    /// First reviews take the initial-value path; later reviews observe the
    /// retrievability at review time and run the FSRS transition, with
    /// `Again` taking the forgetting branch. Clock skew (a review timestamp
    /// before the last one) is clamped, never rejected.
    pub fn apply_review(
        &self,
        card: Card,
        grade: Grade,
        reviewed_at: DateTime<Utc>,
    ) -> Result<ReviewOutcome, EngineError> {
        card.validate()?;

        let w = &self.params.weights;
        let previous_stability = card.stability;
        let previous_difficulty = card.difficulty;
        let first_review = !card.has_been_reviewed();

        let (stability, difficulty, observed_r, lapsed) = if first_review {
            (
                initial_stability_with_weights(w, grade),
                initial_difficulty_with_weights(w, grade),
                1.0,
                false,
            )
        } else {
            // validate() guarantees last_reviewed for a card with history
            let last = card.last_reviewed.ok_or_else(|| {
                EngineError::MalformedCardState(format!(
                    "card {}: nonzero history but no last-reviewed timestamp",
                    card.id
                ))
            })?;
            let r = retrievability(elapsed_days(last, reviewed_at), card.stability);
            match grade {
                Grade::Again => (
                    next_forget_stability_with_weights(w, card.stability, card.difficulty, r),
                    next_difficulty_with_weights(w, card.difficulty, grade),
                    r,
                    true,
                ),
                _ => (
                    next_recall_stability_with_weights(w, card.stability, card.difficulty, r, grade),
                    next_difficulty_with_weights(w, card.difficulty, grade),
                    r,
                    false,
                ),
            }
        };

        let interval_days = next_interval(stability, self.params.target_retention)
            .max(self.params.minimum_interval_days);
        let mut due_at = reviewed_at + days_to_duration(interval_days);

        // A brand-new card graded Hard comes due quickly; push it to the
        // start of the next review day so it cannot reappear in the same
        // session.
        if first_review && grade == Grade::Hard {
            let next_day = self.params.next_rollover(reviewed_at);
            if due_at < next_day {
                due_at = next_day;
            }
        }

        let mut card = card;
        card.stability = stability;
        card.difficulty = difficulty;
        card.retrievability = 1.0;
        card.interval_days = interval_days;
        card.due_at = due_at;
        card.past_reviews.push(reviewed_at);
        card.past_grades.push(grade);
        card.most_recent_grade = Some(grade);
        card.last_reviewed = Some(reviewed_at);
        if lapsed {
            card.lapses += 1;
        }
        if card.phase != CardPhase::Suspended {
            // Graduate once the schedule pushes the card beyond the
            // short-term learning window
            card.phase = if interval_days > self.params.learning_window_days {
                CardPhase::Review
            } else {
                CardPhase::Learning
            };
        }

        debug!(
            card_id = card.id,
            grade = %grade,
            stability = format_args!("{:.3}", stability),
            difficulty = format_args!("{:.3}", difficulty),
            retrievability = format_args!("{:.3}", observed_r),
            interval_days = format_args!("{:.1}", interval_days),
            due_at = %due_at,
            "applied review"
        );

        Ok(ReviewOutcome {
            card,
            previous_stability,
            previous_difficulty,
            retrievability_at_review: observed_r,
            lapsed,
        })
    }
}

fn days_to_duration(days: f64) -> Duration {
    Duration::milliseconds((days * 86_400_000.0).round() as i64)
}

// ============================================================================
// TESTS
// ============================================================================
