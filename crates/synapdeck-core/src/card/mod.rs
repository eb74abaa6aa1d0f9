//! Card module - Core types and data structures
//!
//! Implements the unit of study content and its memory state:
//! - Cards with FSRS scheduling state (stability, difficulty, retrievability)
//! - Parallel review/grade history
//! - Phase lifecycle (new → learning → review, plus suspension)
//! - Date-scoped burial that expires on its own at day rollover

mod collection;

pub use collection::CardCollection;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::EngineError;
use crate::fsrs::NEW_CARD_RETRIEVABILITY;

/// Card identifier. Dense integer ids, assigned by the collection.
pub type CardId = i64;

// ============================================================================
// GRADE
// ============================================================================

/// Learner's self-reported recall quality for a single review.
///
/// Serialized as its numeric value (1-4) to match the stored review history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum Grade {
    /// Complete failure to recall (a lapse)
    Again = 1,
    /// Recalled with significant effort
    Hard = 2,
    /// Recalled correctly
    Good = 3,
    /// Recalled effortlessly
    Easy = 4,
}

impl Grade {
    /// Parse a raw grade value, returning `None` outside 1-4
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            1 => Some(Grade::Again),
            2 => Some(Grade::Hard),
            3 => Some(Grade::Good),
            4 => Some(Grade::Easy),
            _ => None,
        }
    }

    /// Numeric value used by the FSRS formulas
    pub fn as_i32(&self) -> i32 {
        *self as i32
    }

    /// Whether this grade counts as a successful recall
    pub fn is_success(&self) -> bool {
        !matches!(self, Grade::Again)
    }

    /// Human-readable name
    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::Again => "again",
            Grade::Hard => "hard",
            Grade::Good => "good",
            Grade::Easy => "easy",
        }
    }
}

impl TryFrom<i32> for Grade {
    type Error = EngineError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Grade::from_i32(value).ok_or(EngineError::InvalidGrade(value))
    }
}

impl From<Grade> for i32 {
    fn from(grade: Grade) -> i32 {
        grade.as_i32()
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// CARD PHASE
// ============================================================================

/// Lifecycle phase of a card.
///
/// A tagged variant instead of independent booleans, so impossible
/// combinations (suspended-and-learning, new-with-history) cannot be
/// represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CardPhase {
    /// Never reviewed
    #[default]
    New,
    /// Inside the short-term learning window (interval has not yet
    /// grown past it); prerequisites in this phase block their dependents
    Learning,
    /// Graduated to long-term review
    Review,
    /// Indefinitely excluded from scheduling until manually resumed
    Suspended,
}

impl CardPhase {
    /// String name, used for display and store inspection
    pub fn as_str(&self) -> &'static str {
        match self {
            CardPhase::New => "new",
            CardPhase::Learning => "learning",
            CardPhase::Review => "review",
            CardPhase::Suspended => "suspended",
        }
    }
}

impl std::fmt::Display for CardPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// CARD
// ============================================================================

/// A unit of study content and its memory state.
///
/// Content fields are opaque to the scheduler. Stability and difficulty are
/// only ever written by the review update engine or the initial-value
/// functions; retrievability is a derived value refreshed by the recompute
/// job and reset to 1.0 on review.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    /// Unique identifier
    pub id: CardId,
    /// Owning deck label
    pub deck: String,
    /// Card format name (e.g. "One-Way", "Two-Way-Front")
    pub card_format: String,
    /// Ordered field names (content, opaque to the scheduler)
    pub field_names: Vec<String>,
    /// Ordered field values, parallel to `field_names`
    pub field_values: Vec<String>,
    /// When the card was authored or imported
    pub created_at: DateTime<Utc>,
    /// When the card next comes due
    pub due_at: DateTime<Utc>,
    /// Current scheduling interval in days
    pub interval_days: f64,
    /// Timestamps of past reviews, oldest first
    pub past_reviews: Vec<DateTime<Utc>>,
    /// Grades of past reviews, parallel to `past_reviews`
    pub past_grades: Vec<Grade>,
    /// Estimated probability of successful recall right now (0.0 - 1.0)
    pub retrievability: f64,
    /// Memory stability in days; grows with successful recall
    pub stability: f64,
    /// Inherent difficulty (1.0 = easy, 10.0 = hard)
    pub difficulty: f64,
    /// Number of lapses (graded Again after prior reviews)
    pub lapses: i32,
    /// Grade of the most recent review
    pub most_recent_grade: Option<Grade>,
    /// Timestamp of the most recent review
    pub last_reviewed: Option<DateTime<Utc>>,
    /// Lifecycle phase
    pub phase: CardPhase,
    /// Date on which the card is buried (same-day peer suppression).
    /// Expires on its own once the date has passed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buried_on: Option<NaiveDate>,
    /// Future date on which the card will be buried (set when a
    /// prerequisite lapses, so the dependent is skipped the next day)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bury_on: Option<NaiveDate>,
}

impl Default for Card {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            deck: String::new(),
            card_format: String::new(),
            field_names: vec![],
            field_values: vec![],
            created_at: now,
            due_at: now,
            interval_days: 0.0,
            past_reviews: vec![],
            past_grades: vec![],
            retrievability: NEW_CARD_RETRIEVABILITY,
            stability: 0.0,
            difficulty: 0.0,
            lapses: 0,
            most_recent_grade: None,
            last_reviewed: None,
            phase: CardPhase::New,
            buried_on: None,
            bury_on: None,
        }
    }
}

impl Card {
    /// Create a new card in the given deck, due immediately
    pub fn new(id: CardId, deck: impl Into<String>) -> Self {
        Self {
            id,
            deck: deck.into(),
            ..Default::default()
        }
    }

    /// Whether the card has ever been reviewed
    pub fn has_been_reviewed(&self) -> bool {
        !self.past_reviews.is_empty()
    }

    /// Whether the card is indefinitely excluded from scheduling
    pub fn is_suspended(&self) -> bool {
        self.phase == CardPhase::Suspended
    }

    /// Whether the card is still inside the short-term learning window
    pub fn under_review(&self) -> bool {
        self.phase == CardPhase::Learning
    }

    /// Whether the card has graduated past initial learning: reviewed
    /// successfully at least once and no longer in the learning window.
    /// Prerequisites must graduate before their dependents become eligible.
    pub fn graduated(&self) -> bool {
        self.past_grades.iter().any(Grade::is_success)
            && !matches!(self.phase, CardPhase::New | CardPhase::Learning)
    }

    /// Whether the card is buried on the given review date, either by
    /// same-day peer suppression or by a deferred burial that has matured
    pub fn is_buried(&self, date: NaiveDate) -> bool {
        self.buried_on == Some(date) || self.bury_on == Some(date)
    }

    /// Whether the burial is today-only (peer suppression), as opposed to a
    /// deferred burial scheduled for a later date
    pub fn is_only_buried_today(&self, date: NaiveDate) -> bool {
        self.buried_on == Some(date)
    }

    /// Review date of the most recent review under the given rollover
    /// offset, or `None` for a never-reviewed card
    pub fn last_review_date(&self, rollover: Duration) -> Option<NaiveDate> {
        self.last_reviewed.map(|t| review_date(t, rollover))
    }

    /// Whether the most recent review fell on the given review date
    pub fn reviewed_on(&self, date: NaiveDate, rollover: Duration) -> bool {
        self.last_review_date(rollover) == Some(date)
    }

    /// Whether the card was reviewed today, relative to `now`
    pub fn reviewed_today(&self, now: DateTime<Utc>, rollover: Duration) -> bool {
        self.reviewed_on(review_date(now, rollover), rollover)
    }

    /// Whether the card was reviewed yesterday, relative to `now`
    pub fn reviewed_yesterday(&self, now: DateTime<Utc>, rollover: Duration) -> bool {
        match review_date(now, rollover).pred_opt() {
            Some(yesterday) => self.reviewed_on(yesterday, rollover),
            None => false,
        }
    }

    /// Check internal invariants.
    ///
    /// Violations mean the record was corrupted outside the engine; callers
    /// treat them as `MalformedCardState` and skip or reject the record.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.past_reviews.len() != self.past_grades.len() {
            return Err(EngineError::MalformedCardState(format!(
                "card {}: {} past reviews but {} past grades",
                self.id,
                self.past_reviews.len(),
                self.past_grades.len()
            )));
        }
        if self.has_been_reviewed() {
            if self.last_reviewed.is_none() {
                return Err(EngineError::MalformedCardState(format!(
                    "card {}: nonzero history but no last-reviewed timestamp",
                    self.id
                )));
            }
            if self.stability <= 0.0 {
                return Err(EngineError::MalformedCardState(format!(
                    "card {}: non-positive stability {} after review",
                    self.id, self.stability
                )));
            }
        }
        Ok(())
    }
}

/// Map a timestamp to its review date: the calendar day it belongs to once
/// the configured rollover offset past midnight is subtracted. A review at
/// 01:00 with a 3-hour rollover still counts as the previous day's session.
pub fn review_date(t: DateTime<Utc>, rollover: Duration) -> NaiveDate {
    (t - rollover).date_naive()
}

// ============================================================================
// TESTS
// ============================================================================
