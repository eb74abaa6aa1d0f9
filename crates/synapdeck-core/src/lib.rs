//! # Synapdeck Core
//!
//! FSRS spaced-repetition scheduling engine with relationship-aware card
//! selection:
//!
//! - **FSRS memory model**: stability / difficulty / retrievability driven
//!   by a calibrated 19-parameter weight vector
//! - **Review update engine**: per-card state transitions on every graded
//!   review, with a distinct forgetting branch for lapses
//! - **Relationship graph**: peer and prereq/dependent edges constraining
//!   joint scheduling, cycle-safe and failing open
//! - **Due-set selector**: deterministic daily eligibility with same-day
//!   peer burial and day-rollover prereq propagation
//! - **Recompute job**: batch retrievability refresh with per-deck
//!   aggregates, skip-and-count error policy
//!
//! The engine is a library of pure/near-pure transformations over card
//! values: no I/O, no internal locking (except the recompute overlap
//! guard). Persistence, transport, and rendering are collaborator
//! concerns behind the [`SchedulerEngine`] facade.
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::Utc;
//! use synapdeck_core::{FsrsParameters, SchedulerEngine};
//!
//! let mut engine = SchedulerEngine::new(FsrsParameters::default());
//! let id = engine.add_card(
//!     "hebrew",
//!     "One-Way",
//!     vec!["Front".into(), "Back".into()],
//!     vec!["שלום".into(), "peace".into()],
//!     Utc::now(),
//! );
//!
//! // The new card is due immediately
//! let due = engine.due_cards(Utc::now());
//! assert_eq!(due.entries[0].card_id, id);
//!
//! // Grade it "good"
//! let receipt = engine.submit_review(id, 3, Utc::now()).unwrap();
//! assert!(receipt.due_at > Utc::now());
//! ```

#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULES
// ============================================================================

pub mod card;
pub mod engine;
pub mod fsrs;
pub mod graph;
pub mod recompute;
pub mod select;

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================

// Card types
pub use card::{Card, CardCollection, CardId, CardPhase, Grade};

// FSRS memory model
pub use fsrs::{
    DEFAULT_RETENTION,
    // Constants
    FSRS_WEIGHTS,
    FsrsParameters,
    NEW_CARD_RETRIEVABILITY,
    ReviewOutcome,
    ReviewScheduler,
    initial_difficulty,
    initial_stability,
    next_interval,
    // Core functions for advanced usage
    retrievability,
};

// Relationship graph
pub use graph::{RelationEdge, RelationKind, RelationshipGraph};

// Due-set selection
pub use select::{DueEntry, DueSet, bury_dependents_after_lapse, due_cards};

// Recompute job
pub use recompute::{
    RecomputeJob, RecomputeReport, RecomputeStatus, RetrievabilityAggregate, RetrievabilityStats,
};

// Engine facade
pub use engine::{EngineError, Result, ReviewReceipt, SchedulerEngine};

// ============================================================================
// VERSION INFO
// ============================================================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// PRELUDE
// ============================================================================

/// Convenient imports for common usage
pub mod prelude {
    pub use crate::{
        Card, CardCollection, CardId, CardPhase, DueEntry, DueSet, EngineError, FsrsParameters,
        Grade, RecomputeReport, RelationEdge, RelationKind, RelationshipGraph, Result,
        ReviewReceipt, SchedulerEngine,
    };
}
