//! FSRS (Free Spaced Repetition Scheduler) Module
//!
//! Memory model parameterized by stability, difficulty, and retrievability,
//! driven by a calibrated 19-parameter weight vector.
//!
//! ## Core formulas:
//! - Retrievability: R = (1 + FACTOR * t / S)^DECAY where FACTOR = 19/81, DECAY = -0.5
//! - Interval: t = S * (R_target^(1/DECAY) - 1) / FACTOR

pub mod algorithm;
mod scheduler;

pub use algorithm::{
    clamp_difficulty,
    elapsed_days,
    initial_difficulty,
    initial_difficulty_with_weights,
    initial_stability,
    initial_stability_with_weights,
    next_difficulty,
    next_difficulty_with_weights,
    next_forget_stability,
    next_forget_stability_with_weights,
    next_interval,
    next_recall_stability,
    next_recall_stability_with_weights,
    // Core functions
    retrievability,
    DECAY,
    DEFAULT_RETENTION,
    FACTOR,
    // Constants
    FSRS_WEIGHTS,
    MAX_DIFFICULTY,
    MIN_DIFFICULTY,
    MIN_INTERVAL_DAYS,
    NEW_CARD_RETRIEVABILITY,
};

pub use scheduler::{FsrsParameters, ReviewOutcome, ReviewScheduler};
