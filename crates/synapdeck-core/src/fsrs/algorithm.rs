//! FSRS core formulas
//!
//! Pure functions over the 19-parameter weight vector. Everything here is
//! stateless; the weights travel in an [`FsrsParameters`](super::FsrsParameters)
//! value injected at construction, never in module-level mutable state.
//!
//! Core formulas:
//! - Retrievability: R = (1 + FACTOR * t / S)^DECAY
//! - Interval:       t = S * (R_target^(1/DECAY) - 1) / FACTOR

use crate::card::Grade;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Calibrated FSRS weight vector (19 parameters)
pub const FSRS_WEIGHTS: [f64; 19] = [
    0.40255, 1.18385, 3.173, 15.69105, 7.1949, 0.5345, 1.4604, 0.0046, 1.54575, 0.1192, 1.01925,
    1.9395, 0.11, 0.29605, 2.2698, 0.2315, 2.9898, 0.51655, 0.6621,
];

/// Forgetting-curve scale factor (19/81)
pub const FACTOR: f64 = 19.0 / 81.0;

/// Forgetting-curve decay exponent
pub const DECAY: f64 = -0.5;

/// Default target retention when scheduling the next review
pub const DEFAULT_RETENTION: f64 = 0.9;

/// Difficulty bounds; the update formulas stay numerically stable inside them
pub const MIN_DIFFICULTY: f64 = 1.0;
/// Upper difficulty bound
pub const MAX_DIFFICULTY: f64 = 10.0;

/// Minimum scheduling interval in days; prevents zero/negative scheduling
pub const MIN_INTERVAL_DAYS: f64 = 1.0;

/// Retrievability prior assigned to cards that have never been reviewed
pub const NEW_CARD_RETRIEVABILITY: f64 = 0.9;

const MS_PER_DAY: f64 = 86_400_000.0;

/// Clamp difficulty into its fixed range
pub fn clamp_difficulty(d: f64) -> f64 {
    d.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY)
}

/// Elapsed days between two timestamps, clamped at zero so a review
/// "in the future" (clock skew) cannot invert decay
pub fn elapsed_days(
    last_review: chrono::DateTime<chrono::Utc>,
    now: chrono::DateTime<chrono::Utc>,
) -> f64 {
    ((now - last_review).num_milliseconds() as f64 / MS_PER_DAY).max(0.0)
}

// ============================================================================
// INITIAL STATE
// ============================================================================

/// Initial stability for a first review, from custom weights
pub fn initial_stability_with_weights(w: &[f64; 19], grade: Grade) -> f64 {
    w[(grade.as_i32() - 1) as usize]
}

/// Initial stability for a first review. Higher grades start more stable.
pub fn initial_stability(grade: Grade) -> f64 {
    initial_stability_with_weights(&FSRS_WEIGHTS, grade)
}

/// Initial difficulty for a first review, from custom weights
pub fn initial_difficulty_with_weights(w: &[f64; 19], grade: Grade) -> f64 {
    clamp_difficulty(w[4] - (w[5] * (grade.as_i32() - 1) as f64).exp() + 1.0)
}

/// Initial difficulty for a first review. Non-increasing in grade,
/// clamped to [1, 10].
pub fn initial_difficulty(grade: Grade) -> f64 {
    initial_difficulty_with_weights(&FSRS_WEIGHTS, grade)
}

// ============================================================================
// RETRIEVABILITY
// ============================================================================

/// Probability of successful recall after `elapsed_days` given `stability`.
///
/// r(0) = 1, strictly decreasing in elapsed time, strictly increasing in
/// stability, asymptotically approaches 0 without reaching it. Negative
/// elapsed time is clamped to zero.
pub fn retrievability(elapsed_days: f64, stability: f64) -> f64 {
    (1.0 + FACTOR * elapsed_days.max(0.0) / stability).powf(DECAY)
}

// ============================================================================
// POST-REVIEW TRANSITION
// ============================================================================

fn delta_difficulty(w: &[f64; 19], grade: Grade) -> f64 {
    -w[6] * (grade.as_i32() - 3) as f64
}

/// Post-review difficulty from custom weights.
///
/// Mean-reverts toward the initial Easy difficulty, moved easier or harder
/// by the grade, clamped to [1, 10].
pub fn next_difficulty_with_weights(w: &[f64; 19], difficulty: f64, grade: Grade) -> f64 {
    let d_prime = difficulty + delta_difficulty(w, grade) * ((10.0 - difficulty) / 9.0);
    clamp_difficulty(w[7] * initial_difficulty_with_weights(w, Grade::Easy) + (1.0 - w[7]) * d_prime)
}

/// Post-review difficulty with the default weights
pub fn next_difficulty(difficulty: f64, grade: Grade) -> f64 {
    next_difficulty_with_weights(&FSRS_WEIGHTS, difficulty, grade)
}

/// Post-success stability from custom weights.
///
/// Growth scales with how surprising the success was (low retrievability),
/// penalized for hard cards and for a Hard grade, boosted for Easy.
pub fn next_recall_stability_with_weights(
    w: &[f64; 19],
    stability: f64,
    difficulty: f64,
    retrievability: f64,
    grade: Grade,
) -> f64 {
    let t_d = 11.0 - difficulty;
    let t_s = stability.powf(-w[9]);
    let t_r = (w[10] * (1.0 - retrievability)).exp() - 1.0;
    let hard_penalty = if grade == Grade::Hard { w[15] } else { 1.0 };
    let easy_bonus = if grade == Grade::Easy { w[16] } else { 1.0 };

    stability * (1.0 + t_d * t_s * t_r * hard_penalty * easy_bonus * w[8].exp())
}

/// Post-success stability with the default weights
pub fn next_recall_stability(
    stability: f64,
    difficulty: f64,
    retrievability: f64,
    grade: Grade,
) -> f64 {
    next_recall_stability_with_weights(&FSRS_WEIGHTS, stability, difficulty, retrievability, grade)
}

/// Post-lapse stability from custom weights.
///
/// Models forgetting: the result never exceeds the prior stability, and is
/// always below what any success branch would produce.
pub fn next_forget_stability_with_weights(
    w: &[f64; 19],
    stability: f64,
    difficulty: f64,
    retrievability: f64,
) -> f64 {
    let d_f = difficulty.powf(-w[12]);
    let s_f = (stability + 1.0).powf(w[13]) - 1.0;
    let r_f = (w[14] * (1.0 - retrievability)).exp();

    stability.min(w[11] * d_f * s_f * r_f)
}

/// Post-lapse stability with the default weights
pub fn next_forget_stability(stability: f64, difficulty: f64, retrievability: f64) -> f64 {
    next_forget_stability_with_weights(&FSRS_WEIGHTS, stability, difficulty, retrievability)
}

// ============================================================================
// INTERVAL
// ============================================================================

/// Days until retrievability decays to `retention`, by inverting the
/// forgetting curve. At the default 0.9 retention this equals the stability.
pub fn next_interval(stability: f64, retention: f64) -> f64 {
    stability * (retention.powf(1.0 / DECAY) - 1.0) / FACTOR
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const GRADES: [Grade; 4] = [Grade::Again, Grade::Hard, Grade::Good, Grade::Easy];

    #[test]
    fn test_initial_stability_ordered_by_grade() {
        let stabilities: Vec<f64> = GRADES.iter().map(|g| initial_stability(*g)).collect();
        for pair in stabilities.windows(2) {
            assert!(pair[0] < pair[1], "higher grade must start more stable");
        }
        assert!((initial_stability(Grade::Good) - FSRS_WEIGHTS[2]).abs() < 1e-12);
    }

    #[test]
    fn test_initial_difficulty_in_bounds_and_non_increasing() {
        let mut prev = f64::INFINITY;
        for grade in GRADES {
            let d = initial_difficulty(grade);
            assert!((MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&d));
            assert!(d <= prev, "difficulty must not increase with grade");
            prev = d;
        }
    }

    #[test]
    fn test_retrievability_is_one_at_zero_elapsed() {
        for stability in [0.1, 1.0, 10.0, 365.0] {
            assert!((retrievability(0.0, stability) - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_retrievability_strictly_decreasing_in_time() {
        let stability = 10.0;
        let mut prev = retrievability(0.0, stability);
        for days in [1.0, 5.0, 30.0, 365.0, 10_000.0] {
            let r = retrievability(days, stability);
            assert!(r < prev);
            assert!(r > 0.0, "retrievability never reaches zero");
            prev = r;
        }
    }

    #[test]
    fn test_retrievability_strictly_increasing_in_stability() {
        let days = 30.0;
        let mut prev = retrievability(days, 1.0);
        for stability in [2.0, 10.0, 50.0, 500.0] {
            let r = retrievability(days, stability);
            assert!(r > prev);
            prev = r;
        }
    }

    #[test]
    fn test_clock_skew_clamps_to_perfect_recall() {
        // Negative elapsed time must not invert decay
        assert!((retrievability(-3.0, 5.0) - 1.0).abs() < 1e-12);

        let now = chrono::Utc::now();
        let future = now + chrono::Duration::hours(6);
        assert_eq!(elapsed_days(future, now), 0.0);
    }

    #[test]
    fn test_forget_stability_below_every_success_branch() {
        let (s, d, r) = (12.0, 6.0, 0.7);
        let lapse = next_forget_stability(s, d, r);
        assert!(lapse < s, "a lapse must shrink stability");
        for grade in [Grade::Hard, Grade::Good, Grade::Easy] {
            assert!(lapse < next_recall_stability(s, d, r, grade));
        }
    }

    #[test]
    fn test_recall_stability_grows_and_scales_with_surprise() {
        let (s, d) = (10.0, 5.0);
        for grade in [Grade::Hard, Grade::Good, Grade::Easy] {
            assert!(next_recall_stability(s, d, 0.9, grade) > s);
        }
        // Lower retrievability at review time means a more surprising
        // success, which earns more stability
        let surprising = next_recall_stability(s, d, 0.5, Grade::Good);
        let expected = next_recall_stability(s, d, 0.95, Grade::Good);
        assert!(surprising > expected);
    }

    #[test]
    fn test_hard_penalty_and_easy_bonus() {
        let (s, d, r) = (10.0, 5.0, 0.85);
        let hard = next_recall_stability(s, d, r, Grade::Hard);
        let good = next_recall_stability(s, d, r, Grade::Good);
        let easy = next_recall_stability(s, d, r, Grade::Easy);
        assert!(hard < good);
        assert!(good < easy);
    }

    #[test]
    fn test_next_difficulty_bounded_and_monotone() {
        for d in [1.0, 4.3, 10.0] {
            for grade in GRADES {
                let next = next_difficulty(d, grade);
                assert!((MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&next));
            }
            // Again pushes difficulty up, Easy pulls it down
            assert!(next_difficulty(d, Grade::Again) >= next_difficulty(d, Grade::Easy));
        }
    }

    #[test]
    fn test_interval_equals_stability_at_default_retention() {
        // 0.9^(1/-0.5) - 1 = 19/81, so the factors cancel exactly
        for stability in [0.5, 1.0, 15.69105, 100.0] {
            let interval = next_interval(stability, DEFAULT_RETENTION);
            assert!((interval - stability).abs() < 1e-9);
        }
    }

    #[test]
    fn test_interval_shrinks_with_higher_retention_target() {
        let stability = 20.0;
        assert!(next_interval(stability, 0.95) < next_interval(stability, 0.9));
        assert!(next_interval(stability, 0.9) < next_interval(stability, 0.8));
    }
}
