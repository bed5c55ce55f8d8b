//! Pure scoring functions. Everything here is deterministic.

use cg_core::POINTS_PERFECT;
use cg_core::Points;
use cg_core::Pounds;
use cg_core::SCORE_DECAY;
use cg_core::STREAK_TOLERANCE;

pub fn difference(actual: Pounds, guessed: Pounds) -> Pounds {
    (actual - guessed).abs()
}

/// Absolute error as a percentage of the actual price.
pub fn percentage(actual: Pounds, guessed: Pounds) -> f64 {
    100.0 * difference(actual, guessed) as f64 / actual as f64
}

/// Challenge points: exponential decay from 5000, floored to zero once
/// the guess is off by 100% or more.
pub fn points(percentage: f64) -> Points {
    if percentage >= 100.0 {
        0
    } else {
        (POINTS_PERFECT as f64 * (-percentage / SCORE_DECAY).exp()).round() as Points
    }
}

/// Streak mode counts a guess as correct within 10%.
pub fn within_tolerance(percentage: f64) -> bool {
    percentage <= STREAK_TOLERANCE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_guess_scores_5000() {
        assert_eq!(percentage(18500, 18500), 0.0);
        assert_eq!(points(0.0), 5000);
    }

    #[test]
    fn hundred_percent_error_scores_zero() {
        assert_eq!(points(100.0), 0);
        assert_eq!(points(250.0), 0);
    }

    #[test]
    fn points_decay_monotonically() {
        let mut last = points(0.0);
        for pct in 1..=120 {
            let next = points(pct as f64);
            assert!(next <= last, "points rose at {}%", pct);
            last = next;
        }
    }

    #[test]
    fn points_stay_in_bounds() {
        for pct in 0..200 {
            let p = points(pct as f64 / 2.0);
            assert!((0..=5000).contains(&p));
        }
    }

    #[test]
    fn known_values() {
        // 5000 * e^(-10/20) = 3032.65..., 5000 * e^(-20/20) = 1839.39...
        assert_eq!(points(10.0), 3033);
        assert_eq!(points(20.0), 1839);
    }

    #[test]
    fn scoring_is_pure() {
        assert_eq!(points(percentage(10000, 11500)), points(percentage(10000, 11500)));
    }

    #[test]
    fn streak_tolerance_boundary() {
        assert!(within_tolerance(10.0));
        assert!(!within_tolerance(10.01));
        // S2: £10,000 actual, £11,500 guessed is a 15% miss
        let pct = percentage(10_000, 11_500);
        assert_eq!(pct, 15.0);
        assert!(!within_tolerance(pct));
    }

    #[test]
    fn difference_is_symmetric() {
        assert_eq!(difference(10_000, 11_500), 1500);
        assert_eq!(difference(11_500, 10_000), 1500);
        assert_eq!(difference(500, 0), 500);
    }
}
