//! Cashout target optimisation.
//!
//! For each candidate cashout multiplier, estimates the win rate over the
//! window and derives the expected value per unit stake. Targets are
//! evaluated independently and returned in the order supplied.

use serde::{Deserialize, Serialize};

use super::round_to;

/// Candidate cashout points evaluated when the caller supplies none.
pub const DEFAULT_TARGETS: [f64; 9] = [1.5, 2.0, 2.5, 3.0, 4.0, 5.0, 10.0, 20.0, 50.0];

/// A target is only recommended when its expected value clears this floor
/// and it wins often enough to be playable.
const RECOMMEND_MIN_EV: f64 = 0.9;
const RECOMMEND_MIN_WIN_RATE: f64 = 30.0;

/// Expected-value profile for one cashout target, assuming a unit stake
/// per round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashoutTarget {
    pub target_multiplier: f64,
    /// Probability of the round reaching the target (%).
    pub win_rate: f64,
    /// Net payout on a win minus the stake lost otherwise, per unit stake.
    pub expected_value: f64,
    pub risk_reward_ratio: f64,
    pub recommended: bool,
}

/// Evaluate every target over a window. Input is assumed validated.
/// An empty window yields no fragments at all.
pub(crate) fn optimize(multipliers: &[f64], targets: Option<&[f64]>) -> Vec<CashoutTarget> {
    let targets: &[f64] = match targets {
        Some(t) if !t.is_empty() => t,
        _ => &DEFAULT_TARGETS,
    };

    let n = multipliers.len();
    if n == 0 {
        return Vec::new();
    }

    targets
        .iter()
        .map(|&target| {
            let wins = multipliers.iter().filter(|&&m| m >= target).count();
            let win_rate = wins as f64 / n as f64 * 100.0;
            let p = win_rate / 100.0;

            let expected_value = p * target - (1.0 - p);
            // Equals target * p; the guard keeps the zero-win case at 0.
            let risk_reward = if win_rate > 0.0 { target * p } else { 0.0 };

            // Both conditions are required: a rare jackpot target is not
            // recommended, and neither is a frequent but unprofitable one.
            let recommended = expected_value > RECOMMEND_MIN_EV && win_rate >= RECOMMEND_MIN_WIN_RATE;

            CashoutTarget {
                target_multiplier: target,
                win_rate: round_to(win_rate, 2),
                expected_value: round_to(expected_value, 4),
                risk_reward_ratio: round_to(risk_reward, 4),
                recommended,
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_window_returns_no_fragments() {
        assert!(optimize(&[], None).is_empty());
        assert!(optimize(&[], Some(&[2.0])).is_empty());
    }

    #[test]
    fn test_default_targets_used_when_none_supplied() {
        let results = optimize(&[2.0, 3.0], None);
        assert_eq!(results.len(), DEFAULT_TARGETS.len());
        for (result, expected) in results.iter().zip(DEFAULT_TARGETS) {
            assert_eq!(result.target_multiplier, expected);
        }
    }

    #[test]
    fn test_empty_target_list_falls_back_to_defaults() {
        let results = optimize(&[2.0, 3.0], Some(&[]));
        assert_eq!(results.len(), 9);
        assert_eq!(results[0].target_multiplier, 1.5);
        assert_eq!(results[8].target_multiplier, 50.0);
    }

    #[test]
    fn test_custom_target_order_preserved() {
        let results = optimize(&[2.0, 3.0, 4.0], Some(&[5.0, 1.2, 3.0]));
        let order: Vec<f64> = results.iter().map(|r| r.target_multiplier).collect();
        assert_eq!(order, vec![5.0, 1.2, 3.0]);
    }

    #[test]
    fn test_win_rate_and_ev() {
        // 2 of 4 rounds reach 2.0: p = 0.5, ev = 0.5*2 - 0.5 = 0.5
        let results = optimize(&[1.5, 2.5, 1.8, 3.0], Some(&[2.0]));
        let r = &results[0];
        assert_eq!(r.win_rate, 50.0);
        assert_eq!(r.expected_value, 0.5);
        assert_eq!(r.risk_reward_ratio, 1.0);
        assert!(!r.recommended);
    }

    #[test]
    fn test_all_rounds_win() {
        let results = optimize(&[3.0, 4.0, 5.0], Some(&[2.0]));
        let r = &results[0];
        assert_eq!(r.win_rate, 100.0);
        assert_eq!(r.expected_value, 2.0);
        assert_eq!(r.risk_reward_ratio, 2.0);
        assert!(r.recommended);
    }

    #[test]
    fn test_no_round_wins() {
        let results = optimize(&[1.1, 1.2], Some(&[10.0]));
        let r = &results[0];
        assert_eq!(r.win_rate, 0.0);
        // Guaranteed loss of the stake
        assert_eq!(r.expected_value, -1.0);
        assert_eq!(r.risk_reward_ratio, 0.0);
        assert!(!r.recommended);
    }

    #[test]
    fn test_high_ev_low_rate_not_recommended() {
        // 1 of 10 rounds reaches 50x: ev = 0.1*50 - 0.9 = 4.1 but the win
        // rate is far below the floor.
        let mut window = vec![1.1; 9];
        window.push(60.0);
        let results = optimize(&window, Some(&[50.0]));
        let r = &results[0];
        assert!(r.expected_value > RECOMMEND_MIN_EV);
        assert!(r.win_rate < RECOMMEND_MIN_WIN_RATE);
        assert!(!r.recommended);
    }

    #[test]
    fn test_low_ev_high_rate_not_recommended() {
        // Every round reaches 1.5x but the edge is too thin:
        // ev = 0.5*1.5 - 0.5 = 0.25 at 50% win rate.
        let results = optimize(&[1.6, 1.1, 1.7, 1.2], Some(&[1.5]));
        let r = &results[0];
        assert!(r.win_rate >= RECOMMEND_MIN_WIN_RATE);
        assert!(r.expected_value <= RECOMMEND_MIN_EV);
        assert!(!r.recommended);
    }

    #[test]
    fn test_win_rate_bounds() {
        let results = optimize(&[1.1, 2.0, 5.5, 100.0], None);
        for r in results {
            assert!(r.win_rate >= 0.0);
            assert!(r.win_rate <= 100.0);
        }
    }

    #[test]
    fn test_target_boundary_counts_as_win() {
        let results = optimize(&[2.0], Some(&[2.0]));
        assert_eq!(results[0].win_rate, 100.0);
    }

    #[test]
    fn test_rounding() {
        // 1 of 3 rounds wins: 33.333...% and ev = (1/3)*3 - 2/3 = 0.3333
        let results = optimize(&[3.0, 1.2, 1.3], Some(&[3.0]));
        let r = &results[0];
        assert_eq!(r.win_rate, 33.33);
        assert_eq!(r.expected_value, 0.3333);
        assert_eq!(r.risk_reward_ratio, 1.0);
    }
}
