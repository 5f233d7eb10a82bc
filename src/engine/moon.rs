//! Rare-event (moon) tracking.
//!
//! Moons are the extreme outlier wins at or above the configured moon
//! threshold. This analysis reports how many landed in the window, how
//! recently, how far apart, and the observed frequency.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{mean, round_to};

/// Moon tracking data for one window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoonTracker {
    pub total_moons: usize,
    pub last_moon_value: Option<f64>,
    pub last_moon_time: Option<DateTime<Utc>>,
    /// Rounds since the most recent moon; the full window length when the
    /// window holds none (at least this many rounds have passed).
    pub rounds_since_moon: usize,
    /// Mean distance in rounds between consecutive moons; needs two moons.
    pub average_rounds_between_moons: Option<f64>,
    /// Observed moon frequency as a percentage of the window.
    pub moon_probability: f64,
}

/// Track moons over a most-recent-first window. Input is assumed validated.
pub(crate) fn track(
    moon_threshold: f64,
    multipliers: &[f64],
    timestamps: Option<&[DateTime<Utc>]>,
) -> MoonTracker {
    let moon_indices: Vec<usize> = multipliers
        .iter()
        .enumerate()
        .filter(|&(_, &m)| m >= moon_threshold)
        .map(|(i, _)| i)
        .collect();
    let total_moons = moon_indices.len();

    let mut last_moon_value = None;
    let mut last_moon_time = None;
    let mut rounds_since_moon = multipliers.len();
    if let Some(&first) = moon_indices.first() {
        last_moon_value = Some(multipliers[first]);
        rounds_since_moon = first;
        if let Some(ts) = timestamps {
            last_moon_time = ts.get(first).copied();
        }
    }

    // Positions are recorded in recency order, so the difference between
    // adjacent entries is the number of rounds separating consecutive
    // moons. The distance is kept non-negative.
    let average_rounds_between_moons = if total_moons > 1 {
        let gaps: Vec<f64> = moon_indices
            .windows(2)
            .map(|pair| (pair[1] - pair[0]) as f64)
            .collect();
        Some(round_to(mean(&gaps), 1))
    } else {
        None
    };

    let moon_probability = if multipliers.is_empty() {
        0.0
    } else {
        round_to(total_moons as f64 / multipliers.len() as f64 * 100.0, 4)
    };

    MoonTracker {
        total_moons,
        last_moon_value,
        last_moon_time,
        rounds_since_moon,
        average_rounds_between_moons,
        moon_probability,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const MOON: f64 = 1000.0;

    fn timestamps(count: usize) -> Vec<DateTime<Utc>> {
        let base = Utc.with_ymd_and_hms(2026, 3, 14, 22, 0, 0).unwrap();
        (0..count)
            .map(|i| base - chrono::Duration::minutes(i as i64))
            .collect()
    }

    #[test]
    fn test_empty_window() {
        let t = track(MOON, &[], None);
        assert_eq!(t.total_moons, 0);
        assert_eq!(t.rounds_since_moon, 0);
        assert!(t.last_moon_value.is_none());
        assert!(t.last_moon_time.is_none());
        assert!(t.average_rounds_between_moons.is_none());
        assert_eq!(t.moon_probability, 0.0);
    }

    #[test]
    fn test_no_moons_reports_window_length() {
        let t = track(MOON, &[1.2, 5.0, 80.0, 999.99, 2.0], None);
        assert_eq!(t.total_moons, 0);
        assert_eq!(t.rounds_since_moon, 5);
        assert!(t.last_moon_value.is_none());
    }

    #[test]
    fn test_single_moon() {
        let ts = timestamps(4);
        let t = track(MOON, &[1.5, 2.0, 1250.0, 3.0], Some(&ts));
        assert_eq!(t.total_moons, 1);
        assert_eq!(t.last_moon_value, Some(1250.0));
        assert_eq!(t.last_moon_time, Some(ts[2]));
        assert_eq!(t.rounds_since_moon, 2);
        assert!(t.average_rounds_between_moons.is_none());
        assert_eq!(t.moon_probability, 25.0);
    }

    #[test]
    fn test_moon_at_head() {
        let t = track(MOON, &[5000.0, 1.2], None);
        assert_eq!(t.rounds_since_moon, 0);
        assert_eq!(t.last_moon_value, Some(5000.0));
    }

    #[test]
    fn test_boundary_counts_as_moon() {
        let t = track(MOON, &[1000.0], None);
        assert_eq!(t.total_moons, 1);
    }

    #[test]
    fn test_gap_between_two_moons() {
        // Moons at positions 1 and 4: a single gap of 3 rounds.
        let t = track(MOON, &[1.1, 2000.0, 1.2, 1.3, 1500.0], None);
        assert_eq!(t.total_moons, 2);
        assert_eq!(t.average_rounds_between_moons, Some(3.0));
    }

    #[test]
    fn test_gap_average_over_three_moons() {
        // Moons at 0, 2, and 6: gaps of 2 and 4 average to 3.0.
        let t = track(
            MOON,
            &[1100.0, 1.2, 1200.0, 1.3, 1.4, 1.5, 1300.0],
            None,
        );
        assert_eq!(t.total_moons, 3);
        assert_eq!(t.average_rounds_between_moons, Some(3.0));
    }

    #[test]
    fn test_gap_is_never_negative() {
        let t = track(MOON, &[2000.0, 1500.0, 1200.0], None);
        assert_eq!(t.average_rounds_between_moons, Some(1.0));
        assert!(t.average_rounds_between_moons.unwrap() >= 0.0);
    }

    #[test]
    fn test_probability_precision() {
        // 1 moon in 7 rounds: 14.2857% at four decimals
        let t = track(MOON, &[1.2, 1.3, 1.4, 1100.0, 1.5, 1.6, 1.7], None);
        assert_eq!(t.moon_probability, 14.2857);
    }

    #[test]
    fn test_without_timestamps_time_is_none() {
        let t = track(MOON, &[1100.0], None);
        assert_eq!(t.total_moons, 1);
        assert!(t.last_moon_time.is_none());
        assert_eq!(t.last_moon_value, Some(1100.0));
    }
}
