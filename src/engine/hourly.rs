//! Hour-of-day pattern aggregation.
//!
//! Buckets every outcome by the hour of its timestamp (dates are ignored)
//! and ranks the observed hours by mean multiplier. This is the only
//! analysis that does not care about sequence order.

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use super::{mean, round_to};

/// Cutoff for the per-hour big-win rate.
const BIG_WIN_CUTOFF: f64 = 10.0;

/// Aggregates for one hour of the day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HourlyStats {
    /// Hour of day, 0 through 23.
    pub hour: u32,
    pub average: f64,
    pub rounds: usize,
    /// Share of rounds at or above 10x within this hour (%).
    pub big_win_rate: f64,
}

/// Ranked best and worst hours.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HourlyPatterns {
    /// Top hours by mean multiplier, best first. At most three.
    pub best_hours: Vec<HourlyStats>,
    /// Bottom hours, worst first. Empty until at least three hours
    /// carry data.
    pub worst_hours: Vec<HourlyStats>,
}

/// Aggregate hourly patterns. Input is assumed validated; order and dates
/// are irrelevant.
pub(crate) fn analyze(rounds: &[(f64, DateTime<Utc>)]) -> HourlyPatterns {
    let mut buckets: [Vec<f64>; 24] = std::array::from_fn(|_| Vec::new());
    for &(multiplier, timestamp) in rounds {
        buckets[timestamp.hour() as usize].push(multiplier);
    }

    let mut stats: Vec<HourlyStats> = buckets
        .iter()
        .enumerate()
        .filter(|(_, bucket)| !bucket.is_empty())
        .map(|(hour, bucket)| {
            let big_wins = bucket.iter().filter(|&&m| m >= BIG_WIN_CUTOFF).count();
            HourlyStats {
                hour: hour as u32,
                average: round_to(mean(bucket), 4),
                rounds: bucket.len(),
                big_win_rate: round_to(big_wins as f64 / bucket.len() as f64 * 100.0, 2),
            }
        })
        .collect();

    stats.sort_by(|a, b| {
        b.average
            .partial_cmp(&a.average)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let best_hours: Vec<HourlyStats> = stats.iter().take(3).cloned().collect();
    let worst_hours: Vec<HourlyStats> = if stats.len() >= 3 {
        stats.iter().rev().take(3).cloned().collect()
    } else {
        Vec::new()
    };

    HourlyPatterns {
        best_hours,
        worst_hours,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at_hour(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, hour, 15, 0).unwrap()
    }

    fn at_hour_on_day(hour: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, hour, 45, 0).unwrap()
    }

    #[test]
    fn test_empty_input() {
        let patterns = analyze(&[]);
        assert!(patterns.best_hours.is_empty());
        assert!(patterns.worst_hours.is_empty());
    }

    #[test]
    fn test_single_hour() {
        let rounds = vec![(2.0, at_hour(9)), (4.0, at_hour(9))];
        let patterns = analyze(&rounds);
        assert_eq!(patterns.best_hours.len(), 1);
        assert_eq!(patterns.best_hours[0].hour, 9);
        assert_eq!(patterns.best_hours[0].average, 3.0);
        assert_eq!(patterns.best_hours[0].rounds, 2);
        assert!(patterns.worst_hours.is_empty());
    }

    #[test]
    fn test_two_hours_no_worst() {
        let rounds = vec![(2.0, at_hour(9)), (5.0, at_hour(14))];
        let patterns = analyze(&rounds);
        assert_eq!(patterns.best_hours.len(), 2);
        // Best first
        assert_eq!(patterns.best_hours[0].hour, 14);
        assert!(patterns.worst_hours.is_empty());
    }

    #[test]
    fn test_three_hours_fills_both_lists() {
        let rounds = vec![(2.0, at_hour(3)), (5.0, at_hour(8)), (9.0, at_hour(20))];
        let patterns = analyze(&rounds);

        let best: Vec<u32> = patterns.best_hours.iter().map(|h| h.hour).collect();
        assert_eq!(best, vec![20, 8, 3]);

        // Worst list leads with the single worst hour.
        let worst: Vec<u32> = patterns.worst_hours.iter().map(|h| h.hour).collect();
        assert_eq!(worst, vec![3, 8, 20]);
    }

    #[test]
    fn test_best_is_top_three_of_many() {
        let rounds = vec![
            (1.5, at_hour(0)),
            (2.5, at_hour(5)),
            (3.5, at_hour(10)),
            (4.5, at_hour(15)),
            (5.5, at_hour(21)),
        ];
        let patterns = analyze(&rounds);
        let best: Vec<u32> = patterns.best_hours.iter().map(|h| h.hour).collect();
        assert_eq!(best, vec![21, 15, 10]);
        let worst: Vec<u32> = patterns.worst_hours.iter().map(|h| h.hour).collect();
        assert_eq!(worst, vec![0, 5, 10]);
    }

    #[test]
    fn test_dates_are_ignored() {
        // Same hour across different days lands in one bucket.
        let rounds = vec![
            (2.0, at_hour_on_day(7, 1)),
            (4.0, at_hour_on_day(7, 9)),
            (6.0, at_hour_on_day(7, 23)),
        ];
        let patterns = analyze(&rounds);
        assert_eq!(patterns.best_hours.len(), 1);
        assert_eq!(patterns.best_hours[0].hour, 7);
        assert_eq!(patterns.best_hours[0].rounds, 3);
        assert_eq!(patterns.best_hours[0].average, 4.0);
    }

    #[test]
    fn test_big_win_rate() {
        let rounds = vec![
            (12.0, at_hour(11)),
            (1.2, at_hour(11)),
            (50.0, at_hour(11)),
            (3.0, at_hour(11)),
        ];
        let patterns = analyze(&rounds);
        assert_eq!(patterns.best_hours[0].big_win_rate, 50.0);
    }

    #[test]
    fn test_big_win_boundary() {
        let rounds = vec![(10.0, at_hour(6))];
        let patterns = analyze(&rounds);
        assert_eq!(patterns.best_hours[0].big_win_rate, 100.0);
    }

    #[test]
    fn test_average_precision() {
        // Mean of 1.0 and 1.2 at four decimals
        let rounds = vec![(1.0, at_hour(2)), (1.2, at_hour(2))];
        let patterns = analyze(&rounds);
        assert_eq!(patterns.best_hours[0].average, 1.1);
    }

    #[test]
    fn test_order_insensitive() {
        let mut rounds = vec![
            (2.0, at_hour(3)),
            (5.0, at_hour(8)),
            (9.0, at_hour(20)),
            (1.1, at_hour(3)),
        ];
        let forward = analyze(&rounds);
        rounds.reverse();
        let backward = analyze(&rounds);
        assert_eq!(
            serde_json::to_string(&forward.best_hours).unwrap(),
            serde_json::to_string(&backward.best_hours).unwrap()
        );
    }
}
