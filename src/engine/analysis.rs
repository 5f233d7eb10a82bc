//! Descriptive crash-point analysis.
//!
//! Summary statistics over one outcome window plus, for each configured
//! threshold, the share of rounds on the relevant side of the cut. Every
//! rate is computed against the same total, so the buckets overlap by
//! design (a moon is also a mega win, a huge win, and so on).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{mean, round_to, CrashThresholds};

/// Crash point analysis for one window.
///
/// Percentages are pre-rounded: two decimals throughout, except the moon
/// rate which keeps four because it is usually a fraction of a percent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrashAnalysis {
    pub total_rounds: usize,
    pub average_crash: f64,
    pub median_crash: f64,
    /// Sample standard deviation; 0 with fewer than two rounds.
    pub std_deviation: f64,

    // Crash rates (strictly below the cut)
    pub instant_crash_rate: f64,
    pub quick_crash_rate: f64,
    pub early_crash_rate: f64,

    // Win rates (at or above the cut)
    pub good_round_rate: f64,
    pub great_round_rate: f64,
    pub big_win_rate: f64,
    pub huge_win_rate: f64,
    pub mega_win_rate: f64,
    pub moon_rate: f64,

    // Records
    pub highest_crash: f64,
    pub lowest_crash: f64,
    /// Timestamp of the most recent moon, when timestamps were supplied.
    pub last_moon: Option<DateTime<Utc>>,
    /// How many rounds ago that moon happened (0 = the latest round).
    pub rounds_since_moon: Option<usize>,
}

impl CrashAnalysis {
    /// The all-zero result for an empty window.
    fn empty() -> Self {
        CrashAnalysis {
            total_rounds: 0,
            average_crash: 0.0,
            median_crash: 0.0,
            std_deviation: 0.0,
            instant_crash_rate: 0.0,
            quick_crash_rate: 0.0,
            early_crash_rate: 0.0,
            good_round_rate: 0.0,
            great_round_rate: 0.0,
            big_win_rate: 0.0,
            huge_win_rate: 0.0,
            mega_win_rate: 0.0,
            moon_rate: 0.0,
            highest_crash: 0.0,
            lowest_crash: 0.0,
            last_moon: None,
            rounds_since_moon: None,
        }
    }
}

/// Analyze one most-recent-first window. Input is assumed validated.
pub(crate) fn analyze(
    t: &CrashThresholds,
    multipliers: &[f64],
    timestamps: Option<&[DateTime<Utc>]>,
) -> CrashAnalysis {
    if multipliers.is_empty() {
        return CrashAnalysis::empty();
    }

    let n = multipliers.len() as f64;
    let rate_below = |cut: f64| multipliers.iter().filter(|&&m| m < cut).count() as f64 / n * 100.0;
    let rate_at_or_above =
        |cut: f64| multipliers.iter().filter(|&&m| m >= cut).count() as f64 / n * 100.0;

    // Most recent moon: first match scanning from the latest round.
    let mut last_moon = None;
    let mut rounds_since_moon = None;
    if let Some(ts) = timestamps {
        for (i, &m) in multipliers.iter().enumerate() {
            if m >= t.moon {
                last_moon = ts.get(i).copied();
                rounds_since_moon = Some(i);
                break;
            }
        }
    }

    let highest_crash = multipliers.iter().copied().fold(f64::MIN, f64::max);
    let lowest_crash = multipliers.iter().copied().fold(f64::MAX, f64::min);

    CrashAnalysis {
        total_rounds: multipliers.len(),
        average_crash: round_to(mean(multipliers), 4),
        median_crash: round_to(median(multipliers), 4),
        std_deviation: round_to(std_deviation(multipliers), 4),
        instant_crash_rate: round_to(rate_below(t.instant_crash), 2),
        quick_crash_rate: round_to(rate_below(t.quick_crash), 2),
        early_crash_rate: round_to(rate_below(t.early_crash), 2),
        good_round_rate: round_to(rate_at_or_above(t.good_round), 2),
        great_round_rate: round_to(rate_at_or_above(t.great_round), 2),
        big_win_rate: round_to(rate_at_or_above(t.big_win), 2),
        huge_win_rate: round_to(rate_at_or_above(t.huge_win), 2),
        mega_win_rate: round_to(rate_at_or_above(t.mega_win), 2),
        moon_rate: round_to(rate_at_or_above(t.moon), 4),
        highest_crash,
        lowest_crash,
        last_moon,
        rounds_since_moon,
    }
}

/// Median of an unsorted sample; even-length samples average the middle pair.
fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Sample standard deviation (Bessel's correction).
fn std_deviation(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let avg = mean(values);
    let variance =
        values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
