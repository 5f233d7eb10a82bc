//! Threshold streak detection.
//!
//! Splits the window into maximal runs of rounds on the same side of a
//! classification threshold. One pass produces both the run currently in
//! progress at the head of the sequence and aggregates over all completed
//! runs. The run still open when the scan ends never reaches the history.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{mean, round_to};

/// Default classification threshold for streak analysis.
pub const DEFAULT_STREAK_THRESHOLD: f64 = 2.0;

/// Which side of the threshold a run sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreakSide {
    Below,
    Above,
}

impl fmt::Display for StreakSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreakSide::Below => write!(f, "below"),
            StreakSide::Above => write!(f, "above"),
        }
    }
}

/// The unbroken run at the head of the sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentStreak {
    #[serde(rename = "type")]
    pub side: StreakSide,
    pub count: usize,
    pub threshold: f64,
}

/// Aggregates over the completed runs of one side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SideHistory {
    pub max: usize,
    pub average: f64,
    pub total: usize,
}

impl SideHistory {
    fn from_runs(runs: &[usize]) -> Self {
        if runs.is_empty() {
            return SideHistory {
                max: 0,
                average: 0.0,
                total: 0,
            };
        }
        let lengths: Vec<f64> = runs.iter().map(|&r| r as f64).collect();
        SideHistory {
            max: runs.iter().copied().max().unwrap_or(0),
            average: round_to(mean(&lengths), 2),
            total: runs.len(),
        }
    }
}

/// Completed-run aggregates for both sides of the threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreakHistory {
    pub below: SideHistory,
    pub above: SideHistory,
}

/// Detect streaks over a most-recent-first window. Input is assumed
/// validated.
pub(crate) fn detect(threshold: f64, multipliers: &[f64]) -> (CurrentStreak, StreakHistory) {
    // An empty window defaults to an "above" streak of zero.
    let side = match multipliers.first() {
        Some(&m) if m < threshold => StreakSide::Below,
        _ => StreakSide::Above,
    };
    let count = multipliers
        .iter()
        .take_while(|&&m| match side {
            StreakSide::Below => m < threshold,
            StreakSide::Above => m >= threshold,
        })
        .count();

    let mut below_runs: Vec<usize> = Vec::new();
    let mut above_runs: Vec<usize> = Vec::new();
    let mut open_below = 0usize;
    let mut open_above = 0usize;

    for &m in multipliers {
        if m < threshold {
            open_below += 1;
            if open_above > 0 {
                above_runs.push(open_above);
                open_above = 0;
            }
        } else {
            open_above += 1;
            if open_below > 0 {
                below_runs.push(open_below);
                open_below = 0;
            }
        }
    }

    (
        CurrentStreak {
            side,
            count,
            threshold,
        },
        StreakHistory {
            below: SideHistory::from_runs(&below_runs),
            above: SideHistory::from_runs(&above_runs),
        },
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
