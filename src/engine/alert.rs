//! Quick-crash alerting.
//!
//! Counts quick crashes inside the most recent 10/20/50 rounds, measures
//! the unbroken quick-crash run at the head of the sequence, and maps the
//! two signals to a four-level alert. Pure classification: the whole
//! "state" lives in the input window.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Alert severity, lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertLevel::Low => write!(f, "low"),
            AlertLevel::Medium => write!(f, "medium"),
            AlertLevel::High => write!(f, "high"),
            AlertLevel::Critical => write!(f, "critical"),
        }
    }
}

/// Quick crash alert data for one window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuickCrashAlert {
    /// Quick crashes within the last 10 rounds (or fewer, if fewer exist).
    pub last_10_quick_crashes: usize,
    pub last_20_quick_crashes: usize,
    pub last_50_quick_crashes: usize,
    pub alert_level: AlertLevel,
    /// Length of the unbroken quick-crash run starting at the latest round.
    pub consecutive_quick_crashes: usize,
}

/// Evaluate the alert over a most-recent-first window.
pub(crate) fn evaluate(quick_threshold: f64, multipliers: &[f64]) -> QuickCrashAlert {
    let count_in =
        |window: usize| multipliers.iter().take(window).filter(|&&m| m < quick_threshold).count();
    let last_10 = count_in(10);
    let last_20 = count_in(20);
    let last_50 = count_in(50);

    let consecutive = multipliers
        .iter()
        .take_while(|&&m| m < quick_threshold)
        .count();

    // First match wins: a long unbroken run outranks a dense window.
    let alert_level = if consecutive >= 5 || last_10 >= 7 {
        AlertLevel::Critical
    } else if consecutive >= 3 || last_10 >= 5 {
        AlertLevel::High
    } else if last_10 >= 4 || last_20 >= 10 {
        AlertLevel::Medium
    } else {
        AlertLevel::Low
    };

    QuickCrashAlert {
        last_10_quick_crashes: last_10,
        last_20_quick_crashes: last_20,
        last_50_quick_crashes: last_50,
        alert_level,
        consecutive_quick_crashes: consecutive,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
