//! Crash analytics engine.
//!
//! Seven independent, pure analyses over a sequence of crash outcomes
//! ordered most-recent-first (index 0 is the latest round), bundled on a
//! stateless calculator that holds only the validated threshold set.
//! No I/O and no shared mutable state, so a calculator can be shared by
//! any number of concurrent callers.

pub mod alert;
pub mod analysis;
pub mod cashout;
pub mod hourly;
pub mod moon;
pub mod streaks;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use alert::{AlertLevel, QuickCrashAlert};
pub use analysis::CrashAnalysis;
pub use cashout::{CashoutTarget, DEFAULT_TARGETS};
pub use hourly::{HourlyPatterns, HourlyStats};
pub use moon::MoonTracker;
pub use streaks::{CurrentStreak, SideHistory, StreakHistory, StreakSide, DEFAULT_STREAK_THRESHOLD};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Validation failures surfaced before any analysis runs.
///
/// The engine never raises on an empty sequence; these errors cover
/// structurally malformed input and bad configuration only.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid thresholds: {0}")]
    InvalidThresholds(String),

    #[error("invalid multiplier at index {index}: {value} (must be > 0)")]
    InvalidMultiplier { index: usize, value: f64 },

    #[error("timestamp list shorter than multiplier list ({timestamps} < {multipliers})")]
    TimestampMismatch { multipliers: usize, timestamps: usize },
}

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

/// Configurable cut points for crash analysis, in ascending severity order.
///
/// The first three classify crashes (a round counts when it falls strictly
/// below the cut); the remaining six classify wins (a round counts at or
/// above the cut). Validated once at calculator construction, immutable
/// afterwards.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct CrashThresholds {
    pub instant_crash: f64,
    pub quick_crash: f64,
    pub early_crash: f64,
    pub good_round: f64,
    pub great_round: f64,
    pub big_win: f64,
    pub huge_win: f64,
    pub mega_win: f64,
    pub moon: f64,
}

impl Default for CrashThresholds {
    fn default() -> Self {
        Self {
            instant_crash: 1.10,
            quick_crash: 1.50,
            early_crash: 2.00,
            good_round: 3.00,
            great_round: 5.00,
            big_win: 10.00,
            huge_win: 50.00,
            mega_win: 100.00,
            moon: 1000.00,
        }
    }
}

impl CrashThresholds {
    /// All nine cut points with their names, ascending.
    fn ordered(&self) -> [(&'static str, f64); 9] {
        [
            ("instant_crash", self.instant_crash),
            ("quick_crash", self.quick_crash),
            ("early_crash", self.early_crash),
            ("good_round", self.good_round),
            ("great_round", self.great_round),
            ("big_win", self.big_win),
            ("huge_win", self.huge_win),
            ("mega_win", self.mega_win),
            ("moon", self.moon),
        ]
    }

    /// Every value must be finite, positive, and strictly above the
    /// previous cut point.
    pub fn validate(&self) -> Result<(), EngineError> {
        let ordered = self.ordered();
        for (name, value) in ordered {
            if !value.is_finite() || value <= 0.0 {
                return Err(EngineError::InvalidThresholds(format!(
                    "{name} must be a positive number, got {value}"
                )));
            }
        }
        for pair in ordered.windows(2) {
            let (lo_name, lo) = pair[0];
            let (hi_name, hi) = pair[1];
            if hi <= lo {
                return Err(EngineError::InvalidThresholds(format!(
                    "{hi_name} ({hi}) must exceed {lo_name} ({lo})"
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Shared numeric helpers
// ---------------------------------------------------------------------------

/// Round a value to a fixed number of decimal places.
pub(crate) fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Arithmetic mean; 0 for an empty slice.
pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Reject non-positive or non-finite multipliers and a timestamp slice
/// shorter than the multiplier slice. An empty sequence is valid.
pub(crate) fn validate_sequence(
    multipliers: &[f64],
    timestamps: Option<&[DateTime<Utc>]>,
) -> Result<(), EngineError> {
    for (index, &value) in multipliers.iter().enumerate() {
        if !value.is_finite() || value <= 0.0 {
            return Err(EngineError::InvalidMultiplier { index, value });
        }
    }
    if let Some(ts) = timestamps {
        if ts.len() < multipliers.len() {
            return Err(EngineError::TimestampMismatch {
                multipliers: multipliers.len(),
                timestamps: ts.len(),
            });
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Calculator
// ---------------------------------------------------------------------------

/// Computes crash game statistics over caller-supplied outcome windows.
///
/// Holds nothing but the immutable threshold set; every call recomputes
/// its result from scratch, so two calls with the same input produce
/// identical output.
#[derive(Debug, Clone)]
pub struct CrashCalculator {
    thresholds: CrashThresholds,
}

impl Default for CrashCalculator {
    fn default() -> Self {
        // The built-in thresholds always pass validation.
        Self {
            thresholds: CrashThresholds::default(),
        }
    }
}

impl CrashCalculator {
    /// Build a calculator, rejecting a malformed threshold set up front.
    pub fn new(thresholds: CrashThresholds) -> Result<Self, EngineError> {
        thresholds.validate()?;
        Ok(Self { thresholds })
    }

    /// Access the threshold set.
    pub fn thresholds(&self) -> &CrashThresholds {
        &self.thresholds
    }

    /// Descriptive statistics and threshold-bucket rates over the window.
    pub fn analyze_crashes(
        &self,
        multipliers: &[f64],
        timestamps: Option<&[DateTime<Utc>]>,
    ) -> Result<CrashAnalysis, EngineError> {
        validate_sequence(multipliers, timestamps)?;
        Ok(analysis::analyze(&self.thresholds, multipliers, timestamps))
    }

    /// Quick-crash counts over the last 10/20/50 rounds plus alert level.
    pub fn quick_crash_alert(&self, multipliers: &[f64]) -> Result<QuickCrashAlert, EngineError> {
        validate_sequence(multipliers, None)?;
        Ok(alert::evaluate(self.thresholds.quick_crash, multipliers))
    }

    /// Moon occurrence tracking: recency, gaps, and estimated probability.
    pub fn track_moons(
        &self,
        multipliers: &[f64],
        timestamps: Option<&[DateTime<Utc>]>,
    ) -> Result<MoonTracker, EngineError> {
        validate_sequence(multipliers, timestamps)?;
        Ok(moon::track(self.thresholds.moon, multipliers, timestamps))
    }

    /// Expected-value profile per cashout target. `None` or an empty
    /// target list falls back to [`DEFAULT_TARGETS`].
    pub fn optimize_cashout(
        &self,
        multipliers: &[f64],
        targets: Option<&[f64]>,
    ) -> Result<Vec<CashoutTarget>, EngineError> {
        validate_sequence(multipliers, None)?;
        Ok(cashout::optimize(multipliers, targets))
    }

    /// Current streak and completed-run history around a threshold.
    pub fn streaks(
        &self,
        multipliers: &[f64],
        threshold: f64,
    ) -> Result<(CurrentStreak, StreakHistory), EngineError> {
        validate_sequence(multipliers, None)?;
        Ok(streaks::detect(threshold, multipliers))
    }

    /// Best and worst hours of the day by mean multiplier.
    pub fn hourly_patterns(
        &self,
        rounds: &[(f64, DateTime<Utc>)],
    ) -> Result<HourlyPatterns, EngineError> {
        for (index, &(value, _)) in rounds.iter().enumerate() {
            if !value.is_finite() || value <= 0.0 {
                return Err(EngineError::InvalidMultiplier { index, value });
            }
        }
        Ok(hourly::analyze(rounds))
    }

    /// Run all seven analyses over one window and compose the full report.
    pub fn report(
        &self,
        game: &str,
        period: &str,
        rounds: &[(f64, DateTime<Utc>)],
        targets: Option<&[f64]>,
        streak_threshold: f64,
    ) -> Result<CrashReport, EngineError> {
        let multipliers: Vec<f64> = rounds.iter().map(|&(m, _)| m).collect();
        let timestamps: Vec<DateTime<Utc>> = rounds.iter().map(|&(_, ts)| ts).collect();
        validate_sequence(&multipliers, Some(&timestamps))?;

        let crash_analysis = analysis::analyze(&self.thresholds, &multipliers, Some(&timestamps));
        let quick_crash_alert = alert::evaluate(self.thresholds.quick_crash, &multipliers);
        let moon_tracker = moon::track(self.thresholds.moon, &multipliers, Some(&timestamps));
        let cashout_targets = cashout::optimize(&multipliers, targets);
        let (current_streak, streak_history) = streaks::detect(streak_threshold, &multipliers);
        let patterns = hourly::analyze(rounds);

        Ok(CrashReport {
            game: game.to_string(),
            period: period.to_string(),
            generated_at: Utc::now(),
            crash_analysis,
            current_streak,
            streak_history,
            quick_crash_alert,
            moon_tracker,
            cashout_targets,
            best_hours: patterns.best_hours,
            worst_hours: patterns.worst_hours,
        })
    }
}

// ---------------------------------------------------------------------------
// Aggregate report
// ---------------------------------------------------------------------------

/// Complete crash game statistics for one window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrashReport {
    pub game: String,
    pub period: String,
    pub generated_at: DateTime<Utc>,

    pub crash_analysis: CrashAnalysis,

    pub current_streak: CurrentStreak,
    pub streak_history: StreakHistory,

    pub quick_crash_alert: QuickCrashAlert,
    pub moon_tracker: MoonTracker,

    pub cashout_targets: Vec<CashoutTarget>,

    pub best_hours: Vec<HourlyStats>,
    pub worst_hours: Vec<HourlyStats>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
