//! Shared types for the CRASHLENS tracker.
//!
//! These types form the data model used across the collector, storage,
//! and API modules. The analytics engine defines its own report fragment
//! types under `engine`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Round
// ---------------------------------------------------------------------------

/// A single recorded crash-game round.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Round {
    /// Provider-assigned round identifier (unique per game).
    pub round_id: String,
    /// Multiplier at which the round crashed. Always > 0.
    pub multiplier: f64,
    /// X coordinate of the crash point (Space XY trajectory games).
    pub coordinate_x: Option<f64>,
    /// Y coordinate of the crash point.
    pub coordinate_y: Option<f64>,
    /// Provably fair hash, when the provider publishes one.
    pub hash: Option<String>,
    /// When the round was recorded.
    pub created_at: DateTime<Utc>,
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {:.2}x @ {}",
            self.round_id,
            self.multiplier,
            self.created_at.format("%Y-%m-%d %H:%M:%S"),
        )
    }
}

impl Round {
    /// Helper to build a test round with sensible defaults.
    #[cfg(test)]
    pub fn sample(round_id: &str, multiplier: f64) -> Self {
        Round {
            round_id: round_id.to_string(),
            multiplier,
            coordinate_x: Some(42.5),
            coordinate_y: Some(17.3),
            hash: Some("deadbeef".to_string()),
            created_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for the tracker boundary layers.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("Invalid round: {0}")]
    InvalidRound(String),

    #[error("Collector error ({feed}): {message}")]
    Collector { feed: String, message: String },
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_display() {
        let round = Round::sample("r-001", 2.37);
        let display = format!("{round}");
        assert!(display.contains("r-001"));
        assert!(display.contains("2.37x"));
    }

    #[test]
    fn test_round_serialization_roundtrip() {
        let round = Round::sample("r-002", 1.08);
        let json = serde_json::to_string(&round).unwrap();
        let parsed: Round = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.round_id, "r-002");
        assert!((parsed.multiplier - 1.08).abs() < 1e-10);
        assert_eq!(parsed.hash.as_deref(), Some("deadbeef"));
    }

    #[test]
    fn test_round_optional_fields_null() {
        let round = Round {
            round_id: "r-003".to_string(),
            multiplier: 5.0,
            coordinate_x: None,
            coordinate_y: None,
            hash: None,
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&round).unwrap();
        assert!(json.contains("\"coordinate_x\":null"));
        assert!(json.contains("\"hash\":null"));
    }

    #[test]
    fn test_tracker_error_display() {
        let e = TrackerError::InvalidRound("multiplier must be positive, got -1".to_string());
        assert!(format!("{e}").contains("multiplier must be positive"));

        let e = TrackerError::Collector {
            feed: "https://feed.example.com".to_string(),
            message: "connection refused".to_string(),
        };
        assert!(format!("{e}").contains("feed.example.com"));
        assert!(format!("{e}").contains("connection refused"));
    }
}
