//! Feed collector.
//!
//! Polls a crash-game feed for round-end messages, sniffs the multiplier
//! and round id out of provider-specific payload shapes, and persists the
//! rounds. Failed polls back off exponentially up to a retry budget; a
//! successful poll resets the counter. A test mode seeds the store with
//! synthetic rounds drawn from the standard crash distribution instead.

use anyhow::{Context, Result};
use rand::Rng;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::CollectorConfig;
use crate::storage::RoundStore;
use crate::types::TrackerError;

// ---------------------------------------------------------------------------
// Field tables
// ---------------------------------------------------------------------------

/// Known field names for multiplier extraction across game providers.
const MULTIPLIER_FIELDS: &[&str] = &[
    "multiplier",
    "crash",
    "crashedAt",
    "result",
    "payout",
    "crashMultiplier",
    "odds",
    "coefficient",
    "crashPoint",
    "x",
];

/// Known field names for round id extraction.
const ROUND_ID_FIELDS: &[&str] = &[
    "roundId",
    "gameId",
    "id",
    "round",
    "roundNumber",
    "gameNumber",
    "sessionId",
    "round_id",
];

/// Fields that may carry the message type.
const TYPE_FIELDS: &[&str] = &["type", "t", "action", "event", "messageType", "cmd"];

/// Message types that indicate a round has ended.
const END_MESSAGE_TYPES: &[&str] = &[
    "round_result",
    "crash",
    "finish",
    "end",
    "game_over",
    "round_end",
    "busted",
    "crashed",
    "land",
];

/// Containers some providers nest the payload under.
const NESTING_FIELDS: &[&str] = &["result", "data"];

// ---------------------------------------------------------------------------
// Message parsing
// ---------------------------------------------------------------------------

/// A round extracted from one feed message.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedRound {
    pub round_id: Option<String>,
    pub multiplier: f64,
    pub coordinate_x: Option<f64>,
    pub coordinate_y: Option<f64>,
    pub hash: Option<String>,
}

/// Parse one raw feed message. Returns a round only for round-end messages
/// carrying a usable positive multiplier.
pub fn parse_round_message(raw: &str) -> Option<ExtractedRound> {
    let value: Value = serde_json::from_str(raw).ok()?;
    extract_round(&value)
}

/// Extract a round from an already-parsed message value.
pub fn extract_round(value: &Value) -> Option<ExtractedRound> {
    let obj = value.as_object()?;

    // A message that declares a type must declare a round-end type.
    // Messages without any type field are given the benefit of the doubt.
    if let Some(msg_type) = extract_message_type(obj) {
        if !END_MESSAGE_TYPES.contains(&msg_type.to_lowercase().as_str()) {
            return None;
        }
    }

    let multiplier = extract_number(obj, MULTIPLIER_FIELDS)?;
    if !multiplier.is_finite() || multiplier <= 0.0 {
        warn!(multiplier, "Discarding round with non-positive multiplier");
        return None;
    }

    Some(ExtractedRound {
        round_id: extract_string(obj, ROUND_ID_FIELDS),
        multiplier,
        coordinate_x: extract_number(obj, &["coordinateX", "x_coord", "coord_x"]),
        coordinate_y: extract_number(obj, &["coordinateY", "y_coord", "coord_y"]),
        hash: obj.get("hash").and_then(Value::as_str).map(str::to_string),
    })
}

fn extract_message_type(obj: &Map<String, Value>) -> Option<String> {
    for field in TYPE_FIELDS {
        match obj.get(*field) {
            Some(Value::String(s)) => return Some(s.clone()),
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => {}
        }
    }
    None
}

/// First numeric (or numeric-string) value under any of `fields`, looking
/// one nesting level down when the flat lookup fails.
fn extract_number(obj: &Map<String, Value>, fields: &[&str]) -> Option<f64> {
    for field in fields {
        if let Some(value) = obj.get(*field) {
            if let Some(n) = value.as_f64() {
                return Some(n);
            }
            if let Some(s) = value.as_str() {
                if let Ok(n) = s.parse::<f64>() {
                    return Some(n);
                }
            }
        }
    }
    for container in NESTING_FIELDS {
        if let Some(nested) = obj.get(*container).and_then(Value::as_object) {
            if let Some(n) = extract_number(nested, fields) {
                return Some(n);
            }
        }
    }
    None
}

fn extract_string(obj: &Map<String, Value>, fields: &[&str]) -> Option<String> {
    for field in fields {
        match obj.get(*field) {
            Some(Value::String(s)) => return Some(s.clone()),
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => {}
        }
    }
    for container in NESTING_FIELDS {
        if let Some(nested) = obj.get(*container).and_then(Value::as_object) {
            if let Some(s) = extract_string(nested, fields) {
                return Some(s);
            }
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Backoff
// ---------------------------------------------------------------------------

/// Exponential backoff delay for the given 1-based attempt.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base * 2u32.saturating_pow(attempt.saturating_sub(1))
}

// ---------------------------------------------------------------------------
// Synthetic rounds
// ---------------------------------------------------------------------------

/// Map a uniform sample in [0, 1) to a crash multiplier: 3% instant bust
/// at 1.00, otherwise 0.97 / (1 - u) capped at 10000, two decimals.
/// This approximates the usual ~3% house-edge crash distribution.
pub fn synthetic_multiplier(u: f64) -> f64 {
    if u < 0.03 {
        return 1.0;
    }
    let multiplier = (0.97 / (1.0 - u)).min(10_000.0);
    (multiplier * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Collector
// ---------------------------------------------------------------------------

/// Collects crash rounds from a feed endpoint into the round store.
pub struct Collector {
    store: RoundStore,
    config: CollectorConfig,
    http: reqwest::Client,
    rounds_collected: u64,
}

impl Collector {
    pub fn new(store: RoundStore, config: CollectorConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent("crashlens/0.1.0")
            .build()
            .context("Failed to build feed HTTP client")?;
        Ok(Self {
            store,
            config,
            http,
            rounds_collected: 0,
        })
    }

    /// Total rounds persisted by this collector instance.
    pub fn rounds_collected(&self) -> u64 {
        self.rounds_collected
    }

    /// Main collection loop. Runs until the surrounding task is aborted or
    /// the retry budget is exhausted.
    pub async fn run(&mut self) -> Result<()> {
        if self.config.test_mode {
            info!(count = self.config.test_rounds, "Collector running in test mode");
            return self.generate_test_data(self.config.test_rounds).await;
        }

        let feed_url = self.config.feed_url.clone().ok_or_else(|| {
            TrackerError::Collector {
                feed: "none".to_string(),
                message: "no feed URL configured and not in test mode".to_string(),
            }
        })?;

        let poll_interval = Duration::from_secs(self.config.poll_interval_secs);
        let base_delay = Duration::from_secs_f64(self.config.retry_delay_secs);
        let mut retry_count: u32 = 0;

        info!(feed = %feed_url, interval_secs = self.config.poll_interval_secs, "Collector starting");

        loop {
            match self.poll_once(&feed_url).await {
                Ok(saved) => {
                    retry_count = 0;
                    if saved > 0 {
                        info!(saved, total = self.rounds_collected, "Feed poll complete");
                    }
                    tokio::time::sleep(poll_interval).await;
                }
                Err(e) => {
                    retry_count += 1;
                    if retry_count >= self.config.max_retries {
                        return Err(TrackerError::Collector {
                            feed: feed_url.clone(),
                            message: format!(
                                "giving up after {retry_count} failed attempts: {e}"
                            ),
                        }
                        .into());
                    }
                    let wait = backoff_delay(base_delay, retry_count);
                    warn!(
                        error = %e,
                        attempt = retry_count,
                        max = self.config.max_retries,
                        wait_secs = wait.as_secs_f64(),
                        "Feed poll failed, backing off"
                    );
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }

    /// Fetch the feed once and persist every parsable round-end message.
    async fn poll_once(&mut self, feed_url: &str) -> Result<usize> {
        let payload: Value = self
            .http
            .get(feed_url)
            .send()
            .await
            .context("Feed request failed")?
            .error_for_status()
            .context("Feed returned an error status")?
            .json()
            .await
            .context("Feed returned invalid JSON")?;

        // Accept either a single message or an array of messages.
        let messages: Vec<&Value> = match &payload {
            Value::Array(items) => items.iter().collect(),
            other => vec![other],
        };

        let mut saved = 0;
        for message in messages {
            let Some(round) = extract_round(message) else {
                debug!("Skipping non-round message");
                continue;
            };
            // Providers do not always publish an id; synthesize one so the
            // round is still recorded (at the cost of dedup for that round).
            let round_id = round
                .round_id
                .unwrap_or_else(|| format!("feed_{}", Uuid::new_v4()));

            if self
                .store
                .insert_round(
                    &round_id,
                    round.multiplier,
                    round.coordinate_x,
                    round.coordinate_y,
                    round.hash.as_deref(),
                )
                .await?
            {
                saved += 1;
                self.rounds_collected += 1;
            }
        }
        Ok(saved)
    }

    /// Seed the store with synthetic rounds for development and testing.
    pub async fn generate_test_data(&mut self, count: u32) -> Result<()> {
        // Sample everything up front; the RNG handle must not be held
        // across await points.
        let samples: Vec<(f64, Option<f64>, Option<f64>)> = {
            let mut rng = rand::thread_rng();
            (0..count)
                .map(|_| {
                    let multiplier = synthetic_multiplier(rng.gen::<f64>());
                    if multiplier > 1.0 {
                        let x = rng.gen_range(0.0..100.0);
                        let y = rng.gen_range(0.0..100.0);
                        (multiplier, Some(x), Some(y))
                    } else {
                        (multiplier, None, None)
                    }
                })
                .collect()
        };

        for (multiplier, coord_x, coord_y) in samples {
            let round_id = format!("test_{}", Uuid::new_v4());
            if self
                .store
                .insert_round(&round_id, multiplier, coord_x, coord_y, None)
                .await?
            {
                self.rounds_collected += 1;
            }
        }

        info!(count, "Test data generation complete");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
