//! Configuration loading from TOML.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! The threshold set, cashout targets, and streak threshold all carry
//! built-in defaults, so a minimal config only names the service and
//! the database.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;

use crate::engine::{CrashThresholds, DEFAULT_STREAK_THRESHOLD};

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub service: ServiceConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub collector: CollectorConfig,
    #[serde(default)]
    pub thresholds: CrashThresholds,
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub name: String,
    /// Game identifier served under /api/v2/crash/{game}.
    pub game: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// SQLite URL, e.g. "sqlite:crashlens.db".
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CollectorConfig {
    pub enabled: bool,
    /// Feed endpoint polled for round-end messages.
    pub feed_url: Option<String>,
    pub poll_interval_secs: u64,
    /// Consecutive failed polls tolerated before the collector gives up.
    pub max_retries: u32,
    /// Base backoff delay; doubles on every consecutive failure.
    pub retry_delay_secs: f64,
    /// Generate synthetic rounds instead of polling a live feed.
    pub test_mode: bool,
    pub test_rounds: u32,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            feed_url: None,
            poll_interval_secs: 2,
            max_retries: 5,
            retry_delay_secs: 2.0,
            test_mode: false,
            test_rounds: 1000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Cashout targets evaluated by the optimizer; an empty list uses the
    /// engine's built-in defaults.
    pub cashout_targets: Vec<f64>,
    pub streak_threshold: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            cashout_targets: Vec::new(),
            streak_threshold: DEFAULT_STREAK_THRESHOLD,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }
}
