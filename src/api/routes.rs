//! API route handlers.
//!
//! All endpoints return JSON. Shared state is an `Arc<ApiState>` holding
//! the round store and the analytics calculator. Handlers fetch a bounded
//! window from storage, run the engine over it, and serialize the result.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

use crate::engine::{
    round_to, CashoutTarget, CrashCalculator, CrashReport, EngineError, MoonTracker,
    QuickCrashAlert,
};
use crate::storage::RoundStore;
use crate::types::Round;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct ApiState {
    pub store: RoundStore,
    pub calculator: CrashCalculator,
    /// The single game this instance tracks.
    pub game: String,
    /// Cashout targets from config; empty means engine defaults.
    pub cashout_targets: Vec<f64>,
    pub streak_threshold: f64,
}

pub type AppState = Arc<ApiState>;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// API failure mapped to a structured JSON error body.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Validation(String),
    Internal(anyhow::Error),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    detail: String,
    timestamp: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, detail) = match self {
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, "not_found", detail),
            ApiError::Validation(detail) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "validation_error", detail)
            }
            ApiError::Internal(e) => {
                error!(error = %e, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal server error occurred".to_string(),
                )
            }
        };
        let body = ErrorBody {
            error: error.to_string(),
            detail,
            timestamp: Utc::now().to_rfc3339(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        ApiError::Internal(e)
    }
}

// Stored rounds are validated on insert, so an engine rejection here is a
// server-side inconsistency rather than a caller mistake.
impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        ApiError::Internal(e.into())
    }
}

// ---------------------------------------------------------------------------
// Query parameters
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct RecentParams {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct PeriodParams {
    pub period: Option<String>,
}

/// Map a period label to its hour window.
fn period_hours(period: &str) -> Option<i64> {
    match period {
        "1h" => Some(1),
        "6h" => Some(6),
        "24h" => Some(24),
        "7d" => Some(168),
        "30d" => Some(720),
        _ => None,
    }
}

fn parse_period(params: &PeriodParams, default: &str) -> Result<(String, i64), ApiError> {
    let period = params.period.clone().unwrap_or_else(|| default.to_string());
    let hours = period_hours(&period)
        .ok_or_else(|| ApiError::Validation(format!("Unknown period: {period}")))?;
    Ok((period, hours))
}

fn require_game(state: &ApiState, game: &str) -> Result<(), ApiError> {
    if game != state.game {
        return Err(ApiError::NotFound(format!("Game not found: {game}")));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct RoundsResponse {
    pub items: Vec<Round>,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryStats {
    pub total_rounds: usize,
    pub avg_multiplier: f64,
    pub median_multiplier: f64,
    pub max_multiplier: f64,
    pub min_multiplier: f64,
    pub under_2x_count: usize,
    pub over_10x_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecentStats {
    pub avg_multiplier: f64,
    pub under_2x_pct: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DistributionBucket {
    pub range: String,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub game: String,
    pub database: String,
    pub last_data_update: Option<String>,
    pub timestamp: String,
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /api/rounds
pub async fn get_rounds(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<RoundsResponse>, ApiError> {
    let limit = params.limit.unwrap_or(50).clamp(1, 500);
    let offset = params.offset.unwrap_or(0).max(0);
    let (items, total) = state.store.paged_rounds(limit, offset).await?;
    Ok(Json(RoundsResponse { items, total }))
}

/// GET /api/stats/summary
pub async fn get_summary(
    State(state): State<AppState>,
) -> Result<Json<SummaryStats>, ApiError> {
    let rounds = state.store.recent_rounds(None, None).await?;
    let multipliers: Vec<f64> = rounds.iter().map(|r| r.multiplier).collect();
    let analysis = state.calculator.analyze_crashes(&multipliers, None)?;

    Ok(Json(SummaryStats {
        total_rounds: analysis.total_rounds,
        avg_multiplier: analysis.average_crash,
        median_multiplier: analysis.median_crash,
        max_multiplier: analysis.highest_crash,
        min_multiplier: analysis.lowest_crash,
        under_2x_count: multipliers.iter().filter(|&&m| m < 2.0).count(),
        over_10x_count: multipliers.iter().filter(|&&m| m >= 10.0).count(),
    }))
}

/// GET /api/stats/recent
pub async fn get_recent_stats(
    State(state): State<AppState>,
    Query(params): Query<RecentParams>,
) -> Result<Json<RecentStats>, ApiError> {
    let limit = params.limit.unwrap_or(100).clamp(1, 1000);
    let rounds = state.store.recent_rounds(None, Some(limit)).await?;
    let multipliers: Vec<f64> = rounds.iter().map(|r| r.multiplier).collect();

    if multipliers.is_empty() {
        return Ok(Json(RecentStats {
            avg_multiplier: 0.0,
            under_2x_pct: 0.0,
        }));
    }

    let under_2x = multipliers.iter().filter(|&&m| m < 2.0).count();
    let avg = multipliers.iter().sum::<f64>() / multipliers.len() as f64;
    Ok(Json(RecentStats {
        avg_multiplier: round_to(avg, 4),
        under_2x_pct: round_to(under_2x as f64 / multipliers.len() as f64 * 100.0, 2),
    }))
}

/// Multiplier distribution buckets, lowest range first.
const DISTRIBUTION_BUCKETS: &[(&str, f64)] = &[
    ("instant", 1.0),
    ("1.01-1.5x", 1.5),
    ("1.51-2x", 2.0),
    ("2.01-3x", 3.0),
    ("3.01-5x", 5.0),
    ("5.01-10x", 10.0),
    ("10.01-50x", 50.0),
    ("50.01-100x", 100.0),
    ("100x+", f64::INFINITY),
];

fn bucket_label(multiplier: f64) -> &'static str {
    for &(label, upper) in DISTRIBUTION_BUCKETS {
        if multiplier <= upper {
            return label;
        }
    }
    "100x+"
}

/// GET /api/distribution
pub async fn get_distribution(
    State(state): State<AppState>,
) -> Result<Json<Vec<DistributionBucket>>, ApiError> {
    let rounds = state.store.recent_rounds(None, None).await?;
    let total = rounds.len().max(1);

    let buckets = DISTRIBUTION_BUCKETS
        .iter()
        .map(|&(label, _)| {
            let count = rounds
                .iter()
                .filter(|r| bucket_label(r.multiplier) == label)
                .count();
            DistributionBucket {
                range: label.to_string(),
                count,
                percentage: round_to(count as f64 / total as f64 * 100.0, 2),
            }
        })
        .collect();

    Ok(Json(buckets))
}

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let now = Utc::now().to_rfc3339();
    match state.store.last_update().await {
        Ok(last_update) => Json(HealthResponse {
            status: "healthy".to_string(),
            game: state.game.clone(),
            database: "connected".to_string(),
            last_data_update: last_update.map(|ts| ts.to_rfc3339()),
            timestamp: now,
        }),
        Err(e) => {
            error!(error = %e, "Health check failed");
            Json(HealthResponse {
                status: "unhealthy".to_string(),
                game: state.game.clone(),
                database: "disconnected".to_string(),
                last_data_update: None,
                timestamp: now,
            })
        }
    }
}

/// GET /api/v2/crash/{game}
pub async fn get_crash_stats(
    State(state): State<AppState>,
    Path(game): Path<String>,
    Query(params): Query<PeriodParams>,
) -> Result<Json<CrashReport>, ApiError> {
    require_game(&state, &game)?;
    let (period, hours) = parse_period(&params, "24h")?;

    let rounds = state.store.recent_rounds(Some(hours), None).await?;
    let pairs: Vec<(f64, DateTime<Utc>)> =
        rounds.iter().map(|r| (r.multiplier, r.created_at)).collect();

    let report = state.calculator.report(
        &state.game,
        &period,
        &pairs,
        Some(&state.cashout_targets),
        state.streak_threshold,
    )?;
    Ok(Json(report))
}

/// GET /api/v2/crash/{game}/quick-crash-alert
pub async fn get_quick_crash_alert(
    State(state): State<AppState>,
    Path(game): Path<String>,
) -> Result<Json<QuickCrashAlert>, ApiError> {
    require_game(&state, &game)?;
    let rounds = state.store.recent_rounds(None, Some(50)).await?;
    let multipliers: Vec<f64> = rounds.iter().map(|r| r.multiplier).collect();
    Ok(Json(state.calculator.quick_crash_alert(&multipliers)?))
}

/// GET /api/v2/crash/{game}/moon-tracker
pub async fn get_moon_tracker(
    State(state): State<AppState>,
    Path(game): Path<String>,
    Query(params): Query<PeriodParams>,
) -> Result<Json<MoonTracker>, ApiError> {
    require_game(&state, &game)?;
    let (_, hours) = parse_period(&params, "7d")?;

    let rounds = state.store.recent_rounds(Some(hours), None).await?;
    let multipliers: Vec<f64> = rounds.iter().map(|r| r.multiplier).collect();
    let timestamps: Vec<DateTime<Utc>> = rounds.iter().map(|r| r.created_at).collect();
    Ok(Json(
        state.calculator.track_moons(&multipliers, Some(&timestamps))?,
    ))
}

/// GET /api/v2/crash/{game}/cashout-optimizer
pub async fn get_cashout_optimizer(
    State(state): State<AppState>,
    Path(game): Path<String>,
    Query(params): Query<PeriodParams>,
) -> Result<Json<Vec<CashoutTarget>>, ApiError> {
    require_game(&state, &game)?;
    let (_, hours) = parse_period(&params, "7d")?;

    let rounds = state.store.recent_rounds(Some(hours), None).await?;
    let multipliers: Vec<f64> = rounds.iter().map(|r| r.multiplier).collect();
    Ok(Json(
        state
            .calculator
            .optimize_cashout(&multipliers, Some(&state.cashout_targets))?,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
