//! HTTP API — Axum server for rounds, summary stats, and crash analytics.
//!
//! Read-only JSON API. CORS allows GET only, matching the public
//! dashboard use case.

pub mod routes;

use anyhow::{Context, Result};
use axum::{
    http::{header, HeaderValue, Method},
    routing::get,
    Router,
};
use tower_http::cors::CorsLayer;
use tracing::info;

pub use routes::{ApiState, AppState};

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin("*".parse::<HeaderValue>().unwrap())
        .allow_methods([Method::GET])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/api/rounds", get(routes::get_rounds))
        .route("/api/stats/summary", get(routes::get_summary))
        .route("/api/stats/recent", get(routes::get_recent_stats))
        .route("/api/distribution", get(routes::get_distribution))
        .route("/api/health", get(routes::health))
        .route("/api/v2/crash/:game", get(routes::get_crash_stats))
        .route(
            "/api/v2/crash/:game/quick-crash-alert",
            get(routes::get_quick_crash_alert),
        )
        .route(
            "/api/v2/crash/:game/moon-tracker",
            get(routes::get_moon_tracker),
        )
        .route(
            "/api/v2/crash/:game/cashout-optimizer",
            get(routes::get_cashout_optimizer),
        )
        .layer(cors)
        .with_state(state)
}

/// Bind and serve until the surrounding task is aborted.
pub async fn serve(state: AppState, port: u16) -> Result<()> {
    let app = build_router(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind port {port}"))?;
    info!(port, "API server listening");

    axum::serve(listener, app).await.context("API server error")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
