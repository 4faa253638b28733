use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tracing::info;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(health))
        .route("/config", get(screening_config))
}

async fn health() -> &'static str {
    info!("GET /health - Health check");
    "OK"
}

#[derive(Serialize)]
struct HealthConfig {
    version: &'static str,
    history_days: u32,
    min_base_duration_weeks: usize,
    tight_base_threshold: f64,
    volume_decline_threshold: f64,
}

/// Active screening thresholds, so operators can confirm env overrides took.
async fn screening_config(State(state): State<AppState>) -> Json<HealthConfig> {
    let config = &state.screening_config;
    Json(HealthConfig {
        version: env!("CARGO_PKG_VERSION"),
        history_days: state.history_days,
        min_base_duration_weeks: config.min_base_duration_weeks,
        tight_base_threshold: config.tight_base_threshold,
        volume_decline_threshold: config.volume_decline_threshold,
    })
}
