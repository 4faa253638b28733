use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::models::{
    BatchScreeningRequest, BatchScreeningResponse, EvaluateRequest, ScreeningResponse,
    ScreeningVerdict,
};
use crate::services::{analysis_service, price_service, screening_service};
use crate::state::AppState;

/// Symbols accepted by one batch request.
const MAX_BATCH_SYMBOLS: usize = 25;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/evaluate", post(evaluate))
        .route("/batch", post(screen_batch))
        .route("/:symbol", get(screen_symbol))
}

/// Screens caller-supplied history and fundamentals.
pub async fn evaluate(
    State(state): State<AppState>,
    Json(req): Json<EvaluateRequest>,
) -> Result<Json<ScreeningVerdict>, AppError> {
    info!("POST /screening/evaluate - {} daily bars", req.history.len());

    let config = req.config.as_ref().unwrap_or(state.screening_config.as_ref());
    let verdict = screening_service::evaluate_with_context(&req.history, &req.fundamentals, config, &req.context)
        .map_err(|e| {
            warn!("Screening input rejected: {}", e);
            e
        })?;

    Ok(Json(verdict))
}

pub async fn screen_symbol(
    Path(symbol): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ScreeningResponse>, AppError> {
    let symbol = price_service::normalize_symbol(&symbol)?;
    info!("🔍 GET /screening/{} - Running superstock screen", symbol);

    let response = analysis_service::analyze_symbol(
        state.price_provider.as_ref(),
        state.fundamentals_provider.as_ref(),
        &symbol,
        &state.screening_config,
        state.history_days,
    )
    .await?;

    Ok(Json(response))
}

pub async fn screen_batch(
    State(state): State<AppState>,
    Json(req): Json<BatchScreeningRequest>,
) -> Result<Json<BatchScreeningResponse>, AppError> {
    info!("🔍 POST /screening/batch - {} symbols", req.symbols.len());

    if req.symbols.is_empty() {
        return Err(AppError::Validation("symbols must not be empty".into()));
    }
    if req.symbols.len() > MAX_BATCH_SYMBOLS {
        return Err(AppError::Validation(format!(
            "at most {} symbols per batch",
            MAX_BATCH_SYMBOLS
        )));
    }

    let response = analysis_service::analyze_batch(
        state.price_provider.as_ref(),
        state.fundamentals_provider.as_ref(),
        &req.symbols,
        &state.screening_config,
        state.history_days,
    )
    .await;

    Ok(Json(response))
}
