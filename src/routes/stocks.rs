use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::models::{StockData, StockQuote, StockScreenRequest, TechnicalIndicators};
use crate::services::{criteria_service, price_service};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/screen", post(screen_stocks))
        .route("/:symbol/quote", get(get_quote))
        .route("/:symbol/indicators", get(get_indicators))
}

#[derive(Debug, Serialize)]
pub struct StockScreenResponse {
    pub results: Vec<StockData>,
    pub total_screened: usize,
    pub failed_symbols: Vec<String>,
    pub criteria: Vec<String>,
}

pub async fn get_quote(
    Path(symbol): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<StockQuote>, AppError> {
    let symbol = price_service::normalize_symbol(&symbol)?;
    info!("GET /stocks/{}/quote - Fetching latest quote", symbol);
    let quote = price_service::get_quote(state.price_provider.as_ref(), &symbol).await?;
    Ok(Json(quote))
}

pub async fn get_indicators(
    Path(symbol): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<TechnicalIndicators>, AppError> {
    let symbol = price_service::normalize_symbol(&symbol)?;
    info!("GET /stocks/{}/indicators - Computing RSI/SMA", symbol);
    let indicators = price_service::get_indicators(state.price_provider.as_ref(), &symbol).await?;
    Ok(Json(indicators))
}

pub async fn screen_stocks(
    State(state): State<AppState>,
    Json(req): Json<StockScreenRequest>,
) -> Result<Json<StockScreenResponse>, AppError> {
    info!(
        "POST /stocks/screen - {} symbols, {} criteria",
        req.symbols.len(),
        req.criteria.len()
    );

    // Fail on bad criteria before spending provider calls
    for criterion in &req.criteria {
        criteria_service::validate_criterion(criterion)?;
    }

    let mut stocks = Vec::with_capacity(req.symbols.len());
    let mut failed_symbols = Vec::new();
    for raw in &req.symbols {
        let symbol = price_service::normalize_symbol(raw)?;
        match price_service::get_stock_data(state.price_provider.as_ref(), &symbol).await {
            Ok(stock) => stocks.push(stock),
            Err(AppError::RateLimited) => return Err(AppError::RateLimited),
            Err(e) => {
                warn!("Skipping {} in screen: {}", symbol, e);
                failed_symbols.push(symbol);
            }
        }
    }

    let total_screened = stocks.len();
    let results = criteria_service::screen_stocks(stocks, &req.criteria)?;

    Ok(Json(StockScreenResponse {
        results,
        total_screened,
        failed_symbols,
        criteria: req.criteria.iter().map(criteria_service::describe_criterion).collect(),
    }))
}
