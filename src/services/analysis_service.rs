use chrono::Utc;
use futures::future::join_all;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::external::price_provider::{FundamentalsProvider, PriceProvider};
use crate::models::{
    BatchScreeningEntry, BatchScreeningResponse, ScreeningConfig, ScreeningResponse,
};
use crate::services::{notification_service, price_service, screening_service};

/// Fetches history and fundamentals for `symbol` and runs the screening pipeline.
pub async fn analyze_symbol(
    prices: &dyn PriceProvider,
    fundamentals: &dyn FundamentalsProvider,
    symbol: &str,
    config: &ScreeningConfig,
    history_days: u32,
) -> Result<ScreeningResponse, AppError> {
    let history = price_service::get_history(prices, symbol, history_days).await?;
    let snapshot = fundamentals.fetch_fundamentals(symbol).await.map_err(|e| {
        warn!("Failed to fetch fundamentals for {}: {}", symbol, e);
        AppError::from(e)
    })?;

    let verdict = screening_service::evaluate(&history, &snapshot, config).map_err(|e| {
        warn!("Could not screen {}: {}", symbol, e);
        e
    })?;

    info!("Screened {}: {}", symbol, verdict.outcome());

    Ok(ScreeningResponse {
        symbol: symbol.to_string(),
        matched_criteria: notification_service::criteria_from_verdict(&verdict),
        verdict,
        screened_at: Utc::now(),
    })
}

/// Screens every symbol concurrently. Each symbol succeeds or fails on its own.
pub async fn analyze_batch(
    prices: &dyn PriceProvider,
    fundamentals: &dyn FundamentalsProvider,
    symbols: &[String],
    config: &ScreeningConfig,
    history_days: u32,
) -> BatchScreeningResponse {
    let runs = symbols.iter().map(|symbol| async move {
        let outcome = match price_service::normalize_symbol(symbol) {
            Ok(normalized) => analyze_symbol(prices, fundamentals, &normalized, config, history_days).await,
            Err(e) => Err(e),
        };
        match outcome {
            Ok(response) => BatchScreeningEntry {
                symbol: response.symbol.clone(),
                result: Some(response),
                error: None,
            },
            Err(e) => BatchScreeningEntry {
                symbol: symbol.clone(),
                result: None,
                error: Some(e.to_string()),
            },
        }
    });

    let results = join_all(runs).await;
    let total_qualified = results
        .iter()
        .filter(|r| r.result.as_ref().map(|r| r.verdict.is_qualified()).unwrap_or(false))
        .count();

    info!("Batch screened {} symbols, {} qualified", results.len(), total_qualified);

    BatchScreeningResponse {
        total_screened: results.len(),
        total_qualified,
        results,
        screened_at: Utc::now(),
    }
}
