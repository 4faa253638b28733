use tracing::{error, info, warn};

use crate::errors::AppError;
use crate::external::price_provider::{PriceProvider, ProviderError};
use crate::models::{PriceBar, StockData, StockQuote, TechnicalIndicators};
use crate::services::indicators::{latest, rsi, sma};

/// Daily bars needed for a 200-day SMA.
pub const INDICATOR_HISTORY_DAYS: u32 = 200;

pub fn normalize_symbol(symbol: &str) -> Result<String, AppError> {
    let symbol = symbol.trim().to_uppercase();
    if symbol.is_empty() || symbol.len() > 12 {
        return Err(AppError::Validation(format!("Invalid symbol '{}'", symbol)));
    }
    if !symbol.chars().all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-') {
        return Err(AppError::Validation(format!("Invalid symbol '{}'", symbol)));
    }
    Ok(symbol)
}

pub async fn get_history(
    provider: &dyn PriceProvider,
    symbol: &str,
    days: u32,
) -> Result<Vec<PriceBar>, AppError> {
    provider
        .fetch_daily_history(symbol, days)
        .await
        .map_err(|e| log_provider_error("history", symbol, e))
}

pub async fn get_quote(provider: &dyn PriceProvider, symbol: &str) -> Result<StockQuote, AppError> {
    provider
        .fetch_quote(symbol)
        .await
        .map_err(|e| log_provider_error("quote", symbol, e))
}

/// RSI(14), SMA(50) and SMA(200) of daily closes; values stay `None` until
/// enough history exists.
pub fn compute_indicators(symbol: &str, history: &[PriceBar]) -> TechnicalIndicators {
    let closes: Vec<f64> = history.iter().map(|b| b.close).collect();

    TechnicalIndicators {
        symbol: symbol.to_string(),
        rsi14: latest(&rsi(&closes, 14)),
        sma50: latest(&sma(&closes, 50)),
        sma200: latest(&sma(&closes, 200)),
    }
}

pub async fn get_indicators(
    provider: &dyn PriceProvider,
    symbol: &str,
) -> Result<TechnicalIndicators, AppError> {
    let history = get_history(provider, symbol, INDICATOR_HISTORY_DAYS).await?;
    info!("Computing indicators for {} over {} bars", symbol, history.len());
    Ok(compute_indicators(symbol, &history))
}

/// Quote plus RSI(14) for the criteria screener. A failed history lookup
/// leaves `rsi14` unset instead of failing the quote.
pub async fn get_stock_data(provider: &dyn PriceProvider, symbol: &str) -> Result<StockData, AppError> {
    let quote = get_quote(provider, symbol).await?;
    let mut stock = StockData::from_quote(&quote);

    match provider.fetch_daily_history(symbol, 100).await {
        Ok(history) => stock.rsi14 = compute_indicators(symbol, &history).rsi14,
        Err(e) => warn!("No history for {} while enriching quote: {}", symbol, e),
    }

    Ok(stock)
}

fn log_provider_error(what: &str, symbol: &str, e: ProviderError) -> AppError {
    match &e {
        ProviderError::RateLimited => warn!("Rate limited fetching {} for {}", what, symbol),
        _ => error!("Failed to fetch {} for {}: {}", what, symbol, e),
    }
    AppError::from(e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    #[test]
    fn test_normalize_symbol() {
        assert_eq!(normalize_symbol(" aapl ").unwrap(), "AAPL");
        assert_eq!(normalize_symbol("brk.b").unwrap(), "BRK.B");
        assert!(normalize_symbol("").is_err());
        assert!(normalize_symbol("DROP TABLE").is_err());
    }

    #[test]
    fn test_compute_indicators_needs_history() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let history: Vec<PriceBar> = (0..60)
            .map(|i| {
                let close = 100.0 + i as f64;
                PriceBar::new(start + Duration::days(i), close, close, close, close, 1_000.0)
            })
            .collect();

        let indicators = compute_indicators("UP", &history);
        assert_eq!(indicators.sma200, None);
        // mean of closes 110..=159
        assert_eq!(indicators.sma50, Some(134.5));
        assert!(indicators.rsi14.unwrap() > 70.0);
    }
}
