use async_trait::async_trait;
use thiserror::Error;

use crate::models::{FundamentalsSnapshot, PriceBar, StockQuote};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("network error: {0}")]
    Network(String),

    #[error("bad response: {0}")]
    BadResponse(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("rate limited")]
    RateLimited,

    #[error("symbol not found: {0}")]
    NotFound(String),
}

/// Source of daily bars and latest quotes.
///
/// `fetch_daily_history` returns bars oldest first with no duplicate dates.
/// Non-trading days are simply absent.
#[async_trait]
pub trait PriceProvider: Send + Sync {
    async fn fetch_daily_history(
        &self,
        symbol: &str,
        days: u32,
    ) -> Result<Vec<PriceBar>, ProviderError>;

    async fn fetch_quote(&self, symbol: &str) -> Result<StockQuote, ProviderError>;
}

#[async_trait]
pub trait FundamentalsProvider: Send + Sync {
    /// Latest reported snapshot for `symbol`.
    async fn fetch_fundamentals(&self, symbol: &str) -> Result<FundamentalsSnapshot, ProviderError>;
}
