#![allow(dead_code)]

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};

use superstock_backend::external::price_provider::{FundamentalsProvider, PriceProvider, ProviderError};
use superstock_backend::models::{FundamentalsSnapshot, PriceBar, StockQuote};

pub fn trading_day(i: usize) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(i as i64)
}

/// `weeks` of five identical bars each: close 100, volume falling linearly from
/// 100 in the first week to 50 in the last. Even weeks dip to the 98 support,
/// odd weeks hold at 99.5, so every other week is a fresh retest.
pub fn tight_base_history(weeks: usize) -> Vec<PriceBar> {
    let mut bars = Vec::with_capacity(weeks * 5);
    for w in 0..weeks {
        let volume = if weeks > 1 {
            100.0 - 50.0 * w as f64 / (weeks - 1) as f64
        } else {
            100.0
        };
        let low = if w % 2 == 0 { 98.0 } else { 99.5 };
        for d in 0..5 {
            bars.push(PriceBar::new(trading_day(w * 5 + d), 99.5, 100.0, low, 100.0, volume));
        }
    }
    bars
}

/// Cash-rich, liquid, cash-generating balance sheet.
pub fn strong_fundamentals() -> FundamentalsSnapshot {
    FundamentalsSnapshot {
        market_cap: 50_000_000.0,
        cash_and_equivalents: 80_000_000.0,
        total_debt: 10_000_000.0,
        current_assets: 300_000_000.0,
        current_liabilities: 100_000_000.0,
        total_equity: 400_000_000.0,
        free_cash_flow: 5_000_000.0,
        as_of: NaiveDate::from_ymd_opt(2024, 3, 31),
    }
}

#[derive(Default)]
pub struct FixtureProvider {
    pub history: HashMap<String, Vec<PriceBar>>,
    pub fundamentals: HashMap<String, FundamentalsSnapshot>,
}

impl FixtureProvider {
    pub fn with_symbol(mut self, symbol: &str, history: Vec<PriceBar>, fundamentals: FundamentalsSnapshot) -> Self {
        self.history.insert(symbol.to_string(), history);
        self.fundamentals.insert(symbol.to_string(), fundamentals);
        self
    }
}

#[async_trait]
impl PriceProvider for FixtureProvider {
    async fn fetch_daily_history(&self, symbol: &str, days: u32) -> Result<Vec<PriceBar>, ProviderError> {
        let bars = self
            .history
            .get(symbol)
            .ok_or_else(|| ProviderError::NotFound(symbol.to_string()))?;
        let skip = bars.len().saturating_sub(days as usize);
        Ok(bars[skip..].to_vec())
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<StockQuote, ProviderError> {
        let last = self
            .history
            .get(symbol)
            .and_then(|bars| bars.last())
            .ok_or_else(|| ProviderError::NotFound(symbol.to_string()))?;
        Ok(StockQuote {
            symbol: symbol.to_string(),
            open: last.open,
            high: last.high,
            low: last.low,
            price: last.close,
            volume: last.volume as u64,
        })
    }
}

#[async_trait]
impl FundamentalsProvider for FixtureProvider {
    async fn fetch_fundamentals(&self, symbol: &str) -> Result<FundamentalsSnapshot, ProviderError> {
        self.fundamentals
            .get(symbol)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(symbol.to_string()))
    }
}
