use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Point-in-time balance-sheet and cash-flow figures for one security.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundamentalsSnapshot {
    pub market_cap: f64,
    pub cash_and_equivalents: f64,
    pub total_debt: f64,
    pub current_assets: f64,
    pub current_liabilities: f64,
    pub total_equity: f64,
    pub free_cash_flow: f64,
    /// Fiscal date the figures were reported for, when the provider supplies it.
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
}

/// Liquidity and leverage ratios derived from a [`FundamentalsSnapshot`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundamentalMetrics {
    pub market_cap: f64,
    pub cash_position: f64,
    pub total_debt: f64,
    pub current_ratio: f64,
    /// (current assets - current liabilities) / current liabilities
    pub quick_ratio: f64,
    pub debt_to_equity: f64,
    pub free_cash_flow: f64,
}
