use serde::{Deserialize, Serialize};

/// Snapshot of a listed security used by the criteria screener and alerts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockData {
    pub symbol: String,
    #[serde(default)]
    pub company_name: String,
    pub price: f64,
    pub volume: u64,
    pub market_cap: Option<f64>,
    pub pe_ratio: Option<f64>,
    pub eps: Option<f64>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub beta: Option<f64>,
    pub fifty_two_week_high: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
    pub day_high: Option<f64>,
    pub day_low: Option<f64>,
    pub rsi14: Option<f64>,
}

impl StockData {
    /// A snapshot holding only what a latest-quote lookup returns.
    pub fn from_quote(quote: &StockQuote) -> Self {
        Self {
            symbol: quote.symbol.clone(),
            company_name: String::new(),
            price: quote.price,
            volume: quote.volume,
            market_cap: None,
            pe_ratio: None,
            eps: None,
            sector: None,
            industry: None,
            beta: None,
            fifty_two_week_high: None,
            fifty_two_week_low: None,
            day_high: Some(quote.high),
            day_low: Some(quote.low),
            rsi14: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockQuote {
    pub symbol: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub price: f64,
    pub volume: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalIndicators {
    pub symbol: String,
    pub rsi14: Option<f64>,
    pub sma50: Option<f64>,
    pub sma200: Option<f64>,
}

// ---------------------------------------------------------------------------
// Criteria screener
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriterionType {
    Technical,
    Fundamental,
    Volume,
    Price,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriterionOperator {
    Gt,
    Lt,
    Eq,
    Between,
    Contains,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CriterionValue {
    Number(f64),
    Text(String),
    Range([f64; 2]),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenerCriteria {
    #[serde(rename = "type")]
    pub kind: CriterionType,
    pub field: String,
    pub operator: CriterionOperator,
    pub value: CriterionValue,
}

/// POST body for `/api/stocks/screen`.
#[derive(Debug, Clone, Deserialize)]
pub struct StockScreenRequest {
    pub symbols: Vec<String>,
    #[serde(default)]
    pub criteria: Vec<ScreenerCriteria>,
}
