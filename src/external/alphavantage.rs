use crate::external::price_provider::{FundamentalsProvider, PriceProvider, ProviderError};
use crate::models::{FundamentalsSnapshot, PriceBar, StockQuote};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co/query";

pub struct AlphaVantageProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl AlphaVantageProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn from_env() -> Result<Self, ProviderError> {
        let api_key = std::env::var("ALPHAVANTAGE_API_KEY")
            .map_err(|_| ProviderError::BadResponse("ALPHAVANTAGE_API_KEY not set".into()))?;

        Ok(Self::new(api_key))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn query(&self, params: &[(&str, &str)]) -> Result<Value, ProviderError> {
        let resp = self
            .client
            .get(&self.base_url)
            .query(params)
            .query(&[("apikey", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ProviderError::BadResponse(format!("HTTP {}", status)));
        }

        let body = resp
            .json::<Value>()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        check_api_messages(&body)?;
        Ok(body)
    }
}

/// Alpha Vantage answers HTTP 200 for throttling and invalid calls; the
/// payload carries the real status.
fn check_api_messages(body: &Value) -> Result<(), ProviderError> {
    // { "Note": "Thank you for using Alpha Vantage! ... 5 calls per minute ..." }
    if body.get("Note").is_some() || body.get("Information").is_some() {
        return Err(ProviderError::RateLimited);
    }
    // { "Error Message": "Invalid API call. ..." }
    if let Some(msg) = body.get("Error Message").and_then(Value::as_str) {
        return Err(ProviderError::BadResponse(msg.to_string()));
    }
    Ok(())
}

fn decode<T: DeserializeOwned>(body: Value) -> Result<T, ProviderError> {
    serde_json::from_value(body).map_err(|e| ProviderError::Parse(e.to_string()))
}

fn parse_number(field: &str, raw: &str) -> Result<f64, ProviderError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|e| ProviderError::Parse(format!("{}: '{}' ({})", field, raw, e)))
}

// AV reports missing balance-sheet lines as the string "None".
fn parse_optional_number(field: &str, raw: Option<&str>) -> Result<Option<f64>, ProviderError> {
    match raw.map(str::trim) {
        None | Some("None") | Some("") | Some("-") => Ok(None),
        Some(value) => parse_number(field, value).map(Some),
    }
}

fn require_number(field: &str, raw: Option<&str>) -> Result<f64, ProviderError> {
    parse_optional_number(field, raw)?
        .ok_or_else(|| ProviderError::BadResponse(format!("missing {}", field)))
}

// ---------------------------------------------------------------------------
// TIME_SERIES_DAILY
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct AvDailyResponse {
    #[serde(rename = "Time Series (Daily)")]
    time_series: Option<BTreeMap<String, AvDailyBar>>,
}

#[derive(Debug, Deserialize)]
struct AvDailyBar {
    #[serde(rename = "1. open")]
    open: String,
    #[serde(rename = "2. high")]
    high: String,
    #[serde(rename = "3. low")]
    low: String,
    #[serde(rename = "4. close")]
    close: String,
    #[serde(rename = "5. volume")]
    volume: String,
}

/// Converts a daily series into bars, oldest first, keeping the latest `days`
/// (all of them when `days == 0`).
pub fn parse_daily_series(body: Value, days: u32) -> Result<Vec<PriceBar>, ProviderError> {
    let series = decode::<AvDailyResponse>(body)?
        .time_series
        .ok_or_else(|| ProviderError::BadResponse("missing time series".into()))?;

    // BTreeMap keyed by "YYYY-MM-DD" iterates ascending
    let mut out = Vec::with_capacity(series.len());
    for (date_str, bar) in series {
        let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d")
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        out.push(PriceBar {
            date,
            open: parse_number("open", &bar.open)?,
            high: parse_number("high", &bar.high)?,
            low: parse_number("low", &bar.low)?,
            close: parse_number("close", &bar.close)?,
            volume: parse_number("volume", &bar.volume)?,
        });
    }

    let keep = days as usize;
    if keep > 0 && out.len() > keep {
        let excess = out.len() - keep;
        out.drain(..excess);
    }

    Ok(out)
}

// ---------------------------------------------------------------------------
// GLOBAL_QUOTE
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct AvQuoteResponse {
    #[serde(rename = "Global Quote")]
    quote: Option<AvGlobalQuote>,
}

#[derive(Debug, Default, Deserialize)]
struct AvGlobalQuote {
    #[serde(rename = "01. symbol", default)]
    symbol: Option<String>,
    #[serde(rename = "02. open", default)]
    open: Option<String>,
    #[serde(rename = "03. high", default)]
    high: Option<String>,
    #[serde(rename = "04. low", default)]
    low: Option<String>,
    #[serde(rename = "05. price", default)]
    price: Option<String>,
    #[serde(rename = "06. volume", default)]
    volume: Option<String>,
}

pub fn parse_global_quote(symbol: &str, body: Value) -> Result<StockQuote, ProviderError> {
    let quote = decode::<AvQuoteResponse>(body)?.quote.unwrap_or_default();

    // Unknown symbols come back as an empty "Global Quote" object
    let price = match quote.price.as_deref() {
        Some(raw) => parse_number("price", raw)?,
        None => return Err(ProviderError::NotFound(symbol.to_string())),
    };

    let volume = require_number("volume", quote.volume.as_deref())?;

    Ok(StockQuote {
        symbol: quote.symbol.unwrap_or_else(|| symbol.to_uppercase()),
        open: require_number("open", quote.open.as_deref())?,
        high: require_number("high", quote.high.as_deref())?,
        low: require_number("low", quote.low.as_deref())?,
        price,
        volume: volume.max(0.0) as u64,
    })
}

// ---------------------------------------------------------------------------
// OVERVIEW + BALANCE_SHEET + CASH_FLOW
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct AvOverview {
    #[serde(rename = "MarketCapitalization")]
    market_capitalization: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AvReports<T> {
    #[serde(rename = "quarterlyReports", default = "Vec::new")]
    quarterly: Vec<T>,
    #[serde(rename = "annualReports", default = "Vec::new")]
    annual: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AvBalanceSheet {
    fiscal_date_ending: Option<String>,
    total_current_assets: Option<String>,
    total_current_liabilities: Option<String>,
    cash_and_cash_equivalents_at_carrying_value: Option<String>,
    short_long_term_debt_total: Option<String>,
    total_shareholder_equity: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AvCashFlow {
    operating_cashflow: Option<String>,
    capital_expenditures: Option<String>,
}

/// Builds a snapshot from the three fundamentals endpoints.
///
/// Balance-sheet figures come from the latest quarterly report (annual when no
/// quarter is available); free cash flow is operating cash flow minus capital
/// expenditures from the latest annual report.
pub fn parse_fundamentals(
    symbol: &str,
    overview: Value,
    balance_sheet: Value,
    cash_flow: Value,
) -> Result<FundamentalsSnapshot, ProviderError> {
    let overview = decode::<AvOverview>(overview)?;
    let market_cap = match overview.market_capitalization.as_deref() {
        Some(raw) => require_number("MarketCapitalization", Some(raw))?,
        None => return Err(ProviderError::NotFound(symbol.to_string())),
    };

    let balance = decode::<AvReports<AvBalanceSheet>>(balance_sheet)?;
    let latest_balance = balance
        .quarterly
        .first()
        .or_else(|| balance.annual.first())
        .ok_or_else(|| ProviderError::BadResponse("no balance sheet reports".into()))?;

    let cash = decode::<AvReports<AvCashFlow>>(cash_flow)?;
    let latest_cash_flow = cash
        .annual
        .first()
        .or_else(|| cash.quarterly.first())
        .ok_or_else(|| ProviderError::BadResponse("no cash flow reports".into()))?;

    let operating = require_number("operatingCashflow", latest_cash_flow.operating_cashflow.as_deref())?;
    let capex = parse_optional_number("capitalExpenditures", latest_cash_flow.capital_expenditures.as_deref())?
        .unwrap_or(0.0);

    let as_of = latest_balance
        .fiscal_date_ending
        .as_deref()
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());

    Ok(FundamentalsSnapshot {
        market_cap,
        cash_and_equivalents: require_number(
            "cashAndCashEquivalentsAtCarryingValue",
            latest_balance.cash_and_cash_equivalents_at_carrying_value.as_deref(),
        )?,
        // No debt line means no reported debt
        total_debt: parse_optional_number("shortLongTermDebtTotal", latest_balance.short_long_term_debt_total.as_deref())?
            .unwrap_or(0.0),
        current_assets: require_number("totalCurrentAssets", latest_balance.total_current_assets.as_deref())?,
        current_liabilities: require_number(
            "totalCurrentLiabilities",
            latest_balance.total_current_liabilities.as_deref(),
        )?,
        total_equity: require_number("totalShareholderEquity", latest_balance.total_shareholder_equity.as_deref())?,
        free_cash_flow: operating - capex.abs(),
        as_of,
    })
}

#[async_trait]
impl PriceProvider for AlphaVantageProvider {
    async fn fetch_daily_history(
        &self,
        symbol: &str,
        days: u32,
    ) -> Result<Vec<PriceBar>, ProviderError> {
        // compact returns the latest ~100 points, full 20+ years
        let outputsize = if days <= 100 { "compact" } else { "full" };

        let body = self
            .query(&[
                ("function", "TIME_SERIES_DAILY"),
                ("symbol", symbol),
                ("outputsize", outputsize),
            ])
            .await?;

        parse_daily_series(body, days)
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<StockQuote, ProviderError> {
        let body = self
            .query(&[("function", "GLOBAL_QUOTE"), ("symbol", symbol)])
            .await?;

        parse_global_quote(symbol, body)
    }
}

#[async_trait]
impl FundamentalsProvider for AlphaVantageProvider {
    async fn fetch_fundamentals(&self, symbol: &str) -> Result<FundamentalsSnapshot, ProviderError> {
        let overview_params = [("function", "OVERVIEW"), ("symbol", symbol)];
        let balance_sheet_params = [("function", "BALANCE_SHEET"), ("symbol", symbol)];
        let cash_flow_params = [("function", "CASH_FLOW"), ("symbol", symbol)];

        let (overview, balance_sheet, cash_flow) = tokio::try_join!(
            self.query(&overview_params),
            self.query(&balance_sheet_params),
            self.query(&cash_flow_params),
        )?;

        parse_fundamentals(symbol, overview, balance_sheet, cash_flow)
    }
}
