use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// One trading day of one security.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl PriceBar {
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

/// Aggregate of up to five consecutive daily bars.
///
/// `start_date`/`end_date` are the first and last trading dates in the group,
/// `close` is the last bar's close and `average_volume` the mean daily volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyBar {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub average_volume: f64,
    pub trading_days: usize,
}
