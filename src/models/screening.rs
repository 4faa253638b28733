use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ScreeningError;
use crate::models::fundamentals::{FundamentalMetrics, FundamentalsSnapshot};
use crate::models::price_bar::PriceBar;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Thresholds used by the superstock screening pipeline.
///
/// Defaults mirror the cutoffs the screener has always used (12-week base,
/// 5% range, 30% volume decline, current ratio above 2, cash above market cap).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreeningConfig {
    /// Weekly bars in the base window; history must cover `5 *` this many days.
    pub min_base_duration_weeks: usize,
    /// Max (high - low) / low over the base window.
    pub tight_base_threshold: f64,
    /// Fractional drop in second-half volume that counts as declining.
    pub volume_decline_threshold: f64,
    pub min_current_ratio: f64,
    pub min_free_cash_flow: f64,

    /// Trailing weeks inspected by the technical signals.
    pub signal_lookback_weeks: usize,
    /// Recent volume must be at most this fraction of the base average.
    pub volume_contraction_ratio: f64,
    pub consolidation_range_threshold: f64,
    /// Max coefficient of variation of weekly closes.
    pub low_volatility_threshold: f64,
    /// How close to the base low a weekly low must come to count as a retest.
    pub retest_tolerance: f64,
    pub min_retests: usize,
}

impl Default for ScreeningConfig {
    fn default() -> Self {
        Self {
            min_base_duration_weeks: 12,
            tight_base_threshold: 0.05,
            volume_decline_threshold: 0.30,
            min_current_ratio: 2.0,
            min_free_cash_flow: 0.0,
            signal_lookback_weeks: 3,
            volume_contraction_ratio: 0.70,
            consolidation_range_threshold: 0.03,
            low_volatility_threshold: 0.02,
            retest_tolerance: 0.01,
            min_retests: 2,
        }
    }
}

impl ScreeningConfig {
    /// Daily bars required before a base can be measured.
    pub fn required_history_days(&self) -> usize {
        self.min_base_duration_weeks * 5
    }

    pub fn validate(&self) -> Result<(), ScreeningError> {
        if self.min_base_duration_weeks < 2 {
            return Err(ScreeningError::InvalidConfig(
                "min_base_duration_weeks must be at least 2".into(),
            ));
        }
        if self.signal_lookback_weeks == 0 || self.signal_lookback_weeks > self.min_base_duration_weeks {
            return Err(ScreeningError::InvalidConfig(format!(
                "signal_lookback_weeks must be between 1 and {}",
                self.min_base_duration_weeks
            )));
        }

        let fractions = [
            ("tight_base_threshold", self.tight_base_threshold),
            ("volume_decline_threshold", self.volume_decline_threshold),
            ("volume_contraction_ratio", self.volume_contraction_ratio),
            ("consolidation_range_threshold", self.consolidation_range_threshold),
            ("low_volatility_threshold", self.low_volatility_threshold),
            ("retest_tolerance", self.retest_tolerance),
        ];
        for (name, value) in fractions {
            if !value.is_finite() || value < 0.0 {
                return Err(ScreeningError::InvalidConfig(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }

        if !self.min_current_ratio.is_finite() || !self.min_free_cash_flow.is_finite() {
            return Err(ScreeningError::InvalidConfig(
                "fundamental thresholds must be finite".into(),
            ));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Base formation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeTrend {
    Declining,
    Flat,
    Increasing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub high: f64,
    pub low: f64,
}

impl PriceRange {
    /// (high - low) / low. Callers guarantee `low > 0`.
    pub fn tightness(&self) -> f64 {
        (self.high - self.low) / self.low
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeProfile {
    pub average: f64,
    pub trend: VolumeTrend,
    /// Second-half mean volume relative to first-half mean, as a fraction.
    pub change: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyCloses {
    pub prices: Vec<f64>,
    /// Coefficient of variation of `prices`.
    pub volatility: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseFormation {
    pub duration_weeks: usize,
    pub price_range: PriceRange,
    pub volume_profile: VolumeProfile,
    pub weekly_closes: WeeklyCloses,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TechnicalSignals {
    pub volume_contraction: bool,
    pub price_consolidation: bool,
    pub low_volatility: bool,
    pub retest_pattern: bool,
}

// ---------------------------------------------------------------------------
// Pass-through context supplied by callers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectorTrend {
    Bullish,
    Bearish,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorAnalysis {
    pub sector: String,
    pub correlated_stocks: Vec<String>,
    pub sector_trend: SectorTrend,
    pub relative_strength: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaAnalysis {
    pub sentiment: SentimentLabel,
    pub coverage: u32,
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalystRecommendations {
    pub buy: u32,
    pub hold: u32,
    pub sell: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTargets {
    pub low: f64,
    pub high: f64,
    pub average: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalystCoverage {
    pub recommendations: AnalystRecommendations,
    pub price_targets: PriceTargets,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentIndicators {
    pub media_analysis: MediaAnalysis,
    pub analyst_coverage: AnalystCoverage,
}

/// Optional data attached to a qualified verdict untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScreeningContext {
    #[serde(default)]
    pub sector_analysis: Option<SectorAnalysis>,
    #[serde(default)]
    pub sentiment: Option<SentimentIndicators>,
}

// ---------------------------------------------------------------------------
// Verdict
// ---------------------------------------------------------------------------

/// Outcome of a screening run. Disqualifications are normal results, not errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ScreeningVerdict {
    Qualified {
        base_formation: BaseFormation,
        fundamentals: FundamentalMetrics,
        technical_signals: TechnicalSignals,
        sector_analysis: Option<SectorAnalysis>,
        sentiment: Option<SentimentIndicators>,
    },
    FailedBaseFormation {
        base_formation: BaseFormation,
    },
    FailedFundamentals {
        base_formation: BaseFormation,
        fundamentals: FundamentalMetrics,
    },
}

impl ScreeningVerdict {
    pub fn is_qualified(&self) -> bool {
        matches!(self, ScreeningVerdict::Qualified { .. })
    }

    pub fn outcome(&self) -> &'static str {
        match self {
            ScreeningVerdict::Qualified { .. } => "qualified",
            ScreeningVerdict::FailedBaseFormation { .. } => "failed_base_formation",
            ScreeningVerdict::FailedFundamentals { .. } => "failed_fundamentals",
        }
    }

    pub fn base_formation(&self) -> &BaseFormation {
        match self {
            ScreeningVerdict::Qualified { base_formation, .. }
            | ScreeningVerdict::FailedBaseFormation { base_formation }
            | ScreeningVerdict::FailedFundamentals { base_formation, .. } => base_formation,
        }
    }
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// POST body for `/api/screening/evaluate`.
#[derive(Debug, Clone, Deserialize)]
pub struct EvaluateRequest {
    pub history: Vec<PriceBar>,
    pub fundamentals: FundamentalsSnapshot,
    /// Overrides the server's screening config when present
    pub config: Option<ScreeningConfig>,
    #[serde(flatten)]
    pub context: ScreeningContext,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreeningResponse {
    pub symbol: String,
    pub verdict: ScreeningVerdict,
    pub matched_criteria: Vec<String>,
    pub screened_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchScreeningRequest {
    pub symbols: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchScreeningEntry {
    pub symbol: String,
    pub result: Option<ScreeningResponse>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchScreeningResponse {
    pub results: Vec<BatchScreeningEntry>,
    pub total_screened: usize,
    pub total_qualified: usize,
    pub screened_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ScreeningConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.required_history_days(), 60);
    }

    #[test]
    fn test_partial_config_json_keeps_defaults() {
        let config: ScreeningConfig =
            serde_json::from_str(r#"{ "min_base_duration_weeks": 8 }"#).unwrap();
        assert_eq!(config.min_base_duration_weeks, 8);
        assert_eq!(config.tight_base_threshold, 0.05);
        assert_eq!(config.min_retests, 2);
    }

    #[test]
    fn test_validate_rejects_bad_thresholds() {
        let lookback = ScreeningConfig {
            signal_lookback_weeks: 13,
            ..ScreeningConfig::default()
        };
        assert!(matches!(lookback.validate(), Err(ScreeningError::InvalidConfig(_))));

        let negative = ScreeningConfig {
            retest_tolerance: -0.01,
            ..ScreeningConfig::default()
        };
        assert!(matches!(negative.validate(), Err(ScreeningError::InvalidConfig(_))));

        let nan = ScreeningConfig {
            min_current_ratio: f64::NAN,
            ..ScreeningConfig::default()
        };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn test_tightness() {
        let range = PriceRange { high: 105.0, low: 100.0 };
        assert!((range.tightness() - 0.05).abs() < 1e-12);
    }
}
