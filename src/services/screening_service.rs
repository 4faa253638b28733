use tracing::debug;

use crate::errors::ScreeningError;
use crate::models::screening::*;
use crate::models::{FundamentalMetrics, FundamentalsSnapshot, PriceBar, WeeklyBar};
use crate::services::indicators::{coefficient_of_variation, mean};

/// Trading days folded into one weekly bar.
pub const DAYS_PER_WEEK: usize = 5;

// -----------------------------------------------------------------------
// Public entry point
// -----------------------------------------------------------------------

/// Screen one security against the superstock setup.
///
/// Pipeline:
/// 1. validate config, history and fundamentals (errors)
/// 2. aggregate daily bars into weekly bars
/// 3. measure the trailing base and gate on it
/// 4. gate on liquidity ratios
/// 5. derive technical signals for a qualified setup
pub fn evaluate(
    history: &[PriceBar],
    fundamentals: &FundamentalsSnapshot,
    config: &ScreeningConfig,
) -> Result<ScreeningVerdict, ScreeningError> {
    evaluate_with_context(history, fundamentals, config, &ScreeningContext::default())
}

/// Same as [`evaluate`], attaching caller-supplied sector and sentiment data
/// to a qualified verdict.
pub fn evaluate_with_context(
    history: &[PriceBar],
    fundamentals: &FundamentalsSnapshot,
    config: &ScreeningConfig,
    context: &ScreeningContext,
) -> Result<ScreeningVerdict, ScreeningError> {
    config.validate()?;
    validate_history(history, config)?;

    let weekly = aggregate_to_weekly(history);
    let base_formation = analyze_base_formation(&weekly, config)?;
    let metrics = analyze_fundamentals(fundamentals)?;

    if !is_qualifying_base(&base_formation, config) {
        debug!(
            "Base rejected: {} weeks, tightness {:.4}, volume {:?}",
            base_formation.duration_weeks,
            base_formation.price_range.tightness(),
            base_formation.volume_profile.trend
        );
        return Ok(ScreeningVerdict::FailedBaseFormation { base_formation });
    }

    if !has_strong_fundamentals(&metrics, config) {
        debug!(
            "Fundamentals rejected: cash {} vs market cap {}, current ratio {:.2}, FCF {}",
            metrics.cash_position, metrics.market_cap, metrics.current_ratio, metrics.free_cash_flow
        );
        return Ok(ScreeningVerdict::FailedFundamentals {
            base_formation,
            fundamentals: metrics,
        });
    }

    let technical_signals = detect_technical_signals(&weekly, &base_formation, config)?;

    Ok(ScreeningVerdict::Qualified {
        base_formation,
        fundamentals: metrics,
        technical_signals,
        sector_analysis: context.sector_analysis.clone(),
        sentiment: context.sentiment.clone(),
    })
}

// -----------------------------------------------------------------------
// Input validation
// -----------------------------------------------------------------------

pub fn validate_history(history: &[PriceBar], config: &ScreeningConfig) -> Result<(), ScreeningError> {
    let required = config.required_history_days();
    if history.is_empty() || history.len() < required {
        return Err(ScreeningError::InsufficientHistory {
            required,
            actual: history.len(),
        });
    }

    for (i, bar) in history.iter().enumerate() {
        let values = [bar.open, bar.high, bar.low, bar.close, bar.volume];
        if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(ScreeningError::InvalidPriceData(format!(
                "bar {} ({}) has a negative or non-finite value",
                i, bar.date
            )));
        }
        let in_range = |price: f64| price >= bar.low && price <= bar.high;
        if bar.low > bar.high || !in_range(bar.open) || !in_range(bar.close) {
            return Err(ScreeningError::InvalidPriceData(format!(
                "bar {} ({}) has open/close outside its low-high range",
                i, bar.date
            )));
        }
        if i > 0 && bar.date <= history[i - 1].date {
            return Err(ScreeningError::UnorderedHistory { index: i });
        }
    }

    Ok(())
}

// -----------------------------------------------------------------------
// Weekly aggregation
// -----------------------------------------------------------------------

/// Groups bars oldest-first into runs of [`DAYS_PER_WEEK`]; only the most
/// recent group may be partial.
pub fn aggregate_to_weekly(history: &[PriceBar]) -> Vec<WeeklyBar> {
    history
        .chunks(DAYS_PER_WEEK)
        .filter_map(|days| {
            let first = days.first()?;
            let last = days.last()?;
            let high = days.iter().map(|d| d.high).fold(f64::MIN, f64::max);
            let low = days.iter().map(|d| d.low).fold(f64::MAX, f64::min);
            let total_volume: f64 = days.iter().map(|d| d.volume).sum();

            Some(WeeklyBar {
                start_date: first.date,
                end_date: last.date,
                high,
                low,
                close: last.close,
                average_volume: total_volume / days.len() as f64,
                trading_days: days.len(),
            })
        })
        .collect()
}

/// Trailing `min_base_duration_weeks` weekly bars.
pub fn base_window<'a>(
    weekly: &'a [WeeklyBar],
    config: &ScreeningConfig,
) -> Result<&'a [WeeklyBar], ScreeningError> {
    let weeks = config.min_base_duration_weeks;
    if weekly.len() < weeks {
        return Err(ScreeningError::InsufficientHistory {
            required: config.required_history_days(),
            actual: weekly.iter().map(|w| w.trading_days).sum(),
        });
    }
    Ok(&weekly[weekly.len() - weeks..])
}

// -----------------------------------------------------------------------
// Base formation
// -----------------------------------------------------------------------

pub fn analyze_base_formation(
    weekly: &[WeeklyBar],
    config: &ScreeningConfig,
) -> Result<BaseFormation, ScreeningError> {
    let window = base_window(weekly, config)?;

    let price_range = PriceRange {
        high: window.iter().map(|w| w.high).fold(f64::MIN, f64::max),
        low: window.iter().map(|w| w.low).fold(f64::MAX, f64::min),
    };
    if price_range.low <= 0.0 {
        return Err(ScreeningError::InvalidPriceData(format!(
            "base low must be positive, got {}",
            price_range.low
        )));
    }

    let closes: Vec<f64> = window.iter().map(|w| w.close).collect();
    let volatility = coefficient_of_variation(&closes).ok_or_else(|| {
        ScreeningError::InvalidPriceData("weekly closes average to zero".into())
    })?;

    let volumes: Vec<f64> = window.iter().map(|w| w.average_volume).collect();
    let (trend, change) = volume_trend(&volumes, config.volume_decline_threshold);

    Ok(BaseFormation {
        duration_weeks: window.len(),
        price_range,
        volume_profile: VolumeProfile {
            average: mean(&volumes).unwrap_or(0.0),
            trend,
            change,
        },
        weekly_closes: WeeklyCloses {
            prices: closes,
            volatility,
        },
    })
}

/// Compares mean volume of the second half of `volumes` with the first half.
/// An odd middle element belongs to the second half.
pub fn volume_trend(volumes: &[f64], threshold: f64) -> (VolumeTrend, f64) {
    let mid = volumes.len() / 2;
    let (first, second) = match (mean(&volumes[..mid]), mean(&volumes[mid..])) {
        (Some(first), Some(second)) => (first, second),
        _ => return (VolumeTrend::Flat, 0.0),
    };

    if first <= 0.0 {
        let trend = if second > 0.0 { VolumeTrend::Increasing } else { VolumeTrend::Flat };
        return (trend, 0.0);
    }

    let change = (second - first) / first;
    let trend = if change < 0.0 && change <= -threshold {
        VolumeTrend::Declining
    } else if change > 0.0 && change >= threshold {
        VolumeTrend::Increasing
    } else {
        VolumeTrend::Flat
    };

    (trend, change)
}

pub fn is_qualifying_base(base: &BaseFormation, config: &ScreeningConfig) -> bool {
    let has_long_duration = base.duration_weeks >= config.min_base_duration_weeks;
    let has_tight_range = base.price_range.tightness() <= config.tight_base_threshold;
    let has_declining_volume = base.volume_profile.trend == VolumeTrend::Declining;

    has_long_duration && has_tight_range && has_declining_volume
}

// -----------------------------------------------------------------------
// Fundamentals
// -----------------------------------------------------------------------

pub fn analyze_fundamentals(f: &FundamentalsSnapshot) -> Result<FundamentalMetrics, ScreeningError> {
    let fields = [
        ("market_cap", f.market_cap),
        ("cash_and_equivalents", f.cash_and_equivalents),
        ("total_debt", f.total_debt),
        ("current_assets", f.current_assets),
        ("current_liabilities", f.current_liabilities),
        ("total_equity", f.total_equity),
        ("free_cash_flow", f.free_cash_flow),
    ];
    if let Some((name, value)) = fields.iter().find(|(_, v)| !v.is_finite()) {
        return Err(ScreeningError::InvalidFundamentals(format!(
            "{} is not a finite number ({})",
            name, value
        )));
    }

    if f.current_liabilities <= 0.0 {
        return Err(ScreeningError::InvalidFundamentals(format!(
            "current_liabilities must be positive, got {}",
            f.current_liabilities
        )));
    }
    if f.total_equity <= 0.0 {
        return Err(ScreeningError::InvalidFundamentals(format!(
            "total_equity must be positive, got {}",
            f.total_equity
        )));
    }

    Ok(FundamentalMetrics {
        market_cap: f.market_cap,
        cash_position: f.cash_and_equivalents,
        total_debt: f.total_debt,
        current_ratio: f.current_assets / f.current_liabilities,
        quick_ratio: (f.current_assets - f.current_liabilities) / f.current_liabilities,
        debt_to_equity: f.total_debt / f.total_equity,
        free_cash_flow: f.free_cash_flow,
    })
}

pub fn has_strong_fundamentals(metrics: &FundamentalMetrics, config: &ScreeningConfig) -> bool {
    let has_cash_over_market_cap = metrics.cash_position > metrics.market_cap;
    let has_strong_liquidity = metrics.current_ratio > config.min_current_ratio;
    let has_positive_cash_flow = metrics.free_cash_flow > config.min_free_cash_flow;

    has_cash_over_market_cap && has_strong_liquidity && has_positive_cash_flow
}

// -----------------------------------------------------------------------
// Technical signals
// -----------------------------------------------------------------------

pub fn detect_technical_signals(
    weekly: &[WeeklyBar],
    base: &BaseFormation,
    config: &ScreeningConfig,
) -> Result<TechnicalSignals, ScreeningError> {
    let window = base_window(weekly, config)?;
    let lookback = config.signal_lookback_weeks.min(window.len());
    let recent = &window[window.len() - lookback..];

    Ok(TechnicalSignals {
        volume_contraction: has_volume_contraction(recent, base, config),
        price_consolidation: has_price_consolidation(recent, config),
        low_volatility: base.weekly_closes.volatility <= config.low_volatility_threshold,
        retest_pattern: has_retest_pattern(window, base, config),
    })
}

fn has_volume_contraction(recent: &[WeeklyBar], base: &BaseFormation, config: &ScreeningConfig) -> bool {
    let volumes: Vec<f64> = recent.iter().map(|w| w.average_volume).collect();
    match mean(&volumes) {
        Some(recent_avg) if base.volume_profile.average > 0.0 => {
            recent_avg <= base.volume_profile.average * config.volume_contraction_ratio
        }
        _ => false,
    }
}

fn has_price_consolidation(recent: &[WeeklyBar], config: &ScreeningConfig) -> bool {
    let high = recent.iter().map(|w| w.high).fold(f64::MIN, f64::max);
    let low = recent.iter().map(|w| w.low).fold(f64::MAX, f64::min);
    if recent.is_empty() || low <= 0.0 {
        return false;
    }
    (high - low) / low <= config.consolidation_range_threshold
}

// A retest is a run of weeks dipping into the support zone; the week before
// each run must have traded above it.
fn has_retest_pattern(window: &[WeeklyBar], base: &BaseFormation, config: &ScreeningConfig) -> bool {
    let zone = base.price_range.low * (1.0 + config.retest_tolerance);

    let mut retests = 0;
    let mut in_zone = false;
    for week in window {
        let touches = week.low <= zone;
        if touches && !in_zone {
            retests += 1;
        }
        in_zone = touches;
    }

    let holds_support = window.last().map(|w| w.close > zone).unwrap_or(false);
    retests >= config.min_retests && holds_support
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn day(i: usize) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(i as i64)
    }

    fn bar(i: usize, high: f64, low: f64, close: f64, volume: f64) -> PriceBar {
        PriceBar::new(day(i), close, high, low, close, volume)
    }

    fn weekly(high: f64, low: f64, close: f64, volume: f64) -> WeeklyBar {
        WeeklyBar {
            start_date: day(0),
            end_date: day(4),
            high,
            low,
            close,
            average_volume: volume,
            trading_days: 5,
        }
    }

    #[test]
    fn test_aggregate_full_and_partial_weeks() {
        let history: Vec<PriceBar> = (0..7)
            .map(|i| bar(i, 10.0 + i as f64, 5.0 - i as f64 * 0.1, 8.0 + i as f64, 100.0 * (i + 1) as f64))
            .collect();

        let weeks = aggregate_to_weekly(&history);
        assert_eq!(weeks.len(), 2);

        let first = &weeks[0];
        assert_eq!(first.trading_days, 5);
        assert_eq!(first.high, 14.0);
        assert!((first.low - 4.6).abs() < 1e-12);
        assert_eq!(first.close, 12.0);
        assert_eq!(first.average_volume, 300.0);
        assert_eq!(first.start_date, day(0));
        assert_eq!(first.end_date, day(4));

        let partial = &weeks[1];
        assert_eq!(partial.trading_days, 2);
        assert_eq!(partial.close, 14.0);
        assert_eq!(partial.average_volume, 650.0);
    }

    #[test]
    fn test_aggregate_empty() {
        assert!(aggregate_to_weekly(&[]).is_empty());
    }

    #[test]
    fn test_volume_trend_classification() {
        let declining = [100.0, 100.0, 60.0, 60.0];
        let (trend, change) = volume_trend(&declining, 0.3);
        assert_eq!(trend, VolumeTrend::Declining);
        assert!((change + 0.4).abs() < 1e-12);

        let (trend, _) = volume_trend(&[100.0, 100.0, 140.0, 140.0], 0.3);
        assert_eq!(trend, VolumeTrend::Increasing);

        let (trend, _) = volume_trend(&[100.0, 100.0, 90.0, 90.0], 0.3);
        assert_eq!(trend, VolumeTrend::Flat);

        // exactly at the threshold counts
        let (trend, _) = volume_trend(&[100.0, 70.0], 0.3);
        assert_eq!(trend, VolumeTrend::Declining);
    }

    #[test]
    fn test_volume_trend_zero_first_half() {
        assert_eq!(volume_trend(&[0.0, 0.0], 0.3), (VolumeTrend::Flat, 0.0));
        assert_eq!(volume_trend(&[0.0, 10.0], 0.3), (VolumeTrend::Increasing, 0.0));
    }

    #[test]
    fn test_base_window_uses_trailing_weeks() {
        let config = ScreeningConfig { min_base_duration_weeks: 2, signal_lookback_weeks: 1, ..Default::default() };
        let weeks = vec![
            weekly(50.0, 40.0, 45.0, 10.0),
            weekly(101.0, 99.0, 100.0, 10.0),
            weekly(102.0, 100.0, 101.0, 5.0),
        ];
        let base = analyze_base_formation(&weeks, &config).unwrap();
        assert_eq!(base.duration_weeks, 2);
        assert_eq!(base.price_range, PriceRange { high: 102.0, low: 99.0 });
        assert_eq!(base.weekly_closes.prices, vec![100.0, 101.0]);
        assert_eq!(base.volume_profile.trend, VolumeTrend::Declining);
    }

    #[test]
    fn test_zero_base_low_is_rejected() {
        let config = ScreeningConfig { min_base_duration_weeks: 2, signal_lookback_weeks: 1, ..Default::default() };
        let weeks = vec![weekly(10.0, 0.0, 5.0, 10.0), weekly(10.0, 1.0, 5.0, 10.0)];
        assert!(matches!(
            analyze_base_formation(&weeks, &config),
            Err(ScreeningError::InvalidPriceData(_))
        ));
    }

    #[test]
    fn test_validate_history_rejects_duplicate_dates() {
        let config = ScreeningConfig { min_base_duration_weeks: 2, signal_lookback_weeks: 1, ..Default::default() };
        let mut history: Vec<PriceBar> = (0..10).map(|i| bar(i, 10.0, 9.0, 9.5, 100.0)).collect();
        history[6].date = history[5].date;
        assert_eq!(
            validate_history(&history, &config),
            Err(ScreeningError::UnorderedHistory { index: 6 })
        );
    }

    #[test]
    fn test_validate_history_rejects_nan() {
        let config = ScreeningConfig { min_base_duration_weeks: 2, signal_lookback_weeks: 1, ..Default::default() };
        let mut history: Vec<PriceBar> = (0..10).map(|i| bar(i, 10.0, 9.0, 9.5, 100.0)).collect();
        history[3].close = f64::NAN;
        assert!(matches!(
            validate_history(&history, &config),
            Err(ScreeningError::InvalidPriceData(_))
        ));
    }

    fn snapshot() -> FundamentalsSnapshot {
        FundamentalsSnapshot {
            market_cap: 100.0,
            cash_and_equivalents: 150.0,
            total_debt: 20.0,
            current_assets: 300.0,
            current_liabilities: 100.0,
            total_equity: 200.0,
            free_cash_flow: 10.0,
            as_of: None,
        }
    }

    #[test]
    fn test_fundamental_ratios() {
        let m = analyze_fundamentals(&snapshot()).unwrap();
        assert_eq!(m.current_ratio, 3.0);
        assert_eq!(m.quick_ratio, 2.0);
        assert_eq!(m.debt_to_equity, 0.1);
        assert!(has_strong_fundamentals(&m, &ScreeningConfig::default()));
    }

    #[test]
    fn test_fundamentals_reject_bad_denominators() {
        let mut f = snapshot();
        f.total_equity = -5.0;
        assert!(matches!(analyze_fundamentals(&f), Err(ScreeningError::InvalidFundamentals(_))));

        let mut f = snapshot();
        f.free_cash_flow = f64::INFINITY;
        assert!(matches!(analyze_fundamentals(&f), Err(ScreeningError::InvalidFundamentals(_))));
    }

    #[test]
    fn test_fundamentals_gate_each_condition() {
        let config = ScreeningConfig::default();
        let base = analyze_fundamentals(&snapshot()).unwrap();

        let low_cash = FundamentalMetrics { cash_position: 100.0, ..base.clone() };
        assert!(!has_strong_fundamentals(&low_cash, &config));

        let weak_liquidity = FundamentalMetrics { current_ratio: 2.0, ..base.clone() };
        assert!(!has_strong_fundamentals(&weak_liquidity, &config));

        let burning_cash = FundamentalMetrics { free_cash_flow: 0.0, ..base };
        assert!(!has_strong_fundamentals(&burning_cash, &config));
    }

    #[test]
    fn test_retest_requires_distinct_touches() {
        let config = ScreeningConfig {
            min_base_duration_weeks: 4,
            signal_lookback_weeks: 2,
            ..Default::default()
        };
        // Two adjacent touches only count once
        let adjacent = vec![
            weekly(105.0, 100.0, 104.0, 10.0),
            weekly(105.0, 100.0, 104.0, 10.0),
            weekly(105.0, 103.0, 104.0, 10.0),
            weekly(105.0, 103.0, 104.0, 10.0),
        ];
        let base = analyze_base_formation(&adjacent, &config).unwrap();
        let signals = detect_technical_signals(&adjacent, &base, &config).unwrap();
        assert!(!signals.retest_pattern);

        let separated = vec![
            weekly(105.0, 100.0, 104.0, 10.0),
            weekly(105.0, 103.0, 104.0, 10.0),
            weekly(105.0, 100.5, 104.0, 10.0),
            weekly(105.0, 103.0, 104.0, 10.0),
        ];
        let base = analyze_base_formation(&separated, &config).unwrap();
        let signals = detect_technical_signals(&separated, &base, &config).unwrap();
        assert!(signals.retest_pattern);
    }

    #[test]
    fn test_continuous_run_on_support_is_one_retest() {
        let config = ScreeningConfig {
            min_base_duration_weeks: 4,
            signal_lookback_weeks: 2,
            ..Default::default()
        };
        let run = vec![
            weekly(105.0, 100.0, 104.0, 10.0),
            weekly(105.0, 100.0, 104.0, 10.0),
            weekly(105.0, 100.0, 104.0, 10.0),
            weekly(105.0, 103.0, 104.0, 10.0),
        ];
        let base = analyze_base_formation(&run, &config).unwrap();
        let signals = detect_technical_signals(&run, &base, &config).unwrap();
        assert!(!signals.retest_pattern);

        let two_runs = vec![
            weekly(105.0, 100.0, 104.0, 10.0),
            weekly(105.0, 100.0, 104.0, 10.0),
            weekly(105.0, 103.0, 104.0, 10.0),
            weekly(105.0, 100.2, 104.0, 10.0),
        ];
        let base = analyze_base_formation(&two_runs, &config).unwrap();
        let signals = detect_technical_signals(&two_runs, &base, &config).unwrap();
        assert!(signals.retest_pattern);
    }

    #[test]
    fn test_inconsistent_bar_is_invalid_price_data() {
        let config = ScreeningConfig {
            min_base_duration_weeks: 2,
            signal_lookback_weeks: 1,
            ..Default::default()
        };
        let mut history: Vec<PriceBar> = (0..10).map(|i| bar(i, 101.0, 99.0, 100.0, 50.0)).collect();
        assert!(validate_history(&history, &config).is_ok());

        history[4].high = 90.0;
        let err = validate_history(&history, &config).unwrap_err();
        assert!(matches!(err, ScreeningError::InvalidPriceData(_)));

        history[4].high = 101.0;
        history[4].close = 102.0;
        assert!(validate_history(&history, &config).is_err());

        history[4].close = 100.0;
        history[4].open = 98.5;
        assert!(validate_history(&history, &config).is_err());
    }

    #[test]
    fn test_volume_contraction_signal() {
        let config = ScreeningConfig {
            min_base_duration_weeks: 4,
            signal_lookback_weeks: 1,
            ..Default::default()
        };
        let weeks = vec![
            weekly(101.0, 100.0, 100.5, 100.0),
            weekly(101.0, 100.0, 100.5, 100.0),
            weekly(101.0, 100.0, 100.5, 100.0),
            weekly(101.0, 100.0, 100.5, 20.0),
        ];
        let base = analyze_base_formation(&weeks, &config).unwrap();
        let signals = detect_technical_signals(&weeks, &base, &config).unwrap();
        // 20 <= 0.7 * 80
        assert!(signals.volume_contraction);
        assert!(signals.price_consolidation);
        assert!(signals.low_volatility);
    }
}
