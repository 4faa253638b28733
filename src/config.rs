use std::net::SocketAddr;
use std::str::FromStr;

use anyhow::Context;
use tracing::warn;

use crate::models::ScreeningConfig;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Daily bars requested per symbol when screening through the providers.
    pub history_days: u32,
    pub screening: ScreeningConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let screening = screening_config_from(&lookup);
        screening
            .validate()
            .context("SUPERSTOCK_* settings produce an invalid screening config")?;

        let config = Self {
            host: lookup("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or("SERVER_PORT", &lookup, 3000),
            history_days: parse_or("HISTORY_DAYS", &lookup, 260),
            screening,
        };

        let required = config.screening.required_history_days() as u32;
        if config.history_days < required {
            anyhow::bail!(
                "HISTORY_DAYS ({}) is shorter than the {} trading days the base window needs",
                config.history_days,
                required
            );
        }

        Ok(config)
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid bind address {}:{}", self.host, self.port))
    }
}

/// Reads `SUPERSTOCK_*` overrides on top of [`ScreeningConfig::default`].
pub fn screening_config_from<F>(lookup: &F) -> ScreeningConfig
where
    F: Fn(&str) -> Option<String>,
{
    let d = ScreeningConfig::default();
    ScreeningConfig {
        min_base_duration_weeks: parse_or("SUPERSTOCK_MIN_BASE_WEEKS", lookup, d.min_base_duration_weeks),
        tight_base_threshold: parse_or("SUPERSTOCK_TIGHT_BASE_THRESHOLD", lookup, d.tight_base_threshold),
        volume_decline_threshold: parse_or("SUPERSTOCK_VOLUME_DECLINE_THRESHOLD", lookup, d.volume_decline_threshold),
        min_current_ratio: parse_or("SUPERSTOCK_MIN_CURRENT_RATIO", lookup, d.min_current_ratio),
        min_free_cash_flow: parse_or("SUPERSTOCK_MIN_FREE_CASH_FLOW", lookup, d.min_free_cash_flow),
        signal_lookback_weeks: parse_or("SUPERSTOCK_SIGNAL_LOOKBACK_WEEKS", lookup, d.signal_lookback_weeks),
        volume_contraction_ratio: parse_or("SUPERSTOCK_VOLUME_CONTRACTION_RATIO", lookup, d.volume_contraction_ratio),
        consolidation_range_threshold: parse_or(
            "SUPERSTOCK_CONSOLIDATION_RANGE_THRESHOLD",
            lookup,
            d.consolidation_range_threshold,
        ),
        low_volatility_threshold: parse_or("SUPERSTOCK_LOW_VOLATILITY_THRESHOLD", lookup, d.low_volatility_threshold),
        retest_tolerance: parse_or("SUPERSTOCK_RETEST_TOLERANCE", lookup, d.retest_tolerance),
        min_retests: parse_or("SUPERSTOCK_MIN_RETESTS", lookup, d.min_retests),
    }
}

fn parse_or<T, F>(key: &str, lookup: &F, default: T) -> T
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring unparsable {}={:?}, using default", key, raw);
            default
        }),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.history_days, 260);
        assert_eq!(config.screening, ScreeningConfig::default());
    }

    #[test]
    fn overrides_are_applied() {
        let config = AppConfig::from_lookup(lookup(&[
            ("SERVER_PORT", "8080"),
            ("SUPERSTOCK_TIGHT_BASE_THRESHOLD", "0.08"),
            ("SUPERSTOCK_MIN_BASE_WEEKS", "8"),
        ]))
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.screening.tight_base_threshold, 0.08);
        assert_eq!(config.screening.min_base_duration_weeks, 8);
        assert_eq!(config.socket_addr().unwrap().port(), 8080);
    }

    #[test]
    fn garbage_falls_back_to_default() {
        let config = AppConfig::from_lookup(lookup(&[("SUPERSTOCK_MIN_CURRENT_RATIO", "two")])).unwrap();
        assert_eq!(config.screening.min_current_ratio, 2.0);
    }

    #[test]
    fn rejects_invalid_screening_config() {
        assert!(AppConfig::from_lookup(lookup(&[("SUPERSTOCK_MIN_BASE_WEEKS", "1")])).is_err());
    }

    #[test]
    fn rejects_history_shorter_than_base() {
        assert!(AppConfig::from_lookup(lookup(&[("HISTORY_DAYS", "30")])).is_err());
    }
}
