use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;

use superstock_backend::app;
use superstock_backend::config::AppConfig;
use superstock_backend::external::alphavantage::AlphaVantageProvider;
use superstock_backend::logging::{init_logging, LoggingConfig};
use superstock_backend::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging FIRST
    init_logging(LoggingConfig::from_env())
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;

    let config = AppConfig::from_env()?;

    let provider = Arc::new(
        AlphaVantageProvider::from_env().context("failed to create AlphaVantageProvider (check ALPHAVANTAGE_API_KEY)")?,
    );
    tracing::info!("📊 Using market data provider: Alpha Vantage");
    tracing::info!(
        "📐 Base window {} weeks, tightness <= {:.1}%, volume decline >= {:.0}%",
        config.screening.min_base_duration_weeks,
        config.screening.tight_base_threshold * 100.0,
        config.screening.volume_decline_threshold * 100.0
    );

    let state = AppState {
        price_provider: provider.clone(),
        fundamentals_provider: provider,
        screening_config: Arc::new(config.screening.clone()),
        history_days: config.history_days,
    };
    let app = app::create_app(state);

    let addr = config.socket_addr()?;
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("🚀 Superstock backend running at http://{}/", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
