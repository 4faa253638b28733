use std::sync::Arc;

use crate::external::price_provider::{FundamentalsProvider, PriceProvider};
use crate::models::ScreeningConfig;

#[derive(Clone)]
pub struct AppState {
    pub price_provider: Arc<dyn PriceProvider>,
    pub fundamentals_provider: Arc<dyn FundamentalsProvider>,
    pub screening_config: Arc<ScreeningConfig>,
    pub history_days: u32,
}
