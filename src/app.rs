use axum::Router;
use tower_http::cors::CorsLayer;

use crate::routes::{alerts, health, screening, stocks};
use crate::state::AppState;

pub fn create_app(state: AppState) -> Router {
    Router::<AppState>::new()
        .nest("/health", health::router())
        .nest("/api/screening", screening::router())
        .nest("/api/stocks", stocks::router())
        .nest("/api/alerts", alerts::router())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
