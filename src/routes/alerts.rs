use axum::routing::post;
use axum::{Json, Router};
use tracing::info;

use crate::errors::AppError;
use crate::models::{AlertPreviewRequest, EmailContent, ProcessAlertsRequest, ProcessAlertsResponse};
use crate::services::notification_service;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/preview", post(preview_alert))
        .route("/process", post(process_alerts))
}

async fn preview_alert(Json(req): Json<AlertPreviewRequest>) -> Result<Json<EmailContent>, AppError> {
    info!("POST /alerts/preview - {} for {}", req.stock.symbol, req.email);

    if !req.email.contains('@') {
        return Err(AppError::Validation(format!("Invalid email '{}'", req.email)));
    }

    let content = notification_service::send_stock_alert(&req.email, &req.stock, &req.matched_criteria);
    Ok(Json(content))
}

async fn process_alerts(Json(req): Json<ProcessAlertsRequest>) -> Json<ProcessAlertsResponse> {
    info!("📬 POST /alerts/process - {} pending alerts", req.alerts.len());
    Json(notification_service::process_alerts(&req.alerts))
}
