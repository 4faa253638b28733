use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::stock::StockData;

// ==============================================================================
// Alert Models
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationFrequency {
    Daily,
    Weekly,
    Realtime,
}

/// An alert waiting to be emailed to the owner of its watchlist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingAlert {
    pub id: Uuid,
    pub watchlist_id: Uuid,
    pub user_id: Uuid,
    pub user_email: String,
    pub email_notifications: bool,
    pub notification_frequency: NotificationFrequency,
    pub stock: StockData,
    pub criteria_matched: Vec<String>,
    pub triggered_at: DateTime<Utc>,
}

// ==============================================================================
// Email Models
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailContent {
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlertPreviewRequest {
    pub email: String,
    pub stock: StockData,
    pub matched_criteria: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessAlertsRequest {
    pub alerts: Vec<PendingAlert>,
}

/// One email dispatched for a user, covering the listed alerts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationDispatch {
    pub user_id: Uuid,
    pub email: String,
    pub content: EmailContent,
    pub alert_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessAlertsResponse {
    pub dispatched: Vec<NotificationDispatch>,
    pub skipped_alert_ids: Vec<Uuid>,
}
