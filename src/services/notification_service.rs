use std::collections::BTreeMap;

use tracing::info;
use uuid::Uuid;

use crate::models::screening::{ScreeningVerdict, VolumeTrend};
use crate::models::{
    EmailContent, NotificationDispatch, PendingAlert, ProcessAlertsResponse, StockData,
};

// ==============================================================================
// Email Content
// ==============================================================================

pub fn generate_email_content(stock: &StockData, matched_criteria: &[String]) -> EmailContent {
    let criteria_items: String = matched_criteria
        .iter()
        .map(|c| format!("<li>{}</li>", escape_html(c)))
        .collect();

    EmailContent {
        subject: format!("Stock Alert: {} Matches Your Criteria", stock.symbol),
        body: format!(
            "<h2>Stock Alert for {symbol}</h2>\n\
             <p>Company: {company}</p>\n\
             <p>Current Price: ${price}</p>\n\
             <p>Volume: {volume}</p>\n\
             <h3>Matched Criteria:</h3>\n\
             <ul>{items}</ul>\n",
            symbol = escape_html(&stock.symbol),
            company = escape_html(&stock.company_name),
            price = stock.price,
            volume = format_thousands(stock.volume),
            items = criteria_items,
        ),
    }
}

/// Formats and logs an alert email; delivery happens outside this service.
pub fn send_stock_alert(user_email: &str, stock: &StockData, matched_criteria: &[String]) -> EmailContent {
    let content = generate_email_content(stock, matched_criteria);

    info!("📧 Email notification for {}", user_email);
    info!("   Subject: {}", content.subject);
    info!("   Criteria: {}", matched_criteria.join(", "));

    content
}

// ==============================================================================
// Pending Alert Processing
// ==============================================================================

pub fn group_alerts_by_user(alerts: &[PendingAlert]) -> BTreeMap<Uuid, Vec<&PendingAlert>> {
    alerts.iter().fold(BTreeMap::new(), |mut acc, alert| {
        acc.entry(alert.user_id).or_insert_with(Vec::new).push(alert);
        acc
    })
}

/// Sends one email per user, built from that user's first pending alert, and
/// reports every alert covered by it. Alerts on watchlists with email turned
/// off are skipped.
pub fn process_alerts(alerts: &[PendingAlert]) -> ProcessAlertsResponse {
    let (enabled, disabled): (Vec<PendingAlert>, Vec<PendingAlert>) =
        alerts.iter().cloned().partition(|a| a.email_notifications);

    let dispatched: Vec<NotificationDispatch> = group_alerts_by_user(&enabled)
        .into_iter()
        .filter_map(|(user_id, user_alerts)| {
            let first = user_alerts.first()?;
            let content = send_stock_alert(&first.user_email, &first.stock, &first.criteria_matched);
            Some(NotificationDispatch {
                user_id,
                email: first.user_email.clone(),
                content,
                alert_ids: user_alerts.iter().map(|a| a.id).collect(),
            })
        })
        .collect();

    info!(
        "Processed {} pending alerts: {} emails, {} skipped",
        alerts.len(),
        dispatched.len(),
        disabled.len()
    );

    ProcessAlertsResponse {
        dispatched,
        skipped_alert_ids: disabled.iter().map(|a| a.id).collect(),
    }
}

/// Readable reasons a verdict qualified; empty for disqualified verdicts.
pub fn criteria_from_verdict(verdict: &ScreeningVerdict) -> Vec<String> {
    let ScreeningVerdict::Qualified {
        base_formation,
        fundamentals,
        technical_signals,
        ..
    } = verdict
    else {
        return Vec::new();
    };

    let mut criteria = vec![format!(
        "Tight base: {:.2}% range over {} weeks",
        base_formation.price_range.tightness() * 100.0,
        base_formation.duration_weeks
    )];
    if base_formation.volume_profile.trend == VolumeTrend::Declining {
        criteria.push(format!(
            "Declining volume: {:.0}% vs. start of base",
            base_formation.volume_profile.change * 100.0
        ));
    }
    criteria.push("Cash exceeds market cap".to_string());
    criteria.push(format!("Current ratio {:.2}", fundamentals.current_ratio));
    criteria.push("Positive free cash flow".to_string());

    let signals = [
        (technical_signals.volume_contraction, "Volume contraction"),
        (technical_signals.price_consolidation, "Price consolidation"),
        (technical_signals.low_volatility, "Low volatility"),
        (technical_signals.retest_pattern, "Retest of base support"),
    ];
    criteria.extend(signals.iter().filter(|(on, _)| *on).map(|(_, label)| label.to_string()));

    criteria
}

fn format_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NotificationFrequency;
    use chrono::Utc;

    fn stock(symbol: &str) -> StockData {
        StockData {
            symbol: symbol.into(),
            company_name: "Apple Inc".into(),
            price: 150.0,
            volume: 1_000_000,
            market_cap: Some(2_000_000_000_000.0),
            pe_ratio: Some(25.0),
            eps: Some(6.0),
            sector: Some("Technology".into()),
            industry: Some("Consumer Electronics".into()),
            beta: Some(1.2),
            fifty_two_week_high: Some(155.0),
            fifty_two_week_low: Some(120.0),
            day_high: None,
            day_low: None,
            rsi14: Some(65.0),
        }
    }

    fn pending(user_id: Uuid, symbol: &str, email_notifications: bool) -> PendingAlert {
        PendingAlert {
            id: Uuid::new_v4(),
            watchlist_id: Uuid::new_v4(),
            user_id,
            user_email: "test@example.com".into(),
            email_notifications,
            notification_frequency: NotificationFrequency::Realtime,
            stock: stock(symbol),
            criteria_matched: vec!["price > 100".into()],
            triggered_at: Utc::now(),
        }
    }

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(1_000), "1,000");
        assert_eq!(format_thousands(1_234_567), "1,234,567");
    }

    #[test]
    fn test_generate_email_content() {
        let criteria = vec!["Price > $100".to_string(), "Volume > 1M".to_string()];
        let content = generate_email_content(&stock("AAPL"), &criteria);

        assert_eq!(content.subject, "Stock Alert: AAPL Matches Your Criteria");
        assert!(content.body.contains("<h2>Stock Alert for AAPL</h2>"));
        assert!(content.body.contains("Company: Apple Inc"));
        assert!(content.body.contains("Current Price: $150"));
        assert!(content.body.contains("Volume: 1,000,000"));
        assert!(content.body.contains("<li>Price &gt; $100</li><li>Volume &gt; 1M</li>"));
    }

    #[test]
    fn test_process_alerts_groups_by_user() {
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let alerts = vec![
            pending(alice, "AAPL", true),
            pending(bob, "MSFT", true),
            pending(alice, "NVDA", true),
            pending(bob, "TSLA", false),
        ];

        let grouped = group_alerts_by_user(&alerts);
        assert_eq!(grouped[&alice].len(), 2);
        assert_eq!(grouped[&bob].len(), 2);

        let response = process_alerts(&alerts);
        assert_eq!(response.dispatched.len(), 2);
        assert_eq!(response.skipped_alert_ids, vec![alerts[3].id]);

        let to_alice = response.dispatched.iter().find(|d| d.user_id == alice).unwrap();
        assert_eq!(to_alice.alert_ids, vec![alerts[0].id, alerts[2].id]);
        assert!(to_alice.content.subject.contains("AAPL"));
    }

    #[test]
    fn test_process_no_alerts() {
        let response = process_alerts(&[]);
        assert!(response.dispatched.is_empty());
        assert!(response.skipped_alert_ids.is_empty());
    }
}
