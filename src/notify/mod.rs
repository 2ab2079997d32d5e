//! Alert dispatch
//!
//! Fires webhook notifications for trading opportunities, arbitrage hits,
//! P&L milestones and portfolio warnings, and keeps a bounded in-memory
//! history of everything sent.

use crate::scanner::ArbitrageOpportunity;
use crate::types::Signal;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

const HISTORY_LIMIT: usize = 200;

/// Kind of alert being dispatched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    TradingOpportunity,
    ArbitrageOpportunity,
    PnlMilestone,
    PortfolioWarning,
}

impl AlertKind {
    fn as_str(&self) -> &'static str {
        match self {
            AlertKind::TradingOpportunity => "trading_opportunity",
            AlertKind::ArbitrageOpportunity => "arbitrage_opportunity",
            AlertKind::PnlMilestone => "pnl_milestone",
            AlertKind::PortfolioWarning => "portfolio_warning",
        }
    }
}

/// One dispatched alert
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRecord {
    pub timestamp: DateTime<Utc>,
    pub kind: AlertKind,
    pub message: String,
    pub data: serde_json::Value,
}

/// Webhook notifier. A notifier without a URL records history but sends
/// nothing, so callers never need to branch on configuration.
pub struct Notifier {
    http: Client,
    webhook_url: Option<String>,
    history: Mutex<Vec<AlertRecord>>,
}

impl Notifier {
    pub fn new(webhook_url: String) -> Self {
        Self {
            http: Client::new(),
            webhook_url: Some(webhook_url),
            history: Mutex::new(Vec::new()),
        }
    }

    pub fn disabled() -> Self {
        Self {
            http: Client::new(),
            webhook_url: None,
            history: Mutex::new(Vec::new()),
        }
    }

    /// Alert about a tradeable signal
    pub async fn trading_opportunity(&self, signal: &Signal) {
        let message = format!(
            "High-edge opportunity: {}",
            truncate(&signal.question, 100)
        );
        let data = json!({
            "market_id": signal.market_id,
            "question": signal.question,
            "outcome": signal.outcome,
            "model_probability": signal.model_probability,
            "market_probability": signal.market_probability,
            "edge": signal.edge,
            "recommended_stake": signal.stake,
        });
        self.dispatch(AlertKind::TradingOpportunity, message, data)
            .await;
    }

    /// Alert about an arbitrage opportunity
    pub async fn arbitrage_opportunity(&self, opportunity: &ArbitrageOpportunity) {
        let message = format!(
            "Arbitrage detected: {:.1}% potential profit",
            opportunity.potential_profit() * Decimal::ONE_HUNDRED
        );
        let data = serde_json::to_value(opportunity).unwrap_or_default();
        self.dispatch(AlertKind::ArbitrageOpportunity, message, data)
            .await;
    }

    /// Alert about a P&L milestone
    pub async fn pnl_milestone(&self, total_pnl: Decimal, roi: Decimal, milestone: &str) {
        let message = format!("P&L milestone: {}", milestone);
        let data = json!({
            "total_pnl": total_pnl,
            "roi": roi,
            "milestone": milestone,
        });
        self.dispatch(AlertKind::PnlMilestone, message, data).await;
    }

    /// Alert about a portfolio risk condition
    pub async fn portfolio_warning(&self, warning: &str, data: serde_json::Value) {
        let message = format!("Portfolio warning: {}", warning);
        self.dispatch(AlertKind::PortfolioWarning, message, data)
            .await;
    }

    /// Recent alerts, oldest first
    pub fn history(&self, limit: usize) -> Vec<AlertRecord> {
        let history = self.history.lock();
        let start = history.len().saturating_sub(limit);
        history[start..].to_vec()
    }

    pub fn clear_history(&self) {
        self.history.lock().clear();
    }

    async fn dispatch(&self, kind: AlertKind, message: String, data: serde_json::Value) {
        let record = AlertRecord {
            timestamp: Utc::now(),
            kind,
            message,
            data,
        };

        {
            let mut history = self.history.lock();
            if history.len() >= HISTORY_LIMIT {
                history.remove(0);
            }
            history.push(record.clone());
        }

        let Some(url) = &self.webhook_url else {
            debug!("No webhook configured, alert recorded only");
            return;
        };

        let payload = json!({
            "timestamp": record.timestamp,
            "alert_type": record.kind.as_str(),
            "message": record.message,
            "data": record.data,
        });

        match self.http.post(url).json(&payload).send().await {
            Ok(resp) if resp.status().is_success() => {
                debug!("Webhook alert sent: {}", record.kind.as_str());
            }
            Ok(resp) => {
                warn!("Webhook alert rejected: {}", resp.status());
            }
            Err(e) => {
                warn!("Webhook alert failed: {}", e);
            }
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn disabled_notifier_still_records_history() {
        let notifier = Notifier::disabled();
        notifier
            .pnl_milestone(dec!(150), dec!(15), "up 15%")
            .await;

        let history = notifier.history(10);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].kind, AlertKind::PnlMilestone);
    }

    #[tokio::test]
    async fn history_is_bounded() {
        let notifier = Notifier::disabled();
        for i in 0..(HISTORY_LIMIT + 10) {
            notifier
                .portfolio_warning(&format!("warning {}", i), serde_json::Value::Null)
                .await;
        }
        assert_eq!(notifier.history(usize::MAX).len(), HISTORY_LIMIT);
    }

    #[tokio::test]
    async fn history_limit_returns_most_recent() {
        let notifier = Notifier::disabled();
        for i in 0..5 {
            notifier
                .portfolio_warning(&format!("warning {}", i), serde_json::Value::Null)
                .await;
        }
        let recent = notifier.history(2);
        assert_eq!(recent.len(), 2);
        assert!(recent[1].message.contains("warning 4"));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 100), "short");
        assert_eq!(truncate("abcdef", 3), "abc...");
    }
}
