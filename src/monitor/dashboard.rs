//! Status dashboard API
//!
//! JSON endpoints over the trade log and alert history, served on a
//! configurable port.

use crate::notify::{AlertRecord, Notifier};
use crate::portfolio::{PortfolioStats, PortfolioTracker, TradeRecord};
use axum::{
    extract::{Query, State},
    response::Json,
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// State shared across dashboard handlers
#[derive(Clone)]
pub struct DashboardState {
    pub portfolio: Arc<PortfolioTracker>,
    pub notifier: Arc<Notifier>,
    pub started_at: DateTime<Utc>,
}

impl DashboardState {
    pub fn new(portfolio: Arc<PortfolioTracker>, notifier: Arc<Notifier>) -> Self {
        Self {
            portfolio,
            notifier,
            started_at: Utc::now(),
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    started_at: DateTime<Utc>,
    uptime_secs: i64,
}

#[derive(Debug, Deserialize)]
struct LimitQuery {
    limit: Option<usize>,
}

/// Build the dashboard router
pub fn create_router(state: DashboardState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/stats", get(stats))
        .route("/api/trades", get(trades))
        .route("/api/alerts", get(alerts))
        .with_state(state)
}

/// Bind and serve the dashboard until the process exits
pub async fn start_dashboard(state: DashboardState, port: u16) -> crate::error::Result<()> {
    let router = create_router(state);
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Dashboard listening on http://{}", addr);
    axum::serve(listener, router).await?;
    Ok(())
}

async fn health(State(state): State<DashboardState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        started_at: state.started_at,
        uptime_secs: (Utc::now() - state.started_at).num_seconds(),
    })
}

async fn stats(State(state): State<DashboardState>) -> Json<PortfolioStats> {
    Json(state.portfolio.statistics().await)
}

async fn trades(
    State(state): State<DashboardState>,
    Query(query): Query<LimitQuery>,
) -> Json<Vec<TradeRecord>> {
    Json(state.portfolio.recent(query.limit.unwrap_or(20)).await)
}

async fn alerts(
    State(state): State<DashboardState>,
    Query(query): Query<LimitQuery>,
) -> Json<Vec<AlertRecord>> {
    Json(state.notifier.history(query.limit.unwrap_or(50)))
}
