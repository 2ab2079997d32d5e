//! Portfolio tracking
//!
//! Trade records live in a flat JSON file. Every mutation persists the
//! whole log; statistics are a reduction over the in-memory copy.

pub mod optimizer;


pub use optimizer::{
    CorrelatedPair, CorrelationMatrix, OptimizedWeights, PortfolioOptimizer, PositionSuggestion,
};

use crate::error::Result;
use crate::types::{BetOutcome, Signal};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Lifecycle of a recorded trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    Open,
    Closed,
}

/// One persisted trade
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub market_id: String,
    pub market_question: String,
    pub outcome: BetOutcome,
    pub amount: Decimal,
    pub market_probability: Decimal,
    pub model_probability: Decimal,
    pub edge: Decimal,
    pub status: TradeStatus,
    /// Market resolution once the trade is closed
    pub resolution: Option<String>,
    pub pnl: Decimal,
}

impl TradeRecord {
    /// Build an open trade record from an executed signal
    pub fn from_signal(signal: &Signal) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: signal.timestamp,
            market_id: signal.market_id.clone(),
            market_question: signal.question.clone(),
            outcome: signal.outcome,
            amount: signal.stake,
            market_probability: signal.market_probability,
            model_probability: signal.model_probability,
            edge: signal.edge.abs(),
            status: TradeStatus::Open,
            resolution: None,
            pnl: Decimal::ZERO,
        }
    }
}

/// Aggregate performance over the trade log
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortfolioStats {
    pub total_trades: usize,
    pub open_trades: usize,
    pub closed_trades: usize,
    pub total_pnl: Decimal,
    /// Win rate over closed trades, percent
    pub win_rate: Decimal,
    /// Average edge at entry, percent
    pub avg_edge: Decimal,
    pub total_invested: Decimal,
    /// Return on total invested, percent
    pub roi: Decimal,
}

/// Trade log with flat-file persistence
pub struct PortfolioTracker {
    path: PathBuf,
    trades: RwLock<Vec<TradeRecord>>,
}

impl PortfolioTracker {
    /// Load the trade log. A missing file is an empty log; a corrupt file
    /// is replaced on the next save and logged, not fatal.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let trades = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<Vec<TradeRecord>>(&bytes) {
                Ok(trades) => trades,
                Err(e) => {
                    warn!("Corrupt trade log at {}: {}", path.display(), e);
                    Vec::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if let Some(parent) = path.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };

        debug!("Loaded {} trades from {}", trades.len(), path.display());
        Ok(Self {
            path,
            trades: RwLock::new(trades),
        })
    }

    /// Append a trade and persist. Re-recording an id that already exists
    /// is a no-op, so replaying a run cannot duplicate entries. Returns
    /// whether the trade was actually appended.
    pub async fn record(&self, trade: TradeRecord) -> Result<bool> {
        let mut trades = self.trades.write().await;
        if trades.iter().any(|t| t.id == trade.id) {
            return Ok(false);
        }
        trades.push(trade);
        self.save(&trades).await?;
        Ok(true)
    }

    /// Close every open trade on a market with its resolution and P&L.
    /// Returns the number of trades closed.
    pub async fn resolve(&self, market_id: &str, resolution: &str, pnl: Decimal) -> Result<usize> {
        let mut trades = self.trades.write().await;
        let mut closed = 0;
        for trade in trades.iter_mut() {
            if trade.market_id == market_id && trade.status == TradeStatus::Open {
                trade.status = TradeStatus::Closed;
                trade.resolution = Some(resolution.to_string());
                trade.pnl = pnl;
                closed += 1;
            }
        }
        if closed > 0 {
            self.save(&trades).await?;
        }
        Ok(closed)
    }

    pub async fn statistics(&self) -> PortfolioStats {
        let trades = self.trades.read().await;
        if trades.is_empty() {
            return PortfolioStats::default();
        }

        let closed: Vec<&TradeRecord> = trades
            .iter()
            .filter(|t| t.status == TradeStatus::Closed)
            .collect();
        let open_trades = trades.len() - closed.len();

        let total_pnl: Decimal = trades.iter().map(|t| t.pnl).sum();
        let total_invested: Decimal = trades.iter().map(|t| t.amount).sum();

        let wins = closed.iter().filter(|t| t.pnl > Decimal::ZERO).count();
        let win_rate = if closed.is_empty() {
            Decimal::ZERO
        } else {
            Decimal::from(wins) / Decimal::from(closed.len()) * Decimal::ONE_HUNDRED
        };

        let avg_edge = trades.iter().map(|t| t.edge).sum::<Decimal>()
            / Decimal::from(trades.len())
            * Decimal::ONE_HUNDRED;

        let roi = if total_invested > Decimal::ZERO {
            total_pnl / total_invested * Decimal::ONE_HUNDRED
        } else {
            Decimal::ZERO
        };

        PortfolioStats {
            total_trades: trades.len(),
            open_trades,
            closed_trades: closed.len(),
            total_pnl: total_pnl.round_dp(2),
            win_rate: win_rate.round_dp(2),
            avg_edge: avg_edge.round_dp(2),
            total_invested: total_invested.round_dp(2),
            roi: roi.round_dp(2),
        }
    }

    /// Most recent trades, newest first
    pub async fn recent(&self, limit: usize) -> Vec<TradeRecord> {
        let trades = self.trades.read().await;
        let mut sorted: Vec<TradeRecord> = trades.clone();
        sorted.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        sorted.truncate(limit);
        sorted
    }

    pub async fn all(&self) -> Vec<TradeRecord> {
        self.trades.read().await.clone()
    }

    async fn save(&self, trades: &[TradeRecord]) -> Result<()> {
        let json = serde_json::to_string_pretty(trades)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}
