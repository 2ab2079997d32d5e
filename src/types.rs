//! Core domain types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Side of a binary market bet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BetOutcome {
    #[serde(rename = "YES")]
    Yes,
    #[serde(rename = "NO")]
    No,
}

impl BetOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            BetOutcome::Yes => "YES",
            BetOutcome::No => "NO",
        }
    }
}

impl std::fmt::Display for BetOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// CPMM pool shares for a binary market
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pool {
    pub yes: Decimal,
    pub no: Decimal,
}

/// A binary Manifold market
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    pub id: String,
    pub question: String,
    pub description: Option<String>,
    pub creator_username: String,
    /// Quoted probability of the Yes outcome (0-1)
    pub probability: Decimal,
    pub volume: Decimal,
    pub total_liquidity: Decimal,
    pub close_time: Option<DateTime<Utc>>,
    pub is_resolved: bool,
    /// Resolution outcome once resolved ("YES", "NO", "MKT", "CANCEL")
    pub resolution: Option<String>,
    pub pool: Option<Pool>,
}

impl Market {
    /// Implied probability of the No outcome
    pub fn no_probability(&self) -> Decimal {
        Decimal::ONE - self.probability
    }

    /// Whether the market is still accepting bets
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        !self.is_resolved && self.close_time.map(|t| t > now).unwrap_or(false)
    }

    /// Probability implied by the CPMM pool ratio, if pool data is present.
    ///
    /// For a constant-product pool the Yes price is no_shares / (yes + no).
    pub fn pool_probability(&self) -> Option<Decimal> {
        let pool = self.pool.as_ref()?;
        let total = pool.yes + pool.no;
        if total <= Decimal::ZERO {
            return None;
        }
        Some(pool.no / total)
    }

    /// Gap between the quoted probability and the pool-implied one.
    /// Positive when the quote is above the pool price.
    pub fn price_gap(&self) -> Option<Decimal> {
        Some(self.probability - self.pool_probability()?)
    }
}

/// A generated trading signal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub market_id: String,
    pub question: String,
    pub outcome: BetOutcome,
    pub model_probability: Decimal,
    pub market_probability: Decimal,
    /// Signed Yes-relative edge (model - market)
    pub edge: Decimal,
    pub confidence: Decimal,
    /// Suggested stake in M$
    pub stake: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl Signal {
    /// Whether the signal clears the configured thresholds
    pub fn is_tradeable(&self, min_edge: Decimal, min_confidence: Decimal) -> bool {
        self.edge.abs() >= min_edge && self.confidence >= min_confidence
    }
}

/// A bet accepted by the exchange
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacedBet {
    pub bet_id: String,
    pub market_id: String,
    pub outcome: BetOutcome,
    pub amount: Decimal,
    /// Probability the market showed when the bet filled
    pub prob_after: Decimal,
    pub timestamp: DateTime<Utc>,
}
