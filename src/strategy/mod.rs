//! Trading strategy implementation

pub mod kelly;

#[cfg(test)]
mod tests;

pub use kelly::{adjust_for_impact, kelly_fraction, optimal_bet, BetPlan, SizingParams};

use crate::config::StrategyConfig;
use crate::model::Prediction;
use crate::types::{BetOutcome, Market, Signal};
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Signal generator based on model predictions
pub struct SignalGenerator {
    config: StrategyConfig,
}

impl SignalGenerator {
    pub fn new(config: StrategyConfig) -> Self {
        Self { config }
    }

    /// Generate a trading signal from a market and a prediction.
    ///
    /// The edge and liquidity gates live inside the Kelly sizing; a market
    /// where no worthwhile stake fits produces no signal.
    pub fn generate(&self, market: &Market, prediction: &Prediction) -> Option<Signal> {
        if prediction.confidence < self.config.min_confidence {
            return None;
        }

        let params = self.sizing_params();
        let plan = kelly::optimal_bet(
            self.config.bankroll,
            prediction.probability,
            market.probability,
            market.total_liquidity,
            &params,
        )?;

        Some(Signal {
            market_id: market.id.clone(),
            question: market.question.clone(),
            outcome: plan.outcome,
            model_probability: prediction.probability,
            market_probability: market.probability,
            edge: prediction.probability - market.probability,
            confidence: prediction.confidence,
            stake: plan.amount,
            timestamp: Utc::now(),
        })
    }

    pub fn sizing_params(&self) -> SizingParams {
        SizingParams {
            kelly_fraction: self.config.kelly_fraction,
            min_edge: self.config.min_edge,
            min_bet: self.config.min_bet,
            max_bet: self.config.max_bet,
            impact_threshold: self.config.impact_threshold,
        }
    }
}

/// A detected mispricing between model and market
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mispricing {
    pub outcome: BetOutcome,
    pub edge: Decimal,
    pub confidence: Decimal,
    pub model_probability: Decimal,
    pub market_probability: Decimal,
    pub recommendation: String,
}

/// Detect whether the market is mispriced relative to a model estimate.
///
/// Confidence scales linearly with edge, saturating at a 30% edge.
pub fn detect_mispricing(
    model_probability: Decimal,
    market_probability: Decimal,
    min_confidence: Decimal,
    min_edge: Decimal,
) -> Option<Mispricing> {
    let edge = (model_probability - market_probability).abs();
    if edge < min_edge {
        return None;
    }

    let confidence = (edge / dec!(0.3)).min(Decimal::ONE);
    if confidence < min_confidence {
        return None;
    }

    let outcome = if model_probability > market_probability {
        BetOutcome::Yes
    } else {
        BetOutcome::No
    };

    Some(Mispricing {
        outcome,
        edge,
        confidence,
        model_probability,
        market_probability,
        recommendation: format!(
            "Bet {} - market mispriced by {:.1}%",
            outcome,
            edge * Decimal::ONE_HUNDRED
        ),
    })
}
