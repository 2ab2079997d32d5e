//! Backtesting over resolved markets
//!
//! Replays a probability model against historical markets with Kelly
//! sizing and capital compounding, then reduces the simulated trades to
//! performance metrics.

use crate::model::ProbabilityModel;
use crate::strategy::kelly::{optimal_bet, SizingParams};
use crate::types::{BetOutcome, Market};
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One simulated trade against a resolved market
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatedTrade {
    pub market_id: String,
    pub question: String,
    pub outcome: BetOutcome,
    pub amount: Decimal,
    pub model_probability: Decimal,
    pub market_probability: Decimal,
    pub edge: Decimal,
    pub resolution: String,
    pub pnl: Decimal,
    /// Percent return on the stake
    pub roi: Decimal,
}

/// Aggregate backtest performance
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BacktestMetrics {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    /// Percent of trades won
    pub win_rate: Decimal,
    pub total_pnl: Decimal,
    pub avg_pnl: Decimal,
    /// Largest peak-to-trough drop of the cumulative P&L curve
    pub max_drawdown: Decimal,
    /// Annualized Sharpe ratio of per-trade returns
    pub sharpe_ratio: Decimal,
    /// Percent return on initial capital
    pub roi: Decimal,
    pub final_capital: Decimal,
}

/// A named parameter set for strategy comparison
#[derive(Debug, Clone)]
pub struct StrategyVariant {
    pub name: String,
    pub kelly_fraction: Decimal,
    pub min_edge: Decimal,
}

/// Backtest engine
pub struct Backtester {
    initial_capital: Decimal,
    results: Vec<SimulatedTrade>,
}

impl Backtester {
    pub fn new(initial_capital: Decimal) -> Self {
        Self {
            initial_capital,
            results: Vec::new(),
        }
    }

    pub fn results(&self) -> &[SimulatedTrade] {
        &self.results
    }

    /// Simulate a single Kelly-sized trade against a resolved market.
    ///
    /// Only Yes/No resolutions settle a binary position at 0 or 1;
    /// MKT and CANCEL resolutions are skipped.
    pub fn simulate_trade(
        &self,
        market: &Market,
        model_probability: Decimal,
        bankroll: Decimal,
        params: &SizingParams,
    ) -> Option<SimulatedTrade> {
        let resolution = market.resolution.as_deref()?;
        if resolution != "YES" && resolution != "NO" {
            return None;
        }

        let market_prob = market.probability;
        let plan = optimal_bet(
            bankroll,
            model_probability,
            market_prob,
            market.total_liquidity,
            params,
        )?;

        let won = resolution == plan.outcome.as_str();
        let pnl = if won {
            let payout = match plan.outcome {
                BetOutcome::Yes => plan.amount / market_prob,
                BetOutcome::No => plan.amount / (Decimal::ONE - market_prob),
            };
            payout - plan.amount
        } else {
            -plan.amount
        };

        Some(SimulatedTrade {
            market_id: market.id.clone(),
            question: market.question.clone(),
            outcome: plan.outcome,
            amount: plan.amount,
            model_probability,
            market_probability: market_prob,
            edge: plan.edge,
            resolution: resolution.to_string(),
            pnl: pnl.round_dp(2),
            roi: if plan.amount > Decimal::ZERO {
                (pnl / plan.amount * Decimal::ONE_HUNDRED).round_dp(2)
            } else {
                Decimal::ZERO
            },
        })
    }

    /// Replay a model over historical markets with compounding capital.
    /// Per-trade min/max bets scale to 1% / 10% of current capital; a
    /// blown-up account stops the run.
    pub async fn run(
        &mut self,
        markets: &[Market],
        model: &dyn ProbabilityModel,
        kelly_fraction: Decimal,
        min_edge: Decimal,
    ) -> BacktestMetrics {
        self.results.clear();
        let mut capital = self.initial_capital;

        for market in markets {
            if !market.is_resolved {
                continue;
            }

            let prediction = match model.predict(market).await {
                Ok(p) => p,
                Err(e) => {
                    debug!("Model failed on {}: {}", market.id, e);
                    continue;
                }
            };

            let params = SizingParams {
                kelly_fraction,
                min_edge,
                min_bet: capital * dec!(0.01),
                max_bet: capital * dec!(0.1),
                impact_threshold: dec!(0.1),
            };

            if let Some(trade) =
                self.simulate_trade(market, prediction.probability, capital, &params)
            {
                capital += trade.pnl;
                self.results.push(trade);

                if capital <= Decimal::ZERO {
                    debug!("Capital exhausted, stopping backtest");
                    break;
                }
            }
        }

        self.metrics()
    }

    /// Reduce the recorded trades to performance metrics
    pub fn metrics(&self) -> BacktestMetrics {
        if self.results.is_empty() {
            return BacktestMetrics {
                final_capital: self.initial_capital,
                ..Default::default()
            };
        }

        let total_trades = self.results.len();
        let winning_trades = self.results.iter().filter(|t| t.pnl > Decimal::ZERO).count();
        let losing_trades = self.results.iter().filter(|t| t.pnl < Decimal::ZERO).count();
        let win_rate =
            Decimal::from(winning_trades) / Decimal::from(total_trades) * Decimal::ONE_HUNDRED;

        let total_pnl: Decimal = self.results.iter().map(|t| t.pnl).sum();
        let avg_pnl = total_pnl / Decimal::from(total_trades);

        // Peak-to-trough on the cumulative P&L curve
        let mut cumulative = Decimal::ZERO;
        let mut peak = Decimal::ZERO;
        let mut max_drawdown = Decimal::ZERO;
        for trade in &self.results {
            cumulative += trade.pnl;
            peak = peak.max(cumulative);
            max_drawdown = max_drawdown.max(peak - cumulative);
        }

        let sharpe_ratio = self.sharpe_ratio();

        let final_capital = self.initial_capital + total_pnl;
        let roi = total_pnl / self.initial_capital * Decimal::ONE_HUNDRED;

        BacktestMetrics {
            total_trades,
            winning_trades,
            losing_trades,
            win_rate: win_rate.round_dp(2),
            total_pnl: total_pnl.round_dp(2),
            avg_pnl: avg_pnl.round_dp(2),
            max_drawdown: max_drawdown.round_dp(2),
            sharpe_ratio,
            roi: roi.round_dp(2),
            final_capital: final_capital.round_dp(2),
        }
    }

    /// Annualized Sharpe of per-trade returns on initial capital
    fn sharpe_ratio(&self) -> Decimal {
        if self.results.len() < 2 {
            return Decimal::ZERO;
        }
        let initial = self.initial_capital.to_f64().unwrap_or(1.0);
        let returns: Vec<f64> = self
            .results
            .iter()
            .map(|t| t.pnl.to_f64().unwrap_or(0.0) / initial)
            .collect();

        let n = returns.len() as f64;
        let mean = returns.iter().sum::<f64>() / n;
        let var = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
        let std = var.sqrt();
        if std <= 0.0 {
            return Decimal::ZERO;
        }

        let sharpe = mean / std * 252f64.sqrt();
        Decimal::from_f64(sharpe)
            .map(|d| d.round_dp(2))
            .unwrap_or(Decimal::ZERO)
    }

    /// Run the same markets through several parameter sets
    pub async fn compare(
        &mut self,
        markets: &[Market],
        model: &dyn ProbabilityModel,
        variants: &[StrategyVariant],
    ) -> Vec<(String, BacktestMetrics)> {
        let mut comparison = Vec::with_capacity(variants.len());
        for variant in variants {
            let metrics = self
                .run(markets, model, variant.kelly_fraction, variant.min_edge)
                .await;
            comparison.push((variant.name.clone(), metrics));
        }
        comparison
    }
}
