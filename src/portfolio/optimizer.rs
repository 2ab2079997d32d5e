//! Mean-variance position weighting across markets
//!
//! Statistical math runs in f64; money converts to Decimal only at the
//! boundary. Weights are found by projected gradient ascent on
//! `t * return - (1 - t) * variance` over the simplex.

use super::{TradeRecord, TradeStatus};
use crate::types::Market;
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Volatility floor used when a return series is flat or too short
const SIGMA_FLOOR: f64 = 0.1;

const MAX_ITERATIONS: usize = 1000;
const LEARNING_RATE: f64 = 0.05;
const TOLERANCE: f64 = 1e-9;

/// Pairwise correlations between markets, with the market ids that index it
#[derive(Debug, Clone)]
pub struct CorrelationMatrix {
    pub market_ids: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

/// Result of a weight optimization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizedWeights {
    pub weights: Vec<f64>,
    pub expected_return: f64,
    pub variance: f64,
    pub std_dev: f64,
    pub sharpe_ratio: f64,
}

/// Capital allocation suggestion for one market
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionSuggestion {
    pub market_id: String,
    pub market_question: String,
    pub weight: f64,
    pub suggested_size: Decimal,
    pub expected_return: f64,
}

/// A flagged pair of correlated markets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelatedPair {
    pub market_a: String,
    pub market_b: String,
    pub correlation: f64,
    pub positive: bool,
}

/// Portfolio optimizer over closed-trade return history
pub struct PortfolioOptimizer {
    risk_free_rate: f64,
}

impl PortfolioOptimizer {
    pub fn new(risk_free_rate: f64) -> Self {
        Self { risk_free_rate }
    }

    /// Pairwise Pearson correlation between per-market closed-trade ROI
    /// series. Markets need more than one closed trade to participate;
    /// fewer than two eligible markets means no matrix.
    pub fn correlation_matrix(&self, trades: &[TradeRecord]) -> Option<CorrelationMatrix> {
        let mut returns: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for trade in trades {
            if trade.status != TradeStatus::Closed || trade.amount <= Decimal::ZERO {
                continue;
            }
            let roi = (trade.pnl / trade.amount).to_f64().unwrap_or(0.0);
            returns.entry(trade.market_id.clone()).or_default().push(roi);
        }
        returns.retain(|_, series| series.len() > 1);

        if returns.len() < 2 {
            return None;
        }

        let market_ids: Vec<String> = returns.keys().cloned().collect();
        let series: Vec<&Vec<f64>> = returns.values().collect();
        let n = market_ids.len();

        let mut values = vec![vec![0.0; n]; n];
        for i in 0..n {
            for j in 0..n {
                values[i][j] = if i == j {
                    1.0
                } else {
                    pearson(series[i], series[j])
                };
            }
        }

        Some(CorrelationMatrix { market_ids, values })
    }

    /// Portfolio variance `w' Σ w` with Σ built from per-asset volatility
    /// (floored at 0.1) and the given correlation matrix.
    pub fn portfolio_variance(
        &self,
        weights: &[f64],
        returns: &[Vec<f64>],
        correlation: &[Vec<f64>],
    ) -> f64 {
        let n = weights.len();
        let std_devs: Vec<f64> = (0..n)
            .map(|i| {
                returns
                    .get(i)
                    .map(|series| std_dev(series))
                    .filter(|s| *s > 0.0)
                    .unwrap_or(SIGMA_FLOOR)
            })
            .collect();

        let mut variance = 0.0;
        for i in 0..n {
            for j in 0..n {
                variance += weights[i] * weights[j] * std_devs[i] * std_devs[j] * correlation[i][j];
            }
        }
        variance.max(0.0)
    }

    /// Optimize portfolio weights by projected gradient ascent on
    /// `t * return - (1 - t) * variance`, long-only, weights summing to 1.
    /// A degenerate result falls back to equal weights.
    pub fn optimize_weights(
        &self,
        expected_returns: &[f64],
        correlation: &[Vec<f64>],
        risk_tolerance: f64,
    ) -> OptimizedWeights {
        let n = expected_returns.len();
        if n == 0 {
            return OptimizedWeights {
                weights: Vec::new(),
                expected_return: 0.0,
                variance: 0.0,
                std_dev: 0.0,
                sharpe_ratio: 0.0,
            };
        }

        let equal = vec![1.0 / n as f64; n];
        let mut weights = equal.clone();
        let no_history: Vec<Vec<f64>> = Vec::new();

        let mut prev_objective = f64::NEG_INFINITY;
        for iter in 0..MAX_ITERATIONS {
            let ret: f64 = dot(&weights, expected_returns);
            let var = self.portfolio_variance(&weights, &no_history, correlation);
            let objective = risk_tolerance * ret - (1.0 - risk_tolerance) * var;

            if (objective - prev_objective).abs() < TOLERANCE {
                debug!("Weight optimization converged after {} iterations", iter);
                break;
            }
            prev_objective = objective;

            // d(variance)/dw_i = 2 * sigma_i * sum_j w_j sigma_j C_ij
            for i in 0..n {
                let mut var_grad = 0.0;
                for j in 0..n {
                    var_grad += weights[j] * SIGMA_FLOOR * correlation[i][j];
                }
                var_grad *= 2.0 * SIGMA_FLOOR;

                let grad =
                    risk_tolerance * expected_returns[i] - (1.0 - risk_tolerance) * var_grad;
                weights[i] = (weights[i] + LEARNING_RATE * grad).clamp(0.0, 1.0);
            }

            let total: f64 = weights.iter().sum();
            if total <= 0.0 || !total.is_finite() {
                weights = equal.clone();
                break;
            }
            for w in &mut weights {
                *w /= total;
            }
        }

        if weights.iter().any(|w| !w.is_finite()) {
            weights = equal;
        }

        let expected_return = dot(&weights, expected_returns);
        let variance = self.portfolio_variance(&weights, &no_history, correlation);
        let std_dev = variance.max(0.0).sqrt();
        let sharpe_ratio = if std_dev > 0.0 {
            (expected_return - self.risk_free_rate) / std_dev
        } else {
            0.0
        };

        OptimizedWeights {
            weights,
            expected_return,
            variance,
            std_dev,
            sharpe_ratio,
        }
    }

    /// Suggest position sizes for a set of market opportunities, using a
    /// mildly-positive correlation prior between them.
    pub fn suggest_position_sizes(
        &self,
        markets: &[Market],
        total_capital: Decimal,
        expected_returns: &[f64],
    ) -> Vec<PositionSuggestion> {
        if markets.is_empty() || markets.len() != expected_returns.len() {
            return Vec::new();
        }

        let n = markets.len();
        let mut correlation = vec![vec![0.1; n]; n];
        for (i, row) in correlation.iter_mut().enumerate() {
            row[i] = 1.0;
        }

        let result = self.optimize_weights(expected_returns, &correlation, 0.6);

        markets
            .iter()
            .zip(result.weights.iter())
            .zip(expected_returns.iter())
            .map(|((market, &weight), &expected_return)| PositionSuggestion {
                market_id: market.id.clone(),
                market_question: market.question.clone(),
                weight: round4(weight),
                suggested_size: (total_capital
                    * Decimal::from_f64(weight).unwrap_or(Decimal::ZERO))
                .round_dp(2),
                expected_return,
            })
            .collect()
    }

    /// 1 minus the average off-diagonal correlation, clamped to [0, 1].
    /// A single-asset portfolio scores 0.
    pub fn diversification_ratio(&self, correlation: &CorrelationMatrix) -> f64 {
        let n = correlation.values.len();
        if n <= 1 {
            return 0.0;
        }
        let total: f64 = correlation.values.iter().flatten().sum();
        let avg_off_diag = (total - n as f64) / (n * (n - 1)) as f64;
        (1.0 - avg_off_diag).clamp(0.0, 1.0)
    }

    /// Market pairs whose correlation magnitude clears the threshold,
    /// strongest first.
    pub fn correlated_pairs(
        &self,
        correlation: &CorrelationMatrix,
        threshold: f64,
    ) -> Vec<CorrelatedPair> {
        let n = correlation.market_ids.len();
        let mut pairs = Vec::new();

        for i in 0..n {
            for j in (i + 1)..n {
                let c = correlation.values[i][j];
                if c.abs() >= threshold {
                    pairs.push(CorrelatedPair {
                        market_a: correlation.market_ids[i].clone(),
                        market_b: correlation.market_ids[j].clone(),
                        correlation: round3(c),
                        positive: c > 0.0,
                    });
                }
            }
        }

        pairs.sort_by(|a, b| {
            b.correlation
                .abs()
                .partial_cmp(&a.correlation.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        pairs
    }
}

impl Default for PortfolioOptimizer {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// Pearson correlation over the common prefix of two series
fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n < 2 {
        return 0.0;
    }
    let a = &a[..n];
    let b = &b[..n];

    let mean_a = a.iter().sum::<f64>() / n as f64;
    let mean_b = b.iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for k in 0..n {
        let da = a[k] - mean_a;
        let db = b[k] - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }

    if var_a <= 0.0 || var_b <= 0.0 {
        return 0.0;
    }
    cov / (var_a.sqrt() * var_b.sqrt())
}

fn std_dev(series: &[f64]) -> f64 {
    if series.len() < 2 {
        return 0.0;
    }
    let n = series.len() as f64;
    let mean = series.iter().sum::<f64>() / n;
    (series.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n).sqrt()
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

fn round4(x: f64) -> f64 {
    (x * 10000.0).round() / 10000.0
}
