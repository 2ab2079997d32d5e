//! Probability models for market analysis
//!
//! Estimators of the "true" probability of a market's Yes outcome, to be
//! compared against the quoted price to find edge.

mod heuristics;
mod llm;
mod sentiment;
#[cfg(test)]
mod tests;

pub use heuristics::{BaseRateModel, ContrarianModel, MomentumModel};
pub use llm::{parse_probability, LlmModel, LlmProvider};
pub use sentiment::{parse_sentiment, Sentiment, SentimentAnalysis, SentimentModel};

use crate::error::Result;
use crate::types::Market;
use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;

/// Probability prediction result
#[derive(Debug, Clone)]
pub struct Prediction {
    /// Estimated probability of Yes (0-1)
    pub probability: Decimal,
    /// Confidence in the prediction (0-1)
    pub confidence: Decimal,
    /// Reasoning/explanation
    pub reasoning: String,
}

/// Trait for probability models
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProbabilityModel: Send + Sync {
    /// Predict the probability of the Yes outcome
    async fn predict(&self, market: &Market) -> Result<Prediction>;

    /// Model name for logging and weight calibration
    fn name(&self) -> &str;
}

/// One component's contribution to an ensemble estimate
#[derive(Debug, Clone)]
pub struct ComponentEstimate {
    pub model: String,
    pub probability: Decimal,
}

/// Combined estimate across all ensemble components
#[derive(Debug, Clone)]
pub struct EnsemblePrediction {
    pub probability: Decimal,
    pub confidence: Decimal,
    pub variance: Decimal,
    /// 1 - variance; higher means the components agree
    pub agreement: Decimal,
    pub components: Vec<ComponentEstimate>,
}

impl EnsemblePrediction {
    pub fn as_prediction(&self) -> Prediction {
        Prediction {
            probability: self.probability,
            confidence: self.confidence,
            reasoning: self
                .components
                .iter()
                .map(|c| format!("{}: {:.0}%", c.model, c.probability * Decimal::ONE_HUNDRED))
                .collect::<Vec<_>>()
                .join("; "),
        }
    }
}

/// Weighted ensemble of probability models.
///
/// Components that fail drop out and the remaining weights renormalize.
/// Ensemble confidence is driven by component disagreement:
/// `1 / (1 + 10 * variance)`.
pub struct EnsembleModel {
    models: Vec<(Box<dyn ProbabilityModel>, Decimal)>,
}

impl EnsembleModel {
    pub fn new() -> Self {
        Self { models: Vec::new() }
    }

    /// Default component set: the offline heuristics, with the LLM slot
    /// left for the caller to fill when a provider is configured.
    pub fn with_default_heuristics() -> Self {
        let mut ensemble = Self::new();
        ensemble.add_model(Box::new(BaseRateModel), dec!(0.2));
        ensemble.add_model(Box::new(MomentumModel), dec!(0.15));
        ensemble.add_model(Box::new(ContrarianModel), dec!(0.15));
        ensemble
    }

    pub fn add_model(&mut self, model: Box<dyn ProbabilityModel>, weight: Decimal) {
        self.models.push((model, weight));
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Full ensemble estimate with per-component breakdown
    pub async fn predict_detailed(&self, market: &Market) -> Result<EnsemblePrediction> {
        let mut components = Vec::new();
        let mut weighted_prob = Decimal::ZERO;
        let mut total_weight = Decimal::ZERO;

        for (model, weight) in &self.models {
            match model.predict(market).await {
                Ok(pred) => {
                    weighted_prob += pred.probability * weight;
                    total_weight += weight;
                    components.push(ComponentEstimate {
                        model: model.name().to_string(),
                        probability: pred.probability,
                    });
                }
                Err(e) => {
                    tracing::warn!("Model {} failed: {}", model.name(), e);
                }
            }
        }

        let probability = if total_weight > Decimal::ZERO {
            weighted_prob / total_weight
        } else {
            market.probability
        };

        let variance = component_variance(&components);
        let confidence = if components.is_empty() {
            Decimal::ZERO
        } else {
            Decimal::ONE / (Decimal::ONE + variance * dec!(10))
        };

        Ok(EnsemblePrediction {
            probability,
            confidence,
            variance,
            agreement: Decimal::ONE - variance,
            components,
        })
    }

    /// Reweight components proportionally to historical accuracy.
    /// Models without a score keep their current weight.
    pub fn calibrate_weights(&mut self, accuracy: &HashMap<String, Decimal>) {
        let total: Decimal = accuracy.values().copied().sum();
        if total <= Decimal::ZERO {
            return;
        }
        for (model, weight) in &mut self.models {
            if let Some(score) = accuracy.get(model.name()) {
                *weight = *score / total;
            }
        }
    }
}

impl Default for EnsembleModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProbabilityModel for EnsembleModel {
    async fn predict(&self, market: &Market) -> Result<Prediction> {
        Ok(self.predict_detailed(market).await?.as_prediction())
    }

    fn name(&self) -> &str {
        "ensemble"
    }
}

fn component_variance(components: &[ComponentEstimate]) -> Decimal {
    if components.len() < 2 {
        return Decimal::ZERO;
    }
    let n = Decimal::from(components.len());
    let mean: Decimal = components.iter().map(|c| c.probability).sum::<Decimal>() / n;
    components
        .iter()
        .map(|c| {
            let d = c.probability - mean;
            d * d
        })
        .sum::<Decimal>()
        / n
}

/// Per-model scoring of a prediction against the realized outcome
#[derive(Debug, Clone)]
pub struct ModelScore {
    pub model: String,
    pub error: Decimal,
    pub brier_score: Decimal,
    pub accuracy: Decimal,
}

/// Score each component against the actual outcome (1 for Yes, 0 for No)
pub fn evaluate_components(components: &[ComponentEstimate], outcome: Decimal) -> Vec<ModelScore> {
    components
        .iter()
        .map(|c| {
            let error = (c.probability - outcome).abs();
            ModelScore {
                model: c.model.clone(),
                error,
                brier_score: error * error,
                accuracy: Decimal::ONE - error,
            }
        })
        .collect()
}
