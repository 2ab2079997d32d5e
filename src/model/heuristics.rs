//! Heuristic probability models used as ensemble components
//!
//! Cheap, offline estimators. None of these are good on their own; they
//! exist to pull the ensemble toward base rates and away from herding.

use super::{Prediction, ProbabilityModel};
use crate::error::Result;
use crate::types::Market;
use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const OPTIMISTIC_KEYWORDS: &[&str] = &["will", "success", "achieve", "reach", "exceed", "grow"];
const PESSIMISTIC_KEYWORDS: &[&str] = &["fail", "decline", "decrease", "not", "won't", "unable"];

/// Base-rate estimate from question phrasing and deadline year
pub struct BaseRateModel;

impl BaseRateModel {
    pub fn estimate(question: &str) -> Decimal {
        let q = question.to_lowercase();

        // Deadline-year questions get a horizon-based base rate
        if q.contains("by 20") || q.contains("in 20") {
            if let Some(year) = extract_year(&q) {
                return if year <= 2026 {
                    dec!(0.6)
                } else if year <= 2030 {
                    dec!(0.4)
                } else {
                    dec!(0.25)
                };
            }
        }

        let optimistic = OPTIMISTIC_KEYWORDS.iter().filter(|k| q.contains(*k)).count();
        let pessimistic = PESSIMISTIC_KEYWORDS.iter().filter(|k| q.contains(*k)).count();

        if pessimistic > optimistic {
            dec!(0.35)
        } else if optimistic > pessimistic {
            dec!(0.65)
        } else {
            dec!(0.5)
        }
    }
}

fn extract_year(question: &str) -> Option<i32> {
    question
        .split(|c: char| !c.is_ascii_digit())
        .filter(|w| w.len() == 4 && w.starts_with("20"))
        .find_map(|w| w.parse().ok())
}

#[async_trait]
impl ProbabilityModel for BaseRateModel {
    async fn predict(&self, market: &Market) -> Result<Prediction> {
        Ok(Prediction {
            probability: Self::estimate(&market.question),
            confidence: dec!(0.4),
            reasoning: "keyword and deadline base rate".to_string(),
        })
    }

    fn name(&self) -> &str {
        "base_rate"
    }
}

/// Momentum estimate: volume-weighted reinforcement of strong prices
pub struct MomentumModel;

impl MomentumModel {
    pub fn estimate(market: &Market) -> Decimal {
        let prob = market.probability;
        let momentum = Self::momentum_factor(market.volume);

        let adjusted = if prob > dec!(0.7) {
            prob + (Decimal::ONE - prob) * momentum * dec!(0.1)
        } else if prob < dec!(0.3) {
            prob - prob * momentum * dec!(0.1)
        } else {
            prob
        };

        adjusted.clamp(dec!(0.01), dec!(0.99))
    }

    fn momentum_factor(volume: Decimal) -> Decimal {
        if volume > dec!(1000) {
            dec!(1.0)
        } else if volume > dec!(500) {
            dec!(0.8)
        } else if volume > dec!(100) {
            dec!(0.6)
        } else {
            dec!(0.4)
        }
    }
}

#[async_trait]
impl ProbabilityModel for MomentumModel {
    async fn predict(&self, market: &Market) -> Result<Prediction> {
        Ok(Prediction {
            probability: Self::estimate(market),
            confidence: Self::momentum_factor(market.volume) * dec!(0.5),
            reasoning: "volume momentum".to_string(),
        })
    }

    fn name(&self) -> &str {
        "market_momentum"
    }
}

/// Contrarian estimate: fades extreme prices by half the overshoot
pub struct ContrarianModel;

impl ContrarianModel {
    pub fn estimate(market: &Market) -> Decimal {
        let prob = market.probability;
        if prob > dec!(0.8) {
            dec!(0.8) - (prob - dec!(0.8)) * dec!(0.5)
        } else if prob < dec!(0.2) {
            dec!(0.2) + (dec!(0.2) - prob) * dec!(0.5)
        } else {
            prob
        }
    }
}

#[async_trait]
impl ProbabilityModel for ContrarianModel {
    async fn predict(&self, market: &Market) -> Result<Prediction> {
        Ok(Prediction {
            probability: Self::estimate(market),
            confidence: dec!(0.4),
            reasoning: "extreme-price fade".to_string(),
        })
    }

    fn name(&self) -> &str {
        "contrarian"
    }
}
