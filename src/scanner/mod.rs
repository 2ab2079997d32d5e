//! Arbitrage scanner
//!
//! Looks for price inconsistencies: a market whose quoted probability
//! drifts from its pool-implied price, and pairs of related markets where
//! one is the negation of the other but the prices disagree.

use crate::types::{BetOutcome, Market};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

const STOP_WORDS: &[&str] = &[
    "will", "be", "the", "a", "an", "in", "on", "at", "by", "for", "to", "of", "is", "are",
];

/// Quoted probability must deviate from the pool price by more than this
/// before the gap is worth anything.
const MIN_PRICE_GAP: Decimal = dec!(0.01);

/// A detected arbitrage opportunity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ArbitrageOpportunity {
    /// Quoted probability and pool-implied price disagree within one market
    PriceGap {
        market_id: String,
        question: String,
        quoted: Decimal,
        pool_implied: Decimal,
        /// Side that is cheap at the quoted price
        cheap_side: BetOutcome,
        potential_profit: Decimal,
    },
    /// Two inversely-phrased markets whose prices do not sum to one
    InverseMarkets {
        market_a_id: String,
        market_a_question: String,
        market_a_probability: Decimal,
        market_b_id: String,
        market_b_question: String,
        market_b_probability: Decimal,
        discrepancy: Decimal,
        potential_profit: Decimal,
    },
}

impl ArbitrageOpportunity {
    pub fn potential_profit(&self) -> Decimal {
        match self {
            ArbitrageOpportunity::PriceGap {
                potential_profit, ..
            }
            | ArbitrageOpportunity::InverseMarkets {
                potential_profit, ..
            } => *potential_profit,
        }
    }
}

/// Capital split for taking an opportunity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Allocation {
    pub bet_yes: Option<Decimal>,
    pub bet_no: Option<Decimal>,
    pub total_invested: Decimal,
    pub expected_profit: Decimal,
    /// Percent return on invested capital
    pub roi: Decimal,
}

/// Scanner over a snapshot of markets
pub struct ArbitrageScanner {
    min_profit_threshold: Decimal,
}

impl ArbitrageScanner {
    pub fn new(min_profit_threshold: Decimal) -> Self {
        Self {
            min_profit_threshold,
        }
    }

    /// Group markets whose questions share at least three significant
    /// keywords. Groups merge transitively.
    pub fn find_related_markets<'a>(&self, markets: &'a [Market]) -> Vec<Vec<&'a Market>> {
        let keywords: Vec<HashSet<String>> = markets
            .iter()
            .map(|m| significant_keywords(&m.question))
            .collect();

        let mut groups: Vec<Vec<usize>> = Vec::new();

        for i in 0..markets.len() {
            for j in (i + 1)..markets.len() {
                if keywords[i].intersection(&keywords[j]).count() < 3 {
                    continue;
                }
                match groups.iter_mut().find(|g| g.contains(&i) || g.contains(&j)) {
                    Some(group) => {
                        if !group.contains(&i) {
                            group.push(i);
                        }
                        if !group.contains(&j) {
                            group.push(j);
                        }
                    }
                    None => groups.push(vec![i, j]),
                }
            }
        }

        groups
            .into_iter()
            .map(|g| g.into_iter().map(|i| &markets[i]).collect())
            .collect()
    }

    /// Quoted-vs-pool price gap inside a single market. Buying the cheap
    /// side of the quote and the cheap side of the pool covers both
    /// outcomes for less than the guaranteed payout.
    pub fn detect_price_gap(&self, market: &Market) -> Option<ArbitrageOpportunity> {
        let pool_implied = market.pool_probability()?;
        let gap = (market.probability - pool_implied).abs();
        if gap <= MIN_PRICE_GAP {
            return None;
        }

        let cheap_side = if market.probability < pool_implied {
            BetOutcome::Yes
        } else {
            BetOutcome::No
        };

        Some(ArbitrageOpportunity::PriceGap {
            market_id: market.id.clone(),
            question: market.question.clone(),
            quoted: market.probability,
            pool_implied,
            cheap_side,
            potential_profit: gap,
        })
    }

    /// Cross-market check for a pair phrased as negations of each other.
    /// If exactly one question is negated, their Yes prices should sum to
    /// one; a discrepancy beyond the threshold is an opportunity.
    pub fn detect_inverse_markets(&self, a: &Market, b: &Market) -> Option<ArbitrageOpportunity> {
        let a_negated = is_negated(&a.question);
        let b_negated = is_negated(&b.question);
        if a_negated == b_negated {
            return None;
        }

        let expected_b = Decimal::ONE - a.probability;
        let discrepancy = (b.probability - expected_b).abs();
        if discrepancy <= self.min_profit_threshold {
            return None;
        }

        Some(ArbitrageOpportunity::InverseMarkets {
            market_a_id: a.id.clone(),
            market_a_question: a.question.clone(),
            market_a_probability: a.probability,
            market_b_id: b.id.clone(),
            market_b_question: b.question.clone(),
            market_b_probability: b.probability,
            discrepancy,
            potential_profit: discrepancy,
        })
    }

    /// Run every detector over a market snapshot, best opportunity first
    pub fn scan(&self, markets: &[Market]) -> Vec<ArbitrageOpportunity> {
        let mut opportunities: Vec<ArbitrageOpportunity> = markets
            .iter()
            .filter_map(|m| self.detect_price_gap(m))
            .collect();

        for group in self.find_related_markets(markets) {
            for i in 0..group.len() {
                for j in (i + 1)..group.len() {
                    if let Some(opp) = self.detect_inverse_markets(group[i], group[j]) {
                        opportunities.push(opp);
                    }
                }
            }
        }

        opportunities.sort_by(|a, b| b.potential_profit().cmp(&a.potential_profit()));
        opportunities
    }

    /// Capital allocation for an opportunity.
    ///
    /// For a price gap the capital buys both sides, split in proportion to
    /// the opposite side's price so both legs pay out the same. For an
    /// inverse pair half the capital goes in and the discrepancy is the
    /// expected return on it.
    pub fn allocation(&self, opportunity: &ArbitrageOpportunity, capital: Decimal) -> Allocation {
        match opportunity {
            ArbitrageOpportunity::PriceGap {
                quoted,
                pool_implied,
                potential_profit,
                ..
            } => {
                let yes_price = quoted.min(pool_implied);
                let no_price = Decimal::ONE - quoted.max(pool_implied);
                let total = yes_price + no_price;

                let bet_yes = capital * (no_price / total);
                let bet_no = capital * (yes_price / total);
                let expected_profit = capital * *potential_profit;

                Allocation {
                    bet_yes: Some(bet_yes.round_dp(2)),
                    bet_no: Some(bet_no.round_dp(2)),
                    total_invested: (bet_yes + bet_no).round_dp(2),
                    expected_profit: expected_profit.round_dp(2),
                    roi: (expected_profit / capital * Decimal::ONE_HUNDRED).round_dp(2),
                }
            }
            ArbitrageOpportunity::InverseMarkets {
                potential_profit, ..
            } => {
                let invested = capital * dec!(0.5);
                let expected_profit = capital * *potential_profit;
                Allocation {
                    bet_yes: None,
                    bet_no: None,
                    total_invested: invested.round_dp(2),
                    expected_profit: expected_profit.round_dp(2),
                    roi: (expected_profit / invested * Decimal::ONE_HUNDRED).round_dp(2),
                }
            }
        }
    }
}

impl Default for ArbitrageScanner {
    fn default() -> Self {
        Self::new(dec!(0.02))
    }
}

fn significant_keywords(question: &str) -> HashSet<String> {
    question
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty() && !STOP_WORDS.contains(w))
        .map(|w| w.to_string())
        .collect()
}

fn is_negated(question: &str) -> bool {
    question
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .any(|w| w == "not")
}
