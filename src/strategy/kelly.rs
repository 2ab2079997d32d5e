//! Kelly criterion bet sizing
//!
//! Pure functions; all probabilities and amounts are Decimal.

use crate::types::BetOutcome;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Sizing parameters, normally taken from `StrategyConfig`
#[derive(Debug, Clone)]
pub struct SizingParams {
    /// Fraction of full Kelly to use (quarter-Kelly by default)
    pub kelly_fraction: Decimal,
    /// Minimum edge required to bet at all
    pub min_edge: Decimal,
    pub min_bet: Decimal,
    pub max_bet: Decimal,
    /// Max fraction of market liquidity a bet may consume
    pub impact_threshold: Decimal,
}

impl Default for SizingParams {
    fn default() -> Self {
        Self {
            kelly_fraction: dec!(0.25),
            min_edge: dec!(0.05),
            min_bet: dec!(10),
            max_bet: dec!(100),
            impact_threshold: dec!(0.1),
        }
    }
}

/// A fully sized bet recommendation
#[derive(Debug, Clone, PartialEq)]
pub struct BetPlan {
    pub outcome: BetOutcome,
    /// Stake in currency units
    pub amount: Decimal,
    /// Fraction of bankroll the Kelly formula selected
    pub bankroll_fraction: Decimal,
    /// Absolute edge over the market price
    pub edge: Decimal,
}

/// Fractional Kelly bankroll fraction for a binary market.
///
/// Picks the side whose edge clears `min_edge`, computes
/// `f* = (p*b - q) / b` against that side's net odds, scales by
/// `fraction`, and caps the result at half the bankroll. Returns `None`
/// when no side qualifies or either probability is degenerate.
pub fn kelly_fraction(
    probability: Decimal,
    market_probability: Decimal,
    fraction: Decimal,
    min_edge: Decimal,
) -> Option<(BetOutcome, Decimal)> {
    if probability <= Decimal::ZERO || probability >= Decimal::ONE {
        return None;
    }
    if market_probability <= Decimal::ZERO || market_probability >= Decimal::ONE {
        return None;
    }

    let edge_yes = probability - market_probability;
    let edge_no = -edge_yes;

    let (outcome, p, q, b) = if edge_yes >= min_edge {
        let b = (Decimal::ONE - market_probability) / market_probability;
        (BetOutcome::Yes, probability, Decimal::ONE - probability, b)
    } else if edge_no >= min_edge {
        let b = market_probability / (Decimal::ONE - market_probability);
        (BetOutcome::No, Decimal::ONE - probability, probability, b)
    } else {
        return None;
    };

    let kelly = (p * b - q) / b;
    if kelly <= Decimal::ZERO {
        return None;
    }

    let bet_fraction = (kelly * fraction).clamp(Decimal::ZERO, dec!(0.5));
    Some((outcome, bet_fraction))
}

/// Cap a stake so it does not consume more than `impact_threshold` of the
/// market's liquidity. Unknown liquidity (<= 0) leaves the stake alone.
pub fn adjust_for_impact(
    amount: Decimal,
    market_liquidity: Decimal,
    impact_threshold: Decimal,
) -> Decimal {
    if market_liquidity <= Decimal::ZERO {
        return amount;
    }
    amount.min(market_liquidity * impact_threshold)
}

/// Full bet sizing: Kelly fraction of bankroll, capped by `max_bet` and by
/// the liquidity impact limit. A stake that lands below `min_bet` after
/// the caps means the market cannot absorb a worthwhile bet, so no bet.
pub fn optimal_bet(
    bankroll: Decimal,
    probability: Decimal,
    market_probability: Decimal,
    market_liquidity: Decimal,
    params: &SizingParams,
) -> Option<BetPlan> {
    let (outcome, bankroll_fraction) = kelly_fraction(
        probability,
        market_probability,
        params.kelly_fraction,
        params.min_edge,
    )?;

    let mut amount = bankroll * bankroll_fraction;
    amount = amount.min(params.max_bet);
    amount = adjust_for_impact(amount, market_liquidity, params.impact_threshold);

    if amount < params.min_bet {
        return None;
    }

    Some(BetPlan {
        outcome,
        amount: amount.round_dp(2),
        bankroll_fraction: bankroll_fraction.round_dp(4),
        edge: (probability - market_probability).abs().round_dp(4),
    })
}
