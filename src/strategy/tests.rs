//! Unit tests for strategy module

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::config::StrategyConfig;
    use crate::model::Prediction;
    use crate::types::{BetOutcome, Market};
    use chrono::Utc;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn params() -> SizingParams {
        SizingParams::default()
    }

    fn test_market(probability: Decimal, liquidity: Decimal) -> Market {
        Market {
            id: "m1".to_string(),
            question: "Will the thing happen?".to_string(),
            description: None,
            creator_username: "tester".to_string(),
            probability,
            volume: dec!(2000),
            total_liquidity: liquidity,
            close_time: Some(Utc::now() + chrono::Duration::days(10)),
            is_resolved: false,
            resolution: None,
            pool: None,
        }
    }

    fn prediction(probability: Decimal, confidence: Decimal) -> Prediction {
        Prediction {
            probability,
            confidence,
            reasoning: "test".to_string(),
        }
    }

    // ---- kelly_fraction ----

    #[test]
    fn kelly_picks_yes_on_positive_edge() {
        let (outcome, fraction) =
            kelly_fraction(dec!(0.70), dec!(0.50), dec!(0.25), dec!(0.05)).unwrap();
        assert_eq!(outcome, BetOutcome::Yes);
        // Full Kelly at even odds is 0.4, quarter-Kelly 0.1
        assert_eq!(fraction, dec!(0.1));
    }

    #[test]
    fn kelly_picks_no_on_negative_edge() {
        let (outcome, fraction) =
            kelly_fraction(dec!(0.30), dec!(0.50), dec!(0.25), dec!(0.05)).unwrap();
        assert_eq!(outcome, BetOutcome::No);
        assert!(fraction > Decimal::ZERO);
    }

    #[test]
    fn kelly_requires_min_edge() {
        assert!(kelly_fraction(dec!(0.52), dec!(0.50), dec!(0.25), dec!(0.05)).is_none());
    }

    #[test]
    fn kelly_rejects_degenerate_probabilities() {
        assert!(kelly_fraction(dec!(0), dec!(0.50), dec!(0.25), dec!(0.05)).is_none());
        assert!(kelly_fraction(dec!(1), dec!(0.50), dec!(0.25), dec!(0.05)).is_none());
        assert!(kelly_fraction(dec!(0.7), dec!(0), dec!(0.25), dec!(0.05)).is_none());
        assert!(kelly_fraction(dec!(0.7), dec!(1), dec!(0.25), dec!(0.05)).is_none());
    }

    #[test]
    fn kelly_fraction_is_capped_at_half() {
        // Huge edge with full Kelly would exceed half the bankroll
        let (_, fraction) =
            kelly_fraction(dec!(0.95), dec!(0.10), dec!(1.0), dec!(0.05)).unwrap();
        assert_eq!(fraction, dec!(0.5));
    }

    #[test]
    fn kelly_is_monotonic_in_edge() {
        let mut last = Decimal::ZERO;
        for p in [dec!(0.58), dec!(0.65), dec!(0.72), dec!(0.80), dec!(0.90)] {
            let (_, fraction) =
                kelly_fraction(p, dec!(0.50), dec!(0.25), dec!(0.05)).unwrap();
            assert!(
                fraction > last,
                "fraction not increasing at p={}: {} <= {}",
                p,
                fraction,
                last
            );
            last = fraction;
        }
    }

    // ---- adjust_for_impact ----

    #[test]
    fn impact_caps_at_liquidity_fraction() {
        assert_eq!(adjust_for_impact(dec!(500), dec!(1000), dec!(0.1)), dec!(100));
    }

    #[test]
    fn impact_leaves_small_bets_alone() {
        assert_eq!(adjust_for_impact(dec!(50), dec!(1000), dec!(0.1)), dec!(50));
    }

    #[test]
    fn impact_ignores_unknown_liquidity() {
        assert_eq!(adjust_for_impact(dec!(500), dec!(0), dec!(0.1)), dec!(500));
    }

    // ---- optimal_bet ----

    #[test]
    fn optimal_bet_bounded_by_max_bet() {
        let plan = optimal_bet(dec!(10000), dec!(0.80), dec!(0.50), dec!(100000), &params())
            .unwrap();
        assert!(plan.amount <= params().max_bet);
        assert!(plan.amount >= params().min_bet);
    }

    #[test]
    fn optimal_bet_bounded_by_liquidity() {
        let p = params();
        let plan = optimal_bet(dec!(10000), dec!(0.80), dec!(0.50), dec!(500), &p).unwrap();
        assert!(plan.amount <= dec!(500) * p.impact_threshold);
    }

    #[test]
    fn optimal_bet_none_when_liquidity_cap_below_min_bet() {
        // Liquidity cap is 5, below the 10 minimum bet
        assert!(optimal_bet(dec!(10000), dec!(0.80), dec!(0.50), dec!(50), &params()).is_none());
    }

    #[test]
    fn optimal_bet_none_when_stake_below_min_bet() {
        // Tiny bankroll cannot reach the minimum bet
        assert!(optimal_bet(dec!(20), dec!(0.70), dec!(0.50), dec!(10000), &params()).is_none());
    }

    #[test]
    fn optimal_bet_none_without_edge() {
        assert!(optimal_bet(dec!(1000), dec!(0.52), dec!(0.50), dec!(10000), &params()).is_none());
    }

    #[test]
    fn optimal_bet_monotonic_in_edge() {
        let liquidity = dec!(100000);
        let p = SizingParams {
            max_bet: dec!(10000),
            ..SizingParams::default()
        };
        let mut last = Decimal::ZERO;
        for model_p in [dec!(0.58), dec!(0.65), dec!(0.75), dec!(0.85)] {
            let plan = optimal_bet(dec!(1000), model_p, dec!(0.50), liquidity, &p).unwrap();
            assert!(plan.amount >= last);
            last = plan.amount;
        }
    }

    #[test]
    fn optimal_bet_reports_absolute_edge() {
        let plan = optimal_bet(dec!(1000), dec!(0.30), dec!(0.50), dec!(10000), &params())
            .unwrap();
        assert_eq!(plan.outcome, BetOutcome::No);
        assert_eq!(plan.edge, dec!(0.2));
    }

    // ---- SignalGenerator ----

    #[test]
    fn generator_emits_signal_on_edge() {
        let generator = SignalGenerator::new(StrategyConfig::default());
        let market = test_market(dec!(0.50), dec!(10000));
        let signal = generator
            .generate(&market, &prediction(dec!(0.70), dec!(0.80)))
            .unwrap();

        assert_eq!(signal.outcome, BetOutcome::Yes);
        assert_eq!(signal.edge, dec!(0.20));
        assert!(signal.stake >= dec!(10));
        assert!(signal.is_tradeable(dec!(0.05), dec!(0.60)));
    }

    #[test]
    fn generator_respects_confidence_threshold() {
        let generator = SignalGenerator::new(StrategyConfig::default());
        let market = test_market(dec!(0.50), dec!(10000));
        assert!(generator
            .generate(&market, &prediction(dec!(0.70), dec!(0.40)))
            .is_none());
    }

    #[test]
    fn generator_skips_thin_markets() {
        let generator = SignalGenerator::new(StrategyConfig::default());
        // Liquidity cap of 5 cannot fit the minimum bet
        let market = test_market(dec!(0.50), dec!(50));
        assert!(generator
            .generate(&market, &prediction(dec!(0.70), dec!(0.80)))
            .is_none());
    }

    #[test]
    fn generator_sells_overpriced_markets() {
        let generator = SignalGenerator::new(StrategyConfig::default());
        let market = test_market(dec!(0.80), dec!(10000));
        let signal = generator
            .generate(&market, &prediction(dec!(0.60), dec!(0.80)))
            .unwrap();
        assert_eq!(signal.outcome, BetOutcome::No);
        assert!(signal.edge < Decimal::ZERO);
    }

    // ---- detect_mispricing ----

    #[test]
    fn mispricing_requires_min_edge() {
        assert!(detect_mispricing(dec!(0.52), dec!(0.50), dec!(0.6), dec!(0.05)).is_none());
    }

    #[test]
    fn mispricing_confidence_scales_with_edge() {
        let m = detect_mispricing(dec!(0.80), dec!(0.50), dec!(0.6), dec!(0.05)).unwrap();
        // Edge 0.30 saturates confidence at 1
        assert_eq!(m.confidence, Decimal::ONE);
        assert_eq!(m.outcome, BetOutcome::Yes);

        let weaker = detect_mispricing(dec!(0.71), dec!(0.50), dec!(0.6), dec!(0.05)).unwrap();
        assert!(weaker.confidence < Decimal::ONE);
    }

    #[test]
    fn mispricing_rejects_low_confidence() {
        // Edge 0.06 gives confidence 0.2, below the 0.6 floor
        assert!(detect_mispricing(dec!(0.56), dec!(0.50), dec!(0.6), dec!(0.05)).is_none());
    }

    #[test]
    fn mispricing_direction_follows_sign() {
        let m = detect_mispricing(dec!(0.30), dec!(0.60), dec!(0.6), dec!(0.05)).unwrap();
        assert_eq!(m.outcome, BetOutcome::No);
        assert_eq!(m.edge, dec!(0.30));
    }
}
