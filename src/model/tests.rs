//! Tests for model module

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::config::LlmConfig;
    use crate::types::{Market, Pool};
    use chrono::Utc;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn test_market(probability: Decimal) -> Market {
        Market {
            id: "test-id".to_string(),
            question: "Will it rain tomorrow?".to_string(),
            description: Some("Weather prediction market".to_string()),
            creator_username: "tester".to_string(),
            probability,
            volume: dec!(1000),
            total_liquidity: dec!(500),
            close_time: Some(Utc::now()),
            is_resolved: false,
            resolution: None,
            pool: None,
        }
    }

    // ---- provider config ----

    #[test]
    fn test_llm_from_config_openai() {
        let config = LlmConfig {
            provider: "openai".to_string(),
            api_key: "sk-test".to_string(),
            model: Some("gpt-4".to_string()),
            base_url: None,
        };
        assert!(LlmModel::from_config(&config).is_ok());
    }

    #[test]
    fn test_llm_from_config_gpt_alias() {
        let config = LlmConfig {
            provider: "gpt".to_string(),
            api_key: "sk-test".to_string(),
            model: None,
            base_url: None,
        };
        assert!(LlmModel::from_config(&config).is_ok());
    }

    #[test]
    fn test_llm_from_config_claude_alias() {
        let config = LlmConfig {
            provider: "claude".to_string(),
            api_key: "sk-test".to_string(),
            model: None,
            base_url: None,
        };
        assert!(LlmModel::from_config(&config).is_ok());
    }

    #[test]
    fn test_llm_from_config_case_insensitive() {
        let config = LlmConfig {
            provider: "OPENAI".to_string(),
            api_key: "sk-test".to_string(),
            model: None,
            base_url: None,
        };
        assert!(LlmModel::from_config(&config).is_ok());
    }

    #[test]
    fn test_llm_from_config_compatible() {
        let config = LlmConfig {
            provider: "compatible".to_string(),
            api_key: String::new(),
            model: Some("llama3".to_string()),
            base_url: Some("http://localhost:11434/v1".to_string()),
        };
        assert!(LlmModel::from_config(&config).is_ok());
    }

    #[test]
    fn test_llm_from_config_compatible_missing_model() {
        let config = LlmConfig {
            provider: "compatible".to_string(),
            api_key: String::new(),
            model: None,
            base_url: Some("http://localhost:8000".to_string()),
        };
        assert!(LlmModel::from_config(&config).is_err());
    }

    #[test]
    fn test_llm_from_config_compatible_missing_base_url() {
        let config = LlmConfig {
            provider: "compatible".to_string(),
            api_key: String::new(),
            model: Some("llama3".to_string()),
            base_url: None,
        };
        assert!(LlmModel::from_config(&config).is_err());
    }

    #[test]
    fn test_llm_from_config_unknown_provider() {
        let config = LlmConfig {
            provider: "unknown".to_string(),
            api_key: "key".to_string(),
            model: None,
            base_url: None,
        };
        assert!(LlmModel::from_config(&config).is_err());
    }

    // ---- completion parsing ----

    #[test]
    fn test_parse_probability_plain_number() {
        assert_eq!(parse_probability("0.65"), Some(dec!(0.65)));
    }

    #[test]
    fn test_parse_probability_embedded() {
        assert_eq!(
            parse_probability("The probability is 0.72."),
            Some(dec!(0.72))
        );
    }

    #[test]
    fn test_parse_probability_clamps_endpoints() {
        assert_eq!(parse_probability("1"), Some(dec!(0.99)));
        assert_eq!(parse_probability("0"), Some(dec!(0.01)));
    }

    #[test]
    fn test_parse_probability_skips_out_of_range() {
        // 42 is out of range, the later 0.3 is the estimate
        assert_eq!(
            parse_probability("Given 42 polls, I estimate 0.3"),
            Some(dec!(0.3))
        );
    }

    #[test]
    fn test_parse_probability_rejects_garbage() {
        assert_eq!(parse_probability("no idea"), None);
        assert_eq!(parse_probability(""), None);
    }

    // ---- heuristics ----

    #[test]
    fn test_base_rate_near_year() {
        assert_eq!(
            BaseRateModel::estimate("Will humans land on Mars by 2026?"),
            dec!(0.6)
        );
    }

    #[test]
    fn test_base_rate_mid_year() {
        assert_eq!(
            BaseRateModel::estimate("Will humans land on Mars by 2030?"),
            dec!(0.4)
        );
    }

    #[test]
    fn test_base_rate_far_year() {
        assert_eq!(
            BaseRateModel::estimate("Will humans land on Mars by 2040?"),
            dec!(0.25)
        );
    }

    #[test]
    fn test_base_rate_pessimistic_phrasing() {
        assert_eq!(
            BaseRateModel::estimate("Does the launch fail and not recover?"),
            dec!(0.35)
        );
    }

    #[test]
    fn test_base_rate_neutral_phrasing() {
        assert_eq!(BaseRateModel::estimate("Does the coin land heads?"), dec!(0.5));
    }

    #[test]
    fn test_momentum_reinforces_high_probability() {
        let mut market = test_market(dec!(0.8));
        market.volume = dec!(5000);
        let estimate = MomentumModel::estimate(&market);
        assert!(estimate > dec!(0.8));
        assert!(estimate <= dec!(0.99));
    }

    #[test]
    fn test_momentum_reinforces_low_probability() {
        let mut market = test_market(dec!(0.2));
        market.volume = dec!(5000);
        assert!(MomentumModel::estimate(&market) < dec!(0.2));
    }

    #[test]
    fn test_momentum_leaves_midrange_alone() {
        let market = test_market(dec!(0.5));
        assert_eq!(MomentumModel::estimate(&market), dec!(0.5));
    }

    #[test]
    fn test_momentum_weaker_on_thin_volume() {
        let mut thin = test_market(dec!(0.8));
        thin.volume = dec!(50);
        let mut thick = test_market(dec!(0.8));
        thick.volume = dec!(5000);
        assert!(MomentumModel::estimate(&thin) < MomentumModel::estimate(&thick));
    }

    #[test]
    fn test_contrarian_fades_extremes() {
        let high = test_market(dec!(0.9));
        assert_eq!(ContrarianModel::estimate(&high), dec!(0.75));

        let low = test_market(dec!(0.1));
        assert_eq!(ContrarianModel::estimate(&low), dec!(0.25));
    }

    #[test]
    fn test_contrarian_leaves_midrange_alone() {
        let market = test_market(dec!(0.6));
        assert_eq!(ContrarianModel::estimate(&market), dec!(0.6));
    }

    // ---- ensemble ----

    fn stub_model(name: &'static str, probability: Decimal) -> Box<MockProbabilityModel> {
        let mut model = MockProbabilityModel::new();
        model.expect_predict().returning(move |_| {
            Ok(Prediction {
                probability,
                confidence: dec!(0.7),
                reasoning: "stub".to_string(),
            })
        });
        model.expect_name().return_const(name.to_string());
        Box::new(model)
    }

    #[tokio::test]
    async fn test_ensemble_weighted_average() {
        let mut ensemble = EnsembleModel::new();
        ensemble.add_model(stub_model("a", dec!(0.8)), dec!(0.75));
        ensemble.add_model(stub_model("b", dec!(0.4)), dec!(0.25));

        let result = ensemble
            .predict_detailed(&test_market(dec!(0.5)))
            .await
            .unwrap();
        assert_eq!(result.probability, dec!(0.7));
        assert_eq!(result.components.len(), 2);
    }

    #[tokio::test]
    async fn test_ensemble_failed_component_drops_out() {
        let mut failing = MockProbabilityModel::new();
        failing
            .expect_predict()
            .returning(|_| Err(crate::error::BotError::Llm("down".to_string())));
        failing.expect_name().return_const("failing".to_string());

        let mut ensemble = EnsembleModel::new();
        ensemble.add_model(Box::new(failing), dec!(0.9));
        ensemble.add_model(stub_model("ok", dec!(0.6)), dec!(0.1));

        let result = ensemble
            .predict_detailed(&test_market(dec!(0.5)))
            .await
            .unwrap();
        // Only the surviving component contributes
        assert_eq!(result.probability, dec!(0.6));
        assert_eq!(result.components.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_ensemble_falls_back_to_market() {
        let ensemble = EnsembleModel::new();
        let result = ensemble
            .predict_detailed(&test_market(dec!(0.42)))
            .await
            .unwrap();
        assert_eq!(result.probability, dec!(0.42));
        assert_eq!(result.confidence, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_ensemble_agreement_drives_confidence() {
        let mut agreeing = EnsembleModel::new();
        agreeing.add_model(stub_model("a", dec!(0.6)), dec!(0.5));
        agreeing.add_model(stub_model("b", dec!(0.6)), dec!(0.5));

        let mut disagreeing = EnsembleModel::new();
        disagreeing.add_model(stub_model("a", dec!(0.2)), dec!(0.5));
        disagreeing.add_model(stub_model("b", dec!(0.8)), dec!(0.5));

        let market = test_market(dec!(0.5));
        let high = agreeing.predict_detailed(&market).await.unwrap();
        let low = disagreeing.predict_detailed(&market).await.unwrap();

        assert_eq!(high.confidence, Decimal::ONE);
        assert!(low.confidence < high.confidence);
        assert!(low.variance > high.variance);
        assert!(low.agreement < high.agreement);
    }

    #[tokio::test]
    async fn test_calibrate_weights_shifts_ensemble() {
        let mut ensemble = EnsembleModel::new();
        ensemble.add_model(stub_model("a", dec!(0.8)), dec!(0.5));
        ensemble.add_model(stub_model("b", dec!(0.2)), dec!(0.5));

        let market = test_market(dec!(0.5));
        let before = ensemble.predict_detailed(&market).await.unwrap();
        assert_eq!(before.probability, dec!(0.5));

        let mut accuracy = std::collections::HashMap::new();
        accuracy.insert("a".to_string(), dec!(0.75));
        accuracy.insert("b".to_string(), dec!(0.25));
        ensemble.calibrate_weights(&accuracy);

        let after = ensemble.predict_detailed(&market).await.unwrap();
        assert_eq!(after.probability, dec!(0.65));
    }

    #[test]
    fn test_evaluate_components_brier() {
        let components = vec![
            ComponentEstimate {
                model: "good".to_string(),
                probability: dec!(0.9),
            },
            ComponentEstimate {
                model: "bad".to_string(),
                probability: dec!(0.2),
            },
        ];

        let scores = evaluate_components(&components, Decimal::ONE);
        assert_eq!(scores[0].error, dec!(0.1));
        assert_eq!(scores[0].brier_score, dec!(0.01));
        assert_eq!(scores[0].accuracy, dec!(0.9));
        assert_eq!(scores[1].error, dec!(0.8));
        assert_eq!(scores[1].brier_score, dec!(0.64));
    }

    // ---- sentiment parsing ----

    #[test]
    fn test_parse_sentiment_full_format() {
        let text = "Sentiment: bullish\n\
                    Key Factors: [polling lead, incumbent advantage, turnout]\n\
                    Confidence: 0.8\n\
                    Reasoning: Strong fundamentals.";
        let analysis = parse_sentiment(text).unwrap();
        assert_eq!(analysis.sentiment, Sentiment::Bullish);
        assert_eq!(analysis.key_factors.len(), 3);
        assert_eq!(analysis.confidence, dec!(0.8));
        assert_eq!(analysis.reasoning, "Strong fundamentals.");
    }

    #[test]
    fn test_parse_sentiment_bracketed_sentiment() {
        let text = "Sentiment: [bearish]\nConfidence: 0.6\nReasoning: weak data";
        let analysis = parse_sentiment(text).unwrap();
        assert_eq!(analysis.sentiment, Sentiment::Bearish);
    }

    #[test]
    fn test_parse_sentiment_missing_sentiment_fails() {
        assert!(parse_sentiment("Confidence: 0.8\nReasoning: whatever").is_none());
    }

    #[test]
    fn test_parse_sentiment_invalid_confidence_defaults() {
        let text = "Sentiment: neutral\nConfidence: 7\nReasoning: n/a";
        let analysis = parse_sentiment(text).unwrap();
        assert_eq!(analysis.confidence, dec!(0.5));
    }

    #[test]
    fn test_parse_sentiment_multiline_reasoning() {
        let text = "Sentiment: neutral\nReasoning: first line\nsecond line";
        let analysis = parse_sentiment(text).unwrap();
        assert_eq!(analysis.reasoning, "first line second line");
    }

    // ---- market helper used in prompts ----

    #[test]
    fn test_market_pool_helper() {
        let mut market = test_market(dec!(0.65));
        market.pool = Some(Pool {
            yes: dec!(350),
            no: dec!(650),
        });
        assert_eq!(market.pool_probability(), Some(dec!(0.65)));
    }
}
