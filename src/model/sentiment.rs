//! LLM sentiment analysis of a market question

use super::llm::LlmModel;
use crate::error::Result;
use crate::types::Market;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Bullish,
    Bearish,
    Neutral,
}

impl Sentiment {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "bullish" => Some(Sentiment::Bullish),
            "bearish" => Some(Sentiment::Bearish),
            "neutral" => Some(Sentiment::Neutral),
            _ => None,
        }
    }
}

/// Structured result of a sentiment query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentAnalysis {
    pub sentiment: Sentiment,
    pub key_factors: Vec<String>,
    pub confidence: Decimal,
    pub reasoning: String,
}

impl SentimentAnalysis {
    fn neutral(reasoning: impl Into<String>) -> Self {
        Self {
            sentiment: Sentiment::Neutral,
            key_factors: Vec::new(),
            confidence: dec!(0.5),
            reasoning: reasoning.into(),
        }
    }
}

/// Sentiment model wrapping an LLM backend
pub struct SentimentModel {
    llm: LlmModel,
}

impl SentimentModel {
    pub fn new(llm: LlmModel) -> Self {
        Self { llm }
    }

    /// Query the LLM for sentiment. Parse failures degrade to neutral
    /// rather than erroring; only transport failures propagate.
    pub async fn analyze(&self, market: &Market) -> Result<SentimentAnalysis> {
        let context = market
            .description
            .as_deref()
            .filter(|d| !d.is_empty())
            .map(|d| format!("\nContext: {}", d))
            .unwrap_or_default();

        let prompt = format!(
            "Analyze this prediction market question and provide:\n\
             1. Sentiment (bullish/bearish/neutral)\n\
             2. Key factors that will influence the outcome\n\
             3. Confidence level (0-1)\n\
             4. Brief reasoning\n\n\
             Question: {}{}\n\n\
             Respond in this exact format:\n\
             Sentiment: [bullish/bearish/neutral]\n\
             Key Factors: [factor1, factor2, factor3]\n\
             Confidence: [0-1]\n\
             Reasoning: [brief explanation]",
            market.question, context
        );

        let text = self.llm.complete(&prompt, 300).await?;
        Ok(parse_sentiment(&text).unwrap_or_else(|| {
            warn!("Unparseable sentiment response, treating as neutral");
            SentimentAnalysis::neutral("unparseable model response")
        }))
    }
}

/// Parse the line-oriented sentiment format
pub fn parse_sentiment(text: &str) -> Option<SentimentAnalysis> {
    let mut sentiment = None;
    let mut key_factors = Vec::new();
    let mut confidence = None;
    let mut reasoning = String::new();
    let mut in_reasoning = false;

    for line in text.lines() {
        if let Some(rest) = strip_field(line, "sentiment:") {
            sentiment = Sentiment::parse(rest.trim_matches(['[', ']']));
            in_reasoning = false;
        } else if let Some(rest) = strip_field(line, "key factors:") {
            key_factors = rest
                .trim_matches(['[', ']'])
                .split(',')
                .map(|f| f.trim().to_string())
                .filter(|f| !f.is_empty())
                .collect();
            in_reasoning = false;
        } else if let Some(rest) = strip_field(line, "confidence:") {
            confidence = rest
                .trim_matches(['[', ']'])
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|c| (0.0..=1.0).contains(c))
                .and_then(|c| Decimal::try_from(c).ok());
            in_reasoning = false;
        } else if let Some(rest) = strip_field(line, "reasoning:") {
            reasoning = rest.trim().to_string();
            in_reasoning = true;
        } else if in_reasoning && !line.trim().is_empty() {
            reasoning.push(' ');
            reasoning.push_str(line.trim());
        }
    }

    Some(SentimentAnalysis {
        sentiment: sentiment?,
        key_factors,
        confidence: confidence.unwrap_or(dec!(0.5)),
        reasoning: if reasoning.is_empty() {
            "no reasoning provided".to_string()
        } else {
            reasoning
        },
    })
}

fn strip_field<'a>(line: &'a str, field: &str) -> Option<&'a str> {
    let trimmed = line.trim_start();
    let head = trimmed.get(..field.len())?;
    if head.eq_ignore_ascii_case(field) {
        Some(trimmed[field.len()..].trim())
    } else {
        None
    }
}
