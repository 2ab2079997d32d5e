//! LLM-backed probability estimation

use super::{Prediction, ProbabilityModel};
use crate::config::LlmConfig;
use crate::error::{BotError, Result};
use crate::types::Market;
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use serde_json::json;

const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_ANTHROPIC_URL: &str = "https://api.anthropic.com/v1";
const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-latest";

/// Supported LLM backends
#[derive(Debug, Clone)]
pub enum LlmProvider {
    OpenAi {
        api_key: String,
        model: String,
        base_url: String,
    },
    Anthropic {
        api_key: String,
        model: String,
    },
    /// Any OpenAI-compatible endpoint (vLLM, Ollama, ...)
    Compatible {
        api_key: Option<String>,
        model: String,
        base_url: String,
    },
}

/// Probability model backed by a chat-completion endpoint
pub struct LlmModel {
    http: Client,
    provider: LlmProvider,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    text: Option<String>,
}

impl LlmModel {
    pub fn new(provider: LlmProvider) -> Self {
        Self {
            http: Client::new(),
            provider,
        }
    }

    pub fn openai(api_key: String) -> Self {
        Self::new(LlmProvider::OpenAi {
            api_key,
            model: DEFAULT_OPENAI_MODEL.to_string(),
            base_url: DEFAULT_OPENAI_URL.to_string(),
        })
    }

    pub fn anthropic(api_key: String) -> Self {
        Self::new(LlmProvider::Anthropic {
            api_key,
            model: DEFAULT_ANTHROPIC_MODEL.to_string(),
        })
    }

    /// Build a model from the `[llm]` config section
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let provider = match config.provider.to_lowercase().as_str() {
            "openai" | "gpt" => LlmProvider::OpenAi {
                api_key: config.api_key.clone(),
                model: config
                    .model
                    .clone()
                    .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
                base_url: config
                    .base_url
                    .clone()
                    .unwrap_or_else(|| DEFAULT_OPENAI_URL.to_string()),
            },
            "anthropic" | "claude" => LlmProvider::Anthropic {
                api_key: config.api_key.clone(),
                model: config
                    .model
                    .clone()
                    .unwrap_or_else(|| DEFAULT_ANTHROPIC_MODEL.to_string()),
            },
            "compatible" | "custom" => {
                let model = config.model.clone().ok_or_else(|| {
                    BotError::InvalidConfig("compatible provider requires `model`".into())
                })?;
                let base_url = config.base_url.clone().ok_or_else(|| {
                    BotError::InvalidConfig("compatible provider requires `base_url`".into())
                })?;
                LlmProvider::Compatible {
                    api_key: if config.api_key.is_empty() {
                        None
                    } else {
                        Some(config.api_key.clone())
                    },
                    model,
                    base_url,
                }
            }
            other => {
                return Err(BotError::InvalidConfig(format!(
                    "unknown LLM provider: {}",
                    other
                )))
            }
        };

        Ok(Self::new(provider))
    }

    /// Send a single-turn prompt and return the raw completion text
    pub(crate) async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        match &self.provider {
            LlmProvider::OpenAi {
                api_key,
                model,
                base_url,
            } => {
                self.chat_completion(base_url, Some(api_key), model, prompt, max_tokens)
                    .await
            }
            LlmProvider::Compatible {
                api_key,
                model,
                base_url,
            } => {
                self.chat_completion(base_url, api_key.as_deref(), model, prompt, max_tokens)
                    .await
            }
            LlmProvider::Anthropic { api_key, model } => {
                let url = format!("{}/messages", DEFAULT_ANTHROPIC_URL);
                let body = json!({
                    "model": model,
                    "max_tokens": max_tokens,
                    "messages": [{"role": "user", "content": prompt}],
                });
                let resp = self
                    .http
                    .post(&url)
                    .header("x-api-key", api_key)
                    .header("anthropic-version", "2023-06-01")
                    .json(&body)
                    .send()
                    .await?;
                if !resp.status().is_success() {
                    return Err(BotError::Llm(format!(
                        "anthropic returned {}",
                        resp.status()
                    )));
                }
                let parsed: AnthropicResponse = resp.json().await?;
                parsed
                    .content
                    .into_iter()
                    .find_map(|c| c.text)
                    .ok_or_else(|| BotError::Llm("empty anthropic response".into()))
            }
        }
    }

    async fn chat_completion(
        &self,
        base_url: &str,
        api_key: Option<&str>,
        model: &str,
        prompt: &str,
        max_tokens: u32,
    ) -> Result<String> {
        let url = format!("{}/chat/completions", base_url.trim_end_matches('/'));
        let body = json!({
            "model": model,
            "messages": [{"role": "user", "content": prompt}],
            "max_tokens": max_tokens,
        });

        let mut req = self.http.post(&url).json(&body);
        if let Some(key) = api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await?;
        if !resp.status().is_success() {
            return Err(BotError::Llm(format!("LLM returned {}", resp.status())));
        }
        let parsed: ChatResponse = resp.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| BotError::Llm("empty completion".into()))
    }

    fn build_prompt(market: &Market) -> String {
        let context = market
            .description
            .as_deref()
            .filter(|d| !d.is_empty())
            .map(|d| format!("\nAdditional context: {}", d))
            .unwrap_or_default();

        format!(
            "You are a probability estimation expert. Analyze the following \
             prediction market question and estimate the probability of a YES outcome.\n\n\
             Question: {}\n{}\n\
             Consider historical precedents, current trends and evidence, base rates, \
             and potential biases.\n\n\
             Respond with ONLY a number between 0 and 1 (e.g., 0.65 for 65% probability).",
            market.question, context
        )
    }
}

/// Pull the first number in [0, 1] out of a completion, clamped away from
/// the degenerate endpoints.
pub fn parse_probability(text: &str) -> Option<Decimal> {
    for token in text.split_whitespace() {
        // Strip surrounding punctuation; a sentence-final period goes too
        let trimmed = token
            .trim_matches(|c: char| !c.is_ascii_digit() && c != '.')
            .trim_end_matches('.');
        if trimmed.is_empty() {
            continue;
        }
        if let Ok(value) = trimmed.parse::<f64>() {
            if (0.0..=1.0).contains(&value) {
                let p = Decimal::try_from(value).ok()?;
                return Some(p.clamp(dec!(0.01), dec!(0.99)));
            }
        }
    }
    None
}

#[async_trait]
impl ProbabilityModel for LlmModel {
    async fn predict(&self, market: &Market) -> Result<Prediction> {
        let prompt = Self::build_prompt(market);
        let text = self.complete(&prompt, 100).await?;

        let probability = parse_probability(&text)
            .ok_or_else(|| BotError::Llm(format!("unparseable probability: {}", text.trim())))?;

        Ok(Prediction {
            probability,
            confidence: dec!(0.7),
            reasoning: format!("LLM estimate from completion: {}", text.trim()),
        })
    }

    fn name(&self) -> &str {
        "llm"
    }
}
