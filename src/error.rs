//! Error types for the bot

use thiserror::Error;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, BotError>;

/// Errors that can occur anywhere in the bot
#[derive(Error, Debug)]
pub enum BotError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("API key required for this operation")]
    ApiKeyRequired,

    #[error("Market not found: {0}")]
    MarketNotFound(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
