//! Configuration loading
//!
//! Settings come from a TOML file layered with environment variables.
//! `MANIFOLD_API_KEY` and `OPENAI_API_KEY` always override the file.

use crate::error::Result;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Top-level bot configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub manifold: ManifoldConfig,
    pub llm: Option<LlmConfig>,
    #[serde(default)]
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub portfolio: PortfolioConfig,
    pub alerts: Option<AlertsConfig>,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

impl Config {
    /// Load configuration from a TOML file plus the environment
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("BOT").separator("__"))
            .build()?;

        let mut cfg: Config = settings.try_deserialize()?;

        // Legacy env names take precedence over the file
        if let Ok(key) = std::env::var("MANIFOLD_API_KEY") {
            if !key.is_empty() {
                cfg.manifold.api_key = Some(key);
            }
        }
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            if !key.is_empty() {
                match &mut cfg.llm {
                    Some(llm) if llm.api_key.is_empty() => llm.api_key = key,
                    None => cfg.llm = Some(LlmConfig::openai(key)),
                    _ => {}
                }
            }
        }

        Ok(cfg)
    }
}

/// Manifold API settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ManifoldConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    pub api_key: Option<String>,
    /// Only trade markets from this creator when set
    pub target_creator: Option<String>,
}

fn default_api_url() -> String {
    "https://api.manifold.markets/v0".to_string()
}

impl Default for ManifoldConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_key: None,
            target_creator: None,
        }
    }
}

/// LLM provider settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    pub provider: String,
    #[serde(default)]
    pub api_key: String,
    pub model: Option<String>,
    pub base_url: Option<String>,
}

impl LlmConfig {
    pub fn openai(api_key: String) -> Self {
        Self {
            provider: "openai".to_string(),
            api_key,
            model: None,
            base_url: None,
        }
    }
}

/// Strategy thresholds and bet sizing
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StrategyConfig {
    #[serde(default = "default_min_edge")]
    pub min_edge: Decimal,
    #[serde(default = "default_min_confidence")]
    pub min_confidence: Decimal,
    #[serde(default = "default_kelly_fraction")]
    pub kelly_fraction: Decimal,
    #[serde(default = "default_bankroll")]
    pub bankroll: Decimal,
    #[serde(default = "default_min_bet")]
    pub min_bet: Decimal,
    #[serde(default = "default_max_bet")]
    pub max_bet: Decimal,
    /// Max fraction of market liquidity a single bet may consume
    #[serde(default = "default_impact_threshold")]
    pub impact_threshold: Decimal,
    #[serde(default = "default_min_liquidity")]
    pub min_liquidity: Decimal,
    #[serde(default)]
    pub auto_trade: bool,
    #[serde(default = "default_scan_interval")]
    pub scan_interval_secs: u64,
}

fn default_min_edge() -> Decimal {
    dec!(0.05)
}
fn default_min_confidence() -> Decimal {
    dec!(0.60)
}
fn default_kelly_fraction() -> Decimal {
    dec!(0.25)
}
fn default_bankroll() -> Decimal {
    dec!(1000)
}
fn default_min_bet() -> Decimal {
    dec!(10)
}
fn default_max_bet() -> Decimal {
    dec!(100)
}
fn default_impact_threshold() -> Decimal {
    dec!(0.1)
}
fn default_min_liquidity() -> Decimal {
    dec!(50)
}
fn default_scan_interval() -> u64 {
    60
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            min_edge: default_min_edge(),
            min_confidence: default_min_confidence(),
            kelly_fraction: default_kelly_fraction(),
            bankroll: default_bankroll(),
            min_bet: default_min_bet(),
            max_bet: default_max_bet(),
            impact_threshold: default_impact_threshold(),
            min_liquidity: default_min_liquidity(),
            auto_trade: false,
            scan_interval_secs: default_scan_interval(),
        }
    }
}

/// Trade log persistence
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PortfolioConfig {
    #[serde(default = "default_portfolio_path")]
    pub path: String,
}

fn default_portfolio_path() -> String {
    "data/portfolio.json".to_string()
}

impl PortfolioConfig {
    /// Storage path with `~` and env vars expanded
    pub fn expanded_path(&self) -> String {
        shellexpand::full(&self.path)
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| self.path.clone())
    }
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        Self {
            path: default_portfolio_path(),
        }
    }
}

/// Alert dispatch settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AlertsConfig {
    pub webhook_url: Option<String>,
    #[serde(default = "default_true")]
    pub notify_opportunities: bool,
    #[serde(default = "default_true")]
    pub notify_arbitrage: bool,
    #[serde(default = "default_true")]
    pub notify_errors: bool,
}

fn default_true() -> bool {
    true
}

/// Status dashboard settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DashboardConfig {
    #[serde(default = "default_dashboard_port")]
    pub port: u16,
}

fn default_dashboard_port() -> u16 {
    8080
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            port: default_dashboard_port(),
        }
    }
}
