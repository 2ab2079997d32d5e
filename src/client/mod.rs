//! Manifold Markets API client
//!
//! Fetches markets, users and bets, and places bets on behalf of the
//! configured account.

use crate::config::ManifoldConfig;
use crate::error::{BotError, Result};
use crate::types::{BetOutcome, Market, PlacedBet, Pool};
use chrono::{TimeZone, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Manifold REST client
#[derive(Clone)]
pub struct ManifoldClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

/// Wire format of a market as the API returns it
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiMarket {
    id: String,
    question: String,
    #[serde(default)]
    text_description: Option<String>,
    creator_username: String,
    outcome_type: String,
    probability: Option<f64>,
    #[serde(default)]
    volume: f64,
    #[serde(default)]
    total_liquidity: f64,
    /// Epoch milliseconds
    close_time: Option<i64>,
    #[serde(default)]
    is_resolved: bool,
    resolution: Option<String>,
    pool: Option<ApiPool>,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiPool {
    #[serde(rename = "YES")]
    yes: f64,
    #[serde(rename = "NO")]
    no: f64,
}

/// A user account
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub name: String,
    pub balance: Decimal,
}

/// An existing bet on a market
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bet {
    pub id: String,
    pub contract_id: String,
    pub amount: Decimal,
    pub outcome: String,
    pub prob_before: Option<f64>,
    pub prob_after: Option<f64>,
    pub created_time: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlaceBetRequest<'a> {
    contract_id: &'a str,
    amount: Decimal,
    outcome: BetOutcome,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaceBetResponse {
    bet_id: Option<String>,
    id: Option<String>,
    prob_after: Option<f64>,
}

impl ManifoldClient {
    /// Create a client from config
    pub fn new(config: &ManifoldConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    /// Fetch markets, optionally filtered by creator username.
    ///
    /// Only binary markets carry a probability, so everything else is
    /// dropped during parsing.
    pub async fn get_markets(
        &self,
        limit: usize,
        creator_username: Option<&str>,
    ) -> Result<Vec<Market>> {
        let url = format!("{}/markets", self.base_url);
        let resp = self
            .http
            .get(&url)
            .query(&[("limit", limit.to_string())])
            .send()
            .await?;
        let resp = Self::check_status(resp).await?;
        let raw: Vec<ApiMarket> = resp.json().await?;

        let markets: Vec<Market> = raw
            .into_iter()
            .filter(|m| creator_username.map_or(true, |c| m.creator_username == c))
            .filter_map(parse_market)
            .collect();

        debug!("Fetched {} binary markets", markets.len());
        Ok(markets)
    }

    /// Fetch a single market by id
    pub async fn get_market(&self, market_id: &str) -> Result<Market> {
        let url = format!("{}/market/{}", self.base_url, market_id);
        let resp = self.http.get(&url).send().await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(BotError::MarketNotFound(market_id.to_string()));
        }
        let resp = Self::check_status(resp).await?;
        let raw: ApiMarket = resp.json().await?;

        parse_market(raw).ok_or_else(|| BotError::MarketNotFound(market_id.to_string()))
    }

    /// Fetch a user by username
    pub async fn get_user(&self, username: &str) -> Result<User> {
        let url = format!("{}/user/{}", self.base_url, username);
        let resp = Self::check_status(self.http.get(&url).send().await?).await?;
        Ok(resp.json().await?)
    }

    /// Fetch bets, optionally filtered by market and/or bettor
    pub async fn get_bets(
        &self,
        market_id: Option<&str>,
        username: Option<&str>,
    ) -> Result<Vec<Bet>> {
        let url = format!("{}/bets", self.base_url);
        let mut req = self.http.get(&url);
        if let Some(id) = market_id {
            req = req.query(&[("contractId", id)]);
        }
        if let Some(name) = username {
            req = req.query(&[("username", name)]);
        }
        let resp = Self::check_status(req.send().await?).await?;
        Ok(resp.json().await?)
    }

    /// Place a bet. Requires an API key.
    pub async fn place_bet(
        &self,
        market_id: &str,
        amount: Decimal,
        outcome: BetOutcome,
    ) -> Result<PlacedBet> {
        let api_key = self.api_key.as_ref().ok_or(BotError::ApiKeyRequired)?;

        let url = format!("{}/bet", self.base_url);
        let body = PlaceBetRequest {
            contract_id: market_id,
            amount,
            outcome,
        };

        let resp = self
            .http
            .post(&url)
            .header("Authorization", format!("Key {}", api_key))
            .json(&body)
            .send()
            .await?;
        let resp = Self::check_status(resp).await?;
        let parsed: PlaceBetResponse = resp.json().await?;

        Ok(PlacedBet {
            bet_id: parsed
                .bet_id
                .or(parsed.id)
                .unwrap_or_else(|| market_id.to_string()),
            market_id: market_id.to_string(),
            outcome,
            amount,
            prob_after: parsed
                .prob_after
                .and_then(|p| Decimal::try_from(p).ok())
                .unwrap_or(Decimal::ZERO),
            timestamp: Utc::now(),
        })
    }

    /// Open markets only: not resolved and closing in the future
    pub async fn get_open_markets(
        &self,
        limit: usize,
        creator_username: Option<&str>,
    ) -> Result<Vec<Market>> {
        let now = Utc::now();
        let markets = self.get_markets(limit, creator_username).await?;
        Ok(markets.into_iter().filter(|m| m.is_open(now)).collect())
    }

    async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let message = resp.text().await.unwrap_or_default();
        Err(BotError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

fn parse_market(raw: ApiMarket) -> Option<Market> {
    if raw.outcome_type != "BINARY" {
        return None;
    }
    let probability = Decimal::try_from(raw.probability?).ok()?;

    let close_time = raw
        .close_time
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single());

    let pool = raw.pool.and_then(|p| {
        Some(Pool {
            yes: Decimal::try_from(p.yes).ok()?,
            no: Decimal::try_from(p.no).ok()?,
        })
    });

    Some(Market {
        id: raw.id,
        question: raw.question,
        description: raw.text_description,
        creator_username: raw.creator_username,
        probability,
        volume: Decimal::try_from(raw.volume).unwrap_or(Decimal::ZERO),
        total_liquidity: Decimal::try_from(raw.total_liquidity).unwrap_or(Decimal::ZERO),
        close_time,
        is_resolved: raw.is_resolved,
        resolution: raw.resolution,
        pool,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const MARKET_JSON: &str = r#"{
        "id": "abc123",
        "question": "Will it rain tomorrow?",
        "creatorUsername": "MikhailTal",
        "outcomeType": "BINARY",
        "probability": 0.65,
        "volume": 1234.5,
        "totalLiquidity": 500.0,
        "closeTime": 4102444800000,
        "isResolved": false,
        "pool": {"YES": 350.0, "NO": 650.0}
    }"#;

    #[test]
    fn parses_binary_market() {
        let raw: ApiMarket = serde_json::from_str(MARKET_JSON).unwrap();
        let market = parse_market(raw).unwrap();
        assert_eq!(market.id, "abc123");
        assert_eq!(market.creator_username, "MikhailTal");
        assert_eq!(market.probability, dec!(0.65));
        assert_eq!(market.total_liquidity, dec!(500.0));
        assert!(market.close_time.is_some());
        assert!(!market.is_resolved);
        assert_eq!(market.pool.as_ref().unwrap().yes, dec!(350.0));
    }

    #[test]
    fn skips_non_binary_markets() {
        let raw: ApiMarket = serde_json::from_str(
            r#"{
                "id": "mc1",
                "question": "Who wins?",
                "creatorUsername": "someone",
                "outcomeType": "MULTIPLE_CHOICE",
                "probability": null,
                "isResolved": false
            }"#,
        )
        .unwrap();
        assert!(parse_market(raw).is_none());
    }

    #[test]
    fn place_bet_without_key_fails() {
        let client = ManifoldClient::new(&crate::config::ManifoldConfig::default()).unwrap();
        let err = tokio_test::block_on(client.place_bet(
            "abc",
            dec!(10),
            BetOutcome::Yes,
        ))
        .unwrap_err();
        assert!(matches!(err, BotError::ApiKeyRequired));
    }
}
