use std::str::FromStr;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PriceSourceError {
    #[error("upstream price request failed: {0}")]
    Request(String),

    #[error("upstream response missing a usable price for {0}/{1}")]
    NoPrice(String, String),
}

/// A source of an external reference price (e.g. a centralized exchange),
/// consulted when no manual override is configured.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn reference_price(&self, base: &str, quote: &str) -> Result<Decimal, PriceSourceError>;
}

/// Reference price pulled from Gate.io's public ticker endpoint, the same
/// upstream the original bot polled.
pub struct GateioPriceSource {
    http: reqwest::Client,
}

impl GateioPriceSource {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }
}

impl Default for GateioPriceSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PriceSource for GateioPriceSource {
    async fn reference_price(&self, base: &str, quote: &str) -> Result<Decimal, PriceSourceError> {
        let pair = format!("{}_{}", base.to_uppercase(), quote.to_uppercase());
        let url = format!("https://api.gateio.ws/api/v4/spot/tickers?currency_pair={pair}");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|err| PriceSourceError::Request(err.to_string()))?;
        let tickers: Vec<serde_json::Value> = response
            .json()
            .await
            .map_err(|err| PriceSourceError::Request(err.to_string()))?;

        tickers
            .first()
            .and_then(|ticker| ticker.get("last"))
            .and_then(|last| last.as_str())
            .and_then(|s| Decimal::from_str(s).ok())
            .ok_or_else(|| PriceSourceError::NoPrice(base.to_string(), quote.to_string()))
    }
}
