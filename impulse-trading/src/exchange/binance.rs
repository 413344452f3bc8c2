//! Binance USDⓈ-M futures client.
//!
//! Placeholder implementation: the venue is wired into [`ExchangeKind`]
//! selection but no endpoint is implemented yet. Every call returns
//! [`Error::Unsupported`] so a misconfigured deployment fails loudly on the
//! first request instead of trading silently wrong.
//!
//! [`ExchangeKind`]: impulse_common::config::ExchangeKind

use async_trait::async_trait;

use impulse_common::config::ExchangeConfig;
use impulse_common::{Error, Result};

use super::{Candle, Exchange, Order, Position, Ticker};

/// Binance futures client (not implemented).
pub struct BinanceClient {
    #[allow(dead_code)]
    api_key: String,
    #[allow(dead_code)]
    api_secret: String,
    #[allow(dead_code)]
    testnet: bool,
}

impl BinanceClient {
    /// Create a new client from exchange configuration.
    pub fn new(config: &ExchangeConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            testnet: config.testnet,
        }
    }

    fn unsupported<T>(operation: &str) -> Result<T> {
        Err(Error::Unsupported(format!(
            "Binance client does not implement {operation} yet"
        )))
    }
}

#[async_trait]
impl Exchange for BinanceClient {
    fn name(&self) -> &'static str {
        "Binance"
    }

    async fn get_ticker(&self, _symbol: &str) -> Result<Ticker> {
        Self::unsupported("get_ticker")
    }

    async fn get_klines(&self, _symbol: &str, _interval: &str, _limit: u32) -> Result<Vec<Candle>> {
        Self::unsupported("get_klines")
    }

    async fn set_leverage(&self, _symbol: &str, _leverage: u32) -> Result<()> {
        Self::unsupported("set_leverage")
    }

    async fn buy(&self, _symbol: &str, _qty: &str) -> Result<Order> {
        Self::unsupported("buy")
    }

    async fn sell(&self, _symbol: &str, _qty: &str) -> Result<Order> {
        Self::unsupported("sell")
    }

    async fn get_positions(&self, _symbol: &str) -> Result<Vec<Position>> {
        Self::unsupported("get_positions")
    }

    async fn close_position(&self, _symbol: &str) -> Result<Option<Order>> {
        Self::unsupported("close_position")
    }

    async fn set_stop_loss(&self, _symbol: &str, _price: f64) -> Result<()> {
        Self::unsupported("set_stop_loss")
    }

    async fn set_take_profit(&self, _symbol: &str, _price: f64) -> Result<()> {
        Self::unsupported("set_take_profit")
    }
}
