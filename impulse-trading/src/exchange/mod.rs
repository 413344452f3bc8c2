//! Exchange clients for market data and order execution.
//!
//! Supported backends:
//! - Bybit v5 unified trading API (linear perpetuals)
//! - Binance USDⓈ-M futures (stub, not implemented)
//!
//! The rest of the bot only ever talks to the [`Exchange`] trait, so an
//! alternate venue can be wired in without touching decision logic.

mod binance;
mod bybit;

pub use binance::BinanceClient;
pub use bybit::BybitClient;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use impulse_common::config::{ExchangeConfig, ExchangeKind};
use impulse_common::Result;

/// Current price snapshot for an instrument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticker {
    /// Symbol
    pub symbol: String,
    /// Last traded price
    pub last_price: f64,
    /// Best bid
    pub bid: f64,
    /// Best ask
    pub ask: f64,
    /// 24h volume
    pub volume_24h: f64,
}

/// A single OHLCV candle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
    /// Candle open time
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Wire representation used by the exchange APIs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "Buy",
            Self::Sell => "Sell",
        }
    }

    /// The side that closes a position opened on this side.
    pub fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}

/// An order acknowledged by the exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Exchange-assigned order id
    pub order_id: String,
    /// Symbol
    pub symbol: String,
    /// Order side
    pub side: OrderSide,
    /// Quantity in base currency, as sent on the wire
    pub qty: String,
    /// Order status as reported at creation
    pub status: String,
}

/// An open position reported by the exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    /// Symbol
    pub symbol: String,
    /// Position side
    pub side: OrderSide,
    /// Position size in base currency
    pub size: f64,
    /// Average entry price
    pub entry_price: f64,
    /// Unrealized P&L in quote currency
    pub unrealized_pnl: f64,
    /// Leverage in effect
    pub leverage: u32,
    /// Stop-loss price, if one is set
    pub stop_loss: Option<f64>,
    /// Take-profit price, if one is set
    pub take_profit: Option<f64>,
}

/// Exchange capability trait.
///
/// Plain pass-through to the venue API. No decision logic belongs here.
#[async_trait]
pub trait Exchange: Send + Sync {
    /// Get exchange name
    fn name(&self) -> &'static str;

    /// Get current price snapshot
    async fn get_ticker(&self, symbol: &str) -> Result<Ticker>;

    /// Get candles, oldest first
    async fn get_klines(&self, symbol: &str, interval: &str, limit: u32) -> Result<Vec<Candle>>;

    /// Set leverage for a symbol
    async fn set_leverage(&self, symbol: &str, leverage: u32) -> Result<()>;

    /// Open a long with a market order
    async fn buy(&self, symbol: &str, qty: &str) -> Result<Order>;

    /// Open a short with a market order
    async fn sell(&self, symbol: &str, qty: &str) -> Result<Order>;

    /// Get open positions for a symbol
    async fn get_positions(&self, symbol: &str) -> Result<Vec<Position>>;

    /// Close the open position for a symbol, if any
    async fn close_position(&self, symbol: &str) -> Result<Option<Order>>;

    /// Set the position stop-loss
    async fn set_stop_loss(&self, symbol: &str, price: f64) -> Result<()>;

    /// Set the position take-profit
    async fn set_take_profit(&self, symbol: &str, price: f64) -> Result<()>;
}

/// Build an exchange client from configuration.
pub fn build_exchange(config: &ExchangeConfig) -> Arc<dyn Exchange> {
    match config.kind {
        ExchangeKind::Bybit => Arc::new(BybitClient::new(config)),
        ExchangeKind::Binance => Arc::new(BinanceClient::new(config)),
    }
}

// ============================================================================
// Tests
// ============================================================================
