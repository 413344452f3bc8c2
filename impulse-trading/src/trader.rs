//! Trade execution collaborator.
//!
//! Only executes commands: open long, open short, move the stop, close.
//! Converts quote-currency notional into base quantity. No decision logic
//! lives here — the strategy decides, the trader obeys.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use impulse_common::Result;

use crate::exchange::{Exchange, Order, Position};

/// Execution interface the strategy core depends on.
///
/// The concrete [`Trader`] talks to a real exchange; tests substitute
/// recording doubles. Each call may fail with a transport or API error;
/// callers surface the failure without retrying.
#[async_trait]
pub trait TradeExecutor: Send + Sync {
    /// Open a long position sized by quote-currency notional.
    async fn enter_long(&self, symbol: &str, amount_usdt: f64, leverage: u32) -> Result<Order>;

    /// Open a short position sized by quote-currency notional.
    async fn enter_short(&self, symbol: &str, amount_usdt: f64, leverage: u32) -> Result<Order>;

    /// Move the exchange-side stop-loss for the open position.
    async fn set_stop_loss(&self, symbol: &str, price: f64) -> Result<()>;

    /// Close the open position, if any.
    async fn close(&self, symbol: &str) -> Result<Option<Order>>;
}

/// Order executor over an exchange client.
pub struct Trader {
    exchange: Arc<dyn Exchange>,
}

impl Trader {
    /// Create a new trader over an exchange client.
    pub fn new(exchange: Arc<dyn Exchange>) -> Self {
        Self { exchange }
    }

    /// Convert a quote-currency amount into base quantity at the last price.
    async fn usdt_to_qty(&self, symbol: &str, amount_usdt: f64) -> Result<String> {
        let ticker = self.exchange.get_ticker(symbol).await?;
        let qty = amount_usdt / ticker.last_price;
        debug!(symbol, amount_usdt, last_price = ticker.last_price, qty, "Sized order");
        Ok(format!("{:.3}", qty))
    }

    /// Get the current open position for a symbol, if any.
    pub async fn get_position(&self, symbol: &str) -> Result<Option<Position>> {
        let positions = self.exchange.get_positions(symbol).await?;
        Ok(positions.into_iter().next())
    }
}

#[async_trait]
impl TradeExecutor for Trader {
    async fn enter_long(&self, symbol: &str, amount_usdt: f64, leverage: u32) -> Result<Order> {
        if leverage > 1 {
            self.exchange.set_leverage(symbol, leverage).await?;
        }

        let qty = self.usdt_to_qty(symbol, amount_usdt).await?;
        let order = self.exchange.buy(symbol, &qty).await?;
        info!(symbol, qty = %order.qty, order_id = %order.order_id, "Long order placed");
        Ok(order)
    }

    async fn enter_short(&self, symbol: &str, amount_usdt: f64, leverage: u32) -> Result<Order> {
        if leverage > 1 {
            self.exchange.set_leverage(symbol, leverage).await?;
        }

        let qty = self.usdt_to_qty(symbol, amount_usdt).await?;
        let order = self.exchange.sell(symbol, &qty).await?;
        info!(symbol, qty = %order.qty, order_id = %order.order_id, "Short order placed");
        Ok(order)
    }

    async fn set_stop_loss(&self, symbol: &str, price: f64) -> Result<()> {
        self.exchange.set_stop_loss(symbol, price).await
    }

    async fn close(&self, symbol: &str) -> Result<Option<Order>> {
        let order = self.exchange.close_position(symbol).await?;
        if let Some(ref order) = order {
            info!(symbol, order_id = %order.order_id, "Position closed");
        }
        Ok(order)
    }
}

// ============================================================================
// Tests
// ============================================================================
