//! Market data read-side collaborator.

use std::sync::Arc;

use impulse_common::Result;

use crate::exchange::{Candle, Exchange};

/// Fetches prices and candles from the exchange.
pub struct Fetcher {
    exchange: Arc<dyn Exchange>,
}

impl Fetcher {
    /// Create a new fetcher over an exchange client.
    pub fn new(exchange: Arc<dyn Exchange>) -> Self {
        Self { exchange }
    }

    /// Get the last traded price for a symbol.
    pub async fn get_current_price(&self, symbol: &str) -> Result<f64> {
        let ticker = self.exchange.get_ticker(symbol).await?;
        Ok(ticker.last_price)
    }

    /// Get candles for a symbol, oldest first.
    pub async fn get_candles(
        &self,
        symbol: &str,
        interval: &str,
        limit: u32,
    ) -> Result<Vec<Candle>> {
        self.exchange.get_klines(symbol, interval, limit).await
    }
}
