//! Interval-driven run loop.
//!
//! One cycle per interval: fetch the current price, hand it to the strategy,
//! log the outcome. Collaborator failures are logged and retried after a
//! short backoff; the loop stops on ctrl-c.

use std::time::Duration;

use anyhow::Result;
use tracing::{debug, error, info, warn};

use impulse_common::config::Config;

use crate::fetcher::Fetcher;
use crate::strategy::{Strategy, TickAction, TickResult};

/// The bot: fetch, tick, log, repeat.
pub struct Bot {
    config: Config,
    fetcher: Fetcher,
    strategy: Strategy,
}

impl Bot {
    /// Create a new bot.
    pub fn new(config: Config, fetcher: Fetcher, strategy: Strategy) -> Self {
        Self {
            config,
            fetcher,
            strategy,
        }
    }

    /// Run until ctrl-c.
    pub async fn run(mut self) -> Result<()> {
        info!(
            symbol = %self.config.strategy.symbol,
            interval_secs = self.config.bot.interval_secs,
            dry_run = self.config.strategy.dry_run,
            "Bot started"
        );

        self.log_market_snapshot().await;

        let mut interval =
            tokio::time::interval(Duration::from_secs(self.config.bot.interval_secs));

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received, stopping");
                    break;
                }
                _ = interval.tick() => {
                    match self.step().await {
                        Ok(result) => self.log_result(&result),
                        Err(e) => {
                            warn!(error = %e, "Tick failed");
                            tokio::time::sleep(Duration::from_secs(
                                self.config.bot.error_backoff_secs,
                            ))
                            .await;
                        }
                    }
                }
            }
        }

        let status = self.strategy.status();
        if status.in_position {
            warn!(
                side = ?status.side,
                entry_price = status.entry_price,
                stop_loss = status.current_stop_loss,
                "Stopping with a position still open; the exchange-side stop remains in place"
            );
        }

        info!("Bot stopped");
        Ok(())
    }

    /// One evaluation cycle.
    async fn step(&mut self) -> Result<TickResult> {
        let price = self
            .fetcher
            .get_current_price(&self.config.strategy.symbol)
            .await?;
        let result = self.strategy.tick(price).await?;
        Ok(result)
    }

    /// Log recent market context once at startup.
    async fn log_market_snapshot(&self) {
        let candles = self
            .fetcher
            .get_candles(
                &self.config.strategy.symbol,
                &self.config.bot.candle_interval,
                10,
            )
            .await;

        match candles {
            Ok(candles) if !candles.is_empty() => {
                let high = candles.iter().map(|c| c.high).fold(f64::MIN, f64::max);
                let low = candles.iter().map(|c| c.low).fold(f64::MAX, f64::min);
                let last_close = candles.last().map(|c| c.close).unwrap_or(0.0);
                info!(
                    symbol = %self.config.strategy.symbol,
                    candles = candles.len(),
                    interval = %self.config.bot.candle_interval,
                    high,
                    low,
                    last_close,
                    "Market snapshot"
                );
            }
            Ok(_) => debug!("No candles returned for market snapshot"),
            Err(e) => warn!(error = %e, "Market snapshot failed"),
        }
    }

    /// Log a tick result at a level matching its significance.
    fn log_result(&self, result: &TickResult) {
        match result.action {
            TickAction::None => {
                debug!(price = result.price, details = %result.details, "Tick");
            }
            TickAction::Blocked => {
                info!(price = result.price, details = %result.details, "Entry blocked");
            }
            TickAction::EnterLong | TickAction::EnterShort => {
                info!(
                    action = ?result.action,
                    price = result.price,
                    details = %result.details,
                    "Entered position"
                );
            }
            TickAction::UpdateStopLoss => {
                info!(price = result.price, details = %result.details, "Stop loss updated");
            }
            TickAction::Close => {
                info!(price = result.price, details = %result.details, "Position closed");
            }
        }
    }
}

/// Log a fatal startup error and return it, so `main` stays terse.
pub fn startup_error(message: &str) -> anyhow::Error {
    error!("{message}");
    anyhow::anyhow!(message.to_string())
}
