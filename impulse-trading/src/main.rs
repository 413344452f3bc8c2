//! Impulse Trading - momentum spike bot for USDT perpetual futures.
//!
//! Watches the price once per interval, enters on a streak of consecutive
//! same-direction spikes, and manages the position with a ratcheting
//! trailing stop-loss.

use anyhow::Result;
use std::sync::Arc;

use impulse_common::config::Config;
use impulse_common::logging::init_logging;
use impulse_trading::bot::startup_error;
use impulse_trading::exchange::build_exchange;
use impulse_trading::{Bot, Fetcher, Strategy, Trader};

#[tokio::main]
async fn main() -> Result<()> {
    // Start timing immediately for cold-start measurement
    let startup_start = std::time::Instant::now();

    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    init_logging(
        &config.observability.log_level,
        &config.observability.log_format,
    );

    tracing::info!("Impulse Trading v{}", env!("CARGO_PKG_VERSION"));

    // Live trading needs credentials; dry-run does not place orders
    if !config.strategy.dry_run
        && (config.exchange.api_key.is_empty() || config.exchange.api_secret.is_empty())
    {
        return Err(startup_error(
            "Live mode requires API credentials; set BYBIT_API_KEY and BYBIT_API_SECRET \
             or enable strategy.dry_run",
        ));
    }

    let exchange = build_exchange(&config.exchange);
    tracing::info!(
        exchange = exchange.name(),
        symbol = %config.strategy.symbol,
        testnet = config.exchange.testnet,
        dry_run = config.strategy.dry_run,
        "Exchange client ready"
    );

    let fetcher = Fetcher::new(Arc::clone(&exchange));
    let trader = Arc::new(Trader::new(exchange));
    let strategy = Strategy::new(config.strategy.clone(), trader);

    // Log startup timing before entering the run loop
    let startup_duration = startup_start.elapsed();
    tracing::info!(
        duration_ms = startup_duration.as_millis() as u64,
        "Bot initialized in {:?}",
        startup_duration
    );

    Bot::new(config, fetcher, strategy).run().await
}
