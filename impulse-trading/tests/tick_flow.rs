//! End-to-end tests for the tick evaluation flow.
//!
//! Drives the strategy through scripted price sequences and verifies the
//! full pipeline: window warmup → spike-streak entry → trailing stop ratchet
//! → close → loss gating. Execution goes through recording doubles so every
//! collaborator call is observable.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use impulse_common::config::StrategyConfig;
use impulse_common::{Error, Result};
use impulse_trading::exchange::{Candle, Exchange, Order, OrderSide, Position, Ticker};
use impulse_trading::strategy::{PositionSide, Strategy, TickAction};
use impulse_trading::trader::{TradeExecutor, Trader};
use impulse_trading::Fetcher;

// ============================================================================
// Test Utilities
// ============================================================================

/// Executor double that records every call in order.
struct RecordingExecutor {
    calls: Mutex<Vec<String>>,
    /// When set, entry orders fail with an exchange error
    fail_entries: bool,
}

impl RecordingExecutor {
    fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_entries: false,
        }
    }

    fn failing_entries() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_entries: true,
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn order(symbol: &str, side: OrderSide) -> Order {
        Order {
            order_id: "test-order".to_string(),
            symbol: symbol.to_string(),
            side,
            qty: "0.001".to_string(),
            status: "created".to_string(),
        }
    }
}

#[async_trait]
impl TradeExecutor for RecordingExecutor {
    async fn enter_long(&self, symbol: &str, _amount: f64, _leverage: u32) -> Result<Order> {
        self.record("enter_long");
        if self.fail_entries {
            return Err(Error::Exchange("order rejected".to_string()));
        }
        Ok(Self::order(symbol, OrderSide::Buy))
    }

    async fn enter_short(&self, symbol: &str, _amount: f64, _leverage: u32) -> Result<Order> {
        self.record("enter_short");
        if self.fail_entries {
            return Err(Error::Exchange("order rejected".to_string()));
        }
        Ok(Self::order(symbol, OrderSide::Sell))
    }

    async fn set_stop_loss(&self, _symbol: &str, price: f64) -> Result<()> {
        self.record(format!("set_stop_loss {:.4}", price));
        Ok(())
    }

    async fn close(&self, symbol: &str) -> Result<Option<Order>> {
        self.record("close");
        Ok(Some(Self::order(symbol, OrderSide::Sell)))
    }
}

/// Strategy config with deterministic test-friendly parameters.
fn test_config(dry_run: bool) -> StrategyConfig {
    StrategyConfig {
        dry_run,
        ..StrategyConfig::default()
    }
}

/// Strategy wired to a recording executor double.
fn strategy_with(config: StrategyConfig, executor: &Arc<RecordingExecutor>) -> Strategy {
    Strategy::new(config, Arc::clone(executor) as Arc<dyn TradeExecutor>)
}

/// Feed a price sequence through the strategy, collecting the actions.
async fn drive(strategy: &mut Strategy, prices: &[f64]) -> Vec<TickAction> {
    let mut actions = Vec::with_capacity(prices.len());
    for &price in prices {
        let result = strategy.tick(price).await.unwrap();
        actions.push(result.action);
    }
    actions
}

/// Warmup plus a two-spike up-streak: enters long on the third tick.
const LONG_ENTRY: [f64; 3] = [100.0, 100.6, 101.3];

// ============================================================================
// Entry Flow
// ============================================================================

#[tokio::test]
async fn test_warmup_then_long_entry() {
    let executor = Arc::new(RecordingExecutor::new());
    let mut strategy = strategy_with(test_config(false), &executor);

    let actions = drive(&mut strategy, &LONG_ENTRY).await;
    assert_eq!(
        actions,
        vec![TickAction::None, TickAction::None, TickAction::EnterLong]
    );

    let status = strategy.status();
    assert!(status.in_position);
    assert_eq!(status.side, Some(PositionSide::Long));
    assert!((status.entry_price - 101.3).abs() < 1e-9);
    // Initial stop 0.3% below entry
    assert!((status.current_stop_loss - 101.3 * 0.997).abs() < 1e-9);

    // Entry placed the order and the initial exchange-side stop
    let calls = executor.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0], "enter_long");
    assert!(calls[1].starts_with("set_stop_loss"));
}

#[tokio::test]
async fn test_down_streak_enters_short() {
    let executor = Arc::new(RecordingExecutor::new());
    let mut strategy = strategy_with(test_config(false), &executor);

    let actions = drive(&mut strategy, &[100.0, 99.4, 98.8]).await;
    assert_eq!(actions[2], TickAction::EnterShort);

    let status = strategy.status();
    assert_eq!(status.side, Some(PositionSide::Short));
    assert_eq!(executor.calls()[0], "enter_short");
}

#[tokio::test]
async fn test_broken_streak_never_enters() {
    let executor = Arc::new(RecordingExecutor::new());
    let mut strategy = strategy_with(test_config(false), &executor);

    // Second move is below the 0.5% threshold and breaks the streak
    let actions = drive(&mut strategy, &[100.0, 100.6, 100.7, 101.1]).await;
    assert!(actions.iter().all(|&a| a == TickAction::None));
    assert!(executor.calls().is_empty());
}

// ============================================================================
// Position Management
// ============================================================================

#[tokio::test]
async fn test_profitable_ride_ratchets_stop_and_closes() {
    let executor = Arc::new(RecordingExecutor::new());
    let mut strategy = strategy_with(test_config(false), &executor);

    drive(&mut strategy, &LONG_ENTRY).await;

    // Favorable ticks tighten the stop; the pullback crosses it
    let actions = drive(&mut strategy, &[102.4, 103.5, 102.0]).await;
    assert_eq!(
        actions,
        vec![
            TickAction::UpdateStopLoss,
            TickAction::UpdateStopLoss,
            TickAction::Close
        ]
    );

    // Closed in profit: no loss recorded, no gate engaged
    let status = strategy.status();
    assert!(!status.in_position);
    assert_eq!(status.losses_today, 0);
    assert!(!status.blocked);

    let calls = executor.calls();
    assert_eq!(calls.last().unwrap(), "close");
}

#[tokio::test]
async fn test_stop_never_regresses_across_ticks() {
    let executor = Arc::new(RecordingExecutor::new());
    let mut strategy = strategy_with(test_config(true), &executor);

    drive(&mut strategy, &LONG_ENTRY).await;

    // Mixed favorable and adverse ticks, all above the ratcheting stop
    let mut last_sl = strategy.status().current_stop_loss;
    for price in [102.0, 102.8, 102.5, 103.9, 103.4, 104.6] {
        strategy.tick(price).await.unwrap();
        let status = strategy.status();
        if !status.in_position {
            break;
        }
        assert!(
            status.current_stop_loss >= last_sl,
            "stop regressed at price {price}: {last_sl} -> {}",
            status.current_stop_loss
        );
        last_sl = status.current_stop_loss;
    }
}

#[tokio::test]
async fn test_breakeven_floor_after_trigger() {
    let executor = Arc::new(RecordingExecutor::new());
    let mut strategy = strategy_with(test_config(true), &executor);

    drive(&mut strategy, &LONG_ENTRY).await;

    // +1% profit is past the 0.3% breakeven trigger
    strategy.tick(102.4).await.unwrap();
    let status = strategy.status();
    assert!(status.current_stop_loss >= status.entry_price);
}

// ============================================================================
// Loss Gating
// ============================================================================

#[tokio::test]
async fn test_losing_close_engages_cooldown() {
    let executor = Arc::new(RecordingExecutor::new());
    let mut strategy = strategy_with(test_config(true), &executor);

    drive(&mut strategy, &LONG_ENTRY).await;

    // Adverse move through the initial stop closes at a loss
    let result = strategy.tick(100.5).await.unwrap();
    assert_eq!(result.action, TickAction::Close);

    let status = strategy.status();
    assert!(!status.in_position);
    assert_eq!(status.losses_today, 1);
    assert!(status.blocked);
    assert!(status.block_reason.unwrap().contains("Cooldown"));

    // A fresh streak cannot re-enter while the cooldown holds
    let actions = drive(&mut strategy, &[100.5, 101.1, 101.7]).await;
    assert!(actions.iter().all(|&a| a == TickAction::Blocked));
    // Dry-run: the whole trade ran without a single collaborator call
    assert!(executor.calls().is_empty());
}

#[tokio::test]
async fn test_daily_loss_cap_blocks_reentry() {
    let config = StrategyConfig {
        cooldown_minutes: 0,
        max_losses_per_day: 1,
        ..test_config(true)
    };
    let executor = Arc::new(RecordingExecutor::new());
    let mut strategy = strategy_with(config, &executor);

    drive(&mut strategy, &LONG_ENTRY).await;
    strategy.tick(100.5).await.unwrap(); // losing close

    // Cooldown is zero, so the daily cap is the active gate
    let result = strategy.tick(101.1).await.unwrap();
    assert_eq!(result.action, TickAction::Blocked);

    let status = strategy.status();
    assert_eq!(status.losses_today, 1);
    assert!(status.block_reason.unwrap().contains("Daily loss limit"));
}

// ============================================================================
// Collaborator Failures
// ============================================================================

#[tokio::test]
async fn test_failed_entry_order_keeps_committed_state() {
    let executor = Arc::new(RecordingExecutor::failing_entries());
    let mut strategy = strategy_with(test_config(false), &executor);

    strategy.tick(100.0).await.unwrap();
    strategy.tick(100.6).await.unwrap();

    // The order fails, the error surfaces, and the in-memory transition
    // stays committed: the exchange is the source of truth, not us
    let err = strategy.tick(101.3).await.unwrap_err();
    assert!(matches!(err, Error::Exchange(_)));

    let status = strategy.status();
    assert!(status.in_position);
    assert_eq!(status.side, Some(PositionSide::Long));
}

// ============================================================================
// Dry-Run Equivalence
// ============================================================================

#[tokio::test]
async fn test_dry_run_matches_live_decisions() {
    // Full trade: warmup, entry, two stop updates, profitable close, then a
    // fresh entry attempt after the flat transition
    let prices = [100.0, 100.6, 101.3, 102.4, 103.5, 102.0, 102.6, 103.2];

    let dry_executor = Arc::new(RecordingExecutor::new());
    let live_executor = Arc::new(RecordingExecutor::new());
    let mut dry = strategy_with(test_config(true), &dry_executor);
    let mut live = strategy_with(test_config(false), &live_executor);

    let dry_actions = drive(&mut dry, &prices).await;
    let live_actions = drive(&mut live, &prices).await;

    // Identical decision trajectories
    assert_eq!(dry_actions, live_actions);

    // Identical end state
    let dry_status = dry.status();
    let live_status = live.status();
    assert_eq!(dry_status.in_position, live_status.in_position);
    assert_eq!(dry_status.side, live_status.side);
    assert!((dry_status.entry_price - live_status.entry_price).abs() < 1e-9);
    assert!((dry_status.current_stop_loss - live_status.current_stop_loss).abs() < 1e-9);
    assert_eq!(dry_status.losses_today, live_status.losses_today);

    // The only difference: whether collaborator calls were issued
    assert!(dry_executor.calls().is_empty());
    assert!(!live_executor.calls().is_empty());
}

// ============================================================================
// Full Pipeline (exchange-level double)
// ============================================================================

/// Exchange double with a scriptable price and order counters.
struct ScriptedExchange {
    price: Mutex<f64>,
    buy_calls: AtomicU32,
    stop_loss_calls: AtomicU32,
}

impl ScriptedExchange {
    fn new(price: f64) -> Self {
        Self {
            price: Mutex::new(price),
            buy_calls: AtomicU32::new(0),
            stop_loss_calls: AtomicU32::new(0),
        }
    }

    fn set_price(&self, price: f64) {
        *self.price.lock().unwrap() = price;
    }
}

#[async_trait]
impl Exchange for ScriptedExchange {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn get_ticker(&self, symbol: &str) -> Result<Ticker> {
        let price = *self.price.lock().unwrap();
        Ok(Ticker {
            symbol: symbol.to_string(),
            last_price: price,
            bid: price,
            ask: price,
            volume_24h: 0.0,
        })
    }

    async fn get_klines(&self, _symbol: &str, _interval: &str, _limit: u32) -> Result<Vec<Candle>> {
        Ok(vec![])
    }

    async fn set_leverage(&self, _symbol: &str, _leverage: u32) -> Result<()> {
        Ok(())
    }

    async fn buy(&self, symbol: &str, qty: &str) -> Result<Order> {
        self.buy_calls.fetch_add(1, Ordering::Relaxed);
        Ok(Order {
            order_id: "scripted-order".to_string(),
            symbol: symbol.to_string(),
            side: OrderSide::Buy,
            qty: qty.to_string(),
            status: "created".to_string(),
        })
    }

    async fn sell(&self, _symbol: &str, _qty: &str) -> Result<Order> {
        Err(Error::Unsupported("sell".into()))
    }

    async fn get_positions(&self, _symbol: &str) -> Result<Vec<Position>> {
        Ok(vec![])
    }

    async fn close_position(&self, _symbol: &str) -> Result<Option<Order>> {
        Ok(None)
    }

    async fn set_stop_loss(&self, _symbol: &str, _price: f64) -> Result<()> {
        self.stop_loss_calls.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn set_take_profit(&self, _symbol: &str, _price: f64) -> Result<()> {
        Err(Error::Unsupported("set_take_profit".into()))
    }
}

#[tokio::test]
async fn test_fetch_tick_execute_through_real_trader() {
    let exchange = Arc::new(ScriptedExchange::new(100.0));
    let fetcher = Fetcher::new(Arc::clone(&exchange) as Arc<dyn Exchange>);
    let trader = Arc::new(Trader::new(Arc::clone(&exchange) as Arc<dyn Exchange>));
    let mut strategy = Strategy::new(test_config(false), trader);

    // One cycle per sample, the way the run loop drives it
    for price in LONG_ENTRY {
        exchange.set_price(price);
        let fetched = fetcher.get_current_price("BTCUSDT").await.unwrap();
        assert!((fetched - price).abs() < 1e-9);
        strategy.tick(fetched).await.unwrap();
    }

    assert!(strategy.status().in_position);
    // Market order placed once, stop set once at entry
    assert_eq!(exchange.buy_calls.load(Ordering::Relaxed), 1);
    assert_eq!(exchange.stop_loss_calls.load(Ordering::Relaxed), 1);
}
