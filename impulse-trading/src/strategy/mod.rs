//! Strategy core: one evaluation cycle per price sample.
//!
//! # Architecture
//!
//! ```text
//!        Strategy::tick(price)
//!               |
//!        PriceWindow::push
//!               |
//!        +------+-------+
//!        | flat         | in position
//!        v              v
//!   RiskGateState   PositionState
//!   Analyzer        compute_trailing_stop
//!        |              |
//!        v              v
//!   enter / blocked  update stop / close
//! ```
//!
//! The orchestrator never performs I/O itself; order placement goes through
//! the injected [`TradeExecutor`] and is skipped entirely in dry-run mode,
//! with every decision and state transition still executing.

mod analyzer;
mod risk;
mod window;

pub use analyzer::{Analyzer, AnalyzerConfig, Signal, SignalKind};
pub use risk::{
    compute_trailing_stop, trailing_offset_pct, PositionSide, PositionState, RiskGateState,
};
pub use window::{PriceWindow, WINDOW_CAPACITY};

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use impulse_common::config::StrategyConfig;
use impulse_common::Result;

use crate::trader::TradeExecutor;

/// Action taken by a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickAction {
    /// Nothing to do (no signal, or holding)
    None,
    /// Entry suppressed by the risk gate
    Blocked,
    /// Opened a long position
    EnterLong,
    /// Opened a short position
    EnterShort,
    /// Tightened the stop-loss
    UpdateStopLoss,
    /// Closed the position
    Close,
}

/// Outcome of one evaluation cycle, for logging and telemetry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickResult {
    /// What the tick did
    pub action: TickAction,
    /// Price the tick evaluated
    pub price: f64,
    /// Human-readable explanation
    pub details: String,
}

/// Snapshot of strategy state for status reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyStatus {
    pub in_position: bool,
    pub side: Option<PositionSide>,
    pub entry_price: f64,
    pub current_stop_loss: f64,
    pub losses_today: u32,
    pub max_losses_per_day: u32,
    pub blocked: bool,
    pub block_reason: Option<String>,
}

/// The decision/risk state machine.
///
/// Single-writer: one `tick` at a time, driven sequentially by the caller.
pub struct Strategy {
    config: StrategyConfig,
    trader: Arc<dyn TradeExecutor>,
    analyzer: Analyzer,
    window: PriceWindow,
    position: PositionState,
    gate: RiskGateState,
}

impl Strategy {
    /// Create a new strategy with empty state.
    pub fn new(config: StrategyConfig, trader: Arc<dyn TradeExecutor>) -> Self {
        let analyzer = Analyzer::new(AnalyzerConfig {
            spike_percent: config.entry_spike_percent,
            spikes_to_enter: config.spikes_to_enter,
        });

        Self {
            config,
            trader,
            analyzer,
            window: PriceWindow::new(),
            position: PositionState::default(),
            gate: RiskGateState::default(),
        }
    }

    /// Run one evaluation cycle for a freshly fetched price.
    ///
    /// Expected conditions (insufficient data, blocked, no signal) are
    /// ordinary results. An `Err` means an execution-collaborator call
    /// failed; the in-memory transition it belonged to is already committed.
    pub async fn tick(&mut self, current_price: f64) -> Result<TickResult> {
        self.window.push(current_price);

        if !self.position.in_position {
            self.check_entry(current_price).await
        } else {
            self.manage_position(current_price).await
        }
    }

    /// Current strategy status. Re-evaluates the gate, so the daily counter
    /// may reset here as well.
    pub fn status(&mut self) -> StrategyStatus {
        let block_reason = self.gate.check(Local::now(), &self.config);
        StrategyStatus {
            in_position: self.position.in_position,
            side: self.position.side,
            entry_price: self.position.entry_price,
            current_stop_loss: self.position.current_stop_loss,
            losses_today: self.gate.losses_today,
            max_losses_per_day: self.config.max_losses_per_day,
            blocked: block_reason.is_some(),
            block_reason,
        }
    }

    fn mode_label(&self) -> &'static str {
        if self.config.dry_run {
            "[DRY]"
        } else {
            "[LIVE]"
        }
    }

    // ========================================================================
    // Flat: entry path
    // ========================================================================

    async fn check_entry(&mut self, current_price: f64) -> Result<TickResult> {
        if let Some(reason) = self.gate.check(Local::now(), &self.config) {
            debug!(price = current_price, reason = %reason, "Entry blocked");
            return Ok(TickResult {
                action: TickAction::Blocked,
                price: current_price,
                details: reason,
            });
        }

        let signal = self.analyzer.check_entry(&self.window);

        match signal.kind {
            SignalKind::Long => {
                self.enter(current_price, PositionSide::Long).await?;
                Ok(TickResult {
                    action: TickAction::EnterLong,
                    price: current_price,
                    details: signal.reason,
                })
            }
            SignalKind::Short => {
                self.enter(current_price, PositionSide::Short).await?;
                Ok(TickResult {
                    action: TickAction::EnterShort,
                    price: current_price,
                    details: signal.reason,
                })
            }
            SignalKind::None => Ok(TickResult {
                action: TickAction::None,
                price: current_price,
                details: signal.reason,
            }),
        }
    }

    /// Open a position. The state transition commits before the collaborator
    /// calls; a remote failure propagates without rolling it back.
    async fn enter(&mut self, price: f64, side: PositionSide) -> Result<()> {
        self.position
            .open(side, price, self.config.initial_sl_percent);

        info!(
            symbol = %self.config.symbol,
            side = ?side,
            price,
            stop_loss = self.position.current_stop_loss,
            "{} Entered position",
            self.mode_label()
        );

        if !self.config.dry_run {
            match side {
                PositionSide::Long => {
                    self.trader
                        .enter_long(
                            &self.config.symbol,
                            self.config.amount_usdt,
                            self.config.leverage,
                        )
                        .await?;
                }
                PositionSide::Short => {
                    self.trader
                        .enter_short(
                            &self.config.symbol,
                            self.config.amount_usdt,
                            self.config.leverage,
                        )
                        .await?;
                }
            }
            self.trader
                .set_stop_loss(&self.config.symbol, self.position.current_stop_loss)
                .await?;
        }

        Ok(())
    }

    // ========================================================================
    // In position: management path
    // ========================================================================

    async fn manage_position(&mut self, current_price: f64) -> Result<TickResult> {
        self.position.track_extreme(current_price);

        if self.position.is_stop_hit(current_price) {
            let profit = self.position.profit_pct(current_price);
            let is_loss = profit < 0.0;
            self.close(is_loss).await?;
            return Ok(TickResult {
                action: TickAction::Close,
                price: current_price,
                details: format!("Stop loss hit, profit {:+.2}%", profit),
            });
        }

        let candidate = compute_trailing_stop(&self.config, &self.position, current_price);
        let improves = match self.position.side {
            Some(PositionSide::Long) => candidate > self.position.current_stop_loss,
            Some(PositionSide::Short) => candidate < self.position.current_stop_loss,
            None => false,
        };

        let profit = self.position.profit_pct(current_price);

        if improves {
            self.position.current_stop_loss = candidate;

            if !self.config.dry_run {
                self.trader
                    .set_stop_loss(&self.config.symbol, candidate)
                    .await?;
            }

            debug!(
                symbol = %self.config.symbol,
                stop_loss = candidate,
                profit,
                "{} Stop loss tightened",
                self.mode_label()
            );
            return Ok(TickResult {
                action: TickAction::UpdateStopLoss,
                price: current_price,
                details: format!(
                    "Stop loss -> {:.2} (profit {:+.2}%)",
                    candidate, profit
                ),
            });
        }

        Ok(TickResult {
            action: TickAction::None,
            price: current_price,
            details: format!(
                "Holding, profit {:+.2}%, stop {:.2}",
                profit, self.position.current_stop_loss
            ),
        })
    }

    /// Close the position. The state transition commits before the
    /// collaborator call; a remote failure propagates without rollback.
    async fn close(&mut self, is_loss: bool) -> Result<()> {
        if is_loss {
            self.gate.record_loss(Local::now());
            warn!(
                symbol = %self.config.symbol,
                losses_today = self.gate.losses_today,
                max_losses = self.config.max_losses_per_day,
                "{} Position closed at a loss",
                self.mode_label()
            );
        } else {
            info!(
                symbol = %self.config.symbol,
                "{} Position closed in profit",
                self.mode_label()
            );
        }

        self.position.reset();

        if !self.config.dry_run {
            self.trader.close(&self.config.symbol).await?;
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
