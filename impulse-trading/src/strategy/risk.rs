//! Position lifecycle and risk state.
//!
//! Owns the open-position state machine and the entry gate. The stop-loss
//! level is a ratchet: once set it only ever moves in the direction favorable
//! to the position. Candidates considered on every recomputation:
//!
//! - breakeven (the entry price), once profit reaches the breakeven trigger
//! - a trailing offset from the favorable extreme, offset chosen by the
//!   peak-profit band
//! - a guaranteed minimum lock, once peak profit reaches its trigger
//!
//! The most favorable candidate wins; a less favorable candidate never
//! replaces the current stop.

use chrono::{DateTime, Duration, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use impulse_common::config::StrategyConfig;

/// Side of an open position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSide {
    Long,
    Short,
}

// ============================================================================
// Position State
// ============================================================================

/// State of the current trade. Empty while flat.
#[derive(Debug, Clone, Default)]
pub struct PositionState {
    /// Whether a position is open
    pub in_position: bool,
    /// Side of the open position; meaningful only while in_position
    pub side: Option<PositionSide>,
    /// Entry price
    pub entry_price: f64,
    /// Running max for longs, running min for shorts, since entry
    pub extreme_price: f64,
    /// Current stop-loss level
    pub current_stop_loss: f64,
}

impl PositionState {
    /// Populate the state for a fresh entry and set the initial stop.
    pub fn open(&mut self, side: PositionSide, price: f64, initial_sl_percent: f64) {
        let offset = price * (initial_sl_percent / 100.0);

        self.in_position = true;
        self.side = Some(side);
        self.entry_price = price;
        self.extreme_price = price;
        self.current_stop_loss = match side {
            PositionSide::Long => price - offset,
            PositionSide::Short => price + offset,
        };
    }

    /// Reset to empty. Called on every close.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Advance the favorable extreme. Never regresses.
    pub fn track_extreme(&mut self, price: f64) {
        match self.side {
            Some(PositionSide::Long) if price > self.extreme_price => {
                self.extreme_price = price;
            }
            Some(PositionSide::Short) if price < self.extreme_price => {
                self.extreme_price = price;
            }
            _ => {}
        }
    }

    /// Profit percentage at the given price.
    pub fn profit_pct(&self, price: f64) -> f64 {
        if self.entry_price == 0.0 {
            return 0.0;
        }
        match self.side {
            Some(PositionSide::Long) => (price - self.entry_price) / self.entry_price * 100.0,
            Some(PositionSide::Short) => (self.entry_price - price) / self.entry_price * 100.0,
            None => 0.0,
        }
    }

    /// Profit percentage at the favorable extreme.
    pub fn peak_profit_pct(&self) -> f64 {
        self.profit_pct(self.extreme_price)
    }

    /// Whether the price has crossed the stop on the adverse side.
    pub fn is_stop_hit(&self, price: f64) -> bool {
        match self.side {
            Some(PositionSide::Long) => price <= self.current_stop_loss,
            Some(PositionSide::Short) => price >= self.current_stop_loss,
            None => false,
        }
    }
}

// ============================================================================
// Trailing Stop
// ============================================================================

/// Trailing offset (percent) for the given peak profit, from the four
/// configured bands.
pub fn trailing_offset_pct(config: &StrategyConfig, peak_profit: f64) -> f64 {
    if peak_profit < 2.0 {
        config.trailing_tight
    } else if peak_profit < 5.0 {
        config.trailing_medium
    } else if peak_profit < 10.0 {
        config.trailing_normal
    } else {
        config.trailing_loose
    }
}

/// Compute the stop-loss candidate for the current tick.
///
/// Returns the existing stop unchanged while profit is below the breakeven
/// trigger. Otherwise returns the most favorable of the applicable
/// candidates; the caller applies it only when it improves on the current
/// stop.
pub fn compute_trailing_stop(
    config: &StrategyConfig,
    position: &PositionState,
    current_price: f64,
) -> f64 {
    let Some(side) = position.side else {
        return position.current_stop_loss;
    };

    let profit = position.profit_pct(current_price);
    let peak_profit = position.peak_profit_pct();
    let entry = position.entry_price;

    // No tightening before breakeven
    if profit < config.breakeven_trigger {
        return position.current_stop_loss;
    }

    let breakeven_sl = entry;

    let offset_pct = trailing_offset_pct(config, peak_profit);
    let offset = position.extreme_price * (offset_pct / 100.0);
    let trailing_sl = match side {
        PositionSide::Long => position.extreme_price - offset,
        PositionSide::Short => position.extreme_price + offset,
    };

    let guaranteed_sl = (peak_profit >= config.guaranteed_trigger).then(|| {
        let g_offset = entry * (config.guaranteed_min / 100.0);
        match side {
            PositionSide::Long => entry + g_offset,
            PositionSide::Short => entry - g_offset,
        }
    });

    let mut candidates = vec![breakeven_sl, trailing_sl];
    if let Some(sl) = guaranteed_sl {
        candidates.push(sl);
    }

    match side {
        PositionSide::Long => candidates.into_iter().fold(f64::MIN, f64::max),
        PositionSide::Short => candidates.into_iter().fold(f64::MAX, f64::min),
    }
}

// ============================================================================
// Entry Gate
// ============================================================================

/// Loss bookkeeping that gates re-entry. Process-lifetime state.
#[derive(Debug, Clone, Default)]
pub struct RiskGateState {
    /// Losing closures recorded today
    pub losses_today: u32,
    /// Calendar day the counter belongs to
    pub last_loss_date: Option<NaiveDate>,
    /// Time of the most recent losing close
    pub last_loss_time: Option<DateTime<Local>>,
}

impl RiskGateState {
    /// Check the gate. Returns the blocking reason, or `None` when entries
    /// may proceed.
    ///
    /// The daily counter resets here, the first time a check runs on a new
    /// calendar day — re-evaluated on every call, never timer-driven.
    pub fn check(&mut self, now: DateTime<Local>, config: &StrategyConfig) -> Option<String> {
        let today = now.date_naive();

        if self.last_loss_date != Some(today) {
            self.losses_today = 0;
            self.last_loss_date = Some(today);
        }

        if self.losses_today >= config.max_losses_per_day {
            return Some(format!(
                "Daily loss limit reached ({}/{})",
                self.losses_today, config.max_losses_per_day
            ));
        }

        if let Some(last_loss) = self.last_loss_time {
            let cooldown_end = last_loss + Duration::minutes(config.cooldown_minutes as i64);
            if now < cooldown_end {
                let remaining = (cooldown_end - now).num_minutes();
                return Some(format!("Cooldown: {} min remaining", remaining));
            }
        }

        None
    }

    /// Record a losing close.
    pub fn record_loss(&mut self, now: DateTime<Local>) {
        self.losses_today += 1;
        self.last_loss_date = Some(now.date_naive());
        self.last_loss_time = Some(now);
    }
}

// ============================================================================
// Tests
// ============================================================================
