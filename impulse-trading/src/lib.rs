//! Impulse Trading Library
//!
//! Momentum spike trading bot for USDT perpetual futures: enters on a streak
//! of consecutive same-direction price spikes, then manages the open position
//! with a ratcheting trailing stop-loss until it closes.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     impulse-trading                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐   ┌────────────────┐   ┌─────────────────┐  │
//! │  │  Fetcher  │──▶│    Strategy    │──▶│     Trader      │  │
//! │  │ (prices)  │   │ (tick machine) │   │  (execution)    │  │
//! │  └─────┬─────┘   └────────────────┘   └────────┬────────┘  │
//! │        │                                       │           │
//! │        └──────────────┐       ┌────────────────┘           │
//! │                       ▼       ▼                            │
//! │                  ┌─────────────────┐                       │
//! │                  │ Exchange trait  │                       │
//! │                  │ (Bybit/Binance) │                       │
//! │                  └─────────────────┘                       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Concepts
//!
//! ## Spike streak entry
//! - A *spike* is a single-interval move at or beyond the configured percent
//! - A contiguous run of same-direction spikes triggers a long or short entry
//! - Any non-qualifying interval breaks the streak
//!
//! ## Stop-loss ratchet
//! - Initial stop placed a fixed percent from entry
//! - Past the breakeven trigger, the stop climbs through breakeven, banded
//!   trailing, and guaranteed-minimum candidates
//! - The stop only ever moves in the profit-favorable direction
//!
//! ## Loss gating
//! - A losing close starts a cooldown during which entries are blocked
//! - A daily loss cap halts entries for the rest of the calendar day

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod bot;
pub mod exchange;
pub mod fetcher;
pub mod strategy;
pub mod trader;

pub use bot::Bot;
pub use fetcher::Fetcher;
pub use strategy::{Strategy, StrategyStatus, TickAction, TickResult};
pub use trader::{TradeExecutor, Trader};
