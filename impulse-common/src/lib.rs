//! Shared foundation for the Impulse trading bot.
//!
//! Holds the pieces both the binary and the trading library need:
//! configuration loading, the workspace error type, and logging setup.

#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
