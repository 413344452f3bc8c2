//! Configuration management for the Impulse trading bot.
//!
//! Configuration lives in a single JSON file at `~/.impulse/config.json`.
//!
//! # Configuration Priority
//!
//! 1. Environment variables
//! 2. Explicit config file values
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! - `BYBIT_API_KEY` → exchange.api_key
//! - `BYBIT_API_SECRET` → exchange.api_secret
//! - `BYBIT_TESTNET` → exchange.testnet
//! - `IMPULSE_DRY_RUN` → strategy.dry_run
//! - `IMPULSE_LOG_LEVEL` → observability.log_level

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".impulse"),
        |dirs| dirs.home_dir().join(".impulse"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

// ============================================================================
// Exchange Configuration
// ============================================================================

/// Supported exchange backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeKind {
    Bybit,
    Binance,
}

impl Default for ExchangeKind {
    fn default() -> Self {
        Self::Bybit
    }
}

/// Exchange connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    /// Which exchange client to use
    #[serde(default)]
    pub kind: ExchangeKind,

    /// API key
    #[serde(default)]
    pub api_key: String,

    /// API secret
    #[serde(default)]
    pub api_secret: String,

    /// Use the exchange testnet instead of mainnet
    #[serde(default = "default_testnet")]
    pub testnet: bool,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            kind: ExchangeKind::default(),
            api_key: String::new(),
            api_secret: String::new(),
            testnet: default_testnet(),
        }
    }
}

fn default_testnet() -> bool {
    true
}

// ============================================================================
// Strategy Configuration
// ============================================================================

/// Strategy parameters, immutable after startup.
///
/// Percent fields are expressed in percent units (0.5 means 0.5%).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Trading pair
    #[serde(default = "default_symbol")]
    pub symbol: String,

    /// Position notional in quote currency (USDT)
    #[serde(default = "default_amount_usdt")]
    pub amount_usdt: f64,

    /// Leverage multiplier
    #[serde(default = "default_leverage")]
    pub leverage: u32,

    /// Single-interval move that counts as a spike
    #[serde(default = "default_entry_spike_percent")]
    pub entry_spike_percent: f64,

    /// Consecutive same-direction spikes required to enter
    #[serde(default = "default_spikes_to_enter")]
    pub spikes_to_enter: usize,

    /// Initial stop-loss offset from the entry price
    #[serde(default = "default_initial_sl_percent")]
    pub initial_sl_percent: f64,

    /// Profit at which the stop moves to breakeven
    #[serde(default = "default_breakeven_trigger")]
    pub breakeven_trigger: f64,

    /// Trailing offset while peak profit is below 2%
    #[serde(default = "default_trailing_tight")]
    pub trailing_tight: f64,

    /// Trailing offset for peak profit in [2%, 5%)
    #[serde(default = "default_trailing_medium")]
    pub trailing_medium: f64,

    /// Trailing offset for peak profit in [5%, 10%)
    #[serde(default = "default_trailing_normal")]
    pub trailing_normal: f64,

    /// Trailing offset once peak profit reaches 10%
    #[serde(default = "default_trailing_loose")]
    pub trailing_loose: f64,

    /// Peak profit that arms the guaranteed minimum lock
    #[serde(default = "default_guaranteed_trigger")]
    pub guaranteed_trigger: f64,

    /// Profit locked in once the guarantee is armed
    #[serde(default = "default_guaranteed_min")]
    pub guaranteed_min: f64,

    /// Minutes to wait after a losing close before re-entering
    #[serde(default = "default_cooldown_minutes")]
    pub cooldown_minutes: u64,

    /// Maximum losing closures allowed per calendar day
    #[serde(default = "default_max_losses_per_day")]
    pub max_losses_per_day: u32,

    /// Run all decision logic but place no real orders
    #[serde(default = "default_dry_run")]
    pub dry_run: bool,
}

fn default_symbol() -> String {
    "BTCUSDT".to_string()
}
fn default_amount_usdt() -> f64 {
    100.0
}
fn default_leverage() -> u32 {
    1
}
fn default_entry_spike_percent() -> f64 {
    0.5
}
fn default_spikes_to_enter() -> usize {
    2
}
fn default_initial_sl_percent() -> f64 {
    0.3
}
fn default_breakeven_trigger() -> f64 {
    0.3
}
fn default_trailing_tight() -> f64 {
    0.30
}
fn default_trailing_medium() -> f64 {
    0.28
}
fn default_trailing_normal() -> f64 {
    0.25
}
fn default_trailing_loose() -> f64 {
    0.20
}
fn default_guaranteed_trigger() -> f64 {
    10.0
}
fn default_guaranteed_min() -> f64 {
    5.0
}
fn default_cooldown_minutes() -> u64 {
    15
}
fn default_max_losses_per_day() -> u32 {
    3
}
fn default_dry_run() -> bool {
    true
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            symbol: default_symbol(),
            amount_usdt: default_amount_usdt(),
            leverage: default_leverage(),
            entry_spike_percent: default_entry_spike_percent(),
            spikes_to_enter: default_spikes_to_enter(),
            initial_sl_percent: default_initial_sl_percent(),
            breakeven_trigger: default_breakeven_trigger(),
            trailing_tight: default_trailing_tight(),
            trailing_medium: default_trailing_medium(),
            trailing_normal: default_trailing_normal(),
            trailing_loose: default_trailing_loose(),
            guaranteed_trigger: default_guaranteed_trigger(),
            guaranteed_min: default_guaranteed_min(),
            cooldown_minutes: default_cooldown_minutes(),
            max_losses_per_day: default_max_losses_per_day(),
            dry_run: default_dry_run(),
        }
    }
}

impl StrategyConfig {
    /// Validate strategy parameters. Called once at startup.
    pub fn validate(&self) -> Result<()> {
        if self.symbol.is_empty() {
            anyhow::bail!("strategy.symbol must not be empty");
        }
        if self.amount_usdt <= 0.0 {
            anyhow::bail!("strategy.amount_usdt must be positive");
        }
        if self.leverage < 1 {
            anyhow::bail!("strategy.leverage must be at least 1");
        }
        if self.entry_spike_percent <= 0.0 {
            anyhow::bail!("strategy.entry_spike_percent must be positive");
        }
        if self.spikes_to_enter == 0 {
            anyhow::bail!("strategy.spikes_to_enter must be at least 1");
        }
        if self.initial_sl_percent <= 0.0 {
            anyhow::bail!("strategy.initial_sl_percent must be positive");
        }
        for (name, value) in [
            ("trailing_tight", self.trailing_tight),
            ("trailing_medium", self.trailing_medium),
            ("trailing_normal", self.trailing_normal),
            ("trailing_loose", self.trailing_loose),
        ] {
            if value <= 0.0 {
                anyhow::bail!("strategy.{name} must be positive");
            }
        }
        if self.guaranteed_min > self.guaranteed_trigger {
            anyhow::bail!("strategy.guaranteed_min must not exceed strategy.guaranteed_trigger");
        }
        if self.max_losses_per_day == 0 {
            anyhow::bail!("strategy.max_losses_per_day must be at least 1");
        }
        Ok(())
    }
}

// ============================================================================
// Bot Loop Configuration
// ============================================================================

/// Run-loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Seconds between evaluation ticks
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Seconds to wait after a failed tick before retrying
    #[serde(default = "default_error_backoff_secs")]
    pub error_backoff_secs: u64,

    /// Candle interval used for the startup market snapshot
    #[serde(default = "default_candle_interval")]
    pub candle_interval: String,
}

fn default_interval_secs() -> u64 {
    60
}
fn default_error_backoff_secs() -> u64 {
    10
}
fn default_candle_interval() -> String {
    "5".to_string()
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            error_backoff_secs: default_error_backoff_secs(),
            candle_interval: default_candle_interval(),
        }
    }
}

// ============================================================================
// Observability Configuration
// ============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Base log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Output format: "pretty" or "json"
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration for the bot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Exchange connection
    #[serde(default)]
    pub exchange: ExchangeConfig,

    /// Strategy parameters
    #[serde(default)]
    pub strategy: StrategyConfig,

    /// Run-loop settings
    #[serde(default)]
    pub bot: BotConfig,

    /// Logging settings
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from the default path, apply environment
    /// overrides, and validate.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&config_path())?;
        config.apply_env_overrides();
        config.strategy.validate()?;
        Ok(config)
    }

    /// Load configuration from an explicit path. Missing file yields defaults.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("BYBIT_API_KEY") {
            self.exchange.api_key = key;
        }
        if let Ok(secret) = std::env::var("BYBIT_API_SECRET") {
            self.exchange.api_secret = secret;
        }
        if let Ok(testnet) = std::env::var("BYBIT_TESTNET") {
            self.exchange.testnet = testnet.eq_ignore_ascii_case("true");
        }
        if let Ok(dry_run) = std::env::var("IMPULSE_DRY_RUN") {
            self.strategy.dry_run = dry_run.eq_ignore_ascii_case("true");
        }
        if let Ok(level) = std::env::var("IMPULSE_LOG_LEVEL") {
            self.observability.log_level = level;
        }
    }

    /// Save configuration to the default path.
    pub fn save(&self) -> Result<()> {
        let dir = config_dir();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create config dir: {}", dir.display()))?;

        let contents = serde_json::to_string_pretty(self)?;
        fs::write(config_path(), contents).context("Failed to write config file")?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_strategy_config() {
        let config = StrategyConfig::default();
        assert_eq!(config.symbol, "BTCUSDT");
        assert_eq!(config.spikes_to_enter, 2);
        assert!((config.entry_spike_percent - 0.5).abs() < f64::EPSILON);
        assert!((config.trailing_loose - 0.20).abs() < f64::EPSILON);
        assert_eq!(config.cooldown_minutes, 15);
        assert_eq!(config.max_losses_per_day, 3);
        assert!(config.dry_run);
    }

    #[test]
    fn test_default_validates() {
        StrategyConfig::default().validate().unwrap();
    }

    #[test]
    fn test_validation_rejects_zero_spikes() {
        let config = StrategyConfig {
            spikes_to_enter: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_negative_threshold() {
        let config = StrategyConfig {
            entry_spike_percent: -0.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_inverted_guarantee() {
        let config = StrategyConfig {
            guaranteed_trigger: 2.0,
            guaranteed_min: 5.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("missing.json")).unwrap();
        assert_eq!(config.strategy.symbol, "BTCUSDT");
        assert!(config.exchange.testnet);
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"strategy": {"symbol": "ETHUSDT", "spikes_to_enter": 3}}"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.strategy.symbol, "ETHUSDT");
        assert_eq!(config.strategy.spikes_to_enter, 3);
        // Untouched fields keep defaults
        assert!((config.strategy.amount_usdt - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_load_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.strategy.symbol, config.strategy.symbol);
        assert_eq!(parsed.exchange.kind, ExchangeKind::Bybit);
    }

    #[test]
    fn test_exchange_kind_serialization() {
        let json = serde_json::to_string(&ExchangeKind::Binance).unwrap();
        assert_eq!(json, "\"binance\"");
    }
}
