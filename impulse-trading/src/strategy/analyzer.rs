//! Entry signal detection from the rolling price window.
//!
//! A *spike* is a single-interval percentage move at or beyond the configured
//! threshold. A *streak* is a run of consecutive same-direction spikes; any
//! non-qualifying interval breaks it. A streak of `spikes_to_enter` fires a
//! signal in that direction.

use serde::{Deserialize, Serialize};

use super::window::PriceWindow;

/// Detector parameters.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Single-interval move (percent) that counts as a spike
    pub spike_percent: f64,
    /// Consecutive spikes required to enter
    pub spikes_to_enter: usize,
}

/// Signal direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    Long,
    Short,
    None,
}

/// Entry signal produced fresh on every check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    /// Direction, or `None` when no entry is justified
    pub kind: SignalKind,
    /// Latest price the decision was based on
    pub price: f64,
    /// Human-readable explanation
    pub reason: String,
}

impl Signal {
    fn none(price: f64, reason: String) -> Self {
        Self {
            kind: SignalKind::None,
            price,
            reason,
        }
    }
}

/// Stateless entry detector.
///
/// Pure over its input window: the same window always yields the same signal.
pub struct Analyzer {
    config: AnalyzerConfig,
}

impl Analyzer {
    /// Create a new analyzer.
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    /// Check the window for an entry signal.
    ///
    /// Needs `spikes_to_enter + 1` samples; with fewer, returns a `None`
    /// signal explaining the shortfall rather than an error.
    pub fn check_entry(&self, window: &PriceWindow) -> Signal {
        let needed = self.config.spikes_to_enter + 1;
        let latest = window.latest().unwrap_or(0.0);

        if window.len() < needed {
            return Signal::none(
                latest,
                format!("Insufficient data: {}/{} samples", window.len(), needed),
            );
        }

        let prices = window.tail(needed);
        let threshold = self.config.spike_percent;

        let mut up_streak = 0usize;
        let mut down_streak = 0usize;
        let mut last_change = 0.0;

        for pair in prices.windows(2) {
            let change = (pair[1] - pair[0]) / pair[0] * 100.0;
            last_change = change;

            if change >= threshold {
                up_streak += 1;
                down_streak = 0;
            } else if change <= -threshold {
                down_streak += 1;
                up_streak = 0;
            } else {
                // A single non-spike breaks any streak
                up_streak = 0;
                down_streak = 0;
            }
        }

        if up_streak >= self.config.spikes_to_enter {
            return Signal {
                kind: SignalKind::Long,
                price: latest,
                reason: format!(
                    "{} consecutive up-spikes >= {:.2}% (last {:+.2}%)",
                    up_streak, threshold, last_change
                ),
            };
        }

        if down_streak >= self.config.spikes_to_enter {
            return Signal {
                kind: SignalKind::Short,
                price: latest,
                reason: format!(
                    "{} consecutive down-spikes >= {:.2}% (last {:+.2}%)",
                    down_streak, threshold, last_change
                ),
            };
        }

        Signal::none(latest, format!("No streak (last move {:+.2}%)", last_change))
    }
}

// ============================================================================
// Tests
// ============================================================================
