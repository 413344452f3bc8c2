//! Bounded rolling window of sampled prices.

use std::collections::VecDeque;

/// Maximum number of samples kept in the window.
pub const WINDOW_CAPACITY: usize = 20;

/// Ordered, bounded sequence of the most recent sampled prices.
///
/// Pushed once per tick by the orchestrator; the oldest sample is evicted
/// beyond [`WINDOW_CAPACITY`].
#[derive(Debug, Clone, Default)]
pub struct PriceWindow {
    prices: VecDeque<f64>,
}

impl PriceWindow {
    /// Create an empty window.
    pub fn new() -> Self {
        Self {
            prices: VecDeque::with_capacity(WINDOW_CAPACITY),
        }
    }

    /// Append a sample, evicting the oldest beyond capacity.
    pub fn push(&mut self, price: f64) {
        if self.prices.len() == WINDOW_CAPACITY {
            self.prices.pop_front();
        }
        self.prices.push_back(price);
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// Most recent sample, if any.
    pub fn latest(&self) -> Option<f64> {
        self.prices.back().copied()
    }

    /// The `n` most recent samples, oldest first. Returns fewer when the
    /// window holds fewer.
    pub fn tail(&self, n: usize) -> Vec<f64> {
        let skip = self.prices.len().saturating_sub(n);
        self.prices.iter().skip(skip).copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_latest() {
        let mut window = PriceWindow::new();
        assert!(window.is_empty());
        assert_eq!(window.latest(), None);

        window.push(100.0);
        window.push(101.0);
        assert_eq!(window.len(), 2);
        assert_eq!(window.latest(), Some(101.0));
    }

    #[test]
    fn test_capacity_eviction() {
        let mut window = PriceWindow::new();
        for i in 0..25 {
            window.push(f64::from(i));
        }

        assert_eq!(window.len(), WINDOW_CAPACITY);
        // Oldest five evicted
        assert_eq!(window.tail(WINDOW_CAPACITY)[0], 5.0);
        assert_eq!(window.latest(), Some(24.0));
    }

    #[test]
    fn test_tail_ordering() {
        let mut window = PriceWindow::new();
        window.push(1.0);
        window.push(2.0);
        window.push(3.0);

        assert_eq!(window.tail(2), vec![2.0, 3.0]);
        // Asking for more than held returns everything
        assert_eq!(window.tail(10), vec![1.0, 2.0, 3.0]);
    }
}
