//! Fixed-capacity rolling statistics window.
//!
//! Four independent instances back the finger-variance check, the
//! normalizer, the peak threshold, and the quality score. They are kept
//! separate on purpose: the statistics run at different window sizes over
//! different signals and must never alias each other.

use statrs::statistics::Statistics;
use std::collections::VecDeque;

/// Drop-oldest rolling buffer of `f64` values with summary statistics.
#[derive(Debug, Clone)]
pub struct SlidingWindow {
    values: VecDeque<f64>,
    capacity: usize,
}

impl SlidingWindow {
    /// Create a window that retains at most `capacity` values.
    pub fn new(capacity: usize) -> Self {
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a value, dropping the oldest when at capacity.
    pub fn push(&mut self, value: f64) {
        if self.values.len() >= self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Arithmetic mean; 0 for an empty window.
    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().mean()
    }

    /// Mean of absolute values; 0 for an empty window.
    pub fn abs_mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().map(|v| v.abs()).mean()
    }

    /// Population variance; 0 with fewer than two values.
    pub fn population_variance(&self) -> f64 {
        if self.values.len() < 2 {
            return 0.0;
        }
        self.values.iter().population_variance()
    }

    /// Population standard deviation; 0 with fewer than two values.
    pub fn std_dev(&self) -> f64 {
        self.population_variance().sqrt()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = &f64> {
        self.values.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_oldest_at_capacity() {
        let mut w = SlidingWindow::new(3);
        for v in [1.0, 2.0, 3.0, 4.0] {
            w.push(v);
        }
        assert_eq!(w.len(), 3);
        let kept: Vec<f64> = w.iter().copied().collect();
        assert_eq!(kept, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn population_statistics() {
        let mut w = SlidingWindow::new(10);
        for v in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            w.push(v);
        }
        assert!((w.mean() - 5.0).abs() < 1e-12);
        // Classic example set: population variance 4, stddev 2
        assert!((w.population_variance() - 4.0).abs() < 1e-12);
        assert!((w.std_dev() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn degenerate_windows_return_zero() {
        let mut w = SlidingWindow::new(5);
        assert_eq!(w.mean(), 0.0);
        assert_eq!(w.population_variance(), 0.0);
        w.push(3.0);
        assert_eq!(w.population_variance(), 0.0);
        assert!((w.mean() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn abs_mean_uses_magnitudes() {
        let mut w = SlidingWindow::new(4);
        for v in [-1.0, 1.0, -2.0, 2.0] {
            w.push(v);
        }
        assert!((w.mean() - 0.0).abs() < 1e-12);
        assert!((w.abs_mean() - 1.5).abs() < 1e-12);
    }
}
