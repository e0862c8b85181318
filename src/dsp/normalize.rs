//! Rolling z-score normalization.

use super::SlidingWindow;

/// Normalization window capacity
const WINDOW_SIZE: usize = 100;

/// Minimum samples before z-scoring starts
const MIN_SAMPLES: usize = 10;

/// Rescales the detrended signal to zero mean / unit deviation over a
/// rolling window of the last 100 pre-filter values.
#[derive(Debug, Clone)]
pub struct Normalizer {
    window: SlidingWindow,
}

impl Normalizer {
    pub fn new() -> Self {
        Self {
            window: SlidingWindow::new(WINDOW_SIZE),
        }
    }

    /// Feed one detrended value; returns its z-score over the window.
    ///
    /// Passes the value through unchanged until ten samples have arrived;
    /// returns 0 when the window deviation is zero.
    pub fn update(&mut self, value: f64) -> f64 {
        self.window.push(value);

        if self.window.len() < MIN_SAMPLES {
            return value;
        }

        let mean = self.window.mean();
        let std_dev = self.window.std_dev();
        if std_dev == 0.0 {
            return 0.0;
        }

        (value - mean) / std_dev
    }

    pub fn reset(&mut self) {
        self.window.clear();
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_through_until_ten_samples() {
        let mut n = Normalizer::new();
        for i in 0..9 {
            let v = 5.0 + i as f64;
            assert!((n.update(v) - v).abs() < 1e-12);
        }
        // Tenth sample gets z-scored
        let out = n.update(20.0);
        assert!(out != 20.0);
        assert!(out.is_finite());
    }

    #[test]
    fn constant_signal_yields_zero() {
        let mut n = Normalizer::new();
        let mut out = f64::MAX;
        for _ in 0..20 {
            out = n.update(7.0);
        }
        assert_eq!(out, 0.0);
    }

    #[test]
    fn zscore_is_centered_and_scaled() {
        let mut n = Normalizer::new();
        // Alternate between two values; z-scores settle at ±1
        let mut out = 0.0;
        for i in 0..100 {
            out = n.update(if i % 2 == 0 { 1.0 } else { -1.0 });
        }
        assert!((out.abs() - 1.0).abs() < 1e-9, "got {out}");
    }
}
