//! Baseline drift removal via local linear regression.
//!
//! A fingertip pressed against the lens drifts slowly in brightness as
//! pressure and ambient light change. The detrender fits a least-squares
//! line over the last five seconds of raw values and subtracts the fitted
//! trend at the current sample.

use std::collections::VecDeque;

/// Trend window length in milliseconds
const TREND_WINDOW_MS: i64 = 5_000;

/// Minimum points before a regression is attempted
const MIN_TREND_POINTS: usize = 10;

/// Stateful detrender over a 5-second `(timestamp, value)` window.
#[derive(Debug, Clone)]
pub struct Detrender {
    window: VecDeque<(i64, f64)>,
    last_trend: f64,
}

impl Detrender {
    pub fn new() -> Self {
        Self {
            window: VecDeque::new(),
            last_trend: 0.0,
        }
    }

    /// Feed one raw value; returns the value with the local trend removed.
    ///
    /// With fewer than ten retained points the most recent trend estimate
    /// (initially 0) is subtracted instead of fitting a new line.
    pub fn update(&mut self, value: f64, timestamp_ms: i64) -> f64 {
        self.window.push_back((timestamp_ms, value));
        while let Some(&(ts, _)) = self.window.front() {
            if timestamp_ms - ts > TREND_WINDOW_MS {
                self.window.pop_front();
            } else {
                break;
            }
        }

        if self.window.len() < MIN_TREND_POINTS {
            return value - self.last_trend;
        }

        // Ordinary least squares of value against sample index, evaluated
        // at the last index.
        let n = self.window.len() as f64;
        let mut sum_x = 0.0;
        let mut sum_y = 0.0;
        let mut sum_xy = 0.0;
        let mut sum_xx = 0.0;
        for (index, &(_, v)) in self.window.iter().enumerate() {
            let x = index as f64;
            sum_x += x;
            sum_y += v;
            sum_xy += x * v;
            sum_xx += x * x;
        }

        let denom = n * sum_xx - sum_x * sum_x;
        if denom.abs() < f64::EPSILON {
            return value - self.last_trend;
        }
        let slope = (n * sum_xy - sum_x * sum_y) / denom;
        let intercept = (sum_y - slope * sum_x) / n;

        let trend = slope * (n - 1.0) + intercept;
        self.last_trend = trend;

        value - trend
    }

    /// Number of points currently retained in the trend window.
    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    pub fn reset(&mut self) {
        self.window.clear();
        self.last_trend = 0.0;
    }
}

impl Default for Detrender {
    fn default() -> Self {
        Self::new()
    }
}
