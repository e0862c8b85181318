//! Beat detection on the narrow-band signal.
//!
//! Adaptive-threshold peak detection with refractory gating: a candidate is
//! rejected outright inside the refractory period, otherwise compared
//! against `mean + 1.5 · sensitivity · stddev` over the last 50 narrow-band
//! values. Accepted peaks feed a capped registry of timestamps from which
//! the RR-interval list is rederived.

use crate::dsp::SlidingWindow;
use std::collections::VecDeque;

/// Narrow-band values retained for the adaptive threshold
const THRESHOLD_WINDOW: usize = 50;

/// Minimum window fill before any peak can be accepted
const MIN_THRESHOLD_SAMPLES: usize = 10;

/// Deviation multiplier of the adaptive threshold
const THRESHOLD_SIGMA: f64 = 1.5;

/// Accepted peak timestamps retained
const MAX_PEAKS: usize = 10;

/// Outcome of one detector update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeakDecision {
    /// Whether this sample was accepted as a beat
    pub is_peak: bool,
    /// The RR interval produced by this beat, when it had a predecessor
    pub new_rr_ms: Option<i64>,
}

impl PeakDecision {
    const NONE: Self = Self {
        is_peak: false,
        new_rr_ms: None,
    };
}

/// Streaming peak detector plus peak registry / RR-interval list.
#[derive(Debug, Clone)]
pub struct PeakDetector {
    window: SlidingWindow,
    peak_times: VecDeque<i64>,
    rr_intervals: Vec<i64>,
    last_peak_ms: i64,
    refractory_ms: i64,
    sensitivity: f64,
}

impl PeakDetector {
    pub fn new(refractory_ms: i64, sensitivity: f64) -> Self {
        Self {
            window: SlidingWindow::new(THRESHOLD_WINDOW),
            peak_times: VecDeque::with_capacity(MAX_PEAKS),
            rr_intervals: Vec::with_capacity(MAX_PEAKS - 1),
            last_peak_ms: 0,
            refractory_ms,
            sensitivity,
        }
    }

    /// Feed one narrow-band value; decide whether it is a beat.
    ///
    /// The value always enters the threshold window. Inside the refractory
    /// period the candidate is rejected without any threshold evaluation.
    pub fn update(&mut self, value: f64, timestamp_ms: i64) -> PeakDecision {
        self.window.push(value);

        if timestamp_ms - self.last_peak_ms < self.refractory_ms {
            return PeakDecision::NONE;
        }

        if self.window.len() < MIN_THRESHOLD_SAMPLES {
            return PeakDecision::NONE;
        }

        let threshold =
            self.window.mean() + THRESHOLD_SIGMA * self.sensitivity * self.window.std_dev();
        if value <= threshold || value <= 0.0 {
            return PeakDecision::NONE;
        }

        // Registry timestamps stay strictly increasing: the refractory gate
        // already rejected anything at or before the last accepted peak.
        self.last_peak_ms = timestamp_ms;
        if self.peak_times.len() >= MAX_PEAKS {
            self.peak_times.pop_front();
        }
        self.peak_times.push_back(timestamp_ms);
        self.recompute_rr_intervals();

        let new_rr = self.rr_intervals.last().copied();
        tracing::debug!(timestamp_ms, rr_ms = ?new_rr, "Beat accepted");

        PeakDecision {
            is_peak: true,
            new_rr_ms: new_rr,
        }
    }

    fn recompute_rr_intervals(&mut self) {
        self.rr_intervals.clear();
        let mut prev: Option<i64> = None;
        for &ts in &self.peak_times {
            if let Some(p) = prev {
                self.rr_intervals.push(ts - p);
            }
            prev = Some(ts);
        }
    }

    /// Consecutive differences among the retained peak timestamps.
    pub fn rr_intervals(&self) -> &[i64] {
        &self.rr_intervals
    }

    /// Most recent RR interval, or 0 before two beats have been seen.
    pub fn last_rr_ms(&self) -> i64 {
        self.rr_intervals.last().copied().unwrap_or(0)
    }

    /// Timestamp of the last accepted peak (0 before the first beat).
    pub fn last_peak_ms(&self) -> i64 {
        self.last_peak_ms
    }

    pub fn reset(&mut self) {
        self.window.clear();
        self.peak_times.clear();
        self.rr_intervals.clear();
        self.last_peak_ms = 0;
    }
}

// ============================================================================
// Tests
// ============================================================================
