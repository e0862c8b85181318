//! Heartbeat-rhythm anomaly classification from RR-interval history.
//!
//! The classifier keeps its own rolling history of the last 10 RR
//! intervals, fed one value per accepted beat. Six beat-level criteria gate
//! the published `is_arrhythmic` flag; sustained-rate states (tachycardia
//! above 100 BPM, bradycardia below 60 BPM) are deliberately excluded from
//! gating and exist only as display labels — see DESIGN.md.

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::VecDeque;

/// RR intervals retained for classification
const HISTORY_CAPACITY: usize = 10;

/// Minimum history before any classification fires
const MIN_HISTORY: usize = 3;

/// Minimum history before the variability criterion applies
const MIN_HISTORY_VARIABILITY: usize = 5;

/// Premature beat: RR below this fraction of the mean
const PREMATURE_FRACTION: f64 = 0.6;

/// Pause: RR above this fraction of the mean
const PAUSE_FRACTION: f64 = 1.5;

/// Sudden change: relative jump from the previous RR
const SUDDEN_CHANGE_FRACTION: f64 = 0.2;

/// Extreme RR bounds (ms): under 300 implies >200 BPM, over 2000 implies
/// <30 BPM
const RR_TOO_FAST_MS: i64 = 300;
const RR_TOO_SLOW_MS: i64 = 2_000;

/// High variability: deviation above this fraction of the mean
const VARIABILITY_FRACTION: f64 = 0.3;

/// Display thresholds for the sustained-rate labels (not gating criteria)
const TACHYCARDIA_BPM: u32 = 100;
const BRADYCARDIA_BPM: u32 = 60;

// ============================================================================
// Display label
// ============================================================================

/// Display-only rhythm category for UI text.
///
/// Derived from thresholds similar but not identical to the gating
/// criteria; never consulted for the `is_arrhythmic` decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RhythmLabel {
    ExtremeTachycardia,
    ExtremeBradycardia,
    PrematureBeat,
    Pause,
    Tachycardia,
    Bradycardia,
    Normal,
}

impl std::fmt::Display for RhythmLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            RhythmLabel::ExtremeTachycardia => "extreme tachycardia",
            RhythmLabel::ExtremeBradycardia => "extreme bradycardia",
            RhythmLabel::PrematureBeat => "premature beat",
            RhythmLabel::Pause => "pause",
            RhythmLabel::Tachycardia => "tachycardia",
            RhythmLabel::Bradycardia => "bradycardia",
            RhythmLabel::Normal => "normal",
        };
        write!(f, "{text}")
    }
}

// ============================================================================
// Classifier
// ============================================================================

/// Rolling-history rhythm classifier.
#[derive(Debug, Clone, Default)]
pub struct ArrhythmiaClassifier {
    history: VecDeque<i64>,
}

impl ArrhythmiaClassifier {
    pub fn new() -> Self {
        Self {
            history: VecDeque::with_capacity(HISTORY_CAPACITY),
        }
    }

    /// Push one new RR interval and classify the beat it closed.
    ///
    /// Non-positive intervals are ignored entirely. With fewer than three
    /// retained intervals nothing is flagged.
    pub fn update(&mut self, rr_ms: i64) -> bool {
        if rr_ms <= 0 {
            return false;
        }

        if self.history.len() >= HISTORY_CAPACITY {
            self.history.pop_front();
        }
        self.history.push_back(rr_ms);

        let n = self.history.len();
        if n < MIN_HISTORY {
            return false;
        }

        let mean = self.history.iter().map(|&rr| rr as f64).mean();
        let std_dev = self
            .history
            .iter()
            .map(|&rr| rr as f64)
            .population_variance()
            .sqrt();

        let current = rr_ms as f64;
        let previous = self
            .history
            .get(n - 2)
            .copied()
            .map_or(current, |rr| rr as f64);

        let premature = current < PREMATURE_FRACTION * mean;
        let pause = current > PAUSE_FRACTION * mean;
        let sudden_change = ((current - previous) / previous).abs() > SUDDEN_CHANGE_FRACTION;
        let too_fast = rr_ms < RR_TOO_FAST_MS;
        let too_slow = rr_ms > RR_TOO_SLOW_MS;
        let high_variability = std_dev > VARIABILITY_FRACTION * mean && n >= MIN_HISTORY_VARIABILITY;

        let is_arrhythmic =
            premature || pause || sudden_change || too_fast || too_slow || high_variability;

        if is_arrhythmic {
            tracing::debug!(
                rr_ms,
                mean_rr = mean,
                premature,
                pause,
                sudden_change,
                too_fast,
                too_slow,
                high_variability,
                "Rhythm anomaly flagged"
            );
        }

        is_arrhythmic
    }

    /// Display label for the given beat, from thresholds similar to but
    /// looser than the gating criteria. Informs UI text only.
    pub fn label(&self, rr_ms: i64, bpm: u32) -> RhythmLabel {
        if rr_ms <= 0 {
            return RhythmLabel::Normal;
        }

        let mean = if self.history.is_empty() {
            rr_ms as f64
        } else {
            self.history.iter().map(|&rr| rr as f64).mean()
        };

        if rr_ms < RR_TOO_FAST_MS {
            RhythmLabel::ExtremeTachycardia
        } else if rr_ms > RR_TOO_SLOW_MS {
            RhythmLabel::ExtremeBradycardia
        } else if (rr_ms as f64) < PREMATURE_FRACTION * mean {
            RhythmLabel::PrematureBeat
        } else if (rr_ms as f64) > PAUSE_FRACTION * mean {
            RhythmLabel::Pause
        } else if bpm > TACHYCARDIA_BPM {
            RhythmLabel::Tachycardia
        } else if bpm != 0 && bpm < BRADYCARDIA_BPM {
            RhythmLabel::Bradycardia
        } else {
            RhythmLabel::Normal
        }
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn reset(&mut self) {
        self.history.clear();
    }
}

// ============================================================================
// Tests
// ============================================================================
