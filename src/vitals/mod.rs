//! Vital-sign estimation: BPM from RR intervals, SpO2 proxy from
//! red/green AC/DC ratios, and an SNR-based signal quality score.
//!
//! The SpO2 path is an uncalibrated ratio-of-ratios estimate. It is
//! surfaced as experimental and must never be treated as a diagnostic
//! value — the calibration curve is device-dependent.

use crate::dsp::SlidingWindow;

/// Wide-band values retained for the quality score
const QUALITY_WINDOW: usize = 100;

/// Minimum quality-window fill before a non-zero score is produced
const MIN_QUALITY_SAMPLES: usize = 50;

/// DC-level exponential moving average factor (per channel)
const DC_ALPHA: f64 = 0.01;

/// AC-envelope exponential moving average factor (per channel)
const AC_ALPHA: f64 = 0.1;

/// BPM clamp range
const BPM_MIN: i64 = 30;
const BPM_MAX: i64 = 200;

/// SpO2 clamp range
const SPO2_MIN: i64 = 70;
const SPO2_MAX: i64 = 100;

/// Stateful estimator for the three published vitals.
#[derive(Debug, Clone)]
pub struct VitalSignsEstimator {
    quality_window: SlidingWindow,
    dc_red: f64,
    dc_green: f64,
    ac_red: f64,
    ac_green: f64,
    bpm_offset: i32,
    spo2_offset: i32,
}

impl VitalSignsEstimator {
    pub fn new(bpm_offset: i32, spo2_offset: i32) -> Self {
        Self {
            quality_window: SlidingWindow::new(QUALITY_WINDOW),
            dc_red: 0.0,
            dc_green: 0.0,
            ac_red: 0.0,
            ac_green: 0.0,
            bpm_offset,
            spo2_offset,
        }
    }

    /// Heart rate from the RR-interval list.
    ///
    /// Uses the sorted element at index `n / 2` — for an even count this is
    /// the upper-middle interval, deliberately not the average of the two
    /// middle values. Result is 0 (no beats) or clamped to 30..=200.
    pub fn bpm(&self, rr_intervals: &[i64]) -> u32 {
        if rr_intervals.is_empty() {
            return 0;
        }
        let mut sorted = rr_intervals.to_vec();
        sorted.sort_unstable();
        let median_rr = sorted[sorted.len() / 2];
        if median_rr <= 0 {
            return 0;
        }

        let bpm = (60_000.0 / median_rr as f64).round() as i64 + i64::from(self.bpm_offset);
        bpm.clamp(BPM_MIN, BPM_MAX) as u32
    }

    /// Update the per-channel DC/AC envelopes and return the SpO2 proxy.
    ///
    /// Called once per processed sample regardless of peak state. Returns 0
    /// whenever any envelope term is exactly zero — degenerate ratios must
    /// never surface as NaN or infinity.
    pub fn update_spo2(&mut self, red_mean: f64, green_mean: f64) -> u32 {
        self.dc_red = self.dc_red * (1.0 - DC_ALPHA) + red_mean * DC_ALPHA;
        self.dc_green = self.dc_green * (1.0 - DC_ALPHA) + green_mean * DC_ALPHA;

        let red_ac_instant = (red_mean - self.dc_red).abs();
        let green_ac_instant = (green_mean - self.dc_green).abs();
        self.ac_red = self.ac_red * (1.0 - AC_ALPHA) + red_ac_instant * AC_ALPHA;
        self.ac_green = self.ac_green * (1.0 - AC_ALPHA) + green_ac_instant * AC_ALPHA;

        if self.dc_red == 0.0 || self.dc_green == 0.0 || self.ac_red == 0.0 || self.ac_green == 0.0
        {
            return 0;
        }

        let red_ratio = self.ac_red / self.dc_red;
        let green_ratio = self.ac_green / self.dc_green;
        if green_ratio == 0.0 {
            return 0;
        }

        let r = red_ratio / green_ratio;
        let spo2 = (110.0 - 25.0 * r).round() as i64 + i64::from(self.spo2_offset);
        spo2.clamp(SPO2_MIN, SPO2_MAX) as u32
    }

    /// Feed one wide-band value and return the quality score (0..=100).
    ///
    /// Quality is an SNR proxy: mean absolute level over deviation across
    /// the last 100 wide-band values. Returns 0 until 50 samples have
    /// arrived or when the window is flat.
    pub fn update_quality(&mut self, wide_value: f64) -> u32 {
        self.quality_window.push(wide_value);

        if self.quality_window.len() < MIN_QUALITY_SAMPLES {
            return 0;
        }

        let variance = self.quality_window.population_variance();
        let snr = if variance > 0.0 {
            self.quality_window.abs_mean() / variance.sqrt()
        } else {
            0.0
        };

        (snr * 10.0).clamp(0.0, 100.0).round() as u32
    }

    pub fn reset(&mut self) {
        self.quality_window.clear();
        self.dc_red = 0.0;
        self.dc_green = 0.0;
        self.ac_red = 0.0;
        self.ac_green = 0.0;
    }
}

// ============================================================================
// Tests
// ============================================================================
