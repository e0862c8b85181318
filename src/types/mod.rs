//! Core data model for the PPG pipeline.
//!
//! Everything published across the pipeline boundary lives here: the
//! per-frame [`Sample`], the per-sample [`VitalSignsSnapshot`] and
//! [`WaveformPoint`] outputs, and the [`SessionRow`] interchange record
//! consumed by the export collaborator.

use serde::{Deserialize, Serialize};

// ============================================================================
// Input
// ============================================================================

/// One reduced camera frame: ROI channel means plus the finger-presence
/// decision. Ephemeral — consumed by exactly one pipeline pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Frame timestamp in milliseconds since the Unix epoch
    pub timestamp_ms: i64,
    /// Mean red channel value over the ROI
    pub red_mean: f64,
    /// Mean green channel value over the ROI (the primary PPG signal)
    pub green_mean: f64,
    /// Whether a fingertip covers the lens for this frame
    pub finger_present: bool,
}

// ============================================================================
// Outputs
// ============================================================================

/// Vital-sign estimates recomputed fresh for every processed sample.
///
/// All numeric fields are clamped to their declared ranges before
/// publication; a snapshot never carries NaN or infinite values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VitalSignsSnapshot {
    /// Heart rate in beats per minute: 0 (unknown) or 30..=200
    pub bpm: u32,
    /// Blood-oxygen proxy: 0 (unknown) or 70..=100.
    ///
    /// Uncalibrated ratio-of-ratios estimate — experimental, never a
    /// diagnostic value.
    pub spo2: u32,
    /// Signal quality score, 0..=100
    pub signal_quality: u32,
    /// Most recent RR interval in milliseconds (0 until two beats seen)
    pub last_rr_ms: i64,
    /// Whether the latest beat tripped any rhythm-anomaly criterion
    pub is_arrhythmic: bool,
    /// Display-only rhythm category for UI text. Never gates
    /// `is_arrhythmic`.
    pub rhythm_label: crate::rhythm::RhythmLabel,
}

impl VitalSignsSnapshot {
    /// The snapshot emitted while the pipeline idles (no finger detected).
    pub fn neutral() -> Self {
        Self {
            bpm: 0,
            spo2: 0,
            signal_quality: 0,
            last_rr_ms: 0,
            is_arrhythmic: false,
            rhythm_label: crate::rhythm::RhythmLabel::Normal,
        }
    }
}

impl Default for VitalSignsSnapshot {
    fn default() -> Self {
        Self::neutral()
    }
}

/// One point of the displayed waveform, appended to the capped ring buffer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaveformPoint {
    /// Sample timestamp in milliseconds since the Unix epoch
    pub timestamp_ms: i64,
    /// Wide-band filtered signal value
    pub filtered_value: f64,
    /// Whether this sample was accepted as a heartbeat peak
    pub is_peak: bool,
    /// Rhythm-anomaly flag in effect at this sample
    pub is_arrhythmic: bool,
}

// ============================================================================
// Session interchange record
// ============================================================================

/// Per-sample session record with the fixed seven-field interchange schema.
///
/// Field names are frozen: they form the CSV header and the JSON keys the
/// export collaborator emits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionRow {
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    /// Raw green-channel ROI mean
    pub raw_value: f64,
    /// Wide-band filtered value
    pub filtered_value: f64,
    /// Whether this sample was an accepted peak
    pub peak_flag: bool,
    /// BPM estimate at this sample
    pub bpm_instant: u32,
    /// SpO2 proxy at this sample
    pub spo2_estimate: u32,
    /// Signal quality at this sample
    pub signal_quality: u32,
}

// ============================================================================
// Monitor status
// ============================================================================

/// Operational status of the monitoring loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MonitorStatus {
    /// Loop started, no frame processed yet
    Initializing,
    /// Frames arriving but no fingertip on the lens
    NoFinger,
    /// Finger present, vitals being estimated
    Monitoring,
}

impl std::fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MonitorStatus::Initializing => write!(f, "Initializing"),
            MonitorStatus::NoFinger => write!(f, "NoFinger"),
            MonitorStatus::Monitoring => write!(f, "Monitoring"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
