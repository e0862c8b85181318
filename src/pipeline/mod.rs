//! The per-sample processing pipeline.
//!
//! One logical pipeline, synchronous per sample: every stage is a stateful
//! transform invoked in strict sequence before the next sample is accepted.
//! All mutable pipeline state is owned here — frame hand-off from the
//! acquisition task is by value over a channel, so no locking is needed
//! inside the pipeline itself.
//!
//! # Flow
//!
//! frame → [`FrameSampler`] → green mean → detrend → normalize → wide and
//! narrow bandpass → peak detection (narrow) → RR history → vitals
//! (RR + red/green + wide) → rhythm classification → one
//! [`VitalSignsSnapshot`] plus one [`WaveformPoint`] in the capped ring.

use crate::beat::PeakDetector;
use crate::config::MonitorConfig;
use crate::dsp::{BandpassFilter, Detrender, Normalizer};
use crate::frame::FrameSampler;
use crate::rhythm::ArrhythmiaClassifier;
use crate::types::{MonitorStatus, Sample, SessionRow, VitalSignsSnapshot, WaveformPoint};
use crate::vitals::VitalSignsEstimator;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Waveform ring capacity: ~20 seconds at 100 Hz
pub const WAVEFORM_CAPACITY: usize = 2_000;

// ============================================================================
// Outcome
// ============================================================================

/// Result of processing one sample.
#[derive(Debug, Clone, Copy)]
pub struct SampleOutcome {
    /// Fresh snapshot for this sample
    pub snapshot: VitalSignsSnapshot,
    /// The waveform point appended, absent while the pipeline idles
    pub point: Option<WaveformPoint>,
}

impl SampleOutcome {
    fn idle() -> Self {
        Self {
            snapshot: VitalSignsSnapshot::neutral(),
            point: None,
        }
    }
}

// ============================================================================
// Shared monitor state
// ============================================================================

/// Shared state published by the processing loop for UI/API consumers.
/// Wrapped in `Arc<RwLock<..>>` across tasks.
#[derive(Debug, Clone)]
pub struct MonitorState {
    /// Latest published snapshot
    pub latest: VitalSignsSnapshot,
    /// Current loop status
    pub status: MonitorStatus,
    /// Samples processed with a finger present
    pub samples_processed: u64,
    /// Samples skipped for missing finger
    pub samples_idle: u64,
    /// Session rows dropped because the recorder lagged
    pub session_rows_dropped: u64,
    /// Wall-clock time of the last update
    pub last_update: Option<chrono::DateTime<chrono::Utc>>,
}

impl Default for MonitorState {
    fn default() -> Self {
        Self {
            latest: VitalSignsSnapshot::neutral(),
            status: MonitorStatus::Initializing,
            samples_processed: 0,
            samples_idle: 0,
            session_rows_dropped: 0,
            last_update: None,
        }
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// The full signal-processing pipeline, one instance per monitoring
/// session.
pub struct PpgPipeline {
    sampler: FrameSampler,
    detrender: Detrender,
    normalizer: Normalizer,
    wide_filter: BandpassFilter,
    narrow_filter: BandpassFilter,
    peaks: PeakDetector,
    vitals: VitalSignsEstimator,
    rhythm: ArrhythmiaClassifier,
    waveform: VecDeque<WaveformPoint>,
    /// Rhythm flag is per-beat; it holds between beats
    last_is_arrhythmic: bool,
    samples_processed: u64,
}

impl PpgPipeline {
    /// Build the pipeline from validated configuration.
    pub fn new(config: &MonitorConfig) -> Self {
        info!(
            wide_band = format_args!(
                "{}-{} Hz",
                config.filter.wide_low_hz, config.filter.wide_high_hz
            ),
            narrow_band = format_args!(
                "{}-{} Hz",
                config.filter.narrow_low_hz, config.filter.narrow_high_hz
            ),
            sampling_rate_hz = config.filter.sampling_rate_hz,
            refractory_ms = config.detection.refractory_ms,
            "Initializing PPG pipeline"
        );

        Self {
            sampler: FrameSampler::new(),
            detrender: Detrender::new(),
            normalizer: Normalizer::new(),
            wide_filter: BandpassFilter::new(
                config.filter.wide_low_hz,
                config.filter.wide_high_hz,
                config.filter.sampling_rate_hz,
            ),
            narrow_filter: BandpassFilter::new(
                config.filter.narrow_low_hz,
                config.filter.narrow_high_hz,
                config.filter.sampling_rate_hz,
            ),
            peaks: PeakDetector::new(
                config.detection.refractory_ms,
                config.detection.signal_sensitivity,
            ),
            vitals: VitalSignsEstimator::new(
                config.calibration.bpm_offset,
                config.calibration.spo2_offset,
            ),
            rhythm: ArrhythmiaClassifier::new(),
            waveform: VecDeque::with_capacity(WAVEFORM_CAPACITY),
            last_is_arrhythmic: false,
            samples_processed: 0,
        }
    }

    /// Reduce a raw RGBA frame and run the pipeline on it.
    ///
    /// Returns `None` for a dropped frame (unusable ROI) — the caller
    /// simply retries on the next frame.
    pub fn process_frame(
        &mut self,
        pixels: &[u8],
        width: usize,
        height: usize,
        timestamp_ms: i64,
    ) -> Option<SampleOutcome> {
        let sample = self.sampler.sample(pixels, width, height, timestamp_ms)?;
        Some(self.process_sample(sample))
    }

    /// Run one pre-extracted sample through every stage.
    ///
    /// Without a finger the pipeline idles: a neutral snapshot is returned,
    /// no waveform point is appended, and no DSP state advances.
    pub fn process_sample(&mut self, sample: Sample) -> SampleOutcome {
        if !sample.finger_present {
            return SampleOutcome::idle();
        }

        let detrended = self
            .detrender
            .update(sample.green_mean, sample.timestamp_ms);
        let normalized = self.normalizer.update(detrended);

        let wide = self.wide_filter.process(normalized);
        let narrow = self.narrow_filter.process(normalized);

        let decision = self.peaks.update(narrow, sample.timestamp_ms);
        if let Some(rr) = decision.new_rr_ms {
            self.last_is_arrhythmic = self.rhythm.update(rr);
        }

        let bpm = self.vitals.bpm(self.peaks.rr_intervals());
        let spo2 = self.vitals.update_spo2(sample.red_mean, sample.green_mean);
        let signal_quality = self.vitals.update_quality(wide);
        let last_rr_ms = self.peaks.last_rr_ms();

        let snapshot = VitalSignsSnapshot {
            bpm,
            spo2,
            signal_quality,
            last_rr_ms: last_rr_ms.max(0),
            is_arrhythmic: self.last_is_arrhythmic,
            rhythm_label: self.rhythm.label(last_rr_ms, bpm),
        };

        let point = WaveformPoint {
            timestamp_ms: sample.timestamp_ms,
            filtered_value: if wide.is_finite() { wide } else { 0.0 },
            is_peak: decision.is_peak,
            is_arrhythmic: self.last_is_arrhythmic,
        };
        if self.waveform.len() >= WAVEFORM_CAPACITY {
            self.waveform.pop_front();
        }
        self.waveform.push_back(point);

        self.samples_processed += 1;
        if self.samples_processed % 1_000 == 0 {
            debug!(
                samples = self.samples_processed,
                bpm,
                signal_quality,
                "Pipeline progress"
            );
        }

        SampleOutcome {
            snapshot,
            point: Some(point),
        }
    }

    /// Ordered waveform ring, oldest first.
    pub fn waveform(&self) -> &VecDeque<WaveformPoint> {
        &self.waveform
    }

    /// Samples processed with a finger present.
    pub fn samples_processed(&self) -> u64 {
        self.samples_processed
    }

    /// Restore every stateful buffer to its zero/empty initial condition.
    ///
    /// There is no partial cancel: a replay after `reset()` is numerically
    /// identical to a fresh pipeline.
    pub fn reset(&mut self) {
        self.sampler.reset();
        self.detrender.reset();
        self.normalizer.reset();
        self.wide_filter.reset();
        self.narrow_filter.reset();
        self.peaks.reset();
        self.vitals.reset();
        self.rhythm.reset();
        self.waveform.clear();
        self.last_is_arrhythmic = false;
        self.samples_processed = 0;
        info!("Pipeline reset");
    }

    // ========================================================================
    // Processing loop
    // ========================================================================

    /// Run the processing loop until the channel closes or shutdown is
    /// signalled.
    ///
    /// Samples arrive by value over `sample_rx`; results are published to
    /// `state`. When a session channel is supplied, one [`SessionRow`] per
    /// processed sample is forwarded with `try_send` — a lagging recorder
    /// drops rows rather than stalling the real-time path.
    pub async fn run(
        &mut self,
        mut sample_rx: mpsc::Receiver<Sample>,
        state: Arc<RwLock<MonitorState>>,
        shutdown: Arc<AtomicBool>,
        session_tx: Option<mpsc::Sender<SessionRow>>,
    ) {
        info!("PPG pipeline starting main loop");

        while !shutdown.load(Ordering::Relaxed) {
            // Receive with timeout so the shutdown flag is polled even on a
            // stalled source
            let received = tokio::time::timeout(
                tokio::time::Duration::from_millis(100),
                sample_rx.recv(),
            )
            .await;

            match received {
                Ok(Some(sample)) => {
                    let outcome = self.process_sample(sample);

                    let mut dropped_row = false;
                    if let (Some(tx), Some(point)) = (&session_tx, outcome.point) {
                        let row = SessionRow {
                            timestamp: sample.timestamp_ms,
                            raw_value: sample.green_mean,
                            filtered_value: point.filtered_value,
                            peak_flag: point.is_peak,
                            bpm_instant: outcome.snapshot.bpm,
                            spo2_estimate: outcome.snapshot.spo2,
                            signal_quality: outcome.snapshot.signal_quality,
                        };
                        if let Err(e) = tx.try_send(row) {
                            warn!(error = %e, "Session recorder lagging — dropping row");
                            dropped_row = true;
                        }
                    }

                    let mut s = state.write().await;
                    s.latest = outcome.snapshot;
                    s.status = if sample.finger_present {
                        MonitorStatus::Monitoring
                    } else {
                        MonitorStatus::NoFinger
                    };
                    if sample.finger_present {
                        s.samples_processed += 1;
                    } else {
                        s.samples_idle += 1;
                    }
                    if dropped_row {
                        s.session_rows_dropped += 1;
                    }
                    s.last_update = Some(chrono::Utc::now());
                }
                Ok(None) => break, // channel closed
                Err(_) => continue, // timeout, re-check shutdown
            }
        }

        info!(
            samples = self.samples_processed,
            "PPG pipeline shutting down"
        );
    }
}

// ============================================================================
// Tests
// ============================================================================
