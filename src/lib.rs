//! pulsecam: fingertip-camera vital signs monitoring
//!
//! Real-time photoplethysmography (PPG) pipeline that turns camera frames
//! of an illuminated fingertip into heart rate, rhythm anomaly flags, an
//! experimental SpO2 proxy, and a signal quality score.
//!
//! ## Architecture
//!
//! - **Frame sampler**: circular-ROI channel means and finger presence
//! - **DSP stages**: detrending, normalization, dual IIR bandpass filters
//! - **Beat detection**: adaptive threshold with refractory gating
//! - **Vitals**: median-RR heart rate, ratio-of-ratios SpO2, SNR quality
//! - **Rhythm**: beat-level arrhythmia criteria over RR history
//! - **Session**: recording plus CSV/JSON export
//!
//! None of the published values are diagnostic; the export documents carry
//! the disclaimer verbatim.

pub mod acquisition;
pub mod beat;
pub mod config;
pub mod dsp;
pub mod frame;
pub mod pipeline;
pub mod rhythm;
pub mod session;
pub mod types;
pub mod vitals;

// Re-export configuration
pub use config::MonitorConfig;

// Re-export the core data model
pub use types::{MonitorStatus, Sample, SessionRow, VitalSignsSnapshot, WaveformPoint};

// Re-export pipeline entry points
pub use pipeline::{MonitorState, PpgPipeline, SampleOutcome};

// Re-export acquisition sources
pub use acquisition::{CsvReplaySource, SampleSource, SyntheticConfig, SyntheticSource};

// Re-export session recording
pub use session::{ExportError, Session, SessionRecorder};
