//! Monitor configuration
//!
//! Construction-time parameters for the processing pipeline, loaded from a
//! TOML file with built-in defaults. The core never persists configuration
//! itself — a settings collaborator owns the file.
//!
//! ## Loading order
//!
//! 1. Explicit path passed to [`MonitorConfig::load_from`]
//! 2. `PULSECAM_CONFIG` environment variable (path to TOML file)
//! 3. `pulsecam.toml` in the current working directory
//! 4. Built-in defaults

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration loading/validation failures
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// Sections
// ============================================================================

/// Bandpass filter passbands and the assumed sampling cadence.
///
/// Coefficients are derived from `sampling_rate_hz` at construction, so a
/// 30 Hz camera feed is supported by configuring the true cadence instead
/// of resampling to 100 Hz.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Wide-band low cutoff (Hz)
    pub wide_low_hz: f64,
    /// Wide-band high cutoff (Hz)
    pub wide_high_hz: f64,
    /// Narrow-band low cutoff (Hz)
    pub narrow_low_hz: f64,
    /// Narrow-band high cutoff (Hz)
    pub narrow_high_hz: f64,
    /// Sampling rate the filters are designed for (Hz)
    pub sampling_rate_hz: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            wide_low_hz: 0.5,
            wide_high_hz: 8.0,
            narrow_low_hz: 0.7,
            narrow_high_hz: 4.0,
            sampling_rate_hz: 100.0,
        }
    }
}

/// Beat detection tuning
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Minimum time between accepted peaks (ms)
    pub refractory_ms: i64,
    /// Multiplier on the adaptive peak threshold's deviation term.
    /// Higher values make detection stricter.
    pub signal_sensitivity: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            refractory_ms: 250,
            signal_sensitivity: 1.0,
        }
    }
}

/// Additive calibration offsets applied before range clamping
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Added to the BPM estimate
    pub bpm_offset: i32,
    /// Added to the SpO2 estimate
    pub spo2_offset: i32,
}

// ============================================================================
// Top-level config
// ============================================================================

/// Full pipeline configuration
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub filter: FilterConfig,
    pub detection: DetectionConfig,
    pub calibration: CalibrationConfig,
}

impl MonitorConfig {
    /// Load configuration using the documented lookup order.
    ///
    /// Falls back to defaults when no file is found; a file that exists but
    /// fails to parse or validate is an error.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var("PULSECAM_CONFIG") {
            return Self::load_from(Path::new(&path));
        }
        let cwd_default = Path::new("pulsecam.toml");
        if cwd_default.exists() {
            return Self::load_from(cwd_default);
        }
        tracing::debug!("No config file found — using built-in defaults");
        Ok(Self::default())
    }

    /// Load and validate configuration from an explicit TOML file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&text)?;
        config.validate()?;
        tracing::info!(path = %path.display(), "Loaded monitor config");
        Ok(config)
    }

    /// Check ranges that would produce a degenerate or unstable pipeline.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let f = &self.filter;
        if f.sampling_rate_hz <= 0.0 || !f.sampling_rate_hz.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "sampling_rate_hz must be positive, got {}",
                f.sampling_rate_hz
            )));
        }
        let nyquist = f.sampling_rate_hz / 2.0;
        for (name, low, high) in [
            ("wide", f.wide_low_hz, f.wide_high_hz),
            ("narrow", f.narrow_low_hz, f.narrow_high_hz),
        ] {
            if low <= 0.0 || high <= low {
                return Err(ConfigError::Invalid(format!(
                    "{name} band must satisfy 0 < low < high (got {low}..{high})"
                )));
            }
            if high >= nyquist {
                return Err(ConfigError::Invalid(format!(
                    "{name} high cutoff {high} Hz must be below Nyquist ({nyquist} Hz)"
                )));
            }
        }
        if self.detection.refractory_ms < 0 {
            return Err(ConfigError::Invalid(format!(
                "refractory_ms must be non-negative, got {}",
                self.detection.refractory_ms
            )));
        }
        if self.detection.signal_sensitivity <= 0.0
            || !self.detection.signal_sensitivity.is_finite()
        {
            return Err(ConfigError::Invalid(format!(
                "signal_sensitivity must be positive, got {}",
                self.detection.signal_sensitivity
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = MonitorConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.filter.wide_low_hz - 0.5).abs() < f64::EPSILON);
        assert!((config.filter.narrow_high_hz - 4.0).abs() < f64::EPSILON);
        assert_eq!(config.detection.refractory_ms, 250);
        assert_eq!(config.calibration.bpm_offset, 0);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: MonitorConfig = toml::from_str(
            r#"
            [detection]
            refractory_ms = 300
            "#,
        )
        .unwrap();
        assert_eq!(config.detection.refractory_ms, 300);
        assert!((config.filter.sampling_rate_hz - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn inverted_band_rejected() {
        let mut config = MonitorConfig::default();
        config.filter.narrow_low_hz = 5.0;
        config.filter.narrow_high_hz = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn cutoff_above_nyquist_rejected() {
        let mut config = MonitorConfig::default();
        config.filter.sampling_rate_hz = 10.0;
        // Wide high cutoff of 8 Hz is above the 5 Hz Nyquist limit
        assert!(config.validate().is_err());
    }

    #[test]
    fn negative_sensitivity_rejected() {
        let mut config = MonitorConfig::default();
        config.detection.signal_sensitivity = -1.0;
        assert!(config.validate().is_err());
    }
}
