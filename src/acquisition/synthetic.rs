//! Synthetic fingertip sample generator.
//!
//! Produces channel means resembling a fingertip over an illuminated
//! camera: a pulsatile green channel riding on a steady baseline, a red
//! channel with a smaller swing, optional noise, periodic finger-lift
//! windows, and occasional ectopic beats for exercising the rhythm
//! classifier.

use super::{AcquisitionError, SampleSource};
use crate::types::Sample;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;
use tracing::debug;

/// Generator parameters.
#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    /// Simulated heart rate
    pub bpm: f64,
    /// Sample cadence
    pub sample_rate_hz: f64,
    /// Gaussian-ish noise amplitude added to both channels
    pub noise_amplitude: f64,
    /// Probability per beat of an ectopic (early) beat
    pub ectopic_probability: f64,
    /// When set, lift the finger for one second every `n` seconds
    pub finger_lift_every_s: Option<u64>,
    /// Pace emission at the sample rate (off for tests)
    pub realtime: bool,
    /// RNG seed, fixed for reproducible sessions
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            bpm: 72.0,
            sample_rate_hz: 100.0,
            noise_amplitude: 0.5,
            ectopic_probability: 0.0,
            finger_lift_every_s: None,
            realtime: true,
            seed: 42,
        }
    }
}

pub struct SyntheticSource {
    config: SyntheticConfig,
    rng: StdRng,
    sample_index: u64,
    /// Phase advances by a beat-dependent rate so ectopics shorten a whole
    /// cycle rather than one sample
    phase: f64,
    current_beat_hz: f64,
}

impl SyntheticSource {
    pub fn new(config: SyntheticConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        let beat_hz = config.bpm / 60.0;
        debug!(bpm = config.bpm, sample_rate_hz = config.sample_rate_hz, "Synthetic source ready");
        Self {
            config,
            rng,
            sample_index: 0,
            phase: 0.0,
            current_beat_hz: beat_hz,
        }
    }

    fn finger_lifted(&self, timestamp_ms: i64) -> bool {
        match self.config.finger_lift_every_s {
            Some(period) if period > 0 => {
                let second = (timestamp_ms / 1_000) as u64;
                second % period == period - 1
            }
            _ => false,
        }
    }

    fn generate(&mut self) -> Sample {
        let dt = 1.0 / self.config.sample_rate_hz;
        let timestamp_ms = (self.sample_index as f64 * dt * 1_000.0).round() as i64;
        self.sample_index += 1;

        self.phase += 2.0 * PI * self.current_beat_hz * dt;
        if self.phase >= 2.0 * PI {
            self.phase -= 2.0 * PI;
            // Next cycle: maybe ectopic (40% early), otherwise nominal rate
            let nominal = self.config.bpm / 60.0;
            self.current_beat_hz = if self.rng.gen::<f64>() < self.config.ectopic_probability {
                nominal / 0.6
            } else {
                nominal
            };
        }

        // Fundamental plus a softened second harmonic, roughly a PPG shape
        let pulse = self.phase.sin() + 0.3 * (2.0 * self.phase).sin();
        let noise = |rng: &mut StdRng, amp: f64| (rng.gen::<f64>() - 0.5) * 2.0 * amp;

        let green_mean =
            120.0 + 8.0 * pulse + noise(&mut self.rng, self.config.noise_amplitude);
        let red_mean = 190.0 + 5.0 * pulse + noise(&mut self.rng, self.config.noise_amplitude);

        let finger_present = !self.finger_lifted(timestamp_ms);
        Sample {
            timestamp_ms,
            red_mean,
            green_mean,
            finger_present,
        }
    }
}

#[async_trait]
impl SampleSource for SyntheticSource {
    async fn next_sample(&mut self) -> Result<Option<Sample>, AcquisitionError> {
        if self.config.realtime {
            let interval_ms = (1_000.0 / self.config.sample_rate_hz) as u64;
            tokio::time::sleep(tokio::time::Duration::from_millis(interval_ms)).await;
        }
        Ok(Some(self.generate()))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> SyntheticConfig {
        SyntheticConfig {
            realtime: false,
            noise_amplitude: 0.0,
            ..SyntheticConfig::default()
        }
    }

    #[tokio::test]
    async fn timestamps_advance_at_sample_cadence() {
        let mut source = SyntheticSource::new(test_config());
        let a = source.next_sample().await.unwrap().unwrap();
        let b = source.next_sample().await.unwrap().unwrap();
        assert_eq!(b.timestamp_ms - a.timestamp_ms, 10);
    }

    #[tokio::test]
    async fn channels_stay_in_fingerlike_bands() {
        let mut source = SyntheticSource::new(test_config());
        for _ in 0..2_000 {
            let s = source.next_sample().await.unwrap().unwrap();
            assert!((100.0..140.0).contains(&s.green_mean), "green {}", s.green_mean);
            assert!((170.0..210.0).contains(&s.red_mean), "red {}", s.red_mean);
            assert!(s.finger_present);
        }
    }

    #[tokio::test]
    async fn finger_lift_windows_appear() {
        let mut source = SyntheticSource::new(SyntheticConfig {
            finger_lift_every_s: Some(3),
            ..test_config()
        });
        let mut lifted = 0;
        let mut present = 0;
        for _ in 0..1_000 {
            // 10 seconds of samples
            let s = source.next_sample().await.unwrap().unwrap();
            if s.finger_present {
                present += 1;
            } else {
                lifted += 1;
            }
        }
        assert!(lifted > 0, "expected some lifted-finger samples");
        assert!(present > lifted, "finger should be down most of the time");
    }

    #[test]
    fn same_seed_reproduces_the_stream() {
        let mut a = SyntheticSource::new(test_config());
        let mut b = SyntheticSource::new(test_config());
        for _ in 0..500 {
            assert_eq!(a.generate(), b.generate());
        }
    }
}
