//! Frame reduction: circular-ROI channel means and finger presence.
//!
//! The acquisition collaborator hands the sampler a raw RGBA pixel buffer;
//! the sampler reduces it to per-channel ROI means and decides whether a
//! fingertip actually covers the lens. Everything downstream consumes only
//! the reduced [`Sample`].

use crate::dsp::SlidingWindow;
use crate::types::Sample;

/// Bytes per pixel in the incoming buffer (RGBA)
const BYTES_PER_PIXEL: usize = 4;

/// Channel value at or above which a pixel is treated as clipped
const SATURATION_LIMIT: u8 = 250;

/// Finger-presence gates: red/green ratio band, ROI brightness band, and
/// minimum green variance over the last 30 frames.
const RATIO_MIN: f64 = 1.2;
const RATIO_MAX: f64 = 2.5;
const INTENSITY_MIN: f64 = 60.0;
const INTENSITY_MAX: f64 = 200.0;
const VARIANCE_MIN: f64 = 10.0;

/// Frames of green-mean history used for the variance gate
const VARIANCE_WINDOW: usize = 30;

/// Reduces frames to ROI channel means and tracks the finger-variance
/// window across frames.
#[derive(Debug, Clone)]
pub struct FrameSampler {
    green_history: SlidingWindow,
}

impl FrameSampler {
    pub fn new() -> Self {
        Self {
            green_history: SlidingWindow::new(VARIANCE_WINDOW),
        }
    }

    /// Reduce one frame to a [`Sample`].
    ///
    /// The ROI is a circle centered in the frame with radius one quarter of
    /// the shorter dimension. Pixels with any channel at or above 250 are
    /// rejected as clipped. Returns `None` when no usable pixels remain —
    /// a dropped frame, not an error; the caller simply waits for the next
    /// one.
    pub fn sample(
        &mut self,
        pixels: &[u8],
        width: usize,
        height: usize,
        timestamp_ms: i64,
    ) -> Option<Sample> {
        if width == 0 || height == 0 || pixels.len() < width * height * BYTES_PER_PIXEL {
            tracing::warn!(
                width,
                height,
                bytes = pixels.len(),
                "Undersized frame buffer — dropping frame"
            );
            return None;
        }

        let center_x = width as f64 / 2.0;
        let center_y = height as f64 / 2.0;
        let radius = width.min(height) as f64 / 4.0;
        let radius_sq = radius * radius;

        let y_min = (center_y - radius).floor().max(0.0) as usize;
        let y_max = ((center_y + radius).ceil() as usize).min(height);
        let x_min = (center_x - radius).floor().max(0.0) as usize;
        let x_max = ((center_x + radius).ceil() as usize).min(width);

        let mut red_sum = 0u64;
        let mut green_sum = 0u64;
        let mut intensity_sum = 0u64;
        let mut count = 0u64;

        for y in y_min..y_max {
            for x in x_min..x_max {
                let dx = x as f64 - center_x;
                let dy = y as f64 - center_y;
                if dx * dx + dy * dy > radius_sq {
                    continue;
                }
                let index = (y * width + x) * BYTES_PER_PIXEL;
                let red = pixels[index];
                let green = pixels[index + 1];
                let blue = pixels[index + 2];

                if red < SATURATION_LIMIT && green < SATURATION_LIMIT && blue < SATURATION_LIMIT {
                    red_sum += u64::from(red);
                    green_sum += u64::from(green);
                    intensity_sum += u64::from(red) + u64::from(green) + u64::from(blue);
                    count += 1;
                }
            }
        }

        if count == 0 {
            tracing::debug!(timestamp_ms, "All ROI pixels clipped — dropping frame");
            return None;
        }

        let red_mean = red_sum as f64 / count as f64;
        let green_mean = green_sum as f64 / count as f64;
        let avg_intensity = intensity_sum as f64 / (3.0 * count as f64);

        let finger_present = self.detect_finger(red_mean, green_mean, avg_intensity);

        Some(Sample {
            timestamp_ms,
            red_mean,
            green_mean,
            finger_present,
        })
    }

    /// All three gates must hold: color ratio, brightness, and recent
    /// signal variance (a static image under the lens has none).
    fn detect_finger(&mut self, red_mean: f64, green_mean: f64, avg_intensity: f64) -> bool {
        let ratio = red_mean / (green_mean + 1.0);
        let valid_ratio = ratio > RATIO_MIN && ratio < RATIO_MAX;
        let valid_intensity = avg_intensity > INTENSITY_MIN && avg_intensity < INTENSITY_MAX;

        self.green_history.push(green_mean);
        let valid_variance = self.green_history.population_variance() > VARIANCE_MIN;

        valid_ratio && valid_intensity && valid_variance
    }

    pub fn reset(&mut self) {
        self.green_history.clear();
    }
}

impl Default for FrameSampler {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
