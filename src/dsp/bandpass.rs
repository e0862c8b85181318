//! 4th-order IIR bandpass filter.
//!
//! Two instances run in parallel on the normalized signal: a wide band
//! (default 0.5–8 Hz) feeding the waveform and quality score, and a narrow
//! band (default 0.7–4 Hz) feeding beat detection.
//!
//! Coefficients are built at construction from two bilinear-transform
//! Butterworth biquads — a high-pass at the low corner and a low-pass at the
//! high corner, Q = 1/√2 — convolved into a single 4th-order section
//! (5-tap `b` and `a`, `a[0]` normalized to 1). This replaces the earlier
//! closed-form bandpass approximation, which was numerically unstable for
//! wide passbands; see DESIGN.md.

use std::f64::consts::{FRAC_1_SQRT_2, PI};

/// Number of taps in each coefficient vector (filter order + 1)
const TAPS: usize = 5;

/// Streaming direct-form IIR bandpass with fixed coefficients and
/// input/output delay lines.
#[derive(Debug, Clone)]
pub struct BandpassFilter {
    b: [f64; TAPS],
    a: [f64; TAPS],
    x: [f64; TAPS],
    y: [f64; TAPS],
}

impl BandpassFilter {
    /// Design a bandpass for the given corner frequencies and sampling rate.
    ///
    /// Cutoffs must satisfy `0 < low < high < sampling_rate / 2`; the
    /// config layer validates this before construction.
    pub fn new(low_cutoff_hz: f64, high_cutoff_hz: f64, sampling_rate_hz: f64) -> Self {
        let (b_hp, a_hp) = biquad_highpass(low_cutoff_hz, sampling_rate_hz);
        let (b_lp, a_lp) = biquad_lowpass(high_cutoff_hz, sampling_rate_hz);

        let mut b = convolve(b_hp, b_lp);
        let mut a = convolve(a_hp, a_lp);

        // Normalize so a[0] == 1
        let a0 = a[0];
        for i in 0..TAPS {
            b[i] /= a0;
            a[i] /= a0;
        }

        Self {
            b,
            a,
            x: [0.0; TAPS],
            y: [0.0; TAPS],
        }
    }

    /// Process one sample and return the filtered value.
    pub fn process(&mut self, input: f64) -> f64 {
        // Never let a bad upstream value poison the delay lines
        let input = if input.is_finite() { input } else { 0.0 };

        // Shift the input delay line, newest first
        for i in (1..TAPS).rev() {
            self.x[i] = self.x[i - 1];
        }
        self.x[0] = input;

        let mut output = 0.0;
        for i in 0..TAPS {
            output += self.b[i] * self.x[i];
        }
        // a[0] is 1 and multiplies the output itself — skip it
        for i in 1..TAPS {
            output -= self.a[i] * self.y[i - 1];
        }

        for i in (1..TAPS).rev() {
            self.y[i] = self.y[i - 1];
        }
        self.y[0] = output;

        output
    }

    /// Zero both delay lines; coefficients are retained.
    pub fn reset(&mut self) {
        self.x = [0.0; TAPS];
        self.y = [0.0; TAPS];
    }

    /// Feedforward coefficients (normalized)
    pub fn feedforward(&self) -> &[f64; TAPS] {
        &self.b
    }

    /// Feedback coefficients (normalized, `a[0] == 1`)
    pub fn feedback(&self) -> &[f64; TAPS] {
        &self.a
    }
}

// ============================================================================
// Coefficient design
// ============================================================================

/// 2nd-order Butterworth high-pass via the bilinear transform.
///
/// The `cos(w0)` terms carry the frequency pre-warping of the analog
/// prototype corner.
fn biquad_highpass(cutoff_hz: f64, sampling_rate_hz: f64) -> ([f64; 3], [f64; 3]) {
    let w0 = 2.0 * PI * cutoff_hz / sampling_rate_hz;
    let cos_w0 = w0.cos();
    let alpha = w0.sin() * FRAC_1_SQRT_2; // sin(w0) / (2Q), Q = 1/sqrt(2)

    let b = [(1.0 + cos_w0) / 2.0, -(1.0 + cos_w0), (1.0 + cos_w0) / 2.0];
    let a = [1.0 + alpha, -2.0 * cos_w0, 1.0 - alpha];
    (b, a)
}

/// 2nd-order Butterworth low-pass via the bilinear transform.
fn biquad_lowpass(cutoff_hz: f64, sampling_rate_hz: f64) -> ([f64; 3], [f64; 3]) {
    let w0 = 2.0 * PI * cutoff_hz / sampling_rate_hz;
    let cos_w0 = w0.cos();
    let alpha = w0.sin() * FRAC_1_SQRT_2;

    let b = [(1.0 - cos_w0) / 2.0, 1.0 - cos_w0, (1.0 - cos_w0) / 2.0];
    let a = [1.0 + alpha, -2.0 * cos_w0, 1.0 - alpha];
    (b, a)
}

/// Polynomial product of two biquad coefficient triples.
fn convolve(p: [f64; 3], q: [f64; 3]) -> [f64; TAPS] {
    [
        p[0] * q[0],
        p[0] * q[1] + p[1] * q[0],
        p[0] * q[2] + p[1] * q[1] + p[2] * q[0],
        p[1] * q[2] + p[2] * q[1],
        p[2] * q[2],
    ]
}

// ============================================================================
// Tests
// ============================================================================
