//! DSP primitives behind the node variants.
//!
//! Deliberately small: one IIR low-pass section (cascaded by the filter node
//! for a steeper rolloff) and one fixed-length feedback ring (the echo
//! node). Both flush subnormal state so a decayed tail cannot park the CPU
//! in denormal arithmetic.

use alloc::vec;
use alloc::vec::Vec;
use libm::{cosf, sinf};

/// Flush subnormal filter state to zero.
#[inline]
pub(crate) fn flush_denormal(x: f32) -> f32 {
    if x.abs() < 1e-20 { 0.0 } else { x }
}

/// Second-order IIR low-pass section.
///
/// RBJ cookbook coefficients in transposed direct form II. One section gives
/// a 12 dB/octave slope; cascading `n` sections gives `n * 12`.
#[derive(Debug, Clone, Copy)]
pub struct Biquad {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    z1: f32,
    z2: f32,
}

impl Biquad {
    /// Butterworth-style Q for a single section.
    pub const DEFAULT_Q: f32 = core::f32::consts::FRAC_1_SQRT_2;

    /// Low-pass section with cutoff `freq_hz` at `sample_rate`.
    pub fn lowpass(sample_rate: f32, freq_hz: f32, q: f32) -> Self {
        let omega = core::f32::consts::TAU * freq_hz / sample_rate;
        let (sin_w, cos_w) = (sinf(omega), cosf(omega));
        let alpha = sin_w / (2.0 * q);
        let a0 = 1.0 + alpha;
        Self {
            b0: ((1.0 - cos_w) * 0.5) / a0,
            b1: (1.0 - cos_w) / a0,
            b2: ((1.0 - cos_w) * 0.5) / a0,
            a1: (-2.0 * cos_w) / a0,
            a2: (1.0 - alpha) / a0,
            z1: 0.0,
            z2: 0.0,
        }
    }

    /// Process one sample.
    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        let y = self.b0 * x + self.z1;
        self.z1 = flush_denormal(self.b1 * x - self.a1 * y + self.z2);
        self.z2 = flush_denormal(self.b2 * x - self.a2 * y);
        y
    }

    /// Clear filter state, keeping coefficients.
    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }
}

/// Fixed-length delay ring with feedback.
#[derive(Debug, Clone)]
pub struct DelayLine {
    buf: Vec<f32>,
    pos: usize,
}

impl DelayLine {
    /// Ring of `len` samples (minimum one).
    pub fn new(len: usize) -> Self {
        Self {
            buf: vec![0.0; len.max(1)],
            pos: 0,
        }
    }

    /// Advance one sample: return the sample written a full ring ago and
    /// store `input + delayed * decay` in its place, so each trip around the
    /// ring decays the echo by `decay`.
    #[inline]
    pub fn tick(&mut self, input: f32, decay: f32) -> f32 {
        let delayed = self.buf[self.pos];
        self.buf[self.pos] = flush_denormal(input + delayed * decay);
        self.pos += 1;
        if self.pos == self.buf.len() {
            self.pos = 0;
        }
        delayed
    }

    /// Ring length in samples.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Always false; rings have a minimum length of one sample.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Zero the ring contents.
    pub fn reset(&mut self) {
        self.buf.fill(0.0);
        self.pos = 0;
    }
}
