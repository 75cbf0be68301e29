//! The PCM producer capability.
//!
//! Every audio-generating component behind the graph, from file decoders to
//! test oscillators, exposes the same contract: fill a caller-supplied
//! buffer with interleaved frames on demand. The trait is object-safe so
//! producers can be boxed into node state and swapped at runtime.

use crate::config::AudioFormat;
use libm::sinf;

/// Renders interleaved PCM frames on demand.
///
/// Producers are constructed for a fixed [`AudioFormat`] and pulled from the
/// real-time audio context: implementations must not allocate, block or
/// perform I/O inside [`render`](Self::render).
pub trait PcmProducer {
    /// Fill `out` with up to `frames` interleaved frames and return how many
    /// were actually written.
    ///
    /// `out` holds at least `frames * channels` samples. Frames beyond the
    /// returned count keep their previous contents; callers zero the tail
    /// when a producer runs dry.
    fn render(&mut self, frames: usize, out: &mut [f32]) -> usize;
}

impl core::fmt::Debug for dyn PcmProducer + Send {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PcmProducer").finish_non_exhaustive()
    }
}

/// Endless sine oscillator.
///
/// Drives the standalone tone profile and doubles as a deterministic source
/// in tests and benchmarks. Every channel of a frame carries the same
/// sample.
#[derive(Debug, Clone)]
pub struct SineSource {
    phase: f32,
    step: f32,
    amplitude: f32,
    channels: usize,
}

impl SineSource {
    /// Sine at `freq_hz` for the given stream format.
    pub fn new(format: AudioFormat, freq_hz: f32, amplitude: f32) -> Self {
        Self {
            phase: 0.0,
            step: core::f32::consts::TAU * freq_hz / format.sample_rate as f32,
            amplitude,
            channels: format.channels,
        }
    }
}

impl PcmProducer for SineSource {
    fn render(&mut self, frames: usize, out: &mut [f32]) -> usize {
        for frame in out[..frames * self.channels].chunks_exact_mut(self.channels) {
            let sample = self.amplitude * sinf(self.phase);
            self.phase += self.step;
            if self.phase >= core::f32::consts::TAU {
                self.phase -= core::f32::consts::TAU;
            }
            frame.fill(sample);
        }
        frames
    }
}
