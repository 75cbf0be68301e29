//! Graph-wide configuration.
//!
//! Pool ceilings and DSP tuning constants are explicit configuration rather
//! than hard-coded values, so a graph can be sized per use and tests can run
//! against small pools.

/// Interleaved PCM stream format shared by every producer in one graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Number of interleaved channels (1 = mono, 2 = stereo).
    pub channels: usize,
}

impl AudioFormat {
    /// Number of `f32` samples covering `frames` interleaved frames.
    pub const fn samples_for(&self, frames: usize) -> usize {
        frames * self.channels
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            channels: 2,
        }
    }
}

/// Capacity ceilings and DSP policy for one graph instance.
///
/// `lpf_bias` balances a patch that splits a signal through a filter branch
/// and an echo branch: low-pass nodes scale their output by `lpf_bias`,
/// delay nodes by `1.0 - lpf_bias`.
#[derive(Debug, Clone)]
pub struct GraphConfig {
    /// Stream format every node in the graph renders at.
    pub format: AudioFormat,
    /// Node pool ceiling; creation past this fails with
    /// [`GraphError::PoolExhausted`](crate::GraphError::PoolExhausted).
    pub max_nodes: usize,
    /// Link table ceiling.
    pub max_links: usize,
    /// Largest frame count a single render call may request. Node output
    /// caches are sized from this at creation time so the render path never
    /// allocates.
    pub max_block_frames: usize,
    /// Low-pass cutoff divisor: cutoff = `sample_rate / lpf_cutoff_factor`.
    pub lpf_cutoff_factor: u32,
    /// Output level of low-pass nodes, `0.0..=1.0`.
    pub lpf_bias: f32,
    /// Delay line length in seconds.
    pub delay_seconds: f32,
    /// Echo feedback decay per repeat, `0.0..=1.0`.
    pub delay_decay: f32,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            format: AudioFormat::default(),
            max_nodes: 256,
            max_links: 1024,
            max_block_frames: 4096,
            lpf_cutoff_factor: 80,
            lpf_bias: 0.9,
            delay_seconds: 0.2,
            delay_decay: 0.5,
        }
    }
}
