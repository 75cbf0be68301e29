//! Node identity, variants, and per-variant processing state.

use crate::config::GraphConfig;
use crate::dsp::{Biquad, DelayLine};
use crate::producer::PcmProducer;
use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

/// Second-order sections cascaded by the low-pass node (8th-order response).
const LPF_SECTIONS: usize = 4;

/// Unique node identity.
///
/// Assigned monotonically by the registry and never reused for the life of
/// the graph, so a stale id can always be told apart from a live one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Raw integer value, for persistence and display.
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Variant tag selecting a node's processing behavior and port shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Graph sink standing for the playback device. One input, no outputs.
    Endpoint,
    /// File-backed PCM source. No inputs, one output.
    SourceDecoder,
    /// Fixed-cutoff IIR low-pass. One input, one output.
    LowPassFilter,
    /// Duplicates its input to every output unchanged. One input, two or
    /// more outputs.
    Splitter,
    /// Feedback echo over a fixed ring. One input, one output.
    Delay,
}

impl NodeKind {
    /// Display label used when the caller does not name a node.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Endpoint => "Endpoint",
            Self::SourceDecoder => "Source",
            Self::LowPassFilter => "Low Pass Filter",
            Self::Splitter => "Splitter",
            Self::Delay => "Echo / Delay",
        }
    }
}

/// Node placement rectangle on the editor canvas.
///
/// UI-owned data that rides along with the node so saved patches restore
/// their layout.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Width.
    pub w: f32,
    /// Height.
    pub h: f32,
}

impl Rect {
    /// Rectangle from position and size.
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }
}

/// A registered node: identity, variant, port shape and placement.
///
/// The registry owns every `Node`. Processing state lives render-side in the
/// matching [`NodePayload`] and is not reachable from here.
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    name: String,
    kind: NodeKind,
    inputs: usize,
    outputs: usize,
    /// Canvas placement, mutated freely by the editing side.
    pub bounds: Rect,
    source_path: Option<String>,
}

impl Node {
    pub(crate) fn new(
        id: NodeId,
        name: String,
        kind: NodeKind,
        inputs: usize,
        outputs: usize,
        bounds: Rect,
        source_path: Option<String>,
    ) -> Self {
        Self {
            id,
            name,
            kind,
            inputs,
            outputs,
            bounds,
            source_path,
        }
    }

    /// Unique identity.
    pub const fn id(&self) -> NodeId {
        self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Variant tag.
    pub const fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Declared input slot count.
    pub const fn input_count(&self) -> usize {
        self.inputs
    }

    /// Declared output slot count.
    pub const fn output_count(&self) -> usize {
        self.outputs
    }

    /// Backing file path, for decoder nodes.
    pub fn source_path(&self) -> Option<&str> {
        self.source_path.as_deref()
    }
}

/// Per-variant processing state, owned by the render side.
///
/// Built in full on the editing context, resource acquisition included, then
/// moved to the audio context. Applying it there never allocates.
pub enum NodePayload {
    /// Sink: passes its summed input through to the render output.
    Endpoint,
    /// Leaf source pulling from a decoder-backed producer.
    SourceDecoder {
        /// Decoder handle behaving as a plain PCM producer.
        producer: Box<dyn PcmProducer + Send>,
    },
    /// Cascaded low-pass, one section chain per channel.
    LowPassFilter {
        /// Filter state, one four-section cascade per channel.
        stages: Vec<[Biquad; LPF_SECTIONS]>,
        /// Output level (the filter side of the filter/echo balance).
        bias: f32,
    },
    /// Pass-through; every output slot carries the same signal.
    Splitter,
    /// Per-channel feedback ring.
    Delay {
        /// One ring per channel.
        rings: Vec<DelayLine>,
        /// Feedback decay per repeat.
        decay: f32,
        /// Output level, the complement of the filter bias.
        level: f32,
    },
}

impl NodePayload {
    /// Filter bank sized for the configured format and cutoff.
    pub fn low_pass(config: &GraphConfig) -> Self {
        let sample_rate = config.format.sample_rate as f32;
        let cutoff = sample_rate / config.lpf_cutoff_factor as f32;
        let section = Biquad::lowpass(sample_rate, cutoff, Biquad::DEFAULT_Q);
        Self::LowPassFilter {
            stages: vec![[section; LPF_SECTIONS]; config.format.channels],
            bias: config.lpf_bias,
        }
    }

    /// Echo rings sized for the configured delay length.
    pub fn delay(config: &GraphConfig) -> Self {
        let len = (config.format.sample_rate as f32 * config.delay_seconds) as usize;
        Self::Delay {
            rings: (0..config.format.channels)
                .map(|_| DelayLine::new(len))
                .collect(),
            decay: config.delay_decay,
            level: 1.0 - config.lpf_bias,
        }
    }

    /// Wrap a decoder-backed producer as a source payload.
    pub fn source(producer: Box<dyn PcmProducer + Send>) -> Self {
        Self::SourceDecoder { producer }
    }

    /// The variant tag this payload implements.
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Endpoint => NodeKind::Endpoint,
            Self::SourceDecoder { .. } => NodeKind::SourceDecoder,
            Self::LowPassFilter { .. } => NodeKind::LowPassFilter,
            Self::Splitter => NodeKind::Splitter,
            Self::Delay { .. } => NodeKind::Delay,
        }
    }

    /// Process one block: consume `frames` of `input` (the node's summed
    /// upstream buses, interleaved) and write `frames` to `out`.
    ///
    /// Both slices hold exactly `frames * channels` samples.
    pub(crate) fn process(
        &mut self,
        input: &[f32],
        out: &mut [f32],
        frames: usize,
        channels: usize,
    ) {
        match self {
            Self::Endpoint | Self::Splitter => out.copy_from_slice(input),
            Self::SourceDecoder { producer } => {
                let written = producer.render(frames, out).min(frames);
                out[written * channels..].fill(0.0);
            }
            Self::LowPassFilter { stages, bias } => {
                for frame in 0..frames {
                    for ch in 0..channels {
                        let idx = frame * channels + ch;
                        let mut s = input[idx];
                        for section in &mut stages[ch] {
                            s = section.process(s);
                        }
                        out[idx] = *bias * s;
                    }
                }
            }
            Self::Delay {
                rings,
                decay,
                level,
            } => {
                for frame in 0..frames {
                    for ch in 0..channels {
                        let idx = frame * channels + ch;
                        let dry = input[idx];
                        let wet = rings[ch].tick(dry, *decay);
                        out[idx] = *level * (dry + wet);
                    }
                }
            }
        }
    }
}

impl fmt::Debug for NodePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Endpoint => "Endpoint",
            Self::SourceDecoder { .. } => "SourceDecoder",
            Self::LowPassFilter { .. } => "LowPassFilter",
            Self::Splitter => "Splitter",
            Self::Delay { .. } => "Delay",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AudioFormat;

    fn config(sample_rate: u32, channels: usize) -> GraphConfig {
        GraphConfig {
            format: AudioFormat {
                sample_rate,
                channels,
            },
            ..GraphConfig::default()
        }
    }

    /// Finite producer emitting 1.0 on every channel for `left` frames.
    struct Finite {
        left: usize,
        channels: usize,
    }

    impl PcmProducer for Finite {
        fn render(&mut self, frames: usize, out: &mut [f32]) -> usize {
            let n = frames.min(self.left);
            out[..n * self.channels].fill(1.0);
            self.left -= n;
            n
        }
    }

    #[test]
    fn splitter_and_endpoint_are_transparent() {
        let input = [0.1, 0.2, 0.3, 0.4];
        for mut payload in [NodePayload::Splitter, NodePayload::Endpoint] {
            let mut out = [0.0_f32; 4];
            payload.process(&input, &mut out, 2, 2);
            assert_eq!(out, input);
        }
    }

    #[test]
    fn source_zero_fills_past_end_of_stream() {
        let mut payload = NodePayload::source(Box::new(Finite {
            left: 3,
            channels: 2,
        }));
        let input = [0.0_f32; 16];
        let mut out = [9.0_f32; 16];
        payload.process(&input, &mut out, 8, 2);
        assert!(out[..6].iter().all(|s| *s == 1.0));
        assert!(out[6..].iter().all(|s| *s == 0.0));
    }

    #[test]
    fn low_pass_settles_to_biased_dc() {
        let cfg = config(1000, 1);
        let mut payload = NodePayload::low_pass(&cfg);
        let input = [1.0_f32; 64];
        let mut out = [0.0_f32; 64];
        for _ in 0..40 {
            payload.process(&input, &mut out, 64, 1);
        }
        // DC gain is unity through the cascade; the output bias scales it.
        assert!(
            (out[63] - cfg.lpf_bias).abs() < 0.01,
            "expected ~{}, got {}",
            cfg.lpf_bias,
            out[63]
        );
    }

    #[test]
    fn delay_mixes_dry_at_complement_level() {
        let cfg = config(100, 1); // 20-sample ring at 0.2 s
        let mut payload = NodePayload::delay(&cfg);
        let mut input = [0.0_f32; 20];
        input[0] = 1.0;
        let mut out = [0.0_f32; 20];
        payload.process(&input, &mut out, 20, 1);
        // Dry impulse scaled by 1 - lpf_bias.
        assert!((out[0] - 0.1).abs() < 1e-6);
        assert!(out[1..].iter().all(|s| *s == 0.0));

        // One ring later the echo comes back at the same level.
        let silence = [0.0_f32; 20];
        payload.process(&silence, &mut out, 20, 1);
        assert!((out[0] - 0.1).abs() < 1e-6);

        // And decays by the feedback coefficient on the next trip.
        payload.process(&silence, &mut out, 20, 1);
        assert!((out[0] - 0.05).abs() < 1e-6);
    }

    #[test]
    fn delay_rings_are_per_channel() {
        let cfg = config(100, 2);
        let mut payload = NodePayload::delay(&cfg);
        // Impulse on the left channel only.
        let mut input = [0.0_f32; 40];
        input[0] = 1.0;
        let mut out = [0.0_f32; 40];
        payload.process(&input, &mut out, 20, 2);
        let silence = [0.0_f32; 40];
        payload.process(&silence, &mut out, 20, 2);
        assert!((out[0] - 0.1).abs() < 1e-6, "left echo expected");
        assert_eq!(out[1], 0.0, "right channel must stay silent");
    }
}
