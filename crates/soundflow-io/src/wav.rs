//! WAV decoding into graph producers, plus minimal encoding.

use crate::Result;
use hound::{SampleFormat, WavReader};
use soundflow_graph::{AudioFormat, GraphError, PcmDecoder, PcmProducer};
use std::path::Path;

/// In-memory PCM producer.
///
/// Frames are decoded ahead of time; rendering copies them out on demand
/// and reports exhaustion by returning short counts, which the graph turns
/// into silence.
pub struct MemorySource {
    samples: Vec<f32>,
    pos: usize,
    channels: usize,
}

impl MemorySource {
    /// Wrap pre-decoded interleaved samples.
    pub fn new(samples: Vec<f32>, channels: usize) -> Self {
        Self {
            samples,
            pos: 0,
            channels,
        }
    }

    /// Total frame count.
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels
    }

    /// Whether every frame has been rendered.
    pub fn exhausted(&self) -> bool {
        self.pos >= self.samples.len()
    }
}

impl PcmProducer for MemorySource {
    fn render(&mut self, frames: usize, out: &mut [f32]) -> usize {
        let want = frames * self.channels;
        let take = want.min(self.samples.len() - self.pos);
        out[..take].copy_from_slice(&self.samples[self.pos..self.pos + take]);
        self.pos += take;
        take / self.channels
    }
}

/// Decoder capability backed by hound.
///
/// The whole file is decoded at open time on the calling context: samples
/// are converted to `f32`, channel-mapped to the graph's channel count and
/// linearly resampled to the graph's sample rate. The producer handed to
/// the audio thread touches only memory.
#[derive(Debug, Default, Clone, Copy)]
pub struct WavDecoder;

impl PcmDecoder for WavDecoder {
    fn open_file(
        &self,
        path: &str,
        format: AudioFormat,
    ) -> std::result::Result<Box<dyn PcmProducer + Send>, GraphError> {
        let samples = decode_file(path, format).map_err(|e| GraphError::ResourceInitFailed {
            reason: e.to_string(),
        })?;
        tracing::debug!(
            path,
            frames = samples.len() / format.channels,
            sample_rate = format.sample_rate,
            "decoded WAV into memory"
        );
        Ok(Box::new(MemorySource::new(samples, format.channels)))
    }
}

/// Decode `path` to interleaved f32 at `format`.
fn decode_file(path: impl AsRef<Path>, format: AudioFormat) -> Result<Vec<f32>> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    let file_channels = spec.channels as usize;

    let raw: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<_, _>>()?,
        SampleFormat::Int => {
            let max_val = (1_i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<std::result::Result<_, _>>()?
        }
    };

    let mapped = map_channels(&raw, file_channels, format.channels);
    Ok(resample(
        &mapped,
        format.channels,
        spec.sample_rate,
        format.sample_rate,
    ))
}

/// Spread interleaved frames from `from` channels across `to` channels:
/// mono duplicates, surplus file channels are dropped, missing ones reuse
/// the last available channel.
fn map_channels(src: &[f32], from: usize, to: usize) -> Vec<f32> {
    if from == to || from == 0 {
        return src.to_vec();
    }
    let frames = src.len() / from;
    let mut out = Vec::with_capacity(frames * to);
    for frame in src.chunks_exact(from) {
        for ch in 0..to {
            out.push(frame[ch.min(from - 1)]);
        }
    }
    out
}

/// Linear-interpolation resampler, run once at load time.
fn resample(src: &[f32], channels: usize, from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || src.is_empty() {
        return src.to_vec();
    }
    let src_frames = src.len() / channels;
    let out_frames = (src_frames as u64 * u64::from(to_rate) / u64::from(from_rate)) as usize;
    let step = f64::from(from_rate) / f64::from(to_rate);
    let mut out = Vec::with_capacity(out_frames * channels);
    for i in 0..out_frames {
        let t = i as f64 * step;
        let i0 = (t as usize).min(src_frames - 1);
        let i1 = (i0 + 1).min(src_frames - 1);
        let frac = (t - i0 as f64) as f32;
        for ch in 0..channels {
            let a = src[i0 * channels + ch];
            let b = src[i1 * channels + ch];
            out.push(a + (b - a) * frac);
        }
    }
    out
}

/// Write interleaved f32 samples as a 16-bit PCM WAV file.
pub fn write_wav(path: impl AsRef<Path>, samples: &[f32], format: AudioFormat) -> Result<()> {
    let spec = hound::WavSpec {
        channels: format.channels as u16,
        sample_rate: format.sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for &s in samples {
        let v = (s.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16;
        writer.write_sample(v)?;
    }
    writer.finalize()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_test_wav(path: &Path, samples: &[f32], channels: usize, sample_rate: u32) {
        let format = AudioFormat {
            sample_rate,
            channels,
        };
        write_wav(path, samples, format).unwrap();
    }

    #[test]
    fn memory_source_reports_short_counts_at_the_end() {
        let mut src = MemorySource::new(vec![0.1; 10], 2); // 5 stereo frames
        assert_eq!(src.frames(), 5);

        let mut buf = [9.0_f32; 8];
        assert_eq!(src.render(4, &mut buf), 4);
        assert_eq!(src.render(4, &mut buf), 1);
        assert!(src.exhausted());
        assert_eq!(src.render(4, &mut buf), 0);
        // The unwritten tail belongs to the caller.
        assert_eq!(buf[2], 9.0);
    }

    #[test]
    fn decode_round_trips_at_matching_format() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tone.wav");
        let format = AudioFormat {
            sample_rate: 48_000,
            channels: 2,
        };

        let samples: Vec<f32> = (0..960)
            .map(|i| (i as f32 / 960.0 * std::f32::consts::TAU).sin() * 0.5)
            .collect();
        write_test_wav(&path, &samples, 2, 48_000);

        let mut producer = WavDecoder
            .open_file(path.to_str().unwrap(), format)
            .unwrap();
        let mut decoded = vec![0.0_f32; 960];
        assert_eq!(producer.render(480, &mut decoded), 480);
        for (orig, got) in samples.iter().zip(&decoded) {
            assert!((orig - got).abs() < 1e-3, "16-bit round trip drifted");
        }
    }

    #[test]
    fn mono_files_duplicate_across_stereo() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mono.wav");
        let samples: Vec<f32> = (0..100).map(|i| i as f32 / 100.0).collect();
        write_test_wav(&path, &samples, 1, 48_000);

        let format = AudioFormat {
            sample_rate: 48_000,
            channels: 2,
        };
        let mut producer = WavDecoder
            .open_file(path.to_str().unwrap(), format)
            .unwrap();
        let mut decoded = vec![0.0_f32; 200];
        assert_eq!(producer.render(100, &mut decoded), 100);
        for frame in decoded.chunks_exact(2) {
            assert_eq!(frame[0], frame[1]);
        }
    }

    #[test]
    fn decoding_resamples_to_the_graph_rate() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cd.wav");
        let samples = vec![0.25_f32; 4410 * 2]; // 0.1 s of stereo at 44.1 kHz
        write_test_wav(&path, &samples, 2, 44_100);

        let format = AudioFormat {
            sample_rate: 48_000,
            channels: 2,
        };
        let mut producer = WavDecoder
            .open_file(path.to_str().unwrap(), format)
            .unwrap();
        // 0.1 s at 48 kHz is 4800 frames.
        let mut decoded = vec![0.0_f32; 4800 * 2];
        let frames = producer.render(4800, &mut decoded);
        assert!((4795..=4800).contains(&frames), "got {frames} frames");
        assert!((decoded[0] - 0.25).abs() < 1e-2);
    }

    #[test]
    fn missing_file_becomes_a_resource_error() {
        let err = WavDecoder
            .open_file("/no/such/file.wav", AudioFormat::default())
            .unwrap_err();
        assert!(matches!(err, GraphError::ResourceInitFailed { .. }));
    }

    #[test]
    fn channel_mapping_drops_surplus_channels() {
        // 2 frames of 3-channel audio down to 2 channels.
        let src = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        assert_eq!(map_channels(&src, 3, 2), vec![1.0, 2.0, 4.0, 5.0]);
        // And 1 channel up to 3.
        assert_eq!(map_channels(&[7.0], 1, 3), vec![7.0, 7.0, 7.0]);
    }

    #[test]
    fn resample_is_identity_at_equal_rates() {
        let src = [0.1, 0.2, 0.3, 0.4];
        assert_eq!(resample(&src, 2, 48_000, 48_000), src.to_vec());
    }
}
