//! Test tone command.
//!
//! Drives a sine source through the graph on the 44.1 kHz / 16-bit output
//! profile, either live on the device or rendered offline to a WAV file.
//! The offline path pulls the graph exactly the way a device callback
//! would, which makes it a handy smoke test on machines without audio.

use clap::Args;
use soundflow_graph::{
    AudioFormat, GraphConfig, GraphError, NodeSpec, Patch, PcmDecoder, PcmProducer, Rect,
    SineSource,
};
use soundflow_io::{BackendStreamConfig, CpalBackend, PlaybackDriver, SampleFormat, write_wav};
use std::path::PathBuf;

#[derive(Args)]
pub struct ToneArgs {
    /// Tone frequency in Hz
    #[arg(long, default_value = "440.0")]
    freq: f32,

    /// Duration in seconds
    #[arg(long, default_value = "2.0")]
    duration: f32,

    /// Render offline to a WAV file instead of the output device
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Route the tone through the low-pass filter node
    #[arg(long)]
    filtered: bool,
}

/// Decoder standing in for file sources: every "file" is a sine.
struct ToneDecoder {
    freq: f32,
}

impl PcmDecoder for ToneDecoder {
    fn open_file(
        &self,
        _path: &str,
        format: AudioFormat,
    ) -> Result<Box<dyn PcmProducer + Send>, GraphError> {
        Ok(Box::new(SineSource::new(format, self.freq, 0.5)))
    }
}

pub fn run(args: ToneArgs) -> anyhow::Result<()> {
    let config = GraphConfig {
        format: AudioFormat {
            sample_rate: 44_100,
            channels: 2,
        },
        ..GraphConfig::default()
    };
    let format = config.format;
    let (mut patch, mut graph) = Patch::new(config, Box::new(ToneDecoder { freq: args.freq }));

    let src = patch.create(NodeSpec::SourceDecoder { path: "tone" }, "Tone", Rect::default())?;
    let out = patch.create(NodeSpec::Endpoint, "Endpoint", Rect::default())?;
    if args.filtered {
        let lpf = patch.create(NodeSpec::LowPassFilter, "Low Pass", Rect::default())?;
        patch.link(lpf, 0, src, 0)?;
        patch.link(out, 0, lpf, 0)?;
    } else {
        patch.link(out, 0, src, 0)?;
    }

    let total_frames = (args.duration * format.sample_rate as f32) as usize;

    if let Some(path) = &args.output {
        // Offline render: pull fixed blocks the way the callback would.
        let mut samples = Vec::with_capacity(total_frames * format.channels);
        let mut block = vec![0.0_f32; 512 * format.channels];
        let mut rendered = 0_usize;
        while rendered < total_frames {
            let frames = 512.min(total_frames - rendered);
            let buf = &mut block[..frames * format.channels];
            graph.render(buf);
            samples.extend_from_slice(buf);
            rendered += frames;
        }
        write_wav(path, &samples, format)?;
        println!(
            "Wrote {:.1}s tone at {} Hz to {}",
            args.duration,
            args.freq,
            path.display()
        );
        return Ok(());
    }

    let stream_config = BackendStreamConfig {
        sample_rate: format.sample_rate,
        channels: format.channels as u16,
        sample_format: SampleFormat::I16,
        ..BackendStreamConfig::default()
    };
    let backend = CpalBackend::new();
    let driver = PlaybackDriver::start(&backend, &stream_config, graph)?;
    println!("Playing {} Hz for {:.1}s...", args.freq, args.duration);
    std::thread::sleep(std::time::Duration::from_secs_f32(args.duration));
    driver.stop();
    Ok(())
}
