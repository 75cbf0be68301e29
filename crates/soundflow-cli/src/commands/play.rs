//! Patch playback command.
//!
//! `soundflow play file.wav` builds the default source -> endpoint patch;
//! `soundflow play --patch session.toml` rebuilds a saved graph instead.
//! Either way the graph runs live on the device callback until Ctrl+C (or
//! `--duration` elapses), with structural edits already paid for up front.

use crate::patch::PatchFile;
use anyhow::Context;
use clap::Args;
use soundflow_graph::{GraphConfig, NodeSpec, Patch, Rect};
use soundflow_io::{BackendStreamConfig, CpalBackend, PlaybackDriver, WavDecoder};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

#[derive(Args)]
pub struct PlayArgs {
    /// WAV file to play through a source -> endpoint patch
    #[arg(value_name = "FILE", required_unless_present = "patch")]
    file: Option<PathBuf>,

    /// Saved patch file (TOML) to rebuild instead of the default topology
    #[arg(short, long)]
    patch: Option<PathBuf>,

    /// Output device (case-insensitive substring; system default if unset)
    #[arg(short, long)]
    device: Option<String>,

    /// Callback buffer size in frames
    #[arg(long, default_value = "512")]
    buffer_size: u32,

    /// Stop after this many seconds (runs until Ctrl+C otherwise)
    #[arg(long)]
    duration: Option<f32>,
}

pub fn run(args: PlayArgs) -> anyhow::Result<()> {
    let config = GraphConfig::default();
    let format = config.format;
    let (mut patch, graph) = Patch::new(config, Box::new(WavDecoder));

    if let Some(path) = &args.patch {
        let file = PatchFile::load(path)
            .with_context(|| format!("loading patch {}", path.display()))?;
        println!(
            "Building patch '{}' ({} nodes, {} links)...",
            file.name,
            file.nodes.len(),
            file.links.len()
        );
        file.build(&mut patch)?;
    } else if let Some(file) = &args.file {
        let path = file.to_string_lossy();
        println!("Loading {path}...");
        let src = patch.create(
            NodeSpec::SourceDecoder { path: &path },
            "Source",
            Rect::new(40.0, 120.0, 180.0, 220.0),
        )?;
        let out = patch.create(
            NodeSpec::Endpoint,
            "Endpoint",
            Rect::new(400.0, 120.0, 180.0, 120.0),
        )?;
        patch.link(out, 0, src, 0)?;
    }

    let stream_config = BackendStreamConfig {
        sample_rate: format.sample_rate,
        buffer_size: args.buffer_size,
        channels: format.channels as u16,
        device_name: args.device.clone(),
        ..BackendStreamConfig::default()
    };

    let backend = CpalBackend::new();
    let driver = PlaybackDriver::start(&backend, &stream_config, graph)?;

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        println!("\nStopping...");
        r.store(false, Ordering::SeqCst);
    })
    .context("failed to install Ctrl+C handler")?;

    match args.duration {
        Some(secs) => {
            println!("Playing for {secs:.1}s...");
            let deadline = Instant::now() + Duration::from_secs_f32(secs);
            while running.load(Ordering::Relaxed) && Instant::now() < deadline {
                std::thread::sleep(Duration::from_millis(50));
            }
        }
        None => {
            println!("Playing... Press Ctrl+C to stop.");
            while running.load(Ordering::Relaxed) {
                std::thread::sleep(Duration::from_millis(50));
            }
        }
    }

    driver.stop();
    println!("Done!");
    Ok(())
}
