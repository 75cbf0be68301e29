//! Playback driver: the bridge between the device callback and the graph.

use crate::backend::{AudioBackend, BackendStreamConfig, StreamHandle};
use crate::{Error, Result};
use soundflow_graph::RenderGraph;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Owns the output stream and transport state for one graph.
///
/// The device callback does exactly one thing per invocation: pull a block
/// from [`RenderGraph::render`]. While the transport is stopped it drains
/// graph commands and writes silence instead, so edits made while paused
/// still apply and the command queue stays bounded.
///
/// Dropping the driver stops the stream and releases the device.
#[derive(Debug)]
pub struct PlaybackDriver {
    _stream: StreamHandle,
    playing: Arc<AtomicBool>,
}

impl PlaybackDriver {
    /// Build the output stream and move `graph` onto the audio thread.
    ///
    /// Fails with [`Error::BufferTooLarge`] when the requested buffer size
    /// exceeds the block ceiling the graph's caches were sized for, since a
    /// larger callback would be truncated to silence past the ceiling.
    pub fn start(
        backend: &dyn AudioBackend,
        config: &BackendStreamConfig,
        mut graph: RenderGraph,
    ) -> Result<Self> {
        let max = graph.max_block_frames();
        if config.buffer_size as usize > max {
            return Err(Error::BufferTooLarge {
                requested: config.buffer_size as usize,
                max,
            });
        }

        let playing = Arc::new(AtomicBool::new(true));
        let playing_cb = Arc::clone(&playing);
        let stream = backend.build_output_stream(
            config,
            Box::new(move |data: &mut [f32]| {
                if playing_cb.load(Ordering::Relaxed) {
                    graph.render(data);
                } else {
                    graph.sync();
                    data.fill(0.0);
                }
            }),
            Box::new(|err| {
                tracing::error!("output stream error: {err}");
            }),
        )?;

        tracing::info!(backend = backend.name(), "playback started");
        Ok(Self {
            _stream: stream,
            playing,
        })
    }

    /// Resume pulling audio from the graph.
    pub fn play(&self) {
        self.playing.store(true, Ordering::Relaxed);
    }

    /// Silence the output without tearing the stream down.
    pub fn stop(&self) {
        self.playing.store(false, Ordering::Relaxed);
    }

    /// Whether the callback is currently pulling the graph.
    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Relaxed)
    }
}
