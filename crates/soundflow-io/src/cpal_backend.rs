//! cpal-based audio backend implementation.
//!
//! [`CpalBackend`] wraps [cpal](https://crates.io/crates/cpal) for
//! cross-platform output: ALSA (Linux), CoreAudio (macOS), WASAPI
//! (Windows).

use crate::backend::{
    AudioBackend, BackendStreamConfig, ErrorCallback, OutputCallback, SampleFormat, StreamHandle,
};
use crate::{Error, Result};
use cpal::Host;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

/// cpal-based audio backend.
///
/// Holds a cpal [`Host`], the connection to the platform's audio system.
pub struct CpalBackend {
    host: Host,
}

impl CpalBackend {
    /// Backend on the platform's default audio host.
    pub fn new() -> Self {
        tracing::info!(
            host = cpal::default_host().id().name(),
            "cpal backend initialized"
        );
        Self {
            host: cpal::default_host(),
        }
    }

    /// Find an output device by case-insensitive substring, or the default.
    fn find_output_device(&self, name: Option<&str>) -> Result<cpal::Device> {
        match name {
            Some(search) => {
                let search_lower = search.to_lowercase();
                let devices = self
                    .host
                    .output_devices()
                    .map_err(|e| Error::Stream(e.to_string()))?;

                for device in devices {
                    if let Ok(dev_name) = device.name()
                        && dev_name.to_lowercase().contains(&search_lower)
                    {
                        return Ok(device);
                    }
                }
                Err(Error::DeviceNotFound(format!(
                    "no output device matching '{search}'"
                )))
            }
            None => self.host.default_output_device().ok_or(Error::NoDevice),
        }
    }
}

impl Default for CpalBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBackend for CpalBackend {
    fn name(&self) -> &'static str {
        "cpal"
    }

    fn build_output_stream(
        &self,
        config: &BackendStreamConfig,
        mut callback: OutputCallback,
        mut error_callback: ErrorCallback,
    ) -> Result<StreamHandle> {
        let device = self.find_output_device(config.device_name.as_deref())?;

        let stream_config = cpal::StreamConfig {
            channels: config.channels,
            sample_rate: config.sample_rate,
            buffer_size: cpal::BufferSize::Fixed(config.buffer_size),
        };

        let stream = match config.sample_format {
            SampleFormat::F32 => device
                .build_output_stream(
                    &stream_config,
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        callback(data);
                    },
                    move |err| {
                        error_callback(&err.to_string());
                    },
                    None,
                )
                .map_err(|e| Error::Stream(e.to_string()))?,
            SampleFormat::I16 => {
                // The graph renders f32; convert at the device edge from a
                // persistent scratch. Chunking by the scratch length keeps
                // the callback allocation-free for any delivered size.
                let mut scratch =
                    vec![0.0_f32; config.buffer_size as usize * config.channels as usize];
                device
                    .build_output_stream(
                        &stream_config,
                        move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                            for chunk in data.chunks_mut(scratch.len()) {
                                let frames = &mut scratch[..chunk.len()];
                                callback(frames);
                                for (d, s) in chunk.iter_mut().zip(frames.iter()) {
                                    *d = sample_to_i16(*s);
                                }
                            }
                        },
                        move |err| {
                            error_callback(&err.to_string());
                        },
                        None,
                    )
                    .map_err(|e| Error::Stream(e.to_string()))?
            }
        };

        stream.play().map_err(|e| Error::Stream(e.to_string()))?;
        tracing::info!(
            channels = config.channels,
            sample_rate = config.sample_rate,
            format = ?config.sample_format,
            "output stream started"
        );

        Ok(StreamHandle::new(stream))
    }
}

/// Convert one f32 sample in `[-1, 1]` to i16 with clamping.
fn sample_to_i16(s: f32) -> i16 {
    (s.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16
}
