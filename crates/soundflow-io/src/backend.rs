//! Pluggable audio backend abstraction.
//!
//! [`AudioBackend`] decouples the playback driver from any specific platform
//! audio API. The trait stays object-safe (boxed callbacks, type-erased
//! stream handles) so tests and other platforms can substitute their own
//! implementation.

use crate::Result;

/// Sample representation of the physical output stream.
///
/// The graph always renders `f32`; an `I16` stream converts at the device
/// boundary. The standalone tone profile (44.1 kHz, 16-bit) uses this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleFormat {
    /// 32-bit float output.
    #[default]
    F32,
    /// Signed 16-bit output.
    I16,
}

/// Configuration for building an output stream.
#[derive(Debug, Clone)]
pub struct BackendStreamConfig {
    /// Requested sample rate in Hz.
    pub sample_rate: u32,
    /// Preferred buffer size in frames.
    pub buffer_size: u32,
    /// Number of audio channels.
    pub channels: u16,
    /// Physical sample representation.
    pub sample_format: SampleFormat,
    /// Optional device name (substring match, case-insensitive); the system
    /// default device when `None`.
    pub device_name: Option<String>,
}

impl Default for BackendStreamConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            buffer_size: 256,
            channels: 2,
            sample_format: SampleFormat::F32,
            device_name: None,
        }
    }
}

/// Type-erased audio stream handle.
///
/// The stream keeps playing while this handle exists; dropping it stops
/// playback and releases the device.
pub struct StreamHandle {
    _inner: Box<dyn Send>,
}

impl StreamHandle {
    /// Wrap a backend-specific stream object, keeping it alive until drop.
    pub fn new<T: Send + 'static>(stream: T) -> Self {
        Self {
            _inner: Box::new(stream),
        }
    }
}

impl std::fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHandle").finish_non_exhaustive()
    }
}

/// Output callback: fill the interleaved `f32` buffer, on the audio thread.
///
/// Implementations must not allocate, lock or perform I/O.
pub type OutputCallback = Box<dyn FnMut(&mut [f32]) + Send>;

/// Error callback: invoked with a human-readable message when the backend
/// reports a streaming fault.
pub type ErrorCallback = Box<dyn FnMut(&str) + Send>;

/// Pluggable audio output backend.
pub trait AudioBackend: Send {
    /// Human-readable backend name.
    fn name(&self) -> &'static str;

    /// Build and start an output stream.
    ///
    /// The callback always receives interleaved `f32` frames; backends
    /// running an [`SampleFormat::I16`] stream convert after the callback
    /// returns.
    fn build_output_stream(
        &self,
        config: &BackendStreamConfig,
        callback: OutputCallback,
        error_callback: ErrorCallback,
    ) -> Result<StreamHandle>;
}
