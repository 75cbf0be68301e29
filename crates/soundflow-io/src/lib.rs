//! Audio device and file I/O for the soundflow graph runtime.
//!
//! Three concerns live here, all deliberately outside the graph core:
//!
//! - **WAV decoding**: [`WavDecoder`] implements the graph's decoder
//!   capability. Files are decoded, channel-mapped and resampled to the
//!   graph format at open time, so the audio thread only ever copies from
//!   memory.
//! - **Backend abstraction**: [`AudioBackend`] decouples stream
//!   construction from any one platform API; [`CpalBackend`] is the
//!   default implementation.
//! - **Playback driver**: [`PlaybackDriver`] owns the output stream and
//!   does exactly one thing per device callback: pull a block from the
//!   graph (or write silence while stopped).

mod backend;
mod cpal_backend;
mod driver;
mod wav;

pub use backend::{
    AudioBackend, BackendStreamConfig, ErrorCallback, OutputCallback, SampleFormat, StreamHandle,
};
pub use cpal_backend::CpalBackend;
pub use driver::PlaybackDriver;
pub use wav::{MemorySource, WavDecoder, write_wav};

/// Error type for device and file I/O operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// WAV file read/write error.
    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),

    /// Audio stream setup or runtime error.
    #[error("audio stream error: {0}")]
    Stream(String),

    /// No audio output device available on the system.
    #[error("no audio output device available")]
    NoDevice,

    /// The requested audio device was not found.
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    /// The callback buffer exceeds what the graph was sized for.
    #[error("buffer of {requested} frames exceeds the graph ceiling of {max} frames")]
    BufferTooLarge {
        /// Frames requested per callback.
        requested: usize,
        /// The graph's configured block ceiling.
        max: usize,
    },

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type for I/O operations.
pub type Result<T> = std::result::Result<T, Error>;
