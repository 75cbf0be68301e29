//! Soundflow audio graph runtime.
//!
//! The engine behind an interactive audio patching tool: a mutable directed
//! graph of audio nodes (file-backed sources, a low-pass filter, splitters,
//! feedback delays and a playback endpoint) that keeps meeting real-time
//! deadlines while being edited.
//!
//! # Architecture
//!
//! A running graph is split across two contexts joined by a command queue:
//!
//! - [`Patch`] lives on the editing context and owns the [`NodeRegistry`]
//!   (pool, identity, z-order) and the [`LinkTable`] (structural
//!   connections). Mutations validate here first, then ship commands.
//! - [`RenderGraph`] lives on the audio context and owns every node's
//!   processing state and the live wiring. It drains pending commands at
//!   the start of each buffer, then pulls interleaved frames from the
//!   endpoint root down through the attached producers.
//!
//! Structural failures surface on the editing side as [`GraphError`]; the
//! render side never errors. Detached inputs, exhausted decoders and a
//! missing endpoint all degrade to silence, and the render path never
//! allocates, locks or blocks.
//!
//! # `no_std`
//!
//! The data structures and DSP need only `alloc`; the engine split sits
//! behind the default `std` feature.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod config;
pub mod dsp;
mod error;
pub mod links;
pub mod node;
pub mod producer;
pub mod registry;

#[cfg(feature = "std")]
pub mod engine;

pub use config::{AudioFormat, GraphConfig};
pub use error::GraphError;
pub use links::{Link, LinkTable};
pub use node::{Node, NodeId, NodeKind, NodePayload, Rect};
pub use producer::{PcmProducer, SineSource};
pub use registry::NodeRegistry;

#[cfg(feature = "std")]
pub use engine::{NodeSpec, Patch, PcmDecoder, RenderGraph};
