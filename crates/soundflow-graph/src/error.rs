//! Error taxonomy for graph mutation.

use crate::node::NodeId;
use alloc::string::String;
use core::fmt;

/// Errors returned by registry, link table and engine operations.
///
/// Only the editing side ever sees these. Render-path failures do not exist
/// as errors: a detached input, an exhausted decoder or a missing endpoint
/// all degrade to silence instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// A fixed-capacity pool (node registry or link table) is full.
    PoolExhausted {
        /// The configured ceiling that was hit.
        capacity: usize,
    },
    /// Variant-specific resource acquisition failed during node creation,
    /// e.g. a decoder could not open the requested file. No node slot is
    /// consumed when this is returned.
    ResourceInitFailed {
        /// Failure description from the resource layer.
        reason: String,
    },
    /// A link named a node or slot that does not exist.
    InvalidEndpoint {
        /// The offending node id.
        node: NodeId,
        /// The offending slot index.
        slot: usize,
    },
    /// Lookup by id found nothing. Callers often treat this as an ordinary
    /// "absent" outcome rather than a failure.
    NotFound(NodeId),
    /// The requested link would close a feedback loop through the graph.
    CycleDetected {
        /// Producer end of the rejected link.
        producer: NodeId,
        /// Consumer end of the rejected link.
        consumer: NodeId,
    },
}

// Manual Display keeps the crate no_std compatible.
impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PoolExhausted { capacity } => {
                write!(f, "pool exhausted (capacity {capacity})")
            }
            Self::ResourceInitFailed { reason } => {
                write!(f, "resource init failed: {reason}")
            }
            Self::InvalidEndpoint { node, slot } => {
                write!(f, "invalid link endpoint: node {node} slot {slot}")
            }
            Self::NotFound(id) => write!(f, "node {id} not found"),
            Self::CycleDetected { producer, consumer } => {
                write!(f, "link {producer} -> {consumer} would create a cycle")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for GraphError {}
