//! Live graph engine: the editing façade and the render-side graph.
//!
//! A running graph is split across two contexts that never wait on each
//! other:
//!
//! - [`Patch`] belongs to the editing (UI) context. It owns the node
//!   registry, the link table and the sending half of a command queue.
//!   Every mutation validates and records here first, then ships a command.
//! - [`RenderGraph`] belongs to the audio context. It owns all node
//!   processing state and the live wiring, drains pending commands at the
//!   start of every buffer, then pulls frames from the endpoint root down
//!   through the attached producers.
//!
//! Commands arrive fully built: a created node's resources (decoder buffers,
//! filter banks, delay rings) are allocated on the editing side and moved
//! across, so applying any command on the audio side is allocation-free.
//! Freed state takes the reverse trip implicitly: dropping a removed node at
//! the drain boundary is the one place the audio context releases memory,
//! which is bounded by the node's own size.

use crate::config::{AudioFormat, GraphConfig};
use crate::error::GraphError;
use crate::links::{Link, LinkTable};
use crate::node::{Node, NodeId, NodeKind, NodePayload, Rect};
use crate::producer::PcmProducer;
use crate::registry::{NodeRegistry, ZOrderIter};
use crossbeam_channel::{Receiver, Sender, unbounded};

/// Decoder capability consumed at node creation time.
///
/// `open_file` runs synchronously on the editing context; implementations do
/// all file I/O and format conversion there so the returned producer is safe
/// to pull from the audio thread.
pub trait PcmDecoder {
    /// Open `path` and return a producer emitting frames at `format`.
    fn open_file(
        &self,
        path: &str,
        format: AudioFormat,
    ) -> Result<Box<dyn PcmProducer + Send>, GraphError>;
}

/// Variant-specific creation arguments for [`Patch::create`].
#[derive(Debug, Clone)]
pub enum NodeSpec<'a> {
    /// The graph sink. Several may exist; the oldest live endpoint is the
    /// render root.
    Endpoint,
    /// File-backed source; the decoder opens `path` during creation.
    SourceDecoder {
        /// File to decode.
        path: &'a str,
    },
    /// Fixed low-pass filter.
    LowPassFilter,
    /// Input duplicated across `outputs` slots (minimum two).
    Splitter {
        /// Output slot count.
        outputs: usize,
    },
    /// Fixed-length feedback echo.
    Delay,
}

/// Resolved input-bus attachment held render-side.
#[derive(Debug, Clone, Copy)]
struct Wire {
    producer: NodeId,
    producer_slot: usize,
    /// Arena index of the producer at attach time. Checked against
    /// `producer` before every read so a reused slot can never alias.
    index: usize,
}

/// Render-side state for one node.
struct RenderNode {
    id: NodeId,
    payload: NodePayload,
    /// One optional wire per declared input slot.
    wires: Vec<Option<Wire>>,
    /// Per-pass output cache, sized for the block ceiling.
    out: Vec<f32>,
    /// Stamp of the render pass that last filled `out`.
    epoch: u64,
}

impl RenderNode {
    fn new(id: NodeId, payload: NodePayload, inputs: usize, config: &GraphConfig) -> Self {
        Self {
            id,
            payload,
            wires: vec![None; inputs],
            out: vec![0.0; config.format.samples_for(config.max_block_frames)],
            epoch: 0,
        }
    }
}

/// Structural edit shipped from the editing context to the audio context.
enum GraphCommand {
    AddNode(Box<RenderNode>),
    RemoveNode(NodeId),
    Attach {
        consumer: NodeId,
        consumer_slot: usize,
        producer: NodeId,
        producer_slot: usize,
    },
    Detach {
        consumer: NodeId,
        consumer_slot: usize,
    },
}

/// Editing-context handle to one audio graph.
///
/// Owns the [`NodeRegistry`], the [`LinkTable`] and the decoder capability.
/// Operations validate before mutating, so a failed call changes nothing;
/// successful calls update the tables and ship the matching command, keeping
/// the table and the live wiring pairwise consistent at every drain
/// boundary.
pub struct Patch {
    registry: NodeRegistry,
    links: LinkTable,
    config: GraphConfig,
    decoder: Box<dyn PcmDecoder + Send>,
    tx: Sender<GraphCommand>,
}

impl Patch {
    /// Build a connected editing/render pair for one graph.
    pub fn new(config: GraphConfig, decoder: Box<dyn PcmDecoder + Send>) -> (Self, RenderGraph) {
        let (tx, rx) = unbounded();
        let render = RenderGraph::new(&config, rx);
        let patch = Self {
            registry: NodeRegistry::new(config.max_nodes),
            links: LinkTable::new(config.max_links),
            config,
            decoder,
            tx,
        };
        (patch, render)
    }

    /// Create a node: assign identity, acquire variant resources, register
    /// it, and ship its render-side state.
    ///
    /// Fails with [`GraphError::PoolExhausted`] at the node ceiling and
    /// [`GraphError::ResourceInitFailed`] when the decoder rejects a file;
    /// neither failure consumes a slot or leaves a partial node behind.
    pub fn create(
        &mut self,
        spec: NodeSpec<'_>,
        name: &str,
        bounds: Rect,
    ) -> Result<NodeId, GraphError> {
        if self.registry.len() == self.registry.capacity() {
            return Err(GraphError::PoolExhausted {
                capacity: self.registry.capacity(),
            });
        }
        // Resources are acquired before the registry slot is taken, so a
        // failed decoder open cannot leave a half-created node.
        let (kind, inputs, outputs, payload, path) = match spec {
            NodeSpec::Endpoint => (NodeKind::Endpoint, 1, 0, NodePayload::Endpoint, None),
            NodeSpec::SourceDecoder { path } => {
                let producer = self.decoder.open_file(path, self.config.format)?;
                (
                    NodeKind::SourceDecoder,
                    0,
                    1,
                    NodePayload::source(producer),
                    Some(String::from(path)),
                )
            }
            NodeSpec::LowPassFilter => (
                NodeKind::LowPassFilter,
                1,
                1,
                NodePayload::low_pass(&self.config),
                None,
            ),
            NodeSpec::Splitter { outputs } => (
                NodeKind::Splitter,
                1,
                outputs.max(2),
                NodePayload::Splitter,
                None,
            ),
            NodeSpec::Delay => (NodeKind::Delay, 1, 1, NodePayload::delay(&self.config), None),
        };
        let id = self
            .registry
            .insert(kind, name, inputs, outputs, bounds, path)?;
        #[cfg(feature = "tracing")]
        tracing::debug!(node = %id, kind = ?kind, "create node");
        self.send(GraphCommand::AddNode(Box::new(RenderNode::new(
            id,
            payload,
            inputs,
            &self.config,
        ))));
        Ok(id)
    }

    /// Remove a node and every link touching it. Unknown ids are a no-op,
    /// so removal can always be called speculatively.
    pub fn remove(&mut self, id: NodeId) {
        if !self.registry.contains(id) {
            return;
        }
        // Detach first, destroy second. The commands apply in order, so the
        // render side never pulls a wire into freed state.
        for link in self.links.remove_node(id) {
            self.send(GraphCommand::Detach {
                consumer: link.consumer,
                consumer_slot: link.consumer_slot,
            });
        }
        self.registry.remove(id);
        #[cfg(feature = "tracing")]
        tracing::debug!(node = %id, "remove node");
        self.send(GraphCommand::RemoveNode(id));
    }

    /// Connect `producer`'s output slot to `consumer`'s input slot.
    ///
    /// An occupied consumer slot is replaced; the old producer is detached
    /// exactly once by the same swap that attaches the new one. Validation
    /// runs before any mutation, so a rejected link changes nothing.
    pub fn link(
        &mut self,
        consumer: NodeId,
        consumer_slot: usize,
        producer: NodeId,
        producer_slot: usize,
    ) -> Result<(), GraphError> {
        self.validate_consumer(consumer, consumer_slot)?;
        self.validate_producer(producer, producer_slot)?;
        if self.links.would_cycle(consumer, producer) {
            return Err(GraphError::CycleDetected { producer, consumer });
        }
        self.links.insert(Link {
            consumer,
            consumer_slot,
            producer,
            producer_slot,
        })?;
        #[cfg(feature = "tracing")]
        tracing::debug!(%consumer, consumer_slot, %producer, producer_slot, "link");
        self.send(GraphCommand::Attach {
            consumer,
            consumer_slot,
            producer,
            producer_slot,
        });
        Ok(())
    }

    /// Disconnect whatever feeds `consumer`'s input slot. Unoccupied slots
    /// are a no-op.
    pub fn unlink_consumer(&mut self, consumer: NodeId, consumer_slot: usize) {
        if self.links.unlink_consumer(consumer, consumer_slot).is_some() {
            #[cfg(feature = "tracing")]
            tracing::debug!(%consumer, consumer_slot, "unlink consumer slot");
            self.send(GraphCommand::Detach {
                consumer,
                consumer_slot,
            });
        }
    }

    /// Disconnect every link leaving `producer`'s output slot.
    pub fn unlink_producer(&mut self, producer: NodeId, producer_slot: usize) {
        for link in self.links.unlink_producer(producer, producer_slot) {
            self.send(GraphCommand::Detach {
                consumer: link.consumer,
                consumer_slot: link.consumer_slot,
            });
        }
    }

    /// Look up a node by id.
    pub fn find(&self, id: NodeId) -> Option<&Node> {
        self.registry.find(id)
    }

    /// Mutable node access, e.g. for canvas placement updates.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.registry.node_mut(id)
    }

    /// Raise a node to the top of the z-order.
    pub fn bring_to_front(&mut self, id: NodeId) -> bool {
        self.registry.bring_to_front(id)
    }

    /// Nodes bottom-to-top in z-order.
    pub fn nodes(&self) -> ZOrderIter<'_> {
        self.registry.iter()
    }

    /// Links in table order.
    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.iter()
    }

    /// The link (if any) feeding `consumer`'s input slot.
    pub fn find_by_consumer(&self, consumer: NodeId, slot: usize) -> Option<&Link> {
        self.links.find_by_consumer(consumer, slot)
    }

    /// All links leaving `producer`'s output slot.
    pub fn find_by_producer(&self, producer: NodeId, slot: usize) -> impl Iterator<Item = &Link> {
        self.links.find_by_producer(producer, slot)
    }

    /// Live node count.
    pub fn node_count(&self) -> usize {
        self.registry.len()
    }

    /// Live link count.
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// The configuration this graph was built with.
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    fn validate_consumer(&self, node: NodeId, slot: usize) -> Result<(), GraphError> {
        match self.registry.find(node) {
            Some(n) if slot < n.input_count() => Ok(()),
            _ => Err(GraphError::InvalidEndpoint { node, slot }),
        }
    }

    fn validate_producer(&self, node: NodeId, slot: usize) -> Result<(), GraphError> {
        match self.registry.find(node) {
            Some(n) if slot < n.output_count() => Ok(()),
            _ => Err(GraphError::InvalidEndpoint { node, slot }),
        }
    }

    fn send(&self, cmd: GraphCommand) {
        // The render side holds the receiver for the graph's whole life; a
        // send only fails once it is gone, and then there is nothing left
        // to keep consistent.
        let _ = self.tx.send(cmd);
    }
}

/// Audio-context half of the graph.
///
/// Owned by (and only touched from) the render callback. All mutation
/// arrives through the command queue and is applied in [`sync`](Self::sync),
/// which [`render`](Self::render) runs at the start of every buffer. The
/// render path itself never allocates, locks or blocks.
pub struct RenderGraph {
    nodes: Vec<Option<RenderNode>>,
    rx: Receiver<GraphCommand>,
    /// Scratch buffer the current node's input buses are summed into.
    mix: Vec<f32>,
    channels: usize,
    max_frames: usize,
    /// Arena index of the render root: the oldest live endpoint.
    root: Option<usize>,
    epoch: u64,
}

impl RenderGraph {
    fn new(config: &GraphConfig, rx: Receiver<GraphCommand>) -> Self {
        Self {
            nodes: (0..config.max_nodes).map(|_| None).collect(),
            rx,
            mix: vec![0.0; config.format.samples_for(config.max_block_frames)],
            channels: config.format.channels,
            max_frames: config.max_block_frames,
            root: None,
            epoch: 0,
        }
    }

    /// Apply all pending structural commands.
    ///
    /// [`render`](Self::render) calls this itself; callers holding playback
    /// silent should still invoke it per buffer so the queue stays drained.
    pub fn sync(&mut self) {
        while let Ok(cmd) = self.rx.try_recv() {
            self.apply(cmd);
        }
    }

    /// Pull one block of interleaved frames from the endpoint root.
    ///
    /// Drains pending commands, then renders `out.len() / channels` frames
    /// (capped at the configured block ceiling). With no live endpoint --
    /// including before any node exists -- the buffer is silence.
    pub fn render(&mut self, out: &mut [f32]) {
        self.sync();
        out.fill(0.0);
        let frames = (out.len() / self.channels).min(self.max_frames);
        let Some(root) = self.root else {
            return;
        };
        self.epoch += 1;
        self.render_node(root, frames);
        let samples = frames * self.channels;
        if let Some(node) = self.nodes[root].as_ref() {
            out[..samples].copy_from_slice(&node.out[..samples]);
        }
    }

    /// Interleaved channel count of the stream this graph renders.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Largest frame count a single render call may request.
    pub fn max_block_frames(&self) -> usize {
        self.max_frames
    }

    /// Number of live render-side nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.iter().flatten().count()
    }

    /// Snapshot of the live wiring as
    /// `(consumer, consumer_slot, producer, producer_slot)` tuples, for
    /// consistency checks against the structural tables.
    pub fn attachments(&self) -> Vec<(NodeId, usize, NodeId, usize)> {
        let mut out = Vec::new();
        for node in self.nodes.iter().flatten() {
            for (slot, wire) in node.wires.iter().enumerate() {
                if let Some(w) = wire {
                    out.push((node.id, slot, w.producer, w.producer_slot));
                }
            }
        }
        out
    }

    /// Whether `consumer`'s input slot is currently wired.
    pub fn is_attached(&self, consumer: NodeId, slot: usize) -> bool {
        self.index_of(consumer)
            .and_then(|i| self.nodes[i].as_ref())
            .and_then(|n| n.wires.get(slot).copied())
            .flatten()
            .is_some()
    }

    fn apply(&mut self, cmd: GraphCommand) {
        match cmd {
            GraphCommand::AddNode(node) => {
                if let Some(slot) = self.nodes.iter().position(Option::is_none) {
                    let is_endpoint = node.payload.kind() == NodeKind::Endpoint;
                    self.nodes[slot] = Some(*node);
                    if is_endpoint {
                        self.refresh_root();
                    }
                }
            }
            GraphCommand::RemoveNode(id) => {
                if let Some(slot) = self.index_of(id) {
                    // Dropping here releases the payload at the drain
                    // boundary, after the detach commands that preceded it.
                    let node = self.nodes[slot].take();
                    if node.is_some_and(|n| n.payload.kind() == NodeKind::Endpoint) {
                        self.refresh_root();
                    }
                }
            }
            GraphCommand::Attach {
                consumer,
                consumer_slot,
                producer,
                producer_slot,
            } => {
                let Some(pindex) = self.index_of(producer) else {
                    return;
                };
                let Some(cindex) = self.index_of(consumer) else {
                    return;
                };
                if let Some(node) = self.nodes[cindex].as_mut() {
                    if let Some(wire) = node.wires.get_mut(consumer_slot) {
                        // Overwriting is the atomic swap: the old producer
                        // (if any) is gone the instant the new one is in.
                        *wire = Some(Wire {
                            producer,
                            producer_slot,
                            index: pindex,
                        });
                    }
                }
            }
            GraphCommand::Detach {
                consumer,
                consumer_slot,
            } => {
                if let Some(cindex) = self.index_of(consumer) {
                    if let Some(node) = self.nodes[cindex].as_mut() {
                        if let Some(wire) = node.wires.get_mut(consumer_slot) {
                            *wire = None;
                        }
                    }
                }
            }
        }
    }

    /// Depth-first pull. Stamps the node and zeroes its cache before
    /// recursing, so a cycle that somehow survived the structural check
    /// reads this pass's silence instead of recursing forever, and a node
    /// reached twice in one pass is mixed from its cache instead of being
    /// rendered again.
    fn render_node(&mut self, index: usize, frames: usize) {
        let samples = frames * self.channels;
        let epoch = self.epoch;

        let wire_slots = {
            let Some(node) = self.nodes[index].as_mut() else {
                return;
            };
            if node.epoch == epoch {
                return;
            }
            node.epoch = epoch;
            node.out[..samples].fill(0.0);
            node.wires.len()
        };

        for slot in 0..wire_slots {
            let wire = self.nodes[index].as_ref().and_then(|n| n.wires[slot]);
            if let Some(w) = wire {
                self.render_node(w.index, frames);
            }
        }

        // Sum the rendered upstream buses into the shared mix scratch.
        self.mix[..samples].fill(0.0);
        if let Some(node) = self.nodes[index].as_ref() {
            for wire in node.wires.iter().flatten() {
                let Some(up) = self.nodes[wire.index].as_ref() else {
                    continue;
                };
                if up.id != wire.producer || up.epoch != epoch {
                    continue;
                }
                for (acc, s) in self.mix[..samples].iter_mut().zip(&up.out[..samples]) {
                    *acc += *s;
                }
            }
        }

        if let Some(node) = self.nodes[index].as_mut() {
            node.payload
                .process(&self.mix[..samples], &mut node.out[..samples], frames, self.channels);
        }
    }

    fn index_of(&self, id: NodeId) -> Option<usize> {
        self.nodes
            .iter()
            .position(|n| n.as_ref().is_some_and(|n| n.id == id))
    }

    fn refresh_root(&mut self) {
        // Oldest live endpoint wins; ids are monotonic, so the minimum raw
        // id is the oldest.
        self.root = self
            .nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| n.as_ref().map(|n| (i, n)))
            .filter(|(_, n)| n.payload.kind() == NodeKind::Endpoint)
            .min_by_key(|(_, n)| n.id.raw())
            .map(|(i, _)| i);
    }
}
