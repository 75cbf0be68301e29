//! Saved patch files.
//!
//! A patch file is a TOML document listing nodes (variant, name, canvas
//! placement, per-variant arguments) and the links between them by
//! file-local ids:
//!
//! ```toml
//! name = "Jungle"
//!
//! [[nodes]]
//! id = 0
//! kind = "source_decoder"
//! path = "sounds/jungle.wav"
//! bounds = [40.0, 120.0, 180.0, 220.0]
//!
//! [[nodes]]
//! id = 1
//! kind = "endpoint"
//! bounds = [400.0, 120.0, 180.0, 120.0]
//!
//! [[links]]
//! consumer = 1
//! producer = 0
//! ```
//!
//! Replaying a file pushes the same create/link sequence through a live
//! [`Patch`], so everything a patch file can express is exactly what the
//! graph can express.

use serde::{Deserialize, Serialize};
use soundflow_graph::{GraphError, NodeId, NodeKind, NodeSpec, Patch, Rect};
use std::collections::HashMap;
use std::path::Path;

/// Patch file errors.
#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    /// Filesystem failure reading or writing the file.
    #[error("failed to read patch file: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed TOML.
    #[error("failed to parse patch file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Serialization failure on save.
    #[error("failed to serialize patch: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A link references a node id the file does not declare.
    #[error("link references unknown node id {0}")]
    UnknownNode(u32),

    /// Two node entries share a file-local id.
    #[error("duplicate node id {0}")]
    DuplicateNode(u32),

    /// The graph rejected part of the patch while rebuilding it.
    #[error("graph rejected patch: {0}")]
    Graph(#[from] GraphError),
}

/// Node variant tags as stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchNodeKind {
    /// Playback sink.
    Endpoint,
    /// File-backed source.
    SourceDecoder,
    /// Fixed low-pass filter.
    LowPassFilter,
    /// Signal duplicator.
    Splitter,
    /// Feedback echo.
    Delay,
}

impl PatchNodeKind {
    fn graph_kind(self) -> NodeKind {
        match self {
            Self::Endpoint => NodeKind::Endpoint,
            Self::SourceDecoder => NodeKind::SourceDecoder,
            Self::LowPassFilter => NodeKind::LowPassFilter,
            Self::Splitter => NodeKind::Splitter,
            Self::Delay => NodeKind::Delay,
        }
    }
}

impl From<NodeKind> for PatchNodeKind {
    fn from(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Endpoint => Self::Endpoint,
            NodeKind::SourceDecoder => Self::SourceDecoder,
            NodeKind::LowPassFilter => Self::LowPassFilter,
            NodeKind::Splitter => Self::Splitter,
            NodeKind::Delay => Self::Delay,
        }
    }
}

/// One node entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchNode {
    /// File-local id referenced by link entries.
    pub id: u32,
    /// Variant tag.
    pub kind: PatchNodeKind,
    /// Display name; the variant label when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Source file path, for `source_decoder` nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Output slot count, for `splitter` nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<usize>,
    /// Canvas placement as `[x, y, w, h]`.
    #[serde(default)]
    pub bounds: [f32; 4],
}

/// One link entry, by file-local node ids.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PatchLink {
    /// Consumer node.
    pub consumer: u32,
    /// Input slot on the consumer.
    #[serde(default)]
    pub consumer_slot: usize,
    /// Producer node.
    pub producer: u32,
    /// Output slot on the producer.
    #[serde(default)]
    pub producer_slot: usize,
}

/// A saved patch: nodes plus the links between them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchFile {
    /// Patch display name.
    pub name: String,
    /// Optional free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Node entries.
    #[serde(default)]
    pub nodes: Vec<PatchNode>,
    /// Link entries.
    #[serde(default)]
    pub links: Vec<PatchLink>,
}

impl PatchFile {
    /// Load a patch from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PatchError> {
        Self::from_toml(&std::fs::read_to_string(path)?)
    }

    /// Parse a patch from TOML text.
    pub fn from_toml(s: &str) -> Result<Self, PatchError> {
        Ok(toml::from_str(s)?)
    }

    /// Save as pretty-printed TOML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), PatchError> {
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Capture a live patch into its file representation, using the live
    /// node ids as file-local ids.
    pub fn capture(name: &str, patch: &Patch) -> Self {
        let nodes = patch
            .nodes()
            .map(|n| PatchNode {
                id: n.id().raw(),
                kind: PatchNodeKind::from(n.kind()),
                name: Some(n.name().to_string()),
                path: n.source_path().map(str::to_string),
                outputs: match n.kind() {
                    NodeKind::Splitter => Some(n.output_count()),
                    _ => None,
                },
                bounds: [n.bounds.x, n.bounds.y, n.bounds.w, n.bounds.h],
            })
            .collect();
        let links = patch
            .links()
            .map(|l| PatchLink {
                consumer: l.consumer.raw(),
                consumer_slot: l.consumer_slot,
                producer: l.producer.raw(),
                producer_slot: l.producer_slot,
            })
            .collect();
        Self {
            name: name.to_string(),
            description: None,
            nodes,
            links,
        }
    }

    /// Replay this file into a live patch: create every node, then link.
    ///
    /// Returns the mapping from file-local ids to the assigned node ids.
    pub fn build(&self, patch: &mut Patch) -> Result<HashMap<u32, NodeId>, PatchError> {
        let mut map = HashMap::new();
        for node in &self.nodes {
            if map.contains_key(&node.id) {
                return Err(PatchError::DuplicateNode(node.id));
            }
            let spec = match node.kind {
                PatchNodeKind::Endpoint => NodeSpec::Endpoint,
                PatchNodeKind::SourceDecoder => NodeSpec::SourceDecoder {
                    path: node.path.as_deref().unwrap_or_default(),
                },
                PatchNodeKind::LowPassFilter => NodeSpec::LowPassFilter,
                PatchNodeKind::Splitter => NodeSpec::Splitter {
                    outputs: node.outputs.unwrap_or(2),
                },
                PatchNodeKind::Delay => NodeSpec::Delay,
            };
            let name = node
                .name
                .as_deref()
                .unwrap_or_else(|| node.kind.graph_kind().label());
            let [x, y, w, h] = node.bounds;
            let id = patch.create(spec, name, Rect::new(x, y, w, h))?;
            map.insert(node.id, id);
        }
        for link in &self.links {
            let consumer = *map
                .get(&link.consumer)
                .ok_or(PatchError::UnknownNode(link.consumer))?;
            let producer = *map
                .get(&link.producer)
                .ok_or(PatchError::UnknownNode(link.producer))?;
            patch.link(consumer, link.consumer_slot, producer, link.producer_slot)?;
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use soundflow_graph::{AudioFormat, GraphConfig, PcmDecoder, PcmProducer, SineSource};

    /// Every "file" decodes to a quiet sine; good enough for wiring tests.
    struct TestDecoder;

    impl PcmDecoder for TestDecoder {
        fn open_file(
            &self,
            _path: &str,
            format: AudioFormat,
        ) -> Result<Box<dyn PcmProducer + Send>, GraphError> {
            Ok(Box::new(SineSource::new(format, 440.0, 0.25)))
        }
    }

    fn live_pair() -> (Patch, soundflow_graph::RenderGraph) {
        Patch::new(GraphConfig::default(), Box::new(TestDecoder))
    }

    const EXAMPLE: &str = r#"
name = "Jungle"

[[nodes]]
id = 0
kind = "source_decoder"
path = "sounds/jungle.wav"
bounds = [40.0, 120.0, 180.0, 220.0]

[[nodes]]
id = 1
kind = "endpoint"
bounds = [400.0, 120.0, 180.0, 120.0]

[[links]]
consumer = 1
producer = 0
"#;

    #[test]
    fn example_parses_and_builds() {
        let file = PatchFile::from_toml(EXAMPLE).unwrap();
        assert_eq!(file.name, "Jungle");
        assert_eq!(file.nodes.len(), 2);
        assert_eq!(file.links.len(), 1);
        // Omitted slots default to 0.
        assert_eq!(file.links[0].consumer_slot, 0);

        let (mut patch, mut graph) = live_pair();
        let map = file.build(&mut patch).unwrap();
        assert_eq!(patch.node_count(), 2);
        assert_eq!(patch.link_count(), 1);
        assert!(patch.find(map[&0]).unwrap().source_path().is_some());

        // The rebuilt patch actually renders.
        let mut buf = [0.0_f32; 128];
        graph.render(&mut buf);
        assert!(buf.iter().any(|s| *s != 0.0));
    }

    #[test]
    fn capture_round_trips_through_toml() {
        let (mut patch, _graph) = live_pair();
        let src = patch
            .create(NodeSpec::SourceDecoder { path: "a.wav" }, "src", Rect::new(1.0, 2.0, 3.0, 4.0))
            .unwrap();
        let split = patch
            .create(NodeSpec::Splitter { outputs: 3 }, "split", Rect::default())
            .unwrap();
        let out = patch
            .create(NodeSpec::Endpoint, "out", Rect::default())
            .unwrap();
        patch.link(split, 0, src, 0).unwrap();
        patch.link(out, 0, split, 1).unwrap();

        let captured = PatchFile::capture("session", &patch);
        let toml_text = toml::to_string_pretty(&captured).unwrap();
        let parsed = PatchFile::from_toml(&toml_text).unwrap();

        let (mut rebuilt, _graph2) = live_pair();
        parsed.build(&mut rebuilt).unwrap();

        assert_eq!(rebuilt.node_count(), patch.node_count());
        assert_eq!(rebuilt.link_count(), patch.link_count());
        let kinds: Vec<_> = rebuilt.nodes().map(|n| n.kind()).collect();
        let original: Vec<_> = patch.nodes().map(|n| n.kind()).collect();
        assert_eq!(kinds, original);
        // Splitter keeps its extra output and its slot-1 link.
        let split_node = rebuilt
            .nodes()
            .find(|n| n.kind() == NodeKind::Splitter)
            .unwrap();
        assert_eq!(split_node.output_count(), 3);
        let endpoint = rebuilt
            .nodes()
            .find(|n| n.kind() == NodeKind::Endpoint)
            .unwrap();
        assert_eq!(
            rebuilt.find_by_consumer(endpoint.id(), 0).unwrap().producer_slot,
            1
        );
    }

    #[test]
    fn save_and_load_use_the_filesystem() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("session.toml");

        let file = PatchFile::from_toml(EXAMPLE).unwrap();
        file.save(&path).unwrap();
        let loaded = PatchFile::load(&path).unwrap();
        assert_eq!(loaded.name, file.name);
        assert_eq!(loaded.nodes.len(), file.nodes.len());
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let text = r#"
name = "dup"

[[nodes]]
id = 3
kind = "delay"

[[nodes]]
id = 3
kind = "endpoint"
"#;
        let file = PatchFile::from_toml(text).unwrap();
        let (mut patch, _graph) = live_pair();
        assert!(matches!(
            file.build(&mut patch),
            Err(PatchError::DuplicateNode(3))
        ));
    }

    #[test]
    fn links_to_undeclared_nodes_are_rejected() {
        let text = r#"
name = "dangling"

[[nodes]]
id = 0
kind = "endpoint"

[[links]]
consumer = 0
producer = 9
"#;
        let file = PatchFile::from_toml(text).unwrap();
        let (mut patch, _graph) = live_pair();
        assert!(matches!(
            file.build(&mut patch),
            Err(PatchError::UnknownNode(9))
        ));
    }
}
