//! Boundary to whatever produces graphs and expansions (normally an LLM behind HTTP).

use crate::model::{
    Cluster, Edge, ExpansionPayload, GraphPayload, Metadata, Node, NodeId, NodeProperties,
    SourceNode,
};
use crate::payload::{PayloadError, parse_expansion_payload, parse_graph_payload};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("upstream request failed: {0}")]
    Upstream(String),
    #[error(transparent)]
    Payload(#[from] PayloadError),
    #[error("no recorded response for {0}")]
    NotRecorded(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpansionRequest {
    pub node_id: NodeId,
    /// Free-form expansion kind such as `theory` or `practical`; `all` is untyped.
    pub kind: String,
    pub limit: usize,
}

impl ExpansionRequest {
    pub const DEFAULT_KIND: &'static str = "all";
    pub const DEFAULT_LIMIT: usize = 3;

    pub fn new(node_id: impl Into<NodeId>) -> Self {
        Self {
            node_id: node_id.into(),
            kind: Self::DEFAULT_KIND.to_string(),
            limit: Self::DEFAULT_LIMIT,
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

pub trait GraphSource {
    fn fetch_graph(&mut self, prompt: &str) -> Result<GraphPayload, FetchError>;
    fn fetch_expansion(&mut self, request: &ExpansionRequest) -> Result<ExpansionPayload, FetchError>;
}

/// Serves recorded completion texts, e.g. captured LLM responses.
#[derive(Debug, Clone, Default)]
pub struct RecordedSource {
    graph: Option<String>,
    expansions: BTreeMap<NodeId, String>,
}

impl RecordedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_completion(text: impl Into<String>) -> Self {
        Self {
            graph: Some(text.into()),
            expansions: BTreeMap::new(),
        }
    }

    pub fn with_expansion(mut self, node: impl Into<NodeId>, text: impl Into<String>) -> Self {
        self.expansions.insert(node.into(), text.into());
        self
    }

    /// Adds expansions from a JSON object keyed by node id. Values are either completion
    /// strings or expansion objects.
    pub fn with_recorded_expansions(mut self, json: &str) -> Result<Self, PayloadError> {
        let recorded: BTreeMap<String, serde_json::Value> = serde_json::from_str(json)?;
        for (key, value) in recorded {
            let id = key
                .trim()
                .parse::<u64>()
                .map_err(|_| PayloadError::InvalidKey(key.clone()))?;
            let text = match value {
                serde_json::Value::String(text) => text,
                other => other.to_string(),
            };
            self.expansions.insert(NodeId(id), text);
        }
        Ok(self)
    }
}

impl GraphSource for RecordedSource {
    fn fetch_graph(&mut self, _prompt: &str) -> Result<GraphPayload, FetchError> {
        let text = self
            .graph
            .as_deref()
            .ok_or_else(|| FetchError::NotRecorded("graph".to_string()))?;
        Ok(parse_graph_payload(text)?)
    }

    fn fetch_expansion(&mut self, request: &ExpansionRequest) -> Result<ExpansionPayload, FetchError> {
        let text = self
            .expansions
            .get(&request.node_id)
            .ok_or_else(|| FetchError::NotRecorded(format!("node {}", request.node_id)))?;
        Ok(parse_expansion_payload(text)?)
    }
}

/// Fixed sample dataset used when no upstream graph is available.
#[derive(Debug, Clone, Copy, Default)]
pub struct SampleSource;

impl GraphSource for SampleSource {
    fn fetch_graph(&mut self, prompt: &str) -> Result<GraphPayload, FetchError> {
        Ok(sample_graph(prompt))
    }

    fn fetch_expansion(&mut self, request: &ExpansionRequest) -> Result<ExpansionPayload, FetchError> {
        Ok(sample_expansion(request))
    }
}

fn sample_node(
    id: u64,
    label: &str,
    description: &str,
    kind: &str,
    importance: f32,
    domain: &str,
) -> Node {
    Node {
        description: description.to_string(),
        kind: kind.to_string(),
        properties: NodeProperties {
            importance,
            domain: domain.to_string(),
            ..NodeProperties::default()
        },
        ..Node::new(id, label)
    }
}

fn sample_edge(source: u64, target: u64, kind: &str, weight: f32, bidirectional: bool) -> Edge {
    Edge {
        weight,
        bidirectional,
        ..Edge::new(source, target, kind)
    }
}

fn sample_cluster(id: &str, label: &str, description: &str, nodes: &[u64]) -> Cluster {
    Cluster {
        id: id.to_string(),
        label: label.to_string(),
        description: description.to_string(),
        nodes: nodes.iter().copied().map(NodeId).collect(),
    }
}

fn sample_nodes() -> Vec<Node> {
    vec![
        sample_node(
            1,
            "Decentralized Energy Grids",
            "Systems that distribute energy generation across multiple small-scale sources rather than centralized power plants.",
            "concept",
            0.9,
            "energy",
        ),
        sample_node(
            2,
            "Renewable Energy Sources",
            "Energy sources that are naturally replenished on a human timescale, such as sunlight, wind, rain, tides, waves, and geothermal heat.",
            "concept",
            0.8,
            "energy",
        ),
        sample_node(
            3,
            "Grid Resilience",
            "The ability of power systems to withstand and recover from extreme events and disruptions.",
            "property",
            0.7,
            "energy",
        ),
        sample_node(
            4,
            "Energy Storage Technologies",
            "Methods of storing energy for later use, including batteries, pumped hydro, and thermal storage.",
            "technology",
            0.8,
            "energy",
        ),
        sample_node(
            5,
            "Microgrid Implementation",
            "Small-scale power grids that can operate independently or in coordination with the main grid.",
            "process",
            0.6,
            "energy",
        ),
        sample_node(
            6,
            "Smart Grid Technologies",
            "Digital technology that allows for two-way communication between utilities and consumers.",
            "technology",
            0.7,
            "technology",
        ),
        sample_node(
            7,
            "Energy Democratization",
            "Shift of power from centralized entities to individuals and communities in energy production and distribution.",
            "concept",
            0.6,
            "society",
        ),
        sample_node(
            8,
            "Regulatory Frameworks",
            "Legal and policy structures governing energy production, distribution, and consumption.",
            "process",
            0.7,
            "policy",
        ),
        sample_node(
            9,
            "Community-Owned Energy",
            "Energy projects owned and operated by local communities rather than by corporations or governments.",
            "entity",
            0.5,
            "society",
        ),
        sample_node(
            10,
            "Grid Modernization",
            "Upgrading electricity infrastructure to improve reliability, efficiency, security, and integration of renewables.",
            "process",
            0.8,
            "technology",
        ),
    ]
}

pub fn sample_graph(prompt: &str) -> GraphPayload {
    GraphPayload {
        nodes: sample_nodes(),
        edges: vec![
            sample_edge(1, 2, "depends_on", 0.9, false),
            sample_edge(1, 3, "leads_to", 0.7, false),
            sample_edge(1, 4, "depends_on", 0.8, false),
            sample_edge(1, 5, "is_a", 0.6, false),
            sample_edge(2, 4, "related_to", 0.7, true),
            sample_edge(3, 10, "part_of", 0.8, false),
            sample_edge(5, 6, "depends_on", 0.7, false),
            sample_edge(7, 9, "leads_to", 0.8, false),
            sample_edge(8, 10, "related_to", 0.6, true),
            sample_edge(9, 7, "example_of", 0.7, false),
        ],
        clusters: vec![
            sample_cluster(
                "c1",
                "Energy Infrastructure",
                "Physical and digital systems for energy distribution",
                &[1, 3, 5, 10],
            ),
            sample_cluster("c2", "Energy Sources", "Origins and generation of power", &[2, 4]),
            sample_cluster(
                "c3",
                "Social Aspects",
                "Community and social dimensions of energy",
                &[7, 9],
            ),
            sample_cluster(
                "c4",
                "Technology & Innovation",
                "Technological advancements in energy systems",
                &[4, 6, 10],
            ),
            sample_cluster("c5", "Governance", "Rules and frameworks for energy management", &[8]),
        ],
        metadata: Some(Metadata::now(prompt)),
    }
}

/// Recorded expansion for node 1; any other node gets `limit` generic neighbours.
pub fn sample_expansion(request: &ExpansionRequest) -> ExpansionPayload {
    let parent = request.node_id;
    let source = sample_nodes()
        .into_iter()
        .find(|node| node.id == parent)
        .map(|node| SourceNode {
            id: node.id,
            label: node.label,
            kind: node.kind,
        })
        .unwrap_or_else(|| SourceNode {
            id: parent,
            label: format!("Node {parent}"),
            kind: "concept".to_string(),
        });

    if parent == NodeId(1) {
        return ExpansionPayload {
            source_node: Some(source),
            nodes: vec![
                sample_node(
                    101,
                    "Peer-to-Peer Energy Trading",
                    "Systems allowing consumers to buy and sell excess energy directly to each other.",
                    "process",
                    0.7,
                    "energy",
                ),
                sample_node(
                    102,
                    "Blockchain for Energy",
                    "Using distributed ledger technology to manage energy transactions.",
                    "technology",
                    0.6,
                    "technology",
                ),
                sample_node(
                    103,
                    "Virtual Power Plants",
                    "Cloud-based distributed power plants that aggregate capacity from multiple sources.",
                    "concept",
                    0.8,
                    "energy",
                ),
            ],
            edges: vec![
                sample_edge(1, 101, "leads_to", 0.8, false),
                sample_edge(1, 102, "depends_on", 0.6, false),
                sample_edge(1, 103, "part_of", 0.9, false),
                sample_edge(101, 102, "related_to", 0.7, true),
            ],
        };
    }

    let nodes: Vec<Node> = (0..request.limit as u64)
        .map(|i| {
            let id = parent.get().saturating_mul(100).saturating_add(i + 1);
            sample_node(
                id,
                &format!("Related to {} {}", source.label, i + 1),
                &format!("Fallback connected node for {}.", source.label),
                "concept",
                0.5,
                "general",
            )
        })
        .collect();
    let edges = nodes
        .iter()
        .map(|node| sample_edge(parent.get(), node.id.get(), "related_to", 0.5, false))
        .collect();
    ExpansionPayload {
        source_node: Some(source),
        nodes,
        edges,
    }
}
