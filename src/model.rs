use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Identifier of a node. Unique across the whole graph, expansions included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct NodeId(pub u64);

impl NodeId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for NodeId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.0)
    }
}

// Completions occasionally quote ids, so numeric strings are accepted too.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(u64),
    Float(f64),
    String(String),
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match NumberOrString::deserialize(deserializer)? {
            NumberOrString::Number(val) => Ok(NodeId(val)),
            NumberOrString::Float(val) if val >= 0.0 && val.fract() == 0.0 => Ok(NodeId(val as u64)),
            NumberOrString::Float(val) => Err(serde::de::Error::custom(format!(
                "node id must be a non-negative integer, got {val}"
            ))),
            NumberOrString::String(val) => val.trim().parse::<u64>().map(NodeId).map_err(|_| {
                serde::de::Error::custom(format!("node id must be numeric, got {val:?}"))
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeProperties {
    #[serde(default = "default_importance")]
    pub importance: f32,
    #[serde(default)]
    pub domain: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

fn default_importance() -> f32 {
    0.5
}

impl Default for NodeProperties {
    fn default() -> Self {
        Self {
            importance: default_importance(),
            domain: String::new(),
            extra: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub description: String,
    /// Open-ended tag such as `concept`, `entity` or `process`.
    #[serde(rename = "type", default = "default_node_type")]
    pub kind: String,
    #[serde(default)]
    pub properties: NodeProperties,
    /// Node whose expansion created this one. Set once, never changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<NodeId>,
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    /// Display radius hint for nodes in the expanded set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f32>,
    #[serde(default)]
    pub expanded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expansion_type: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

fn default_node_type() -> String {
    "concept".to_string()
}

impl Node {
    pub fn new(id: impl Into<NodeId>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: String::new(),
            kind: default_node_type(),
            properties: NodeProperties::default(),
            parent_id: None,
            x: 0.0,
            y: 0.0,
            radius: None,
            expanded: false,
            expansion_type: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_parent(mut self, parent: impl Into<NodeId>) -> Self {
        self.parent_id = Some(parent.into());
        self
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
    #[serde(rename = "type", default = "default_edge_type")]
    pub kind: String,
    #[serde(default = "default_weight")]
    pub weight: f32,
    #[serde(default)]
    pub bidirectional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

fn default_edge_type() -> String {
    "related_to".to_string()
}

fn default_weight() -> f32 {
    0.5
}

impl Edge {
    pub fn new(source: impl Into<NodeId>, target: impl Into<NodeId>, kind: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind: kind.into(),
            weight: default_weight(),
            bidirectional: false,
            description: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn touches(&self, id: NodeId) -> bool {
        self.source == id || self.target == id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub nodes: Vec<NodeId>,
}

impl Cluster {
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains(&id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub prompt: String,
    pub generated: String,
    pub version: String,
}

impl Metadata {
    pub const VERSION: &'static str = "1.0";

    pub fn now(prompt: &str) -> Self {
        Self {
            prompt: prompt.to_string(),
            generated: chrono::Utc::now().to_rfc3339(),
            version: Self::VERSION.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphPayload {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub clusters: Vec<Cluster>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceNode {
    pub id: NodeId,
    #[serde(default)]
    pub label: String,
    #[serde(rename = "type", default = "default_node_type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpansionPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_node: Option<SourceNode>,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_accepts_quoted_ids_and_keeps_unknown_fields() {
        let raw = r#"{
            "id": "12",
            "label": "Grid Resilience",
            "type": "property",
            "properties": { "importance": 0.7, "domain": "energy", "source": "llm" },
            "hasBias": true
        }"#;
        let node: Node = serde_json::from_str(raw).expect("node parses");
        assert_eq!(node.id, NodeId(12));
        assert_eq!(node.kind, "property");
        assert_eq!(node.properties.domain, "energy");
        assert_eq!(node.properties.extra["source"], "llm");
        assert_eq!(node.extra["hasBias"], true);
        assert!(node.is_root());

        let back = serde_json::to_value(&node).expect("node serializes");
        assert_eq!(back["id"], 12);
        assert_eq!(back["hasBias"], true);
        assert!(back.get("parentId").is_none());
    }

    #[test]
    fn node_rejects_non_numeric_ids() {
        let err = serde_json::from_str::<Node>(r#"{ "id": "n1", "label": "x" }"#);
        assert!(err.is_err());
    }

    #[test]
    fn edge_defaults_fill_missing_fields() {
        let edge: Edge = serde_json::from_str(r#"{ "source": 1, "target": 2 }"#).expect("edge parses");
        assert_eq!(edge.kind, "related_to");
        assert!(!edge.bidirectional);
        assert!(edge.touches(NodeId(2)));
    }
}
