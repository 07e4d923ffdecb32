use std::collections::BTreeSet;

use crate::config::Viewport;
use crate::model::{Node, NodeId};

/// UI state the layout depends on besides the nodes themselves.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutParams {
    /// Nodes whose children get the wide radius and which receive a display radius hint.
    pub expanded: BTreeSet<NodeId>,
    pub active_cluster: Option<String>,
    pub viewport: Viewport,
    /// Use the wide radius for every subtree.
    pub force_wide: bool,
}

impl LayoutParams {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            ..Default::default()
        }
    }

    pub fn with_expanded(mut self, ids: impl IntoIterator<Item = NodeId>) -> Self {
        self.expanded.extend(ids);
        self
    }

    pub fn with_active_cluster(mut self, cluster: impl Into<String>) -> Self {
        self.active_cluster = Some(cluster.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EdgeLayout {
    pub source: NodeId,
    pub target: NodeId,
    pub kind: String,
    pub weight: f32,
    pub bidirectional: bool,
    pub source_label: String,
    pub target_label: String,
    pub points: Vec<(f32, f32)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterLayout {
    pub id: String,
    pub label: String,
    /// Members present in the graph, in cluster order.
    pub nodes: Vec<NodeId>,
    /// Label anchor at the centroid of the members.
    pub x: f32,
    pub y: f32,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub nodes: Vec<Node>,
    pub edges: Vec<EdgeLayout>,
    pub clusters: Vec<ClusterLayout>,
    pub width: f32,
    pub height: f32,
}

impl Layout {
    pub fn empty(viewport: Viewport) -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            clusters: Vec::new(),
            width: viewport.width,
            height: viewport.height,
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn position(&self, id: NodeId) -> Option<(f32, f32)> {
        self.node(id).map(|node| (node.x, node.y))
    }
}
