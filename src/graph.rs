use crate::config::{LabelSimilarity, MergeConfig};
use crate::model::{Cluster, Edge, Node, NodeId};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

/// Canonical node/edge/cluster set of one session.
///
/// Nodes keep insertion order, which the layout relies on for stable root angles. After
/// construction the model is append-only: merges add nodes and edges and flip `expanded`,
/// nothing is removed or renamed.
#[derive(Debug, Clone, Default)]
pub struct GraphModel {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    clusters: Vec<Cluster>,
    index: HashMap<NodeId, usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub parent_found: bool,
    pub added_nodes: Vec<NodeId>,
    pub added_edges: usize,
    pub dropped_edges: usize,
    pub used_variants: bool,
}

impl GraphModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(nodes: Vec<Node>, edges: Vec<Edge>, clusters: Vec<Cluster>) -> Self {
        let mut model = Self::new();
        model.set_graph(nodes, edges, clusters);
        model
    }

    /// Replaces the whole model.
    ///
    /// Repeated ids keep their first occurrence, blank labels become `Node {id}` and edges with a
    /// missing endpoint are dropped.
    pub fn set_graph(&mut self, nodes: Vec<Node>, edges: Vec<Edge>, clusters: Vec<Cluster>) {
        self.clear();
        let total_nodes = nodes.len();
        for mut node in nodes {
            if self.index.contains_key(&node.id) {
                continue;
            }
            name_blank_label(&mut node);
            self.index.insert(node.id, self.nodes.len());
            self.nodes.push(node);
        }
        let total_edges = edges.len();
        self.edges = edges
            .into_iter()
            .filter(|edge| self.contains(edge.source) && self.contains(edge.target))
            .collect();
        self.clusters = clusters;

        if self.nodes.len() != total_nodes || self.edges.len() != total_edges {
            debug!(
                duplicate_nodes = total_nodes - self.nodes.len(),
                dangling_edges = total_edges - self.edges.len(),
                "sanitized graph on load"
            );
        }
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        self.clusters.clear();
        self.index.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.index.get(&id).map(|&idx| &self.nodes[idx])
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn children_of(&self, id: NodeId) -> impl Iterator<Item = &Node> + '_ {
        self.nodes
            .iter()
            .filter(move |node| node.parent_id == Some(id))
    }

    pub fn has_children(&self, id: NodeId) -> bool {
        self.children_of(id).next().is_some()
    }

    /// Merges the result of expanding `parent_id`.
    ///
    /// Candidates whose id is taken or whose label is too close to an existing label are
    /// skipped. When that leaves nothing, every candidate is kept under a fresh variant id so
    /// an expansion always shows something. Edges survive only if both ends exist afterwards.
    pub fn merge_expansion(
        &mut self,
        parent_id: NodeId,
        new_nodes: Vec<Node>,
        new_edges: Vec<Edge>,
        expansion_type: Option<&str>,
        config: &MergeConfig,
    ) -> MergeReport {
        let parent_found = self.contains(parent_id);
        let candidates: Vec<Node> = new_nodes
            .into_iter()
            .map(|mut node| {
                name_blank_label(&mut node);
                node
            })
            .collect();

        let mut accepted: Vec<Node> = Vec::new();
        let mut taken: HashSet<NodeId> = HashSet::new();
        for node in &candidates {
            if self.contains(node.id) || taken.contains(&node.id) {
                continue;
            }
            if self.label_conflicts(&node.label, config.label_similarity) {
                continue;
            }
            taken.insert(node.id);
            accepted.push(node.clone());
        }

        let mut remap: BTreeMap<NodeId, NodeId> = BTreeMap::new();
        let used_variants = accepted.is_empty() && !candidates.is_empty();
        if used_variants {
            taken.clear();
            for (idx, mut node) in candidates.into_iter().enumerate() {
                let variant = self.variant_id(parent_id, idx, &taken, config);
                if !self.contains(node.id) {
                    remap.entry(node.id).or_insert(variant);
                }
                node.id = variant;
                node.label = format!("{}{}", node.label, config.variant_suffix);
                taken.insert(variant);
                accepted.push(node);
            }
        }

        let kind = expansion_type.filter(|kind| !kind.is_empty() && *kind != "all");
        for node in &mut accepted {
            if node.parent_id.is_none() {
                node.parent_id = Some(parent_id);
            }
            node.expanded = false;
            node.radius = None;
            node.expansion_type = kind.map(str::to_string);
        }

        let total_edges = new_edges.len();
        let mut edges = Vec::with_capacity(total_edges);
        for mut edge in new_edges {
            if let Some(&id) = remap.get(&edge.source) {
                edge.source = id;
            }
            if let Some(&id) = remap.get(&edge.target) {
                edge.target = id;
            }
            let source_ok = self.contains(edge.source) || taken.contains(&edge.source);
            let target_ok = self.contains(edge.target) || taken.contains(&edge.target);
            if source_ok && target_ok {
                edges.push(edge);
            }
        }

        if let Some(&idx) = self.index.get(&parent_id) {
            self.nodes[idx].expanded = true;
        }

        let added_nodes: Vec<NodeId> = accepted.iter().map(|node| node.id).collect();
        for node in accepted {
            self.index.insert(node.id, self.nodes.len());
            self.nodes.push(node);
        }
        let report = MergeReport {
            parent_found,
            added_nodes,
            added_edges: edges.len(),
            dropped_edges: total_edges - edges.len(),
            used_variants,
        };
        self.edges.extend(edges);

        debug!(
            parent = %parent_id,
            parent_found = report.parent_found,
            added_nodes = report.added_nodes.len(),
            added_edges = report.added_edges,
            dropped_edges = report.dropped_edges,
            used_variants = report.used_variants,
            "merged expansion"
        );
        report
    }

    fn label_conflicts(&self, label: &str, mode: LabelSimilarity) -> bool {
        if mode == LabelSimilarity::Off {
            return false;
        }
        let candidate = label.to_lowercase();
        self.nodes.iter().any(|node| {
            let existing = node.label.to_lowercase();
            match mode {
                LabelSimilarity::Exact => existing == candidate,
                LabelSimilarity::Containment => {
                    existing == candidate
                        || existing.contains(&candidate)
                        || candidate.contains(&existing)
                }
                LabelSimilarity::Off => false,
            }
        })
    }

    fn variant_id(
        &self,
        parent_id: NodeId,
        position: usize,
        taken: &HashSet<NodeId>,
        config: &MergeConfig,
    ) -> NodeId {
        let base = parent_id
            .get()
            .saturating_mul(config.variant_id_multiplier.max(1))
            .saturating_add(position as u64 + 1);
        let mut candidate = NodeId(base);
        while self.contains(candidate) || taken.contains(&candidate) {
            candidate = NodeId(candidate.get().wrapping_add(1).max(1));
        }
        candidate
    }
}

// A blank label would contain-match every other label.
fn name_blank_label(node: &mut Node) {
    if node.label.trim().is_empty() {
        node.label = format!("Node {}", node.id);
    }
}
