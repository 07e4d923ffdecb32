use std::collections::BTreeSet;

use tracing::info;

use super::{Layout, LayoutParams, calculate_node_positions, layout_from_positions};
use crate::config::LayoutConfig;
use crate::graph::GraphModel;
use crate::model::{Cluster, Node, NodeId};

/// Every node with a child or an `expanded` flag, plus whatever the caller already had.
pub fn redistribution_expanded_set(nodes: &[Node], live: &BTreeSet<NodeId>) -> BTreeSet<NodeId> {
    let mut expanded = live.clone();
    for node in nodes {
        if node.expanded {
            expanded.insert(node.id);
        }
        if let Some(parent) = node.parent_id {
            expanded.insert(parent);
        }
    }
    expanded
}

/// Clean re-layout of the whole graph with wide spacing for every subtree.
///
/// Topology is untouched and the result depends only on the inputs, so calling it twice in a
/// row yields the same coordinates.
pub fn redistribute(
    nodes: &[Node],
    clusters: &[Cluster],
    params: &LayoutParams,
    config: &LayoutConfig,
) -> Vec<Node> {
    let forced = LayoutParams {
        expanded: redistribution_expanded_set(nodes, &params.expanded),
        force_wide: true,
        ..params.clone()
    };
    calculate_node_positions(nodes, clusters, &forced, config)
}

pub fn redistribute_layout(graph: &GraphModel, params: &LayoutParams, config: &LayoutConfig) -> Layout {
    let nodes = redistribute(graph.nodes(), graph.clusters(), params, config);
    info!(nodes = nodes.len(), "redistributed layout");
    layout_from_positions(nodes, graph, params)
}
