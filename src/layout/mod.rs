mod redistribute;
mod sector;
mod types;

pub use redistribute::{redistribute, redistribute_layout, redistribution_expanded_set};
pub use sector::{
    Wedge, angular_distance, child_angle, child_distance, polar, sector_id, sector_wedge,
    wedge_width,
};
pub use types::*;

use crate::config::{LayoutConfig, Viewport};
use crate::graph::GraphModel;
use crate::model::{Cluster, Node, NodeId};
use std::collections::{HashMap, HashSet};

/// Point the root circle is centered on: horizontally centered, slightly above the middle.
pub fn anchor_point(viewport: Viewport, config: &LayoutConfig) -> (f32, f32) {
    (
        viewport.width * config.anchor_x_fraction,
        viewport.height * config.anchor_y_fraction,
    )
}

pub fn root_radius(viewport: Viewport, config: &LayoutConfig) -> f32 {
    viewport.min_side() * config.root_radius_fraction
}

/// Assigns `x`/`y` to every node.
///
/// Pure: the output depends only on the arguments, and every input node comes back in the same
/// order with only `x`, `y` and `radius` changed. Roots sit evenly on a circle around the
/// anchor; descendants sit in their parent's sector wedge. A descendant whose parent is absent
/// (or whose parent chain loops) is placed on the anchor.
pub fn calculate_node_positions(
    nodes: &[Node],
    clusters: &[Cluster],
    params: &LayoutParams,
    config: &LayoutConfig,
) -> Vec<Node> {
    let anchor = anchor_point(params.viewport, config);
    let radius = root_radius(params.viewport, config);
    let active_members = active_cluster_members(clusters, params.active_cluster.as_deref());

    let mut first_index: HashMap<NodeId, usize> = HashMap::with_capacity(nodes.len());
    for (idx, node) in nodes.iter().enumerate() {
        first_index.entry(node.id).or_insert(idx);
    }

    let mut positions: Vec<Option<(f32, f32)>> = vec![None; nodes.len()];

    let root_count = nodes.iter().filter(|node| node.is_root()).count();
    let mut root_index = 0usize;
    for (idx, node) in nodes.iter().enumerate() {
        if !node.is_root() {
            continue;
        }
        let angle = 360.0 * root_index as f32 / root_count as f32;
        let scale = if active_members.contains(&node.id) {
            config.active_cluster_scale
        } else {
            1.0
        };
        positions[idx] = Some(polar(anchor, radius * scale, angle));
        root_index += 1;
    }

    // Sibling order follows sequence order.
    let mut child_counts: HashMap<NodeId, usize> = HashMap::new();
    let mut sibling_index: Vec<usize> = vec![0; nodes.len()];
    for (idx, node) in nodes.iter().enumerate() {
        if let Some(parent) = node.parent_id {
            let count = child_counts.entry(parent).or_insert(0);
            sibling_index[idx] = *count;
            *count += 1;
        }
    }

    let mut pending: Vec<usize> = (0..nodes.len())
        .filter(|&idx| positions[idx].is_none())
        .collect();
    while !pending.is_empty() {
        let before = pending.len();
        pending.retain(|&idx| {
            let node = &nodes[idx];
            let Some(parent) = node.parent_id else {
                return false;
            };
            let Some(&parent_idx) = first_index.get(&parent) else {
                positions[idx] = Some(anchor);
                return false;
            };
            let Some(origin) = positions[parent_idx] else {
                return true;
            };
            let count = child_counts.get(&parent).copied().unwrap_or(1);
            let wide = params.force_wide || params.expanded.contains(&parent);
            let angle = child_angle(parent, sibling_index[idx], count, config);
            let distance = child_distance(count, wide, config);
            positions[idx] = Some(polar(origin, distance, angle));
            false
        });
        if pending.len() == before {
            for &idx in &pending {
                positions[idx] = Some(anchor);
            }
            break;
        }
    }

    nodes
        .iter()
        .zip(positions)
        .map(|(node, position)| {
            let (x, y) = position.unwrap_or(anchor);
            let radius = params
                .expanded
                .contains(&node.id)
                .then_some(config.expanded_node_radius);
            Node {
                x,
                y,
                radius,
                ..node.clone()
            }
        })
        .collect()
}

fn active_cluster_members(clusters: &[Cluster], active: Option<&str>) -> HashSet<NodeId> {
    let Some(active) = active else {
        return HashSet::new();
    };
    clusters
        .iter()
        .filter(|cluster| cluster.id == active)
        .flat_map(|cluster| cluster.nodes.iter().copied())
        .collect()
}

/// Positions the whole graph and derives edge and cluster-label geometry from it.
pub fn compute_layout(graph: &GraphModel, params: &LayoutParams, config: &LayoutConfig) -> Layout {
    let nodes = calculate_node_positions(graph.nodes(), graph.clusters(), params, config);
    layout_from_positions(nodes, graph, params)
}

pub(crate) fn layout_from_positions(
    nodes: Vec<Node>,
    graph: &GraphModel,
    params: &LayoutParams,
) -> Layout {
    let mut lookup: HashMap<NodeId, &Node> = HashMap::with_capacity(nodes.len());
    for node in &nodes {
        lookup.entry(node.id).or_insert(node);
    }

    let edges = graph
        .edges()
        .iter()
        .filter_map(|edge| {
            let source = lookup.get(&edge.source)?;
            let target = lookup.get(&edge.target)?;
            Some(EdgeLayout {
                source: edge.source,
                target: edge.target,
                kind: edge.kind.clone(),
                weight: edge.weight,
                bidirectional: edge.bidirectional,
                source_label: source.label.clone(),
                target_label: target.label.clone(),
                points: vec![(source.x, source.y), (target.x, target.y)],
            })
        })
        .collect();

    let clusters = graph
        .clusters()
        .iter()
        .filter_map(|cluster| {
            let members: Vec<&Node> = cluster
                .nodes
                .iter()
                .filter_map(|id| lookup.get(id).copied())
                .collect();
            if members.is_empty() {
                return None;
            }
            let count = members.len() as f32;
            let x = members.iter().map(|node| node.x).sum::<f32>() / count;
            let y = members.iter().map(|node| node.y).sum::<f32>() / count;
            Some(ClusterLayout {
                id: cluster.id.clone(),
                label: cluster.label.clone(),
                nodes: members.iter().map(|node| node.id).collect(),
                x,
                y,
                active: params.active_cluster.as_deref() == Some(cluster.id.as_str()),
            })
        })
        .collect();

    Layout {
        nodes,
        edges,
        clusters,
        width: params.viewport.width,
        height: params.viewport.height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Edge;

    const EPS: f32 = 1e-3;

    fn viewport() -> Viewport {
        Viewport::new(1000.0, 800.0)
    }

    fn close(a: (f32, f32), b: (f32, f32)) -> bool {
        (a.0 - b.0).abs() < EPS && (a.1 - b.1).abs() < EPS
    }

    fn distance(a: (f32, f32), b: (f32, f32)) -> f32 {
        ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
    }

    #[test]
    fn four_roots_sit_on_the_compass_points() {
        let config = LayoutConfig::default();
        let nodes: Vec<Node> = [7u64, 3, 12, 5]
            .iter()
            .map(|&id| Node::new(id, format!("N{id}")))
            .collect();
        let params = LayoutParams::new(viewport());
        let placed = calculate_node_positions(&nodes, &[], &params, &config);

        let anchor = anchor_point(viewport(), &config);
        assert!(close(anchor, (500.0, 320.0)));
        let r = root_radius(viewport(), &config);
        assert!((r - 240.0).abs() < EPS);
        let expected = [
            (anchor.0 + r, anchor.1),
            (anchor.0, anchor.1 + r),
            (anchor.0 - r, anchor.1),
            (anchor.0, anchor.1 - r),
        ];
        for (node, want) in placed.iter().zip(expected) {
            assert!(close((node.x, node.y), want), "{:?} vs {:?}", (node.x, node.y), want);
        }
        let ids: Vec<NodeId> = placed.iter().map(|n| n.id).collect();
        assert_eq!(ids, nodes.iter().map(|n| n.id).collect::<Vec<_>>());
    }

    #[test]
    fn active_cluster_pulls_members_inward() {
        let config = LayoutConfig::default();
        let nodes = vec![Node::new(1, "A"), Node::new(2, "B")];
        let clusters = vec![Cluster {
            id: "c1".to_string(),
            label: "First".to_string(),
            description: String::new(),
            nodes: vec![NodeId(2)],
        }];
        let plain = calculate_node_positions(&nodes, &clusters, &LayoutParams::new(viewport()), &config);
        let params = LayoutParams::new(viewport()).with_active_cluster("c1");
        let active = calculate_node_positions(&nodes, &clusters, &params, &config);
        let anchor = anchor_point(viewport(), &config);
        let r = root_radius(viewport(), &config);

        assert!(close((plain[0].x, plain[0].y), (active[0].x, active[0].y)));
        assert!((distance(anchor, (active[1].x, active[1].y)) - r * 0.8).abs() < EPS);
        // Angle is unchanged: still directly left of the anchor.
        assert!((active[1].y - anchor.1).abs() < EPS);
        assert!(active[1].x < anchor.0);
    }

    #[test]
    fn children_follow_their_parent_even_when_listed_first() {
        let config = LayoutConfig::default();
        let nodes = vec![
            Node::new(201, "Grandchild").with_parent(21),
            Node::new(21, "Child").with_parent(2),
            Node::new(2, "Root"),
        ];
        let placed = calculate_node_positions(&nodes, &[], &LayoutParams::new(viewport()), &config);
        let root = (placed[2].x, placed[2].y);
        let child = (placed[1].x, placed[1].y);
        let grandchild = (placed[0].x, placed[0].y);

        let narrow = child_distance(1, false, &config);
        assert!((distance(root, child) - narrow).abs() < EPS);
        assert!((distance(child, grandchild) - narrow).abs() < EPS);

        let expected = polar(child, narrow, child_angle(NodeId(21), 0, 1, &config));
        assert!(close(grandchild, expected));
    }

    #[test]
    fn expanded_parent_uses_wide_radius_and_gets_hint() {
        let config = LayoutConfig::default();
        let nodes = vec![
            Node::new(1, "Root"),
            Node::new(101, "A").with_parent(1),
            Node::new(102, "B").with_parent(1),
        ];
        let params = LayoutParams::new(viewport()).with_expanded([NodeId(1)]);
        let placed = calculate_node_positions(&nodes, &[], &params, &config);
        let root = (placed[0].x, placed[0].y);
        let wide = child_distance(2, true, &config);
        assert!((distance(root, (placed[1].x, placed[1].y)) - wide).abs() < EPS);
        assert_eq!(placed[0].radius, Some(config.expanded_node_radius));
        assert_eq!(placed[1].radius, None);
    }

    #[test]
    fn orphans_and_cycles_fall_back_to_anchor() {
        let config = LayoutConfig::default();
        let nodes = vec![
            Node::new(1, "Root"),
            Node::new(5, "Orphan").with_parent(99),
            Node::new(6, "Loop A").with_parent(7),
            Node::new(7, "Loop B").with_parent(6),
        ];
        let placed = calculate_node_positions(&nodes, &[], &LayoutParams::new(viewport()), &config);
        let anchor = anchor_point(viewport(), &config);
        for node in &placed[1..] {
            assert!(close((node.x, node.y), anchor));
        }
    }

    #[test]
    fn layout_is_repeatable() {
        let config = LayoutConfig::default();
        let nodes = vec![
            Node::new(1, "Root"),
            Node::new(2, "Other"),
            Node::new(101, "A").with_parent(1),
            Node::new(102, "B").with_parent(1),
            Node::new(1011, "C").with_parent(101),
        ];
        let params = LayoutParams::new(viewport()).with_expanded([NodeId(101)]);
        let first = calculate_node_positions(&nodes, &[], &params, &config);
        let second = calculate_node_positions(&nodes, &[], &params, &config);
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.x.to_bits(), b.x.to_bits());
            assert_eq!(a.y.to_bits(), b.y.to_bits());
        }
    }

    #[test]
    fn compute_layout_drops_nothing_it_can_draw() {
        let graph = GraphModel::from_parts(
            vec![Node::new(1, "Alpha"), Node::new(2, "Beta"), Node::new(3, "Gamma")],
            vec![Edge::new(1, 2, "is_a"), Edge::new(2, 3, "part_of")],
            vec![Cluster {
                id: "c1".to_string(),
                label: "Pair".to_string(),
                description: String::new(),
                nodes: vec![NodeId(1), NodeId(2), NodeId(40)],
            }],
        );
        let params = LayoutParams::new(viewport()).with_active_cluster("c1");
        let layout = compute_layout(&graph, &params, &LayoutConfig::default());

        assert_eq!(layout.edges.len(), 2);
        let edge = &layout.edges[0];
        assert_eq!(edge.source_label, "Alpha");
        assert_eq!(edge.target_label, "Beta");
        assert_eq!(edge.points[0], layout.position(NodeId(1)).expect("alpha placed"));

        assert_eq!(layout.clusters.len(), 1);
        let cluster = &layout.clusters[0];
        assert!(cluster.active);
        assert_eq!(cluster.nodes, vec![NodeId(1), NodeId(2)]);
        let a = layout.position(NodeId(1)).expect("alpha placed");
        let b = layout.position(NodeId(2)).expect("beta placed");
        assert!(close((cluster.x, cluster.y), ((a.0 + b.0) / 2.0, (a.1 + b.1) / 2.0)));
        assert_eq!((layout.width, layout.height), (1000.0, 800.0));
    }
}
