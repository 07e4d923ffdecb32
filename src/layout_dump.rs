use crate::layout::Layout;
use crate::model::{Metadata, Node};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDump {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    pub width: f32,
    pub height: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_cluster: Option<String>,
    pub nodes: Vec<NodeDump>,
    pub edges: Vec<EdgeDump>,
    pub clusters: Vec<ClusterDump>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDump {
    pub id: u64,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub x: f32,
    pub y: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radius: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<u64>,
    pub expanded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expansion_type: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeDump {
    pub source: u64,
    pub target: u64,
    #[serde(rename = "type")]
    pub kind: String,
    pub weight: f32,
    pub bidirectional: bool,
    pub source_label: String,
    pub target_label: String,
    pub points: Vec<[f32; 2]>,
}

#[derive(Debug, Serialize)]
pub struct ClusterDump {
    pub id: String,
    pub label: String,
    pub nodes: Vec<u64>,
    pub x: f32,
    pub y: f32,
    pub active: bool,
}

impl NodeDump {
    fn from_node(node: &Node) -> Self {
        Self {
            id: node.id.get(),
            label: node.label.clone(),
            kind: node.kind.clone(),
            x: node.x,
            y: node.y,
            radius: node.radius,
            parent_id: node.parent_id.map(|id| id.get()),
            expanded: node.expanded,
            expansion_type: node.expansion_type.clone(),
        }
    }
}

impl LayoutDump {
    pub fn from_layout(layout: &Layout, metadata: Option<&Metadata>) -> Self {
        let nodes = layout.nodes.iter().map(NodeDump::from_node).collect();

        let edges = layout
            .edges
            .iter()
            .map(|edge| EdgeDump {
                source: edge.source.get(),
                target: edge.target.get(),
                kind: edge.kind.clone(),
                weight: edge.weight,
                bidirectional: edge.bidirectional,
                source_label: edge.source_label.clone(),
                target_label: edge.target_label.clone(),
                points: edge.points.iter().map(|(x, y)| [*x, *y]).collect(),
            })
            .collect();

        let clusters: Vec<ClusterDump> = layout
            .clusters
            .iter()
            .map(|cluster| ClusterDump {
                id: cluster.id.clone(),
                label: cluster.label.clone(),
                nodes: cluster.nodes.iter().map(|id| id.get()).collect(),
                x: cluster.x,
                y: cluster.y,
                active: cluster.active,
            })
            .collect();
        let active_cluster = clusters
            .iter()
            .find(|cluster| cluster.active)
            .map(|cluster| cluster.id.clone());

        LayoutDump {
            metadata: metadata.cloned(),
            width: layout.width,
            height: layout.height,
            active_cluster,
            nodes,
            edges,
            clusters,
        }
    }
}

/// Writes the dump as pretty JSON to `path`, or stdout when no path is given.
pub fn write_layout_dump(
    path: Option<&Path>,
    layout: &Layout,
    metadata: Option<&Metadata>,
) -> anyhow::Result<()> {
    let dump = LayoutDump::from_layout(layout, metadata);
    match path {
        Some(path) => {
            let mut writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer_pretty(&mut writer, &dump)?;
            writer.flush()?;
        }
        None => {
            let stdout = io::stdout();
            let mut writer = stdout.lock();
            serde_json::to_writer_pretty(&mut writer, &dump)?;
            writeln!(writer)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::graph::GraphModel;
    use crate::layout::{LayoutParams, compute_layout};
    use crate::model::{Cluster, Edge, NodeId};

    #[test]
    fn dump_uses_wire_field_names() {
        let graph = GraphModel::from_parts(
            vec![Node::new(1, "Root"), Node::new(101, "Leaf").with_parent(1)],
            vec![Edge::new(1, 101, "leads_to")],
            vec![Cluster {
                id: "c1".to_string(),
                label: "All".to_string(),
                description: String::new(),
                nodes: vec![NodeId(1), NodeId(101)],
            }],
        );
        let params = LayoutParams::default().with_active_cluster("c1");
        let layout = compute_layout(&graph, &params, &LayoutConfig::default());
        let dump = LayoutDump::from_layout(&layout, Some(&Metadata::now("roots")));
        let value = serde_json::to_value(&dump).expect("dump serializes");

        assert_eq!(value["activeCluster"], "c1");
        assert_eq!(value["metadata"]["prompt"], "roots");
        assert_eq!(value["nodes"][1]["parentId"], 1);
        assert_eq!(value["nodes"][0]["type"], "concept");
        assert!(value["nodes"][0].get("parentId").is_none());
        assert_eq!(value["edges"][0]["sourceLabel"], "Root");
        assert_eq!(value["edges"][0]["points"].as_array().map(Vec::len), Some(2));
        assert_eq!(value["clusters"][0]["nodes"], serde_json::json!([1, 101]));
    }

    #[test]
    fn writes_pretty_json_to_file() {
        let dir = std::env::temp_dir().join(format!("constellation-dump-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("temp dir");
        let path = dir.join("layout.json");
        let layout = Layout::empty(Default::default());
        write_layout_dump(Some(&path), &layout, None).expect("dump written");
        let text = std::fs::read_to_string(&path).expect("dump readable");
        assert!(text.contains("\"width\": 1200.0"));
        assert!(!text.contains("metadata"));
        std::fs::remove_dir_all(&dir).ok();
    }
}
