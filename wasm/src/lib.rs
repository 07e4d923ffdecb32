use constellation_layout::config::{LayoutConfig, MergeConfig, Viewport};
use constellation_layout::graph::GraphModel;
use constellation_layout::layout::{LayoutParams, compute_layout, redistribute_layout};
use constellation_layout::layout_dump::LayoutDump;
use constellation_layout::model::{GraphPayload, NodeId};
use constellation_layout::payload::{parse_expansion_payload, parse_graph_payload};
use serde::Deserialize;
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayoutOptions {
    width: Option<f32>,
    height: Option<f32>,
    active_cluster: Option<String>,
    #[serde(default)]
    expanded: Vec<u64>,
    #[serde(default)]
    redistribute: bool,
}

fn js_error(error: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&error.to_string())
}

fn build_params(options: &LayoutOptions) -> LayoutParams {
    let defaults = Viewport::default();
    let viewport = Viewport::new(
        options.width.unwrap_or(defaults.width),
        options.height.unwrap_or(defaults.height),
    );
    LayoutParams {
        expanded: options.expanded.iter().copied().map(NodeId).collect(),
        active_cluster: options.active_cluster.clone(),
        viewport,
        force_wide: false,
    }
}

fn layout_json(graph_text: &str, options: LayoutOptions) -> Result<String, String> {
    let payload = parse_graph_payload(graph_text).map_err(|error| error.to_string())?;
    let metadata = payload.metadata.clone();
    let graph = GraphModel::from_parts(payload.nodes, payload.edges, payload.clusters);
    let params = build_params(&options);
    let config = LayoutConfig::default();
    let layout = if options.redistribute {
        redistribute_layout(&graph, &params, &config)
    } else {
        compute_layout(&graph, &params, &config)
    };
    serde_json::to_string(&LayoutDump::from_layout(&layout, metadata.as_ref()))
        .map_err(|error| error.to_string())
}

fn merge_json(
    graph_text: &str,
    parent: u64,
    expansion_text: &str,
    kind: Option<&str>,
) -> Result<String, String> {
    let payload = parse_graph_payload(graph_text).map_err(|error| error.to_string())?;
    let expansion = parse_expansion_payload(expansion_text).map_err(|error| error.to_string())?;
    let metadata = payload.metadata.clone();
    let mut graph = GraphModel::from_parts(payload.nodes, payload.edges, payload.clusters);
    graph.merge_expansion(
        NodeId(parent),
        expansion.nodes,
        expansion.edges,
        kind,
        &MergeConfig::default(),
    );
    let merged = GraphPayload {
        nodes: graph.nodes().to_vec(),
        edges: graph.edges().to_vec(),
        clusters: graph.clusters().to_vec(),
        metadata,
    };
    serde_json::to_string(&merged).map_err(|error| error.to_string())
}

/// Lays out a graph payload (or a completion containing one) and returns the layout JSON.
#[wasm_bindgen]
pub fn layout_graph(graph_json: &str, options_json: Option<String>) -> Result<String, JsValue> {
    let options = match options_json {
        Some(raw) => serde_json::from_str::<LayoutOptions>(&raw).map_err(js_error)?,
        None => LayoutOptions::default(),
    };
    layout_json(graph_json, options).map_err(js_error)
}

/// Merges an expansion of `parent_id` into the graph and returns the updated graph JSON.
#[wasm_bindgen]
pub fn merge_expansion(
    graph_json: &str,
    parent_id: u64,
    expansion_json: &str,
    kind: Option<String>,
) -> Result<String, JsValue> {
    merge_json(graph_json, parent_id, expansion_json, kind.as_deref()).map_err(js_error)
}
