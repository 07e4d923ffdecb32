use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn min_side(&self) -> f32 {
        self.width.min(self.height)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Root circle radius as a fraction of the smaller viewport side.
    pub root_radius_fraction: f32,
    pub anchor_x_fraction: f32,
    pub anchor_y_fraction: f32,
    /// Radius multiplier for roots that belong to the active cluster.
    pub active_cluster_scale: f32,
    pub sector_count: u32,
    /// Children a parent may have before its wedge starts to widen.
    pub sector_growth_threshold: usize,
    pub sector_growth_per_child: f32,
    pub sibling_spacing_factor: f32,
    pub wide_radius: f32,
    pub narrow_radius: f32,
    pub radius_per_child: f32,
    pub expanded_node_radius: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            root_radius_fraction: 0.3,
            anchor_x_fraction: 0.5,
            anchor_y_fraction: 0.4,
            active_cluster_scale: 0.8,
            sector_count: 10,
            sector_growth_threshold: 3,
            sector_growth_per_child: 6.0,
            sibling_spacing_factor: 1.2,
            wide_radius: 170.0,
            narrow_radius: 110.0,
            radius_per_child: 10.0,
            expanded_node_radius: 30.0,
        }
    }
}

impl LayoutConfig {
    pub fn sector_base_degrees(&self) -> f32 {
        360.0 / self.sector_count.max(1) as f32
    }

    pub fn sector_max_degrees(&self) -> f32 {
        self.sector_base_degrees() * 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelSimilarity {
    /// Case-insensitive equality, or either label containing the other.
    Containment,
    /// Case-insensitive equality only.
    Exact,
    Off,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeConfig {
    pub label_similarity: LabelSimilarity,
    pub variant_suffix: String,
    pub variant_id_multiplier: u64,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            label_similarity: LabelSimilarity::Containment,
            variant_suffix: " (Variant)".to_string(),
            variant_id_multiplier: 1000,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub layout: LayoutConfig,
    pub merge: MergeConfig,
    pub viewport: Viewport,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    layout: Option<LayoutConfigFile>,
    merge: Option<MergeConfigFile>,
    viewport: Option<ViewportFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct LayoutConfigFile {
    root_radius_fraction: Option<f32>,
    anchor_x_fraction: Option<f32>,
    anchor_y_fraction: Option<f32>,
    active_cluster_scale: Option<f32>,
    sector_count: Option<u32>,
    sector_growth_threshold: Option<usize>,
    sector_growth_per_child: Option<f32>,
    sibling_spacing_factor: Option<f32>,
    wide_radius: Option<f32>,
    narrow_radius: Option<f32>,
    radius_per_child: Option<f32>,
    expanded_node_radius: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct MergeConfigFile {
    label_similarity: Option<LabelSimilarity>,
    variant_suffix: Option<String>,
    variant_id_multiplier: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct ViewportFile {
    width: Option<f32>,
    height: Option<f32>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let parsed: ConfigFile = serde_json::from_str(contents)?;

    if let Some(layout) = parsed.layout {
        let cfg = &mut config.layout;
        if let Some(v) = layout.root_radius_fraction {
            cfg.root_radius_fraction = v;
        }
        if let Some(v) = layout.anchor_x_fraction {
            cfg.anchor_x_fraction = v;
        }
        if let Some(v) = layout.anchor_y_fraction {
            cfg.anchor_y_fraction = v;
        }
        if let Some(v) = layout.active_cluster_scale {
            cfg.active_cluster_scale = v;
        }
        if let Some(v) = layout.sector_count {
            if v == 0 {
                anyhow::bail!("layout.sectorCount must be at least 1");
            }
            cfg.sector_count = v;
        }
        if let Some(v) = layout.sector_growth_threshold {
            cfg.sector_growth_threshold = v;
        }
        if let Some(v) = layout.sector_growth_per_child {
            cfg.sector_growth_per_child = v;
        }
        if let Some(v) = layout.sibling_spacing_factor {
            cfg.sibling_spacing_factor = v;
        }
        if let Some(v) = layout.wide_radius {
            cfg.wide_radius = v;
        }
        if let Some(v) = layout.narrow_radius {
            cfg.narrow_radius = v;
        }
        if let Some(v) = layout.radius_per_child {
            cfg.radius_per_child = v;
        }
        if let Some(v) = layout.expanded_node_radius {
            cfg.expanded_node_radius = v;
        }
    }

    if let Some(merge) = parsed.merge {
        if let Some(v) = merge.label_similarity {
            config.merge.label_similarity = v;
        }
        if let Some(v) = merge.variant_suffix {
            config.merge.variant_suffix = v;
        }
        if let Some(v) = merge.variant_id_multiplier {
            if v == 0 {
                anyhow::bail!("merge.variantIdMultiplier must be positive");
            }
            config.merge.variant_id_multiplier = v;
        }
    }

    if let Some(viewport) = parsed.viewport {
        if let Some(v) = viewport.width {
            config.viewport.width = v;
        }
        if let Some(v) = viewport.height {
            config.viewport.height = v;
        }
    }

    Ok(config)
}
