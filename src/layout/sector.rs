//! Angular bookkeeping for descendants.
//!
//! Every parent owns one of `sector_count` fixed wedges of the compass, picked from its id, so
//! the children of different parents stay apart in angle space. All angles here are degrees;
//! conversion to radians happens only in [`polar`].

use crate::config::LayoutConfig;
use crate::model::NodeId;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Wedge {
    pub start: f32,
    pub end: f32,
}

impl Wedge {
    pub fn width(&self) -> f32 {
        self.end - self.start
    }

    pub fn mid(&self) -> f32 {
        (self.start + self.end) / 2.0
    }

    /// True when the two arcs share more than a boundary point.
    pub fn overlaps(&self, other: &Wedge) -> bool {
        let half_sum = (self.width() + other.width()) / 2.0;
        angular_distance(self.mid(), other.mid()) + 1e-3 < half_sum
    }

    pub fn contains(&self, angle: f32) -> bool {
        angular_distance(self.mid(), angle) <= self.width() / 2.0 + 1e-3
    }
}

/// Shortest distance between two angles on the circle.
pub fn angular_distance(a: f32, b: f32) -> f32 {
    let diff = (a - b).rem_euclid(360.0);
    diff.min(360.0 - diff)
}

/// Sector of a parent, in `1..=sector_count`.
pub fn sector_id(parent: NodeId, sector_count: u32) -> u32 {
    let count = u64::from(sector_count.max(1));
    match parent.get() % count {
        0 => count as u32,
        rem => rem as u32,
    }
}

/// Wedge width for a parent with `child_count` children. Grows past the threshold, capped at
/// twice the base width.
pub fn wedge_width(child_count: usize, config: &LayoutConfig) -> f32 {
    let base = config.sector_base_degrees();
    let extra = child_count.saturating_sub(config.sector_growth_threshold) as f32
        * config.sector_growth_per_child.max(0.0);
    (base + extra).min(config.sector_max_degrees())
}

pub fn sector_wedge(parent: NodeId, child_count: usize, config: &LayoutConfig) -> Wedge {
    let base = config.sector_base_degrees();
    let sector = sector_id(parent, config.sector_count);
    let mid = (sector - 1) as f32 * base + base / 2.0;
    let half = wedge_width(child_count, config) / 2.0;
    Wedge {
        start: mid - half,
        end: mid + half,
    }
}

/// Angle of the `index`-th of `child_count` siblings, centered on the wedge midpoint.
///
/// With a spacing factor above 1 the outermost siblings leave the wedge once the step times
/// `child_count - 1` exceeds its width; at the default 1.2 that starts at seven children.
pub fn child_angle(parent: NodeId, index: usize, child_count: usize, config: &LayoutConfig) -> f32 {
    let count = child_count.max(1);
    let wedge = sector_wedge(parent, count, config);
    let step = wedge.width() / count as f32 * config.sibling_spacing_factor;
    let offset = index as f32 - (count as f32 - 1.0) / 2.0;
    wedge.mid() + offset * step
}

pub fn child_distance(child_count: usize, wide: bool, config: &LayoutConfig) -> f32 {
    let base = if wide {
        config.wide_radius
    } else {
        config.narrow_radius
    };
    base + config.radius_per_child * child_count as f32
}

pub fn polar(origin: (f32, f32), distance: f32, degrees: f32) -> (f32, f32) {
    let radians = degrees.to_radians();
    (
        origin.0 + distance * radians.cos(),
        origin.1 + distance * radians.sin(),
    )
}
