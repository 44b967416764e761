// Geometric layout for the mindmap editor.
//
// Goals:
// - Deterministic: no randomness, no time budgets
// - Never block: every search is bounded and falls back to a fixed offset
// - Left-to-right trees: children sit right of their parent, siblings stack down
// - Corrections only push downwards; nothing is ever pulled up
//
// Submodules:
// - spatial_grid: neighbourhood queries for large graphs
// - collision: free-space tests and free-position search
// - placement: where new children / new roots go
// - spacing: push-down, subtree translation, subtree spacing normalization
// - align: one-shot generation alignment and bus de-duplication

use serde::{Deserialize, Serialize};

use crate::geometry::{PointF, SizeF};

pub mod spatial_grid;
pub mod collision;
pub mod placement;
pub mod spacing;
pub mod align;

pub use align::{align_generations, connector_crossings};
pub use collision::CollisionIndex;
pub use placement::{place_child, place_new_root, subtree_bbox, PlacementPlan, SubtreeBox};
pub use spacing::{normalize_subtree_spacing, push_down_until_no_collision, translate_subtree_vertical};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Size for every node (constant per document).
    pub node_size: SizeF,
    /// Minimum clearance kept around a candidate node.
    pub spacing: f64,
    /// Horizontal gap between a parent's right edge and its children.
    pub child_h_gap: f64,
    /// Vertical gap between stacked siblings.
    pub child_v_gap: f64,
    /// X offset of a new root from the center node.
    pub root_column_offset: f64,
    /// Vertical gap between the lowest subtree and a new root.
    pub root_v_gap: f64,
    /// Increment used by push-down loops.
    pub push_step: f64,
    /// Push-down iterations allowed per node before giving up.
    pub push_down_factor: usize,
    /// Distance from a source's right edge to its connector bus.
    pub bus_offset: f64,
    /// Shortest last leg of a connector.
    pub min_tail: f64,
    /// Horizontal tolerance for lane detection on drop.
    pub lane_tolerance: f64,
    /// Minimum vertical gap inside a lane after insertion.
    pub lane_gap: f64,
    /// Margin used for the subtree-wide collision test on drop.
    pub drag_margin: f64,
    /// Pointer travel below which a press/release is a click.
    pub click_threshold: f64,
    /// Column width between generations when aligning.
    pub align_lane_spacing: f64,
    /// Nudge applied to disambiguate coincident buses.
    pub align_bus_delta: f64,
    /// Minimum vertical gap inside a generation after aligning.
    pub align_min_gap: f64,
    /// More connector crossings than this and the align pass leaves them.
    pub crossing_limit: usize,
    /// Same, counted in distinct nodes owning a crossing connector.
    pub crossing_node_limit: usize,
    /// Subtree pushes the crossing pass may make.
    pub crossing_max_rounds: usize,
    /// Largest single push of the crossing pass.
    pub crossing_max_push: f64,
    /// Node count above which collision checks only look nearby.
    pub large_graph_threshold: usize,
    /// Neighbourhood radius used for large graphs.
    pub large_graph_radius: f64,
    pub spiral_step: f64,
    pub spiral_max_radius: f64,
    /// Degrees between spiral samples.
    pub spiral_angle_step: u32,
    /// Returned (relative to the preferred point) when every search fails.
    pub fallback_offset: PointF,
    pub grid_size: f64,
    pub grid_snap: bool,
    /// Max jitter per tick in attraction mode.
    pub attraction_amplitude: f64,
    pub history_limit: usize,
    /// Margin added around all nodes when fitting the viewport.
    pub fit_margin: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_size: SizeF { w: 128.0, h: 72.0 },
            spacing: 20.0,
            child_h_gap: 40.0,
            child_v_gap: 20.0,
            root_column_offset: 200.0,
            root_v_gap: 60.0,
            push_step: 20.0,
            push_down_factor: 8,
            bus_offset: 20.0,
            min_tail: 30.0,
            lane_tolerance: 60.0,
            lane_gap: 5.0,
            drag_margin: 5.0,
            click_threshold: 5.0,
            align_lane_spacing: 180.0,
            align_bus_delta: 6.0,
            align_min_gap: 5.0,
            crossing_limit: 20,
            crossing_node_limit: 50,
            crossing_max_rounds: 10,
            crossing_max_push: 500.0,
            large_graph_threshold: 100,
            large_graph_radius: 200.0,
            spiral_step: 50.0,
            spiral_max_radius: 500.0,
            spiral_angle_step: 30,
            fallback_offset: PointF { x: 300.0, y: 300.0 },
            grid_size: 20.0,
            grid_snap: false,
            attraction_amplitude: 3.0,
            history_limit: 100,
            fit_margin: 50.0,
        }
    }
}

impl LayoutConfig {
    /// Round to the grid when snapping is on, otherwise return `p` unchanged.
    pub fn snap_to_grid(&self, p: PointF) -> PointF {
        if !self.grid_snap || self.grid_size <= 0.0 {
            return p;
        }
        let g = self.grid_size;
        PointF { x: (p.x / g).round() * g, y: (p.y / g).round() * g }
    }
}
