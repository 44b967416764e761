// Free-space tests and free-position search.
//
// CollisionIndex is a frozen copy of node rectangles and connector segment
// bounds taken from a MindMap. Mutating passes rebuild it after they move
// things; it never borrows the graph, so callers can interleave queries and
// mutations freely.
//
// Large graphs (more than `large_graph_threshold` nodes) only test nodes whose
// centers lie within `large_graph_radius` of the candidate and skip connector
// segments. This is an approximation: a far-away wide obstacle is missed.

use std::collections::HashSet;

use log::debug;

use crate::geometry::{PointF, RectF, SizeF};
use crate::model::{MindMap, NodeId};
use super::spatial_grid::SpatialGrid;
use super::LayoutConfig;

#[derive(Debug, Clone)]
struct SegmentBox {
    bounds: RectF,
    source: NodeId,
    target: NodeId,
}

#[derive(Debug, Clone)]
pub struct CollisionIndex {
    nodes: Vec<(NodeId, RectF)>,
    segments: Vec<SegmentBox>,
    grid: Option<SpatialGrid>,
    node_size: SizeF,
    spacing: f64,
    radius: f64,
}

impl CollisionIndex {
    pub fn build(graph: &MindMap, cfg: &LayoutConfig) -> Self {
        let nodes: Vec<(NodeId, RectF)> = graph.nodes().map(|n| (n.id, n.rect())).collect();
        let segments = graph
            .edges()
            .flat_map(|e| {
                e.connector.segments().iter().map(move |s| SegmentBox {
                    bounds: s.bounds(),
                    source: e.source,
                    target: e.target,
                })
            })
            .collect();

        let grid = (nodes.len() > cfg.large_graph_threshold).then(|| {
            let mut grid = SpatialGrid::new(cfg.large_graph_radius);
            for (id, r) in &nodes {
                grid.insert(*id, *r);
            }
            grid
        });

        Self {
            nodes,
            segments,
            grid,
            node_size: graph.node_size(),
            spacing: cfg.spacing,
            radius: cfg.large_graph_radius,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn is_large(&self) -> bool {
        self.grid.is_some()
    }

    pub fn node_rect_at(&self, center: PointF) -> RectF {
        RectF::from_center(center, self.node_size)
    }

    /// True when `candidate`, grown by the spacing margin, touches no node
    /// (other than `exclude`) and no connector segment not attached to `exclude`.
    pub fn is_free(&self, candidate: &RectF, exclude: Option<NodeId>) -> bool {
        self.is_free_except(candidate, &exclude.into_iter().collect())
    }

    /// Same as `is_free` with a whole set of nodes ignored, along with
    /// every connector touching one of them.
    pub fn is_free_except(&self, candidate: &RectF, ignored: &HashSet<NodeId>) -> bool {
        let spaced = candidate.expanded(self.spacing);

        if let Some(grid) = &self.grid {
            let center = candidate.center();
            let area = RectF {
                x: center.x - self.radius,
                y: center.y - self.radius,
                w: 2.0 * self.radius,
                h: 2.0 * self.radius,
            };
            return grid
                .query(&area)
                .iter()
                .filter(|(id, _)| !ignored.contains(id))
                .filter(|(_, r)| r.center().distance(&center) < self.radius)
                .all(|(_, r)| !spaced.overlaps(r));
        }

        let hits_node = self
            .nodes
            .iter()
            .any(|(id, r)| !ignored.contains(id) && spaced.overlaps(r));
        if hits_node {
            return false;
        }

        !self.segments.iter().any(|s| {
            !ignored.contains(&s.source) && !ignored.contains(&s.target) && spaced.overlaps(&s.bounds)
        })
    }

    /// Plain rectangle intersection against nodes (no margin, no connectors).
    pub fn check_collision(&self, bbox: &RectF, exclude: Option<NodeId>) -> bool {
        self.nodes
            .iter()
            .any(|(id, r)| Some(*id) != exclude && bbox.overlaps(r))
    }

    fn is_free_point(&self, center: PointF, exclude: Option<NodeId>) -> bool {
        self.is_free(&self.node_rect_at(center), exclude)
    }

    /// Nearest free center for a node preferring `preferred`.
    ///
    /// Order: the preferred point, a fixed candidate list biased downward,
    /// a spiral of growing rings, then a fixed offset.
    pub fn find_free_position(&self, preferred: PointF, exclude: Option<NodeId>, cfg: &LayoutConfig) -> PointF {
        if self.is_free_point(preferred, exclude) {
            return preferred;
        }

        if let Some(p) = candidate_offsets()
            .into_iter()
            .map(|(dx, dy)| preferred.offset(dx, dy))
            .find(|p| self.is_free_point(*p, exclude))
        {
            return p;
        }

        if let Some(p) = spiral(preferred, cfg).find(|p| self.is_free_point(*p, exclude)) {
            return p;
        }

        debug!(
            "collision: no free slot near ({:.1}, {:.1}), using fallback offset",
            preferred.x, preferred.y
        );
        preferred.offset(cfg.fallback_offset.x, cfg.fallback_offset.y)
    }
}

/// Below, right, left, above, then stepping further down, right and left.
fn candidate_offsets() -> Vec<(f64, f64)> {
    let mut out = vec![(0.0, 100.0), (50.0, 0.0), (-50.0, 0.0), (0.0, -100.0)];
    for dy in (50..=300).step_by(50) {
        out.push((0.0, dy as f64));
    }
    for dx in (50..=200).step_by(50) {
        out.push((dx as f64, 0.0));
        out.push((-(dx as f64), 0.0));
    }
    out
}

/// Rings of growing radius, each sampled from 180 degrees round to 360 and
/// then from 0 up to 180.
fn spiral(center: PointF, cfg: &LayoutConfig) -> impl Iterator<Item = PointF> {
    let step = cfg.spiral_step.max(1.0);
    let rings = (cfg.spiral_max_radius / step).floor() as usize;
    let angle_step = cfg.spiral_angle_step.clamp(1, 360) as usize;
    let angles: Vec<u32> = (180..360)
        .step_by(angle_step)
        .chain((0..180).step_by(angle_step))
        .collect();

    (1..=rings).flat_map(move |ring| {
        let radius = ring as f64 * step;
        angles
            .clone()
            .into_iter()
            .map(move |deg| {
                let rad = (deg as f64).to_radians();
                center.offset(radius * rad.cos(), radius * rad.sin())
            })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_with(points: &[(f64, f64)]) -> MindMap {
        let mut g = MindMap::default();
        for (i, (x, y)) in points.iter().enumerate() {
            g.add_node(format!("n{i}"), PointF::new(*x, *y));
        }
        g
    }

    #[test]
    fn test_is_free_respects_spacing() {
        let g = graph_with(&[(0.0, 0.0)]);
        let cfg = LayoutConfig::default();
        let idx = CollisionIndex::build(&g, &cfg);
        // 128 wide + 20 margin: a neighbour 148 to the right just touches.
        assert!(idx.is_free(&idx.node_rect_at(PointF::new(148.0, 0.0)), None));
        assert!(!idx.is_free(&idx.node_rect_at(PointF::new(140.0, 0.0)), None));
        assert!(idx.is_free(&idx.node_rect_at(PointF::new(0.0, 0.0)), Some(NodeId(0))));
    }

    #[test]
    fn test_is_free_sees_connectors_except_own() {
        let mut g = graph_with(&[(0.0, 0.0), (168.0, 300.0)]);
        let e = g.connect(NodeId(0), NodeId(1)).unwrap();
        let cfg = LayoutConfig::default();
        let idx = CollisionIndex::build(&g, &cfg);
        let bus = g.edge(e).unwrap().connector.bus_x();
        let on_bus = idx.node_rect_at(PointF::new(bus + 30.0, 150.0));
        assert!(!idx.is_free(&on_bus, None));
        assert!(idx.is_free(&on_bus, Some(NodeId(1))));
    }

    #[test]
    fn test_find_free_prefers_below() {
        let g = graph_with(&[(0.0, 0.0)]);
        let cfg = LayoutConfig::default();
        let idx = CollisionIndex::build(&g, &cfg);
        let p = idx.find_free_position(PointF::new(0.0, 0.0), None, &cfg);
        assert_eq!(p, PointF::new(0.0, 100.0));
        assert!(idx.is_free(&idx.node_rect_at(p), None));
    }

    #[test]
    fn test_find_free_falls_back_to_offset() {
        let cfg = LayoutConfig { spiral_max_radius: 0.0, ..LayoutConfig::default() };
        // A dense 9x9 block around the origin leaves no candidate free.
        let mut pts = Vec::new();
        for i in -4..=4 {
            for j in -4..=4 {
                pts.push((i as f64 * 100.0, j as f64 * 60.0));
            }
        }
        let g = graph_with(&pts);
        let idx = CollisionIndex::build(&g, &cfg);
        let p = idx.find_free_position(PointF::new(0.0, 0.0), None, &cfg);
        assert_eq!(p, PointF::new(300.0, 300.0));
    }

    #[test]
    fn test_large_graph_only_checks_neighbourhood() {
        let cfg = LayoutConfig { large_graph_threshold: 2, ..LayoutConfig::default() };
        let g = graph_with(&[(0.0, 0.0), (1000.0, 0.0), (2000.0, 0.0)]);
        let idx = CollisionIndex::build(&g, &cfg);
        assert!(idx.is_large());
        assert!(!idx.is_free(&idx.node_rect_at(PointF::new(50.0, 10.0)), None));
        assert!(idx.is_free(&idx.node_rect_at(PointF::new(500.0, 0.0)), None));
    }

    #[test]
    fn test_spiral_sample_order() {
        let cfg = LayoutConfig::default();
        let pts: Vec<PointF> = spiral(PointF::new(0.0, 0.0), &cfg).take(13).collect();
        assert_eq!(pts.len(), 13);
        // First sample is at 180 degrees on the first ring.
        assert!((pts[0].x + 50.0).abs() < 1e-9);
        assert!(pts[0].y.abs() < 1e-9);
        // Ring 2 starts after 12 samples.
        assert!((pts[12].x + 100.0).abs() < 1e-9);
    }
}
