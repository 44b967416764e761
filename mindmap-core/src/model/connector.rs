// Crank connector geometry.
//
// A connector is three segments: horizontal out of the source's right edge,
// vertical along the source's bus, horizontal into the target. The bus X is
// `source.right + bus_offset`, so every connector leaving one source shares
// the same vertical line.
//
// Two ways to update a connector:
// - route(): authoritative recomputation from the endpoint rectangles
// - preview(): rigid translation of a captured geometry, used while dragging

use serde::Serialize;

use crate::geometry::{PointF, RectF, Segment};
use crate::layout::LayoutConfig;

#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct ConnectorStyle {
    pub bus_offset: f64,
    pub min_tail: f64,
}

impl From<&LayoutConfig> for ConnectorStyle {
    fn from(cfg: &LayoutConfig) -> Self {
        Self { bus_offset: cfg.bus_offset, min_tail: cfg.min_tail }
    }
}

impl Default for ConnectorStyle {
    fn default() -> Self {
        ConnectorStyle::from(&LayoutConfig::default())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize)]
pub struct CrankConnector {
    segments: [Segment; 3],
}

impl CrankConnector {
    pub fn route(source: &RectF, target: &RectF, style: &ConnectorStyle) -> Self {
        let mut c = CrankConnector::default();
        c.recompute(source, target, style);
        c
    }

    pub fn recompute(&mut self, source: &RectF, target: &RectF, style: &ConnectorStyle) {
        let start = PointF::new(source.right(), source.center().y);
        let bus_x = source.right() + style.bus_offset;
        let end_y = target.center().y;

        // The last leg always points right, away from the bus.
        let mut end_x = target.left();
        if end_x < bus_x {
            end_x = target.right();
        }
        if end_x <= bus_x {
            end_x = bus_x + style.min_tail;
        }

        let bus_top = PointF::new(bus_x, start.y);
        let bus_bottom = PointF::new(bus_x, end_y);
        self.segments = [
            Segment::new(start, bus_top),
            Segment::new(bus_top, bus_bottom),
            Segment::new(bus_bottom, PointF::new(end_x, end_y)),
        ];
    }

    /// Move a previously captured geometry by (dx, dy) without rerouting.
    pub fn preview(&mut self, captured: &[Segment; 3], dx: f64, dy: f64) {
        for (seg, base) in self.segments.iter_mut().zip(captured) {
            *seg = base.translated(dx, dy);
        }
    }

    pub fn segments(&self) -> &[Segment; 3] {
        &self.segments
    }

    pub fn set_segments(&mut self, segments: [Segment; 3]) {
        self.segments = segments;
    }

    pub fn endpoints(&self) -> (PointF, PointF) {
        (self.segments[0].a, self.segments[2].b)
    }

    pub fn bus_x(&self) -> f64 {
        self.segments[1].a.x
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x: f64, y: f64) -> RectF {
        RectF { x, y, w: 128.0, h: 72.0 }
    }

    #[test]
    fn test_route_right_of_source() {
        let c = CrankConnector::route(&rect(0.0, 0.0), &rect(168.0, 92.0), &ConnectorStyle::default());
        let [h1, v, h2] = *c.segments();
        assert_eq!(h1.a, PointF::new(128.0, 36.0));
        assert_eq!(c.bus_x(), 148.0);
        assert_eq!(v.b, PointF::new(148.0, 128.0));
        assert_eq!(h2.b, PointF::new(168.0, 128.0));
    }

    #[test]
    fn test_last_leg_never_points_left() {
        let style = ConnectorStyle::default();
        // Target overlaps the bus: fall back to its right edge.
        let c = CrankConnector::route(&rect(0.0, 0.0), &rect(100.0, 200.0), &style);
        assert_eq!(c.endpoints().1.x, 228.0);
        // Target entirely left of the bus: minimum tail.
        let c = CrankConnector::route(&rect(0.0, 0.0), &rect(-300.0, 200.0), &style);
        assert_eq!(c.endpoints().1.x, 148.0 + 30.0);
    }

    #[test]
    fn test_preview_is_rigid() {
        let style = ConnectorStyle::default();
        let base = CrankConnector::route(&rect(0.0, 0.0), &rect(168.0, 92.0), &style);
        let mut moved = base;
        moved.preview(base.segments(), 50.0, -10.0);
        let rerouted = CrankConnector::route(&rect(50.0, -10.0), &rect(218.0, 82.0), &style);
        assert_eq!(moved, rerouted);
    }
}
