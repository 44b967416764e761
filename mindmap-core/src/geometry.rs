// Axis-aligned geometry in world coordinates.
//
// Rectangles are stored top-left + size, like the layout rectangles the
// placement code has always used. Overlap tests are strict: rectangles that
// only touch along an edge do not overlap.

use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PointF {
    pub x: f64,
    pub y: f64,
}

impl PointF {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(&self, dx: f64, dy: f64) -> PointF {
        PointF { x: self.x + dx, y: self.y + dy }
    }

    pub fn distance(&self, other: &PointF) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizeF {
    pub w: f64,
    pub h: f64,
}

#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RectF {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl RectF {
    pub fn from_center(center: PointF, size: SizeF) -> RectF {
        RectF {
            x: center.x - size.w / 2.0,
            y: center.y - size.h / 2.0,
            w: size.w,
            h: size.h,
        }
    }

    /// Bounding box of two points. Zero-width or zero-height results are valid
    /// and still take part in overlap tests.
    pub fn from_points(a: PointF, b: PointF) -> RectF {
        let x0 = a.x.min(b.x);
        let y0 = a.y.min(b.y);
        RectF { x: x0, y: y0, w: (a.x - b.x).abs(), h: (a.y - b.y).abs() }
    }

    pub fn left(&self) -> f64 { self.x }
    pub fn top(&self) -> f64 { self.y }
    pub fn right(&self) -> f64 { self.x + self.w }
    pub fn bottom(&self) -> f64 { self.y + self.h }

    pub fn center(&self) -> PointF {
        PointF { x: self.x + self.w / 2.0, y: self.y + self.h / 2.0 }
    }

    pub fn overlaps(&self, other: &RectF) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }

    /// Inclusive point test, used for hit testing.
    pub fn contains(&self, p: PointF) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    pub fn union(&self, other: &RectF) -> RectF {
        let x0 = self.x.min(other.x);
        let y0 = self.y.min(other.y);
        let x1 = self.right().max(other.right());
        let y1 = self.bottom().max(other.bottom());
        RectF { x: x0, y: y0, w: x1 - x0, h: y1 - y0 }
    }

    /// Grow by `margin` on every side.
    pub fn expanded(&self, margin: f64) -> RectF {
        RectF {
            x: self.x - margin,
            y: self.y - margin,
            w: self.w + 2.0 * margin,
            h: self.h + 2.0 * margin,
        }
    }

    pub fn translated(&self, dx: f64, dy: f64) -> RectF {
        RectF { x: self.x + dx, y: self.y + dy, ..*self }
    }

    /// Vertical distance from `self`'s bottom to `other`'s top (negative when they overlap).
    pub fn gap_below(&self, other: &RectF) -> f64 {
        other.top() - self.bottom()
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.w.is_finite() && self.h.is_finite() && self.x.is_finite() && self.y.is_finite())
            || self.w <= 0.0
            || self.h <= 0.0
    }
}

/// A straight line piece of a connector.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Segment {
    pub a: PointF,
    pub b: PointF,
}

impl Segment {
    pub const fn new(a: PointF, b: PointF) -> Self {
        Self { a, b }
    }

    pub fn bounds(&self) -> RectF {
        RectF::from_points(self.a, self.b)
    }

    pub fn translated(&self, dx: f64, dy: f64) -> Segment {
        Segment { a: self.a.offset(dx, dy), b: self.b.offset(dx, dy) }
    }

    /// Proper crossing: each segment has its endpoints strictly on opposite
    /// sides of the other. Touching ends and collinear overlap do not count.
    pub fn crosses(&self, other: &Segment) -> bool {
        fn side(p: PointF, q: PointF, r: PointF) -> f64 {
            (q.x - p.x) * (r.y - p.y) - (q.y - p.y) * (r.x - p.x)
        }
        side(self.a, self.b, other.a) * side(self.a, self.b, other.b) < 0.0
            && side(other.a, other.b, self.a) * side(other.a, other.b, self.b) < 0.0
    }
}
