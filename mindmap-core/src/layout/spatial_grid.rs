// Spatial hash grid for neighbourhood queries.
//
// Instead of scanning every node, large graphs bucket node rectangles into
// square cells and only look at the cells a query touches.

use std::collections::{HashMap, HashSet};

use crate::geometry::RectF;
use crate::model::NodeId;

/// A spatial hash grid over node rectangles.
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    /// Size of each cell in the grid.
    cell_size: f64,
    /// Map from cell coordinates to the nodes overlapping that cell.
    cells: HashMap<(i64, i64), Vec<(NodeId, RectF)>>,
}

impl SpatialGrid {
    /// Create a new spatial grid with the given cell size.
    /// Cell size should be roughly the query radius.
    pub fn new(cell_size: f64) -> Self {
        Self {
            cell_size: if cell_size > 0.0 { cell_size } else { 1.0 },
            cells: HashMap::new(),
        }
    }

    fn cell_of(&self, v: f64) -> i64 {
        (v / self.cell_size).floor() as i64
    }

    /// Compute which cells a rectangle overlaps.
    fn cell_range(&self, rect: &RectF) -> Vec<(i64, i64)> {
        let (min_x, max_x) = (self.cell_of(rect.left()), self.cell_of(rect.right()));
        let (min_y, max_y) = (self.cell_of(rect.top()), self.cell_of(rect.bottom()));

        let mut cells = Vec::new();
        for cx in min_x..=max_x {
            for cy in min_y..=max_y {
                cells.push((cx, cy));
            }
        }
        cells
    }

    pub fn insert(&mut self, id: NodeId, rect: RectF) {
        for cell in self.cell_range(&rect) {
            self.cells.entry(cell).or_default().push((id, rect));
        }
    }

    /// Nodes whose rectangles share a cell with `rect`.
    /// Note: this may include false positives; callers do the exact check.
    pub fn query(&self, rect: &RectF) -> Vec<(NodeId, RectF)> {
        let mut result = Vec::new();
        let mut seen = HashSet::new();

        for cell in self.cell_range(rect) {
            if let Some(entries) = self.cells.get(&cell) {
                for (id, r) in entries {
                    if seen.insert(*id) {
                        result.push((*id, *r));
                    }
                }
            }
        }
        result
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
