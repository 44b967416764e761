// Placement of newly created nodes.
//
// place_child stacks children in a column right of their parent:
//
//   [parent] --+-- [child 0]
//              |
//              +-- [child 1]
//              |
//              +-- [child 2]   <- new child goes below the lowest sibling
//
// place_new_root drops a free-standing node in the column right of the
// center node, below every existing subtree.
//
// Both functions only read the graph. Side-effect moves (obstructions pushed
// down, a parent following its first child) are simulated on a scratch copy
// and returned in the plan so the caller can record them in one command.

use std::collections::HashSet;

use log::debug;
use serde::Serialize;

use crate::geometry::{PointF, RectF};
use crate::model::{MindMap, NodeId};
use super::collision::CollisionIndex;
use super::spacing::{merge_moves, push_down_until_no_collision, NodeMove};
use super::LayoutConfig;

/// Union of a node's rectangle with its descendants' rectangles.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct SubtreeBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub bottom: f64,
}

impl SubtreeBox {
    pub fn rect(&self) -> RectF {
        RectF { x: self.x, y: self.y, w: self.width, h: self.height }
    }
}

impl From<RectF> for SubtreeBox {
    fn from(r: RectF) -> Self {
        SubtreeBox { x: r.x, y: r.y, width: r.w, height: r.h, bottom: r.bottom() }
    }
}

/// Where a new node goes, plus the existing nodes that must move to make room.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacementPlan {
    pub position: PointF,
    pub displaced: Vec<NodeMove>,
}

pub fn subtree_bbox(graph: &MindMap, root: NodeId, include_descendants: bool) -> Option<SubtreeBox> {
    let mut rect = graph.node_rect(root)?;
    if include_descendants {
        for nid in graph.descendants(root) {
            if let Some(r) = graph.node_rect(nid) {
                rect = rect.union(&r);
            }
        }
    }
    Some(rect.into())
}

/// Plan a new child of `parent`. Returns `None` when `parent` is unknown.
pub fn place_child(graph: &MindMap, parent: NodeId, cfg: &LayoutConfig) -> Option<PlacementPlan> {
    let parent_node = graph.node(parent)?;
    let parent_rect = parent_node.rect();
    let size = graph.node_size();

    let x = parent_rect.right() + cfg.child_h_gap + size.w / 2.0;
    let siblings: Vec<RectF> = graph
        .children_of(parent)
        .into_iter()
        .filter_map(|c| graph.node(c))
        .filter(|c| c.position.x > parent_node.position.x)
        .map(|c| c.rect())
        .collect();
    let first_child = siblings.is_empty();
    let y = siblings
        .iter()
        .map(RectF::bottom)
        .reduce(f64::max)
        .map_or(parent_node.position.y, |bottom| bottom + cfg.child_v_gap + size.h / 2.0);

    let index = CollisionIndex::build(graph, cfg);
    let preferred = PointF::new(x, y);
    let position = if index.is_free(&index.node_rect_at(preferred), None) {
        preferred
    } else {
        debug!("placement: child slot ({x:.1}, {y:.1}) taken, searching");
        index.find_free_position(preferred, None, cfg)
    };

    let mut scratch = graph.clone();
    let mut displaced = Vec::new();
    let child_rect = RectF::from_center(position, size);
    merge_moves(&mut displaced, push_obstructions_below(&mut scratch, parent, &child_rect, cfg));

    if first_child && position.y != parent_node.position.y {
        merge_moves(&mut displaced, follow_first_child(&mut scratch, parent, &child_rect, cfg));
    }

    Some(PlacementPlan { position, displaced })
}

/// Move `parent` onto the row of its first child when the parent stays left
/// of the child and neither ends up crowded.
fn follow_first_child(graph: &mut MindMap, parent: NodeId, child: &RectF, cfg: &LayoutConfig) -> Option<NodeMove> {
    let from = graph.position(parent)?;
    let target = PointF::new(from.x, child.center().y);
    let index = CollisionIndex::build(graph, cfg);
    let target_rect = index.node_rect_at(target);
    if target_rect.right() + cfg.spacing > child.left() {
        return None;
    }

    // Stand-in for the child, which is not in the graph yet.
    let placeholder = graph.add_node("", child.center());
    let index = CollisionIndex::build(graph, cfg);
    if !index.is_free(&target_rect, Some(parent)) {
        let _ = graph.remove_node(placeholder);
        return None;
    }

    graph.set_position(parent, target).ok()?;
    let still_free = CollisionIndex::build(graph, cfg).is_free(child, Some(placeholder));
    let _ = graph.remove_node(placeholder);
    if !still_free {
        let _ = graph.set_position(parent, from);
        return None;
    }
    debug!("placement: parent {:?} follows its first child to y={:.1}", parent, target.y);
    Some(NodeMove { id: parent, from, to: target })
}

/// Push down everything at or below the first subtree (outside `parent`'s
/// lineage) that the new child's spaced rectangle cuts into.
fn push_obstructions_below(graph: &mut MindMap, parent: NodeId, child: &RectF, cfg: &LayoutConfig) -> Vec<NodeMove> {
    let spaced = child.expanded(cfg.spacing);
    let mut lineage: HashSet<NodeId> = graph.subtree(parent).into_iter().collect();
    lineage.extend(graph.ancestors(parent));

    let obstruction_top = graph
        .node_ids()
        .into_iter()
        .filter(|nid| !lineage.contains(nid))
        .filter_map(|nid| subtree_bbox(graph, nid, true))
        .filter(|bbox| bbox.y >= child.top() && spaced.overlaps(&bbox.rect()))
        .map(|bbox| bbox.y)
        .reduce(f64::min);

    let Some(top) = obstruction_top else { return Vec::new() };
    let dy = spaced.bottom() - top;
    if dy <= 0.0 {
        return Vec::new();
    }
    debug!("placement: pushing nodes below y={top:.1} down by {dy:.1}");

    // A parent on the child's row stays; anywhere else it moves with the rest.
    let parent_on_row = graph
        .node_rect(parent)
        .is_some_and(|r| r.top() < child.bottom() && child.top() < r.bottom());
    let movers: Vec<NodeId> = graph
        .nodes()
        .filter(|n| !(n.id == parent && parent_on_row) && n.rect().top() >= top)
        .map(|n| n.id)
        .collect();
    let mut moves = Vec::with_capacity(movers.len());
    for nid in &movers {
        let Some(from) = graph.position(*nid) else { continue };
        let to = from.offset(0.0, dy);
        if graph.set_position_raw(*nid, to).is_ok() {
            moves.push(NodeMove { id: *nid, from, to });
        }
    }
    for nid in &movers {
        graph.refresh_edges_of(*nid);
    }
    moves
}

/// Position for a node added without a parent. `fallback` is used on an
/// empty map (typically the viewport center).
///
/// Best effort: the push-down only stops the new node from overlapping other
/// nodes. It may still sit inside another node's spacing margin or on top of
/// a connector.
pub fn place_new_root(graph: &MindMap, cfg: &LayoutConfig, fallback: PointF) -> PointF {
    let Some(center) = graph.center_node() else {
        return cfg.snap_to_grid(fallback);
    };
    let Some(center_pos) = graph.position(center) else {
        return cfg.snap_to_grid(fallback);
    };

    let mut parent_level = vec![center];
    parent_level.extend(graph.children_of(center));
    let max_bottom = parent_level
        .iter()
        .filter_map(|nid| subtree_bbox(graph, *nid, true))
        .map(|b| b.bottom)
        .fold(center_pos.y, f64::max);

    let size = graph.node_size();
    let start = RectF {
        x: center_pos.x + cfg.root_column_offset - size.w / 2.0,
        y: max_bottom + cfg.root_v_gap,
        w: size.w,
        h: size.h,
    };
    let index = CollisionIndex::build(graph, cfg);
    let rect = push_down_until_no_collision(&index, start, None, cfg);
    cfg.snap_to_grid(rect.center())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root_with_children(n: usize) -> (MindMap, NodeId, Vec<NodeId>) {
        let cfg = LayoutConfig::default();
        let mut g = MindMap::default();
        let r = g.add_node("root", PointF::new(0.0, 0.0));
        let mut kids = Vec::new();
        for i in 0..n {
            let plan = place_child(&g, r, &cfg).unwrap();
            let c = g.add_node(format!("c{i}"), plan.position);
            g.connect(r, c).unwrap();
            kids.push(c);
        }
        (g, r, kids)
    }

    #[test]
    fn test_children_stack_in_one_column() {
        let (g, _, kids) = root_with_children(3);
        let ys: Vec<f64> = kids.iter().map(|k| g.position(*k).unwrap().y).collect();
        for k in &kids {
            assert_eq!(g.position(*k).unwrap().x, 168.0);
        }
        assert_eq!(ys, vec![0.0, 92.0, 184.0]);
    }

    #[test]
    fn test_first_child_on_parent_row_has_no_side_effects() {
        let cfg = LayoutConfig::default();
        let mut g = MindMap::default();
        let r = g.add_node("root", PointF::new(0.0, 0.0));
        let plan = place_child(&g, r, &cfg).unwrap();
        assert_eq!(plan.position, PointF::new(168.0, 0.0));
        assert!(plan.displaced.is_empty());
        assert!(place_child(&g, NodeId(42), &cfg).is_none());
    }

    #[test]
    fn test_obstruction_below_is_pushed_down() {
        let cfg = LayoutConfig::default();
        let (mut g, r, kids) = root_with_children(1);
        // An unrelated subtree whose bounding box reaches up into the slot of
        // the second child, although none of its nodes or connectors do.
        let u = g.add_node("u", PointF::new(300.0, 300.0));
        let v = g.add_node("v", PointF::new(500.0, 130.0));
        g.connect(u, v).unwrap();

        let plan = place_child(&g, r, &cfg).unwrap();
        assert_eq!(plan.position, PointF::new(168.0, 92.0));

        // Spaced bottom 148 minus obstruction top 94.
        let pushed: Vec<NodeId> = plan.displaced.iter().map(|m| m.id).collect();
        assert_eq!(pushed, vec![u, v]);
        for m in &plan.displaced {
            assert_eq!(m.to.y - m.from.y, 54.0);
        }
        assert!(!pushed.contains(&r));
        assert!(!pushed.contains(&kids[0]));
    }

    #[test]
    fn test_parent_follows_first_child() {
        let cfg = LayoutConfig::default();
        let mut g = MindMap::default();
        let r = g.add_node("root", PointF::new(0.0, 0.0));
        // Occupies the first-child slot so the child is pushed to another row.
        g.add_node("blocker", PointF::new(168.0, 0.0));
        let plan = place_child(&g, r, &cfg).unwrap();
        assert_ne!(plan.position.y, 0.0);
        let follow = plan.displaced.iter().find(|m| m.id == r).unwrap();
        assert_eq!(follow.to, PointF::new(0.0, plan.position.y));
    }

    #[test]
    fn test_parent_stays_when_child_lands_beside_it() {
        let cfg = LayoutConfig::default();
        let mut g = MindMap::default();
        let r = g.add_node("root", PointF::new(0.0, 0.0));
        // Two long vertical buses (x = 240 and x = 400) close the child
        // column, so the spiral ends up above and left of the usual slot.
        let s1 = g.add_node("s1", PointF::new(156.0, -2000.0));
        let t1 = g.add_node("t1", PointF::new(600.0, 2000.0));
        let s2 = g.add_node("s2", PointF::new(316.0, -2000.0));
        let t2 = g.add_node("t2", PointF::new(800.0, 2000.0));
        g.connect(s1, t1).unwrap();
        g.connect(s2, t2).unwrap();

        let plan = place_child(&g, r, &cfg).unwrap();
        assert!((plan.position.x - 93.0).abs() < 1e-9);
        assert!(plan.position.y < -92.0);
        assert!(plan.displaced.is_empty());

        let c = g.add_node("c", plan.position);
        g.connect(r, c).unwrap();
        let child = g.node_rect(c).unwrap();
        assert!(!g.node_rect(r).unwrap().overlaps(&child));
        let index = CollisionIndex::build(&g, &cfg);
        assert!(index.is_free(&child, Some(c)));
    }

    #[test]
    fn test_new_root_goes_below_all_subtrees() {
        let cfg = LayoutConfig::default();
        let (g, _, _) = root_with_children(3);
        let p = place_new_root(&g, &cfg, PointF::new(999.0, 999.0));
        assert_eq!(p.x, 200.0);
        // Lowest child bottom is 184 + 36 = 220, plus the 60 gap, plus half height.
        assert_eq!(p.y, 220.0 + 60.0 + 36.0);
    }

    #[test]
    fn test_new_root_on_empty_map_uses_fallback() {
        let cfg = LayoutConfig { grid_snap: true, ..LayoutConfig::default() };
        let g = MindMap::default();
        assert_eq!(place_new_root(&g, &cfg, PointF::new(401.0, 299.0)), PointF::new(400.0, 300.0));
    }

    #[test]
    fn test_subtree_bbox() {
        let (g, r, _) = root_with_children(2);
        let b = subtree_bbox(&g, r, true).unwrap();
        assert_eq!(b.x, -64.0);
        assert_eq!(b.y, -36.0);
        assert_eq!(b.bottom, 128.0);
        assert_eq!(b.width, 168.0 + 64.0 + 64.0);
        let only = subtree_bbox(&g, r, false).unwrap();
        assert_eq!(only.bottom, 36.0);
    }
}
