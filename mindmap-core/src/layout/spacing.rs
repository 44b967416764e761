// Downward-only corrections.
//
// Everything here moves nodes down (positive Y) and never up, so repeated
// passes can only grow vertical gaps. Moved nodes are reported as NodeMove
// records; callers fold them into commands.

use log::{debug, warn};
use serde::Serialize;

use crate::geometry::{PointF, RectF, SizeF};
use crate::model::{MindMap, NodeId};
use super::collision::CollisionIndex;
use super::placement::subtree_bbox;
use super::LayoutConfig;

/// Gaps this close to the minimum count as satisfied.
const GAP_EPSILON: f64 = 1e-6;

#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct NodeMove {
    pub id: NodeId,
    pub from: PointF,
    pub to: PointF,
}

/// Fold `more` into `acc`, keeping the first `from` and the last `to` per node.
pub fn merge_moves(acc: &mut Vec<NodeMove>, more: impl IntoIterator<Item = NodeMove>) {
    for m in more {
        match acc.iter_mut().find(|a| a.id == m.id) {
            Some(existing) => existing.to = m.to,
            None => acc.push(m),
        }
    }
    acc.retain(|m| m.from != m.to);
}

/// Step `bbox` down by `cfg.push_step` until it hits no node.
///
/// The loop is capped at `push_down_factor * (nodes + 1)` steps. Past the cap
/// the free-position search takes over from the original spot.
pub fn push_down_until_no_collision(
    index: &CollisionIndex,
    bbox: RectF,
    exclude: Option<NodeId>,
    cfg: &LayoutConfig,
) -> RectF {
    let step = if cfg.push_step > 0.0 { cfg.push_step } else { cfg.child_v_gap.max(1.0) };
    let cap = cfg.push_down_factor.max(1) * (index.len() + 1);

    let mut rect = bbox;
    for _ in 0..cap {
        if !index.check_collision(&rect, exclude) {
            return rect;
        }
        rect = rect.translated(0.0, step);
    }
    if !index.check_collision(&rect, exclude) {
        return rect;
    }

    warn!("spacing: push-down gave up after {cap} steps, searching for a free slot");
    let center = index.find_free_position(bbox.center(), exclude, cfg);
    RectF::from_center(center, SizeF { w: bbox.w, h: bbox.h })
}

/// Shift `root` and its descendants by `dy` (Y only) and reroute their connectors.
pub fn translate_subtree_vertical(graph: &mut MindMap, root: NodeId, dy: f64) -> Vec<NodeMove> {
    if dy == 0.0 {
        return Vec::new();
    }
    let members = graph.subtree(root);
    let mut moves = Vec::with_capacity(members.len());
    for nid in &members {
        let Some(from) = graph.position(*nid) else { continue };
        let to = from.offset(0.0, dy);
        if graph.set_position_raw(*nid, to).is_ok() {
            moves.push(NodeMove { id: *nid, from, to });
        }
    }
    for nid in &members {
        graph.refresh_edges_of(*nid);
    }
    moves
}

/// Walk `ordered_roots` top to bottom and push each subtree down until it
/// clears the lowest bottom seen so far by at least `min_gap`.
pub fn normalize_subtree_spacing(graph: &mut MindMap, ordered_roots: &[NodeId], min_gap: f64) -> Vec<NodeMove> {
    let mut moves = Vec::new();
    let mut lowest: Option<f64> = None;

    for root in ordered_roots {
        let Some(bbox) = subtree_bbox(graph, *root, true) else { continue };
        let mut bottom = bbox.bottom;
        if let Some(prev) = lowest {
            let gap = bbox.y - prev;
            if gap < min_gap - GAP_EPSILON {
                let dy = min_gap - gap;
                debug!("spacing: pushing subtree {:?} down by {dy:.1}", root);
                merge_moves(&mut moves, translate_subtree_vertical(graph, *root, dy));
                bottom += dy;
            }
        }
        lowest = Some(lowest.map_or(bottom, |l| l.max(bottom)));
    }
    moves
}
