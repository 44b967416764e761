//! Subtree drag gesture.
//!
//! Idle --press--> Dragging --move--> Dragging --release--> Idle
//!
//! While dragging, the pressed node and its descendants move as one rigid
//! block: every captured position and every connector inside the block is
//! translated by the pointer delta. Connectors that leave the block are
//! rerouted from live positions. On release the gesture ends in one of:
//! a click (nothing happened), a lane reorder among siblings, a committed
//! subtree move, or a rollback when the block lands on another node.

use std::collections::{BTreeMap, HashSet};

use log::{debug, info};

use crate::commands::Command;
use crate::geometry::{PointF, Segment};
use crate::layout::spacing::{merge_moves, normalize_subtree_spacing, NodeMove};
use crate::layout::LayoutConfig;
use crate::model::{EdgeId, MindMap, NodeId};

#[derive(Debug, Clone)]
struct DragSession {
    root: NodeId,
    press: PointF,
    origin: BTreeMap<NodeId, PointF>,
    connectors: BTreeMap<EdgeId, [Segment; 3]>,
    /// Edges with both ends inside the dragged block.
    internal: HashSet<EdgeId>,
}

/// How a drag gesture ended.
#[derive(Debug, Clone, PartialEq)]
pub enum DragOutcome {
    /// Pointer travel stayed under the click threshold; nothing changed.
    Click,
    /// The block landed on another node and was put back.
    RolledBack,
    /// The gesture produced a command. The graph already reflects it.
    Committed(Command),
}

#[derive(Debug, Clone, Default)]
pub struct DragController {
    session: Option<DragSession>,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        self.session.is_some()
    }

    /// Start dragging `node` and its subtree. Returns false (and stays idle)
    /// when Shift is held or the node is unknown.
    pub fn press(&mut self, graph: &MindMap, node: NodeId, pointer: PointF, shift: bool) -> bool {
        if shift || !graph.contains_node(node) {
            return false;
        }

        let members = graph.subtree(node);
        let member_set: HashSet<NodeId> = members.iter().copied().collect();
        let origin: BTreeMap<NodeId, PointF> = members
            .iter()
            .filter_map(|nid| graph.position(*nid).map(|p| (*nid, p)))
            .collect();

        let mut connectors = BTreeMap::new();
        let mut internal = HashSet::new();
        for edge in graph.edges().filter(|e| member_set.contains(&e.source) || member_set.contains(&e.target)) {
            connectors.insert(edge.id, *edge.connector.segments());
            if member_set.contains(&edge.source) && member_set.contains(&edge.target) {
                internal.insert(edge.id);
            }
        }

        debug!("drag: press on {:?}, {} nodes in block", node, origin.len());
        self.session = Some(DragSession { root: node, press: pointer, origin, connectors, internal });
        true
    }

    pub fn drag_move(&mut self, graph: &mut MindMap, pointer: PointF) {
        let Some(session) = &self.session else { return };
        let (dx, dy) = (pointer.x - session.press.x, pointer.y - session.press.y);
        translate_block(graph, session, dx, dy);
    }

    pub fn release(&mut self, graph: &mut MindMap, pointer: PointF, cfg: &LayoutConfig) -> DragOutcome {
        let Some(session) = self.session.take() else { return DragOutcome::Click };
        let (dx, dy) = (pointer.x - session.press.x, pointer.y - session.press.y);

        if dx.hypot(dy) < cfg.click_threshold {
            restore(graph, &session);
            return DragOutcome::Click;
        }
        translate_block(graph, &session, dx, dy);

        if let Some(outcome) = try_lane_insert(graph, &session, cfg) {
            return outcome;
        }

        if block_collides(graph, &session, cfg.drag_margin) {
            info!("drag: {:?} dropped onto another node, rolling back", session.root);
            restore(graph, &session);
            return DragOutcome::RolledBack;
        }

        let (mut dx, mut dy) = (dx, dy);
        if cfg.grid_snap {
            if let Some(origin) = session.origin.get(&session.root) {
                let snapped = cfg.snap_to_grid(origin.offset(dx, dy));
                dx = snapped.x - origin.x;
                dy = snapped.y - origin.y;
                translate_block(graph, &session, dx, dy);
            }
        }
        for nid in session.origin.keys() {
            graph.refresh_edges_of(*nid);
        }

        let moves = session
            .origin
            .iter()
            .map(|(id, from)| NodeMove { id: *id, from: *from, to: from.offset(dx, dy) })
            .collect();
        DragOutcome::Committed(Command::SubtreeMove {
            root: session.root,
            moves,
            connectors: session.connectors,
        })
    }

    /// Abort the gesture and put everything back.
    pub fn cancel(&mut self, graph: &mut MindMap) {
        if let Some(session) = self.session.take() {
            restore(graph, &session);
        }
    }
}

fn translate_block(graph: &mut MindMap, session: &DragSession, dx: f64, dy: f64) {
    for (nid, origin) in &session.origin {
        let _ = graph.set_position_raw(*nid, origin.offset(dx, dy));
    }
    for (eid, captured) in &session.connectors {
        if session.internal.contains(eid) {
            let _ = graph.preview_connector(*eid, captured, dx, dy);
        } else {
            graph.refresh_edge(*eid);
        }
    }
}

fn restore(graph: &mut MindMap, session: &DragSession) {
    for (nid, origin) in &session.origin {
        let _ = graph.set_position_raw(*nid, *origin);
    }
    for (eid, captured) in &session.connectors {
        let _ = graph.set_connector(*eid, *captured);
    }
}

/// Any block node, grown by `margin`, overlapping a node outside the block.
fn block_collides(graph: &MindMap, session: &DragSession, margin: f64) -> bool {
    let block: Vec<_> = session
        .origin
        .keys()
        .filter_map(|nid| graph.node_rect(*nid))
        .map(|r| r.expanded(margin))
        .collect();
    graph
        .nodes()
        .filter(|n| !session.origin.contains_key(&n.id))
        .any(|n| {
            let r = n.rect();
            block.iter().any(|b| b.overlaps(&r))
        })
}

/// Siblings of `root` whose center X is within the lane tolerance of `drop_x`.
pub fn lane_members(graph: &MindMap, root: NodeId, drop_x: f64, tolerance: f64) -> Vec<NodeId> {
    graph
        .siblings_of(root)
        .into_iter()
        .filter(|s| graph.position(*s).is_some_and(|p| (p.x - drop_x).abs() <= tolerance))
        .collect()
}

/// Index at which a node dropped at `drop_y` joins a lane: the number of
/// lane members above it.
pub fn insertion_index(graph: &MindMap, lane: &[NodeId], drop_y: f64) -> usize {
    lane.iter()
        .filter(|nid| graph.position(**nid).is_some_and(|p| p.y < drop_y))
        .count()
}

fn try_lane_insert(graph: &mut MindMap, session: &DragSession, cfg: &LayoutConfig) -> Option<DragOutcome> {
    let drop = graph.position(session.root)?;
    let mut lane = lane_members(graph, session.root, drop.x, cfg.lane_tolerance);
    if lane.is_empty() {
        return None;
    }
    lane.sort_by(|a, b| {
        let (pa, pb) = (graph.position(*a), graph.position(*b));
        let ya = pa.map_or(0.0, |p| p.y);
        let yb = pb.map_or(0.0, |p| p.y);
        ya.total_cmp(&yb).then(a.cmp(b))
    });
    let index = insertion_index(graph, &lane, drop.y);
    let lane_x = graph.position(lane[0])?.x;

    let root_origin = session.origin.get(&session.root)?;
    let (dx, dy) = (lane_x - root_origin.x, drop.y - root_origin.y);
    translate_block(graph, session, dx, dy);

    let mut moves: Vec<NodeMove> = session
        .origin
        .iter()
        .map(|(id, from)| NodeMove { id: *id, from: *from, to: from.offset(dx, dy) })
        .collect();

    let mut ordered = lane;
    ordered.insert(index, session.root);
    merge_moves(&mut moves, normalize_subtree_spacing(graph, &ordered, cfg.lane_gap));
    for nid in session.origin.keys() {
        graph.refresh_edges_of(*nid);
    }

    info!("drag: {:?} reordered into lane at index {index}", session.root);
    Some(DragOutcome::Committed(Command::ReorderNode { id: session.root, moves }))
}
