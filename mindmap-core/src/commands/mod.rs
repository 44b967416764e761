//! Reversible edits.
//!
//! Every command carries the state it needs to replay itself in both
//! directions: positions before and after, removed nodes and edges, old and
//! new text. Nothing is re-derived from the live graph on undo, so apply/revert
//! pairs can be repeated any number of times.
//!
//! `apply` and `revert` check their preconditions before touching the graph.
//! A failed precondition leaves the graph untouched and returns the error.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::error::{EditError, Result};
use crate::geometry::{PointF, Segment};
use crate::layout::spacing::NodeMove;
use crate::model::{Edge, EdgeId, MindMap, Node, NodeId};

mod history;

pub use history::History;

/// An edge captured at deletion time, with its index in each endpoint's
/// incident list so undo puts it back in the same order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeRecord {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    pub source_slot: usize,
    pub target_slot: usize,
}

impl EdgeRecord {
    fn capture(graph: &MindMap, e: &Edge) -> Self {
        let slot = |nid: NodeId| {
            graph
                .node(nid)
                .and_then(|n| n.edges().iter().position(|(eid, _)| *eid == e.id))
                .unwrap_or(usize::MAX)
        };
        EdgeRecord {
            id: e.id,
            source: e.source,
            target: e.target,
            source_slot: slot(e.source),
            target_slot: slot(e.target),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Command {
    /// New node, optionally attached to a parent, plus nodes moved to make room.
    AddNode {
        node: Node,
        parent: Option<(EdgeId, NodeId)>,
        displaced: Vec<NodeMove>,
    },
    ConnectNodes {
        edge: EdgeId,
        source: NodeId,
        target: NodeId,
    },
    DeleteNode {
        node: Node,
        edges: Vec<EdgeRecord>,
    },
    MoveNode {
        id: NodeId,
        from: PointF,
        to: PointF,
    },
    MoveMultipleNodes {
        moves: Vec<NodeMove>,
    },
    /// A node moved together with the same-generation nodes right of it.
    MoveNodeWithRelated {
        id: NodeId,
        moves: Vec<NodeMove>,
    },
    RenameNode {
        id: NodeId,
        old: String,
        new: String,
    },
    /// A dragged subtree. `connectors` is the connector geometry before the drag.
    SubtreeMove {
        root: NodeId,
        moves: Vec<NodeMove>,
        connectors: BTreeMap<EdgeId, [Segment; 3]>,
    },
    /// Sibling reorder in a lane: every child that moved, with its subtree.
    ReorderNode {
        id: NodeId,
        moves: Vec<NodeMove>,
    },
}

impl Command {
    /// Capture a node and its incident edges for deletion.
    pub fn delete_node(graph: &MindMap, id: NodeId) -> Result<Command> {
        let node = graph.node(id).ok_or(EditError::NodeNotFound(id))?.clone();
        let edges = node
            .edges()
            .iter()
            .filter_map(|(eid, _)| graph.edge(*eid))
            .map(|e| EdgeRecord::capture(graph, e))
            .collect();
        Ok(Command::DeleteNode { node, edges })
    }

    /// Move `id` to `to`; every node of the same generation lying strictly
    /// right of it (before the move) follows by the same vertical delta.
    pub fn move_with_related(graph: &MindMap, id: NodeId, to: PointF) -> Result<Command> {
        let from = graph.position(id).ok_or(EditError::NodeNotFound(id))?;
        let dy = to.y - from.y;
        let mut moves = vec![NodeMove { id, from, to }];
        for rid in graph.related_same_generation(id) {
            if let Some(p) = graph.position(rid) {
                moves.push(NodeMove { id: rid, from: p, to: p.offset(0.0, dy) });
            }
        }
        Ok(Command::MoveNodeWithRelated { id, moves })
    }

    /// Short description, used for logging and the host's undo menu.
    pub fn label(&self) -> &'static str {
        match self {
            Command::AddNode { .. } => "Add node",
            Command::ConnectNodes { .. } => "Connect nodes",
            Command::DeleteNode { .. } => "Delete node",
            Command::MoveNode { .. } => "Move node",
            Command::MoveMultipleNodes { .. } => "Move nodes",
            Command::MoveNodeWithRelated { .. } => "Move node with related",
            Command::RenameNode { .. } => "Rename node",
            Command::SubtreeMove { .. } => "Move subtree",
            Command::ReorderNode { .. } => "Reorder node",
        }
    }

    pub fn apply(&self, graph: &mut MindMap) -> Result<()> {
        match self {
            Command::AddNode { node, parent, displaced } => {
                if graph.contains_node(node.id) {
                    return Err(EditError::NodeExists(node.id));
                }
                if let Some((edge, pid)) = parent {
                    require_node(graph, *pid)?;
                    if graph.edge(*edge).is_some() {
                        return Err(EditError::EdgeExists(*edge));
                    }
                }
                require_moves(graph, displaced)?;

                graph.insert_node(node.clone())?;
                if let Some((edge, pid)) = parent {
                    graph.insert_edge(*edge, *pid, node.id)?;
                }
                set_positions(graph, displaced.iter().map(|m| (m.id, m.to)));
                graph.refresh_edges_of(node.id);
                Ok(())
            }
            Command::ConnectNodes { edge, source, target } => {
                if graph.edge(*edge).is_some() {
                    return Err(EditError::EdgeExists(*edge));
                }
                graph.insert_edge(*edge, *source, *target)
            }
            Command::DeleteNode { node, .. } => {
                graph.remove_node(node.id)?;
                Ok(())
            }
            Command::MoveNode { id, to, .. } => graph.set_position(*id, *to),
            Command::MoveMultipleNodes { moves }
            | Command::MoveNodeWithRelated { moves, .. }
            | Command::ReorderNode { moves, .. }
            | Command::SubtreeMove { moves, .. } => {
                require_moves(graph, moves)?;
                set_positions(graph, moves.iter().map(|m| (m.id, m.to)));
                Ok(())
            }
            Command::RenameNode { id, new, .. } => graph.set_text(*id, new.clone()),
        }
    }

    pub fn revert(&self, graph: &mut MindMap) -> Result<()> {
        match self {
            Command::AddNode { node, displaced, .. } => {
                require_node(graph, node.id)?;
                require_moves(graph, displaced)?;
                graph.remove_node(node.id)?;
                set_positions(graph, displaced.iter().map(|m| (m.id, m.from)));
                Ok(())
            }
            Command::ConnectNodes { edge, .. } => {
                graph.remove_edge(*edge)?;
                Ok(())
            }
            Command::DeleteNode { node, edges } => {
                if graph.contains_node(node.id) {
                    return Err(EditError::NodeExists(node.id));
                }
                for e in edges {
                    let partner = if e.source == node.id { e.target } else { e.source };
                    require_node(graph, partner)?;
                    if graph.edge(e.id).is_some() {
                        return Err(EditError::EdgeExists(e.id));
                    }
                }
                graph.insert_node(node.clone())?;
                for e in edges {
                    graph.insert_edge_at(e.id, e.source, e.target, e.source_slot, e.target_slot)?;
                }
                Ok(())
            }
            Command::MoveNode { id, from, .. } => graph.set_position(*id, *from),
            Command::MoveMultipleNodes { moves }
            | Command::MoveNodeWithRelated { moves, .. }
            | Command::ReorderNode { moves, .. } => {
                require_moves(graph, moves)?;
                set_positions(graph, moves.iter().map(|m| (m.id, m.from)));
                Ok(())
            }
            Command::SubtreeMove { moves, connectors, .. } => {
                require_moves(graph, moves)?;
                set_positions(graph, moves.iter().map(|m| (m.id, m.from)));
                for (eid, segments) in connectors {
                    if graph.edge(*eid).is_some() {
                        graph.set_connector(*eid, *segments)?;
                    }
                }
                Ok(())
            }
            Command::RenameNode { id, old, .. } => graph.set_text(*id, old.clone()),
        }
    }
}

fn require_node(graph: &MindMap, id: NodeId) -> Result<()> {
    if graph.contains_node(id) { Ok(()) } else { Err(EditError::NodeNotFound(id)) }
}

fn require_moves(graph: &MindMap, moves: &[NodeMove]) -> Result<()> {
    moves.iter().try_for_each(|m| require_node(graph, m.id))
}

/// Move every node first, then reroute each affected connector once.
fn set_positions(graph: &mut MindMap, targets: impl Iterator<Item = (NodeId, PointF)>) {
    let mut moved = HashSet::new();
    for (id, p) in targets {
        if graph.set_position_raw(id, p).is_ok() {
            moved.insert(id);
        }
    }
    for id in moved {
        graph.refresh_edges_of(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> (MindMap, NodeId, NodeId) {
        let mut g = MindMap::default();
        let a = g.add_node("a", PointF::new(0.0, 0.0));
        let b = g.add_node("b", PointF::new(168.0, 0.0));
        (g, a, b)
    }

    fn snapshot(g: &MindMap) -> (BTreeMap<NodeId, PointF>, Vec<(NodeId, String)>, BTreeMap<EdgeId, [Segment; 3]>) {
        let texts = g.nodes().map(|n| (n.id, n.text.clone())).collect();
        (g.positions(), texts, g.connector_geometry())
    }

    fn assert_round_trip(g: &mut MindMap, cmd: &Command) {
        let before = snapshot(g);
        cmd.apply(g).unwrap();
        let after = snapshot(g);
        for _ in 0..3 {
            cmd.revert(g).unwrap();
            assert_eq!(snapshot(g), before, "{} revert", cmd.label());
            cmd.apply(g).unwrap();
            assert_eq!(snapshot(g), after, "{} reapply", cmd.label());
        }
    }

    #[test]
    fn test_add_node_with_parent_round_trip() {
        let (mut g, a, b) = pair();
        let id = g.reserve_node_id();
        let edge = g.reserve_edge_id();
        let node = Node::new(id, "child", PointF::new(168.0, 92.0), g.node_size());
        let cmd = Command::AddNode {
            node,
            parent: Some((edge, a)),
            displaced: vec![NodeMove { id: b, from: PointF::new(168.0, 0.0), to: PointF::new(168.0, -50.0) }],
        };
        assert_round_trip(&mut g, &cmd);
        assert_eq!(g.children_of(a), vec![id]);
    }

    #[test]
    fn test_connect_round_trip() {
        let (mut g, a, b) = pair();
        let edge = g.reserve_edge_id();
        let cmd = Command::ConnectNodes { edge, source: a, target: b };
        assert_round_trip(&mut g, &cmd);
        assert!(matches!(cmd.apply(&mut g), Err(EditError::EdgeExists(_))));
    }

    #[test]
    fn test_delete_restores_same_ids_and_edges() {
        let (mut g, a, b) = pair();
        let c = g.add_node("c", PointF::new(168.0, 92.0));
        let ab = g.connect(a, b).unwrap();
        let ac = g.connect(a, c).unwrap();

        let cmd = Command::delete_node(&g, a).unwrap();
        cmd.apply(&mut g).unwrap();
        assert_eq!(g.edge_count(), 0);
        cmd.revert(&mut g).unwrap();

        assert_eq!(g.position(a), Some(PointF::new(0.0, 0.0)));
        assert_eq!(g.edge(ab).map(|e| (e.source, e.target)), Some((a, b)));
        assert_eq!(g.edge(ac).map(|e| (e.source, e.target)), Some((a, c)));
        assert_round_trip(&mut g, &cmd);
    }

    #[test]
    fn test_delete_undo_keeps_incident_order() {
        let (mut g, r, a) = pair();
        let b = g.add_node("b", PointF::new(168.0, 92.0));
        let c = g.add_node("c", PointF::new(168.0, 184.0));
        let p2 = g.add_node("p2", PointF::new(-200.0, 0.0));
        g.connect(r, a).unwrap();
        g.connect(r, b).unwrap();
        g.connect(r, c).unwrap();
        // b has two parents; r is the first one.
        g.connect(p2, b).unwrap();
        let before = g.children_of(r);

        let cmd = Command::delete_node(&g, a).unwrap();
        cmd.apply(&mut g).unwrap();
        cmd.revert(&mut g).unwrap();
        assert_eq!(g.children_of(r), before);
        assert_eq!(g.children_of(r), vec![a, b, c]);

        let cmd = Command::delete_node(&g, r).unwrap();
        cmd.apply(&mut g).unwrap();
        assert_eq!(g.parent_of(b), Some(p2));
        cmd.revert(&mut g).unwrap();
        assert_eq!(g.parent_of(b), Some(r));
        assert_eq!(g.children_of(r), vec![a, b, c]);
    }

    #[test]
    fn test_delete_revert_fails_cleanly_when_partner_is_gone() {
        let (mut g, a, b) = pair();
        g.connect(a, b).unwrap();
        let cmd = Command::delete_node(&g, a).unwrap();
        cmd.apply(&mut g).unwrap();
        g.remove_node(b).unwrap();
        assert!(matches!(cmd.revert(&mut g), Err(EditError::NodeNotFound(id)) if id == b));
        assert!(!g.contains_node(a));
    }

    #[test]
    fn test_move_commands_round_trip() {
        let (mut g, a, b) = pair();
        g.connect(a, b).unwrap();
        let cmds = [
            Command::MoveNode { id: a, from: PointF::new(0.0, 0.0), to: PointF::new(10.0, 40.0) },
            Command::MoveMultipleNodes {
                moves: vec![
                    NodeMove { id: a, from: PointF::new(0.0, 0.0), to: PointF::new(0.0, 30.0) },
                    NodeMove { id: b, from: PointF::new(168.0, 0.0), to: PointF::new(168.0, 30.0) },
                ],
            },
            Command::ReorderNode {
                id: b,
                moves: vec![NodeMove { id: b, from: PointF::new(168.0, 0.0), to: PointF::new(168.0, 97.0) }],
            },
        ];
        for cmd in &cmds {
            assert_round_trip(&mut g, cmd);
            cmd.revert(&mut g).unwrap();
        }
    }

    #[test]
    fn test_move_with_related_moves_same_generation_right() {
        let mut g = MindMap::default();
        let r = g.add_node("r", PointF::new(0.0, 0.0));
        let a = g.add_node("a", PointF::new(168.0, 0.0));
        let b = g.add_node("b", PointF::new(400.0, 92.0));
        let c = g.add_node("c", PointF::new(100.0, 200.0));
        g.connect(r, a).unwrap();
        g.connect(r, b).unwrap();
        g.connect(r, c).unwrap();

        let cmd = Command::move_with_related(&g, a, PointF::new(168.0, 50.0)).unwrap();
        cmd.apply(&mut g).unwrap();
        assert_eq!(g.position(b), Some(PointF::new(400.0, 142.0)));
        assert_eq!(g.position(c), Some(PointF::new(100.0, 200.0)));
        cmd.revert(&mut g).unwrap();
        assert_eq!(g.position(b), Some(PointF::new(400.0, 92.0)));
    }

    #[test]
    fn test_rename_round_trip() {
        let (mut g, a, _) = pair();
        let cmd = Command::RenameNode { id: a, old: "a".into(), new: "Alpha".into() };
        assert_round_trip(&mut g, &cmd);
        assert_eq!(g.node(a).unwrap().text, "Alpha");
    }

    #[test]
    fn test_subtree_move_restores_connector_geometry() {
        let (mut g, a, b) = pair();
        let e = g.connect(a, b).unwrap();
        let captured = g.connector_geometry();
        let cmd = Command::SubtreeMove {
            root: a,
            moves: vec![
                NodeMove { id: a, from: PointF::new(0.0, 0.0), to: PointF::new(50.0, 50.0) },
                NodeMove { id: b, from: PointF::new(168.0, 0.0), to: PointF::new(218.0, 50.0) },
            ],
            connectors: captured.clone(),
        };
        assert_round_trip(&mut g, &cmd);
        cmd.revert(&mut g).unwrap();
        assert_eq!(g.edge(e).unwrap().connector.segments(), &captured[&e]);
    }

    #[test]
    fn test_move_of_missing_node_is_an_error() {
        let (mut g, a, _) = pair();
        let cmd = Command::MoveMultipleNodes {
            moves: vec![
                NodeMove { id: a, from: PointF::new(0.0, 0.0), to: PointF::new(5.0, 5.0) },
                NodeMove { id: NodeId(99), from: PointF::new(0.0, 0.0), to: PointF::new(5.0, 5.0) },
            ],
        };
        assert!(cmd.apply(&mut g).is_err());
        assert_eq!(g.position(a), Some(PointF::new(0.0, 0.0)));
    }
}
