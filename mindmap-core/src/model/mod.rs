//! In-memory mindmap graph.
//!
//! Nodes and edges live in id-keyed registries. Ids are never reused inside a
//! session, so commands can refer to a node across delete/undo cycles. Every
//! node keeps the list of its incident edges, which makes `children_of` and
//! `parent_of` O(degree).

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{EditError, Result};
use crate::geometry::{PointF, RectF, SizeF, Segment};
use crate::layout::LayoutConfig;

mod connector;
mod hierarchy;

pub use connector::{ConnectorStyle, CrankConnector};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub usize);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EdgeId(pub usize);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub id: NodeId,
    /// Center, world coordinates.
    pub position: PointF,
    pub size: SizeF,
    pub text: String,
    pub selected: bool,
    /// Incident edges with the node at their other end, in attach order.
    edges: Vec<(EdgeId, NodeId)>,
}

impl Node {
    pub fn new(id: NodeId, text: impl Into<String>, position: PointF, size: SizeF) -> Self {
        Self { id, position, size, text: text.into(), selected: false, edges: Vec::new() }
    }

    pub fn rect(&self) -> RectF {
        RectF::from_center(self.position, self.size)
    }

    pub fn edges(&self) -> &[(EdgeId, NodeId)] {
        &self.edges
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    pub connector: CrankConnector,
}

impl Edge {
    pub fn touches(&self, nid: NodeId) -> bool {
        self.source == nid || self.target == nid
    }

    pub fn other(&self, nid: NodeId) -> NodeId {
        if self.source == nid { self.target } else { self.source }
    }
}

#[derive(Debug, Clone)]
pub struct MindMap {
    nodes: BTreeMap<NodeId, Node>,
    edges: BTreeMap<EdgeId, Edge>,
    next_node: usize,
    next_edge: usize,
    node_size: SizeF,
    style: ConnectorStyle,
}

impl Default for MindMap {
    fn default() -> Self {
        MindMap::new(&LayoutConfig::default())
    }
}

impl MindMap {
    pub fn new(cfg: &LayoutConfig) -> Self {
        Self {
            nodes: BTreeMap::new(),
            edges: BTreeMap::new(),
            next_node: 0,
            next_edge: 0,
            node_size: cfg.node_size,
            style: ConnectorStyle::from(cfg),
        }
    }

    pub fn node_size(&self) -> SizeF {
        self.node_size
    }

    pub fn style(&self) -> &ConnectorStyle {
        &self.style
    }

    // ------------------------------------------------------------------
    // Registry
    // ------------------------------------------------------------------

    pub fn reserve_node_id(&mut self) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        id
    }

    pub fn reserve_edge_id(&mut self) -> EdgeId {
        let id = EdgeId(self.next_edge);
        self.next_edge += 1;
        id
    }

    /// Create a node at `position` and return its id.
    pub fn add_node(&mut self, text: impl Into<String>, position: PointF) -> NodeId {
        let id = self.reserve_node_id();
        self.nodes.insert(id, Node::new(id, text, position, self.node_size));
        id
    }

    /// Register a node under an id obtained from `reserve_node_id` (or one that
    /// was removed earlier). Any edge list on `node` is discarded.
    pub fn insert_node(&mut self, mut node: Node) -> Result<()> {
        if self.nodes.contains_key(&node.id) {
            return Err(EditError::NodeExists(node.id));
        }
        node.edges.clear();
        self.next_node = self.next_node.max(node.id.0 + 1);
        self.nodes.insert(node.id, node);
        Ok(())
    }

    /// Remove a node together with every incident edge.
    pub fn remove_node(&mut self, id: NodeId) -> Result<(Node, Vec<Edge>)> {
        let incident: Vec<EdgeId> = self
            .nodes
            .get(&id)
            .ok_or(EditError::NodeNotFound(id))?
            .edges
            .iter()
            .map(|(eid, _)| *eid)
            .collect();
        let mut removed = Vec::with_capacity(incident.len());
        for eid in incident {
            removed.push(self.remove_edge(eid)?);
        }
        let node = self.nodes.remove(&id).ok_or(EditError::NodeNotFound(id))?;
        Ok((node, removed))
    }

    pub fn connect(&mut self, source: NodeId, target: NodeId) -> Result<EdgeId> {
        self.check_connectable(source, target)?;
        let id = self.reserve_edge_id();
        self.insert_edge(id, source, target)?;
        Ok(id)
    }

    /// Validate a prospective edge without touching the graph.
    pub fn check_connectable(&self, source: NodeId, target: NodeId) -> Result<()> {
        if source == target {
            return Err(EditError::SelfLoop(source));
        }
        if !self.nodes.contains_key(&target) {
            return Err(EditError::NodeNotFound(target));
        }
        let src = self.nodes.get(&source).ok_or(EditError::NodeNotFound(source))?;
        if src.edges.iter().any(|(_, other)| *other == target) {
            return Err(EditError::AlreadyConnected { from: source, to: target });
        }
        Ok(())
    }

    pub fn insert_edge(&mut self, id: EdgeId, source: NodeId, target: NodeId) -> Result<()> {
        self.insert_edge_at(id, source, target, usize::MAX, usize::MAX)
    }

    /// Like `insert_edge`, but the edge goes in at the given index of each
    /// endpoint's incident list (clamped to the list length).
    pub fn insert_edge_at(
        &mut self,
        id: EdgeId,
        source: NodeId,
        target: NodeId,
        source_slot: usize,
        target_slot: usize,
    ) -> Result<()> {
        if self.edges.contains_key(&id) {
            return Err(EditError::EdgeExists(id));
        }
        self.check_connectable(source, target)?;
        let connector = CrankConnector::route(
            &self.nodes[&source].rect(),
            &self.nodes[&target].rect(),
            &self.style,
        );
        self.next_edge = self.next_edge.max(id.0 + 1);
        self.edges.insert(id, Edge { id, source, target, connector });
        if let Some(n) = self.nodes.get_mut(&source) {
            n.edges.insert(source_slot.min(n.edges.len()), (id, target));
        }
        if let Some(n) = self.nodes.get_mut(&target) {
            n.edges.insert(target_slot.min(n.edges.len()), (id, source));
        }
        Ok(())
    }

    pub fn remove_edge(&mut self, id: EdgeId) -> Result<Edge> {
        let edge = self.edges.remove(&id).ok_or(EditError::EdgeNotFound(id))?;
        for nid in [edge.source, edge.target] {
            if let Some(n) = self.nodes.get_mut(&nid) {
                n.edges.retain(|(eid, _)| *eid != id);
            }
        }
        Ok(edge)
    }

    /// Drop everything, keeping id counters so stale ids never alias new nodes.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(&id)
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.keys().copied().collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn position(&self, id: NodeId) -> Option<PointF> {
        self.nodes.get(&id).map(|n| n.position)
    }

    pub fn node_rect(&self, id: NodeId) -> Option<RectF> {
        self.nodes.get(&id).map(Node::rect)
    }

    pub fn edge_between(&self, a: NodeId, b: NodeId) -> Option<EdgeId> {
        self.nodes
            .get(&a)?
            .edges
            .iter()
            .find(|(_, other)| *other == b)
            .map(|(eid, _)| *eid)
    }

    pub fn selected(&self) -> Vec<NodeId> {
        self.nodes.values().filter(|n| n.selected).map(|n| n.id).collect()
    }

    /// Union of all node rectangles.
    pub fn bounds(&self) -> Option<RectF> {
        self.nodes.values().map(Node::rect).reduce(|acc, r| acc.union(&r))
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Move a node and reroute every connector attached to it.
    pub fn set_position(&mut self, id: NodeId, position: PointF) -> Result<()> {
        self.set_position_raw(id, position)?;
        self.refresh_edges_of(id);
        Ok(())
    }

    /// Move a node without touching its connectors.
    pub fn set_position_raw(&mut self, id: NodeId, position: PointF) -> Result<()> {
        let node = self.nodes.get_mut(&id).ok_or(EditError::NodeNotFound(id))?;
        node.position = position;
        Ok(())
    }

    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) -> Result<()> {
        let node = self.nodes.get_mut(&id).ok_or(EditError::NodeNotFound(id))?;
        node.text = text.into();
        Ok(())
    }

    pub fn set_selected(&mut self, id: NodeId, selected: bool) -> Result<()> {
        let node = self.nodes.get_mut(&id).ok_or(EditError::NodeNotFound(id))?;
        node.selected = selected;
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        for n in self.nodes.values_mut() {
            n.selected = false;
        }
    }

    pub fn set_connector(&mut self, id: EdgeId, segments: [Segment; 3]) -> Result<()> {
        let edge = self.edges.get_mut(&id).ok_or(EditError::EdgeNotFound(id))?;
        edge.connector.set_segments(segments);
        Ok(())
    }

    /// Translate a captured connector geometry (drag preview).
    pub fn preview_connector(&mut self, id: EdgeId, captured: &[Segment; 3], dx: f64, dy: f64) -> Result<()> {
        let edge = self.edges.get_mut(&id).ok_or(EditError::EdgeNotFound(id))?;
        edge.connector.preview(captured, dx, dy);
        Ok(())
    }

    pub fn refresh_edge(&mut self, id: EdgeId) {
        let Some(edge) = self.edges.get(&id) else { return };
        let (Some(s), Some(t)) = (self.nodes.get(&edge.source), self.nodes.get(&edge.target)) else {
            return;
        };
        let (sr, tr) = (s.rect(), t.rect());
        if let Some(edge) = self.edges.get_mut(&id) {
            edge.connector.recompute(&sr, &tr, &self.style);
        }
    }

    pub fn refresh_edges_of(&mut self, id: NodeId) {
        let incident: Vec<EdgeId> = match self.nodes.get(&id) {
            Some(n) => n.edges.iter().map(|(eid, _)| *eid).collect(),
            None => return,
        };
        for eid in incident {
            self.refresh_edge(eid);
        }
    }

    pub fn refresh_all_edges(&mut self) {
        let ids: Vec<EdgeId> = self.edges.keys().copied().collect();
        for eid in ids {
            self.refresh_edge(eid);
        }
    }

    /// Positions of every node, for snapshot/restore pairs.
    pub fn positions(&self) -> BTreeMap<NodeId, PointF> {
        self.nodes.values().map(|n| (n.id, n.position)).collect()
    }

    pub fn connector_geometry(&self) -> BTreeMap<EdgeId, [Segment; 3]> {
        self.edges.values().map(|e| (e.id, *e.connector.segments())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_and_remove_node() {
        let mut g = MindMap::default();
        let a = g.add_node("a", PointF::new(0.0, 0.0));
        let b = g.add_node("b", PointF::new(200.0, 0.0));
        let c = g.add_node("c", PointF::new(200.0, 100.0));
        let ab = g.connect(a, b).unwrap();
        g.connect(a, c).unwrap();

        assert_eq!(g.node(a).unwrap().edges().len(), 2);
        assert_eq!(g.edge_between(b, a), Some(ab));

        let (node, removed) = g.remove_node(a).unwrap();
        assert_eq!(node.id, a);
        assert_eq!(removed.len(), 2);
        assert_eq!(g.edge_count(), 0);
        assert!(g.node(b).unwrap().edges().is_empty());
    }

    #[test]
    fn test_rejects_bad_edges() {
        let mut g = MindMap::default();
        let a = g.add_node("a", PointF::new(0.0, 0.0));
        let b = g.add_node("b", PointF::new(200.0, 0.0));
        assert!(matches!(g.connect(a, a), Err(EditError::SelfLoop(_))));
        g.connect(a, b).unwrap();
        assert!(matches!(g.connect(b, a), Err(EditError::AlreadyConnected { .. })));
        assert!(matches!(g.connect(a, NodeId(99)), Err(EditError::NodeNotFound(_))));
    }

    #[test]
    fn test_reinserted_node_keeps_id() {
        let mut g = MindMap::default();
        let a = g.add_node("a", PointF::new(0.0, 0.0));
        let (node, _) = g.remove_node(a).unwrap();
        g.insert_node(node).unwrap();
        assert!(g.contains_node(a));
        let b = g.add_node("b", PointF::new(0.0, 200.0));
        assert_ne!(a, b);
        assert!(matches!(g.insert_node(Node::new(a, "x", PointF::default(), g.node_size())), Err(EditError::NodeExists(_))));
    }

    #[test]
    fn test_set_position_reroutes_connectors() {
        let mut g = MindMap::default();
        let a = g.add_node("a", PointF::new(0.0, 0.0));
        let b = g.add_node("b", PointF::new(200.0, 0.0));
        let e = g.connect(a, b).unwrap();
        g.set_position(b, PointF::new(200.0, 100.0)).unwrap();
        let (_, end) = g.edge(e).unwrap().connector.endpoints();
        assert_eq!(end, PointF::new(136.0, 100.0));
    }
}
