//! Render surface seam.
//!
//! The drawing layer is not part of this crate. It implements `Surface`, and
//! `SceneSync` keeps it in step with a `MindMap` by sending only what changed
//! since the previous sync.

use std::collections::BTreeMap;

use crate::geometry::{RectF, Segment};
use crate::model::{EdgeId, MindMap, NodeId};

/// Drawing operations the host provides. Shapes and connectors are keyed by
/// the model's own ids.
pub trait Surface {
    fn add_shape(&mut self, id: NodeId, rect: RectF, text: &str);
    fn remove_shape(&mut self, id: NodeId);
    fn set_position(&mut self, id: NodeId, rect: RectF);
    fn set_text(&mut self, id: NodeId, text: &str);
    fn set_selected(&mut self, id: NodeId, selected: bool);
    fn set_connector(&mut self, id: EdgeId, segments: &[Segment; 3]);
    fn remove_connector(&mut self, id: EdgeId);
}

#[derive(Debug, Clone, PartialEq)]
struct ShapeState {
    rect: RectF,
    text: String,
    selected: bool,
}

/// Last state pushed to a surface.
#[derive(Debug, Clone, Default)]
pub struct SceneSync {
    shapes: BTreeMap<NodeId, ShapeState>,
    connectors: BTreeMap<EdgeId, [Segment; 3]>,
}

impl SceneSync {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sync(&mut self, graph: &MindMap, surface: &mut impl Surface) {
        // Connectors first so a removed node never leaves a dangling line.
        let stale_edges: Vec<EdgeId> = self
            .connectors
            .keys()
            .filter(|eid| graph.edge(**eid).is_none())
            .copied()
            .collect();
        for eid in stale_edges {
            surface.remove_connector(eid);
            self.connectors.remove(&eid);
        }

        let stale_nodes: Vec<NodeId> = self
            .shapes
            .keys()
            .filter(|nid| !graph.contains_node(**nid))
            .copied()
            .collect();
        for nid in stale_nodes {
            surface.remove_shape(nid);
            self.shapes.remove(&nid);
        }

        for node in graph.nodes() {
            let next = ShapeState { rect: node.rect(), text: node.text.clone(), selected: node.selected };
            match self.shapes.get(&node.id) {
                None => {
                    surface.add_shape(node.id, next.rect, &next.text);
                    if next.selected {
                        surface.set_selected(node.id, true);
                    }
                }
                Some(prev) => {
                    if prev.rect != next.rect {
                        surface.set_position(node.id, next.rect);
                    }
                    if prev.text != next.text {
                        surface.set_text(node.id, &next.text);
                    }
                    if prev.selected != next.selected {
                        surface.set_selected(node.id, next.selected);
                    }
                }
            }
            self.shapes.insert(node.id, next);
        }

        for edge in graph.edges() {
            let segments = *edge.connector.segments();
            if self.connectors.get(&edge.id) != Some(&segments) {
                surface.set_connector(edge.id, &segments);
                self.connectors.insert(edge.id, segments);
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::geometry::PointF;

    /// Surface that records every call.
    #[derive(Debug, Default)]
    pub(crate) struct Recorder {
        pub calls: Vec<String>,
    }

    impl Surface for Recorder {
        fn add_shape(&mut self, id: NodeId, _rect: RectF, text: &str) {
            self.calls.push(format!("add {} {text}", id.0));
        }
        fn remove_shape(&mut self, id: NodeId) {
            self.calls.push(format!("remove {}", id.0));
        }
        fn set_position(&mut self, id: NodeId, rect: RectF) {
            self.calls.push(format!("move {} {} {}", id.0, rect.x, rect.y));
        }
        fn set_text(&mut self, id: NodeId, text: &str) {
            self.calls.push(format!("text {} {text}", id.0));
        }
        fn set_selected(&mut self, id: NodeId, selected: bool) {
            self.calls.push(format!("select {} {selected}", id.0));
        }
        fn set_connector(&mut self, id: EdgeId, _segments: &[Segment; 3]) {
            self.calls.push(format!("line {}", id.0));
        }
        fn remove_connector(&mut self, id: EdgeId) {
            self.calls.push(format!("unline {}", id.0));
        }
    }

    #[test]
    fn test_sync_sends_only_differences() {
        let mut g = MindMap::default();
        let a = g.add_node("a", PointF::new(0.0, 0.0));
        let b = g.add_node("b", PointF::new(168.0, 0.0));
        g.connect(a, b).unwrap();

        let mut sync = SceneSync::new();
        let mut rec = Recorder::default();
        sync.sync(&g, &mut rec);
        assert_eq!(rec.calls, vec!["add 0 a", "add 1 b", "line 0"]);

        rec.calls.clear();
        sync.sync(&g, &mut rec);
        assert!(rec.calls.is_empty());

        g.set_text(a, "alpha").unwrap();
        g.set_position(b, PointF::new(168.0, 36.0)).unwrap();
        sync.sync(&g, &mut rec);
        assert_eq!(rec.calls, vec!["text 0 alpha", "move 1 104 0", "line 0"]);

        rec.calls.clear();
        g.remove_node(a).unwrap();
        sync.sync(&g, &mut rec);
        assert_eq!(rec.calls, vec!["unline 0", "remove 0"]);
    }
}
