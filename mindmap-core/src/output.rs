//! Output types for the canvas host.
//!
//! These structs are serialized to JSON and handed to the JavaScript side,
//! which draws them as it likes.

use serde::Serialize;

use crate::geometry::{RectF, Segment};
use crate::model::MindMap;

/// A node ready for the host to display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeOutput {
    pub id: usize,
    pub text: String,
    /// World rectangle, top-left + size
    pub bounds: RectF,
    pub selected: bool,
}

/// A connector as its three segments
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeOutput {
    pub id: usize,
    pub source: usize,
    pub target: usize,
    pub segments: [Segment; 3],
}

/// The combined output sent to the host
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneOutput {
    pub nodes: Vec<NodeOutput>,
    pub edges: Vec<EdgeOutput>,
    pub can_undo: bool,
    pub can_redo: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub undo_label: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redo_label: Option<&'static str>,
    /// Shift-click source waiting for a second node
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_connect: Option<usize>,
    pub attraction: bool,
}

impl SceneOutput {
    /// Nodes and edges only; history and mode flags are left at their defaults.
    pub fn from_graph(graph: &MindMap) -> Self {
        let nodes = graph
            .nodes()
            .map(|n| NodeOutput {
                id: n.id.0,
                text: n.text.clone(),
                bounds: n.rect(),
                selected: n.selected,
            })
            .collect();
        let edges = graph
            .edges()
            .map(|e| EdgeOutput {
                id: e.id.0,
                source: e.source.0,
                target: e.target.0,
                segments: *e.connector.segments(),
            })
            .collect();
        SceneOutput {
            nodes,
            edges,
            can_undo: false,
            can_redo: false,
            undo_label: None,
            redo_label: None,
            pending_connect: None,
            attraction: false,
        }
    }
}

/// Error payload returned instead of a scene
#[derive(Debug, Clone, Serialize)]
pub struct ErrorOutput {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::PointF;

    #[test]
    fn test_scene_json_shape() {
        let mut g = MindMap::default();
        let a = g.add_node("a", PointF::new(0.0, 0.0));
        let b = g.add_node("b", PointF::new(168.0, 0.0));
        g.connect(a, b).unwrap();

        let scene = SceneOutput::from_graph(&g);
        let json = serde_json::to_value(&scene).unwrap();
        assert_eq!(json["nodes"][0]["bounds"]["x"], -64.0);
        assert_eq!(json["edges"][0]["source"], 0);
        assert_eq!(json["edges"][0]["segments"].as_array().unwrap().len(), 3);
        assert!(json.get("undo_label").is_none());
    }
}
