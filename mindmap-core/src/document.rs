//! Persisted JSON document.
//!
//! ```json
//! {
//!   "nodes": [ { "id": "node_0", "text": "Root", "x": 0.0, "y": 0.0 } ],
//!   "edges": [ { "source": "node_0", "target": "node_1" } ],
//!   "version": "1.0"
//! }
//! ```
//!
//! `x`/`y` are node centers. Ids may be strings or integers; edges may use
//! `from`/`to` instead of `source`/`target`. Import places nodes at their
//! stored coordinates without any collision resolution.

use std::collections::{HashMap, HashSet};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::ImportError;
use crate::geometry::PointF;
use crate::layout::LayoutConfig;
use crate::model::{MindMap, NodeId};

pub const DOCUMENT_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocId {
    Int(i64),
    Text(String),
}

impl DocId {
    /// Lookup key; `7` and `"7"` name the same node.
    fn key(&self) -> String {
        match self {
            DocId::Int(n) => n.to_string(),
            DocId::Text(s) => s.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocNode {
    pub id: DocId,
    #[serde(default)]
    pub text: String,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocEdge {
    #[serde(alias = "from")]
    pub source: DocId,
    #[serde(alias = "to")]
    pub target: DocId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub nodes: Vec<DocNode>,
    #[serde(default)]
    pub edges: Vec<DocEdge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Result of a successful import.
#[derive(Debug, Clone)]
pub struct Imported {
    pub graph: MindMap,
    /// Edges dropped because an endpoint was missing, they looped, or they
    /// repeated a pair already connected.
    pub skipped_edges: usize,
}

pub fn export_document(graph: &MindMap) -> Document {
    let mut ids: HashMap<NodeId, String> = HashMap::new();
    let nodes = graph
        .nodes()
        .enumerate()
        .map(|(i, n)| {
            let id = format!("node_{i}");
            ids.insert(n.id, id.clone());
            DocNode { id: DocId::Text(id), text: n.text.clone(), x: n.position.x, y: n.position.y }
        })
        .collect();

    let edges = graph
        .edges()
        .filter_map(|e| {
            Some(DocEdge {
                source: DocId::Text(ids.get(&e.source)?.clone()),
                target: DocId::Text(ids.get(&e.target)?.clone()),
            })
        })
        .collect();

    Document { nodes, edges, version: Some(DOCUMENT_VERSION.to_string()) }
}

pub fn export_json(graph: &MindMap) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&export_document(graph))
}

/// Parse and validate `json` into a fresh graph.
pub fn import_json(json: &str, cfg: &LayoutConfig) -> Result<Imported, ImportError> {
    let doc: Document = serde_json::from_str(json)?;
    import_document(&doc, cfg)
}

pub fn import_document(doc: &Document, cfg: &LayoutConfig) -> Result<Imported, ImportError> {
    let mut graph = MindMap::new(cfg);
    let mut ids: HashMap<String, NodeId> = HashMap::with_capacity(doc.nodes.len());

    for node in &doc.nodes {
        let key = node.id.key();
        if !(node.x.is_finite() && node.y.is_finite()) {
            return Err(ImportError::BadCoordinate { id: key });
        }
        if ids.contains_key(&key) {
            return Err(ImportError::DuplicateId(key));
        }
        let nid = graph.add_node(node.text.clone(), PointF::new(node.x, node.y));
        ids.insert(key, nid);
    }

    let mut resolved = Vec::with_capacity(doc.edges.len());
    let mut skipped = 0;
    for edge in &doc.edges {
        match (ids.get(&edge.source.key()), ids.get(&edge.target.key())) {
            (Some(s), Some(t)) if s != t => resolved.push((*s, *t)),
            _ => {
                debug!("import: skipping edge {:?} -> {:?}", edge.source, edge.target);
                skipped += 1;
            }
        }
    }

    // Older files list a pair in both directions; keep one edge per pair with
    // the left node as source.
    let directed: HashSet<(NodeId, NodeId)> = resolved.iter().copied().collect();
    let x_of = |id: NodeId| graph.position(id).map_or(0.0, |p| p.x);
    let oriented: Vec<(NodeId, NodeId)> = resolved
        .iter()
        .map(|&(s, t)| {
            if directed.contains(&(t, s)) && x_of(t) < x_of(s) { (t, s) } else { (s, t) }
        })
        .collect();

    for (s, t) in oriented {
        if graph.edge_between(s, t).is_some() {
            skipped += 1;
            continue;
        }
        if graph.connect(s, t).is_err() {
            skipped += 1;
        }
    }

    info!(
        "import: {} nodes, {} edges, {} skipped",
        graph.node_count(),
        graph.edge_count(),
        skipped
    );
    Ok(Imported { graph, skipped_edges: skipped })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labelled_edges(g: &MindMap) -> Vec<(String, String)> {
        let text = |id: NodeId| g.node(id).map(|n| n.text.clone()).unwrap_or_default();
        let mut out: Vec<_> = g.edges().map(|e| (text(e.source), text(e.target))).collect();
        out.sort();
        out
    }

    #[test]
    fn test_export_import_round_trip() {
        let mut g = MindMap::default();
        let r = g.add_node("Root", PointF::new(0.0, 0.0));
        let a = g.add_node("A", PointF::new(168.0, 0.0));
        let b = g.add_node("B", PointF::new(168.0, 92.0));
        let a1 = g.add_node("A1", PointF::new(336.0, 0.0));
        g.connect(r, a).unwrap();
        g.connect(r, b).unwrap();
        g.connect(a, a1).unwrap();

        let json = export_json(&g).unwrap();
        assert!(json.contains("\"version\": \"1.0\""));
        let back = import_json(&json, &LayoutConfig::default()).unwrap();

        assert_eq!(back.skipped_edges, 0);
        assert_eq!(back.graph.node_count(), 4);
        assert_eq!(labelled_edges(&back.graph), labelled_edges(&g));
        let mut texts: Vec<_> = back.graph.nodes().map(|n| (n.text.clone(), n.position)).collect();
        texts.sort_by(|x, y| x.0.cmp(&y.0));
        assert_eq!(texts[0], ("A".to_string(), PointF::new(168.0, 0.0)));
    }

    #[test]
    fn test_import_accepts_legacy_shapes() {
        let json = r#"{
            "nodes": [
                {"id": 1, "text": "left", "x": 0, "y": 0},
                {"id": "2", "text": "right", "x": 200, "y": 0},
                {"id": 3, "text": "other", "x": 200, "y": 100}
            ],
            "edges": [
                {"from": 2, "to": 1},
                {"source": "1", "target": "2"},
                {"from": 1, "to": 3},
                {"from": 1, "to": 99},
                {"from": 3, "to": 3}
            ]
        }"#;
        let imported = import_json(json, &LayoutConfig::default()).unwrap();
        let g = &imported.graph;
        assert_eq!(g.edge_count(), 2);
        assert_eq!(imported.skipped_edges, 3);
        assert_eq!(
            labelled_edges(g),
            vec![("left".to_string(), "other".to_string()), ("left".to_string(), "right".to_string())]
        );
    }

    #[test]
    fn test_import_rejects_bad_documents() {
        let cfg = LayoutConfig::default();
        assert!(matches!(import_json("{ nope", &cfg), Err(ImportError::Json(_))));
        assert!(matches!(import_json(r#"{"edges": []}"#, &cfg), Err(ImportError::Json(_))));
        let dup = r#"{"nodes": [{"id": 1, "text": "a", "x": 0, "y": 0}, {"id": "1", "text": "b", "x": 5, "y": 5}]}"#;
        assert!(matches!(import_json(dup, &cfg), Err(ImportError::DuplicateId(id)) if id == "1"));
    }

    #[test]
    fn test_import_rejects_non_finite_coordinates() {
        let doc = Document {
            nodes: vec![DocNode { id: DocId::Int(1), text: "a".into(), x: f64::NAN, y: 0.0 }],
            edges: Vec::new(),
            version: None,
        };
        assert!(matches!(
            import_document(&doc, &LayoutConfig::default()),
            Err(ImportError::BadCoordinate { .. })
        ));
    }
}
