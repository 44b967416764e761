//! Error types for editing and document import.

use thiserror::Error;

use crate::model::{EdgeId, NodeId};

#[derive(Debug, Error)]
pub enum EditError {
    #[error("node {0:?} is not registered")]
    NodeNotFound(NodeId),

    #[error("node {0:?} is already registered")]
    NodeExists(NodeId),

    #[error("edge {0:?} is not registered")]
    EdgeNotFound(EdgeId),

    #[error("edge {0:?} is already registered")]
    EdgeExists(EdgeId),

    #[error("nodes {from:?} and {to:?} are already connected")]
    AlreadyConnected { from: NodeId, to: NodeId },

    #[error("cannot connect node {0:?} to itself")]
    SelfLoop(NodeId),

    #[error("nothing to undo")]
    UndoStackEmpty,

    #[error("nothing to redo")]
    RedoStackEmpty,

    #[error("import failed: {0}")]
    Import(#[from] ImportError),

    #[error("export failed: {0}")]
    Export(#[source] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("malformed document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("duplicate node id {0}")]
    DuplicateId(String),

    #[error("node {id} has a non-finite coordinate")]
    BadCoordinate { id: String },
}

pub type Result<T> = std::result::Result<T, EditError>;
