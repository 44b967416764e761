//! mindmap-core: geometry, layout and editing engine for a left-to-right
//! mind-map canvas.
//!
//! The crate owns the document model and every layout decision. Drawing is
//! left to the host, either through the `Surface` trait or through the JSON
//! scene returned by the wasm bindings in `wasm`.

pub mod geometry;
pub mod error;
pub mod model;
pub mod layout;
pub mod commands;
pub mod drag;
pub mod attraction;
pub mod document;
pub mod output;
pub mod surface;
pub mod editor;
pub mod wasm;

pub use commands::{Command, History};
pub use editor::{Direction, Gesture, MindMapEditor};
pub use error::{EditError, ImportError, Result};
pub use geometry::{PointF, RectF, Segment, SizeF};
pub use layout::LayoutConfig;
pub use model::{EdgeId, MindMap, NodeId};
pub use output::SceneOutput;
pub use surface::{SceneSync, Surface};
