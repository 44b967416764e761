//! WASM bindings for the mindmap-core library.
//!
//! All functions exposed to JavaScript via wasm-bindgen are defined here.
//! Every mutating call returns the resulting scene as JSON, or
//! `{"error": "..."}` when the edit was refused.

use log::{error, info, Level};
use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::editor::{Direction, MindMapEditor};
use crate::error::Result;
use crate::geometry::PointF;
use crate::layout::LayoutConfig;
use crate::model::NodeId;
use crate::output::ErrorOutput;

/// Initialize logging and panic hooks for the WASM target.
#[wasm_bindgen]
pub fn init_logging() {
    let _ = console_log::init_with_level(Level::Debug);
    console_error_panic_hook::set_once();
    info!("mindmap-core: logging initialized");
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| format!("{{\"error\":\"{e}\"}}"))
}

fn error_json(message: String) -> String {
    error!("{message}");
    to_json(&ErrorOutput { error: message })
}

#[wasm_bindgen]
pub struct MindMapApp {
    editor: MindMapEditor,
}

impl MindMapApp {
    fn respond<T>(&self, result: Result<T>) -> String {
        match result {
            Ok(_) => self.scene(),
            Err(e) => error_json(e.to_string()),
        }
    }
}

#[wasm_bindgen]
impl MindMapApp {
    /// `config` is an optional `LayoutConfig` as JSON; missing fields keep
    /// their defaults. A config that does not parse falls back to defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config: Option<String>) -> MindMapApp {
        let config = match config.as_deref().map(serde_json::from_str::<LayoutConfig>) {
            Some(Ok(cfg)) => cfg,
            Some(Err(e)) => {
                error!("mindmap-core: bad layout config, using defaults: {e}");
                LayoutConfig::default()
            }
            None => LayoutConfig::default(),
        };
        MindMapApp { editor: MindMapEditor::new(config) }
    }

    pub fn scene(&self) -> String {
        to_json(&self.editor.scene())
    }

    pub fn set_viewport_center(&mut self, x: f64, y: f64) {
        self.editor.set_viewport_center(PointF::new(x, y));
    }

    /// Bounding box of the whole map plus a margin, or `null` when empty.
    pub fn fit_bounds(&self) -> String {
        to_json(&self.editor.fit_bounds())
    }

    pub fn add_child(&mut self, parent: usize, text: &str) -> String {
        let result = self.editor.add_child(NodeId(parent), text);
        self.respond(result)
    }

    pub fn add_root(&mut self, text: &str) -> String {
        let result = self.editor.add_root(text);
        self.respond(result)
    }

    /// Child of the single selected node, otherwise a new root.
    pub fn add_node(&mut self, text: &str) -> String {
        let result = self.editor.add_for_selection(text);
        self.respond(result)
    }

    pub fn connect(&mut self, a: usize, b: usize) -> String {
        let result = self.editor.connect(NodeId(a), NodeId(b));
        self.respond(result)
    }

    pub fn delete_node(&mut self, id: usize) -> String {
        let result = self.editor.delete_node(NodeId(id));
        self.respond(result)
    }

    pub fn delete_selected(&mut self) -> String {
        let result = self.editor.delete_selected();
        self.respond(result)
    }

    pub fn rename(&mut self, id: usize, text: &str) -> String {
        let result = self.editor.rename(NodeId(id), text);
        self.respond(result)
    }

    pub fn move_node(&mut self, id: usize, x: f64, y: f64) -> String {
        let result = self.editor.move_node(NodeId(id), PointF::new(x, y));
        self.respond(result)
    }

    pub fn move_node_with_related(&mut self, id: usize, x: f64, y: f64) -> String {
        let result = self.editor.move_node_with_related(NodeId(id), PointF::new(x, y));
        self.respond(result)
    }

    pub fn align(&mut self) -> String {
        let result = self.editor.align();
        self.respond(result)
    }

    pub fn undo(&mut self) -> String {
        let result = self.editor.undo();
        self.respond(result)
    }

    pub fn redo(&mut self) -> String {
        let result = self.editor.redo();
        self.respond(result)
    }

    pub fn select(&mut self, id: usize, additive: bool) -> String {
        let result = self.editor.select(NodeId(id), additive);
        self.respond(result)
    }

    pub fn select_all(&mut self) -> String {
        self.editor.select_all();
        self.scene()
    }

    pub fn clear_selection(&mut self) -> String {
        self.editor.clear_selection();
        self.scene()
    }

    /// `direction` is one of `up`, `down`, `left`, `right`.
    pub fn navigate(&mut self, direction: &str) -> String {
        match serde_json::from_value::<Direction>(serde_json::Value::from(direction)) {
            Ok(dir) => {
                self.editor.navigate(dir);
                self.scene()
            }
            Err(e) => error_json(format!("unknown direction '{direction}': {e}")),
        }
    }

    pub fn pointer_press(&mut self, x: f64, y: f64, shift: bool) -> String {
        let result = self.editor.pointer_press(PointF::new(x, y), shift);
        self.respond(result)
    }

    pub fn pointer_move(&mut self, x: f64, y: f64) -> String {
        self.editor.pointer_move(PointF::new(x, y));
        self.scene()
    }

    pub fn pointer_release(&mut self, x: f64, y: f64) -> String {
        let result = self.editor.pointer_release(PointF::new(x, y));
        self.respond(result)
    }

    pub fn escape(&mut self) -> String {
        self.editor.escape();
        self.scene()
    }

    pub fn toggle_attraction(&mut self) -> String {
        self.editor.toggle_attraction();
        self.scene()
    }

    pub fn tick_attraction(&mut self) -> String {
        self.editor.tick_attraction();
        self.scene()
    }

    pub fn import_json(&mut self, json: &str) -> String {
        let result = self.editor.import_json(json);
        self.respond(result)
    }

    /// The document as JSON, or an error payload.
    pub fn export_json(&mut self) -> String {
        match self.editor.export_json() {
            Ok(json) => json,
            Err(e) => error_json(e.to_string()),
        }
    }
}
