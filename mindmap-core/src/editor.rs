//! Editing session over one mindmap.
//!
//! `MindMapEditor` owns the graph and is the only thing that mutates it.
//! Structural edits go through `History`, so everything a user does can be
//! undone. The attraction animation and live drag previews are the exceptions;
//! both are transient and are settled (restored or cancelled) before any
//! other edit runs.

use std::collections::BTreeMap;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::attraction::Attraction;
use crate::commands::{Command, History};
use crate::document;
use crate::drag::{DragController, DragOutcome};
use crate::error::{EditError, Result};
use crate::geometry::{PointF, RectF};
use crate::layout::spacing::NodeMove;
use crate::layout::{align_generations, place_child, place_new_root, CollisionIndex, LayoutConfig, PlacementPlan};
use crate::model::{EdgeId, MindMap, Node, NodeId};
use crate::output::SceneOutput;

const ATTRACTION_SEED: u64 = 0x6d69_6e64;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// What a pointer release amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gesture {
    /// No gesture was in progress.
    Idle,
    Click,
    /// Dropped onto another node; everything went back.
    RolledBack,
    /// A command was recorded; carries its label.
    Committed(&'static str),
}

/// Several selected nodes dragged together.
#[derive(Debug, Clone)]
struct MultiMove {
    press: PointF,
    origin: BTreeMap<NodeId, PointF>,
}

#[derive(Debug, Clone)]
pub struct MindMapEditor {
    graph: MindMap,
    config: LayoutConfig,
    history: History,
    drag: DragController,
    multi: Option<MultiMove>,
    attraction: Attraction,
    pending_connect: Option<NodeId>,
    viewport_center: PointF,
}

impl Default for MindMapEditor {
    fn default() -> Self {
        MindMapEditor::new(LayoutConfig::default())
    }
}

impl MindMapEditor {
    pub fn new(config: LayoutConfig) -> Self {
        Self {
            graph: MindMap::new(&config),
            history: History::with_limit(config.history_limit),
            drag: DragController::new(),
            multi: None,
            attraction: Attraction::new(config.attraction_amplitude, ATTRACTION_SEED),
            pending_connect: None,
            viewport_center: PointF::default(),
            config,
        }
    }

    pub fn graph(&self) -> &MindMap {
        &self.graph
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn pending_connect(&self) -> Option<NodeId> {
        self.pending_connect
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_dragging() || self.multi.is_some()
    }

    pub fn set_viewport_center(&mut self, center: PointF) {
        self.viewport_center = center;
    }

    pub fn viewport_center(&self) -> PointF {
        self.viewport_center
    }

    /// All nodes plus the fit margin, for a host fitting its viewport.
    pub fn fit_bounds(&self) -> Option<RectF> {
        self.graph.bounds().map(|r| r.expanded(self.config.fit_margin))
    }

    /// Topmost node under `p` (the most recently created one wins).
    pub fn node_at(&self, p: PointF) -> Option<NodeId> {
        self.graph
            .nodes()
            .filter(|n| n.rect().contains(p))
            .map(|n| n.id)
            .max()
    }

    /// Stop the animation and abandon any live gesture before an edit.
    fn settle(&mut self) {
        self.attraction.stop(&mut self.graph);
        self.cancel_gestures();
    }

    /// Put every node touched by an unfinished drag or multi-move back.
    fn cancel_gestures(&mut self) {
        self.drag.cancel(&mut self.graph);
        if let Some(multi) = self.multi.take() {
            for (nid, p) in multi.origin {
                let _ = self.graph.set_position(nid, p);
            }
        }
    }

    /// Forget the armed connection source and drop its highlight.
    fn disarm_connect(&mut self) {
        if let Some(source) = self.pending_connect.take() {
            let _ = self.deselect(source);
        }
    }

    fn push(&mut self, command: Command) -> Result<()> {
        self.history.push(&mut self.graph, command)
    }

    // ------------------------------------------------------------------
    // Structural edits
    // ------------------------------------------------------------------

    pub fn add_child(&mut self, parent: NodeId, text: impl Into<String>) -> Result<NodeId> {
        self.settle();
        let parent_rect = self.graph.node_rect(parent).ok_or(EditError::NodeNotFound(parent))?;
        let plan = if parent_rect.is_degenerate() {
            warn!("editor: parent {:?} has a degenerate rectangle, placing near the viewport center", parent);
            PlacementPlan { position: self.free_spot_near_viewport(), displaced: Vec::new() }
        } else {
            place_child(&self.graph, parent, &self.config).ok_or(EditError::NodeNotFound(parent))?
        };

        let id = self.graph.reserve_node_id();
        let edge = self.graph.reserve_edge_id();
        let node = Node::new(id, text, plan.position, self.graph.node_size());
        self.push(Command::AddNode { node, parent: Some((edge, parent)), displaced: plan.displaced })?;
        Ok(id)
    }

    pub fn add_root(&mut self, text: impl Into<String>) -> Result<NodeId> {
        self.settle();
        let position = place_new_root(&self.graph, &self.config, self.viewport_center);
        let id = self.graph.reserve_node_id();
        let node = Node::new(id, text, position, self.graph.node_size());
        self.push(Command::AddNode { node, parent: None, displaced: Vec::new() })?;
        Ok(id)
    }

    /// Child of the first selected node, or a new root when nothing is selected.
    pub fn add_for_selection(&mut self, text: impl Into<String>) -> Result<NodeId> {
        match self.graph.selected().first() {
            Some(parent) => self.add_child(*parent, text),
            None => self.add_root(text),
        }
    }

    fn free_spot_near_viewport(&self) -> PointF {
        let index = CollisionIndex::build(&self.graph, &self.config);
        index.find_free_position(self.viewport_center, None, &self.config)
    }

    /// Connect two nodes. The left one becomes the source; on a tie `a` does.
    pub fn connect(&mut self, a: NodeId, b: NodeId) -> Result<EdgeId> {
        self.settle();
        let pa = self.graph.position(a).ok_or(EditError::NodeNotFound(a))?;
        let pb = self.graph.position(b).ok_or(EditError::NodeNotFound(b))?;
        let (source, target) = if pb.x < pa.x { (b, a) } else { (a, b) };
        self.graph.check_connectable(source, target)?;

        let edge = self.graph.reserve_edge_id();
        self.push(Command::ConnectNodes { edge, source, target })?;
        Ok(edge)
    }

    pub fn delete_node(&mut self, id: NodeId) -> Result<()> {
        self.settle();
        let command = Command::delete_node(&self.graph, id)?;
        self.push(command)?;
        if self.pending_connect == Some(id) {
            self.pending_connect = None;
        }
        Ok(())
    }

    /// One DeleteNode per selected node; returns how many were removed.
    pub fn delete_selected(&mut self) -> Result<usize> {
        let selected = self.graph.selected();
        for id in &selected {
            self.delete_node(*id)?;
        }
        Ok(selected.len())
    }

    pub fn rename(&mut self, id: NodeId, text: impl Into<String>) -> Result<()> {
        self.settle();
        let old = self.graph.node(id).ok_or(EditError::NodeNotFound(id))?.text.clone();
        let new = text.into();
        if old == new {
            return Ok(());
        }
        self.push(Command::RenameNode { id, old, new })
    }

    pub fn move_node(&mut self, id: NodeId, to: PointF) -> Result<()> {
        self.settle();
        let from = self.graph.position(id).ok_or(EditError::NodeNotFound(id))?;
        self.push(Command::MoveNode { id, from, to })
    }

    pub fn move_node_with_related(&mut self, id: NodeId, to: PointF) -> Result<()> {
        self.settle();
        let command = Command::move_with_related(&self.graph, id, to)?;
        self.push(command)
    }

    pub fn move_nodes(&mut self, targets: &[(NodeId, PointF)]) -> Result<()> {
        self.settle();
        let moves = targets
            .iter()
            .map(|(id, to)| {
                let from = self.graph.position(*id).ok_or(EditError::NodeNotFound(*id))?;
                Ok(NodeMove { id: *id, from, to: *to })
            })
            .collect::<Result<Vec<_>>>()?;
        self.push(Command::MoveMultipleNodes { moves })
    }

    /// Tidy the whole map into generation columns. Returns the number of
    /// nodes moved; the result is one undoable step.
    pub fn align(&mut self) -> Result<usize> {
        self.settle();
        let mut scratch = self.graph.clone();
        let moves = align_generations(&mut scratch, &self.config);
        if moves.is_empty() {
            return Ok(0);
        }
        let moved = moves.len();
        self.push(Command::MoveMultipleNodes { moves })?;
        Ok(moved)
    }

    pub fn undo(&mut self) -> Result<&'static str> {
        self.settle();
        let label = self.history.undo(&mut self.graph).map(Command::label)?;
        self.drop_stale_pending();
        Ok(label)
    }

    pub fn redo(&mut self) -> Result<&'static str> {
        self.settle();
        let label = self.history.redo(&mut self.graph).map(Command::label)?;
        self.drop_stale_pending();
        Ok(label)
    }

    fn drop_stale_pending(&mut self) {
        if self.pending_connect.is_some_and(|p| !self.graph.contains_node(p)) {
            self.pending_connect = None;
        }
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    pub fn select(&mut self, id: NodeId, additive: bool) -> Result<()> {
        if !additive {
            self.graph.clear_selection();
        }
        self.graph.set_selected(id, true)
    }

    pub fn deselect(&mut self, id: NodeId) -> Result<()> {
        self.graph.set_selected(id, false)
    }

    pub fn select_all(&mut self) {
        for id in self.graph.node_ids() {
            let _ = self.graph.set_selected(id, true);
        }
    }

    pub fn clear_selection(&mut self) {
        self.graph.clear_selection();
    }

    pub fn selected(&self) -> Vec<NodeId> {
        self.graph.selected()
    }

    /// Move the selection to the nearest node in `direction` from the first
    /// selected node. Returns the newly selected node, if any.
    pub fn navigate(&mut self, direction: Direction) -> Option<NodeId> {
        let current = *self.graph.selected().first()?;
        let from = self.graph.position(current)?;
        let next = self
            .graph
            .nodes()
            .filter(|n| n.id != current)
            .filter(|n| {
                let (dx, dy) = (n.position.x - from.x, n.position.y - from.y);
                match direction {
                    Direction::Up => dy < 0.0,
                    Direction::Down => dy > 0.0,
                    Direction::Left => dx < 0.0,
                    Direction::Right => dx > 0.0,
                }
            })
            .min_by(|a, b| a.position.distance(&from).total_cmp(&b.position.distance(&from)))
            .map(|n| n.id)?;

        self.graph.clear_selection();
        let _ = self.graph.set_selected(next, true);
        Some(next)
    }

    // ------------------------------------------------------------------
    // Pointer input
    // ------------------------------------------------------------------

    /// Press at `p`. With Shift the press arms or completes a connection;
    /// without it, it starts dragging the node's subtree (or the whole
    /// selection when several nodes are selected). Returns the node hit.
    pub fn pointer_press(&mut self, p: PointF, shift: bool) -> Result<Option<NodeId>> {
        self.settle();
        let hit = self.node_at(p);

        if shift {
            let Some(hit) = hit else {
                self.disarm_connect();
                return Ok(None);
            };
            match self.pending_connect {
                None => {
                    debug!("editor: {:?} armed as connection source", hit);
                    self.pending_connect = Some(hit);
                    self.graph.set_selected(hit, true)?;
                }
                Some(source) => {
                    self.disarm_connect();
                    if source != hit {
                        self.connect(source, hit)?;
                    }
                }
            }
            return Ok(Some(hit));
        }

        let Some(hit) = hit else {
            self.graph.clear_selection();
            self.pending_connect = None;
            return Ok(None);
        };

        let selected = self.graph.selected();
        if selected.len() > 1 && selected.contains(&hit) {
            let origin = selected
                .iter()
                .filter_map(|nid| self.graph.position(*nid).map(|p| (*nid, p)))
                .collect();
            self.multi = Some(MultiMove { press: p, origin });
        } else {
            self.graph.clear_selection();
            self.graph.set_selected(hit, true)?;
            self.drag.press(&self.graph, hit, p, false);
        }
        Ok(Some(hit))
    }

    pub fn pointer_move(&mut self, p: PointF) {
        if self.drag.is_dragging() {
            self.drag.drag_move(&mut self.graph, p);
        } else if let Some(multi) = &self.multi {
            let (dx, dy) = (p.x - multi.press.x, p.y - multi.press.y);
            for (nid, origin) in &multi.origin {
                let _ = self.graph.set_position(*nid, origin.offset(dx, dy));
            }
        }
    }

    pub fn pointer_release(&mut self, p: PointF) -> Result<Gesture> {
        if let Some(multi) = self.multi.take() {
            let (dx, dy) = (p.x - multi.press.x, p.y - multi.press.y);
            for (nid, origin) in &multi.origin {
                let _ = self.graph.set_position(*nid, *origin);
            }
            if dx.hypot(dy) < self.config.click_threshold {
                return Ok(Gesture::Click);
            }
            let moves = multi
                .origin
                .iter()
                .map(|(id, from)| NodeMove { id: *id, from: *from, to: from.offset(dx, dy) })
                .collect();
            self.push(Command::MoveMultipleNodes { moves })?;
            return Ok(Gesture::Committed("Move nodes"));
        }

        if !self.drag.is_dragging() {
            return Ok(Gesture::Idle);
        }
        match self.drag.release(&mut self.graph, p, &self.config) {
            DragOutcome::Click => Ok(Gesture::Click),
            DragOutcome::RolledBack => Ok(Gesture::RolledBack),
            DragOutcome::Committed(command) => {
                let label = command.label();
                self.push(command)?;
                Ok(Gesture::Committed(label))
            }
        }
    }

    /// Clear a pending connection, abandon a gesture and stop the animation.
    pub fn escape(&mut self) {
        self.disarm_connect();
        self.settle();
    }

    // ------------------------------------------------------------------
    // Attraction mode
    // ------------------------------------------------------------------

    pub fn attraction_active(&self) -> bool {
        self.attraction.is_active()
    }

    pub fn start_attraction(&mut self) {
        self.cancel_gestures();
        self.attraction.start(&self.graph);
    }

    pub fn tick_attraction(&mut self) {
        self.attraction.tick(&mut self.graph);
    }

    pub fn stop_attraction(&mut self) {
        self.attraction.stop(&mut self.graph);
    }

    pub fn toggle_attraction(&mut self) -> bool {
        if self.attraction.is_active() {
            self.stop_attraction();
        } else {
            self.start_attraction();
        }
        self.attraction.is_active()
    }

    // ------------------------------------------------------------------
    // Documents
    // ------------------------------------------------------------------

    /// Replace the map with `json`. On any error the current map is kept.
    /// Returns the number of skipped edges.
    pub fn import_json(&mut self, json: &str) -> Result<usize> {
        let imported = document::import_json(json, &self.config)?;
        self.drag = DragController::new();
        self.multi = None;
        self.attraction.discard();
        self.pending_connect = None;
        self.graph = imported.graph;
        self.history.clear();
        info!("editor: imported {} nodes", self.graph.node_count());
        Ok(imported.skipped_edges)
    }

    pub fn export_json(&mut self) -> Result<String> {
        self.settle();
        document::export_json(&self.graph).map_err(EditError::Export)
    }

    /// Snapshot of the map and editor state for the host.
    pub fn scene(&self) -> SceneOutput {
        SceneOutput {
            can_undo: self.history.can_undo(),
            can_redo: self.history.can_redo(),
            undo_label: self.history.undo_label(),
            redo_label: self.history.redo_label(),
            pending_connect: self.pending_connect.map(|n| n.0),
            attraction: self.attraction.is_active(),
            ..SceneOutput::from_graph(&self.graph)
        }
    }
}
