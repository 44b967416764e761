//! Linear undo/redo history

use log::{debug, warn};

use crate::error::{EditError, Result};
use crate::model::MindMap;
use super::Command;

/// Bounded undo and redo stacks over `Command`s.
///
/// `push` applies the command before recording it, so callers hand over a
/// fully prepared command and never mutate the graph themselves.
#[derive(Debug, Clone)]
pub struct History {
    /// Commands that can be undone, oldest first
    undo_stack: Vec<Command>,
    /// Commands that can be redone, most recently undone last
    redo_stack: Vec<Command>,
    /// Maximum number of undo entries
    max_entries: usize,
}

impl History {
    pub fn new() -> Self {
        Self::with_limit(100)
    }

    pub fn with_limit(max_entries: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_entries: max_entries.max(1),
        }
    }

    /// Apply `command` and record it. On failure nothing is recorded.
    pub fn push(&mut self, graph: &mut MindMap, command: Command) -> Result<()> {
        if let Err(e) = command.apply(graph) {
            warn!("history: {} failed: {e}", command.label());
            return Err(e);
        }
        debug!("history: {}", command.label());

        // Clear redo stack on new command
        self.redo_stack.clear();
        self.undo_stack.push(command);

        // Enforce max entries
        while self.undo_stack.len() > self.max_entries {
            self.undo_stack.remove(0);
        }
        Ok(())
    }

    /// Revert the newest command. If reverting fails the command stays on
    /// the undo stack and the graph is left as it was.
    pub fn undo(&mut self, graph: &mut MindMap) -> Result<&Command> {
        let command = self.undo_stack.last().ok_or(EditError::UndoStackEmpty)?;
        if let Err(e) = command.revert(graph) {
            warn!("history: undo {} failed: {e}", command.label());
            return Err(e);
        }
        let command = self.undo_stack.pop().ok_or(EditError::UndoStackEmpty)?;
        self.redo_stack.push(command);
        self.redo_stack.last().ok_or(EditError::RedoStackEmpty)
    }

    /// Re-apply the most recently undone command.
    pub fn redo(&mut self, graph: &mut MindMap) -> Result<&Command> {
        let command = self.redo_stack.last().ok_or(EditError::RedoStackEmpty)?;
        if let Err(e) = command.apply(graph) {
            warn!("history: redo {} failed: {e}", command.label());
            return Err(e);
        }
        let command = self.redo_stack.pop().ok_or(EditError::RedoStackEmpty)?;
        self.undo_stack.push(command);
        self.undo_stack.last().ok_or(EditError::UndoStackEmpty)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    /// Label of the command `undo` would revert.
    pub fn undo_label(&self) -> Option<&'static str> {
        self.undo_stack.last().map(Command::label)
    }

    pub fn redo_label(&self) -> Option<&'static str> {
        self.redo_stack.last().map(Command::label)
    }

    /// Clear all undo/redo history
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::PointF;
    use crate::model::NodeId;

    fn move_cmd(id: NodeId, from: f64, to: f64) -> Command {
        Command::MoveNode { id, from: PointF::new(0.0, from), to: PointF::new(0.0, to) }
    }

    #[test]
    fn test_push_undo_redo() {
        let mut g = MindMap::default();
        let a = g.add_node("a", PointF::new(0.0, 0.0));
        let mut h = History::new();

        h.push(&mut g, move_cmd(a, 0.0, 10.0)).unwrap();
        h.push(&mut g, move_cmd(a, 10.0, 20.0)).unwrap();
        assert_eq!(g.position(a).unwrap().y, 20.0);

        h.undo(&mut g).unwrap();
        assert_eq!(g.position(a).unwrap().y, 10.0);
        assert!(h.can_redo());
        h.redo(&mut g).unwrap();
        assert_eq!(g.position(a).unwrap().y, 20.0);

        h.undo(&mut g).unwrap();
        h.push(&mut g, move_cmd(a, 10.0, 50.0)).unwrap();
        assert!(!h.can_redo());
    }

    #[test]
    fn test_empty_stacks() {
        let mut g = MindMap::default();
        let mut h = History::new();
        assert!(matches!(h.undo(&mut g), Err(EditError::UndoStackEmpty)));
        assert!(matches!(h.redo(&mut g), Err(EditError::RedoStackEmpty)));
    }

    #[test]
    fn test_limit_drops_oldest() {
        let mut g = MindMap::default();
        let a = g.add_node("a", PointF::new(0.0, 0.0));
        let mut h = History::with_limit(2);
        for i in 0..5 {
            h.push(&mut g, move_cmd(a, i as f64, (i + 1) as f64)).unwrap();
        }
        assert_eq!(h.undo_len(), 2);
        h.undo(&mut g).unwrap();
        h.undo(&mut g).unwrap();
        assert_eq!(g.position(a).unwrap().y, 3.0);
        assert!(!h.can_undo());
    }

    #[test]
    fn test_failed_undo_keeps_entry() {
        let mut g = MindMap::default();
        let a = g.add_node("a", PointF::new(0.0, 0.0));
        let mut h = History::new();
        h.push(&mut g, move_cmd(a, 0.0, 10.0)).unwrap();
        g.remove_node(a).unwrap();
        assert!(h.undo(&mut g).is_err());
        assert!(h.can_undo());
        assert_eq!(h.undo_label(), Some("Move node"));
    }

    #[test]
    fn test_failed_push_records_nothing() {
        let mut g = MindMap::default();
        let mut h = History::new();
        assert!(h.push(&mut g, move_cmd(NodeId(7), 0.0, 1.0)).is_err());
        assert!(!h.can_undo());
    }
}
