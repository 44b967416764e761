// Tree queries over the directed edge set.
//
// Edges point parent -> child. "Children" are the targets of a node's
// outgoing edges, "parent" is the source of its first incoming edge. The
// graph is not required to be a tree, so every walk carries a visited set.
//
// Used to:
// 1. Find a subtree to move as one block (drag, push-down)
// 2. Find siblings for lane insertion
// 3. Assign BFS generations for alignment

use std::collections::{BTreeMap, HashSet, VecDeque};

use super::{MindMap, NodeId};

impl MindMap {
    /// Targets of `id`'s outgoing edges, in attach order.
    pub fn children_of(&self, id: NodeId) -> Vec<NodeId> {
        let Some(node) = self.node(id) else { return Vec::new() };
        node.edges()
            .iter()
            .filter(|(eid, _)| self.edge(*eid).is_some_and(|e| e.source == id))
            .map(|(_, other)| *other)
            .collect()
    }

    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        let node = self.node(id)?;
        node.edges()
            .iter()
            .find(|(eid, _)| self.edge(*eid).is_some_and(|e| e.target == id))
            .map(|(_, other)| *other)
    }

    pub fn has_children(&self, id: NodeId) -> bool {
        self.node(id).is_some_and(|n| {
            n.edges().iter().any(|(eid, _)| self.edge(*eid).is_some_and(|e| e.source == id))
        })
    }

    /// Every node reachable through child edges, excluding `root` itself.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut seen: HashSet<NodeId> = HashSet::from([root]);
        let mut queue: VecDeque<NodeId> = VecDeque::from([root]);
        while let Some(nid) = queue.pop_front() {
            for child in self.children_of(nid) {
                if seen.insert(child) {
                    out.push(child);
                    queue.push_back(child);
                }
            }
        }
        out
    }

    /// `root` followed by its descendants.
    pub fn subtree(&self, root: NodeId) -> Vec<NodeId> {
        if !self.contains_node(root) {
            return Vec::new();
        }
        let mut out = vec![root];
        out.extend(self.descendants(root));
        out
    }

    /// Parent chain of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut seen: HashSet<NodeId> = HashSet::from([id]);
        let mut cur = id;
        while let Some(p) = self.parent_of(cur) {
            if !seen.insert(p) {
                break;
            }
            out.push(p);
            cur = p;
        }
        out
    }

    /// Other children of `id`'s parent.
    pub fn siblings_of(&self, id: NodeId) -> Vec<NodeId> {
        match self.parent_of(id) {
            Some(p) => self.children_of(p).into_iter().filter(|c| *c != id).collect(),
            None => Vec::new(),
        }
    }

    /// The conceptual map root: the node with the smallest center X.
    /// Ties go to the lowest id so the choice is stable.
    pub fn center_node(&self) -> Option<NodeId> {
        self.nodes()
            .min_by(|a, b| a.position.x.total_cmp(&b.position.x).then(a.id.cmp(&b.id)))
            .map(|n| n.id)
    }

    /// BFS depth from `start`, walking edges in both directions.
    pub fn generations_from(&self, start: NodeId) -> BTreeMap<NodeId, usize> {
        let mut levels = BTreeMap::new();
        if !self.contains_node(start) {
            return levels;
        }
        levels.insert(start, 0);
        let mut queue = VecDeque::from([start]);
        while let Some(nid) = queue.pop_front() {
            let level = levels[&nid];
            let Some(node) = self.node(nid) else { continue };
            for (_, other) in node.edges() {
                if !levels.contains_key(other) {
                    levels.insert(*other, level + 1);
                    queue.push_back(*other);
                }
            }
        }
        levels
    }

    /// Nodes sharing `id`'s generation (from the center node) that lie
    /// strictly right of it. Empty when `id` is not reachable from the center.
    pub fn related_same_generation(&self, id: NodeId) -> Vec<NodeId> {
        let Some(center) = self.center_node() else { return Vec::new() };
        let levels = self.generations_from(center);
        let (Some(&level), Some(x)) = (levels.get(&id), self.position(id).map(|p| p.x)) else {
            return Vec::new();
        };
        levels
            .iter()
            .filter(|(nid, l)| **l == level && **nid != id)
            .filter(|(nid, _)| self.position(**nid).is_some_and(|p| p.x > x))
            .map(|(nid, _)| *nid)
            .collect()
    }
}
