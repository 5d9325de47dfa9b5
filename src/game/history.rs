//! Game history as an append-only arena of nodes.
//!
//! Each node holds the position after its action. The root holds the start
//! position and an empty action. Nodes are never removed, so `NodeId`s stay
//! valid for the lifetime of the history.

use crate::game_state::chess_move::Action;
use crate::game_state::position::Position;

pub type NodeId = usize;

#[derive(Debug, Clone)]
pub struct HistoryNode {
    pub parent: Option<NodeId>,
    pub action: Action,
    pub position: Position,
    pub children: Vec<NodeId>,
    pub comments: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct History {
    nodes: Vec<HistoryNode>,
    cursor: NodeId,
    /// Children left by `undo`, most recent last.
    redo_trail: Vec<NodeId>,
}

impl History {
    pub const ROOT: NodeId = 0;

    pub fn new(root: Position) -> Self {
        Self {
            nodes: vec![HistoryNode {
                parent: None,
                action: Action::new(),
                position: root,
                children: Vec::new(),
                comments: Vec::new(),
            }],
            cursor: Self::ROOT,
            redo_trail: Vec::new(),
        }
    }

    #[inline]
    pub fn cursor(&self) -> NodeId {
        self.cursor
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Option<&HistoryNode> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut HistoryNode> {
        self.nodes.get_mut(id)
    }

    pub fn current(&self) -> &HistoryNode {
        &self.nodes[self.cursor]
    }

    pub fn current_mut(&mut self) -> &mut HistoryNode {
        &mut self.nodes[self.cursor]
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id).map_or(&[], |n| n.children.as_slice())
    }

    /// Record `action` (leading to `position`) below `parent`. An existing
    /// child with an identical action is reused.
    pub fn add_child(&mut self, parent: NodeId, action: Action, position: Position) -> NodeId {
        if let Some(existing) = self
            .children(parent)
            .iter()
            .copied()
            .find(|c| self.nodes[*c].action == action)
        {
            return existing;
        }
        let id = self.nodes.len();
        self.nodes.push(HistoryNode {
            parent: Some(parent),
            action,
            position,
            children: Vec::new(),
            comments: Vec::new(),
        });
        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.push(id);
        }
        id
    }

    /// Move the cursor to an arbitrary node; forgets the redo trail.
    pub fn set_cursor(&mut self, id: NodeId) -> bool {
        if id >= self.nodes.len() {
            return false;
        }
        self.cursor = id;
        self.redo_trail.clear();
        true
    }

    pub fn visit_parent(&mut self) -> bool {
        match self.current().parent {
            Some(parent) => self.set_cursor(parent),
            None => false,
        }
    }

    pub fn visit_child(&mut self, index: usize) -> bool {
        match self.current().children.get(index).copied() {
            Some(child) => self.set_cursor(child),
            None => false,
        }
    }

    #[inline]
    pub fn can_undo(&self) -> bool {
        self.current().parent.is_some()
    }

    #[inline]
    pub fn can_redo(&self) -> bool {
        !self.current().children.is_empty()
    }

    /// Step to the parent, remembering where we came from.
    pub fn undo(&mut self) -> bool {
        let Some(parent) = self.current().parent else {
            return false;
        };
        self.redo_trail.push(self.cursor);
        self.cursor = parent;
        true
    }

    /// Step back down to the child left by `undo`, or else to the last child.
    pub fn redo(&mut self) -> bool {
        let remembered = self
            .redo_trail
            .last()
            .copied()
            .filter(|c| self.nodes[*c].parent == Some(self.cursor));
        let target = match remembered {
            Some(child) => {
                self.redo_trail.pop();
                child
            }
            None => {
                self.redo_trail.clear();
                match self.current().children.last() {
                    Some(child) => *child,
                    None => return false,
                }
            }
        };
        self.cursor = target;
        true
    }

    /// Ids from the root down to `id`, inclusive.
    pub fn path_to(&self, id: NodeId) -> Vec<NodeId> {
        let mut path = Vec::new();
        let mut at = Some(id);
        while let Some(node) = at.filter(|n| *n < self.nodes.len()) {
            path.push(node);
            at = self.nodes[node].parent;
        }
        path.reverse();
        path
    }

    /// Whether the subtree under `a` matches the subtree of `other` under
    /// `b`: same actions, comments and positions, children in the same order.
    pub fn same_subtree(&self, a: NodeId, other: &History, b: NodeId) -> bool {
        let (Some(x), Some(y)) = (self.node(a), other.node(b)) else {
            return false;
        };
        x.action == y.action
            && x.comments == y.comments
            && x.position == y.position
            && x.children.len() == y.children.len()
            && x
                .children
                .iter()
                .zip(&y.children)
                .all(|(ca, cb)| self.same_subtree(*ca, other, *cb))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_state::variants::builtin_position;
    use crate::move_generation::action_enumerator::legal_children;

    fn grown() -> (History, Vec<(Action, Position)>) {
        let root = builtin_position("Very Small - Open").expect("variant");
        let children = legal_children(&root);
        let mut history = History::new(root);
        for (action, pos) in children.iter().take(2) {
            history.add_child(History::ROOT, action.clone(), pos.clone());
        }
        (history, children)
    }

    #[test]
    fn identical_actions_reuse_nodes() {
        let (mut history, children) = grown();
        assert_eq!(history.len(), 3);
        let (action, pos) = children[0].clone();
        assert_eq!(history.add_child(History::ROOT, action, pos), 1);
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn navigation_stays_in_bounds() {
        let (mut history, _) = grown();
        assert!(!history.visit_parent());
        assert!(!history.can_undo());
        assert!(!history.visit_child(5));
        assert!(history.visit_child(0));
        assert_eq!(history.cursor(), 1);
        assert!(history.visit_parent());
        assert_eq!(history.cursor(), History::ROOT);
    }

    #[test]
    fn redo_returns_to_remembered_child() {
        let (mut history, _) = grown();
        assert!(history.visit_child(0));
        assert!(history.undo());
        assert!(history.redo());
        assert_eq!(history.cursor(), 1);

        assert!(history.visit_parent());
        // Nothing remembered after explicit navigation: last child wins.
        assert!(history.redo());
        assert_eq!(history.cursor(), 2);
        assert!(!history.redo());
        assert_eq!(history.path_to(2), vec![0, 2]);
    }
}
