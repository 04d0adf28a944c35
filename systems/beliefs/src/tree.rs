//! Arena-backed hypothesis tree.

use std::collections::BTreeMap;

use maze_bot_core::Contradiction;
use maze_bot_field::FieldState;

/// Stable handle of a node inside one [`Tree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Hypothesis together with its place in the tree.
#[derive(Clone, Debug)]
pub struct Node {
    state: FieldState,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    compatibility: BTreeMap<String, bool>,
    real_spawn: bool,
}

impl Node {
    /// Hypothesis held by the node.
    #[must_use]
    pub const fn state(&self) -> &FieldState {
        &self.state
    }

    /// Mutable access to the hypothesis.
    pub fn state_mut(&mut self) -> &mut FieldState {
        &mut self.state
    }

    /// Parent handle; only the root has none.
    #[must_use]
    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Handles of the generated successors.
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Reports whether the node has no successors.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Reports whether the node descends from the true spawn.
    #[must_use]
    pub const fn is_real_spawn(&self) -> bool {
        self.real_spawn
    }

    /// Reports whether `player` still considers the node possible.
    #[must_use]
    pub fn is_compatible_with(&self, player: &str) -> bool {
        self.compatibility.get(player).copied().unwrap_or(false)
    }

    /// Records whether `player` considers the node possible.
    pub fn set_compatibility(&mut self, player: &str, compatible: bool) {
        if let Some(flag) = self.compatibility.get_mut(player) {
            *flag = compatible;
        }
    }

    /// Fails when no other player supports the node and it is not the real spawn.
    pub fn check_compatibility(&self) -> Result<(), Contradiction> {
        if self.real_spawn
            || self.compatibility.is_empty()
            || self.compatibility.values().any(|flag| *flag)
        {
            Ok(())
        } else {
            Err(Contradiction::Incompatible)
        }
    }
}

/// Tree of hypotheses whose leaves form a player's current belief.
///
/// Nodes live in an arena and refer to each other by [`NodeId`]. Parent
/// links are only used to cascade removals upward.
#[derive(Clone, Debug)]
pub struct Tree {
    slots: Vec<Option<Node>>,
    free: Vec<NodeId>,
    root: NodeId,
}

impl Tree {
    /// Creates a tree whose root holds `state`.
    ///
    /// `others` lists the players whose compatibility every node tracks;
    /// every flag starts out set.
    #[must_use]
    pub fn new<I, S>(state: FieldState, others: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let root = Node {
            state,
            parent: None,
            children: Vec::new(),
            compatibility: others.into_iter().map(|name| (name.into(), true)).collect(),
            real_spawn: true,
        };
        Self {
            slots: vec![Some(root)],
            free: Vec::new(),
            root: NodeId(0),
        }
    }

    /// Handle of the root.
    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    /// Number of live nodes, root included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Reports whether only the root remains.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.node(self.root).map_or(true, Node::is_leaf)
    }

    /// Node behind a handle, if it is still alive.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.slots.get(id.index()).and_then(Option::as_ref)
    }

    /// Mutable node behind a handle, if it is still alive.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots.get_mut(id.index()).and_then(Option::as_mut)
    }

    /// Appends a successor inheriting the parent's flags.
    pub fn add_child(&mut self, parent: NodeId, state: FieldState) -> Option<NodeId> {
        let real_spawn = self.node(parent)?.real_spawn;
        self.add_child_with_spawn(parent, state, real_spawn)
    }

    /// Appends a successor with an explicit real-spawn flag.
    pub fn add_child_with_spawn(
        &mut self,
        parent: NodeId,
        state: FieldState,
        real_spawn: bool,
    ) -> Option<NodeId> {
        let compatibility = self.node(parent)?.compatibility.clone();
        let node = Node {
            state,
            parent: Some(parent),
            children: Vec::new(),
            compatibility,
            real_spawn,
        };
        let id = self.alloc(node);
        self.node_mut(parent)?.children.push(id);
        Some(id)
    }

    /// Removes a node with its subtree, then every ancestor left without
    /// successors. The root is never removed.
    pub fn remove(&mut self, id: NodeId) {
        let mut current = id;
        while current != self.root {
            let Some(parent) = self.node(current).and_then(Node::parent) else {
                return;
            };
            self.release_subtree(current);
            let Some(parent_node) = self.node_mut(parent) else {
                return;
            };
            parent_node.children.retain(|child| *child != current);
            if !parent_node.children.is_empty() {
                return;
            }
            current = parent;
        }
    }

    /// Every leaf in depth-first order. An empty tree has no leaves.
    #[must_use]
    pub fn leaves(&self) -> Vec<NodeId> {
        self.collect_leaves(|_| true)
    }

    /// Leaves reachable only through real-spawn nodes.
    #[must_use]
    pub fn real_spawn_leaves(&self) -> Vec<NodeId> {
        self.collect_leaves(Node::is_real_spawn)
    }

    /// Leaves reachable only through nodes `player` considers possible.
    #[must_use]
    pub fn compatible_leaves(&self, player: &str) -> Vec<NodeId> {
        self.collect_leaves(|node| node.is_compatible_with(player))
    }

    fn collect_leaves<F>(&self, descend: F) -> Vec<NodeId>
    where
        F: Fn(&Node) -> bool,
    {
        let mut leaves = Vec::new();
        let Some(root) = self.node(self.root) else {
            return leaves;
        };
        let mut stack: Vec<NodeId> = root.children.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let Some(node) = self.node(id) else {
                continue;
            };
            if !descend(node) {
                continue;
            }
            if node.is_leaf() {
                leaves.push(id);
            } else {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        leaves
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        if let Some(id) = self.free.pop() {
            self.slots[id.index()] = Some(node);
            return id;
        }
        let id = NodeId(u32::try_from(self.slots.len()).unwrap_or(u32::MAX));
        self.slots.push(Some(node));
        id
    }

    fn release_subtree(&mut self, id: NodeId) {
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            if let Some(node) = self.slots.get_mut(current.index()).and_then(Option::take) {
                pending.extend(node.children);
                self.free.push(current);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maze_bot_core::{CellType, Position};
    use maze_bot_field::{Cell, Grid};

    fn state_at(x: i32) -> FieldState {
        let mut state = FieldState::new(
            Grid::filled(4, 4, Cell::unknown()),
            ["alice"],
            BTreeMap::<CellType, u32>::new(),
        );
        state.set_player_position("alice", Position::new(x, 1));
        state
    }

    #[test]
    fn removal_cascades_to_childless_ancestors() {
        let mut tree = Tree::new(state_at(0), ["bob"]);
        let root = tree.root();
        let spawn = tree.add_child(root, state_at(1)).expect("root alive");
        let sibling = tree.add_child(root, state_at(2)).expect("root alive");
        let leaf = tree.add_child(spawn, state_at(3)).expect("spawn alive");

        tree.remove(leaf);

        assert!(tree.node(spawn).is_none(), "childless parent must go too");
        assert_eq!(tree.leaves(), vec![sibling]);
        assert_eq!(tree.len(), 2);

        tree.remove(sibling);
        assert!(tree.is_empty());
        assert!(tree.leaves().is_empty(), "the root is never a leaf");
        assert!(tree.node(root).is_some());
    }

    #[test]
    fn released_slots_are_reused() {
        let mut tree = Tree::new(state_at(0), ["bob"]);
        let root = tree.root();
        let first = tree.add_child(root, state_at(1)).expect("root alive");
        let _ = tree.add_child(root, state_at(2)).expect("root alive");
        tree.remove(first);
        let reused = tree.add_child(root, state_at(3)).expect("root alive");
        assert_eq!(reused, first);
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn traversal_only_descends_through_flagged_nodes() {
        let mut tree = Tree::new(state_at(0), ["bob"]);
        let root = tree.root();
        let real = tree
            .add_child_with_spawn(root, state_at(1), true)
            .expect("root alive");
        let fake = tree
            .add_child_with_spawn(root, state_at(2), false)
            .expect("root alive");
        let nested = tree.add_child(fake, state_at(3)).expect("fake alive");
        tree.node_mut(real)
            .expect("real alive")
            .set_compatibility("bob", false);

        assert_eq!(tree.leaves(), vec![real, nested]);
        assert_eq!(tree.real_spawn_leaves(), vec![real]);
        assert_eq!(tree.compatible_leaves("bob"), vec![nested]);
    }

    #[test]
    fn unsupported_fake_spawn_is_incompatible() {
        let mut tree = Tree::new(state_at(0), ["bob"]);
        let root = tree.root();
        let fake = tree
            .add_child_with_spawn(root, state_at(1), false)
            .expect("root alive");
        let node = tree.node_mut(fake).expect("alive");
        assert_eq!(node.check_compatibility(), Ok(()));
        node.set_compatibility("bob", false);
        assert_eq!(node.check_compatibility(), Err(Contradiction::Incompatible));
    }
}
