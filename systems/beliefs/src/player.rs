use std::collections::BTreeMap;

use maze_bot_core::{Abilities, CellType, Contradiction, Position, TurnAction, TurnResponse};
use maze_bot_field::{CommonData, FieldState, Transition};
use tracing::{debug, trace, warn};

use crate::{NodeId, PlayerStats, Tree};

/// Everything one tracked player could know about the game.
#[derive(Clone, Debug)]
pub struct PlayerState {
    name: String,
    tree: Tree,
    stats: PlayerStats,
}

impl PlayerState {
    /// Wraps a starting tree.
    #[must_use]
    pub fn new(name: impl Into<String>, tree: Tree, stats: PlayerStats) -> Self {
        Self {
            name: name.into(),
            tree,
            stats,
        }
    }

    /// Name of the tracked player.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Hypothesis tree of the player.
    #[must_use]
    pub const fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Mutable hypothesis tree of the player.
    pub fn tree_mut(&mut self) -> &mut Tree {
        &mut self.tree
    }

    /// Resources of the player.
    #[must_use]
    pub const fn stats(&self) -> &PlayerStats {
        &self.stats
    }

    /// Mutable resources of the player.
    pub fn stats_mut(&mut self) -> &mut PlayerStats {
        &mut self.stats
    }

    /// Records the treasure the acting player may stand on in every leaf.
    pub fn preprocess_turn(&mut self, common: &CommonData, acting: &str, abilities: &Abilities) {
        for id in self.tree.leaves() {
            let outcome = match self.tree.node_mut(id) {
                Some(node) => node.state_mut().preprocess(common, acting, abilities),
                None => continue,
            };
            if let Err(reason) = outcome {
                self.prune(id, reason);
            }
        }
    }

    /// Applies one reported turn to every leaf some other player still supports.
    pub fn process_turn(
        &mut self,
        common: &CommonData,
        acting: &str,
        action: TurnAction,
        response: &TurnResponse,
    ) {
        let leaves = self.tree.leaves();
        let before = leaves.len();
        for id in leaves.into_iter().rev() {
            let Some(node) = self.tree.node_mut(id) else {
                continue;
            };
            let outcome = node.check_compatibility().and_then(|()| {
                node.state_mut()
                    .process_action(common, acting, action, response)
            });
            match outcome {
                Ok(Transition::Updated) => {}
                Ok(Transition::Branched(successors)) => {
                    for successor in successors {
                        let _ = self.tree.add_child(id, successor);
                    }
                }
                Err(reason) => self.prune(id, reason),
            }
        }
        debug!(
            player = %self.name,
            acting,
            ?action,
            before,
            after = self.tree.leaves().len(),
            "processed turn"
        );
        if self.tree.real_spawn_leaves().is_empty() {
            warn!(player = %self.name, "no real-spawn hypothesis left");
        }
    }

    /// Lets rivers carry treasures downstream in every leaf.
    pub fn process_host_turn(&mut self) {
        for id in self.tree.leaves() {
            if let Some(node) = self.tree.node_mut(id) {
                node.state_mut().make_host_turn();
            }
        }
    }

    /// Every leaf of the tree.
    #[must_use]
    pub fn leaves(&self) -> Vec<NodeId> {
        self.tree.leaves()
    }

    /// Leaves descending from the real spawn.
    #[must_use]
    pub fn real_spawn_leaves(&self) -> Vec<NodeId> {
        self.tree.real_spawn_leaves()
    }

    /// Leaves `target` still considers possible.
    #[must_use]
    pub fn compatible_leaves(&self, target: &str) -> Vec<NodeId> {
        self.tree.compatible_leaves(target)
    }

    /// Hypotheses of the real-spawn leaves.
    #[must_use]
    pub fn real_spawn_states(&self) -> Vec<&FieldState> {
        self.states(self.tree.real_spawn_leaves())
    }

    /// Up to `limit` leaf hypotheses together with the total number of leaves.
    #[must_use]
    pub fn leaves_snapshot(&self, limit: usize) -> (Vec<&FieldState>, usize) {
        let leaves = self.tree.leaves();
        let total = leaves.len();
        let shown = leaves.into_iter().take(limit).collect();
        (self.states(shown), total)
    }

    /// Most frequent cell type of every tile across the real-spawn leaves.
    ///
    /// Ties resolve to the type that sorts first.
    #[must_use]
    pub fn consensus(&self) -> BTreeMap<Position, CellType> {
        let mut votes: BTreeMap<Position, BTreeMap<CellType, usize>> = BTreeMap::new();
        for state in self.real_spawn_states() {
            for (position, cell) in state.grid().iter() {
                *votes
                    .entry(position)
                    .or_default()
                    .entry(cell.kind().cell_type())
                    .or_default() += 1;
            }
        }
        votes
            .into_iter()
            .filter_map(|(position, counts)| {
                let mut best: Option<(CellType, usize)> = None;
                for (cell_type, count) in counts {
                    if best.map_or(true, |(_, top)| count > top) {
                        best = Some((cell_type, count));
                    }
                }
                best.map(|(cell_type, _)| (position, cell_type))
            })
            .collect()
    }

    pub(crate) fn prune(&mut self, id: NodeId, reason: Contradiction) {
        trace!(player = %self.name, ?id, %reason, "pruning hypothesis");
        self.tree.remove(id);
    }

    fn states(&self, ids: Vec<NodeId>) -> Vec<&FieldState> {
        ids.into_iter()
            .filter_map(|id| self.tree.node(id))
            .map(|node| node.state())
            .collect()
    }
}
