//! Cross-player consistency of the hypothesis trees.

use std::collections::BTreeMap;

use maze_bot_core::{CellKind, CellType, Contradiction, Position};
use maze_bot_field::{Cell, CommonData, FieldState, Grid, RiverFlow};
use tracing::{debug, trace};

use crate::{NodeId, PlayerState};

/// Default number of candidates above which matching stops merging.
pub const MAX_MATCHABLE_NODES: usize = 8;

/// Keeps a player's real-spawn leaves consistent with what every other
/// player may believe.
///
/// A leaf survives only when, for every other player, it either already
/// knows that player's position or matches at least one of that player's
/// leaves. Small candidate sets are merged into the leaf eagerly; large ones
/// only mark the candidates as compatible.
#[derive(Clone, Debug)]
pub struct LeavesMatcher {
    unique_objects: BTreeMap<CellType, u32>,
    max_matchable: usize,
}

/// Intermediate result of matching one leaf.
enum Candidate {
    Leaf,
    Merged(FieldState),
}

impl Candidate {
    fn state<'a>(&'a self, leaf: &'a FieldState) -> &'a FieldState {
        match self {
            Self::Leaf => leaf,
            Self::Merged(state) => state,
        }
    }
}

/// Leaves of one other player the active player's leaves are matched against.
struct Pool<'a> {
    name: &'a str,
    leaves: Vec<(NodeId, &'a FieldState)>,
}

impl LeavesMatcher {
    /// Matcher budgeting unique rooms against `unique_objects`.
    #[must_use]
    pub fn new(unique_objects: BTreeMap<CellType, u32>) -> Self {
        Self {
            unique_objects,
            max_matchable: MAX_MATCHABLE_NODES,
        }
    }

    /// Overrides the candidate count above which merging is deferred.
    #[must_use]
    pub fn with_max_matchable(mut self, max_matchable: usize) -> Self {
        self.max_matchable = max_matchable;
        self
    }

    /// Candidate count above which merging is deferred.
    #[must_use]
    pub const fn max_matchable(&self) -> usize {
        self.max_matchable
    }

    /// Matches every real-spawn leaf of `active` against the other players.
    ///
    /// Leaves without a match are removed. Other players' leaves end up
    /// flagged compatible with `active` exactly when some leaf matched them.
    pub fn match_real_spawn_leaves(
        &self,
        common: &CommonData,
        players: &mut BTreeMap<String, PlayerState>,
        active: &str,
    ) {
        let Some(mut player) = players.remove(active) else {
            return;
        };
        if !players.is_empty() {
            self.match_player(common, &mut player, players);
        }
        let _ = players.insert(active.to_owned(), player);
    }

    fn match_player(
        &self,
        common: &CommonData,
        player: &mut PlayerState,
        others: &mut BTreeMap<String, PlayerState>,
    ) {
        let active = player.name().to_owned();
        let mut supported: BTreeMap<String, Vec<NodeId>> = BTreeMap::new();
        for (name, other) in others.iter_mut() {
            let leaves = other.compatible_leaves(&active);
            for &id in &leaves {
                if let Some(node) = other.tree_mut().node_mut(id) {
                    node.set_compatibility(&active, false);
                }
            }
            let _ = supported.insert(name.clone(), leaves);
        }

        let mut marks: Vec<(String, NodeId)> = Vec::new();
        let mut outcomes = Vec::new();
        {
            let pools: Vec<Pool<'_>> = others
                .iter()
                .map(|(name, other)| Pool {
                    name,
                    leaves: supported
                        .get(name)
                        .into_iter()
                        .flatten()
                        .filter_map(|&id| other.tree().node(id).map(|node| (id, node.state())))
                        .collect(),
                })
                .collect();
            for id in player.real_spawn_leaves().into_iter().rev() {
                let Some(node) = player.tree().node(id) else {
                    continue;
                };
                let outcome = self.match_leaf(common, node.state(), &pools, &mut marks);
                outcomes.push((id, outcome));
            }
        }

        for (name, id) in marks {
            if let Some(node) = others
                .get_mut(&name)
                .and_then(|other| other.tree_mut().node_mut(id))
            {
                node.set_compatibility(&active, true);
            }
        }

        let before = outcomes.len();
        let mut removed = 0_usize;
        for (id, outcome) in outcomes {
            match outcome {
                Ok(candidates) => {
                    for candidate in candidates {
                        if let Candidate::Merged(state) = candidate {
                            let _ = player.tree_mut().add_child(id, state);
                        }
                    }
                }
                Err(reason) => {
                    removed += 1;
                    player.prune(id, reason);
                }
            }
        }
        debug!(player = %active, before, removed, "matched real-spawn leaves");
    }

    fn match_leaf(
        &self,
        common: &CommonData,
        leaf: &FieldState,
        pools: &[Pool<'_>],
        marks: &mut Vec<(String, NodeId)>,
    ) -> Result<Vec<Candidate>, Contradiction> {
        let mut candidates = vec![Candidate::Leaf];
        for pool in pools.iter().rev() {
            let mut next = Vec::new();
            for candidate in candidates {
                let state = candidate.state(leaf);
                if state.player_position(pool.name).is_some() {
                    next.push(candidate);
                    continue;
                }
                let matchable: Vec<&FieldState> = pool
                    .leaves
                    .iter()
                    .rev()
                    .filter(|(_, other)| self.is_matchable(state, other))
                    .map(|(id, other)| {
                        marks.push((pool.name.to_owned(), *id));
                        *other
                    })
                    .collect();
                if matchable.is_empty() {
                    continue;
                }
                if matchable.len() > self.max_matchable {
                    next.push(candidate);
                    continue;
                }
                for other in matchable {
                    let mut merged = state.clone();
                    match merged.merge_with(common, other) {
                        Ok(()) => next.push(Candidate::Merged(merged)),
                        Err(reason) => trace!(player = pool.name, %reason, "merge rejected"),
                    }
                }
            }
            if next.is_empty() {
                return Err(Contradiction::Matching);
            }
            candidates = next;
        }
        Ok(candidates)
    }

    /// Reports whether two hypotheses may describe the same game.
    ///
    /// Known player positions must agree and every tile pair must fit the
    /// unique-room budget, river directions and the exit lattice.
    #[must_use]
    pub fn is_matchable(&self, own: &FieldState, other: &FieldState) -> bool {
        let positions_agree = own.players().all(|(name, position)| {
            match (position, other.player_position(name)) {
                (Some(mine), Some(theirs)) => mine == theirs,
                _ => true,
            }
        });
        if !positions_agree {
            return false;
        }
        let (own_grid, other_grid) = (own.grid(), other.grid());
        if own_grid.columns() != other_grid.columns() || own_grid.rows() != other_grid.rows() {
            return false;
        }
        let mut budget = self.unique_objects.clone();
        own_grid
            .iter()
            .zip(other_grid.iter())
            .all(|((position, mine), (_, theirs))| {
                cells_matchable(&mut budget, (own_grid, mine), (other_grid, theirs), position)
            })
    }
}

fn cells_matchable(
    budget: &mut BTreeMap<CellType, u32>,
    (own_grid, own): (&Grid, &Cell),
    (other_grid, other): (&Grid, &Cell),
    position: Position,
) -> bool {
    match (own.kind(), other.kind()) {
        (CellKind::None, CellKind::None | CellKind::PossibleExit)
        | (CellKind::Exit, CellKind::Exit | CellKind::PossibleExit)
        | (
            CellKind::PossibleExit,
            CellKind::Exit | CellKind::None | CellKind::PossibleExit,
        )
        | (CellKind::Unknown, CellKind::Unknown) => true,
        (CellKind::Unknown, kind) => absorbs(own_grid, budget, position, kind),
        (kind, CellKind::Unknown) => absorbs(other_grid, budget, position, kind),
        (mine, theirs) if mine.cell_type() == theirs.cell_type() => {
            spend(budget, mine.cell_type()) && mine.river_direction() == theirs.river_direction()
        }
        _ => false,
    }
}

/// Checks that the unknown tile at `position` of `grid` may become `kind`.
fn absorbs(
    grid: &Grid,
    budget: &mut BTreeMap<CellType, u32>,
    position: Position,
    kind: CellKind,
) -> bool {
    if !spend(budget, kind.cell_type()) {
        return false;
    }
    match kind {
        CellKind::River(flow) => grid.river_flow(position, flow) != RiverFlow::Blocked,
        _ => true,
    }
}

fn spend(budget: &mut BTreeMap<CellType, u32>, cell_type: CellType) -> bool {
    match budget.get_mut(&cell_type) {
        Some(0) => false,
        Some(count) => {
            *count -= 1;
            true
        }
        None => true,
    }
}
