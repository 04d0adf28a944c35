//! River trajectory resolution.
//!
//! A player entering an unexplored river tile cannot be placed
//! deterministically: the flow direction of the tile is still unknown. Every
//! physically legal flow becomes its own successor hypothesis and washed
//! players are followed downstream hop by hop through an explicit frontier.

use maze_bot_core::{CellKind, CellType, Contradiction, Direction, Position};
use tracing::trace;

use super::{Actor, FieldState};

/// Additional tiles a river sweeps a player across within one turn.
const MAX_WASH_HOPS: usize = 2;

impl FieldState {
    /// Enumerates the successors of a player ending its turn on a river.
    ///
    /// `entry` is the tile the player reached after crossing the wall and
    /// `entered` the direction it moved in. When `washed` is set the river
    /// carried the player downstream and the tile it stopped on has type
    /// `turn_end`.
    pub(super) fn river_trajectories(
        &self,
        actor: Actor<'_>,
        entry: Position,
        turn_end: Option<CellType>,
        washed: bool,
        entered: Option<Direction>,
    ) -> Result<Vec<FieldState>, Contradiction> {
        if !washed {
            return self.clone().river_leaves(actor, entry, entered, false);
        }

        let ends_at_mouth = turn_end == Some(CellType::RiverMouth);
        let mut frontier = self.clone().river_leaves(actor, entry, entered, true)?;
        let mut finished = Vec::new();

        for hop in 0..MAX_WASH_HOPS {
            let last_hop = hop + 1 == MAX_WASH_HOPS;
            let mut next_frontier = Vec::new();
            for mut state in frontier {
                let Some((position, flow)) = state.player_river(actor) else {
                    continue;
                };
                let Some(next) = state.grid.neighbour(position, flow) else {
                    continue;
                };
                let next_kind = state.grid.kind(next);

                if !ends_at_mouth {
                    match state.river_leaves(actor, next, Some(flow), false) {
                        Ok(leaves) => next_frontier.extend(leaves),
                        Err(reason) => trace!(player = actor.player, ?reason, hop, "river branch dropped"),
                    }
                    continue;
                }

                if next_kind == Some(CellKind::RiverMouth) {
                    state.move_player(actor, next);
                    finished.push(state);
                    continue;
                }
                if last_hop || next_kind == Some(CellKind::Unknown) {
                    match state.resolved_copy(actor, next, CellType::RiverMouth, None) {
                        Ok(resolved) => finished.push(resolved),
                        Err(reason) => trace!(player = actor.player, ?reason, hop, "mouth branch dropped"),
                    }
                }
                if !last_hop {
                    if let Ok(leaves) = state.river_leaves(actor, next, Some(flow), false) {
                        next_frontier.extend(leaves);
                    }
                }
            }
            frontier = next_frontier;
        }

        if !ends_at_mouth {
            finished = frontier;
        }
        if finished.is_empty() {
            return Err(Contradiction::Unreachable);
        }
        Ok(finished)
    }

    /// Places the player on the river tile at `position`, branching on every
    /// flow direction the tile may still have.
    fn river_leaves(
        mut self,
        actor: Actor<'_>,
        position: Position,
        entered: Option<Direction>,
        washed: bool,
    ) -> Result<Vec<FieldState>, Contradiction> {
        if washed {
            let entered = entered.ok_or(Contradiction::Unreachable)?;
            let previous = self
                .grid
                .neighbour(position, -entered)
                .and_then(|previous| self.grid.kind(previous));
            if previous.is_some_and(|kind| kind.flows(entered)) {
                return Err(Contradiction::Unreachable);
            }
        }

        let directions = self
            .grid
            .possible_river_directions(position, entered, washed);
        if directions.is_empty() {
            return Err(Contradiction::Unreachable);
        }

        match self.grid.kind(position) {
            Some(CellKind::Unknown) => directions
                .into_iter()
                .map(|flow| self.resolved_copy(actor, position, CellType::River, Some(flow)))
                .collect(),
            Some(CellKind::River(flow)) if directions.contains(&flow) => {
                self.move_player(actor, position);
                Ok(vec![self])
            }
            _ => Err(Contradiction::Unreachable),
        }
    }

    fn player_river(&self, actor: Actor<'_>) -> Option<(Position, Direction)> {
        let position = self.position_of(actor)?;
        let flow = self.grid.kind(position)?.river_direction()?;
        Some((position, flow))
    }
}
