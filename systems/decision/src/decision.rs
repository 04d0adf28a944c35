use std::collections::BTreeMap;

use maze_bot_core::{Abilities, Action, Direction, Position};
use maze_bot_field::{FieldState, Grid};
use maze_bot_system_beliefs::PlayerState;
use tracing::{debug, info, warn};

use crate::{GraphBuilder, TargetCalculator};

/// Action paired with the direction it is aimed at, if any.
pub type Decision = (Action, Option<Direction>);

/// Picks one action for a player by letting every real-spawn hypothesis vote.
#[derive(Clone, Copy, Debug, Default)]
pub struct DecisionMaker;

impl DecisionMaker {
    /// Creates a decision maker.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Chooses the action of `player` among the ones the engine allows.
    ///
    /// A player that may swap and carries nothing always swaps. Otherwise
    /// every real-spawn leaf proposes the action that starts its best plan
    /// and the most popular proposal wins; ties go to the proposal that sorts
    /// first. Without any proposal the player skips.
    #[must_use]
    pub fn make_decision(
        &self,
        players: &BTreeMap<String, PlayerState>,
        player: &str,
        abilities: &Abilities,
    ) -> Decision {
        let Some(current) = players.get(player) else {
            warn!(player, "decision requested for an untracked player");
            return (Action::Skip, None);
        };
        if abilities.allows(Action::SwapTreasure) && !current.stats().has_treasure() {
            info!(player, "swapping treasure");
            return (Action::SwapTreasure, None);
        }

        let mut votes: BTreeMap<Decision, usize> = BTreeMap::new();
        for state in current.real_spawn_states() {
            if let Some(decision) = self.first_action(players, player, abilities, state) {
                *votes.entry(decision).or_default() += 1;
            }
        }
        debug!(player, ?votes, "collected votes");

        let mut winner: Option<(Decision, usize)> = None;
        for (decision, count) in votes {
            if winner.map_or(true, |(_, top)| count > top) {
                winner = Some((decision, count));
            }
        }
        match winner {
            Some((decision, count)) => {
                info!(player, action = ?decision.0, direction = ?decision.1, count, "decided");
                decision
            }
            None => {
                warn!(player, "no hypothesis proposed an action");
                (Action::Skip, None)
            }
        }
    }

    /// Action one hypothesis proposes for `player`.
    ///
    /// Shooting a visible living enemy comes first; otherwise the player
    /// heads for the most useful reachable tile.
    #[must_use]
    pub fn first_action(
        &self,
        players: &BTreeMap<String, PlayerState>,
        player: &str,
        abilities: &Abilities,
        state: &FieldState,
    ) -> Option<Decision> {
        let position = state.player_position(player)?;
        if abilities.allows(Action::ShootBow) {
            let enemies: Vec<Position> = state
                .players()
                .filter(|(name, _)| *name != player)
                .filter(|(name, _)| {
                    players
                        .get(*name)
                        .map_or(true, |other| other.stats().is_alive())
                })
                .filter_map(|(_, position)| position)
                .collect();
            if let Some(direction) = shot_direction(state.grid(), position, &enemies) {
                return Some((Action::ShootBow, Some(direction)));
            }
        }
        let stats = *players.get(player)?.stats();
        let graph = GraphBuilder::build(state.grid(), position, abilities);
        let target = TargetCalculator::new(stats).target(&graph, state)?;
        graph.first_action(target)
    }
}

/// First direction an arrow fired from `origin` would hit one of `enemies`.
fn shot_direction(grid: &Grid, origin: Position, enemies: &[Position]) -> Option<Direction> {
    if enemies.is_empty() {
        return None;
    }
    Direction::ALL.into_iter().find(|&direction| {
        let mut current = origin;
        loop {
            if enemies.contains(&current) {
                return true;
            }
            let blocked = grid
                .wall(current, direction)
                .map_or(true, |wall| wall.weapon_collision());
            if blocked {
                return false;
            }
            match grid.neighbour(current, direction) {
                Some(next) => current = next,
                None => return false,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use maze_bot_core::{CellKind, WallKind};
    use maze_bot_field::Cell;

    fn corridor() -> Grid {
        let mut grid = Grid::filled(5, 3, Cell::none());
        for x in 1..4 {
            grid.set_cell(grid.position(x, 1), Cell::open(CellKind::Ground));
        }
        grid
    }

    #[test]
    fn arrows_fly_until_a_wall() {
        let mut grid = corridor();
        let origin = Position::new(1, 1);
        let enemy = [Position::new(3, 1)];
        assert_eq!(shot_direction(&grid, origin, &enemy), Some(Direction::Right));

        grid.add_wall(Position::new(2, 1), Direction::Right, WallKind::Concrete);
        assert_eq!(shot_direction(&grid, origin, &enemy), None);
        assert_eq!(shot_direction(&grid, origin, &[]), None);
    }
}
