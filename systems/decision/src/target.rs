use maze_bot_core::{Action, CellKind, Position};
use maze_bot_field::FieldState;
use maze_bot_system_beliefs::PlayerStats;

use crate::GraphBuilder;

/// Bonus applied to tiles holding a treasure the player could pick up.
const TREASURE_BONUS: u64 = 10;

/// Scores reachable tiles by what the player needs right now.
#[derive(Clone, Copy, Debug)]
pub struct TargetCalculator {
    stats: PlayerStats,
}

impl TargetCalculator {
    /// Calculator for a player with the provided resources.
    #[must_use]
    pub const fn new(stats: PlayerStats) -> Self {
        Self { stats }
    }

    /// Utility of reaching a tile of the provided kind.
    #[must_use]
    pub fn utility(&self, kind: CellKind) -> u32 {
        let stats = &self.stats;
        let limits = stats.limits();
        let missing_arrows = limits.max_arrows.saturating_sub(stats.arrows());
        let missing_bombs = limits.max_bombs.saturating_sub(stats.bombs());
        match kind {
            CellKind::Unknown => 10,
            CellKind::PossibleExit if stats.has_treasure() => 12,
            CellKind::PossibleExit => 7,
            CellKind::Clinic if stats.is_damaged() => 8,
            CellKind::ArmoryWeapon => 2 * missing_arrows,
            CellKind::ArmoryExplosive => 2 * missing_bombs,
            CellKind::Armory => missing_arrows + missing_bombs,
            CellKind::Exit if stats.has_treasure() => 15,
            _ => 1,
        }
    }

    /// Reachable tile with the best utility per turn spent getting there.
    ///
    /// The source tile is never a target. Ties go to the tile settled first.
    #[must_use]
    pub fn target(&self, graph: &GraphBuilder, state: &FieldState) -> Option<Position> {
        let wants_treasure =
            !self.stats.has_treasure() && self.stats.allowed_abilities().allows(Action::SwapTreasure);
        let mut best: Option<(Position, u64, u64)> = None;
        for (position, distance) in graph.reachable() {
            if distance == 0 {
                continue;
            }
            let Some(kind) = state.grid().kind(position) else {
                continue;
            };
            let mut utility = u64::from(self.utility(kind));
            if wants_treasure && state.treasures().contains(&position) {
                utility *= TREASURE_BONUS;
            }
            let distance = u64::from(distance);
            let better = best.map_or(true, |(_, top_utility, top_distance)| {
                utility * top_distance > top_utility * distance
            });
            if better {
                best = Some((position, utility, distance));
            }
        }
        best.map(|(position, _, _)| position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maze_bot_core::{Abilities, Direction, PlayerStatRules, TurnAction, TurnResponse};
    use maze_bot_field::{Cell, Grid};

    fn limits() -> PlayerStatRules {
        PlayerStatRules {
            max_health: 2,
            max_arrows: 3,
            max_bombs: 3,
        }
    }

    #[test]
    fn armory_utility_tracks_missing_ammo() {
        let mut stats = PlayerStats::new(limits());
        let calculator = TargetCalculator::new(stats);
        assert_eq!(calculator.utility(CellKind::Armory), 0);

        let _ = stats.on_own_turn(TurnAction::ShootBow(Direction::Top), &TurnResponse::default());
        let _ = stats.on_own_turn(TurnAction::ThrowBomb(Direction::Top), &TurnResponse::default());
        let calculator = TargetCalculator::new(stats);
        assert_eq!(calculator.utility(CellKind::Armory), 2);
        assert_eq!(calculator.utility(CellKind::ArmoryWeapon), 2);
        assert_eq!(calculator.utility(CellKind::Clinic), 1);
    }

    #[test]
    fn nearby_unknown_tiles_win_over_distant_exits() {
        let mut grid = Grid::filled(6, 3, Cell::none());
        for x in 1..5 {
            grid.set_cell(grid.position(x, 1), Cell::open(CellKind::Ground));
        }
        grid.set_cell(grid.position(2, 1), Cell::open(CellKind::Unknown));
        grid.set_cell(grid.position(5, 1), Cell::possible_exit(Direction::Left));
        let state = FieldState::new(grid.clone(), ["alice"], Default::default());
        let graph = GraphBuilder::build(&grid, Position::new(1, 1), &Abilities::all());

        let calculator = TargetCalculator::new(PlayerStats::new(limits()));
        assert_eq!(calculator.target(&graph, &state), Some(Position::new(2, 1)));
    }
}
