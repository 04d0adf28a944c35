//! Initial hypothesis trees built from the game rules.

use maze_bot_core::{CellKind, ConfigError, Direction, GameRules, LevelId, Position, WallKind};
use maze_bot_field::{Cell, FieldState, Grid};

use crate::Tree;

/// Player whose knowledge is tracked, with its true spawn when known.
///
/// The spawn only feeds the real-spawn oracle and never the decisions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackedPlayer {
    name: String,
    spawn: Option<Position>,
}

impl TrackedPlayer {
    /// Player whose spawn is not disclosed.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            spawn: None,
        }
    }

    /// Player spawning at a known position.
    #[must_use]
    pub fn with_spawn(name: impl Into<String>, spawn: Position) -> Self {
        Self {
            name: name.into(),
            spawn: Some(spawn),
        }
    }

    /// Name the engine reports the player by.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True spawn position, when configured.
    #[must_use]
    pub const fn spawn(&self) -> Option<Position> {
        self.spawn
    }
}

/// Builds every player's starting tree.
///
/// The root knows nothing but the border; its children place the player on
/// each playable tile.
#[derive(Debug)]
pub struct InitGenerator<'a> {
    rules: &'a GameRules,
    players: &'a [TrackedPlayer],
}

impl<'a> InitGenerator<'a> {
    /// Checks the tracked players against the rules.
    pub fn new(rules: &'a GameRules, players: &'a [TrackedPlayer]) -> Result<Self, ConfigError> {
        if players.is_empty() {
            return Err(ConfigError::NoPlayers);
        }
        for (index, player) in players.iter().enumerate() {
            if players[..index]
                .iter()
                .any(|other| other.name == player.name)
            {
                return Err(ConfigError::DuplicatePlayer(player.name.clone()));
            }
        }
        let generator = Self { rules, players };
        for player in players {
            if let Some(spawn) = player.spawn {
                if !generator.is_playable(spawn) {
                    return Err(ConfigError::SpawnOutOfBounds {
                        player: player.name.clone(),
                        position: spawn,
                    });
                }
            }
        }
        Ok(generator)
    }

    /// Grid with an off-map border, possible exits along it and an
    /// unexplored interior.
    #[must_use]
    pub fn base_grid(&self) -> Grid {
        let columns = self.rules.grid_columns();
        let rows = self.rules.grid_rows();
        let mut grid = Grid::filled(columns, rows, Cell::none());
        for position in self.spawn_points() {
            grid.set_cell(position, Cell::unknown());
        }

        let border: Vec<Position> = grid
            .iter()
            .filter(|(_, cell)| cell.kind() == CellKind::None)
            .map(|(position, _)| position)
            .collect();
        for position in border {
            for direction in Direction::ALL {
                let Some(inside) = grid.neighbour(position, direction) else {
                    continue;
                };
                if matches!(
                    grid.kind(inside),
                    Some(CellKind::None | CellKind::PossibleExit) | None
                ) {
                    continue;
                }
                grid.set_cell(position, Cell::possible_exit(direction));
                grid.set_wall(inside, -direction, WallKind::Exit);
            }
        }
        grid
    }

    /// Every playable tile in row-major order.
    #[must_use]
    pub fn spawn_points(&self) -> Vec<Position> {
        let columns = self.rules.generator_rules.cols as i32;
        let rows = self.rules.generator_rules.rows as i32;
        (1..=rows)
            .flat_map(|y| (1..=columns).map(move |x| Position::new(x, y)))
            .collect()
    }

    /// Starting tree of `player`: one child per possible spawn.
    ///
    /// A child is flagged as the real spawn when it matches the configured
    /// spawn, or unconditionally when the spawn is not configured.
    #[must_use]
    pub fn start_tree(&self, player: &TrackedPlayer) -> Tree {
        let names = self.players.iter().map(|tracked| tracked.name.as_str());
        let base = FieldState::new(self.base_grid(), names, self.rules.unique_objects());
        let others = self
            .players
            .iter()
            .filter(|other| other.name != player.name)
            .map(|other| other.name.clone());
        let mut tree = Tree::new(base.clone(), others);
        let root = tree.root();
        for spawn in self.spawn_points() {
            let mut state = base.clone();
            state.set_player_position(&player.name, spawn);
            let real_spawn = player.spawn.map_or(true, |real| real == spawn);
            let _ = tree.add_child_with_spawn(root, state, real_spawn);
        }
        tree
    }

    fn is_playable(&self, position: Position) -> bool {
        let generator = &self.rules.generator_rules;
        (1..=generator.cols as i32).contains(&position.x())
            && (1..=generator.rows as i32).contains(&position.y())
            && position.level() == LevelId::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn border_cells_next_to_the_interior_may_be_exits() {
        let rules = GameRules::default();
        let players = [TrackedPlayer::new("alice")];
        let generator = InitGenerator::new(&rules, &players).expect("valid players");
        let grid = generator.base_grid();

        assert_eq!(grid.kind(Position::new(0, 0)), Some(CellKind::None));
        assert_eq!(grid.kind(Position::new(3, 0)), Some(CellKind::PossibleExit));
        assert_eq!(
            grid.wall(Position::new(3, 0), Direction::Bottom),
            Some(WallKind::Entrance)
        );
        assert_eq!(
            grid.wall(Position::new(3, 1), Direction::Top),
            Some(WallKind::Exit)
        );
        assert_eq!(grid.kind(Position::new(3, 3)), Some(CellKind::Unknown));
    }

    #[test]
    fn configured_spawn_flags_a_single_lineage() {
        let rules = GameRules::default();
        let players = [
            TrackedPlayer::with_spawn("alice", Position::new(2, 3)),
            TrackedPlayer::new("bob"),
        ];
        let generator = InitGenerator::new(&rules, &players).expect("valid players");

        let alice = generator.start_tree(&players[0]);
        assert_eq!(alice.leaves().len(), 25);
        let real = alice.real_spawn_leaves();
        assert_eq!(real.len(), 1);
        let state = alice.node(real[0]).expect("alive").state();
        assert_eq!(state.player_position("alice"), Some(Position::new(2, 3)));
        assert_eq!(state.player_position("bob"), None);

        let bob = generator.start_tree(&players[1]);
        assert_eq!(bob.real_spawn_leaves().len(), 25);
    }

    #[test]
    fn invalid_players_are_rejected() {
        let rules = GameRules::default();
        assert!(matches!(
            InitGenerator::new(&rules, &[]),
            Err(ConfigError::NoPlayers)
        ));
        let twice = [TrackedPlayer::new("alice"), TrackedPlayer::new("alice")];
        assert!(matches!(
            InitGenerator::new(&rules, &twice),
            Err(ConfigError::DuplicatePlayer(_))
        ));
        let outside = [TrackedPlayer::with_spawn("alice", Position::new(0, 3))];
        assert!(matches!(
            InitGenerator::new(&rules, &outside),
            Err(ConfigError::SpawnOutOfBounds { .. })
        ));
    }
}
