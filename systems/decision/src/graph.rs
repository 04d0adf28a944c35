//! Weighted traversal graph over one hypothesis grid.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

use maze_bot_core::{Abilities, Action, CellKind, Direction, Position};
use maze_bot_field::Grid;

/// Tiles a river carries a player downstream after entering it.
const MAX_WASH_HOPS: usize = 2;

/// Cost of stepping across a passable edge.
const MOVE_WEIGHT: u32 = 1;

/// Cost of blasting a wall and stepping through it afterwards.
const BOMB_WEIGHT: u32 = 2;

/// One way of getting from a tile to another.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Edge {
    action: Action,
    direction: Direction,
    weight: u32,
}

impl Edge {
    /// Action that starts the transition.
    #[must_use]
    pub const fn action(&self) -> Action {
        self.action
    }

    /// Direction the action is aimed at.
    #[must_use]
    pub const fn direction(&self) -> Direction {
        self.direction
    }

    /// Number of turns the transition costs.
    #[must_use]
    pub const fn weight(&self) -> u32 {
        self.weight
    }
}

/// Shortest paths from the player's tile over one hypothesis.
///
/// Moves cost one turn and land where rivers wash the player. Bombs are
/// only considered while the player still has them; a bomb thrown from a
/// river costs an extra turn since the current drags the player away first.
/// Only the cheapest edge between two tiles is kept.
#[derive(Clone, Debug)]
pub struct GraphBuilder {
    source: Position,
    edges: BTreeMap<Position, BTreeMap<Position, Edge>>,
    distances: BTreeMap<Position, u32>,
    predecessors: BTreeMap<Position, Position>,
    settled: Vec<Position>,
}

impl GraphBuilder {
    /// Builds the graph of `grid` and solves it from `source`.
    #[must_use]
    pub fn build(grid: &Grid, source: Position, abilities: &Abilities) -> Self {
        let mut graph = Self {
            source,
            edges: BTreeMap::new(),
            distances: BTreeMap::new(),
            predecessors: BTreeMap::new(),
            settled: Vec::new(),
        };
        let bombs = abilities.allows(Action::ThrowBomb);
        for (tile, cell) in grid.iter() {
            if cell.kind() == CellKind::None {
                continue;
            }
            for direction in Direction::ALL {
                graph.add_move(grid, tile, direction);
                if bombs {
                    graph.add_bomb(grid, tile, direction);
                }
            }
        }
        graph.solve();
        graph
    }

    /// Tile the paths start from.
    #[must_use]
    pub const fn source(&self) -> Position {
        self.source
    }

    /// Cheapest edge from `from` to `to`, if any.
    #[must_use]
    pub fn edge(&self, from: Position, to: Position) -> Option<&Edge> {
        self.edges.get(&from).and_then(|targets| targets.get(&to))
    }

    /// Cost of the cheapest path to `target`, if it is reachable.
    #[must_use]
    pub fn distance(&self, target: Position) -> Option<u32> {
        self.distances.get(&target).copied()
    }

    /// Reachable tiles with their distances, in the order they were settled.
    pub fn reachable(&self) -> impl Iterator<Item = (Position, u32)> + '_ {
        self.settled
            .iter()
            .filter_map(|position| Some((*position, self.distance(*position)?)))
    }

    /// Tiles of the cheapest path from the source to `target`, both included.
    #[must_use]
    pub fn path(&self, target: Position) -> Option<Vec<Position>> {
        let _ = self.distances.get(&target)?;
        let mut path = vec![target];
        let mut current = target;
        while current != self.source {
            current = *self.predecessors.get(&current)?;
            path.push(current);
        }
        path.reverse();
        Some(path)
    }

    /// Action starting the cheapest path to `target`.
    ///
    /// Returns `None` when the target is the source or unreachable.
    #[must_use]
    pub fn first_action(&self, target: Position) -> Option<(Action, Option<Direction>)> {
        let path = self.path(target)?;
        let next = *path.get(1)?;
        let edge = self.edge(self.source, next)?;
        Some((edge.action, Some(edge.direction)))
    }

    fn add_move(&mut self, grid: &Grid, tile: Position, direction: Direction) {
        let blocked = grid
            .wall(tile, direction)
            .map_or(true, |wall| wall.player_collision());
        let target = if blocked {
            tile
        } else {
            let Some(next) = grid.neighbour(tile, direction) else {
                return;
            };
            next
        };
        let landing = wash(grid, tile, target, direction);
        self.add_edge(tile, landing, Action::Move, direction, MOVE_WEIGHT);
    }

    fn add_bomb(&mut self, grid: &Grid, tile: Position, direction: Direction) {
        let Some(wall) = grid.wall(tile, direction) else {
            return;
        };
        if !wall.player_collision() || !wall.breakable() {
            return;
        }
        let Some(target) = grid.neighbour(tile, direction) else {
            return;
        };
        let landing = wash(grid, tile, target, direction);
        let weight = match grid.kind(tile) {
            Some(CellKind::River(_)) => BOMB_WEIGHT + 1,
            _ => BOMB_WEIGHT,
        };
        self.add_edge(tile, landing, Action::ThrowBomb, direction, weight);
    }

    fn add_edge(
        &mut self,
        from: Position,
        to: Position,
        action: Action,
        direction: Direction,
        weight: u32,
    ) {
        let edge = Edge {
            action,
            direction,
            weight,
        };
        let targets = self.edges.entry(from).or_default();
        match targets.get(&to) {
            Some(existing) if existing.weight <= weight => {}
            _ => {
                let _ = targets.insert(to, edge);
            }
        }
    }

    fn solve(&mut self) {
        let mut queue = BinaryHeap::new();
        let _ = self.distances.insert(self.source, 0);
        queue.push(Reverse((0_u32, self.source)));
        while let Some(Reverse((distance, current))) = queue.pop() {
            if self.distances.get(&current).is_some_and(|best| *best < distance) {
                continue;
            }
            self.settled.push(current);
            let Some(targets) = self.edges.get(&current) else {
                continue;
            };
            for (next, edge) in targets {
                let candidate = distance.saturating_add(edge.weight);
                if self.distances.get(next).is_some_and(|best| *best <= candidate) {
                    continue;
                }
                let _ = self.distances.insert(*next, candidate);
                let _ = self.predecessors.insert(*next, current);
                queue.push(Reverse((candidate, *next)));
            }
        }
    }
}

/// Tile where a player entering `target` from `tile` ends up.
fn wash(grid: &Grid, tile: Position, target: Position, direction: Direction) -> Position {
    if !matches!(grid.kind(target), Some(CellKind::River(_))) || !grid.is_washed(target, tile, direction)
    {
        return target;
    }
    let mut landing = target;
    for _ in 0..MAX_WASH_HOPS {
        let Some(CellKind::River(flow)) = grid.kind(landing) else {
            break;
        };
        let Some(next) = grid.neighbour(landing, flow) else {
            break;
        };
        landing = next;
        if !matches!(grid.kind(landing), Some(CellKind::River(_))) {
            break;
        }
    }
    landing
}

#[cfg(test)]
mod tests {
    use super::*;
    use maze_bot_core::WallKind;
    use maze_bot_field::Cell;

    fn open_grid() -> Grid {
        let mut grid = Grid::filled(5, 5, Cell::none());
        for y in 1..4 {
            for x in 1..4 {
                grid.set_cell(grid.position(x, y), Cell::open(CellKind::Ground));
            }
        }
        grid
    }

    #[test]
    fn open_floor_costs_one_turn_per_step() {
        let grid = open_grid();
        let graph = GraphBuilder::build(&grid, Position::new(1, 1), &Abilities::all());

        assert_eq!(graph.distance(Position::new(3, 3)), Some(4));
        assert_eq!(graph.distance(Position::new(1, 1)), Some(0));
        assert_eq!(graph.first_action(Position::new(1, 1)), None);
        assert_eq!(
            graph.path(Position::new(1, 3)).map(|path| path.len()),
            Some(3)
        );
    }

    #[test]
    fn bombs_open_shortcuts_only_when_allowed() {
        let mut grid = open_grid();
        grid.add_wall(Position::new(1, 1), Direction::Right, WallKind::Concrete);
        grid.add_wall(Position::new(1, 1), Direction::Bottom, WallKind::Concrete);
        let start = Position::new(1, 1);
        let target = Position::new(2, 1);

        let with_bombs = GraphBuilder::build(&grid, start, &Abilities::all());
        assert_eq!(with_bombs.distance(target), Some(BOMB_WEIGHT));
        assert_eq!(
            with_bombs.first_action(target),
            Some((Action::ThrowBomb, Some(Direction::Right)))
        );

        let bounce = with_bombs.edge(start, start).expect("blocked moves stay in place");
        assert_eq!(bounce.action(), Action::Move);
        assert_eq!(bounce.weight(), MOVE_WEIGHT);

        let without = Abilities::all().with(Action::ThrowBomb, false);
        let walled_in = GraphBuilder::build(&grid, start, &without);
        assert_eq!(walled_in.distance(target), None);
    }

    #[test]
    fn bombs_thrown_from_a_river_cost_an_extra_turn() {
        let mut grid = open_grid();
        let start = Position::new(1, 1);
        let target = Position::new(2, 1);
        grid.set_kind(start, CellKind::River(Direction::Bottom));
        grid.set_kind(Position::new(1, 2), CellKind::River(Direction::Bottom));
        grid.set_kind(Position::new(1, 3), CellKind::RiverMouth);
        grid.add_wall(start, Direction::Right, WallKind::Concrete);
        grid.add_wall(target, Direction::Bottom, WallKind::Concrete);
        let graph = GraphBuilder::build(&grid, start, &Abilities::all());

        assert_eq!(graph.distance(target), Some(BOMB_WEIGHT + 1));
        assert_eq!(
            graph.first_action(target),
            Some((Action::ThrowBomb, Some(Direction::Right)))
        );
        let edge = graph.edge(start, target).expect("the bomb opens the wall");
        assert_eq!(edge.weight(), 3);
    }

    #[test]
    fn rivers_wash_players_downstream() {
        let mut grid = open_grid();
        grid.set_kind(Position::new(2, 1), CellKind::River(Direction::Bottom));
        grid.set_kind(Position::new(2, 2), CellKind::River(Direction::Bottom));
        grid.set_kind(Position::new(2, 3), CellKind::RiverMouth);
        let graph = GraphBuilder::build(&grid, Position::new(1, 1), &Abilities::all());

        let edge = graph
            .edge(Position::new(1, 1), Position::new(2, 3))
            .expect("the river carries the player to its mouth");
        assert_eq!(edge.action(), Action::Move);
        assert_eq!(edge.direction(), Direction::Right);
        assert!(graph.edge(Position::new(1, 1), Position::new(2, 1)).is_none());
    }
}
