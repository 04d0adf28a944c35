//! Indexed hypothesis grid and its map-consistency primitives.

use std::collections::BTreeMap;

use maze_bot_core::{CellKind, CellType, Contradiction, Direction, LevelId, Position, WallKind};

/// Single tile of a hypothesis grid together with its four walls.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Cell {
    kind: CellKind,
    walls: [WallKind; 4],
}

impl Cell {
    /// Creates a cell from an explicit kind and walls indexed by [`Direction::index`].
    #[must_use]
    pub const fn new(kind: CellKind, walls: [WallKind; 4]) -> Self {
        Self { kind, walls }
    }

    /// Unexplored tile whose walls are unresolved.
    #[must_use]
    pub const fn unknown() -> Self {
        Self::new(CellKind::Unknown, [WallKind::Unknown; 4])
    }

    /// Cell of the provided kind surrounded by empty walls.
    #[must_use]
    pub const fn open(kind: CellKind) -> Self {
        Self::new(kind, [WallKind::Empty; 4])
    }

    /// Off-map tile.
    #[must_use]
    pub const fn none() -> Self {
        Self::open(CellKind::None)
    }

    /// Boundary tile enclosed by outer walls except for its entrance.
    #[must_use]
    pub fn possible_exit(entrance: Direction) -> Self {
        Self::enclosed(CellKind::PossibleExit, entrance)
    }

    /// Exit tile enclosed by outer walls except for its entrance.
    #[must_use]
    pub fn exit(entrance: Direction) -> Self {
        Self::enclosed(CellKind::Exit, entrance)
    }

    fn enclosed(kind: CellKind, entrance: Direction) -> Self {
        let mut walls = [WallKind::Outer; 4];
        walls[entrance.index()] = WallKind::Entrance;
        Self::new(kind, walls)
    }

    /// Kind of the tile.
    #[must_use]
    pub const fn kind(&self) -> CellKind {
        self.kind
    }

    /// Walls indexed by [`Direction::index`].
    #[must_use]
    pub const fn walls(&self) -> &[WallKind; 4] {
        &self.walls
    }

    /// Wall on the provided edge.
    #[must_use]
    pub const fn wall(&self, direction: Direction) -> WallKind {
        self.walls[direction.index()]
    }
}

/// Outcome of checking whether a river may flow across one edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RiverFlow {
    /// The flow is physically impossible.
    Blocked,
    /// The flow is possible.
    Open,
    /// The flow is the only way to feed a river mouth and therefore mandatory.
    Forced,
}

/// Rectangular array of cells with symmetric walls.
///
/// The grid owns no game rules beyond adjacency and the wall and river
/// consistency helpers the hypothesis engine builds on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    columns: u32,
    rows: u32,
    level: LevelId,
    cells: Vec<Cell>,
}

impl Grid {
    /// Creates a grid where every tile is a copy of `cell`.
    #[must_use]
    pub fn filled(columns: u32, rows: u32, cell: Cell) -> Self {
        let count = usize::try_from(u64::from(columns) * u64::from(rows)).unwrap_or(0);
        Self {
            columns,
            rows,
            level: LevelId::default(),
            cells: vec![cell; count],
        }
    }

    /// Number of columns, border included.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of rows, border included.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Level the grid describes.
    #[must_use]
    pub const fn level(&self) -> LevelId {
        self.level
    }

    /// Position of the tile at the provided coordinates on this grid's level.
    #[must_use]
    pub const fn position(&self, x: i32, y: i32) -> Position {
        Position::on_level(x, y, self.level)
    }

    /// Reports whether the position addresses a tile of this grid.
    #[must_use]
    pub fn contains(&self, position: Position) -> bool {
        self.index(position).is_some()
    }

    /// Tile at the provided position.
    #[must_use]
    pub fn cell(&self, position: Position) -> Option<&Cell> {
        self.index(position).and_then(|index| self.cells.get(index))
    }

    /// Kind of the tile at the provided position.
    #[must_use]
    pub fn kind(&self, position: Position) -> Option<CellKind> {
        self.cell(position).map(Cell::kind)
    }

    /// Wall on one edge of the tile at the provided position.
    #[must_use]
    pub fn wall(&self, position: Position, direction: Direction) -> Option<WallKind> {
        self.cell(position).map(|cell| cell.wall(direction))
    }

    /// Position of the neighbouring tile, if it lies inside the grid.
    #[must_use]
    pub fn neighbour(&self, position: Position, direction: Direction) -> Option<Position> {
        let next = position.adjacent(direction);
        self.contains(next).then_some(next)
    }

    /// Kind of the neighbouring tile, if it lies inside the grid.
    #[must_use]
    pub fn neighbour_kind(&self, position: Position, direction: Direction) -> Option<CellKind> {
        self.neighbour(position, direction)
            .and_then(|next| self.kind(next))
    }

    /// Iterator over every tile in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (Position, &Cell)> + '_ {
        let columns = self.columns.max(1) as usize;
        self.cells.iter().enumerate().map(move |(index, cell)| {
            let x = (index % columns) as i32;
            let y = (index / columns) as i32;
            (self.position(x, y), cell)
        })
    }

    /// Replaces the tile at the provided position, walls included.
    pub fn set_cell(&mut self, position: Position, cell: Cell) {
        if let Some(slot) = self.slot_mut(position) {
            *slot = cell;
        }
    }

    /// Changes the kind of a tile while keeping its walls.
    pub fn set_kind(&mut self, position: Position, kind: CellKind) {
        if let Some(slot) = self.slot_mut(position) {
            slot.kind = kind;
        }
    }

    /// Sets one edge of a single tile without touching the neighbour.
    pub fn set_wall(&mut self, position: Position, direction: Direction, wall: WallKind) {
        if let Some(slot) = self.slot_mut(position) {
            slot.walls[direction.index()] = wall;
        }
    }

    /// Sets an edge and mirrors it onto the neighbour's opposite edge.
    ///
    /// Off-map neighbours never receive the mirrored wall.
    pub fn add_wall(&mut self, position: Position, direction: Direction, wall: WallKind) {
        self.set_wall(position, direction, wall);
        if let Some(next) = self.neighbour(position, direction) {
            if self.kind(next) != Some(CellKind::None) {
                self.set_wall(next, -direction, wall);
            }
        }
    }

    /// Turns a tile into an exit whose entrance faces `entrance`.
    ///
    /// Every other edge of the exit becomes an outer wall, mirrored onto the
    /// neighbours unless a neighbour is already a known exit.
    pub fn create_exit(&mut self, position: Position, entrance: Direction) {
        for direction in Direction::ALL {
            if direction == entrance {
                continue;
            }
            let Some(next) = self.neighbour(position, direction) else {
                continue;
            };
            if matches!(self.kind(next), Some(CellKind::None | CellKind::Exit)) {
                continue;
            }
            self.set_wall(next, -direction, WallKind::Outer);
        }
        if let Some(inside) = self.neighbour(position, entrance) {
            self.set_wall(inside, -entrance, WallKind::Exit);
        }
        self.set_cell(position, Cell::exit(entrance));
    }

    /// Reports whether a neighbour other than `except` is a river flowing into `position`.
    #[must_use]
    pub fn has_known_inflow(&self, position: Position, except: Option<Direction>) -> bool {
        Direction::ALL
            .into_iter()
            .filter(|direction| Some(*direction) != except)
            .any(|direction| {
                self.neighbour_kind(position, direction)
                    .is_some_and(|kind| kind.flows(-direction))
            })
    }

    /// Reports whether `position` can only be fed from the side facing `-entering`.
    ///
    /// `entering` is the direction a river would flow to enter the tile.
    #[must_use]
    pub fn is_only_possible_inflow(&self, position: Position, entering: Direction) -> bool {
        Direction::ALL
            .into_iter()
            .filter(|direction| *direction != -entering)
            .all(|direction| match self.neighbour_kind(position, direction) {
                Some(CellKind::Unknown) => false,
                Some(kind) => !kind.flows(-direction),
                None => true,
            })
    }

    /// Reports whether resolving `position` to land would leave a mouth without inflow.
    #[must_use]
    pub fn is_cause_of_isolated_mouth(&self, position: Position) -> bool {
        Direction::ALL.into_iter().any(|direction| {
            self.neighbour(position, direction).is_some_and(|next| {
                self.kind(next) == Some(CellKind::RiverMouth)
                    && self.is_only_possible_inflow(next, direction)
            })
        })
    }

    /// Reports whether following the known flow from `previous` leads back to `start`.
    #[must_use]
    pub fn is_river_looped(&self, start: Position, previous: Position) -> bool {
        let mut current = previous;
        for _ in 0..=self.cells.len() {
            if current == start {
                return true;
            }
            let Some(CellKind::River(direction)) = self.kind(current) else {
                return false;
            };
            match self.neighbour(current, direction) {
                Some(next) => current = next,
                None => return false,
            }
        }
        false
    }

    /// Checks whether a river at `position` may flow toward `direction`.
    ///
    /// Rivers never flow into walls or land, never flow head-on into each
    /// other, never branch and never loop. A mouth that has no other possible
    /// inflow forces the flow.
    #[must_use]
    pub fn river_flow(&self, position: Position, direction: Direction) -> RiverFlow {
        if !matches!(
            self.wall(position, direction),
            Some(WallKind::Empty | WallKind::Unknown)
        ) {
            return RiverFlow::Blocked;
        }
        let Some(next) = self.neighbour(position, direction) else {
            return RiverFlow::Blocked;
        };
        let Some(next_kind) = self.kind(next) else {
            return RiverFlow::Blocked;
        };
        if !matches!(
            next_kind,
            CellKind::River(_) | CellKind::RiverMouth | CellKind::Unknown
        ) {
            return RiverFlow::Blocked;
        }
        if next_kind.flows(-direction) {
            return RiverFlow::Blocked;
        }
        if self.has_known_inflow(next, Some(-direction)) {
            return RiverFlow::Blocked;
        }
        if next_kind == CellKind::RiverMouth && self.is_only_possible_inflow(next, direction) {
            return RiverFlow::Forced;
        }
        if self.is_river_looped(position, next) {
            return RiverFlow::Blocked;
        }
        RiverFlow::Open
    }

    /// Enumerates the directions a river at `position` may flow in.
    ///
    /// `entered` is the direction the player moved to reach the tile. When
    /// the player was not washed downstream and arrived from a mouth or from
    /// a river flowing elsewhere, the only candidate is to flow back toward
    /// where the player came from. A washed player's river never flows back
    /// toward the tile the player was washed from.
    #[must_use]
    pub fn possible_river_directions(
        &self,
        position: Position,
        entered: Option<Direction>,
        washed: bool,
    ) -> Vec<Direction> {
        if let (false, Some(entered)) = (washed, entered) {
            if let Some(previous) = self.neighbour(position, -entered) {
                let previous_kind = self.kind(previous);
                let feeds_back = match previous_kind {
                    Some(CellKind::RiverMouth) => true,
                    Some(CellKind::River(flow)) => flow != entered,
                    _ => false,
                };
                if feeds_back {
                    if self.has_known_inflow(previous, Some(entered))
                        || self.is_river_looped(position, previous)
                    {
                        return Vec::new();
                    }
                    return vec![-entered];
                }
            }
        }

        let mut directions = Vec::with_capacity(4);
        for direction in Direction::ALL {
            if washed && entered.is_some_and(|entered| direction == -entered) {
                continue;
            }
            match self.river_flow(position, direction) {
                RiverFlow::Open => directions.push(direction),
                RiverFlow::Forced => return vec![direction],
                RiverFlow::Blocked => {}
            }
        }
        directions
    }

    /// Reports whether a player stepping from `previous` onto the river at
    /// `current` in direction `entered` is carried downstream.
    #[must_use]
    pub fn is_washed(&self, current: Position, previous: Position, entered: Direction) -> bool {
        if current == previous {
            return true;
        }
        if self.kind(current).is_some_and(|kind| kind.flows(-entered)) {
            return false;
        }
        if self.kind(previous).is_some_and(|kind| kind.flows(entered)) {
            return false;
        }
        true
    }

    /// Unions another grid's knowledge into this one.
    ///
    /// Unknown tiles absorb concrete kinds while the unique-object budget in
    /// `remaining` allows, possible exits resolve toward exits or off-map
    /// tiles, and unknown walls take the other grid's wall. A concrete wall is
    /// only replaced by an empty one, which corrects a wrongly assumed wall.
    /// Returns whether anything changed.
    pub fn merge_with(
        &mut self,
        other: &Grid,
        remaining: &mut BTreeMap<CellType, u32>,
    ) -> Result<bool, Contradiction> {
        if self.columns != other.columns || self.rows != other.rows {
            return Err(Contradiction::Merging);
        }
        let mut changed = false;
        for index in 0..self.cells.len() {
            let own = self.cells[index];
            let theirs = other.cells[index];
            match (own.kind, theirs.kind) {
                (CellKind::None, CellKind::None) => continue,
                (CellKind::Exit, CellKind::PossibleExit) => continue,
                (CellKind::PossibleExit, CellKind::Exit | CellKind::None) => {
                    self.cells[index] = theirs;
                    changed = true;
                    continue;
                }
                (CellKind::Unknown, kind) if kind != CellKind::Unknown => {
                    if let CellKind::River(flow) = kind {
                        let position = self.position_of(index);
                        if self.river_flow(position, flow) == RiverFlow::Blocked {
                            return Err(Contradiction::Merging);
                        }
                    }
                    consume_budget(remaining, kind.cell_type()).ok_or(Contradiction::Merging)?;
                    self.cells[index].kind = kind;
                    changed = true;
                }
                _ => {}
            }
            if let Some(walls) = merge_walls(&self.cells[index].walls, &theirs.walls) {
                self.cells[index].walls = walls;
                changed = true;
            }
        }
        Ok(changed)
    }

    fn index(&self, position: Position) -> Option<usize> {
        if position.level() != self.level {
            return None;
        }
        let x = u32::try_from(position.x()).ok()?;
        let y = u32::try_from(position.y()).ok()?;
        if x >= self.columns || y >= self.rows {
            return None;
        }
        let width = usize::try_from(self.columns).ok()?;
        usize::try_from(y)
            .ok()?
            .checked_mul(width)?
            .checked_add(usize::try_from(x).ok()?)
    }

    fn position_of(&self, index: usize) -> Position {
        let columns = self.columns.max(1) as usize;
        self.position((index % columns) as i32, (index / columns) as i32)
    }

    fn slot_mut(&mut self, position: Position) -> Option<&mut Cell> {
        let index = self.index(position)?;
        self.cells.get_mut(index)
    }
}

/// Decrements the budget of a unique kind; other kinds are unbounded.
///
/// Returns `None` when the budget is already exhausted.
pub(crate) fn consume_budget(remaining: &mut BTreeMap<CellType, u32>, cell_type: CellType) -> Option<()> {
    match remaining.get_mut(&cell_type) {
        Some(0) => None,
        Some(count) => {
            *count -= 1;
            Some(())
        }
        None => Some(()),
    }
}

fn merge_walls(own: &[WallKind; 4], theirs: &[WallKind; 4]) -> Option<[WallKind; 4]> {
    let mut merged = *own;
    let mut changed = false;
    for direction in Direction::ALL {
        let index = direction.index();
        let replace = match (own[index], theirs[index]) {
            (mine, other) if mine == other => false,
            (WallKind::Unknown, _) => true,
            (WallKind::Concrete, WallKind::Empty) => true,
            _ => false,
        };
        if replace {
            merged[index] = theirs[index];
            changed = true;
        }
    }
    changed.then_some(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bordered(columns: u32, rows: u32) -> Grid {
        let mut grid = Grid::filled(columns, rows, Cell::unknown());
        for y in 0..rows as i32 {
            for x in 0..columns as i32 {
                if x == 0 || y == 0 || x == columns as i32 - 1 || y == rows as i32 - 1 {
                    grid.set_cell(grid.position(x, y), Cell::none());
                }
            }
        }
        grid
    }

    #[test]
    fn add_wall_mirrors_onto_neighbour() {
        let mut grid = bordered(4, 4);
        let origin = grid.position(1, 1);
        grid.add_wall(origin, Direction::Right, WallKind::Concrete);

        assert_eq!(grid.wall(origin, Direction::Right), Some(WallKind::Concrete));
        assert_eq!(
            grid.wall(grid.position(2, 1), Direction::Left),
            Some(WallKind::Concrete)
        );
    }

    #[test]
    fn add_wall_skips_off_map_neighbour() {
        let mut grid = bordered(4, 4);
        let origin = grid.position(1, 1);
        grid.add_wall(origin, Direction::Top, WallKind::Outer);

        assert_eq!(grid.wall(origin, Direction::Top), Some(WallKind::Outer));
        assert_eq!(
            grid.wall(grid.position(1, 0), Direction::Bottom),
            Some(WallKind::Empty)
        );
    }

    #[test]
    fn create_exit_encloses_tile() {
        let mut grid = bordered(5, 5);
        let exit = grid.position(2, 0);
        grid.create_exit(exit, Direction::Bottom);

        assert_eq!(grid.kind(exit), Some(CellKind::Exit));
        assert_eq!(grid.wall(exit, Direction::Bottom), Some(WallKind::Entrance));
        assert_eq!(grid.wall(exit, Direction::Top), Some(WallKind::Outer));
        assert_eq!(
            grid.wall(grid.position(2, 1), Direction::Top),
            Some(WallKind::Exit)
        );
    }

    #[test]
    fn river_never_flows_head_on_or_into_land() {
        let mut grid = bordered(5, 5);
        grid.set_kind(grid.position(2, 1), CellKind::River(Direction::Left));
        grid.set_kind(grid.position(1, 2), CellKind::Ground);
        let origin = grid.position(1, 1);

        assert_eq!(grid.river_flow(origin, Direction::Right), RiverFlow::Blocked);
        assert_eq!(grid.river_flow(origin, Direction::Bottom), RiverFlow::Blocked);
        assert_eq!(grid.river_flow(origin, Direction::Top), RiverFlow::Blocked);
    }

    #[test]
    fn rivers_never_branch() {
        let mut grid = bordered(5, 5);
        grid.set_kind(grid.position(3, 2), CellKind::River(Direction::Left));
        let origin = grid.position(2, 1);

        assert_eq!(grid.river_flow(origin, Direction::Bottom), RiverFlow::Blocked);
        assert_eq!(grid.river_flow(origin, Direction::Left), RiverFlow::Open);
    }

    #[test]
    fn isolated_mouth_forces_flow() {
        let mut grid = bordered(4, 4);
        grid.set_kind(grid.position(2, 1), CellKind::RiverMouth);
        grid.set_kind(grid.position(2, 2), CellKind::Ground);
        let origin = grid.position(1, 1);

        assert_eq!(grid.river_flow(origin, Direction::Right), RiverFlow::Forced);
        assert_eq!(
            grid.possible_river_directions(origin, None, false),
            vec![Direction::Right]
        );
        assert!(grid.is_cause_of_isolated_mouth(origin));
    }

    #[test]
    fn loop_detection_follows_known_flow() {
        let mut grid = bordered(4, 4);
        grid.set_kind(grid.position(2, 1), CellKind::River(Direction::Bottom));
        grid.set_kind(grid.position(2, 2), CellKind::River(Direction::Left));
        grid.set_kind(grid.position(1, 2), CellKind::River(Direction::Top));
        let start = grid.position(1, 1);

        assert!(grid.is_river_looped(start, grid.position(2, 1)));
        assert_eq!(grid.river_flow(start, Direction::Right), RiverFlow::Blocked);
        assert!(!grid.is_river_looped(grid.position(3, 3), grid.position(2, 1)));
    }

    #[test]
    fn merge_absorbs_unknown_and_consumes_budget() {
        let mut own = bordered(4, 4);
        let mut theirs = own.clone();
        let target = own.position(1, 1);
        theirs.set_cell(target, Cell::open(CellKind::Clinic));
        let mut remaining = BTreeMap::from([(CellType::Clinic, 1)]);

        assert_eq!(own.merge_with(&theirs, &mut remaining), Ok(true));
        assert_eq!(own.kind(target), Some(CellKind::Clinic));
        assert_eq!(remaining.get(&CellType::Clinic), Some(&0));

        let mut fresh = bordered(4, 4);
        assert_eq!(
            fresh.merge_with(&theirs, &mut remaining),
            Err(Contradiction::Merging)
        );
    }

    #[test]
    fn merge_with_identical_copy_changes_nothing() {
        let mut grid = bordered(4, 4);
        grid.set_kind(grid.position(1, 1), CellKind::River(Direction::Right));
        grid.add_wall(grid.position(2, 2), Direction::Left, WallKind::Concrete);
        let copy = grid.clone();
        let mut remaining = BTreeMap::new();

        assert_eq!(grid.merge_with(&copy, &mut remaining), Ok(false));
        assert_eq!(grid, copy);
    }

    #[test]
    fn concrete_wall_is_corrected_to_empty() {
        let mut own = bordered(4, 4);
        let mut theirs = own.clone();
        let origin = own.position(1, 1);
        own.add_wall(origin, Direction::Right, WallKind::Concrete);
        theirs.add_wall(origin, Direction::Right, WallKind::Empty);
        let mut remaining = BTreeMap::new();

        assert_eq!(own.merge_with(&theirs, &mut remaining), Ok(true));
        assert_eq!(own.wall(origin, Direction::Right), Some(WallKind::Empty));
    }
}
