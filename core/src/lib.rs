#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the maze bot engine.
//!
//! This crate defines the vocabulary that connects the authoritative game
//! engine, the hypothesis engine and the decision systems. The engine reports
//! every turn as a [`TurnRecord`], the hypothesis engine folds those records
//! into per-player belief trees, and the decision systems answer with an
//! [`Action`] plus an optional [`Direction`].

use std::{
    collections::BTreeMap,
    fmt,
    ops::Neg,
};

use serde::{Deserialize, Serialize};

mod error;
mod rules;
mod turn;

pub use error::{ConfigError, Contradiction, TurnError};
pub use rules::{GameRules, GeneratorRules, PlayerStatRules};
pub use turn::{TurnAction, TurnRecord, TurnResponse};

/// Identifier of the level a position belongs to.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct LevelId(u32);

impl LevelId {
    /// Creates a new level identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Location of a single grid cell expressed as column and row coordinates.
///
/// Two positions are equal only when they share the same level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    x: i32,
    y: i32,
    #[serde(default)]
    level: LevelId,
}

impl Position {
    /// Creates a position on the default level.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self {
            x,
            y,
            level: LevelId::new(0),
        }
    }

    /// Creates a position on an explicit level.
    #[must_use]
    pub const fn on_level(x: i32, y: i32, level: LevelId) -> Self {
        Self { x, y, level }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Level the position belongs to.
    #[must_use]
    pub const fn level(&self) -> LevelId {
        self.level
    }

    /// Position of the neighbouring cell in the provided direction.
    #[must_use]
    pub const fn adjacent(self, direction: Direction) -> Self {
        let (dx, dy) = direction.offset();
        Self {
            x: self.x + dx,
            y: self.y + dy,
            level: self.level,
        }
    }

    /// Direction leading from `self` to an orthogonally adjacent `other`.
    #[must_use]
    pub fn direction_to(self, other: Position) -> Option<Direction> {
        if self.level != other.level {
            return None;
        }
        Direction::ALL
            .into_iter()
            .find(|direction| self.adjacent(*direction) == other)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Cardinal directions; the only adjacency relation of the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Toward decreasing row indices.
    Top,
    /// Toward increasing column indices.
    Right,
    /// Toward increasing row indices.
    Bottom,
    /// Toward decreasing column indices.
    Left,
}

impl Direction {
    /// Every direction in canonical order.
    pub const ALL: [Direction; 4] = [
        Direction::Top,
        Direction::Right,
        Direction::Bottom,
        Direction::Left,
    ];

    /// Direction pointing the opposite way.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Top => Self::Bottom,
            Self::Right => Self::Left,
            Self::Bottom => Self::Top,
            Self::Left => Self::Right,
        }
    }

    /// Column and row delta applied when stepping in this direction.
    #[must_use]
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Self::Top => (0, -1),
            Self::Right => (1, 0),
            Self::Bottom => (0, 1),
            Self::Left => (-1, 0),
        }
    }

    /// Dense index used for per-direction storage.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Top => 0,
            Self::Right => 1,
            Self::Bottom => 2,
            Self::Left => 3,
        }
    }

    /// Reports whether the direction moves along the vertical axis.
    #[must_use]
    pub const fn is_vertical(self) -> bool {
        matches!(self, Self::Top | Self::Bottom)
    }
}

impl Neg for Direction {
    type Output = Direction;

    fn neg(self) -> Self::Output {
        self.opposite()
    }
}

/// Actions a player may take on its turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Step across one wall.
    Move,
    /// Fire an arrow along a row or column.
    ShootBow,
    /// Throw a bomb at one wall of the current cell.
    ThrowBomb,
    /// Swap the carried treasure with one lying on the current cell.
    SwapTreasure,
    /// Stay in place.
    Skip,
    /// Ask the engine about the current cell.
    Info,
}

impl Action {
    /// Every action in canonical order.
    pub const ALL: [Action; 6] = [
        Action::Move,
        Action::ShootBow,
        Action::ThrowBomb,
        Action::SwapTreasure,
        Action::Skip,
        Action::Info,
    ];

    /// Reports whether the action is aimed along a direction.
    #[must_use]
    pub const fn requires_direction(self) -> bool {
        matches!(self, Self::Move | Self::ShootBow | Self::ThrowBomb)
    }
}

/// Set of actions the engine currently allows a player to take.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Abilities(BTreeMap<Action, bool>);

impl Abilities {
    /// Abilities with every action allowed.
    #[must_use]
    pub fn all() -> Self {
        Action::ALL.into_iter().map(|action| (action, true)).collect()
    }

    /// Returns a copy with the provided action toggled.
    #[must_use]
    pub fn with(mut self, action: Action, allowed: bool) -> Self {
        let _ = self.0.insert(action, allowed);
        self
    }

    /// Reports whether the action is allowed; unlisted actions are not.
    #[must_use]
    pub fn allows(&self, action: Action) -> bool {
        self.0.get(&action).copied().unwrap_or(false)
    }
}

impl FromIterator<(Action, bool)> for Abilities {
    fn from_iter<T: IntoIterator<Item = (Action, bool)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Cell kinds without payload, named as the engine names them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CellType {
    /// Off-map tile.
    #[serde(rename = "NoneCell")]
    None,
    /// Plain ground.
    #[serde(rename = "Cell")]
    Ground,
    /// One-way river segment.
    #[serde(rename = "CellRiver")]
    River,
    /// River terminus.
    #[serde(rename = "CellRiverMouth")]
    RiverMouth,
    /// Maze exit.
    #[serde(rename = "CellExit")]
    Exit,
    /// Room that restores health.
    #[serde(rename = "CellClinic")]
    Clinic,
    /// Room that restores arrows and bombs.
    #[serde(rename = "CellArmory")]
    Armory,
    /// Room that restores arrows.
    #[serde(rename = "CellArmoryWeapon")]
    ArmoryWeapon,
    /// Room that restores bombs.
    #[serde(rename = "CellArmoryExplosive")]
    ArmoryExplosive,
    /// Tile that has not been resolved yet.
    #[serde(rename = "UnknownCell")]
    Unknown,
    /// Boundary tile that may still turn out to be an exit.
    #[serde(rename = "PossibleExit")]
    PossibleExit,
}

impl CellType {
    /// Reports whether the type is a room that exists a bounded number of times.
    #[must_use]
    pub const fn is_unique_room(self) -> bool {
        matches!(
            self,
            Self::Clinic | Self::Armory | Self::ArmoryWeapon | Self::ArmoryExplosive
        )
    }

    /// Reports whether the type is a concrete resolved kind inside the map.
    #[must_use]
    pub const fn is_resolved_land(self) -> bool {
        !matches!(self, Self::None | Self::Unknown | Self::PossibleExit)
    }
}

/// Tagged cell kind carried by every tile of a hypothesis grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellKind {
    /// Off-map tile.
    None,
    /// Plain ground.
    Ground,
    /// River segment flowing in the carried direction.
    River(Direction),
    /// River terminus.
    RiverMouth,
    /// Maze exit.
    Exit,
    /// Health room.
    Clinic,
    /// Combined weapon room.
    Armory,
    /// Arrow room.
    ArmoryWeapon,
    /// Bomb room.
    ArmoryExplosive,
    /// Unresolved tile.
    Unknown,
    /// Boundary tile that may resolve to an exit.
    PossibleExit,
}

impl CellKind {
    /// Builds a kind from its payload-free type.
    ///
    /// Rivers need a flow direction; `None` is returned when it is missing.
    #[must_use]
    pub const fn from_type(cell_type: CellType, river_direction: Option<Direction>) -> Option<Self> {
        let kind = match cell_type {
            CellType::None => Self::None,
            CellType::Ground => Self::Ground,
            CellType::River => match river_direction {
                Some(direction) => Self::River(direction),
                None => return None,
            },
            CellType::RiverMouth => Self::RiverMouth,
            CellType::Exit => Self::Exit,
            CellType::Clinic => Self::Clinic,
            CellType::Armory => Self::Armory,
            CellType::ArmoryWeapon => Self::ArmoryWeapon,
            CellType::ArmoryExplosive => Self::ArmoryExplosive,
            CellType::Unknown => Self::Unknown,
            CellType::PossibleExit => Self::PossibleExit,
        };
        Some(kind)
    }

    /// Payload-free type of the kind.
    #[must_use]
    pub const fn cell_type(self) -> CellType {
        match self {
            Self::None => CellType::None,
            Self::Ground => CellType::Ground,
            Self::River(_) => CellType::River,
            Self::RiverMouth => CellType::RiverMouth,
            Self::Exit => CellType::Exit,
            Self::Clinic => CellType::Clinic,
            Self::Armory => CellType::Armory,
            Self::ArmoryWeapon => CellType::ArmoryWeapon,
            Self::ArmoryExplosive => CellType::ArmoryExplosive,
            Self::Unknown => CellType::Unknown,
            Self::PossibleExit => CellType::PossibleExit,
        }
    }

    /// Flow direction when the kind is a river.
    #[must_use]
    pub const fn river_direction(self) -> Option<Direction> {
        match self {
            Self::River(direction) => Some(direction),
            _ => None,
        }
    }

    /// Reports whether the kind is a river flowing in `direction`.
    #[must_use]
    pub fn flows(self, direction: Direction) -> bool {
        self.river_direction() == Some(direction)
    }
}

/// Wall kinds, including the resolution states only hypotheses use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WallKind {
    /// Passable edge.
    #[serde(rename = "WallEmpty")]
    Empty,
    /// Breakable wall that blocks players and weapons.
    #[serde(rename = "WallConcrete")]
    Concrete,
    /// Unbreakable boundary.
    #[serde(rename = "WallOuter")]
    Outer,
    /// Passable edge leading out of the maze.
    #[serde(rename = "WallExit")]
    Exit,
    /// Passable edge leading from an exit back into the maze.
    #[serde(rename = "WallEntrance")]
    Entrance,
    /// Wall that bounces players back and blocks weapons.
    #[serde(rename = "WallRubber")]
    Rubber,
    /// Edge that has not been resolved yet.
    #[serde(rename = "UnknownWall")]
    Unknown,
    /// Edge a bomb failed to break.
    #[serde(rename = "UnbreakableWall")]
    Unbreakable,
}

impl WallKind {
    /// Reports whether a bomb may break the wall.
    #[must_use]
    pub const fn breakable(self) -> bool {
        matches!(
            self,
            Self::Empty | Self::Concrete | Self::Rubber | Self::Unknown
        )
    }

    /// Reports whether the wall stops arrows.
    #[must_use]
    pub const fn weapon_collision(self) -> bool {
        !matches!(self, Self::Empty | Self::Unknown)
    }

    /// Reports whether the wall stops players.
    #[must_use]
    pub const fn player_collision(self) -> bool {
        matches!(
            self,
            Self::Concrete | Self::Outer | Self::Rubber | Self::Unbreakable
        )
    }
}

/// Treasure kinds the engine distinguishes once a treasure is carried out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreasureKind {
    /// The real treasure.
    Very,
    /// A fake treasure.
    Spurious,
    /// A trapped treasure.
    Mined,
}

#[cfg(test)]
mod tests {
    use super::{Abilities, Action, CellKind, CellType, Direction, LevelId, Position, WallKind};
    use serde::{de::DeserializeOwned, Serialize};

    #[test]
    fn negation_reverses_every_direction() {
        for direction in Direction::ALL {
            assert_eq!(-(-direction), direction);
            assert_ne!(-direction, direction);
        }
        assert_eq!(-Direction::Top, Direction::Bottom);
        assert_eq!(-Direction::Left, Direction::Right);
    }

    #[test]
    fn adjacent_follows_offsets() {
        let origin = Position::new(2, 2);
        assert_eq!(origin.adjacent(Direction::Top), Position::new(2, 1));
        assert_eq!(origin.adjacent(Direction::Right), Position::new(3, 2));
        assert_eq!(origin.adjacent(Direction::Bottom), Position::new(2, 3));
        assert_eq!(origin.adjacent(Direction::Left), Position::new(1, 2));
        assert_eq!(
            origin.direction_to(Position::new(3, 2)),
            Some(Direction::Right)
        );
        assert_eq!(origin.direction_to(Position::new(4, 2)), None);
    }

    #[test]
    fn position_equality_requires_matching_level() {
        let ground = Position::new(1, 1);
        let upper = Position::on_level(1, 1, LevelId::new(1));
        assert_ne!(ground, upper);
        assert_eq!(ground.direction_to(upper.adjacent(Direction::Top)), None);
    }

    #[test]
    fn wall_properties_match_rules() {
        assert!(WallKind::Unknown.breakable());
        assert!(!WallKind::Unknown.player_collision());
        assert!(!WallKind::Outer.breakable());
        assert!(WallKind::Unbreakable.player_collision());
        assert!(!WallKind::Exit.player_collision());
        assert!(WallKind::Exit.weapon_collision());
        assert!(WallKind::Rubber.breakable());
    }

    #[test]
    fn river_kind_needs_direction() {
        assert_eq!(CellKind::from_type(CellType::River, None), None);
        assert_eq!(
            CellKind::from_type(CellType::River, Some(Direction::Left)),
            Some(CellKind::River(Direction::Left))
        );
        assert!(CellKind::River(Direction::Left).flows(Direction::Left));
        assert_eq!(
            CellKind::River(Direction::Top).cell_type(),
            CellType::River
        );
    }

    #[test]
    fn abilities_default_to_denied() {
        let abilities = Abilities::default().with(Action::Move, true);
        assert!(abilities.allows(Action::Move));
        assert!(!abilities.allows(Action::ThrowBomb));
        assert!(Abilities::all().allows(Action::SwapTreasure));
    }

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn position_round_trips_through_bincode() {
        assert_round_trip(&Position::on_level(3, 4, LevelId::new(2)));
    }

    #[test]
    fn cell_kind_round_trips_through_bincode() {
        assert_round_trip(&CellKind::River(Direction::Bottom));
    }

    #[test]
    fn engine_names_deserialize() {
        let cell: CellType = serde_json::from_str("\"CellRiverMouth\"").expect("cell type");
        assert_eq!(cell, CellType::RiverMouth);
        let wall: WallKind = serde_json::from_str("\"WallRubber\"").expect("wall kind");
        assert_eq!(wall, WallKind::Rubber);
        let action: Action = serde_json::from_str("\"shoot_bow\"").expect("action");
        assert_eq!(action, Action::ShootBow);
    }
}
