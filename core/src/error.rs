//! Error types shared by every crate of the engine.

use thiserror::Error;

use crate::{Action, CellType, Position};

/// Reasons a hypothesis cannot describe the real game.
///
/// None of these are program faults. The component that owns the hypothesis
/// tree converts them into leaf removal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error)]
pub enum Contradiction {
    /// Processing an action contradicted the physics of the hypothesis.
    #[error("hypothesis reached a physically unreachable state")]
    Unreachable,
    /// Two hypotheses disagree on object budgets or positions.
    #[error("hypotheses cannot be merged")]
    Merging,
    /// No other player considers the hypothesis possible.
    #[error("hypothesis is incompatible with every other player")]
    Incompatible,
    /// No leaf of another player matches the hypothesis.
    #[error("no leaf of another player matches the hypothesis")]
    Matching,
}

/// Malformed or impossible game configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration text could not be parsed as TOML.
    #[error("failed to parse rules toml: {0}")]
    Toml(#[from] toml::de::Error),
    /// The configuration text could not be parsed as JSON.
    #[error("failed to parse rules json: {0}")]
    Json(#[from] serde_json::Error),
    /// A configured value lies outside its permitted range.
    #[error("{field}: {message}")]
    InvalidField {
        /// Dotted path of the offending field.
        field: &'static str,
        /// Human readable explanation.
        message: String,
    },
    /// The unique-object table names a kind that is not a room.
    #[error("cell type {0:?} cannot be counted as a unique object")]
    NotUniqueObject(CellType),
    /// Two rules cannot hold at the same time.
    #[error("impossible rule combination: {0}")]
    ImpossibleRules(&'static str),
    /// No players were provided.
    #[error("at least one player must be tracked")]
    NoPlayers,
    /// A player name was provided twice.
    #[error("player `{0}` is tracked twice")]
    DuplicatePlayer(String),
    /// A configured spawn lies outside the playable area.
    #[error("spawn {position} of player `{player}` lies outside the grid")]
    SpawnOutOfBounds {
        /// Name of the player.
        player: String,
        /// Offending spawn position.
        position: Position,
    },
}

/// Malformed turn records received from the engine.
#[derive(Debug, Error)]
pub enum TurnError {
    /// The record could not be decoded.
    #[error("failed to decode turn record: {0}")]
    Decode(#[from] serde_json::Error),
    /// A directed action arrived without its direction.
    #[error("action {0:?} requires a direction")]
    MissingDirection(Action),
    /// The record names a player that is not tracked.
    #[error("unknown player `{0}`")]
    UnknownPlayer(String),
}
