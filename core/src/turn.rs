//! Turn records exchanged with the authoritative engine.

use serde::{Deserialize, Serialize};

use crate::{Action, CellType, Direction, TreasureKind, TurnError, WallKind};

/// Action-specific payload the engine reports after a turn.
///
/// Only the fields relevant to the performed action are populated; the rest
/// keep their defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TurnResponse {
    /// Kind of the cell the player occupies once the turn ends.
    pub type_cell_at_end_of_turn: Option<CellType>,
    /// Kind of the cell the player reached right after crossing the wall.
    pub type_cell_after_wall_check: Option<CellType>,
    /// Whether the player crossed the wall it walked into.
    pub wall_passed: bool,
    /// Wall the player bounced off, when it did not pass.
    pub wall_type: Option<WallKind>,
    /// Whether the river carried the player to another cell.
    pub diff_cells: bool,
    /// Whether an arrow hit anybody.
    pub hit: bool,
    /// Players damaged by the arrow.
    pub dmg_pls: Vec<String>,
    /// Players killed by the arrow.
    pub dead_pls: Vec<String>,
    /// Players that dropped their treasure.
    pub drop_pls: Vec<String>,
    /// Whether the player carried a treasure before swapping.
    pub had_treasure: bool,
    /// Number of treasures lying on the turn-end cell.
    pub cell_treasures_amount: u32,
    /// Kind of the treasure carried out through an exit.
    pub type_out_treasure: Option<TreasureKind>,
    /// Whether the bomb destroyed the wall.
    pub destroyed: bool,
}

/// One turn as reported by the engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnRecord {
    /// Name of the acting player.
    pub player_name: String,
    /// Action the player took.
    pub action: Action,
    /// Direction of the action, when it has one.
    #[serde(default)]
    pub direction: Option<Direction>,
    /// Payload describing the outcome.
    #[serde(default)]
    pub response: TurnResponse,
}

impl TurnRecord {
    /// Decodes a record from the engine's JSON representation.
    pub fn from_json(text: &str) -> Result<Self, TurnError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Combines the action and its direction into a [`TurnAction`].
    pub fn turn_action(&self) -> Result<TurnAction, TurnError> {
        TurnAction::new(self.action, self.direction)
    }
}

/// Closed union of an action and the direction it needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TurnAction {
    /// Step across one wall.
    Move(Direction),
    /// Fire an arrow.
    ShootBow(Direction),
    /// Throw a bomb at a wall.
    ThrowBomb(Direction),
    /// Swap treasures with the current cell.
    SwapTreasure,
    /// Stay in place.
    Skip,
    /// Inspect the current cell.
    Info,
}

impl TurnAction {
    /// Pairs an action with its direction, rejecting directed actions without one.
    ///
    /// Directions supplied to undirected actions are ignored.
    pub fn new(action: Action, direction: Option<Direction>) -> Result<Self, TurnError> {
        let directed = |build: fn(Direction) -> TurnAction| {
            direction
                .map(build)
                .ok_or(TurnError::MissingDirection(action))
        };
        match action {
            Action::Move => directed(TurnAction::Move),
            Action::ShootBow => directed(TurnAction::ShootBow),
            Action::ThrowBomb => directed(TurnAction::ThrowBomb),
            Action::SwapTreasure => Ok(TurnAction::SwapTreasure),
            Action::Skip => Ok(TurnAction::Skip),
            Action::Info => Ok(TurnAction::Info),
        }
    }

    /// Payload-free action.
    #[must_use]
    pub const fn action(self) -> Action {
        match self {
            Self::Move(_) => Action::Move,
            Self::ShootBow(_) => Action::ShootBow,
            Self::ThrowBomb(_) => Action::ThrowBomb,
            Self::SwapTreasure => Action::SwapTreasure,
            Self::Skip => Action::Skip,
            Self::Info => Action::Info,
        }
    }

    /// Direction of the action, when it has one.
    #[must_use]
    pub const fn direction(self) -> Option<Direction> {
        match self {
            Self::Move(direction) | Self::ShootBow(direction) | Self::ThrowBomb(direction) => {
                Some(direction)
            }
            Self::SwapTreasure | Self::Skip | Self::Info => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_record_decodes_from_engine_json() {
        let record = TurnRecord::from_json(
            r#"{
                "player_name": "alice",
                "action": "move",
                "direction": "right",
                "response": {
                    "type_cell_after_wall_check": "CellRiver",
                    "type_cell_at_end_of_turn": "CellRiverMouth",
                    "wall_passed": true,
                    "diff_cells": true,
                    "cell_treasures_amount": 0
                }
            }"#,
        )
        .expect("record decodes");

        assert_eq!(record.player_name, "alice");
        assert_eq!(
            record.turn_action().expect("directed"),
            TurnAction::Move(Direction::Right)
        );
        assert_eq!(
            record.response.type_cell_at_end_of_turn,
            Some(CellType::RiverMouth)
        );
        assert!(record.response.diff_cells);
        assert!(!record.response.hit);
    }

    #[test]
    fn directed_action_without_direction_is_rejected() {
        let error = TurnAction::new(Action::ThrowBomb, None).expect_err("direction required");
        assert!(matches!(error, TurnError::MissingDirection(Action::ThrowBomb)));
    }

    #[test]
    fn undirected_action_ignores_direction() {
        let action = TurnAction::new(Action::Skip, Some(Direction::Left)).expect("skip");
        assert_eq!(action, TurnAction::Skip);
        assert_eq!(action.direction(), None);
        assert_eq!(action.action(), Action::Skip);
    }

    #[test]
    fn unknown_action_fails_to_decode() {
        let result = TurnRecord::from_json(r#"{"player_name": "bob", "action": "dance"}"#);
        assert!(matches!(result, Err(TurnError::Decode(_))));
    }
}
