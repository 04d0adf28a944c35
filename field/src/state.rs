//! One map hypothesis and the transitions the engine's turn responses drive.

use std::collections::BTreeMap;

use maze_bot_core::{
    Abilities, Action, CellKind, CellType, Contradiction, Direction, Position, TurnAction,
    TurnResponse, WallKind,
};
use tracing::trace;

use crate::{grid::consume_budget, Cell, CommonData, Grid};

mod river;

/// Outcome of applying one turn to a hypothesis.
#[derive(Debug, PartialEq, Eq)]
pub enum Transition {
    /// The hypothesis absorbed the turn in place.
    Updated,
    /// The hypothesis split; the successors replace it as the current belief.
    ///
    /// Always holds at least two successors.
    Branched(Vec<FieldState>),
}

/// Single internally consistent guess at the hidden map.
///
/// Tracks the grid, the position of every tracked player (`None` while
/// unknown), the treasures believed to lie on the map and how many of each
/// unique room kind are still unplaced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldState {
    grid: Grid,
    players: BTreeMap<String, Option<Position>>,
    treasures: Vec<Position>,
    remaining: BTreeMap<CellType, u32>,
}

/// Player whose turn is being applied together with the shared constraints.
#[derive(Clone, Copy)]
struct Actor<'a> {
    common: &'a CommonData,
    player: &'a str,
}

impl FieldState {
    /// Creates a hypothesis where every listed player's position is unknown.
    #[must_use]
    pub fn new<I, S>(grid: Grid, players: I, remaining: BTreeMap<CellType, u32>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            grid,
            players: players.into_iter().map(|name| (name.into(), None)).collect(),
            treasures: Vec::new(),
            remaining,
        }
    }

    /// Grid of the hypothesis.
    #[must_use]
    pub const fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Known position of a player.
    #[must_use]
    pub fn player_position(&self, player: &str) -> Option<Position> {
        self.players.get(player).copied().flatten()
    }

    /// Every tracked player with its known position.
    pub fn players(&self) -> impl Iterator<Item = (&str, Option<Position>)> + '_ {
        self.players
            .iter()
            .map(|(name, position)| (name.as_str(), *position))
    }

    /// Positions of the treasures believed to lie on the map.
    #[must_use]
    pub fn treasures(&self) -> &[Position] {
        &self.treasures
    }

    /// Unique room kinds still unplaced in this hypothesis.
    #[must_use]
    pub const fn remaining(&self) -> &BTreeMap<CellType, u32> {
        &self.remaining
    }

    /// Places a player on the map.
    pub fn set_player_position(&mut self, player: &str, position: Position) {
        let _ = self.players.insert(player.to_owned(), Some(position));
    }

    /// Records a treasure under the acting player when the engine lets it swap.
    pub fn preprocess(
        &mut self,
        common: &CommonData,
        player: &str,
        abilities: &Abilities,
    ) -> Result<(), Contradiction> {
        let Some(position) = self.player_position(player) else {
            return Ok(());
        };
        if abilities.allows(Action::SwapTreasure) {
            self.merge_treasures(common, &[position])?;
        }
        Ok(())
    }

    /// Applies one turn of `player` reported by the engine.
    ///
    /// Hypotheses where the acting player's position is unknown cannot learn
    /// anything from map-bound responses and are left untouched.
    pub fn process_action(
        &mut self,
        common: &CommonData,
        player: &str,
        action: TurnAction,
        response: &TurnResponse,
    ) -> Result<Transition, Contradiction> {
        let actor = Actor { common, player };
        let mut successors = match action {
            TurnAction::Move(direction) => self.on_move(actor, direction, response)?,
            TurnAction::ShootBow(direction) => self.on_shoot(actor, direction, response)?,
            TurnAction::ThrowBomb(direction) => self.on_bomb(actor, direction, response)?,
            TurnAction::SwapTreasure => self.on_swap(actor, response)?,
            TurnAction::Skip => self.on_pass(actor, response)?,
            TurnAction::Info => self.on_info(actor, response)?,
        };
        if successors.len() == 1 {
            if let Some(successor) = successors.pop() {
                *self = successor;
            }
        }
        if successors.is_empty() {
            Ok(Transition::Updated)
        } else {
            Ok(Transition::Branched(successors))
        }
    }

    /// Lets rivers carry the treasures lying on them one cell downstream.
    ///
    /// Treasures swept into an unexplored tile are forgotten.
    pub fn make_host_turn(&mut self) {
        let grid = &self.grid;
        let mut drifted = Vec::with_capacity(self.treasures.len());
        let mut settled = Vec::with_capacity(self.treasures.len());
        for &position in &self.treasures {
            match grid.kind(position) {
                Some(CellKind::River(flow)) => {
                    let destination = grid
                        .neighbour(position, flow)
                        .filter(|next| !matches!(grid.kind(*next), Some(CellKind::Unknown) | None));
                    drifted.extend(destination);
                }
                _ => settled.push(position),
            }
        }
        settled.extend(drifted);
        self.treasures = settled;
    }

    /// Unions another hypothesis of the same game into this one.
    pub fn merge_with(
        &mut self,
        common: &CommonData,
        other: &FieldState,
    ) -> Result<(), Contradiction> {
        let _ = self.grid.merge_with(&other.grid, &mut self.remaining)?;
        for (player, position) in self.players.iter_mut() {
            let theirs = other.players.get(player).copied().flatten();
            match (*position, theirs) {
                (None, Some(_)) => *position = theirs,
                (Some(own), Some(theirs)) if own != theirs => return Err(Contradiction::Merging),
                _ => {}
            }
        }
        self.merge_treasures(common, &other.treasures)
    }

    fn position_of(&self, actor: Actor<'_>) -> Option<Position> {
        self.player_position(actor.player)
    }

    fn move_player(&mut self, actor: Actor<'_>, position: Position) {
        self.set_player_position(actor.player, position);
    }

    fn on_move(
        &mut self,
        actor: Actor<'_>,
        direction: Direction,
        response: &TurnResponse,
    ) -> Result<Vec<FieldState>, Contradiction> {
        let Some(start) = self.position_of(actor) else {
            return Ok(Vec::new());
        };
        let after_wall = response
            .type_cell_after_wall_check
            .ok_or(Contradiction::Unreachable)?;

        let (target, direction) = self.cross_wall(actor, start, direction, response)?;
        let Some(target) = target else {
            return Err(Contradiction::Unreachable);
        };
        let target_kind = self.grid.kind(target).ok_or(Contradiction::Unreachable)?;
        if target_kind == CellKind::None {
            return Err(Contradiction::Unreachable);
        }
        if target_kind != CellKind::Unknown && target_kind.cell_type() != after_wall {
            return Err(Contradiction::Unreachable);
        }

        let successors = if after_wall == CellType::River {
            self.river_trajectories(
                actor,
                target,
                response.type_cell_at_end_of_turn,
                response.diff_cells,
                Some(direction),
            )?
        } else {
            if target_kind == CellKind::Unknown {
                self.update_cell_type(actor, after_wall, target, None)?;
            }
            self.move_player(actor, target);
            Vec::new()
        };
        self.record_treasures(actor, response, successors)
    }

    /// Touches the wall in front of the player and returns where the player
    /// ends up before any river carries it, together with the direction it
    /// entered that tile in.
    fn cross_wall(
        &mut self,
        actor: Actor<'_>,
        start: Position,
        direction: Direction,
        response: &TurnResponse,
    ) -> Result<(Option<Position>, Direction), Contradiction> {
        let start_kind = self.grid.kind(start);
        let turn_end = response.type_cell_at_end_of_turn;
        let mut target = self.grid.neighbour(start, direction);
        let mut entered = direction;

        if !response.wall_passed {
            self.bounce(actor, start, target, direction, response.wall_type)?;
            target = Some(start);
            entered = -direction;
        } else if turn_end != Some(CellType::Exit) && start_kind != Some(CellKind::Exit) {
            self.grid.add_wall(start, direction, WallKind::Empty);
        }

        if turn_end == Some(CellType::Exit) {
            let position = target.ok_or(Contradiction::Unreachable)?;
            if self.grid.kind(position) != Some(CellKind::Exit) {
                self.update_cell_type(actor, CellType::Exit, position, Some(-entered))?;
            }
        }
        Ok((target, entered))
    }

    fn bounce(
        &mut self,
        actor: Actor<'_>,
        start: Position,
        target: Option<Position>,
        direction: Direction,
        wall: Option<WallKind>,
    ) -> Result<(), Contradiction> {
        let Some(target) = target else {
            return Ok(());
        };
        let start_kind = self.grid.kind(start);
        if start_kind == Some(CellKind::Exit) {
            return Ok(());
        }
        let target_kind = self.grid.kind(target);
        if target_kind.is_some_and(|kind| kind.flows(-direction))
            || start_kind.is_some_and(|kind| kind.flows(direction))
        {
            return Err(Contradiction::Unreachable);
        }
        let wall = if matches!(
            target_kind,
            Some(CellKind::None | CellKind::PossibleExit)
        ) {
            self.update_cell_type(actor, CellType::None, target, None)?;
            WallKind::Outer
        } else {
            wall.unwrap_or(WallKind::Concrete)
        };
        self.grid.add_wall(start, direction, wall);
        Ok(())
    }

    fn on_shoot(
        &mut self,
        actor: Actor<'_>,
        direction: Direction,
        response: &TurnResponse,
    ) -> Result<Vec<FieldState>, Contradiction> {
        if let Some(shooter) = self.position_of(actor) {
            for damaged in &response.dmg_pls {
                if let Some(target) = self.player_position(damaged) {
                    check_shot(shooter, target, direction)?;
                }
            }
        }
        let dropped: Vec<Position> = response
            .drop_pls
            .iter()
            .filter_map(|name| self.player_position(name))
            .collect();
        self.merge_treasures(actor.common, &dropped)?;
        self.on_pass(actor, response)
    }

    fn on_bomb(
        &mut self,
        actor: Actor<'_>,
        direction: Direction,
        response: &TurnResponse,
    ) -> Result<Vec<FieldState>, Contradiction> {
        let Some(position) = self.position_of(actor) else {
            return Ok(Vec::new());
        };
        let wall = self
            .grid
            .wall(position, direction)
            .ok_or(Contradiction::Unreachable)?;
        if response.destroyed {
            if !wall.breakable() {
                return Err(Contradiction::Unreachable);
            }
            self.grid.add_wall(position, direction, WallKind::Empty);
        } else if wall == WallKind::Unknown {
            self.grid.add_wall(position, direction, WallKind::Unbreakable);
        } else if wall.breakable() {
            return Err(Contradiction::Unreachable);
        }
        self.on_pass(actor, response)
    }

    fn on_swap(
        &mut self,
        actor: Actor<'_>,
        response: &TurnResponse,
    ) -> Result<Vec<FieldState>, Contradiction> {
        let Some(position) = self.position_of(actor) else {
            // The pickup is already counted among the carried treasures.
            let carried = actor.common.players_with_treasures() as usize;
            let mut successors = Vec::with_capacity(self.treasures.len() + 1);
            if self.treasures.len() + carried <= actor.common.treasures_amount() as usize {
                successors.push(self.clone());
            }
            for index in 0..self.treasures.len() {
                let mut successor = self.clone();
                let _ = successor.treasures.remove(index);
                successors.push(successor);
            }
            if successors.is_empty() {
                return Err(Contradiction::Unreachable);
            }
            return Ok(successors);
        };
        if !response.had_treasure {
            let index = self
                .treasures
                .iter()
                .position(|treasure| *treasure == position)
                .ok_or(Contradiction::Unreachable)?;
            let _ = self.treasures.remove(index);
        }
        Ok(Vec::new())
    }

    fn on_pass(
        &mut self,
        actor: Actor<'_>,
        response: &TurnResponse,
    ) -> Result<Vec<FieldState>, Contradiction> {
        let Some(position) = self.position_of(actor) else {
            return Ok(Vec::new());
        };
        let turn_end = response.type_cell_at_end_of_turn;
        let mut successors = Vec::new();

        if let Some(CellKind::River(flow)) = self.grid.kind(position) {
            let end = self
                .grid
                .neighbour(position, flow)
                .ok_or(Contradiction::Unreachable)?;
            let end_kind = self.grid.kind(end).ok_or(Contradiction::Unreachable)?;
            if Some(end_kind.cell_type()) == turn_end {
                self.move_player(actor, end);
            } else if end_kind != CellKind::Unknown {
                return Err(Contradiction::Unreachable);
            } else if turn_end == Some(CellType::River) {
                successors = self.river_trajectories(actor, end, turn_end, false, Some(flow))?;
            } else if turn_end == Some(CellType::RiverMouth) {
                self.update_cell_type(actor, CellType::RiverMouth, end, None)?;
                self.move_player(actor, end);
            } else {
                return Err(Contradiction::Unreachable);
            }
        }
        self.record_treasures(actor, response, successors)
    }

    fn on_info(
        &mut self,
        actor: Actor<'_>,
        response: &TurnResponse,
    ) -> Result<Vec<FieldState>, Contradiction> {
        let Some(position) = self.position_of(actor) else {
            return Ok(Vec::new());
        };
        let turn_end = response
            .type_cell_at_end_of_turn
            .ok_or(Contradiction::Unreachable)?;
        let successors = if turn_end == CellType::River {
            self.river_trajectories(actor, position, Some(turn_end), false, None)?
        } else {
            self.update_cell_type(actor, turn_end, position, None)?;
            Vec::new()
        };
        self.record_treasures(actor, response, successors)
    }

    /// Folds the number of treasures lying under the player into the
    /// hypothesis or into each successor; failing successors are discarded.
    fn record_treasures(
        &mut self,
        actor: Actor<'_>,
        response: &TurnResponse,
        mut successors: Vec<FieldState>,
    ) -> Result<Vec<FieldState>, Contradiction> {
        let amount = response.cell_treasures_amount;
        if successors.is_empty() {
            self.absorb_cell_treasures(actor, amount)?;
            return Ok(successors);
        }
        successors.retain_mut(|state| match state.absorb_cell_treasures(actor, amount) {
            Ok(()) => true,
            Err(reason) => {
                trace!(player = actor.player, ?reason, "treasure count rejects branch");
                false
            }
        });
        if successors.is_empty() {
            return Err(Contradiction::Unreachable);
        }
        Ok(successors)
    }

    fn absorb_cell_treasures(&mut self, actor: Actor<'_>, amount: u32) -> Result<(), Contradiction> {
        let Some(position) = self.position_of(actor) else {
            return Ok(());
        };
        let known = self
            .treasures
            .iter()
            .filter(|treasure| **treasure == position)
            .count();
        let amount = amount as usize;
        if known > amount {
            return Err(Contradiction::Unreachable);
        }
        self.merge_treasures(actor.common, &vec![position; amount])
    }

    /// Adds the treasures of `other` this hypothesis does not know about yet.
    ///
    /// Both lists are multisets: a position listed twice holds two treasures.
    fn merge_treasures(
        &mut self,
        common: &CommonData,
        other: &[Position],
    ) -> Result<(), Contradiction> {
        if other.is_empty() {
            return Ok(());
        }
        let mut unmatched = self.treasures.clone();
        let mut added = Vec::new();
        for position in other {
            match unmatched.iter().position(|known| known == position) {
                Some(index) => {
                    let _ = unmatched.swap_remove(index);
                }
                None => added.push(*position),
            }
        }
        let total = self.treasures.len() + added.len() + common.players_with_treasures() as usize;
        if total > common.treasures_amount() as usize {
            return Err(Contradiction::Merging);
        }
        self.treasures.extend(added);
        Ok(())
    }

    /// Resolves the tile at `position` to `cell_type`.
    ///
    /// Exits need the direction of their entrance and rivers the direction
    /// of their flow.
    fn update_cell_type(
        &mut self,
        actor: Actor<'_>,
        cell_type: CellType,
        position: Position,
        direction: Option<Direction>,
    ) -> Result<(), Contradiction> {
        let current = self.grid.kind(position).ok_or(Contradiction::Unreachable)?;
        if current != CellKind::None {
            if !matches!(cell_type, CellType::River | CellType::RiverMouth)
                && self.grid.has_known_inflow(position, None)
            {
                return Err(Contradiction::Unreachable);
            }
            if cell_type != CellType::River && self.grid.is_cause_of_isolated_mouth(position) {
                return Err(Contradiction::Unreachable);
            }
        }

        if cell_type == CellType::None {
            if !matches!(current, CellKind::None | CellKind::Exit) {
                self.grid.set_cell(position, Cell::none());
            }
            return Ok(());
        }

        let river_direction = if cell_type == CellType::River {
            direction
        } else {
            None
        };
        let kind = CellKind::from_type(cell_type, river_direction).ok_or(Contradiction::Unreachable)?;
        if kind == current {
            return Ok(());
        }

        if cell_type == CellType::Exit {
            let entrance = direction.ok_or(Contradiction::Unreachable)?;
            if !actor.common.allows_exit_at(current.cell_type()) {
                return Err(Contradiction::Unreachable);
            }
            self.grid.create_exit(position, entrance);
            return Ok(());
        }

        if current != CellKind::Unknown {
            return Err(Contradiction::Unreachable);
        }
        consume_budget(&mut self.remaining, cell_type).ok_or(Contradiction::Unreachable)?;

        self.grid.set_kind(position, kind);
        if let Some(flow) = river_direction {
            self.grid.add_wall(position, flow, WallKind::Empty);
        }
        Ok(())
    }

    /// Copy of the hypothesis with one tile resolved and the player moved onto it.
    fn resolved_copy(
        &self,
        actor: Actor<'_>,
        position: Position,
        cell_type: CellType,
        direction: Option<Direction>,
    ) -> Result<FieldState, Contradiction> {
        let mut state = self.clone();
        state.update_cell_type(actor, cell_type, position, direction)?;
        state.move_player(actor, position);
        Ok(state)
    }
}

/// A damaged player must stand on the shooter's row or column, ahead of the shot.
fn check_shot(shooter: Position, target: Position, direction: Direction) -> Result<(), Contradiction> {
    let (dx, dy) = direction.offset();
    let along = (target.x() - shooter.x()) * dx + (target.y() - shooter.y()) * dy;
    let aligned = if direction.is_vertical() {
        target.x() == shooter.x()
    } else {
        target.y() == shooter.y()
    };
    if aligned && along >= 0 {
        Ok(())
    } else {
        Err(Contradiction::Unreachable)
    }
}
