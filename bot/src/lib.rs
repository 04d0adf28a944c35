#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Maze bot orchestrator.
//!
//! [`BotAi`] owns the belief state of every tracked player and drives the
//! per-turn cycle: [`BotAi::turn_prepare`] before the acting player decides,
//! [`BotAi::make_decision`] to pick its action and
//! [`BotAi::process_turn_resp`] once the engine reports what happened.

use std::collections::BTreeMap;

use maze_bot_core::{
    Abilities, CellType, ConfigError, GameRules, Position, TurnError, TurnRecord,
};
use maze_bot_field::{CommonData, FieldState};
use maze_bot_system_beliefs::{
    InitGenerator, LeavesMatcher, PlayerState, PlayerStats, TrackedPlayer,
};
use maze_bot_system_decision::{Decision, DecisionMaker};
use tracing::{debug, info};

mod config;

pub use config::{BotConfig, PlayerConfig};

/// Belief-state engine playing on behalf of the tracked players.
#[derive(Debug)]
pub struct BotAi {
    common: CommonData,
    players: BTreeMap<String, PlayerState>,
    order: Vec<String>,
    matcher: LeavesMatcher,
    decision_maker: DecisionMaker,
}

impl BotAi {
    /// Creates the engine for `players`, listed in turn order.
    pub fn new(rules: GameRules, players: Vec<TrackedPlayer>) -> Result<Self, ConfigError> {
        rules.validate()?;
        let generator = InitGenerator::new(&rules, &players)?;
        let mut states = BTreeMap::new();
        for player in &players {
            let state = PlayerState::new(
                player.name(),
                generator.start_tree(player),
                PlayerStats::new(rules.player_stat),
            );
            debug!(player = player.name(), leaves = state.leaves().len(), "initial beliefs");
            let _ = states.insert(player.name().to_owned(), state);
        }
        let order: Vec<String> = players.iter().map(|player| player.name().to_owned()).collect();
        info!(players = ?order, "bot ready");
        Ok(Self {
            common: CommonData::new(&rules),
            players: states,
            order,
            matcher: LeavesMatcher::new(rules.unique_objects()),
            decision_maker: DecisionMaker::new(),
        })
    }

    /// Creates the engine from a parsed configuration.
    pub fn from_config(config: &BotConfig) -> Result<Self, ConfigError> {
        Self::new(config.rules.clone(), config.tracked_players())
    }

    /// Creates the engine from a TOML configuration.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Self::from_config(&BotConfig::from_toml_str(text)?)
    }

    /// Shared constraints of the game.
    #[must_use]
    pub const fn common(&self) -> &CommonData {
        &self.common
    }

    /// Belief state of a tracked player.
    #[must_use]
    pub fn player(&self, name: &str) -> Option<&PlayerState> {
        self.players.get(name)
    }

    /// Tracked players in turn order.
    #[must_use]
    pub fn turn_order(&self) -> &[String] {
        &self.order
    }

    /// Prepares the beliefs before `player` decides.
    ///
    /// Records the treasure the engine lets the player swap and drops the
    /// player's real-spawn leaves no other player's beliefs support.
    pub fn turn_prepare(&mut self, player: &str, abilities: &Abilities) {
        for state in self.players.values_mut() {
            state.preprocess_turn(&self.common, player, abilities);
        }
        self.matcher
            .match_real_spawn_leaves(&self.common, &mut self.players, player);
    }

    /// Chooses the action of `player`.
    #[must_use]
    pub fn make_decision(&self, player: &str, abilities: &Abilities) -> Decision {
        self.decision_maker
            .make_decision(&self.players, player, abilities)
    }

    /// Folds a turn reported by the engine into every player's beliefs.
    ///
    /// Rivers move their treasures once the last player of the round acted.
    pub fn process_turn_resp(&mut self, record: &TurnRecord) -> Result<(), TurnError> {
        let action = record.turn_action()?;
        let acting = record.player_name.as_str();
        if !self.players.contains_key(acting) {
            return Err(TurnError::UnknownPlayer(record.player_name.clone()));
        }
        let response = &record.response;

        if response.hit {
            let dropped = u32::try_from(response.drop_pls.len()).unwrap_or(u32::MAX);
            self.common.on_treasures_dropped(dropped);
            for (name, state) in &mut self.players {
                state.stats_mut().on_shot(name, response);
            }
        }
        if response.type_out_treasure.is_some() {
            self.common.on_treasure_carried_out();
        }
        if let Some(state) = self.players.get_mut(acting) {
            if state.stats_mut().on_own_turn(action, response) {
                self.common.on_treasure_picked();
            }
        }

        for state in self.players.values_mut() {
            state.process_turn(&self.common, acting, action, response);
        }

        if self.order.last().is_some_and(|last| last == acting) {
            debug!("host turn");
            for state in self.players.values_mut() {
                state.process_host_turn();
            }
        }
        Ok(())
    }

    /// Decodes a JSON turn record and folds it into the beliefs.
    pub fn process_turn_json(&mut self, text: &str) -> Result<(), TurnError> {
        let record = TurnRecord::from_json(text)?;
        self.process_turn_resp(&record)
    }

    /// Up to `limit` leaves of `player` together with the total leaf count.
    #[must_use]
    pub fn leaves_snapshot(&self, player: &str, limit: usize) -> Option<(Vec<&FieldState>, usize)> {
        Some(self.players.get(player)?.leaves_snapshot(limit))
    }

    /// Most likely map of `player` according to its real-spawn leaves.
    #[must_use]
    pub fn consensus(&self, player: &str) -> Option<BTreeMap<Position, CellType>> {
        Some(self.players.get(player)?.consensus())
    }
}
