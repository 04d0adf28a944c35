//! Bot configuration files.

use maze_bot_core::{ConfigError, GameRules, Position};
use maze_bot_system_beliefs::TrackedPlayer;
use serde::{Deserialize, Serialize};

/// Everything a bot needs to know before the first turn.
///
/// Players are listed in turn order; the last one closes every round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotConfig {
    /// Rules of the game.
    pub rules: GameRules,
    /// Players to track, in turn order.
    pub players: Vec<PlayerConfig>,
}

/// One tracked player.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Name the engine reports the player by.
    pub name: String,
    /// True spawn, when the harness discloses it.
    #[serde(default)]
    pub spawn: Option<Position>,
}

impl BotConfig {
    /// Parses and validates a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.rules.validate()?;
        Ok(config)
    }

    /// Parses and validates a configuration from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.rules.validate()?;
        Ok(config)
    }

    /// Players converted into their tracked form.
    #[must_use]
    pub fn tracked_players(&self) -> Vec<TrackedPlayer> {
        self.players
            .iter()
            .map(|player| match player.spawn {
                Some(spawn) => TrackedPlayer::with_spawn(player.name.clone(), spawn),
                None => TrackedPlayer::new(player.name.clone()),
            })
            .collect()
    }
}
