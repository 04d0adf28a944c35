//! Game rules consumed once when the engine is constructed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{CellType, ConfigError};

/// Rules shared by every player of one game.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRules {
    /// Map generation parameters.
    pub generator_rules: GeneratorRules,
    /// Player resource limits.
    pub player_stat: PlayerStatRules,
}

/// Map generation parameters the hypotheses depend on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorRules {
    /// Number of playable rows.
    pub rows: u32,
    /// Number of playable columns.
    pub cols: u32,
    /// Whether the playable area may deviate from a rectangle.
    #[serde(default)]
    pub is_not_rect: bool,
    /// Whether the armory is split into weapon and explosive rooms.
    #[serde(default)]
    pub is_separated_armory: bool,
    /// Number of treasures of each kind placed on the map.
    #[serde(default)]
    pub treasures: Vec<u32>,
    /// Explicit unique-room counts; derived from the armory layout when absent.
    #[serde(default)]
    pub unique_objects: Option<BTreeMap<CellType, u32>>,
}

/// Resource limits of every player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStatRules {
    /// Health a player spawns with.
    pub max_health: u32,
    /// Arrows a player spawns with.
    pub max_arrows: u32,
    /// Bombs a player spawns with.
    pub max_bombs: u32,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            generator_rules: GeneratorRules {
                rows: 5,
                cols: 5,
                is_not_rect: false,
                is_separated_armory: false,
                treasures: vec![1, 1, 0],
                unique_objects: None,
            },
            player_stat: PlayerStatRules {
                max_health: 2,
                max_arrows: 3,
                max_bombs: 3,
            },
        }
    }
}

impl GameRules {
    /// Parses and validates rules from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let rules: Self = toml::from_str(text)?;
        rules.validate()?;
        Ok(rules)
    }

    /// Parses and validates rules from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let rules: Self = serde_json::from_str(text)?;
        rules.validate()?;
        Ok(rules)
    }

    /// Rejects rule sets the hypothesis engine cannot represent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let generator = &self.generator_rules;
        if generator.rows == 0 || generator.cols == 0 {
            return Err(ConfigError::InvalidField {
                field: "generator_rules.rows/cols",
                message: format!(
                    "grid must not be empty, got {}x{}",
                    generator.cols, generator.rows
                ),
            });
        }
        let fits = |value: u32| value.checked_add(2).and_then(|v| i32::try_from(v).ok()).is_some();
        if !fits(generator.cols) || !fits(generator.rows) {
            return Err(ConfigError::InvalidField {
                field: "generator_rules.rows/cols",
                message: "grid dimensions overflow the coordinate range".to_owned(),
            });
        }
        if self.player_stat.max_health == 0 {
            return Err(ConfigError::InvalidField {
                field: "player_stat.max_health",
                message: "players must spawn alive".to_owned(),
            });
        }
        if let Some(objects) = &generator.unique_objects {
            for cell_type in objects.keys() {
                if !cell_type.is_unique_room() {
                    return Err(ConfigError::NotUniqueObject(*cell_type));
                }
            }
            let has_unified = objects.contains_key(&CellType::Armory);
            let has_split = objects.contains_key(&CellType::ArmoryWeapon)
                || objects.contains_key(&CellType::ArmoryExplosive);
            if generator.is_separated_armory && has_unified {
                return Err(ConfigError::ImpossibleRules(
                    "separated armory cannot count a unified armory",
                ));
            }
            if !generator.is_separated_armory && has_split {
                return Err(ConfigError::ImpossibleRules(
                    "unified armory cannot count weapon or explosive rooms",
                ));
            }
        }
        Ok(())
    }

    /// Number of rooms of each unique kind placed on the map.
    #[must_use]
    pub fn unique_objects(&self) -> BTreeMap<CellType, u32> {
        if let Some(objects) = &self.generator_rules.unique_objects {
            return objects.clone();
        }
        let mut objects = BTreeMap::from([(CellType::Clinic, 1)]);
        if self.generator_rules.is_separated_armory {
            let _ = objects.insert(CellType::ArmoryWeapon, 1);
            let _ = objects.insert(CellType::ArmoryExplosive, 1);
        } else {
            let _ = objects.insert(CellType::Armory, 1);
        }
        objects
    }

    /// Total number of treasures across every kind.
    #[must_use]
    pub fn treasures_total(&self) -> u32 {
        self.generator_rules.treasures.iter().sum()
    }

    /// Grid width including the off-map border.
    #[must_use]
    pub fn grid_columns(&self) -> u32 {
        self.generator_rules.cols.saturating_add(2)
    }

    /// Grid height including the off-map border.
    #[must_use]
    pub fn grid_rows(&self) -> u32 {
        self.generator_rules.rows.saturating_add(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_rules_parse_and_derive_unique_objects() {
        let rules = GameRules::from_toml_str(
            r#"
            [generator_rules]
            rows = 3
            cols = 4
            is_separated_armory = true
            treasures = [1, 2, 0]

            [player_stat]
            max_health = 2
            max_arrows = 3
            max_bombs = 1
            "#,
        )
        .expect("rules parse");

        assert_eq!(rules.grid_columns(), 6);
        assert_eq!(rules.grid_rows(), 5);
        assert_eq!(rules.treasures_total(), 3);
        let objects = rules.unique_objects();
        assert_eq!(objects.get(&CellType::ArmoryWeapon), Some(&1));
        assert_eq!(objects.get(&CellType::Armory), None);
    }

    #[test]
    fn ground_is_not_a_unique_object() {
        let mut rules = GameRules::default();
        rules.generator_rules.unique_objects = Some(BTreeMap::from([(CellType::Ground, 2)]));
        assert!(matches!(
            rules.validate(),
            Err(ConfigError::NotUniqueObject(CellType::Ground))
        ));
    }

    #[test]
    fn split_armory_rejects_unified_count() {
        let mut rules = GameRules::default();
        rules.generator_rules.is_separated_armory = true;
        rules.generator_rules.unique_objects = Some(BTreeMap::from([(CellType::Armory, 1)]));
        assert!(matches!(
            rules.validate(),
            Err(ConfigError::ImpossibleRules(_))
        ));
    }

    #[test]
    fn empty_grid_is_rejected() {
        let mut rules = GameRules::default();
        rules.generator_rules.rows = 0;
        assert!(matches!(
            rules.validate(),
            Err(ConfigError::InvalidField { .. })
        ));
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        assert!(matches!(
            GameRules::from_json_str("{\"generator_rules\": 3}"),
            Err(ConfigError::Json(_))
        ));
    }
}
