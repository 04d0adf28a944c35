use maze_bot_core::{Abilities, Action, CellType, PlayerStatRules, TurnAction, TurnResponse};

/// Resources of one player as far as the reported turns reveal them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlayerStats {
    limits: PlayerStatRules,
    health: u32,
    arrows: u32,
    bombs: u32,
    has_treasure: bool,
    alive: bool,
}

impl PlayerStats {
    /// Stats of a freshly spawned player.
    #[must_use]
    pub const fn new(limits: PlayerStatRules) -> Self {
        Self {
            limits,
            health: limits.max_health,
            arrows: limits.max_arrows,
            bombs: limits.max_bombs,
            has_treasure: false,
            alive: true,
        }
    }

    /// Remaining health.
    #[must_use]
    pub const fn health(&self) -> u32 {
        self.health
    }

    /// Remaining arrows.
    #[must_use]
    pub const fn arrows(&self) -> u32 {
        self.arrows
    }

    /// Remaining bombs.
    #[must_use]
    pub const fn bombs(&self) -> u32 {
        self.bombs
    }

    /// Resource limits the player spawned with.
    #[must_use]
    pub const fn limits(&self) -> PlayerStatRules {
        self.limits
    }

    /// Reports whether the player carries a treasure.
    #[must_use]
    pub const fn has_treasure(&self) -> bool {
        self.has_treasure
    }

    /// Reports whether the player is still alive.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.alive
    }

    /// Reports whether the player lost any health.
    #[must_use]
    pub const fn is_damaged(&self) -> bool {
        self.health < self.limits.max_health
    }

    /// Actions the player's resources allow.
    #[must_use]
    pub fn allowed_abilities(&self) -> Abilities {
        Abilities::all()
            .with(Action::ShootBow, self.arrows > 0)
            .with(Action::ThrowBomb, self.bombs > 0)
            .with(Action::SwapTreasure, !self.is_damaged())
    }

    /// Applies the player's own turn.
    ///
    /// Returns `true` when the turn picked up a treasure the player did not
    /// carry before.
    pub fn on_own_turn(&mut self, action: TurnAction, response: &TurnResponse) -> bool {
        let mut picked_up = false;
        match action {
            TurnAction::ShootBow(_) => self.arrows = self.arrows.saturating_sub(1),
            TurnAction::ThrowBomb(_) => self.bombs = self.bombs.saturating_sub(1),
            TurnAction::SwapTreasure => {
                picked_up = !response.had_treasure;
                self.has_treasure = true;
            }
            TurnAction::Move(_) | TurnAction::Skip | TurnAction::Info => {}
        }
        if response.type_out_treasure.is_some() {
            self.has_treasure = false;
        }
        match response.type_cell_at_end_of_turn {
            Some(CellType::Clinic) => self.health = self.limits.max_health,
            Some(CellType::Armory) => {
                self.arrows = self.limits.max_arrows;
                self.bombs = self.limits.max_bombs;
            }
            Some(CellType::ArmoryWeapon) => self.arrows = self.limits.max_arrows,
            Some(CellType::ArmoryExplosive) => self.bombs = self.limits.max_bombs,
            _ => {}
        }
        picked_up
    }

    /// Applies the consequences of somebody's arrow to the player named `name`.
    pub fn on_shot(&mut self, name: &str, response: &TurnResponse) {
        let listed = |players: &[String]| players.iter().any(|player| player == name);
        if listed(&response.dmg_pls) {
            self.health = self.health.saturating_sub(1);
        }
        if listed(&response.dead_pls) {
            self.health = 0;
        }
        if self.health == 0 {
            self.alive = false;
        }
        if listed(&response.drop_pls) {
            self.has_treasure = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maze_bot_core::Direction;

    fn limits() -> PlayerStatRules {
        PlayerStatRules {
            max_health: 2,
            max_arrows: 1,
            max_bombs: 1,
        }
    }

    #[test]
    fn spending_ammo_revokes_abilities() {
        let mut stats = PlayerStats::new(limits());
        let _ = stats.on_own_turn(TurnAction::ShootBow(Direction::Top), &TurnResponse::default());
        let _ = stats.on_own_turn(TurnAction::ThrowBomb(Direction::Top), &TurnResponse::default());

        let abilities = stats.allowed_abilities();
        assert!(!abilities.allows(Action::ShootBow));
        assert!(!abilities.allows(Action::ThrowBomb));
        assert!(abilities.allows(Action::Move));
    }

    #[test]
    fn armory_restores_ammo() {
        let mut stats = PlayerStats::new(limits());
        let _ = stats.on_own_turn(TurnAction::ShootBow(Direction::Top), &TurnResponse::default());
        let response = TurnResponse {
            type_cell_at_end_of_turn: Some(CellType::ArmoryWeapon),
            ..TurnResponse::default()
        };
        let _ = stats.on_own_turn(TurnAction::Move(Direction::Left), &response);
        assert_eq!(stats.arrows(), 1);
    }

    #[test]
    fn damage_blocks_swapping_until_healed() {
        let mut stats = PlayerStats::new(limits());
        let response = TurnResponse {
            hit: true,
            dmg_pls: vec!["alice".to_owned()],
            ..TurnResponse::default()
        };
        stats.on_shot("alice", &response);
        assert!(stats.is_damaged());
        assert!(!stats.allowed_abilities().allows(Action::SwapTreasure));

        let clinic = TurnResponse {
            type_cell_at_end_of_turn: Some(CellType::Clinic),
            ..TurnResponse::default()
        };
        let _ = stats.on_own_turn(TurnAction::Skip, &clinic);
        assert!(stats.allowed_abilities().allows(Action::SwapTreasure));
    }

    #[test]
    fn swap_reports_pickups_only_once() {
        let mut stats = PlayerStats::new(limits());
        assert!(stats.on_own_turn(TurnAction::SwapTreasure, &TurnResponse::default()));
        let swapped = TurnResponse {
            had_treasure: true,
            ..TurnResponse::default()
        };
        assert!(!stats.on_own_turn(TurnAction::SwapTreasure, &swapped));
        assert!(stats.has_treasure());

        let dropped = TurnResponse {
            drop_pls: vec!["alice".to_owned()],
            ..TurnResponse::default()
        };
        stats.on_shot("alice", &dropped);
        assert!(!stats.has_treasure());
    }

    #[test]
    fn fatal_hit_kills() {
        let mut stats = PlayerStats::new(limits());
        let response = TurnResponse {
            dead_pls: vec!["alice".to_owned()],
            ..TurnResponse::default()
        };
        stats.on_shot("bob", &response);
        assert!(stats.is_alive());
        stats.on_shot("alice", &response);
        assert!(!stats.is_alive());
    }
}
