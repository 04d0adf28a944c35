use std::collections::{BTreeMap, BTreeSet};

use maze_bot_core::{CellType, GameRules, PlayerStatRules};

/// Constraints shared by every hypothesis of every player in one game.
///
/// Computed once from [`GameRules`]. Only the treasure counters change over
/// the game, and only the orchestrator changes them between turns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommonData {
    exit_location: BTreeSet<CellType>,
    compatible: BTreeMap<CellType, BTreeSet<CellType>>,
    unique_objects: BTreeMap<CellType, u32>,
    player_stat: PlayerStatRules,
    treasures_amount: u32,
    players_with_treasures: u32,
}

impl CommonData {
    /// Derives the shared constraints from validated rules.
    #[must_use]
    pub fn new(rules: &GameRules) -> Self {
        let is_not_rect = rules.generator_rules.is_not_rect;
        Self {
            exit_location: exit_location(is_not_rect),
            compatible: compatibility_table(is_not_rect),
            unique_objects: rules.unique_objects(),
            player_stat: rules.player_stat,
            treasures_amount: rules.treasures_total(),
            players_with_treasures: 0,
        }
    }

    /// Reports whether a tile of the provided type may turn out to be an exit.
    #[must_use]
    pub fn allows_exit_at(&self, cell_type: CellType) -> bool {
        self.exit_location.contains(&cell_type)
    }

    /// Reports whether two observers may see the same tile as `own` and `other`.
    #[must_use]
    pub fn is_compatible(&self, own: CellType, other: CellType) -> bool {
        self.compatible
            .get(&own)
            .is_some_and(|allowed| allowed.contains(&other))
    }

    /// Initial count of every unique room kind.
    #[must_use]
    pub const fn unique_objects(&self) -> &BTreeMap<CellType, u32> {
        &self.unique_objects
    }

    /// Resource limits every player spawns with.
    #[must_use]
    pub const fn player_stat(&self) -> PlayerStatRules {
        self.player_stat
    }

    /// Treasures still in play, carried ones included.
    #[must_use]
    pub const fn treasures_amount(&self) -> u32 {
        self.treasures_amount
    }

    /// Number of players currently carrying a treasure.
    #[must_use]
    pub const fn players_with_treasures(&self) -> u32 {
        self.players_with_treasures
    }

    /// Records a player picking up a treasure.
    pub fn on_treasure_picked(&mut self) {
        self.players_with_treasures = self.players_with_treasures.saturating_add(1);
    }

    /// Records players dropping their treasures after being hit.
    pub fn on_treasures_dropped(&mut self, count: u32) {
        self.players_with_treasures = self.players_with_treasures.saturating_sub(count);
    }

    /// Records a treasure leaving the game through an exit.
    pub fn on_treasure_carried_out(&mut self) {
        self.players_with_treasures = self.players_with_treasures.saturating_sub(1);
        self.treasures_amount = self.treasures_amount.saturating_sub(1);
    }
}

fn exit_location(is_not_rect: bool) -> BTreeSet<CellType> {
    let mut location = BTreeSet::from([CellType::None, CellType::PossibleExit]);
    if is_not_rect {
        let _ = location.insert(CellType::Unknown);
    }
    location
}

fn compatibility_table(is_not_rect: bool) -> BTreeMap<CellType, BTreeSet<CellType>> {
    let land = [
        CellType::Ground,
        CellType::River,
        CellType::RiverMouth,
        CellType::Clinic,
        CellType::Armory,
        CellType::ArmoryWeapon,
        CellType::ArmoryExplosive,
    ];
    let mut table: BTreeMap<CellType, BTreeSet<CellType>> = land
        .into_iter()
        .map(|kind| (kind, BTreeSet::from([CellType::Unknown, kind])))
        .collect();
    let mut unknown = BTreeSet::from(land);
    let _ = unknown.insert(CellType::Unknown);
    let _ = table.insert(CellType::Unknown, unknown);
    let _ = table.insert(
        CellType::Exit,
        BTreeSet::from([CellType::Exit, CellType::None]),
    );
    let _ = table.insert(
        CellType::None,
        BTreeSet::from([CellType::None, CellType::Exit]),
    );

    if is_not_rect {
        for (own, other) in [
            (CellType::Exit, CellType::Unknown),
            (CellType::Unknown, CellType::Exit),
            (CellType::Unknown, CellType::None),
            (CellType::None, CellType::Unknown),
        ] {
            if let Some(allowed) = table.get_mut(&own) {
                let _ = allowed.insert(other);
            }
        }
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rectangular_maps_keep_exits_on_the_border() {
        let common = CommonData::new(&GameRules::default());
        assert!(common.allows_exit_at(CellType::PossibleExit));
        assert!(common.allows_exit_at(CellType::None));
        assert!(!common.allows_exit_at(CellType::Unknown));
        assert!(!common.is_compatible(CellType::Unknown, CellType::None));
        assert!(common.is_compatible(CellType::None, CellType::Exit));
    }

    #[test]
    fn non_rectangular_maps_relax_the_lattice() {
        let mut rules = GameRules::default();
        rules.generator_rules.is_not_rect = true;
        let common = CommonData::new(&rules);
        assert!(common.allows_exit_at(CellType::Unknown));
        assert!(common.is_compatible(CellType::Unknown, CellType::Exit));
        assert!(common.is_compatible(CellType::None, CellType::Unknown));
    }

    #[test]
    fn treasure_counters_follow_pickups_and_carry_outs() {
        let mut common = CommonData::new(&GameRules::default());
        assert_eq!(common.treasures_amount(), 2);
        common.on_treasure_picked();
        common.on_treasure_picked();
        common.on_treasures_dropped(1);
        assert_eq!(common.players_with_treasures(), 1);
        common.on_treasure_carried_out();
        assert_eq!(common.players_with_treasures(), 0);
        assert_eq!(common.treasures_amount(), 1);
    }
}
