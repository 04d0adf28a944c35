use maze_bot_core::{CellType, GameRules, Position, TurnAction, TurnResponse};
use maze_bot_field::CommonData;
use maze_bot_system_beliefs::{InitGenerator, PlayerState, PlayerStats, TrackedPlayer};

fn tracked() -> Vec<TrackedPlayer> {
    vec![
        TrackedPlayer::with_spawn("alice", Position::new(2, 3)),
        TrackedPlayer::with_spawn("bob", Position::new(1, 1)),
    ]
}

fn player_state(rules: &GameRules, players: &[TrackedPlayer], index: usize) -> PlayerState {
    let generator = InitGenerator::new(rules, players).expect("valid players");
    let player = &players[index];
    PlayerState::new(
        player.name(),
        generator.start_tree(player),
        PlayerStats::new(rules.player_stat),
    )
}

fn standing_on(cell_type: CellType) -> TurnResponse {
    TurnResponse {
        type_cell_at_end_of_turn: Some(cell_type),
        ..TurnResponse::default()
    }
}

#[test]
fn contradicted_leaves_are_pruned() {
    let rules = GameRules::default();
    let common = CommonData::new(&rules);
    let players = tracked();
    let mut alice = player_state(&rules, &players, 0);

    alice.process_turn(&common, "alice", TurnAction::Info, &standing_on(CellType::Clinic));
    assert_eq!(alice.leaves().len(), 25, "any spawn may be the clinic");

    alice.process_turn(&common, "alice", TurnAction::Info, &standing_on(CellType::Armory));
    assert!(alice.tree().is_empty(), "a clinic cannot turn into an armory");
    assert!(alice.real_spawn_states().is_empty());
}

#[test]
fn unsupported_fake_spawns_are_pruned() {
    let rules = GameRules::default();
    let common = CommonData::new(&rules);
    let players = tracked();
    let mut bob = player_state(&rules, &players, 1);
    let leaves = bob.leaves();
    let fake = leaves[leaves.len() - 1];
    bob.tree_mut()
        .node_mut(fake)
        .expect("alive")
        .set_compatibility("alice", false);

    bob.process_turn(&common, "alice", TurnAction::Skip, &standing_on(CellType::Ground));

    assert_eq!(bob.leaves().len(), 24);
    assert!(bob.tree().node(fake).is_none());
    assert_eq!(bob.real_spawn_leaves().len(), 1, "the real spawn is never incompatible");
}

#[test]
fn consensus_follows_the_real_spawn() {
    let rules = GameRules::default();
    let common = CommonData::new(&rules);
    let players = tracked();
    let mut alice = player_state(&rules, &players, 0);

    alice.process_turn(&common, "alice", TurnAction::Info, &standing_on(CellType::Clinic));

    let consensus = alice.consensus();
    assert_eq!(consensus.get(&Position::new(2, 3)), Some(&CellType::Clinic));
    assert_eq!(consensus.get(&Position::new(1, 1)), Some(&CellType::Unknown));
    assert_eq!(consensus.get(&Position::new(0, 0)), Some(&CellType::None));

    let (shown, total) = alice.leaves_snapshot(3);
    assert_eq!(shown.len(), 3);
    assert_eq!(total, 25);
}

#[test]
fn preprocessing_records_swappable_treasure() {
    let rules = GameRules::default();
    let common = CommonData::new(&rules);
    let players = tracked();
    let mut alice = player_state(&rules, &players, 0);
    let abilities = alice.stats().allowed_abilities();

    alice.preprocess_turn(&common, "alice", &abilities);

    for state in alice.real_spawn_states() {
        assert_eq!(state.treasures(), &[Position::new(2, 3)]);
    }
}
