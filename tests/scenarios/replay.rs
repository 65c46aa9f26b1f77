//! Replay scenario tests
//!
//! A session saved mid-encounter and restored must continue exactly as the
//! uninterrupted session does.

use skirmish::combat::{AutoTactics, CombatError, CombatSession, SessionState, Tactics};

use crate::common::goblin_session;

fn play_turns(session: &mut CombatSession, turns: usize) {
    let mut tactics = AutoTactics;
    for _ in 0..turns {
        let actor = session.current_actor().unwrap().clone();
        let action = tactics.choose_action(&actor, &session.battlefield());
        session.take_turn(action).unwrap();
    }
}

/// Test: save, serialize, restore, continue: identical outcome and log
#[test]
fn test_restore_mid_encounter_continues_identically() {
    for seed in [5, 77, 2024] {
        let mut original = goblin_session(2, true, seed);
        original.begin().unwrap();
        play_turns(&mut original, 4);
        assert!(!original.is_over());

        let json = serde_json::to_string(&original.to_state()).unwrap();
        let state: SessionState = serde_json::from_str(&json).unwrap();
        let mut restored = CombatSession::from_state(state).unwrap();

        assert_eq!(restored.seed(), seed);
        assert_eq!(restored.log(), original.log());
        assert_eq!(
            restored.current_actor().map(|c| c.id.clone()),
            original.current_actor().map(|c| c.id.clone())
        );

        let expected = original.run_to_completion(&mut AutoTactics).unwrap();
        let actual = restored.run_to_completion(&mut AutoTactics).unwrap();
        assert_eq!(actual, expected);
    }
}

/// Test: a session saved before it begins rolls the same initiative
#[test]
fn test_restore_before_begin() {
    let mut original = goblin_session(2, false, 99);
    let mut restored = CombatSession::from_state(original.to_state()).unwrap();

    original.begin().unwrap();
    restored.begin().unwrap();
    assert_eq!(restored.turn_order(), original.turn_order());
}

/// Test: a finished session restores as finished
#[test]
fn test_restore_finished_session() {
    let mut session = goblin_session(1, false, 8);
    let result = session.run_to_completion(&mut AutoTactics).unwrap();

    let mut restored = CombatSession::from_state(session.to_state()).unwrap();
    assert_eq!(restored.result(), Some(result));
    assert_eq!(
        restored.take_turn(skirmish::combat::Action::Defend).unwrap_err(),
        CombatError::SessionOver
    );
}

/// Test: tampered snapshots are rejected
#[test]
fn test_restore_rejects_tampering() {
    let mut session = goblin_session(2, false, 12);
    session.begin().unwrap();

    let mut json = serde_json::to_value(session.to_state()).unwrap();
    json["combatants"][1]["current_hp"] = serde_json::json!(999);
    assert!(serde_json::from_value::<SessionState>(json).is_err());

    let mut state = session.to_state();
    state.order = Default::default();
    assert!(matches!(
        CombatSession::from_state(state),
        Err(CombatError::InvalidState(_))
    ));
}
