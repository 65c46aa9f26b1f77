//! Ambush scenario tests
//!
//! Two goblins caught by surprise: the player acts first and alone in
//! round 1, the goblins fight normally from round 2.

use skirmish::combat::{Action, AutoTactics, CombatPhase, TurnEvent};

use crate::common::goblin_session;

fn surprised_in(log: &[TurnEvent], round: u32) -> Vec<String> {
    log.iter()
        .filter_map(|event| match event {
            TurnEvent::Surprised { round: r, actor } if *r == round => Some(actor.clone()),
            _ => None,
        })
        .collect()
}

/// Test: both goblins are logged as surprised and the player acts first
#[test]
fn test_goblin_ambush_round_one() {
    for seed in [1, 42, 1337] {
        let mut session = goblin_session(2, true, seed);
        session.begin().unwrap();

        assert_eq!(session.current_actor().unwrap().id, "player");
        session.take_turn(Action::attack("goblin-1")).unwrap();

        // Round 1 is over: only the player acted
        assert_eq!(session.round(), 2);
        let log = session.log();
        let mut surprised = surprised_in(log, 1);
        surprised.sort();
        assert_eq!(surprised, vec!["goblin-1", "goblin-2"]);

        let round_one_actors: Vec<&str> = log
            .iter()
            .filter(|e| e.round() == Some(1) && e.is_action())
            .filter_map(|e| e.actor())
            .collect();
        assert_eq!(round_one_actors, vec!["player"]);
    }
}

/// Test: goblins act normally from round 2 onward
#[test]
fn test_goblin_ambush_later_rounds() {
    for seed in [1, 42, 1337] {
        let mut session = goblin_session(2, true, seed);
        let mut tactics = AutoTactics;

        // Play out round 1 and round 2
        session.begin().unwrap();
        while session.round() <= 2 && !session.is_over() {
            let actor = session.current_actor().unwrap().clone();
            let action = {
                let field = session.battlefield();
                skirmish::combat::Tactics::choose_action(&mut tactics, &actor, &field)
            };
            session.take_turn(action).unwrap();
        }

        assert_eq!(session.phase(), CombatPhase::RoundActive);
        assert!(surprised_in(session.log(), 2).is_empty());
        assert!(session.combatants().iter().all(|c| !c.is_surprised()));

        let round_two_attackers: Vec<&str> = session
            .log()
            .iter()
            .filter(|e| e.round() == Some(2))
            .filter_map(|e| match e {
                TurnEvent::Attack { actor, .. } => Some(actor.as_str()),
                _ => None,
            })
            .collect();
        assert!(round_two_attackers.contains(&"goblin-1"));
        assert!(round_two_attackers.contains(&"goblin-2"));
        assert!(round_two_attackers.contains(&"player"));
    }
}

/// Test: surprise alone does not grant advantage; a granted one does
#[test]
fn test_ambush_advantage_comes_from_the_attacker() {
    let mut session = goblin_session(2, true, 9);
    session.begin().unwrap();

    let events = session.take_turn(Action::attack("goblin-1")).unwrap();
    match &events[0] {
        TurnEvent::Attack { result, .. } => assert!(!result.roll.with_advantage()),
        other => panic!("expected attack, got {:?}", other),
    }

    // Round 2: the player attacks again, this time with advantage
    session.grant_advantage("player").unwrap();
    let mut tactics = AutoTactics;
    while session.current_actor().unwrap().id != "player" {
        let actor = session.current_actor().unwrap().clone();
        let action = {
            let field = session.battlefield();
            skirmish::combat::Tactics::choose_action(&mut tactics, &actor, &field)
        };
        session.take_turn(action).unwrap();
    }
    let events = session.take_turn(Action::attack("goblin-2")).unwrap();
    match &events[0] {
        TurnEvent::Attack { result, .. } => assert!(result.roll.with_advantage()),
        other => panic!("expected attack, got {:?}", other),
    }
}
