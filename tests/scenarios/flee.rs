//! Flee scenario tests
//!
//! A player that always runs either escapes unharmed from that point on,
//! or takes exactly one opportunity attack per failed attempt.

use skirmish::combat::{
    Action, ArchetypeRegistry, AutoTactics, Battlefield, CombatOutcome, CombatSession,
    CombatTrigger, Combatant, Party, Side, Tactics, TurnEvent,
};

use crate::common::{companion, hero, sturdy_goblins};

/// Player always flees, everyone else fights
struct Coward;

impl Tactics for Coward {
    fn choose_action(&mut self, actor: &Combatant, field: &Battlefield<'_>) -> Action {
        if actor.side == Side::Player {
            Action::Flee
        } else {
            AutoTactics.choose_action(actor, field)
        }
    }
}

/// Test: after a successful escape nobody lands another blow
#[test]
fn test_no_damage_after_escape() {
    let trigger = CombatTrigger::new(["goblin", "goblin"]);
    let mut escapes = 0;

    for seed in 0..40 {
        let mut session =
            CombatSession::new(&trigger, &sturdy_goblins(), Party::new(hero(50)), seed).unwrap();
        let result = session.run_to_completion(&mut Coward).unwrap();

        if result.outcome != CombatOutcome::Fled {
            continue;
        }
        escapes += 1;

        let escape_at = result
            .turn_log
            .iter()
            .position(|e| matches!(e, TurnEvent::Flee { result, .. } if result.escaped))
            .expect("fled without a successful attempt");
        assert!(!result.turn_log[escape_at..]
            .iter()
            .any(|e| matches!(e, TurnEvent::Attack { .. })));
        assert_eq!(result.experience_earned, 0);
        assert_eq!(result.surviving_enemies.len(), 2);
    }

    assert!(escapes > 0, "DC 12 should be beaten within 40 seeds");
}

/// Test: each failed attempt draws exactly one attack, from the next
/// opponent in turn order
#[test]
fn test_failed_attempt_draws_one_attack() {
    let trigger = CombatTrigger::new(["goblin", "goblin"]);

    for seed in 0..40 {
        let mut session =
            CombatSession::new(&trigger, &sturdy_goblins(), Party::new(hero(50)), seed).unwrap();
        session.run_to_completion(&mut Coward).unwrap();

        let order: Vec<&str> = session.turn_order().ids().collect();
        let player_pos = order.iter().position(|id| *id == "player").unwrap();
        let next_goblin = order[(player_pos + 1) % order.len()];

        for event in session.log() {
            if let TurnEvent::Flee { result, .. } = event {
                assert_eq!(result.pursuer.as_deref(), Some(next_goblin));
                assert_eq!(result.dc, 12);
                assert_eq!(result.escaped, result.opportunity_attack.is_none());
            }
        }
    }
}

/// Test: a companion fleeing does not end the encounter
#[test]
fn test_companion_flight_leaves_player_fighting() {
    let registry = ArchetypeRegistry::builtin().unwrap();
    let trigger = CombatTrigger::new(["goblin"]);
    let mut deserter = |actor: &Combatant, field: &Battlefield<'_>| {
        if actor.side == Side::Companion {
            Action::Flee
        } else {
            AutoTactics.choose_action(actor, field)
        }
    };

    for seed in 0..10 {
        let party = Party::new(hero(40)).with_companion(companion("sellsword"));
        let mut session = CombatSession::new(&trigger, &registry, party, seed).unwrap();
        let result = session.run_to_completion(&mut deserter).unwrap();

        assert_ne!(result.outcome, CombatOutcome::Fled);
    }
}
