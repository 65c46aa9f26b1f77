//! Progression scenario tests
//!
//! Experience flows from combat results into the character sheet.

use skirmish::combat::{AutoTactics, CombatOutcome, CombatSession, CombatTrigger, Party};
use skirmish::combat::ArchetypeRegistry;
use skirmish::progression::{Advancement, Milestone};

use crate::common::champion;

/// Test: four goblins are worth a level
#[test]
fn test_goblin_hunt_levels_up() {
    let registry = ArchetypeRegistry::builtin().unwrap();
    let trigger = CombatTrigger::new(["goblin"; 4]);
    let mut aria = champion();

    let party = Party::new(aria.to_combatant());
    let mut session = CombatSession::new(&trigger, &registry, party, 31).unwrap();
    let result = session.run_to_completion(&mut AutoTactics).unwrap();

    assert_eq!(result.outcome, CombatOutcome::Victory);
    assert_eq!(result.experience_earned, 100);

    assert_eq!(aria.absorb_combat(&result), 100);
    assert!(aria.current_hp <= aria.max_hp);
    let wounded_hp = aria.current_hp;

    let level_up = aria.level_up().unwrap();
    assert_eq!(level_up.level, 2);
    assert_eq!(level_up.advancement, Advancement::ClassFeature);
    assert_eq!(aria.max_hp, 502);
    assert_eq!(aria.current_hp, wounded_hp + 2);
    assert_eq!(aria.features, vec!["Action Surge"]);
    assert!(aria.level_up().is_err());
}

/// Test: a lost fight earns nothing
#[test]
fn test_defeat_earns_no_experience() {
    let registry = ArchetypeRegistry::builtin().unwrap();
    let trigger = CombatTrigger::new(["ogre", "ogre", "ogre"]);
    let mut weakling = champion();
    weakling.current_hp = 1;

    let party = Party::new(weakling.to_combatant());
    let mut session = CombatSession::new(&trigger, &registry, party, 4).unwrap();
    let result = session.run_to_completion(&mut AutoTactics).unwrap();

    if result.outcome == CombatOutcome::Defeat {
        assert_eq!(result.experience_earned, 0);
        assert_eq!(weakling.absorb_combat(&result), 0);
        assert_eq!(weakling.current_hp, 0);
        assert_eq!(weakling.progression.experience(), 0);
    }
}

/// Test: milestones and combat experience stack toward level 5
#[test]
fn test_milestones_reach_level_cap() {
    let mut aria = champion();
    aria.progression.award_milestone(Milestone::Adventure);
    aria.progression.award_milestone(Milestone::Boss);
    assert_eq!(aria.level_up_all().len(), 1);

    for _ in 0..5 {
        aria.progression.award_milestone(Milestone::Adventure);
    }
    aria.progression.award_milestone(Milestone::Major);
    aria.progression.award_milestone(Milestone::Minor);
    aria.progression.award_milestone(Milestone::Minor);
    assert_eq!(aria.progression.experience(), 1100);

    let gained = aria.level_up_all();
    assert_eq!(gained.len(), 3);
    assert_eq!(aria.level(), 5);
    assert_eq!(aria.abilities.strength, 20);
    assert_eq!(aria.attack_bonus(), 3 + 5);
    assert_eq!(
        aria.features,
        vec!["Action Surge", "Improved Critical", "Extra Attack"]
    );

    // Negative awards never cost a level
    assert_eq!(aria.progression.gain_experience(-5000), 0);
    assert_eq!(aria.level(), 5);
}
