//! Common test fixtures

#![allow(dead_code)]

use skirmish::character::{AbilityScores, CharacterClass, PlayerCharacter};
use skirmish::combat::{
    ArchetypeRegistry, CombatSession, CombatTrigger, Combatant, DiceRoll, Party, Side, StatBlock,
};

/// Goblins too sturdy to fall in a single round
pub fn sturdy_goblins() -> ArchetypeRegistry {
    ArchetypeRegistry::new()
        .with_archetype(
            "goblin",
            StatBlock {
                name: "Goblin".to_string(),
                max_hp: 30,
                armor_class: 13,
                attack_bonus: 4,
                damage_dice: DiceRoll::new(1, 6, 2),
                dexterity_modifier: 2,
                experience: 25,
            },
        )
        .expect("valid goblin")
}

/// Player-side combatant with a weak weapon
pub fn hero(max_hp: i32) -> Combatant {
    let stats = StatBlock {
        name: "Hero".to_string(),
        max_hp,
        armor_class: 15,
        attack_bonus: 5,
        damage_dice: DiceRoll::new(1, 4, 0),
        dexterity_modifier: 1,
        experience: 0,
    };
    Combatant::from_stat_block("player", Side::Player, &stats)
}

pub fn companion(id: &str) -> Combatant {
    let stats = StatBlock {
        name: "Sellsword".to_string(),
        max_hp: 16,
        armor_class: 14,
        attack_bonus: 4,
        damage_dice: DiceRoll::new(1, 8, 2),
        dexterity_modifier: 0,
        experience: 0,
    };
    Combatant::from_stat_block(id, Side::Companion, &stats)
}

/// Fighter strong enough to survive any goblin fight
pub fn champion() -> PlayerCharacter {
    let abilities = AbilityScores {
        strength: 18,
        dexterity: 14,
        constitution: 16,
        ..AbilityScores::default()
    };
    PlayerCharacter::new(
        "Aria",
        CharacterClass::Fighter,
        abilities,
        500,
        18,
        DiceRoll::new(1, 8, 10),
    )
}

/// Seeded session against sturdy goblins
pub fn goblin_session(count: usize, surprise: bool, seed: u64) -> CombatSession {
    let trigger = CombatTrigger::new(vec!["goblin"; count]).with_surprise(surprise);
    CombatSession::new(&trigger, &sturdy_goblins(), Party::new(hero(50)), seed)
        .expect("valid session")
}
