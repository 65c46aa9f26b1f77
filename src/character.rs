//! Player character
//!
//! Bridges progression and combat: a character owns its class, ability
//! scores, hit points and [`Progression`], projects itself into a
//! [`Combatant`] for an encounter and takes the outcome back afterwards.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::combat::{CombatResult, Combatant, DiceRoll, Side, StatBlock};
use crate::progression::{Advancement, LevelUp, Progression, ProgressionError};

/// Ability scores never rise above this
pub const MAX_ABILITY_SCORE: i32 = 20;

/// Combatant id the player uses in every encounter
pub const PLAYER_ID: &str = "player";

/// The six ability scores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ability {
    Strength,
    Dexterity,
    Constitution,
    Intelligence,
    Wisdom,
    Charisma,
}

impl fmt::Display for Ability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Ability::Strength => "strength",
            Ability::Dexterity => "dexterity",
            Ability::Constitution => "constitution",
            Ability::Intelligence => "intelligence",
            Ability::Wisdom => "wisdom",
            Ability::Charisma => "charisma",
        };
        write!(f, "{}", s)
    }
}

/// Score to modifier, rounding down: 8-9 is -1, 10-11 is 0, 12-13 is +1
pub fn ability_modifier(score: i32) -> i32 {
    (score - 10).div_euclid(2)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityScores {
    pub strength: i32,
    pub dexterity: i32,
    pub constitution: i32,
    pub intelligence: i32,
    pub wisdom: i32,
    pub charisma: i32,
}

impl Default for AbilityScores {
    fn default() -> Self {
        Self {
            strength: 10,
            dexterity: 10,
            constitution: 10,
            intelligence: 10,
            wisdom: 10,
            charisma: 10,
        }
    }
}

impl AbilityScores {
    pub fn get(&self, ability: Ability) -> i32 {
        match ability {
            Ability::Strength => self.strength,
            Ability::Dexterity => self.dexterity,
            Ability::Constitution => self.constitution,
            Ability::Intelligence => self.intelligence,
            Ability::Wisdom => self.wisdom,
            Ability::Charisma => self.charisma,
        }
    }

    fn get_mut(&mut self, ability: Ability) -> &mut i32 {
        match ability {
            Ability::Strength => &mut self.strength,
            Ability::Dexterity => &mut self.dexterity,
            Ability::Constitution => &mut self.constitution,
            Ability::Intelligence => &mut self.intelligence,
            Ability::Wisdom => &mut self.wisdom,
            Ability::Charisma => &mut self.charisma,
        }
    }

    pub fn modifier(&self, ability: Ability) -> i32 {
        ability_modifier(self.get(ability))
    }

    /// Raise a score, capped at [`MAX_ABILITY_SCORE`]; returns the new score
    pub fn boost(&mut self, ability: Ability, amount: i32) -> i32 {
        let score = self.get_mut(ability);
        if amount > 0 {
            *score = (*score + amount).min(MAX_ABILITY_SCORE.max(*score));
        }
        *score
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharacterClass {
    Fighter,
    Rogue,
    Wizard,
    Cleric,
}

impl CharacterClass {
    /// Ability used for attacks and boosted at level 4
    pub fn primary_ability(&self) -> Ability {
        match self {
            CharacterClass::Fighter => Ability::Strength,
            CharacterClass::Rogue => Ability::Dexterity,
            CharacterClass::Wizard => Ability::Intelligence,
            CharacterClass::Cleric => Ability::Wisdom,
        }
    }

    /// Feature unlocked at `level`, if the table grants one
    pub fn feature_at(&self, level: u8) -> Option<&'static str> {
        let name = match (self, level) {
            (CharacterClass::Fighter, 2) => "Action Surge",
            (CharacterClass::Fighter, 3) => "Improved Critical",
            (CharacterClass::Fighter, 5) => "Extra Attack",
            (CharacterClass::Rogue, 2) => "Cunning Action",
            (CharacterClass::Rogue, 3) => "Fast Hands",
            (CharacterClass::Rogue, 5) => "Uncanny Dodge",
            (CharacterClass::Wizard, 2) => "Arcane Recovery",
            (CharacterClass::Wizard, 3) => "Second-Level Spells",
            (CharacterClass::Wizard, 5) => "Third-Level Spells",
            (CharacterClass::Cleric, 2) => "Channel Divinity",
            (CharacterClass::Cleric, 3) => "Second-Level Spells",
            (CharacterClass::Cleric, 5) => "Destroy Undead",
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Display for CharacterClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CharacterClass::Fighter => "fighter",
            CharacterClass::Rogue => "rogue",
            CharacterClass::Wizard => "wizard",
            CharacterClass::Cleric => "cleric",
        };
        write!(f, "{}", s)
    }
}

/// Persistent player character
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerCharacter {
    pub name: String,
    pub class: CharacterClass,
    pub abilities: AbilityScores,
    pub armor_class: i32,
    /// Weapon damage before ability bonuses
    pub damage_dice: DiceRoll,
    pub max_hp: i32,
    pub current_hp: i32,
    pub progression: Progression,
    /// Class features unlocked so far
    #[serde(default)]
    pub features: Vec<String>,
}

impl PlayerCharacter {
    /// New level 1 character at full health
    pub fn new(
        name: impl Into<String>,
        class: CharacterClass,
        abilities: AbilityScores,
        max_hp: i32,
        armor_class: i32,
        damage_dice: DiceRoll,
    ) -> Self {
        let max_hp = max_hp.max(1);
        Self {
            name: name.into(),
            class,
            abilities,
            armor_class,
            damage_dice,
            max_hp,
            current_hp: max_hp,
            progression: Progression::new(),
            features: Vec::new(),
        }
    }

    pub fn level(&self) -> u8 {
        self.progression.level()
    }

    pub fn is_dead(&self) -> bool {
        self.current_hp == 0
    }

    /// Proficiency plus the primary ability modifier
    pub fn attack_bonus(&self) -> i32 {
        self.progression.proficiency_bonus() + self.abilities.modifier(self.class.primary_ability())
    }

    /// Combat statistics at the current level
    pub fn stat_block(&self) -> StatBlock {
        StatBlock {
            name: self.name.clone(),
            max_hp: self.max_hp,
            armor_class: self.armor_class,
            attack_bonus: self.attack_bonus(),
            damage_dice: self.damage_dice,
            dexterity_modifier: self.abilities.modifier(Ability::Dexterity),
            experience: 0,
        }
    }

    /// Project the character into a player-side combatant
    pub fn to_combatant(&self) -> Combatant {
        Combatant::from_stat_block(PLAYER_ID, Side::Player, &self.stat_block())
            .with_current_hp(self.current_hp)
    }

    /// Take hit points and experience back from a finished encounter.
    ///
    /// Returns the experience gained.
    pub fn absorb_combat(&mut self, result: &CombatResult) -> u64 {
        if let Some(player) = result.player() {
            self.current_hp = player.current_hp().clamp(0, self.max_hp);
        }
        self.gain_experience(result.experience_earned)
    }

    /// Add experience; amounts of zero or less are ignored
    pub fn gain_experience(&mut self, amount: u64) -> u64 {
        self.progression
            .gain_experience(i64::try_from(amount).unwrap_or(i64::MAX))
    }

    /// Advance one level and apply its rewards
    pub fn level_up(&mut self) -> Result<LevelUp, ProgressionError> {
        let level_up = self.progression.level_up()?;
        self.apply(&level_up);
        Ok(level_up)
    }

    /// Take every level-up currently available
    pub fn level_up_all(&mut self) -> Vec<LevelUp> {
        let mut gained = Vec::new();
        while let Ok(level_up) = self.level_up() {
            gained.push(level_up);
        }
        gained
    }

    fn apply(&mut self, level_up: &LevelUp) {
        self.max_hp += level_up.max_hp_gain;
        self.current_hp += level_up.max_hp_gain;

        match level_up.advancement {
            Advancement::AbilityBoost { amount } => {
                let ability = self.class.primary_ability();
                let score = self.abilities.boost(ability, amount);
                info!("{} raises {} to {}", self.name, ability, score);
            }
            Advancement::ClassFeature => {
                if let Some(feature) = self.class.feature_at(level_up.level) {
                    info!("{} learns {}", self.name, feature);
                    self.features.push(feature.to_string());
                }
            }
        }
    }
}

impl fmt::Display for PlayerCharacter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, level {} {} ({}/{} HP, {} XP)",
            self.name,
            self.level(),
            self.class,
            self.current_hp,
            self.max_hp,
            self.progression.experience()
        )
    }
}
