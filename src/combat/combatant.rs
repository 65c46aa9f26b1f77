//! Combatant model
//!
//! One representation for the player, companions and enemies:
//! - Hit points clamped to `0..=max_hp`
//! - Armor class, attack bonus, damage dice, initiative modifier
//! - Transient flags that only live for one encounter

use serde::{Deserialize, Serialize};
use std::fmt;

use super::dice::DiceRoll;
use super::error::CombatError;

/// Armor class bonus granted by the defend action
pub const DEFEND_AC_BONUS: i32 = 2;

/// Highest hit point maximum a combatant may have
pub const MAX_HIT_POINTS: i32 = 100_000;

/// Highest armor class a combatant may have
pub const MAX_ARMOR_CLASS: i32 = 100;

/// Largest attack bonus or dexterity modifier, either sign
pub const MAX_STAT_MODIFIER: i32 = 100;

/// Which side of the fight a combatant is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// The player character
    Player,
    /// An ally fighting alongside the player
    Companion,
    /// Anything hostile
    Enemy,
}

impl Side {
    /// Player and companions fight together
    pub fn is_party(&self) -> bool {
        matches!(self, Side::Player | Side::Companion)
    }

    /// Whether a combatant on this side may attack one on `other`
    pub fn opposes(&self, other: Side) -> bool {
        self.is_party() != other.is_party()
    }

    /// Initiative tie rank: lower goes first
    pub fn tie_rank(&self) -> u8 {
        if self.is_party() {
            0
        } else {
            1
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Side::Player => "player",
            Side::Companion => "companion",
            Side::Enemy => "enemy",
        };
        write!(f, "{}", s)
    }
}

/// Authored combat statistics for an enemy archetype or companion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatBlock {
    /// Display name
    pub name: String,
    /// Maximum hit points
    pub max_hp: i32,
    /// Armor class
    pub armor_class: i32,
    /// Bonus added to the d20 attack roll
    pub attack_bonus: i32,
    /// Damage dealt on a hit
    pub damage_dice: DiceRoll,
    /// Dexterity modifier (initiative and fleeing)
    #[serde(default)]
    pub dexterity_modifier: i32,
    /// Experience awarded for defeating this combatant
    #[serde(default)]
    pub experience: u64,
}

impl StatBlock {
    /// Check the invariants a combatant needs
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name cannot be empty".to_string());
        }
        check_numbers(
            self.max_hp,
            self.armor_class,
            self.attack_bonus,
            self.dexterity_modifier,
        )?;
        self.damage_dice
            .validate()
            .map_err(|e| format!("damage_dice {}: {}", self.damage_dice, e))
    }
}

/// A participant in an encounter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CombatantState", into = "CombatantState")]
pub struct Combatant {
    /// Unique id within the encounter
    pub id: String,
    /// Display name
    pub name: String,
    /// Side of the fight
    pub side: Side,
    current_hp: i32,
    max_hp: i32,
    /// Armor class before the defend bonus
    pub armor_class: i32,
    /// Bonus added to the d20 attack roll
    pub attack_bonus: i32,
    /// Damage dealt on a hit
    pub damage_dice: DiceRoll,
    /// Dexterity modifier (initiative and fleeing)
    pub dexterity_modifier: i32,
    /// Experience awarded when this combatant is defeated
    pub experience: u64,
    defending: bool,
    surprised: bool,
    advantaged: bool,
    fled: bool,
}

impl Combatant {
    /// Create a combatant at full health from a stat block
    pub fn from_stat_block(id: impl Into<String>, side: Side, stats: &StatBlock) -> Self {
        Self {
            id: id.into(),
            name: stats.name.clone(),
            side,
            current_hp: stats.max_hp.max(0),
            max_hp: stats.max_hp.max(0),
            armor_class: stats.armor_class,
            attack_bonus: stats.attack_bonus,
            damage_dice: stats.damage_dice,
            dexterity_modifier: stats.dexterity_modifier,
            experience: stats.experience,
            defending: false,
            surprised: false,
            advantaged: false,
            fled: false,
        }
    }

    /// Set current hit points, clamped to `0..=max_hp`
    pub fn with_current_hp(mut self, hp: i32) -> Self {
        self.current_hp = hp.clamp(0, self.max_hp);
        self
    }

    /// Rename the combatant
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Current hit points
    pub fn current_hp(&self) -> i32 {
        self.current_hp
    }

    /// Maximum hit points
    pub fn max_hp(&self) -> i32 {
        self.max_hp
    }

    /// Check if combatant is dead
    pub fn is_dead(&self) -> bool {
        self.current_hp == 0
    }

    /// Still in the fight: alive and not fled
    pub fn is_active(&self) -> bool {
        !self.is_dead() && !self.fled
    }

    /// Whether the defend bonus is up
    pub fn is_defending(&self) -> bool {
        self.defending
    }

    /// Whether the combatant is caught by surprise this round
    pub fn is_surprised(&self) -> bool {
        self.surprised
    }

    /// Whether the next attack roll is made with advantage
    pub fn has_advantage(&self) -> bool {
        self.advantaged
    }

    /// Whether the combatant escaped the fight
    pub fn has_fled(&self) -> bool {
        self.fled
    }

    /// Armor class including the defend bonus
    pub fn effective_armor_class(&self) -> i32 {
        if self.defending {
            self.armor_class.saturating_add(DEFEND_AC_BONUS)
        } else {
            self.armor_class
        }
    }

    /// Take damage, returning the hit points actually lost.
    ///
    /// Non-positive amounts are ignored; hit points never drop below 0.
    pub fn take_damage(&mut self, amount: i32) -> i32 {
        if amount <= 0 {
            return 0;
        }
        let lost = amount.min(self.current_hp);
        self.current_hp -= lost;
        lost
    }

    /// Heal (cannot exceed max_hp), returning the hit points restored.
    ///
    /// Non-positive amounts are ignored.
    pub fn heal(&mut self, amount: i32) -> i32 {
        if amount <= 0 {
            return 0;
        }
        let actual = amount.min(self.max_hp - self.current_hp);
        self.current_hp += actual;
        actual
    }

    /// Raise max hit points (and current by the same amount)
    pub fn raise_max_hp(&mut self, amount: i32) {
        if amount <= 0 {
            return;
        }
        self.max_hp = self.max_hp.saturating_add(amount).min(MAX_HIT_POINTS);
        self.current_hp = self.current_hp.saturating_add(amount).min(self.max_hp);
    }

    pub(crate) fn set_defending(&mut self, defending: bool) {
        self.defending = defending;
    }

    pub(crate) fn set_surprised(&mut self, surprised: bool) {
        self.surprised = surprised;
    }

    pub(crate) fn set_advantage(&mut self, advantaged: bool) {
        self.advantaged = advantaged;
    }

    pub(crate) fn mark_fled(&mut self) {
        self.fled = true;
        self.defending = false;
    }

    /// Drop every encounter-scoped flag
    pub(crate) fn reset_transient(&mut self) {
        self.defending = false;
        self.surprised = false;
        self.advantaged = false;
        self.fled = false;
    }

    /// Convert to the plain persisted form
    pub fn to_state(&self) -> CombatantState {
        CombatantState {
            id: self.id.clone(),
            name: self.name.clone(),
            side: self.side,
            current_hp: self.current_hp,
            max_hp: self.max_hp,
            armor_class: self.armor_class,
            attack_bonus: self.attack_bonus,
            damage_dice: self.damage_dice,
            dexterity_modifier: self.dexterity_modifier,
            experience: self.experience,
            defending: self.defending,
            surprised: self.surprised,
            advantaged: self.advantaged,
            fled: self.fled,
        }
    }

    /// Rebuild from the persisted form, rejecting impossible hit points
    pub fn from_state(state: CombatantState) -> Result<Self, CombatError> {
        if state.id.trim().is_empty() {
            return Err(CombatError::InvalidState(
                "combatant id cannot be empty".to_string(),
            ));
        }
        check_numbers(
            state.max_hp,
            state.armor_class,
            state.attack_bonus,
            state.dexterity_modifier,
        )
        .and_then(|()| {
            state
                .damage_dice
                .validate()
                .map_err(|e| format!("damage_dice {}: {}", state.damage_dice, e))
        })
        .map_err(|reason| CombatError::InvalidState(format!("{}: {}", state.id, reason)))?;
        if state.current_hp < 0 || state.current_hp > state.max_hp {
            return Err(CombatError::InvalidState(format!(
                "{}: current_hp {} outside 0..={}",
                state.id, state.current_hp, state.max_hp
            )));
        }

        Ok(Self {
            id: state.id,
            name: state.name,
            side: state.side,
            current_hp: state.current_hp,
            max_hp: state.max_hp,
            armor_class: state.armor_class,
            attack_bonus: state.attack_bonus,
            damage_dice: state.damage_dice,
            dexterity_modifier: state.dexterity_modifier,
            experience: state.experience,
            defending: state.defending,
            surprised: state.surprised,
            advantaged: state.advantaged,
            fled: state.fled,
        })
    }
}

/// Range checks shared by stat blocks and persisted combatants
fn check_numbers(
    max_hp: i32,
    armor_class: i32,
    attack_bonus: i32,
    dexterity_modifier: i32,
) -> Result<(), String> {
    if max_hp <= 0 || max_hp > MAX_HIT_POINTS {
        return Err(format!(
            "max_hp must be between 1 and {} (got {})",
            MAX_HIT_POINTS, max_hp
        ));
    }
    if !(0..=MAX_ARMOR_CLASS).contains(&armor_class) {
        return Err(format!(
            "armor_class must be between 0 and {} (got {})",
            MAX_ARMOR_CLASS, armor_class
        ));
    }
    let modifiers = -MAX_STAT_MODIFIER..=MAX_STAT_MODIFIER;
    if !modifiers.contains(&attack_bonus) {
        return Err(format!(
            "attack_bonus must be within ±{} (got {})",
            MAX_STAT_MODIFIER, attack_bonus
        ));
    }
    if !modifiers.contains(&dexterity_modifier) {
        return Err(format!(
            "dexterity_modifier must be within ±{} (got {})",
            MAX_STAT_MODIFIER, dexterity_modifier
        ));
    }
    Ok(())
}

impl fmt::Display for Combatant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {}/{} HP, AC {}",
            self.name,
            self.side,
            self.current_hp,
            self.max_hp,
            self.effective_armor_class()
        )
    }
}

/// Persisted form of a [`Combatant`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatantState {
    pub id: String,
    pub name: String,
    pub side: Side,
    pub current_hp: i32,
    pub max_hp: i32,
    pub armor_class: i32,
    pub attack_bonus: i32,
    pub damage_dice: DiceRoll,
    pub dexterity_modifier: i32,
    #[serde(default)]
    pub experience: u64,
    #[serde(default)]
    pub defending: bool,
    #[serde(default)]
    pub surprised: bool,
    #[serde(default)]
    pub advantaged: bool,
    #[serde(default)]
    pub fled: bool,
}

impl From<Combatant> for CombatantState {
    fn from(combatant: Combatant) -> Self {
        combatant.to_state()
    }
}

impl TryFrom<CombatantState> for Combatant {
    type Error = CombatError;

    fn try_from(state: CombatantState) -> Result<Self, Self::Error> {
        Combatant::from_state(state)
    }
}
