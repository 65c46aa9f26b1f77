//! Action resolution
//!
//! Resolves one actor's action against the current state:
//! - Attack: d20 + attack bonus against armor class, critical and fumble rules
//! - Defend: +2 armor class until the actor's next turn
//! - Flee: d20 + dexterity against the pursuer's DC, with an opportunity
//!   attack on failure

use serde::{Deserialize, Serialize};
use std::fmt;

use super::combatant::Combatant;
use super::dice::{roll_d20, roll_d20_with_advantage, D20Roll, RollDetail, Roller};
use super::error::CombatError;

/// Base difficulty of escaping a fight
pub const FLEE_BASE_DC: i32 = 10;

/// What an actor does on its turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Attack the combatant with this id
    Attack { target: String },
    /// Raise guard until the next turn
    Defend,
    /// Try to escape the fight
    Flee,
}

impl Action {
    /// Attack the combatant with this id
    pub fn attack(target: impl Into<String>) -> Self {
        Action::Attack {
            target: target.into(),
        }
    }
}

/// Result of an attack roll
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackResult {
    /// The d20 roll (both faces when rolled with advantage)
    pub roll: D20Roll,
    /// Attacker's bonus
    pub attack_bonus: i32,
    /// Total attack value (natural roll + bonus)
    pub attack_total: i32,
    /// Target's effective AC at the time of the attack
    pub target_ac: i32,
    /// Whether the attack hit
    pub hit: bool,
    /// Whether it was a critical hit
    pub critical: bool,
    /// Whether it was a fumble
    pub fumble: bool,
    /// Damage roll if hit
    pub damage: Option<RollDetail>,
    /// Hit points the target actually lost
    pub damage_dealt: i32,
    /// Target hit points after the attack
    pub target_hp: i32,
}

impl AttackResult {
    /// Evaluate a to-hit roll against an armor class
    pub fn new(roll: D20Roll, attack_bonus: i32, target_ac: i32) -> Self {
        let critical = roll.is_critical();
        let fumble = roll.is_fumble();
        let attack_total = (roll.natural() as i32).saturating_add(attack_bonus);

        // Critical always hits, fumble always misses
        let hit = critical || (!fumble && attack_total >= target_ac);

        Self {
            roll,
            attack_bonus,
            attack_total,
            target_ac,
            hit,
            critical,
            fumble,
            damage: None,
            damage_dealt: 0,
            target_hp: 0,
        }
    }
}

impl fmt::Display for AttackResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = if self.critical {
            "critical hit"
        } else if self.fumble {
            "fumble"
        } else if self.hit {
            "hit"
        } else {
            "miss"
        };
        write!(
            f,
            "rolled {} + {} = {} vs AC {}: {}",
            self.roll, self.attack_bonus, self.attack_total, self.target_ac, verdict
        )?;
        if self.hit {
            write!(f, " for {} damage", self.damage_dealt)?;
        }
        Ok(())
    }
}

/// Result of a flee attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleeResult {
    /// The d20 roll
    pub roll: D20Roll,
    /// Fleeing actor's dexterity modifier
    pub modifier: i32,
    /// `roll + modifier`
    pub total: i32,
    /// Difficulty to beat
    pub dc: i32,
    /// Opponent setting the DC and taking the free attack
    pub pursuer: Option<String>,
    /// Whether the actor got away
    pub escaped: bool,
    /// Free attack made against the actor on a failed attempt
    pub opportunity_attack: Option<AttackResult>,
}

fn ensure_can_act(actor: &Combatant) -> Result<(), CombatError> {
    if actor.is_dead() {
        return Err(CombatError::illegal(&actor.id, "actor is dead"));
    }
    if actor.has_fled() {
        return Err(CombatError::illegal(&actor.id, "actor has fled"));
    }
    Ok(())
}

/// Resolve an attack by `actor` against `target`.
///
/// The roll has advantage when the actor is advantaged. Advantage is not
/// consumed here; the session clears it.
pub fn attack<R: Roller + ?Sized>(
    roller: &mut R,
    actor: &Combatant,
    target: &mut Combatant,
) -> Result<AttackResult, CombatError> {
    ensure_can_act(actor)?;
    if actor.id == target.id {
        return Err(CombatError::illegal(&actor.id, "cannot attack itself"));
    }
    if !actor.side.opposes(target.side) {
        return Err(CombatError::illegal(
            &actor.id,
            format!("{} is an ally", target.id),
        ));
    }
    if !target.is_active() {
        return Err(CombatError::illegal(
            &actor.id,
            format!("{} is no longer in the fight", target.id),
        ));
    }

    let roll = if actor.has_advantage() {
        roll_d20_with_advantage(roller)
    } else {
        roll_d20(roller)
    };
    let mut result = AttackResult::new(roll, actor.attack_bonus, target.effective_armor_class());

    if result.hit {
        let damage = if result.critical {
            actor.damage_dice.roll_critical(roller)
        } else {
            actor.damage_dice.roll_detailed(roller)
        };
        result.damage_dealt = target.take_damage(damage.total);
        result.damage = Some(damage);
    }
    result.target_hp = target.current_hp();

    Ok(result)
}

/// Raise the actor's guard until the start of its next turn
pub fn defend(actor: &mut Combatant) -> Result<(), CombatError> {
    ensure_can_act(actor)?;
    actor.set_defending(true);
    Ok(())
}

/// Attempt to escape the fight.
///
/// `pursuer` sets the DC (`10 + dexterity modifier`) and makes exactly one
/// free attack if the attempt fails. Without a pursuer the DC is 10 and a
/// failure costs nothing.
pub fn flee<R: Roller + ?Sized>(
    roller: &mut R,
    actor: &mut Combatant,
    pursuer: Option<&Combatant>,
) -> Result<FleeResult, CombatError> {
    ensure_can_act(actor)?;

    let dc = FLEE_BASE_DC.saturating_add(pursuer.map_or(0, |p| p.dexterity_modifier));
    let roll = roll_d20(roller);
    let total = (roll.natural() as i32).saturating_add(actor.dexterity_modifier);
    let escaped = total >= dc;

    let mut result = FleeResult {
        roll,
        modifier: actor.dexterity_modifier,
        total,
        dc,
        pursuer: pursuer.map(|p| p.id.clone()),
        escaped,
        opportunity_attack: None,
    };

    if escaped {
        actor.mark_fled();
    } else if let Some(pursuer) = pursuer.filter(|p| p.is_active()) {
        result.opportunity_attack = Some(attack(roller, pursuer, actor)?);
    }

    Ok(result)
}
