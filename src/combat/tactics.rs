//! Action selection for turns the caller does not script
//!
//! Player turns normally come from the caller; everything else (enemies,
//! companions, or the player in simulations) goes through [`Tactics`].

use super::actions::Action;
use super::combatant::{Combatant, Side};

/// Read-only view of the fight handed to [`Tactics`]
#[derive(Debug, Clone, Copy)]
pub struct Battlefield<'a> {
    combatants: &'a [Combatant],
    round: u32,
}

impl<'a> Battlefield<'a> {
    pub fn new(combatants: &'a [Combatant], round: u32) -> Self {
        Self { combatants, round }
    }

    /// Every combatant in registration order
    pub fn combatants(&self) -> &'a [Combatant] {
        self.combatants
    }

    /// Current round (starts at 1)
    pub fn round(&self) -> u32 {
        self.round
    }

    /// The player character
    pub fn player(&self) -> Option<&'a Combatant> {
        self.combatants.iter().find(|c| c.side == Side::Player)
    }

    /// Opponents of `actor` still in the fight, in registration order
    pub fn opponents_of(&self, actor: &Combatant) -> impl Iterator<Item = &'a Combatant> + '_ {
        let side = actor.side;
        self.combatants
            .iter()
            .filter(move |c| side.opposes(c.side) && c.is_active())
    }

    /// Allies of `actor` still in the fight (excluding the actor)
    pub fn allies_of(&self, actor: &Combatant) -> impl Iterator<Item = &'a Combatant> + '_ {
        let side = actor.side;
        let id = actor.id.clone();
        self.combatants
            .iter()
            .filter(move |c| !side.opposes(c.side) && c.id != id && c.is_active())
    }
}

/// Chooses an action for the acting combatant
pub trait Tactics {
    fn choose_action(&mut self, actor: &Combatant, field: &Battlefield<'_>) -> Action;
}

/// Straightforward melee tactics.
///
/// - Enemies attack the player while it stands, otherwise the weakest
///   companion.
/// - The party attacks the weakest enemy.
/// - Anyone without a target defends.
///
/// "Weakest" is lowest current hit points; ties go to registration order.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoTactics;

impl Tactics for AutoTactics {
    fn choose_action(&mut self, actor: &Combatant, field: &Battlefield<'_>) -> Action {
        if actor.side == Side::Enemy {
            if let Some(player) = field.player().filter(|p| p.is_active()) {
                return Action::attack(player.id.clone());
            }
        }

        weakest(field.opponents_of(actor))
            .map(|target| Action::attack(target.id.clone()))
            .unwrap_or(Action::Defend)
    }
}

fn weakest<'a>(candidates: impl Iterator<Item = &'a Combatant>) -> Option<&'a Combatant> {
    // min_by_key keeps the first of equal elements
    candidates.min_by_key(|c| c.current_hp())
}

impl<F> Tactics for F
where
    F: FnMut(&Combatant, &Battlefield<'_>) -> Action,
{
    fn choose_action(&mut self, actor: &Combatant, field: &Battlefield<'_>) -> Action {
        self(actor, field)
    }
}
