//! Initiative scheduling
//!
//! Every combatant rolls `d20 + dexterity_modifier` once per encounter.
//! Order is highest total first; the party wins ties against enemies and
//! any remaining tie keeps registration order. The order never changes
//! after it is rolled.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::combatant::{Combatant, Side};
use super::dice::{roll_d20, Roller};

/// One combatant's initiative roll
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitiativeEntry {
    /// Combatant id
    pub combatant: String,
    /// Registration index in the session's combatant list
    pub slot: usize,
    /// Side, used for tie-breaking
    pub side: Side,
    /// Natural d20 face
    pub roll: u32,
    /// Dexterity modifier added to the roll
    pub modifier: i32,
    /// `roll + modifier`
    pub total: i32,
}

impl InitiativeEntry {
    fn precedence(&self, other: &Self) -> Ordering {
        other
            .total
            .cmp(&self.total)
            .then_with(|| self.side.tie_rank().cmp(&other.side.tie_rank()))
            .then_with(|| self.slot.cmp(&other.slot))
    }
}

/// Fixed turn order for one encounter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnOrder {
    entries: Vec<InitiativeEntry>,
}

impl TurnOrder {
    /// Sort rolled entries into turn order
    pub fn from_entries(mut entries: Vec<InitiativeEntry>) -> Self {
        entries.sort_by(|a, b| a.precedence(b));
        Self { entries }
    }

    /// Entries in acting order
    pub fn entries(&self) -> &[InitiativeEntry] {
        &self.entries
    }

    /// Entry at a turn position
    pub fn get(&self, position: usize) -> Option<&InitiativeEntry> {
        self.entries.get(position)
    }

    /// Turn position of a combatant
    pub fn position_of(&self, combatant_id: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.combatant == combatant_id)
    }

    /// Combatant ids in acting order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.combatant.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Roll initiative for every combatant, in registration order
pub fn roll_initiative<R: Roller + ?Sized>(combatants: &[Combatant], roller: &mut R) -> TurnOrder {
    let entries = combatants
        .iter()
        .enumerate()
        .map(|(slot, combatant)| {
            let roll = roll_d20(roller).natural();
            InitiativeEntry {
                combatant: combatant.id.clone(),
                slot,
                side: combatant.side,
                roll,
                modifier: combatant.dexterity_modifier,
                total: (roll as i32).saturating_add(combatant.dexterity_modifier),
            }
        })
        .collect();

    TurnOrder::from_entries(entries)
}
