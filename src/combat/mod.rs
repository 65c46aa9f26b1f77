//! Combat system module
//!
//! Implements turn-based encounters with:
//! - Dice rolling (e.g., "2d6+3") from an injectable, seedable source
//! - Combatants for the player, companions and enemies
//! - Initiative order fixed for the whole encounter
//! - Attack, defend and flee resolution with critical and fumble rules
//! - A session state machine producing a structured turn log

mod actions;
mod combatant;
mod dice;
mod error;
mod initiative;
mod registry;
mod session;
mod tactics;

pub use actions::{attack, defend, flee, Action, AttackResult, FleeResult, FLEE_BASE_DC};
pub use combatant::{
    Combatant, CombatantState, Side, StatBlock, DEFEND_AC_BONUS, MAX_ARMOR_CLASS, MAX_HIT_POINTS,
    MAX_STAT_MODIFIER,
};
pub use dice::{
    is_critical, is_fumble, parse_dice, roll_d20, roll_d20_with_advantage, roll_dice, D20Roll, DiceRoll, ParseError,
    RollDetail, Roller, RollerCheckpoint, ScriptedRoller, SeededRoller, MAX_DICE_COUNT,
    MAX_DICE_MODIFIER, MAX_DIE_SIDES,
};
pub use error::CombatError;
pub use initiative::{roll_initiative, InitiativeEntry, TurnOrder};
pub use registry::{ArchetypeRegistry, CombatTrigger, RegistryError, BUILTIN_BESTIARY};
pub use session::{
    CombatOutcome, CombatPhase, CombatResult, CombatSession, Party, SessionState, TurnEvent,
    DEFAULT_ROUND_LIMIT,
};
pub use tactics::{AutoTactics, Battlefield, Tactics};
