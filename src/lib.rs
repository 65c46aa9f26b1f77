//! skirmish - combat and character-progression engine
//!
//! Resolves turn-based encounters between a player, optional companions and
//! enemies, and tracks experience-driven leveling. Pure and synchronous: no
//! I/O during resolution, and a seed fully determines every turn log.

pub mod character;
pub mod combat;
pub mod config;
pub mod progression;

pub use character::PlayerCharacter;
pub use combat::{
    Action, ArchetypeRegistry, AutoTactics, CombatError, CombatOutcome, CombatResult,
    CombatSession, CombatTrigger, Party, TurnEvent,
};
pub use config::Config;
pub use progression::{Milestone, Progression};
