//! Combat errors

use thiserror::Error;

/// Errors raised by the combat engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CombatError {
    #[error("illegal action by {actor}: {reason}")]
    IllegalAction { actor: String, reason: String },

    #[error("target not found: {0}")]
    TargetNotFound(String),

    #[error("unknown enemy archetype: {0}")]
    UnknownArchetype(String),

    #[error("invalid party: {0}")]
    InvalidParty(String),

    #[error("encounter has no enemies")]
    EmptyEncounter,

    #[error("combat has not started")]
    NotStarted,

    #[error("combat has already started")]
    AlreadyStarted,

    #[error("no combatant is waiting to act")]
    NoActor,

    #[error("combat is already over")]
    SessionOver,

    #[error("combat did not finish within {0} rounds")]
    RoundLimit(u32),

    #[error("invalid combat state: {0}")]
    InvalidState(String),
}

impl CombatError {
    pub(crate) fn illegal(actor: &str, reason: impl Into<String>) -> Self {
        CombatError::IllegalAction {
            actor: actor.to_string(),
            reason: reason.into(),
        }
    }
}
