//! Experience and leveling
//!
//! Tracks milestone-driven experience and the five-level advancement table:
//! - Milestone awards (minor, major, boss, adventure)
//! - Level thresholds and eligibility checks
//! - Level-ups returning the rewards for the character to apply
//!
//! Negative or zero experience is ignored, so experience never decreases
//! and a level is never lost.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Highest reachable level
pub const MAX_LEVEL: u8 = 5;

/// Cumulative experience required for each level (index is level - 1)
pub const LEVEL_THRESHOLDS: [u64; MAX_LEVEL as usize] = [0, 100, 300, 600, 1000];

/// Max HP gained on every level-up
pub const HP_PER_LEVEL: i32 = 2;

/// Ability score increase granted by an ability boost
pub const ABILITY_BOOST: i32 = 2;

/// Errors raised by the progression tracker
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgressionError {
    #[error("cannot level up: level {level} with {experience} XP (next level needs {required})")]
    CannotLevelUp {
        level: u8,
        experience: u64,
        required: RequiredXp,
    },

    #[error("invalid progression state: {0}")]
    InvalidState(String),
}

/// Experience needed for the next level, for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredXp {
    Amount(u64),
    MaxLevel,
}

impl fmt::Display for RequiredXp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequiredXp::Amount(xp) => write!(f, "{} XP", xp),
            RequiredXp::MaxLevel => write!(f, "nothing, already at max level"),
        }
    }
}

/// Narrative milestone categories with fixed rewards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Milestone {
    Minor,
    Major,
    Boss,
    Adventure,
}

impl Milestone {
    /// Experience awarded for reaching this milestone
    pub fn experience(&self) -> u64 {
        match self {
            Milestone::Minor => 25,
            Milestone::Major => 50,
            Milestone::Boss => 100,
            Milestone::Adventure => 150,
        }
    }
}

impl fmt::Display for Milestone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Milestone::Minor => "minor",
            Milestone::Major => "major",
            Milestone::Boss => "boss",
            Milestone::Adventure => "adventure",
        };
        write!(f, "{}", s)
    }
}

/// Reward granted by a level besides hit points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Advancement {
    /// Increase the class's primary ability score
    AbilityBoost { amount: i32 },
    /// Unlock the class feature for this level
    ClassFeature,
}

impl Advancement {
    /// Fixed per-level table
    pub fn for_level(level: u8) -> Self {
        match level {
            4 => Advancement::AbilityBoost {
                amount: ABILITY_BOOST,
            },
            _ => Advancement::ClassFeature,
        }
    }
}

/// What a successful level-up grants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelUp {
    /// The level just reached
    pub level: u8,
    /// Increase to max (and current) hit points
    pub max_hp_gain: i32,
    pub advancement: Advancement,
    /// Proficiency bonus at the new level
    pub proficiency_bonus: i32,
}

/// Proficiency bonus for a level: +2 at levels 1-4, +3 at level 5
pub fn proficiency_bonus(level: u8) -> i32 {
    ((level.max(1) as i32 - 1) / 4) + 2
}

/// Cumulative experience needed to reach `level`
pub fn threshold(level: u8) -> Option<u64> {
    match level {
        1..=MAX_LEVEL => Some(LEVEL_THRESHOLDS[(level - 1) as usize]),
        _ => None,
    }
}

/// Level and experience of one character
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ProgressionState", into = "ProgressionState")]
pub struct Progression {
    level: u8,
    experience: u64,
}

impl Default for Progression {
    fn default() -> Self {
        Self::new()
    }
}

impl Progression {
    /// Level 1, no experience
    pub fn new() -> Self {
        Self {
            level: 1,
            experience: 0,
        }
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn experience(&self) -> u64 {
        self.experience
    }

    /// Proficiency bonus at the current level
    pub fn proficiency_bonus(&self) -> i32 {
        proficiency_bonus(self.level)
    }

    /// Experience needed for the next level, `None` at the cap
    pub fn next_threshold(&self) -> Option<u64> {
        threshold(self.level + 1)
    }

    /// Add experience, returning the amount actually gained.
    ///
    /// Amounts of zero or less are ignored.
    pub fn gain_experience(&mut self, amount: i64) -> u64 {
        if amount <= 0 {
            debug!("Ignoring non-positive experience award {}", amount);
            return 0;
        }
        let amount = amount as u64;
        let before = self.experience;
        self.experience = self.experience.saturating_add(amount);
        self.experience - before
    }

    /// Award a milestone's fixed experience
    pub fn award_milestone(&mut self, milestone: Milestone) -> u64 {
        let gained = self.gain_experience(milestone.experience() as i64);
        debug!("Awarded {} milestone: +{} XP", milestone, gained);
        gained
    }

    /// Whether the next level's threshold has been reached
    pub fn can_level_up(&self) -> bool {
        self.next_threshold()
            .is_some_and(|required| self.experience >= required)
    }

    /// Advance one level.
    ///
    /// Fails without changing anything when the threshold is not met or the
    /// character is at the level cap.
    pub fn level_up(&mut self) -> Result<LevelUp, ProgressionError> {
        if !self.can_level_up() {
            return Err(ProgressionError::CannotLevelUp {
                level: self.level,
                experience: self.experience,
                required: self
                    .next_threshold()
                    .map_or(RequiredXp::MaxLevel, RequiredXp::Amount),
            });
        }

        self.level += 1;
        let level_up = LevelUp {
            level: self.level,
            max_hp_gain: HP_PER_LEVEL,
            advancement: Advancement::for_level(self.level),
            proficiency_bonus: self.proficiency_bonus(),
        };
        info!(
            "Reached level {} ({} XP), proficiency +{}",
            self.level, self.experience, level_up.proficiency_bonus
        );
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

    /// Convert to the plain persisted form
    pub fn to_state(&self) -> ProgressionState {
        ProgressionState {
            level: self.level,
            experience: self.experience,
            proficiency_bonus: self.proficiency_bonus(),
        }
    }

    /// Rebuild from the persisted form.
    ///
    /// Rejects levels outside 1-5 and experience below the level's
    /// threshold. A stale `proficiency_bonus` is recomputed, not trusted.
    pub fn from_state(state: ProgressionState) -> Result<Self, ProgressionError> {
        let required = threshold(state.level).ok_or_else(|| {
            ProgressionError::InvalidState(format!(
                "level {} outside 1..={}",
                state.level, MAX_LEVEL
            ))
        })?;
        if state.experience < required {
            return Err(ProgressionError::InvalidState(format!(
                "level {} requires {} XP, found {}",
                state.level, required, state.experience
            )));
        }

        Ok(Self {
            level: state.level,
            experience: state.experience,
        })
    }
}

/// Persisted form of a [`Progression`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressionState {
    pub level: u8,
    pub experience: u64,
    /// Derived; ignored on load
    #[serde(default)]
    pub proficiency_bonus: i32,
}

impl From<Progression> for ProgressionState {
    fn from(progression: Progression) -> Self {
        progression.to_state()
    }
}

impl TryFrom<ProgressionState> for Progression {
    type Error = ProgressionError;

    fn try_from(state: ProgressionState) -> Result<Self, Self::Error> {
        Progression::from_state(state)
    }
}
