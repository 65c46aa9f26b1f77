//! Enemy archetype registry
//!
//! Read-only stat templates, injected into every session. Content files are
//! validated when they load, so a live encounter never meets bad dice
//! notation.
//!
//! TOML layout:
//!
//! ```toml
//! [archetypes.goblin]
//! name = "Goblin"
//! max_hp = 7
//! armor_class = 13
//! attack_bonus = 4
//! damage_dice = "1d6+2"
//! dexterity_modifier = 2
//! experience = 25
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use figment::providers::{Format, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::combatant::StatBlock;
use super::dice::{parse_dice, ParseError};

/// Bestiary shipped with the crate
pub const BUILTIN_BESTIARY: &str = include_str!("../../data/bestiary.toml");

/// Errors raised while loading archetype content
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("archetype '{key}' has invalid damage dice: {source}")]
    Dice {
        key: String,
        #[source]
        source: ParseError,
    },

    #[error("archetype '{key}' is invalid: {reason}")]
    InvalidArchetype { key: String, reason: String },

    #[error("failed to read bestiary: {0}")]
    Figment(#[from] figment::Error),

    #[error("failed to parse bestiary JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Event that starts an encounter, produced by the trigger parser upstream
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CombatTrigger {
    /// Registry keys of the enemies, in registration order
    pub enemy_archetype_keys: Vec<String>,
    /// Whether the enemies are caught by surprise
    #[serde(default)]
    pub surprise: bool,
}

impl CombatTrigger {
    /// Trigger an encounter with the given enemies
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            enemy_archetype_keys: keys.into_iter().map(Into::into).collect(),
            surprise: false,
        }
    }

    /// Catch the enemies by surprise
    pub fn with_surprise(mut self, surprise: bool) -> Self {
        self.surprise = surprise;
        self
    }
}

/// Archetype as written in a content file (dice still unparsed)
#[derive(Debug, Deserialize)]
struct RawArchetype {
    name: String,
    max_hp: i32,
    armor_class: i32,
    attack_bonus: i32,
    damage_dice: String,
    #[serde(default)]
    dexterity_modifier: i32,
    #[serde(default)]
    experience: u64,
}

#[derive(Debug, Default, Deserialize)]
struct BestiaryFile {
    #[serde(default)]
    archetypes: BTreeMap<String, RawArchetype>,
}

/// Read-only lookup of enemy stat templates
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchetypeRegistry {
    archetypes: BTreeMap<String, StatBlock>,
}

impl ArchetypeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an archetype while building the registry
    pub fn with_archetype(
        mut self,
        key: impl Into<String>,
        stats: StatBlock,
    ) -> Result<Self, RegistryError> {
        let key = normalize_key(&key.into());
        stats
            .validate()
            .map_err(|reason| RegistryError::InvalidArchetype {
                key: key.clone(),
                reason,
            })?;
        self.archetypes.insert(key, stats);
        Ok(self)
    }

    /// The built-in bestiary
    pub fn builtin() -> Result<Self, RegistryError> {
        Self::from_toml_str(BUILTIN_BESTIARY)
    }

    /// Parse a TOML bestiary
    pub fn from_toml_str(toml: &str) -> Result<Self, RegistryError> {
        let file: BestiaryFile = Figment::from(Toml::string(toml)).extract()?;
        Self::from_file(file)
    }

    /// Parse a JSON bestiary (same layout as the TOML form)
    pub fn from_json_str(json: &str) -> Result<Self, RegistryError> {
        let file: BestiaryFile = serde_json::from_str(json)?;
        Self::from_file(file)
    }

    /// Load a TOML bestiary from disk
    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let file: BestiaryFile = Figment::from(Toml::file_exact(path)).extract()?;
        let registry = Self::from_file(file)?;
        debug!(
            "Loaded {} archetypes from {}",
            registry.len(),
            path.display()
        );
        Ok(registry)
    }

    fn from_file(file: BestiaryFile) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for (key, raw) in file.archetypes {
            let damage_dice = parse_dice(&raw.damage_dice).map_err(|source| RegistryError::Dice {
                key: key.clone(),
                source,
            })?;
            let stats = StatBlock {
                name: raw.name,
                max_hp: raw.max_hp,
                armor_class: raw.armor_class,
                attack_bonus: raw.attack_bonus,
                damage_dice,
                dexterity_modifier: raw.dexterity_modifier,
                experience: raw.experience,
            };
            registry = registry.with_archetype(key, stats)?;
        }
        Ok(registry)
    }

    /// Look up an archetype by key (case-insensitive)
    pub fn get(&self, key: &str) -> Option<&StatBlock> {
        self.archetypes.get(&normalize_key(key))
    }

    /// Check whether a key is known
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// All keys, sorted
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.archetypes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.archetypes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archetypes.is_empty()
    }
}

fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase()
}
