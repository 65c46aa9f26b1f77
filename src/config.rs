//! Simulator configuration
//!
//! Layered with figment, later layers winning:
//! 1. Built-in defaults
//! 2. TOML file (`--config`, or `skirmish.toml` in the working directory)
//! 3. `SKIRMISH_*` environment variables (`__` separates nested keys,
//!    e.g. `SKIRMISH_HERO__NAME=Aria`)

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::character::{AbilityScores, CharacterClass, PlayerCharacter, PLAYER_ID};
use crate::combat::{Combatant, DiceRoll, Side, StatBlock, DEFAULT_ROUND_LIMIT};

/// Config file picked up when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "skirmish.toml";

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "SKIRMISH_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Figment(#[from] figment::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// The player character the simulator fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeroConfig {
    pub name: String,
    pub class: CharacterClass,
    #[serde(default)]
    pub abilities: AbilityScores,
    pub max_hp: i32,
    pub armor_class: i32,
    pub damage_dice: DiceRoll,
}

impl Default for HeroConfig {
    fn default() -> Self {
        Self {
            name: "Hero".to_string(),
            class: CharacterClass::Fighter,
            abilities: AbilityScores {
                strength: 16,
                dexterity: 12,
                constitution: 14,
                ..AbilityScores::default()
            },
            max_hp: 20,
            armor_class: 16,
            damage_dice: DiceRoll::new(1, 8, 3),
        }
    }
}

impl HeroConfig {
    pub fn to_character(&self) -> PlayerCharacter {
        PlayerCharacter::new(
            self.name.clone(),
            self.class,
            self.abilities,
            self.max_hp,
            self.armor_class,
            self.damage_dice,
        )
    }
}

/// A companion fighting alongside the hero
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanionConfig {
    pub id: String,
    pub name: String,
    pub max_hp: i32,
    pub armor_class: i32,
    pub attack_bonus: i32,
    pub damage_dice: DiceRoll,
    #[serde(default)]
    pub dexterity_modifier: i32,
}

impl CompanionConfig {
    fn stat_block(&self) -> StatBlock {
        StatBlock {
            name: self.name.clone(),
            max_hp: self.max_hp,
            armor_class: self.armor_class,
            attack_bonus: self.attack_bonus,
            damage_dice: self.damage_dice,
            dexterity_modifier: self.dexterity_modifier,
            experience: 0,
        }
    }

    pub fn to_combatant(&self) -> Combatant {
        Combatant::from_stat_block(self.id.clone(), Side::Companion, &self.stat_block())
    }
}

/// Simulator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Dice seed; random when unset
    pub seed: Option<u64>,
    /// Bestiary TOML; the built-in bestiary when unset
    pub bestiary: Option<PathBuf>,
    /// Give up after this many rounds
    pub max_rounds: u32,
    pub log_format: LogFormat,
    pub hero: HeroConfig,
    #[serde(default)]
    pub companions: Vec<CompanionConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            seed: None,
            bestiary: None,
            max_rounds: DEFAULT_ROUND_LIMIT,
            log_format: LogFormat::Text,
            hero: HeroConfig::default(),
            companions: Vec::new(),
        }
    }
}

impl Config {
    /// Load defaults, then the config file, then the environment.
    ///
    /// An explicit `path` must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => Toml::file_exact(path),
            None => Toml::file(DEFAULT_CONFIG_FILE),
        };
        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(file)
            .merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::from_figment(figment)
    }

    /// Extract and validate from an assembled figment
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Config = figment.extract()?;
        config.validate()?;
        debug!(
            "Configuration loaded: seed={:?}, max_rounds={}, {} companions",
            config.seed,
            config.max_rounds,
            config.companions.len()
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_rounds == 0 {
            return Err(ConfigError::Invalid("max_rounds must be at least 1".to_string()));
        }
        self.hero
            .to_character()
            .stat_block()
            .validate()
            .map_err(|reason| ConfigError::Invalid(format!("hero: {}", reason)))?;

        let mut ids = HashSet::from([PLAYER_ID]);
        for companion in &self.companions {
            if !ids.insert(companion.id.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate companion id {}",
                    companion.id
                )));
            }
            companion
                .stat_block()
                .validate()
                .map_err(|reason| ConfigError::Invalid(format!("companion {}: {}", companion.id, reason)))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_toml(toml: &str) -> Result<Config, ConfigError> {
        Config::from_figment(
            Figment::from(Serialized::defaults(Config::default())).merge(Toml::string(toml)),
        )
    }

    #[test]
    fn test_defaults() {
        let config = from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.max_rounds, DEFAULT_ROUND_LIMIT);
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let config = from_toml(
            r#"
            seed = 42
            log_format = "json"

            [hero]
            name = "Mira"
            class = "rogue"
            max_hp = 14
            armor_class = 14
            damage_dice = "1d6+3"

            [hero.abilities]
            strength = 10
            dexterity = 17
            constitution = 12
            intelligence = 10
            wisdom = 10
            charisma = 14

            [[companions]]
            id = "wolf"
            name = "Loyal Wolf"
            max_hp = 11
            armor_class = 13
            attack_bonus = 4
            damage_dice = "2d4+2"
            dexterity_modifier = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.seed, Some(42));
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.max_rounds, DEFAULT_ROUND_LIMIT);

        let hero = config.hero.to_character();
        assert_eq!(hero.class, CharacterClass::Rogue);
        // proficiency 2 + dexterity 3
        assert_eq!(hero.attack_bonus(), 5);

        let wolf = config.companions[0].to_combatant();
        assert_eq!(wolf.side, Side::Companion);
        assert_eq!(wolf.damage_dice, DiceRoll::new(2, 4, 2));
    }

    #[test]
    fn test_bad_dice_rejected() {
        let result = from_toml(
            r#"
            [hero]
            name = "Hero"
            class = "fighter"
            max_hp = 20
            armor_class = 16
            damage_dice = "banana"
            "#,
        );
        assert!(matches!(result, Err(ConfigError::Figment(_))));
    }

    #[test]
    fn test_validation() {
        assert!(matches!(
            from_toml("max_rounds = 0"),
            Err(ConfigError::Invalid(_))
        ));

        let duplicate = r#"
            [[companions]]
            id = "player"
            name = "Impostor"
            max_hp = 5
            armor_class = 10
            attack_bonus = 0
            damage_dice = "1d4"
        "#;
        assert!(matches!(from_toml(duplicate), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_hero_stats_range_checked() {
        let result = from_toml(
            r#"
            [hero]
            name = "Hero"
            class = "fighter"
            max_hp = 20
            armor_class = 500
            damage_dice = "1d8+3"
            "#,
        );
        match result {
            Err(ConfigError::Invalid(reason)) => assert!(reason.contains("armor_class")),
            other => panic!("expected invalid hero, got {:?}", other),
        }

        let result = from_toml(
            r#"
            [hero]
            name = "Hero"
            class = "fighter"
            max_hp = 20
            armor_class = 16
            damage_dice = "1d8+5000"
            "#,
        );
        assert!(matches!(result, Err(ConfigError::Figment(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("skirmish.toml");
        std::fs::write(&path, "max_rounds = 25\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.max_rounds, 25);

        let missing = dir.path().join("nope.toml");
        assert!(Config::load(Some(&missing)).is_err());
    }
}
