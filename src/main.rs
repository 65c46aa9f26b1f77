//! skirmish - run a seeded encounter from the command line

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use rand::Rng;
use serde::Serialize;
use skirmish::character::PlayerCharacter;
use skirmish::combat::{
    ArchetypeRegistry, AutoTactics, CombatResult, CombatSession, CombatTrigger, Party,
};
use skirmish::config::{Config, LogFormat};
use skirmish::progression::LevelUp;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Turn-based encounter simulator
#[derive(Parser, Debug)]
#[command(name = "skirmish", version, about = "Simulate a seeded combat encounter")]
struct Args {
    /// Configuration file (defaults to ./skirmish.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bestiary TOML replacing the built-in archetypes
    #[arg(short, long)]
    bestiary: Option<PathBuf>,

    /// Dice seed (overrides the configuration)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Enemy archetype key (can be specified multiple times)
    #[arg(short, long = "enemy", required = true)]
    enemies: Vec<String>,

    /// The enemies are caught by surprise
    #[arg(long)]
    surprise: bool,

    /// Print the result as JSON instead of the turn log
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct Report<'a> {
    seed: u64,
    result: &'a CombatResult,
    level_ups: &'a [LevelUp],
    character: &'a PlayerCharacter,
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "skirmish=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    let config = Config::load(args.config.as_deref()).context("loading configuration")?;
    init_tracing(config.log_format);

    let bestiary = args.bestiary.as_ref().or(config.bestiary.as_ref());
    let registry = match bestiary {
        Some(path) => ArchetypeRegistry::load(path)
            .with_context(|| format!("loading bestiary {}", path.display()))?,
        None => ArchetypeRegistry::builtin().context("loading built-in bestiary")?,
    };

    for key in &args.enemies {
        if !registry.contains(key) {
            let known: Vec<&str> = registry.keys().collect();
            bail!("Unknown enemy '{}' (known: {})", key, known.join(", "));
        }
    }

    let seed = args
        .seed
        .or(config.seed)
        .unwrap_or_else(|| rand::rng().random());
    info!("Using seed {}", seed);

    let mut character = config.hero.to_character();
    let party = config
        .companions
        .iter()
        .fold(Party::new(character.to_combatant()), |party, companion| {
            party.with_companion(companion.to_combatant())
        });

    let trigger = CombatTrigger::new(args.enemies.iter().cloned()).with_surprise(args.surprise);
    let mut session = CombatSession::new(&trigger, &registry, party, seed)?;
    let result = session.run_with_limit(&mut AutoTactics, config.max_rounds)?;

    character.absorb_combat(&result);
    let level_ups = character.level_up_all();

    if args.json {
        let report = Report {
            seed,
            result: &result,
            level_ups: &level_ups,
            character: &character,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for event in &result.turn_log {
        println!("{}", event);
    }
    println!();
    println!(
        "Outcome: {} after {} rounds, {} XP earned",
        result.outcome, result.rounds_elapsed, result.experience_earned
    );
    for level_up in &level_ups {
        println!(
            "Level {} reached: +{} max HP, {:?}",
            level_up.level, level_up.max_hp_gain, level_up.advancement
        );
    }
    println!("{}", character);

    Ok(())
}
