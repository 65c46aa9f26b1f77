//! Combat session state machine
//!
//! Owns one encounter from setup to its terminal outcome:
//!
//! ```text
//! Setup -> RoundActive -> RoundComplete -> Victory | Defeat | Fled
//!              ^               |
//!              +---------------+  (next round)
//! ```
//!
//! Initiative is rolled once in `begin`. Each `take_turn` resolves the
//! current actor's action, appends to the turn log, then walks the pointer
//! to the next combatant able to act. Dead or fled combatants are skipped
//! silently; surprised ones are logged as skipped during round 1.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::actions::{self, Action, AttackResult, FleeResult};
use super::combatant::{Combatant, Side};
use super::dice::{Roller, RollerCheckpoint, SeededRoller};
use super::error::CombatError;
use super::initiative::{roll_initiative, InitiativeEntry, TurnOrder};
use super::registry::{ArchetypeRegistry, CombatTrigger};
use super::tactics::{Battlefield, Tactics};

/// Round limit used by [`CombatSession::run_to_completion`]
pub const DEFAULT_ROUND_LIMIT: u32 = 500;

/// The player always registers first
const PLAYER_SLOT: usize = 0;

/// Lifecycle phase of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatPhase {
    /// Combatants registered, initiative not rolled
    Setup,
    /// Turns are being taken
    RoundActive,
    /// Every combatant has had its turn this round
    RoundComplete,
    /// All enemies are down
    Victory,
    /// The player is dead
    Defeat,
    /// The player escaped
    Fled,
}

impl CombatPhase {
    /// Terminal phases accept no further actions
    pub fn is_terminal(&self) -> bool {
        self.outcome().is_some()
    }

    /// Outcome of a terminal phase
    pub fn outcome(&self) -> Option<CombatOutcome> {
        match self {
            CombatPhase::Victory => Some(CombatOutcome::Victory),
            CombatPhase::Defeat => Some(CombatOutcome::Defeat),
            CombatPhase::Fled => Some(CombatOutcome::Fled),
            _ => None,
        }
    }
}

/// How an encounter ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatOutcome {
    Victory,
    Defeat,
    Fled,
}

impl From<CombatOutcome> for CombatPhase {
    fn from(outcome: CombatOutcome) -> Self {
        match outcome {
            CombatOutcome::Victory => CombatPhase::Victory,
            CombatOutcome::Defeat => CombatPhase::Defeat,
            CombatOutcome::Fled => CombatPhase::Fled,
        }
    }
}

impl fmt::Display for CombatOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CombatOutcome::Victory => "victory",
            CombatOutcome::Defeat => "defeat",
            CombatOutcome::Fled => "fled",
        };
        write!(f, "{}", s)
    }
}

/// Player plus optional companions entering an encounter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Party {
    player: Combatant,
    companions: Vec<Combatant>,
}

impl Party {
    /// Party of one
    pub fn new(player: Combatant) -> Self {
        Self {
            player,
            companions: Vec::new(),
        }
    }

    /// Add a companion
    pub fn with_companion(mut self, companion: Combatant) -> Self {
        self.companions.push(companion);
        self
    }

    /// Player first, then companions
    pub fn members(&self) -> impl Iterator<Item = &Combatant> {
        std::iter::once(&self.player).chain(self.companions.iter())
    }
}

/// One entry of the turn log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TurnEvent {
    /// Turn order for the encounter
    Initiative { order: Vec<InitiativeEntry> },
    RoundStarted { round: u32 },
    /// Combatant skipped its turn because it was surprised
    Surprised { round: u32, actor: String },
    Attack {
        round: u32,
        actor: String,
        target: String,
        result: AttackResult,
    },
    Defend { round: u32, actor: String },
    Flee {
        round: u32,
        actor: String,
        result: FleeResult,
    },
    /// Combatant dropped to 0 hit points
    Defeated {
        round: u32,
        combatant: String,
        by: String,
    },
    RoundEnded { round: u32 },
    CombatEnded { round: u32, outcome: CombatOutcome },
}

impl TurnEvent {
    /// Id of the combatant that acted, if any
    pub fn actor(&self) -> Option<&str> {
        match self {
            TurnEvent::Surprised { actor, .. }
            | TurnEvent::Attack { actor, .. }
            | TurnEvent::Defend { actor, .. }
            | TurnEvent::Flee { actor, .. } => Some(actor),
            _ => None,
        }
    }

    /// Round the event happened in (initiative happens before round 1)
    pub fn round(&self) -> Option<u32> {
        match self {
            TurnEvent::Initiative { .. } => None,
            TurnEvent::RoundStarted { round }
            | TurnEvent::Surprised { round, .. }
            | TurnEvent::Attack { round, .. }
            | TurnEvent::Defend { round, .. }
            | TurnEvent::Flee { round, .. }
            | TurnEvent::Defeated { round, .. }
            | TurnEvent::RoundEnded { round }
            | TurnEvent::CombatEnded { round, .. } => Some(*round),
        }
    }

    /// Whether this is an action actually taken (attack, defend, flee)
    pub fn is_action(&self) -> bool {
        matches!(
            self,
            TurnEvent::Attack { .. } | TurnEvent::Defend { .. } | TurnEvent::Flee { .. }
        )
    }
}

impl fmt::Display for TurnEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnEvent::Initiative { order } => {
                write!(f, "Initiative:")?;
                for entry in order {
                    write!(f, " {} ({})", entry.combatant, entry.total)?;
                }
                Ok(())
            }
            TurnEvent::RoundStarted { round } => write!(f, "Round {} begins", round),
            TurnEvent::Surprised { actor, .. } => write!(f, "{}: no action — surprised", actor),
            TurnEvent::Attack {
                actor,
                target,
                result,
                ..
            } => write!(f, "{} attacks {}: {}", actor, target, result),
            TurnEvent::Defend { actor, .. } => write!(f, "{} takes a defensive stance", actor),
            TurnEvent::Flee { actor, result, .. } => {
                write!(
                    f,
                    "{} tries to flee: {} + {} = {} vs DC {}",
                    actor,
                    result.roll,
                    result.modifier,
                    result.total,
                    result.dc
                )?;
                if result.escaped {
                    write!(f, ", escaped")
                } else {
                    write!(f, ", caught")?;
                    match (&result.pursuer, &result.opportunity_attack) {
                        (Some(pursuer), Some(attack)) => {
                            write!(f, "; {} strikes: {}", pursuer, attack)
                        }
                        _ => Ok(()),
                    }
                }
            }
            TurnEvent::Defeated { combatant, by, .. } => {
                write!(f, "{} is defeated by {}", combatant, by)
            }
            TurnEvent::RoundEnded { round } => write!(f, "Round {} ends", round),
            TurnEvent::CombatEnded { outcome, round } => {
                write!(f, "Combat ends in {} after {} rounds", outcome, round)
            }
        }
    }
}

/// Final report handed to the caller once a session is terminal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatResult {
    pub outcome: CombatOutcome,
    pub rounds_elapsed: u32,
    pub turn_log: Vec<TurnEvent>,
    /// Enemies still standing (including any that fled)
    pub surviving_enemies: Vec<Combatant>,
    pub defeated_enemies: Vec<Combatant>,
    /// Final state of the player and companions
    pub party: Vec<Combatant>,
    /// Experience from defeated enemies; 0 on defeat
    pub experience_earned: u64,
}

impl CombatResult {
    /// The player's final state
    pub fn player(&self) -> Option<&Combatant> {
        self.party.iter().find(|c| c.side == Side::Player)
    }
}

/// Persisted form of a [`CombatSession`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub combatants: Vec<Combatant>,
    pub order: TurnOrder,
    pub turn_index: usize,
    pub round: u32,
    pub surprise: bool,
    pub phase: CombatPhase,
    pub log: Vec<TurnEvent>,
    pub roller: RollerCheckpoint,
}

/// One encounter, from setup to outcome
#[derive(Debug, Clone)]
pub struct CombatSession<R: Roller = SeededRoller> {
    combatants: Vec<Combatant>,
    order: TurnOrder,
    turn_index: usize,
    round: u32,
    surprise: bool,
    phase: CombatPhase,
    log: Vec<TurnEvent>,
    roller: R,
}

impl CombatSession<SeededRoller> {
    /// Create a session whose dice come from `seed`
    pub fn new(
        trigger: &CombatTrigger,
        registry: &ArchetypeRegistry,
        party: Party,
        seed: u64,
    ) -> Result<Self, CombatError> {
        Self::with_roller(trigger, registry, party, SeededRoller::new(seed))
    }

    /// Seed of the session's dice
    pub fn seed(&self) -> u64 {
        self.roller.seed()
    }

    /// Snapshot the whole session, dice position included
    pub fn to_state(&self) -> SessionState {
        SessionState {
            combatants: self.combatants.clone(),
            order: self.order.clone(),
            turn_index: self.turn_index,
            round: self.round,
            surprise: self.surprise,
            phase: self.phase,
            log: self.log.clone(),
            roller: self.roller.checkpoint(),
        }
    }

    /// Restore a snapshot; resolution continues exactly as it would have
    pub fn from_state(state: SessionState) -> Result<Self, CombatError> {
        validate_state(&state)?;

        let mut session = Self {
            combatants: state.combatants,
            order: state.order,
            turn_index: state.turn_index,
            round: state.round,
            surprise: state.surprise,
            phase: state.phase,
            log: state.log,
            roller: SeededRoller::restore(state.roller),
        };
        session.settle();
        Ok(session)
    }
}

impl<R: Roller> CombatSession<R> {
    /// Create a session that draws dice from `roller`
    pub fn with_roller(
        trigger: &CombatTrigger,
        registry: &ArchetypeRegistry,
        party: Party,
        roller: R,
    ) -> Result<Self, CombatError> {
        if trigger.enemy_archetype_keys.is_empty() {
            return Err(CombatError::EmptyEncounter);
        }

        let Party {
            mut player,
            companions,
        } = party;
        if player.side != Side::Player {
            return Err(CombatError::InvalidParty(format!(
                "{} is not on the player side",
                player.id
            )));
        }
        if player.is_dead() {
            return Err(CombatError::InvalidParty(format!(
                "{} cannot fight at 0 hit points",
                player.id
            )));
        }
        player.reset_transient();

        let mut combatants = vec![player];
        for mut companion in companions {
            if companion.side != Side::Companion {
                return Err(CombatError::InvalidParty(format!(
                    "{} is not on the companion side",
                    companion.id
                )));
            }
            companion.reset_transient();
            combatants.push(companion);
        }

        let keys: Vec<String> = trigger
            .enemy_archetype_keys
            .iter()
            .map(|key| key.trim().to_lowercase())
            .collect();
        let mut totals: HashMap<&str, usize> = HashMap::new();
        for key in &keys {
            *totals.entry(key.as_str()).or_default() += 1;
        }

        // Plain ids are claimed first so numbered ones step around them
        let mut taken: HashSet<String> = combatants.iter().map(|c| c.id.clone()).collect();
        let plain: Vec<bool> = keys
            .iter()
            .map(|key| totals[key.as_str()] == 1 && taken.insert(key.clone()))
            .collect();

        let mut seen: HashMap<&str, usize> = HashMap::new();
        for (key, plain) in keys.iter().zip(plain) {
            let stats = registry
                .get(key)
                .ok_or_else(|| CombatError::UnknownArchetype(key.clone()))?;

            let mut enemy = if plain {
                Combatant::from_stat_block(key.clone(), Side::Enemy, stats)
            } else {
                let n = seen.entry(key.as_str()).or_default();
                *n += 1;
                let id = free_id(&mut taken, key, *n);
                Combatant::from_stat_block(id, Side::Enemy, stats)
                    .with_name(format!("{} #{}", stats.name, n))
            };
            enemy.set_surprised(trigger.surprise);
            combatants.push(enemy);
        }

        let mut ids = HashSet::new();
        for combatant in &combatants {
            if !ids.insert(combatant.id.as_str()) {
                return Err(CombatError::InvalidParty(format!(
                    "duplicate combatant id {}",
                    combatant.id
                )));
            }
        }

        Ok(Self {
            combatants,
            order: TurnOrder::default(),
            turn_index: 0,
            round: 1,
            surprise: trigger.surprise,
            phase: CombatPhase::Setup,
            log: Vec::new(),
            roller,
        })
    }

    /// Roll initiative and start round 1
    pub fn begin(&mut self) -> Result<(), CombatError> {
        match self.phase {
            CombatPhase::Setup => {}
            phase if phase.is_terminal() => return Err(CombatError::SessionOver),
            _ => return Err(CombatError::AlreadyStarted),
        }

        self.order = roll_initiative(&self.combatants, &mut self.roller);
        info!(
            "Combat begins: {} combatants, surprise={}, order [{}]",
            self.combatants.len(),
            self.surprise,
            self.order.ids().collect::<Vec<_>>().join(", ")
        );

        self.log.push(TurnEvent::Initiative {
            order: self.order.entries().to_vec(),
        });
        self.round = 1;
        self.turn_index = 0;
        self.phase = CombatPhase::RoundActive;
        self.log.push(TurnEvent::RoundStarted { round: 1 });
        self.settle();
        Ok(())
    }

    /// Resolve `action` for the current actor and advance to the next turn.
    ///
    /// Returns the events appended by this turn. On error nothing changes.
    pub fn take_turn(&mut self, action: Action) -> Result<&[TurnEvent], CombatError> {
        self.ensure_running()?;
        let actor_slot = self.current_slot().ok_or(CombatError::NoActor)?;
        let start = self.log.len();
        let round = self.round;

        match action {
            Action::Attack { target } => {
                let target_slot = self
                    .slot_of(&target)
                    .ok_or_else(|| CombatError::TargetNotFound(target.clone()))?;
                if target_slot == actor_slot {
                    return Err(CombatError::illegal(&target, "cannot attack itself"));
                }

                let (actor, victim) = pair_mut(&mut self.combatants, actor_slot, target_slot);
                let result = actions::attack(&mut self.roller, actor, victim)?;
                actor.set_advantage(false);
                debug!("{} attacks {}: {}", actor.id, victim.id, result);

                let actor_id = actor.id.clone();
                let target_id = victim.id.clone();
                let killed = victim.is_dead();
                self.log.push(TurnEvent::Attack {
                    round,
                    actor: actor_id.clone(),
                    target: target_id.clone(),
                    result,
                });
                if killed {
                    self.log.push(TurnEvent::Defeated {
                        round,
                        combatant: target_id,
                        by: actor_id,
                    });
                }
            }
            Action::Defend => {
                let actor = &mut self.combatants[actor_slot];
                actions::defend(actor)?;
                debug!("{} defends", actor.id);
                self.log.push(TurnEvent::Defend {
                    round,
                    actor: actor.id.clone(),
                });
            }
            Action::Flee => {
                let result = match self.pursuer_of(actor_slot) {
                    Some(pursuer_slot) => {
                        let (actor, pursuer) =
                            pair_mut(&mut self.combatants, actor_slot, pursuer_slot);
                        actions::flee(&mut self.roller, actor, Some(&*pursuer))?
                    }
                    None => actions::flee(&mut self.roller, &mut self.combatants[actor_slot], None)?,
                };

                let actor = &self.combatants[actor_slot];
                debug!(
                    "{} flees: {} vs DC {} ({})",
                    actor.id,
                    result.total,
                    result.dc,
                    if result.escaped { "escaped" } else { "caught" }
                );
                let actor_id = actor.id.clone();
                let killed = actor.is_dead();
                let pursuer = result.pursuer.clone();
                self.log.push(TurnEvent::Flee {
                    round,
                    actor: actor_id.clone(),
                    result,
                });
                if let (true, Some(by)) = (killed, pursuer) {
                    self.log.push(TurnEvent::Defeated {
                        round,
                        combatant: actor_id,
                        by,
                    });
                }
            }
        }

        self.turn_index += 1;
        self.settle();
        Ok(&self.log[start..])
    }

    /// Give a combatant advantage on its next attack roll
    pub fn grant_advantage(&mut self, combatant_id: &str) -> Result<(), CombatError> {
        if self.phase.is_terminal() {
            return Err(CombatError::SessionOver);
        }
        let slot = self
            .slot_of(combatant_id)
            .ok_or_else(|| CombatError::TargetNotFound(combatant_id.to_string()))?;
        let combatant = &mut self.combatants[slot];
        if !combatant.is_active() {
            return Err(CombatError::illegal(
                combatant_id,
                "no longer in the fight",
            ));
        }
        combatant.set_advantage(true);
        Ok(())
    }

    /// Drive every remaining turn through `tactics`
    pub fn run_to_completion<T>(&mut self, tactics: &mut T) -> Result<CombatResult, CombatError>
    where
        T: Tactics + ?Sized,
    {
        self.run_with_limit(tactics, DEFAULT_ROUND_LIMIT)
    }

    /// Drive every remaining turn through `tactics`, giving up after
    /// `max_rounds` rounds (the session is left non-terminal)
    pub fn run_with_limit<T>(
        &mut self,
        tactics: &mut T,
        max_rounds: u32,
    ) -> Result<CombatResult, CombatError>
    where
        T: Tactics + ?Sized,
    {
        if self.phase == CombatPhase::Setup {
            self.begin()?;
        }

        while !self.phase.is_terminal() {
            if self.round > max_rounds {
                warn!(
                    "Combat abandoned after {} rounds without an outcome",
                    max_rounds
                );
                return Err(CombatError::RoundLimit(max_rounds));
            }

            let slot = self.current_slot().ok_or(CombatError::NoActor)?;
            let field = Battlefield::new(&self.combatants, self.round);
            let action = tactics.choose_action(&self.combatants[slot], &field);
            self.take_turn(action)?;
        }

        self.result().ok_or(CombatError::NoActor)
    }

    /// Final report, available once the session is terminal
    pub fn result(&self) -> Option<CombatResult> {
        let outcome = self.phase.outcome()?;

        let (defeated_enemies, surviving_enemies): (Vec<Combatant>, Vec<Combatant>) = self
            .combatants
            .iter()
            .filter(|c| c.side == Side::Enemy)
            .cloned()
            .partition(|c| c.is_dead());
        let party = self
            .combatants
            .iter()
            .filter(|c| c.side.is_party())
            .cloned()
            .collect();

        let experience_earned = match outcome {
            CombatOutcome::Defeat => 0,
            _ => defeated_enemies.iter().map(|c| c.experience).sum(),
        };

        Some(CombatResult {
            outcome,
            rounds_elapsed: self.round,
            turn_log: self.log.clone(),
            surviving_enemies,
            defeated_enemies,
            party,
            experience_earned,
        })
    }

    /// Current phase
    pub fn phase(&self) -> CombatPhase {
        self.phase
    }

    /// Whether the session reached an outcome
    pub fn is_over(&self) -> bool {
        self.phase.is_terminal()
    }

    /// Current round (starts at 1)
    pub fn round(&self) -> u32 {
        self.round
    }

    /// Whether the enemies started surprised
    pub fn is_surprise(&self) -> bool {
        self.surprise
    }

    /// Turn log so far
    pub fn log(&self) -> &[TurnEvent] {
        &self.log
    }

    /// Combatants in registration order
    pub fn combatants(&self) -> &[Combatant] {
        &self.combatants
    }

    /// Look up a combatant by id
    pub fn combatant(&self, id: &str) -> Option<&Combatant> {
        self.combatants.iter().find(|c| c.id == id)
    }

    /// Fixed turn order (empty during setup)
    pub fn turn_order(&self) -> &TurnOrder {
        &self.order
    }

    /// Combatant whose turn it is
    pub fn current_actor(&self) -> Option<&Combatant> {
        self.current_slot().map(|slot| &self.combatants[slot])
    }

    /// Read-only view for tactics
    pub fn battlefield(&self) -> Battlefield<'_> {
        Battlefield::new(&self.combatants, self.round)
    }

    fn ensure_running(&self) -> Result<(), CombatError> {
        match self.phase {
            CombatPhase::Setup => Err(CombatError::NotStarted),
            phase if phase.is_terminal() => Err(CombatError::SessionOver),
            _ => Ok(()),
        }
    }

    fn current_slot(&self) -> Option<usize> {
        if self.phase != CombatPhase::RoundActive {
            return None;
        }
        self.order.get(self.turn_index).map(|entry| entry.slot)
    }

    fn slot_of(&self, id: &str) -> Option<usize> {
        self.combatants.iter().position(|c| c.id == id)
    }

    /// First active opponent after the actor in turn order, wrapping around
    fn pursuer_of(&self, actor_slot: usize) -> Option<usize> {
        let actor = &self.combatants[actor_slot];
        let position = self.order.position_of(&actor.id)?;
        let len = self.order.len();

        (1..len)
            .map(|offset| self.order.entries()[(position + offset) % len].slot)
            .find(|&slot| {
                let candidate = &self.combatants[slot];
                actor.side.opposes(candidate.side) && candidate.is_active()
            })
    }

    fn verdict(&self) -> Option<CombatOutcome> {
        let enemies_remain = self
            .combatants
            .iter()
            .any(|c| c.side == Side::Enemy && c.is_active());
        let player = &self.combatants[PLAYER_SLOT];

        if !enemies_remain {
            Some(CombatOutcome::Victory)
        } else if player.is_dead() {
            Some(CombatOutcome::Defeat)
        } else if player.has_fled() {
            Some(CombatOutcome::Fled)
        } else {
            None
        }
    }

    /// Walk the state machine until someone must act or the fight is over
    fn settle(&mut self) {
        loop {
            match self.phase {
                CombatPhase::RoundActive => {
                    // A decided fight closes the round early
                    if self.verdict().is_some() || self.turn_index >= self.order.len() {
                        self.phase = CombatPhase::RoundComplete;
                        self.log.push(TurnEvent::RoundEnded { round: self.round });
                        continue;
                    }

                    let slot = self.order.entries()[self.turn_index].slot;
                    let combatant = &mut self.combatants[slot];
                    if !combatant.is_active() {
                        self.turn_index += 1;
                        continue;
                    }
                    if combatant.is_surprised() {
                        debug!("{} is surprised and loses its turn", combatant.id);
                        self.log.push(TurnEvent::Surprised {
                            round: self.round,
                            actor: combatant.id.clone(),
                        });
                        self.turn_index += 1;
                        continue;
                    }

                    // Defending lasts until the defender's own next turn
                    combatant.set_defending(false);
                    return;
                }
                CombatPhase::RoundComplete => {
                    if let Some(outcome) = self.verdict() {
                        self.phase = outcome.into();
                        info!("Combat ends in {} after {} rounds", outcome, self.round);
                        self.log.push(TurnEvent::CombatEnded {
                            round: self.round,
                            outcome,
                        });
                        return;
                    }

                    self.round += 1;
                    for combatant in &mut self.combatants {
                        combatant.set_surprised(false);
                    }
                    self.turn_index = 0;
                    self.phase = CombatPhase::RoundActive;
                    self.log.push(TurnEvent::RoundStarted { round: self.round });
                }
                _ => return,
            }
        }
    }
}

fn validate_state(state: &SessionState) -> Result<(), CombatError> {
    let invalid = |msg: String| Err(CombatError::InvalidState(msg));

    match state.combatants.first() {
        Some(player) if player.side == Side::Player => {}
        _ => return invalid("first combatant must be the player".to_string()),
    }
    if state
        .combatants
        .iter()
        .skip(1)
        .any(|c| c.side == Side::Player)
    {
        return invalid("only one player combatant is allowed".to_string());
    }
    if !state.combatants.iter().any(|c| c.side == Side::Enemy) {
        return invalid("no enemies in session".to_string());
    }

    let mut ids = HashSet::new();
    if let Some(dup) = state.combatants.iter().find(|c| !ids.insert(c.id.as_str())) {
        return invalid(format!("duplicate combatant id {}", dup.id));
    }

    if state.round == 0 {
        return invalid("round counter starts at 1".to_string());
    }

    match state.phase {
        CombatPhase::Setup => {
            if !state.order.is_empty() {
                return invalid("turn order rolled before setup finished".to_string());
            }
            return Ok(());
        }
        CombatPhase::RoundComplete => {
            return invalid("sessions are never persisted between rounds".to_string());
        }
        _ => {}
    }

    if state.order.len() != state.combatants.len() {
        return invalid(format!(
            "turn order has {} entries for {} combatants",
            state.order.len(),
            state.combatants.len()
        ));
    }
    let mut slots = HashSet::new();
    for entry in state.order.entries() {
        let matches = state
            .combatants
            .get(entry.slot)
            .is_some_and(|c| c.id == entry.combatant);
        if !matches || !slots.insert(entry.slot) {
            return invalid(format!("turn order entry {} is inconsistent", entry.combatant));
        }
    }
    if state.turn_index > state.order.len() {
        return invalid(format!("turn index {} out of range", state.turn_index));
    }

    Ok(())
}

/// First `{key}-{n}` id not yet claimed, claiming it
fn free_id(taken: &mut HashSet<String>, key: &str, start: usize) -> String {
    let mut n = start;
    loop {
        let id = format!("{}-{}", key, n);
        if taken.insert(id.clone()) {
            return id;
        }
        n += 1;
    }
}

fn pair_mut<T>(items: &mut [T], a: usize, b: usize) -> (&mut T, &mut T) {
    debug_assert_ne!(a, b);
    if a < b {
        let (left, right) = items.split_at_mut(b);
        (&mut left[a], &mut right[0])
    } else {
        let (left, right) = items.split_at_mut(a);
        (&mut right[0], &mut left[b])
    }
}
