//! Dice rolling system
//!
//! Parses and rolls dice notation like "2d6+3", "1d20", "4d6-2".
//!
//! Every roll draws from a [`Roller`], so a session owns its randomness and
//! can be replayed exactly from a seed.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Most dice a single notation may roll
pub const MAX_DICE_COUNT: u32 = 100;

/// Most faces a single die may have
pub const MAX_DIE_SIDES: u32 = 1000;

/// Largest flat modifier, either sign
pub const MAX_DICE_MODIFIER: i32 = 1000;

/// `N` is optional ("d6" means "1d6"); the modifier is optional and signed.
static DICE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d*)d(\d+)([+-]\d+)?$").unwrap());

/// Errors raised while parsing dice notation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("malformed dice notation '{0}' (expected NdM, NdM+K or NdM-K)")]
    Malformed(String),

    #[error("dice count must be between 1 and {max} (got {0})", max = MAX_DICE_COUNT)]
    InvalidCount(u64),

    #[error("die sides must be between 1 and {max} (got {0})", max = MAX_DIE_SIDES)]
    InvalidSides(u64),

    #[error("dice modifier '{0}' is out of range (limit is {max})", max = MAX_DICE_MODIFIER)]
    InvalidModifier(String),
}

/// Source of individual die faces.
///
/// Implementations must return a value in `1..=sides` for any `sides >= 1`.
pub trait Roller {
    /// Roll one die with `sides` faces
    fn die(&mut self, sides: u32) -> u32;
}

impl<R: Roller + ?Sized> Roller for &mut R {
    fn die(&mut self, sides: u32) -> u32 {
        (**self).die(sides)
    }
}

/// Position of a [`SeededRoller`] in its stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollerCheckpoint {
    /// Seed the stream was created from
    pub seed: u64,
    /// Number of 32-bit words consumed from the stream
    pub word_pos: u64,
}

/// Seeded ChaCha8 roller.
///
/// The same seed always yields the same sequence of faces, and a
/// [`RollerCheckpoint`] resumes the sequence exactly where it left off.
#[derive(Debug, Clone)]
pub struct SeededRoller {
    rng: ChaCha8Rng,
    seed: u64,
}

impl SeededRoller {
    /// Create a roller for the given seed
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    /// Create a roller with a random seed
    pub fn from_entropy() -> Self {
        Self::new(rand::random())
    }

    /// Get the seed used to create this roller
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Capture the current stream position
    pub fn checkpoint(&self) -> RollerCheckpoint {
        // A single encounter cannot consume 2^64 words.
        let word_pos = u64::try_from(self.rng.get_word_pos()).unwrap_or(u64::MAX);
        RollerCheckpoint {
            seed: self.seed,
            word_pos,
        }
    }

    /// Recreate a roller at a previously captured position
    pub fn restore(checkpoint: RollerCheckpoint) -> Self {
        let mut roller = Self::new(checkpoint.seed);
        roller.rng.set_word_pos(u128::from(checkpoint.word_pos));
        roller
    }
}

impl Roller for SeededRoller {
    fn die(&mut self, sides: u32) -> u32 {
        self.rng.random_range(1..=sides.max(1))
    }
}

/// Roller that replays a fixed list of faces.
///
/// Used to pin down exact dice sequences in tests and replays. Faces larger
/// than the die are clamped to its range.
///
/// # Panics
/// Panics when asked for more faces than were scripted.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRoller {
    faces: VecDeque<u32>,
}

impl ScriptedRoller {
    /// Create a roller that returns `faces` in order
    pub fn new(faces: impl IntoIterator<Item = u32>) -> Self {
        Self {
            faces: faces.into_iter().collect(),
        }
    }

    /// Append more faces to the script
    pub fn push(&mut self, face: u32) {
        self.faces.push_back(face);
    }

    /// Number of faces not yet consumed
    pub fn remaining(&self) -> usize {
        self.faces.len()
    }
}

impl Roller for ScriptedRoller {
    fn die(&mut self, sides: u32) -> u32 {
        let face = self
            .faces
            .pop_front()
            .unwrap_or_else(|| panic!("scripted roller exhausted (asked for a d{sides})"));
        face.clamp(1, sides.max(1))
    }
}

/// A parsed dice roll specification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DiceRoll {
    /// Number of dice to roll
    pub count: u32,
    /// Number of sides per die
    pub sides: u32,
    /// Modifier to add/subtract
    pub modifier: i32,
}

/// Individual faces and total of one damage roll
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollDetail {
    /// Faces rolled for the dice portion
    pub dice: Vec<u32>,
    /// Extra faces rolled for a critical hit (empty otherwise)
    pub critical_dice: Vec<u32>,
    /// Flat modifier, applied once
    pub modifier: i32,
    /// Sum of all faces plus the modifier
    pub total: i32,
}

impl DiceRoll {
    /// Create a new dice roll
    pub fn new(count: u32, sides: u32, modifier: i32) -> Self {
        Self {
            count,
            sides,
            modifier,
        }
    }

    /// Check the count, sides and modifier caps
    pub fn validate(&self) -> Result<(), ParseError> {
        if self.count == 0 || self.count > MAX_DICE_COUNT {
            return Err(ParseError::InvalidCount(u64::from(self.count)));
        }
        if self.sides == 0 || self.sides > MAX_DIE_SIDES {
            return Err(ParseError::InvalidSides(u64::from(self.sides)));
        }
        if self.modifier.unsigned_abs() > MAX_DICE_MODIFIER.unsigned_abs() {
            return Err(ParseError::InvalidModifier(self.modifier.to_string()));
        }
        Ok(())
    }

    /// Roll the dice and return the total
    pub fn roll<R: Roller + ?Sized>(&self, roller: &mut R) -> i32 {
        roll_dice(roller, self.count, self.sides, self.modifier)
    }

    /// Roll and return individual die results plus total
    pub fn roll_detailed<R: Roller + ?Sized>(&self, roller: &mut R) -> RollDetail {
        let dice = self.roll_faces(roller);
        let total = sum_faces(&dice).saturating_add(self.modifier);
        RollDetail {
            dice,
            critical_dice: Vec::new(),
            modifier: self.modifier,
            total,
        }
    }

    /// Roll critical damage: the dice portion twice, the modifier once.
    ///
    /// "1d8+3" yields `d8 + d8 + 3`, never `+6`.
    pub fn roll_critical<R: Roller + ?Sized>(&self, roller: &mut R) -> RollDetail {
        let dice = self.roll_faces(roller);
        let critical_dice = self.roll_faces(roller);
        let total = sum_faces(&dice)
            .saturating_add(sum_faces(&critical_dice))
            .saturating_add(self.modifier);
        RollDetail {
            dice,
            critical_dice,
            modifier: self.modifier,
            total,
        }
    }

    fn roll_faces<R: Roller + ?Sized>(&self, roller: &mut R) -> Vec<u32> {
        (0..self.count).map(|_| roller.die(self.sides)).collect()
    }

    /// Get the minimum possible result
    pub fn min(&self) -> i32 {
        i32::try_from(self.count)
            .unwrap_or(i32::MAX)
            .saturating_add(self.modifier)
    }

    /// Get the maximum possible result
    pub fn max(&self) -> i32 {
        let top = u64::from(self.count) * u64::from(self.sides);
        i32::try_from(top)
            .unwrap_or(i32::MAX)
            .saturating_add(self.modifier)
    }

    /// Get the expected average (rounded down)
    pub fn average(&self) -> i32 {
        let avg_per_die = (1.0 + self.sides as f64) / 2.0;
        (self.count as f64 * avg_per_die + self.modifier as f64).floor() as i32
    }
}

fn sum_faces(faces: &[u32]) -> i32 {
    faces.iter().fold(0i32, |total, &face| {
        total.saturating_add(i32::try_from(face).unwrap_or(i32::MAX))
    })
}

impl FromStr for DiceRoll {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_dice(s)
    }
}

impl TryFrom<String> for DiceRoll {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        parse_dice(&value)
    }
}

impl From<DiceRoll> for String {
    fn from(roll: DiceRoll) -> Self {
        roll.to_string()
    }
}

impl fmt::Display for DiceRoll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifier > 0 {
            write!(f, "{}d{}+{}", self.count, self.sides, self.modifier)
        } else if self.modifier < 0 {
            write!(f, "{}d{}{}", self.count, self.sides, self.modifier)
        } else {
            write!(f, "{}d{}", self.count, self.sides)
        }
    }
}

/// Parse a dice notation string like "2d6+3"
pub fn parse_dice(notation: &str) -> Result<DiceRoll, ParseError> {
    let compact: String = notation
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();

    let caps = DICE_REGEX
        .captures(&compact)
        .ok_or_else(|| ParseError::Malformed(notation.trim().to_string()))?;

    // Digit-only captures can still overflow, so parse wide and range-check.
    let count = match &caps[1] {
        "" => 1,
        digits => digits
            .parse::<u64>()
            .map_err(|_| ParseError::InvalidCount(u64::MAX))?,
    };
    if count == 0 || count > u64::from(MAX_DICE_COUNT) {
        return Err(ParseError::InvalidCount(count));
    }

    let sides = caps[2]
        .parse::<u64>()
        .map_err(|_| ParseError::InvalidSides(u64::MAX))?;
    if sides == 0 || sides > u64::from(MAX_DIE_SIDES) {
        return Err(ParseError::InvalidSides(sides));
    }

    let modifier = match caps.get(3) {
        Some(m) => {
            let invalid = || ParseError::InvalidModifier(m.as_str().to_string());
            let value = m.as_str().parse::<i64>().map_err(|_| invalid())?;
            if value.unsigned_abs() > u64::from(MAX_DICE_MODIFIER.unsigned_abs()) {
                return Err(invalid());
            }
            value as i32
        }
        None => 0,
    };

    Ok(DiceRoll::new(count as u32, sides as u32, modifier))
}

/// Roll dice with the given parameters
pub fn roll_dice<R: Roller + ?Sized>(roller: &mut R, count: u32, sides: u32, modifier: i32) -> i32 {
    let mut total: i32 = 0;

    for _ in 0..count {
        total = total.saturating_add(i32::try_from(roller.die(sides)).unwrap_or(i32::MAX));
    }

    total.saturating_add(modifier)
}

/// One d20 check, possibly rolled with advantage.
///
/// Both faces of an advantage roll are kept for display and audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct D20Roll {
    /// First face rolled
    pub first: u32,
    /// Second face, present only for advantage rolls
    pub second: Option<u32>,
}

impl D20Roll {
    /// The face that counts: the single face, or the higher of two
    pub fn natural(&self) -> u32 {
        match self.second {
            Some(second) => self.first.max(second),
            None => self.first,
        }
    }

    /// Whether this roll was made with advantage
    pub fn with_advantage(&self) -> bool {
        self.second.is_some()
    }

    /// Natural 20
    pub fn is_critical(&self) -> bool {
        is_critical(self.natural())
    }

    /// Natural 1
    pub fn is_fumble(&self) -> bool {
        is_fumble(self.natural())
    }
}

impl fmt::Display for D20Roll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.second {
            Some(second) => write!(f, "{} ({}/{})", self.natural(), self.first, second),
            None => write!(f, "{}", self.first),
        }
    }
}

/// Roll a single d20
pub fn roll_d20<R: Roller + ?Sized>(roller: &mut R) -> D20Roll {
    D20Roll {
        first: roller.die(20),
        second: None,
    }
}

/// Roll two independent d20s and keep the higher
pub fn roll_d20_with_advantage<R: Roller + ?Sized>(roller: &mut R) -> D20Roll {
    let first = roller.die(20);
    let second = roller.die(20);
    D20Roll {
        first,
        second: Some(second),
    }
}

/// Check if a d20 roll is a natural 20 (critical hit)
pub fn is_critical(roll: u32) -> bool {
    roll == 20
}

/// Check if a d20 roll is a natural 1 (critical fail)
pub fn is_fumble(roll: u32) -> bool {
    roll == 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic() {
        let roll = parse_dice("2d6").unwrap();
        assert_eq!(roll.count, 2);
        assert_eq!(roll.sides, 6);
        assert_eq!(roll.modifier, 0);
    }

    #[test]
    fn test_parse_with_plus() {
        let roll = parse_dice("1d20+5").unwrap();
        assert_eq!(roll, DiceRoll::new(1, 20, 5));
    }

    #[test]
    fn test_parse_with_minus() {
        let roll = parse_dice("3d8-2").unwrap();
        assert_eq!(roll, DiceRoll::new(3, 8, -2));
    }

    #[test]
    fn test_parse_implicit_one() {
        let roll = parse_dice("d6").unwrap();
        assert_eq!(roll.count, 1);
        assert_eq!(roll.sides, 6);
    }

    #[test]
    fn test_parse_whitespace_and_case() {
        assert_eq!(parse_dice("  2D10 + 3  ").unwrap(), DiceRoll::new(2, 10, 3));
    }

    #[test]
    fn test_parse_invalid() {
        assert!(matches!(parse_dice("abc"), Err(ParseError::Malformed(_))));
        assert!(matches!(parse_dice("2d"), Err(ParseError::Malformed(_))));
        assert!(matches!(parse_dice("d"), Err(ParseError::Malformed(_))));
        assert!(matches!(parse_dice("2d6+"), Err(ParseError::Malformed(_))));
        assert!(matches!(parse_dice("2d6+1d4"), Err(ParseError::Malformed(_))));
        assert!(matches!(parse_dice(""), Err(ParseError::Malformed(_))));
        assert_eq!(parse_dice("0d6"), Err(ParseError::InvalidCount(0)));
        assert_eq!(parse_dice("2d0"), Err(ParseError::InvalidSides(0)));
        assert_eq!(parse_dice("101d6"), Err(ParseError::InvalidCount(101)));
        assert_eq!(parse_dice("1d1001"), Err(ParseError::InvalidSides(1001)));
        assert!(matches!(
            parse_dice("1d6+99999999999"),
            Err(ParseError::InvalidModifier(_))
        ));
    }

    #[test]
    fn test_parse_modifier_limit() {
        assert_eq!(parse_dice("1d6+1000").unwrap().modifier, 1000);
        assert_eq!(parse_dice("1d6-1000").unwrap().modifier, -1000);
        assert_eq!(
            parse_dice("1d6+1001"),
            Err(ParseError::InvalidModifier("+1001".to_string()))
        );
        assert_eq!(
            parse_dice("2d6+2147483647"),
            Err(ParseError::InvalidModifier("+2147483647".to_string()))
        );
        assert!(matches!(
            parse_dice("2d6-2147483648"),
            Err(ParseError::InvalidModifier(_))
        ));
    }

    #[test]
    fn test_validate_hand_built_roll() {
        assert!(DiceRoll::new(2, 6, 3).validate().is_ok());
        assert_eq!(
            DiceRoll::new(u32::MAX, 6, 0).validate(),
            Err(ParseError::InvalidCount(u64::from(u32::MAX)))
        );
        assert_eq!(
            DiceRoll::new(1, 0, 0).validate(),
            Err(ParseError::InvalidSides(0))
        );
        assert!(matches!(
            DiceRoll::new(1, 6, i32::MIN).validate(),
            Err(ParseError::InvalidModifier(_))
        ));
    }

    #[test]
    fn test_extreme_rolls_saturate() {
        let roll = DiceRoll::new(2, 6, i32::MAX);
        let mut roller = ScriptedRoller::new([6, 6, 6, 6]);
        assert_eq!(roll.roll_critical(&mut roller).total, i32::MAX);
        assert_eq!(roll.max(), i32::MAX);

        let roll = DiceRoll::new(1, 4, i32::MIN);
        assert_eq!(roll.min(), i32::MIN + 1);
    }

    #[test]
    fn test_roll_bounds() {
        let mut roller = SeededRoller::new(11);
        for notation in ["2d6", "1d6+5", "3d8-2", "1d20", "4d4+1"] {
            let roll = parse_dice(notation).unwrap();
            for _ in 0..200 {
                let result = roll.roll(&mut roller);
                assert!(result >= roll.min(), "{notation}: {result} below minimum");
                assert!(result <= roll.max(), "{notation}: {result} above maximum");
            }
        }
    }

    #[test]
    fn test_min_max_average() {
        let roll = DiceRoll::new(2, 6, 3);
        assert_eq!(roll.min(), 5);
        assert_eq!(roll.max(), 15);
        assert_eq!(roll.average(), 10);
    }

    #[test]
    fn test_display() {
        assert_eq!(DiceRoll::new(2, 6, 0).to_string(), "2d6");
        assert_eq!(DiceRoll::new(1, 20, 5).to_string(), "1d20+5");
        assert_eq!(DiceRoll::new(3, 8, -2).to_string(), "3d8-2");
    }

    #[test]
    fn test_serde_as_notation() {
        let roll = DiceRoll::new(1, 8, 3);
        assert_eq!(serde_json::to_string(&roll).unwrap(), "\"1d8+3\"");
        let parsed: DiceRoll = serde_json::from_str("\"2d4-1\"").unwrap();
        assert_eq!(parsed, DiceRoll::new(2, 4, -1));
        assert!(serde_json::from_str::<DiceRoll>("\"2x4\"").is_err());
    }

    #[test]
    fn test_detailed_roll() {
        let roll = DiceRoll::new(3, 6, 2);
        let mut roller = ScriptedRoller::new([4, 1, 6]);
        let detail = roll.roll_detailed(&mut roller);

        assert_eq!(detail.dice, vec![4, 1, 6]);
        assert!(detail.critical_dice.is_empty());
        assert_eq!(detail.total, 13);
    }

    #[test]
    fn test_critical_doubles_dice_not_modifier() {
        let roll = parse_dice("1d8+3").unwrap();
        let mut roller = ScriptedRoller::new([5, 7]);
        let detail = roll.roll_critical(&mut roller);

        assert_eq!(detail.dice, vec![5]);
        assert_eq!(detail.critical_dice, vec![7]);
        assert_eq!(detail.modifier, 3);
        assert_eq!(detail.total, 5 + 7 + 3);
    }

    #[test]
    fn test_advantage_keeps_both_faces() {
        let mut roller = ScriptedRoller::new([4, 17, 19, 2]);

        let roll = roll_d20_with_advantage(&mut roller);
        assert_eq!((roll.first, roll.second), (4, Some(17)));
        assert_eq!(roll.natural(), 17);

        let roll = roll_d20_with_advantage(&mut roller);
        assert_eq!(roll.natural(), 19);
        assert!(roll.with_advantage());
    }

    #[test]
    fn test_advantage_is_max_of_two() {
        let mut roller = SeededRoller::new(3);
        for _ in 0..200 {
            let roll = roll_d20_with_advantage(&mut roller);
            let second = roll.second.unwrap();
            assert_eq!(roll.natural(), roll.first.max(second));
            assert!((1..=20).contains(&roll.first));
            assert!((1..=20).contains(&second));
        }
    }

    #[test]
    fn test_critical_fumble() {
        assert!(is_critical(20));
        assert!(!is_critical(19));
        assert!(is_fumble(1));
        assert!(!is_fumble(2));

        let roll = D20Roll {
            first: 1,
            second: Some(20),
        };
        assert!(roll.is_critical());
        assert!(!roll.is_fumble());
    }

    #[test]
    fn test_seeded_roller_is_reproducible() {
        let mut a = SeededRoller::new(42);
        let mut b = SeededRoller::new(42);
        let left: Vec<u32> = (0..50).map(|_| a.die(20)).collect();
        let right: Vec<u32> = (0..50).map(|_| b.die(20)).collect();
        assert_eq!(left, right);
    }

    #[test]
    fn test_checkpoint_resumes_stream() {
        let mut roller = SeededRoller::new(99);
        for _ in 0..17 {
            roller.die(6);
        }
        let checkpoint = roller.checkpoint();
        let mut resumed = SeededRoller::restore(checkpoint);

        let expected: Vec<u32> = (0..30).map(|_| roller.die(20)).collect();
        let actual: Vec<u32> = (0..30).map(|_| resumed.die(20)).collect();
        assert_eq!(expected, actual);
        assert_eq!(resumed.seed(), 99);
    }

    #[test]
    fn test_scripted_roller_clamps() {
        let mut roller = ScriptedRoller::new([0, 30]);
        assert_eq!(roller.die(6), 1);
        assert_eq!(roller.die(6), 6);
        assert_eq!(roller.remaining(), 0);
    }
}
