//! Scenario tests
//!
//! Whole-encounter scenarios covering:
//! - Ambush: surprised enemies lose round 1
//! - Replay: mid-encounter save and restore
//! - Flee: escaping and opportunity attacks
//! - Progression: experience from combat into level-ups

pub mod ambush;
pub mod flee;
pub mod progression;
pub mod replay;
