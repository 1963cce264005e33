#![deny(warnings)]

//! Gamification progression for AgroProfit.
//!
//! One event drives the whole state machine: a completed simulation. The
//! transition adds points, bumps the simulation count, rederives the
//! level, and awards any badge whose count threshold is newly met. The
//! tracker is a pure function over explicit state; persistence and
//! exactly-once delivery of events belong to the caller.

use agro_core::{Badge, UserProgression};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::info;

/// Points per level step: every 100 points is one level.
pub const POINTS_PER_LEVEL: u64 = 100;

/// One entry of the badge catalog: awarded when a user's simulation
/// count reaches `threshold`.
#[derive(Clone, Copy, Debug)]
pub struct BadgeSpec {
    pub threshold: u64,
    pub name: &'static str,
    pub icon: &'static str,
    pub description: &'static str,
}

/// Badge catalog, ordered by ascending threshold. New badges are added
/// here; the transition logic never changes.
pub const BADGE_CATALOG: &[BadgeSpec] = &[
    BadgeSpec {
        threshold: 5,
        name: "Novice",
        icon: "🌱",
        description: "Completed 5 simulations",
    },
    BadgeSpec {
        threshold: 15,
        name: "Great Farmer",
        icon: "🌾",
        description: "Completed 15 simulations",
    },
    BadgeSpec {
        threshold: 50,
        name: "Harvest Master",
        icon: "🏆",
        description: "Completed 50 simulations",
    },
];

/// Errors produced by the progression tracker.
#[derive(Debug, Error, PartialEq)]
pub enum ProgressError {
    /// Earned points must be non-negative; state is left untouched.
    #[error("points earned must be non-negative, got {0}")]
    NegativePoints(i64),
}

/// Outcome of one completed-simulation transition: the next state plus
/// the observable side effects for the caller to surface.
#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    /// Updated progression to persist in place of the input state.
    pub progression: UserProgression,
    /// Set when the transition crossed a level boundary: (from, to).
    pub level_up: Option<(u64, u64)>,
    /// Badges newly earned by this transition, in catalog order.
    pub awarded: Vec<Badge>,
}

/// Apply one completed simulation to a user's progression.
///
/// Pure and deterministic: the input state is not mutated, and the
/// caller persists the returned state. A single event may cross several
/// badge thresholds at once (e.g. a bulk import); every newly met badge
/// is awarded in the same transition, and a badge already held is never
/// duplicated. Negative `points_earned` is rejected before any change.
///
/// The tracker does not deduplicate events; delivering the same
/// simulation twice double-counts. Callers must apply each simulation
/// exactly once (see `agro-store`'s applied-event set).
pub fn apply_simulation_completed(
    state: &UserProgression,
    points_earned: i64,
    now: DateTime<Utc>,
) -> Result<Transition, ProgressError> {
    if points_earned < 0 {
        return Err(ProgressError::NegativePoints(points_earned));
    }

    let mut next = state.clone();
    next.points += points_earned as u64;
    next.simulations_count += 1;

    let level_up = if next.level() > state.level() {
        info!(from = state.level(), to = next.level(), "level up");
        Some((state.level(), next.level()))
    } else {
        None
    };

    let mut awarded = Vec::new();
    for spec in BADGE_CATALOG {
        if next.simulations_count >= spec.threshold && !next.has_badge(spec.name) {
            let badge = Badge {
                name: spec.name.to_string(),
                icon: spec.icon.to_string(),
                description: spec.description.to_string(),
                earned_at: now,
            };
            info!(badge = spec.name, count = next.simulations_count, "badge earned");
            next.badges.push(badge.clone());
            awarded.push(badge);
        }
    }

    Ok(Transition {
        progression: next,
        level_up,
        awarded,
    })
}
