//! Stat sheets, validation, and the leveling algorithm.
//!
//! A [`StatSheet`] is the RPG record a combat-capable entity carries:
//! health, the four attributes, experience, and level. Construction from
//! untrusted input goes through [`StatSheet::from_raw`], which replaces
//! malformed fields with documented defaults (logged, never fatal) -- the
//! same ranges the player-record store enforces.

use serde::{Deserialize, Serialize};

/// Attribute and level bounds, shared with the external record store.
pub const STAT_MIN: u32 = 1;
pub const STAT_MAX: u32 = 100;
pub const LEVEL_MIN: u32 = 1;
pub const LEVEL_MAX: u32 = 100;
/// Upper bound accepted for a configured health value.
pub const HEALTH_CAP: u32 = 1000;
/// Upper bound accepted for a configured experience value.
pub const EXPERIENCE_CAP: u64 = 1_000_000;

// ---------------------------------------------------------------------------
// StatSheet
// ---------------------------------------------------------------------------

/// Validated RPG stats for one entity.
///
/// Invariants: `health <= max_health`, `max_health >= 1`, attributes in
/// `[STAT_MIN, STAT_MAX]`, `level` in `[LEVEL_MIN, LEVEL_MAX]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatSheet {
    pub health: u32,
    pub max_health: u32,
    pub strength: u32,
    pub wisdomness: u32,
    pub benchpress: u32,
    pub curl: u32,
    pub experience: u64,
    pub level: u32,
}

impl StatSheet {
    /// The fresh-player sheet.
    pub fn player_default() -> Self {
        Self {
            health: 100,
            max_health: 100,
            strength: 50,
            wisdomness: 5,
            benchpress: 20,
            curl: 100,
            experience: 0,
            level: 1,
        }
    }

    /// The stock monster sheet.
    pub fn npc_default() -> Self {
        Self {
            health: 50,
            max_health: 50,
            strength: 2,
            wisdomness: 2,
            benchpress: 3,
            curl: 1,
            experience: 0,
            level: 1,
        }
    }

    /// Build a sheet from untrusted input.
    ///
    /// Each malformed field (non-finite, non-integer, out of range) falls
    /// back to the corresponding `defaults` field with a warning. A health
    /// value above the validated `max_health` clamps down to it.
    pub fn from_raw(raw: &RawStats, defaults: &StatSheet) -> Self {
        let max_health = sanitize(raw.max_health, 1, HEALTH_CAP, defaults.max_health, "max_health");
        let health = sanitize(raw.health, 0, HEALTH_CAP, defaults.health, "health").min(max_health);
        Self {
            health,
            max_health,
            strength: sanitize(raw.strength, STAT_MIN, STAT_MAX, defaults.strength, "strength"),
            wisdomness: sanitize(
                raw.wisdomness,
                STAT_MIN,
                STAT_MAX,
                defaults.wisdomness,
                "wisdomness",
            ),
            benchpress: sanitize(
                raw.benchpress,
                STAT_MIN,
                STAT_MAX,
                defaults.benchpress,
                "benchpress",
            ),
            curl: sanitize(raw.curl, STAT_MIN, STAT_MAX, defaults.curl, "curl"),
            experience: sanitize(
                raw.experience,
                0,
                EXPERIENCE_CAP as u32,
                // experience is u64 but configured values fit u32's range
                defaults.experience.min(u32::MAX as u64) as u32,
                "experience",
            ) as u64,
            level: sanitize(raw.level, LEVEL_MIN, LEVEL_MAX, defaults.level, "level"),
        }
    }

    /// Alive means strictly positive health.
    pub fn is_alive(&self) -> bool {
        self.health > 0
    }
}

/// Validate one numeric field: finite, integral, within `[min, max]`.
fn sanitize(value: Option<f64>, min: u32, max: u32, default: u32, field: &str) -> u32 {
    let Some(v) = value else {
        return default;
    };
    if !v.is_finite() || v.fract() != 0.0 || v < min as f64 || v > max as f64 {
        tracing::warn!(
            field,
            value = v,
            default,
            "invalid stat value replaced with default"
        );
        return default;
    }
    v as u32
}

// ---------------------------------------------------------------------------
// RawStats
// ---------------------------------------------------------------------------

/// Untrusted stat input, e.g. a record loaded from the external store or a
/// hand-written spawn config. Missing fields take defaults silently; present
/// but malformed fields take defaults with a warning.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawStats {
    pub health: Option<f64>,
    pub max_health: Option<f64>,
    pub strength: Option<f64>,
    pub wisdomness: Option<f64>,
    pub benchpress: Option<f64>,
    pub curl: Option<f64>,
    pub experience: Option<f64>,
    pub level: Option<f64>,
}

// ---------------------------------------------------------------------------
// Leveling
// ---------------------------------------------------------------------------

/// Experience required to advance *from* `level`: `round(2^(level-1) * 100)`.
/// Level 1 -> 100, level 2 -> 200, level 5 -> 1600. Saturates at `u64::MAX`
/// for levels whose requirement exceeds it (unreachable in practice).
pub fn xp_required_for_level(level: u32) -> u64 {
    let v = (2f64.powi(level.saturating_sub(1) as i32) * 100.0).round();
    v as u64
}

/// Per-level stat increases.
#[derive(Debug, Clone, Copy)]
pub struct StatGain {
    pub strength: u32,
    pub wisdomness: u32,
    pub benchpress: u32,
    pub curl: u32,
    pub max_health: u32,
}

/// Applied on every level-up.
pub const BASE_GAIN: StatGain = StatGain {
    strength: 1,
    wisdomness: 1,
    benchpress: 1,
    curl: 2,
    max_health: 10,
};

/// Extra gain for completing a level divisible by 5.
pub const MILESTONE_5_GAIN: StatGain = StatGain {
    strength: 2,
    wisdomness: 2,
    benchpress: 2,
    curl: 3,
    max_health: 25,
};

/// Extra gain for completing a level divisible by 10, additive with the
/// 5-level gain (10 is a multiple of 5, so both apply).
pub const MILESTONE_10_GAIN: StatGain = StatGain {
    strength: 5,
    wisdomness: 5,
    benchpress: 5,
    curl: 5,
    max_health: 50,
};

/// Advance `sheet` by one level: base table, milestone bonuses keyed off the
/// *completed* level, attributes clamped at [`STAT_MAX`], health restored to
/// the new maximum. No-op at the level cap.
pub fn level_up(sheet: &mut StatSheet) {
    if sheet.level >= LEVEL_MAX {
        return;
    }
    let completed = sheet.level;
    sheet.level += 1;
    apply_gain(sheet, BASE_GAIN);
    if completed % 5 == 0 {
        apply_gain(sheet, MILESTONE_5_GAIN);
    }
    if completed % 10 == 0 {
        apply_gain(sheet, MILESTONE_10_GAIN);
    }
    sheet.health = sheet.max_health;
}

fn apply_gain(sheet: &mut StatSheet, gain: StatGain) {
    sheet.strength = (sheet.strength + gain.strength).min(STAT_MAX);
    sheet.wisdomness = (sheet.wisdomness + gain.wisdomness).min(STAT_MAX);
    sheet.benchpress = (sheet.benchpress + gain.benchpress).min(STAT_MAX);
    sheet.curl = (sheet.curl + gain.curl).min(STAT_MAX);
    sheet.max_health += gain.max_health;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
