//! Pure leveling arithmetic: cumulative XP in, level/progress/theme out.
//!
//! Everything here is deterministic and stateless so the client and server
//! always agree on what a given XP total means.

use serde::{Deserialize, Serialize};

/// Base XP cost multiplier for the level curve.
pub const XP_BASE: f64 = 100.0;
/// Exponent of the level curve.
pub const XP_EXPONENT: f64 = 1.5;
/// Linear term added per level.
pub const XP_LINEAR: f64 = 50.0;

/// Cosmetic tier applied to a range of levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelTheme {
    /// Lowest level this tier applies to.
    pub min_level: u32,
    pub title: &'static str,
    pub color: &'static str,
}

/// Sparse tier table. Levels between thresholds inherit the nearest lower tier.
pub const LEVEL_THEMES: &[LevelTheme] = &[
    LevelTheme { min_level: 1, title: "Novice", color: "slate" },
    LevelTheme { min_level: 5, title: "Apprentice", color: "green" },
    LevelTheme { min_level: 10, title: "Journeyman", color: "teal" },
    LevelTheme { min_level: 15, title: "Adept", color: "cyan" },
    LevelTheme { min_level: 20, title: "Expert", color: "blue" },
    LevelTheme { min_level: 25, title: "Veteran", color: "indigo" },
    LevelTheme { min_level: 30, title: "Master", color: "purple" },
    LevelTheme { min_level: 40, title: "Grandmaster", color: "fuchsia" },
    LevelTheme { min_level: 50, title: "Legend", color: "amber" },
    LevelTheme { min_level: 75, title: "Mythic", color: "orange" },
    LevelTheme { min_level: 100, title: "Transcendent", color: "rose" },
];

/// Derived view of a cumulative XP total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelInfo {
    pub level: u32,
    /// The (clamped) XP total this view was derived from.
    pub current_xp: u64,
    /// Cumulative XP required to reach the current level.
    pub xp_for_current_level: u64,
    /// Cumulative XP required to reach the next level.
    pub xp_for_next_level: u64,
    /// XP earned within the current level.
    pub xp_progress: u64,
    /// Progress through the current level, clamped to [0, 100].
    pub xp_progress_percentage: f64,
    pub title: String,
    pub color: String,
}

/// Result of comparing the levels implied by two XP totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelUp {
    pub leveled_up: bool,
    pub previous_level: u32,
    pub new_level: u32,
    pub levels_gained: u32,
}

/// XP required to advance from `level - 1` to `level`. Level 1 costs nothing.
pub fn xp_for_level(level: u32) -> u64 {
    if level <= 1 {
        return 0;
    }
    let prior = f64::from(level - 1);
    (XP_BASE * prior.powf(XP_EXPONENT) + prior * XP_LINEAR).floor() as u64
}

/// Cumulative XP required to reach `level` from zero.
pub fn total_xp_for_level(level: u32) -> u64 {
    (2..=level).map(xp_for_level).sum()
}

/// Highest level whose cumulative XP requirement does not exceed `total_xp`.
///
/// Negative input clamps to level 1; producers are expected to send
/// non-negative totals, this is a floor rather than validation.
pub fn calculate_level(total_xp: i64) -> u32 {
    if total_xp <= 0 {
        return 1;
    }
    let total = total_xp as u64;
    let mut level = 1u32;
    let mut cumulative = 0u64;
    loop {
        let next = cumulative + xp_for_level(level + 1);
        if next > total {
            return level;
        }
        cumulative = next;
        level += 1;
    }
}

/// Tier for a level: the highest configured threshold at or below it.
pub fn theme_for_level(level: u32) -> &'static LevelTheme {
    LEVEL_THEMES
        .iter()
        .rev()
        .find(|t| t.min_level <= level)
        .unwrap_or(&LEVEL_THEMES[0])
}

/// Full derived view of an XP total.
pub fn level_info(total_xp: i64) -> LevelInfo {
    let current_xp = total_xp.max(0) as u64;
    let level = calculate_level(total_xp);
    let xp_for_current_level = total_xp_for_level(level);
    let xp_for_next_level = total_xp_for_level(level + 1);
    let span = xp_for_next_level - xp_for_current_level;
    let xp_progress = current_xp.saturating_sub(xp_for_current_level);
    let xp_progress_percentage = if span == 0 {
        0.0
    } else {
        (xp_progress as f64 / span as f64 * 100.0).clamp(0.0, 100.0)
    };
    let theme = theme_for_level(level);

    LevelInfo {
        level,
        current_xp,
        xp_for_current_level,
        xp_for_next_level,
        xp_progress,
        xp_progress_percentage,
        title: theme.title.to_string(),
        color: theme.color.to_string(),
    }
}

/// Report whether moving from `old_xp` to `new_xp` crossed one or more
/// level boundaries.
pub fn check_level_up(old_xp: i64, new_xp: i64) -> LevelUp {
    let previous_level = calculate_level(old_xp);
    let new_level = calculate_level(new_xp);
    LevelUp {
        leveled_up: new_level > previous_level,
        previous_level,
        new_level,
        levels_gained: new_level.saturating_sub(previous_level),
    }
}
