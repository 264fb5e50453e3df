//! Shared types for the Questline reward pipeline: wire protocol models,
//! the leveling engine, and error types used by both client and server.

pub mod error;
pub mod leveling;
pub mod models;

pub use error::ApiError;
pub use leveling::{
    calculate_level, check_level_up, level_info, theme_for_level, total_xp_for_level,
    xp_for_level, LevelInfo, LevelTheme, LevelUp,
};
pub use models::{
    EnvelopeMeta, NotificationKind, PushEvent, QuestData, RewardRecord, UserStats,
};
