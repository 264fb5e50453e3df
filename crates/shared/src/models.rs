//! Wire models for the Questline push protocol and the derived records the
//! client builds from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::leveling;

// --- Push protocol ---

/// Fields common to every non-heartbeat push envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeMeta {
    /// Unique per message; used for de-duplication. Must be non-empty.
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub user_id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
}

impl EnvelopeMeta {
    /// Build a fresh envelope header for `user_id`, stamped now.
    pub fn new(user_id: i64, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            user_id,
            title: title.into(),
            message: message.into(),
        }
    }
}

/// Optional quest context attached to reward envelopes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QuestData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quest_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quest_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_percentage: Option<f64>,
}

/// A single message delivered over the push channel.
///
/// Tagged by `type` on the wire; non-heartbeat variants flatten the common
/// header into the top level, matching the flat JSON the provider emits.
/// Heartbeats carry no business payload (minimum `{"type":"heartbeat"}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PushEvent {
    XpReward {
        #[serde(flatten)]
        meta: EnvelopeMeta,
        xp_earned: u64,
        total_xp: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        quest_data: Option<QuestData>,
    },
    QuestCompletion {
        #[serde(flatten)]
        meta: EnvelopeMeta,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        xp_earned: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        total_xp: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        quest_data: Option<QuestData>,
    },
    LevelUp {
        #[serde(flatten)]
        meta: EnvelopeMeta,
        previous_level: u32,
        new_level: u32,
    },
    Error {
        #[serde(flatten)]
        meta: EnvelopeMeta,
    },
    Heartbeat {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<DateTime<Utc>>,
    },
}

/// Kind of a non-heartbeat notification, used as the dispatch key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    XpReward,
    QuestCompletion,
    LevelUp,
    Error,
}

impl PushEvent {
    /// Dispatch key for this event, `None` for heartbeats.
    pub fn kind(&self) -> Option<NotificationKind> {
        match self {
            PushEvent::XpReward { .. } => Some(NotificationKind::XpReward),
            PushEvent::QuestCompletion { .. } => Some(NotificationKind::QuestCompletion),
            PushEvent::LevelUp { .. } => Some(NotificationKind::LevelUp),
            PushEvent::Error { .. } => Some(NotificationKind::Error),
            PushEvent::Heartbeat { .. } => None,
        }
    }

    /// Common header, `None` for heartbeats.
    pub fn meta(&self) -> Option<&EnvelopeMeta> {
        match self {
            PushEvent::XpReward { meta, .. }
            | PushEvent::QuestCompletion { meta, .. }
            | PushEvent::LevelUp { meta, .. }
            | PushEvent::Error { meta } => Some(meta),
            PushEvent::Heartbeat { .. } => None,
        }
    }

    pub fn is_heartbeat(&self) -> bool {
        matches!(self, PushEvent::Heartbeat { .. })
    }

    /// Liveness envelope stamped now.
    pub fn heartbeat() -> Self {
        PushEvent::Heartbeat {
            timestamp: Some(Utc::now()),
        }
    }
}

// --- Derived records ---

/// Display-ready representation of an XP-earning event. Derived client-side
/// by combining an envelope's XP fields with the leveling engine; never
/// transmitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardRecord {
    pub xp_earned: u64,
    pub task_title: String,
    pub current_xp: u64,
    pub previous_xp: u64,
    pub current_level: u32,
    /// XP still needed to reach the next level.
    pub xp_to_next_level: u64,
    /// Cumulative XP threshold of the next level (progress bar maximum).
    pub max_xp: u64,
    pub source_type: String,
    /// False for manually triggered rewards, true for push-delivered ones.
    pub is_real_time: bool,
}

impl RewardRecord {
    /// Build a record from an XP delta and the resulting total.
    pub fn from_xp(
        xp_earned: u64,
        total_xp: u64,
        task_title: impl Into<String>,
        source_type: impl Into<String>,
        is_real_time: bool,
    ) -> Self {
        let info = leveling::level_info(total_xp as i64);
        Self {
            xp_earned,
            task_title: task_title.into(),
            current_xp: total_xp,
            previous_xp: total_xp.saturating_sub(xp_earned),
            current_level: info.level,
            xp_to_next_level: info.xp_for_next_level.saturating_sub(total_xp),
            max_xp: info.xp_for_next_level,
            source_type: source_type.into(),
            is_real_time,
        }
    }
}

/// Gamification stats for a user, served by the provider's REST surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub user_id: i64,
    pub total_xp: u64,
    pub quests_completed: u64,
    pub level_info: leveling::LevelInfo,
}

impl UserStats {
    /// Zeroed stats used as the mock fallback when the fetch fails.
    pub fn empty(user_id: i64) -> Self {
        Self {
            user_id,
            total_xp: 0,
            quests_completed: 0,
            level_info: leveling::level_info(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flat_xp_reward_envelope() {
        let json = r#"{
            "id": "evt-1",
            "type": "xp_reward",
            "timestamp": "2026-04-02T10:15:00Z",
            "user_id": 7,
            "title": "Quest complete",
            "message": "You earned 50 XP",
            "xp_earned": 50,
            "total_xp": 1250,
            "quest_data": { "source_type": "quest", "quest_title": "Intro to Rust", "quest_id": 3 }
        }"#;

        let event: PushEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.kind(), Some(NotificationKind::XpReward));
        match event {
            PushEvent::XpReward {
                meta,
                xp_earned,
                total_xp,
                quest_data,
            } => {
                assert_eq!(meta.id, "evt-1");
                assert_eq!(meta.user_id, 7);
                assert_eq!(xp_earned, 50);
                assert_eq!(total_xp, 1250);
                assert_eq!(quest_data.unwrap().quest_id, Some(3));
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn parses_minimal_heartbeat() {
        let event: PushEvent = serde_json::from_str(r#"{"type":"heartbeat"}"#).unwrap();
        assert!(event.is_heartbeat());
        assert!(event.meta().is_none());
        assert_eq!(event.kind(), None);
    }

    #[test]
    fn rejects_unknown_type() {
        let result = serde_json::from_str::<PushEvent>(r#"{"type":"badge_award","id":"x"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_reward_without_id() {
        let json = r#"{
            "type": "xp_reward",
            "timestamp": "2026-04-02T10:15:00Z",
            "user_id": 7,
            "xp_earned": 50,
            "total_xp": 1250
        }"#;
        assert!(serde_json::from_str::<PushEvent>(json).is_err());
    }

    #[test]
    fn envelope_round_trips_through_json() {
        let event = PushEvent::LevelUp {
            meta: EnvelopeMeta::new(12, "Level up!", "You reached level 6"),
            previous_level: 5,
            new_level: 6,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"level_up""#));
        let parsed: PushEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn reward_record_combines_delta_with_leveling() {
        let record = RewardRecord::from_xp(50, 1250, "Intro to Rust", "quest", true);
        assert_eq!(record.previous_xp, 1200);
        assert_eq!(record.current_xp, 1250);

        let info = crate::leveling::level_info(1250);
        assert_eq!(record.current_level, info.level);
        assert_eq!(record.max_xp, info.xp_for_next_level);
        assert_eq!(record.xp_to_next_level, info.xp_for_next_level - 1250);
    }
}
