//! XP grant injection: records the grant and pushes the resulting envelopes.

use axum::{extract::State, Json};
use questline_shared::{leveling, EnvelopeMeta, PushEvent, QuestData, UserStats};
use serde::Deserialize;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct GrantReward {
    pub user_id: i64,
    pub xp_earned: u64,
    pub title: String,
    #[serde(default)]
    pub source_type: Option<String>,
    #[serde(default)]
    pub quest_title: Option<String>,
    #[serde(default)]
    pub quest_id: Option<i64>,
    /// Counts toward the quests-completed tally when true.
    #[serde(default)]
    pub quest_completed: bool,
}

/// `POST /api/rewards`: grant XP to a user and push an `xp_reward`
/// envelope, followed by a `level_up` envelope when the grant crossed one or
/// more level boundaries. Returns the user's updated stats.
pub async fn grant_reward(
    State(state): State<AppState>,
    Json(grant): Json<GrantReward>,
) -> Json<UserStats> {
    let (old_total, new_total) = state
        .grant_xp(grant.user_id, grant.xp_earned, grant.quest_completed)
        .await;

    tracing::info!(
        user_id = grant.user_id,
        xp_earned = grant.xp_earned,
        total_xp = new_total,
        "xp granted"
    );

    let reward = PushEvent::XpReward {
        meta: EnvelopeMeta::new(
            grant.user_id,
            grant.title.clone(),
            format!("You earned {} XP", grant.xp_earned),
        ),
        xp_earned: grant.xp_earned,
        total_xp: new_total,
        quest_data: Some(QuestData {
            source_type: grant.source_type.clone(),
            quest_title: grant.quest_title.clone(),
            quest_id: grant.quest_id,
            completion_percentage: None,
        }),
    };
    state.publish(grant.user_id, reward).await;

    let level_up = leveling::check_level_up(old_total as i64, new_total as i64);
    if level_up.leveled_up {
        let event = PushEvent::LevelUp {
            meta: EnvelopeMeta::new(
                grant.user_id,
                "Level up!",
                format!("You reached level {}", level_up.new_level),
            ),
            previous_level: level_up.previous_level,
            new_level: level_up.new_level,
        };
        state.publish(grant.user_id, event).await;
    }

    Json(state.stats(grant.user_id).await)
}
