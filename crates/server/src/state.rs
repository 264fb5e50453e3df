//! Shared application state: per-user push channels and the XP ledger.

use std::collections::HashMap;
use std::sync::Arc;

use questline_shared::{leveling, PushEvent, UserStats};
use tokio::sync::{broadcast, RwLock};

use crate::config::ServerConfig;

const CHANNEL_CAPACITY: usize = 100;

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    total_xp: u64,
    quests_completed: u64,
}

/// One push channel per user plus an in-memory XP tally.
///
/// The ledger is deliberately ephemeral; durable progress lives in the LMS,
/// this provider only needs enough state to stamp envelopes with totals.
#[derive(Clone)]
pub struct AppState {
    pub config: ServerConfig,
    channels: Arc<RwLock<HashMap<i64, broadcast::Sender<PushEvent>>>>,
    ledger: Arc<RwLock<HashMap<i64, Tally>>>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            channels: Arc::new(RwLock::new(HashMap::new())),
            ledger: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Subscribe to the push channel for `user_id`, creating it on first use.
    pub async fn subscribe(&self, user_id: i64) -> broadcast::Receiver<PushEvent> {
        {
            let channels = self.channels.read().await;
            if let Some(sender) = channels.get(&user_id) {
                return sender.subscribe();
            }
        }

        let mut channels = self.channels.write().await;
        channels
            .entry(user_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Push an event to all of `user_id`'s open connections. A user with no
    /// connection simply misses the event; rewards are re-derivable from the
    /// stats endpoint.
    pub async fn publish(&self, user_id: i64, event: PushEvent) {
        let channels = self.channels.read().await;
        if let Some(sender) = channels.get(&user_id) {
            if sender.send(event).is_err() {
                tracing::debug!(user_id, "no open push connections for event");
            }
        } else {
            tracing::debug!(user_id, "no push channel registered for user");
        }
    }

    /// Record an XP grant and return the totals before and after.
    pub async fn grant_xp(&self, user_id: i64, xp: u64, quest_completed: bool) -> (u64, u64) {
        let mut ledger = self.ledger.write().await;
        let tally = ledger.entry(user_id).or_default();
        let old_total = tally.total_xp;
        tally.total_xp += xp;
        if quest_completed {
            tally.quests_completed += 1;
        }
        (old_total, tally.total_xp)
    }

    pub async fn stats(&self, user_id: i64) -> UserStats {
        let ledger = self.ledger.read().await;
        let tally = ledger.get(&user_id).copied().unwrap_or_default();
        UserStats {
            user_id,
            total_xp: tally.total_xp,
            quests_completed: tally.quests_completed,
            level_info: leveling::level_info(tally.total_xp as i64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn grants_accumulate_per_user() {
        let state = AppState::new(ServerConfig::default());
        assert_eq!(state.grant_xp(1, 100, true).await, (0, 100));
        assert_eq!(state.grant_xp(1, 60, false).await, (100, 160));
        assert_eq!(state.grant_xp(2, 10, true).await, (0, 10));

        let stats = state.stats(1).await;
        assert_eq!(stats.total_xp, 160);
        assert_eq!(stats.quests_completed, 1);
        assert_eq!(stats.level_info, leveling::level_info(160));
    }

    #[tokio::test]
    async fn unknown_user_gets_zeroed_stats() {
        let state = AppState::new(ServerConfig::default());
        let stats = state.stats(99).await;
        assert_eq!(stats.total_xp, 0);
        assert_eq!(stats.level_info.level, 1);
    }

    #[tokio::test]
    async fn published_events_reach_subscribers() {
        let state = AppState::new(ServerConfig::default());
        let mut rx = state.subscribe(7).await;
        state.publish(7, PushEvent::heartbeat()).await;
        assert!(rx.recv().await.unwrap().is_heartbeat());
    }
}
