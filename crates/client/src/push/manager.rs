//! Session-scoped wiring of connection, dispatcher, rewards and stats.

use std::sync::Arc;
use std::time::Duration;

use questline_shared::{NotificationKind, PushEvent, RewardRecord};

use super::connection::{ConnectionStatus, HeartbeatConfig, PushConnection, ReconnectConfig};
use super::dispatcher::Dispatcher;
use crate::api_client::ApiClient;
use crate::auth_session::AuthSession;
use crate::stores::{RewardPresenter, StatsStore};

/// Client configuration with production defaults; tests shorten the
/// durations.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Provider base URL, e.g. `http://localhost:8090`.
    pub base_url: String,
    pub reconnect: ReconnectConfig,
    pub heartbeat: HeartbeatConfig,
    /// Pause between dismissing a reward and showing the next pending one.
    pub settle_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8090".to_string(),
            reconnect: ReconnectConfig::default(),
            heartbeat: HeartbeatConfig::default(),
            settle_delay: Duration::from_millis(300),
        }
    }
}

/// One push pipeline per authenticated session.
///
/// Construction connects; dropping the client (or calling
/// [`PushClient::disconnect`]) tears the connection down, so no channel
/// outlives the session that owns it. Default handlers for reward-bearing
/// envelopes are registered up front; consumers may replace them per kind
/// (last registration wins).
pub struct PushClient {
    connection: PushConnection,
    dispatcher: Arc<Dispatcher>,
    rewards: Arc<RewardPresenter>,
    stats: Arc<StatsStore>,
    session: Arc<dyn Fn() -> Option<AuthSession> + Send + Sync>,
}

impl PushClient {
    /// Build the pipeline and start connecting.
    ///
    /// `session` is polled before every connection attempt; while it returns
    /// `None` the connection idles disconnected, and when the identity
    /// disappears mid-session the next reconnect cycle stops at the same
    /// guard.
    pub fn new(
        config: ClientConfig,
        session: impl Fn() -> Option<AuthSession> + Send + Sync + 'static,
    ) -> Self {
        let session: Arc<dyn Fn() -> Option<AuthSession> + Send + Sync> = Arc::new(session);
        let dispatcher = Arc::new(Dispatcher::new());
        let rewards = Arc::new(RewardPresenter::new(config.settle_delay));
        let stats = Arc::new(StatsStore::new());

        register_default_handlers(&dispatcher, &rewards, &stats);

        let base_url = config.base_url.clone();
        let session_for_url = session.clone();
        let url_builder = move || {
            let session = session_for_url()?;
            match push_url(&base_url, &session) {
                Ok(url) => Some(url),
                Err(e) => {
                    tracing::error!(error = %e, "invalid provider base URL");
                    None
                }
            }
        };

        let connection = PushConnection::spawn(
            url_builder,
            dispatcher.clone(),
            config.reconnect,
            config.heartbeat,
        );

        Self {
            connection,
            dispatcher,
            rewards,
            stats,
            session,
        }
    }

    /// Replace the handler for one notification kind.
    pub fn register(
        &self,
        kind: NotificationKind,
        handler: impl Fn(PushEvent) + Send + Sync + 'static,
    ) {
        self.dispatcher.register(kind, handler);
    }

    /// Manually trigger a reward (non-push source, e.g. an optimistic local
    /// grant). Follows the same show/enqueue contract as push-delivered
    /// rewards, so the two interleave by arrival order.
    pub fn trigger_reward(&self, xp_earned: u64, task_title: &str, source_type: &str) {
        let Some(session) = (self.session)() else {
            tracing::debug!("ignoring manual reward without a session");
            return;
        };
        let total_xp = self.stats.add_xp(session.user_id, xp_earned);
        let record = RewardRecord::from_xp(xp_earned, total_xp, task_title, source_type, false);
        self.rewards.show(record);
    }

    /// Fetch stats from the provider, falling back to zeroed mock stats when
    /// the request fails.
    pub async fn refresh_stats(&self, api: &ApiClient) {
        let Some(session) = (self.session)() else {
            return;
        };
        let stats = api.user_stats_or_empty(session.user_id).await;
        self.stats.replace(stats);
    }

    pub fn status(&self) -> ConnectionStatus {
        self.connection.status()
    }

    pub fn watch_status(&self) -> tokio::sync::watch::Receiver<ConnectionStatus> {
        self.connection.watch_status()
    }

    pub fn reconnect(&self) {
        self.connection.reconnect();
    }

    pub fn disconnect(&self) {
        self.connection.disconnect();
    }

    pub fn rewards(&self) -> &RewardPresenter {
        &self.rewards
    }

    pub fn stats(&self) -> &StatsStore {
        &self.stats
    }
}

/// Build the ws(s) URL for the push endpoint, scoped to the session's user.
fn push_url(base_url: &str, session: &AuthSession) -> Result<String, url::ParseError> {
    let mut url = url::Url::parse(base_url)?;
    let scheme = match url.scheme() {
        "https" | "wss" => "wss",
        _ => "ws",
    };
    // Both directions are http(s) <-> ws(s); set_scheme cannot fail here.
    let _ = url.set_scheme(scheme);
    url.set_path("/api/ws");
    url.query_pairs_mut()
        .clear()
        .append_pair("user_id", &session.user_id.to_string())
        .append_pair("token", &session.token);
    Ok(url.into())
}

/// Default envelope handling: reward-bearing envelopes feed the presenter,
/// level-ups and errors are logged, stats stay current.
fn register_default_handlers(
    dispatcher: &Dispatcher,
    rewards: &Arc<RewardPresenter>,
    stats: &Arc<StatsStore>,
) {
    let rewards_xp = rewards.clone();
    let stats_xp = stats.clone();
    dispatcher.register(NotificationKind::XpReward, move |event| {
        let PushEvent::XpReward {
            meta,
            xp_earned,
            total_xp,
            quest_data,
        } = event
        else {
            return;
        };

        stats_xp.record_total_xp(meta.user_id, total_xp);

        let quest = quest_data.unwrap_or_default();
        let title = quest
            .quest_title
            .filter(|t| !t.is_empty())
            .unwrap_or(meta.title);
        let source = quest.source_type.unwrap_or_else(|| "quest".to_string());

        let record = RewardRecord::from_xp(xp_earned, total_xp, title, source, true);
        rewards_xp.show(record);
    });

    let rewards_qc = rewards.clone();
    let stats_qc = stats.clone();
    dispatcher.register(NotificationKind::QuestCompletion, move |event| {
        let PushEvent::QuestCompletion {
            meta,
            xp_earned,
            total_xp,
            quest_data,
        } = event
        else {
            return;
        };

        // Completions without an XP delta are informational only.
        let (Some(xp_earned), Some(total_xp)) = (xp_earned, total_xp) else {
            tracing::info!(title = %meta.title, "quest completed");
            return;
        };

        stats_qc.record_total_xp(meta.user_id, total_xp);

        let quest = quest_data.unwrap_or_default();
        let title = quest
            .quest_title
            .filter(|t| !t.is_empty())
            .unwrap_or(meta.title);
        let source = quest
            .source_type
            .unwrap_or_else(|| "quest_completion".to_string());

        let record = RewardRecord::from_xp(xp_earned, total_xp, title, source, true);
        rewards_qc.show(record);
    });

    dispatcher.register(NotificationKind::LevelUp, |event| {
        if let PushEvent::LevelUp {
            previous_level,
            new_level,
            ..
        } = event
        {
            tracing::info!(previous_level, new_level, "level up");
        }
    });

    dispatcher.register(NotificationKind::Error, |event| {
        if let Some(meta) = event.meta() {
            tracing::warn!(message = %meta.message, "provider reported an error");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_url_swaps_scheme_and_scopes_to_user() {
        let session = AuthSession::new(42, "secret");
        let url = push_url("http://localhost:8090", &session).unwrap();
        assert_eq!(url, "ws://localhost:8090/api/ws?user_id=42&token=secret");

        let url = push_url("https://lms.example.com", &session).unwrap();
        assert!(url.starts_with("wss://lms.example.com/api/ws?"));
    }

    #[test]
    fn push_url_rejects_garbage() {
        let session = AuthSession::new(1, "t");
        assert!(push_url("not a url", &session).is_err());
    }
}
