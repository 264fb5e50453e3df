//! Questline client: the real-time reward notification pipeline.
//!
//! The pipeline runs in four stages: a [`push::PushConnection`] owns the
//! WebSocket to the provider and keeps it alive (backoff reconnect plus a
//! heartbeat watchdog), a [`push::Dispatcher`] routes parsed envelopes by
//! notification kind, registered handlers derive [`RewardRecord`]s with the
//! leveling engine, and the [`stores::RewardPresenter`] serializes them so at
//! most one popup is on screen at a time.
//!
//! [`push::PushClient`] wires the stages together for one authenticated
//! session and is the usual entry point.

pub mod api_client;
pub mod auth_session;
pub mod push;
pub mod stores;

pub use api_client::ApiClient;
pub use auth_session::AuthSession;
pub use push::{
    ClientConfig, ConnectionState, ConnectionStatus, Dispatcher, HeartbeatConfig, PushClient,
    PushConnection, ReconnectConfig,
};
pub use questline_shared::{LevelInfo, PushEvent, RewardRecord, UserStats};
pub use stores::{RewardPresenter, RewardQueue, StatsStore};
