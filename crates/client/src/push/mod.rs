//! Push channel management for real-time reward delivery.
//!
//! This module provides:
//! - A managed WebSocket connection with auto-reconnect and a heartbeat
//!   staleness watchdog
//! - A dispatcher routing parsed envelopes to per-kind handlers
//! - [`PushClient`], which wires connection, dispatcher, reward presenter
//!   and stats store together for one authenticated session
//!
//! # Architecture
//!
//! ```text
//!   provider ──ws──▶ PushConnection ──▶ Dispatcher ──▶ handlers
//!                        │                                │
//!                   status watch                   RewardPresenter
//!                   (UI indicator)                 (one popup at a time)
//! ```
//!
//! Consumers read the reward presenter and the status watch channel; they do
//! not observe raw envelopes directly.

mod connection;
mod dispatcher;
mod manager;

pub use connection::{
    ConnectionState, ConnectionStatus, HeartbeatConfig, PushConnection, ReconnectConfig,
};
pub use dispatcher::Dispatcher;
pub use manager::{ClientConfig, PushClient};
