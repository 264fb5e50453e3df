//! Client-side stores consumed by dashboard views.
//!
//! Views read from these stores; the push pipeline writes into them. Nothing
//! here is persisted; state is rebuilt from the provider on reload.

pub mod rewards;
pub mod stats;

pub use rewards::{RewardPresenter, RewardQueue};
pub use stats::StatsStore;
