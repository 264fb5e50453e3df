//! Cached gamification stats for the signed-in user.

use std::sync::Mutex;

use questline_shared::{leveling, UserStats};

/// Last known stats, fed by the REST fetch and kept current by push
/// envelopes carrying `total_xp`.
#[derive(Debug, Default)]
pub struct StatsStore {
    inner: Mutex<Option<UserStats>>,
}

impl StatsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cached stats wholesale (REST fetch result).
    pub fn replace(&self, stats: UserStats) {
        *self.inner.lock().expect("stats lock poisoned") = Some(stats);
    }

    pub fn get(&self) -> Option<UserStats> {
        self.inner.lock().expect("stats lock poisoned").clone()
    }

    /// Last known XP total, zero when nothing has been cached yet.
    pub fn total_xp(&self) -> u64 {
        self.inner
            .lock()
            .expect("stats lock poisoned")
            .as_ref()
            .map(|s| s.total_xp)
            .unwrap_or(0)
    }

    /// Record an authoritative XP total from a push envelope.
    pub fn record_total_xp(&self, user_id: i64, total_xp: u64) {
        let mut guard = self.inner.lock().expect("stats lock poisoned");
        let stats = guard.get_or_insert_with(|| UserStats::empty(user_id));
        stats.total_xp = total_xp;
        stats.level_info = leveling::level_info(total_xp as i64);
    }

    /// Add a locally granted XP delta and return the new total. Used by the
    /// manual reward trigger, which has no server-computed total.
    pub fn add_xp(&self, user_id: i64, amount: u64) -> u64 {
        let mut guard = self.inner.lock().expect("stats lock poisoned");
        let stats = guard.get_or_insert_with(|| UserStats::empty(user_id));
        stats.total_xp += amount;
        stats.level_info = leveling::level_info(stats.total_xp as i64);
        stats.total_xp
    }
}
