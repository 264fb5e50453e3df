//! Reward popup serialization: at most one visible record at a time, pending
//! records shown in strict arrival order.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use questline_shared::RewardRecord;
use tokio::task::JoinHandle;

/// FIFO of pending rewards plus the one currently on screen.
///
/// The visible record is held outside the queue; `pending` only ever contains
/// records that have not been shown yet. Pending length is unbounded;
/// rewards are rare in practice.
#[derive(Debug, Default)]
pub struct RewardQueue {
    visible: Option<RewardRecord>,
    pending: VecDeque<RewardRecord>,
}

impl RewardQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Present `record` immediately if nothing is visible, otherwise queue it
    /// behind whatever is already waiting. Returns true if it became visible.
    pub fn show(&mut self, record: RewardRecord) -> bool {
        if self.visible.is_none() {
            self.visible = Some(record);
            true
        } else {
            self.pending.push_back(record);
            false
        }
    }

    /// Append to the back of the pending queue unconditionally.
    pub fn enqueue(&mut self, record: RewardRecord) {
        self.pending.push_back(record);
    }

    /// Clear and return the visible record. Advancing to the next pending
    /// record is a separate step so the presenter can insert a settle delay.
    pub fn dismiss(&mut self) -> Option<RewardRecord> {
        self.visible.take()
    }

    /// Promote the front pending record to visible, if the slot is free.
    /// Returns true if a record became visible.
    pub fn advance(&mut self) -> bool {
        if self.visible.is_some() {
            return false;
        }
        match self.pending.pop_front() {
            Some(record) => {
                self.visible = Some(record);
                true
            }
            None => false,
        }
    }

    /// Drop all pending records without touching the visible one.
    pub fn clear_queue(&mut self) {
        self.pending.clear();
    }

    pub fn visible(&self) -> Option<&RewardRecord> {
        self.visible.as_ref()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

/// Async wrapper around [`RewardQueue`] that owns the settle timer.
///
/// Dismissal waits out a short settle delay (popup exit animation) before the
/// next pending record is promoted. The timer is cancellable and is the only
/// timer this type creates; it is aborted on a superseding dismiss and on
/// drop.
pub struct RewardPresenter {
    queue: Arc<Mutex<RewardQueue>>,
    settle_delay: Duration,
    settle_task: Mutex<Option<JoinHandle<()>>>,
}

impl RewardPresenter {
    pub fn new(settle_delay: Duration) -> Self {
        Self {
            queue: Arc::new(Mutex::new(RewardQueue::new())),
            settle_delay,
            settle_task: Mutex::new(None),
        }
    }

    pub fn show(&self, record: RewardRecord) {
        self.queue.lock().expect("reward queue lock poisoned").show(record);
    }

    pub fn enqueue(&self, record: RewardRecord) {
        self.queue
            .lock()
            .expect("reward queue lock poisoned")
            .enqueue(record);
    }

    /// Dismiss the visible record and schedule the advance to the next one.
    pub fn dismiss(&self) {
        self.queue.lock().expect("reward queue lock poisoned").dismiss();

        let queue = self.queue.clone();
        let delay = self.settle_delay;
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            queue.lock().expect("reward queue lock poisoned").advance();
        });

        if let Some(old) = self
            .settle_task
            .lock()
            .expect("settle task lock poisoned")
            .replace(task)
        {
            old.abort();
        }
    }

    pub fn clear_queue(&self) {
        self.queue
            .lock()
            .expect("reward queue lock poisoned")
            .clear_queue();
    }

    pub fn visible(&self) -> Option<RewardRecord> {
        self.queue
            .lock()
            .expect("reward queue lock poisoned")
            .visible()
            .cloned()
    }

    pub fn queue_len(&self) -> usize {
        self.queue
            .lock()
            .expect("reward queue lock poisoned")
            .pending_len()
    }
}

impl Drop for RewardPresenter {
    fn drop(&mut self) {
        if let Some(task) = self
            .settle_task
            .lock()
            .expect("settle task lock poisoned")
            .take()
        {
            task.abort();
        }
    }
}
