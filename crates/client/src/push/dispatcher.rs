//! Routes parsed push envelopes to per-kind handlers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use questline_shared::{NotificationKind, PushEvent};

type Handler = Arc<dyn Fn(PushEvent) + Send + Sync>;

/// Single-slot handler registry keyed by notification kind.
///
/// Delivery is at-most-once and best-effort: the last registration for a kind
/// wins, envelopes without a registered handler are dropped with a log line,
/// and nothing is queued or retried. Handlers are invoked synchronously in
/// arrival order.
pub struct Dispatcher {
    handlers: Mutex<HashMap<NotificationKind, Handler>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            handlers: Mutex::new(HashMap::new()),
        }
    }

    /// Register the handler for `kind`, replacing any previous one.
    pub fn register(&self, kind: NotificationKind, handler: impl Fn(PushEvent) + Send + Sync + 'static) {
        self.handlers
            .lock()
            .expect("dispatcher lock poisoned")
            .insert(kind, Arc::new(handler));
    }

    /// Route one envelope. Heartbeats are not routable and are ignored here;
    /// the connection consumes them before dispatch.
    pub fn dispatch(&self, event: PushEvent) {
        let Some(kind) = event.kind() else {
            return;
        };

        // Non-heartbeat envelopes must carry an id for de-duplication.
        if event.meta().is_some_and(|m| m.id.is_empty()) {
            tracing::warn!(?kind, "dropping envelope with empty id");
            return;
        }

        // Clone the handler out of the lock so a handler may re-register
        // without deadlocking.
        let handler = self
            .handlers
            .lock()
            .expect("dispatcher lock poisoned")
            .get(&kind)
            .cloned();

        match handler {
            Some(handler) => handler(event),
            None => tracing::debug!(?kind, "no handler registered, dropping envelope"),
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}
