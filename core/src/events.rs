//! Server-pushed change notifications.
//!
//! The remote store pushes row-change notifications for the three tables the
//! dashboard depends on. Whatever transport delivers them (realtime socket,
//! local in-memory writes), they land on this bus and the soft-refresh loop
//! consumes them one at a time.

use tokio::sync::broadcast;

/// Tables whose changes trigger a soft refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeTable {
    Ledger,
    Offers,
    Redemptions,
}

/// A row change in one of the watched tables, scoped to a child.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub table: ChangeTable,
    pub child_uid: String,
}

/// Broadcast bus connecting notification producers to refresh loops.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ChangeEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish a change. Nobody listening is fine.
    pub fn publish(&self, event: ChangeEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
