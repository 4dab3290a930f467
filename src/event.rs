//! Queue-change events published after every successful mutation.
//!
//! The push/websocket transport subscribes here and fans events out to
//! clients. Delivery is best-effort, at-most-once: a lagging subscriber
//! drops events and reconciles by re-reading the authoritative
//! `current_queue` view.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::model::{EntryId, EntryState, RemovalType};

/// A change event emitted by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEvent {
    /// When this event occurred.
    pub timestamp: DateTime<Utc>,
    /// What happened.
    pub kind: EventKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    EntryJoined {
        queue_code: String,
        entry_id: EntryId,
        new_state: EntryState,
    },
    HelpStarted {
        queue_code: String,
        entry_id: EntryId,
        new_state: EntryState,
        helped_by: String,
    },
    EntryRemoved {
        queue_code: String,
        entry_id: EntryId,
        new_state: EntryState,
        removal_type: RemovalType,
    },
    AnnouncementChanged {
        queue_code: String,
        message: Option<String>,
    },
}

/// Fan-out handle for queue events.
///
/// Wraps a broadcast channel: every subscriber sees every event published
/// after it subscribed, up to the channel capacity.
#[derive(Debug, Clone)]
pub struct Publisher {
    tx: broadcast::Sender<QueueEvent>,
}

impl Publisher {
    /// Buffered events per subscriber before the slowest one starts
    /// lagging and dropping.
    const CAPACITY: usize = 256;

    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(Self::CAPACITY);
        Self { tx }
    }

    /// Subscribe to queue events.
    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.tx.subscribe()
    }

    /// Publish an event. Fire-and-forget: a send error only means there
    /// are no subscribers right now, which is not a failure.
    pub fn publish(&self, kind: EventKind) {
        let _ = self.tx.send(QueueEvent {
            timestamp: Utc::now(),
            kind,
        });
    }
}

impl Default for Publisher {
    fn default() -> Self {
        Self::new()
    }
}
