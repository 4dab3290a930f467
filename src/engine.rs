//! Core engine. The public API for queue mutations and read views.
//!
//! All state transitions go through here. The engine validates the
//! precondition, performs one atomic store write, and publishes a change
//! event strictly after the write succeeds, never before.

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::info;

use crate::db::Db;
use crate::error::{Error, Result};
use crate::event::{EventKind, Publisher, QueueEvent};
use crate::model::{EntryId, EntryState, QueueEntry, RemovalType};
use crate::stats::StatsReport;

/// The queue engine. Owns the store and the event stream.
pub struct QueueEngine {
    db: Db,
    events: Publisher,
}

/// A student's queue history with derived tallies.
#[derive(Debug, Clone)]
pub struct StudentHistory {
    /// All of the student's entries across all queues, oldest first.
    pub entries: Vec<QueueEntry>,
    /// How many entries ended with `removal_type == helped`.
    pub times_helped: usize,
}

impl QueueEngine {
    /// Engine over an in-memory store (for testing).
    pub async fn in_memory() -> Result<Self> {
        let db = Db::in_memory().await?;
        db.migrate().await?;
        Ok(Self {
            db,
            events: Publisher::new(),
        })
    }

    /// Engine over a database at `url`, running migrations first.
    pub async fn connect(url: &str) -> Result<Self> {
        let db = Db::connect(url).await?;
        db.migrate().await?;
        Ok(Self {
            db,
            events: Publisher::new(),
        })
    }

    /// Subscribe to queue-change events.
    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.events.subscribe()
    }

    /// Get an entry by ID.
    pub async fn entry(&self, id: EntryId) -> Result<QueueEntry> {
        self.db.entry(id).await
    }

    /// Student joins a queue. Fails with `DuplicateActive` if they
    /// already have a non-removed entry in that queue.
    pub async fn join(&self, queue_code: &str, student_id: &str) -> Result<QueueEntry> {
        let id = self.db.insert_waiting(queue_code, student_id).await?;
        let entry = self.db.entry(id).await?;

        info!(queue = queue_code, student = student_id, entry = %id, "student joined queue");
        self.events.publish(EventKind::EntryJoined {
            queue_code: entry.queue_code.clone(),
            entry_id: entry.id,
            new_state: entry.state,
        });
        Ok(entry)
    }

    /// Staff starts helping a waiting entry.
    ///
    /// The waiting check and the write are a single compare-and-set;
    /// at most one racing helper wins. A lost race is retried once after
    /// re-reading; if the re-read still cannot settle it the caller gets
    /// `ConcurrentModification`.
    pub async fn start_help(&self, id: EntryId, staff_id: &str) -> Result<QueueEntry> {
        for _ in 0..2 {
            let entry = self.db.entry(id).await?;
            if entry.state != EntryState::Waiting {
                return Err(Error::InvalidTransition {
                    from: entry.state,
                    to: EntryState::BeingHelped,
                });
            }

            if self.db.begin_help(id, staff_id).await? {
                let entry = self.db.entry(id).await?;
                info!(queue = %entry.queue_code, entry = %id, staff = staff_id, "help started");
                self.events.publish(EventKind::HelpStarted {
                    queue_code: entry.queue_code.clone(),
                    entry_id: entry.id,
                    new_state: entry.state,
                    helped_by: staff_id.to_string(),
                });
                return Ok(entry);
            }
        }
        Err(Error::ConcurrentModification(id))
    }

    /// Remove an entry from its queue: help finished, the student left,
    /// staff removed them, or an external no-show policy fired.
    ///
    /// Legal from both `waiting` and `being_helped`. A removed entry is
    /// immutable history; removing it again is `InvalidTransition` and
    /// leaves the recorded outcome untouched.
    pub async fn remove(
        &self,
        id: EntryId,
        removed_by: &str,
        removal_type: RemovalType,
    ) -> Result<QueueEntry> {
        let before = self.db.entry(id).await?;
        if before.state == EntryState::Removed {
            return Err(Error::InvalidTransition {
                from: EntryState::Removed,
                to: EntryState::Removed,
            });
        }

        if !self.db.finish(id, removed_by, removal_type).await? {
            // Lost the race with another removal; the entry is history now.
            return Err(Error::InvalidTransition {
                from: EntryState::Removed,
                to: EntryState::Removed,
            });
        }

        let entry = self.db.entry(id).await?;
        info!(
            queue = %entry.queue_code,
            entry = %id,
            removed_by = removed_by,
            removal_type = %removal_type,
            "entry removed"
        );
        self.events.publish(EventKind::EntryRemoved {
            queue_code: entry.queue_code.clone(),
            entry_id: entry.id,
            new_state: entry.state,
            removal_type,
        });
        Ok(entry)
    }

    /// Live FIFO view of a queue: non-removed entries ordered by join
    /// time, ties broken by id. An entry's position is its 1-based rank
    /// in this sequence, re-derived on every read.
    pub async fn current_queue(&self, queue_code: &str) -> Result<Vec<QueueEntry>> {
        self.db.current_queue(queue_code).await
    }

    /// 1-based position of an entry in its queue's live view, or None if
    /// the entry is not currently in line.
    pub async fn position(&self, queue_code: &str, id: EntryId) -> Result<Option<usize>> {
        let queue = self.db.current_queue(queue_code).await?;
        Ok(queue.iter().position(|e| e.id == id).map(|i| i + 1))
    }

    /// Set or clear the announcement shown to everyone waiting in a
    /// queue. Does not touch entry state.
    pub async fn announce(&self, queue_code: &str, message: Option<&str>) -> Result<()> {
        self.db.set_announcement(queue_code, message).await?;

        info!(queue = queue_code, "announcement changed");
        self.events.publish(EventKind::AnnouncementChanged {
            queue_code: queue_code.to_string(),
            message: message.map(str::to_string),
        });
        Ok(())
    }

    /// A queue's current announcement, if any.
    pub async fn announcement(&self, queue_code: &str) -> Result<Option<String>> {
        self.db.announcement(queue_code).await
    }

    /// A student's full history across all queues, oldest first, with a
    /// tally of how many visits ended in being helped.
    ///
    /// `NotFound` if the student has never joined any queue — distinct
    /// from a history with zero helped visits.
    pub async fn student_history(&self, student_id: &str) -> Result<StudentHistory> {
        let entries = self.db.student_entries(student_id).await?;
        if entries.is_empty() {
            return Err(Error::NotFound(format!("student {student_id}")));
        }

        let times_helped = entries
            .iter()
            .filter(|e| e.removal_type == Some(RemovalType::Helped))
            .count();
        Ok(StudentHistory {
            entries,
            times_helped,
        })
    }

    /// Statistics over the full entry history, removed entries included.
    pub async fn stats(&self) -> Result<StatsReport> {
        let entries = self.db.all_entries().await?;
        Ok(StatsReport::build(&entries, Utc::now()))
    }
}
