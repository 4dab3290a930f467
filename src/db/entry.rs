//! Queue entry operations: conflict-checked joins, compare-and-set state
//! transitions, and the ordered reads behind the live queue, history, and
//! statistics views.

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::model::{EntryId, QueueEntry, RemovalType};

impl super::Db {
    /// Insert a new waiting entry for a join.
    ///
    /// The partial unique index on (queue_code, student_id) over
    /// non-removed rows makes the duplicate check atomic with the
    /// insert: a conflicting active entry turns the INSERT into a no-op
    /// and the join reports `DuplicateActive`.
    pub async fn insert_waiting(&self, queue_code: &str, student_id: &str) -> Result<EntryId> {
        let now = Utc::now();
        let inserted: Option<(i64,)> = sqlx::query_as(
            "INSERT INTO queue_entries (queue_code, student_id, state, time_in)
             VALUES (?1, ?2, 'waiting', ?3)
             ON CONFLICT (queue_code, student_id) WHERE state != 'removed'
             DO NOTHING
             RETURNING id",
        )
        .bind(queue_code)
        .bind(student_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        match inserted {
            Some((id,)) => Ok(EntryId(id)),
            None => Err(Error::DuplicateActive {
                queue_code: queue_code.to_string(),
                student_id: student_id.to_string(),
            }),
        }
    }

    /// Get an entry by ID.
    pub async fn entry(&self, id: EntryId) -> Result<QueueEntry> {
        let row: Option<EntryRow> = sqlx::query_as(
            "SELECT id, queue_code, student_id, state, time_in, help_started_by,
                    time_help_started, time_out, removed_by, removal_type
             FROM queue_entries WHERE id = ?1",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| Error::NotFound(format!("entry {id}")))?
            .try_into_entry()
    }

    /// waiting -> being_helped, compare-and-set on the current state.
    ///
    /// Returns false if the entry was not in `waiting` at write time;
    /// the caller re-reads and classifies the lost race.
    pub async fn begin_help(&self, id: EntryId, staff_id: &str) -> Result<bool> {
        let now = Utc::now();
        let rows_affected = sqlx::query(
            "UPDATE queue_entries
             SET state = 'being_helped', help_started_by = ?1, time_help_started = ?2
             WHERE id = ?3 AND state = 'waiting'",
        )
        .bind(staff_id)
        .bind(now)
        .bind(id.0)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows_affected == 1)
    }

    /// Any active state -> removed, compare-and-set on "not yet removed".
    ///
    /// Returns false if the entry was already removed; removed rows are
    /// immutable history and the write never touches them.
    pub async fn finish(
        &self,
        id: EntryId,
        removed_by: &str,
        removal_type: RemovalType,
    ) -> Result<bool> {
        let now = Utc::now();
        let rows_affected = sqlx::query(
            "UPDATE queue_entries
             SET state = 'removed', time_out = ?1, removed_by = ?2, removal_type = ?3
             WHERE id = ?4 AND state != 'removed'",
        )
        .bind(now)
        .bind(removed_by)
        .bind(removal_type.to_string())
        .bind(id.0)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows_affected == 1)
    }

    /// All non-removed entries for one queue, FIFO.
    ///
    /// Ordering is a strict total order: time_in ascending, ties broken
    /// by the monotonic store-assigned id. Position is the 1-based rank
    /// in this sequence — always derived here, never stored.
    pub async fn current_queue(&self, queue_code: &str) -> Result<Vec<QueueEntry>> {
        let rows: Vec<EntryRow> = sqlx::query_as(
            "SELECT id, queue_code, student_id, state, time_in, help_started_by,
                    time_help_started, time_out, removed_by, removal_type
             FROM queue_entries
             WHERE queue_code = ?1 AND state != 'removed'
             ORDER BY time_in ASC, id ASC",
        )
        .bind(queue_code)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(EntryRow::try_into_entry).collect()
    }

    /// A student's full history across all queues, oldest first.
    pub async fn student_entries(&self, student_id: &str) -> Result<Vec<QueueEntry>> {
        let rows: Vec<EntryRow> = sqlx::query_as(
            "SELECT id, queue_code, student_id, state, time_in, help_started_by,
                    time_help_started, time_out, removed_by, removal_type
             FROM queue_entries
             WHERE student_id = ?1
             ORDER BY time_in ASC, id ASC",
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(EntryRow::try_into_entry).collect()
    }

    /// Every entry ever recorded, removed ones included, for the
    /// statistics projection.
    pub async fn all_entries(&self) -> Result<Vec<QueueEntry>> {
        let rows: Vec<EntryRow> = sqlx::query_as(
            "SELECT id, queue_code, student_id, state, time_in, help_started_by,
                    time_help_started, time_out, removed_by, removal_type
             FROM queue_entries
             ORDER BY time_in ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(EntryRow::try_into_entry).collect()
    }

    /// Set or clear a queue's announcement.
    pub async fn set_announcement(&self, queue_code: &str, message: Option<&str>) -> Result<()> {
        sqlx::query(
            "INSERT INTO queues (code, announcement) VALUES (?1, ?2)
             ON CONFLICT (code) DO UPDATE SET announcement = excluded.announcement",
        )
        .bind(queue_code)
        .bind(message)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// A queue's current announcement, if any.
    pub async fn announcement(&self, queue_code: &str) -> Result<Option<String>> {
        let row: Option<(Option<String>,)> =
            sqlx::query_as("SELECT announcement FROM queues WHERE code = ?1")
                .bind(queue_code)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.and_then(|(message,)| message))
    }
}

/// Internal row type for sqlx::FromRow.
#[derive(sqlx::FromRow)]
struct EntryRow {
    id: i64,
    queue_code: String,
    student_id: String,
    state: String,
    time_in: DateTime<Utc>,
    help_started_by: Option<String>,
    time_help_started: Option<DateTime<Utc>>,
    time_out: Option<DateTime<Utc>>,
    removed_by: Option<String>,
    removal_type: Option<String>,
}

impl EntryRow {
    fn try_into_entry(self) -> Result<QueueEntry> {
        Ok(QueueEntry {
            id: EntryId(self.id),
            queue_code: self.queue_code,
            student_id: self.student_id,
            state: self.state.parse()?,
            time_in: self.time_in,
            help_started_by: self.help_started_by,
            time_help_started: self.time_help_started,
            time_out: self.time_out,
            removed_by: self.removed_by,
            removal_type: self.removal_type.map(|s| s.parse()).transpose()?,
        })
    }
}
