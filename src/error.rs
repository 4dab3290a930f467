//! Error types for helpq.

use thiserror::Error;

use crate::model::{EntryId, EntryState};

#[derive(Debug, Error)]
pub enum Error {
    /// The student already has a non-removed entry in this queue.
    #[error("student {student_id} already has an active entry in queue {queue_code}")]
    DuplicateActive {
        queue_code: String,
        student_id: String,
    },

    #[error("invalid state transition: {from} -> {to}")]
    InvalidTransition { from: EntryState, to: EntryState },

    #[error("not found: {0}")]
    NotFound(String),

    /// A compare-and-set lost a race and one retry did not settle it.
    /// Recoverable: the caller should re-read and try again.
    #[error("entry {0} was modified concurrently, retry")]
    ConcurrentModification(EntryId),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
