//! Core data model.
//!
//! A queue entry is one student's visit to a help queue, from join to
//! removal. Identity, actor attribution, and the timestamps that feed
//! the statistics all live here.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

// ---------------------------------------------------------------------------
// Queue Entry
// ---------------------------------------------------------------------------

/// One student's visit to a queue, from join to removal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    /// Store-assigned identifier. Monotonic, so it doubles as the
    /// ordering tie-break when two joins share a timestamp.
    pub id: EntryId,

    /// Which logical queue (course section / lab) this entry belongs to.
    pub queue_code: String,

    /// The student in line.
    pub student_id: String,

    /// Current lifecycle state.
    pub state: EntryState,

    /// When the student joined the queue.
    pub time_in: DateTime<Utc>,

    /// Staff member who started helping. None until help begins.
    pub help_started_by: Option<String>,

    /// When help began. None until help begins.
    pub time_help_started: Option<DateTime<Utc>>,

    /// When the entry left the queue. None while active.
    pub time_out: Option<DateTime<Utc>>,

    /// Who removed the entry (staff id, or the student's own id).
    /// Set together with `removal_type`.
    pub removed_by: Option<String>,

    /// Why the entry left the queue. Set together with `removed_by`.
    pub removal_type: Option<RemovalType>,
}

impl QueueEntry {
    /// Still in line or being helped?
    pub fn is_active(&self) -> bool {
        !self.state.is_terminal()
    }

    /// Time spent waiting before help started. None if help never began.
    pub fn wait_duration(&self) -> Option<Duration> {
        self.time_help_started.map(|started| started - self.time_in)
    }

    /// Time spent being helped. None unless help both started and ended.
    pub fn help_duration(&self) -> Option<Duration> {
        match (self.time_help_started, self.time_out) {
            (Some(started), Some(out)) => Some(out - started),
            _ => None,
        }
    }
}

/// Newtype for store-assigned entry IDs.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct EntryId(pub i64);

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Lifecycle state of a queue entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryState {
    /// In line, waiting for a helper.
    Waiting,
    /// A staff member is actively helping.
    BeingHelped,
    /// Out of the queue. Terminal; the entry is now history.
    Removed,
}

impl EntryState {
    /// Can transition from self to `to`?
    pub fn can_transition_to(self, to: EntryState) -> bool {
        use EntryState::*;
        matches!(
            (self, to),
            (Waiting, BeingHelped)
                | (Waiting, Removed)    // left the line before help started
                | (BeingHelped, Removed)
        )
    }

    /// Is this a terminal state?
    pub fn is_terminal(self) -> bool {
        matches!(self, EntryState::Removed)
    }
}

impl std::fmt::Display for EntryState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EntryState::Waiting => "waiting",
            EntryState::BeingHelped => "being_helped",
            EntryState::Removed => "removed",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for EntryState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(EntryState::Waiting),
            "being_helped" => Ok(EntryState::BeingHelped),
            "removed" => Ok(EntryState::Removed),
            _ => Err(Error::Other(format!("unknown entry state: {s}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Removal Type
// ---------------------------------------------------------------------------

/// Why an entry left the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalType {
    /// Help finished normally.
    Helped,
    /// The student left the line themselves.
    SelfRemoved,
    /// A staff member removed the student without helping.
    StaffRemoved,
    /// External policy decided the student waited too long unattended.
    /// The engine itself never times anyone out.
    NoShow,
}

impl std::fmt::Display for RemovalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RemovalType::Helped => "helped",
            RemovalType::SelfRemoved => "self_removed",
            RemovalType::StaffRemoved => "staff_removed",
            RemovalType::NoShow => "no_show",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for RemovalType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "helped" => Ok(RemovalType::Helped),
            "self_removed" => Ok(RemovalType::SelfRemoved),
            "staff_removed" => Ok(RemovalType::StaffRemoved),
            "no_show" => Ok(RemovalType::NoShow),
            _ => Err(Error::Other(format!("unknown removal type: {s}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_table_is_exactly_the_lifecycle() {
        use EntryState::*;
        assert!(Waiting.can_transition_to(BeingHelped));
        assert!(Waiting.can_transition_to(Removed));
        assert!(BeingHelped.can_transition_to(Removed));

        // No re-entry, no self-loops.
        assert!(!BeingHelped.can_transition_to(Waiting));
        assert!(!Removed.can_transition_to(Waiting));
        assert!(!Removed.can_transition_to(BeingHelped));
        assert!(!Removed.can_transition_to(Removed));
        assert!(!Waiting.can_transition_to(Waiting));
    }

    #[test]
    fn state_round_trips_through_strings() {
        use EntryState::*;
        for state in [Waiting, BeingHelped, Removed] {
            let parsed: EntryState = state.to_string().parse().unwrap();
            assert_eq!(parsed, state);
        }
    }

    #[test]
    fn removal_type_round_trips_through_strings() {
        use RemovalType::*;
        for rt in [Helped, SelfRemoved, StaffRemoved, NoShow] {
            let parsed: RemovalType = rt.to_string().parse().unwrap();
            assert_eq!(parsed, rt);
        }
    }
}
