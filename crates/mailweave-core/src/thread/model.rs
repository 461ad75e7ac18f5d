//! Thread data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::AccountId;

/// Unique identifier for a thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreadId(pub i64);

impl ThreadId {
    /// Create a new thread ID.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ThreadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a group.
///
/// Group membership is owned by an external directory; the core only stores
/// the id and filters by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupId(pub i64);

impl GroupId {
    /// Create a new group ID.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A conversation thread.
#[derive(Debug, Clone, Serialize)]
pub struct Thread {
    /// Unique identifier.
    pub id: ThreadId,
    /// Subject line.
    pub subject: String,
    /// Account that created the thread.
    pub creator_account_id: AccountId,
    /// Optional group this thread belongs to.
    pub group_id: Option<GroupId>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the most recent event affecting the thread. Feed sort
    /// key.
    pub last_activity_at: DateTime<Utc>,
}

impl Thread {
    /// Title given to threads created from an email with an empty subject.
    pub const FALLBACK_SUBJECT: &'static str = "(no subject)";
}
