//! Status data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::email::EmailId;
use crate::identity::AccountId;

/// Triage status of an email for one account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    /// Not yet read. The default when no status row exists.
    #[default]
    Unread,
    /// Read.
    Read,
    /// Marked for follow-up.
    FollowUp,
    /// Marked as containing important information.
    ImportantInfo,
    /// The sender's own copy. Written internally by the send path; never
    /// accepted as client input.
    Sent,
}

impl Status {
    /// Parse a wire string, strictly.
    ///
    /// The wire contract is exact: `unread`, `read`, `follow-up`,
    /// `important-info`, `sent`. Anything else is `None`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "unread" => Some(Self::Unread),
            "read" => Some(Self::Read),
            "follow-up" => Some(Self::FollowUp),
            "important-info" => Some(Self::ImportantInfo),
            "sent" => Some(Self::Sent),
            _ => None,
        }
    }

    /// Convert to the wire/database string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unread => "unread",
            Self::Read => "read",
            Self::FollowUp => "follow-up",
            Self::ImportantInfo => "important-info",
            Self::Sent => "sent",
        }
    }

    /// Whether a caller may set this value.
    ///
    /// `sent` is reserved for the send path.
    #[must_use]
    pub const fn is_client_settable(self) -> bool {
        !matches!(self, Self::Sent)
    }

    /// Resolve a possibly-absent stored status.
    ///
    /// Absence of a row is semantically `unread`. This is the only place
    /// that rule lives.
    #[must_use]
    pub fn resolve(stored: Option<Self>) -> Self {
        stored.unwrap_or_default()
    }
}

/// A stored status row.
#[derive(Debug, Clone, Serialize)]
pub struct StatusRecord {
    /// Unique identifier.
    pub id: i64,
    /// The email this status applies to.
    pub email_id: EmailId,
    /// The account whose view this is.
    pub account_id: AccountId,
    /// The stored status value.
    pub status: Status,
    /// When the row was created.
    pub created_at: DateTime<Utc>,
    /// When the row was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Outcome of a status upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    /// A new row was inserted, with its id.
    Created(i64),
    /// An existing row was updated in place.
    Updated,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_roundtrip() {
        for status in [
            Status::Unread,
            Status::Read,
            Status::FollowUp,
            Status::ImportantInfo,
            Status::Sent,
        ] {
            assert_eq!(Status::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn parse_is_strict() {
        assert_eq!(Status::parse("Read"), None);
        assert_eq!(Status::parse("followup"), None);
        assert_eq!(Status::parse(""), None);
        assert_eq!(Status::parse("starred"), None);
    }

    #[test]
    fn resolve_defaults_to_unread() {
        assert_eq!(Status::resolve(None), Status::Unread);
        assert_eq!(Status::resolve(Some(Status::FollowUp)), Status::FollowUp);
    }

    #[test]
    fn sent_is_not_client_settable() {
        assert!(!Status::Sent.is_client_settable());
        assert!(Status::Read.is_client_settable());
        assert!(Status::Unread.is_client_settable());
    }
}
