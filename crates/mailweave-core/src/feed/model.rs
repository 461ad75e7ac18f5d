//! Feed data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::email::EmailId;
use crate::identity::AccountId;
use crate::status::Status;
use crate::thread::{GroupId, ThreadId};

/// Default page size for the feed.
pub const DEFAULT_LIMIT: u32 = 25;

/// Parameters of a feed request.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedQuery {
    /// The requesting account; scopes status resolution.
    pub account_id: AccountId,
    /// Restrict to threads of this group.
    pub group_id: Option<GroupId>,
    /// Only show emails with this resolved status.
    pub status: Option<Status>,
    /// 1-based page number.
    pub page: u32,
    /// Threads per page.
    pub limit: u32,
}

impl FeedQuery {
    /// Creates a query for the first page with the default limit.
    #[must_use]
    pub const fn new(account_id: AccountId) -> Self {
        Self {
            account_id,
            group_id: None,
            status: None,
            page: 1,
            limit: DEFAULT_LIMIT,
        }
    }

    /// Restricts the feed to a group.
    #[must_use]
    pub const fn group(mut self, group_id: GroupId) -> Self {
        self.group_id = Some(group_id);
        self
    }

    /// Filters emails by resolved status.
    #[must_use]
    pub const fn status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    /// Selects a page.
    #[must_use]
    pub const fn page(mut self, page: u32, limit: u32) -> Self {
        self.page = page;
        self.limit = limit;
        self
    }
}

/// Pagination metadata of a feed page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    /// The requested page (1-based).
    pub page: u32,
    /// The requested page size.
    pub limit: u32,
    /// Threads matching the group filter. The status filter is
    /// intentionally excluded from this count.
    pub total_items: u64,
    /// Page count derived from `total_items` and `limit`.
    pub total_pages: u64,
}

/// An email as it appears in the feed or thread view.
#[derive(Debug, Clone, Serialize)]
pub struct FeedEmail {
    /// Unique identifier.
    pub id: EmailId,
    /// Owning thread.
    pub thread_id: ThreadId,
    /// Parent email, possibly in another thread after a split.
    pub parent_email_id: Option<EmailId>,
    /// Sending account.
    pub sender_account_id: AccountId,
    /// Sender display name; empty when no person is linked to the sender.
    pub sender_name: String,
    /// Subject line.
    pub subject: String,
    /// Plain text body.
    pub body_text: String,
    /// HTML body.
    pub body_html: Option<String>,
    /// Message identifier.
    pub message_identifier: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// The requesting account's resolved status for this email.
    pub status: Status,
}

/// A thread with its visible emails and derived display data.
#[derive(Debug, Clone, Serialize)]
pub struct FeedThread {
    /// Unique identifier.
    pub id: ThreadId,
    /// Subject line.
    pub subject: String,
    /// Group this thread belongs to, if any.
    pub group_id: Option<GroupId>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the most recent activity; the feed sort key.
    pub last_activity_at: DateTime<Utc>,
    /// Sender names in order of first appearance among the visible emails.
    pub participants: Vec<String>,
    /// Visible emails resolved as unread for the requesting account.
    pub unread_count: u32,
    /// Visible emails, oldest first.
    pub emails: Vec<FeedEmail>,
}

impl FeedThread {
    /// Returns a display string for participants (e.g., "Alice, Bob, +2 others").
    #[must_use]
    pub fn participants_display(&self) -> String {
        match self.participants.len() {
            0 => String::new(),
            1 => self.participants[0].clone(),
            2 => format!("{}, {}", self.participants[0], self.participants[1]),
            n => format!(
                "{}, {} +{} others",
                self.participants[0],
                self.participants[1],
                n - 2
            ),
        }
    }
}

/// One page of the feed.
#[derive(Debug, Clone, Serialize)]
pub struct FeedPage {
    /// Threads ordered by most recent activity.
    pub threads: Vec<FeedThread>,
    /// Pagination metadata.
    pub pagination: Pagination,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn thread_with_participants(participants: &[&str]) -> FeedThread {
        let ts = Utc.with_ymd_and_hms(2026, 5, 2, 10, 0, 0).unwrap();
        FeedThread {
            id: ThreadId(1),
            subject: "s".to_string(),
            group_id: None,
            created_at: ts,
            last_activity_at: ts,
            participants: participants.iter().map(ToString::to_string).collect(),
            unread_count: 0,
            emails: Vec::new(),
        }
    }

    #[test]
    fn participants_display_variants() {
        assert_eq!(thread_with_participants(&[]).participants_display(), "");
        assert_eq!(thread_with_participants(&["Ada"]).participants_display(), "Ada");
        assert_eq!(
            thread_with_participants(&["Ada", "Grace"]).participants_display(),
            "Ada, Grace"
        );
        assert_eq!(
            thread_with_participants(&["Ada", "Grace", "Linus", "Barbara"]).participants_display(),
            "Ada, Grace +2 others"
        );
    }

    #[test]
    fn query_builder() {
        let query = FeedQuery::new(AccountId(1))
            .group(GroupId(4))
            .status(Status::Unread)
            .page(2, 10);

        assert_eq!(query.account_id, AccountId(1));
        assert_eq!(query.group_id, Some(GroupId(4)));
        assert_eq!(query.status, Some(Status::Unread));
        assert_eq!(query.page, 2);
        assert_eq!(query.limit, 10);
    }
}
