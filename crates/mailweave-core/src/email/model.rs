//! Email data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::{AccountId, EmailAddressId, PersonId};
use crate::thread::ThreadId;

/// Unique identifier for an email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmailId(pub i64);

impl EmailId {
    /// Create a new email ID.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for EmailId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stored email message.
#[derive(Debug, Clone, Serialize)]
pub struct Email {
    /// Unique identifier.
    pub id: EmailId,
    /// Owning thread.
    pub thread_id: ThreadId,
    /// The email this one replies to, if any.
    ///
    /// `None` for thread-starting and post-split emails. The referenced
    /// email existed at creation time but need not remain in the same
    /// thread forever.
    pub parent_email_id: Option<EmailId>,
    /// Sending account.
    pub sender_account_id: AccountId,
    /// Subject line.
    pub subject: String,
    /// Plain text body.
    pub body_text: String,
    /// HTML body.
    pub body_html: Option<String>,
    /// Opaque, globally unique message identifier. Never reused.
    pub message_identifier: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Fields for inserting a new email.
#[derive(Debug, Clone)]
pub struct NewEmail {
    /// Owning thread.
    pub thread_id: ThreadId,
    /// Parent email for replies.
    pub parent_email_id: Option<EmailId>,
    /// Sending account.
    pub sender_account_id: AccountId,
    /// Subject line.
    pub subject: String,
    /// Plain text body.
    pub body_text: String,
    /// HTML body.
    pub body_html: Option<String>,
}

/// How an address received an email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipientKind {
    /// Primary recipient.
    #[default]
    To,
    /// Carbon copy.
    Cc,
    /// Blind carbon copy.
    Bcc,
}

impl RecipientKind {
    /// Parse from database string representation.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "cc" => Self::Cc,
            "bcc" => Self::Bcc,
            _ => Self::To,
        }
    }

    /// Convert to database string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::To => "to",
            Self::Cc => "cc",
            Self::Bcc => "bcc",
        }
    }
}

/// A resolved recipient of an email.
#[derive(Debug, Clone, Serialize)]
pub struct EmailRecipient {
    /// Unique identifier.
    pub id: i64,
    /// The email received.
    pub email_id: EmailId,
    /// Resolved person, when the address had a person link.
    pub person_id: Option<PersonId>,
    /// Resolved address record.
    pub email_address_id: EmailAddressId,
    /// How the address received the email.
    pub kind: RecipientKind,
}

/// Reference to an attachment held in external storage.
///
/// The engine stores only the stable reference plus descriptive metadata;
/// the bytes live in the attachment store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRef {
    /// Stable storage path returned by the attachment store.
    pub file_path: String,
    /// Original filename.
    pub filename: String,
    /// MIME type.
    pub mimetype: String,
    /// Size in bytes.
    pub size: i64,
}
