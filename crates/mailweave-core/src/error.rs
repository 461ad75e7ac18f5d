//! Error types for the core library.

use thiserror::Error;

use crate::email::EmailId;
use crate::identity::AccountId;
use crate::thread::ThreadId;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Database operation failed. Multi-step writes are rolled back in full.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A required field was missing or malformed, or a disallowed value was
    /// supplied.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Referenced email does not exist.
    #[error("email {0} not found")]
    EmailNotFound(EmailId),

    /// Referenced thread does not exist.
    #[error("thread {0} not found")]
    ThreadNotFound(ThreadId),

    /// No person record is linked to the given account.
    #[error("no person linked to account {0}")]
    PersonNotFound(AccountId),

    /// The operation lost a race against a concurrent writer.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Outbound delivery failed; nothing was persisted.
    #[error("mail delivery failed: {0}")]
    Delivery(#[from] crate::service::MailerError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl Error {
    /// Whether this error reports an absent entity.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::EmailNotFound(_) | Self::ThreadNotFound(_) | Self::PersonNotFound(_)
        )
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
