//! Email storage: messages, recipients, and attachment references.
//!
//! An email belongs to exactly one thread and may reply to another email
//! through `parent_email_id`. Reply chain and thread membership are
//! independently mutable facts: a split moves an email to a new thread
//! without touching the parent pointers of its children, so a parent
//! reference may point into a different thread than the child's own.

mod model;
mod repository;

pub use model::{AttachmentRef, Email, EmailId, EmailRecipient, NewEmail, RecipientKind};
pub use repository::EmailRepository;
