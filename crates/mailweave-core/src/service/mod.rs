//! Orchestration services for the threading engine.
//!
//! This module hosts the multi-entity flows (send, split) and the trait
//! seams for external collaborators (outbound delivery, attachment
//! storage). Each flow takes an explicit `now` and runs its writes in one
//! transaction; a failure rolls the whole operation back.

pub mod mailer;
pub mod send;
pub mod split;

pub use mailer::{
    AttachmentStore, AttachmentStoreError, AttachmentUpload, Mailer, MailerError, OutgoingEmail,
};
pub use send::{SendOutcome, SendRequest, send_email};
pub use split::{SplitOutcome, split_email};
