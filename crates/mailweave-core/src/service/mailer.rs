//! Collaborator seams for outbound delivery and attachment storage.
//!
//! The engine never speaks SMTP and never holds attachment bytes; both
//! concerns live behind these traits. The send flow invokes the mailer
//! before persisting anything, so a failed delivery leaves no trace.

use std::future::Future;

use crate::email::AttachmentRef;

/// Errors that can occur during outbound delivery.
#[derive(Debug, thiserror::Error)]
pub enum MailerError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Authentication failed.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The server rejected the message.
    #[error("message rejected: {0}")]
    Rejected(String),

    /// Invalid address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

/// Errors that can occur while persisting attachment bytes.
#[derive(Debug, thiserror::Error)]
pub enum AttachmentStoreError {
    /// The backing storage failed.
    #[error("attachment storage failed: {0}")]
    Storage(String),
}

/// An email message handed to the mailer.
#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    /// Sender address.
    pub from: String,
    /// Recipient addresses.
    pub to: Vec<String>,
    /// CC addresses.
    pub cc: Vec<String>,
    /// BCC addresses.
    pub bcc: Vec<String>,
    /// Subject line.
    pub subject: String,
    /// Plain text body.
    pub body_text: String,
    /// HTML body.
    pub body_html: Option<String>,
}

impl OutgoingEmail {
    /// Creates a new outgoing email.
    #[must_use]
    pub fn new(
        from: impl Into<String>,
        subject: impl Into<String>,
        body_text: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to: Vec::new(),
            cc: Vec::new(),
            bcc: Vec::new(),
            subject: subject.into(),
            body_text: body_text.into(),
            body_html: None,
        }
    }

    /// Adds a recipient.
    #[must_use]
    pub fn to(mut self, recipient: impl Into<String>) -> Self {
        self.to.push(recipient.into());
        self
    }

    /// Adds a CC recipient.
    #[must_use]
    pub fn cc(mut self, recipient: impl Into<String>) -> Self {
        self.cc.push(recipient.into());
        self
    }

    /// Adds a BCC recipient.
    #[must_use]
    pub fn bcc(mut self, recipient: impl Into<String>) -> Self {
        self.bcc.push(recipient.into());
        self
    }

    /// Sets the HTML body.
    #[must_use]
    pub fn html(mut self, body: impl Into<String>) -> Self {
        self.body_html = Some(body.into());
        self
    }
}

/// Raw attachment bytes plus metadata, before external storage.
#[derive(Debug, Clone)]
pub struct AttachmentUpload {
    /// Original filename.
    pub filename: String,
    /// MIME type.
    pub mimetype: String,
    /// The raw bytes.
    pub bytes: Vec<u8>,
}

/// Outbound delivery collaborator.
pub trait Mailer {
    /// Deliver an email.
    fn send(
        &self,
        message: &OutgoingEmail,
    ) -> impl Future<Output = Result<(), MailerError>> + Send;
}

/// Durable attachment storage collaborator.
///
/// Callers persist uploads through this seam before the send flow runs; the
/// engine only ever sees the returned references.
pub trait AttachmentStore {
    /// Persist raw bytes and return a stable reference to them.
    fn store(
        &self,
        upload: &AttachmentUpload,
    ) -> impl Future<Output = Result<AttachmentRef, AttachmentStoreError>> + Send;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod fakes {
    use std::sync::Mutex;

    use super::{
        AttachmentRef, AttachmentStore, AttachmentStoreError, AttachmentUpload, Mailer,
        MailerError, OutgoingEmail,
    };

    /// Mailer that records every delivered message.
    #[derive(Default)]
    pub struct RecordingMailer {
        pub sent: Mutex<Vec<OutgoingEmail>>,
    }

    impl Mailer for RecordingMailer {
        async fn send(&self, message: &OutgoingEmail) -> Result<(), MailerError> {
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    /// Mailer that always fails to deliver.
    pub struct FailingMailer;

    impl Mailer for FailingMailer {
        async fn send(&self, _message: &OutgoingEmail) -> Result<(), MailerError> {
            Err(MailerError::Connection("connection refused".to_string()))
        }
    }

    /// Attachment store that "persists" to a deterministic path.
    pub struct MemoryAttachmentStore;

    impl AttachmentStore for MemoryAttachmentStore {
        async fn store(&self, upload: &AttachmentUpload) -> Result<AttachmentRef, AttachmentStoreError> {
            Ok(AttachmentRef {
                file_path: format!("mem/{}", upload.filename),
                filename: upload.filename.clone(),
                mimetype: upload.mimetype.clone(),
                size: i64::try_from(upload.bytes.len()).unwrap_or(i64::MAX),
            })
        }
    }
}
