//! The send flow: deliver, then persist.
//!
//! Delivery runs first; a mailer failure prevents all persistence. The
//! persistence step then creates or extends the thread, inserts the email,
//! resolves recipients, records attachment references, writes the sender's
//! `sent` status, and advances the thread's activity timestamp, all inside
//! one transaction.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::db::Database;
use crate::email::{AttachmentRef, EmailId, EmailRepository, NewEmail, RecipientKind};
use crate::identity::{AccountId, IdentityRepository};
use crate::service::mailer::{Mailer, OutgoingEmail};
use crate::status::{Status, StatusRepository};
use crate::thread::{GroupId, ThreadId, ThreadRepository};
use crate::{Error, Result};

/// A request to send an email.
#[derive(Debug, Clone)]
pub struct SendRequest {
    /// The sending account.
    pub sender: AccountId,
    /// Raw recipient address strings (primary recipients).
    pub to: Vec<String>,
    /// Subject line. Rewritten to `Re: <parent subject>` on replies that do
    /// not already carry the prefix.
    pub subject: String,
    /// Plain text body.
    pub body_text: String,
    /// HTML body.
    pub body_html: Option<String>,
    /// Email being replied to, if any.
    pub in_reply_to: Option<EmailId>,
    /// Group for a newly created thread. Ignored on replies, which inherit
    /// the parent's thread.
    pub group_id: Option<GroupId>,
    /// References to attachments already persisted in external storage.
    pub attachments: Vec<AttachmentRef>,
}

impl SendRequest {
    /// Creates a request with no recipients, reply link, group, or
    /// attachments.
    #[must_use]
    pub fn new(sender: AccountId, subject: impl Into<String>, body_text: impl Into<String>) -> Self {
        Self {
            sender,
            to: Vec::new(),
            subject: subject.into(),
            body_text: body_text.into(),
            body_html: None,
            in_reply_to: None,
            group_id: None,
            attachments: Vec::new(),
        }
    }

    /// Adds a recipient address.
    #[must_use]
    pub fn to(mut self, address: impl Into<String>) -> Self {
        self.to.push(address.into());
        self
    }

    /// Marks this request as a reply.
    #[must_use]
    pub const fn in_reply_to(mut self, email_id: EmailId) -> Self {
        self.in_reply_to = Some(email_id);
        self
    }

    /// Targets a group for the new thread.
    #[must_use]
    pub const fn group(mut self, group_id: GroupId) -> Self {
        self.group_id = Some(group_id);
        self
    }
}

/// What a completed send produced.
#[derive(Debug, Clone)]
pub struct SendOutcome {
    /// The created email.
    pub email_id: EmailId,
    /// The thread it landed in (new or inherited).
    pub thread_id: ThreadId,
    /// The generated message identifier.
    pub message_identifier: String,
}

/// Send an email: deliver through the mailer, then persist the thread,
/// email, recipients, and sender status in one transaction.
///
/// Without `in_reply_to` a new thread is created with the email as its
/// root. With it, the referenced email's thread is inherited, the parent
/// pointer is set, and the subject is rewritten to `"Re: " + parent
/// subject` unless it already starts with the prefix.
///
/// # Errors
///
/// `InvalidArgument` when no recipients are given or the sender has no
/// primary address; `EmailNotFound` when the reply target is gone;
/// `PersonNotFound` when no person is linked to the sending account;
/// `Delivery` when the mailer fails (nothing is persisted); otherwise a
/// storage fault, rolled back in full.
pub async fn send_email<M: Mailer>(
    db: &Database,
    mailer: &M,
    request: SendRequest,
    now: DateTime<Utc>,
) -> Result<SendOutcome> {
    if request.to.is_empty() {
        return Err(Error::InvalidArgument(
            "at least one recipient is required".to_string(),
        ));
    }

    // Resolve the reply target up front so the delivered subject matches
    // what gets persisted.
    let parent = match request.in_reply_to {
        Some(parent_id) => Some(
            EmailRepository::new(db)
                .get(parent_id)
                .await?
                .ok_or(Error::EmailNotFound(parent_id))?,
        ),
        None => None,
    };

    let subject = match &parent {
        Some(parent) => reply_subject(&request.subject, &parent.subject),
        None => request.subject.clone(),
    };

    let from = resolve_from(db, request.sender).await?;

    let mut outgoing = OutgoingEmail::new(from, subject.clone(), request.body_text.clone());
    for address in &request.to {
        outgoing = outgoing.to(address.clone());
    }
    if let Some(html) = &request.body_html {
        outgoing = outgoing.html(html.clone());
    }
    mailer.send(&outgoing).await?;

    let mut tx = db.pool().begin().await?;

    let thread_id = match &parent {
        Some(parent) => {
            debug!(parent = parent.id.0, thread = parent.thread_id.0, "reply inherits thread");
            parent.thread_id
        }
        None => {
            ThreadRepository::insert_in(&mut tx, &subject, request.sender, request.group_id, now)
                .await?
        }
    };

    let new_email = NewEmail {
        thread_id,
        parent_email_id: parent.as_ref().map(|p| p.id),
        sender_account_id: request.sender,
        subject,
        body_text: request.body_text.clone(),
        body_html: request.body_html.clone(),
    };
    let (email_id, message_identifier) = EmailRepository::insert_in(
        &mut tx,
        &new_email,
        now,
        &db.config().message_id_domain,
    )
    .await?;

    for address in &request.to {
        let identity = IdentityRepository::resolve_in(&mut tx, address, now).await?;
        EmailRepository::add_recipient_in(
            &mut tx,
            email_id,
            identity.person_id,
            identity.address_id,
            RecipientKind::To,
        )
        .await?;
    }

    for attachment in &request.attachments {
        EmailRepository::add_attachment_in(&mut tx, email_id, attachment, now).await?;
    }

    StatusRepository::set_in(&mut tx, email_id, request.sender, Status::Sent, now).await?;
    ThreadRepository::touch_activity_in(&mut tx, thread_id, now).await?;

    tx.commit().await?;

    info!(email = email_id.0, thread = thread_id.0, "email sent");
    Ok(SendOutcome {
        email_id,
        thread_id,
        message_identifier,
    })
}

/// The subject a reply is stored and delivered with.
///
/// The caller's subject survives only when it already starts with the
/// case-sensitive `"Re: "` prefix; anything else (including empty) becomes
/// `"Re: " + parent subject`.
fn reply_subject(requested: &str, parent_subject: &str) -> String {
    if requested.starts_with("Re: ") {
        requested.to_string()
    } else {
        format!("Re: {parent_subject}")
    }
}

/// Resolve the outbound From address for a sending account: the primary
/// address of the linked person.
async fn resolve_from(db: &Database, sender: AccountId) -> Result<String> {
    let identities = IdentityRepository::new(db);
    let person = identities
        .person_for_account(sender)
        .await?
        .ok_or(Error::PersonNotFound(sender))?;

    identities.primary_address(person.id).await?.ok_or_else(|| {
        Error::InvalidArgument(format!("account {sender} has no primary address"))
    })
}
