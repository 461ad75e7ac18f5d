//! Splitting an email out of its thread.
//!
//! The target email moves into a brand-new thread and loses its parent
//! pointer. Replies to it are left where they are: their parent references
//! now point across threads, which is the documented behavior, not a bug.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::db::Database;
use crate::email::{EmailId, EmailRepository};
use crate::identity::AccountId;
use crate::thread::{Thread, ThreadId, ThreadRepository};
use crate::{Error, Result};

/// What a completed split produced.
#[derive(Debug, Clone, Copy)]
pub struct SplitOutcome {
    /// The newly created thread now owning the email.
    pub thread_id: ThreadId,
    /// The email that was moved.
    pub email_id: EmailId,
}

/// Detach an email from its thread into a new one.
///
/// The new thread takes the email's subject (or a fallback title when the
/// subject is empty), is created by the acting account, and is stamped with
/// the action time `now` rather than the email's original timestamp. The
/// old thread's activity is recomputed from its remaining emails. Splitting
/// a thread root is allowed and simply moves the already-root email.
///
/// All writes happen in one transaction; any failure rolls the whole
/// operation back.
///
/// # Errors
///
/// `EmailNotFound` when the email does not exist (nothing is written);
/// `Conflict` when a concurrent writer moved the email first; otherwise a
/// storage fault.
pub async fn split_email(
    db: &Database,
    email_id: EmailId,
    acting_account: AccountId,
    now: DateTime<Utc>,
) -> Result<SplitOutcome> {
    let mut tx = db.pool().begin().await?;

    let email = EmailRepository::get_in(&mut tx, email_id)
        .await?
        .ok_or(Error::EmailNotFound(email_id))?;
    let old_thread = email.thread_id;

    let subject = if email.subject.is_empty() {
        Thread::FALLBACK_SUBJECT
    } else {
        email.subject.as_str()
    };
    let new_thread = ThreadRepository::insert_in(&mut tx, subject, acting_account, None, now).await?;

    let moved = EmailRepository::move_to_thread_in(&mut tx, email_id, old_thread, new_thread).await?;
    if !moved {
        return Err(Error::Conflict(format!(
            "email {email_id} was moved by a concurrent operation"
        )));
    }

    ThreadRepository::recompute_activity_in(&mut tx, old_thread, now).await?;

    tx.commit().await?;

    info!(
        email = email_id.0,
        from_thread = old_thread.0,
        to_thread = new_thread.0,
        "email split into new thread"
    );
    Ok(SplitOutcome {
        thread_id: new_thread,
        email_id,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::identity::IdentityRepository;
    use crate::service::mailer::fakes::RecordingMailer;
    use crate::service::send::{SendRequest, send_email};
    use chrono::TimeZone;

    fn ts(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 2, hour, minute, 0).unwrap()
    }

    async fn make_sender(db: &Database, account: AccountId, address: &str) {
        let identities = IdentityRepository::new(db);
        let person = identities
            .create_person(address, Some(account), ts(8, 0))
            .await
            .unwrap();
        identities
            .add_address(person, address, true, ts(8, 0))
            .await
            .unwrap();
    }

    /// A thread with a root email and a reply to it; returns (root, reply).
    async fn seed_thread(db: &Database) -> (EmailId, EmailId) {
        let mailer = RecordingMailer::default();
        let root = send_email(
            db,
            &mailer,
            SendRequest::new(AccountId(1), "Roadmap", "v1").to("grace@example.com"),
            ts(10, 0),
        )
        .await
        .unwrap();
        let reply = send_email(
            db,
            &mailer,
            SendRequest::new(AccountId(1), "", "v2")
                .to("grace@example.com")
                .in_reply_to(root.email_id),
            ts(11, 0),
        )
        .await
        .unwrap();
        (root.email_id, reply.email_id)
    }

    #[tokio::test]
    async fn split_moves_email_into_new_thread() {
        let db = Database::in_memory().await.unwrap();
        make_sender(&db, AccountId(1), "ada@example.com").await;
        let (_root, reply) = seed_thread(&db).await;

        let outcome = split_email(&db, reply, AccountId(2), ts(12, 0)).await.unwrap();
        assert_eq!(outcome.email_id, reply);

        let email = EmailRepository::new(&db).get(reply).await.unwrap().unwrap();
        assert_eq!(email.thread_id, outcome.thread_id);
        assert_eq!(email.parent_email_id, None);

        let thread = ThreadRepository::new(&db)
            .get(outcome.thread_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(thread.subject, "Re: Roadmap");
        assert_eq!(thread.creator_account_id, AccountId(2));
        assert_eq!(thread.created_at, ts(12, 0));
        assert_eq!(thread.last_activity_at, ts(12, 0));
    }

    #[tokio::test]
    async fn split_recomputes_old_thread_activity() {
        let db = Database::in_memory().await.unwrap();
        make_sender(&db, AccountId(1), "ada@example.com").await;
        let (root, reply) = seed_thread(&db).await;

        let old_thread = EmailRepository::new(&db).get(root).await.unwrap().unwrap().thread_id;

        // The reply (at 11:00) was the most recent email; after the split
        // the old thread falls back to the root's timestamp.
        split_email(&db, reply, AccountId(1), ts(12, 0)).await.unwrap();

        let thread = ThreadRepository::new(&db).get(old_thread).await.unwrap().unwrap();
        assert_eq!(thread.last_activity_at, ts(10, 0));
    }

    #[tokio::test]
    async fn split_emptied_thread_falls_back_to_creation_time() {
        let db = Database::in_memory().await.unwrap();
        make_sender(&db, AccountId(1), "ada@example.com").await;

        let mailer = RecordingMailer::default();
        let sent = send_email(
            &db,
            &mailer,
            SendRequest::new(AccountId(1), "Solo", "b").to("grace@example.com"),
            ts(10, 0),
        )
        .await
        .unwrap();

        split_email(&db, sent.email_id, AccountId(1), ts(12, 0)).await.unwrap();

        let thread = ThreadRepository::new(&db).get(sent.thread_id).await.unwrap().unwrap();
        assert_eq!(thread.last_activity_at, thread.created_at);
    }

    #[tokio::test]
    async fn split_leaves_children_behind() {
        let db = Database::in_memory().await.unwrap();
        make_sender(&db, AccountId(1), "ada@example.com").await;
        let (root, reply) = seed_thread(&db).await;

        let emails = EmailRepository::new(&db);
        let old_thread = emails.get(root).await.unwrap().unwrap().thread_id;

        // Split the root; its reply stays in the old thread with a parent
        // pointer into the new one.
        let outcome = split_email(&db, root, AccountId(1), ts(12, 0)).await.unwrap();

        let child = emails.get(reply).await.unwrap().unwrap();
        assert_eq!(child.thread_id, old_thread);
        assert_eq!(child.parent_email_id, Some(root));
        assert_ne!(child.thread_id, outcome.thread_id);
    }

    #[tokio::test]
    async fn split_root_email_is_allowed() {
        let db = Database::in_memory().await.unwrap();
        make_sender(&db, AccountId(1), "ada@example.com").await;

        let mailer = RecordingMailer::default();
        let sent = send_email(
            &db,
            &mailer,
            SendRequest::new(AccountId(1), "Solo", "b").to("grace@example.com"),
            ts(10, 0),
        )
        .await
        .unwrap();

        let outcome = split_email(&db, sent.email_id, AccountId(1), ts(12, 0)).await.unwrap();
        assert_ne!(outcome.thread_id, sent.thread_id);

        let email = EmailRepository::new(&db).get(sent.email_id).await.unwrap().unwrap();
        assert_eq!(email.thread_id, outcome.thread_id);
        assert_eq!(email.parent_email_id, None);
    }

    #[tokio::test]
    async fn split_empty_subject_uses_fallback_title() {
        let db = Database::in_memory().await.unwrap();
        make_sender(&db, AccountId(1), "ada@example.com").await;

        let mailer = RecordingMailer::default();
        let sent = send_email(
            &db,
            &mailer,
            SendRequest::new(AccountId(1), "", "b").to("grace@example.com"),
            ts(10, 0),
        )
        .await
        .unwrap();

        let outcome = split_email(&db, sent.email_id, AccountId(1), ts(12, 0)).await.unwrap();

        let thread = ThreadRepository::new(&db)
            .get(outcome.thread_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(thread.subject, Thread::FALLBACK_SUBJECT);
    }

    #[tokio::test]
    async fn split_missing_email_writes_nothing() {
        let db = Database::in_memory().await.unwrap();

        let result = split_email(&db, EmailId(404), AccountId(1), ts(12, 0)).await;
        assert!(matches!(result, Err(Error::EmailNotFound(_))));

        let threads: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM threads")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(threads, 0);
    }
}
