//! Email storage repository.

use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqliteConnection, SqlitePool, SqliteRow};

use super::model::{AttachmentRef, Email, EmailId, EmailRecipient, NewEmail, RecipientKind};
use crate::Result;
use crate::db::{Database, format_ts, parse_ts};
use crate::identity::{AccountId, EmailAddressId, PersonId};
use crate::thread::ThreadId;

/// Repository for emails and their recipient/attachment rows.
pub struct EmailRepository {
    pool: SqlitePool,
}

impl EmailRepository {
    /// Create a repository over the shared database.
    #[must_use]
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }

    /// Get an email by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get(&self, id: EmailId) -> Result<Option<Email>> {
        let mut conn = self.pool.acquire().await?;
        Self::get_in(&mut conn, id).await
    }

    /// Transaction-scoped variant of [`get`](Self::get).
    pub(crate) async fn get_in(conn: &mut SqliteConnection, id: EmailId) -> Result<Option<Email>> {
        let row = sqlx::query(
            r"
            SELECT id, thread_id, parent_email_id, sender_account_id, subject,
                   body_text, body_html, message_identifier, created_at
            FROM emails
            WHERE id = ?
            ",
        )
        .bind(id.0)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(row.map(|r| row_to_email(&r)))
    }

    /// Insert a new email and assign its message identifier.
    ///
    /// The identifier is `<{unix-millis}.{email-id}@{domain}>`; the email id
    /// component makes it globally unique and never reused. Thread activity
    /// is deliberately not touched here; callers own that update.
    ///
    /// Returns the new id together with the generated identifier.
    pub(crate) async fn insert_in(
        conn: &mut SqliteConnection,
        new: &NewEmail,
        now: DateTime<Utc>,
        domain: &str,
    ) -> Result<(EmailId, String)> {
        let created = sqlx::query(
            r"
            INSERT INTO emails
                (thread_id, parent_email_id, sender_account_id, subject,
                 body_text, body_html, message_identifier, created_at)
            VALUES (?, ?, ?, ?, ?, ?, '', ?)
            ",
        )
        .bind(new.thread_id.0)
        .bind(new.parent_email_id.map(|id| id.0))
        .bind(new.sender_account_id.0)
        .bind(&new.subject)
        .bind(&new.body_text)
        .bind(new.body_html.as_deref())
        .bind(format_ts(now))
        .execute(&mut *conn)
        .await?;

        let id = EmailId(created.last_insert_rowid());
        let identifier = format!("<{}.{}@{}>", now.timestamp_millis(), id.0, domain);

        sqlx::query("UPDATE emails SET message_identifier = ? WHERE id = ?")
            .bind(&identifier)
            .bind(id.0)
            .execute(&mut *conn)
            .await?;

        Ok((id, identifier))
    }

    /// All emails of a thread, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_by_thread(&self, thread_id: ThreadId) -> Result<Vec<Email>> {
        let rows = sqlx::query(
            r"
            SELECT id, thread_id, parent_email_id, sender_account_id, subject,
                   body_text, body_html, message_identifier, created_at
            FROM emails
            WHERE thread_id = ?
            ORDER BY created_at ASC, id ASC
            ",
        )
        .bind(thread_id.0)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_email).collect())
    }

    /// Record a resolved recipient for an email.
    pub(crate) async fn add_recipient_in(
        conn: &mut SqliteConnection,
        email_id: EmailId,
        person_id: Option<PersonId>,
        address_id: EmailAddressId,
        kind: RecipientKind,
    ) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO email_recipients (email_id, person_id, email_address_id, kind)
            VALUES (?, ?, ?, ?)
            ",
        )
        .bind(email_id.0)
        .bind(person_id.map(|id| id.0))
        .bind(address_id.0)
        .bind(kind.as_str())
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// All recipient rows of an email.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn recipients(&self, email_id: EmailId) -> Result<Vec<EmailRecipient>> {
        let rows = sqlx::query(
            r"
            SELECT id, email_id, person_id, email_address_id, kind
            FROM email_recipients
            WHERE email_id = ?
            ORDER BY id
            ",
        )
        .bind(email_id.0)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| EmailRecipient {
                id: r.get("id"),
                email_id: EmailId(r.get("email_id")),
                person_id: r.get::<Option<i64>, _>("person_id").map(PersonId),
                email_address_id: EmailAddressId(r.get("email_address_id")),
                kind: RecipientKind::parse(&r.get::<String, _>("kind")),
            })
            .collect())
    }

    /// Record an attachment reference for an email.
    pub(crate) async fn add_attachment_in(
        conn: &mut SqliteConnection,
        email_id: EmailId,
        attachment: &AttachmentRef,
        now: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO email_attachments (email_id, file_path, filename, mimetype, size, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(email_id.0)
        .bind(&attachment.file_path)
        .bind(&attachment.filename)
        .bind(&attachment.mimetype)
        .bind(attachment.size)
        .bind(format_ts(now))
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// All attachment references of an email.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn attachments(&self, email_id: EmailId) -> Result<Vec<AttachmentRef>> {
        let rows = sqlx::query(
            r"
            SELECT file_path, filename, mimetype, size
            FROM email_attachments
            WHERE email_id = ?
            ORDER BY id
            ",
        )
        .bind(email_id.0)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| AttachmentRef {
                file_path: r.get("file_path"),
                filename: r.get("filename"),
                mimetype: r.get("mimetype"),
                size: r.get("size"),
            })
            .collect())
    }

    /// Move an email into another thread, clearing its parent pointer.
    ///
    /// Guarded on the expected current thread: returns `false` when the
    /// email was already moved by a concurrent writer (or no longer exists),
    /// in which case nothing was written.
    pub(crate) async fn move_to_thread_in(
        conn: &mut SqliteConnection,
        email_id: EmailId,
        expected_thread: ThreadId,
        new_thread: ThreadId,
    ) -> Result<bool> {
        let updated = sqlx::query(
            r"
            UPDATE emails
            SET thread_id = ?, parent_email_id = NULL
            WHERE id = ? AND thread_id = ?
            ",
        )
        .bind(new_thread.0)
        .bind(email_id.0)
        .bind(expected_thread.0)
        .execute(&mut *conn)
        .await?;

        Ok(updated.rows_affected() == 1)
    }
}

fn row_to_email(row: &SqliteRow) -> Email {
    Email {
        id: EmailId(row.get("id")),
        thread_id: ThreadId(row.get("thread_id")),
        parent_email_id: row.get::<Option<i64>, _>("parent_email_id").map(EmailId),
        sender_account_id: AccountId(row.get("sender_account_id")),
        subject: row.get("subject"),
        body_text: row.get("body_text"),
        body_html: row.get("body_html"),
        message_identifier: row.get("message_identifier"),
        created_at: parse_ts(&row.get::<String, _>("created_at")),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::thread::ThreadRepository;
    use chrono::TimeZone;

    fn ts(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 2, hour, minute, 0).unwrap()
    }

    async fn make_thread(db: &Database) -> ThreadId {
        ThreadRepository::new(db)
            .create("t", AccountId(1), None, ts(9, 0))
            .await
            .unwrap()
    }

    async fn insert(db: &Database, new: &NewEmail, now: DateTime<Utc>) -> (EmailId, String) {
        let mut conn = db.pool().acquire().await.unwrap();
        EmailRepository::insert_in(&mut conn, new, now, "mailweave.local")
            .await
            .unwrap()
    }

    fn new_email(thread_id: ThreadId, subject: &str) -> NewEmail {
        NewEmail {
            thread_id,
            parent_email_id: None,
            sender_account_id: AccountId(1),
            subject: subject.to_string(),
            body_text: "body".to_string(),
            body_html: None,
        }
    }

    #[tokio::test]
    async fn insert_assigns_message_identifier() {
        let db = Database::in_memory().await.unwrap();
        let thread = make_thread(&db).await;

        let (id, identifier) = insert(&db, &new_email(thread, "Hello"), ts(10, 0)).await;

        let email = EmailRepository::new(&db).get(id).await.unwrap().unwrap();
        assert_eq!(email.message_identifier, identifier);
        assert!(identifier.starts_with('<'));
        assert!(identifier.ends_with("@mailweave.local>"));
    }

    #[tokio::test]
    async fn message_identifiers_are_unique() {
        let db = Database::in_memory().await.unwrap();
        let thread = make_thread(&db).await;

        let (_, first) = insert(&db, &new_email(thread, "a"), ts(10, 0)).await;
        let (_, second) = insert(&db, &new_email(thread, "b"), ts(10, 0)).await;

        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn list_by_thread_is_oldest_first() {
        let db = Database::in_memory().await.unwrap();
        let thread = make_thread(&db).await;

        let (late, _) = insert(&db, &new_email(thread, "late"), ts(12, 0)).await;
        let (early, _) = insert(&db, &new_email(thread, "early"), ts(10, 0)).await;

        let emails = EmailRepository::new(&db).list_by_thread(thread).await.unwrap();
        assert_eq!(emails.len(), 2);
        assert_eq!(emails[0].id, early);
        assert_eq!(emails[1].id, late);
    }

    #[tokio::test]
    async fn recipients_roundtrip() {
        let db = Database::in_memory().await.unwrap();
        let thread = make_thread(&db).await;
        let (id, _) = insert(&db, &new_email(thread, "s"), ts(10, 0)).await;

        let mut conn = db.pool().acquire().await.unwrap();
        EmailRepository::add_recipient_in(
            &mut conn,
            id,
            Some(PersonId(5)),
            EmailAddressId(9),
            RecipientKind::To,
        )
        .await
        .unwrap();
        drop(conn);

        let recipients = EmailRepository::new(&db).recipients(id).await.unwrap();
        assert_eq!(recipients.len(), 1);
        assert_eq!(recipients[0].person_id, Some(PersonId(5)));
        assert_eq!(recipients[0].email_address_id, EmailAddressId(9));
        assert_eq!(recipients[0].kind, RecipientKind::To);
    }

    #[tokio::test]
    async fn attachments_roundtrip() {
        let db = Database::in_memory().await.unwrap();
        let thread = make_thread(&db).await;
        let (id, _) = insert(&db, &new_email(thread, "s"), ts(10, 0)).await;

        let attachment = AttachmentRef {
            file_path: "blobs/ab/cd.bin".to_string(),
            filename: "report.pdf".to_string(),
            mimetype: "application/pdf".to_string(),
            size: 8_192,
        };
        let mut conn = db.pool().acquire().await.unwrap();
        EmailRepository::add_attachment_in(&mut conn, id, &attachment, ts(10, 0))
            .await
            .unwrap();
        drop(conn);

        let stored = EmailRepository::new(&db).attachments(id).await.unwrap();
        assert_eq!(stored, vec![attachment]);
    }

    #[tokio::test]
    async fn move_to_thread_clears_parent() {
        let db = Database::in_memory().await.unwrap();
        let old_thread = make_thread(&db).await;
        let new_thread = make_thread(&db).await;

        let (root, _) = insert(&db, &new_email(old_thread, "root"), ts(10, 0)).await;
        let mut reply = new_email(old_thread, "Re: root");
        reply.parent_email_id = Some(root);
        let (reply_id, _) = insert(&db, &reply, ts(11, 0)).await;

        let mut conn = db.pool().acquire().await.unwrap();
        let moved = EmailRepository::move_to_thread_in(&mut conn, reply_id, old_thread, new_thread)
            .await
            .unwrap();
        drop(conn);
        assert!(moved);

        let email = EmailRepository::new(&db).get(reply_id).await.unwrap().unwrap();
        assert_eq!(email.thread_id, new_thread);
        assert_eq!(email.parent_email_id, None);
    }

    #[tokio::test]
    async fn move_to_thread_with_stale_expectation_writes_nothing() {
        let db = Database::in_memory().await.unwrap();
        let thread = make_thread(&db).await;
        let other = make_thread(&db).await;

        let (id, _) = insert(&db, &new_email(thread, "s"), ts(10, 0)).await;

        let mut conn = db.pool().acquire().await.unwrap();
        let moved = EmailRepository::move_to_thread_in(&mut conn, id, other, thread)
            .await
            .unwrap();
        drop(conn);
        assert!(!moved);

        let email = EmailRepository::new(&db).get(id).await.unwrap().unwrap();
        assert_eq!(email.thread_id, thread);
    }
}
