//! Status storage repository.

use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqliteConnection, SqlitePool};
use tracing::info;

use super::model::{SetOutcome, Status, StatusRecord};
use crate::db::{Database, format_ts, parse_ts};
use crate::email::EmailId;
use crate::identity::AccountId;
use crate::{Error, Result};

/// Repository for per-(email, account) status rows.
pub struct StatusRepository {
    pool: SqlitePool,
}

impl StatusRepository {
    /// Create a repository over the shared database.
    #[must_use]
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }

    /// Upsert a status row for (email, account).
    ///
    /// A conflict with an existing row is an update, not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn set(
        &self,
        email_id: EmailId,
        account_id: AccountId,
        status: Status,
        now: DateTime<Utc>,
    ) -> Result<SetOutcome> {
        let mut conn = self.pool.acquire().await?;
        Self::set_in(&mut conn, email_id, account_id, status, now).await
    }

    /// Transaction-scoped variant of [`set`](Self::set).
    pub(crate) async fn set_in(
        conn: &mut SqliteConnection,
        email_id: EmailId,
        account_id: AccountId,
        status: Status,
        now: DateTime<Utc>,
    ) -> Result<SetOutcome> {
        let updated = sqlx::query(
            r"
            UPDATE email_statuses
            SET status = ?, updated_at = ?
            WHERE email_id = ? AND account_id = ?
            ",
        )
        .bind(status.as_str())
        .bind(format_ts(now))
        .bind(email_id.0)
        .bind(account_id.0)
        .execute(&mut *conn)
        .await?;

        if updated.rows_affected() > 0 {
            return Ok(SetOutcome::Updated);
        }

        let created = sqlx::query(
            r"
            INSERT INTO email_statuses (email_id, account_id, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ",
        )
        .bind(email_id.0)
        .bind(account_id.0)
        .bind(status.as_str())
        .bind(format_ts(now))
        .bind(format_ts(now))
        .execute(&mut *conn)
        .await?;

        Ok(SetOutcome::Created(created.last_insert_rowid()))
    }

    /// Set a status from a raw client-supplied value.
    ///
    /// Validates the wire string, rejects `sent` (reserved for the send
    /// path), and requires the email to exist.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an unknown value or `sent`; `EmailNotFound`
    /// when the email does not exist; otherwise a storage fault.
    pub async fn set_from_client(
        &self,
        email_id: EmailId,
        account_id: AccountId,
        value: &str,
        now: DateTime<Utc>,
    ) -> Result<SetOutcome> {
        let status = Status::parse(value)
            .ok_or_else(|| Error::InvalidArgument(format!("unknown status value: {value:?}")))?;
        if !status.is_client_settable() {
            return Err(Error::InvalidArgument(
                "status 'sent' is assigned internally and cannot be set".to_string(),
            ));
        }

        let exists = sqlx::query("SELECT id FROM emails WHERE id = ?")
            .bind(email_id.0)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Err(Error::EmailNotFound(email_id));
        }

        let outcome = self.set(email_id, account_id, status, now).await?;
        info!(email = email_id.0, account = account_id.0, status = status.as_str(), "status set");
        Ok(outcome)
    }

    /// The resolved status of an email for an account.
    ///
    /// Returns `unread` when no row exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get(&self, email_id: EmailId, account_id: AccountId) -> Result<Status> {
        let row = sqlx::query(
            r"
            SELECT status FROM email_statuses
            WHERE email_id = ? AND account_id = ?
            ",
        )
        .bind(email_id.0)
        .bind(account_id.0)
        .fetch_optional(&self.pool)
        .await?;

        Ok(Status::resolve(
            row.and_then(|r| Status::parse(&r.get::<String, _>("status"))),
        ))
    }

    /// The raw stored row for (email, account), if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn record(
        &self,
        email_id: EmailId,
        account_id: AccountId,
    ) -> Result<Option<StatusRecord>> {
        let row = sqlx::query(
            r"
            SELECT id, email_id, account_id, status, created_at, updated_at
            FROM email_statuses
            WHERE email_id = ? AND account_id = ?
            ",
        )
        .bind(email_id.0)
        .bind(account_id.0)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| StatusRecord {
            id: r.get("id"),
            email_id: EmailId(r.get("email_id")),
            account_id: AccountId(r.get("account_id")),
            status: Status::resolve(Status::parse(&r.get::<String, _>("status"))),
            created_at: parse_ts(&r.get::<String, _>("created_at")),
            updated_at: parse_ts(&r.get::<String, _>("updated_at")),
        }))
    }
}
