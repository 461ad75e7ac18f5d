//! Thread storage repository.

use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqliteConnection, SqlitePool, SqliteRow};

use super::model::{GroupId, Thread, ThreadId};
use crate::Result;
use crate::db::{Database, format_ts, parse_ts};
use crate::identity::AccountId;

/// Repository for conversation threads.
pub struct ThreadRepository {
    pool: SqlitePool,
}

impl ThreadRepository {
    /// Create a repository over the shared database.
    #[must_use]
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }

    /// Create a new thread.
    ///
    /// `activity_ts` becomes both `created_at` and `last_activity_at`; the
    /// caller supplies it so that split can stamp the action time rather
    /// than the split email's original timestamp.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn create(
        &self,
        subject: &str,
        creator: AccountId,
        group_id: Option<GroupId>,
        activity_ts: DateTime<Utc>,
    ) -> Result<ThreadId> {
        let mut conn = self.pool.acquire().await?;
        Self::insert_in(&mut conn, subject, creator, group_id, activity_ts).await
    }

    /// Transaction-scoped variant of [`create`](Self::create).
    pub(crate) async fn insert_in(
        conn: &mut SqliteConnection,
        subject: &str,
        creator: AccountId,
        group_id: Option<GroupId>,
        activity_ts: DateTime<Utc>,
    ) -> Result<ThreadId> {
        let created = sqlx::query(
            r"
            INSERT INTO threads (subject, creator_account_id, group_id, created_at, last_activity_at)
            VALUES (?, ?, ?, ?, ?)
            ",
        )
        .bind(subject)
        .bind(creator.0)
        .bind(group_id.map(|id| id.0))
        .bind(format_ts(activity_ts))
        .bind(format_ts(activity_ts))
        .execute(&mut *conn)
        .await?;

        Ok(ThreadId(created.last_insert_rowid()))
    }

    /// Get a thread by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get(&self, id: ThreadId) -> Result<Option<Thread>> {
        let row = sqlx::query(
            r"
            SELECT id, subject, creator_account_id, group_id, created_at, last_activity_at
            FROM threads
            WHERE id = ?
            ",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| row_to_thread(&r)))
    }

    /// Advance a thread's `last_activity_at`.
    pub(crate) async fn touch_activity_in(
        conn: &mut SqliteConnection,
        id: ThreadId,
        ts: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query("UPDATE threads SET last_activity_at = ? WHERE id = ?")
            .bind(format_ts(ts))
            .bind(id.0)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }

    /// Recompute a thread's `last_activity_at` after an email was removed
    /// from it.
    ///
    /// Uses the maximum `created_at` among the thread's remaining emails,
    /// falling back to the thread's own creation time when none remain, and
    /// to `now` when even that is unavailable.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn recompute_activity(&self, id: ThreadId, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let mut conn = self.pool.acquire().await?;
        Self::recompute_activity_in(&mut conn, id, now).await
    }

    /// Transaction-scoped variant of
    /// [`recompute_activity`](Self::recompute_activity).
    pub(crate) async fn recompute_activity_in(
        conn: &mut SqliteConnection,
        id: ThreadId,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>> {
        let latest_email: Option<String> =
            sqlx::query_scalar("SELECT MAX(created_at) FROM emails WHERE thread_id = ?")
                .bind(id.0)
                .fetch_one(&mut *conn)
                .await?;

        let activity = if let Some(raw) = latest_email {
            parse_ts(&raw)
        } else {
            tracing::warn!(thread = id.0, "recomputing activity for a thread with no emails");
            let created: Option<String> =
                sqlx::query_scalar("SELECT created_at FROM threads WHERE id = ?")
                    .bind(id.0)
                    .fetch_optional(&mut *conn)
                    .await?;
            created.as_deref().map_or(now, parse_ts)
        };

        sqlx::query("UPDATE threads SET last_activity_at = ? WHERE id = ?")
            .bind(format_ts(activity))
            .bind(id.0)
            .execute(&mut *conn)
            .await?;

        Ok(activity)
    }
}

fn row_to_thread(row: &SqliteRow) -> Thread {
    Thread {
        id: ThreadId(row.get("id")),
        subject: row.get("subject"),
        creator_account_id: AccountId(row.get("creator_account_id")),
        group_id: row.get::<Option<i64>, _>("group_id").map(GroupId),
        created_at: parse_ts(&row.get::<String, _>("created_at")),
        last_activity_at: parse_ts(&row.get::<String, _>("last_activity_at")),
    }
}
