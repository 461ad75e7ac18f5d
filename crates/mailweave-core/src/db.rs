//! Shared SQLite database handle and schema.
//!
//! All repositories operate on one pool so that multi-entity writes (send,
//! split) can run inside a single transaction.

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::Result;
use crate::config::StoreConfig;

/// Shared database handle.
pub struct Database {
    pool: SqlitePool,
    config: StoreConfig,
}

impl Database {
    /// Open (or create) the database described by the configuration.
    ///
    /// Creates the schema if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation
    /// fails.
    pub async fn connect(config: StoreConfig) -> Result<Self> {
        let url = format!("sqlite:{}?mode=rwc", config.database_path);
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&url)
            .await?;

        let db = Self { pool, config };
        db.initialize().await?;
        Ok(db)
    }

    /// Create an in-memory database for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation
    /// fails.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let db = Self {
            pool,
            config: StoreConfig::default(),
        };
        db.initialize().await?;
        Ok(db)
    }

    /// Initialize database schema.
    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS persons (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                account_id INTEGER UNIQUE,
                name TEXT NOT NULL DEFAULT '',
                avatar_path TEXT,
                bio TEXT,
                created_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS email_addresses (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                person_id INTEGER,
                address TEXT NOT NULL UNIQUE,
                is_primary INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS threads (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                subject TEXT NOT NULL DEFAULT '',
                creator_account_id INTEGER NOT NULL,
                group_id INTEGER,
                created_at TEXT NOT NULL,
                last_activity_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS emails (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                thread_id INTEGER NOT NULL,
                parent_email_id INTEGER,
                sender_account_id INTEGER NOT NULL,
                subject TEXT NOT NULL DEFAULT '',
                body_text TEXT NOT NULL DEFAULT '',
                body_html TEXT,
                message_identifier TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS email_statuses (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email_id INTEGER NOT NULL,
                account_id INTEGER NOT NULL,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE(email_id, account_id)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS email_recipients (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email_id INTEGER NOT NULL,
                person_id INTEGER,
                email_address_id INTEGER NOT NULL,
                kind TEXT NOT NULL DEFAULT 'to'
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS email_attachments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email_id INTEGER NOT NULL,
                file_path TEXT NOT NULL,
                filename TEXT NOT NULL,
                mimetype TEXT NOT NULL,
                size INTEGER NOT NULL,
                created_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        // Indexes for the feed ordering and per-thread email lookups
        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_threads_activity
            ON threads(last_activity_at DESC)
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_threads_group_activity
            ON threads(group_id, last_activity_at DESC)
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_emails_thread_created
            ON emails(thread_id, created_at)
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_recipients_email
            ON email_recipients(email_id)
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// The underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// The configuration this database was opened with.
    #[must_use]
    pub const fn config(&self) -> &StoreConfig {
        &self.config
    }
}

/// Format a timestamp for storage.
///
/// Fixed-width RFC 3339 with millisecond precision and a `Z` suffix, so
/// lexicographic ordering in SQL equals chronological ordering.
pub(crate) fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a stored timestamp, falling back to the epoch on corrupt data.
pub(crate) fn parse_ts(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .unwrap_or(DateTime::UNIX_EPOCH)
}
