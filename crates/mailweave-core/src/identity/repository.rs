//! Identity storage and address resolution.

use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqliteConnection, SqlitePool, SqliteRow};

use super::model::{AccountId, EmailAddress, EmailAddressId, Person, PersonId, ResolvedIdentity};
use crate::Result;
use crate::db::{Database, format_ts, parse_ts};

/// Repository for persons and email addresses.
pub struct IdentityRepository {
    pool: SqlitePool,
}

impl IdentityRepository {
    /// Create a repository over the shared database.
    #[must_use]
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }

    /// Resolve a raw address string to a person and address record.
    ///
    /// Looks up the address by exact string match. On a miss, creates a new
    /// person (named after the address) and a primary address for it, both
    /// in one transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn resolve(&self, address: &str, now: DateTime<Utc>) -> Result<ResolvedIdentity> {
        let mut tx = self.pool.begin().await?;
        let resolved = Self::resolve_in(&mut tx, address, now).await?;
        tx.commit().await?;
        Ok(resolved)
    }

    /// Transaction-scoped variant of [`resolve`](Self::resolve).
    pub(crate) async fn resolve_in(
        conn: &mut SqliteConnection,
        address: &str,
        now: DateTime<Utc>,
    ) -> Result<ResolvedIdentity> {
        let existing = sqlx::query("SELECT id, person_id FROM email_addresses WHERE address = ?")
            .bind(address)
            .fetch_optional(&mut *conn)
            .await?;

        if let Some(row) = existing {
            return Ok(ResolvedIdentity {
                person_id: row.get::<Option<i64>, _>("person_id").map(PersonId),
                address_id: EmailAddressId(row.get("id")),
            });
        }

        // First contact: the address string doubles as the display name
        // until a profile is filled in.
        let person = sqlx::query("INSERT INTO persons (name, created_at) VALUES (?, ?)")
            .bind(address)
            .bind(format_ts(now))
            .execute(&mut *conn)
            .await?;
        let person_id = PersonId(person.last_insert_rowid());

        let created = sqlx::query(
            r"
            INSERT INTO email_addresses (person_id, address, is_primary, created_at)
            VALUES (?, ?, 1, ?)
            ",
        )
        .bind(person_id.0)
        .bind(address)
        .bind(format_ts(now))
        .execute(&mut *conn)
        .await?;

        Ok(ResolvedIdentity {
            person_id: Some(person_id),
            address_id: EmailAddressId(created.last_insert_rowid()),
        })
    }

    /// Create a person record directly.
    ///
    /// This is the write path used by the external person directory; the
    /// resolver only ever creates persons implicitly.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn create_person(
        &self,
        name: &str,
        account_id: Option<AccountId>,
        now: DateTime<Utc>,
    ) -> Result<PersonId> {
        let created = sqlx::query("INSERT INTO persons (account_id, name, created_at) VALUES (?, ?, ?)")
            .bind(account_id.map(|id| id.0))
            .bind(name)
            .bind(format_ts(now))
            .execute(&self.pool)
            .await?;

        Ok(PersonId(created.last_insert_rowid()))
    }

    /// Attach an address to an existing person.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn add_address(
        &self,
        person_id: PersonId,
        address: &str,
        is_primary: bool,
        now: DateTime<Utc>,
    ) -> Result<EmailAddressId> {
        let created = sqlx::query(
            r"
            INSERT INTO email_addresses (person_id, address, is_primary, created_at)
            VALUES (?, ?, ?, ?)
            ",
        )
        .bind(person_id.0)
        .bind(address)
        .bind(is_primary)
        .bind(format_ts(now))
        .execute(&self.pool)
        .await?;

        Ok(EmailAddressId(created.last_insert_rowid()))
    }

    /// Get a person by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn person(&self, id: PersonId) -> Result<Option<Person>> {
        let row = sqlx::query(
            r"
            SELECT id, account_id, name, avatar_path, bio, created_at
            FROM persons
            WHERE id = ?
            ",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| row_to_person(&r)))
    }

    /// Get the person linked to an account, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn person_for_account(&self, account_id: AccountId) -> Result<Option<Person>> {
        let row = sqlx::query(
            r"
            SELECT id, account_id, name, avatar_path, bio, created_at
            FROM persons
            WHERE account_id = ?
            ",
        )
        .bind(account_id.0)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| row_to_person(&r)))
    }

    /// Find an address record by exact string match.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_address(&self, address: &str) -> Result<Option<EmailAddress>> {
        let row = sqlx::query(
            r"
            SELECT id, person_id, address, is_primary, created_at
            FROM email_addresses
            WHERE address = ?
            ",
        )
        .bind(address)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| EmailAddress {
            id: EmailAddressId(r.get("id")),
            person_id: r.get::<Option<i64>, _>("person_id").map(PersonId),
            address: r.get("address"),
            is_primary: r.get("is_primary"),
            created_at: parse_ts(&r.get::<String, _>("created_at")),
        }))
    }

    /// The primary address string for a person, if one is set.
    ///
    /// When several rows claim the primary flag (the invariant is
    /// best-effort) the oldest one wins.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn primary_address(&self, person_id: PersonId) -> Result<Option<String>> {
        let row = sqlx::query(
            r"
            SELECT address FROM email_addresses
            WHERE person_id = ? AND is_primary = 1
            ORDER BY id
            LIMIT 1
            ",
        )
        .bind(person_id.0)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.get("address")))
    }
}

fn row_to_person(row: &SqliteRow) -> Person {
    Person {
        id: PersonId(row.get("id")),
        account_id: row.get::<Option<i64>, _>("account_id").map(AccountId),
        name: row.get("name"),
        avatar_path: row.get("avatar_path"),
        bio: row.get("bio"),
        created_at: parse_ts(&row.get::<String, _>("created_at")),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 2, 10, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn resolve_creates_person_and_primary_address() {
        let db = Database::in_memory().await.unwrap();
        let repo = IdentityRepository::new(&db);

        let resolved = repo.resolve("ada@example.com", fixed_now()).await.unwrap();
        let person_id = resolved.person_id.unwrap();

        let person = repo.person(person_id).await.unwrap().unwrap();
        assert_eq!(person.name, "ada@example.com");
        assert!(person.account_id.is_none());

        let address = repo.find_address("ada@example.com").await.unwrap().unwrap();
        assert_eq!(address.id, resolved.address_id);
        assert_eq!(address.person_id, Some(person_id));
        assert!(address.is_primary);
    }

    #[tokio::test]
    async fn resolve_is_idempotent() {
        let db = Database::in_memory().await.unwrap();
        let repo = IdentityRepository::new(&db);

        let first = repo.resolve("bob@example.com", fixed_now()).await.unwrap();
        let second = repo.resolve("bob@example.com", fixed_now()).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn resolve_matches_exact_string_only() {
        let db = Database::in_memory().await.unwrap();
        let repo = IdentityRepository::new(&db);

        let lower = repo.resolve("carol@example.com", fixed_now()).await.unwrap();
        let upper = repo.resolve("Carol@example.com", fixed_now()).await.unwrap();

        assert_ne!(lower.address_id, upper.address_id);
    }

    #[tokio::test]
    async fn primary_address_for_created_person() {
        let db = Database::in_memory().await.unwrap();
        let repo = IdentityRepository::new(&db);

        let person_id = repo
            .create_person("Dana", Some(AccountId::new(9)), fixed_now())
            .await
            .unwrap();
        repo.add_address(person_id, "dana@example.com", true, fixed_now())
            .await
            .unwrap();
        repo.add_address(person_id, "d.other@example.com", false, fixed_now())
            .await
            .unwrap();

        let primary = repo.primary_address(person_id).await.unwrap();
        assert_eq!(primary.as_deref(), Some("dana@example.com"));

        let person = repo.person_for_account(AccountId::new(9)).await.unwrap().unwrap();
        assert_eq!(person.id, person_id);
        assert_eq!(person.name, "Dana");
    }

    #[tokio::test]
    async fn person_for_unknown_account_is_none() {
        let db = Database::in_memory().await.unwrap();
        let repo = IdentityRepository::new(&db);

        assert!(repo.person_for_account(AccountId::new(404)).await.unwrap().is_none());
    }
}
