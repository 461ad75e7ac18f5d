//! Identity data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for an authenticated account.
///
/// Accounts are owned by the external authentication layer; the core treats
/// them as opaque ids linked 1:1 to a [`Person`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(pub i64);

impl AccountId {
    /// Create a new account ID.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PersonId(pub i64);

impl PersonId {
    /// Create a new person ID.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for PersonId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an email address record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmailAddressId(pub i64);

impl EmailAddressId {
    /// Create a new email address ID.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for EmailAddressId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A person identity record.
#[derive(Debug, Clone, Serialize)]
pub struct Person {
    /// Unique identifier.
    pub id: PersonId,
    /// Linked account, if this person has authenticated.
    pub account_id: Option<AccountId>,
    /// Display name.
    pub name: String,
    /// Avatar reference path.
    pub avatar_path: Option<String>,
    /// Short biography.
    pub bio: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// An email address, optionally linked to a person.
#[derive(Debug, Clone, Serialize)]
pub struct EmailAddress {
    /// Unique identifier.
    pub id: EmailAddressId,
    /// Owning person, if resolved.
    pub person_id: Option<PersonId>,
    /// The address string.
    pub address: String,
    /// Whether this is the person's primary address.
    ///
    /// At most one primary address per person is authoritative for outbound
    /// From resolution; enforcement is best-effort, not transactional.
    pub is_primary: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Result of resolving a raw address string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedIdentity {
    /// The linked person, if any.
    ///
    /// `None` only for pre-existing addresses whose person link was never
    /// established; freshly created addresses always carry one.
    pub person_id: Option<PersonId>,
    /// The address record.
    pub address_id: EmailAddressId,
}
