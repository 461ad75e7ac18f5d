//! Person identity and email address resolution.
//!
//! Many email addresses may reference one person; an address can also exist
//! before any person record has been resolved for it. The resolver looks up
//! an address by exact string match and lazily creates a person plus primary
//! address on first contact.

mod model;
mod repository;

pub use model::{AccountId, EmailAddress, EmailAddressId, Person, PersonId, ResolvedIdentity};
pub use repository::IdentityRepository;
