//! Per-(email, account) triage status.
//!
//! Every account sees its own status for every email. Absence of a stored
//! row means `unread`; the one exception is the sender's own view, which the
//! send path writes explicitly as `sent`. The absence rule lives in a single
//! resolver ([`Status::resolve`]) rather than being scattered across call
//! sites.

mod model;
mod repository;

pub use model::{SetOutcome, Status, StatusRecord};
pub use repository::StatusRepository;
