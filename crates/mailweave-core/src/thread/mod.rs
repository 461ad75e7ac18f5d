//! Conversation threads.
//!
//! A thread groups one or more emails and is ordered in the feed by
//! `last_activity_at`, which always equals the timestamp of the most recent
//! event affecting the thread. It never regresses except as a direct
//! consequence of the most-recent email being split out.

mod model;
mod repository;

pub use model::{GroupId, Thread, ThreadId};
pub use repository::ThreadRepository;
