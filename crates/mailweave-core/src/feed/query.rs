//! Feed and thread-view queries.

use std::collections::HashMap;

use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqliteRow};

use super::model::{FeedEmail, FeedPage, FeedQuery, FeedThread, Pagination};
use crate::db::{Database, parse_ts};
use crate::email::EmailId;
use crate::identity::AccountId;
use crate::status::Status;
use crate::thread::{GroupId, ThreadId};
use crate::{Error, Result};

/// Fetch one page of the activity feed for an account.
///
/// Threads are ordered by `last_activity_at` descending and paginated with
/// the group filter alone; the status filter then narrows the emails inside
/// the selected threads. A thread can therefore appear with zero visible
/// emails, and `total_items`/`total_pages` can overstate the filtered view.
///
/// # Errors
///
/// `InvalidArgument` when `page` or `limit` is zero; otherwise a storage
/// fault.
pub async fn fetch_feed(db: &Database, query: &FeedQuery) -> Result<FeedPage> {
    if query.page < 1 {
        return Err(Error::InvalidArgument("page must be at least 1".to_string()));
    }
    if query.limit < 1 {
        return Err(Error::InvalidArgument("limit must be at least 1".to_string()));
    }

    let pool = db.pool();

    let total_items = count_threads(pool, query.group_id).await?;
    let offset = i64::from(query.page - 1) * i64::from(query.limit);

    let rows = match query.group_id {
        Some(group) => {
            sqlx::query(
                r"
                SELECT id, subject, group_id, created_at, last_activity_at
                FROM threads
                WHERE group_id = ?
                ORDER BY last_activity_at DESC, id DESC
                LIMIT ? OFFSET ?
                ",
            )
            .bind(group.0)
            .bind(i64::from(query.limit))
            .bind(offset)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query(
                r"
                SELECT id, subject, group_id, created_at, last_activity_at
                FROM threads
                ORDER BY last_activity_at DESC, id DESC
                LIMIT ? OFFSET ?
                ",
            )
            .bind(i64::from(query.limit))
            .bind(offset)
            .fetch_all(pool)
            .await?
        }
    };

    let mut threads: Vec<FeedThread> = rows.iter().map(row_to_feed_thread).collect();

    if !threads.is_empty() {
        let ids: Vec<ThreadId> = threads.iter().map(|t| t.id).collect();
        let emails = load_emails(pool, &ids, query.account_id).await?;
        distribute(&mut threads, emails, query.status);
    }

    Ok(FeedPage {
        threads,
        pagination: Pagination {
            page: query.page,
            limit: query.limit,
            total_items,
            total_pages: total_items.div_ceil(u64::from(query.limit)),
        },
    })
}

/// Fetch a single thread with its emails and participants, statuses
/// resolved for the viewing account.
///
/// When the viewer has authored none of the emails but has a person record,
/// their name is appended to the participant list.
///
/// # Errors
///
/// `ThreadNotFound` when the thread does not exist; otherwise a storage
/// fault.
pub async fn fetch_thread_view(
    db: &Database,
    thread_id: ThreadId,
    viewer: AccountId,
) -> Result<FeedThread> {
    let pool = db.pool();

    let row = sqlx::query(
        r"
        SELECT id, subject, group_id, created_at, last_activity_at
        FROM threads
        WHERE id = ?
        ",
    )
    .bind(thread_id.0)
    .fetch_optional(pool)
    .await?
    .ok_or(Error::ThreadNotFound(thread_id))?;

    let mut threads = vec![row_to_feed_thread(&row)];
    let emails = load_emails(pool, &[thread_id], viewer).await?;
    distribute(&mut threads, emails, None);

    let mut thread = threads.remove(0);

    let viewer_is_author = thread.emails.iter().any(|e| e.sender_account_id == viewer);
    if !viewer_is_author {
        let viewer_name: Option<String> =
            sqlx::query_scalar("SELECT name FROM persons WHERE account_id = ?")
                .bind(viewer.0)
                .fetch_optional(pool)
                .await?;
        if let Some(name) = viewer_name
            && !name.is_empty()
            && !thread.participants.contains(&name)
        {
            thread.participants.push(name);
        }
    }

    Ok(thread)
}

/// Count threads under the group filter only. The status filter is
/// deliberately not part of this count.
async fn count_threads(pool: &SqlitePool, group_id: Option<GroupId>) -> Result<u64> {
    let count: i64 = match group_id {
        Some(group) => {
            sqlx::query_scalar("SELECT COUNT(*) FROM threads WHERE group_id = ?")
                .bind(group.0)
                .fetch_one(pool)
                .await?
        }
        None => {
            sqlx::query_scalar("SELECT COUNT(*) FROM threads")
                .fetch_one(pool)
                .await?
        }
    };

    Ok(u64::try_from(count).unwrap_or(0))
}

/// Load all emails of the given threads, joined to their sender's person
/// record and the viewer's status rows.
async fn load_emails(
    pool: &SqlitePool,
    thread_ids: &[ThreadId],
    viewer: AccountId,
) -> Result<Vec<FeedEmail>> {
    let placeholders = vec!["?"; thread_ids.len()].join(", ");
    let sql = format!(
        "SELECT e.id, e.thread_id, e.parent_email_id, e.sender_account_id, e.subject, \
                e.body_text, e.body_html, e.message_identifier, e.created_at, \
                p.name AS sender_name, s.status AS viewer_status \
         FROM emails e \
         LEFT JOIN persons p ON p.account_id = e.sender_account_id \
         LEFT JOIN email_statuses s ON s.email_id = e.id AND s.account_id = ? \
         WHERE e.thread_id IN ({placeholders}) \
         ORDER BY e.created_at ASC, e.id ASC"
    );

    let mut query = sqlx::query(&sql).bind(viewer.0);
    for id in thread_ids {
        query = query.bind(id.0);
    }

    let rows = query.fetch_all(pool).await?;
    Ok(rows.iter().map(row_to_feed_email).collect())
}

/// Group emails into their threads, applying the status filter and deriving
/// participants and unread counts from the visible emails.
fn distribute(threads: &mut [FeedThread], emails: Vec<FeedEmail>, status: Option<Status>) {
    let index: HashMap<i64, usize> = threads
        .iter()
        .enumerate()
        .map(|(position, thread)| (thread.id.0, position))
        .collect();

    for email in emails {
        if let Some(wanted) = status
            && email.status != wanted
        {
            continue;
        }
        let Some(&position) = index.get(&email.thread_id.0) else {
            continue;
        };
        let thread = &mut threads[position];
        if email.status == Status::Unread {
            thread.unread_count += 1;
        }
        if !email.sender_name.is_empty() && !thread.participants.contains(&email.sender_name) {
            thread.participants.push(email.sender_name.clone());
        }
        thread.emails.push(email);
    }
}

fn row_to_feed_thread(row: &SqliteRow) -> FeedThread {
    FeedThread {
        id: ThreadId(row.get("id")),
        subject: row.get("subject"),
        group_id: row.get::<Option<i64>, _>("group_id").map(GroupId),
        created_at: parse_ts(&row.get::<String, _>("created_at")),
        last_activity_at: parse_ts(&row.get::<String, _>("last_activity_at")),
        participants: Vec::new(),
        unread_count: 0,
        emails: Vec::new(),
    }
}

fn row_to_feed_email(row: &SqliteRow) -> FeedEmail {
    FeedEmail {
        id: EmailId(row.get("id")),
        thread_id: ThreadId(row.get("thread_id")),
        parent_email_id: row.get::<Option<i64>, _>("parent_email_id").map(EmailId),
        sender_account_id: AccountId(row.get("sender_account_id")),
        sender_name: row.get::<Option<String>, _>("sender_name").unwrap_or_default(),
        subject: row.get("subject"),
        body_text: row.get("body_text"),
        body_html: row.get("body_html"),
        message_identifier: row.get("message_identifier"),
        created_at: parse_ts(&row.get::<String, _>("created_at")),
        status: Status::resolve(
            row.get::<Option<String>, _>("viewer_status")
                .as_deref()
                .and_then(Status::parse),
        ),
    }
}
