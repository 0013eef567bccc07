//! Display ordering for the comment collection.
//!
//! Pinned comments sort before unpinned; within each partition, oldest
//! `created_at` first. Soft-deleted comments keep their position — deletion
//! only changes rendering treatment, never ordering.

use chrono::{DateTime, Utc};

use crate::models::comment::Comment;

/// Sort key timestamp. Comments lacking `created_at` sort as epoch 0
/// (oldest) — the backend occasionally omits the timestamp and this matches
/// the upstream fallback, so it is reproduced rather than repaired here.
fn created_at_or_epoch(comment: &Comment) -> DateTime<Utc> {
    comment.created_at.unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Produce the display order over a freshly fetched comment collection
/// (always a full replace, never an incremental patch).
///
/// The sort is stable: ties (same pinned state and `created_at`) preserve
/// input order, so repeated refetches of unchanged data don't jitter.
pub fn reorder(comments: &[Comment]) -> Vec<Comment> {
    let mut ordered = comments.to_vec();
    ordered.sort_by_key(|c| (!c.is_pinned, created_at_or_epoch(c)));
    ordered
}

/// Split an ordered collection into (pinned, unpinned) rendering regions.
///
/// The pinned region stays oldest-first; pin recency is deliberately not
/// part of the order.
pub fn partition_pinned(ordered: &[Comment]) -> (Vec<Comment>, Vec<Comment>) {
    ordered.iter().cloned().partition(|c| c.is_pinned)
}
