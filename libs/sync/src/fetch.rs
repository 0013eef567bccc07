//! Collaborator contracts for the authoritative backend.
//!
//! Backed by REST in production (`livedeck-console`) and by in-memory fakes
//! in tests.

use async_trait::async_trait;

use crate::error::FetchError;
use crate::models::snapshot::{StreamSnapshot, ViewerStatsSnapshot};

/// Full-snapshot authoritative fetch. Idempotent and side-effect-free; a
/// failed call means "no change", never "reset to empty".
#[async_trait]
pub trait SnapshotFetcher: Send + Sync {
    async fn fetch_snapshot(&self, stream_id: &str) -> Result<StreamSnapshot, FetchError>;
}

/// Lighter-weight authoritative fetch for viewer statistics. May be served
/// by the same endpoint as the full snapshot.
#[async_trait]
pub trait ViewerStatsFetcher: Send + Sync {
    async fn fetch_viewer_stats(&self, stream_id: &str)
        -> Result<ViewerStatsSnapshot, FetchError>;
}

/// Mutation commands against the authoritative backend. The sync core only
/// reacts to their settlement: refetch on success, surface the error on
/// failure.
#[async_trait]
pub trait MutationCommands: Send + Sync {
    async fn pin_comment(&self, stream_id: &str, comment_id: &str) -> Result<(), FetchError>;
    async fn unpin_comment(&self, stream_id: &str, comment_id: &str) -> Result<(), FetchError>;
    async fn delete_comment(&self, stream_id: &str, comment_id: &str) -> Result<(), FetchError>;
    async fn submit_comment(&self, stream_id: &str, text: &str) -> Result<(), FetchError>;
}
