use thiserror::Error;

/// Errors surfaced by the collaborator interfaces (authoritative fetches and
/// mutation commands).
#[derive(Debug, Error)]
pub enum FetchError {
    /// The stream does not exist on the authoritative backend.
    #[error("stream not found")]
    NotFound,
    /// Transport-level failure (connection refused, timeout, non-2xx status).
    #[error("transport error: {0}")]
    Transport(String),
    /// The response arrived but could not be decoded.
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Errors surfaced by the session controller.
///
/// Only `SessionNotFound`, `PermissionDenied`, and `Mutation` are meant for
/// the user; transient fetch failures are logged and recovered internally.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Terminal: the initial authoritative fetch found no such stream. The
    /// session should be abandoned, not retried.
    #[error("livestream {0} not found")]
    SessionNotFound(String),
    /// The local actor lacks moderator rights for this command. Rejected
    /// before any network call.
    #[error("permission denied: {0}")]
    PermissionDenied(&'static str),
    /// A mutation command failed on the backend.
    #[error("mutation failed: {0}")]
    Mutation(#[source] FetchError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
}
