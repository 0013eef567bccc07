use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A chat comment attached to a livestream.
///
/// Deletion is soft: `is_deleted` flips once and the record stays in the
/// collection (and keeps its display position). Transition timestamps are
/// set by the backend exactly once and never cleared.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    #[serde(default)]
    pub text: String,
    /// Author user ID. Lookup reference only; author data is not embedded.
    #[serde(default)]
    pub author_ref: String,
    #[serde(default)]
    pub is_pinned: bool,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pinned_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub unpinned_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}
