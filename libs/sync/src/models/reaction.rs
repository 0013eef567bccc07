use serde::{Deserialize, Serialize};

/// An aggregated reaction counter for a livestream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
    pub id: String,
    /// Reaction kind, e.g. "heart".
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub count: u64,
}
