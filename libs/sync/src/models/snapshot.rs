//! Wire shapes of the two authoritative fetches.
//!
//! Parsing is deliberately lenient: absent or malformed fields degrade to
//! defaults rather than failing the whole response, and viewer counts accept
//! numbers, numeric strings, and floats — anything negative or non-numeric
//! collapses to 0. A fetch that fails outright is handled upstream as
//! "no change", never as "reset to empty".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::comment::Comment;
use super::product::Product;
use super::reaction::Reaction;
use crate::session::StreamStatus;

/// Stream metadata carried by the full authoritative snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LivestreamInfo {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: StreamStatus,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
}

/// Full session snapshot returned by the authoritative fetch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamSnapshot {
    #[serde(default)]
    pub livestream: Option<LivestreamInfo>,
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub reactions: Vec<Reaction>,
}

/// Viewer statistics returned by the lightweight authoritative fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewerStatsSnapshot {
    #[serde(
        default,
        rename = "currentViewers",
        alias = "current_viewers",
        alias = "current",
        deserialize_with = "lenient_count"
    )]
    pub current: u64,
    #[serde(
        default,
        rename = "peakViewers",
        alias = "peak_viewers",
        alias = "peak",
        deserialize_with = "lenient_count"
    )]
    pub peak: u64,
    #[serde(
        default,
        rename = "minViewers",
        alias = "min_viewers",
        alias = "min",
        deserialize_with = "lenient_count"
    )]
    pub min: u64,
}

impl ViewerStatsSnapshot {
    pub fn new(current: u64, peak: u64, min: u64) -> Self {
        Self { current, peak, min }
    }
}

fn lenient_count<'de, D>(de: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(de)?;
    Ok(sanitize_count(&value))
}

/// Reduce an arbitrary JSON value to a non-negative viewer count.
pub fn sanitize_count(value: &Value) -> u64 {
    match value {
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                u
            } else if let Some(f) = n.as_f64() {
                if f >= 0.0 {
                    f as u64
                } else {
                    0
                }
            } else {
                0
            }
        }
        Value::String(s) => {
            let trimmed = s.trim();
            trimmed
                .parse::<u64>()
                .ok()
                .or_else(|| {
                    trimmed
                        .parse::<f64>()
                        .ok()
                        .filter(|f| *f >= 0.0)
                        .map(|f| f as u64)
                })
                .unwrap_or(0)
        }
        _ => 0,
    }
}
