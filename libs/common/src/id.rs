use ulid::Ulid;

/// Generates a new ULID-based ID with the given prefix.
///
/// # Examples
/// ```
/// let id = livedeck_common::id::prefixed_ulid("stm");
/// assert!(id.starts_with("stm_"));
/// ```
pub fn prefixed_ulid(prefix: &str) -> String {
    format!("{}_{}", prefix, Ulid::new().to_string())
}

/// Marker trait for types that represent a prefixed ID.
pub trait PrefixedId {
    const PREFIX: &'static str;

    fn generate() -> String {
        prefixed_ulid(Self::PREFIX)
    }
}

/// Well-known ID prefixes.
pub mod prefix {
    pub const STREAM: &str = "stm";
    pub const COMMENT: &str = "cmt";
    pub const PRODUCT: &str = "prd";
    pub const REACTION: &str = "rct";
    pub const USER: &str = "usr";
    pub const SESSION: &str = "ses";
}
