/// Console configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Dashboard API origin (e.g. `http://localhost:4000`).
    pub api_url: String,
    /// Push channel WebSocket URL (e.g. `ws://localhost:4000/realtime`).
    pub ws_url: String,
    /// Stream to attach to.
    pub stream_id: String,
    /// Authoritative viewer-stats polling interval in milliseconds.
    pub poll_interval_ms: u64,
    /// Whether this console session has moderator rights.
    pub moderator: bool,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Panics with a descriptive message if a required variable is missing.
    pub fn from_env() -> Self {
        Self {
            api_url: required_var("LIVEDECK_API_URL"),
            ws_url: required_var("LIVEDECK_WS_URL"),
            stream_id: required_var("LIVEDECK_STREAM_ID"),
            poll_interval_ms: std::env::var("LIVEDECK_POLL_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5000),
            moderator: std::env::var("LIVEDECK_MODERATOR")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        }
    }
}

fn required_var(name: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| panic!("{name} env var is required"))
}
