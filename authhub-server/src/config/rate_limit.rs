use serde::Deserialize;

/// Login rate-limit configuration.
///
/// Failed login attempts are counted per identifier in the cache
/// backend; once the count exceeds `max_attempts` inside a `window`,
/// further logins for that identifier are rejected with 429 until the
/// window expires. A successful login clears the counter.
#[derive(Debug, Deserialize, Clone)]
pub struct RateLimitConfig {
    /// Attempts allowed per identifier within one window (default: 5)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u64,

    /// Counting window in seconds (default: 5 minutes)
    #[serde(default = "default_window")]
    pub window: u64,
}

fn default_max_attempts() -> u64 {
    5
}

fn default_window() -> u64 {
    300
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            window: default_window(),
        }
    }
}
