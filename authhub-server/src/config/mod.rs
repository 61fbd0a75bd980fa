pub(crate) use crate::config::cache::{CacheConfig, CacheStore};
pub(crate) use crate::config::jwt::JwtConfig;
pub(crate) use crate::config::rate_limit::RateLimitConfig;
use config::{Config as ConfigCrate, ConfigError};
use serde::Deserialize;

pub mod cache;
pub mod jwt;
pub mod rate_limit;

/// Main configuration structure for the AuthHub server
#[derive(Debug, Deserialize, Clone)]
pub struct AuthHubConfig {
    /// The port the server will listen to (default: 8970)
    #[serde(default = "default_port")]
    pub port: u16,

    /// TTL in seconds for stored onboarding idempotency records
    /// (default: 24 hours)
    #[serde(default = "default_idempotency_ttl")]
    pub idempotency_ttl: u64,

    /// JWT signing configuration
    #[serde(default)]
    pub jwt: JwtConfig,

    /// Cache configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// Login rate-limit configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

fn default_port() -> u16 {
    8970
}

fn default_idempotency_ttl() -> u64 {
    86_400
}

impl Default for AuthHubConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            idempotency_ttl: default_idempotency_ttl(),
            jwt: JwtConfig::default(),
            cache: CacheConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl AuthHubConfig {
    /// Creates a new config instance from AUTHHUB_* environment variables.
    ///
    /// Nesting uses a double underscore (`AUTHHUB_JWT__PRIVATE_KEY_PATH`
    /// maps to `jwt.private_key_path`); a single underscore stays part of
    /// the field name, so snake_case leaves remain addressable.
    pub fn new() -> Result<Self, String> {
        ConfigCrate::builder()
            .add_source(
                config::Environment::with_prefix("AUTHHUB")
                    .prefix_separator("_")
                    .separator("__")
                    .convert_case(config::Case::Snake),
            )
            .build()
            .map_err(|e: ConfigError| e.to_string())?
            .try_deserialize()
            .map_err(|e| e.to_string())
    }

    /// Configuration for tests: in-memory cache, short token validity,
    /// inline key material supplied by the fixture.
    #[cfg(test)]
    pub fn for_test(private_key_pem: String, public_key_pem: String) -> Self {
        use crate::config::cache::InMemoryConfig;

        Self {
            port: 0, // Let the OS choose a port
            idempotency_ttl: 3600,
            jwt: JwtConfig {
                key_id: "test-key".to_string(),
                private_key: private_key_pem,
                private_key_path: String::new(),
                public_key: public_key_pem,
                public_key_path: String::new(),
                access_ttl: 3600,
                refresh_ttl: 7200,
            },
            cache: CacheConfig {
                ttl: 60,
                store: CacheStore::InMemory,
                memory: InMemoryConfig { capacity: 16 },
                ..Default::default()
            },
            rate_limit: RateLimitConfig::default(),
        }
    }
}
