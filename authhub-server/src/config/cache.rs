use serde::Deserialize;

/// Specifies which cache store implementation to use
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CacheStore {
    InMemory,
    Redis,
    #[serde(other)]
    #[default]
    None,
}

/// Configuration for the token-state stores (refresh tokens, blacklist,
/// idempotency records).
#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    /// Default TTL in seconds for entries written without an explicit one
    /// (default: 1 hour). Token-state entries always carry their own TTL.
    #[serde(default = "default_ttl")]
    pub ttl: u32,

    /// Cache store type: "in-memory", "redis", or null (default)
    #[serde(default)]
    pub store: CacheStore,

    /// In-memory cache specific configuration
    #[serde(default)]
    pub memory: InMemoryConfig,

    /// Redis cache specific configuration
    #[serde(default)]
    pub redis: RedisConfig,
}

fn default_ttl() -> u32 {
    3600 // 1 hour
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: default_ttl(),
            store: CacheStore::None,
            memory: InMemoryConfig::default(),
            redis: RedisConfig::default(),
        }
    }
}

/// In-memory cache configuration options
#[derive(Debug, Deserialize, Clone)]
pub struct InMemoryConfig {
    /// Maximum capacity in MiB (default: 128 MiB)
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

fn default_capacity() -> usize {
    128 // MiB
}

impl Default for InMemoryConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
        }
    }
}

/// Redis cache configuration options
#[derive(Debug, Deserialize, Clone, Default)]
pub struct RedisConfig {
    /// Redis connection string
    #[serde(default)]
    pub url: String,
}
