use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

pub mod memory;
pub mod null;
pub mod redis;

/// Errors that can occur during cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Failed to serialize value: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Failed to parse value: {0}")]
    Deserialization(String),
    #[error("Redis error: {0}")]
    Redis(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Cache trait defining the interface for all cache implementations.
///
/// All token-state stores (refresh tokens, blacklist, idempotency records)
/// sit on top of this interface, so the backend can be swapped between an
/// in-memory cache and Redis without touching the stores.
///
/// Implementations must be thread-safe (Send + Sync) and cloneable to
/// support sharing across handlers.
#[async_trait::async_trait]
pub trait CacheBackend: Send + Sync {
    /// Store a value in the cache with the backend's default TTL
    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T)
        -> Result<(), CacheError>;

    /// Store a value with an explicit per-entry TTL in seconds.
    ///
    /// The stores need this: refresh tokens expire with their own
    /// validity window, blacklist entries with the revoked token's
    /// remaining lifetime, idempotency records with the caller's TTL.
    async fn set_ex<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl_secs: u64,
    ) -> Result<(), CacheError>;

    /// Retrieve a value from the cache
    async fn get<T: DeserializeOwned + Send + Sync>(
        &self,
        key: &str,
    ) -> Result<Option<T>, CacheError>;

    /// Atomically increment a counter, creating it with the given TTL.
    /// The TTL is fixed when the counter is created; later increments do
    /// not extend the window. Returns the post-increment value.
    async fn incr(&self, key: &str, ttl_secs: u64) -> Result<u64, CacheError>;

    /// Performs a deep health check on the cache backend.
    /// For Redis this pings the server; for the in-memory cache it is a no-op.
    async fn health_check(&self) -> Result<(), String>;

    /// Delete a value from the cache
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

/// Cache implementation that provides a uniform interface regardless of backend.
///
/// The concrete implementation is chosen at runtime from the application
/// configuration.
#[derive(Clone)]
pub enum Cache {
    /// In-memory cache implementation using Moka
    InMemory(memory::InMemoryCache),
    /// Redis-based cache implementation
    Redis(redis::RedisCache),
    /// No-op cache implementation that doesn't actually cache anything
    Null(null::NullCache),
}

#[async_trait::async_trait]
impl CacheBackend for Cache {
    async fn set<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<(), CacheError> {
        match self {
            Self::InMemory(cache) => cache.set(key, value).await,
            Self::Redis(cache) => cache.set(key, value).await,
            Self::Null(cache) => cache.set(key, value).await,
        }
    }

    async fn set_ex<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl_secs: u64,
    ) -> Result<(), CacheError> {
        match self {
            Self::InMemory(cache) => cache.set_ex(key, value, ttl_secs).await,
            Self::Redis(cache) => cache.set_ex(key, value, ttl_secs).await,
            Self::Null(cache) => cache.set_ex(key, value, ttl_secs).await,
        }
    }

    async fn get<T: DeserializeOwned + Send + Sync>(
        &self,
        key: &str,
    ) -> Result<Option<T>, CacheError> {
        match self {
            Self::InMemory(cache) => cache.get(key).await,
            Self::Redis(cache) => cache.get(key).await,
            Self::Null(cache) => cache.get(key).await,
        }
    }

    async fn incr(&self, key: &str, ttl_secs: u64) -> Result<u64, CacheError> {
        match self {
            Self::InMemory(cache) => cache.incr(key, ttl_secs).await,
            Self::Redis(cache) => cache.incr(key, ttl_secs).await,
            Self::Null(cache) => cache.incr(key, ttl_secs).await,
        }
    }

    async fn health_check(&self) -> Result<(), String> {
        match self {
            Self::InMemory(cache) => cache.health_check().await,
            Self::Redis(cache) => cache.health_check().await,
            Self::Null(cache) => cache.health_check().await,
        }
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        match self {
            Self::InMemory(cache) => cache.delete(key).await,
            Self::Redis(cache) => cache.delete(key).await,
            Self::Null(cache) => cache.delete(key).await,
        }
    }
}

/// Factory function to create the appropriate cache implementation based on
/// configuration.
pub async fn create_cache(config: &crate::config::AuthHubConfig) -> Result<Cache, CacheError> {
    match config.cache.store {
        crate::config::CacheStore::InMemory => {
            let cache =
                memory::InMemoryCache::new(config.cache.ttl as u64, config.cache.memory.capacity)
                    .map_err(CacheError::Config)?;
            Ok(Cache::InMemory(cache))
        }
        crate::config::CacheStore::Redis => {
            if config.cache.redis.url.is_empty() {
                return Err(CacheError::Config(
                    "Redis URL is required for Redis cache".to_string(),
                ));
            }
            let cache = redis::RedisCache::new(&config.cache.redis.url, config.cache.ttl as u64)
                .await
                .map_err(CacheError::Config)?;
            Ok(Cache::Redis(cache))
        }
        crate::config::CacheStore::None => {
            let cache = null::NullCache::new();
            Ok(Cache::Null(cache))
        }
    }
}
