use super::{CacheBackend, CacheError};
use async_trait::async_trait;
use moka::future::Cache as MokaCache;
use moka::Expiry;
use serde::{de::DeserializeOwned, Serialize};
use std::time::{Duration, Instant};

#[derive(Clone)]
struct CacheEntry {
    payload: String,
    ttl: Option<Duration>,
}

/// Expiry policy that honors a per-entry TTL, falling back to the
/// cache-wide default when the entry carries none.
struct PerEntryExpiry {
    default_ttl: Duration,
}

impl Expiry<String, CacheEntry> for PerEntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        entry: &CacheEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(entry.ttl.unwrap_or(self.default_ttl))
    }
}

#[derive(Clone)]
pub struct InMemoryCache {
    cache: MokaCache<String, CacheEntry>,
}

impl InMemoryCache {
    /// Initialize a new in-memory cache instance
    pub fn new(ttl_secs: u64, capacity_mib: usize) -> Result<Self, String> {
        // Convert MiB to bytes for max_capacity (1 MiB = 1024 * 1024 bytes)
        let max_capacity_bytes: u64 = (capacity_mib * 1024 * 1024)
            .try_into()
            .map_err(|_| "Capacity overflow".to_string())?;

        let cache = MokaCache::builder()
            .expire_after(PerEntryExpiry {
                default_ttl: Duration::from_secs(ttl_secs),
            })
            .weigher(|_key, entry: &CacheEntry| -> u32 {
                entry.payload.len().try_into().unwrap_or(u32::MAX)
            })
            .max_capacity(max_capacity_bytes)
            .build();

        Ok(Self { cache })
    }
}

#[async_trait]
impl CacheBackend for InMemoryCache {
    async fn set<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<(), CacheError> {
        let serialized = serde_json::to_string(value)?;
        self.cache
            .insert(
                key.to_string(),
                CacheEntry {
                    payload: serialized,
                    ttl: None,
                },
            )
            .await;
        Ok(())
    }

    async fn set_ex<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl_secs: u64,
    ) -> Result<(), CacheError> {
        let serialized = serde_json::to_string(value)?;
        self.cache
            .insert(
                key.to_string(),
                CacheEntry {
                    payload: serialized,
                    ttl: Some(Duration::from_secs(ttl_secs)),
                },
            )
            .await;
        Ok(())
    }

    async fn get<T: DeserializeOwned + Send + Sync>(
        &self,
        key: &str,
    ) -> Result<Option<T>, CacheError> {
        if let Some(entry) = self.cache.get(key).await {
            serde_json::from_str(&entry.payload)
                .map_err(|e| CacheError::Deserialization(e.to_string()))
                .map(Some)
        } else {
            Ok(None)
        }
    }

    async fn incr(&self, key: &str, ttl_secs: u64) -> Result<u64, CacheError> {
        // entry().and_upsert_with serializes concurrent updates of the same
        // key, so the read-modify-write is atomic per counter. The expiry
        // policy only fires on create, so the window set on the first
        // increment survives later ones.
        let entry = self
            .cache
            .entry(key.to_string())
            .and_upsert_with(|existing| {
                let count = existing
                    .and_then(|e| e.value().payload.parse::<u64>().ok())
                    .unwrap_or(0)
                    .saturating_add(1);
                std::future::ready(CacheEntry {
                    payload: count.to_string(),
                    ttl: Some(Duration::from_secs(ttl_secs)),
                })
            })
            .await;

        entry
            .value()
            .payload
            .parse::<u64>()
            .map_err(|e| CacheError::Deserialization(e.to_string()))
    }

    async fn health_check(&self) -> Result<(), String> {
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.cache.remove(key).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct TestData {
        field: String,
    }

    #[tokio::test]
    async fn test_cache_operations() {
        let cache = InMemoryCache::new(1, 128).unwrap();

        let data = TestData {
            field: "test".to_string(),
        };

        // Test set and get
        cache.set("test_key", &data).await.unwrap();
        let retrieved: TestData = cache.get("test_key").await.unwrap().unwrap();
        assert_eq!(data, retrieved);

        // Test expiration via the default TTL
        tokio::time::sleep(std::time::Duration::from_secs(2)).await;
        assert!(cache.get::<TestData>("test_key").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_per_entry_ttl_overrides_default() {
        // Default is an hour; the entry expires after one second.
        let cache = InMemoryCache::new(3600, 128).unwrap();

        let data = TestData {
            field: "short-lived".to_string(),
        };
        cache.set_ex("short", &data, 1).await.unwrap();

        let retrieved: TestData = cache.get("short").await.unwrap().unwrap();
        assert_eq!(data, retrieved);

        tokio::time::sleep(std::time::Duration::from_secs(2)).await;
        assert!(cache.get::<TestData>("short").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_incr_counts_and_expires_with_window() {
        let cache = InMemoryCache::new(3600, 128).unwrap();

        assert_eq!(cache.incr("counter", 1).await.unwrap(), 1);
        assert_eq!(cache.incr("counter", 1).await.unwrap(), 2);
        assert_eq!(cache.incr("counter", 1).await.unwrap(), 3);

        // Once the window elapses the counter starts over.
        tokio::time::sleep(std::time::Duration::from_secs(2)).await;
        assert_eq!(cache.incr("counter", 1).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_health_check() {
        let cache = InMemoryCache::new(1, 128).unwrap();
        let result = cache.health_check().await;
        assert!(result.is_ok(), "health check failed: {:?}", result);
    }
}
