use crate::cache::{Cache, CacheBackend};
use crate::errors::AuthError;
use crate::models::BlacklistedToken;
use chrono::Utc;
use std::sync::Arc;

const KEY_PREFIX: &str = "blacklist::";

/// Revoked-token store, keyed by jti.
///
/// Entries carry a TTL equal to the revoked token's remaining lifetime,
/// so they evict themselves exactly when signature verification alone
/// would start rejecting the token anyway. `contains` is a single key
/// lookup; the store is consulted on every refresh.
#[derive(Clone)]
pub struct BlacklistStore {
    cache: Arc<Cache>,
}

impl BlacklistStore {
    pub fn new(cache: Arc<Cache>) -> Self {
        Self { cache }
    }

    fn key(jti: &str) -> String {
        format!("{KEY_PREFIX}{jti}")
    }

    /// Insert a revocation entry. Tokens already past their expiry are
    /// skipped: they can no longer verify, so there is nothing to revoke.
    /// The remaining lifetime rounds up to whole seconds, so the entry
    /// never evicts before the token itself expires.
    pub async fn add(&self, entry: &BlacklistedToken) -> Result<(), AuthError> {
        let remaining_ms = (entry.expires_at - Utc::now()).num_milliseconds();
        if remaining_ms <= 0 {
            return Ok(());
        }
        let ttl_secs = (remaining_ms as u64).div_ceil(1000);
        self.cache
            .set_ex(&Self::key(&entry.jti), entry, ttl_secs)
            .await?;
        Ok(())
    }

    pub async fn contains(&self, jti: &str) -> Result<bool, AuthError> {
        Ok(self
            .cache
            .get::<BlacklistedToken>(&Self::key(jti))
            .await?
            .is_some())
    }

    /// Explicit delete path for administrative un-revocation; expiry
    /// normally handles cleanup on its own.
    pub async fn remove(&self, jti: &str) -> Result<(), AuthError> {
        self.cache.delete(&Self::key(jti)).await?;
        Ok(())
    }
}
