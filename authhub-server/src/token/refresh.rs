use crate::cache::{Cache, CacheBackend};
use crate::errors::AuthError;
use log::{error, warn};
use std::sync::Arc;
use uuid::Uuid;

const USER_KEY_PREFIX: &str = "refresh_token::user::";
const TOKEN_KEY_PREFIX: &str = "refresh_token::token::";

/// Bidirectional refresh-token store.
///
/// Each live refresh token occupies two entries with identical TTLs:
/// `refresh_token::user::{userId}` -> token and
/// `refresh_token::token::{token}` -> userId. The pair is created and
/// destroyed together; a user has at most one active refresh token, and
/// saving a new one silently replaces the previous pair.
#[derive(Clone)]
pub struct RefreshTokenStore {
    cache: Arc<Cache>,
}

impl RefreshTokenStore {
    pub fn new(cache: Arc<Cache>) -> Self {
        Self { cache }
    }

    fn user_key(user_id: Uuid) -> String {
        format!("{USER_KEY_PREFIX}{user_id}")
    }

    fn token_key(token: &str) -> String {
        format!("{TOKEN_KEY_PREFIX}{token}")
    }

    /// Write both directions with the same TTL. If the reverse write
    /// fails the forward entry is rolled back so the pair is never
    /// half-present. Any previous token of the user is evicted first,
    /// otherwise its reverse entry would stay exchangeable until TTL.
    pub async fn save(&self, user_id: Uuid, token: &str, ttl_secs: u64) -> Result<(), AuthError> {
        if let Some(previous) = self.find_by_user(user_id).await? {
            if previous != token {
                self.cache.delete(&Self::token_key(&previous)).await?;
            }
        }

        let user_key = Self::user_key(user_id);
        let token_key = Self::token_key(token);

        self.cache
            .set_ex(&user_key, &token.to_string(), ttl_secs)
            .await?;

        if let Err(err) = self
            .cache
            .set_ex(&token_key, &user_id.to_string(), ttl_secs)
            .await
        {
            if let Err(rollback) = self.cache.delete(&user_key).await {
                // Forward entry survived without its reverse twin; the
                // TTL will eventually clear it, but flag it loudly.
                error!(
                    "refresh token store inconsistent for user {user_id}: \
                     reverse write failed ({err}) and rollback failed ({rollback})"
                );
            }
            return Err(err.into());
        }
        Ok(())
    }

    pub async fn find_by_user(&self, user_id: Uuid) -> Result<Option<String>, AuthError> {
        Ok(self.cache.get::<String>(&Self::user_key(user_id)).await?)
    }

    pub async fn find_user_by_token(&self, token: &str) -> Result<Option<Uuid>, AuthError> {
        let Some(raw) = self.cache.get::<String>(&Self::token_key(token)).await? else {
            return Ok(None);
        };
        match Uuid::parse_str(&raw) {
            Ok(user_id) => Ok(Some(user_id)),
            Err(_) => {
                warn!("discarding corrupt refresh token entry: {raw:?} is not a user id");
                Ok(None)
            }
        }
    }

    /// Delete the pair starting from the forward entry. Returns the
    /// deleted token, if one was stored.
    pub async fn delete_by_user(&self, user_id: Uuid) -> Result<Option<String>, AuthError> {
        let Some(token) = self.find_by_user(user_id).await? else {
            return Ok(None);
        };
        self.cache.delete(&Self::user_key(user_id)).await?;
        self.cache.delete(&Self::token_key(&token)).await?;
        Ok(Some(token))
    }

    /// Delete the pair starting from the reverse entry. Returns the
    /// owning user id, if the token was stored.
    pub async fn delete_by_token(&self, token: &str) -> Result<Option<Uuid>, AuthError> {
        let Some(user_id) = self.find_user_by_token(token).await? else {
            return Ok(None);
        };
        self.cache.delete(&Self::token_key(token)).await?;
        self.cache.delete(&Self::user_key(user_id)).await?;
        Ok(Some(user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::memory::InMemoryCache;

    fn store() -> RefreshTokenStore {
        let cache = Cache::InMemory(InMemoryCache::new(60, 16).unwrap());
        RefreshTokenStore::new(Arc::new(cache))
    }

    #[tokio::test]
    async fn test_save_creates_both_directions() {
        let store = store();
        let user_id = Uuid::now_v7();

        store.save(user_id, "tok-1", 60).await.unwrap();

        assert_eq!(
            store.find_by_user(user_id).await.unwrap(),
            Some("tok-1".to_string())
        );
        assert_eq!(
            store.find_user_by_token("tok-1").await.unwrap(),
            Some(user_id)
        );
    }

    #[tokio::test]
    async fn test_save_replaces_previous_token_for_user() {
        let store = store();
        let user_id = Uuid::now_v7();

        store.save(user_id, "tok-old", 60).await.unwrap();
        store.save(user_id, "tok-new", 60).await.unwrap();

        assert_eq!(
            store.find_by_user(user_id).await.unwrap(),
            Some("tok-new".to_string())
        );
        assert_eq!(
            store.find_user_by_token("tok-new").await.unwrap(),
            Some(user_id)
        );
        // The replaced token's reverse entry is evicted, not left to TTL.
        assert_eq!(store.find_user_by_token("tok-old").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_by_user_removes_both() {
        let store = store();
        let user_id = Uuid::now_v7();

        store.save(user_id, "tok-1", 60).await.unwrap();
        let deleted = store.delete_by_user(user_id).await.unwrap();

        assert_eq!(deleted, Some("tok-1".to_string()));
        assert_eq!(store.find_by_user(user_id).await.unwrap(), None);
        assert_eq!(store.find_user_by_token("tok-1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_by_token_removes_both() {
        let store = store();
        let user_id = Uuid::now_v7();

        store.save(user_id, "tok-1", 60).await.unwrap();
        let deleted = store.delete_by_token("tok-1").await.unwrap();

        assert_eq!(deleted, Some(user_id));
        assert_eq!(store.find_by_user(user_id).await.unwrap(), None);
        assert_eq!(store.find_user_by_token("tok-1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_missing_is_a_noop() {
        let store = store();
        assert_eq!(store.delete_by_user(Uuid::now_v7()).await.unwrap(), None);
        assert_eq!(store.delete_by_token("ghost").await.unwrap(), None);
    }
}
