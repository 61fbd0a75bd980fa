use crate::cache::{Cache, CacheBackend};
use crate::config::RateLimitConfig;
use crate::errors::AuthError;
use log::{debug, warn};
use std::sync::Arc;
use uuid::Uuid;

const LOGIN_KEY_PREFIX: &str = "rate_limit::login::";

/// Fixed-window login throttle backed by the cache.
///
/// Every login attempt bumps `rate_limit::login::{identifier}`; the
/// counter is created with the window's TTL and expires on its own, so
/// there is nothing to sweep. Attempts past `max_attempts` are rejected
/// until the window rolls over. A successful login deletes the counter.
#[derive(Clone)]
pub struct LoginRateLimiter {
    cache: Arc<Cache>,
    max_attempts: u64,
    window_secs: u64,
}

impl LoginRateLimiter {
    pub fn new(cache: Arc<Cache>, config: &RateLimitConfig) -> Self {
        Self {
            cache,
            max_attempts: config.max_attempts,
            window_secs: config.window,
        }
    }

    fn login_key(identifier: &str) -> String {
        format!("{LOGIN_KEY_PREFIX}{identifier}")
    }

    /// Count this attempt and reject it once the identifier exceeds the
    /// allowance. The attempt is counted before the credential is
    /// checked, so hammering a wrong password locks the window too.
    pub async fn check_login(&self, identifier: &str) -> Result<(), AuthError> {
        let attempts = self
            .cache
            .incr(&Self::login_key(identifier), self.window_secs)
            .await?;
        if attempts > self.max_attempts {
            warn!("login rate limit hit for identifier {identifier} ({attempts} attempts)");
            return Err(AuthError::RateLimited);
        }
        Ok(())
    }

    /// Clear the counter after a successful login.
    pub async fn clear(&self, identifier: &str, user_id: Uuid) -> Result<(), AuthError> {
        self.cache.delete(&Self::login_key(identifier)).await?;
        debug!("cleared login attempt counter for user {user_id}");
        Ok(())
    }
}
