use crate::authz::resolver::PermissionResolver;
use crate::directory::Directory;
use crate::errors::AuthError;
use crate::models::{BlacklistReason, BlacklistedToken, TokenType, UserStatus};
use crate::password;
use crate::token::blacklist::BlacklistStore;
use crate::token::ratelimit::LoginRateLimiter;
use crate::token::refresh::RefreshTokenStore;
use crate::token::{TokenClaimsContext, TokenCodec};
use chrono::{DateTime, TimeZone, Utc};
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Tokens returned by a successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user_id: Uuid,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
}

/// A fresh access token from a refresh exchange. The refresh token
/// itself is not rotated; it stays valid until its own expiry or logout.
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub user_id: Uuid,
    pub access_token: String,
    pub expires_in: u64,
}

/// Orchestrates login, refresh and logout across the codec, the
/// refresh-token and blacklist stores, and the directory.
pub struct TokenLifecycleService {
    codec: TokenCodec,
    refresh_tokens: RefreshTokenStore,
    blacklist: BlacklistStore,
    rate_limiter: LoginRateLimiter,
    resolver: PermissionResolver,
    directory: Arc<dyn Directory>,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenLifecycleService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        codec: TokenCodec,
        refresh_tokens: RefreshTokenStore,
        blacklist: BlacklistStore,
        rate_limiter: LoginRateLimiter,
        resolver: PermissionResolver,
        directory: Arc<dyn Directory>,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            codec,
            refresh_tokens,
            blacklist,
            rate_limiter,
            resolver,
            directory,
            access_ttl,
            refresh_ttl,
        }
    }

    /// Authenticate a credential and issue a fresh token pair. Issuing a
    /// new refresh token replaces any previous one for the same user.
    pub async fn login(&self, identifier: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        // Counted before the credential check, so failed guesses fill
        // the window.
        self.rate_limiter.check_login(identifier).await?;

        let credential = self
            .directory
            .find_credential(identifier)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        if !password::verify(password, &credential.password_hash) {
            debug!("password mismatch for credential {identifier}");
            return Err(AuthError::InvalidCredentials);
        }

        let user = self
            .directory
            .find_user(credential.user_id)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        if user.status != UserStatus::Active {
            return Err(AuthError::InvalidUserState(user.status));
        }

        let authority = self.resolver.resolve(user.id).await?;
        let context = TokenClaimsContext {
            user_id: user.id,
            tenant_id: user.tenant_id,
            organization_id: user.organization_id,
            roles: authority.roles.into_iter().collect(),
            permissions: authority.permissions.into_iter().collect(),
        };

        let access = self.codec.sign_access(&context, self.access_ttl)?;
        let refresh = self.codec.sign_refresh(user.id, self.refresh_ttl)?;
        self.refresh_tokens
            .save(user.id, &refresh.value, self.refresh_ttl.as_secs())
            .await?;
        self.rate_limiter.clear(identifier, user.id).await?;

        info!("issued token pair for user {}", user.id);
        Ok(LoginOutcome {
            user_id: user.id,
            access_token: access.value,
            refresh_token: refresh.value,
            expires_in: self.access_ttl.as_secs(),
        })
    }

    /// Exchange a valid, stored, non-blacklisted refresh token for a new
    /// access token. Authority is re-resolved so role changes since login
    /// take effect here.
    pub async fn refresh(&self, refresh_token: &str) -> Result<RefreshOutcome, AuthError> {
        let claims = self.codec.verify(refresh_token)?;
        if claims.token_type != TokenType::Refresh {
            return Err(AuthError::InvalidToken(
                "access token presented as refresh token".to_string(),
            ));
        }

        let user_id = self
            .refresh_tokens
            .find_user_by_token(refresh_token)
            .await?
            .ok_or(AuthError::TokenNotFound)?;

        if self.blacklist.contains(&claims.jti).await? {
            warn!("blacklisted refresh token presented for user {user_id}");
            return Err(AuthError::Blacklisted(claims.jti));
        }

        let user = self
            .directory
            .find_user(user_id)
            .await?
            .ok_or(AuthError::UserNotFound(user_id))?;
        if user.status != UserStatus::Active {
            return Err(AuthError::InvalidUserState(user.status));
        }

        let authority = self.resolver.resolve(user.id).await?;
        let context = TokenClaimsContext {
            user_id: user.id,
            tenant_id: user.tenant_id,
            organization_id: user.organization_id,
            roles: authority.roles.into_iter().collect(),
            permissions: authority.permissions.into_iter().collect(),
        };
        let access = self.codec.sign_access(&context, self.access_ttl)?;

        debug!("refreshed access token for user {}", user.id);
        Ok(RefreshOutcome {
            user_id: user.id,
            access_token: access.value,
            expires_in: self.access_ttl.as_secs(),
        })
    }

    /// Invalidate the user's refresh token: the stored pair is deleted
    /// and the token's jti is blacklisted until its natural expiry.
    /// Logging out a user with no stored token is a no-op, so logout is
    /// idempotent.
    pub async fn logout(&self, user_id: Uuid) -> Result<(), AuthError> {
        let Some(token) = self.refresh_tokens.delete_by_user(user_id).await? else {
            debug!("logout for user {user_id} with no stored refresh token");
            return Ok(());
        };

        // The deleted token may already be expired; expiry makes the
        // blacklist entry unnecessary, not the logout invalid.
        match self.codec.verify(&token) {
            Ok(claims) => {
                self.blacklist
                    .add(&BlacklistedToken {
                        jti: claims.jti,
                        reason: BlacklistReason::Logout,
                        blacklisted_at: Utc::now(),
                        expires_at: timestamp_to_datetime(claims.exp),
                    })
                    .await?;
            }
            Err(AuthError::ExpiredToken) => {}
            Err(err) => {
                warn!("stored refresh token for user {user_id} failed verification: {err}");
            }
        }

        info!("logged out user {user_id}");
        Ok(())
    }
}

fn timestamp_to_datetime(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or_else(Utc::now)
}
