use crate::authz::catalog::EndpointPermissionCatalog;
use crate::authz::resolver::PermissionResolver;
use crate::cache::{create_cache, Cache, CacheBackend};
use crate::config::AuthHubConfig;
use crate::directory::{Directory, InMemoryDirectory};
use crate::errors::AuthError;
use crate::keys::KeyMaterial;
use crate::onboarding::{IdempotencyStore, OnboardingService};
use crate::token::blacklist::BlacklistStore;
use crate::token::lifecycle::TokenLifecycleService;
use crate::token::ratelimit::LoginRateLimiter;
use crate::token::refresh::RefreshTokenStore;
use crate::token::TokenCodec;
use std::sync::Arc;
use std::time::Duration;

/// Shared application state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AuthHubConfig>,
    pub cache: Arc<Cache>,
    pub keys: Arc<KeyMaterial>,
    pub codec: Arc<TokenCodec>,
    pub directory: Arc<dyn Directory>,
    pub lifecycle: Arc<TokenLifecycleService>,
    pub resolver: Arc<PermissionResolver>,
    pub catalog: Arc<EndpointPermissionCatalog>,
    pub onboarding: Arc<OnboardingService>,
}

impl AppState {
    pub async fn new(config: AuthHubConfig) -> Result<Self, AuthError> {
        let cache = Arc::new(create_cache(&config).await?);
        let directory: Arc<dyn Directory> = Arc::new(InMemoryDirectory::new());
        Self::with_parts(config, cache, directory)
    }

    /// Wire the state from preconstructed backends; the test fixture uses
    /// this to keep a handle on the directory it seeds.
    pub fn with_parts(
        config: AuthHubConfig,
        cache: Arc<Cache>,
        directory: Arc<dyn Directory>,
    ) -> Result<Self, AuthError> {
        let keys = Arc::new(KeyMaterial::load(&config.jwt)?);
        let codec = Arc::new(TokenCodec::new(keys.clone()));
        let resolver = Arc::new(PermissionResolver::new(directory.clone()));

        let lifecycle = Arc::new(TokenLifecycleService::new(
            TokenCodec::new(keys.clone()),
            RefreshTokenStore::new(cache.clone()),
            BlacklistStore::new(cache.clone()),
            LoginRateLimiter::new(cache.clone(), &config.rate_limit),
            PermissionResolver::new(directory.clone()),
            directory.clone(),
            Duration::from_secs(config.jwt.access_ttl),
            Duration::from_secs(config.jwt.refresh_ttl),
        ));
        let onboarding = Arc::new(OnboardingService::new(
            directory.clone(),
            IdempotencyStore::new(cache.clone()),
            config.idempotency_ttl,
        ));

        Ok(Self {
            config: Arc::new(config),
            cache,
            keys,
            codec,
            directory,
            lifecycle,
            resolver,
            catalog: Arc::new(EndpointPermissionCatalog::new()),
            onboarding,
        })
    }

    /// Deep health check of the backing token-state store.
    pub async fn health_check(&self) -> Result<(), String> {
        self.cache.health_check().await
    }
}
