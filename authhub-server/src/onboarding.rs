use crate::cache::{Cache, CacheBackend};
use crate::directory::{Directory, OnboardingBundle, TENANT_ADMIN_ROLE};
use crate::errors::AuthError;
use crate::models::{Credential, Organization, Tenant, User, UserRole, UserStatus};
use crate::password;
use chrono::Utc;
use log::info;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

const IDEMPOTENCY_KEY_PREFIX: &str = "idempotency::onboarding::";
const GENERATED_PASSWORD_LEN: usize = 24;

/// Request to provision a new tenant with its first admin user.
#[derive(Debug, Clone, Deserialize)]
pub struct OnboardingRequest {
    pub tenant_name: String,
    pub organization_name: String,
    pub admin_identifier: String,
    /// Optional initial password; a random one is generated when absent.
    pub admin_password: Option<String>,
}

/// Outcome of a completed onboarding, also cached for idempotent replay.
///
/// `temporary_password` is only set on the first response for a generated
/// password; replays return it again from the cached record until the
/// idempotency window closes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnboardingResult {
    pub tenant_id: Uuid,
    pub organization_id: Uuid,
    pub admin_user_id: Uuid,
    pub temporary_password: Option<String>,
}

/// Cached onboarding outcomes keyed by the caller's idempotency key.
#[derive(Clone)]
pub struct IdempotencyStore {
    cache: Arc<Cache>,
}

impl IdempotencyStore {
    pub fn new(cache: Arc<Cache>) -> Self {
        Self { cache }
    }

    fn key(idempotency_key: &str) -> String {
        format!("{IDEMPOTENCY_KEY_PREFIX}{idempotency_key}")
    }

    pub async fn find(&self, idempotency_key: &str) -> Result<Option<OnboardingResult>, AuthError> {
        Ok(self.cache.get(&Self::key(idempotency_key)).await?)
    }

    pub async fn record(
        &self,
        idempotency_key: &str,
        result: &OnboardingResult,
        ttl_secs: u64,
    ) -> Result<(), AuthError> {
        self.cache
            .set_ex(&Self::key(idempotency_key), result, ttl_secs)
            .await?;
        Ok(())
    }
}

/// Provisions tenants: tenant + first organization + admin user with the
/// global `TENANT_ADMIN` role, all persisted as one bundle.
pub struct OnboardingService {
    directory: Arc<dyn Directory>,
    idempotency: IdempotencyStore,
    result_ttl_secs: u64,
}

impl OnboardingService {
    pub fn new(
        directory: Arc<dyn Directory>,
        idempotency: IdempotencyStore,
        result_ttl_secs: u64,
    ) -> Self {
        Self {
            directory,
            idempotency,
            result_ttl_secs,
        }
    }

    fn validate(request: &OnboardingRequest) -> Result<(), AuthError> {
        if request.tenant_name.trim().is_empty() {
            return Err(AuthError::Validation("tenant_name must not be empty".into()));
        }
        if request.organization_name.trim().is_empty() {
            return Err(AuthError::Validation(
                "organization_name must not be empty".into(),
            ));
        }
        if request.admin_identifier.trim().is_empty() {
            return Err(AuthError::Validation(
                "admin_identifier must not be empty".into(),
            ));
        }
        if matches!(&request.admin_password, Some(p) if p.len() < 8) {
            return Err(AuthError::Validation(
                "admin_password must be at least 8 characters".into(),
            ));
        }
        Ok(())
    }

    /// Run an onboarding under the caller's idempotency key. A repeated key
    /// replays the stored result without touching the directory again.
    pub async fn onboard(
        &self,
        idempotency_key: &str,
        request: OnboardingRequest,
    ) -> Result<OnboardingResult, AuthError> {
        if idempotency_key.trim().is_empty() {
            return Err(AuthError::Validation("idempotency key must not be empty".into()));
        }
        if let Some(previous) = self.idempotency.find(idempotency_key).await? {
            info!(
                "replaying onboarding result for tenant {} (idempotent)",
                previous.tenant_id
            );
            return Ok(previous);
        }
        Self::validate(&request)?;

        if self.directory.tenant_name_exists(&request.tenant_name).await? {
            return Err(AuthError::DuplicateTenantName(request.tenant_name));
        }

        let (raw_password, temporary_password) = match request.admin_password {
            Some(password) => (password, None),
            None => {
                let generated = generate_password();
                (generated.clone(), Some(generated))
            }
        };
        let password_hash = password::hash(&raw_password)?;

        let admin_role = self
            .directory
            .find_global_role(TENANT_ADMIN_ROLE)
            .await?
            .ok_or_else(|| {
                AuthError::Internal(format!("global role {TENANT_ADMIN_ROLE} is not seeded"))
            })?;

        let now = Utc::now();
        let tenant = Tenant {
            id: Uuid::now_v7(),
            name: request.tenant_name,
            created_at: now,
        };
        let organization = Organization {
            id: Uuid::now_v7(),
            tenant_id: tenant.id,
            name: request.organization_name,
        };
        let user = User {
            id: Uuid::now_v7(),
            tenant_id: tenant.id,
            organization_id: organization.id,
            status: UserStatus::Active,
        };
        let credential = Credential {
            user_id: user.id,
            identifier: request.admin_identifier,
            password_hash,
        };
        let user_role = UserRole {
            user_id: user.id,
            role_id: admin_role.id,
            assigned_at: now,
        };

        let result = OnboardingResult {
            tenant_id: tenant.id,
            organization_id: organization.id,
            admin_user_id: user.id,
            temporary_password,
        };

        self.directory
            .persist_onboarding(OnboardingBundle {
                tenant,
                organization,
                user,
                credential,
                user_role,
            })
            .await?;

        // Record only after persistence succeeded; a failed onboarding must
        // stay retryable under the same key.
        self.idempotency
            .record(idempotency_key, &result, self.result_ttl_secs)
            .await?;

        info!(
            "onboarded tenant {} with admin user {}",
            result.tenant_id, result.admin_user_id
        );
        Ok(result)
    }
}

fn generate_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_PASSWORD_LEN)
        .map(char::from)
        .collect()
}
