use crate::errors::AuthError;
use crate::models::{
    Credential, Organization, Permission, PermissionType, Role, Tenant, User, UserRole, UserStatus,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Name of the seeded global role granted to every onboarded tenant admin.
pub const TENANT_ADMIN_ROLE: &str = "TENANT_ADMIN";

/// Everything the onboarding flow persists as one unit: a tenant, its
/// first organization, the admin user with credential, and the admin
/// role grant. Partial persistence is never observable.
#[derive(Debug, Clone)]
pub struct OnboardingBundle {
    pub tenant: Tenant,
    pub organization: Organization,
    pub user: User,
    pub credential: Credential,
    pub user_role: UserRole,
}

/// Port to the relational identity store.
///
/// Only the operations the token lifecycle, permission resolution and
/// onboarding flows need are exposed here; entity administration lives
/// outside this engine.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn find_credential(&self, identifier: &str) -> Result<Option<Credential>, AuthError>;
    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>, AuthError>;
    async fn roles_for_user(&self, user_id: Uuid) -> Result<Vec<Role>, AuthError>;
    async fn permissions_for_roles(&self, role_ids: &[Uuid]) -> Result<Vec<Permission>, AuthError>;
    async fn find_global_role(&self, name: &str) -> Result<Option<Role>, AuthError>;
    async fn tenant_name_exists(&self, name: &str) -> Result<bool, AuthError>;
    async fn persist_onboarding(&self, bundle: OnboardingBundle) -> Result<(), AuthError>;
}

#[derive(Default)]
struct DirectoryInner {
    tenants: HashMap<Uuid, Tenant>,
    organizations: HashMap<Uuid, Organization>,
    users: HashMap<Uuid, User>,
    credentials: HashMap<String, Credential>,
    roles: HashMap<Uuid, Role>,
    permissions: HashMap<Uuid, Permission>,
    role_permissions: HashSet<(Uuid, Uuid)>,
    user_roles: Vec<UserRole>,
}

/// In-memory directory adapter.
///
/// A single RwLock over the whole relation set doubles as the unit-of-work
/// boundary: `persist_onboarding` runs under one write guard, which is the
/// in-memory equivalent of the single transaction the onboarding bundle
/// requires.
#[derive(Clone)]
pub struct InMemoryDirectory {
    inner: Arc<RwLock<DirectoryInner>>,
}

impl InMemoryDirectory {
    /// Create a directory pre-seeded with the global `TENANT_ADMIN` role
    /// and its system permissions.
    pub fn new() -> Self {
        let mut inner = DirectoryInner::default();

        let admin_role = Role {
            id: Uuid::now_v7(),
            tenant_id: None,
            name: TENANT_ADMIN_ROLE.to_string(),
            is_system: true,
        };
        for key in ["tenant:*", "organization:*", "user:*", "role:*"] {
            let (resource, action) = key.split_once(':').unwrap_or((key, "*"));
            let permission = Permission {
                id: Uuid::now_v7(),
                key: key.to_string(),
                resource: resource.to_string(),
                action: action.to_string(),
                kind: PermissionType::System,
            };
            inner
                .role_permissions
                .insert((admin_role.id, permission.id));
            inner.permissions.insert(permission.id, permission);
        }
        inner.roles.insert(admin_role.id, admin_role);

        Self {
            inner: Arc::new(RwLock::new(inner)),
        }
    }

    // --- administration plumbing (used by bootstrap and tests) ---

    pub async fn add_user(
        &self,
        user: User,
        identifier: &str,
        password_hash: &str,
    ) -> Result<(), AuthError> {
        let mut inner = self.inner.write().await;
        let credential = Credential {
            user_id: user.id,
            identifier: identifier.to_string(),
            password_hash: password_hash.to_string(),
        };
        inner.credentials.insert(credential.identifier.clone(), credential);
        inner.users.insert(user.id, user);
        Ok(())
    }

    pub async fn set_user_status(&self, user_id: Uuid, status: UserStatus) {
        let mut inner = self.inner.write().await;
        if let Some(user) = inner.users.get_mut(&user_id) {
            user.status = status;
        }
    }

    /// Register a role; tenant-scoped roles are unique per (tenant, name),
    /// global roles per name.
    pub async fn add_role(&self, role: Role) -> Result<(), AuthError> {
        let mut inner = self.inner.write().await;
        let clash = inner
            .roles
            .values()
            .any(|r| r.name == role.name && r.tenant_id == role.tenant_id);
        if clash {
            return Err(AuthError::DuplicateRoleName(role.name));
        }
        inner.roles.insert(role.id, role);
        Ok(())
    }

    pub async fn add_permission(&self, permission: Permission) -> Result<(), AuthError> {
        let mut inner = self.inner.write().await;
        if inner.permissions.values().any(|p| p.key == permission.key) {
            return Err(AuthError::DuplicatePermissionKey(permission.key));
        }
        inner.permissions.insert(permission.id, permission);
        Ok(())
    }

    /// Attach a permission to a role. Duplicate pairs collapse silently.
    pub async fn grant_permission(&self, role_id: Uuid, permission_id: Uuid) {
        let mut inner = self.inner.write().await;
        inner.role_permissions.insert((role_id, permission_id));
    }

    /// Assign a role to a user. Duplicate pairs collapse silently.
    pub async fn assign_role(&self, user_id: Uuid, role_id: Uuid) {
        let mut inner = self.inner.write().await;
        if inner
            .user_roles
            .iter()
            .any(|ur| ur.user_id == user_id && ur.role_id == role_id)
        {
            return;
        }
        inner.user_roles.push(UserRole {
            user_id,
            role_id,
            assigned_at: Utc::now(),
        });
    }
}

impl Default for InMemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Directory for InMemoryDirectory {
    async fn find_credential(&self, identifier: &str) -> Result<Option<Credential>, AuthError> {
        let inner = self.inner.read().await;
        Ok(inner.credentials.get(identifier).cloned())
    }

    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>, AuthError> {
        let inner = self.inner.read().await;
        Ok(inner.users.get(&user_id).cloned())
    }

    async fn roles_for_user(&self, user_id: Uuid) -> Result<Vec<Role>, AuthError> {
        let inner = self.inner.read().await;
        let roles = inner
            .user_roles
            .iter()
            .filter(|ur| ur.user_id == user_id)
            .filter_map(|ur| inner.roles.get(&ur.role_id).cloned())
            .collect();
        Ok(roles)
    }

    async fn permissions_for_roles(&self, role_ids: &[Uuid]) -> Result<Vec<Permission>, AuthError> {
        let inner = self.inner.read().await;
        let permissions = inner
            .role_permissions
            .iter()
            .filter(|(role_id, _)| role_ids.contains(role_id))
            .filter_map(|(_, permission_id)| inner.permissions.get(permission_id).cloned())
            .collect();
        Ok(permissions)
    }

    async fn find_global_role(&self, name: &str) -> Result<Option<Role>, AuthError> {
        let inner = self.inner.read().await;
        Ok(inner
            .roles
            .values()
            .find(|r| r.tenant_id.is_none() && r.name == name)
            .cloned())
    }

    async fn tenant_name_exists(&self, name: &str) -> Result<bool, AuthError> {
        let inner = self.inner.read().await;
        Ok(inner.tenants.values().any(|t| t.name == name))
    }

    async fn persist_onboarding(&self, bundle: OnboardingBundle) -> Result<(), AuthError> {
        let mut inner = self.inner.write().await;
        // Re-check under the write guard; two racing onboardings for the
        // same tenant name must not both commit.
        if inner.tenants.values().any(|t| t.name == bundle.tenant.name) {
            return Err(AuthError::DuplicateTenantName(bundle.tenant.name));
        }
        inner.tenants.insert(bundle.tenant.id, bundle.tenant);
        inner
            .organizations
            .insert(bundle.organization.id, bundle.organization);
        inner
            .credentials
            .insert(bundle.credential.identifier.clone(), bundle.credential);
        inner.users.insert(bundle.user.id, bundle.user);
        inner.user_roles.push(bundle.user_role);
        Ok(())
    }
}
