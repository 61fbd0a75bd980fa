use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use utoipa::ToSchema;
use uuid::Uuid;

/// Lifecycle status of a user account. Only `Active` users may log in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    Active,
    Inactive,
    Locked,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub organization_id: Uuid,
    pub status: UserStatus,
}

/// Login credential. Exactly one per user in this deployment
/// (single credential type: identifier + password).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub user_id: Uuid,
    pub identifier: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
}

/// A role; `tenant_id = None` means the role is global.
/// Tenant-scoped roles are unique per (tenant, name), global roles per name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub name: String,
    pub is_system: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PermissionType {
    System,
    Custom,
}

/// A permission key in `resource:action` form (e.g. `user:read`).
/// Permissions are global, never tenant-scoped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Permission {
    pub id: Uuid,
    pub key: String,
    pub resource: String,
    pub action: String,
    pub kind: PermissionType,
}

/// user -> role assignment, unique per pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRole {
    pub user_id: Uuid,
    pub role_id: Uuid,
    pub assigned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlacklistReason {
    Logout,
    Rotated,
    AdminRevoke,
}

/// A revoked token id. The entry self-expires at the original token's
/// expiry, after which signature verification alone rejects the token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlacklistedToken {
    pub jti: String,
    pub reason: BlacklistReason,
    pub blacklisted_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Endpoint protection rule distributed to the Gateway.
///
/// `is_public = true` implies both required sets are empty. The `version`
/// field implements optimistic concurrency: updates must carry the version
/// they read and are rejected when it is stale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointPermission {
    pub id: Uuid,
    pub service_name: String,
    pub path: String,
    pub method: String,
    pub description: String,
    pub is_public: bool,
    pub required_permissions: BTreeSet<String>,
    pub required_roles: BTreeSet<String>,
    pub version: u64,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Read-only projection of one catalog entry, as served to the Gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EndpointPermissionView {
    pub service_name: String,
    pub path: String,
    pub method: String,
    pub description: String,
    pub is_public: bool,
    pub required_permissions: BTreeSet<String>,
    pub required_roles: BTreeSet<String>,
    pub version: u64,
}

impl From<&EndpointPermission> for EndpointPermissionView {
    fn from(entry: &EndpointPermission) -> Self {
        Self {
            service_name: entry.service_name.clone(),
            path: entry.path.clone(),
            method: entry.method.clone(),
            description: entry.description.clone(),
            is_public: entry.is_public,
            required_permissions: entry.required_permissions.clone(),
            required_roles: entry.required_roles.clone(),
            version: entry.version,
        }
    }
}

/// Snapshot of all non-deleted endpoint permissions, rebuilt on demand.
/// `version` is max(updated_at) in epoch millis, 0 when the catalog is empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PermissionSpec {
    pub version: i64,
    pub permissions: Vec<EndpointPermissionView>,
}

/// Flattened role and permission claims for one principal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolvedAuthority {
    pub roles: BTreeSet<String>,
    pub permissions: BTreeSet<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Allow,
    Deny,
}
