use crate::authz::has_permission;
use crate::errors::AuthError;
use crate::models::{
    Decision, EndpointPermission, EndpointPermissionView, PermissionSpec, ResolvedAuthority,
};
use chrono::Utc;
use std::collections::{BTreeSet, HashMap};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Fields accepted when registering or updating a catalog entry.
#[derive(Debug, Clone)]
pub struct EndpointPermissionInput {
    pub service_name: String,
    pub path: String,
    pub method: String,
    pub description: String,
    pub is_public: bool,
    pub required_permissions: BTreeSet<String>,
    pub required_roles: BTreeSet<String>,
}

/// Registry of endpoint protection rules served to the Gateway.
///
/// Entries are soft-deleted so the spec version still moves when a rule
/// disappears; reads only ever see live entries.
pub struct EndpointPermissionCatalog {
    entries: RwLock<HashMap<Uuid, EndpointPermission>>,
}

impl EndpointPermissionCatalog {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn validate(input: &EndpointPermissionInput) -> Result<(), AuthError> {
        if input.service_name.trim().is_empty() {
            return Err(AuthError::Validation("service_name must not be empty".into()));
        }
        if !input.path.starts_with('/') {
            return Err(AuthError::Validation("path must start with '/'".into()));
        }
        if input.method.trim().is_empty() {
            return Err(AuthError::Validation("method must not be empty".into()));
        }
        if input.is_public
            && !(input.required_permissions.is_empty() && input.required_roles.is_empty())
        {
            return Err(AuthError::Validation(
                "public endpoints must not carry required roles or permissions".into(),
            ));
        }
        Ok(())
    }

    /// Register a new rule. The (service, path, method) triple is unique
    /// among live entries; entries start at version 1.
    pub async fn create(
        &self,
        input: EndpointPermissionInput,
    ) -> Result<EndpointPermission, AuthError> {
        Self::validate(&input)?;
        let method = input.method.to_uppercase();

        let mut entries = self.entries.write().await;
        let clash = entries.values().any(|e| {
            !e.deleted
                && e.service_name == input.service_name
                && e.path == input.path
                && e.method == method
        });
        if clash {
            return Err(AuthError::DuplicateEndpoint(format!(
                "{} {} {}",
                input.service_name, method, input.path
            )));
        }

        let now = Utc::now();
        let entry = EndpointPermission {
            id: Uuid::now_v7(),
            service_name: input.service_name,
            path: input.path,
            method,
            description: input.description,
            is_public: input.is_public,
            required_permissions: input.required_permissions,
            required_roles: input.required_roles,
            version: 1,
            deleted: false,
            created_at: now,
            updated_at: now,
        };
        entries.insert(entry.id, entry.clone());
        Ok(entry)
    }

    /// Replace a rule's fields, guarded by the version the caller read.
    pub async fn update(
        &self,
        id: Uuid,
        expected_version: u64,
        input: EndpointPermissionInput,
    ) -> Result<EndpointPermission, AuthError> {
        Self::validate(&input)?;
        let method = input.method.to_uppercase();

        let mut entries = self.entries.write().await;
        let clash = entries.values().any(|e| {
            !e.deleted
                && e.id != id
                && e.service_name == input.service_name
                && e.path == input.path
                && e.method == method
        });
        if clash {
            return Err(AuthError::DuplicateEndpoint(format!(
                "{} {} {}",
                input.service_name, method, input.path
            )));
        }

        let entry = entries
            .get_mut(&id)
            .filter(|e| !e.deleted)
            .ok_or(AuthError::EndpointNotFound(id))?;
        if entry.version != expected_version {
            return Err(AuthError::ConcurrentModification {
                expected: expected_version,
                stored: entry.version,
            });
        }

        entry.service_name = input.service_name;
        entry.path = input.path;
        entry.method = method;
        entry.description = input.description;
        entry.is_public = input.is_public;
        entry.required_permissions = input.required_permissions;
        entry.required_roles = input.required_roles;
        entry.version += 1;
        entry.updated_at = Utc::now();
        Ok(entry.clone())
    }

    /// Soft-delete a rule. Deleting twice reports not-found.
    pub async fn delete(&self, id: Uuid) -> Result<(), AuthError> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(&id)
            .filter(|e| !e.deleted)
            .ok_or(AuthError::EndpointNotFound(id))?;
        entry.deleted = true;
        entry.version += 1;
        entry.updated_at = Utc::now();
        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> Result<EndpointPermission, AuthError> {
        let entries = self.entries.read().await;
        entries
            .get(&id)
            .filter(|e| !e.deleted)
            .cloned()
            .ok_or(AuthError::EndpointNotFound(id))
    }

    /// Build the full snapshot the Gateway polls. The spec version is the
    /// newest `updated_at` over ALL entries including soft-deleted ones,
    /// so a deletion still bumps the version the Gateway compares.
    pub async fn spec(&self) -> PermissionSpec {
        let entries = self.entries.read().await;
        let version = entries
            .values()
            .map(|e| e.updated_at.timestamp_millis())
            .max()
            .unwrap_or(0);
        let mut permissions: Vec<EndpointPermissionView> = entries
            .values()
            .filter(|e| !e.deleted)
            .map(EndpointPermissionView::from)
            .collect();
        permissions.sort_by(|a, b| {
            (&a.service_name, &a.path, &a.method).cmp(&(&b.service_name, &b.path, &b.method))
        });
        PermissionSpec {
            version,
            permissions,
        }
    }

    /// Decide whether `authority` may call `method path` on `service`.
    ///
    /// The most specific matching rule wins (longest literal prefix before
    /// any wildcard). No matching rule means Deny; unknown endpoints are
    /// closed by default.
    pub async fn check_access(
        &self,
        service: &str,
        method: &str,
        path: &str,
        authority: &ResolvedAuthority,
    ) -> Decision {
        let entries = self.entries.read().await;
        let method = method.to_uppercase();
        let best = entries
            .values()
            .filter(|e| !e.deleted && e.service_name == service && e.method == method)
            .filter(|e| path_matches(&e.path, path))
            .max_by_key(|e| literal_prefix_len(&e.path));

        let Some(rule) = best else {
            return Decision::Deny;
        };
        if rule.is_public {
            return Decision::Allow;
        }
        let role_hit = rule
            .required_roles
            .iter()
            .any(|r| authority.roles.contains(r));
        let permission_hit = rule
            .required_permissions
            .iter()
            .any(|p| has_permission(&authority.permissions, p));
        if role_hit || permission_hit {
            Decision::Allow
        } else {
            Decision::Deny
        }
    }
}

impl Default for EndpointPermissionCatalog {
    fn default() -> Self {
        Self::new()
    }
}

/// Match a registered path pattern against a concrete request path.
/// `*` matches exactly one segment, `**` matches the rest of the path
/// (including nothing).
fn path_matches(pattern: &str, path: &str) -> bool {
    let mut pattern_segs = pattern.trim_start_matches('/').split('/');
    let mut path_segs = path.trim_start_matches('/').split('/').peekable();

    loop {
        match pattern_segs.next() {
            None => return path_segs.peek().is_none(),
            Some("**") => return true,
            Some(pat) => match path_segs.next() {
                Some(seg) if pat == "*" || pat == seg => continue,
                _ => return false,
            },
        }
    }
}

/// Length of the pattern up to its first wildcard; fully literal patterns
/// rank above any wildcard pattern of the same prefix.
fn literal_prefix_len(pattern: &str) -> usize {
    match pattern.find('*') {
        Some(idx) => idx,
        None => pattern.len() + 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(service: &str, path: &str, method: &str) -> EndpointPermissionInput {
        EndpointPermissionInput {
            service_name: service.to_string(),
            path: path.to_string(),
            method: method.to_string(),
            description: String::new(),
            is_public: false,
            required_permissions: BTreeSet::new(),
            required_roles: BTreeSet::new(),
        }
    }

    fn authority(roles: &[&str], permissions: &[&str]) -> ResolvedAuthority {
        ResolvedAuthority {
            roles: roles.iter().map(|r| r.to_string()).collect(),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn test_path_matching() {
        assert!(path_matches("/api/v1/users", "/api/v1/users"));
        assert!(path_matches("/api/v1/users/*", "/api/v1/users/42"));
        assert!(!path_matches("/api/v1/users/*", "/api/v1/users/42/orders"));
        assert!(path_matches("/api/v1/users/**", "/api/v1/users/42/orders"));
        assert!(path_matches("/api/v1/users/**", "/api/v1/users"));
        assert!(!path_matches("/api/v1/users", "/api/v1/orders"));
    }

    #[tokio::test]
    async fn test_create_rejects_duplicates_and_public_with_requirements() {
        let catalog = EndpointPermissionCatalog::new();
        catalog.create(input("orders", "/api/v1/orders", "get")).await.unwrap();

        // Method is normalized, so "GET" collides with "get".
        let err = catalog
            .create(input("orders", "/api/v1/orders", "GET"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::DuplicateEndpoint(_)));

        let mut bad = input("orders", "/api/v1/orders/open", "GET");
        bad.is_public = true;
        bad.required_roles.insert("ADMIN".to_string());
        let err = catalog.create(bad).await.unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
    }

    #[tokio::test]
    async fn test_update_enforces_version() {
        let catalog = EndpointPermissionCatalog::new();
        let entry = catalog.create(input("users", "/api/v1/users", "GET")).await.unwrap();
        assert_eq!(entry.version, 1);

        let updated = catalog
            .update(entry.id, 1, input("users", "/api/v1/users", "GET"))
            .await
            .unwrap();
        assert_eq!(updated.version, 2);

        // A writer still holding version 1 must be rejected.
        let err = catalog
            .update(entry.id, 1, input("users", "/api/v1/users", "GET"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AuthError::ConcurrentModification {
                expected: 1,
                stored: 2
            }
        ));
    }

    #[tokio::test]
    async fn test_soft_delete_hides_entry_and_bumps_spec_version() {
        let catalog = EndpointPermissionCatalog::new();
        let entry = catalog.create(input("users", "/api/v1/users", "GET")).await.unwrap();
        let before = catalog.spec().await;
        assert_eq!(before.permissions.len(), 1);

        catalog.delete(entry.id).await.unwrap();
        let after = catalog.spec().await;
        assert!(after.permissions.is_empty());
        assert!(after.version >= before.version);

        let err = catalog.delete(entry.id).await.unwrap_err();
        assert!(matches!(err, AuthError::EndpointNotFound(_)));
        let err = catalog.get(entry.id).await.unwrap_err();
        assert!(matches!(err, AuthError::EndpointNotFound(_)));
    }

    #[tokio::test]
    async fn test_empty_catalog_spec_version_is_zero() {
        let catalog = EndpointPermissionCatalog::new();
        let spec = catalog.spec().await;
        assert_eq!(spec.version, 0);
        assert!(spec.permissions.is_empty());
    }

    #[tokio::test]
    async fn test_check_access_requires_grant() {
        let catalog = EndpointPermissionCatalog::new();
        let mut rule = input("users", "/api/v1/users/**", "GET");
        rule.required_permissions.insert("user:read".to_string());
        catalog.create(rule).await.unwrap();

        let reader = authority(&[], &["user:read"]);
        let wildcard = authority(&[], &["user:*"]);
        let outsider = authority(&[], &["order:read"]);

        assert_eq!(
            catalog.check_access("users", "GET", "/api/v1/users/42", &reader).await,
            Decision::Allow
        );
        assert_eq!(
            catalog.check_access("users", "GET", "/api/v1/users/42", &wildcard).await,
            Decision::Allow
        );
        assert_eq!(
            catalog.check_access("users", "GET", "/api/v1/users/42", &outsider).await,
            Decision::Deny
        );
        // Unknown endpoints are closed.
        assert_eq!(
            catalog.check_access("users", "DELETE", "/api/v1/users/42", &reader).await,
            Decision::Deny
        );
    }

    #[tokio::test]
    async fn test_check_access_role_match_suffices() {
        let catalog = EndpointPermissionCatalog::new();
        let mut rule = input("admin", "/api/v1/admin/**", "POST");
        rule.required_roles.insert("PLATFORM_ADMIN".to_string());
        rule.required_permissions.insert("admin:write".to_string());
        catalog.create(rule).await.unwrap();

        let by_role = authority(&["PLATFORM_ADMIN"], &[]);
        assert_eq!(
            catalog
                .check_access("admin", "POST", "/api/v1/admin/flags", &by_role)
                .await,
            Decision::Allow
        );
    }

    #[tokio::test]
    async fn test_most_specific_rule_wins() {
        let catalog = EndpointPermissionCatalog::new();
        let mut broad = input("users", "/api/v1/users/**", "GET");
        broad.required_permissions.insert("user:read".to_string());
        catalog.create(broad).await.unwrap();

        let mut health = input("users", "/api/v1/users/health", "GET");
        health.is_public = true;
        catalog.create(health).await.unwrap();

        let nobody = authority(&[], &[]);
        assert_eq!(
            catalog
                .check_access("users", "GET", "/api/v1/users/health", &nobody)
                .await,
            Decision::Allow
        );
        assert_eq!(
            catalog.check_access("users", "GET", "/api/v1/users/42", &nobody).await,
            Decision::Deny
        );
    }
}
