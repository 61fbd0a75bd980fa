use crate::directory::Directory;
use crate::errors::AuthError;
use crate::models::ResolvedAuthority;
use std::sync::Arc;
use uuid::Uuid;

/// Flattens a user's role assignments into the effective authority set
/// embedded in tokens and returned by the introspection endpoint.
#[derive(Clone)]
pub struct PermissionResolver {
    directory: Arc<dyn Directory>,
}

impl PermissionResolver {
    pub fn new(directory: Arc<dyn Directory>) -> Self {
        Self { directory }
    }

    /// Resolve the union of permissions over all of the user's roles.
    /// Users with no roles resolve to an empty authority, not an error.
    pub async fn resolve(&self, user_id: Uuid) -> Result<ResolvedAuthority, AuthError> {
        let roles = self.directory.roles_for_user(user_id).await?;
        let role_ids: Vec<Uuid> = roles.iter().map(|r| r.id).collect();
        let permissions = self.directory.permissions_for_roles(&role_ids).await?;

        Ok(ResolvedAuthority {
            roles: roles.into_iter().map(|r| r.name).collect(),
            permissions: permissions.into_iter().map(|p| p.key).collect(),
        })
    }
}
