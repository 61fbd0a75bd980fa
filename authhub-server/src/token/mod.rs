use crate::errors::AuthError;
use crate::keys::KeyMaterial;
use crate::models::TokenType;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub mod blacklist;
pub mod lifecycle;
pub mod ratelimit;
pub mod refresh;

pub const BEARER: &str = "Bearer";

/// Claims embedded in every issued token.
///
/// Access tokens carry the full authority snapshot (`tid`, `oid`, roles,
/// permissions) so the Gateway can authorize statelessly; refresh tokens
/// carry only the subject and their own identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oid: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<String>,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
    pub token_type: TokenType,
}

/// Inputs for minting an access token for a principal.
#[derive(Debug, Clone)]
pub struct TokenClaimsContext {
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub organization_id: Uuid,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
}

/// A freshly signed token together with the claims that went into it.
#[derive(Debug, Clone)]
pub struct SignedToken {
    pub value: String,
    pub claims: Claims,
}

/// Encodes and decodes signed tokens, independent of any storage.
pub struct TokenCodec {
    keys: Arc<KeyMaterial>,
}

impl TokenCodec {
    pub fn new(keys: Arc<KeyMaterial>) -> Self {
        Self { keys }
    }

    /// Sign an access token carrying the principal's flattened authority.
    pub fn sign_access(
        &self,
        context: &TokenClaimsContext,
        ttl: Duration,
    ) -> Result<SignedToken, AuthError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: context.user_id.to_string(),
            tid: Some(context.tenant_id.to_string()),
            oid: Some(context.organization_id.to_string()),
            roles: context.roles.clone(),
            permissions: context.permissions.clone(),
            iat: now,
            exp: now + ttl.as_secs() as i64,
            jti: Uuid::now_v7().to_string(),
            token_type: TokenType::Access,
        };
        self.sign(claims)
    }

    /// Sign a refresh token. Deliberately claim-light: authority is
    /// re-resolved on every refresh, so stale claims cannot leak through.
    pub fn sign_refresh(&self, user_id: Uuid, ttl: Duration) -> Result<SignedToken, AuthError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            tid: None,
            oid: None,
            roles: Vec::new(),
            permissions: Vec::new(),
            iat: now,
            exp: now + ttl.as_secs() as i64,
            jti: Uuid::now_v7().to_string(),
            token_type: TokenType::Refresh,
        };
        self.sign(claims)
    }

    fn sign(&self, claims: Claims) -> Result<SignedToken, AuthError> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.keys.key_id.clone());
        let value = encode(&header, &claims, &self.keys.encoding)
            .map_err(|e| AuthError::Internal(format!("token signing failed: {e}")))?;
        Ok(SignedToken { value, claims })
    }

    /// Verify signature and expiry, returning the embedded claims.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.leeway = 0;
        decode::<Claims>(token, &self.keys.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                _ => AuthError::InvalidToken(err.to_string()),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_key_material;

    fn codec() -> TokenCodec {
        TokenCodec::new(Arc::new(test_key_material()))
    }

    fn context() -> TokenClaimsContext {
        TokenClaimsContext {
            user_id: Uuid::now_v7(),
            tenant_id: Uuid::now_v7(),
            organization_id: Uuid::now_v7(),
            roles: vec!["TENANT_ADMIN".to_string()],
            permissions: vec!["user:read".to_string(), "user:write".to_string()],
        }
    }

    #[test]
    fn test_access_token_roundtrip() {
        let codec = codec();
        let ctx = context();

        let signed = codec
            .sign_access(&ctx, Duration::from_secs(60))
            .expect("sign");
        let claims = codec.verify(&signed.value).expect("verify");

        assert_eq!(claims.sub, ctx.user_id.to_string());
        assert_eq!(claims.tid.as_deref(), Some(ctx.tenant_id.to_string().as_str()));
        assert_eq!(claims.roles, ctx.roles);
        assert_eq!(claims.permissions, ctx.permissions);
        assert_eq!(claims.token_type, TokenType::Access);
        assert_eq!(claims, signed.claims);
    }

    #[test]
    fn test_refresh_token_is_claim_light() {
        let codec = codec();
        let user_id = Uuid::now_v7();

        let signed = codec
            .sign_refresh(user_id, Duration::from_secs(60))
            .expect("sign");
        let claims = codec.verify(&signed.value).expect("verify");

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.token_type, TokenType::Refresh);
        assert!(claims.roles.is_empty());
        assert!(claims.permissions.is_empty());
        assert!(claims.tid.is_none());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let codec = codec();

        let signed = codec
            .sign_refresh(Uuid::now_v7(), Duration::from_secs(0))
            .expect("sign");
        // exp == iat, so the token is already past its window.
        std::thread::sleep(std::time::Duration::from_millis(1100));
        let err = codec.verify(&signed.value).unwrap_err();
        assert!(matches!(err, AuthError::ExpiredToken));
    }

    #[test]
    fn test_malformed_token_is_rejected() {
        let codec = codec();
        let err = codec.verify("not.a.token").unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));
    }

    #[test]
    fn test_jti_unique_per_token() {
        let codec = codec();
        let a = codec
            .sign_refresh(Uuid::now_v7(), Duration::from_secs(60))
            .unwrap();
        let b = codec
            .sign_refresh(Uuid::now_v7(), Duration::from_secs(60))
            .unwrap();
        assert_ne!(a.claims.jti, b.claims.jti);
    }
}
