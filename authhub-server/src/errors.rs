use crate::cache::CacheError;
use axum::response::IntoResponse;
use axum::Json;
use http::StatusCode;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// Error taxonomy of the token lifecycle and authorization engine.
///
/// Every variant maps to a fixed HTTP status through `ApiError`; none of
/// them are retried internally except `StoreUnavailable` on pure-read
/// resolution paths.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Bad identifier or password. The message never reveals which.
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("user is not active: {0:?}")]
    InvalidUserState(crate::models::UserStatus),
    #[error("invalid token: {0}")]
    InvalidToken(String),
    #[error("token has expired")]
    ExpiredToken,
    /// Refresh token absent from the store: already used, deleted or
    /// never issued.
    #[error("refresh token not found")]
    TokenNotFound,
    #[error("token is blacklisted: {0}")]
    Blacklisted(String),
    /// Too many failed login attempts inside the configured window.
    #[error("too many login attempts, retry later")]
    RateLimited,
    /// Stale optimistic-lock version on an endpoint permission update.
    #[error("concurrent modification: expected version {expected}, stored version {stored}")]
    ConcurrentModification { expected: u64, stored: u64 },
    #[error("tenant name already exists: {0}")]
    DuplicateTenantName(String),
    #[error("role name already exists: {0}")]
    DuplicateRoleName(String),
    #[error("permission key already exists: {0}")]
    DuplicatePermissionKey(String),
    #[error("endpoint permission already registered: {0}")]
    DuplicateEndpoint(String),
    #[error("endpoint permission not found: {0}")]
    EndpointNotFound(Uuid),
    #[error("user not found: {0}")]
    UserNotFound(Uuid),
    #[error("validation failed: {0}")]
    Validation(String),
    /// Signing/verification key missing or unparsable. Fatal at startup.
    #[error("failed to load key material: {0}")]
    KeyLoad(String),
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<CacheError> for AuthError {
    fn from(err: CacheError) -> Self {
        AuthError::StoreUnavailable(err.to_string())
    }
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredentials
            | AuthError::InvalidToken(_)
            | AuthError::ExpiredToken
            | AuthError::TokenNotFound
            | AuthError::Blacklisted(_) => StatusCode::UNAUTHORIZED,
            AuthError::InvalidUserState(_) => StatusCode::FORBIDDEN,
            AuthError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AuthError::ConcurrentModification { .. }
            | AuthError::DuplicateTenantName(_)
            | AuthError::DuplicateRoleName(_)
            | AuthError::DuplicatePermissionKey(_)
            | AuthError::DuplicateEndpoint(_) => StatusCode::CONFLICT,
            AuthError::EndpointNotFound(_) | AuthError::UserNotFound(_) => StatusCode::NOT_FOUND,
            AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AuthError::KeyLoad(_) | AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// HTTP-facing error with a JSON `{"detail": ...}` body.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub detail: String,
    pub status_code: StatusCode,
}

impl ApiError {
    /// Create a new ApiError with a detail message and status code
    pub fn new<S: ToString>(detail: S, status_code: StatusCode) -> Self {
        Self {
            detail: detail.to_string(),
            status_code,
        }
    }

    /// Create new Internal Server Error (500) with a detail message
    pub fn internal<S: ToString>(detail: S) -> Self {
        Self::new(detail, StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Create new Bad Request Error (400) with a detail message
    pub fn bad_request<S: ToString>(detail: S) -> Self {
        Self::new(detail, StatusCode::BAD_REQUEST)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let status = err.status_code();
        // 401s share one generic body so callers cannot tell which
        // check failed.
        let detail = if status == StatusCode::UNAUTHORIZED {
            "authentication failed".to_string()
        } else {
            err.to_string()
        };
        Self::new(detail, status)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status_code = self.status_code;
        let body = json!({
            "detail": self.detail,
        });
        (status_code, Json(body)).into_response()
    }
}
