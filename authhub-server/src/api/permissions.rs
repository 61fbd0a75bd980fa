use crate::errors::{ApiError, AuthError};
use crate::models::{PermissionSpec, TokenType};
use crate::openapi::PERMISSIONS_TAG;
use crate::state::AppState;
use crate::token::BEARER;
use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use http::header::{HeaderMap, AUTHORIZATION, CACHE_CONTROL};
use serde::Serialize;
use std::collections::BTreeSet;
use utoipa::ToSchema;
use uuid::Uuid;

/// How long the Gateway may serve a cached spec before re-polling.
const SPEC_MAX_AGE_SECS: u64 = 30;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MyPermissionsResponse {
    pub user_id: Uuid,
    pub roles: BTreeSet<String>,
    pub permissions: BTreeSet<String>,
}

/// Full endpoint-permission snapshot for the Gateway
#[utoipa::path(
    get,
    path = "/api/v1/permissions/spec",
    tag = PERMISSIONS_TAG,
    responses(
        (status = 200, description = "Current permission spec", body = PermissionSpec)
    )
)]
async fn permission_spec(State(state): State<AppState>) -> impl IntoResponse {
    let spec = state.catalog.spec().await;
    (
        [(
            CACHE_CONTROL,
            format!("private, max-age={SPEC_MAX_AGE_SECS}"),
        )],
        Json(spec),
    )
}

/// Extract and verify the Bearer access token from the request headers.
fn bearer_claims(state: &AppState, headers: &HeaderMap) -> Result<crate::token::Claims, AuthError> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AuthError::InvalidToken("missing Authorization header".to_string()))?;
    // The scheme must be followed by a space; "Bearer<token>" is not a
    // valid credentials line.
    let token = header
        .strip_prefix(BEARER)
        .and_then(|rest| rest.strip_prefix(' '))
        .map(str::trim_start)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AuthError::InvalidToken("malformed Authorization header".to_string()))?;

    let claims = state.codec.verify(token)?;
    if claims.token_type != TokenType::Access {
        return Err(AuthError::InvalidToken(
            "refresh token presented as access token".to_string(),
        ));
    }
    Ok(claims)
}

/// The calling user's effective roles and permissions, re-resolved from
/// the directory rather than echoed from the token
#[utoipa::path(
    get,
    path = "/api/v1/permissions/me",
    tag = PERMISSIONS_TAG,
    responses(
        (status = 200, description = "Effective authority", body = MyPermissionsResponse),
        (status = 401, description = "Missing or invalid access token")
    )
)]
async fn my_permissions(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<MyPermissionsResponse>, ApiError> {
    let claims = bearer_claims(&state, &headers)?;
    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| AuthError::InvalidToken("subject is not a user id".to_string()))?;

    let authority = state.resolver.resolve(user_id).await?;
    Ok(Json(MyPermissionsResponse {
        user_id,
        roles: authority.roles,
        permissions: authority.permissions,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/permissions/spec", get(permission_spec))
        .route("/api/v1/permissions/me", get(my_permissions))
}

#[cfg(test)]
mod test {
    use crate::test_utils::TestFixture;
    use serde_json::json;

    #[tokio::test]
    async fn test_spec_is_cacheable_and_starts_empty() {
        let fixture = TestFixture::new();
        let response = fixture.get("/api/v1/permissions/spec").await;

        response.assert_ok();
        assert_eq!(response.json["version"], 0);
        assert!(response.json["permissions"].as_array().unwrap().is_empty());

        let cache_control = response
            .headers
            .get(http::header::CACHE_CONTROL)
            .and_then(|v| v.to_str().ok())
            .unwrap();
        assert!(cache_control.contains("private"));
        assert!(cache_control.contains("max-age="));
    }

    #[tokio::test]
    async fn test_me_returns_resolved_authority() {
        let fixture = TestFixture::new();
        let user_id = fixture
            .seed_user("bob@acme.test", "password123", "VIEWER", &["doc:read"])
            .await;

        let login = fixture
            .post(
                "/api/v1/auth/login",
                &json!({"identifier": "bob@acme.test", "password": "password123"}),
            )
            .await;
        let access_token = login.json["accessToken"].as_str().unwrap().to_string();

        let response = fixture
            .get_with_headers(
                "/api/v1/permissions/me",
                &[("Authorization", &format!("Bearer {access_token}"))],
            )
            .await;

        response.assert_ok();
        assert_eq!(response.json["userId"], user_id.to_string());
        assert_eq!(response.json["roles"], json!(["VIEWER"]));
        assert_eq!(response.json["permissions"], json!(["doc:read"]));
    }

    #[tokio::test]
    async fn test_me_without_token_is_401() {
        let fixture = TestFixture::new();
        fixture
            .get("/api/v1/permissions/me")
            .await
            .assert_status(http::StatusCode::UNAUTHORIZED);

        fixture
            .get_with_headers("/api/v1/permissions/me", &[("Authorization", "Basic abc")])
            .await
            .assert_status(http::StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_me_requires_space_after_bearer_scheme() {
        let fixture = TestFixture::new();
        fixture
            .seed_user("bob@acme.test", "password123", "VIEWER", &[])
            .await;

        let login = fixture
            .post(
                "/api/v1/auth/login",
                &json!({"identifier": "bob@acme.test", "password": "password123"}),
            )
            .await;
        let access_token = login.json["accessToken"].as_str().unwrap();

        // A valid token glued to the scheme is still a malformed header.
        fixture
            .get_with_headers(
                "/api/v1/permissions/me",
                &[("Authorization", &format!("Bearer{access_token}"))],
            )
            .await
            .assert_status(http::StatusCode::UNAUTHORIZED);

        fixture
            .get_with_headers("/api/v1/permissions/me", &[("Authorization", "Bearer ")])
            .await
            .assert_status(http::StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_me_rejects_refresh_token() {
        let fixture = TestFixture::new();
        fixture
            .seed_user("bob@acme.test", "password123", "VIEWER", &[])
            .await;

        let login = fixture
            .post(
                "/api/v1/auth/login",
                &json!({"identifier": "bob@acme.test", "password": "password123"}),
            )
            .await;
        let refresh_token = login.json["refreshToken"].as_str().unwrap().to_string();

        fixture
            .get_with_headers(
                "/api/v1/permissions/me",
                &[("Authorization", &format!("Bearer {refresh_token}"))],
            )
            .await
            .assert_status(http::StatusCode::UNAUTHORIZED);
    }
}
