use crate::errors::ApiError;
use crate::keys::Jwks;
use crate::openapi::AUTH_TAG;
use crate::state::AppState;
use crate::token::BEARER;
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub identifier: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    pub user_id: Uuid,
}

/// Authenticate with a credential pair and receive a token pair
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = AUTH_TAG,
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = LoginResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "User is not active"),
        (status = 429, description = "Too many attempts for this identifier")
    )
)]
async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let outcome = state
        .lifecycle
        .login(&request.identifier, &request.password)
        .await?;
    Ok(Json(LoginResponse {
        user_id: outcome.user_id,
        access_token: outcome.access_token,
        refresh_token: outcome.refresh_token,
        token_type: BEARER,
        expires_in: outcome.expires_in,
    }))
}

/// Exchange a refresh token for a new access token
#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    tag = AUTH_TAG,
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New access token issued", body = RefreshResponse),
        (status = 401, description = "Refresh token invalid, revoked or unknown")
    )
)]
async fn refresh(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let outcome = state.lifecycle.refresh(&request.refresh_token).await?;
    Ok(Json(RefreshResponse {
        access_token: outcome.access_token,
        token_type: BEARER,
        expires_in: outcome.expires_in,
    }))
}

/// Invalidate the user's refresh token; repeatable without error
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = AUTH_TAG,
    request_body = LogoutRequest,
    responses(
        (status = 204, description = "Logged out")
    )
)]
async fn logout(
    State(state): State<AppState>,
    Json(request): Json<LogoutRequest>,
) -> Result<StatusCode, ApiError> {
    state.lifecycle.logout(request.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Public verification keys in JWK set form
#[utoipa::path(
    get,
    path = "/auth/.well-known/jwks.json",
    tag = AUTH_TAG,
    responses(
        (status = 200, description = "JWK set", body = Jwks)
    )
)]
async fn jwks(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.keys.jwks().clone())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/auth/login", post(login))
        .route("/api/v1/auth/refresh", post(refresh))
        .route("/api/v1/auth/logout", post(logout))
        .route("/auth/.well-known/jwks.json", get(jwks))
}
