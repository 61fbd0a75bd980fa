use crate::errors::ApiError;
use crate::onboarding::OnboardingRequest;
use crate::openapi::ONBOARDING_TAG;
use crate::state::AppState;
use axum::{extract::State, routing::post, Json, Router};
use http::HeaderMap;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingRequestBody {
    pub tenant_name: String,
    pub organization_name: String,
    pub admin_identifier: String,
    #[serde(default)]
    pub admin_password: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingResponse {
    pub tenant_id: Uuid,
    pub organization_id: Uuid,
    pub admin_user_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temporary_password: Option<String>,
}

/// Provision a tenant with its first organization and admin user.
/// Requires an `Idempotency-Key` header; repeating a key replays the
/// original result instead of provisioning twice.
#[utoipa::path(
    post,
    path = "/api/v1/onboarding",
    tag = ONBOARDING_TAG,
    request_body = OnboardingRequestBody,
    responses(
        (status = 200, description = "Tenant provisioned (or replayed)", body = OnboardingResponse),
        (status = 400, description = "Missing Idempotency-Key header or invalid request"),
        (status = 409, description = "Tenant name already exists")
    )
)]
async fn onboard(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<OnboardingRequestBody>,
) -> Result<Json<OnboardingResponse>, ApiError> {
    let idempotency_key = headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Idempotency-Key header is required"))?;

    let result = state
        .onboarding
        .onboard(
            idempotency_key,
            OnboardingRequest {
                tenant_name: body.tenant_name,
                organization_name: body.organization_name,
                admin_identifier: body.admin_identifier,
                admin_password: body.admin_password,
            },
        )
        .await?;

    Ok(Json(OnboardingResponse {
        tenant_id: result.tenant_id,
        organization_id: result.organization_id,
        admin_user_id: result.admin_user_id,
        temporary_password: result.temporary_password,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/v1/onboarding", post(onboard))
}
