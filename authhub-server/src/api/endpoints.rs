use crate::authz::catalog::EndpointPermissionInput;
use crate::errors::ApiError;
use crate::models::EndpointPermissionView;
use crate::openapi::PERMISSIONS_TAG;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateEndpointPermissionRequest {
    pub service_name: String,
    pub path: String,
    pub method: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub required_permissions: BTreeSet<String>,
    #[serde(default)]
    pub required_roles: BTreeSet<String>,
}

/// Update carries the version the caller read; a stale version is a 409.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEndpointPermissionRequest {
    pub version: u64,
    pub service_name: String,
    pub path: String,
    pub method: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub required_permissions: BTreeSet<String>,
    #[serde(default)]
    pub required_roles: BTreeSet<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EndpointPermissionResponse {
    pub id: Uuid,
    #[serde(flatten)]
    pub entry: EndpointPermissionView,
}

/// Register a new endpoint protection rule
#[utoipa::path(
    post,
    path = "/api/v1/endpoint-permissions",
    tag = PERMISSIONS_TAG,
    request_body = CreateEndpointPermissionRequest,
    responses(
        (status = 201, description = "Rule registered", body = EndpointPermissionResponse),
        (status = 400, description = "Invalid rule"),
        (status = 409, description = "Rule already exists for (service, path, method)")
    )
)]
async fn create_endpoint_permission(
    State(state): State<AppState>,
    Json(request): Json<CreateEndpointPermissionRequest>,
) -> Result<(StatusCode, Json<EndpointPermissionResponse>), ApiError> {
    let entry = state
        .catalog
        .create(EndpointPermissionInput {
            service_name: request.service_name,
            path: request.path,
            method: request.method,
            description: request.description,
            is_public: request.is_public,
            required_permissions: request.required_permissions,
            required_roles: request.required_roles,
        })
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(EndpointPermissionResponse {
            id: entry.id,
            entry: (&entry).into(),
        }),
    ))
}

/// Replace an endpoint protection rule, guarded by its version
#[utoipa::path(
    put,
    path = "/api/v1/endpoint-permissions/{id}",
    tag = PERMISSIONS_TAG,
    params(("id" = Uuid, Path, description = "Rule id")),
    request_body = UpdateEndpointPermissionRequest,
    responses(
        (status = 200, description = "Rule updated", body = EndpointPermissionResponse),
        (status = 404, description = "No such rule"),
        (status = 409, description = "Version is stale")
    )
)]
async fn update_endpoint_permission(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateEndpointPermissionRequest>,
) -> Result<Json<EndpointPermissionResponse>, ApiError> {
    let entry = state
        .catalog
        .update(
            id,
            request.version,
            EndpointPermissionInput {
                service_name: request.service_name,
                path: request.path,
                method: request.method,
                description: request.description,
                is_public: request.is_public,
                required_permissions: request.required_permissions,
                required_roles: request.required_roles,
            },
        )
        .await?;
    Ok(Json(EndpointPermissionResponse {
        id: entry.id,
        entry: (&entry).into(),
    }))
}

/// Soft-delete an endpoint protection rule
#[utoipa::path(
    delete,
    path = "/api/v1/endpoint-permissions/{id}",
    tag = PERMISSIONS_TAG,
    params(("id" = Uuid, Path, description = "Rule id")),
    responses(
        (status = 204, description = "Rule deleted"),
        (status = 404, description = "No such rule")
    )
)]
async fn delete_endpoint_permission(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.catalog.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/endpoint-permissions", post(create_endpoint_permission))
        .route(
            "/api/v1/endpoint-permissions/{id}",
            put(update_endpoint_permission).delete(delete_endpoint_permission),
        )
}
