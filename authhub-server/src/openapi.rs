use utoipa::OpenApi;

pub(crate) const HEALTH_TAG: &str = "Health API";
pub(crate) const AUTH_TAG: &str = "Auth API";
pub(crate) const PERMISSIONS_TAG: &str = "Permissions API";
pub(crate) const ONBOARDING_TAG: &str = "Onboarding API";

#[derive(OpenApi)]
#[openapi(
    tags(
        (name = HEALTH_TAG, description = "Health check endpoints"),
        (name = AUTH_TAG, description = "Token issuance, refresh and revocation"),
        (name = PERMISSIONS_TAG, description = "Permission resolution and the endpoint-permission catalog"),
        (name = ONBOARDING_TAG, description = "Tenant provisioning"),
    ),
    info(
        title = "AuthHub API",
        description = "Multi-tenant authentication and authorization hub",
        version = "1.0.0"
    )
)]
pub(crate) struct ApiDoc;
