pub(crate) mod auth;
pub(crate) mod endpoints;
pub(crate) mod health;
pub(crate) mod onboarding;
pub(crate) mod permissions;

use crate::state::AppState;
use axum::Router;

/// Combines all API routes into a single router
pub(super) fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(permissions::router())
        .merge(endpoints::router())
        .merge(onboarding::router())
}
