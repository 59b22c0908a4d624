pub(crate) mod authz_middleware;
pub(crate) mod health;
pub(crate) mod profiles;

use crate::state::AppState;
use axum::Router;

/// Combines all API routes into a single router
pub(super) fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(profiles::router(state))
}
