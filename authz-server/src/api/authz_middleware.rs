use crate::errors::ApiError;
use crate::state::AppState;
use authz_engine::Requirement;
use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http::Method;
use log::warn;

/// Scope requirements for a route group, split by method class: safe methods
/// are checked against the read requirement, mutating methods against the
/// write requirement.
#[derive(Clone)]
pub(crate) struct RouteGuard {
    state: AppState,
    read: Requirement,
    write: Requirement,
}

impl RouteGuard {
    pub(crate) fn new(state: &AppState, read: Requirement, write: Requirement) -> Self {
        Self {
            state: state.clone(),
            read,
            write,
        }
    }

    fn requirement_for(&self, method: &Method) -> &Requirement {
        if method.is_safe() {
            &self.read
        } else {
            &self.write
        }
    }
}

/// Gates every request of a route group.
///
/// On allow the authorization context is inserted into the request
/// extensions for downstream handlers; on denial the request is answered
/// here and no handler runs.
pub(crate) async fn authorization_middleware(
    State(guard): State<RouteGuard>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let requirement = guard.requirement_for(request.method());

    match guard
        .state
        .gate
        .authorize(request.headers(), requirement)
        .await
    {
        Ok(context) => {
            request.extensions_mut().insert(context);
            next.run(request).await
        }
        Err(denial) => {
            warn!(
                "request to {} denied at the {} stage: {}",
                request.uri().path(),
                denial.stage(),
                denial
            );
            ApiError::from(denial).into_response()
        }
    }
}
