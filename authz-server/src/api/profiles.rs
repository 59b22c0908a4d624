use crate::api::authz_middleware::{RouteGuard, authorization_middleware};
use crate::errors::ApiError;
use crate::openapi::PROFILES_TAG;
use crate::state::AppState;
use authz_engine::{AuthorizationContext, Requirement};
use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Extension, Json, Router, middleware};
use http::{StatusCode, header};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use utoipa::ToSchema;
use uuid::Uuid;

/// Scope required for reading profiles
pub(crate) const READ_SCOPE: &str = "message.read";
/// Scope required for creating or changing profiles
pub(crate) const WRITE_SCOPE: &str = "message.write";

#[derive(Debug, Clone)]
pub struct CustomerProfile {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// In-memory profile store shared across handlers.
#[derive(Default)]
pub struct ProfileStore {
    profiles: RwLock<HashMap<Uuid, CustomerProfile>>,
}

impl ProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn insert(&self, profile: CustomerProfile) {
        self.profiles.write().await.insert(profile.id, profile);
    }

    async fn get(&self, id: Uuid) -> Option<CustomerProfile> {
        self.profiles.read().await.get(&id).cloned()
    }

    async fn list(&self) -> Vec<CustomerProfile> {
        let mut profiles: Vec<_> = self.profiles.read().await.values().cloned().collect();
        profiles.sort_by(|a, b| a.id.cmp(&b.id));
        profiles
    }

    async fn update(
        &self,
        id: Uuid,
        change: CustomerProfileChangeRequest,
    ) -> Option<CustomerProfile> {
        let mut profiles = self.profiles.write().await;
        let profile = profiles.get_mut(&id)?;
        if let Some(first_name) = change.first_name {
            profile.first_name = first_name;
        }
        if let Some(last_name) = change.last_name {
            profile.last_name = last_name;
        }
        Some(profile.clone())
    }

    async fn remove(&self, id: Uuid) -> bool {
        self.profiles.write().await.remove(&id).is_some()
    }
}

/// Request payload for creating a profile
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CustomerProfileCreateRequest {
    /// Given name of the customer
    first_name: String,
    /// Family name of the customer
    last_name: String,
    /// Contact email address
    email: String,
}

/// Request payload for changing a profile; unset fields are left as they are
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CustomerProfileChangeRequest {
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
}

/// A stored customer profile
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CustomerProfileResponse {
    id: Uuid,
    first_name: String,
    last_name: String,
    email: String,
}

impl From<CustomerProfile> for CustomerProfileResponse {
    fn from(profile: CustomerProfile) -> Self {
        Self {
            id: profile.id,
            first_name: profile.first_name,
            last_name: profile.last_name,
            email: profile.email,
        }
    }
}

fn validate_create(request: &CustomerProfileCreateRequest) -> Result<(), ApiError> {
    if request.first_name.trim().is_empty() {
        return Err(ApiError::unprocessable("firstName must not be blank"));
    }
    if request.last_name.trim().is_empty() {
        return Err(ApiError::unprocessable("lastName must not be blank"));
    }
    if request.email.trim().is_empty() || !request.email.contains('@') {
        return Err(ApiError::unprocessable("email must be a valid address"));
    }
    Ok(())
}

#[utoipa::path(
    get,
    path = "/api/customer-profiles",
    tag = PROFILES_TAG,
    responses(
        (status = 200, description = "All stored profiles", body = [CustomerProfileResponse]),
        (status = 401, description = "Missing or invalid credentials"),
        (status = 403, description = "Insufficient scope")
    )
)]
pub(crate) async fn list_profiles(State(state): State<AppState>) -> Json<Vec<CustomerProfileResponse>> {
    let profiles = state.profiles.list().await;
    Json(profiles.into_iter().map(Into::into).collect())
}

#[utoipa::path(
    get,
    path = "/api/customer-profiles/{id}",
    tag = PROFILES_TAG,
    params(
        ("id" = Uuid, Path, description = "Profile id"),
    ),
    responses(
        (status = 200, description = "The requested profile", body = CustomerProfileResponse),
        (status = 404, description = "No profile with this id"),
        (status = 401, description = "Missing or invalid credentials"),
        (status = 403, description = "Insufficient scope")
    )
)]
pub(crate) async fn get_profile(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CustomerProfileResponse>, ApiError> {
    state
        .profiles
        .get(id)
        .await
        .map(|profile| Json(profile.into()))
        .ok_or_else(|| ApiError::not_found(format!("No profile with id {id}")))
}

#[utoipa::path(
    post,
    path = "/api/customer-profiles",
    tag = PROFILES_TAG,
    request_body = CustomerProfileCreateRequest,
    responses(
        (status = 201, description = "Profile created", body = CustomerProfileResponse),
        (status = 422, description = "Invalid request payload"),
        (status = 401, description = "Missing or invalid credentials"),
        (status = 403, description = "Insufficient scope")
    )
)]
pub(crate) async fn create_profile(
    State(state): State<AppState>,
    Extension(context): Extension<AuthorizationContext>,
    Json(request): Json<CustomerProfileCreateRequest>,
) -> Result<(StatusCode, [(header::HeaderName, String); 1], Json<CustomerProfileResponse>), ApiError>
{
    validate_create(&request)?;

    let profile = CustomerProfile {
        id: Uuid::new_v4(),
        first_name: request.first_name,
        last_name: request.last_name,
        email: request.email,
    };
    state.profiles.insert(profile.clone()).await;
    debug!(
        "profile {} created by subject '{}'",
        profile.id, context.subject
    );

    let location = format!("/api/customer-profiles/{}", profile.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(profile.into()),
    ))
}

#[utoipa::path(
    patch,
    path = "/api/customer-profiles/{id}",
    tag = PROFILES_TAG,
    params(
        ("id" = Uuid, Path, description = "Profile id"),
    ),
    request_body = CustomerProfileChangeRequest,
    responses(
        (status = 200, description = "Profile updated", body = CustomerProfileResponse),
        (status = 404, description = "No profile with this id"),
        (status = 401, description = "Missing or invalid credentials"),
        (status = 403, description = "Insufficient scope")
    )
)]
pub(crate) async fn update_profile(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(change): Json<CustomerProfileChangeRequest>,
) -> Result<Json<CustomerProfileResponse>, ApiError> {
    state
        .profiles
        .update(id, change)
        .await
        .map(|profile| Json(profile.into()))
        .ok_or_else(|| ApiError::not_found(format!("No profile with id {id}")))
}

#[utoipa::path(
    delete,
    path = "/api/customer-profiles/{id}",
    tag = PROFILES_TAG,
    params(
        ("id" = Uuid, Path, description = "Profile id"),
    ),
    responses(
        (status = 204, description = "Profile deleted"),
        (status = 404, description = "No profile with this id"),
        (status = 401, description = "Missing or invalid credentials"),
        (status = 403, description = "Insufficient scope")
    )
)]
pub(crate) async fn delete_profile(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.profiles.remove(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found(format!("No profile with id {id}")))
    }
}

/// Profile routes behind the gate: safe methods need the read scope,
/// mutating methods the write scope.
pub(crate) fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/api/customer-profiles",
            get(list_profiles).post(create_profile),
        )
        .route(
            "/api/customer-profiles/{id}",
            get(get_profile)
                .patch(update_profile)
                .delete(delete_profile),
        )
        .route_layer(middleware::from_fn_with_state(
            RouteGuard::new(
                state,
                Requirement::scope(READ_SCOPE),
                Requirement::scope(WRITE_SCOPE),
            ),
            authorization_middleware,
        ))
}
