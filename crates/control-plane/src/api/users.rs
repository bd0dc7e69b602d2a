// User profile HTTP routes
// Decision: Callers only ever see and edit their own profile; others are visible through shared locations

use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, put},
    Json, Router,
};
use axum_extra::extract::WithRejection;
use swag_core::{SharedLocation, UpdateUser, User, UserLocation};

use super::common::{ApiError, ErrorResponse};
use crate::auth::{AuthState, AuthUser, FromRef, MemberUser};
use crate::services::UserService;

/// App state for users routes
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<UserService>,
    pub auth: AuthState,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(input: &AppState) -> Self {
        input.auth.clone()
    }
}

/// Create users routes
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/users/me", get(get_me).put(update_me))
        .route("/v1/users/me/location", put(update_location))
        .route("/v1/users/locations", get(list_locations))
        .with_state(state)
}

/// GET /v1/users/me - Caller's profile
#[utoipa::path(
    get,
    path = "/v1/users/me",
    responses(
        (status = 200, description = "Profile", body = User),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Membership required", body = ErrorResponse)
    ),
    tag = "users"
)]
pub async fn get_me(user: MemberUser) -> Json<User> {
    Json(user.0)
}

/// PUT /v1/users/me - Update settings, contact info, age and slogan
#[utoipa::path(
    put,
    path = "/v1/users/me",
    request_body = UpdateUser,
    responses(
        (status = 200, description = "Updated profile", body = User),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "users"
)]
pub async fn update_me(
    State(state): State<AppState>,
    user: MemberUser,
    WithRejection(Json(update), _): WithRejection<Json<UpdateUser>, ApiError>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.users.update(user.id(), update).await?))
}

/// PUT /v1/users/me/location - Report the caller's position
#[utoipa::path(
    put,
    path = "/v1/users/me/location",
    request_body = UserLocation,
    responses(
        (status = 200, description = "Updated profile", body = User),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "users"
)]
pub async fn update_location(
    State(state): State<AppState>,
    user: MemberUser,
    WithRejection(Json(location), _): WithRejection<Json<UserLocation>, ApiError>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.users.update_location(user.id(), location).await?))
}

/// GET /v1/users/locations - Locations visible to the caller
///
/// Non-members may call this too; visibility rules decide what they see.
#[utoipa::path(
    get,
    path = "/v1/users/locations",
    responses(
        (status = 200, description = "Shared locations", body = Vec<SharedLocation>),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "users"
)]
pub async fn list_locations(
    State(state): State<AppState>,
    AuthUser(viewer): AuthUser,
) -> Result<Json<Vec<SharedLocation>>, ApiError> {
    Ok(Json(state.users.shared_locations(&viewer).await?))
}
