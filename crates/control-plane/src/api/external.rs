// External event HTTP routes
// Decision: Read-only views over the cache; refreshing it is the jobs' concern

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use swag_core::{EventError, ExternalEventDetails, ExternalNews, ExternalRoot};

use super::common::{ApiError, ErrorResponse};
use crate::auth::{AuthState, FromRef, MemberUser};
use crate::services::ExternalEventService;

/// App state for external event routes
#[derive(Clone)]
pub struct AppState {
    pub external: Arc<ExternalEventService>,
    pub auth: AuthState,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(input: &AppState) -> Self {
        input.auth.clone()
    }
}

/// Create external event routes
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/external_root", get(get_root))
        .route("/v1/external_events/booked", get(list_booked))
        .route("/v1/external_events/news", get(list_news))
        .with_state(state)
}

/// GET /v1/external_root - Last stored discovery document
#[utoipa::path(
    get,
    path = "/v1/external_root",
    responses(
        (status = 200, description = "Discovery document", body = ExternalRoot),
        (status = 404, description = "Not fetched yet", body = ErrorResponse)
    ),
    tag = "external"
)]
pub async fn get_root(
    State(state): State<AppState>,
    _user: MemberUser,
) -> Result<Json<ExternalRoot>, ApiError> {
    let root = state
        .external
        .root()
        .await?
        .ok_or_else(|| EventError::not_found("External root not found"))?;
    Ok(Json(root))
}

/// GET /v1/external_events/booked - Cached events the caller booked or administers
#[utoipa::path(
    get,
    path = "/v1/external_events/booked",
    responses(
        (status = 200, description = "Booked events", body = Vec<ExternalEventDetails>),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "external"
)]
pub async fn list_booked(
    State(state): State<AppState>,
    user: MemberUser,
) -> Json<Vec<ExternalEventDetails>> {
    Json(state.external.booked_details(user.id()).await)
}

/// GET /v1/external_events/news - Last stored news snapshot
#[utoipa::path(
    get,
    path = "/v1/external_events/news",
    responses((status = 200, description = "News", body = Vec<ExternalNews>)),
    tag = "external"
)]
pub async fn list_news(
    State(state): State<AppState>,
    _user: MemberUser,
) -> Json<Vec<ExternalNews>> {
    Json(state.external.news().await)
}
