// Unified events HTTP routes
// Decision: Official and user events share one listing; writes are accepted for user events only
// Decision: Lists are plain JSON arrays (the mobile client reads them directly)

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use axum_extra::extract::WithRejection;
use swag_core::{Event, EventFilter};

use super::common::{ApiError, ErrorResponse};
use crate::auth::{AuthState, FromRef, MemberUser};
use crate::services::EventService;

/// App state for event routes
#[derive(Clone)]
pub struct AppState {
    pub events: Arc<EventService>,
    pub auth: AuthState,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(input: &AppState) -> Self {
        input.auth.clone()
    }
}

/// Create event routes
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/events", get(list_events).post(create_event))
        .route("/v1/events/attending", get(list_attending))
        .route("/v1/events/official", get(list_official))
        .route("/v1/events/unofficial", get(list_unofficial))
        .route("/v1/events/:id", put(update_event).delete(delete_event))
        .route("/v1/events/:id/attend", post(attend_event))
        .route("/v1/events/:id/unattend", post(unattend_event))
        .with_state(state)
}

/// GET /v1/events - List official and user events
#[utoipa::path(
    get,
    path = "/v1/events",
    params(EventFilter),
    responses(
        (status = 200, description = "Events sorted by start, then name", body = Vec<Event>),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Not a member", body = ErrorResponse)
    ),
    tag = "events"
)]
pub async fn list_events(
    State(state): State<AppState>,
    user: MemberUser,
    WithRejection(Query(filter), _): WithRejection<Query<EventFilter>, ApiError>,
) -> Json<Vec<Event>> {
    Json(state.events.list(user.id(), filter).await)
}

/// GET /v1/events/attending - Events the caller attends or has booked
#[utoipa::path(
    get,
    path = "/v1/events/attending",
    responses(
        (status = 200, description = "Attended events", body = Vec<Event>),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "events"
)]
pub async fn list_attending(State(state): State<AppState>, user: MemberUser) -> Json<Vec<Event>> {
    let filter = EventFilter {
        attending: Some(true),
        ..Default::default()
    };
    Json(state.events.list(user.id(), filter).await)
}

/// GET /v1/events/official - Events from the event site
#[utoipa::path(
    get,
    path = "/v1/events/official",
    responses(
        (status = 200, description = "Official events", body = Vec<Event>),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "events"
)]
pub async fn list_official(State(state): State<AppState>, user: MemberUser) -> Json<Vec<Event>> {
    let filter = EventFilter {
        official: Some(true),
        ..Default::default()
    };
    Json(state.events.list(user.id(), filter).await)
}

/// GET /v1/events/unofficial - Events created by members
#[utoipa::path(
    get,
    path = "/v1/events/unofficial",
    responses(
        (status = 200, description = "User events", body = Vec<Event>),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "events"
)]
pub async fn list_unofficial(State(state): State<AppState>, user: MemberUser) -> Json<Vec<Event>> {
    let filter = EventFilter {
        official: Some(false),
        ..Default::default()
    };
    Json(state.events.list(user.id(), filter).await)
}

/// POST /v1/events - Create a user event
#[utoipa::path(
    post,
    path = "/v1/events",
    request_body = Event,
    responses(
        (status = 201, description = "Event created", body = Event),
        (status = 400, description = "Official event or invalid payload", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "events"
)]
pub async fn create_event(
    State(state): State<AppState>,
    user: MemberUser,
    WithRejection(Json(event), _): WithRejection<Json<Event>, ApiError>,
) -> Result<(StatusCode, Json<Event>), ApiError> {
    let event = state.events.create(user.id(), event).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// PUT /v1/events/{id} - Update a user event
#[utoipa::path(
    put,
    path = "/v1/events/{id}",
    params(("id" = String, Path, description = "Unified event id (usr prefix)")),
    request_body = Event,
    responses(
        (status = 200, description = "Event updated", body = Event),
        (status = 400, description = "Not a user event id or forbidden change", body = ErrorResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse)
    ),
    tag = "events"
)]
pub async fn update_event(
    State(state): State<AppState>,
    user: MemberUser,
    Path(id): Path<String>,
    WithRejection(Json(event), _): WithRejection<Json<Event>, ApiError>,
) -> Result<Json<Event>, ApiError> {
    Ok(Json(state.events.update(user.id(), &id, event).await?))
}

/// DELETE /v1/events/{id} - Delete a user event
#[utoipa::path(
    delete,
    path = "/v1/events/{id}",
    params(("id" = String, Path, description = "Unified event id (usr prefix)")),
    responses(
        (status = 204, description = "Event deleted"),
        (status = 400, description = "Not a user event id", body = ErrorResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse)
    ),
    tag = "events"
)]
pub async fn delete_event(
    State(state): State<AppState>,
    user: MemberUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.events.delete(user.id(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /v1/events/{id}/attend - Attend a user event or book an official one
#[utoipa::path(
    post,
    path = "/v1/events/{id}/attend",
    params(("id" = String, Path, description = "Unified event id")),
    responses(
        (status = 200, description = "Event with the caller attending", body = Event),
        (status = 400, description = "Full, already attending, owner, or rejected upstream", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse)
    ),
    tag = "events"
)]
pub async fn attend_event(
    State(state): State<AppState>,
    user: MemberUser,
    Path(id): Path<String>,
) -> Result<Json<Event>, ApiError> {
    Ok(Json(state.events.attend(user.id(), &id).await?))
}

/// POST /v1/events/{id}/unattend - Leave a user event or cancel a booking
#[utoipa::path(
    post,
    path = "/v1/events/{id}/unattend",
    params(("id" = String, Path, description = "Unified event id")),
    responses(
        (status = 200, description = "Event without the caller", body = Event),
        (status = 400, description = "Not attending, owner, or rejected upstream", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse)
    ),
    tag = "events"
)]
pub async fn unattend_event(
    State(state): State<AppState>,
    user: MemberUser,
    Path(id): Path<String>,
) -> Result<Json<Event>, ApiError> {
    Ok(Json(state.events.unattend(user.id(), &id).await?))
}
