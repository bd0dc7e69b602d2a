// User event HTTP routes
// Decision: Reads return ExtendedUserEvent without reports; reports are only listed for the owner
// Decision: Actions without a resource to return answer with a StatusMessage

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use swag_core::{EventError, ExtendedUserEvent, Report, UserEvent};
use utoipa::ToSchema;
use uuid::Uuid;

use super::common::{ApiError, ErrorResponse, StatusMessage};
use crate::auth::{AuthState, FromRef, MemberUser};
use crate::services::UserEventService;

/// App state for user event routes
#[derive(Clone)]
pub struct AppState {
    pub user_events: Arc<UserEventService>,
    pub auth: AuthState,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(input: &AppState) -> Self {
        input.auth.clone()
    }
}

/// Report on an event
#[derive(Debug, Deserialize, ToSchema)]
pub struct ReportRequest {
    #[schema(example = "The music was too loud")]
    pub text: String,
}

/// Create user event routes
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/user_events", get(list_future).post(create_event))
        .route("/v1/user_events/mine", get(list_mine))
        .route("/v1/user_events/cohosting", get(list_cohosting))
        .route("/v1/user_events/attending", get(list_attending))
        .route("/v1/user_events/invitations", get(list_invitations))
        .route(
            "/v1/user_events/:id",
            get(get_event).put(update_event).delete(delete_event),
        )
        .route("/v1/user_events/:id/attend", post(attend_event))
        .route("/v1/user_events/:id/unattend", post(unattend_event))
        .route("/v1/user_events/:id/accept_cohosting", post(accept_cohosting))
        .route("/v1/user_events/:id/deny_cohosting", post(deny_cohosting))
        .route("/v1/user_events/:id/leave_hosting", post(leave_hosting))
        .route(
            "/v1/user_events/:id/report",
            axum::routing::put(report_event).delete(remove_report),
        )
        .route("/v1/user_events/:id/reports", get(list_reports))
        .with_state(state)
}

fn parse_id(id: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(id).map_err(|_| EventError::invalid(format!("Invalid event id: {}", id)).into())
}

// ============================================
// Listings
// ============================================

/// GET /v1/user_events - Events that have not ended
#[utoipa::path(
    get,
    path = "/v1/user_events",
    responses(
        (status = 200, description = "Upcoming user events", body = Vec<ExtendedUserEvent>),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "user-events"
)]
pub async fn list_future(
    State(state): State<AppState>,
    _user: MemberUser,
) -> Json<Vec<ExtendedUserEvent>> {
    let events = state.user_events.future(chrono::Utc::now()).await;
    Json(state.user_events.extend(events).await)
}

/// GET /v1/user_events/mine - Events the caller owns
#[utoipa::path(
    get,
    path = "/v1/user_events/mine",
    responses((status = 200, description = "Owned events", body = Vec<ExtendedUserEvent>)),
    tag = "user-events"
)]
pub async fn list_mine(
    State(state): State<AppState>,
    user: MemberUser,
) -> Json<Vec<ExtendedUserEvent>> {
    let events = state.user_events.owned_by(user.id()).await;
    Json(state.user_events.extend(events).await)
}

/// GET /v1/user_events/cohosting - Events the caller co-hosts
#[utoipa::path(
    get,
    path = "/v1/user_events/cohosting",
    responses((status = 200, description = "Co-hosted events", body = Vec<ExtendedUserEvent>)),
    tag = "user-events"
)]
pub async fn list_cohosting(
    State(state): State<AppState>,
    user: MemberUser,
) -> Json<Vec<ExtendedUserEvent>> {
    let events = state.user_events.hosted_by(user.id()).await;
    Json(state.user_events.extend(events).await)
}

/// GET /v1/user_events/attending - Events the caller attends
#[utoipa::path(
    get,
    path = "/v1/user_events/attending",
    responses((status = 200, description = "Attended events", body = Vec<ExtendedUserEvent>)),
    tag = "user-events"
)]
pub async fn list_attending(
    State(state): State<AppState>,
    user: MemberUser,
) -> Json<Vec<ExtendedUserEvent>> {
    let events = state.user_events.attended_by(user.id()).await;
    Json(state.user_events.extend(events).await)
}

/// GET /v1/user_events/invitations - Events the caller is invited to co-host
#[utoipa::path(
    get,
    path = "/v1/user_events/invitations",
    responses((status = 200, description = "Pending co-host invitations", body = Vec<ExtendedUserEvent>)),
    tag = "user-events"
)]
pub async fn list_invitations(
    State(state): State<AppState>,
    user: MemberUser,
) -> Json<Vec<ExtendedUserEvent>> {
    let events = state.user_events.invitations_for(user.id()).await;
    Json(state.user_events.extend(events).await)
}

// ============================================
// CRUD
// ============================================

/// POST /v1/user_events - Create an event owned by the caller
#[utoipa::path(
    post,
    path = "/v1/user_events",
    request_body = UserEvent,
    responses(
        (status = 201, description = "Event created", body = ExtendedUserEvent),
        (status = 400, description = "Attendees, hosts or reports given", body = ErrorResponse)
    ),
    tag = "user-events"
)]
pub async fn create_event(
    State(state): State<AppState>,
    user: MemberUser,
    WithRejection(Json(event), _): WithRejection<Json<UserEvent>, ApiError>,
) -> Result<(StatusCode, Json<ExtendedUserEvent>), ApiError> {
    let created = state.user_events.create_for(user.id(), event).await?;
    let extended = state.user_events.extend_one(created).await?;
    Ok((StatusCode::CREATED, Json(extended)))
}

/// GET /v1/user_events/{id} - Get an event
#[utoipa::path(
    get,
    path = "/v1/user_events/{id}",
    params(("id" = String, Path, description = "Event id")),
    responses(
        (status = 200, description = "Event", body = ExtendedUserEvent),
        (status = 404, description = "Event not found", body = ErrorResponse)
    ),
    tag = "user-events"
)]
pub async fn get_event(
    State(state): State<AppState>,
    _user: MemberUser,
    Path(id): Path<String>,
) -> Result<Json<ExtendedUserEvent>, ApiError> {
    let event = state
        .user_events
        .get_safe(parse_id(&id)?)
        .await?
        .ok_or_else(|| EventError::not_found("Event not found"))?;
    Ok(Json(state.user_events.extend_one(event).await?))
}

/// PUT /v1/user_events/{id} - Replace an event (owner only)
#[utoipa::path(
    put,
    path = "/v1/user_events/{id}",
    params(("id" = String, Path, description = "Event id")),
    request_body = UserEvent,
    responses(
        (status = 200, description = "Event updated", body = ExtendedUserEvent),
        (status = 400, description = "Owner, host or attendee change", body = ErrorResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse)
    ),
    tag = "user-events"
)]
pub async fn update_event(
    State(state): State<AppState>,
    user: MemberUser,
    Path(id): Path<String>,
    WithRejection(Json(event), _): WithRejection<Json<UserEvent>, ApiError>,
) -> Result<Json<ExtendedUserEvent>, ApiError> {
    let updated = state
        .user_events
        .update_for(user.id(), parse_id(&id)?, event)
        .await?;
    Ok(Json(state.user_events.extend_one(updated).await?))
}

/// DELETE /v1/user_events/{id} - Delete an event (owner only)
#[utoipa::path(
    delete,
    path = "/v1/user_events/{id}",
    params(("id" = String, Path, description = "Event id")),
    responses(
        (status = 200, description = "Event deleted", body = StatusMessage),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse)
    ),
    tag = "user-events"
)]
pub async fn delete_event(
    State(state): State<AppState>,
    user: MemberUser,
    Path(id): Path<String>,
) -> Result<Json<StatusMessage>, ApiError> {
    state.user_events.delete_for(user.id(), parse_id(&id)?).await?;
    Ok(Json(StatusMessage::new("Event deleted")))
}

// ============================================
// Member actions
// ============================================

/// POST /v1/user_events/{id}/attend - Attend an event
#[utoipa::path(
    post,
    path = "/v1/user_events/{id}/attend",
    params(("id" = String, Path, description = "Event id")),
    responses(
        (status = 200, description = "Attending", body = StatusMessage),
        (status = 400, description = "Owner, full or already attending", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse)
    ),
    tag = "user-events"
)]
pub async fn attend_event(
    State(state): State<AppState>,
    user: MemberUser,
    Path(id): Path<String>,
) -> Result<Json<StatusMessage>, ApiError> {
    state.user_events.attend(parse_id(&id)?, user.id()).await?;
    Ok(Json(StatusMessage::new("User is now attending the event")))
}

/// POST /v1/user_events/{id}/unattend - Stop attending an event
#[utoipa::path(
    post,
    path = "/v1/user_events/{id}/unattend",
    params(("id" = String, Path, description = "Event id")),
    responses(
        (status = 200, description = "No longer attending", body = StatusMessage),
        (status = 400, description = "Owner or not attending", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse)
    ),
    tag = "user-events"
)]
pub async fn unattend_event(
    State(state): State<AppState>,
    user: MemberUser,
    Path(id): Path<String>,
) -> Result<Json<StatusMessage>, ApiError> {
    state.user_events.unattend(parse_id(&id)?, user.id()).await?;
    Ok(Json(StatusMessage::new("User is no longer attending the event")))
}

/// POST /v1/user_events/{id}/accept_cohosting - Accept a co-host invitation
#[utoipa::path(
    post,
    path = "/v1/user_events/{id}/accept_cohosting",
    params(("id" = String, Path, description = "Event id")),
    responses(
        (status = 200, description = "Now co-hosting", body = StatusMessage),
        (status = 400, description = "Not invited", body = ErrorResponse)
    ),
    tag = "user-events"
)]
pub async fn accept_cohosting(
    State(state): State<AppState>,
    user: MemberUser,
    Path(id): Path<String>,
) -> Result<Json<StatusMessage>, ApiError> {
    state
        .user_events
        .accept_cohosting(parse_id(&id)?, user.id())
        .await?;
    Ok(Json(StatusMessage::new("User is now cohosting the event")))
}

/// POST /v1/user_events/{id}/deny_cohosting - Decline a co-host invitation
#[utoipa::path(
    post,
    path = "/v1/user_events/{id}/deny_cohosting",
    params(("id" = String, Path, description = "Event id")),
    responses(
        (status = 200, description = "Invitation declined", body = StatusMessage),
        (status = 400, description = "Not invited", body = ErrorResponse)
    ),
    tag = "user-events"
)]
pub async fn deny_cohosting(
    State(state): State<AppState>,
    user: MemberUser,
    Path(id): Path<String>,
) -> Result<Json<StatusMessage>, ApiError> {
    state
        .user_events
        .deny_cohosting(parse_id(&id)?, user.id())
        .await?;
    Ok(Json(StatusMessage::new("User denied cohosting the event")))
}

/// POST /v1/user_events/{id}/leave_hosting - Stop co-hosting
#[utoipa::path(
    post,
    path = "/v1/user_events/{id}/leave_hosting",
    params(("id" = String, Path, description = "Event id")),
    responses(
        (status = 200, description = "No longer hosting", body = StatusMessage),
        (status = 400, description = "Not a host", body = ErrorResponse)
    ),
    tag = "user-events"
)]
pub async fn leave_hosting(
    State(state): State<AppState>,
    user: MemberUser,
    Path(id): Path<String>,
) -> Result<Json<StatusMessage>, ApiError> {
    state
        .user_events
        .leave_hosting(parse_id(&id)?, user.id())
        .await?;
    Ok(Json(StatusMessage::new("User is no longer hosting the event")))
}

/// PUT /v1/user_events/{id}/report - Add or replace the caller's report
#[utoipa::path(
    put,
    path = "/v1/user_events/{id}/report",
    params(("id" = String, Path, description = "Event id")),
    request_body = ReportRequest,
    responses(
        (status = 200, description = "Report stored", body = StatusMessage),
        (status = 404, description = "Event not found", body = ErrorResponse)
    ),
    tag = "user-events"
)]
pub async fn report_event(
    State(state): State<AppState>,
    user: MemberUser,
    Path(id): Path<String>,
    WithRejection(Json(req), _): WithRejection<Json<ReportRequest>, ApiError>,
) -> Result<Json<StatusMessage>, ApiError> {
    state
        .user_events
        .report(parse_id(&id)?, user.id(), &req.text)
        .await?;
    Ok(Json(StatusMessage::new("Report submitted")))
}

/// DELETE /v1/user_events/{id}/report - Withdraw the caller's report
#[utoipa::path(
    delete,
    path = "/v1/user_events/{id}/report",
    params(("id" = String, Path, description = "Event id")),
    responses(
        (status = 200, description = "Report removed", body = StatusMessage),
        (status = 404, description = "Event or report not found", body = ErrorResponse)
    ),
    tag = "user-events"
)]
pub async fn remove_report(
    State(state): State<AppState>,
    user: MemberUser,
    Path(id): Path<String>,
) -> Result<Json<StatusMessage>, ApiError> {
    state
        .user_events
        .remove_report(parse_id(&id)?, user.id())
        .await?;
    Ok(Json(StatusMessage::new("Report removed")))
}

/// GET /v1/user_events/{id}/reports - Reports on an event (owner only)
#[utoipa::path(
    get,
    path = "/v1/user_events/{id}/reports",
    params(("id" = String, Path, description = "Event id")),
    responses(
        (status = 200, description = "Reports", body = Vec<Report>),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse)
    ),
    tag = "user-events"
)]
pub async fn list_reports(
    State(state): State<AppState>,
    user: MemberUser,
    Path(id): Path<String>,
) -> Result<Json<Vec<Report>>, ApiError> {
    Ok(Json(
        state.user_events.reports(parse_id(&id)?, user.id()).await?,
    ))
}

#[cfg(test)]
mod tests {
    use crate::api::testing::TestApp;
    use axum::http::StatusCode;
    use chrono::{Duration, Utc};
    use serde_json::{json, Value};

    fn payload(name: &str) -> Value {
        json!({
            "userId": 0,
            "name": name,
            "start": (Utc::now() + Duration::days(2)).to_rfc3339(),
            "suggested_hosts": [{"userId": 2}]
        })
    }

    async fn create(app: &TestApp, token: &str) -> (String, Value) {
        let (status, body) = app
            .post("/v1/user_events", token, Some(payload("Quiz night")))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        (body["id"].as_str().unwrap().to_string(), body)
    }

    #[tokio::test]
    async fn test_create_forces_owner() {
        let app = TestApp::new();
        let owner = app.member(1).await;

        let (_, body) = create(&app, &owner).await;
        assert_eq!(body["userId"], 1);
        assert_eq!(body["ownerName"], "First1 Last1");

        let mut with_attendees = payload("Sneaky");
        with_attendees["attendees"] = json!([{"userId": 3}]);
        let (status, _) = app
            .post("/v1/user_events", &owner, Some(with_attendees))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_listings() {
        let app = TestApp::new();
        let owner = app.member(1).await;
        let invited = app.member(2).await;
        let guest = app.member(3).await;
        let (id, _) = create(&app, &owner).await;

        app.post(&format!("/v1/user_events/{}/attend", id), &guest, None)
            .await;

        let (_, body) = app.get("/v1/user_events", &guest).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        let (_, body) = app.get("/v1/user_events/mine", &owner).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        let (_, body) = app.get("/v1/user_events/attending", &guest).await;
        assert_eq!(body[0]["attendeeNames"], json!(["First3 Last3"]));
        let (_, body) = app.get("/v1/user_events/invitations", &invited).await;
        assert_eq!(body.as_array().unwrap().len(), 1);

        let (status, _) = app
            .post(&format!("/v1/user_events/{}/accept_cohosting", id), &invited, None)
            .await;
        assert_eq!(status, StatusCode::OK);
        let (_, body) = app.get("/v1/user_events/cohosting", &invited).await;
        assert_eq!(body[0]["hostNames"], json!(["First2 Last2"]));

        let (status, _) = app
            .post(&format!("/v1/user_events/{}/accept_cohosting", id), &guest, None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_get_missing_and_malformed_id() {
        let app = TestApp::new();
        let member = app.member(1).await;

        let (status, body) = app
            .get(&format!("/v1/user_events/{}", uuid::Uuid::now_v7()), &member)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "Event not found");

        let (status, _) = app.get("/v1/user_events/not-a-uuid", &member).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_reports_stay_private() {
        let app = TestApp::new();
        let owner = app.member(1).await;
        let guest = app.member(3).await;
        let (id, created) = create(&app, &owner).await;

        let (status, _) = app
            .put(
                &format!("/v1/user_events/{}/report", id),
                &guest,
                json!({"text": "Too loud"}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = app.get(&format!("/v1/user_events/{}", id), &guest).await;
        assert_eq!(body["reports"], json!([]));

        // Owner update without reports keeps them
        let mut update = created.clone();
        update["name"] = json!("Quiz night 2");
        let (status, _) = app
            .put(&format!("/v1/user_events/{}", id), &owner, update)
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = app
            .get(&format!("/v1/user_events/{}/reports", id), &guest)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, body) = app
            .get(&format!("/v1/user_events/{}/reports", id), &owner)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["text"], "Too loud");

        let (status, _) = app
            .delete(&format!("/v1/user_events/{}/report", id), &guest)
            .await;
        assert_eq!(status, StatusCode::OK);
        let (_, body) = app
            .get(&format!("/v1/user_events/{}/reports", id), &owner)
            .await;
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn test_update_rejects_attendee_changes() {
        let app = TestApp::new();
        let owner = app.member(1).await;
        let (id, created) = create(&app, &owner).await;

        let mut update = created;
        update["attendees"] = json!([{"userId": 9}]);
        let (status, _) = app
            .put(&format!("/v1/user_events/{}", id), &owner, update)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_owner_cannot_attend_and_delete_flow() {
        let app = TestApp::new();
        let owner = app.member(1).await;
        let guest = app.member(3).await;
        let (id, _) = create(&app, &owner).await;

        let (status, _) = app
            .post(&format!("/v1/user_events/{}/attend", id), &owner, None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
            .delete(&format!("/v1/user_events/{}", id), &guest)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, body) = app
            .delete(&format!("/v1/user_events/{}", id), &owner)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Event deleted");
    }
}
