// OpenAPI specification generation
//
// Shared by the API server (Swagger UI) and the export-openapi binary.

use crate::{api, auth};
use swag_core::{
    Attendee, Category, ContactInfo, Event, EventAttendee, EventHost, EventTag,
    ExtendedUserEvent, ExternalEventDetails, ExternalNews, ExternalRoot, Host, Location, Report,
    SharedLocation, ShowAttendees, ShowLocation, UpdateUser, User, UserEvent, UserLocation,
    UserSettings,
};
use utoipa::OpenApi;

/// OpenAPI documentation for the Swag API
#[derive(OpenApi)]
#[openapi(
    paths(
        api::health::health,
        auth::routes::login,
        auth::routes::refresh_token,
        api::events::list_events,
        api::events::list_attending,
        api::events::list_official,
        api::events::list_unofficial,
        api::events::create_event,
        api::events::update_event,
        api::events::delete_event,
        api::events::attend_event,
        api::events::unattend_event,
        api::user_events::list_future,
        api::user_events::list_mine,
        api::user_events::list_cohosting,
        api::user_events::list_attending,
        api::user_events::list_invitations,
        api::user_events::create_event,
        api::user_events::get_event,
        api::user_events::update_event,
        api::user_events::delete_event,
        api::user_events::attend_event,
        api::user_events::unattend_event,
        api::user_events::accept_cohosting,
        api::user_events::deny_cohosting,
        api::user_events::leave_hosting,
        api::user_events::report_event,
        api::user_events::remove_report,
        api::user_events::list_reports,
        api::external::get_root,
        api::external::list_booked,
        api::external::list_news,
        api::users::get_me,
        api::users::update_me,
        api::users::update_location,
        api::users::list_locations,
    ),
    components(
        schemas(
            // Unified events
            Event, EventHost, EventTag, EventAttendee, ShowAttendees,
            // User events
            UserEvent, ExtendedUserEvent, Attendee, Host, Report, Location,
            api::user_events::ReportRequest,
            // External events
            ExternalEventDetails, Category, ExternalRoot, ExternalNews,
            // Users
            User, UserSettings, ShowLocation, ContactInfo, UserLocation, UpdateUser, SharedLocation,
            // Auth
            auth::routes::LoginRequest, auth::routes::RefreshTokenRequest, auth::routes::TokenResponse,
            // Common
            api::ErrorResponse, api::StatusMessage, api::health::HealthResponse,
        )
    ),
    tags(
        (name = "events", description = "Unified official and member events"),
        (name = "user-events", description = "Member-authored events"),
        (name = "external", description = "Cached data from the event site"),
        (name = "users", description = "User profiles and shared locations"),
        (name = "auth", description = "Membership login and token refresh"),
        (name = "health", description = "Service health")
    ),
    info(
        title = "Swag API",
        version = "0.3.0",
        description = "Backend for the Swag mobile app: official and member events, profiles and bookings",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    )
)]
pub struct ApiDoc;

impl ApiDoc {
    /// Generate the OpenAPI spec as a pretty-printed JSON string
    pub fn to_json() -> Result<String, serde_json::Error> {
        Self::openapi().to_pretty_json()
    }
}
