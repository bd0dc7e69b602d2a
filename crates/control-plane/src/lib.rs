// Swag Control Plane Library
// Decision: Shared library for binaries (API server, OpenAPI export)

use std::sync::Arc;

use axum::Router;
use chrono_tz::Tz;
use swag_core::{EventSiteApi, MembershipApi};
use swag_storage::StorageBackend;

// API routes and types (shared for OpenAPI generation)
pub mod api;

// Authentication module
pub mod auth;

// Configuration
pub mod config;

// Background jobs
pub mod jobs;

// Services layer
pub mod services;

// OpenAPI spec generation
pub mod openapi;

use auth::{AuthConfig, AuthState, JwtService, LoginState};
use services::{EventService, ExternalEventService, UserEventService, UserService};

/// Services and clients shared by routes and jobs
#[derive(Clone)]
pub struct AppContext {
    pub storage: StorageBackend,
    pub auth: AuthState,
    pub membership: Arc<dyn MembershipApi>,
    pub users: Arc<UserService>,
    pub external: Arc<ExternalEventService>,
    pub user_events: Arc<UserEventService>,
    pub events: Arc<EventService>,
}

impl AppContext {
    pub fn new(
        storage: StorageBackend,
        auth_config: &AuthConfig,
        membership: Arc<dyn MembershipApi>,
        event_site: Arc<dyn EventSiteApi>,
        timezone: Tz,
    ) -> Self {
        let jwt_service = Arc::new(JwtService::new(auth_config.jwt.clone()));
        let auth = AuthState::new(jwt_service, storage.clone());

        let users = Arc::new(UserService::new(storage.clone()));
        let external = Arc::new(ExternalEventService::new(storage.clone(), event_site));
        let user_events = Arc::new(UserEventService::new(storage.clone(), users.clone()));
        let events = Arc::new(EventService::new(
            external.clone(),
            user_events.clone(),
            timezone,
        ));

        Self {
            storage,
            auth,
            membership,
            users,
            external,
            user_events,
            events,
        }
    }

    /// Every versioned API route (auth included), without prefix or health
    pub fn api_routes(&self) -> Router {
        let login_state = LoginState {
            auth: self.auth.clone(),
            membership: self.membership.clone(),
            users: self.users.clone(),
        };

        // /v1/events/attending etc. are static segments and win over /v1/events/:id
        Router::new()
            .merge(api::events::routes(api::events::AppState {
                events: self.events.clone(),
                auth: self.auth.clone(),
            }))
            .merge(api::user_events::routes(api::user_events::AppState {
                user_events: self.user_events.clone(),
                auth: self.auth.clone(),
            }))
            .merge(api::external::routes(api::external::AppState {
                external: self.external.clone(),
                auth: self.auth.clone(),
            }))
            .merge(api::users::routes(api::users::AppState {
                users: self.users.clone(),
                auth: self.auth.clone(),
            }))
            .merge(auth::routes(login_state))
    }
}
