// Authentication extractors
// Decision: Bearer token only (mobile client), no cookies
// Decision: The extractor loads the profile so handlers get membership and names for free

use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use swag_core::{EventError, User};
use swag_storage::StorageBackend;

use super::jwt::JwtService;
use crate::api::common::ApiError;

/// Auth state shared across routes
#[derive(Clone)]
pub struct AuthState {
    pub jwt_service: Arc<JwtService>,
    pub storage: StorageBackend,
}

impl AuthState {
    pub fn new(jwt_service: Arc<JwtService>, storage: StorageBackend) -> Self {
        Self {
            jwt_service,
            storage,
        }
    }
}

/// Helper trait for extracting AuthState from application state
pub trait FromRef<T> {
    fn from_ref(input: &T) -> Self;
}

impl FromRef<AuthState> for AuthState {
    fn from_ref(input: &AuthState) -> Self {
        input.clone()
    }
}

/// Authenticated caller with their profile.
/// Returns 401 if the token is missing, invalid or names an unknown user.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl AuthUser {
    pub fn id(&self) -> i64 {
        self.0.user_id
    }
}

/// Authenticated caller that is a full member; 403 otherwise
#[derive(Debug, Clone)]
pub struct MemberUser(pub User);

impl MemberUser {
    pub fn id(&self) -> i64 {
        self.0.user_id
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = AuthState::from_ref(state);

        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| EventError::unauthorized("Authentication required"))?;

        let claims = auth_state
            .jwt_service
            .validate_access_token(bearer.token())
            .map_err(|e| {
                tracing::debug!("JWT validation failed: {}", e);
                EventError::unauthorized("Invalid or expired token")
            })?;
        let user_id = claims
            .user_id()
            .map_err(|_| EventError::unauthorized("Invalid user ID in token"))?;

        let user = auth_state
            .storage
            .get_user(user_id)
            .await?
            .ok_or_else(|| EventError::unauthorized("Unknown user"))?;

        Ok(AuthUser(user))
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for MemberUser
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;

        if !user.is_member {
            return Err(EventError::forbidden("Membership required").into());
        }

        Ok(MemberUser(user))
    }
}
