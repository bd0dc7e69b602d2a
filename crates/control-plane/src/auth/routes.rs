// Authentication HTTP routes
// Decision: Credentials are verified by the membership API; this service only issues its own JWTs
// Decision: Paths keep the mobile client's names (/v1/authm, /v1/refresh_token)

use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use axum_extra::extract::WithRejection;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use swag_core::{EventError, MembershipApi, User};
use utoipa::ToSchema;

use super::{jwt::TokenPair, middleware::AuthState};
use crate::api::common::{ApiError, ErrorResponse};
use crate::services::UserService;

/// State of the login routes
#[derive(Clone)]
pub struct LoginState {
    pub auth: AuthState,
    pub membership: Arc<dyn MembershipApi>,
    pub users: Arc<UserService>,
}

/// Member login request
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Refresh token request
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

/// Issued token pair with the caller's profile
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub access_token_expiry: DateTime<Utc>,
    pub user: User,
}

impl TokenResponse {
    fn new(pair: TokenPair, user: User) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            access_token_expiry: pair.access_token_expiry,
            user,
        }
    }
}

/// Create auth routes
pub fn routes(state: LoginState) -> Router {
    Router::new()
        .route("/v1/authm", post(login))
        .route("/v1/refresh_token", post(refresh_token))
        .with_state(state)
}

/// POST /v1/authm - Log in with membership credentials
#[utoipa::path(
    post,
    path = "/v1/authm",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = TokenResponse),
        (status = 400, description = "Invalid credentials", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<LoginState>,
    WithRejection(Json(req), _): WithRejection<Json<LoginRequest>, ApiError>,
) -> Result<Json<TokenResponse>, ApiError> {
    tracing::info!(username = %req.username, "Member login");

    let member = state
        .membership
        .login(&req.username, &req.password)
        .await
        .map_err(|e| {
            tracing::warn!(username = %req.username, error = %e, "Membership login failed");
            match e {
                EventError::Internal(_) => e,
                _ => EventError::invalid("Invalid credentials"),
            }
        })?;

    let user = state.users.record_login(&member).await?;
    let pair = state.auth.jwt_service.generate_token_pair(user.user_id)?;

    Ok(Json(TokenResponse::new(pair, user)))
}

/// POST /v1/refresh_token - Exchange a refresh token for a new pair
#[utoipa::path(
    post,
    path = "/v1/refresh_token",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "New token pair", body = TokenResponse),
        (status = 401, description = "Invalid refresh token", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn refresh_token(
    State(state): State<LoginState>,
    WithRejection(Json(req), _): WithRejection<Json<RefreshTokenRequest>, ApiError>,
) -> Result<Json<TokenResponse>, ApiError> {
    let claims = state
        .auth
        .jwt_service
        .validate_refresh_token(&req.refresh_token)
        .map_err(|_| EventError::unauthorized("Invalid refresh token"))?;
    let user_id = claims
        .user_id()
        .map_err(|_| EventError::unauthorized("Invalid refresh token"))?;

    let user = state
        .auth
        .storage
        .get_user(user_id)
        .await?
        .ok_or_else(|| EventError::unauthorized("Unknown user"))?;
    let pair = state.auth.jwt_service.generate_token_pair(user.user_id)?;

    Ok(Json(TokenResponse::new(pair, user)))
}
