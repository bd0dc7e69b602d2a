// In-process application for handler tests

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use serde_json::Value;
use swag_core::User;
use swag_storage::StorageBackend;
use tower::ServiceExt;

use crate::auth::{config::JwtConfig, AuthConfig};
use crate::services::testing::{FakeEventSite, FakeMembership};
use crate::AppContext;

pub struct TestApp {
    pub ctx: AppContext,
    pub site: Arc<FakeEventSite>,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let site = Arc::new(FakeEventSite::default());
        let auth_config = AuthConfig {
            jwt: JwtConfig {
                secret: "handler-tests".to_string(),
                ..JwtConfig::default()
            },
        };
        let ctx = AppContext::new(
            StorageBackend::in_memory(),
            &auth_config,
            Arc::new(FakeMembership),
            site.clone(),
            chrono_tz::Europe::Stockholm,
        );
        let router = ctx.api_routes();
        Self { ctx, site, router }
    }

    /// Create a profile and return an access token for it
    pub async fn login(&self, user: User) -> String {
        let user_id = user.user_id;
        self.ctx.storage.upsert_user(&user).await.unwrap();
        self.ctx
            .auth
            .jwt_service
            .generate_access_token(user_id)
            .unwrap()
            .0
    }

    /// Member profile named "First{id} Last{id}" with an upstream token "tok{id}"
    pub async fn member(&self, user_id: i64) -> String {
        let mut user = User::new(user_id, true);
        user.first_name = Some(format!("First{}", user_id));
        user.last_name = Some(format!("Last{}", user_id));
        self.ctx
            .storage
            .save_external_token(user_id, &format!("tok{}", user_id), Utc::now() + Duration::hours(1))
            .await
            .unwrap();
        self.login(user).await
    }

    pub async fn call(
        &self,
        method: &str,
        uri: &str,
        token: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder()
            .method(method)
            .uri(uri)
            .header("Authorization", format!("Bearer {}", token));
        let body = match body {
            Some(json) => {
                request = request.header("Content-Type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.call("GET", uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.call("POST", uri, token, body).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.call("PUT", uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.call("DELETE", uri, token, None).await
    }
}
