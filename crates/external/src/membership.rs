// Membership API client
//
// Implements the MembershipApi trait from swag-core. Credentials are verified
// upstream; this service never stores passwords.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use swag_core::datetime::parse_datetime;
use swag_core::{EventError, MemberLogin, MembershipApi, Result};

use crate::config::ExternalApiConfig;
use crate::hash::{calc_hash, request_timestamp};

/// Member `type` value marking a full member
const MEMBER_TYPE: &str = "M";

#[derive(Serialize)]
struct LoginRequest<'a> {
    client: &'a str,
    user: &'a str,
    password: &'a str,
    timestamp: &'a str,
    hash: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    /// Number or numeric string depending on the upstream version
    member_id: Option<Value>,
    token: Option<String>,
    valid_through: Option<String>,
    #[serde(rename = "type")]
    member_type: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
}

fn parse_member_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Client for the membership login endpoint
#[derive(Clone)]
pub struct MembershipClient {
    client: Client,
    config: ExternalApiConfig,
}

impl MembershipClient {
    pub fn new(client: Client, config: ExternalApiConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl MembershipApi for MembershipClient {
    async fn login(&self, username: &str, password: &str) -> Result<MemberLogin> {
        let timestamp = request_timestamp(Utc::now(), self.config.timezone);
        let hash = calc_hash(&[username, password, &timestamp, &self.config.loginm_seed]);

        tracing::info!(
            client = %self.config.client_name,
            user = %username,
            timestamp = %timestamp,
            "Sending membership login"
        );

        let response = self
            .client
            .post(&self.config.member_api_url)
            .json(&LoginRequest {
                client: &self.config.client_name,
                user: username,
                password,
                timestamp: &timestamp,
                hash: &hash,
            })
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to send membership login");
                EventError::upstream("membership service unreachable")
            })?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            tracing::warn!(status = %status, user = %username, "Membership login rejected");
            return Err(EventError::invalid("Invalid credentials"));
        }

        let body: LoginResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to parse membership login response");
            EventError::upstream("malformed membership response")
        })?;

        let (Some(member_id), Some(token)) = (body.member_id.as_ref().and_then(parse_member_id), body.token)
        else {
            tracing::warn!(user = %username, "Membership response without memberId or token");
            return Err(EventError::invalid("Invalid credentials"));
        };

        let valid_through = body
            .valid_through
            .as_deref()
            .and_then(|v| parse_datetime(v, self.config.timezone));
        if valid_through.is_none() {
            tracing::warn!(member_id, "Membership response without usable validThrough");
        }

        Ok(MemberLogin {
            member_id,
            token,
            valid_through,
            is_member: body.member_type.as_deref() == Some(MEMBER_TYPE),
            first_name: body.first_name,
            last_name: body.last_name,
            email: body.email,
        })
    }
}
