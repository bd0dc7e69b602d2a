// Core traits for third-party integrations
//
// Services depend on these traits only; the HTTP clients live in
// swag-external and tests plug in in-process fakes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::external_event::{ExternalEventDetails, ExternalNews, ExternalRoot};

/// Successful login against the membership API
#[derive(Debug, Clone, PartialEq)]
pub struct MemberLogin {
    pub member_id: i64,
    /// Token for the events API, acting on behalf of this member
    pub token: String,
    /// Expiry of `token`; `None` when upstream omits or garbles it
    pub valid_through: Option<DateTime<Utc>>,
    pub is_member: bool,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

/// Membership (login) API
#[async_trait]
pub trait MembershipApi: Send + Sync {
    /// Verify credentials. Rejected credentials are `InvalidRequest("Invalid credentials")`.
    async fn login(&self, username: &str, password: &str) -> Result<MemberLogin>;
}

/// Third-party events API
///
/// Operation calls take the REST url from the stored discovery document;
/// implementations fall back to their configured url when it is empty.
#[async_trait]
pub trait EventSiteApi: Send + Sync {
    /// Discovery call: current REST url and the dates carrying events
    async fn fetch_root(&self) -> Result<ExternalRoot>;

    /// Event records of one date ("YYYY-MM-DD"), `event_date` already combined
    /// with each record's start time. Malformed records are skipped.
    async fn fetch_event_details(&self, rest_url: &str, date: &str) -> Result<Vec<ExternalEventDetails>>;

    /// Latest news items, normalised
    async fn fetch_news(&self, rest_url: &str) -> Result<Vec<ExternalNews>>;

    /// Ids of the events the token owner has booked
    async fn booked_event_ids(&self, rest_url: &str, token: &str) -> Result<Vec<i64>>;

    /// Book an event on behalf of the token owner
    async fn book(&self, rest_url: &str, token: &str, event_id: i64) -> Result<()>;

    /// Cancel a booking on behalf of the token owner
    async fn unbook(&self, rest_url: &str, token: &str, event_id: i64) -> Result<()>;
}
