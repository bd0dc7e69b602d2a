// Storage models (internal, may differ from public DTOs)

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Stored third-party access token of a member
#[derive(Debug, Clone, FromRow, PartialEq, Eq)]
pub struct ExternalTokenRow {
    pub user_id: i64,
    pub token: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl ExternalTokenRow {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// Selection of user events for list reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserEventQuery {
    /// `start` or `end` at or after the instant
    EndingAfter(DateTime<Utc>),
    /// `start` at or after the instant
    StartingSince(DateTime<Utc>),
    OwnedBy(i64),
    HostedBy(i64),
    AttendedBy(i64),
    /// Invited as co-host, not accepted yet
    SuggestedHost(i64),
}

/// Arrays a document replace carries over from the stored copy.
/// `attendees` and `reports` are always carried over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preserve {
    ServerOwned,
    /// Also keep `suggested_hosts`
    ServerOwnedAndInvitations,
}

impl Preserve {
    /// Document keys taken from the stored copy
    pub fn fields(self) -> &'static [&'static str] {
        match self {
            Self::ServerOwned => &["attendees", "reports"],
            Self::ServerOwnedAndInvitations => &["attendees", "reports", "suggested_hosts"],
        }
    }
}

/// Result of the conditional add-to-set on `attendees`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttendOutcome {
    Added,
    AlreadyAttending,
    /// `maxAttendees` reached
    Full,
    NotFound,
}
