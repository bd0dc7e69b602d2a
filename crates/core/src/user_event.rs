// User-authored event domain types
//
// A UserEvent is owned by the member who created it. Reports are private:
// they leave the store only through the owner-only reports listing, every
// other read goes through `make_safe`.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

use crate::datetime::lenient;
use crate::user::UNKNOWN_USER_NAME;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct Attendee {
    #[serde(rename = "userId")]
    pub user_id: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct Host {
    #[serde(rename = "userId")]
    pub user_id: i64,
}

/// Free-text report on an event, one per reporting user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct Report {
    #[serde(rename = "userId")]
    pub user_id: i64,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct Location {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    /// Marker glyph shown on the map
    #[serde(default)]
    pub marker: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

/// Event created by a member
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct UserEvent {
    /// Assigned by the store on create
    #[serde(default)]
    pub id: Option<Uuid>,
    /// Owner
    #[serde(rename = "userId")]
    pub user_id: i64,
    #[serde(default)]
    pub hosts: Vec<Host>,
    /// Invited co-hosts that have not accepted yet
    #[serde(default)]
    pub suggested_hosts: Vec<Host>,
    pub name: String,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(deserialize_with = "lenient::deserialize")]
    pub start: DateTime<Utc>,
    #[serde(default, deserialize_with = "lenient::option::deserialize")]
    pub end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub reports: Vec<Report>,
    #[serde(default)]
    pub attendees: Vec<Attendee>,
    #[serde(rename = "maxAttendees", default)]
    pub max_attendees: Option<i64>,
}

impl UserEvent {
    /// Copy with reports stripped, for every outward-facing read
    pub fn make_safe(mut self) -> Self {
        self.reports.clear();
        self
    }

    pub fn is_owner(&self, user_id: i64) -> bool {
        self.user_id == user_id
    }

    pub fn is_attending(&self, user_id: i64) -> bool {
        self.attendees.iter().any(|a| a.user_id == user_id)
    }

    pub fn is_host(&self, user_id: i64) -> bool {
        self.hosts.iter().any(|h| h.user_id == user_id)
    }

    pub fn is_suggested_host(&self, user_id: i64) -> bool {
        self.suggested_hosts.iter().any(|h| h.user_id == user_id)
    }

    /// Whether one more attendee fits under the cap
    pub fn has_free_slot(&self) -> bool {
        match self.max_attendees {
            Some(max) => (self.attendees.len() as i64) < max,
            None => true,
        }
    }

    /// Owner, hosts and attendees, deduplicated
    pub fn referenced_user_ids(&self) -> BTreeSet<i64> {
        std::iter::once(self.user_id)
            .chain(self.hosts.iter().map(|h| h.user_id))
            .chain(self.attendees.iter().map(|a| a.user_id))
            .collect()
    }
}

/// UserEvent with display names resolved at read time. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct ExtendedUserEvent {
    #[serde(flatten)]
    pub event: UserEvent,
    #[serde(rename = "ownerName")]
    pub owner_name: String,
    #[serde(rename = "hostNames", default)]
    pub host_names: Vec<String>,
    #[serde(rename = "attendeeNames", default)]
    pub attendee_names: Vec<String>,
}

impl ExtendedUserEvent {
    /// Stamp display names from a pre-resolved `user_id -> name` table
    pub fn extend(event: UserEvent, names: &HashMap<i64, String>) -> Self {
        let lookup = |id: i64| {
            names
                .get(&id)
                .cloned()
                .unwrap_or_else(|| UNKNOWN_USER_NAME.to_string())
        };

        Self {
            owner_name: lookup(event.user_id),
            host_names: event.hosts.iter().map(|h| lookup(h.user_id)).collect(),
            attendee_names: event.attendees.iter().map(|a| lookup(a.user_id)).collect(),
            event,
        }
    }
}
