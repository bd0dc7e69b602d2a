// Unified event model
//
// Official (external) and user-authored events are projected into one flat
// shape. The id carries a 3-character source prefix; the prefix alone
// decides which store and mapper handle any later operation on the id.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

use crate::datetime::lenient;
use crate::error::{EventError, Result};

/// Prefix of ids backed by the external event cache
pub const EXTERNAL_PREFIX: &str = "ext";
/// Prefix of ids backed by the user event store
pub const USER_PREFIX: &str = "usr";

/// Origin store of a unified event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventSource {
    External,
    User,
}

impl EventSource {
    pub const ALL: [EventSource; 2] = [EventSource::External, EventSource::User];

    pub fn prefix(self) -> &'static str {
        match self {
            EventSource::External => EXTERNAL_PREFIX,
            EventSource::User => USER_PREFIX,
        }
    }
}

/// A unified id split into its source and the source-local id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventId {
    External(i64),
    User(Uuid),
}

impl EventId {
    /// Split a unified id.
    ///
    /// Unknown prefixes and malformed source ids are client errors.
    pub fn parse(id: &str) -> Result<Self> {
        let source = EventSource::ALL
            .into_iter()
            .find(|s| id.starts_with(s.prefix()))
            .ok_or_else(|| EventError::invalid(format!("Unknown event id prefix: {}", id)))?;
        let local = &id[source.prefix().len()..];

        match source {
            EventSource::External => local
                .parse::<i64>()
                .map(EventId::External)
                .map_err(|_| EventError::invalid(format!("Malformed external event id: {}", id))),
            EventSource::User => Uuid::parse_str(local)
                .map(EventId::User)
                .map_err(|_| EventError::invalid(format!("Malformed user event id: {}", id))),
        }
    }

    pub fn source(&self) -> EventSource {
        match self {
            EventId::External(_) => EventSource::External,
            EventId::User(_) => EventSource::User,
        }
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventId::External(id) => write!(f, "{}{}", EXTERNAL_PREFIX, id),
            EventId::User(id) => write!(f, "{}{}", USER_PREFIX, id),
        }
    }
}

/// Who may see the attendee list
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub enum ShowAttendees {
    #[default]
    None,
    All,
    ToAttending,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct EventHost {
    pub user_id: i64,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct EventAttendee {
    pub user_id: i64,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct EventTag {
    pub code: String,
    pub text: String,
    pub color_text: String,
    pub color_background: String,
}

/// Source-agnostic event as served to clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// `{prefix}{source id}`; empty on create payloads
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub parent_event: Option<String>,
    /// User ids with admin rights (the owner for user events)
    #[serde(default)]
    pub admin: Vec<i64>,
    #[serde(default)]
    pub hosts: Vec<EventHost>,
    pub name: String,
    #[serde(default)]
    pub tags: Vec<EventTag>,
    #[serde(default)]
    pub location_description: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub location_marker: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(deserialize_with = "lenient::deserialize")]
    pub start: DateTime<Utc>,
    #[serde(default, deserialize_with = "lenient::option::deserialize")]
    pub end: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient::option::deserialize")]
    pub cancelled: Option<DateTime<Utc>>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient::option::deserialize")]
    pub booking_start: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient::option::deserialize")]
    pub booking_end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub show_attendees: ShowAttendees,
    #[serde(default)]
    pub attendees: Vec<EventAttendee>,
    /// Waitlisted users
    #[serde(default)]
    pub queue: Vec<EventAttendee>,
    #[serde(default)]
    pub max_attendees: Option<i64>,
    /// 0 when free
    #[serde(default)]
    pub price: f64,
    /// true for external events, false for user-authored ones
    #[serde(default)]
    pub official: bool,
    /// The requesting user attends / has booked
    #[serde(default)]
    pub attending: bool,
    /// The requesting user could attend / book right now
    #[serde(default)]
    pub bookable: bool,
    /// Source specific data that does not fit the unified shape
    #[serde(default)]
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub extras: serde_json::Map<String, serde_json::Value>,
}

impl Event {
    /// Sort key of the unified listing: start, then lowercased name
    pub fn sort_key(&self) -> (DateTime<Utc>, String) {
        (self.start, self.name.to_lowercase())
    }

    /// Bare event used when an attended external event is not cached yet
    pub fn placeholder(id: EventId, start: DateTime<Utc>, attending: bool) -> Self {
        Self {
            id: id.to_string(),
            parent_event: None,
            admin: vec![],
            hosts: vec![],
            name: String::new(),
            tags: vec![],
            location_description: None,
            address: None,
            location_marker: None,
            latitude: None,
            longitude: None,
            start,
            end: None,
            cancelled: None,
            image_url: None,
            description: None,
            booking_start: None,
            booking_end: None,
            show_attendees: ShowAttendees::None,
            attendees: vec![],
            queue: vec![],
            max_attendees: None,
            price: 0.0,
            official: matches!(id, EventId::External(_)),
            attending,
            bookable: false,
            extras: serde_json::Map::new(),
        }
    }
}

/// Optional filters of the unified listing; `None` matches both states
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
pub struct EventFilter {
    pub attending: Option<bool>,
    pub bookable: Option<bool>,
    pub official: Option<bool>,
}

impl EventFilter {
    pub fn matches(&self, event: &Event) -> bool {
        fn check(want: Option<bool>, actual: bool) -> bool {
            want.map_or(true, |w| w == actual)
        }

        check(self.attending, event.attending)
            && check(self.bookable, event.bookable)
            && check(self.official, event.official)
    }
}
