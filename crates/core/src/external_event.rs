// External (official) event domain types
//
// These types mirror the records delivered by the third-party events API.
// Field names follow the upstream wire format (camelCase, including the
// upstream spelling `titel`).

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// Event category as published by the events API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub code: String,
    pub text: String,
    pub color_text: String,
    pub color_background: String,
}

/// A cached record from the third-party events API.
/// `event_id` is the unique key of the cache collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ExternalEventDetails {
    pub event_id: i64,
    /// Event date combined with `start_time`, local wall-clock time of the event site.
    /// Filled in during normalisation; upstream only delivers the time of day.
    #[serde(default)]
    pub event_date: Option<NaiveDateTime>,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub titel: Option<String>,
    pub description: String,
    pub speaker: String,
    pub location: String,
    #[serde(default)]
    pub location_info: Option<String>,
    #[serde(default)]
    pub map_url: Option<String>,
    /// Raw admin identifiers; usually numeric member ids but not guaranteed.
    #[serde(default)]
    pub admins: Option<Vec<String>>,
    pub is_free: bool,
    pub price: i64,
    pub is_limited: bool,
    /// Remaining free slots, not total capacity.
    pub stock: i64,
    pub show_booked: bool,
    pub booked: i64,
    #[serde(default)]
    pub date_booking_start: Option<String>,
    #[serde(default)]
    pub date_booking_end: Option<String>,
    #[serde(default)]
    pub categories: Option<Vec<Category>>,
    #[serde(default)]
    pub image_url150: Option<String>,
    #[serde(default)]
    pub image_url300: Option<String>,
    pub event_url: String,
}

impl ExternalEventDetails {
    /// Combine the requested date with the record's `start_time` ("HH:MM").
    pub fn with_event_date(mut self, date: NaiveDate) -> anyhow::Result<Self> {
        let start = NaiveTime::parse_from_str(self.start_time.trim(), "%H:%M").map_err(|e| {
            anyhow::anyhow!(
                "invalid startTime '{}' on event {}: {}",
                self.start_time,
                self.event_id,
                e
            )
        })?;
        self.event_date = Some(date.and_time(start));
        Ok(self)
    }

    /// Whether `user_id` is listed among the raw admin identifiers.
    pub fn has_admin(&self, user_id: i64) -> bool {
        let needle = user_id.to_string();
        self.admins
            .as_deref()
            .unwrap_or_default()
            .iter()
            .any(|a| a.trim() == needle)
    }
}

/// Singleton discovery document: where the REST endpoint lives and which dates carry events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ExternalRoot {
    pub rest_url: String,
    #[serde(default)]
    pub dates: Vec<String>,
    /// Any further fields the discovery call returns are kept verbatim.
    #[serde(flatten)]
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ExternalRoot {
    /// A root is only usable when it carries a REST url.
    pub fn is_usable(&self) -> bool {
        !self.rest_url.trim().is_empty()
    }
}

/// An entry of the caller's booking list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BookedEvent {
    pub event_id: i64,
}

/// News item published by the event site.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct ExternalNews {
    /// Publication timestamp (date combined with time), local time of the event site.
    #[serde(default)]
    pub published: Option<NaiveDateTime>,
    pub date: String,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    pub description: String,
    #[serde(default)]
    pub by: Option<String>,
}

impl ExternalNews {
    /// Combine `date` ("YYYY-MM-DD") and `time` ("HH:MM") into `published`.
    pub fn normalized(mut self) -> anyhow::Result<Self> {
        let date = NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d")
            .map_err(|e| anyhow::anyhow!("invalid news date '{}': {}", self.date, e))?;
        let time = match self.time.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() => NaiveTime::parse_from_str(t, "%H:%M")
                .map_err(|e| anyhow::anyhow!("invalid news time '{}': {}", t, e))?,
            _ => NaiveTime::MIN,
        };
        self.published = Some(date.and_time(time));
        Ok(self)
    }
}
