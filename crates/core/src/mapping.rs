// Event mapping layer
//
// Pure functions projecting cached external records and user events into the
// unified Event shape, plus the reverse path used by the unified write API.
// "now" is always passed in so the time-dependent rules stay deterministic.

use std::collections::HashSet;

use chrono::{DateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use serde_json::{json, Map, Value};

use crate::datetime::{local_to_utc, parse_datetime};
use crate::event::{Event, EventAttendee, EventHost, EventId, EventTag, ShowAttendees};
use crate::external_event::ExternalEventDetails;
use crate::user_event::{Attendee, ExtendedUserEvent, Host, Location, UserEvent};

/// Longest fallback name derived from an external event description
const FALLBACK_NAME_CHARS: usize = 60;

/// Per-request inputs shared by the mappers
#[derive(Debug, Clone, Copy)]
pub struct MappingContext<'a> {
    pub current_user_id: i64,
    /// External event ids the current user has booked upstream
    pub booked_ids: &'a HashSet<i64>,
    pub now: DateTime<Utc>,
    /// Timezone of the wall-clock times delivered by the events API
    pub timezone: Tz,
}

// ============================================================================
// External -> unified
// ============================================================================

/// Project a cached external record.
///
/// Returns `None` (and logs) for records that cannot be mapped; one bad
/// record must never fail a listing.
pub fn map_external_event(details: &ExternalEventDetails, ctx: &MappingContext<'_>) -> Option<Event> {
    let Some(event_date) = details.event_date else {
        tracing::warn!(event_id = details.event_id, "External event missing eventDate");
        return None;
    };

    let start = local_to_utc(event_date, ctx.timezone);
    let end = NaiveTime::parse_from_str(details.end_time.trim(), "%H:%M")
        .ok()
        .map(|t| local_to_utc(event_date.date().and_time(t), ctx.timezone));

    let booking_start = details
        .date_booking_start
        .as_deref()
        .and_then(|s| parse_booking_bound(s, details.event_id, ctx.timezone));
    let booking_end = details
        .date_booking_end
        .as_deref()
        .and_then(|s| parse_booking_bound(s, details.event_id, ctx.timezone))
        .unwrap_or(start);

    let attending = ctx.booked_ids.contains(&details.event_id);

    let within_window = booking_start.map_or(true, |bs| bs <= ctx.now) && ctx.now <= booking_end;
    let capacity_ok = !details.is_limited || details.stock > 0;
    let bookable = within_window && capacity_ok && start >= ctx.now;

    let admin = details
        .admins
        .as_deref()
        .unwrap_or_default()
        .iter()
        .filter_map(|raw| raw.trim().parse::<i64>().ok())
        .collect();

    let categories = details.categories.clone().unwrap_or_default();
    let tags = categories
        .iter()
        .map(|c| EventTag {
            code: c.code.clone(),
            text: c.text.clone(),
            color_text: c.color_text.clone(),
            color_background: c.color_background.clone(),
        })
        .collect();

    let mut extras = Map::new();
    extras.insert("speaker".into(), json!(details.speaker));
    extras.insert("categories".into(), json!(categories));
    extras.insert("eventUrl".into(), json!(details.event_url));
    extras.insert("adminsRaw".into(), json!(details.admins.clone().unwrap_or_default()));
    extras.insert("mapUrl".into(), json!(details.map_url));
    extras.insert("showBooked".into(), json!(details.show_booked));
    extras.insert("bookedCount".into(), json!(details.booked));

    Some(Event {
        id: EventId::External(details.event_id).to_string(),
        parent_event: None,
        admin,
        hosts: vec![],
        name: external_name(details),
        tags,
        location_description: details.location_info.clone(),
        address: Some(details.location.clone()),
        location_marker: None,
        latitude: None,
        longitude: None,
        start,
        end,
        cancelled: None,
        image_url: details
            .image_url300
            .clone()
            .or_else(|| details.image_url150.clone()),
        description: Some(details.description.clone()),
        booking_start,
        booking_end: Some(booking_end),
        show_attendees: ShowAttendees::None,
        attendees: vec![],
        queue: vec![],
        max_attendees: details
            .is_limited
            .then(|| details.booked + details.stock),
        price: if details.is_free {
            0.0
        } else {
            details.price as f64
        },
        official: true,
        attending,
        bookable,
        extras,
    })
}

fn parse_booking_bound(raw: &str, event_id: i64, tz: Tz) -> Option<DateTime<Utc>> {
    let parsed = parse_datetime(raw, tz);
    if parsed.is_none() && !raw.trim().is_empty() {
        tracing::warn!(event_id, value = raw, "Failed to parse booking window bound");
    }
    parsed
}

fn external_name(details: &ExternalEventDetails) -> String {
    match details.titel.as_deref().map(str::trim) {
        Some(title) if !title.is_empty() => title.to_string(),
        _ => details
            .description
            .lines()
            .next()
            .unwrap_or_default()
            .chars()
            .take(FALLBACK_NAME_CHARS)
            .collect(),
    }
}

// ============================================================================
// User event -> unified
// ============================================================================

/// Project a user event. Never fails; inputs were validated by the store.
pub fn map_user_event(ue: &ExtendedUserEvent, ctx: &MappingContext<'_>) -> Event {
    let event = &ue.event;
    let attending = event.is_attending(ctx.current_user_id);
    let bookable = event.has_free_slot() && !attending && event.start >= ctx.now;
    let location = event.location.clone().unwrap_or_default();

    let hosts = event
        .hosts
        .iter()
        .enumerate()
        .map(|(i, h)| EventHost {
            user_id: h.user_id,
            name: ue.host_names.get(i).cloned(),
        })
        .collect();
    let attendees = event
        .attendees
        .iter()
        .enumerate()
        .map(|(i, a)| EventAttendee {
            user_id: a.user_id,
            name: ue.attendee_names.get(i).cloned(),
        })
        .collect();

    let mut extras = Map::new();
    extras.insert("ownerName".into(), Value::String(ue.owner_name.clone()));
    extras.insert("hostNames".into(), json!(ue.host_names));
    extras.insert("attendeeNames".into(), json!(ue.attendee_names));
    extras.insert("reportsCount".into(), json!(event.reports.len()));

    Event {
        id: event
            .id
            .map(|id| EventId::User(id).to_string())
            .unwrap_or_default(),
        parent_event: None,
        admin: vec![event.user_id],
        hosts,
        name: event.name.clone(),
        tags: vec![],
        location_description: location.description,
        address: location.address,
        location_marker: location.marker,
        latitude: location.latitude,
        longitude: location.longitude,
        start: event.start,
        end: event.end,
        cancelled: None,
        image_url: None,
        description: event.description.clone(),
        booking_start: None,
        booking_end: Some(event.start),
        show_attendees: ShowAttendees::All,
        attendees,
        queue: vec![],
        max_attendees: event.max_attendees,
        price: 0.0,
        official: false,
        attending,
        bookable,
        extras,
    }
}

// ============================================================================
// Unified -> user event
// ============================================================================

/// Map a unified payload back onto the user event store.
///
/// Attendees and reports are server-owned and always come from `existing`.
/// On create (`existing == None`) payload hosts become invitations, since
/// nobody accepted them yet; on update they are taken from the payload and
/// the caller validates that no new host was smuggled in.
pub fn map_event_to_user_event(event: &Event, owner_id: i64, existing: Option<&UserEvent>) -> UserEvent {
    let payload_hosts: Vec<Host> = event
        .hosts
        .iter()
        .map(|h| Host { user_id: h.user_id })
        .collect();

    let has_location = event.location_description.is_some()
        || event.address.is_some()
        || event.location_marker.is_some()
        || event.latitude.is_some()
        || event.longitude.is_some();
    let location = has_location.then(|| Location {
        description: event.location_description.clone(),
        address: event.address.clone(),
        marker: event.location_marker.clone(),
        latitude: event.latitude,
        longitude: event.longitude,
    });

    let (hosts, suggested_hosts, attendees, reports) = match existing {
        Some(existing) => (
            payload_hosts,
            existing.suggested_hosts.clone(),
            existing.attendees.clone(),
            existing.reports.clone(),
        ),
        None => (vec![], payload_hosts, Vec::<Attendee>::new(), vec![]),
    };

    UserEvent {
        id: existing.and_then(|e| e.id),
        user_id: owner_id,
        hosts,
        suggested_hosts,
        name: event.name.clone(),
        location,
        start: event.start,
        end: event.end,
        description: event.description.clone(),
        reports,
        attendees,
        max_attendees: event.max_attendees,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external_event::{fixtures as ext_fixtures, Category};
    use crate::user_event::{fixtures as ue_fixtures, Report};
    use chrono::{Duration, NaiveDate, TimeZone};
    use std::collections::HashMap;

    const STOCKHOLM: Tz = chrono_tz::Europe::Stockholm;

    fn ctx<'a>(booked: &'a HashSet<i64>, now: DateTime<Utc>) -> MappingContext<'a> {
        MappingContext {
            current_user_id: 100,
            booked_ids: booked,
            now,
            timezone: STOCKHOLM,
        }
    }

    /// External record on 2025-06-10 10:00 Stockholm (08:00 UTC)
    fn dated(event_id: i64) -> ExternalEventDetails {
        ext_fixtures::details(event_id)
            .with_event_date(NaiveDate::from_ymd_opt(2025, 6, 10).unwrap())
            .unwrap()
    }

    fn event_start_utc() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 10, 8, 0, 0).unwrap()
    }

    fn extend(ue: UserEvent) -> ExtendedUserEvent {
        ExtendedUserEvent::extend(ue, &HashMap::new())
    }

    #[test]
    fn test_external_missing_date_is_dropped() {
        let booked = HashSet::new();
        let details = ext_fixtures::details(1);
        assert!(map_external_event(&details, &ctx(&booked, event_start_utc())).is_none());
    }

    #[test]
    fn test_external_basic_projection() {
        let booked = HashSet::from([5]);
        let mut details = dated(5);
        details.image_url150 = Some("small.png".to_string());
        details.location_info = Some("Second floor".to_string());
        details.categories = Some(vec![Category {
            code: "W".to_string(),
            text: "Workshop".to_string(),
            color_text: "#fff".to_string(),
            color_background: "#123".to_string(),
        }]);

        let now = event_start_utc() - Duration::days(1);
        let event = map_external_event(&details, &ctx(&booked, now)).unwrap();

        assert_eq!(event.id, "ext5");
        assert!(event.official);
        assert!(event.attending);
        assert_eq!(event.start, event_start_utc());
        assert_eq!(event.end, Some(Utc.with_ymd_and_hms(2025, 6, 10, 9, 30, 0).unwrap()));
        assert_eq!(event.booking_end, Some(event.start));
        assert_eq!(event.image_url.as_deref(), Some("small.png"));
        assert_eq!(event.address.as_deref(), Some("Main hall"));
        assert_eq!(event.location_description.as_deref(), Some("Second floor"));
        assert_eq!(event.show_attendees, ShowAttendees::None);
        assert!(event.attendees.is_empty());
        assert_eq!(event.tags[0].text, "Workshop");
        assert_eq!(event.extras["categories"][0]["code"], "W");
        assert_eq!(event.extras["eventUrl"], "https://events.example/5");
        assert_eq!(event.price, 0.0);
    }

    #[test]
    fn test_external_prefers_large_image() {
        let booked = HashSet::new();
        let mut details = dated(1);
        details.image_url150 = Some("small.png".to_string());
        details.image_url300 = Some("large.png".to_string());
        let event = map_external_event(&details, &ctx(&booked, event_start_utc())).unwrap();
        assert_eq!(event.image_url.as_deref(), Some("large.png"));
    }

    #[test]
    fn test_external_admins_skip_non_numeric() {
        let booked = HashSet::new();
        let mut details = dated(1);
        details.admins = Some(vec!["12".to_string(), "admin".to_string(), " 34".to_string()]);
        let event = map_external_event(&details, &ctx(&booked, event_start_utc())).unwrap();
        assert_eq!(event.admin, vec![12, 34]);
        assert_eq!(event.extras["adminsRaw"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_external_max_attendees_is_booked_plus_stock() {
        let booked = HashSet::new();
        let mut details = dated(1);
        details.is_limited = true;
        details.booked = 18;
        details.stock = 2;
        let event = map_external_event(&details, &ctx(&booked, event_start_utc())).unwrap();
        assert_eq!(event.max_attendees, Some(20));

        details.is_limited = false;
        let event = map_external_event(&details, &ctx(&booked, event_start_utc())).unwrap();
        assert_eq!(event.max_attendees, None);
    }

    #[test]
    fn test_external_priced_event() {
        let booked = HashSet::new();
        let mut details = dated(1);
        details.is_free = false;
        details.price = 250;
        let event = map_external_event(&details, &ctx(&booked, event_start_utc())).unwrap();
        assert_eq!(event.price, 250.0);
    }

    #[test]
    fn test_external_name_falls_back_to_description() {
        let booked = HashSet::new();
        let mut details = dated(1);
        details.titel = None;
        details.description = format!("{}\nsecond line", "x".repeat(80));
        let event = map_external_event(&details, &ctx(&booked, event_start_utc())).unwrap();
        assert_eq!(event.name.len(), FALLBACK_NAME_CHARS);
    }

    #[test]
    fn test_booking_window_respects_stock() {
        let booked = HashSet::new();
        let now = event_start_utc() - Duration::days(2);
        let mut details = dated(1);
        details.date_booking_start = Some(
            (now - Duration::days(1)).format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        );
        details.date_booking_end = Some(
            (now + Duration::days(1)).format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        );
        details.is_limited = true;
        details.stock = 0;

        let event = map_external_event(&details, &ctx(&booked, now)).unwrap();
        assert!(!event.bookable);

        details.stock = 1;
        let event = map_external_event(&details, &ctx(&booked, now)).unwrap();
        assert!(event.bookable);
    }

    #[test]
    fn test_booking_window_closed() {
        let booked = HashSet::new();
        let now = event_start_utc() - Duration::days(2);
        let mut details = dated(1);

        // Window not open yet
        details.date_booking_start = Some("2025-06-09 12:00:00".to_string());
        let event = map_external_event(&details, &ctx(&booked, now)).unwrap();
        assert!(!event.bookable);

        // Window already closed
        details.date_booking_start = None;
        details.date_booking_end = Some("2025-06-07 12:00:00".to_string());
        let event = map_external_event(&details, &ctx(&booked, now)).unwrap();
        assert!(!event.bookable);
    }

    #[test]
    fn test_unparseable_booking_end_defaults_to_start() {
        let booked = HashSet::new();
        let mut details = dated(1);
        details.date_booking_end = Some("soon".to_string());
        let event = map_external_event(&details, &ctx(&booked, event_start_utc())).unwrap();
        assert_eq!(event.booking_end, Some(event_start_utc()));
    }

    #[test]
    fn test_past_external_event_never_bookable() {
        let booked = HashSet::new();
        let mut details = dated(1);
        details.date_booking_end = Some("2030-01-01 00:00:00".to_string());
        let now = event_start_utc() + Duration::minutes(1);
        let event = map_external_event(&details, &ctx(&booked, now)).unwrap();
        assert!(!event.bookable);
    }

    #[test]
    fn test_user_event_projection() {
        let booked = HashSet::new();
        let start = Utc.with_ymd_and_hms(2025, 6, 10, 18, 0, 0).unwrap();
        let mut ue = ue_fixtures::user_event(7, start);
        ue.hosts.push(Host { user_id: 8 });
        ue.attendees.push(Attendee { user_id: 100 });
        ue.reports.push(Report {
            user_id: 9,
            text: "Too loud".to_string(),
        });
        let names = HashMap::from([(7, "Owner".to_string()), (8, "Host".to_string())]);
        let extended = ExtendedUserEvent::extend(ue.clone(), &names);

        let event = map_user_event(&extended, &ctx(&booked, start - Duration::hours(1)));

        assert_eq!(event.id, format!("usr{}", ue.id.unwrap()));
        assert!(!event.official);
        assert!(event.attending);
        assert!(!event.bookable);
        assert_eq!(event.admin, vec![7]);
        assert_eq!(event.hosts[0].name.as_deref(), Some("Host"));
        assert_eq!(event.attendees[0].user_id, 100);
        assert_eq!(event.show_attendees, ShowAttendees::All);
        assert_eq!(event.booking_end, Some(start));
        assert_eq!(event.location_marker.as_deref(), Some("🧺"));
        assert_eq!(event.extras["ownerName"], "Owner");
        assert_eq!(event.extras["reportsCount"], 1);
    }

    #[test]
    fn test_user_event_bookable_rules() {
        let booked = HashSet::new();
        let start = Utc.with_ymd_and_hms(2025, 6, 10, 18, 0, 0).unwrap();
        let mut ue = ue_fixtures::user_event(7, start);
        ue.max_attendees = Some(1);

        let before = ctx(&booked, start - Duration::hours(1));
        assert!(map_user_event(&extend(ue.clone()), &before).bookable);

        ue.attendees.push(Attendee { user_id: 55 });
        assert!(!map_user_event(&extend(ue.clone()), &before).bookable);

        ue.max_attendees = None;
        assert!(map_user_event(&extend(ue.clone()), &before).bookable);

        let after = ctx(&booked, start + Duration::seconds(1));
        assert!(!map_user_event(&extend(ue), &after).bookable);
    }

    #[test]
    fn test_reverse_mapping_preserves_server_fields() {
        let booked = HashSet::new();
        let start = Utc.with_ymd_and_hms(2025, 6, 10, 18, 0, 0).unwrap();
        let mut ue = ue_fixtures::user_event(7, start);
        ue.attendees = vec![Attendee { user_id: 1 }, Attendee { user_id: 2 }];
        ue.reports = vec![Report {
            user_id: 3,
            text: "Noted".to_string(),
        }];
        ue.suggested_hosts = vec![Host { user_id: 4 }];

        let mut unified = map_user_event(&extend(ue.clone()), &ctx(&booked, start));
        unified.attendees.clear();
        unified.name = "Renamed".to_string();

        let back = map_event_to_user_event(&unified, ue.user_id, Some(&ue));
        assert_eq!(back.id, ue.id);
        assert_eq!(back.reports, ue.reports);
        assert_eq!(back.attendees, ue.attendees);
        assert_eq!(back.suggested_hosts, ue.suggested_hosts);
        assert_eq!(back.location, ue.location);
        assert_eq!(back.name, "Renamed");
    }

    #[test]
    fn test_reverse_mapping_round_trip_is_identity() {
        let booked = HashSet::new();
        let start = Utc.with_ymd_and_hms(2025, 6, 10, 18, 0, 0).unwrap();
        let mut ue = ue_fixtures::user_event(7, start);
        ue.hosts = vec![Host { user_id: 8 }];
        ue.attendees = vec![Attendee { user_id: 1 }];
        ue.max_attendees = Some(5);
        ue.end = Some(start + Duration::hours(2));

        let unified = map_user_event(&extend(ue.clone()), &ctx(&booked, start));
        let back = map_event_to_user_event(&unified, ue.user_id, Some(&ue));
        assert_eq!(back, ue);
    }

    #[test]
    fn test_reverse_mapping_on_create_invites_hosts() {
        let start = Utc.with_ymd_and_hms(2025, 6, 10, 18, 0, 0).unwrap();
        let mut payload = Event::placeholder(EventId::External(0), start, false);
        payload.official = false;
        payload.name = "Run club".to_string();
        payload.hosts = vec![EventHost {
            user_id: 8,
            name: None,
        }];
        payload.attendees = vec![EventAttendee {
            user_id: 9,
            name: None,
        }];

        let ue = map_event_to_user_event(&payload, 7, None);
        assert!(ue.id.is_none());
        assert_eq!(ue.user_id, 7);
        assert!(ue.hosts.is_empty());
        assert_eq!(ue.suggested_hosts, vec![Host { user_id: 8 }]);
        assert!(ue.attendees.is_empty());
        assert!(ue.reports.is_empty());
        assert!(ue.location.is_none());
    }
}
