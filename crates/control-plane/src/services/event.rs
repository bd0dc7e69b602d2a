// Event unification service
//
// Merges cached official events and user events into the unified listing and
// routes every write on a unified id to the store its prefix names.
// Decision: Prefix dispatch happens once via EventId::parse; nothing probes both stores
// Decision: User events since now - 30 days are listed so recent events stay reachable for reports
// Decision: External attend/unattend is not retried; upstream failures surface immediately

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use swag_core::{
    map_event_to_user_event, map_external_event, map_user_event, Event, EventError, EventFilter,
    EventId, MappingContext, Result, UserEvent,
};
use swag_storage::Preserve;
use uuid::Uuid;

use super::external_event::ExternalEventService;
use super::user_event::{validate, UserEventService};

/// How far back user events stay in the unified listing
pub const USER_EVENT_LOOKBACK_DAYS: i64 = 30;

pub struct EventService {
    external: Arc<ExternalEventService>,
    user_events: Arc<UserEventService>,
    timezone: Tz,
}

impl EventService {
    pub fn new(
        external: Arc<ExternalEventService>,
        user_events: Arc<UserEventService>,
        timezone: Tz,
    ) -> Self {
        Self {
            external,
            user_events,
            timezone,
        }
    }

    fn context<'a>(&self, user_id: i64, booked_ids: &'a HashSet<i64>) -> MappingContext<'a> {
        MappingContext {
            current_user_id: user_id,
            booked_ids,
            now: Utc::now(),
            timezone: self.timezone,
        }
    }

    // ============================================
    // Listing
    // ============================================

    pub async fn list(&self, user_id: i64, filter: EventFilter) -> Vec<Event> {
        self.list_at(user_id, filter, Utc::now()).await
    }

    /// Unified listing as seen at `now`, sorted by start then lowercased name
    pub async fn list_at(&self, user_id: i64, filter: EventFilter, now: DateTime<Utc>) -> Vec<Event> {
        let booked_ids = self.booked_ids_or_empty(user_id).await;
        let ctx = MappingContext {
            current_user_id: user_id,
            booked_ids: &booked_ids,
            now,
            timezone: self.timezone,
        };

        let official: Vec<Event> = self
            .external
            .all_details()
            .await
            .iter()
            .filter_map(|details| map_external_event(details, &ctx))
            .collect();

        let cutoff = now - Duration::days(USER_EVENT_LOOKBACK_DAYS);
        let user_events = self.user_events.since(cutoff).await;
        let unofficial: Vec<Event> = self
            .user_events
            .extend(user_events)
            .await
            .iter()
            .map(|ue| map_user_event(ue, &ctx))
            .collect();

        let mut events: Vec<Event> = official
            .into_iter()
            .chain(unofficial)
            .filter(|e| filter.matches(e))
            .collect();
        events.sort_by_cached_key(Event::sort_key);
        events
    }

    async fn booked_ids_or_empty(&self, user_id: i64) -> HashSet<i64> {
        self.external.booked_ids(user_id).await.unwrap_or_else(|e| {
            tracing::warn!(user_id, error = %e, "Listing without booked external events");
            HashSet::new()
        })
    }

    // ============================================
    // Writes (user events only)
    // ============================================

    pub async fn create(&self, caller: i64, event: Event) -> Result<Event> {
        reject_official(&event)?;
        if !event.id.is_empty() {
            user_event_id(&event.id)?;
        }

        let user_event = map_event_to_user_event(&event, caller, None);
        validate(&user_event)?;
        let created = self.user_events.create(user_event).await?;
        self.remap(caller, created).await
    }

    pub async fn update(&self, caller: i64, id: &str, event: Event) -> Result<Event> {
        let id = user_event_id(id)?;
        reject_official(&event)?;

        let existing = self.user_events.get_owned(caller, id).await?;
        let updated = map_event_to_user_event(&event, existing.user_id, Some(&existing));
        if updated.hosts.iter().any(|h| !existing.is_host(h.user_id)) {
            return Err(EventError::invalid(
                "Cannot directly add new hosts to event, only remove",
            ));
        }
        validate(&updated)?;

        let stored = self
            .user_events
            .replace(id, updated, Preserve::ServerOwnedAndInvitations)
            .await?;
        self.remap(caller, stored).await
    }

    pub async fn delete(&self, caller: i64, id: &str) -> Result<()> {
        let id = user_event_id(id)?;
        self.user_events.delete_for(caller, id).await
    }

    // ============================================
    // Attendance
    // ============================================

    pub async fn attend(&self, caller: i64, id: &str) -> Result<Event> {
        match EventId::parse(id)? {
            EventId::User(id) => {
                let event = self.user_events.attend(id, caller).await?;
                self.remap(caller, event).await
            }
            EventId::External(event_id) => {
                self.external.book(caller, event_id).await?;
                tracing::info!(user_id = caller, event_id, "Booked external event");
                Ok(self.remap_external(caller, event_id, true).await)
            }
        }
    }

    pub async fn unattend(&self, caller: i64, id: &str) -> Result<Event> {
        match EventId::parse(id)? {
            EventId::User(id) => {
                let event = self.user_events.unattend(id, caller).await?;
                self.remap(caller, event).await
            }
            EventId::External(event_id) => {
                self.external.unbook(caller, event_id).await?;
                tracing::info!(user_id = caller, event_id, "Unbooked external event");
                Ok(self.remap_external(caller, event_id, false).await)
            }
        }
    }

    async fn remap(&self, caller: i64, event: UserEvent) -> Result<Event> {
        let booked = HashSet::new();
        let extended = self.user_events.extend_one(event).await?;
        Ok(map_user_event(&extended, &self.context(caller, &booked)))
    }

    /// Cached detail with the booking change applied. The successful upstream
    /// call is authoritative, so the flags are forced rather than re-fetched.
    async fn remap_external(&self, caller: i64, event_id: i64, attending: bool) -> Event {
        let booked = if attending {
            HashSet::from([event_id])
        } else {
            HashSet::new()
        };
        let ctx = self.context(caller, &booked);

        let mapped = self
            .external
            .stored_details(&[event_id], None)
            .await
            .into_iter()
            .find(|d| d.event_id == event_id)
            .and_then(|d| map_external_event(&d, &ctx));

        match mapped {
            Some(mut event) => {
                event.attending = attending;
                if attending {
                    event.bookable = false;
                }
                event
            }
            None => {
                tracing::warn!(event_id, "Booked external event is not cached");
                Event::placeholder(EventId::External(event_id), ctx.now, attending)
            }
        }
    }
}

fn reject_official(event: &Event) -> Result<()> {
    if event.official {
        return Err(EventError::invalid(
            "Official events cannot be created or modified",
        ));
    }
    Ok(())
}

fn user_event_id(id: &str) -> Result<Uuid> {
    match EventId::parse(id)? {
        EventId::User(id) => Ok(id),
        EventId::External(_) => Err(EventError::invalid(
            "Official events cannot be created or modified",
        )),
    }
}
