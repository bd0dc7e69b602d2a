// In-memory storage implementation for dev mode
// Decision: Use parking_lot for thread-safe access
// Decision: UUIDs generated via uuid v7 (time-ordered)
//
// Mirrors the PostgreSQL repository so the control-plane can run without a
// database. Every mutation takes the write lock once, which makes the
// conditional array edits atomic just like the single UPDATE statements.

use anyhow::Result;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use swag_core::{
    Attendee, ExternalEventDetails, ExternalNews, ExternalRoot, Host, Report, ShowLocation, User,
    UserEvent,
};

use crate::models::*;

/// In-memory database for dev mode
/// All data is stored in memory and lost on restart
#[derive(Default)]
pub struct InMemoryDatabase {
    users: RwLock<HashMap<i64, User>>,
    external_tokens: RwLock<HashMap<i64, ExternalTokenRow>>,
    external_root: RwLock<Option<ExternalRoot>>,
    external_events: RwLock<HashMap<i64, ExternalEventDetails>>,
    external_news: RwLock<Vec<ExternalNews>>,
    user_events: RwLock<HashMap<Uuid, UserEvent>>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    // ============================================
    // Users
    // ============================================

    pub async fn get_user(&self, user_id: i64) -> Result<Option<User>> {
        Ok(self.users.read().get(&user_id).cloned())
    }

    pub async fn get_users(&self, user_ids: &[i64]) -> Result<Vec<User>> {
        let users = self.users.read();
        let mut found: Vec<User> = user_ids
            .iter()
            .collect::<HashSet<_>>()
            .into_iter()
            .filter_map(|id| users.get(id).cloned())
            .collect();
        found.sort_by_key(|u| u.user_id);
        Ok(found)
    }

    pub async fn upsert_user(&self, user: &User) -> Result<User> {
        self.users.write().insert(user.user_id, user.clone());
        Ok(user.clone())
    }

    pub async fn get_users_showing_location(&self) -> Result<Vec<User>> {
        let mut users: Vec<User> = self
            .users
            .read()
            .values()
            .filter(|u| u.settings.show_location != ShowLocation::NoOne && u.location.is_some())
            .cloned()
            .collect();
        users.sort_by_key(|u| u.user_id);
        Ok(users)
    }

    // ============================================
    // External tokens
    // ============================================

    pub async fn save_external_token(
        &self,
        user_id: i64,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let row = ExternalTokenRow {
            user_id,
            token: token.to_string(),
            created_at: Utc::now(),
            expires_at,
        };
        self.external_tokens.write().insert(user_id, row);
        Ok(())
    }

    pub async fn get_external_token(&self, user_id: i64) -> Result<Option<ExternalTokenRow>> {
        Ok(self.external_tokens.read().get(&user_id).cloned())
    }

    // ============================================
    // External event cache
    // ============================================

    pub async fn store_external_root(&self, root: &ExternalRoot) -> Result<()> {
        *self.external_root.write() = Some(root.clone());
        Ok(())
    }

    pub async fn get_external_root(&self) -> Result<Option<ExternalRoot>> {
        Ok(self.external_root.read().clone())
    }

    pub async fn upsert_external_event(&self, details: &ExternalEventDetails) -> Result<()> {
        self.external_events
            .write()
            .insert(details.event_id, details.clone());
        Ok(())
    }

    pub async fn get_external_events(
        &self,
        event_ids: &[i64],
        admin_id: Option<i64>,
    ) -> Result<Vec<ExternalEventDetails>> {
        let mut found: Vec<ExternalEventDetails> = self
            .external_events
            .read()
            .values()
            .filter(|d| {
                event_ids.contains(&d.event_id) || admin_id.is_some_and(|id| d.has_admin(id))
            })
            .cloned()
            .collect();
        found.sort_by_key(|d| d.event_id);
        Ok(found)
    }

    pub async fn get_all_external_events(&self) -> Result<Vec<ExternalEventDetails>> {
        let mut all: Vec<ExternalEventDetails> =
            self.external_events.read().values().cloned().collect();
        all.sort_by_key(|d| d.event_id);
        Ok(all)
    }

    pub async fn clean_external_events(&self, keeping: &HashSet<i64>) -> Result<u64> {
        let mut events = self.external_events.write();
        let before = events.len();
        events.retain(|id, _| keeping.contains(id));
        Ok((before - events.len()) as u64)
    }

    pub async fn store_external_news(&self, news: &[ExternalNews]) -> Result<()> {
        *self.external_news.write() = news.to_vec();
        Ok(())
    }

    pub async fn get_external_news(&self) -> Result<Vec<ExternalNews>> {
        Ok(self.external_news.read().clone())
    }

    // ============================================
    // User events
    // ============================================

    pub async fn create_user_event(&self, mut event: UserEvent) -> Result<UserEvent> {
        let id = Uuid::now_v7();
        event.id = Some(id);
        self.user_events.write().insert(id, event.clone());
        Ok(event)
    }

    pub async fn get_user_event(&self, id: Uuid) -> Result<Option<UserEvent>> {
        Ok(self.user_events.read().get(&id).cloned())
    }

    pub async fn update_user_event(
        &self,
        id: Uuid,
        mut event: UserEvent,
        preserve: Preserve,
    ) -> Result<bool> {
        let mut events = self.user_events.write();
        let Some(stored) = events.get_mut(&id) else {
            return Ok(false);
        };

        event.id = Some(id);
        event.attendees = std::mem::take(&mut stored.attendees);
        event.reports = std::mem::take(&mut stored.reports);
        if preserve == Preserve::ServerOwnedAndInvitations {
            event.suggested_hosts = std::mem::take(&mut stored.suggested_hosts);
        }
        *stored = event;
        Ok(true)
    }

    pub async fn delete_user_event(&self, id: Uuid) -> Result<bool> {
        Ok(self.user_events.write().remove(&id).is_some())
    }

    pub async fn list_user_events(&self, query: UserEventQuery) -> Result<Vec<UserEvent>> {
        let matches = |e: &UserEvent| match query {
            UserEventQuery::EndingAfter(t) => e.start >= t || e.end.is_some_and(|end| end >= t),
            UserEventQuery::StartingSince(t) => e.start >= t,
            UserEventQuery::OwnedBy(u) => e.user_id == u,
            UserEventQuery::HostedBy(u) => e.is_host(u),
            UserEventQuery::AttendedBy(u) => e.is_attending(u),
            UserEventQuery::SuggestedHost(u) => e.is_suggested_host(u),
        };

        let mut found: Vec<UserEvent> = self
            .user_events
            .read()
            .values()
            .filter(|e| matches(e))
            .cloned()
            .collect();
        found.sort_by(|a, b| (a.start, a.id).cmp(&(b.start, b.id)));
        Ok(found)
    }

    /// Add `user_id` to `attendees` only if absent and below `maxAttendees`
    pub async fn add_attendee(&self, id: Uuid, user_id: i64) -> Result<AttendOutcome> {
        let mut events = self.user_events.write();
        let Some(event) = events.get_mut(&id) else {
            return Ok(AttendOutcome::NotFound);
        };
        if event.is_attending(user_id) {
            return Ok(AttendOutcome::AlreadyAttending);
        }
        if !event.has_free_slot() {
            return Ok(AttendOutcome::Full);
        }
        event.attendees.push(Attendee { user_id });
        Ok(AttendOutcome::Added)
    }

    /// Returns false when the event does not exist
    pub async fn remove_attendee(&self, id: Uuid, user_id: i64) -> Result<bool> {
        let mut events = self.user_events.write();
        Ok(match events.get_mut(&id) {
            Some(event) => {
                event.attendees.retain(|a| a.user_id != user_id);
                true
            }
            None => false,
        })
    }

    /// Move `user_id` from `suggested_hosts` into `hosts`.
    /// Returns false when the user was not invited (or the event is missing).
    pub async fn accept_host(&self, id: Uuid, user_id: i64) -> Result<bool> {
        let mut events = self.user_events.write();
        let Some(event) = events.get_mut(&id) else {
            return Ok(false);
        };
        if !event.is_suggested_host(user_id) {
            return Ok(false);
        }
        event.suggested_hosts.retain(|h| h.user_id != user_id);
        if !event.is_host(user_id) {
            event.hosts.push(Host { user_id });
        }
        Ok(true)
    }

    /// Drop a pending invitation. Returns false when the user was not invited.
    pub async fn remove_suggested_host(&self, id: Uuid, user_id: i64) -> Result<bool> {
        let mut events = self.user_events.write();
        Ok(match events.get_mut(&id) {
            Some(event) if event.is_suggested_host(user_id) => {
                event.suggested_hosts.retain(|h| h.user_id != user_id);
                true
            }
            _ => false,
        })
    }

    /// Returns false when the user is not a host.
    pub async fn remove_host(&self, id: Uuid, user_id: i64) -> Result<bool> {
        let mut events = self.user_events.write();
        Ok(match events.get_mut(&id) {
            Some(event) if event.is_host(user_id) => {
                event.hosts.retain(|h| h.user_id != user_id);
                true
            }
            _ => false,
        })
    }

    /// Update the report authored by `user_id` in place, or append a new one
    pub async fn upsert_report(&self, id: Uuid, user_id: i64, text: &str) -> Result<bool> {
        let mut events = self.user_events.write();
        let Some(event) = events.get_mut(&id) else {
            return Ok(false);
        };
        match event.reports.iter_mut().find(|r| r.user_id == user_id) {
            Some(report) => report.text = text.to_string(),
            None => event.reports.push(Report {
                user_id,
                text: text.to_string(),
            }),
        }
        Ok(true)
    }

    /// Returns false when the user has no report on the event
    pub async fn remove_report(&self, id: Uuid, user_id: i64) -> Result<bool> {
        let mut events = self.user_events.write();
        Ok(match events.get_mut(&id) {
            Some(event) if event.reports.iter().any(|r| r.user_id == user_id) => {
                event.reports.retain(|r| r.user_id != user_id);
                true
            }
            _ => false,
        })
    }
}
