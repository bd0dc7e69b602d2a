// User event store service
//
// Two read tiers: "unsafe" reads return the full document (reports included)
// and are only used by update logic; every outward read goes through the
// safe tier which strips reports.
// Decision: Capacity is enforced by the store's conditional add (no read-then-write race)
// Decision: List reads degrade to empty with a logged error; mutations propagate failures

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use swag_core::{EventError, ExtendedUserEvent, Report, Result, UserEvent};
use swag_storage::{AttendOutcome, Preserve, StorageBackend, UserEventQuery};
use uuid::Uuid;

use super::user::UserService;

pub struct UserEventService {
    storage: StorageBackend,
    users: Arc<UserService>,
}

impl UserEventService {
    pub fn new(storage: StorageBackend, users: Arc<UserService>) -> Self {
        Self { storage, users }
    }

    // ============================================
    // Store operations
    // ============================================

    /// Full document, reports included. Internal use only.
    pub async fn get_unsafe(&self, id: Uuid) -> Result<Option<UserEvent>> {
        Ok(self.storage.get_user_event(id).await?)
    }

    pub async fn get_safe(&self, id: Uuid) -> Result<Option<UserEvent>> {
        Ok(self.get_unsafe(id).await?.map(UserEvent::make_safe))
    }

    async fn get_safe_or_404(&self, id: Uuid) -> Result<UserEvent> {
        self.get_safe(id)
            .await?
            .ok_or_else(|| EventError::not_found("Event not found"))
    }

    /// Persist as given; returns the safe copy carrying the generated id
    pub async fn create(&self, event: UserEvent) -> Result<UserEvent> {
        let created = self.storage.create_user_event(event).await?;
        tracing::info!(event_id = ?created.id, owner = created.user_id, "Created user event");
        Ok(created.make_safe())
    }

    /// Replace the document. Attendees and reports always keep their stored
    /// value, read inside the write. False when no event has this id.
    pub async fn update(&self, id: Uuid, event: UserEvent, preserve: Preserve) -> Result<bool> {
        Ok(self.storage.update_user_event(id, event, preserve).await?)
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        Ok(self.storage.delete_user_event(id).await?)
    }

    async fn list_safe(&self, query: UserEventQuery) -> Vec<UserEvent> {
        match self.storage.list_user_events(query).await {
            Ok(events) => events.into_iter().map(UserEvent::make_safe).collect(),
            Err(e) => {
                tracing::error!(?query, error = %e, "Failed to list user events");
                vec![]
            }
        }
    }

    /// Events that have not ended yet
    pub async fn future(&self, now: DateTime<Utc>) -> Vec<UserEvent> {
        self.list_safe(UserEventQuery::EndingAfter(now)).await
    }

    pub async fn since(&self, cutoff: DateTime<Utc>) -> Vec<UserEvent> {
        self.list_safe(UserEventQuery::StartingSince(cutoff)).await
    }

    pub async fn owned_by(&self, user_id: i64) -> Vec<UserEvent> {
        self.list_safe(UserEventQuery::OwnedBy(user_id)).await
    }

    pub async fn hosted_by(&self, user_id: i64) -> Vec<UserEvent> {
        self.list_safe(UserEventQuery::HostedBy(user_id)).await
    }

    pub async fn attended_by(&self, user_id: i64) -> Vec<UserEvent> {
        self.list_safe(UserEventQuery::AttendedBy(user_id)).await
    }

    /// Pending co-host invitations of the user
    pub async fn invitations_for(&self, user_id: i64) -> Vec<UserEvent> {
        self.list_safe(UserEventQuery::SuggestedHost(user_id)).await
    }

    /// Stamp owner/host/attendee names with one profile lookup for the whole batch
    pub async fn extend(&self, events: Vec<UserEvent>) -> Vec<ExtendedUserEvent> {
        let mut ids: Vec<i64> = events
            .iter()
            .flat_map(UserEvent::referenced_user_ids)
            .collect();
        ids.sort_unstable();
        ids.dedup();

        let names = self.users.display_names(&ids).await.unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to resolve user names");
            HashMap::new()
        });

        events
            .into_iter()
            .map(|e| ExtendedUserEvent::extend(e, &names))
            .collect()
    }

    pub async fn extend_one(&self, event: UserEvent) -> Result<ExtendedUserEvent> {
        self.extend(vec![event])
            .await
            .pop()
            .ok_or_else(|| EventError::Internal(anyhow::anyhow!("extend dropped the event")))
    }

    // ============================================
    // Member actions
    // ============================================

    /// Add the caller as attendee. Owners cannot attend their own event.
    pub async fn attend(&self, id: Uuid, user_id: i64) -> Result<UserEvent> {
        let event = self.get_safe_or_404(id).await?;
        if event.is_owner(user_id) {
            return Err(EventError::invalid("Owner cannot attend their own event"));
        }

        match self.storage.add_attendee(id, user_id).await? {
            AttendOutcome::Added => {
                tracing::info!(event_id = %id, user_id, "User attending event");
                self.get_safe_or_404(id).await
            }
            AttendOutcome::AlreadyAttending => {
                Err(EventError::invalid("User is already attending the event"))
            }
            AttendOutcome::Full => Err(EventError::invalid("Event is full")),
            AttendOutcome::NotFound => Err(EventError::not_found("Event not found")),
        }
    }

    /// Remove the caller from the attendees. Owners cannot unattend their own event.
    pub async fn unattend(&self, id: Uuid, user_id: i64) -> Result<UserEvent> {
        let event = self.get_safe_or_404(id).await?;
        if event.is_owner(user_id) {
            return Err(EventError::invalid("Owner cannot unattend their own event"));
        }
        if !event.is_attending(user_id) {
            return Err(EventError::invalid("User is not attending the event"));
        }

        if !self.storage.remove_attendee(id, user_id).await? {
            return Err(EventError::not_found("Event not found"));
        }
        tracing::info!(event_id = %id, user_id, "User no longer attending event");
        self.get_safe_or_404(id).await
    }

    pub async fn accept_cohosting(&self, id: Uuid, user_id: i64) -> Result<()> {
        self.require_invited(id, user_id, "accept").await?;
        if !self.storage.accept_host(id, user_id).await? {
            return Err(EventError::invalid("No pending co-host invitation"));
        }
        Ok(())
    }

    pub async fn deny_cohosting(&self, id: Uuid, user_id: i64) -> Result<()> {
        self.require_invited(id, user_id, "deny").await?;
        if !self.storage.remove_suggested_host(id, user_id).await? {
            return Err(EventError::invalid("No pending co-host invitation"));
        }
        Ok(())
    }

    async fn require_invited(&self, id: Uuid, user_id: i64, verb: &str) -> Result<()> {
        let event = self.get_safe_or_404(id).await?;
        if !event.is_suggested_host(user_id) {
            return Err(EventError::invalid(format!(
                "Cannot {} being a cohost without being suggested first",
                verb
            )));
        }
        Ok(())
    }

    pub async fn leave_hosting(&self, id: Uuid, user_id: i64) -> Result<()> {
        let event = self.get_safe_or_404(id).await?;
        if !event.is_host(user_id) {
            return Err(EventError::invalid("User is not hosting the event"));
        }
        self.storage.remove_host(id, user_id).await?;
        Ok(())
    }

    pub async fn report(&self, id: Uuid, user_id: i64, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            return Err(EventError::invalid("Report text cannot be empty"));
        }
        if !self.storage.upsert_report(id, user_id, text).await? {
            return Err(EventError::not_found("Event not found"));
        }
        Ok(())
    }

    pub async fn remove_report(&self, id: Uuid, user_id: i64) -> Result<()> {
        self.get_safe_or_404(id).await?;
        if !self.storage.remove_report(id, user_id).await? {
            return Err(EventError::not_found("Report not found"));
        }
        Ok(())
    }

    /// Reports of an event, for its owner only
    pub async fn reports(&self, id: Uuid, user_id: i64) -> Result<Vec<Report>> {
        let event = self
            .get_unsafe(id)
            .await?
            .ok_or_else(|| EventError::not_found("Event not found"))?;
        if !event.is_owner(user_id) {
            return Err(EventError::forbidden("Only the owner can read reports"));
        }
        Ok(event.reports)
    }

    // ============================================
    // Owner actions (legacy write path)
    // ============================================

    /// Create on behalf of `owner`. Attendees, hosts and reports are
    /// server-owned; invitations go through `suggested_hosts`.
    pub async fn create_for(&self, owner: i64, mut event: UserEvent) -> Result<UserEvent> {
        if !event.attendees.is_empty() {
            return Err(EventError::invalid(
                "Cannot add attendees on create. Users can only attend themselves.",
            ));
        }
        if !event.hosts.is_empty() {
            return Err(EventError::invalid(
                "Cannot add hosts directly. Did you mean to use suggested_hosts?",
            ));
        }
        if !event.reports.is_empty() {
            return Err(EventError::invalid("Cannot add reports on create"));
        }
        validate(&event)?;

        event.id = None;
        event.user_id = owner;
        event.suggested_hosts.retain(|h| h.user_id != owner);
        self.create(event).await
    }

    /// Owner-only full replace. Hosts may only be removed, attendees never change.
    pub async fn update_for(&self, caller: i64, id: Uuid, event: UserEvent) -> Result<UserEvent> {
        let existing = self.get_owned(caller, id).await?;
        if event.user_id != existing.user_id {
            return Err(EventError::invalid("Event owner cannot be changed"));
        }
        if event.hosts.iter().any(|h| !existing.is_host(h.user_id)) {
            return Err(EventError::invalid(
                "Cannot directly add new hosts to event, only remove. Did you mean to use suggested_hosts?",
            ));
        }
        if event.attendees != existing.attendees {
            return Err(EventError::invalid(
                "Cannot modify attendees directly. Users can only attend/unattend themselves.",
            ));
        }
        validate(&event)?;

        self.replace(id, event, Preserve::ServerOwned).await
    }

    /// Load the event and check the caller owns it (404, then 403)
    pub async fn get_owned(&self, caller: i64, id: Uuid) -> Result<UserEvent> {
        let event = self.get_safe_or_404(id).await?;
        if !event.is_owner(caller) {
            return Err(EventError::forbidden("Only the owner can modify this event"));
        }
        Ok(event)
    }

    /// Persist an already validated replacement and reload it
    pub async fn replace(
        &self,
        id: Uuid,
        event: UserEvent,
        preserve: Preserve,
    ) -> Result<UserEvent> {
        if !self.update(id, event, preserve).await? {
            return Err(EventError::not_found("Event not found"));
        }
        tracing::info!(event_id = %id, "Updated user event");
        self.get_safe_or_404(id).await
    }

    pub async fn delete_for(&self, caller: i64, id: Uuid) -> Result<()> {
        self.get_owned(caller, id).await?;
        if !self.delete(id).await? {
            return Err(EventError::Internal(anyhow::anyhow!(
                "Failed to delete event {}",
                id
            )));
        }
        tracing::info!(event_id = %id, "Deleted user event");
        Ok(())
    }
}

/// Field checks shared by create and update
pub fn validate(event: &UserEvent) -> Result<()> {
    if event.name.trim().is_empty() {
        return Err(EventError::invalid("Event name cannot be empty"));
    }
    if event.end.is_some_and(|end| end < event.start) {
        return Err(EventError::invalid("Event cannot end before it starts"));
    }
    if event.max_attendees.is_some_and(|max| max < 0) {
        return Err(EventError::invalid("maxAttendees cannot be negative"));
    }
    if event.max_attendees.is_some_and(|max| (event.attendees.len() as i64) > max) {
        return Err(EventError::invalid("maxAttendees is below the current attendee count"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::user_event;
    use chrono::Duration;
    use swag_core::{Attendee, Host, User};

    async fn setup() -> (StorageBackend, UserEventService) {
        let storage = StorageBackend::in_memory();
        let users = Arc::new(UserService::new(storage.clone()));
        (storage.clone(), UserEventService::new(storage, users))
    }

    fn tomorrow() -> DateTime<Utc> {
        Utc::now() + Duration::days(1)
    }

    async fn created(service: &UserEventService, owner: i64) -> Uuid {
        service
            .create_for(owner, user_event(owner, "Picnic", tomorrow()))
            .await
            .unwrap()
            .id
            .unwrap()
    }

    #[tokio::test]
    async fn test_attend_is_idempotent() {
        let (_, service) = setup().await;
        let id = created(&service, 1).await;

        let event = service.attend(id, 2).await.unwrap();
        assert_eq!(event.attendees, vec![Attendee { user_id: 2 }]);

        let err = service.attend(id, 2).await.unwrap_err();
        assert!(matches!(err, EventError::InvalidRequest(_)));
        let event = service.get_safe(id).await.unwrap().unwrap();
        assert_eq!(event.attendees.len(), 1);

        service.unattend(id, 2).await.unwrap();
        let err = service.unattend(id, 2).await.unwrap_err();
        assert!(matches!(err, EventError::InvalidRequest(_)));
        assert!(service.get_safe(id).await.unwrap().unwrap().attendees.is_empty());
    }

    #[tokio::test]
    async fn test_capacity_is_enforced() {
        let (_, service) = setup().await;
        let mut event = user_event(1, "Small dinner", tomorrow());
        event.max_attendees = Some(1);
        let id = service.create_for(1, event).await.unwrap().id.unwrap();

        service.attend(id, 2).await.unwrap();
        let err = service.attend(id, 3).await.unwrap_err();
        assert!(matches!(err, EventError::InvalidRequest(m) if m == "Event is full"));
        assert_eq!(service.get_safe(id).await.unwrap().unwrap().attendees.len(), 1);
    }

    #[tokio::test]
    async fn test_owner_cannot_attend_or_unattend() {
        let (_, service) = setup().await;
        let id = created(&service, 1).await;

        assert!(matches!(
            service.attend(id, 1).await,
            Err(EventError::InvalidRequest(_))
        ));
        assert!(matches!(
            service.unattend(id, 1).await,
            Err(EventError::InvalidRequest(_))
        ));
        assert!(service.get_safe(id).await.unwrap().unwrap().attendees.is_empty());
    }

    #[tokio::test]
    async fn test_attend_missing_event() {
        let (_, service) = setup().await;
        assert!(matches!(
            service.attend(Uuid::now_v7(), 2).await,
            Err(EventError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_reports_are_private_and_survive_updates() {
        let (_, service) = setup().await;
        let id = created(&service, 1).await;
        service.report(id, 2, "Great picnic").await.unwrap();

        // Safe reads never carry reports
        let safe = service.get_safe(id).await.unwrap().unwrap();
        assert!(safe.reports.is_empty());
        assert!(service.future(Utc::now()).await[0].reports.is_empty());

        // An update without reports keeps the stored ones
        let mut changed = safe.clone();
        changed.name = "Picnic in the park".to_string();
        service.update_for(1, id, changed).await.unwrap();

        let reports = service.reports(id, 1).await.unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].text, "Great picnic");

        assert!(matches!(
            service.reports(id, 2).await,
            Err(EventError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_report_upsert_and_remove() {
        let (_, service) = setup().await;
        let id = created(&service, 1).await;
        service.report(id, 2, "first").await.unwrap();
        service.report(id, 2, "second").await.unwrap();

        let reports = service.reports(id, 1).await.unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].text, "second");

        service.remove_report(id, 2).await.unwrap();
        assert!(matches!(
            service.remove_report(id, 2).await,
            Err(EventError::NotFound(_))
        ));
        assert!(matches!(
            service.report(id, 2, "  ").await,
            Err(EventError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_create_rejects_server_owned_fields() {
        let (_, service) = setup().await;

        let mut with_attendees = user_event(1, "Party", tomorrow());
        with_attendees.attendees = vec![Attendee { user_id: 2 }];
        assert!(matches!(
            service.create_for(1, with_attendees).await,
            Err(EventError::InvalidRequest(_))
        ));

        let mut with_hosts = user_event(1, "Party", tomorrow());
        with_hosts.hosts = vec![Host { user_id: 2 }];
        assert!(matches!(
            service.create_for(1, with_hosts).await,
            Err(EventError::InvalidRequest(_))
        ));

        // Owner is forced to the caller, invitations allowed
        let mut invite = user_event(99, "Party", tomorrow());
        invite.suggested_hosts = vec![Host { user_id: 2 }];
        let created = service.create_for(1, invite).await.unwrap();
        assert_eq!(created.user_id, 1);
        assert_eq!(created.suggested_hosts, vec![Host { user_id: 2 }]);
    }

    #[tokio::test]
    async fn test_update_rules() {
        let (_, service) = setup().await;
        let id = created(&service, 1).await;
        let event = service.get_safe(id).await.unwrap().unwrap();

        assert!(matches!(
            service.update_for(2, id, event.clone()).await,
            Err(EventError::Forbidden(_))
        ));

        let mut new_owner = event.clone();
        new_owner.user_id = 2;
        assert!(matches!(
            service.update_for(1, id, new_owner).await,
            Err(EventError::InvalidRequest(_))
        ));

        let mut new_host = event.clone();
        new_host.hosts = vec![Host { user_id: 3 }];
        assert!(matches!(
            service.update_for(1, id, new_host).await,
            Err(EventError::InvalidRequest(_))
        ));

        let mut new_attendee = event.clone();
        new_attendee.attendees = vec![Attendee { user_id: 3 }];
        assert!(matches!(
            service.update_for(1, id, new_attendee).await,
            Err(EventError::InvalidRequest(_))
        ));

        let mut ends_early = event;
        ends_early.end = Some(ends_early.start - Duration::hours(1));
        assert!(matches!(
            service.update_for(1, id, ends_early).await,
            Err(EventError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_cohosting_flow() {
        let (_, service) = setup().await;
        let mut event = user_event(1, "Board games", tomorrow());
        event.suggested_hosts = vec![Host { user_id: 2 }, Host { user_id: 3 }];
        let id = service.create_for(1, event).await.unwrap().id.unwrap();

        assert_eq!(service.invitations_for(2).await.len(), 1);
        service.accept_cohosting(id, 2).await.unwrap();
        service.deny_cohosting(id, 3).await.unwrap();
        assert!(matches!(
            service.accept_cohosting(id, 4).await,
            Err(EventError::InvalidRequest(_))
        ));

        let stored = service.get_safe(id).await.unwrap().unwrap();
        assert_eq!(stored.hosts, vec![Host { user_id: 2 }]);
        assert!(stored.suggested_hosts.is_empty());
        assert_eq!(service.hosted_by(2).await.len(), 1);

        service.leave_hosting(id, 2).await.unwrap();
        assert!(matches!(
            service.leave_hosting(id, 2).await,
            Err(EventError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_requires_owner() {
        let (_, service) = setup().await;
        let id = created(&service, 1).await;

        assert!(matches!(
            service.delete_for(2, id).await,
            Err(EventError::Forbidden(_))
        ));
        service.delete_for(1, id).await.unwrap();
        assert!(matches!(
            service.delete_for(1, id).await,
            Err(EventError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_extend_resolves_names_in_one_batch() {
        let (storage, service) = setup().await;
        let mut owner = User::new(1, true);
        owner.first_name = Some("Ada".to_string());
        owner.last_name = Some("Lovelace".to_string());
        storage.upsert_user(&owner).await.unwrap();

        let id = created(&service, 1).await;
        service.attend(id, 2).await.unwrap();

        let extended = service.extend(service.owned_by(1).await).await;
        assert_eq!(extended.len(), 1);
        assert_eq!(extended[0].owner_name, "Ada Lovelace");
        assert_eq!(extended[0].attendee_names, vec!["<unknown>".to_string()]);
    }

    #[tokio::test]
    async fn test_list_windows() {
        let (_, service) = setup().await;
        let now = Utc::now();
        service
            .create_for(1, user_event(1, "Long ago", now - Duration::days(60)))
            .await
            .unwrap();
        service
            .create_for(1, user_event(1, "Last week", now - Duration::days(7)))
            .await
            .unwrap();
        service
            .create_for(1, user_event(1, "Next week", now + Duration::days(7)))
            .await
            .unwrap();

        assert_eq!(service.future(now).await.len(), 1);
        assert_eq!(service.since(now - Duration::days(30)).await.len(), 2);
        assert_eq!(service.owned_by(1).await.len(), 3);
    }
}
