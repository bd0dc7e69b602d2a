// Test doubles shared by service, job and handler tests

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use parking_lot::Mutex;
use swag_core::{
    EventError, EventSiteApi, ExternalEventDetails, ExternalNews, ExternalRoot, MemberLogin,
    MembershipApi, Result, UserEvent,
};

/// Mutable state behind [`FakeEventSite`]
#[derive(Default)]
pub struct FakeState {
    pub root: Option<ExternalRoot>,
    pub events_by_date: HashMap<String, Vec<ExternalEventDetails>>,
    pub failing_dates: HashSet<String>,
    pub news: Vec<ExternalNews>,
    /// Booked event ids per member token
    pub booked: HashMap<String, HashSet<i64>>,
    pub reject_bookings: bool,
    pub fail_booked_list: bool,
    pub tokens_seen: Vec<String>,
}

/// In-process events API
#[derive(Default)]
pub struct FakeEventSite {
    state: Mutex<FakeState>,
}

impl FakeEventSite {
    pub fn with(&self, f: impl FnOnce(&mut FakeState)) {
        f(&mut self.state.lock());
    }

    pub fn calls_with_token(&self, token: &str) -> usize {
        self.state
            .lock()
            .tokens_seen
            .iter()
            .filter(|t| *t == token)
            .count()
    }
}

#[async_trait]
impl EventSiteApi for FakeEventSite {
    async fn fetch_root(&self) -> Result<ExternalRoot> {
        self.state
            .lock()
            .root
            .clone()
            .ok_or_else(|| EventError::upstream("discovery unavailable"))
    }

    async fn fetch_event_details(
        &self,
        _rest_url: &str,
        date: &str,
    ) -> Result<Vec<ExternalEventDetails>> {
        let state = self.state.lock();
        if state.failing_dates.contains(date) {
            return Err(EventError::upstream(format!("events for {} failed", date)));
        }
        Ok(state.events_by_date.get(date).cloned().unwrap_or_default())
    }

    async fn fetch_news(&self, _rest_url: &str) -> Result<Vec<ExternalNews>> {
        Ok(self.state.lock().news.clone())
    }

    async fn booked_event_ids(&self, _rest_url: &str, token: &str) -> Result<Vec<i64>> {
        let mut state = self.state.lock();
        state.tokens_seen.push(token.to_string());
        if state.fail_booked_list {
            return Err(EventError::upstream("booked list failed"));
        }
        let mut ids: Vec<i64> = state
            .booked
            .get(token)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default();
        ids.sort();
        Ok(ids)
    }

    async fn book(&self, _rest_url: &str, token: &str, event_id: i64) -> Result<()> {
        let mut state = self.state.lock();
        state.tokens_seen.push(token.to_string());
        if state.reject_bookings {
            return Err(EventError::upstream("status FULL"));
        }
        state
            .booked
            .entry(token.to_string())
            .or_default()
            .insert(event_id);
        Ok(())
    }

    async fn unbook(&self, _rest_url: &str, token: &str, event_id: i64) -> Result<()> {
        let mut state = self.state.lock();
        state.tokens_seen.push(token.to_string());
        if state.reject_bookings {
            return Err(EventError::upstream("status ERROR"));
        }
        if let Some(ids) = state.booked.get_mut(token) {
            ids.remove(&event_id);
        }
        Ok(())
    }
}

/// Membership API accepting `ada`/`secret` as member 42
pub struct FakeMembership;

#[async_trait]
impl MembershipApi for FakeMembership {
    async fn login(&self, username: &str, password: &str) -> Result<MemberLogin> {
        if username != "ada" || password != "secret" {
            return Err(EventError::invalid("Invalid credentials"));
        }
        Ok(MemberLogin {
            member_id: 42,
            token: "upstream-token".to_string(),
            valid_through: None,
            is_member: true,
            first_name: Some("Ada".to_string()),
            last_name: Some("Lovelace".to_string()),
            email: None,
        })
    }
}

/// Open, unlimited external record starting two days from now (UTC wall clock)
pub fn external_details(event_id: i64, title: &str) -> ExternalEventDetails {
    external_details_at(event_id, title, (Utc::now() + Duration::days(2)).naive_utc())
}

pub fn external_details_at(
    event_id: i64,
    title: &str,
    event_date: NaiveDateTime,
) -> ExternalEventDetails {
    ExternalEventDetails {
        event_id,
        event_date: Some(event_date),
        start_time: event_date.format("%H:%M").to_string(),
        end_time: "23:59".to_string(),
        titel: Some(title.to_string()),
        description: format!("{} description", title),
        speaker: String::new(),
        location: "Main hall".to_string(),
        location_info: None,
        map_url: None,
        admins: None,
        is_free: true,
        price: 0,
        is_limited: false,
        stock: 0,
        show_booked: false,
        booked: 0,
        date_booking_start: None,
        date_booking_end: None,
        categories: None,
        image_url150: None,
        image_url300: None,
        event_url: format!("https://events.example/{}", event_id),
    }
}

pub fn user_event(owner: i64, name: &str, start: DateTime<Utc>) -> UserEvent {
    UserEvent {
        id: None,
        user_id: owner,
        hosts: vec![],
        suggested_hosts: vec![],
        name: name.to_string(),
        location: None,
        start,
        end: None,
        description: None,
        reports: vec![],
        attendees: vec![],
        max_attendees: None,
    }
}
