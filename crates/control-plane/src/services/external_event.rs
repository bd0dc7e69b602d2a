// External event cache service
//
// Read side of the cached events API data plus the booking calls that have
// to reach the third party directly.
// Decision: List reads degrade to empty results with a logged error
// Decision: A missing upstream session is a 400; 401 stays reserved for our own bearer token
// Decision: The REST url comes from the stored discovery document; the client falls back to its configured url

use std::collections::HashSet;
use std::sync::Arc;

use swag_core::{
    EventError, EventSiteApi, ExternalEventDetails, ExternalNews, ExternalRoot, Result,
};
use swag_storage::StorageBackend;

pub struct ExternalEventService {
    storage: StorageBackend,
    api: Arc<dyn EventSiteApi>,
}

impl ExternalEventService {
    pub fn new(storage: StorageBackend, api: Arc<dyn EventSiteApi>) -> Self {
        Self { storage, api }
    }

    pub fn api(&self) -> &Arc<dyn EventSiteApi> {
        &self.api
    }

    // ============================================
    // Discovery document
    // ============================================

    pub async fn store_root(&self, root: &ExternalRoot) -> Result<()> {
        Ok(self.storage.store_external_root(root).await?)
    }

    pub async fn root(&self) -> Result<Option<ExternalRoot>> {
        Ok(self.storage.get_external_root().await?)
    }

    /// REST url of the stored root; empty when none is stored yet
    pub async fn rest_url(&self) -> String {
        match self.storage.get_external_root().await {
            Ok(Some(root)) => root.rest_url,
            Ok(None) => String::new(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to load external root");
                String::new()
            }
        }
    }

    // ============================================
    // Event details
    // ============================================

    /// Upsert each record by `eventId`; returns how many were stored
    pub async fn store_details(&self, events: &[ExternalEventDetails]) -> usize {
        let mut stored = 0;
        for details in events {
            match self.storage.upsert_external_event(details).await {
                Ok(()) => stored += 1,
                Err(e) => tracing::error!(
                    event_id = details.event_id,
                    error = %e,
                    "Failed to store external event"
                ),
            }
        }
        stored
    }

    /// Cached records in `event_ids`, or administered by `host_id`
    pub async fn stored_details(
        &self,
        event_ids: &[i64],
        host_id: Option<i64>,
    ) -> Vec<ExternalEventDetails> {
        self.storage
            .get_external_events(event_ids, host_id)
            .await
            .unwrap_or_else(|e| {
                tracing::error!(error = %e, "Failed to load external events");
                vec![]
            })
    }

    pub async fn all_details(&self) -> Vec<ExternalEventDetails> {
        self.storage
            .get_all_external_events()
            .await
            .unwrap_or_else(|e| {
                tracing::error!(error = %e, "Failed to load external events");
                vec![]
            })
    }

    /// Drop cached records missing from `keeping`
    pub async fn clean(&self, keeping: &HashSet<i64>) -> Result<u64> {
        Ok(self.storage.clean_external_events(keeping).await?)
    }

    // ============================================
    // News
    // ============================================

    pub async fn store_news(&self, news: &[ExternalNews]) -> Result<()> {
        Ok(self.storage.store_external_news(news).await?)
    }

    pub async fn news(&self) -> Vec<ExternalNews> {
        self.storage.get_external_news().await.unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to load external news");
            vec![]
        })
    }

    // ============================================
    // Bookings (third-party calls on behalf of a member)
    // ============================================

    async fn token(&self, user_id: i64) -> Result<String> {
        self.storage
            .get_external_token(user_id)
            .await?
            .ok_or_else(|| EventError::invalid("External session expired, log in again"))
    }

    /// Ids the member has booked upstream
    pub async fn booked_ids(&self, user_id: i64) -> Result<HashSet<i64>> {
        let token = self.token(user_id).await?;
        let rest_url = self.rest_url().await;
        let ids = self.api.booked_event_ids(&rest_url, &token).await?;
        Ok(ids.into_iter().collect())
    }

    /// Cached details of events the member booked or administers
    pub async fn booked_details(&self, user_id: i64) -> Vec<ExternalEventDetails> {
        let ids: Vec<i64> = match self.booked_ids(user_id).await {
            Ok(ids) => ids.into_iter().collect(),
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Failed to fetch booked external events");
                vec![]
            }
        };
        self.stored_details(&ids, Some(user_id)).await
    }

    pub async fn book(&self, user_id: i64, event_id: i64) -> Result<()> {
        let token = self.token(user_id).await?;
        let rest_url = self.rest_url().await;
        self.api.book(&rest_url, &token, event_id).await
    }

    pub async fn unbook(&self, user_id: i64, event_id: i64) -> Result<()> {
        let token = self.token(user_id).await?;
        let rest_url = self.rest_url().await;
        self.api.unbook(&rest_url, &token, event_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{external_details, FakeEventSite};
    use chrono::{Duration, Utc};

    async fn setup() -> (StorageBackend, Arc<FakeEventSite>, ExternalEventService) {
        let storage = StorageBackend::in_memory();
        let site = Arc::new(FakeEventSite::default());
        let service = ExternalEventService::new(storage.clone(), site.clone());
        (storage, site, service)
    }

    #[tokio::test]
    async fn test_stored_details_include_administered() {
        let (_, _, service) = setup().await;
        let mut administered = external_details(2, "Admin night");
        administered.admins = Some(vec!["42".to_string(), "n/a".to_string()]);
        service
            .store_details(&[external_details(1, "Booked"), administered, external_details(3, "Other")])
            .await;

        let mut ids: Vec<i64> = service
            .stored_details(&[1], Some(42))
            .await
            .into_iter()
            .map(|d| d.event_id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(service.all_details().await.len(), 3);
    }

    #[tokio::test]
    async fn test_booking_requires_token() {
        let (storage, site, service) = setup().await;

        let err = service.book(5, 1).await.unwrap_err();
        assert!(matches!(err, EventError::InvalidRequest(_)));

        storage
            .save_external_token(5, "member-token", Utc::now() + Duration::hours(1))
            .await
            .unwrap();
        service.book(5, 1).await.unwrap();
        assert_eq!(service.booked_ids(5).await.unwrap(), HashSet::from([1]));

        service.unbook(5, 1).await.unwrap();
        assert!(service.booked_ids(5).await.unwrap().is_empty());
        assert_eq!(site.calls_with_token("member-token"), 4);
    }

    #[tokio::test]
    async fn test_rest_url_from_stored_root() {
        let (_, _, service) = setup().await;
        assert_eq!(service.rest_url().await, "");

        service
            .store_root(&ExternalRoot {
                rest_url: "https://events.example/rest".to_string(),
                dates: vec![],
                extra: Default::default(),
            })
            .await
            .unwrap();
        assert_eq!(service.rest_url().await, "https://events.example/rest");
    }
}
