// External event cache refresh
//
// discovery -> store root -> fetch each date -> upsert -> prune -> verify
// Decision: A date that fails is skipped; if no date succeeds nothing is pruned,
// so an upstream outage never empties the cache

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use swag_core::ExternalEventDetails;
use tracing::{error, info, warn};

use super::Job;
use crate::services::ExternalEventService;

/// Outcome of one sync run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub dates: usize,
    pub failed_dates: usize,
    pub stored: usize,
    /// `None` when pruning was skipped
    pub removed: Option<u64>,
    pub missing_after_store: usize,
}

pub struct SyncExternalEvents {
    external: Arc<ExternalEventService>,
}

impl SyncExternalEvents {
    pub fn new(external: Arc<ExternalEventService>) -> Self {
        Self { external }
    }

    pub async fn sync(&self) -> Result<SyncReport> {
        let api = self.external.api();
        let root = api.fetch_root().await?;
        self.external.store_root(&root).await?;

        let mut report = SyncReport {
            dates: root.dates.len(),
            ..Default::default()
        };

        let mut fetched: Vec<ExternalEventDetails> = Vec::new();
        for date in &root.dates {
            match api.fetch_event_details(&root.rest_url, date).await {
                Ok(events) => fetched.extend(events),
                Err(e) => {
                    warn!(date = %date, error = %e, "Failed to fetch external events for date");
                    report.failed_dates += 1;
                }
            }
        }

        report.stored = self.external.store_details(&fetched).await;

        let keeping: HashSet<i64> = fetched.iter().map(|d| d.event_id).collect();
        if report.failed_dates == report.dates {
            warn!(
                dates = report.dates,
                "No event dates fetched, keeping the cached events"
            );
        } else {
            report.removed = Some(self.external.clean(&keeping).await?);
        }

        let ids: Vec<i64> = keeping.iter().copied().collect();
        let present: HashSet<i64> = self
            .external
            .stored_details(&ids, None)
            .await
            .into_iter()
            .map(|d| d.event_id)
            .collect();
        for id in keeping.difference(&present) {
            error!(event_id = id, "External event missing from cache after store");
            report.missing_after_store += 1;
        }

        info!(?report, "External events synced");
        Ok(report)
    }
}

#[async_trait]
impl Job for SyncExternalEvents {
    fn name(&self) -> &'static str {
        "sync_external_events"
    }

    async fn run(&self) -> Result<()> {
        self.sync().await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{external_details, FakeEventSite};
    use swag_core::ExternalRoot;
    use swag_storage::StorageBackend;

    fn root(dates: &[&str]) -> ExternalRoot {
        ExternalRoot {
            rest_url: "https://events.example/rest".to_string(),
            dates: dates.iter().map(|d| d.to_string()).collect(),
            extra: Default::default(),
        }
    }

    fn setup() -> (Arc<FakeEventSite>, Arc<ExternalEventService>, SyncExternalEvents) {
        let site = Arc::new(FakeEventSite::default());
        let external = Arc::new(ExternalEventService::new(
            StorageBackend::in_memory(),
            site.clone(),
        ));
        let job = SyncExternalEvents::new(external.clone());
        (site, external, job)
    }

    fn ids(events: Vec<ExternalEventDetails>) -> Vec<i64> {
        let mut ids: Vec<i64> = events.into_iter().map(|d| d.event_id).collect();
        ids.sort();
        ids
    }

    #[tokio::test]
    async fn test_sync_stores_and_prunes() {
        let (site, external, job) = setup();
        external
            .store_details(&[external_details(99, "Gone upstream")])
            .await;
        site.with(|s| {
            s.root = Some(root(&["2025-06-01", "2025-06-02"]));
            s.events_by_date
                .insert("2025-06-01".to_string(), vec![external_details(1, "One")]);
            s.events_by_date
                .insert("2025-06-02".to_string(), vec![external_details(2, "Two")]);
        });

        let report = job.sync().await.unwrap();
        assert_eq!(report.stored, 2);
        assert_eq!(report.removed, Some(1));
        assert_eq!(report.missing_after_store, 0);
        assert_eq!(ids(external.all_details().await), vec![1, 2]);
        assert_eq!(
            external.root().await.unwrap().unwrap().rest_url,
            "https://events.example/rest"
        );
    }

    #[tokio::test]
    async fn test_failed_date_is_skipped() {
        let (site, external, job) = setup();
        site.with(|s| {
            s.root = Some(root(&["2025-06-01", "2025-06-02"]));
            s.events_by_date
                .insert("2025-06-01".to_string(), vec![external_details(1, "One")]);
            s.failing_dates.insert("2025-06-02".to_string());
        });

        let report = job.sync().await.unwrap();
        assert_eq!(report.failed_dates, 1);
        assert_eq!(ids(external.all_details().await), vec![1]);
    }

    #[tokio::test]
    async fn test_outage_keeps_cache() {
        let (site, external, job) = setup();
        external.store_details(&[external_details(7, "Cached")]).await;
        site.with(|s| {
            s.root = Some(root(&["2025-06-01"]));
            s.failing_dates.insert("2025-06-01".to_string());
        });

        let report = job.sync().await.unwrap();
        assert_eq!(report.removed, None);
        assert_eq!(ids(external.all_details().await), vec![7]);
    }

    #[tokio::test]
    async fn test_discovery_failure_fails_run() {
        let (_, external, job) = setup();
        external.store_details(&[external_details(7, "Cached")]).await;

        assert!(job.run().await.is_err());
        assert_eq!(ids(external.all_details().await), vec![7]);
    }
}
