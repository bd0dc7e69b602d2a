// External news refresh: replaces the stored snapshot with the latest items

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use super::Job;
use crate::services::ExternalEventService;

pub struct RefreshExternalNews {
    external: Arc<ExternalEventService>,
}

impl RefreshExternalNews {
    pub fn new(external: Arc<ExternalEventService>) -> Self {
        Self { external }
    }
}

#[async_trait]
impl Job for RefreshExternalNews {
    fn name(&self) -> &'static str {
        "refresh_external_news"
    }

    async fn run(&self) -> Result<()> {
        let api = self.external.api();
        let root = api.fetch_root().await?;
        let news = api.fetch_news(&root.rest_url).await?;
        self.external.store_news(&news).await?;
        tracing::info!(items = news.len(), "External news refreshed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::FakeEventSite;
    use swag_core::{ExternalNews, ExternalRoot};
    use swag_storage::StorageBackend;

    fn news(title: &str) -> ExternalNews {
        ExternalNews {
            published: None,
            date: "2025-06-01".to_string(),
            time: Some("12:00".to_string()),
            title: Some(title.to_string()),
            description: format!("{} text", title),
            by: None,
        }
    }

    #[tokio::test]
    async fn test_refresh_replaces_snapshot() {
        let site = Arc::new(FakeEventSite::default());
        let external = Arc::new(ExternalEventService::new(
            StorageBackend::in_memory(),
            site.clone(),
        ));
        external.store_news(&[news("Old")]).await.unwrap();
        site.with(|s| {
            s.root = Some(ExternalRoot {
                rest_url: "https://events.example/rest".to_string(),
                dates: vec![],
                extra: Default::default(),
            });
            s.news = vec![news("Fresh"), news("Fresher")];
        });

        RefreshExternalNews::new(external.clone()).run().await.unwrap();

        let titles: Vec<String> = external
            .news()
            .await
            .into_iter()
            .filter_map(|n| n.title)
            .collect();
        assert_eq!(titles, vec!["Fresh", "Fresher"]);
    }

    #[tokio::test]
    async fn test_discovery_failure_keeps_snapshot() {
        let site = Arc::new(FakeEventSite::default());
        let external = Arc::new(ExternalEventService::new(StorageBackend::in_memory(), site));
        external.store_news(&[news("Old")]).await.unwrap();

        let job = RefreshExternalNews::new(external.clone());
        assert!(job.run().await.is_err());
        assert_eq!(external.news().await.len(), 1);
    }
}
