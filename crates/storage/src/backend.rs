// Storage backend abstraction
// Decision: Use enum dispatch for simplicity over trait objects
//
// This module provides a unified StorageBackend enum that can work with
// either PostgreSQL (production) or in-memory (dev mode) storage.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use swag_core::{ExternalEventDetails, ExternalNews, ExternalRoot, User, UserEvent};

use crate::memory::InMemoryDatabase;
use crate::models::*;
use crate::repositories::Database;

/// Storage backend that can be either PostgreSQL or in-memory
#[derive(Clone)]
pub enum StorageBackend {
    /// PostgreSQL database (production)
    Postgres(Database),
    /// In-memory database (dev mode)
    InMemory(Arc<InMemoryDatabase>),
}

impl StorageBackend {
    /// Create a PostgreSQL storage backend from a database URL
    pub async fn postgres(database_url: &str) -> Result<Self> {
        let db = Database::from_url(database_url).await?;
        Ok(Self::Postgres(db))
    }

    /// Create an in-memory storage backend
    pub fn in_memory() -> Self {
        Self::InMemory(Arc::new(InMemoryDatabase::new()))
    }

    /// Short backend name for health reporting
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Postgres(_) => "postgres",
            Self::InMemory(_) => "in-memory",
        }
    }

    // ============================================
    // Users
    // ============================================

    pub async fn get_user(&self, user_id: i64) -> Result<Option<User>> {
        match self {
            Self::Postgres(db) => db.get_user(user_id).await,
            Self::InMemory(db) => db.get_user(user_id).await,
        }
    }

    pub async fn get_users(&self, user_ids: &[i64]) -> Result<Vec<User>> {
        match self {
            Self::Postgres(db) => db.get_users(user_ids).await,
            Self::InMemory(db) => db.get_users(user_ids).await,
        }
    }

    pub async fn upsert_user(&self, user: &User) -> Result<User> {
        match self {
            Self::Postgres(db) => db.upsert_user(user).await,
            Self::InMemory(db) => db.upsert_user(user).await,
        }
    }

    pub async fn get_users_showing_location(&self) -> Result<Vec<User>> {
        match self {
            Self::Postgres(db) => db.get_users_showing_location().await,
            Self::InMemory(db) => db.get_users_showing_location().await,
        }
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
        match self {
            Self::Postgres(db) => db.save_external_token(user_id, token, expires_at).await,
            Self::InMemory(db) => db.save_external_token(user_id, token, expires_at).await,
        }
    }

    /// Stored token of the user, only while it has not expired
    pub async fn get_external_token(&self, user_id: i64) -> Result<Option<String>> {
        let row = match self {
            Self::Postgres(db) => db.get_external_token(user_id).await?,
            Self::InMemory(db) => db.get_external_token(user_id).await?,
        };
        let now = Utc::now();
        Ok(row.filter(|r| r.is_valid_at(now)).map(|r| r.token))
    }

    // ============================================
    // External event cache
    // ============================================

    pub async fn store_external_root(&self, root: &ExternalRoot) -> Result<()> {
        match self {
            Self::Postgres(db) => db.store_external_root(root).await,
            Self::InMemory(db) => db.store_external_root(root).await,
        }
    }

    pub async fn get_external_root(&self) -> Result<Option<ExternalRoot>> {
        match self {
            Self::Postgres(db) => db.get_external_root().await,
            Self::InMemory(db) => db.get_external_root().await,
        }
    }

    pub async fn upsert_external_event(&self, details: &ExternalEventDetails) -> Result<()> {
        match self {
            Self::Postgres(db) => db.upsert_external_event(details).await,
            Self::InMemory(db) => db.upsert_external_event(details).await,
        }
    }

    /// Cached records with an id in `event_ids`, or listing `admin_id` among their admins
    pub async fn get_external_events(
        &self,
        event_ids: &[i64],
        admin_id: Option<i64>,
    ) -> Result<Vec<ExternalEventDetails>> {
        match self {
            Self::Postgres(db) => db.get_external_events(event_ids, admin_id).await,
            Self::InMemory(db) => db.get_external_events(event_ids, admin_id).await,
        }
    }

    pub async fn get_all_external_events(&self) -> Result<Vec<ExternalEventDetails>> {
        match self {
            Self::Postgres(db) => db.get_all_external_events().await,
            Self::InMemory(db) => db.get_all_external_events().await,
        }
    }

    /// Delete cached records whose id is not in `keeping`; returns the number deleted
    pub async fn clean_external_events(&self, keeping: &HashSet<i64>) -> Result<u64> {
        match self {
            Self::Postgres(db) => db.clean_external_events(keeping).await,
            Self::InMemory(db) => db.clean_external_events(keeping).await,
        }
    }

    pub async fn store_external_news(&self, news: &[ExternalNews]) -> Result<()> {
        match self {
            Self::Postgres(db) => db.store_external_news(news).await,
            Self::InMemory(db) => db.store_external_news(news).await,
        }
    }

    pub async fn get_external_news(&self) -> Result<Vec<ExternalNews>> {
        match self {
            Self::Postgres(db) => db.get_external_news().await,
            Self::InMemory(db) => db.get_external_news().await,
        }
    }

    // ============================================
    // User events
    // ============================================

    /// Persist a new event; the returned copy carries the generated id
    pub async fn create_user_event(&self, event: UserEvent) -> Result<UserEvent> {
        match self {
            Self::Postgres(db) => db.create_user_event(event).await,
            Self::InMemory(db) => db.create_user_event(event).await,
        }
    }

    /// Full document, reports included
    pub async fn get_user_event(&self, id: Uuid) -> Result<Option<UserEvent>> {
        match self {
            Self::Postgres(db) => db.get_user_event(id).await,
            Self::InMemory(db) => db.get_user_event(id).await,
        }
    }

    /// Replace the document except the `preserve` arrays; false when no event has this id
    pub async fn update_user_event(
        &self,
        id: Uuid,
        event: UserEvent,
        preserve: Preserve,
    ) -> Result<bool> {
        match self {
            Self::Postgres(db) => db.update_user_event(id, event, preserve).await,
            Self::InMemory(db) => db.update_user_event(id, event, preserve).await,
        }
    }

    pub async fn delete_user_event(&self, id: Uuid) -> Result<bool> {
        match self {
            Self::Postgres(db) => db.delete_user_event(id).await,
            Self::InMemory(db) => db.delete_user_event(id).await,
        }
    }

    /// Full documents matching the query, ordered by start
    pub async fn list_user_events(&self, query: UserEventQuery) -> Result<Vec<UserEvent>> {
        match self {
            Self::Postgres(db) => db.list_user_events(query).await,
            Self::InMemory(db) => db.list_user_events(query).await,
        }
    }

    pub async fn add_attendee(&self, id: Uuid, user_id: i64) -> Result<AttendOutcome> {
        match self {
            Self::Postgres(db) => db.add_attendee(id, user_id).await,
            Self::InMemory(db) => db.add_attendee(id, user_id).await,
        }
    }

    pub async fn remove_attendee(&self, id: Uuid, user_id: i64) -> Result<bool> {
        match self {
            Self::Postgres(db) => db.remove_attendee(id, user_id).await,
            Self::InMemory(db) => db.remove_attendee(id, user_id).await,
        }
    }

    pub async fn accept_host(&self, id: Uuid, user_id: i64) -> Result<bool> {
        match self {
            Self::Postgres(db) => db.accept_host(id, user_id).await,
            Self::InMemory(db) => db.accept_host(id, user_id).await,
        }
    }

    pub async fn remove_suggested_host(&self, id: Uuid, user_id: i64) -> Result<bool> {
        match self {
            Self::Postgres(db) => db.remove_suggested_host(id, user_id).await,
            Self::InMemory(db) => db.remove_suggested_host(id, user_id).await,
        }
    }

    pub async fn remove_host(&self, id: Uuid, user_id: i64) -> Result<bool> {
        match self {
            Self::Postgres(db) => db.remove_host(id, user_id).await,
            Self::InMemory(db) => db.remove_host(id, user_id).await,
        }
    }

    pub async fn upsert_report(&self, id: Uuid, user_id: i64, text: &str) -> Result<bool> {
        match self {
            Self::Postgres(db) => db.upsert_report(id, user_id, text).await,
            Self::InMemory(db) => db.upsert_report(id, user_id, text).await,
        }
    }

    pub async fn remove_report(&self, id: Uuid, user_id: i64) -> Result<bool> {
        match self {
            Self::Postgres(db) => db.remove_report(id, user_id).await,
            Self::InMemory(db) => db.remove_report(id, user_id).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn test_external_token_expiry() {
        let storage = StorageBackend::in_memory();
        assert_eq!(storage.kind(), "in-memory");

        storage
            .save_external_token(1, "live", Utc::now() + Duration::hours(1))
            .await
            .unwrap();
        storage
            .save_external_token(2, "stale", Utc::now() - Duration::hours(1))
            .await
            .unwrap();

        assert_eq!(
            storage.get_external_token(1).await.unwrap().as_deref(),
            Some("live")
        );
        assert!(storage.get_external_token(2).await.unwrap().is_none());
        assert!(storage.get_external_token(3).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_external_token_overwrites() {
        let storage = StorageBackend::in_memory();
        let expiry = Utc::now() + Duration::hours(1);
        storage.save_external_token(1, "old", expiry).await.unwrap();
        storage.save_external_token(1, "new", expiry).await.unwrap();
        assert_eq!(
            storage.get_external_token(1).await.unwrap().as_deref(),
            Some("new")
        );
    }
}
