// Repository layer for PostgreSQL
//
// Documents are stored as JSONB; array edits on user events are expressed as
// single conditional UPDATE statements so concurrent requests cannot race
// past the capacity and membership checks.

use std::collections::HashSet;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use swag_core::{ExternalEventDetails, ExternalNews, ExternalRoot, User, UserEvent};

use crate::models::*;

/// `doc->'{field}'` as an array, treating missing and JSON null as empty
fn array_field(field: &str) -> String {
    format!(
        "CASE WHEN jsonb_typeof(doc->'{field}') = 'array' THEN doc->'{field}' ELSE '[]'::jsonb END"
    )
}

/// `doc->'{field}'` without the element whose `userId` equals `$2`
fn array_without_user(field: &str) -> String {
    format!(
        "COALESCE((SELECT jsonb_agg(e) FROM jsonb_array_elements({array}) e \
         WHERE (e->>'userId')::bigint <> $2), '[]'::jsonb)",
        array = array_field(field)
    )
}

/// Predicate: `doc->'{field}'` contains an element with `userId = $n`
fn array_contains_user(field: &str, param: usize) -> String {
    format!(
        "({array}) @> jsonb_build_array(jsonb_build_object('userId', ${param}::bigint))",
        array = array_field(field)
    )
}

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create database connection from URL and apply pending migrations
    pub async fn from_url(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("Failed to connect to database")?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run database migrations")?;
        tracing::info!("Database migrations applied");

        Ok(Self { pool })
    }

    // ============================================
    // Users
    // ============================================

    pub async fn get_user(&self, user_id: i64) -> Result<Option<User>> {
        let row = sqlx::query_scalar::<_, Json<User>>("SELECT doc FROM users WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|Json(user)| user))
    }

    pub async fn get_users(&self, user_ids: &[i64]) -> Result<Vec<User>> {
        let rows = sqlx::query_scalar::<_, Json<User>>(
            "SELECT doc FROM users WHERE user_id = ANY($1) ORDER BY user_id",
        )
        .bind(user_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|Json(user)| user).collect())
    }

    pub async fn upsert_user(&self, user: &User) -> Result<User> {
        let Json(stored) = sqlx::query_scalar::<_, Json<User>>(
            r#"
            INSERT INTO users (user_id, doc)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET doc = EXCLUDED.doc, updated_at = NOW()
            RETURNING doc
            "#,
        )
        .bind(user.user_id)
        .bind(Json(user))
        .fetch_one(&self.pool)
        .await?;
        Ok(stored)
    }

    pub async fn get_users_showing_location(&self) -> Result<Vec<User>> {
        let rows = sqlx::query_scalar::<_, Json<User>>(
            r#"
            SELECT doc FROM users
            WHERE COALESCE(doc->'settings'->>'show_location', 'no_one') <> 'no_one'
              AND jsonb_typeof(doc->'location') = 'object'
            ORDER BY user_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|Json(user)| user).collect())
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
        sqlx::query(
            r#"
            INSERT INTO external_tokens (user_id, token, created_at, expires_at)
            VALUES ($1, $2, NOW(), $3)
            ON CONFLICT (user_id) DO UPDATE
            SET token = EXCLUDED.token, created_at = EXCLUDED.created_at, expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(user_id)
        .bind(token)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_external_token(&self, user_id: i64) -> Result<Option<ExternalTokenRow>> {
        let row = sqlx::query_as::<_, ExternalTokenRow>(
            "SELECT user_id, token, created_at, expires_at FROM external_tokens WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    // ============================================
    // External event cache
    // ============================================

    pub async fn store_external_root(&self, root: &ExternalRoot) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO external_root (id, doc) VALUES (1, $1)
            ON CONFLICT (id) DO UPDATE SET doc = EXCLUDED.doc, updated_at = NOW()
            "#,
        )
        .bind(Json(root))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_external_root(&self) -> Result<Option<ExternalRoot>> {
        let row = sqlx::query_scalar::<_, Json<ExternalRoot>>(
            "SELECT doc FROM external_root WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|Json(root)| root))
    }

    pub async fn upsert_external_event(&self, details: &ExternalEventDetails) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO external_events (event_id, doc) VALUES ($1, $2)
            ON CONFLICT (event_id) DO UPDATE SET doc = EXCLUDED.doc, updated_at = NOW()
            "#,
        )
        .bind(details.event_id)
        .bind(Json(details))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_external_events(
        &self,
        event_ids: &[i64],
        admin_id: Option<i64>,
    ) -> Result<Vec<ExternalEventDetails>> {
        let rows = sqlx::query_scalar::<_, Json<ExternalEventDetails>>(&format!(
            r#"
            SELECT doc FROM external_events
            WHERE event_id = ANY($1)
               OR ($2::text IS NOT NULL AND EXISTS (
                    SELECT 1 FROM jsonb_array_elements_text({admins}) a WHERE trim(a) = $2
               ))
            ORDER BY event_id
            "#,
            admins = array_field("admins")
        ))
        .bind(event_ids)
        .bind(admin_id.map(|id| id.to_string()))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|Json(details)| details).collect())
    }

    pub async fn get_all_external_events(&self) -> Result<Vec<ExternalEventDetails>> {
        let rows = sqlx::query_scalar::<_, Json<ExternalEventDetails>>(
            "SELECT doc FROM external_events ORDER BY event_id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|Json(details)| details).collect())
    }

    pub async fn clean_external_events(&self, keeping: &HashSet<i64>) -> Result<u64> {
        let keep: Vec<i64> = keeping.iter().copied().collect();
        let result = sqlx::query("DELETE FROM external_events WHERE NOT (event_id = ANY($1))")
            .bind(&keep)
            .execute(&self.pool)
            .await?;
        tracing::debug!(kept = keep.len(), removed = result.rows_affected(), "Pruned external events");
        Ok(result.rows_affected())
    }

    pub async fn store_external_news(&self, news: &[ExternalNews]) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO external_news (id, doc) VALUES (1, $1)
            ON CONFLICT (id) DO UPDATE SET doc = EXCLUDED.doc, updated_at = NOW()
            "#,
        )
        .bind(Json(news))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_external_news(&self) -> Result<Vec<ExternalNews>> {
        let row = sqlx::query_scalar::<_, Json<Vec<ExternalNews>>>(
            "SELECT doc FROM external_news WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|Json(news)| news).unwrap_or_default())
    }

    // ============================================
    // User events
    // ============================================

    pub async fn create_user_event(&self, mut event: UserEvent) -> Result<UserEvent> {
        let id = Uuid::now_v7();
        event.id = Some(id);
        sqlx::query(
            r#"
            INSERT INTO user_events (id, user_id, start_at, end_at, doc)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(id)
        .bind(event.user_id)
        .bind(event.start)
        .bind(event.end)
        .bind(Json(&event))
        .execute(&self.pool)
        .await?;
        Ok(event)
    }

    pub async fn get_user_event(&self, id: Uuid) -> Result<Option<UserEvent>> {
        let row = sqlx::query_scalar::<_, Json<UserEvent>>("SELECT doc FROM user_events WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|Json(event)| event))
    }

    /// Replace the document in one statement, keeping the `preserve` arrays of the stored row
    pub async fn update_user_event(
        &self,
        id: Uuid,
        mut event: UserEvent,
        preserve: Preserve,
    ) -> Result<bool> {
        event.id = Some(id);
        let kept = preserve
            .fields()
            .iter()
            .map(|field| format!("'{field}', {}", array_field(field)))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            r#"
            UPDATE user_events
            SET user_id = $2, start_at = $3, end_at = $4,
                doc = $5::jsonb || jsonb_build_object({kept}),
                updated_at = NOW()
            WHERE id = $1
            "#
        );

        let result = sqlx::query(&sql)
            .bind(id)
            .bind(event.user_id)
            .bind(event.start)
            .bind(event.end)
            .bind(Json(&event))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_user_event(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM user_events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_user_events(&self, query: UserEventQuery) -> Result<Vec<UserEvent>> {
        match query {
            UserEventQuery::EndingAfter(t) => {
                self.user_events_at("start_at >= $1 OR end_at >= $1", t).await
            }
            UserEventQuery::StartingSince(t) => self.user_events_at("start_at >= $1", t).await,
            UserEventQuery::OwnedBy(u) => self.user_events_for("user_id = $1", u).await,
            UserEventQuery::HostedBy(u) => {
                self.user_events_for(&array_contains_user("hosts", 1), u).await
            }
            UserEventQuery::AttendedBy(u) => {
                self.user_events_for(&array_contains_user("attendees", 1), u)
                    .await
            }
            UserEventQuery::SuggestedHost(u) => {
                self.user_events_for(&array_contains_user("suggested_hosts", 1), u)
                    .await
            }
        }
    }

    async fn user_events_at(&self, predicate: &str, instant: DateTime<Utc>) -> Result<Vec<UserEvent>> {
        let sql = format!("SELECT doc FROM user_events WHERE {predicate} ORDER BY start_at, id");
        let rows = sqlx::query_scalar::<_, Json<UserEvent>>(&sql)
            .bind(instant)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|Json(event)| event).collect())
    }

    async fn user_events_for(&self, predicate: &str, user_id: i64) -> Result<Vec<UserEvent>> {
        let sql = format!("SELECT doc FROM user_events WHERE {predicate} ORDER BY start_at, id");
        let rows = sqlx::query_scalar::<_, Json<UserEvent>>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|Json(event)| event).collect())
    }

    /// Add `user_id` to `attendees` only if absent and below `maxAttendees`
    pub async fn add_attendee(&self, id: Uuid, user_id: i64) -> Result<AttendOutcome> {
        let sql = format!(
            r#"
            UPDATE user_events
            SET doc = jsonb_set(doc, '{{attendees}}',
                    ({attendees}) || jsonb_build_array(jsonb_build_object('userId', $2::bigint))),
                updated_at = NOW()
            WHERE id = $1
              AND NOT {contains}
              AND (jsonb_typeof(doc->'maxAttendees') IS DISTINCT FROM 'number'
                   OR jsonb_array_length({attendees}) < (doc->>'maxAttendees')::bigint)
            RETURNING id
            "#,
            attendees = array_field("attendees"),
            contains = array_contains_user("attendees", 2),
        );

        let updated = sqlx::query_scalar::<_, Uuid>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        if updated.is_some() {
            return Ok(AttendOutcome::Added);
        }

        // Nothing changed: classify why
        Ok(match self.get_user_event(id).await? {
            None => AttendOutcome::NotFound,
            Some(event) if event.is_attending(user_id) => AttendOutcome::AlreadyAttending,
            Some(_) => AttendOutcome::Full,
        })
    }

    /// Returns false when the event does not exist
    pub async fn remove_attendee(&self, id: Uuid, user_id: i64) -> Result<bool> {
        self.set_array_without_user(id, user_id, "attendees").await
    }

    /// Move `user_id` from `suggested_hosts` into `hosts`.
    /// Returns false when the user was not invited (or the event is missing).
    pub async fn accept_host(&self, id: Uuid, user_id: i64) -> Result<bool> {
        let sql = format!(
            r#"
            UPDATE user_events
            SET doc = jsonb_set(
                    jsonb_set(doc, '{{suggested_hosts}}', {suggested_without}),
                    '{{hosts}}',
                    CASE WHEN {is_host} THEN {hosts}
                         ELSE ({hosts}) || jsonb_build_array(jsonb_build_object('userId', $2::bigint))
                    END),
                updated_at = NOW()
            WHERE id = $1 AND {is_suggested}
            "#,
            suggested_without = array_without_user("suggested_hosts"),
            is_host = array_contains_user("hosts", 2),
            hosts = array_field("hosts"),
            is_suggested = array_contains_user("suggested_hosts", 2),
        );
        let result = sqlx::query(&sql)
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Drop a pending invitation. Returns false when the user was not invited.
    pub async fn remove_suggested_host(&self, id: Uuid, user_id: i64) -> Result<bool> {
        self.set_array_without_user_if_present(id, user_id, "suggested_hosts")
            .await
    }

    /// Returns false when the user is not a host.
    pub async fn remove_host(&self, id: Uuid, user_id: i64) -> Result<bool> {
        self.set_array_without_user_if_present(id, user_id, "hosts").await
    }

    /// Update the report authored by `user_id` in place, or append a new one
    pub async fn upsert_report(&self, id: Uuid, user_id: i64, text: &str) -> Result<bool> {
        let sql = format!(
            r#"
            UPDATE user_events
            SET doc = jsonb_set(doc, '{{reports}}',
                    CASE WHEN {has_report} THEN
                        (SELECT jsonb_agg(CASE WHEN (r->>'userId')::bigint = $2
                                               THEN jsonb_set(r, '{{text}}', to_jsonb($3::text))
                                               ELSE r END)
                         FROM jsonb_array_elements({reports}) r)
                    ELSE ({reports}) || jsonb_build_array(jsonb_build_object('userId', $2::bigint, 'text', $3::text))
                    END),
                updated_at = NOW()
            WHERE id = $1
            "#,
            has_report = array_contains_user("reports", 2),
            reports = array_field("reports"),
        );
        let result = sqlx::query(&sql)
            .bind(id)
            .bind(user_id)
            .bind(text)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Returns false when the user has no report on the event
    pub async fn remove_report(&self, id: Uuid, user_id: i64) -> Result<bool> {
        self.set_array_without_user_if_present(id, user_id, "reports")
            .await
    }

    async fn set_array_without_user(&self, id: Uuid, user_id: i64, field: &str) -> Result<bool> {
        let sql = format!(
            "UPDATE user_events SET doc = jsonb_set(doc, '{{{field}}}', {without}), updated_at = NOW() WHERE id = $1",
            without = array_without_user(field),
        );
        let result = sqlx::query(&sql)
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_array_without_user_if_present(
        &self,
        id: Uuid,
        user_id: i64,
        field: &str,
    ) -> Result<bool> {
        let sql = format!(
            "UPDATE user_events SET doc = jsonb_set(doc, '{{{field}}}', {without}), updated_at = NOW() \
             WHERE id = $1 AND {contains}",
            without = array_without_user(field),
            contains = array_contains_user(field, 2),
        );
        let result = sqlx::query(&sql)
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
