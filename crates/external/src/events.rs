// Events API client
//
// Discovery is a GET on the configured url. Every other call is a POST of
// `{operation, token, ...}` to the discovered REST url.
// Decision: Malformed records are logged and dropped, never failing a listing

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use swag_core::{
    BookedEvent, EventError, EventSiteApi, ExternalEventDetails, ExternalNews, ExternalRoot,
    Result,
};

use crate::config::ExternalApiConfig;

/// Value of `status` on a successful operation
const STATUS_OK: &str = "OK";

#[derive(Deserialize)]
struct EventsEnvelope {
    #[serde(default)]
    events: Vec<Value>,
}

#[derive(Deserialize)]
struct NewsEnvelope {
    #[serde(default)]
    news: Vec<Value>,
}

/// Client for the third-party events API
#[derive(Clone)]
pub struct EventSiteClient {
    client: Client,
    config: ExternalApiConfig,
}

impl EventSiteClient {
    pub fn new(client: Client, config: ExternalApiConfig) -> Self {
        Self { client, config }
    }

    fn operation_url<'a>(&'a self, rest_url: &'a str) -> &'a str {
        if rest_url.trim().is_empty() {
            &self.config.events_api_url
        } else {
            rest_url
        }
    }

    /// POST an operation and return the JSON body.
    ///
    /// A `status` other than "OK" is an upstream failure; when `require_status`
    /// is set, a missing `status` is too.
    async fn post_operation(
        &self,
        rest_url: &str,
        operation: &str,
        mut body: Value,
        require_status: bool,
    ) -> Result<Value> {
        body["operation"] = Value::String(operation.to_string());
        let url = self.operation_url(rest_url);

        tracing::debug!(operation, url, "Calling events API");

        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(operation, error = %e, "Failed to send events API request");
                EventError::upstream(format!("{} request failed", operation))
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::warn!(operation, status = %status, body = %text, "Events API error");
            return Err(EventError::upstream(format!(
                "{} returned {}",
                operation, status
            )));
        }

        let value: Value = response.json().await.map_err(|e| {
            tracing::error!(operation, error = %e, "Failed to parse events API response");
            EventError::upstream(format!("{} returned malformed JSON", operation))
        })?;

        match value.get("status").and_then(Value::as_str) {
            Some(STATUS_OK) => {}
            None if !require_status => {}
            other => {
                tracing::warn!(operation, status = ?other, "Events API operation not OK");
                return Err(EventError::upstream(format!(
                    "{} status {}",
                    operation,
                    other.unwrap_or("missing")
                )));
            }
        }

        Ok(value)
    }
}

fn parse_envelope<T: DeserializeOwned>(operation: &str, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| {
        tracing::error!(operation, error = %e, "Unexpected events API envelope");
        EventError::upstream(format!("{} returned an unexpected shape", operation))
    })
}

/// Parse each record of a date listing, dropping the malformed ones
fn normalize_details(date: NaiveDate, records: Vec<Value>) -> Vec<ExternalEventDetails> {
    records
        .into_iter()
        .filter_map(|record| {
            let details = serde_json::from_value::<ExternalEventDetails>(record)
                .map_err(anyhow::Error::from)
                .and_then(|d| d.with_event_date(date));
            match details {
                Ok(d) => Some(d),
                Err(e) => {
                    tracing::warn!(date = %date, error = %e, "Skipping malformed event record");
                    None
                }
            }
        })
        .collect()
}

fn normalize_news(records: Vec<Value>) -> Vec<ExternalNews> {
    records
        .into_iter()
        .filter_map(|record| {
            let news = serde_json::from_value::<ExternalNews>(record)
                .map_err(anyhow::Error::from)
                .and_then(ExternalNews::normalized);
            match news {
                Ok(n) => Some(n),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping malformed news record");
                    None
                }
            }
        })
        .collect()
}

#[async_trait]
impl EventSiteApi for EventSiteClient {
    async fn fetch_root(&self) -> Result<ExternalRoot> {
        let response = self
            .client
            .get(&self.config.events_api_url)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to send events API discovery request");
                EventError::upstream("discovery request failed")
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = %status, "Events API discovery failed");
            return Err(EventError::upstream(format!("discovery returned {}", status)));
        }

        let root: ExternalRoot = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to parse discovery document");
            EventError::upstream("discovery returned malformed JSON")
        })?;

        if !root.is_usable() {
            return Err(EventError::upstream("discovery document without restUrl"));
        }
        Ok(root)
    }

    async fn fetch_event_details(
        &self,
        rest_url: &str,
        date: &str,
    ) -> Result<Vec<ExternalEventDetails>> {
        let day = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
            .map_err(|_| EventError::invalid(format!("Invalid date '{}'", date)))?;

        let value = self
            .post_operation(
                rest_url,
                "events",
                json!({"date": date, "token": self.config.events_api_token}),
                false,
            )
            .await?;
        let envelope: EventsEnvelope = parse_envelope("events", value)?;
        Ok(normalize_details(day, envelope.events))
    }

    async fn fetch_news(&self, rest_url: &str) -> Result<Vec<ExternalNews>> {
        let value = self
            .post_operation(
                rest_url,
                "news",
                json!({"token": self.config.events_api_token}),
                false,
            )
            .await?;
        let envelope: NewsEnvelope = parse_envelope("news", value)?;
        Ok(normalize_news(envelope.news))
    }

    async fn booked_event_ids(&self, rest_url: &str, token: &str) -> Result<Vec<i64>> {
        let value = self
            .post_operation(rest_url, "booked", json!({"token": token}), false)
            .await?;
        let envelope: EventsEnvelope = parse_envelope("booked", value)?;
        Ok(envelope
            .events
            .into_iter()
            .filter_map(|e| serde_json::from_value::<BookedEvent>(e).ok())
            .map(|b| b.event_id)
            .collect())
    }

    async fn book(&self, rest_url: &str, token: &str, event_id: i64) -> Result<()> {
        self.post_operation(
            rest_url,
            "book",
            json!({"token": token, "eventId": event_id}),
            true,
        )
        .await?;
        tracing::info!(event_id, "Booked external event");
        Ok(())
    }

    async fn unbook(&self, rest_url: &str, token: &str, event_id: i64) -> Result<()> {
        self.post_operation(
            rest_url,
            "unbook",
            json!({"token": token, "eventId": event_id}),
            true,
        )
        .await?;
        tracing::info!(event_id, "Cancelled external booking");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer) -> ExternalApiConfig {
        ExternalApiConfig {
            member_api_url: format!("{}/loginm", server.uri()),
            events_api_url: format!("{}/events", server.uri()),
            loginm_seed: "seed".to_string(),
            events_api_token: "service-token".to_string(),
            client_name: "swagapp".to_string(),
            timezone: chrono_tz::Europe::Stockholm,
            timeout: std::time::Duration::from_secs(5),
        }
    }

    fn record(event_id: i64, start_time: &str) -> Value {
        json!({
            "eventId": event_id,
            "startTime": start_time,
            "endTime": "12:00",
            "titel": "Quiz",
            "description": "Pub quiz",
            "speaker": "",
            "location": "Bar",
            "isFree": true,
            "price": 0,
            "isLimited": false,
            "stock": 0,
            "showBooked": false,
            "booked": 3,
            "eventUrl": "https://events.example/1"
        })
    }

    #[tokio::test]
    async fn test_fetch_root() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/events"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "restUrl": format!("{}/rest", server.uri()),
                "dates": ["2025-06-01", "2025-06-02"],
                "version": 2
            })))
            .mount(&server)
            .await;

        let client = EventSiteClient::new(Client::new(), config(&server));
        let root = client.fetch_root().await.unwrap();
        assert_eq!(root.dates.len(), 2);
        assert_eq!(root.extra.get("version"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn test_fetch_root_without_rest_url_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"restUrl": ""})))
            .mount(&server)
            .await;

        let client = EventSiteClient::new(Client::new(), config(&server));
        assert!(matches!(
            client.fetch_root().await,
            Err(EventError::Upstream(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_event_details_skips_malformed_records() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest"))
            .and(body_partial_json(json!({
                "operation": "events",
                "date": "2025-06-01",
                "token": "service-token"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "events": [record(1, "18:30"), record(2, "late"), {"eventId": 3}]
            })))
            .mount(&server)
            .await;

        let client = EventSiteClient::new(Client::new(), config(&server));
        let rest_url = format!("{}/rest", server.uri());
        let details = client
            .fetch_event_details(&rest_url, "2025-06-01")
            .await
            .unwrap();

        assert_eq!(details.len(), 1);
        assert_eq!(details[0].event_id, 1);
        assert_eq!(
            details[0].event_date,
            Some(NaiveDateTime::parse_from_str("2025-06-01 18:30", "%Y-%m-%d %H:%M").unwrap())
        );
    }

    #[tokio::test]
    async fn test_empty_rest_url_falls_back_to_configured_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/events"))
            .and(body_partial_json(json!({"operation": "booked", "token": "member-token"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "events": [{"eventId": 7}, {"eventId": 9, "title": "x"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = EventSiteClient::new(Client::new(), config(&server));
        let ids = client.booked_event_ids("", "member-token").await.unwrap();
        assert_eq!(ids, vec![7, 9]);
    }

    #[tokio::test]
    async fn test_book_requires_ok_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"operation": "book", "eventId": 5})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "OK"})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"operation": "unbook"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "FULL"})))
            .mount(&server)
            .await;

        let client = EventSiteClient::new(Client::new(), config(&server));
        let rest_url = format!("{}/rest", server.uri());
        client.book(&rest_url, "t", 5).await.unwrap();
        let err = client.unbook(&rest_url, "t", 5).await.unwrap_err();
        assert!(matches!(err, EventError::Upstream(_)));
    }

    #[tokio::test]
    async fn test_non_success_status_is_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = EventSiteClient::new(Client::new(), config(&server));
        let err = client.fetch_news("").await.unwrap_err();
        assert!(matches!(err, EventError::Upstream(_)));
    }

    #[tokio::test]
    async fn test_fetch_news_normalizes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"operation": "news"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "news": [
                    {"date": "2025-06-01", "time": "09:15", "title": "Hello", "description": "News"},
                    {"date": "not a date", "description": "Broken"}
                ]
            })))
            .mount(&server)
            .await;

        let client = EventSiteClient::new(Client::new(), config(&server));
        let news = client.fetch_news("").await.unwrap();
        assert_eq!(news.len(), 1);
        assert_eq!(
            news[0].published,
            Some(NaiveDateTime::parse_from_str("2025-06-01 09:15", "%Y-%m-%d %H:%M").unwrap())
        );
    }
}
