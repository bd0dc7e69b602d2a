// Third-party API configuration loaded from environment variables.
// Decision: Missing URLs or seeds are a startup error, not a runtime surprise

use std::time::Duration;

use anyhow::{Context, Result};
use chrono_tz::Tz;

/// Default client name sent with every membership request
pub const DEFAULT_CLIENT_NAME: &str = "swagapp";
/// Timezone of the wall-clock times used by the event site
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Europe::Stockholm;

#[derive(Clone)]
pub struct ExternalApiConfig {
    /// Membership login endpoint
    pub member_api_url: String,
    /// Events API discovery endpoint; also the fallback REST url
    pub events_api_url: String,
    /// Seed appended to the membership login hash
    pub loginm_seed: String,
    /// Service token for event listings and news
    pub events_api_token: String,
    pub client_name: String,
    pub timezone: Tz,
    pub timeout: Duration,
}

// Seeds and tokens never reach the logs
impl std::fmt::Debug for ExternalApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternalApiConfig")
            .field("member_api_url", &self.member_api_url)
            .field("events_api_url", &self.events_api_url)
            .field("client_name", &self.client_name)
            .field("timezone", &self.timezone)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ExternalApiConfig {
    /// Load configuration from environment variables
    ///
    /// Required: `URL_MEMBER_API`, `URL_EVENTS_API`, `LOGINM_SEED`, `EVENT_API_TOKEN`.
    /// Optional: `EXTERNAL_CLIENT_NAME`, `EVENT_TIMEZONE`, `EXTERNAL_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| -> Result<String> {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("{} environment variable not set", key))
        };

        let timezone = match lookup("EVENT_TIMEZONE") {
            Some(name) if !name.trim().is_empty() => name
                .trim()
                .parse::<Tz>()
                .map_err(|e| anyhow::anyhow!("Invalid EVENT_TIMEZONE '{}': {}", name, e))?,
            _ => DEFAULT_TIMEZONE,
        };

        let timeout = lookup("EXTERNAL_TIMEOUT_SECS")
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(30));

        Ok(Self {
            member_api_url: required("URL_MEMBER_API")?,
            events_api_url: required("URL_EVENTS_API")?,
            loginm_seed: required("LOGINM_SEED")?,
            events_api_token: required("EVENT_API_TOKEN")?,
            client_name: lookup("EXTERNAL_CLIENT_NAME")
                .unwrap_or_else(|| DEFAULT_CLIENT_NAME.to_string()),
            timezone,
            timeout,
        })
    }
}
