// Swag external integrations
//
// HTTP clients for the membership login service and the events API.
// Both implement the traits from swag-core so services never see reqwest.

pub mod config;
pub mod events;
pub mod hash;
pub mod membership;

pub use config::ExternalApiConfig;
pub use events::EventSiteClient;
pub use membership::MembershipClient;

use anyhow::{Context, Result};

/// Shared HTTP client with the configured timeout
pub fn http_client(config: &ExternalApiConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.timeout)
        .user_agent(concat!("swag/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")
}
