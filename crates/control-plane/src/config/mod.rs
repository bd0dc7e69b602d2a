// Configuration loading
//
// One immutable AppConfig is built in main from the environment and handed
// to the components that need it.
// Decision: No DATABASE_URL means in-memory dev mode, not a startup error

pub mod jobs;

pub use jobs::{JobConfig, JobsConfig};

use anyhow::Result;
use swag_external::ExternalApiConfig;

use crate::auth::AuthConfig;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub bind_addr: String,
    /// Prefix for every API route, e.g. "/api" (empty: none)
    pub api_prefix: String,
    /// Only needed when the client is served from another origin
    pub cors_allowed_origins: Vec<String>,
    pub auth: AuthConfig,
    pub external: ExternalApiConfig,
    pub jobs: JobsConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            database_url: non_empty("DATABASE_URL"),
            bind_addr: non_empty("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            api_prefix: non_empty("API_PREFIX")
                .map(|p| p.trim_end_matches('/').to_string())
                .unwrap_or_default(),
            cors_allowed_origins: non_empty("CORS_ALLOWED_ORIGINS")
                .map(|s| {
                    s.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
            auth: AuthConfig::from_lookup(&lookup),
            external: ExternalApiConfig::from_lookup(&lookup)?,
            jobs: JobsConfig::from_lookup(&lookup),
        })
    }
}
