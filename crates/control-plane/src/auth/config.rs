// Authentication configuration loaded from environment variables.
// Decision: AUTH_ prefix for all auth config
// Decision: Without AUTH_JWT_SECRET a random per-process secret is used (tokens die with the process)

use std::time::Duration;

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret key for signing JWTs
    pub secret: String,
    /// Access token lifetime
    pub access_token_lifetime: Duration,
    /// Refresh token lifetime
    pub refresh_token_lifetime: Duration,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            access_token_lifetime: Duration::from_secs(15 * 60), // 15 minutes
            refresh_token_lifetime: Duration::from_secs(24 * 60 * 60), // 1 day
        }
    }
}

/// Complete authentication configuration
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    pub jwt: JwtConfig,
}

impl AuthConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = JwtConfig::default();

        let secret = lookup("AUTH_JWT_SECRET")
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| {
                tracing::warn!("AUTH_JWT_SECRET not set, using a random per-process secret");
                use rand::Rng;
                let bytes: [u8; 32] = rand::thread_rng().gen();
                hex::encode(bytes)
            });

        let seconds = |key: &str, default: Duration| {
            lookup(key)
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(default)
        };

        Self {
            jwt: JwtConfig {
                secret,
                access_token_lifetime: seconds(
                    "AUTH_JWT_ACCESS_TOKEN_LIFETIME",
                    defaults.access_token_lifetime,
                ),
                refresh_token_lifetime: seconds(
                    "AUTH_JWT_REFRESH_TOKEN_LIFETIME",
                    defaults.refresh_token_lifetime,
                ),
            },
        }
    }
}
