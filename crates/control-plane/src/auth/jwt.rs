// JWT token service for authentication
// Decision: Use HS256 algorithm for simplicity (symmetric key)
// Decision: Refresh tokens are stateless; the token_type claim keeps them out of the access path

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::config::JwtConfig;

const ACCESS_TOKEN_TYPE: &str = "access";
const REFRESH_TOKEN_TYPE: &str = "refresh";

/// Generate a random identifier string (32 hex characters)
fn generate_random_id() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 16] = rng.gen();
    hex::encode(bytes)
}

/// JWT claims, shared by access and refresh tokens
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (member id)
    pub sub: String,
    /// Token type
    pub token_type: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Unique token ID
    pub jti: String,
}

impl Claims {
    /// Member id carried in `sub`
    pub fn user_id(&self) -> Result<i64> {
        self.sub.parse().context("Invalid user ID in token")
    }
}

/// Token pair returned after successful authentication
#[derive(Debug)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub access_token_expiry: DateTime<Utc>,
}

/// JWT service for token generation and validation
#[derive(Clone)]
pub struct JwtService {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    fn issue(
        &self,
        user_id: i64,
        token_type: &str,
        lifetime: std::time::Duration,
    ) -> Result<(String, DateTime<Utc>)> {
        let now = Utc::now();
        let exp = now + Duration::from_std(lifetime)?;

        let claims = Claims {
            sub: user_id.to_string(),
            token_type: token_type.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            jti: generate_random_id(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .with_context(|| format!("Failed to encode {} token", token_type))?;
        Ok((token, exp))
    }

    fn validate(&self, token: &str, token_type: &str) -> Result<Claims> {
        let mut validation = Validation::default();
        validation.validate_exp = true;

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation)
            .with_context(|| format!("Invalid {} token", token_type))?;

        if token_data.claims.token_type != token_type {
            anyhow::bail!("Invalid token type");
        }

        Ok(token_data.claims)
    }

    /// Generate access token for a member
    pub fn generate_access_token(&self, user_id: i64) -> Result<(String, DateTime<Utc>)> {
        self.issue(user_id, ACCESS_TOKEN_TYPE, self.config.access_token_lifetime)
    }

    /// Generate refresh token for a member
    pub fn generate_refresh_token(&self, user_id: i64) -> Result<String> {
        self.issue(user_id, REFRESH_TOKEN_TYPE, self.config.refresh_token_lifetime)
            .map(|(token, _)| token)
    }

    /// Generate both access and refresh tokens
    pub fn generate_token_pair(&self, user_id: i64) -> Result<TokenPair> {
        let (access_token, access_token_expiry) = self.generate_access_token(user_id)?;
        let refresh_token = self.generate_refresh_token(user_id)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            access_token_expiry,
        })
    }

    /// Validate and decode an access token
    pub fn validate_access_token(&self, token: &str) -> Result<Claims> {
        self.validate(token, ACCESS_TOKEN_TYPE)
    }

    /// Validate and decode a refresh token
    pub fn validate_refresh_token(&self, token: &str) -> Result<Claims> {
        self.validate(token, REFRESH_TOKEN_TYPE)
    }
}
