//! Auth core configuration.
//!
//! [`AuthConfig::from_env`] reads the raw settings; zero or absent values are
//! filled in by [`AuthConfig::with_defaults`].
//!
//! | Variable                          | Default                     |
//! |-----------------------------------|-----------------------------|
//! | `JWT_SECRET`                      | 32 random bytes (warns)     |
//! | `SESSION_KEY`                     | 32 random bytes (warns)     |
//! | `TOKEN_EXPIRATION_HOURS`          | 24                          |
//! | `REFRESH_TOKEN_EXPIRATION_HOURS`  | 168                         |
//! | `BCRYPT_COST`                     | 12                          |
//! | `ENABLE_RATE_LIMIT`               | off (only `true` enables)   |
//! | `MAX_LOGIN_ATTEMPTS`              | 5                           |
//! | `RATE_LIMIT_WINDOW_MINUTES`       | 15                          |
//! | `RATE_LIMIT_BLOCK_MINUTES`        | 15                          |
//!
//! Secrets are hex-encoded.

use std::num::ParseIntError;

use chrono::Duration;
use rand::{Rng, rng};
use thiserror::Error;
use tracing::warn;

use crate::auth::jwt::{
    DEFAULT_ACCESS_TOKEN_LIFETIME, DEFAULT_ISSUER, DEFAULT_REFRESH_TOKEN_LIFETIME,
};
use crate::auth::password::DEFAULT_BCRYPT_COST;
use crate::auth::rate_limit::{
    DEFAULT_BLOCK, DEFAULT_MAX_ATTEMPTS, DEFAULT_REAP_PERIOD, DEFAULT_WINDOW,
};

pub const ENV_JWT_SECRET: &str = "JWT_SECRET";
pub const ENV_SESSION_KEY: &str = "SESSION_KEY";
pub const ENV_TOKEN_EXPIRATION_HOURS: &str = "TOKEN_EXPIRATION_HOURS";
pub const ENV_REFRESH_TOKEN_EXPIRATION_HOURS: &str = "REFRESH_TOKEN_EXPIRATION_HOURS";
pub const ENV_BCRYPT_COST: &str = "BCRYPT_COST";
pub const ENV_ENABLE_RATE_LIMIT: &str = "ENABLE_RATE_LIMIT";
pub const ENV_MAX_LOGIN_ATTEMPTS: &str = "MAX_LOGIN_ATTEMPTS";
pub const ENV_RATE_LIMIT_WINDOW_MINUTES: &str = "RATE_LIMIT_WINDOW_MINUTES";
pub const ENV_RATE_LIMIT_BLOCK_MINUTES: &str = "RATE_LIMIT_BLOCK_MINUTES";

/// Size of auto-generated secrets.
pub const GENERATED_SECRET_BYTES: usize = 32;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} is not valid hex: {source}")]
    InvalidHex {
        key: &'static str,
        #[source]
        source: hex::FromHexError,
    },

    #[error("{key} is not a non-negative integer ({value:?}): {source}")]
    InvalidNumber {
        key: &'static str,
        value: String,
        #[source]
        source: ParseIntError,
    },
}

/// Settings for [`crate::AuthService`].
#[derive(Clone)]
pub struct AuthConfig {
    /// HMAC key for token signatures.
    pub jwt_secret: Vec<u8>,
    /// Reserved for cookie sessions; unused by the token path.
    pub session_key: Vec<u8>,
    pub access_token_lifetime: Duration,
    pub refresh_token_lifetime: Duration,
    pub bcrypt_cost: u32,
    pub enable_rate_limit: bool,
    pub max_login_attempts: u32,
    pub rate_limit_window: Duration,
    pub rate_limit_block: Duration,
    /// `iss` claim written into tokens.
    pub issuer: String,
    /// How often the rate limiter drops stale records.
    pub reap_period: std::time::Duration,
}

impl Default for AuthConfig {
    /// The zero configuration: nothing set, nothing defaulted yet.
    fn default() -> Self {
        Self {
            jwt_secret: Vec::new(),
            session_key: Vec::new(),
            access_token_lifetime: Duration::zero(),
            refresh_token_lifetime: Duration::zero(),
            bcrypt_cost: 0,
            enable_rate_limit: false,
            max_login_attempts: 0,
            rate_limit_window: Duration::zero(),
            rate_limit_block: Duration::zero(),
            issuer: String::new(),
            reap_period: std::time::Duration::ZERO,
        }
    }
}

impl AuthConfig {
    /// Reads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`. Unset or empty keys leave the
    /// field at its zero value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(value) = get(ENV_JWT_SECRET) {
            config.jwt_secret = decode_hex(ENV_JWT_SECRET, &value)?;
        }
        if let Some(value) = get(ENV_SESSION_KEY) {
            config.session_key = decode_hex(ENV_SESSION_KEY, &value)?;
        }
        if let Some(value) = get(ENV_TOKEN_EXPIRATION_HOURS) {
            config.access_token_lifetime =
                Duration::hours(parse_number(ENV_TOKEN_EXPIRATION_HOURS, &value)?.into());
        }
        if let Some(value) = get(ENV_REFRESH_TOKEN_EXPIRATION_HOURS) {
            config.refresh_token_lifetime = Duration::hours(
                parse_number(ENV_REFRESH_TOKEN_EXPIRATION_HOURS, &value)?.into(),
            );
        }
        if let Some(value) = get(ENV_BCRYPT_COST) {
            config.bcrypt_cost = parse_number(ENV_BCRYPT_COST, &value)?;
        }
        config.enable_rate_limit = get(ENV_ENABLE_RATE_LIMIT).as_deref() == Some("true");
        if let Some(value) = get(ENV_MAX_LOGIN_ATTEMPTS) {
            config.max_login_attempts = parse_number(ENV_MAX_LOGIN_ATTEMPTS, &value)?;
        }
        if let Some(value) = get(ENV_RATE_LIMIT_WINDOW_MINUTES) {
            config.rate_limit_window =
                Duration::minutes(parse_number(ENV_RATE_LIMIT_WINDOW_MINUTES, &value)?.into());
        }
        if let Some(value) = get(ENV_RATE_LIMIT_BLOCK_MINUTES) {
            config.rate_limit_block =
                Duration::minutes(parse_number(ENV_RATE_LIMIT_BLOCK_MINUTES, &value)?.into());
        }

        Ok(config)
    }

    /// Fill every zero field with its default and generate missing secrets.
    ///
    /// Generated secrets change on every start, invalidating issued tokens;
    /// acceptable only outside production.
    pub fn with_defaults(mut self) -> Self {
        if self.access_token_lifetime.is_zero() {
            self.access_token_lifetime = DEFAULT_ACCESS_TOKEN_LIFETIME;
        }
        if self.refresh_token_lifetime.is_zero() {
            self.refresh_token_lifetime = DEFAULT_REFRESH_TOKEN_LIFETIME;
        }
        if self.bcrypt_cost == 0 {
            self.bcrypt_cost = DEFAULT_BCRYPT_COST;
        }
        if self.max_login_attempts == 0 {
            self.max_login_attempts = DEFAULT_MAX_ATTEMPTS;
        }
        if self.rate_limit_window.is_zero() {
            self.rate_limit_window = DEFAULT_WINDOW;
        }
        if self.rate_limit_block.is_zero() {
            self.rate_limit_block = DEFAULT_BLOCK;
        }
        if self.issuer.is_empty() {
            self.issuer = DEFAULT_ISSUER.to_string();
        }
        if self.reap_period.is_zero() {
            self.reap_period = DEFAULT_REAP_PERIOD;
        }
        if self.jwt_secret.is_empty() {
            self.jwt_secret = generate_secret(GENERATED_SECRET_BYTES);
            warn!("JWT secret was auto-generated. Use environment variables in production");
        }
        if self.session_key.is_empty() {
            self.session_key = generate_secret(GENERATED_SECRET_BYTES);
            warn!("Session key was auto-generated. Use environment variables in production");
        }
        self
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &Redacted(self.jwt_secret.len()))
            .field("session_key", &Redacted(self.session_key.len()))
            .field("access_token_lifetime", &self.access_token_lifetime)
            .field("refresh_token_lifetime", &self.refresh_token_lifetime)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("enable_rate_limit", &self.enable_rate_limit)
            .field("max_login_attempts", &self.max_login_attempts)
            .field("rate_limit_window", &self.rate_limit_window)
            .field("rate_limit_block", &self.rate_limit_block)
            .field("issuer", &self.issuer)
            .field("reap_period", &self.reap_period)
            .finish()
    }
}

struct Redacted(usize);

impl std::fmt::Debug for Redacted {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<redacted {} bytes>", self.0)
    }
}

/// Generate `len` random bytes suitable for a signing secret.
pub fn generate_secret(len: usize) -> Vec<u8> {
    let mut secret = vec![0u8; len];
    rng().fill(secret.as_mut_slice());
    secret
}

fn decode_hex(key: &'static str, value: &str) -> Result<Vec<u8>, ConfigError> {
    hex::decode(value.trim()).map_err(|source| ConfigError::InvalidHex { key, source })
}

fn parse_number(key: &'static str, value: &str) -> Result<u32, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|source| ConfigError::InvalidNumber {
            key,
            value: value.to_string(),
            source,
        })
}
