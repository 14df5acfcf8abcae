//! JWT token generation and verification.
//!
//! Tokens are HS256-signed, three-part compact JWTs carrying [`Claims`].
//! Access and refresh tokens share the same payload and differ only in
//! lifetime.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::debug;

use super::{AuthError, AuthResult};
use crate::clock::Clock;
use crate::models::auth::{Claims, TokenPair, User};

/// Default access token lifetime: 24 hours.
pub const DEFAULT_ACCESS_TOKEN_LIFETIME: Duration = Duration::hours(24);

/// Default refresh token lifetime: 7 days.
pub const DEFAULT_REFRESH_TOKEN_LIFETIME: Duration = Duration::days(7);

/// Default `iss` claim.
pub const DEFAULT_ISSUER: &str = "mymindmap-api";

/// The only accepted signing algorithm.
const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

/// Issues and parses signed, time-bounded bearer tokens.
///
/// The secret is fixed at construction; the codec is shared without locking.
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    clock: Arc<dyn Clock>,
}

impl TokenCodec {
    pub fn new(secret: &[u8], issuer: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        // Time checks run against the injected clock in `parse`.
        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            issuer: issuer.into(),
            clock,
        }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Generate a signed token for `user` valid for `lifetime` from now.
    pub fn issue(&self, user: &User, lifetime: Duration) -> AuthResult<String> {
        self.issue_at(user, self.clock.now(), lifetime)
    }

    /// Generate an access/refresh pair for `user`.
    pub fn issue_pair(
        &self,
        user: &User,
        access_lifetime: Duration,
        refresh_lifetime: Duration,
    ) -> AuthResult<TokenPair> {
        let now = self.clock.now();
        let access_token = self.issue_at(user, now, access_lifetime)?;
        let refresh_token = self.issue_at(user, now, refresh_lifetime)?;
        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_at: expiry(now, access_lifetime)?.timestamp(),
        })
    }

    fn issue_at(&self, user: &User, now: DateTime<Utc>, lifetime: Duration) -> AuthResult<String> {
        let claims = Claims {
            user_id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            exp: expiry(now, lifetime)?.timestamp(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            sub: user.id.to_string(),
            iss: self.issuer.clone(),
        };
        encode(&Header::new(SIGNING_ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("jwt encode: {e}")))
    }

    /// Verify a token and return its claims.
    ///
    /// A signature-valid token past its expiry is [`AuthError::TokenExpired`];
    /// every other failure is [`AuthError::InvalidToken`].
    pub fn parse(&self, token: &str) -> AuthResult<Claims> {
        if token.trim().is_empty() {
            return Err(AuthError::InvalidToken);
        }

        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                debug!(error = %e, "rejected token");
                AuthError::InvalidToken
            })?
            .claims;

        let now = self.clock.now().timestamp();
        if now < claims.nbf {
            debug!(nbf = claims.nbf, now, "token not yet valid");
            return Err(AuthError::InvalidToken);
        }
        if now >= claims.exp {
            return Err(AuthError::TokenExpired);
        }
        Ok(claims)
    }
}

/// `now + lifetime`, or an error when the sum leaves chrono's range.
fn expiry(now: DateTime<Utc>, lifetime: Duration) -> AuthResult<DateTime<Utc>> {
    now.checked_add_signed(lifetime)
        .ok_or_else(|| AuthError::Internal(format!("token lifetime out of range: {lifetime}")))
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &SIGNING_ALGORITHM)
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}
