//! `Authorization` header handling.

use tracing::debug;

use super::service::AuthService;
use crate::models::auth::Claims;

const BEARER_PREFIX: &str = "Bearer ";

/// Token carried by a `Bearer <token>` header value. `None` for any other
/// scheme or an empty token.
pub fn extract_bearer(header: &str) -> Option<&str> {
    let token = header.strip_prefix(BEARER_PREFIX)?.trim();
    (!token.is_empty()).then_some(token)
}

/// Claims of a valid bearer token, or `None` when the header is missing,
/// malformed, expired or otherwise invalid.
pub fn authenticate(service: &AuthService, header: Option<&str>) -> Option<Claims> {
    let token = extract_bearer(header?)?;
    match service.validate_token(token) {
        Ok(claims) => Some(claims),
        Err(e) => {
            debug!(error = %e, "bearer token rejected");
            None
        }
    }
}
