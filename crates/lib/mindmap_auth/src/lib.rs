//! # mindmap_auth
//!
//! Authentication and authorization core for MyMindmap.
//!
//! Turns submitted credentials into verified identities, issues and validates
//! bearer tokens, enforces role-based access policy and throttles repeated
//! failed logins. Persistence is delegated to a caller-provided
//! [`auth::store::UserStore`].

pub mod auth;
pub mod clock;
pub mod config;
pub mod models;

pub use auth::service::AuthService;
pub use auth::{AuthError, AuthResult};
pub use config::AuthConfig;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
