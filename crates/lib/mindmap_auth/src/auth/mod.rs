//! Authentication and authorization logic.
//!
//! Provides credential validation, password hashing, JWT management, role-based
//! policy enforcement and login throttling, composed by [`service::AuthService`].

pub mod bearer;
pub mod jwt;
pub mod password;
pub mod policy;
pub mod rate_limit;
pub mod service;
pub mod store;
pub mod validation;

use thiserror::Error;

use self::store::StoreError;

/// Convenience alias for auth results.
pub type AuthResult<T> = Result<T, AuthError>;

/// Authentication errors.
///
/// Every variant is a stable kind callers can match on. Unknown users and wrong
/// passwords both surface as [`AuthError::InvalidCredentials`].
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("email is required")]
    EmailRequired,

    #[error("invalid email format")]
    InvalidEmail,

    #[error("password is required")]
    PasswordRequired,

    #[error("password must be at least {min} characters long")]
    PasswordTooShort { min: usize },

    #[error("password must not exceed {max} characters")]
    PasswordTooLong { max: usize },

    #[error("password does not meet security requirements")]
    WeakPassword,

    #[error("name is required")]
    NameRequired,

    #[error("user with this email already exists")]
    UserExists,

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("too many login attempts, please try again later")]
    TooManyAttempts,

    #[error("invalid token")]
    InvalidToken,

    #[error("token has expired")]
    TokenExpired,

    #[error("invalid role: {0}")]
    InvalidRole(String),

    #[error("{context}: {source}")]
    Store {
        context: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Wrap a user store failure with what the core was doing at the time.
    pub fn store(context: &'static str, source: StoreError) -> Self {
        AuthError::Store { context, source }
    }
}
