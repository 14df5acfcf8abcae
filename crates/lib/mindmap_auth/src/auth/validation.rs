//! Credential validation.
//!
//! Pure checks on submitted emails and passwords. Case is preserved here;
//! lower-casing belongs to the service at registration/login time.

use std::sync::LazyLock;

use regex::Regex;

use super::{AuthError, AuthResult};

/// Minimum password length (bytes).
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum password length (bytes). Bounds bcrypt work per request.
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Characters that satisfy the symbol requirement.
pub const PASSWORD_SYMBOLS: &str = r#"!@#$%^&*()_+-=[]{};':"\|,.<>/?~`"#;

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .expect("EMAIL_REGEX should be a valid regex pattern")
});

/// Validate email format.
pub fn validate_email(email: &str) -> AuthResult<()> {
    let email = email.trim();
    if email.is_empty() {
        return Err(AuthError::EmailRequired);
    }
    if !EMAIL_REGEX.is_match(email) {
        return Err(AuthError::InvalidEmail);
    }
    Ok(())
}

/// Validate password strength.
///
/// Requires a length within [`MIN_PASSWORD_LENGTH`]..=[`MAX_PASSWORD_LENGTH`]
/// and at least one ASCII digit, lowercase letter, uppercase letter and
/// symbol from [`PASSWORD_SYMBOLS`].
///
/// A missing character class is reported as [`AuthError::WeakPassword`]
/// without saying which class, so the policy cannot be probed rule by rule.
pub fn validate_password(password: &str) -> AuthResult<()> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::PasswordTooShort {
            min: MIN_PASSWORD_LENGTH,
        });
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(AuthError::PasswordTooLong {
            max: MAX_PASSWORD_LENGTH,
        });
    }

    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_symbol = password.chars().any(|c| PASSWORD_SYMBOLS.contains(c));

    if !(has_digit && has_lower && has_upper && has_symbol) {
        return Err(AuthError::WeakPassword);
    }
    Ok(())
}

/// Validate a display name: anything but blank.
pub fn validate_name(name: &str) -> AuthResult<()> {
    if name.trim().is_empty() {
        return Err(AuthError::NameRequired);
    }
    Ok(())
}

/// Email normalization applied before any lookup or persistence.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
