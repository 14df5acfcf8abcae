//! The auth orchestrator.
//!
//! [`AuthService`] composes the validator, hasher, token codec, policy engine
//! and rate limiter over a caller-provided [`UserStore`]. Construct one at
//! process start and share it by reference or `Arc`.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::jwt::TokenCodec;
use super::password::{hash_password, verify_password};
use super::policy::PolicyEngine;
use super::rate_limit::RateLimiter;
use super::store::{StoreError, UserStore};
use super::validation::{normalize_email, validate_email, validate_name, validate_password};
use super::{AuthError, AuthResult};
use crate::clock::{Clock, SystemClock};
use crate::config::AuthConfig;
use crate::models::auth::{Claims, NewUser, Role, TokenPair, User};

pub struct AuthService {
    store: Arc<dyn UserStore>,
    codec: TokenCodec,
    policy: PolicyEngine,
    rate_limiter: Option<Arc<RateLimiter>>,
    config: AuthConfig,
    shutdown: CancellationToken,
    reaper: Option<JoinHandle<()>>,
}

impl AuthService {
    /// Build the service. Zero-valued config fields take their defaults.
    ///
    /// With rate limiting enabled and a Tokio runtime available, the rate
    /// limiter's reaper is started and runs until [`shutdown`](Self::shutdown)
    /// or drop.
    pub fn new(store: Arc<dyn UserStore>, config: AuthConfig, clock: Arc<dyn Clock>) -> Self {
        let config = config.with_defaults();
        let codec = TokenCodec::new(&config.jwt_secret, config.issuer.clone(), clock.clone());
        let shutdown = CancellationToken::new();

        let rate_limiter = config.enable_rate_limit.then(|| {
            Arc::new(RateLimiter::new(
                config.max_login_attempts,
                config.rate_limit_window,
                config.rate_limit_block,
                clock,
            ))
        });

        let reaper = match &rate_limiter {
            Some(limiter) if tokio::runtime::Handle::try_current().is_ok() => {
                Some(limiter.spawn_reaper(config.reap_period, shutdown.child_token()))
            }
            Some(_) => {
                debug!("no tokio runtime, rate limiter reaper not started");
                None
            }
            None => None,
        };

        Self {
            store,
            codec,
            policy: PolicyEngine::with_default_rules(),
            rate_limiter,
            config,
            shutdown,
            reaper,
        }
    }

    /// [`new`](Self::new) on the system clock.
    pub fn with_system_clock(store: Arc<dyn UserStore>, config: AuthConfig) -> Self {
        Self::new(store, config, Arc::new(SystemClock))
    }

    /// Effective configuration, defaults applied.
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn policy(&self) -> &PolicyEngine {
        &self.policy
    }

    /// The login throttle, if rate limiting is enabled.
    pub fn rate_limiter(&self) -> Option<&RateLimiter> {
        self.rate_limiter.as_deref()
    }

    /// Create an account with the default `user` role. The returned user
    /// carries no password digest.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> AuthResult<User> {
        validate_name(name)?;
        validate_email(email)?;
        validate_password(password)?;

        let email = normalize_email(email);
        let existing = self
            .store
            .find_by_email(&email)
            .await
            .map_err(|e| self.store_failure("failed to look up user", &email, e))?;
        if existing.is_some() {
            return Err(AuthError::UserExists);
        }

        let password_hash = hash_password(password, self.config.bcrypt_cost).map_err(|e| {
            error!(email = %email, error = %e, "failed to hash password");
            e
        })?;
        let user = self
            .store
            .create(NewUser {
                name: name.trim().to_string(),
                email: email.clone(),
                password_hash,
                role: Role::User,
            })
            .await
            .map_err(|e| match e {
                StoreError::Duplicate(_) => AuthError::UserExists,
                other => self.store_failure("failed to create user", &email, other),
            })?;

        self.policy.assign_role(&user.email, Role::User.as_str())?;
        info!(user_id = user.id, email = %user.email, "user registered");
        Ok(user.without_password())
    }

    /// Check credentials and issue a token pair.
    ///
    /// Unknown emails and wrong passwords both count as failed attempts and
    /// surface as [`AuthError::InvalidCredentials`].
    pub async fn login(&self, email: &str, password: &str) -> AuthResult<TokenPair> {
        validate_email(email)?;
        if password.is_empty() {
            return Err(AuthError::PasswordRequired);
        }
        let email = normalize_email(email);

        if let Some(limiter) = &self.rate_limiter
            && !limiter.is_allowed(&email)
        {
            warn!(email = %email, "login rejected, too many attempts");
            return Err(AuthError::TooManyAttempts);
        }

        let user = self
            .store
            .find_by_email(&email)
            .await
            .map_err(|e| self.store_failure("failed to look up user", &email, e))?;
        let Some(user) = user else {
            self.record_failed_attempt(&email);
            warn!(email = %email, "login failed, unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password(password, &user.password_hash) {
            self.record_failed_attempt(&email);
            warn!(email = %email, "login failed, wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        self.policy.assign_role(&user.email, user.role.as_str())?;
        let pair = self.issue_pair(&user)?;
        if let Some(limiter) = &self.rate_limiter {
            limiter.reset(&email);
        }

        info!(user_id = user.id, email = %user.email, "user logged in");
        Ok(pair)
    }

    /// Verify a token and return its claims.
    pub fn validate_token(&self, token: &str) -> AuthResult<Claims> {
        self.codec.parse(token)
    }

    /// Exchange a valid token for a fresh pair built from the current stored
    /// user. A user that no longer exists makes the token invalid.
    pub async fn refresh(&self, refresh_token: &str) -> AuthResult<TokenPair> {
        let claims = self.codec.parse(refresh_token)?;
        let user = self
            .store
            .find_by_id(claims.user_id)
            .await
            .map_err(|e| self.store_failure("failed to look up user", &claims.email, e))?
            .ok_or_else(|| {
                warn!(user_id = claims.user_id, "refresh for missing user");
                AuthError::InvalidToken
            })?;

        let pair = self.issue_pair(&user)?;
        debug!(user_id = user.id, "token refreshed");
        Ok(pair)
    }

    /// Whether `role` may perform `action` on `object`.
    pub fn check_permission(&self, role: &str, object: &str, action: &str) -> bool {
        self.policy.enforce(role, object, action)
    }

    /// Whether any role held by `email` may perform `action` on `object`.
    pub fn check_permission_for_user(&self, email: &str, object: &str, action: &str) -> bool {
        self.policy
            .enforce_for_principal(&normalize_email(email), object, action)
    }

    /// Authorize the bearer of `claims` using the role the token carries.
    pub fn authorize(&self, claims: &Claims, object: &str, action: &str) -> bool {
        self.policy.enforce(claims.role.as_str(), object, action)
    }

    /// First role assigned to `email`, or `user` when none is.
    pub fn get_role(&self, email: &str) -> Role {
        self.policy
            .roles_of(&normalize_email(email))
            .first()
            .copied()
            .unwrap_or_default()
    }

    /// Grant `role` to `email`.
    pub fn add_role(&self, email: &str, role: &str) -> AuthResult<()> {
        let email = normalize_email(email);
        if self.policy.assign_role(&email, role)? {
            info!(email = %email, role, "role granted");
        }
        Ok(())
    }

    /// Revoke `role` from `email`. Returns `false` if it was not held.
    pub fn remove_role(&self, email: &str, role: &str) -> bool {
        let email = normalize_email(email);
        let removed = self.policy.unassign_role(&email, role);
        if removed {
            info!(email = %email, role, "role revoked");
        }
        removed
    }

    /// Stop background work. Idempotent.
    pub fn shutdown(&self) {
        if !self.shutdown.is_cancelled() {
            debug!("auth service shutting down");
            self.shutdown.cancel();
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    fn issue_pair(&self, user: &User) -> AuthResult<TokenPair> {
        self.codec.issue_pair(
            user,
            self.config.access_token_lifetime,
            self.config.refresh_token_lifetime,
        )
    }

    fn record_failed_attempt(&self, email: &str) {
        if let Some(limiter) = &self.rate_limiter {
            limiter.record_attempt(email);
        }
    }

    fn store_failure(&self, context: &'static str, email: &str, source: StoreError) -> AuthError {
        error!(email, error = %source, "{context}");
        AuthError::store(context, source)
    }
}

impl Drop for AuthService {
    fn drop(&mut self) {
        self.shutdown.cancel();
        if let Some(reaper) = self.reaper.take() {
            reaper.abort();
        }
    }
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("codec", &self.codec)
            .field("rate_limiter", &self.rate_limiter)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
