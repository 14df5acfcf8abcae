//! Integration test: register, log in, refresh and authorize through
//! `AuthService` over the in-memory user store.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Duration;
use mindmap_auth::auth::store::{MemoryUserStore, StoreError, UserStore};
use mindmap_auth::clock::{Clock, ManualClock};
use mindmap_auth::models::auth::{NewUser, Role, User};
use mindmap_auth::{AuthConfig, AuthError, AuthService};
use tracing_subscriber::EnvFilter;

const NAME: &str = "Jane";
const EMAIL: &str = "jane@x.com";
const PASSWORD: &str = "Secur3!Pass";

/// Wraps a store and counts lookups.
struct CountingStore {
    inner: MemoryUserStore,
    lookups: AtomicUsize,
}

impl CountingStore {
    fn new() -> Self {
        Self {
            inner: MemoryUserStore::new(),
            lookups: AtomicUsize::new(0),
        }
    }

    fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UserStore for CountingStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.find_by_email(email).await
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.find_by_id(id).await
    }

    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        self.inner.create(user).await
    }
}

fn test_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: b"integration-test-secret".to_vec(),
        session_key: b"integration-test-session".to_vec(),
        bcrypt_cost: 4,
        ..AuthConfig::default()
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn setup() -> (Arc<MemoryUserStore>, Arc<ManualClock>, AuthService) {
    init_tracing();
    let store = Arc::new(MemoryUserStore::new());
    let clock = Arc::new(ManualClock::starting_now());
    let service = AuthService::new(store.clone(), test_config(), clock.clone());
    (store, clock, service)
}

#[tokio::test]
async fn register_returns_user_without_password() {
    let (_, _, service) = setup();
    let user = service
        .register(NAME, EMAIL, PASSWORD)
        .await
        .expect("register");

    assert!(user.id > 0);
    assert_eq!(user.name, NAME);
    assert_eq!(user.email, EMAIL);
    assert!(user.password_hash.is_empty());
    assert_eq!(user.role, Role::User);
}

#[tokio::test]
async fn register_same_email_twice_is_rejected() {
    let (store, _, service) = setup();
    service
        .register(NAME, EMAIL, PASSWORD)
        .await
        .expect("first register");

    let second = service.register("Other Jane", EMAIL, PASSWORD).await;
    assert!(matches!(second, Err(AuthError::UserExists)));
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn login_returns_pair_that_validates() {
    let (_, clock, service) = setup();
    let user = service
        .register(NAME, EMAIL, PASSWORD)
        .await
        .expect("register");

    let pair = service.login(EMAIL, PASSWORD).await.expect("login");
    assert!(pair.expires_at > clock.now().timestamp());

    let claims = service
        .validate_token(&pair.access_token)
        .expect("access token validates");
    assert_eq!(claims.user_id, user.id);
    assert_eq!(claims.name, NAME);
    assert_eq!(claims.email, EMAIL);
    assert_eq!(claims.role, Role::User);
    assert_eq!(claims.sub, user.id.to_string());
    assert_eq!(claims.exp, pair.expires_at);
}

#[tokio::test]
async fn fourth_attempt_is_throttled_without_store_lookup() {
    init_tracing();
    let store = Arc::new(CountingStore::new());
    let service = AuthService::new(
        store.clone(),
        AuthConfig {
            enable_rate_limit: true,
            max_login_attempts: 3,
            ..test_config()
        },
        Arc::new(ManualClock::starting_now()),
    );
    service
        .register(NAME, EMAIL, PASSWORD)
        .await
        .expect("register");
    let before = store.lookups();

    for attempt in 1..=3 {
        let result = service.login(EMAIL, "Wr0ng!Pass").await;
        assert!(
            matches!(result, Err(AuthError::InvalidCredentials)),
            "attempt {attempt}"
        );
    }
    assert_eq!(store.lookups() - before, 3);

    let fourth = service.login(EMAIL, PASSWORD).await;
    assert!(matches!(fourth, Err(AuthError::TooManyAttempts)));
    assert_eq!(store.lookups() - before, 3);
}

#[tokio::test]
async fn unknown_email_counts_toward_throttle() {
    let service = AuthService::new(
        Arc::new(MemoryUserStore::new()),
        AuthConfig {
            enable_rate_limit: true,
            max_login_attempts: 2,
            ..test_config()
        },
        Arc::new(ManualClock::starting_now()),
    );
    for _ in 0..2 {
        assert!(matches!(
            service.login("ghost@x.com", PASSWORD).await,
            Err(AuthError::InvalidCredentials)
        ));
    }
    assert!(matches!(
        service.login("ghost@x.com", PASSWORD).await,
        Err(AuthError::TooManyAttempts)
    ));
}

#[tokio::test]
async fn seeded_policy_permissions() {
    let (_, _, service) = setup();
    assert!(service.check_permission("admin", "post", "delete"));
    assert!(!service.check_permission("user", "post", "delete"));
    assert!(service.check_permission("author", "post", "write"));
    assert!(!service.check_permission("author", "user", "manage"));
}

#[tokio::test]
async fn refresh_reflects_role_change() {
    let (store, _, service) = setup();
    let user = service
        .register(NAME, EMAIL, PASSWORD)
        .await
        .expect("register");
    let pair = service.login(EMAIL, PASSWORD).await.expect("login");

    assert!(store.set_role(user.id, Role::Author).await);
    let fresh = service
        .refresh(&pair.refresh_token)
        .await
        .expect("refresh");

    let claims = service
        .validate_token(&fresh.access_token)
        .expect("fresh token validates");
    assert_eq!(claims.role, Role::Author);
}

#[tokio::test]
async fn refresh_for_deleted_user_is_invalid() {
    let (store, _, service) = setup();
    let user = service
        .register(NAME, EMAIL, PASSWORD)
        .await
        .expect("register");
    let pair = service.login(EMAIL, PASSWORD).await.expect("login");

    store.remove(user.id).await.expect("user removed");
    assert!(matches!(
        service.refresh(&pair.refresh_token).await,
        Err(AuthError::InvalidToken)
    ));
}

#[tokio::test]
async fn expired_refresh_token_is_reported_as_expired() {
    let (_, clock, service) = setup();
    service
        .register(NAME, EMAIL, PASSWORD)
        .await
        .expect("register");
    let pair = service.login(EMAIL, PASSWORD).await.expect("login");

    clock.advance(Duration::days(7));
    assert!(matches!(
        service.refresh(&pair.refresh_token).await,
        Err(AuthError::TokenExpired)
    ));
}

#[tokio::test]
async fn either_token_validates_for_api_calls() {
    let (_, _, service) = setup();
    service
        .register(NAME, EMAIL, PASSWORD)
        .await
        .expect("register");
    let pair = service.login(EMAIL, PASSWORD).await.expect("login");

    assert!(service.validate_token(&pair.refresh_token).is_ok());
    assert!(service.refresh(&pair.access_token).await.is_ok());
}

#[tokio::test]
async fn admin_token_authorizes_admin_actions() {
    let (_, _, service) = setup();
    let user = service
        .register(NAME, EMAIL, PASSWORD)
        .await
        .expect("register");
    service.add_role(EMAIL, "admin").expect("add role");
    assert_eq!(service.get_role(EMAIL), Role::User);
    assert!(service.check_permission_for_user(EMAIL, "user", "manage"));

    let pair = service.login(EMAIL, PASSWORD).await.expect("login");
    let claims = service
        .validate_token(&pair.access_token)
        .expect("validates");
    assert_eq!(claims.user_id, user.id);
    // The token carries the stored role, not policy assignments.
    assert!(!service.authorize(&claims, "user", "manage"));
}

#[tokio::test]
async fn max_configured_token_lifetime_fails_login_cleanly() {
    init_tracing();
    let config = AuthConfig::from_lookup(|key| {
        (key == "TOKEN_EXPIRATION_HOURS").then(|| u32::MAX.to_string())
    })
    .expect("config parses");
    let service = AuthService::new(
        Arc::new(MemoryUserStore::new()),
        AuthConfig {
            bcrypt_cost: 4,
            ..config
        },
        Arc::new(ManualClock::starting_now()),
    );
    service
        .register(NAME, EMAIL, PASSWORD)
        .await
        .expect("register");

    assert!(matches!(
        service.login(EMAIL, PASSWORD).await,
        Err(AuthError::Internal(_))
    ));
}
