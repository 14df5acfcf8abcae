//! User persistence seam.
//!
//! The auth core never talks to a database directly. Hosts implement
//! [`UserStore`] over their own persistence; [`MemoryUserStore`] is the
//! in-process implementation used by tests and tooling.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::models::auth::{NewUser, Role, User};

/// Failures raised by a user store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email already taken: {0}")]
    Duplicate(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store error: {0}")]
    Backend(String),
}

/// Lookup and creation of users.
///
/// Implementations handle their own concurrency. Emails arrive already
/// normalized (trimmed, lower-cased).
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError>;

    /// Persist `user`, assigning its id.
    async fn create(&self, user: NewUser) -> Result<User, StoreError>;
}

#[derive(Debug, Default)]
struct MemoryTables {
    next_id: i64,
    by_id: HashMap<i64, User>,
    ids_by_email: HashMap<String, i64>,
}

/// In-memory [`UserStore`] with sequential ids starting at 1.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    tables: RwLock<MemoryTables>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users.
    pub async fn len(&self) -> usize {
        self.tables.read().await.by_id.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Remove a user, as an account deletion would.
    pub async fn remove(&self, id: i64) -> Option<User> {
        let mut tables = self.tables.write().await;
        let user = tables.by_id.remove(&id)?;
        tables.ids_by_email.remove(&user.email);
        Some(user)
    }

    /// Replace a stored user's role, as an administrator would.
    pub async fn set_role(&self, id: i64, role: Role) -> bool {
        let mut tables = self.tables.write().await;
        match tables.by_id.get_mut(&id) {
            Some(user) => {
                user.role = role;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .ids_by_email
            .get(email)
            .and_then(|id| tables.by_id.get(id))
            .cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        Ok(self.tables.read().await.by_id.get(&id).cloned())
    }

    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.ids_by_email.contains_key(&user.email) {
            return Err(StoreError::Duplicate(user.email));
        }
        tables.next_id += 1;
        let stored = User {
            id: tables.next_id,
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
        };
        tables.ids_by_email.insert(stored.email.clone(), stored.id);
        tables.by_id.insert(stored.id, stored.clone());
        Ok(stored)
    }
}
