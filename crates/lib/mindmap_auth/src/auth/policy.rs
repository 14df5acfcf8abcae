//! Role-based access policy.
//!
//! A rule `(role, object, action)` allows that role to perform the action on
//! the object. Matching is exact: there is no wildcard and no role hierarchy,
//! so `author` and `admin` carry their own copies of the `user` rules.
//! Principals (emails) map to one or more roles.

use std::collections::{BTreeSet, HashMap};
use std::sync::{PoisonError, RwLock};

use serde::Serialize;

use super::{AuthError, AuthResult};
use crate::models::auth::Role;

pub const OBJECT_POST: &str = "post";
pub const OBJECT_USER: &str = "user";

pub const ACTION_READ: &str = "read";
pub const ACTION_WRITE: &str = "write";
pub const ACTION_DELETE: &str = "delete";
pub const ACTION_MANAGE: &str = "manage";

/// Rules loaded at startup.
pub const DEFAULT_RULES: [(Role, &str, &str); 8] = [
    (Role::User, OBJECT_POST, ACTION_READ),
    (Role::User, OBJECT_POST, ACTION_WRITE),
    (Role::Author, OBJECT_POST, ACTION_READ),
    (Role::Author, OBJECT_POST, ACTION_WRITE),
    (Role::Admin, OBJECT_POST, ACTION_READ),
    (Role::Admin, OBJECT_POST, ACTION_WRITE),
    (Role::Admin, OBJECT_POST, ACTION_DELETE),
    (Role::Admin, OBJECT_USER, ACTION_MANAGE),
];

/// A single allow rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PolicyRule {
    pub role: String,
    pub object: String,
    pub action: String,
}

impl PolicyRule {
    pub fn new(role: &str, object: &str, action: &str) -> Self {
        Self {
            role: role.to_string(),
            object: object.to_string(),
            action: action.to_string(),
        }
    }
}

#[derive(Debug, Default)]
struct PolicyTables {
    rules: BTreeSet<PolicyRule>,
    /// principal -> roles, in assignment order.
    assignments: HashMap<String, Vec<Role>>,
}

/// Rule table plus principal-to-role assignments.
#[derive(Debug, Default)]
pub struct PolicyEngine {
    tables: RwLock<PolicyTables>,
}

impl PolicyEngine {
    /// An engine with no rules and no assignments.
    pub fn new() -> Self {
        Self::default()
    }

    /// An engine seeded with [`DEFAULT_RULES`].
    pub fn with_default_rules() -> Self {
        let engine = Self::new();
        for (role, object, action) in DEFAULT_RULES {
            engine.add_policy(role.as_str(), object, action);
        }
        engine
    }

    /// Add an allow rule. Returns `false` if it was already present.
    pub fn add_policy(&self, role: &str, object: &str, action: &str) -> bool {
        self.write()
            .rules
            .insert(PolicyRule::new(role, object, action))
    }

    /// Remove an allow rule. Returns `false` if it was not present.
    pub fn remove_policy(&self, role: &str, object: &str, action: &str) -> bool {
        self.write()
            .rules
            .remove(&PolicyRule::new(role, object, action))
    }

    /// Every rule, ordered by role, object, action.
    pub fn policies(&self) -> Vec<PolicyRule> {
        self.read().rules.iter().cloned().collect()
    }

    /// Whether `role` may perform `action` on `object`.
    pub fn enforce(&self, role: &str, object: &str, action: &str) -> bool {
        self.read()
            .rules
            .contains(&PolicyRule::new(role, object, action))
    }

    /// Grant `role` to `principal`. Rejects roles outside the closed set.
    /// Returns `false` if the principal already held the role.
    pub fn assign_role(&self, principal: &str, role: &str) -> AuthResult<bool> {
        let role: Role = role
            .parse()
            .map_err(|_| AuthError::InvalidRole(role.to_string()))?;
        let mut tables = self.write();
        let roles = tables.assignments.entry(principal.to_string()).or_default();
        if roles.contains(&role) {
            return Ok(false);
        }
        roles.push(role);
        Ok(true)
    }

    /// Revoke `role` from `principal`. Returns `false` if it was not held.
    pub fn unassign_role(&self, principal: &str, role: &str) -> bool {
        let Ok(role) = role.parse::<Role>() else {
            return false;
        };
        let mut tables = self.write();
        let Some(roles) = tables.assignments.get_mut(principal) else {
            return false;
        };
        let before = roles.len();
        roles.retain(|held| *held != role);
        let removed = roles.len() != before;
        if roles.is_empty() {
            tables.assignments.remove(principal);
        }
        removed
    }

    /// Roles held by `principal`, in assignment order. Possibly empty.
    pub fn roles_of(&self, principal: &str) -> Vec<Role> {
        self.read()
            .assignments
            .get(principal)
            .cloned()
            .unwrap_or_default()
    }

    /// Whether any role held by `principal` allows the action. A principal
    /// without roles is evaluated as [`Role::User`].
    pub fn enforce_for_principal(&self, principal: &str, object: &str, action: &str) -> bool {
        let roles = self.roles_of(principal);
        if roles.is_empty() {
            return self.enforce(Role::User.as_str(), object, action);
        }
        roles
            .iter()
            .any(|role| self.enforce(role.as_str(), object, action))
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, PolicyTables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, PolicyTables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }
}
