//! Access gate and capabilities
//!
//! The store never sees credentials. A gate turns username/password into a
//! `Capability`, and the capability is what every append must carry.

use std::collections::HashMap;

use bcrypt::{hash, verify, DEFAULT_COST};
use tracing::{info, warn};

use super::{AuthError, AuthResult};

/// Accounts of the previous entry tool, used when nothing is configured
pub const DEFAULT_USERS: &[(&str, &str)] = &[("admin", "password123"), ("staff", "stock2024")];

/// Proof that a caller authenticated, carrying the actor name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Capability {
    actor: String,
}

impl Capability {
    /// Wrap an actor identifier; the identifier must not be blank
    pub fn new(actor: impl Into<String>) -> AuthResult<Self> {
        let actor = actor.into();
        if actor.trim().is_empty() {
            return Err(AuthError::InvalidActor);
        }
        Ok(Self { actor })
    }

    /// Capability for built-in jobs such as imports
    pub(crate) fn trusted(actor: &'static str) -> Self {
        Self {
            actor: actor.to_string(),
        }
    }

    pub fn actor(&self) -> &str {
        &self.actor
    }
}

/// Anything that can authenticate a caller
pub trait AccessGate: Send + Sync {
    fn authenticate(&self, username: &str, password: &str) -> AuthResult<Capability>;
}

#[derive(Debug, Clone)]
struct UserInfo {
    password_hash: String,
}

/// In-memory credential table with bcrypt-hashed passwords
pub struct StaticAccessGate {
    users: HashMap<String, UserInfo>,
    cost: u32,
}

impl StaticAccessGate {
    pub fn new() -> Self {
        Self::with_cost(DEFAULT_COST)
    }

    /// Gate hashing with a specific bcrypt cost (4..=31)
    pub fn with_cost(cost: u32) -> Self {
        Self {
            users: HashMap::new(),
            cost,
        }
    }

    /// Build a gate from `user:password` pairs
    pub fn from_user_list(list: Option<&str>) -> AuthResult<Self> {
        Self::new().with_users(list)
    }

    /// Install users from a list such as "alice:secret,bob:hunter2"
    ///
    /// Malformed entries are skipped with a warning. If no user is known
    /// afterwards, the default accounts are installed.
    pub fn with_users(mut self, list: Option<&str>) -> AuthResult<Self> {
        let gate = &mut self;

        if let Some(list) = list {
            for entry in list.split(',') {
                let entry = entry.trim();
                if entry.is_empty() {
                    continue;
                }
                match entry.split_once(':') {
                    Some((user, pass)) if !user.trim().is_empty() && !pass.is_empty() => {
                        gate.add_user(user.trim(), pass)?;
                    }
                    _ => warn!(entry, "skipping malformed user entry"),
                }
            }
        }

        if gate.users.is_empty() {
            warn!("no users configured, installing default accounts");
            for (user, pass) in DEFAULT_USERS {
                gate.add_user(user, pass)?;
            }
        }

        info!(users = gate.users.len(), "access gate ready");
        Ok(self)
    }

    /// Add or replace a user
    pub fn add_user(&mut self, username: &str, password: &str) -> AuthResult<()> {
        let password_hash =
            hash(password, self.cost).map_err(|e| AuthError::HashError(e.to_string()))?;
        self.users
            .insert(username.to_string(), UserInfo { password_hash });
        Ok(())
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }
}

impl Default for StaticAccessGate {
    fn default() -> Self {
        Self::new()
    }
}

impl AccessGate for StaticAccessGate {
    fn authenticate(&self, username: &str, password: &str) -> AuthResult<Capability> {
        let user = self
            .users
            .get(username)
            .ok_or(AuthError::InvalidCredentials)?;

        if verify(password, &user.password_hash).unwrap_or(false) {
            Capability::new(username)
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }
}
