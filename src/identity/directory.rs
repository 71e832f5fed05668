use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use parking_lot::RwLock;

use super::error::IdentityError;
use super::principal::{Principal, UserRole};

/// Lookup of full user records by username.
pub trait UserDirectory: Send + Sync {
    /// Returns `IdentityError::UserNotFound` when no record exists.
    fn load_by_username(&self, username: &str) -> Result<Principal, IdentityError>;
}

/// Process-local directory. Stands in for the persistence layer, which lives outside this crate.
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<String, Principal>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self { Self::default() }

    /// Demo accounts matching the skeleton's sample data.
    pub fn with_demo_users() -> Self {
        let dir = Self::new();
        dir.insert(
            Principal::new("admin", &[UserRole::Admin, UserRole::Employee])
                .with_name("Admin", "Istrator")
                .with_email("admin@example.com"),
        );
        dir.insert(
            Principal::new("user1", &[UserRole::Manager, UserRole::Employee])
                .with_name("Susi", "Kaufgern")
                .with_email("susi.kaufgern@example.com"),
        );
        dir.insert(
            Principal::new("user2", &[UserRole::Employee])
                .with_name("Max", "Mustermann")
                .with_email("max.mustermann@example.com"),
        );
        dir
    }

    /// Seed from a JSON array of principals. Later duplicates replace earlier ones.
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading users file {}", path.display()))?;
        let users: Vec<Principal> = serde_json::from_str(&text)
            .with_context(|| format!("parsing users file {}", path.display()))?;
        let dir = Self::new();
        for u in users {
            if u.username.is_empty() {
                anyhow::bail!("users file {} contains an entry without username", path.display());
            }
            dir.insert(u);
        }
        Ok(dir)
    }

    /// Insert or replace; returns the previous record.
    pub fn insert(&self, principal: Principal) -> Option<Principal> {
        self.users.write().insert(principal.username.clone(), principal)
    }

    pub fn remove(&self, username: &str) -> Option<Principal> {
        self.users.write().remove(username)
    }

    pub fn len(&self) -> usize { self.users.read().len() }

    pub fn is_empty(&self) -> bool { self.users.read().is_empty() }
}

impl UserDirectory for InMemoryUserDirectory {
    fn load_by_username(&self, username: &str) -> Result<Principal, IdentityError> {
        self.users
            .read()
            .get(username)
            .cloned()
            .ok_or_else(|| IdentityError::UserNotFound { username: username.to_string() })
    }
}
