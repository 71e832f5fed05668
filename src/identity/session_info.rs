//! Per-session view of the authenticated user.
//!
//! A `SessionInfo` lives exactly as long as its session. The first successful
//! `current_user` call loads the full user record from the directory and pins it;
//! later calls return that same record even if the authentication context changes.
//! Everything else is answered straight from the authentication context passed in.

use std::sync::Arc;

use once_cell::sync::OnceCell;

use super::context::AuthenticationContext;
use super::directory::UserDirectory;
use super::error::IdentityError;
use super::principal::Principal;

pub struct SessionInfo {
    directory: Arc<dyn UserDirectory>,
    /// Set once per session; concurrent first accesses wait on a single initializer.
    current_user: OnceCell<Arc<Principal>>,
}

impl std::fmt::Debug for SessionInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionInfo")
            .field("current_user", &self.current_user.get().map(|p| p.username.as_str()))
            .finish()
    }
}

impl SessionInfo {
    pub fn new(directory: Arc<dyn UserDirectory>) -> Self {
        Self { directory, current_user: OnceCell::new() }
    }

    /// The user of this session, `None` when nobody is authenticated.
    ///
    /// A username the directory does not know is an error and is not cached,
    /// so a later call retries the lookup.
    pub fn current_user(&self, ctx: &dyn AuthenticationContext) -> Result<Option<Arc<Principal>>, IdentityError> {
        if let Some(p) = self.current_user.get() {
            return Ok(Some(Arc::clone(p)));
        }
        let username = ctx.current_username();
        if username.is_empty() {
            return Ok(None);
        }
        self.current_user
            .get_or_try_init(|| self.directory.load_by_username(&username).map(Arc::new))
            .map(|p| Some(Arc::clone(p)))
    }

    /// Cached user without consulting context or directory.
    pub fn cached_user(&self) -> Option<Arc<Principal>> {
        self.current_user.get().cloned()
    }

    /// Username from the context on every call; empty if unauthenticated.
    pub fn current_user_name(&self, ctx: &dyn AuthenticationContext) -> String {
        ctx.current_username()
    }

    /// Authorities of the current context as a space separated list, empty if not logged in.
    pub fn current_user_roles(&self, ctx: &dyn AuthenticationContext) -> String {
        if !self.is_logged_in(ctx) {
            return String::new();
        }
        ctx.current_authorities().join(" ").trim().to_string()
    }

    pub fn is_logged_in(&self, ctx: &dyn AuthenticationContext) -> bool {
        ctx.is_authenticated()
    }

    /// Exact, case-sensitive membership of `role` in the context's authorities.
    pub fn has_role(&self, ctx: &dyn AuthenticationContext, role: &str) -> bool {
        if role.is_empty() || !self.is_logged_in(ctx) {
            return false;
        }
        ctx.current_authorities().iter().any(|a| a == role)
    }
}

#[cfg(test)]
#[path = "session_info_tests.rs"]
mod tests;
