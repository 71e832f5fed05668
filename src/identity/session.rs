use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::anyhow;
use base64::Engine;
use parking_lot::RwLock;
use tracing::debug;

use super::directory::UserDirectory;
use super::session_info::SessionInfo;

pub type SessionId = String;

/// A live session as seen by one request.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub id: SessionId,
    pub info: Arc<SessionInfo>,
}

#[derive(Debug)]
struct SessionEntry {
    info: Arc<SessionInfo>,
    created_at: Instant,
    last_seen: Instant,
}

fn gen_id() -> anyhow::Result<SessionId> {
    // 256-bit random token, base64url without padding
    let mut buf = [0u8; 32];
    getrandom::getrandom(&mut buf).map_err(|e| anyhow!("session id generation failed: {e}"))?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf))
}

/// Session scope: one `SessionInfo` per session id, dropped on invalidation or idle expiry.
pub struct SessionRegistry {
    directory: Arc<dyn UserDirectory>,
    ttl: Duration,
    sessions: RwLock<HashMap<SessionId, SessionEntry>>,
}

impl SessionRegistry {
    pub fn new(directory: Arc<dyn UserDirectory>, ttl: Duration) -> Self {
        Self { directory, ttl, sessions: RwLock::new(HashMap::new()) }
    }

    pub fn ttl(&self) -> Duration { self.ttl }

    /// Begin a new session with an empty identity cache.
    pub fn open(&self) -> anyhow::Result<SessionHandle> {
        let now = Instant::now();
        let id = gen_id()?;
        let info = Arc::new(SessionInfo::new(Arc::clone(&self.directory)));
        self.sessions.write().insert(
            id.clone(),
            SessionEntry { info: Arc::clone(&info), created_at: now, last_seen: now },
        );
        debug!(target: "session", "session.open sid={} ttl_secs={}", short(&id), self.ttl.as_secs());
        Ok(SessionHandle { id, info })
    }

    /// Look up a live session and refresh its idle deadline. Expired sessions are dropped.
    pub fn get(&self, id: &str) -> Option<SessionHandle> {
        let now = Instant::now();
        let mut map = self.sessions.write();
        match map.get_mut(id) {
            None => return None,
            Some(ent) if now.duration_since(ent.last_seen) < self.ttl => {
                ent.last_seen = now;
                return Some(SessionHandle { id: id.to_string(), info: Arc::clone(&ent.info) });
            }
            Some(_) => {}
        }
        if let Some(ent) = map.remove(id) {
            debug!(
                target: "session",
                "session.expire sid={} age_secs={}",
                short(id),
                now.duration_since(ent.created_at).as_secs()
            );
        }
        None
    }

    /// Existing live session for `id`, or a fresh one.
    pub fn get_or_open(&self, id: Option<&str>) -> anyhow::Result<(SessionHandle, bool)> {
        if let Some(h) = id.and_then(|s| self.get(s)) {
            return Ok((h, false));
        }
        Ok((self.open()?, true))
    }

    /// Terminate a session; its cached user goes with it.
    pub fn invalidate(&self, id: &str) -> bool {
        let removed = self.sessions.write().remove(id).is_some();
        if removed {
            debug!(target: "session", "session.invalidate sid={}", short(id));
        }
        removed
    }

    pub fn prune_expired(&self) -> usize {
        let now = Instant::now();
        let mut map = self.sessions.write();
        let before = map.len();
        map.retain(|_, ent| now.duration_since(ent.last_seen) < self.ttl);
        let pruned = before - map.len();
        if pruned > 0 {
            debug!(target: "session", "session.prune count={} live={}", pruned, map.len());
        }
        pruned
    }

    pub fn len(&self) -> usize { self.sessions.read().len() }

    pub fn is_empty(&self) -> bool { self.sessions.read().is_empty() }
}

// Only log a prefix of session ids.
fn short(id: &str) -> &str {
    let end = id.char_indices().nth(8).map(|(i, _)| i).unwrap_or(id.len());
    &id[..end]
}
