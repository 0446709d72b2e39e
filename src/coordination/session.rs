//! Session lifecycle:
//! `session_id` and `zxid` are both drawn from monotonic leader-owned
//! counters; heartbeats reset the expiry deadline; expiry triggers
//! ephemeral cleanup and watch firing in `node_store`.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{EngineError, EngineResult, ErrorCode};

#[derive(Debug, Clone)]
pub struct Session {
    pub session_id: u64,
    pub timeout_ms: u64,
    pub last_heartbeat_ms: u64,
    pub watches: HashSet<String>,
    pub ephemerals: HashSet<String>,
    pub auth: Vec<(String, String)>,
}

impl Session {
    fn new(session_id: u64, timeout_ms: u64, now_ms: u64) -> Self {
        Self {
            session_id,
            timeout_ms,
            last_heartbeat_ms: now_ms,
            watches: HashSet::new(),
            ephemerals: HashSet::new(),
            auth: Vec::new(),
        }
    }

    pub fn deadline_ms(&self) -> u64 {
        self.last_heartbeat_ms + self.timeout_ms
    }

    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms > self.deadline_ms()
    }
}

/// Leader-side id/zxid allocator plus the live session table. A follower
/// never allocates: it tunnels `create session`/heartbeat requests to the
/// leader through `coordination::forwarding`.
pub struct SessionManager {
    next_session_id: AtomicU64,
    next_zxid: AtomicU64,
    sessions: std::sync::Mutex<std::collections::HashMap<u64, Session>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            next_session_id: AtomicU64::new(1),
            next_zxid: AtomicU64::new(1),
            sessions: std::sync::Mutex::new(std::collections::HashMap::new()),
        }
    }

    pub fn next_zxid(&self) -> u64 {
        self.next_zxid.fetch_add(1, Ordering::SeqCst)
    }

    /// `create session(timeout_ms)`: allocates `session_id = ++counter` and a
    /// `zxid`, both of which must be broadcast to followers by the caller
    /// before the session becomes externally visible.
    pub fn create_session(&self, timeout_ms: u64, now_ms: u64) -> (Session, u64) {
        let session_id = self.next_session_id.fetch_add(1, Ordering::SeqCst);
        let zxid = self.next_zxid();
        let session = Session::new(session_id, timeout_ms, now_ms);
        self.sessions.lock().unwrap().insert(session_id, session.clone());
        (session, zxid)
    }

    pub fn heartbeat(&self, session_id: u64, now_ms: u64) -> EngineResult<()> {
        let mut sessions = self.sessions.lock().unwrap();
        let session = sessions
            .get_mut(&session_id)
            .ok_or_else(|| EngineError::new(ErrorCode::SessionExpired, "no such session"))?;
        if session.is_expired(now_ms) {
            return Err(EngineError::new(ErrorCode::SessionExpired, "session already expired"));
        }
        session.last_heartbeat_ms = now_ms;
        Ok(())
    }

    /// Sessions whose deadline has passed `now_ms`, ready for batch cleanup.
    pub fn expired_sessions(&self, now_ms: u64) -> Vec<u64> {
        self.sessions
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.is_expired(now_ms))
            .map(|s| s.session_id)
            .collect()
    }

    /// Removes a session from the live table and returns it so the caller
    /// can clean up its ephemeral nodes and fire its watches.
    pub fn terminate(&self, session_id: u64) -> Option<Session> {
        self.sessions.lock().unwrap().remove(&session_id)
    }

    pub fn get(&self, session_id: u64) -> Option<Session> {
        self.sessions.lock().unwrap().get(&session_id).cloned()
    }

    pub fn register_ephemeral(&self, session_id: u64, path: &str) -> EngineResult<()> {
        let mut sessions = self.sessions.lock().unwrap();
        let session = sessions
            .get_mut(&session_id)
            .ok_or_else(|| EngineError::new(ErrorCode::SessionExpired, "no such session"))?;
        session.ephemerals.insert(path.to_string());
        Ok(())
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heartbeat_extends_deadline() {
        let mgr = SessionManager::new();
        let (session, _zxid) = mgr.create_session(1_000, 0);
        mgr.heartbeat(session.session_id, 500).unwrap();
        let refreshed = mgr.get(session.session_id).unwrap();
        assert_eq!(refreshed.deadline_ms(), 1_500);
    }

    #[test]
    fn session_expires_once_deadline_passes() {
        let mgr = SessionManager::new();
        let (session, _) = mgr.create_session(1_000, 0);
        assert!(mgr.expired_sessions(500).is_empty());
        assert_eq!(mgr.expired_sessions(1_001), vec![session.session_id]);
    }

    #[test]
    fn heartbeat_on_expired_session_is_rejected() {
        let mgr = SessionManager::new();
        let (session, _) = mgr.create_session(100, 0);
        assert!(mgr.heartbeat(session.session_id, 500).is_err());
    }

    #[test]
    fn session_ids_are_monotonic_and_unique() {
        let mgr = SessionManager::new();
        let (a, _) = mgr.create_session(1_000, 0);
        let (b, _) = mgr.create_session(1_000, 0);
        assert!(b.session_id > a.session_id);
    }
}
