use chrono::{Duration, Utc};
use dashmap::DashMap;

use crate::models::BookingSession;

/// In-memory map of active calls, keyed by Twilio CallSid. Sessions are
/// created on first use and removed on reset. DashMap's entry lock serializes
/// turns for one call (duplicate webhook delivery) while calls on different
/// shards stay independent.
#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<String, BookingSession>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one turn against the call's session, creating it if this is the
    /// first turn. The closure runs under the entry lock, so concurrent
    /// turns for the same CallSid cannot interleave.
    pub fn with_session<T>(&self, call_sid: &str, f: impl FnOnce(&mut BookingSession) -> T) -> T {
        let mut entry = self
            .sessions
            .entry(call_sid.to_string())
            .or_insert_with(|| BookingSession::new(call_sid));
        let session = entry.value_mut();
        session.touch();
        f(session)
    }

    pub fn contains(&self, call_sid: &str) -> bool {
        self.sessions.contains_key(call_sid)
    }

    /// Drop the call's session. No-op if it never existed.
    pub fn reset(&self, call_sid: &str) {
        self.sessions.remove(call_sid);
    }

    /// Remove sessions idle longer than `max_idle`. Abandoned calls never
    /// signal completion, so the host sweeps them to bound memory.
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let cutoff = Utc::now().naive_utc() - max_idle;
        let before = self.sessions.len();
        self.sessions.retain(|_, s| s.last_activity > cutoff);
        before - self.sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Stage;

    #[test]
    fn test_creates_session_on_first_use() {
        let store = SessionStore::new();
        let stage = store.with_session("CA1", |s| s.stage());
        assert_eq!(stage, Stage::Collecting(crate::models::Field::Name));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_sessions_are_isolated_per_call() {
        let store = SessionStore::new();
        store.with_session("CA1", |s| s.full_name = Some("Ann".to_string()));
        let other = store.with_session("CA2", |s| s.full_name.clone());
        assert_eq!(other, None);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_reset_removes_and_is_idempotent() {
        let store = SessionStore::new();
        store.with_session("CA1", |_| ());
        store.reset("CA1");
        store.reset("CA1");
        store.reset("never-existed");
        assert!(store.is_empty());
    }

    #[test]
    fn test_evict_idle_drops_stale_sessions() {
        let store = SessionStore::new();
        store.with_session("stale", |s| {
            s.last_activity = Utc::now().naive_utc() - Duration::hours(2);
        });
        store.with_session("fresh", |_| ());
        // with_session touched "stale" too, so backdate it again directly
        store.with_session("stale", |s| {
            s.last_activity = Utc::now().naive_utc() - Duration::hours(2);
        });
        let evicted = store.evict_idle(Duration::minutes(30));
        assert_eq!(evicted, 1);
        assert_eq!(store.len(), 1);
    }
}
