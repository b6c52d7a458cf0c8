//! Admin session store.
//!
//! Sessions are bearer tokens: 128 random bits rendered as 32 lowercase hex
//! characters. A session is valid while `now - created_at < ttl`; expired
//! sessions are dropped lazily on lookup and in bulk by
//! [`SessionStore::cleanup_sessions`].

use std::time::Duration;

use dashmap::DashMap;
use marketdash_core::SharedClock;
use rand::Rng;
use time::OffsetDateTime;

/// Length of a rendered session token in hex characters.
pub const SESSION_TOKEN_LEN: usize = 32;

/// An issued admin session.
#[derive(Debug, Clone)]
pub struct Session {
    /// Client identifier the session was issued to.
    pub client_id: String,
    /// SHA-256 hex of the secret that was presented at login.
    pub secret_hash: String,
    pub created_at: OffsetDateTime,
}

impl Session {
    pub fn is_valid(&self, now: OffsetDateTime, ttl: Duration) -> bool {
        now - self.created_at < ttl
    }

    pub fn expires_at(&self, ttl: Duration) -> OffsetDateTime {
        self.created_at + ttl
    }
}

/// Concurrent store of issued sessions keyed by token.
pub struct SessionStore {
    sessions: DashMap<String, Session>,
    clock: SharedClock,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(clock: SharedClock, ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            clock,
            ttl,
        }
    }

    /// Create a session for `client_id` and return its token.
    ///
    /// `secret_hash` is kept for audit only (see [`crate::secret::hash_secret`]).
    pub fn issue_session(&self, client_id: &str, secret_hash: String) -> String {
        let token = generate_token();
        let session = Session {
            client_id: client_id.to_string(),
            secret_hash,
            created_at: self.clock.now(),
        };

        self.sessions.insert(token.clone(), session);
        tracing::debug!(client_id = %client_id, "Admin session issued");

        token
    }

    /// Whether `token` names a live session. An expired session is removed.
    pub fn validate_session(&self, token: &str) -> bool {
        self.get(token).is_some()
    }

    /// Look up a live session.
    pub fn get(&self, token: &str) -> Option<Session> {
        let now = self.clock.now();

        if self
            .sessions
            .remove_if(token, |_, session| !session.is_valid(now, self.ttl))
            .is_some()
        {
            tracing::debug!("Expired admin session removed on lookup");
            return None;
        }

        self.sessions.get(token).map(|session| session.clone())
    }

    /// Drop a session. Returns `true` if it existed.
    pub fn revoke(&self, token: &str) -> bool {
        self.sessions.remove(token).is_some()
    }

    /// Remove every expired session and return how many were removed.
    pub fn cleanup_sessions(&self) -> usize {
        let now = self.clock.now();
        let before = self.sessions.len();
        self.sessions
            .retain(|_, session| session.is_valid(now, self.ttl));
        before.saturating_sub(self.sessions.len())
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

fn generate_token() -> String {
    let bytes: [u8; 16] = rand::thread_rng().r#gen();
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secret::hash_secret;
    use marketdash_core::{Clock, ManualClock};
    use std::collections::HashSet;
    use std::sync::Arc;

    const DAY: Duration = Duration::from_secs(24 * 3600);

    fn store() -> (SessionStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        (SessionStore::new(clock.clone(), DAY), clock)
    }

    #[test]
    fn test_token_format() {
        let (store, _clock) = store();
        let token = store.issue_session("1.2.3.4", hash_secret("secret"));
        assert_eq!(token.len(), SESSION_TOKEN_LEN);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_tokens_are_unique() {
        let (store, _clock) = store();
        let tokens: HashSet<_> = (0..200)
            .map(|_| store.issue_session("c", hash_secret("s")))
            .collect();
        assert_eq!(tokens.len(), 200);
        assert_eq!(store.len(), 200);
    }

    #[test]
    fn test_session_records_hash_not_secret() {
        let (store, _clock) = store();
        let token = store.issue_session("1.2.3.4", hash_secret("hunter2"));
        let session = store.get(&token).unwrap();
        assert_eq!(session.client_id, "1.2.3.4");
        assert_eq!(session.secret_hash, hash_secret("hunter2"));
        assert_ne!(session.secret_hash, "hunter2");
    }

    #[test]
    fn test_session_expires_at_ttl_boundary() {
        let (store, clock) = store();
        let token = store.issue_session("c", hash_secret("s"));

        clock.advance(DAY - Duration::from_secs(1));
        assert!(store.validate_session(&token));

        clock.advance(Duration::from_secs(1));
        assert!(!store.validate_session(&token));
        assert!(store.is_empty());
    }

    #[test]
    fn test_session_validity_around_ttl_in_millis() {
        let (store, clock) = store();
        let token = store.issue_session("c", hash_secret("s"));

        clock.advance(DAY - Duration::from_millis(1));
        assert!(store.validate_session(&token));

        clock.advance(Duration::from_millis(2));
        assert!(!store.validate_session(&token));
    }

    #[test]
    fn test_unknown_token_is_invalid() {
        let (store, _clock) = store();
        assert!(!store.validate_session("deadbeef"));
        assert!(!store.validate_session(""));
    }

    #[test]
    fn test_revoke() {
        let (store, _clock) = store();
        let token = store.issue_session("c", hash_secret("s"));
        assert!(store.revoke(&token));
        assert!(!store.validate_session(&token));
        assert!(!store.revoke(&token));
    }

    #[test]
    fn test_cleanup_sessions() {
        let (store, clock) = store();
        let old = store.issue_session("c", hash_secret("s"));
        clock.advance(Duration::from_secs(12 * 3600));
        let young = store.issue_session("c", hash_secret("s"));
        clock.advance(Duration::from_secs(12 * 3600));

        assert_eq!(store.cleanup_sessions(), 1);
        assert!(!store.validate_session(&old));
        assert!(store.validate_session(&young));
    }

    #[test]
    fn test_expires_at() {
        let (store, clock) = store();
        let token = store.issue_session("c", hash_secret("s"));
        let session = store.get(&token).unwrap();
        assert_eq!(session.expires_at(store.ttl()), clock.now() + DAY);
    }
}
