//! Session table with an expiry index.
//!
//! Sessions live apart from the ledger store: they churn on every request and
//! never take part in a ledger change set.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};

use labstock_auth::{Session, SessionToken};

use crate::store::StoreError;

#[derive(Debug, Default)]
struct SessionTable {
    by_token: HashMap<SessionToken, Session>,
    /// `(expires_at, token)`, ordered so expired sessions form a prefix.
    expiry: BTreeSet<(DateTime<Utc>, SessionToken)>,
}

impl SessionTable {
    fn insert(&mut self, session: Session) {
        self.expiry
            .insert((session.expires_at, session.token.clone()));
        self.by_token.insert(session.token.clone(), session);
    }

    fn remove(&mut self, token: &SessionToken) -> Option<Session> {
        let session = self.by_token.remove(token)?;
        self.expiry.remove(&(session.expires_at, token.clone()));
        Some(session)
    }

    fn purge(&mut self, now: DateTime<Utc>) -> usize {
        let mut expired = Vec::new();
        for (_, token) in &self.expiry {
            if self.by_token.get(token).is_some_and(|s| s.is_live(now)) {
                break;
            }
            expired.push(token.clone());
        }
        for token in &expired {
            self.remove(token);
        }
        expired.len()
    }
}

/// Outcome of [`SessionStore::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validated {
    /// `None` when the token is unknown or has expired.
    pub session: Option<Session>,
    pub purged: usize,
}

#[derive(Debug, Default)]
pub struct SessionStore {
    table: Mutex<SessionTable>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, SessionTable>, StoreError> {
        self.table.lock().map_err(|_| StoreError::Poisoned)
    }

    pub fn insert(&self, session: Session) -> Result<(), StoreError> {
        self.lock()?.insert(session);
        Ok(())
    }

    /// Resolve `token`, sliding its expiry to `now + ttl`.
    ///
    /// Every call also purges all sessions that have expired by `now`,
    /// including `token` itself if it is stale.
    pub fn validate(
        &self,
        token: &SessionToken,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<Validated, StoreError> {
        let mut table = self.lock()?;
        let purged = table.purge(now);

        let Some(mut session) = table.remove(token) else {
            return Ok(Validated {
                session: None,
                purged,
            });
        };
        session.touch(now, ttl);
        table.insert(session.clone());

        Ok(Validated {
            session: Some(session),
            purged,
        })
    }

    pub fn revoke(&self, token: &SessionToken) -> Result<Option<Session>, StoreError> {
        Ok(self.lock()?.remove(token))
    }

    /// Drop every session owned by `user_id` (used when a user is suspended).
    pub fn revoke_user(&self, user_id: labstock_core::UserId) -> Result<usize, StoreError> {
        let mut table = self.lock()?;
        let tokens: Vec<SessionToken> = table
            .by_token
            .values()
            .filter(|s| s.user_id == user_id)
            .map(|s| s.token.clone())
            .collect();
        for token in &tokens {
            table.remove(token);
        }
        Ok(tokens.len())
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.by_token.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use labstock_core::UserId;

    fn ttl() -> Duration {
        Duration::seconds(300)
    }

    #[test]
    fn validation_slides_expiry() {
        let store = SessionStore::new();
        let t0 = Utc::now();
        let session = Session::issue(UserId::new(), t0, ttl());
        let token = session.token.clone();
        store.insert(session).unwrap();

        let at = t0 + Duration::seconds(200);
        let validated = store.validate(&token, at, ttl()).unwrap();
        assert_eq!(validated.session.unwrap().expires_at, at + ttl());

        // Would have expired at t0 + 300 without the slide.
        let later = t0 + Duration::seconds(400);
        assert!(store.validate(&token, later, ttl()).unwrap().session.is_some());
    }

    #[test]
    fn expired_tokens_fail_and_are_purged() {
        let store = SessionStore::new();
        let t0 = Utc::now();
        let stale = Session::issue(UserId::new(), t0, ttl());
        let other = Session::issue(UserId::new(), t0, ttl());
        let token = stale.token.clone();
        store.insert(stale).unwrap();
        store.insert(other).unwrap();

        let validated = store.validate(&token, t0 + ttl(), ttl()).unwrap();
        assert!(validated.session.is_none());
        assert_eq!(validated.purged, 2);
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn a_session_dies_at_its_expiry_instant() {
        let store = SessionStore::new();
        let t0 = Utc::now();
        let session = Session::issue(UserId::new(), t0, ttl());
        let token = session.token.clone();
        store.insert(session).unwrap();

        let last_moment = t0 + ttl() - Duration::milliseconds(1);
        assert!(store.validate(&token, last_moment, ttl()).unwrap().session.is_some());

        let slid_until = last_moment + ttl();
        let validated = store.validate(&token, slid_until, ttl()).unwrap();
        assert!(validated.session.is_none());
        assert_eq!(validated.purged, 1);
    }

    #[test]
    fn revoke_user_drops_all_their_sessions() {
        let store = SessionStore::new();
        let user = UserId::new();
        let now = Utc::now();
        store.insert(Session::issue(user, now, ttl())).unwrap();
        store.insert(Session::issue(user, now, ttl())).unwrap();
        store.insert(Session::issue(UserId::new(), now, ttl())).unwrap();

        assert_eq!(store.revoke_user(user).unwrap(), 2);
        assert_eq!(store.len().unwrap(), 1);
    }
}
