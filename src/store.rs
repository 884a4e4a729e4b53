//! In-memory session store
//!
//! Sessions live in a map guarded by an async read-write lock, each behind
//! its own mutex so that one busy session never stalls another. The map lock
//! is only held long enough to find or insert an entry.

use std::{collections::HashMap, sync::Arc};

use tokio::{
    sync::{Mutex, RwLock},
    task::JoinHandle,
};
use tracing::{debug, info};
use web_time::{Duration, Instant};

use super::{
    error::Error,
    session::{Session, SessionOptions},
    session_id::SessionId,
};

struct Entry {
    /// Copied out of the session so expiry never waits on the session mutex
    created_at: Instant,
    session: Arc<Mutex<Session>>,
}

/// All live sessions of a server
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionId, Entry>>,
    max_sessions: usize,
}

impl SessionStore {
    /// Creates an empty store holding at most `max_sessions` sessions
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_sessions,
        }
    }

    /// Starts a new session and returns its id
    ///
    /// # Errors
    ///
    /// * `Error::TooManySessions` - the store is full
    /// * `Error::Session` - the options were rejected
    pub async fn start(&self, options: SessionOptions) -> Result<SessionId, Error> {
        let session = Session::new(options)?;
        let created_at = session.created_at();

        let mut sessions = self.sessions.write().await;
        if sessions.len() >= self.max_sessions {
            return Err(Error::TooManySessions);
        }
        let id = loop {
            let id = SessionId::new();
            if !sessions.contains_key(&id) {
                break id;
            }
        };
        sessions.insert(
            id,
            Entry {
                created_at,
                session: Arc::new(Mutex::new(session)),
            },
        );
        info!(session = %id, teams = options.team_count, "session started");
        Ok(id)
    }

    /// Whether a session with this id is live
    pub async fn contains(&self, id: SessionId) -> bool {
        self.sessions.read().await.contains_key(&id)
    }

    /// Number of live sessions
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether the store holds no sessions
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Runs `f` with exclusive access to a session
    ///
    /// # Errors
    ///
    /// Returns `Error::SessionNotFound` if no session has this id.
    pub async fn with_session<R, F>(&self, id: SessionId, f: F) -> Result<R, Error>
    where
        F: FnOnce(&mut Session) -> R,
    {
        let session = self
            .sessions
            .read()
            .await
            .get(&id)
            .map(|entry| Arc::clone(&entry.session))
            .ok_or(Error::SessionNotFound)?;

        let mut session = session.lock().await;
        Ok(f(&mut session))
    }

    /// Closes a session
    ///
    /// # Errors
    ///
    /// Returns `Error::SessionNotFound` if no session has this id.
    pub async fn close(&self, id: SessionId) -> Result<(), Error> {
        match self.sessions.write().await.remove(&id) {
            Some(_) => {
                info!(session = %id, "session closed");
                Ok(())
            }
            None => Err(Error::SessionNotFound),
        }
    }

    /// Removes every session at least `ttl` old at `now`
    ///
    /// # Returns
    ///
    /// The number of sessions removed
    pub async fn cleanup_expired(&self, now: Instant, ttl: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|id, entry| {
            let keep = now.saturating_duration_since(entry.created_at) < ttl;
            if !keep {
                debug!(session = %id, "session expired");
            }
            keep
        });
        before - sessions.len()
    }
}

/// Spawns the task that sweeps expired sessions every `interval`
pub fn spawn_cleanup(store: Arc<SessionStore>, interval: Duration, ttl: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let removed = store.cleanup_expired(Instant::now(), ttl).await;
            if removed > 0 {
                let remaining = store.len().await;
                info!(removed, remaining, "expired sessions removed");
            }
        }
    })
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::buzzer::BuzzOutcome;

    #[tokio::test]
    async fn test_start_and_close() {
        let store = SessionStore::new(4);
        let id = store.start(SessionOptions::default()).await.unwrap();
        assert!(store.contains(id).await);
        assert_eq!(store.len().await, 1);

        store.close(id).await.unwrap();
        assert!(!store.contains(id).await);
        assert_eq!(store.close(id).await, Err(Error::SessionNotFound));
    }

    #[tokio::test]
    async fn test_capacity() {
        let store = SessionStore::new(2);
        store.start(SessionOptions::default()).await.unwrap();
        store.start(SessionOptions::default()).await.unwrap();
        assert_eq!(
            store.start(SessionOptions::default()).await,
            Err(Error::TooManySessions)
        );
    }

    #[tokio::test]
    async fn test_with_unknown_session() {
        let store = SessionStore::new(2);
        let result = store.with_session(SessionId::new(), |s| s.snapshot()).await;
        assert_eq!(result, Err(Error::SessionNotFound));
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = SessionStore::new(4);
        let a = store.start(SessionOptions::default()).await.unwrap();
        let b = store.start(SessionOptions::default()).await.unwrap();

        store.with_session(a, |s| s.buzz(0)).await.unwrap().unwrap();
        let b_locked = store.with_session(b, |s| s.snapshot().buzz_lock).await.unwrap();
        assert!(!b_locked);
    }

    #[tokio::test]
    async fn test_cleanup_expired() {
        let store = SessionStore::new(4);
        let id = store.start(SessionOptions::default()).await.unwrap();
        let ttl = Duration::from_secs(3600);

        assert_eq!(store.cleanup_expired(Instant::now(), ttl).await, 0);
        assert!(store.contains(id).await);

        let later = Instant::now() + ttl;
        assert_eq!(store.cleanup_expired(later, ttl).await, 1);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_cleanup_does_not_wait_on_busy_session() {
        let store = Arc::new(SessionStore::new(4));
        let id = store.start(SessionOptions::default()).await.unwrap();

        let session = store
            .sessions
            .read()
            .await
            .get(&id)
            .map(|e| Arc::clone(&e.session))
            .unwrap();
        let _guard = session.lock().await;

        let ttl = Duration::from_secs(1);
        let removed = tokio::time::timeout(
            std::time::Duration::from_secs(1),
            store.cleanup_expired(Instant::now() + ttl, ttl),
        )
        .await
        .unwrap();
        assert_eq!(removed, 1);
    }

    #[tokio::test]
    async fn test_spawned_cleanup_removes_expired_sessions() {
        let store = Arc::new(SessionStore::new(4));
        store.start(SessionOptions::default()).await.unwrap();

        let handle = spawn_cleanup(
            Arc::clone(&store),
            Duration::from_millis(10),
            Duration::ZERO,
        );
        let emptied = tokio::time::timeout(std::time::Duration::from_secs(5), async {
            while !store.is_empty().await {
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            }
        })
        .await;
        handle.abort();
        assert!(emptied.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_buzzes_have_one_winner() {
        let store = Arc::new(SessionStore::new(4));
        let id = store
            .start(SessionOptions {
                team_count: 8,
                name_style: None,
            })
            .await
            .unwrap();

        let handles = (0..8)
            .map(|team| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.with_session(id, |s| s.buzz(team)).await })
            })
            .collect::<Vec<_>>();

        let mut winners = Vec::new();
        for (team, handle) in handles.into_iter().enumerate() {
            if let Ok(Ok(BuzzOutcome::Won { .. })) = handle.await.unwrap() {
                winners.push(team);
            }
        }
        assert_eq!(winners.len(), 1);

        let owner = store
            .with_session(id, |s| s.buzz_lock().owner())
            .await
            .unwrap();
        assert_eq!(owner, Some(winners[0]));
    }
}
