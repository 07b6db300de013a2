//! Customer authentication session.
//!
//! [`AuthSession`] holds the bearer token and tells interested components
//! when it changes. Presence of a token is the only thing that decides
//! whether the cart lives locally or on the server.
//!
//! Observers are notified in subscription order, and `set_token` /
//! `clear_token` return only after every observer has handled the change.
//! The session keeps weak references, so subscribing never keeps an
//! observer alive.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};

use crate::storage::{KeyValueStore, StorageError, keys};

/// A change in authentication state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthChange {
    /// A token was stored.
    SignedIn,
    /// The token was cleared.
    SignedOut,
}

/// Receives authentication changes.
#[async_trait]
pub trait AuthObserver: Send + Sync {
    /// Handle a change. Runs before the triggering call returns.
    async fn on_auth_change(&self, change: AuthChange);
}

/// Handle returned by [`AuthSession::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// The process-wide authentication state.
pub struct AuthSession {
    store: Arc<dyn KeyValueStore>,
    token: RwLock<Option<SecretString>>,
    observers: Mutex<Vec<(SubscriptionId, Weak<dyn AuthObserver>)>>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("authenticated", &self.is_authenticated())
            .field("observers", &self.observer_count())
            .finish_non_exhaustive()
    }
}

impl AuthSession {
    /// Create a signed-out session backed by `store`.
    ///
    /// Does not read the store; use [`AuthSession::restore`] to pick up a
    /// previously saved token.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            token: RwLock::new(None),
            observers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Create a session, loading any token persisted in `store`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn restore(store: Arc<dyn KeyValueStore>) -> Result<Self, StorageError> {
        let token = store
            .get(keys::AUTH_TOKEN)?
            .map(|t| t.trim().to_owned())
            .filter(|t| !t.is_empty())
            .map(SecretString::from);

        debug!(authenticated = token.is_some(), "Restored auth session");
        let session = Self::new(store);
        *session.token.write().unwrap_or_else(PoisonError::into_inner) = token;
        Ok(session)
    }

    /// Whether a token is present.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// The current bearer token, if any.
    #[must_use]
    pub fn bearer(&self) -> Option<SecretString> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Store a new token and notify observers.
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be persisted. In that case the
    /// session is unchanged and no observer is notified.
    pub async fn set_token(&self, token: SecretString) -> Result<(), StorageError> {
        self.store.set(keys::AUTH_TOKEN, token.expose_secret())?;
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token);
        info!("Signed in");
        self.notify(AuthChange::SignedIn).await;
        Ok(())
    }

    /// Clear the token and notify observers.
    ///
    /// Observers are notified even if no token was present.
    ///
    /// # Errors
    ///
    /// Returns an error if the persisted token cannot be removed. In that
    /// case the session is unchanged and no observer is notified.
    pub async fn clear_token(&self) -> Result<(), StorageError> {
        self.store.remove(keys::AUTH_TOKEN)?;
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
        info!("Signed out");
        self.notify(AuthChange::SignedOut).await;
        Ok(())
    }

    /// Subscribe to authentication changes.
    ///
    /// The session only holds a weak reference: dropping the last `Arc` to
    /// the observer ends the subscription.
    pub fn subscribe<O>(&self, observer: &Arc<O>) -> SubscriptionId
    where
        O: AuthObserver + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let observer: Arc<dyn AuthObserver> = observer.clone();
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::downgrade(&observer)));
        debug!(subscription = id.0, "Auth observer subscribed");
        id
    }

    /// Remove a subscription. Returns `false` if it was not active.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self.observers.lock().unwrap_or_else(PoisonError::into_inner);
        let before = observers.len();
        observers.retain(|(sub, _)| *sub != id);
        observers.len() != before
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(_, observer)| observer.strong_count() > 0)
            .count()
    }

    async fn notify(&self, change: AuthChange) {
        // Collect live observers first; the lock is not held across `.await`
        let live: Vec<Arc<dyn AuthObserver>> = {
            let mut observers = self.observers.lock().unwrap_or_else(PoisonError::into_inner);
            observers.retain(|(_, observer)| observer.strong_count() > 0);
            observers
                .iter()
                .filter_map(|(_, observer)| observer.upgrade())
                .collect()
        };

        debug!(?change, observers = live.len(), "Notifying auth observers");
        for observer in live {
            observer.on_auth_change(change).await;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<AuthChange>>,
    }

    impl Recorder {
        fn seen(&self) -> Vec<AuthChange> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AuthObserver for Recorder {
        async fn on_auth_change(&self, change: AuthChange) {
            self.seen.lock().unwrap().push(change);
        }
    }

    fn session() -> (Arc<MemoryStore>, AuthSession) {
        let store = Arc::new(MemoryStore::new());
        let session = AuthSession::new(store.clone());
        (store, session)
    }

    #[tokio::test]
    async fn test_set_and_clear_token_persist() {
        let (store, session) = session();
        assert!(!session.is_authenticated());

        session.set_token(SecretString::from("t-1")).await.unwrap();
        assert!(session.is_authenticated());
        assert_eq!(store.get(keys::AUTH_TOKEN).unwrap().as_deref(), Some("t-1"));
        assert_eq!(session.bearer().unwrap().expose_secret(), "t-1");

        session.clear_token().await.unwrap();
        assert!(!session.is_authenticated());
        assert_eq!(store.get(keys::AUTH_TOKEN).unwrap(), None);
    }

    #[tokio::test]
    async fn test_restore_reads_token() {
        let store = Arc::new(MemoryStore::with_entries([(keys::AUTH_TOKEN, "saved\n")]));
        let session = AuthSession::restore(store).unwrap();
        assert_eq!(session.bearer().unwrap().expose_secret(), "saved");

        let blank = Arc::new(MemoryStore::with_entries([(keys::AUTH_TOKEN, "  ")]));
        assert!(!AuthSession::restore(blank).unwrap().is_authenticated());
    }

    #[tokio::test]
    async fn test_observers_are_notified_independently() {
        let (_store, session) = session();
        let first = Arc::new(Recorder::default());
        let second = Arc::new(Recorder::default());

        let first_id = session.subscribe(&first);
        session.subscribe(&second);
        assert_eq!(session.observer_count(), 2);

        session.set_token(SecretString::from("t")).await.unwrap();
        assert!(session.unsubscribe(first_id));
        assert!(!session.unsubscribe(first_id));
        session.clear_token().await.unwrap();

        assert_eq!(first.seen(), vec![AuthChange::SignedIn]);
        assert_eq!(
            second.seen(),
            vec![AuthChange::SignedIn, AuthChange::SignedOut]
        );
    }

    #[tokio::test]
    async fn test_dropped_observer_is_pruned() {
        let (_store, session) = session();
        let observer = Arc::new(Recorder::default());
        session.subscribe(&observer);
        drop(observer);

        assert_eq!(session.observer_count(), 0);
        session.clear_token().await.unwrap();
    }

    #[test]
    fn test_debug_hides_token() {
        let store = Arc::new(MemoryStore::with_entries([(keys::AUTH_TOKEN, "very-secret")]));
        let session = AuthSession::restore(store).unwrap();
        let debug = format!("{session:?}");
        assert!(debug.contains("authenticated: true"));
        assert!(!debug.contains("very-secret"));
    }
}
