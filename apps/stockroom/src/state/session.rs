//! # Session State
//!
//! Keeps the signed-in session across restarts and reacts to auth events.
//!
//! ## Event Handling
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  AuthState (backend) ── broadcast ──► SessionState::pump()              │
//! │                                                                         │
//! │  SignedIn(s)            → store "auth.session" = s                      │
//! │                           forget cached permissions                     │
//! │                           Login page? → Dashboard                       │
//! │  TokenRefreshed(s)      → store "auth.session" = s                      │
//! │  SignedOut              → remove "auth.session"                         │
//! │                           forget cached permissions                     │
//! │                           route reset to Login                          │
//! │  InitialSession(None)   → remove "auth.session"                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Events are drained with [`SessionState::pump`] after every auth call, so
//! the reaction is deterministic in the CLI and in tests. A long-running
//! process can additionally call [`SessionState::listen`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, info, warn};

use stockroom_backend::{load_permissions, AuthEvent, AuthUser, BackendError, Permissions, Session};

use super::backend::BackendState;
use super::route::{Route, RouteState};
use crate::storage::LocalStore;

pub const SESSION_KEY: &str = "auth.session";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Session persistence, auth-event reactions and the permission cache.
pub struct SessionState {
    backend: BackendState,
    store: Arc<LocalStore>,
    routes: Arc<RouteState>,
    permissions: Mutex<Option<Permissions>>,
    events: Mutex<broadcast::Receiver<AuthEvent>>,
}

impl SessionState {
    /// Subscribes to the backend's auth events right away so nothing
    /// emitted after construction is missed.
    pub fn new(backend: BackendState, store: Arc<LocalStore>, routes: Arc<RouteState>) -> Self {
        let events = backend.inner().auth().subscribe();
        SessionState {
            backend,
            store,
            routes,
            permissions: Mutex::new(None),
            events: Mutex::new(events),
        }
    }

    /// Restores the persisted session, refreshing it when expired, and
    /// sends the user to the login page when there is none.
    pub async fn start(&self) -> Option<Session> {
        let backend = self.backend.inner();
        let stored: Option<Session> = self.store.get(SESSION_KEY);

        match stored {
            Some(session) if session.is_expired() => {
                debug!(user = %session.user.id, "Stored session expired, refreshing");
                if let Err(err) = backend.restore_session(Some(session)).await {
                    warn!(error = %err, "Could not restore session");
                }
                if let Err(err) = backend.refresh_session().await {
                    warn!(error = %err, "Session refresh failed, signing out locally");
                    if let Err(err) = backend.restore_session(None).await {
                        warn!(error = %err, "Could not clear session");
                    }
                }
            }
            other => {
                if let Err(err) = backend.restore_session(other).await {
                    warn!(error = %err, "Could not restore session");
                }
            }
        }
        self.pump();

        let session = backend.auth().current();
        let route = self.routes.current();
        match &session {
            None if route.requires_session() => {
                debug!(%route, "No session, redirecting to login");
                self.routes.navigate(Route::Login);
            }
            Some(_) if route == Route::Login => {
                self.routes.navigate(Route::Dashboard);
            }
            _ => {}
        }
        session
    }

    /// Drains pending auth events. Returns how many were handled.
    pub fn pump(&self) -> usize {
        let mut handled = 0;
        loop {
            let next = lock(&self.events).try_recv();
            match next {
                Ok(event) => {
                    self.handle_event(&event);
                    handled += 1;
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Auth events dropped, resyncing from current session");
                    self.resync();
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        handled
    }

    /// Handles events as they arrive until the channel closes.
    pub fn listen(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        let mut events = self.backend.inner().auth().subscribe();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => self.handle_event(&event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Auth listener lagged");
                        self.resync();
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    pub fn handle_event(&self, event: &AuthEvent) {
        debug!(event = event.name(), "Handling auth event");
        match event {
            AuthEvent::SignedIn(session) => {
                self.persist(session);
                self.forget_permissions();
                if self.routes.current() == Route::Login {
                    self.routes.navigate(Route::Dashboard);
                }
                info!(user = %session.user.id, "Signed in");
            }
            AuthEvent::TokenRefreshed(session) => self.persist(session),
            AuthEvent::InitialSession(Some(session)) => self.persist(session),
            AuthEvent::InitialSession(None) => self.clear(),
            AuthEvent::SignedOut => {
                self.clear();
                self.forget_permissions();
                self.routes.reset(Route::Login);
                info!("Signed out");
            }
        }
    }

    fn resync(&self) {
        match self.backend.inner().auth().current() {
            Some(session) => self.persist(&session),
            None => self.clear(),
        }
        self.forget_permissions();
    }

    fn persist(&self, session: &Session) {
        if let Err(err) = self.store.set(SESSION_KEY, session) {
            warn!(error = %err, "Could not persist session");
        }
    }

    fn clear(&self) {
        if let Err(err) = self.store.remove(SESSION_KEY) {
            warn!(error = %err, "Could not clear persisted session");
        }
    }

    fn forget_permissions(&self) {
        *lock(&self.permissions) = None;
    }

    pub fn session(&self) -> Option<Session> {
        self.backend.inner().auth().current()
    }

    pub fn user(&self) -> Option<AuthUser> {
        self.session().map(|s| s.user)
    }

    /// The current session, or `Unauthorized`.
    pub fn require_session(&self) -> Result<Session, BackendError> {
        self.session().ok_or(BackendError::Unauthorized)
    }

    /// Permissions of the signed-in user, asked once per session.
    ///
    /// Signed out, everything is denied and nothing is cached.
    pub async fn permissions(&self) -> Permissions {
        if self.session().is_none() {
            return Permissions::default();
        }
        let cached = *lock(&self.permissions);
        if let Some(cached) = cached {
            return cached;
        }

        let loaded = load_permissions(self.backend.inner()).await;
        debug!(?loaded, "Permissions loaded");
        *lock(&self.permissions) = Some(loaded);
        loaded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use serde_json::json;
    use stockroom_backend::authz::{CAN_DELETE_RECORDS, CAN_VIEW_WHOLESALE_PRICES};
    use stockroom_backend::{Backend, Credentials, MemoryBackend};

    struct Fixture {
        memory: Arc<MemoryBackend>,
        store: Arc<LocalStore>,
        routes: Arc<RouteState>,
        session: SessionState,
    }

    fn fixture() -> Fixture {
        let memory = Arc::new(MemoryBackend::new());
        memory.add_user("owner@example.com", "secret");
        memory.set_rpc(CAN_DELETE_RECORDS, json!(true));
        memory.set_rpc(CAN_VIEW_WHOLESALE_PRICES, json!(false));

        let store = Arc::new(LocalStore::in_memory());
        let routes = Arc::new(RouteState::restore(store.clone()));
        let session = SessionState::new(BackendState::new(memory.clone()), store.clone(), routes.clone());
        Fixture {
            memory,
            store,
            routes,
            session,
        }
    }

    fn stored_session(expires_in_minutes: i64) -> Session {
        Session {
            access_token: "old-access".to_string(),
            refresh_token: "old-refresh".to_string(),
            expires_at: Utc::now() + Duration::minutes(expires_in_minutes),
            user: AuthUser {
                id: "user-1".to_string(),
                email: Some("owner@example.com".to_string()),
            },
        }
    }

    #[tokio::test]
    async fn test_start_without_session_goes_to_login() {
        let f = fixture();
        assert!(f.session.start().await.is_none());
        assert_eq!(f.routes.current(), Route::Login);
    }

    #[tokio::test]
    async fn test_sign_in_persists_and_leaves_login() {
        let f = fixture();
        f.session.start().await;

        f.memory
            .sign_in(&Credentials::new("owner@example.com", "secret"))
            .await
            .unwrap();
        assert_eq!(f.session.pump(), 1);

        assert_eq!(f.routes.current(), Route::Dashboard);
        let stored: Session = f.store.get(SESSION_KEY).unwrap();
        assert_eq!(Some(stored), f.session.session());
    }

    #[tokio::test]
    async fn test_valid_stored_session_is_restored() {
        let f = fixture();
        f.store.set(SESSION_KEY, &stored_session(60)).unwrap();
        f.routes.navigate(Route::Orders);

        let session = f.session.start().await.unwrap();
        assert_eq!(session.access_token, "old-access");
        assert_eq!(f.routes.current(), Route::Orders);
        assert!(!f.memory.calls().contains(&"refresh_session session".to_string()));
    }

    #[tokio::test]
    async fn test_expired_session_is_refreshed() {
        let f = fixture();
        f.store.set(SESSION_KEY, &stored_session(-5)).unwrap();

        let session = f.session.start().await.unwrap();
        assert_ne!(session.access_token, "old-access");
        assert!(!session.is_expired());

        let stored: Session = f.store.get(SESSION_KEY).unwrap();
        assert_eq!(stored.access_token, session.access_token);
    }

    #[tokio::test]
    async fn test_sign_out_clears_everything() {
        let f = fixture();
        f.store.set(SESSION_KEY, &stored_session(60)).unwrap();
        f.session.start().await;
        f.routes.navigate(Route::Clients);

        assert!(f.session.permissions().await.can_delete);

        f.memory.sign_out().await.unwrap();
        f.session.pump();

        assert!(f.store.get::<Session>(SESSION_KEY).is_none());
        assert_eq!(f.routes.current(), Route::Login);
        assert!(f.routes.history().is_empty());
        assert_eq!(f.session.permissions().await, Permissions::default());
        assert!(matches!(f.session.require_session(), Err(BackendError::Unauthorized)));
    }

    // lets the spawned listener catch up on a current-thread runtime
    async fn settle(mut done: impl FnMut() -> bool) -> bool {
        for _ in 0..100 {
            if done() {
                return true;
            }
            tokio::task::yield_now().await;
        }
        done()
    }

    #[tokio::test]
    async fn test_listener_clears_session_on_sign_out() {
        let f = fixture();
        f.store.set(SESSION_KEY, &stored_session(60)).unwrap();
        f.session.start().await;
        f.routes.navigate(Route::Inventory);

        let session = Arc::new(f.session);
        let listener = session.clone().listen();

        f.memory.sign_out().await.unwrap();
        assert!(settle(|| f.routes.current() == Route::Login).await);
        assert!(f.store.get::<Session>(SESSION_KEY).is_none());
        assert!(session.session().is_none());

        listener.abort();
    }

    #[tokio::test]
    async fn test_listener_resyncs_after_lag() {
        let f = fixture();
        f.session.start().await;
        let session = Arc::new(f.session);
        let listener = session.clone().listen();

        // more events than the channel holds before the listener runs
        for _ in 0..40 {
            f.memory
                .sign_in(&Credentials::new("owner@example.com", "secret"))
                .await
                .unwrap();
        }

        let current = session.session().unwrap();
        assert!(
            settle(|| f.store.get::<Session>(SESSION_KEY).as_ref() == Some(&current)).await
        );
        assert_eq!(f.routes.current(), Route::Dashboard);

        listener.abort();
    }

    #[tokio::test]
    async fn test_permissions_cached_per_session() {
        let f = fixture();
        f.store.set(SESSION_KEY, &stored_session(60)).unwrap();
        f.session.start().await;

        let first = f.session.permissions().await;
        assert!(first.can_delete);
        assert!(!first.can_view_wholesale);

        // the cached answer survives a server-side change
        f.memory.set_rpc(CAN_VIEW_WHOLESALE_PRICES, json!(true));
        assert!(!f.session.permissions().await.can_view_wholesale);

        // a fresh sign-in asks again
        f.memory
            .sign_in(&Credentials::new("owner@example.com", "secret"))
            .await
            .unwrap();
        f.session.pump();
        assert!(f.session.permissions().await.can_view_wholesale);
    }
}
