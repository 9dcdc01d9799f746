//! # Auth State
//!
//! The signed-in session and the stream of auth-state change notifications.
//!
//! ## Event Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Backend::sign_in / sign_out / restore_session / refresh_session        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  AuthState::apply(event)                                                │
//! │       ├── updates the current session (RwLock)                          │
//! │       └── broadcasts the event                                          │
//! │               │                                                         │
//! │               ├──► SessionState (app)  persists / clears the session    │
//! │               └──► any other subscriber                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use tokio::sync::broadcast;

/// Buffered events per subscriber before the slowest one starts lagging.
const EVENT_CAPACITY: usize = 16;

/// Sessions this close to expiry are refreshed before use.
const EXPIRY_MARGIN_SECONDS: i64 = 30;

/// The signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Tokens issued by the backend's auth service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub user: AuthUser,
}

impl Session {
    /// Whether the access token is expired (or about to be) at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - Duration::seconds(EXPIRY_MARGIN_SECONDS) <= now
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// E-mail / password pair for password sign-in.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials {
            email: email.into().trim().to_string(),
            password: password.into(),
        }
    }
}

// never print the password
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

/// Auth-state change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    /// A session (or none) was restored at startup.
    InitialSession(Option<Session>),
    SignedIn(Session),
    SignedOut,
    TokenRefreshed(Session),
}

impl AuthEvent {
    /// The session in force after this event.
    pub fn session(&self) -> Option<&Session> {
        match self {
            AuthEvent::InitialSession(session) => session.as_ref(),
            AuthEvent::SignedIn(session) | AuthEvent::TokenRefreshed(session) => Some(session),
            AuthEvent::SignedOut => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AuthEvent::InitialSession(_) => "initial_session",
            AuthEvent::SignedIn(_) => "signed_in",
            AuthEvent::SignedOut => "signed_out",
            AuthEvent::TokenRefreshed(_) => "token_refreshed",
        }
    }
}

/// Current session plus the notification channel, shared by a backend.
#[derive(Debug)]
pub struct AuthState {
    session: RwLock<Option<Session>>,
    events: broadcast::Sender<AuthEvent>,
}

impl Default for AuthState {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthState {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        AuthState {
            session: RwLock::new(None),
            events,
        }
    }

    /// The current session, if any.
    pub fn current(&self) -> Option<Session> {
        self.session
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn access_token(&self) -> Option<String> {
        self.current().map(|s| s.access_token)
    }

    pub fn is_signed_in(&self) -> bool {
        self.current().is_some()
    }

    /// Subscribes to auth-state changes.
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    /// Records the event's session and notifies subscribers.
    pub fn apply(&self, event: AuthEvent) {
        let next = event.session().cloned();
        match self.session.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }

        tracing::debug!(event = event.name(), "Auth state changed");

        // no subscribers is fine
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(expires_in_minutes: i64) -> Session {
        Session {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: Utc::now() + Duration::minutes(expires_in_minutes),
            user: AuthUser {
                id: "user-1".to_string(),
                email: Some("owner@example.com".to_string()),
            },
        }
    }

    #[test]
    fn test_session_expiry_margin() {
        assert!(!session(60).is_expired());
        assert!(session(-1).is_expired());

        let s = session(0);
        assert!(s.is_expired_at(s.expires_at - Duration::seconds(10)));
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let creds = Credentials::new(" a@b.c ", "hunter2");
        assert_eq!(creds.email, "a@b.c");
        assert!(!format!("{:?}", creds).contains("hunter2"));
    }

    #[tokio::test]
    async fn test_apply_updates_and_broadcasts() {
        let state = AuthState::new();
        let mut events = state.subscribe();

        state.apply(AuthEvent::SignedIn(session(60)));
        assert!(state.is_signed_in());
        assert_eq!(state.access_token().as_deref(), Some("access"));
        assert!(matches!(events.recv().await, Ok(AuthEvent::SignedIn(_))));

        state.apply(AuthEvent::SignedOut);
        assert!(!state.is_signed_in());
        assert_eq!(events.recv().await.ok(), Some(AuthEvent::SignedOut));
    }

    #[test]
    fn test_apply_without_subscribers() {
        let state = AuthState::new();
        state.apply(AuthEvent::InitialSession(None));
        assert!(state.current().is_none());
    }
}
