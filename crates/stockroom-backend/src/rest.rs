//! # REST Backend
//!
//! [`Backend`] over HTTP, for a PostgREST-style hosted backend with a
//! GoTrue-style auth service.
//!
//! ## Endpoints
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  select   GET    /rest/v1/{table}?select=*&col=eq.v&order=..&limit=..   │
//! │  insert   POST   /rest/v1/{table}          Prefer: return=representation│
//! │  update   PATCH  /rest/v1/{table}?col=eq.v Prefer: return=representation│
//! │  delete   DELETE /rest/v1/{table}?col=eq.v Prefer: return=representation│
//! │  rpc      POST   /rest/v1/rpc/{name}                                    │
//! │  sign in  POST   /auth/v1/token?grant_type=password                     │
//! │  refresh  POST   /auth/v1/token?grant_type=refresh_token                │
//! │  sign out POST   /auth/v1/logout                                        │
//! │                                                                         │
//! │  Every request: apikey: <anon key>                                      │
//! │                 Authorization: Bearer <access token | anon key>         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Requests are sent once. There is no retry or backoff; a failure goes
//! straight back to the page as a typed error.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::auth::{AuthEvent, AuthState, AuthUser, Credentials, Session};
use crate::backend::Backend;
use crate::error::{BackendError, BackendResult};
use crate::query::Query;

/// Default timeout for backend requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// =============================================================================
// Configuration
// =============================================================================

/// Where the backend lives and how to identify the project.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Project base URL, e.g. `https://abc.example.co`.
    pub url: Url,
    /// Public anonymous key; row-level security does the real gating.
    pub anon_key: String,
    pub timeout: Duration,
}

impl BackendConfig {
    /// Builds a config from user input, normalizing the URL.
    pub fn new(url: &str, anon_key: impl Into<String>) -> BackendResult<Self> {
        let anon_key = anon_key.into().trim().to_string();
        if anon_key.is_empty() {
            return Err(BackendError::Config("anon key is empty".to_string()));
        }

        // the trailing slash keeps a path prefix when endpoints are joined
        Ok(BackendConfig {
            url: Url::parse(&format!("{}/", normalize_url(url)))?,
            anon_key,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Trims, adds a scheme (http for localhost) and strips trailing slashes and
/// a trailing `/rest/v1`.
pub fn normalize_url(url: &str) -> String {
    let mut url = url.trim().to_string();

    if !url.starts_with("http://") && !url.starts_with("https://") {
        if url.starts_with("localhost") || url.starts_with("127.0.0.1") {
            url = format!("http://{url}");
        } else {
            url = format!("https://{url}");
        }
    }

    while url.ends_with('/') {
        url.pop();
    }
    if url.ends_with("/rest/v1") {
        url.truncate(url.len() - "/rest/v1".len());
    }
    while url.ends_with('/') {
        url.pop();
    }

    url
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    user: TokenUser,
}

#[derive(Debug, Deserialize)]
struct TokenUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

impl TokenResponse {
    fn into_session(self) -> Session {
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: Utc::now() + ChronoDuration::seconds(self.expires_in),
            user: AuthUser {
                id: self.user.id,
                email: self.user.email,
            },
        }
    }
}

// =============================================================================
// RestBackend
// =============================================================================

/// HTTP implementation of [`Backend`].
pub struct RestBackend {
    client: Client,
    config: BackendConfig,
    auth: AuthState,
}

impl RestBackend {
    pub fn new(config: BackendConfig) -> BackendResult<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;

        info!(url = %config.url, "REST backend configured");

        Ok(RestBackend {
            client,
            config,
            auth: AuthState::new(),
        })
    }

    fn endpoint(&self, path: &str) -> BackendResult<Url> {
        Ok(self.config.url.join(path)?)
    }

    /// Request with the project key and the current bearer token.
    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let bearer = self
            .auth
            .access_token()
            .unwrap_or_else(|| self.config.anon_key.clone());

        self.client
            .request(method, url)
            .header("apikey", &self.config.anon_key)
            .bearer_auth(bearer)
    }

    fn table_request(&self, method: Method, query: &Query, full: bool) -> BackendResult<RequestBuilder> {
        let url = self.endpoint(&format!("rest/v1/{}", query.table))?;
        let pairs = if full {
            query.to_query_pairs()
        } else {
            query.filter_pairs()
        };
        Ok(self
            .request(method, url)
            .query(&pairs)
            .header("Prefer", "return=representation"))
    }

    /// Sends the request and returns the JSON body (`Null` when empty).
    async fn send(&self, builder: RequestBuilder) -> BackendResult<Value> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(status_error(status, &body));
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }

    async fn token(&self, grant_type: &str, body: Value) -> BackendResult<Session> {
        let mut url = self.endpoint("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", grant_type);

        let builder = self
            .client
            .post(url)
            .header("apikey", &self.config.anon_key)
            .json(&body);

        let value = self.send(builder).await?;
        let token: TokenResponse = serde_json::from_value(value)?;
        Ok(token.into_session())
    }
}

#[async_trait]
impl Backend for RestBackend {
    fn name(&self) -> &str {
        "rest"
    }

    async fn select(&self, query: &Query) -> BackendResult<Vec<Value>> {
        debug!(table = %query.table, filters = query.filters.len(), "select");
        let builder = self.table_request(Method::GET, query, true)?;
        rows_from(self.send(builder).await?)
    }

    async fn insert(&self, table: &str, rows: Vec<Value>) -> BackendResult<Vec<Value>> {
        debug!(table, rows = rows.len(), "insert");
        let url = self.endpoint(&format!("rest/v1/{table}"))?;
        let builder = self
            .request(Method::POST, url)
            .header("Prefer", "return=representation")
            .json(&rows);
        rows_from(self.send(builder).await?)
    }

    async fn update(&self, query: &Query, patch: Value) -> BackendResult<Vec<Value>> {
        debug!(table = %query.table, "update");
        let builder = self.table_request(Method::PATCH, query, false)?.json(&patch);
        rows_from(self.send(builder).await?)
    }

    async fn delete(&self, query: &Query) -> BackendResult<Vec<Value>> {
        debug!(table = %query.table, "delete");
        let builder = self.table_request(Method::DELETE, query, false)?;
        rows_from(self.send(builder).await?)
    }

    async fn rpc(&self, name: &str, args: Value) -> BackendResult<Value> {
        debug!(rpc = name, "rpc");
        let url = self.endpoint(&format!("rest/v1/rpc/{name}"))?;
        let builder = self.request(Method::POST, url).json(&args);

        self.send(builder).await.map_err(|err| match err {
            BackendError::Http { message, .. } => BackendError::Rpc {
                name: name.to_string(),
                message,
            },
            other => other,
        })
    }

    async fn sign_in(&self, credentials: &Credentials) -> BackendResult<Session> {
        let body = json!({ "email": credentials.email, "password": credentials.password });

        let session = self
            .token("password", body)
            .await
            .map_err(|err| match err {
                // the auth service answers bad passwords with 400
                BackendError::Http { status: 400, .. } | BackendError::Unauthorized => {
                    BackendError::InvalidCredentials
                }
                other => other,
            })?;

        info!(user = %session.user.id, "Signed in");
        self.auth.apply(AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> BackendResult<()> {
        let result = match self.auth.access_token() {
            Some(_) => {
                let url = self.endpoint("auth/v1/logout")?;
                self.send(self.request(Method::POST, url)).await.map(|_| ())
            }
            None => Ok(()),
        };

        if let Err(err) = &result {
            warn!(error = %err, "Server sign-out failed, clearing local session anyway");
        }

        self.auth.apply(AuthEvent::SignedOut);
        info!("Signed out");
        result
    }

    async fn restore_session(&self, session: Option<Session>) -> BackendResult<()> {
        self.auth.apply(AuthEvent::InitialSession(session));
        Ok(())
    }

    async fn refresh_session(&self) -> BackendResult<Session> {
        let refresh_token = self
            .auth
            .current()
            .map(|s| s.refresh_token)
            .ok_or(BackendError::Unauthorized)?;

        let session = self
            .token("refresh_token", json!({ "refresh_token": refresh_token }))
            .await
            .map_err(|err| match err {
                BackendError::Http { status: 400, .. } => BackendError::Unauthorized,
                other => other,
            })?;

        self.auth.apply(AuthEvent::TokenRefreshed(session.clone()));
        Ok(session)
    }

    fn auth(&self) -> &AuthState {
        &self.auth
    }
}

// =============================================================================
// Response Mapping
// =============================================================================

/// Table endpoints answer with an array; tolerate a single object or nothing.
fn rows_from(value: Value) -> BackendResult<Vec<Value>> {
    match value {
        Value::Array(rows) => Ok(rows),
        Value::Null => Ok(Vec::new()),
        Value::Object(_) => Ok(vec![value]),
        other => Err(BackendError::Decode(format!("expected rows, got {other}"))),
    }
}

/// Maps an error status and body to a typed error.
fn status_error(status: StatusCode, body: &str) -> BackendError {
    let message = error_message(body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string()
    });

    match status.as_u16() {
        401 => BackendError::Unauthorized,
        403 => BackendError::Forbidden(message),
        404 => BackendError::NotFound {
            entity: "Resource".to_string(),
            id: message,
        },
        code => BackendError::Http {
            status: code,
            message,
        },
    }
}

/// Pulls the human message out of a PostgREST or auth-service error body.
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["message", "msg", "error_description", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url("abc.example.co/"), "https://abc.example.co");
        assert_eq!(normalize_url("localhost:54321"), "http://localhost:54321");
        assert_eq!(
            normalize_url(" https://abc.example.co/rest/v1/ "),
            "https://abc.example.co"
        );
    }

    #[test]
    fn test_config_rejects_empty_key() {
        assert!(matches!(
            BackendConfig::new("abc.example.co", "  "),
            Err(BackendError::Config(_))
        ));
        let config = BackendConfig::new("abc.example.co", "anon").unwrap();
        assert_eq!(config.url.as_str(), "https://abc.example.co/");
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_endpoint_join() {
        let backend = RestBackend::new(BackendConfig::new("abc.example.co", "anon").unwrap()).unwrap();
        assert_eq!(
            backend.endpoint("rest/v1/clients").unwrap().as_str(),
            "https://abc.example.co/rest/v1/clients"
        );
    }

    #[test]
    fn test_endpoint_join_keeps_path_prefix() {
        for input in ["https://host.example/api", "https://host.example/api/", "host.example/api/rest/v1"] {
            let config = BackendConfig::new(input, "anon").unwrap();
            assert_eq!(config.url.as_str(), "https://host.example/api/");

            let backend = RestBackend::new(config).unwrap();
            assert_eq!(
                backend.endpoint("rest/v1/rpc/can_delete_records").unwrap().as_str(),
                "https://host.example/api/rest/v1/rpc/can_delete_records"
            );
        }
    }

    #[test]
    fn test_status_mapping() {
        let body = r#"{"code":"42501","message":"permission denied for table clients"}"#;

        assert!(matches!(status_error(StatusCode::UNAUTHORIZED, ""), BackendError::Unauthorized));
        match status_error(StatusCode::FORBIDDEN, body) {
            BackendError::Forbidden(message) => {
                assert_eq!(message, "permission denied for table clients")
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            status_error(StatusCode::NOT_FOUND, "{}"),
            BackendError::NotFound { .. }
        ));
        match status_error(StatusCode::CONFLICT, r#"{"msg":"duplicate"}"#) {
            BackendError::Http { status, message } => {
                assert_eq!(status, 409);
                assert_eq!(message, "duplicate");
            }
            other => panic!("unexpected {other:?}"),
        }
        match status_error(StatusCode::BAD_GATEWAY, "<html>") {
            BackendError::Http { message, .. } => assert_eq!(message, "Bad Gateway"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_rows_from() {
        assert_eq!(rows_from(Value::Null).unwrap().len(), 0);
        assert_eq!(rows_from(json!([{"id": 1}, {"id": 2}])).unwrap().len(), 2);
        assert_eq!(rows_from(json!({"id": 1})).unwrap().len(), 1);
        assert!(rows_from(json!(true)).is_err());
    }

    #[test]
    fn test_token_response_into_session() {
        let token: TokenResponse = serde_json::from_value(json!({
            "access_token": "a",
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "r",
            "user": {"id": "u1", "email": "owner@example.com", "role": "authenticated"}
        }))
        .unwrap();

        let session = token.into_session();
        assert_eq!(session.user.id, "u1");
        assert!(!session.is_expired());
    }
}
