//! # In-Memory Backend
//!
//! A [`Backend`] that keeps every table as a list of JSON rows in process
//! memory. Used by the tests of every layer and by the `--offline` demo mode.
//!
//! Besides plain storage it can:
//! - answer RPCs with configured values (or failures)
//! - sign in users added with [`MemoryBackend::add_user`]
//! - fail the next insert into a table, once ([`MemoryBackend::fail_next_insert`])
//! - record every call, in order ([`MemoryBackend::calls`])

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::auth::{AuthEvent, AuthState, AuthUser, Credentials, Session};
use crate::backend::{encode_rows, Backend};
use crate::error::{BackendError, BackendResult};
use crate::query::Query;

/// Lifetime of sessions issued by the memory backend.
const SESSION_MINUTES: i64 = 60;

#[derive(Debug, Clone)]
struct MemoryUser {
    password: String,
    user: AuthUser,
}

/// In-memory implementation of [`Backend`].
#[derive(Debug, Default)]
pub struct MemoryBackend {
    tables: Mutex<HashMap<String, Vec<Value>>>,
    rpcs: Mutex<HashMap<String, Result<Value, String>>>,
    users: Mutex<HashMap<String, MemoryUser>>,
    insert_failures: Mutex<HashMap<String, String>>,
    calls: Mutex<Vec<String>>,
    require_session: bool,
    auth: AuthState,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects table access and RPCs with `Unauthorized` while signed out,
    /// like a backend whose policies only admit authenticated users.
    pub fn requiring_session(mut self) -> Self {
        self.require_session = true;
        self
    }

    // -------------------------------------------------------------------------
    // Setup
    // -------------------------------------------------------------------------

    /// Appends raw rows to a table.
    pub fn seed(&self, table: &str, rows: Vec<Value>) {
        lock(&self.tables)
            .entry(table.to_string())
            .or_default()
            .extend(rows);
    }

    /// Appends typed rows to a table.
    pub fn seed_rows<T: Serialize>(&self, table: &str, rows: &[T]) -> BackendResult<()> {
        self.seed(table, encode_rows(rows)?);
        Ok(())
    }

    /// Sets the value an RPC returns.
    pub fn set_rpc(&self, name: &str, value: Value) {
        lock(&self.rpcs).insert(name.to_string(), Ok(value));
    }

    /// Makes an RPC fail with `message`.
    pub fn fail_rpc(&self, name: &str, message: &str) {
        lock(&self.rpcs).insert(name.to_string(), Err(message.to_string()));
    }

    /// Registers a user for password sign-in; returns the user id.
    pub fn add_user(&self, email: &str, password: &str) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        lock(&self.users).insert(
            email.to_lowercase(),
            MemoryUser {
                password: password.to_string(),
                user: AuthUser {
                    id: id.clone(),
                    email: Some(email.to_string()),
                },
            },
        );
        id
    }

    /// The next insert into `table` fails with a 500 carrying `message`.
    pub fn fail_next_insert(&self, table: &str, message: &str) {
        lock(&self.insert_failures).insert(table.to_string(), message.to_string());
    }

    // -------------------------------------------------------------------------
    // Inspection
    // -------------------------------------------------------------------------

    /// Current rows of a table, in storage order.
    pub fn rows(&self, table: &str) -> Vec<Value> {
        lock(&self.tables).get(table).cloned().unwrap_or_default()
    }

    /// Every call so far, as `"<op> <target>"` (e.g. `"insert orders"`).
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    fn record(&self, op: &str, target: &str) {
        lock(&self.calls).push(format!("{op} {target}"));
    }

    fn check_session(&self) -> BackendResult<()> {
        if self.require_session && !self.auth.is_signed_in() {
            return Err(BackendError::Unauthorized);
        }
        Ok(())
    }

    fn issue_session(user: AuthUser) -> Session {
        Session {
            access_token: uuid::Uuid::new_v4().to_string(),
            refresh_token: uuid::Uuid::new_v4().to_string(),
            expires_at: Utc::now() + Duration::minutes(SESSION_MINUTES),
            user,
        }
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    async fn select(&self, query: &Query) -> BackendResult<Vec<Value>> {
        self.record("select", &query.table);
        self.check_session()?;

        let mut rows: Vec<Value> = lock(&self.tables)
            .get(&query.table)
            .map(|rows| rows.iter().filter(|r| query.matches(r)).cloned().collect())
            .unwrap_or_default();

        query.sort(&mut rows);
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn insert(&self, table: &str, rows: Vec<Value>) -> BackendResult<Vec<Value>> {
        self.record("insert", table);
        self.check_session()?;

        if let Some(message) = lock(&self.insert_failures).remove(table) {
            return Err(BackendError::Http {
                status: 500,
                message,
            });
        }

        let mut tables = lock(&self.tables);
        let stored = tables.entry(table.to_string()).or_default();

        let mut inserted = Vec::with_capacity(rows.len());
        for row in rows {
            let Value::Object(mut fields) = row else {
                return Err(BackendError::Http {
                    status: 400,
                    message: "row must be a JSON object".to_string(),
                });
            };

            let id = fields
                .entry("id")
                .or_insert_with(|| Value::String(uuid::Uuid::new_v4().to_string()))
                .clone();
            fields
                .entry("created_at")
                .or_insert_with(|| Value::String(Utc::now().to_rfc3339()));

            if stored.iter().any(|r| r.get("id") == Some(&id)) {
                return Err(BackendError::Http {
                    status: 409,
                    message: format!("duplicate key value violates unique constraint ({table}.id)"),
                });
            }
            inserted.push(Value::Object(fields));
        }

        stored.extend(inserted.iter().cloned());
        Ok(inserted)
    }

    async fn update(&self, query: &Query, patch: Value) -> BackendResult<Vec<Value>> {
        self.record("update", &query.table);
        self.check_session()?;

        let Value::Object(patch) = patch else {
            return Err(BackendError::Http {
                status: 400,
                message: "patch must be a JSON object".to_string(),
            });
        };

        let mut tables = lock(&self.tables);
        let mut updated = Vec::new();
        if let Some(rows) = tables.get_mut(&query.table) {
            for row in rows.iter_mut().filter(|r| query.matches(r)) {
                if let Value::Object(fields) = row {
                    merge(fields, &patch);
                }
                updated.push(row.clone());
            }
        }
        Ok(updated)
    }

    async fn delete(&self, query: &Query) -> BackendResult<Vec<Value>> {
        self.record("delete", &query.table);
        self.check_session()?;

        let mut tables = lock(&self.tables);
        let Some(rows) = tables.get_mut(&query.table) else {
            return Ok(Vec::new());
        };

        let (deleted, kept): (Vec<Value>, Vec<Value>) =
            rows.drain(..).partition(|r| query.matches(r));
        *rows = kept;
        Ok(deleted)
    }

    async fn rpc(&self, name: &str, _args: Value) -> BackendResult<Value> {
        self.record("rpc", name);
        self.check_session()?;

        match lock(&self.rpcs).get(name) {
            Some(Ok(value)) => Ok(value.clone()),
            Some(Err(message)) => Err(BackendError::Rpc {
                name: name.to_string(),
                message: message.clone(),
            }),
            None => Err(BackendError::Rpc {
                name: name.to_string(),
                message: "function not found".to_string(),
            }),
        }
    }

    async fn sign_in(&self, credentials: &Credentials) -> BackendResult<Session> {
        self.record("sign_in", &credentials.email);

        let user = lock(&self.users)
            .get(&credentials.email.to_lowercase())
            .filter(|u| u.password == credentials.password)
            .map(|u| u.user.clone())
            .ok_or(BackendError::InvalidCredentials)?;

        let session = Self::issue_session(user);
        self.auth.apply(AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> BackendResult<()> {
        self.record("sign_out", "session");
        self.auth.apply(AuthEvent::SignedOut);
        Ok(())
    }

    async fn restore_session(&self, session: Option<Session>) -> BackendResult<()> {
        self.record("restore_session", "session");
        self.auth.apply(AuthEvent::InitialSession(session));
        Ok(())
    }

    async fn refresh_session(&self) -> BackendResult<Session> {
        self.record("refresh_session", "session");

        let current = self.auth.current().ok_or(BackendError::Unauthorized)?;
        let session = Self::issue_session(current.user);
        self.auth.apply(AuthEvent::TokenRefreshed(session.clone()));
        Ok(session)
    }

    fn auth(&self) -> &AuthState {
        &self.auth
    }
}

fn merge(fields: &mut Map<String, Value>, patch: &Map<String, Value>) {
    for (key, value) in patch {
        fields.insert(key.clone(), value.clone());
    }
}
