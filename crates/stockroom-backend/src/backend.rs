//! # Backend Contract
//!
//! The operations the hosted backend-as-a-service offers, behind one trait so
//! the pages run the same against the HTTP backend and the in-memory one.
//!
//! ```text
//! ┌──────────────────────┐        ┌──────────────────────────────────────┐
//! │  Repositories        │        │  dyn Backend                         │
//! │  Authz checks        │───────►│    select / insert / update / delete │
//! │  SessionState (app)  │        │    rpc                               │
//! └──────────────────────┘        │    sign_in / sign_out / refresh      │
//!                                 └──────────┬─────────────────┬─────────┘
//!                                            │                 │
//!                                   RestBackend (reqwest)   MemoryBackend
//! ```
//!
//! Rows cross this boundary as `serde_json::Value`; [`decode_rows`] and
//! [`encode_rows`] convert to and from the typed rows of `stockroom-core`.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::auth::{AuthState, Credentials, Session};
use crate::error::{BackendError, BackendResult};
use crate::query::Query;

/// A backend-as-a-service: table access, remote procedures and auth.
///
/// Authorization is enforced by the backend (row-level security); callers
/// only see the resulting `Forbidden` / `Unauthorized` errors.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Short name for logs ("rest", "memory").
    fn name(&self) -> &str;

    /// Rows matching the query, in query order.
    async fn select(&self, query: &Query) -> BackendResult<Vec<Value>>;

    /// Inserts rows and returns them as stored.
    async fn insert(&self, table: &str, rows: Vec<Value>) -> BackendResult<Vec<Value>>;

    /// Applies `patch` to every row matching the query filters; returns the
    /// updated rows.
    async fn update(&self, query: &Query, patch: Value) -> BackendResult<Vec<Value>>;

    /// Deletes every row matching the query filters; returns the deleted rows.
    async fn delete(&self, query: &Query) -> BackendResult<Vec<Value>>;

    /// Calls a remote procedure with named JSON arguments.
    async fn rpc(&self, name: &str, args: Value) -> BackendResult<Value>;

    /// Password sign-in. Emits `SignedIn`.
    async fn sign_in(&self, credentials: &Credentials) -> BackendResult<Session>;

    /// Ends the session. Emits `SignedOut` even when the server call fails.
    async fn sign_out(&self) -> BackendResult<()>;

    /// Installs a previously persisted session. Emits `InitialSession`.
    async fn restore_session(&self, session: Option<Session>) -> BackendResult<()>;

    /// Exchanges the refresh token for a new session. Emits `TokenRefreshed`.
    async fn refresh_session(&self) -> BackendResult<Session>;

    /// Current session and change notifications.
    fn auth(&self) -> &AuthState;
}

// =============================================================================
// Typed Row Helpers
// =============================================================================

/// Decodes JSON rows into typed rows.
pub fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>) -> BackendResult<Vec<T>> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(BackendError::from))
        .collect()
}

/// Decodes the first row, or `NotFound`.
pub fn decode_one<T: DeserializeOwned>(
    rows: Vec<Value>,
    entity: &str,
    id: &str,
) -> BackendResult<T> {
    let row = rows
        .into_iter()
        .next()
        .ok_or_else(|| BackendError::not_found(entity, id))?;
    Ok(serde_json::from_value(row)?)
}

/// Encodes typed rows for insert.
pub fn encode_rows<T: Serialize>(rows: &[T]) -> BackendResult<Vec<Value>> {
    rows.iter()
        .map(|row| serde_json::to_value(row).map_err(BackendError::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Row {
        id: String,
        qty: i64,
    }

    #[test]
    fn test_decode_rows() {
        let rows = vec![json!({"id": "a", "qty": 1}), json!({"id": "b", "qty": 2})];
        let decoded: Vec<Row> = decode_rows(rows).unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[1].id, "b");
    }

    #[test]
    fn test_decode_rows_shape_mismatch() {
        let rows = vec![json!({"id": "a"})];
        let result: BackendResult<Vec<Row>> = decode_rows(rows);
        assert!(matches!(result, Err(BackendError::Decode(_))));
    }

    #[test]
    fn test_decode_one_missing() {
        let result: BackendResult<Row> = decode_one(Vec::new(), "Client", "c1");
        assert!(matches!(result, Err(BackendError::NotFound { .. })));
    }

    #[test]
    fn test_encode_rows() {
        let rows = encode_rows(&[Row { id: "a".into(), qty: 3 }]).unwrap();
        assert_eq!(rows, vec![json!({"id": "a", "qty": 3})]);
    }
}
