//! # Authorization Checks
//!
//! The backend decides who may delete records and who may see wholesale
//! prices. The client asks through two remote procedures and obeys the
//! answer; row-level security still guards the tables themselves.
//!
//! ```text
//! rpc("can_delete_records")         ──► true / false ──┐
//! rpc("can_view_wholesale_prices")  ──► true / false ──┴──► Permissions
//!
//! RPC error or non-boolean answer ──► false (logged)
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

use crate::backend::Backend;
use crate::error::{BackendError, BackendResult};

pub const CAN_DELETE_RECORDS: &str = "can_delete_records";
pub const CAN_VIEW_WHOLESALE_PRICES: &str = "can_view_wholesale_prices";

/// What the signed-in user may do, as answered by the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    pub can_delete: bool,
    pub can_view_wholesale: bool,
}

impl Permissions {
    /// Returns `Forbidden` unless deletes are allowed.
    pub fn ensure_can_delete(&self, what: &str) -> BackendResult<()> {
        if self.can_delete {
            Ok(())
        } else {
            Err(BackendError::Forbidden(format!(
                "you are not allowed to delete {what}"
            )))
        }
    }
}

/// Asks one boolean permission RPC. Failures count as denied.
pub async fn check(backend: &dyn Backend, rpc: &str) -> bool {
    match backend.rpc(rpc, json!({})).await {
        Ok(Value::Bool(allowed)) => allowed,
        Ok(other) => {
            warn!(rpc, answer = %other, "Permission RPC returned a non-boolean, treating as denied");
            false
        }
        Err(err) => {
            warn!(rpc, error = %err, "Permission RPC failed, treating as denied");
            false
        }
    }
}

pub async fn can_delete_records(backend: &dyn Backend) -> bool {
    check(backend, CAN_DELETE_RECORDS).await
}

pub async fn can_view_wholesale_prices(backend: &dyn Backend) -> bool {
    check(backend, CAN_VIEW_WHOLESALE_PRICES).await
}

/// Loads both permissions.
pub async fn load_permissions(backend: &dyn Backend) -> Permissions {
    let (can_delete, can_view_wholesale) = tokio::join!(
        can_delete_records(backend),
        can_view_wholesale_prices(backend)
    );
    Permissions {
        can_delete,
        can_view_wholesale,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;

    #[tokio::test]
    async fn test_load_permissions() {
        let backend = MemoryBackend::new();
        backend.set_rpc(CAN_DELETE_RECORDS, json!(true));
        backend.set_rpc(CAN_VIEW_WHOLESALE_PRICES, json!(false));

        let permissions = load_permissions(&backend).await;
        assert!(permissions.can_delete);
        assert!(!permissions.can_view_wholesale);
        assert!(permissions.ensure_can_delete("clients").is_ok());
    }

    #[tokio::test]
    async fn test_failures_deny() {
        let backend = MemoryBackend::new();
        backend.fail_rpc(CAN_DELETE_RECORDS, "connection reset");
        backend.set_rpc(CAN_VIEW_WHOLESALE_PRICES, json!("yes"));

        let permissions = load_permissions(&backend).await;
        assert_eq!(permissions, Permissions::default());
        assert!(matches!(
            permissions.ensure_can_delete("orders"),
            Err(BackendError::Forbidden(_))
        ));
    }
}
