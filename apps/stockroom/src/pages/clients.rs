//! # Clients Page
//!
//! Client table with search, plus the add / edit form and delete.

use tracing::{debug, info};

use stockroom_backend::ClientInput;
use stockroom_core::Client;

use super::{ensure_can_delete, open, require_session};
use crate::error::ApiError;
use crate::state::Route;
use crate::App;

/// Lists clients by name; `search` matches anywhere in the name.
pub async fn list(app: &App, search: Option<&str>) -> Result<Vec<Client>, ApiError> {
    open(app, Route::Clients)?;
    debug!(search = ?search, "clients list");
    Ok(app.backend.clients().list(search).await?)
}

pub async fn create(app: &App, input: &ClientInput) -> Result<Client, ApiError> {
    require_session(app)?;
    let client = app.backend.clients().create(input).await?;
    info!(client_id = %client.id, "client created");
    Ok(client)
}

pub async fn update(app: &App, id: &str, input: &ClientInput) -> Result<Client, ApiError> {
    require_session(app)?;
    Ok(app.backend.clients().update(id, input).await?)
}

/// Deletes a client. Needs the delete permission.
pub async fn delete(app: &App, id: &str) -> Result<(), ApiError> {
    ensure_can_delete(app, "clients").await?;
    app.backend.clients().delete(id).await?;
    info!(client_id = %id, "client deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::demo_id;
    use crate::error::ErrorCode;
    use crate::pages::testing::signed_in;

    #[tokio::test]
    async fn test_list_search_and_create() {
        let t = signed_in(false, false).await;

        let all = list(&t.app, None).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(t.app.routes.current(), Route::Clients);

        let found = list(&t.app, Some("corner")).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Corner Café");

        let mut input = ClientInput::named("  Zeta Foods ");
        input.email = Some("zeta@example.com".to_string());
        let client = create(&t.app, &input).await.unwrap();
        assert_eq!(client.name, "Zeta Foods");
        assert_eq!(list(&t.app, None).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_invalid_email_rejected() {
        let t = signed_in(true, true).await;
        let mut input = ClientInput::named("Someone");
        input.email = Some("not-an-email".to_string());
        let err = create(&t.app, &input).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_delete_needs_permission() {
        let t = signed_in(false, true).await;
        let err = delete(&t.app, &demo_id(1)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);
        assert_eq!(t.memory.rows("clients").len(), 3);
        assert!(!t.memory.calls().iter().any(|c| c == "delete clients"));
    }

    #[tokio::test]
    async fn test_delete_allowed() {
        let t = signed_in(true, false).await;
        delete(&t.app, &demo_id(1)).await.unwrap();
        assert_eq!(t.memory.rows("clients").len(), 2);

        let err = delete(&t.app, &demo_id(1)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }
}
