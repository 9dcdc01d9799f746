//! # Client Repository
//!
//! The customer list: search by name, create, edit, delete.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

use stockroom_core::validation::{validate_email, validate_name, validate_optional_text};
use stockroom_core::{new_id, Client};

use super::CLIENTS;
use crate::backend::{decode_one, decode_rows, encode_rows, Backend};
use crate::error::{BackendError, BackendResult};
use crate::query::Query;

/// The client form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientInput {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ClientInput {
    pub fn named(name: impl Into<String>) -> Self {
        ClientInput {
            name: name.into(),
            ..ClientInput::default()
        }
    }

    /// Trimmed, validated copy of the form.
    pub fn validate(&self) -> BackendResult<ClientInput> {
        Ok(ClientInput {
            name: validate_name("name", &self.name)?,
            email: validate_email(self.email.as_deref())?,
            phone: validate_optional_text("phone", self.phone.as_deref())?,
            address: validate_optional_text("address", self.address.as_deref())?,
            notes: validate_optional_text("notes", self.notes.as_deref())?,
        })
    }
}

/// Repository for the `clients` table.
#[derive(Clone)]
pub struct ClientRepository {
    backend: Arc<dyn Backend>,
}

impl ClientRepository {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        ClientRepository { backend }
    }

    /// Clients by name, optionally filtered by a case-insensitive name search.
    pub async fn list(&self, search: Option<&str>) -> BackendResult<Vec<Client>> {
        let mut query = Query::table(CLIENTS).order_by("name", true);
        if let Some(term) = search.map(str::trim).filter(|t| !t.is_empty()) {
            query = query.search("name", term);
        }

        let clients: Vec<Client> = decode_rows(self.backend.select(&query).await?)?;
        debug!(count = clients.len(), "Loaded clients");
        Ok(clients)
    }

    pub async fn get(&self, id: &str) -> BackendResult<Client> {
        let rows = self
            .backend
            .select(&Query::table(CLIENTS).eq("id", id).limit(1))
            .await?;
        decode_one(rows, "Client", id)
    }

    pub async fn create(&self, input: &ClientInput) -> BackendResult<Client> {
        let input = input.validate()?;
        let client = Client {
            id: new_id(),
            name: input.name,
            email: input.email,
            phone: input.phone,
            address: input.address,
            notes: input.notes,
            created_at: Utc::now(),
        };

        let rows = self.backend.insert(CLIENTS, encode_rows(&[client.clone()])?).await?;
        info!(client_id = %client.id, "Created client");
        decode_one(rows, "Client", &client.id)
    }

    pub async fn update(&self, id: &str, input: &ClientInput) -> BackendResult<Client> {
        let input = input.validate()?;
        let patch = json!({
            "name": input.name,
            "email": input.email,
            "phone": input.phone,
            "address": input.address,
            "notes": input.notes,
        });

        let rows = self
            .backend
            .update(&Query::table(CLIENTS).eq("id", id), patch)
            .await?;
        info!(client_id = %id, "Updated client");
        decode_one(rows, "Client", id)
    }

    pub async fn delete(&self, id: &str) -> BackendResult<()> {
        let deleted = self
            .backend
            .delete(&Query::table(CLIENTS).eq("id", id))
            .await?;
        if deleted.is_empty() {
            return Err(BackendError::not_found("Client", id));
        }
        info!(client_id = %id, "Deleted client");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;
    use stockroom_core::CoreError;

    fn repo() -> (Arc<MemoryBackend>, ClientRepository) {
        let backend = Arc::new(MemoryBackend::new());
        (backend.clone(), ClientRepository::new(backend))
    }

    #[tokio::test]
    async fn test_create_list_search() {
        let (_, repo) = repo();
        repo.create(&ClientInput::named("Corner Cafe")).await.unwrap();
        repo.create(&ClientInput::named("  Acme Bakery ")).await.unwrap();

        let all = repo.list(None).await.unwrap();
        let names: Vec<&str> = all.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Acme Bakery", "Corner Cafe"]);

        let found = repo.list(Some("BAKE")).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(repo.list(Some("  ")).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_form() {
        let (backend, repo) = repo();
        let mut input = ClientInput::named("Cafe");
        input.email = Some("not-an-email".to_string());

        let result = repo.create(&input).await;
        assert!(matches!(
            result,
            Err(BackendError::Core(CoreError::Validation(_)))
        ));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let (_, repo) = repo();
        let client = repo.create(&ClientInput::named("Cafe")).await.unwrap();

        let mut input = ClientInput::named("Cafe Central");
        input.phone = Some("555-0100".to_string());
        let updated = repo.update(&client.id, &input).await.unwrap();
        assert_eq!(updated.name, "Cafe Central");
        assert_eq!(updated.phone.as_deref(), Some("555-0100"));
        assert_eq!(repo.get(&client.id).await.unwrap().name, "Cafe Central");

        repo.delete(&client.id).await.unwrap();
        assert!(matches!(
            repo.delete(&client.id).await,
            Err(BackendError::NotFound { .. })
        ));
        assert!(matches!(
            repo.update(&client.id, &input).await,
            Err(BackendError::NotFound { .. })
        ));
    }
}
