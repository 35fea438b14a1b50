use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;
use super::Repository;
use crate::{
    error::{AppError, Result},
    models::{client::ClientRecord, user::UserRecord},
};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, UserRecord>,
    clients: HashMap<Uuid, ClientRecord>,
}

/// Process-local [`Repository`] with the same integrity rules as the
/// PostgreSQL schema.
#[derive(Clone, Default)]
pub struct MemoryRepository {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn by_created<T>(mut rows: Vec<T>, key: impl Fn(&T) -> DateTime<Utc>) -> Vec<T> {
    rows.sort_by_key(|row| key(row));
    rows
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn find_user_by_username(&self, username: &str) -> Result<Option<UserRecord>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>> {
        let tables = self.tables.read().await;
        Ok(by_created(tables.users.values().cloned().collect(), |u| u.created_at))
    }

    async fn save_user(&self, user: &UserRecord) -> Result<()> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables.users.get_mut(&user.id) {
            existing.quota = user.quota;
            existing.validate_until = user.validate_until;
            existing.modified_at = user.modified_at;
            return Ok(());
        }
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(AppError::IntegrityViolation(format!(
                "username '{}' already exists",
                user.username
            )));
        }
        tables.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_client_by_sn(&self, client_sn: &str) -> Result<Option<ClientRecord>> {
        let tables = self.tables.read().await;
        Ok(tables
            .clients
            .values()
            .find(|c| c.client_sn == client_sn)
            .cloned())
    }

    async fn find_client_by_id(&self, id: &Uuid) -> Result<Option<ClientRecord>> {
        let tables = self.tables.read().await;
        Ok(tables.clients.get(id).cloned())
    }

    async fn list_clients(&self) -> Result<Vec<ClientRecord>> {
        let tables = self.tables.read().await;
        Ok(by_created(tables.clients.values().cloned().collect(), |c| c.created_at))
    }

    async fn list_clients_by_owner(&self, username: &str) -> Result<Vec<ClientRecord>> {
        let tables = self.tables.read().await;
        Ok(by_created(
            tables
                .clients
                .values()
                .filter(|c| c.owning_user == username)
                .cloned()
                .collect(),
            |c| c.created_at,
        ))
    }

    async fn count_clients_by_owner(&self, username: &str) -> Result<i64> {
        let tables = self.tables.read().await;
        Ok(tables
            .clients
            .values()
            .filter(|c| c.owning_user == username)
            .count() as i64)
    }

    async fn insert_client(&self, client: &ClientRecord) -> Result<()> {
        let mut tables = self.tables.write().await;
        if !tables.users.values().any(|u| u.username == client.owning_user) {
            return Err(AppError::IntegrityViolation(format!(
                "owning user '{}' does not exist",
                client.owning_user
            )));
        }
        if tables.clients.contains_key(&client.id)
            || tables.clients.values().any(|c| c.client_sn == client.client_sn)
        {
            return Err(AppError::IntegrityViolation(format!(
                "client '{}' already exists",
                client.client_sn
            )));
        }
        tables.clients.insert(client.id, client.clone());
        Ok(())
    }

    async fn update_client_network(
        &self,
        id: &Uuid,
        network_type: &str,
        modified_at: DateTime<Utc>,
    ) -> Result<Option<ClientRecord>> {
        let mut tables = self.tables.write().await;
        Ok(tables.clients.get_mut(id).map(|client| {
            client.network_type = network_type.to_string();
            client.modified_at = modified_at;
            client.clone()
        }))
    }
}
