use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;
use crate::{
    error::Result,
    models::{client::ClientRecord, user::UserRecord},
};

pub mod memory;
pub mod postgres;

/// Durable storage of users and client records.
///
/// Lookups are equality predicates on indexed columns; writes go through the
/// primary key. No call spans more than one statement.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn find_user_by_username(&self, username: &str) -> Result<Option<UserRecord>>;

    async fn list_users(&self) -> Result<Vec<UserRecord>>;

    /// Inserts the user, or overwrites quota, validity and modification time
    /// of the row with the same id.
    async fn save_user(&self, user: &UserRecord) -> Result<()>;

    async fn find_client_by_sn(&self, client_sn: &str) -> Result<Option<ClientRecord>>;

    async fn find_client_by_id(&self, id: &Uuid) -> Result<Option<ClientRecord>>;

    async fn list_clients(&self) -> Result<Vec<ClientRecord>>;

    async fn list_clients_by_owner(&self, username: &str) -> Result<Vec<ClientRecord>>;

    async fn count_clients_by_owner(&self, username: &str) -> Result<i64>;

    /// Inserts a new client.
    ///
    /// Fails with `IntegrityViolation` when the owner does not exist, the
    /// status is not recognised, or the serial number is already taken.
    async fn insert_client(&self, client: &ClientRecord) -> Result<()>;

    /// Updates network type and modification time, leaving status alone.
    async fn update_client_network(
        &self,
        id: &Uuid,
        network_type: &str,
        modified_at: DateTime<Utc>,
    ) -> Result<Option<ClientRecord>>;
}
