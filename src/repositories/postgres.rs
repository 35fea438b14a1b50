use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::Pool;
use tokio_postgres::Row;
use uuid::Uuid;
use super::Repository;
use crate::{
    error::{AppError, Result},
    models::{
        client::{ClientRecord, ClientStatus},
        user::UserRecord,
    },
};

const USER_COLUMNS: &str = "id, username, quota, validate_until, created_at, modified_at";
const CLIENT_COLUMNS: &str =
    "id, owning_user, client_sn, network_type, status, created_at, modified_at";

/// Reads a column, reporting which one was missing or mistyped.
fn column<'a, T>(row: &'a Row, name: &str) -> Result<T>
where
    T: tokio_postgres::types::FromSql<'a>,
{
    row.try_get(name)
        .map_err(|e| AppError::Internal(format!("Column {}: {}", name, e)))
}

/// A helper function to map a `tokio_postgres::Row` to a `UserRecord`.
fn row_to_user(row: &Row) -> Result<UserRecord> {
    Ok(UserRecord {
        id: column(row, "id")?,
        username: column(row, "username")?,
        quota: column(row, "quota")?,
        validate_until: column(row, "validate_until")?,
        created_at: column(row, "created_at")?,
        modified_at: column(row, "modified_at")?,
    })
}

/// A helper function to map a `tokio_postgres::Row` to a `ClientRecord`.
fn row_to_client(row: &Row) -> Result<ClientRecord> {
    let status: String = column(row, "status")?;
    Ok(ClientRecord {
        id: column(row, "id")?,
        owning_user: column(row, "owning_user")?,
        client_sn: column(row, "client_sn")?,
        network_type: column(row, "network_type")?,
        status: status.parse::<ClientStatus>().map_err(AppError::IntegrityViolation)?,
        created_at: column(row, "created_at")?,
        modified_at: column(row, "modified_at")?,
    })
}

/// [`Repository`] over a PostgreSQL pool.
///
/// Statements are prepared once per pooled connection.
#[derive(Clone)]
pub struct PgRepository {
    pool: Pool,
}

impl PgRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    async fn query_opt(
        &self,
        sql: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> Result<Option<Row>> {
        let client = self.pool.get().await?;
        let statement = client.prepare_cached(sql).await?;
        Ok(client.query_opt(&statement, params).await?)
    }

    async fn query(
        &self,
        sql: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> Result<Vec<Row>> {
        let client = self.pool.get().await?;
        let statement = client.prepare_cached(sql).await?;
        Ok(client.query(&statement, params).await?)
    }
}

#[async_trait]
impl Repository for PgRepository {
    async fn find_user_by_username(&self, username: &str) -> Result<Option<UserRecord>> {
        let sql = format!("SELECT {} FROM users WHERE username = $1", USER_COLUMNS);
        self.query_opt(&sql, &[&username])
            .await?
            .map(|r| row_to_user(&r))
            .transpose()
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>> {
        let sql = format!("SELECT {} FROM users ORDER BY created_at", USER_COLUMNS);
        self.query(&sql, &[]).await?.iter().map(row_to_user).collect()
    }

    async fn save_user(&self, user: &UserRecord) -> Result<()> {
        let client = self.pool.get().await?;
        let statement = client
            .prepare_cached(
                r#"
                INSERT INTO users (id, username, quota, validate_until, created_at, modified_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (id) DO UPDATE
                SET quota = EXCLUDED.quota,
                    validate_until = EXCLUDED.validate_until,
                    modified_at = EXCLUDED.modified_at
                "#,
            )
            .await?;
        client
            .execute(
                &statement,
                &[
                    &user.id,
                    &user.username,
                    &user.quota,
                    &user.validate_until,
                    &user.created_at,
                    &user.modified_at,
                ],
            )
            .await?;
        Ok(())
    }

    async fn find_client_by_sn(&self, client_sn: &str) -> Result<Option<ClientRecord>> {
        let sql = format!("SELECT {} FROM clients WHERE client_sn = $1", CLIENT_COLUMNS);
        self.query_opt(&sql, &[&client_sn])
            .await?
            .map(|r| row_to_client(&r))
            .transpose()
    }

    async fn find_client_by_id(&self, id: &Uuid) -> Result<Option<ClientRecord>> {
        let sql = format!("SELECT {} FROM clients WHERE id = $1", CLIENT_COLUMNS);
        self.query_opt(&sql, &[id])
            .await?
            .map(|r| row_to_client(&r))
            .transpose()
    }

    async fn list_clients(&self) -> Result<Vec<ClientRecord>> {
        let sql = format!("SELECT {} FROM clients ORDER BY created_at", CLIENT_COLUMNS);
        self.query(&sql, &[]).await?.iter().map(row_to_client).collect()
    }

    async fn list_clients_by_owner(&self, username: &str) -> Result<Vec<ClientRecord>> {
        let sql = format!(
            "SELECT {} FROM clients WHERE owning_user = $1 ORDER BY created_at",
            CLIENT_COLUMNS
        );
        self.query(&sql, &[&username])
            .await?
            .iter()
            .map(row_to_client)
            .collect()
    }

    async fn count_clients_by_owner(&self, username: &str) -> Result<i64> {
        let row = self
            .query_opt(
                "SELECT COUNT(*) AS client_count FROM clients WHERE owning_user = $1",
                &[&username],
            )
            .await?
            .ok_or_else(|| AppError::Internal("COUNT returned no row".to_string()))?;
        column(&row, "client_count")
    }

    async fn insert_client(&self, client: &ClientRecord) -> Result<()> {
        let db = self.pool.get().await?;
        let statement = db
            .prepare_cached(
                r#"
                INSERT INTO clients (id, owning_user, client_sn, network_type, status, created_at, modified_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .await?;
        db.execute(
            &statement,
            &[
                &client.id,
                &client.owning_user,
                &client.client_sn,
                &client.network_type,
                &client.status.as_str(),
                &client.created_at,
                &client.modified_at,
            ],
        )
        .await?;
        Ok(())
    }

    async fn update_client_network(
        &self,
        id: &Uuid,
        network_type: &str,
        modified_at: DateTime<Utc>,
    ) -> Result<Option<ClientRecord>> {
        let sql = format!(
            "UPDATE clients SET network_type = $1, modified_at = $2 WHERE id = $3 RETURNING {}",
            CLIENT_COLUMNS
        );
        self.query_opt(&sql, &[&network_type, &modified_at, id])
            .await?
            .map(|r| row_to_client(&r))
            .transpose()
    }
}
