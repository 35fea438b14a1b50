use deadpool_postgres::{Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime, Timeouts};
use tokio_postgres::NoTls;
use crate::{
    config::PoolSettings,
    error::{AppError, Result},
};

const SCHEMA: &str = include_str!("../sql/schema.sql");

fn pool_config(settings: &PoolSettings) -> PoolConfig {
    PoolConfig {
        max_size: settings.max_size,
        timeouts: Timeouts {
            wait: Some(settings.wait_timeout),
            create: Some(settings.create_timeout),
            recycle: Some(settings.recycle_timeout),
        },
        ..Default::default()
    }
}

/// Creates the PostgreSQL pool backing the users/clients repository.
///
/// No connection is opened here; the first checkout does that.
pub fn create_pool(database_url: &str, settings: &PoolSettings) -> Result<Pool> {
    let cfg = Config {
        url: Some(database_url.to_string()),
        manager: Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        }),
        pool: Some(pool_config(settings)),
        ..Default::default()
    };

    cfg.create_pool(Some(Runtime::Tokio1), NoTls)
        .map_err(|e| AppError::StoreUnavailable(format!("database pool: {}", e)))
}

/// Creates the users/clients tables if they are missing.
pub async fn ensure_schema(pool: &Pool) -> Result<()> {
    let client = pool.get().await?;
    client.batch_execute(SCHEMA).await?;
    tracing::info!("✅ Database schema verified");
    Ok(())
}
