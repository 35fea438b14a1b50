use std::sync::Arc;
use crate::cache::{KeyValueStore, Keyspace, memory::MemoryStore, redis::RedisStore};
use crate::config::{Config, IdentitySource, StoreBackend};
use crate::crypto::registry::SessionKeyRegistry;
use crate::identity::{IdentityProvider, http::HttpIdentityProvider, table::StaticIdentityProvider};
use crate::repositories::{Repository, memory::MemoryRepository, postgres::PgRepository};

/// The application's state.
#[derive(Clone)]
pub struct AppState {
    /// The application's configuration.
    pub config: Config,
    /// Sessions, device bindings and liveness entries.
    pub cache: Arc<dyn KeyValueStore>,
    pub keys: Keyspace,
    /// Users and client records.
    pub repo: Arc<dyn Repository>,
    pub identity: Arc<dyn IdentityProvider>,
    /// Private keys of sessions created by this process.
    pub session_keys: SessionKeyRegistry,
}

impl AppState {
    /// Creates a new `AppState`, connecting to the configured backends.
    ///
    /// # Arguments
    ///
    /// * `config` - The application's configuration.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `AppState`.
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        let (cache, repo): (Arc<dyn KeyValueStore>, Arc<dyn Repository>) = match &config.store {
            StoreBackend::External {
                database_url,
                pool,
                redis_url,
            } => {
                let pool = crate::db::create_pool(database_url, pool)?;
                crate::db::ensure_schema(&pool).await?;
                tracing::info!("✅ PostgreSQL Pool initialized with deadpool-postgres");

                let redis = RedisStore::connect(redis_url).await?;
                tracing::info!("✅ Redis Connection Manager initialized");

                (Arc::new(redis), Arc::new(PgRepository::new(pool)))
            }
            StoreBackend::Memory => {
                tracing::warn!("⚠️  Using in-memory stores, state will not survive a restart");
                (Arc::new(MemoryStore::new()), Arc::new(MemoryRepository::new()))
            }
        };

        let identity: Arc<dyn IdentityProvider> = match &config.identity {
            IdentitySource::Http { base_url, token } => {
                tracing::info!("✅ Identity backend at {}", base_url);
                Arc::new(HttpIdentityProvider::new(base_url.clone(), token.clone())?)
            }
            IdentitySource::File(path) => Arc::new(StaticIdentityProvider::load(path)?),
        };

        Ok(Self::from_parts(config.clone(), cache, repo, identity))
    }

    /// Assembles state from already constructed collaborators.
    pub fn from_parts(
        config: Config,
        cache: Arc<dyn KeyValueStore>,
        repo: Arc<dyn Repository>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            keys: Keyspace::new(config.key_prefix.clone()),
            config,
            cache,
            repo,
            identity,
            session_keys: SessionKeyRegistry::new(),
        }
    }
}
