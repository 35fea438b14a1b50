use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use anyhow::{Context, Result};
use zeroize::Zeroizing;

/// Upper bound the in-process key generator accepts.
pub const MAX_RSA_KEY_BITS: usize = 4096;
/// Lower bound the in-process key generator accepts.
pub const MIN_RSA_KEY_BITS: usize = 1024;

/// Sizing and timeouts of the PostgreSQL connection pool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolSettings {
    pub max_size: usize,
    /// How long a request waits for a free connection.
    pub wait_timeout: Duration,
    pub create_timeout: Duration,
    pub recycle_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_size: 32,
            wait_timeout: Duration::from_secs(5),
            create_timeout: Duration::from_secs(2),
            recycle_timeout: Duration::from_secs(1),
        }
    }
}

impl PoolSettings {
    fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let settings = Self {
            max_size: parse_or("DB_POOL_MAX_SIZE", defaults.max_size)?,
            wait_timeout: millis_or("DB_POOL_WAIT_TIMEOUT_MS", defaults.wait_timeout)?,
            create_timeout: millis_or("DB_POOL_CREATE_TIMEOUT_MS", defaults.create_timeout)?,
            recycle_timeout: millis_or("DB_POOL_RECYCLE_TIMEOUT_MS", defaults.recycle_timeout)?,
        };
        if settings.max_size == 0 {
            anyhow::bail!("DB_POOL_MAX_SIZE must be positive");
        }
        Ok(settings)
    }
}

/// Where durable and volatile state lives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    /// PostgreSQL for users/clients, Redis for sessions and liveness.
    External {
        /// The URL of the PostgreSQL database.
        database_url: String,
        pool: PoolSettings,
        /// The URL of the Redis server.
        redis_url: String,
    },
    /// Process-local maps. State is lost on restart.
    Memory,
}

/// Where users are authenticated and auth codes resolved.
#[derive(Clone)]
pub enum IdentitySource {
    /// A remote identity service.
    Http {
        base_url: String,
        token: Option<Zeroizing<String>>,
    },
    /// A JSON table of credential and auth-code digests.
    File(PathBuf),
}

/// The application's configuration.
#[derive(Clone)]
pub struct Config {
    /// The socket the HTTP server binds to.
    pub bind_addr: SocketAddr,
    pub store: StoreBackend,
    /// Prefix for every key written to the volatile store.
    pub key_prefix: String,
    /// Lifetime of sessions and device bindings.
    pub session_ttl: Duration,
    /// Lifetime of a liveness entry after the last login or heartbeat.
    pub liveness_ttl: Duration,
    /// Modulus size of server key pairs.
    pub rsa_key_bits: usize,
    pub identity: IdentitySource,
    /// Sustained request rate allowed per peer address.
    pub rate_limit_per_second: u64,
    /// Burst size allowed per peer address.
    pub rate_limit_burst: u32,
}

/// Sessions are superseded, not expired; 100000 days is "forever" for us.
const DEFAULT_SESSION_TTL_SECS: u64 = 100_000 * 24 * 3600;
const DEFAULT_LIVENESS_TTL_SECS: u64 = 3 * 3600;

impl Config {
    /// Creates a new `Config` from environment variables.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Config`.
    pub fn from_env() -> Result<Self> {
        let store = match env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "external".to_string())
            .as_str()
        {
            "external" => StoreBackend::External {
                database_url: env::var("DATABASE_URL")
                    .context("DATABASE_URL must be set when STORE_BACKEND=external")?,
                pool: PoolSettings::from_env()?,
                redis_url: env::var("REDIS_URL")
                    .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
            },
            "memory" => StoreBackend::Memory,
            other => anyhow::bail!("Unknown STORE_BACKEND '{}' (expected external or memory)", other),
        };

        let identity = match (env::var("IDENTITY_SERVICE_URL"), env::var("IDENTITY_FILE")) {
            (Ok(base_url), _) => IdentitySource::Http {
                base_url: base_url.trim_end_matches('/').to_string(),
                token: env::var("IDENTITY_SERVICE_TOKEN").ok().map(Zeroizing::new),
            },
            (Err(_), Ok(path)) => IdentitySource::File(PathBuf::from(path)),
            _ => anyhow::bail!("Either IDENTITY_SERVICE_URL or IDENTITY_FILE must be set"),
        };

        let rsa_key_bits: usize = parse_or("RSA_KEY_BITS", 1024)?;
        if !(MIN_RSA_KEY_BITS..=MAX_RSA_KEY_BITS).contains(&rsa_key_bits) {
            anyhow::bail!(
                "RSA_KEY_BITS must be between {} and {}",
                MIN_RSA_KEY_BITS,
                MAX_RSA_KEY_BITS
            );
        }

        let liveness_ttl = Duration::from_secs(parse_or("LIVENESS_TTL_SECS", DEFAULT_LIVENESS_TTL_SECS)?);
        if liveness_ttl.is_zero() {
            anyhow::bail!("LIVENESS_TTL_SECS must be positive");
        }

        Ok(Self {
            bind_addr: parse_or("BIND_ADDR", SocketAddr::from(([127, 0, 0, 1], 3000)))?,
            store,
            key_prefix: env::var("REDIS_KEY_PREFIX").unwrap_or_else(|_| "license".to_string()),
            session_ttl: Duration::from_secs(parse_or("SESSION_TTL_SECS", DEFAULT_SESSION_TTL_SECS)?),
            liveness_ttl,
            rsa_key_bits,
            identity,
            rate_limit_per_second: parse_or("RATE_LIMIT_PER_SECOND", 50)?,
            rate_limit_burst: parse_or("RATE_LIMIT_BURST", 200)?,
        })
    }

    /// A configuration for process-local operation with default lifetimes.
    pub fn in_memory(identity_file: PathBuf) -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            store: StoreBackend::Memory,
            key_prefix: "license".to_string(),
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
            liveness_ttl: Duration::from_secs(DEFAULT_LIVENESS_TTL_SECS),
            rsa_key_bits: MIN_RSA_KEY_BITS,
            identity: IdentitySource::File(identity_file),
            rate_limit_per_second: 50,
            rate_limit_burst: 200,
        }
    }
}

fn parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {}", name)),
        Err(_) => Ok(default),
    }
}

fn millis_or(name: &str, default: Duration) -> Result<Duration> {
    let millis: u64 = parse_or(name, u64::try_from(default.as_millis())?)?;
    Ok(Duration::from_millis(millis))
}
