use async_trait::async_trait;
use std::time::Duration;
use uuid::Uuid;
use crate::error::Result;

pub mod memory;
pub mod redis;

/// Remaining lifetime of a key, as reported by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTtl {
    /// The key does not exist (never written, or expired).
    Missing,
    /// The key exists without an expiry.
    Persistent,
    /// The key exists and expires after the given duration.
    Expires(Duration),
}

impl KeyTtl {
    pub fn is_present(&self) -> bool {
        !matches!(self, KeyTtl::Missing)
    }
}

/// A volatile key-value store with per-key TTL.
///
/// Every call is a single atomic operation on one key.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Writes `value` under `key`, replacing any prior value and TTL.
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Reads the value under `key`.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Reports the remaining lifetime of `key`.
    async fn ttl(&self, key: &str) -> Result<KeyTtl>;

    /// Removes `key`. Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Key layout of the volatile store.
#[derive(Debug, Clone)]
pub struct Keyspace {
    prefix: String,
}

impl Keyspace {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn session(&self, session_id: &Uuid) -> String {
        format!("{}:session:{}", self.prefix, session_id)
    }

    pub fn device(&self, spec: &str) -> String {
        format!("{}:device:{}", self.prefix, spec)
    }

    /// The liveness entry of a client.
    pub fn client(&self, client_id: &Uuid) -> String {
        format!("{}:client:{}", self.prefix, client_id)
    }

    /// The client most recently logged in over a session.
    pub fn session_client(&self, session_id: &Uuid) -> String {
        format!("{}:session_client:{}", self.prefix, session_id)
    }
}
