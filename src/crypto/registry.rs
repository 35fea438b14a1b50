use rsa::RsaPrivateKey;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use uuid::Uuid;

/// Server-side key material of one session.
///
/// Lives only in this process; the private key zeroizes itself on drop.
pub struct SessionKeys {
    pub private: RsaPrivateKey,
    /// When the session record this key belongs to expires.
    pub expires_at: Instant,
}

/// Private keys of the sessions this process created, keyed by session id.
///
/// Entries are inserted fully built behind an `Arc`, so a lookup sees either
/// nothing or the complete entry. Entries past their session's lifetime read
/// as missing and are evicted on the next insert.
#[derive(Clone, Default)]
pub struct SessionKeyRegistry {
    keys: Arc<RwLock<HashMap<Uuid, Arc<SessionKeys>>>>,
}

impl SessionKeyRegistry {
    /// Creates an empty `SessionKeyRegistry`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the keys of a session, if this process created it.
    pub async fn get(&self, session_id: &Uuid) -> Option<Arc<SessionKeys>> {
        let now = Instant::now();
        let keys = self.keys.read().await;
        keys.get(session_id)
            .filter(|entry| entry.expires_at > now)
            .cloned()
    }

    /// Registers the keys of a new session living for `ttl`.
    pub async fn insert(&self, session_id: Uuid, private: RsaPrivateKey, ttl: Duration) {
        let now = Instant::now();
        let entry = Arc::new(SessionKeys {
            private,
            expires_at: now + ttl,
        });
        let mut keys = self.keys.write().await;
        keys.retain(|_, held| held.expires_at > now);
        keys.insert(session_id, entry);
    }

    /// Drops the keys of a session that was superseded, expired or abandoned.
    pub async fn remove(&self, session_id: &Uuid) {
        let mut keys = self.keys.write().await;
        keys.remove(session_id);
    }

    /// Ids of every session whose keys are held.
    pub async fn session_ids(&self) -> Vec<Uuid> {
        self.keys.read().await.keys().copied().collect()
    }

    pub async fn len(&self) -> usize {
        self.keys.read().await.len()
    }
}
