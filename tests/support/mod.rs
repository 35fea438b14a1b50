#![allow(dead_code)]
use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use license_gate::{
    cache::{KeyTtl, KeyValueStore, memory::MemoryStore},
    config::Config,
    crypto::{
        channel::{self, KeyPair},
        digest::sha256_hex,
    },
    error::{AppError, Result},
    identity::table::{AuthCodeEntry, CredentialEntry, IdentityTable, StaticIdentityProvider},
    models::user::UserRecord,
    repositories::{Repository, memory::MemoryRepository},
    routes,
    state::AppState,
};
use serde_json::{Value, json};
use std::{
    path::PathBuf,
    sync::{Arc, Mutex, OnceLock},
    time::Duration,
};
use tower::ServiceExt;
use uuid::Uuid;

pub const ROOT_CODE: &str = "root-auth-code";
pub const ALICE_CODE: &str = "alice-auth-code";
pub const BOB_CODE: &str = "bob-auth-code";
pub const VISITOR_CODE: &str = "visitor-auth-code";

pub const ALICE_PASSWORD: &str = "alice-secret";
pub const BOB_PASSWORD: &str = "bob-secret";
pub const CAROL_PASSWORD: &str = "carol-secret";

pub fn identity_table() -> IdentityTable {
    let credential = |username: &str, password: &str| CredentialEntry {
        username: username.to_string(),
        password_sha256: sha256_hex(password),
    };
    let auth_code = |code: &str, username: &str, super_user: bool| AuthCodeEntry {
        code_sha256: sha256_hex(code),
        username: username.to_string(),
        super_user,
    };

    IdentityTable {
        credentials: vec![
            credential("alice", ALICE_PASSWORD),
            credential("bob", BOB_PASSWORD),
            // carol can authenticate but holds no licence record
            credential("carol", CAROL_PASSWORD),
        ],
        auth_codes: vec![
            auth_code(ROOT_CODE, "root", true),
            auth_code(ALICE_CODE, "alice", false),
            auth_code(BOB_CODE, "bob", false),
            auth_code(VISITOR_CODE, "visitor", false),
        ],
    }
}

pub fn test_config() -> Config {
    Config::in_memory(PathBuf::from("identity.json"))
}

pub fn test_state() -> AppState {
    test_state_with_cache(Arc::new(MemoryStore::new()))
}

pub fn test_state_with_cache(cache: Arc<dyn KeyValueStore>) -> AppState {
    AppState::from_parts(
        test_config(),
        cache,
        Arc::new(MemoryRepository::new()),
        Arc::new(StaticIdentityProvider::new(identity_table())),
    )
}

pub fn test_router(state: &AppState) -> Router {
    routes::router(state.clone())
}

/// Creates a licensed user directly in the repository.
pub async fn seed_user(state: &AppState, username: &str, quota: i32, days: i64) -> UserRecord {
    let user = UserRecord::new(username, quota, days);
    state.repo.save_user(&user).await.expect("seed user");
    user
}

/// Posts `body` as JSON and returns the status with the decoded envelope.
pub async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let envelope: Value = serde_json::from_slice(&bytes).unwrap();
    (status, envelope)
}

/// A device key pair, generated once per test binary.
pub fn device_keys() -> &'static KeyPair {
    static KEYS: OnceLock<KeyPair> = OnceLock::new();
    KEYS.get_or_init(|| channel::generate(1024).expect("device key pair"))
}

/// A second, distinct device key pair.
pub fn other_device_keys() -> &'static KeyPair {
    static KEYS: OnceLock<KeyPair> = OnceLock::new();
    KEYS.get_or_init(|| channel::generate(1024).expect("device key pair"))
}

/// Runs a key exchange and returns the session id with the server public key.
pub async fn exchange_key(app: &Router, spec: &str, device: &KeyPair) -> (Uuid, String) {
    let (status, envelope) = post_json(
        app,
        "/api/v0/client/exchange_key",
        json!({ "spec": spec, "public_key": device.public_pem }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "exchange_key failed: {}", envelope);
    assert_eq!(envelope["code"], 0);

    let session_id = Uuid::parse_str(envelope["body"]["session_id"].as_str().unwrap()).unwrap();
    let public_key = envelope["body"]["public_key"].as_str().unwrap().to_string();
    (session_id, public_key)
}

/// Logs a device in and returns the full envelope.
pub async fn login(
    app: &Router,
    session_id: Uuid,
    user: &str,
    password: &str,
    client_sn: &str,
    network_type: &str,
) -> (StatusCode, Value) {
    post_json(
        app,
        "/api/v0/client/login",
        json!({
            "session_id": session_id,
            "client_user": user,
            "client_passwd": password,
            "client_sn": client_sn,
            "network_type": network_type,
        }),
    )
    .await
}

/// Logs a device in and returns the client id, failing the test otherwise.
pub async fn login_ok(
    app: &Router,
    session_id: Uuid,
    user: &str,
    password: &str,
    client_sn: &str,
) -> Uuid {
    let (status, envelope) = login(app, session_id, user, password, client_sn, "wifi").await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", envelope);
    Uuid::parse_str(envelope["body"]["client_uuid"].as_str().unwrap()).unwrap()
}

/// Volatile store whose TTL lookups always fail.
pub struct TtlFailingStore {
    inner: MemoryStore,
}

impl TtlFailingStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
        }
    }
}

#[async_trait]
impl KeyValueStore for TtlFailingStore {
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.inner.set_ex(key, value, ttl).await
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.inner.get(key).await
    }

    async fn ttl(&self, _key: &str) -> Result<KeyTtl> {
        Err(AppError::StoreUnavailable("connection reset".to_string()))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.inner.delete(key).await
    }
}

/// Volatile store that refuses device binding writes and remembers every
/// key it accepted.
pub struct BindingFailingStore {
    pub inner: MemoryStore,
    pub written: Mutex<Vec<String>>,
}

impl BindingFailingStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            written: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl KeyValueStore for BindingFailingStore {
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        if key.contains(":device:") {
            return Err(AppError::StoreUnavailable("connection reset".to_string()));
        }
        self.written.lock().unwrap().push(key.to_string());
        self.inner.set_ex(key, value, ttl).await
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.inner.get(key).await
    }

    async fn ttl(&self, key: &str) -> Result<KeyTtl> {
        self.inner.ttl(key).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.inner.delete(key).await
    }
}
