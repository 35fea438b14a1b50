use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use super::IdentityProvider;
use crate::{
    crypto::digest::matches_digest,
    error::Result,
    models::user::Identity,
};

#[derive(Debug, Clone, Deserialize)]
pub struct CredentialEntry {
    pub username: String,
    /// Hex SHA-256 of the password.
    pub password_sha256: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthCodeEntry {
    /// Hex SHA-256 of the auth code.
    pub code_sha256: String,
    pub username: String,
    #[serde(default)]
    pub super_user: bool,
}

/// The on-disk identity table.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IdentityTable {
    #[serde(default)]
    pub credentials: Vec<CredentialEntry>,
    #[serde(default)]
    pub auth_codes: Vec<AuthCodeEntry>,
}

/// [`IdentityProvider`] answering from a fixed table of secret digests.
pub struct StaticIdentityProvider {
    table: IdentityTable,
}

impl StaticIdentityProvider {
    pub fn new(table: IdentityTable) -> Self {
        Self { table }
    }

    /// Loads the table from a JSON file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read identity file {}", path.display()))?;
        let table: IdentityTable = sonic_rs::from_str(&raw)
            .with_context(|| format!("Cannot parse identity file {}", path.display()))?;
        tracing::info!(
            credentials = table.credentials.len(),
            auth_codes = table.auth_codes.len(),
            "✅ Identity table loaded"
        );
        Ok(Self::new(table))
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn verify_credential(&self, username: &str, password: &str) -> Result<bool> {
        Ok(self
            .table
            .credentials
            .iter()
            .filter(|entry| entry.username == username)
            .any(|entry| matches_digest(password, &entry.password_sha256)))
    }

    async fn resolve_auth_code(&self, auth_code: &str) -> Result<Option<Identity>> {
        Ok(self
            .table
            .auth_codes
            .iter()
            .find(|entry| matches_digest(auth_code, &entry.code_sha256))
            .map(|entry| Identity {
                username: entry.username.clone(),
                super_user: entry.super_user,
            }))
    }
}
