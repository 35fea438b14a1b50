use async_trait::async_trait;
use crate::{error::Result, models::user::Identity};

pub mod http;
pub mod table;

/// The external identity collaborator.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Checks a username/password pair.
    async fn verify_credential(&self, username: &str, password: &str) -> Result<bool>;

    /// Resolves an opaque auth code to the caller it was issued to.
    async fn resolve_auth_code(&self, auth_code: &str) -> Result<Option<Identity>>;
}
