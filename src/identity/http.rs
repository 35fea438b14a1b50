use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use zeroize::Zeroizing;
use super::IdentityProvider;
use crate::{
    error::{AppError, Result},
    models::user::Identity,
};

#[derive(Serialize)]
struct VerifyRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct VerifyResponse {
    valid: bool,
}

#[derive(Serialize)]
struct ResolveRequest<'a> {
    auth_code: &'a str,
}

/// [`IdentityProvider`] that delegates to a remote identity service.
///
/// `POST {base}/api/v0/identity/verify` answers `{"valid": bool}`, or
/// 401/403 for a refused credential; `POST {base}/api/v0/identity/resolve`
/// answers an identity, or 404 for an unknown code. Any other failure status
/// reads as an unavailable backend.
pub struct HttpIdentityProvider {
    client: reqwest::Client,
    base_url: String,
    token: Option<Zeroizing<String>>,
}

impl HttpIdentityProvider {
    pub fn new(base_url: String, token: Option<Zeroizing<String>>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        let request = self.client.post(format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => request.bearer_auth(token.as_str()),
            None => request,
        }
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn verify_credential(&self, username: &str, password: &str) -> Result<bool> {
        let response = self
            .post("/api/v0/identity/verify")
            .json(&VerifyRequest { username, password })
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                tracing::debug!(username, "Credential refused remotely");
                Ok(false)
            }
            status if status.is_success() => {
                let verdict: VerifyResponse = response.json().await?;
                tracing::debug!(username, valid = verdict.valid, "Credential verified remotely");
                Ok(verdict.valid)
            }
            status => Err(AppError::StoreUnavailable(format!(
                "identity backend answered {}",
                status
            ))),
        }
    }

    async fn resolve_auth_code(&self, auth_code: &str) -> Result<Option<Identity>> {
        let response = self
            .post("/api/v0/identity/resolve")
            .json(&ResolveRequest { auth_code })
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND | StatusCode::UNAUTHORIZED => Ok(None),
            status if status.is_success() => Ok(Some(response.json().await?)),
            status => Err(AppError::StoreUnavailable(format!(
                "identity backend answered {}",
                status
            ))),
        }
    }
}
