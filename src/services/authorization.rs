use futures::future::{join_all, try_join_all};
use serde::Serialize;
use uuid::Uuid;
use crate::{
    error::{AppError, Result},
    models::{
        client::ClientRecord,
        session::DeviceBinding,
        user::{Identity, UserRecord},
    },
    services::liveness,
    state::AppState,
    validation::client::{validate_spec, validate_username},
};

/// Longest licence extension a single update may grant.
pub const MAX_VALIDITY_DAYS: i64 = 36_500;

/// A user row of the overview.
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    #[serde(flatten)]
    pub user: UserRecord,
    /// Clients the user currently owns.
    pub count: i64,
}

/// What a caller is allowed to see.
#[derive(Debug, Clone, Serialize)]
pub struct ClientOverview {
    pub super_user: bool,
    /// The caller is known to the identity backend but holds no licence.
    pub visitor_only: bool,
    pub users: Vec<UserSummary>,
    /// Clients with their effective status.
    pub clients: Vec<ClientRecord>,
}

/// A licence grant for one user.
#[derive(Debug, Clone)]
pub struct AuthGrant<'a> {
    pub username: &'a str,
    pub quota: i32,
    pub validity_days: i64,
}

/// Resolves an auth code or fails with `InvalidCredential`.
pub async fn resolve_caller(state: &AppState, auth_code: &str) -> Result<Identity> {
    if auth_code.is_empty() {
        return Err(AppError::InputMalformed("auth_code must not be empty".to_string()));
    }
    state
        .identity
        .resolve_auth_code(auth_code)
        .await?
        .ok_or_else(|| {
            tracing::warn!("❌ Unresolvable auth code");
            AppError::InvalidCredential
        })
}

async fn project_all(state: &AppState, clients: Vec<ClientRecord>) -> Vec<ClientRecord> {
    join_all(
        clients
            .into_iter()
            .map(|client| liveness::project(state, client)),
    )
    .await
}

async fn summarize_all(state: &AppState, users: Vec<UserRecord>) -> Result<Vec<UserSummary>> {
    try_join_all(users.into_iter().map(|user| async move {
        let count = state.repo.count_clients_by_owner(&user.username).await?;
        Ok::<_, AppError>(UserSummary { user, count })
    }))
    .await
}

/// Lists the users and clients visible to the caller.
///
/// Super users see everything; other callers see their own user record and
/// the clients they own.
pub async fn my_clients(state: &AppState, auth_code: &str) -> Result<ClientOverview> {
    let caller = resolve_caller(state, auth_code).await?;
    tracing::info!("📋 Client overview for {} (super_user={})", caller.username, caller.super_user);

    if caller.super_user {
        let users = state.repo.list_users().await?;
        let clients = state.repo.list_clients().await?;
        return Ok(ClientOverview {
            super_user: true,
            visitor_only: false,
            users: summarize_all(state, users).await?,
            clients: project_all(state, clients).await,
        });
    }

    let Some(user) = state.repo.find_user_by_username(&caller.username).await? else {
        return Ok(ClientOverview {
            super_user: false,
            visitor_only: true,
            users: Vec::new(),
            clients: Vec::new(),
        });
    };

    let clients = state.repo.list_clients_by_owner(&user.username).await?;
    Ok(ClientOverview {
        super_user: false,
        visitor_only: false,
        users: summarize_all(state, vec![user]).await?,
        clients: project_all(state, clients).await,
    })
}

/// Sets a user's quota and restarts its validity window, creating the user
/// when needed. Super users only.
pub async fn update_auth(state: &AppState, auth_code: &str, grant: AuthGrant<'_>) -> Result<()> {
    let caller = resolve_caller(state, auth_code).await?;
    if !caller.super_user {
        tracing::warn!("❌ {} attempted to update authorization", caller.username);
        return Err(AppError::Forbidden);
    }

    validate_username(grant.username)?;
    if grant.quota < 0 {
        return Err(AppError::InputMalformed("quota must not be negative".to_string()));
    }
    if !(0..=MAX_VALIDITY_DAYS).contains(&grant.validity_days) {
        return Err(AppError::InputMalformed(format!(
            "validate_time must be between 0 and {} days",
            MAX_VALIDITY_DAYS
        )));
    }

    let user = match state.repo.find_user_by_username(grant.username).await? {
        Some(mut user) => {
            user.grant(grant.quota, grant.validity_days);
            user
        }
        None => {
            tracing::info!("Creating user {}", grant.username);
            UserRecord::new(grant.username, grant.quota, grant.validity_days)
        }
    };
    state.repo.save_user(&user).await?;

    tracing::info!(
        "✅ {} granted {} clients until {} by {}",
        user.username,
        user.quota,
        user.validate_until,
        caller.username
    );
    Ok(())
}

async fn visible_client(
    state: &AppState,
    caller: &Identity,
    client_id: &Uuid,
) -> Result<ClientRecord> {
    let client = state
        .repo
        .find_client_by_id(client_id)
        .await?
        .ok_or(AppError::UnknownClient)?;

    if !caller.super_user && client.owning_user != caller.username {
        tracing::warn!("❌ {} asked for client {} it does not own", caller.username, client.id);
        return Err(AppError::Forbidden);
    }

    Ok(liveness::project(state, client).await)
}

/// Returns one client with its effective status.
///
/// Callers other than super users may only look at their own clients.
pub async fn client_info_by_id(
    state: &AppState,
    auth_code: &str,
    client_id: &Uuid,
) -> Result<ClientRecord> {
    let caller = resolve_caller(state, auth_code).await?;
    visible_client(state, &caller, client_id).await
}

/// Returns the client last logged in from the device with `spec`.
pub async fn client_info_by_spec(
    state: &AppState,
    auth_code: &str,
    spec: &str,
) -> Result<ClientRecord> {
    validate_spec(spec)?;
    let caller = resolve_caller(state, auth_code).await?;

    let Some(raw) = state.cache.get(&state.keys.device(spec)).await? else {
        return Err(AppError::UnknownClient);
    };
    let binding: DeviceBinding = sonic_rs::from_str(&raw)?;

    let client_id = state
        .cache
        .get(&state.keys.session_client(&binding.session_id))
        .await?
        .and_then(|raw| Uuid::parse_str(&raw).ok())
        .ok_or(AppError::UnknownClient)?;

    visible_client(state, &caller, &client_id).await
}
