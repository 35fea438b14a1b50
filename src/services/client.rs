use chrono::Utc;
use uuid::Uuid;
use crate::{
    error::{AppError, Result},
    models::client::ClientRecord,
    services::{liveness, session},
    state::AppState,
    validation::client::{validate_serial_number, validate_username},
};

/// A device login attempt.
#[derive(Debug, Clone)]
pub struct LoginAttempt<'a> {
    pub session_id: Uuid,
    pub username: &'a str,
    pub password: &'a str,
    pub client_sn: &'a str,
    pub network_type: &'a str,
}

/// Resolves the durable client record for a login.
///
/// Preconditions are checked in order, each with its own failure: the
/// credential, the session, the user and the user's validity window. The
/// client is then created (counting against quota), updated in place, or
/// rejected when another user owns the serial number.
///
/// # Returns
///
/// The durable client id the device heartbeats with.
pub async fn login(state: &AppState, attempt: LoginAttempt<'_>) -> Result<Uuid> {
    validate_username(attempt.username)?;
    validate_serial_number(attempt.client_sn)?;

    tracing::info!("🔐 Login request from {} for {}", attempt.username, attempt.client_sn);

    if !state
        .identity
        .verify_credential(attempt.username, attempt.password)
        .await?
    {
        tracing::warn!("❌ Invalid credential for {}", attempt.username);
        return Err(AppError::InvalidCredential);
    }

    session::require_session(state, &attempt.session_id).await?;

    let user = state
        .repo
        .find_user_by_username(attempt.username)
        .await?
        .ok_or_else(|| {
            tracing::warn!("❌ Unknown user: {}", attempt.username);
            AppError::UnknownUser
        })?;

    let now = Utc::now();
    if !user.is_valid_at(now) {
        tracing::warn!(
            "❌ Authorization of {} expired at {}",
            user.username,
            user.validate_until
        );
        return Err(AppError::AuthorizationExpired);
    }

    let client = match state.repo.find_client_by_sn(attempt.client_sn).await? {
        None => {
            let owned = state.repo.count_clients_by_owner(&user.username).await?;
            if owned >= i64::from(user.quota) {
                tracing::warn!(
                    "❌ {} already owns {} of {} clients",
                    user.username,
                    owned,
                    user.quota
                );
                return Err(AppError::QuotaExceeded(user.quota));
            }

            let client =
                ClientRecord::first_seen(&user.username, attempt.client_sn, attempt.network_type);
            state.repo.insert_client(&client).await?;
            tracing::info!("✅ Client created: {} ({})", client.id, client.client_sn);
            client
        }
        Some(existing) if existing.owning_user != attempt.username => {
            tracing::warn!(
                "❌ {} claimed {} owned by {}",
                attempt.username,
                existing.client_sn,
                existing.owning_user
            );
            return Err(AppError::OwnershipConflict);
        }
        Some(existing) => state
            .repo
            .update_client_network(&existing.id, attempt.network_type, now)
            .await?
            .ok_or(AppError::UnknownClient)?,
    };

    liveness::refresh(state, &client).await?;
    state
        .cache
        .set_ex(
            &state.keys.session_client(&attempt.session_id),
            &client.id.to_string(),
            state.config.session_ttl,
        )
        .await?;

    tracing::info!("✅ Client logged in: {}", client.id);
    Ok(client.id)
}
