use uuid::Uuid;
use crate::{
    crypto::channel,
    error::{AppError, Result},
    models::session::{DeviceBinding, SessionRecord},
    state::AppState,
    validation::client::validate_spec,
};

/// Outcome of a key exchange.
#[derive(Debug, Clone)]
pub struct ExchangeOutcome {
    pub session: SessionRecord,
    /// Whether an existing session was handed back unchanged.
    pub reused: bool,
}

/// Looks up a session by id.
///
/// # Returns
///
/// `None` when the session expired or was never created.
pub async fn lookup_session(state: &AppState, session_id: &Uuid) -> Result<Option<SessionRecord>> {
    let Some(raw) = state.cache.get(&state.keys.session(session_id)).await? else {
        return Ok(None);
    };
    let session: SessionRecord = sonic_rs::from_str(&raw)?;
    Ok(Some(session))
}

/// Looks up a session that must exist.
pub async fn require_session(state: &AppState, session_id: &Uuid) -> Result<SessionRecord> {
    lookup_session(state, session_id).await?.ok_or_else(|| {
        tracing::warn!("❌ Unknown session: {}", session_id);
        AppError::UnknownSession
    })
}

/// Creates a session for `client_public_key` and persists its public half.
///
/// The private key goes to the in-process registry only.
pub async fn create_session(state: &AppState, client_public_key: &str) -> Result<SessionRecord> {
    let bits = state.config.rsa_key_bits;
    let pair = tokio::task::spawn_blocking(move || channel::generate(bits))
        .await
        .map_err(|e| AppError::Internal(format!("Key generation task failed: {}", e)))??;

    let session = SessionRecord {
        session_id: Uuid::new_v4(),
        server_public_key: pair.public_pem,
        client_public_key: client_public_key.to_string(),
    };
    let session_json = sonic_rs::to_string(&session)?;

    state
        .session_keys
        .insert(session.session_id, pair.private, state.config.session_ttl)
        .await;

    if let Err(e) = state
        .cache
        .set_ex(
            &state.keys.session(&session.session_id),
            &session_json,
            state.config.session_ttl,
        )
        .await
    {
        discard_session(state, &session.session_id).await;
        return Err(e);
    }

    tracing::info!("✅ Session created: session:{}", session.session_id);
    Ok(session)
}

/// Undoes a session whose creation could not be completed.
async fn discard_session(state: &AppState, session_id: &Uuid) {
    state.session_keys.remove(session_id).await;
    if let Err(e) = state.cache.delete(&state.keys.session(session_id)).await {
        tracing::warn!(session_id = %session_id, "Could not remove abandoned session: {}", e);
    }
}

/// Handles a device's key exchange.
///
/// A device whose binding still resolves gets its existing session back
/// verbatim, including the previously stored client key; otherwise a new
/// session supersedes the binding.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `spec` - The device fingerprint.
/// * `client_public_key` - PEM public key supplied by the device.
pub async fn exchange_key(
    state: &AppState,
    spec: &str,
    client_public_key: &str,
) -> Result<ExchangeOutcome> {
    validate_spec(spec)?;
    channel::wrap(client_public_key)?;

    let device_key = state.keys.device(spec);
    if let Some(raw) = state.cache.get(&device_key).await? {
        let binding: DeviceBinding = sonic_rs::from_str(&raw)?;
        if let Some(session) = lookup_session(state, &binding.session_id).await? {
            tracing::info!(spec, session_id = %session.session_id, "🔁 Reusing bound session");
            return Ok(ExchangeOutcome {
                session,
                reused: true,
            });
        }
        tracing::info!(spec, stale = %binding.session_id, "Bound session expired, superseding");
        state.session_keys.remove(&binding.session_id).await;
    }

    let session = create_session(state, client_public_key).await?;
    let binding = DeviceBinding {
        spec: spec.to_string(),
        session_id: session.session_id,
    };
    let written = match sonic_rs::to_string(&binding) {
        Ok(json) => {
            state
                .cache
                .set_ex(&device_key, &json, state.config.session_ttl)
                .await
        }
        Err(e) => Err(e.into()),
    };
    if let Err(e) = written {
        tracing::error!(spec, session_id = %session.session_id, "❌ Device binding failed: {}", e);
        discard_session(state, &session.session_id).await;
        return Err(e);
    }

    tracing::info!(spec, session_id = %session.session_id, "✅ Device bound to new session");
    Ok(ExchangeOutcome {
        session,
        reused: false,
    })
}

/// Decrypts a payload a device encrypted with the server public key.
///
/// Only the process that created the session holds its private key. Keys of
/// sessions that no longer resolve are dropped on the way.
pub async fn decrypt_from_device(
    state: &AppState,
    session_id: &Uuid,
    ciphertext: &[u8],
) -> Result<Vec<u8>> {
    if lookup_session(state, session_id).await?.is_none() {
        state.session_keys.remove(session_id).await;
        tracing::warn!("❌ Unknown session: {}", session_id);
        return Err(AppError::UnknownSession);
    }

    let keys = state.session_keys.get(session_id).await.ok_or_else(|| {
        AppError::CryptoFailure(format!(
            "Private key of session {} is not held by this process",
            session_id
        ))
    })?;
    channel::decrypt(&keys.private, ciphertext)
}

/// Drops held private keys whose session no longer resolves.
///
/// # Returns
///
/// How many keys were dropped.
pub async fn prune_session_keys(state: &AppState) -> Result<usize> {
    let mut pruned = 0;
    for session_id in state.session_keys.session_ids().await {
        if lookup_session(state, &session_id).await?.is_none() {
            state.session_keys.remove(&session_id).await;
            pruned += 1;
        }
    }
    Ok(pruned)
}
