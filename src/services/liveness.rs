use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::{
    crypto::channel,
    error::{AppError, Result},
    models::{
        client::{ClientRecord, ClientStatus},
        session::SessionRecord,
    },
    services::session,
    state::AppState,
};

/// What a heartbeat tells the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatReply {
    pub should_stop: bool,
}

/// How a heartbeat reply travels back to the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyEncoding {
    /// JSON encrypted with the device's public key, hex encoded.
    Encrypted,
    /// JSON as is.
    Plain,
}

/// A heartbeat reply ready for the envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum EncodedReply {
    Ciphertext(String),
    Plain(HeartbeatReply),
}

/// Writes the liveness entry of a client with the standard TTL.
///
/// Presence of this entry is the only "recently seen" signal.
pub async fn refresh(state: &AppState, client: &ClientRecord) -> Result<()> {
    let snapshot = sonic_rs::to_string(client)?;
    state
        .cache
        .set_ex(
            &state.keys.client(&client.id),
            &snapshot,
            state.config.liveness_ttl,
        )
        .await
}

/// Status shown to observers, derived from durable status and whether the
/// liveness entry could be found.
///
/// A missing entry turns `online` into `offline`; a failed lookup reads as
/// `disabled`. Never persisted.
pub fn effective_status(durable: ClientStatus, liveness: Result<bool>) -> ClientStatus {
    match liveness {
        Ok(true) => durable,
        Ok(false) if durable == ClientStatus::Online => ClientStatus::Offline,
        Ok(false) => durable,
        Err(_) => ClientStatus::Disabled,
    }
}

/// Returns a copy of `client` carrying its effective status.
pub async fn project(state: &AppState, mut client: ClientRecord) -> ClientRecord {
    let liveness = state
        .cache
        .ttl(&state.keys.client(&client.id))
        .await
        .map(|ttl| ttl.is_present());
    if let Err(e) = &liveness {
        tracing::warn!("Liveness lookup failed for {}: {}", client.id, e);
    }
    client.status = effective_status(client.status, liveness);
    client
}

/// Records a heartbeat and decides whether the device must stop.
///
/// Only durable status is consulted: `disabled` stops the device, anything
/// else lets it continue. Offline is never written here.
pub async fn heartbeat(
    state: &AppState,
    session_id: &Uuid,
    client_id: &Uuid,
) -> Result<(SessionRecord, HeartbeatReply)> {
    let session = session::require_session(state, session_id).await?;

    let client = state
        .repo
        .find_client_by_id(client_id)
        .await?
        .ok_or_else(|| {
            tracing::warn!("❌ Heartbeat from unknown client {}", client_id);
            AppError::UnknownClient
        })?;

    match state.cache.get(&state.keys.session_client(session_id)).await? {
        Some(bound) if bound != client_id.to_string() => {
            tracing::warn!(
                session_id = %session_id,
                bound = %bound,
                presented = %client_id,
                "Heartbeat client differs from the client that logged in over this session"
            );
        }
        _ => {}
    }

    refresh(state, &client).await?;

    let should_stop = client.status == ClientStatus::Disabled;
    if should_stop {
        tracing::info!("⛔ Client {} is disabled, instructing it to stop", client.id);
    }

    Ok((session, HeartbeatReply { should_stop }))
}

/// Encodes a reply for the wire.
///
/// Encrypted replies use the public key the device supplied when the
/// session was created.
pub fn encode_reply(
    session: &SessionRecord,
    reply: HeartbeatReply,
    encoding: ReplyEncoding,
) -> Result<EncodedReply> {
    match encoding {
        ReplyEncoding::Plain => Ok(EncodedReply::Plain(reply)),
        ReplyEncoding::Encrypted => {
            let handle = channel::wrap(&session.client_public_key)?;
            let json = sonic_rs::to_vec(&reply)?;
            let ciphertext = channel::encrypt(&handle, &json)?;
            Ok(EncodedReply::Ciphertext(hex::encode(ciphertext)))
        }
    }
}
