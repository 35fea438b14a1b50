use axum::{extract::State, response::IntoResponse};
use garde::Validate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    handlers::common::{JsonBody, ok},
    services::{
        client::{self as client_service, LoginAttempt},
        liveness::{self, ReplyEncoding},
        session as session_service,
    },
    state::AppState,
};

/// The request payload for a key exchange.
#[derive(Deserialize, Debug, Validate)]
pub struct ExchangeKeyRequest {
    #[serde(default)]
    #[garde(skip)]
    pub spec: String,
    #[garde(length(max = 16384))]
    pub public_key: String,
}

#[derive(Serialize)]
pub struct ExchangeKeyResponse {
    pub session_id: Uuid,
    /// PEM of the server public key for this session.
    pub public_key: String,
}

/// The request payload for a device login.
#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[garde(skip)]
    pub session_id: Uuid,
    #[garde(skip)]
    pub client_user: String,
    #[garde(length(max = 1024))]
    pub client_passwd: String,
    #[garde(skip)]
    pub client_sn: String,
    #[serde(default)]
    #[garde(length(max = 64))]
    pub network_type: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub client_uuid: Uuid,
}

/// The request payload for a heartbeat.
///
/// The client id is either sent as is or inside `payload`, the hex of
/// `{"client_uuid": ...}` encrypted with the session's server public key.
#[derive(Deserialize, Debug, Validate)]
pub struct HeartbeatRequest {
    #[garde(skip)]
    pub session_id: Uuid,
    #[serde(default)]
    #[garde(skip)]
    pub client_uuid: Option<Uuid>,
    #[serde(default)]
    #[garde(length(max = 4096))]
    pub payload: Option<String>,
}

#[derive(Deserialize)]
struct SealedClientId {
    client_uuid: Uuid,
}

/// Handles a key exchange.
pub async fn exchange_key(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<ExchangeKeyRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;

    let outcome =
        session_service::exchange_key(&state, &payload.spec, &payload.public_key).await?;

    Ok(ok(ExchangeKeyResponse {
        session_id: outcome.session.session_id,
        public_key: outcome.session.server_public_key,
    }))
}

/// Handles a device login.
pub async fn login(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;

    let client_uuid = client_service::login(
        &state,
        LoginAttempt {
            session_id: payload.session_id,
            username: &payload.client_user,
            password: &payload.client_passwd,
            client_sn: &payload.client_sn,
            network_type: &payload.network_type,
        },
    )
    .await?;

    Ok(ok(LoginResponse { client_uuid }))
}

async fn resolve_client_id(state: &AppState, request: &HeartbeatRequest) -> Result<Uuid> {
    if let Some(client_uuid) = request.client_uuid {
        return Ok(client_uuid);
    }

    let Some(sealed) = &request.payload else {
        return Err(AppError::InputMalformed(
            "client_uuid or payload is required".to_string(),
        ));
    };
    let ciphertext = hex::decode(sealed)
        .map_err(|e| AppError::InputMalformed(format!("payload is not hex: {}", e)))?;
    let plaintext =
        session_service::decrypt_from_device(state, &request.session_id, &ciphertext).await?;
    let opened: SealedClientId = sonic_rs::from_slice(&plaintext)
        .map_err(|e| {
            AppError::InputMalformed(format!("payload does not carry a client_uuid: {}", e))
        })?;

    Ok(opened.client_uuid)
}

async fn heartbeat(
    state: AppState,
    payload: HeartbeatRequest,
    encoding: ReplyEncoding,
) -> Result<impl IntoResponse> {
    payload.validate()?;

    let client_id = resolve_client_id(&state, &payload).await?;
    let (session, reply) = liveness::heartbeat(&state, &payload.session_id, &client_id).await?;
    tracing::debug!(client_id = %client_id, should_stop = reply.should_stop, "💓 Heartbeat");

    Ok(ok(liveness::encode_reply(&session, reply, encoding)?))
}

/// Handles a heartbeat answered with a ciphertext only the device can read.
pub async fn heartbeat_v0(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<HeartbeatRequest>,
) -> Result<impl IntoResponse> {
    heartbeat(state, payload, ReplyEncoding::Encrypted).await
}

/// Handles a heartbeat answered in plain JSON.
pub async fn heartbeat_v1(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<HeartbeatRequest>,
) -> Result<impl IntoResponse> {
    heartbeat(state, payload, ReplyEncoding::Plain).await
}
