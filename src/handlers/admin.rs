use axum::{extract::State, response::IntoResponse};
use garde::Validate;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::Result,
    handlers::common::{JsonBody, ok},
    services::authorization::{self as authorization_service, AuthGrant, MAX_VALIDITY_DAYS},
    state::AppState,
};

#[derive(Deserialize, Validate)]
pub struct MyClientsRequest {
    #[garde(length(max = 1024))]
    pub auth_code: String,
}

/// The request payload for a licence update.
#[derive(Deserialize, Validate)]
pub struct UpdateAuthRequest {
    #[garde(length(max = 1024))]
    pub auth_code: String,
    #[garde(skip)]
    pub username: String,
    #[garde(range(min = 0))]
    pub quota: i32,
    /// Days from now until the licence lapses.
    #[garde(range(min = 0, max = MAX_VALIDITY_DAYS))]
    pub validate_time: i64,
}

#[derive(Deserialize, Validate)]
pub struct InfoByIdRequest {
    #[garde(length(max = 1024))]
    pub auth_code: String,
    #[garde(skip)]
    pub client_uuid: Uuid,
}

#[derive(Deserialize, Validate)]
pub struct InfoBySpecRequest {
    #[garde(length(max = 1024))]
    pub auth_code: String,
    #[serde(default)]
    #[garde(skip)]
    pub spec: String,
}

/// Lists the users and clients visible to the caller.
pub async fn my_clients(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<MyClientsRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let overview = authorization_service::my_clients(&state, &payload.auth_code).await?;
    Ok(ok(overview))
}

/// Sets a user's quota and validity window.
pub async fn update_auth(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<UpdateAuthRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;

    authorization_service::update_auth(
        &state,
        &payload.auth_code,
        AuthGrant {
            username: &payload.username,
            quota: payload.quota,
            validity_days: payload.validate_time,
        },
    )
    .await?;

    Ok(ok(()))
}

pub async fn info_by_id(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<InfoByIdRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let client =
        authorization_service::client_info_by_id(&state, &payload.auth_code, &payload.client_uuid)
            .await?;
    Ok(ok(client))
}

pub async fn info_by_spec(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<InfoBySpecRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let client =
        authorization_service::client_info_by_spec(&state, &payload.auth_code, &payload.spec)
            .await?;
    Ok(ok(client))
}
