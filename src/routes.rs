use axum::{Router, routing::post};
use http::{Method, header};
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::{
    handlers::{admin, client},
    state::AppState,
};

/// Largest request body accepted on any route.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Builds the application router.
///
/// Rate limiting is left to the caller since it needs the peer address.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(86400));

    let device_routes = Router::new()
        .route("/api/v0/client/exchange_key", post(client::exchange_key))
        .route("/api/v0/client/login", post(client::login))
        .route("/api/v0/client/heartbeat", post(client::heartbeat_v0))
        .route("/api/v1/client/heartbeat", post(client::heartbeat_v1));

    let admin_routes = Router::new()
        .route("/api/v0/client/myclients", post(admin::my_clients))
        .route("/api/v0/client/update_auth", post(admin::update_auth))
        .route("/api/v0/client/infobyid", post(admin::info_by_id))
        .route("/api/v0/client/infobyspec", post(admin::info_by_spec));

    Router::new()
        .merge(device_routes)
        .merge(admin_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(false))
                .on_request(DefaultOnRequest::default().level(Level::DEBUG))
                .on_response(DefaultOnResponse::default().level(Level::DEBUG))
                .on_failure(DefaultOnFailure::default().level(Level::ERROR)),
        )
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(cors)
        .with_state(state)
}
