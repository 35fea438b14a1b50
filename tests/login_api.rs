use axum::http::StatusCode;
use chrono::{Duration, Utc};
use license_gate::models::client::ClientStatus;
use uuid::Uuid;

mod support;

use support::{
    ALICE_PASSWORD, BOB_PASSWORD, CAROL_PASSWORD, device_keys, exchange_key, login, login_ok,
    seed_user, test_router, test_state,
};

#[tokio::test]
async fn test_first_login_creates_online_client() {
    let state = test_state();
    let app = test_router(&state);
    seed_user(&state, "alice", 5, 30).await;

    let (session_id, _) = exchange_key(&app, "dev-1", device_keys()).await;
    let client_id = login_ok(&app, session_id, "alice", ALICE_PASSWORD, "SN-1").await;

    let client = state.repo.find_client_by_id(&client_id).await.unwrap().unwrap();
    assert_eq!(client.client_sn, "SN-1");
    assert_eq!(client.owning_user, "alice");
    assert_eq!(client.status, ClientStatus::Online);
    assert_eq!(client.network_type, "wifi");

    // Seen immediately, before any heartbeat
    let liveness = state.cache.ttl(&state.keys.client(&client_id)).await.unwrap();
    assert!(liveness.is_present());
}

#[tokio::test]
async fn test_repeated_login_updates_network_only() {
    let state = test_state();
    let app = test_router(&state);
    seed_user(&state, "alice", 5, 30).await;

    let (session_id, _) = exchange_key(&app, "dev-1", device_keys()).await;
    let first = login_ok(&app, session_id, "alice", ALICE_PASSWORD, "SN-1").await;
    let before = state.repo.find_client_by_id(&first).await.unwrap().unwrap();

    let (status, envelope) = login(&app, session_id, "alice", ALICE_PASSWORD, "SN-1", "4g").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(envelope["body"]["client_uuid"], first.to_string());

    let clients = state.repo.list_clients_by_owner("alice").await.unwrap();
    assert_eq!(clients.len(), 1);
    let after = &clients[0];
    assert_eq!(after.id, before.id);
    assert_eq!(after.network_type, "4g");
    assert_eq!(after.status, before.status);
    assert_eq!(after.created_at, before.created_at);
    assert!(after.modified_at >= before.modified_at);
}

#[tokio::test]
async fn test_login_does_not_reset_durable_status() {
    let state = test_state();
    let app = test_router(&state);
    seed_user(&state, "alice", 5, 30).await;

    let mut disabled =
        license_gate::models::client::ClientRecord::first_seen("alice", "SN-9", "wifi");
    disabled.status = ClientStatus::Disabled;
    state.repo.insert_client(&disabled).await.unwrap();

    let (session_id, _) = exchange_key(&app, "dev-1", device_keys()).await;
    let client_id = login_ok(&app, session_id, "alice", ALICE_PASSWORD, "SN-9").await;

    assert_eq!(client_id, disabled.id);
    let stored = state.repo.find_client_by_id(&client_id).await.unwrap().unwrap();
    assert_eq!(stored.status, ClientStatus::Disabled);
}

#[tokio::test]
async fn test_login_on_foreign_serial_is_ownership_conflict() {
    let state = test_state();
    let app = test_router(&state);
    seed_user(&state, "alice", 5, 30).await;
    seed_user(&state, "bob", 5, 30).await;

    let (session_id, _) = exchange_key(&app, "dev-1", device_keys()).await;
    let client_id = login_ok(&app, session_id, "alice", ALICE_PASSWORD, "SN-1").await;
    let before = state.repo.find_client_by_id(&client_id).await.unwrap().unwrap();

    let (status, envelope) = login(&app, session_id, "bob", BOB_PASSWORD, "SN-1", "ethernet").await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(envelope["code"], -9);
    let after = state.repo.find_client_by_id(&client_id).await.unwrap().unwrap();
    assert_eq!(after, before);
    assert!(state.repo.list_clients_by_owner("bob").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_wrong_password_is_invalid_credential() {
    let state = test_state();
    let app = test_router(&state);
    seed_user(&state, "alice", 5, 30).await;

    let (session_id, _) = exchange_key(&app, "dev-1", device_keys()).await;
    let (status, envelope) = login(&app, session_id, "alice", "guess", "SN-1", "wifi").await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(envelope["code"], -8);
    assert!(state.repo.list_clients().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_credential_is_checked_before_session() {
    let state = test_state();
    let app = test_router(&state);

    let (_, envelope) = login(&app, Uuid::new_v4(), "alice", "guess", "SN-1", "wifi").await;
    assert_eq!(envelope["code"], -8);
}

#[tokio::test]
async fn test_unknown_session_is_rejected() {
    let state = test_state();
    let app = test_router(&state);
    seed_user(&state, "alice", 5, 30).await;

    let (status, envelope) =
        login(&app, Uuid::new_v4(), "alice", ALICE_PASSWORD, "SN-1", "wifi").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(envelope["code"], -5);
    assert!(state.repo.list_clients().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_user_without_licence_is_unknown_user() {
    let state = test_state();
    let app = test_router(&state);

    let (session_id, _) = exchange_key(&app, "dev-1", device_keys()).await;
    let (status, envelope) = login(&app, session_id, "carol", CAROL_PASSWORD, "SN-1", "wifi").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(envelope["code"], -7);
}

#[tokio::test]
async fn test_expired_licence_is_rejected() {
    let state = test_state();
    let app = test_router(&state);
    let mut user = seed_user(&state, "alice", 5, 30).await;
    user.validate_until = Utc::now() - Duration::days(1);
    state.repo.save_user(&user).await.unwrap();

    let (session_id, _) = exchange_key(&app, "dev-1", device_keys()).await;
    let (status, envelope) = login(&app, session_id, "alice", ALICE_PASSWORD, "SN-1", "wifi").await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(envelope["code"], -14);
    assert!(state.repo.list_clients().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_quota_limits_new_clients_only() {
    let state = test_state();
    let app = test_router(&state);
    seed_user(&state, "alice", 1, 30).await;

    let (session_id, _) = exchange_key(&app, "dev-1", device_keys()).await;
    let first = login_ok(&app, session_id, "alice", ALICE_PASSWORD, "SN-1").await;

    let (status, envelope) = login(&app, session_id, "alice", ALICE_PASSWORD, "SN-2", "wifi").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(envelope["code"], -13);

    let again = login_ok(&app, session_id, "alice", ALICE_PASSWORD, "SN-1").await;
    assert_eq!(again, first);
    assert_eq!(state.repo.count_clients_by_owner("alice").await.unwrap(), 1);
}

#[tokio::test]
async fn test_empty_serial_number_is_input_malformed() {
    let state = test_state();
    let app = test_router(&state);
    seed_user(&state, "alice", 5, 30).await;

    let (session_id, _) = exchange_key(&app, "dev-1", device_keys()).await;
    let (status, envelope) = login(&app, session_id, "alice", ALICE_PASSWORD, "", "wifi").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(envelope["code"], -1);
}
