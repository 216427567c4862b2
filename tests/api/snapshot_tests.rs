//! Snapshot persistence tests: save/load must be lossless for every
//! observable API result, and message ids must keep increasing across a
//! restart.

use std::sync::Arc;

use serde_json::{json, Value};
use tempfile::TempDir;

use chitter::domain::service::ChatService;
use chitter::infrastructure::{CredentialRegistry, FileSnapshotStore, MemoryChatService};

use crate::common::{create_room, data, join_via_invite, TestApp};

async fn observable_state(app: &TestApp, token: &str, room_id: &str, channel_id: &str) -> Value {
    let room = data(app.get_auth(&format!("/api/getRoom?roomId={room_id}"), token).await).await;
    let users = data(app.get_auth("/api/getUsers", token).await).await;
    let channels = data(app.get_auth("/api/getChannels", token).await).await;
    let messages = data(
        app.get_auth(&format!("/api/getMessages?channelId={channel_id}"), token)
            .await,
    )
    .await;
    json!({"room": room, "users": users, "channels": channels, "messages": messages})
}

#[tokio::test]
async fn snapshot_restore_is_lossless_for_observable_results() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("mem.json");

    let store = Arc::new(FileSnapshotStore::new(path.clone()));
    let service = MemoryChatService::open(store, Arc::new(CredentialRegistry::new()))
        .await
        .unwrap();
    let app = TestApp::with_service(service).await;

    let (room, admin, general) = create_room(&app, "room", "admin", false).await;
    let token = admin["token"].as_str().unwrap();
    let room_id = room["id"].as_str().unwrap();
    let channel_id = general["id"].as_str().unwrap();

    join_via_invite(&app, token, "user").await;
    for n in 0..3 {
        let response = app
            .post_json_auth(
                "/api/createMessage",
                json!({
                    "content": {"text": format!("message {n}"), "facets": []},
                    "channelId": channel_id,
                }),
                token,
            )
            .await;
        data(response).await;
    }

    let before = observable_state(&app, token, room_id, channel_id).await;

    // Final save happens on close.
    app.service.close().await.unwrap();

    // A second service over the same file sees identical results.
    let store = Arc::new(FileSnapshotStore::new(path));
    let restored = MemoryChatService::open(store, Arc::new(CredentialRegistry::new()))
        .await
        .unwrap();
    let app = TestApp::with_service(restored).await;

    let after = observable_state(&app, token, room_id, channel_id).await;
    assert_eq!(before, after);
}

#[tokio::test]
async fn message_ids_keep_increasing_after_restore() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("mem.json");

    let store = Arc::new(FileSnapshotStore::new(path.clone()));
    let service = MemoryChatService::open(store, Arc::new(CredentialRegistry::new()))
        .await
        .unwrap();
    let app = TestApp::with_service(service).await;

    let (_, admin, general) = create_room(&app, "room", "admin", false).await;
    let token = admin["token"].as_str().unwrap();
    let channel_id = general["id"].as_str().unwrap();

    let mut last = 0;
    for n in 0..3 {
        let response = app
            .post_json_auth(
                "/api/createMessage",
                json!({
                    "content": {"text": format!("message {n}"), "facets": []},
                    "channelId": channel_id,
                }),
                token,
            )
            .await;
        last = data(response).await["messageId"].as_i64().unwrap();
    }

    app.service.close().await.unwrap();

    let store = Arc::new(FileSnapshotStore::new(path));
    let restored = MemoryChatService::open(store, Arc::new(CredentialRegistry::new()))
        .await
        .unwrap();
    let app = TestApp::with_service(restored).await;

    let response = app
        .post_json_auth(
            "/api/createMessage",
            json!({
                "content": {"text": "after restart", "facets": []},
                "channelId": channel_id,
            }),
            token,
        )
        .await;
    let id = data(response).await["messageId"].as_i64().unwrap();
    assert!(id > last, "{id} must exceed pre-restart {last}");
}
