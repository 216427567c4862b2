//! Transfer bundle tests.

use serde_json::json;

use crate::common::{create_room, data, error_tag, join_via_invite, TestApp};

#[tokio::test]
async fn transfer_bundle_round_trips_users_with_tokens() {
    let app = TestApp::new().await;
    let (_, admin, _) = create_room(&app, "room", "admin", true).await;
    let admin_token = admin["token"].as_str().unwrap();
    let user = join_via_invite(&app, admin_token, "user").await;

    let response = app
        .post_json(
            "/api/createTransferBundle",
            json!({"userTokens": [admin_token, user["token"]]}),
        )
        .await;
    let transfer = data(response).await;
    let code = transfer["transferCode"].as_str().unwrap().to_string();

    let response = app
        .post_json(
            "/api/getTransferBundleFromCode",
            json!({"transferCode": code}),
        )
        .await;
    let users = data(response).await;
    let users = users.as_array().unwrap();
    assert_eq!(users.len(), 2);
    for entry in users {
        assert!(entry["token"].is_string(), "bundle must include tokens");
    }

    // One-shot: the second redemption fails.
    let response = app
        .post_json(
            "/api/getTransferBundleFromCode",
            json!({"transferCode": code}),
        )
        .await;
    assert_eq!(error_tag(response).await, "InvalidOrExpiredTransferCode");
}

#[tokio::test]
async fn unknown_tokens_contribute_nothing() {
    let app = TestApp::new().await;
    let (_, admin, _) = create_room(&app, "room", "admin", true).await;

    let response = app
        .post_json(
            "/api/createTransferBundle",
            json!({"userTokens": [admin["token"], uuid::Uuid::new_v4().to_string()]}),
        )
        .await;
    let code = data(response).await["transferCode"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .post_json(
            "/api/getTransferBundleFromCode",
            json!({"transferCode": code}),
        )
        .await;
    assert_eq!(data(response).await.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn a_bundle_needs_at_least_one_valid_token() {
    let app = TestApp::new().await;
    create_room(&app, "room", "admin", true).await;

    let response = app
        .post_json(
            "/api/createTransferBundle",
            json!({"userTokens": ["garbage", uuid::Uuid::new_v4().to_string()]}),
        )
        .await;
    assert_eq!(error_tag(response).await, "NoValidTokens");

    let response = app
        .post_json("/api/createTransferBundle", json!({"userTokens": []}))
        .await;
    assert_eq!(error_tag(response).await, "NoValidTokens");
}
