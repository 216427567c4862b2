//! Health and shutdown endpoint tests.

use serde_json::json;

use crate::common::{body_json, data, error_tag, TestApp, SHUTDOWN_TOKEN};

#[tokio::test]
async fn health_endpoints_respond() {
    let app = TestApp::new().await;

    let response = app.get_auth("/health", "").await;
    assert_eq!(response.status(), 200);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");

    let response = app.get_auth("/health/live", "").await;
    assert_eq!(response.status(), 200);
    let body = body_json(response).await;
    assert_eq!(body["status"], "alive");
}

#[tokio::test]
async fn shutdown_requires_the_configured_token() {
    let app = TestApp::new().await;

    let response = app
        .post_json("/api/shutdown", json!({"token": "wrong"}))
        .await;
    assert_eq!(error_tag(response).await, "Invalid parameters");

    let response = app
        .post_json("/api/shutdown", json!({"token": SHUTDOWN_TOKEN}))
        .await;
    data(response).await;
}

#[tokio::test]
async fn unauthenticated_requests_fail_with_their_operation_tag() {
    let app = TestApp::new().await;

    let response = app.get_auth("/api/getChannels", "").await;
    assert_eq!(error_tag(response).await, "InvalidUserToken");

    let response = app
        .post_json(
            "/api/createChannel",
            json!({"displayName": "x", "isPrivate": false}),
        )
        .await;
    assert_eq!(error_tag(response).await, "InvalidAdminTokenOrNonAdminUser");
}

#[tokio::test]
async fn malformed_bodies_fail_edge_validation() {
    let app = TestApp::new().await;

    let response = app.post_json("/api/createRoomAndAdmin", json!({})).await;
    assert_eq!(response.status(), 400);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Invalid parameters");

    let response = app
        .post_json(
            "/api/createRoomAndAdmin",
            json!({"roomName": "", "adminName": "a", "adminInviteOnly": false}),
        )
        .await;
    assert_eq!(response.status(), 400);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Invalid parameters");
    assert!(body["validationErrors"].is_array());
}
