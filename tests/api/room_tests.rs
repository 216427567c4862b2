//! Room lifecycle tests.

use serde_json::json;

use crate::common::{create_room, data, error_tag, TestApp};

#[tokio::test]
async fn create_room_and_admin_bootstraps_everything() {
    let app = TestApp::new().await;
    let (room, admin, general) = create_room(&app, "room", "admin", true).await;

    assert_eq!(room["displayName"], "room");
    assert_eq!(room["adminInviteOnly"], true);

    assert_eq!(admin["displayName"], "admin");
    assert_eq!(admin["role"], "admin");
    assert_eq!(admin["roomId"], room["id"]);
    assert!(admin["token"].is_string(), "admin token must be returned");

    assert_eq!(general["displayName"], "General");
    assert_eq!(general["isPrivate"], false);
    assert_eq!(general["createdBy"], admin["id"]);
    assert_eq!(general["roomId"], room["id"]);
}

#[tokio::test]
async fn update_room_round_trips_through_get_room() {
    let app = TestApp::new().await;
    let (room, admin, _) = create_room(&app, "room", "admin", true).await;
    let token = admin["token"].as_str().unwrap();

    let response = app
        .post_json_auth(
            "/api/updateRoom",
            json!({
                "displayName": "new room name",
                "adminInviteOnly": false,
                "description": "This is a description",
            }),
            token,
        )
        .await;
    data(response).await;

    let response = app
        .get_auth(
            &format!("/api/getRoom?roomId={}", room["id"].as_str().unwrap()),
            token,
        )
        .await;
    let fetched = data(response).await;

    assert_eq!(fetched["displayName"], "new room name");
    assert_eq!(fetched["description"], "This is a description");
    assert_eq!(fetched["adminInviteOnly"], false);
    assert_eq!(fetched["createdAt"], room["createdAt"]);
}

#[tokio::test]
async fn get_room_only_reveals_the_callers_room() {
    let app = TestApp::new().await;
    let (_, admin_a, _) = create_room(&app, "a", "admin", false).await;
    let (room_b, _, _) = create_room(&app, "b", "admin", false).await;

    let response = app
        .get_auth(
            &format!("/api/getRoom?roomId={}", room_b["id"].as_str().unwrap()),
            admin_a["token"].as_str().unwrap(),
        )
        .await;
    assert_eq!(error_tag(response).await, "RoomNotFound");
}

#[tokio::test]
async fn update_room_requires_an_admin_token() {
    let app = TestApp::new().await;
    create_room(&app, "room", "admin", false).await;

    let response = app
        .post_json_auth(
            "/api/updateRoom",
            json!({"displayName": "x", "adminInviteOnly": false}),
            "not-a-token",
        )
        .await;
    assert_eq!(error_tag(response).await, "InvalidAdminToken");
}

#[tokio::test]
async fn update_room_rejects_unknown_logo() {
    let app = TestApp::new().await;
    let (_, admin, _) = create_room(&app, "room", "admin", false).await;

    let response = app
        .post_json_auth(
            "/api/updateRoom",
            json!({
                "displayName": "room",
                "adminInviteOnly": false,
                "logoId": uuid::Uuid::new_v4(),
            }),
            admin["token"].as_str().unwrap(),
        )
        .await;
    assert_eq!(error_tag(response).await, "InvalidOrNonImageLogoAttachment");
}
