//! Channel and private-membership tests.

use serde_json::json;

use crate::common::{create_room, data, error_tag, join_via_invite, TestApp};

async fn create_channel(app: &TestApp, token: &str, name: &str, is_private: bool) -> String {
    let response = app
        .post_json_auth(
            "/api/createChannel",
            json!({"displayName": name, "isPrivate": is_private}),
            token,
        )
        .await;
    let payload = data(response).await;
    payload["channelId"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn private_channel_membership_lifecycle() {
    let app = TestApp::new().await;
    let (_, admin, _) = create_room(&app, "room", "admin", true).await;
    let admin_token = admin["token"].as_str().unwrap();

    let channel_id = create_channel(&app, admin_token, "channel", true).await;

    // The creating admin is auto-added.
    let response = app
        .get_auth(&format!("/api/getUsers?channelId={channel_id}"), admin_token)
        .await;
    let members = data(response).await;
    assert_eq!(members.as_array().unwrap().len(), 1);

    let user = join_via_invite(&app, admin_token, "user").await;
    let response = app
        .post_json_auth(
            "/api/addUserToChannel",
            json!({"userId": user["id"], "channelId": channel_id}),
            admin_token,
        )
        .await;
    data(response).await;

    let response = app
        .get_auth(&format!("/api/getUsers?channelId={channel_id}"), admin_token)
        .await;
    assert_eq!(data(response).await.as_array().unwrap().len(), 2);

    let response = app
        .post_json_auth(
            "/api/removeUserFromChannel",
            json!({"userId": user["id"], "channelId": channel_id}),
            admin_token,
        )
        .await;
    data(response).await;

    let response = app
        .get_auth(&format!("/api/getUsers?channelId={channel_id}"), admin_token)
        .await;
    assert_eq!(data(response).await.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn adding_a_member_twice_is_a_noop() {
    let app = TestApp::new().await;
    let (_, admin, _) = create_room(&app, "room", "admin", true).await;
    let admin_token = admin["token"].as_str().unwrap();
    let channel_id = create_channel(&app, admin_token, "channel", true).await;
    let user = join_via_invite(&app, admin_token, "user").await;

    for _ in 0..2 {
        let response = app
            .post_json_auth(
                "/api/addUserToChannel",
                json!({"userId": user["id"], "channelId": channel_id}),
                admin_token,
            )
            .await;
        data(response).await;
    }

    let response = app
        .get_auth(&format!("/api/getUsers?channelId={channel_id}"), admin_token)
        .await;
    assert_eq!(data(response).await.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn membership_requires_a_private_channel() {
    let app = TestApp::new().await;
    let (_, admin, general) = create_room(&app, "room", "admin", true).await;
    let admin_token = admin["token"].as_str().unwrap();
    let user = join_via_invite(&app, admin_token, "user").await;

    let response = app
        .post_json_auth(
            "/api/addUserToChannel",
            json!({"userId": user["id"], "channelId": general["id"]}),
            admin_token,
        )
        .await;
    assert_eq!(error_tag(response).await, "ChannelNotFoundOrNotPrivate");
}

#[tokio::test]
async fn get_channels_hides_private_channels_from_non_members() {
    let app = TestApp::new().await;
    let (_, admin, _) = create_room(&app, "room", "admin", true).await;
    let admin_token = admin["token"].as_str().unwrap();
    let channel_id = create_channel(&app, admin_token, "secret", true).await;
    let user = join_via_invite(&app, admin_token, "user").await;
    let user_token = user["token"].as_str().unwrap();

    // The participant only sees General.
    let response = app.get_auth("/api/getChannels", user_token).await;
    let channels = data(response).await;
    assert_eq!(channels.as_array().unwrap().len(), 1);
    assert_eq!(channels[0]["displayName"], "General");

    let response = app
        .get_auth(&format!("/api/getChannel?channelId={channel_id}"), user_token)
        .await;
    assert_eq!(error_tag(response).await, "ChannelNotFound");

    // Members see it.
    let response = app
        .post_json_auth(
            "/api/addUserToChannel",
            json!({"userId": user["id"], "channelId": channel_id}),
            admin_token,
        )
        .await;
    data(response).await;

    let response = app.get_auth("/api/getChannels", user_token).await;
    assert_eq!(data(response).await.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn removing_an_unknown_channel_is_a_noop_success() {
    let app = TestApp::new().await;
    let (_, admin, _) = create_room(&app, "room", "admin", true).await;

    let response = app
        .post_json_auth(
            "/api/removeChannel",
            json!({"channelId": uuid::Uuid::new_v4()}),
            admin["token"].as_str().unwrap(),
        )
        .await;
    data(response).await;
}

#[tokio::test]
async fn update_channel_changes_name_and_description() {
    let app = TestApp::new().await;
    let (_, admin, _) = create_room(&app, "room", "admin", true).await;
    let admin_token = admin["token"].as_str().unwrap();
    let channel_id = create_channel(&app, admin_token, "before", false).await;

    let response = app
        .post_json_auth(
            "/api/updateChannel",
            json!({"channelId": channel_id, "displayName": "after", "description": "d"}),
            admin_token,
        )
        .await;
    data(response).await;

    let response = app
        .get_auth(&format!("/api/getChannel?channelId={channel_id}"), admin_token)
        .await;
    let channel = data(response).await;
    assert_eq!(channel["displayName"], "after");
    assert_eq!(channel["description"], "d");
}

#[tokio::test]
async fn channel_creation_requires_an_admin() {
    let app = TestApp::new().await;
    let (_, admin, _) = create_room(&app, "room", "admin", true).await;
    let user = join_via_invite(&app, admin["token"].as_str().unwrap(), "user").await;

    let response = app
        .post_json_auth(
            "/api/createChannel",
            json!({"displayName": "nope", "isPrivate": false}),
            user["token"].as_str().unwrap(),
        )
        .await;
    assert_eq!(error_tag(response).await, "InvalidAdminTokenOrNonAdminUser");
}

#[tokio::test]
async fn removing_a_channel_removes_its_messages() {
    let app = TestApp::new().await;
    let (_, admin, _) = create_room(&app, "room", "admin", true).await;
    let admin_token = admin["token"].as_str().unwrap();
    let channel_id = create_channel(&app, admin_token, "doomed", false).await;

    let response = app
        .post_json_auth(
            "/api/createMessage",
            json!({"content": {"text": "going away", "facets": []}, "channelId": channel_id}),
            admin_token,
        )
        .await;
    let message_id = data(response).await["messageId"].as_i64().unwrap();

    let response = app
        .post_json_auth(
            "/api/removeChannel",
            json!({"channelId": channel_id}),
            admin_token,
        )
        .await;
    data(response).await;

    // The message is gone with the channel, not merely orphaned.
    let response = app
        .post_json_auth(
            "/api/removeMessage",
            json!({"messageId": message_id}),
            admin_token,
        )
        .await;
    assert_eq!(error_tag(response).await, "MessageNotFound");
}
