//! Upload and attachment lifecycle tests.

use serde_json::json;

use crate::common::{create_room, data, error_tag, join_via_invite, tiny_png, TestApp};

#[tokio::test]
async fn image_upload_probes_dimensions_and_lands_on_disk() {
    let app = TestApp::new().await;
    let (_, admin, _) = create_room(&app, "room", "admin", true).await;
    let token = admin["token"].as_str().unwrap();

    let response = app
        .post_multipart_auth(
            "/api/uploadAttachment",
            token,
            "photo.png",
            "image/png",
            &tiny_png(),
        )
        .await;
    let attachment = data(response).await;

    assert_eq!(attachment["type"], "image");
    assert_eq!(attachment["fileName"], "photo.png");
    assert_eq!(attachment["width"], 2);
    assert_eq!(attachment["height"], 3);

    let path = attachment["path"].as_str().unwrap();
    assert!(path.ends_with(".png"));
    assert!(std::path::Path::new(path).exists(), "bytes must be on disk");
}

#[tokio::test]
async fn unsupported_mime_types_are_rejected() {
    let app = TestApp::new().await;
    let (_, admin, _) = create_room(&app, "room", "admin", true).await;
    let token = admin["token"].as_str().unwrap();

    let response = app
        .post_multipart_auth(
            "/api/uploadAttachment",
            token,
            "notes.txt",
            "text/plain",
            b"hello",
        )
        .await;
    assert_eq!(error_tag(response).await, "InvalidFileType");

    // Claimed image that does not decode is rejected too.
    let response = app
        .post_multipart_auth(
            "/api/uploadAttachment",
            token,
            "fake.png",
            "image/png",
            b"not a png",
        )
        .await;
    assert_eq!(error_tag(response).await, "InvalidFileType");
}

#[tokio::test]
async fn remove_attachment_deletes_the_record_and_the_file() {
    let app = TestApp::new().await;
    let (_, admin, _) = create_room(&app, "room", "admin", true).await;
    let token = admin["token"].as_str().unwrap();

    let response = app
        .post_multipart_auth(
            "/api/uploadAttachment",
            token,
            "photo.png",
            "image/png",
            &tiny_png(),
        )
        .await;
    let attachment = data(response).await;
    let path = attachment["path"].as_str().unwrap().to_string();

    let response = app
        .delete_json_auth(
            "/api/removeAttachment",
            json!({"attachmentId": attachment["id"]}),
            token,
        )
        .await;
    data(response).await;

    assert!(!std::path::Path::new(&path).exists(), "file must be unlinked");

    // Second removal: the record is gone.
    let response = app
        .delete_json_auth(
            "/api/removeAttachment",
            json!({"attachmentId": attachment["id"]}),
            token,
        )
        .await;
    assert_eq!(error_tag(response).await, "AttachmentNotFound");
}

#[tokio::test]
async fn only_the_owner_may_remove_an_attachment() {
    let app = TestApp::new().await;
    let (_, admin, _) = create_room(&app, "room", "admin", true).await;
    let admin_token = admin["token"].as_str().unwrap();
    let user = join_via_invite(&app, admin_token, "user").await;

    let response = app
        .post_multipart_auth(
            "/api/uploadAttachment",
            admin_token,
            "photo.png",
            "image/png",
            &tiny_png(),
        )
        .await;
    let attachment = data(response).await;

    let response = app
        .delete_json_auth(
            "/api/removeAttachment",
            json!({"attachmentId": attachment["id"]}),
            user["token"].as_str().unwrap(),
        )
        .await;
    assert_eq!(error_tag(response).await, "AttachmentNotFound");
}

#[tokio::test]
async fn attachments_resolve_into_message_content() {
    let app = TestApp::new().await;
    let (_, admin, general) = create_room(&app, "room", "admin", true).await;
    let token = admin["token"].as_str().unwrap();

    let response = app
        .post_multipart_auth(
            "/api/uploadAttachment",
            token,
            "photo.png",
            "image/png",
            &tiny_png(),
        )
        .await;
    let attachment = data(response).await;

    let response = app
        .post_json_auth(
            "/api/createMessage",
            json!({
                "content": {
                    "text": "look at this",
                    "facets": [],
                    "attachmentIds": [attachment["id"]],
                },
                "channelId": general["id"],
            }),
            token,
        )
        .await;
    data(response).await;

    let page = data(
        app.get_auth(
            &format!(
                "/api/getMessages?channelId={}",
                general["id"].as_str().unwrap()
            ),
            token,
        )
        .await,
    )
    .await;
    let content = &page[0]["content"];
    assert!(content.get("attachmentIds").is_none(), "ids are resolved away");
    assert_eq!(content["attachments"][0]["id"], attachment["id"]);
    assert_eq!(content["attachments"][0]["type"], "image");
}

#[tokio::test]
async fn uploaded_image_can_become_an_avatar_and_a_logo() {
    let app = TestApp::new().await;
    let (room, admin, _) = create_room(&app, "room", "admin", true).await;
    let token = admin["token"].as_str().unwrap();

    let response = app
        .post_multipart_auth(
            "/api/uploadAttachment",
            token,
            "photo.png",
            "image/png",
            &tiny_png(),
        )
        .await;
    let attachment = data(response).await;

    let response = app
        .post_json_auth(
            "/api/updateUser",
            json!({"avatar": attachment["id"]}),
            token,
        )
        .await;
    data(response).await;

    let response = app
        .post_json_auth(
            "/api/updateRoom",
            json!({
                "displayName": "room",
                "adminInviteOnly": true,
                "logoId": attachment["id"],
            }),
            token,
        )
        .await;
    data(response).await;

    let fetched = data(
        app.get_auth(
            &format!("/api/getRoom?roomId={}", room["id"].as_str().unwrap()),
            token,
        )
        .await,
    )
    .await;
    assert_eq!(fetched["logoId"], attachment["id"]);
}
