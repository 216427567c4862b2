//! Invite, roster, role, and removal tests.

use serde_json::json;

use crate::common::{create_room, data, error_tag, join_via_invite, TestApp};

#[tokio::test]
async fn invite_join_and_list() {
    let app = TestApp::new().await;
    let (room, admin, _) = create_room(&app, "room", "admin", true).await;
    let admin_token = admin["token"].as_str().unwrap();

    let user = join_via_invite(&app, admin_token, "user").await;
    assert_eq!(user["role"], "participant");
    assert_eq!(user["roomId"], room["id"]);
    assert!(user["token"].is_string());

    let response = app.get_auth("/api/getUsers", admin_token).await;
    let users = data(response).await;
    assert_eq!(users.as_array().unwrap().len(), 2);

    // The roster never leaks tokens.
    for entry in users.as_array().unwrap() {
        assert!(entry.get("token").is_none());
    }
}

#[tokio::test]
async fn invite_code_is_one_shot() {
    let app = TestApp::new().await;
    let (_, admin, _) = create_room(&app, "room", "admin", true).await;

    let response = app
        .post_json_auth(
            "/api/createInviteCode",
            json!({}),
            admin["token"].as_str().unwrap(),
        )
        .await;
    let invite = data(response).await;

    let response = app
        .post_json(
            "/api/createUserFromInviteCode",
            json!({"inviteCode": invite["inviteCode"], "displayName": "first"}),
        )
        .await;
    data(response).await;

    let response = app
        .post_json(
            "/api/createUserFromInviteCode",
            json!({"inviteCode": invite["inviteCode"], "displayName": "second"}),
        )
        .await;
    assert_eq!(error_tag(response).await, "InvalidInviteCode");
}

#[tokio::test]
async fn unknown_invite_code_is_rejected() {
    let app = TestApp::new().await;

    let response = app
        .post_json(
            "/api/createUserFromInviteCode",
            json!({"inviteCode": uuid::Uuid::new_v4(), "displayName": "user"}),
        )
        .await;
    assert_eq!(error_tag(response).await, "InvalidInviteCode");
}

#[tokio::test]
async fn display_name_collision_does_not_burn_the_code() {
    let app = TestApp::new().await;
    let (_, admin, _) = create_room(&app, "room", "admin", true).await;

    let response = app
        .post_json_auth(
            "/api/createInviteCode",
            json!({}),
            admin["token"].as_str().unwrap(),
        )
        .await;
    let invite = data(response).await;

    // "admin" is already taken in the room.
    let response = app
        .post_json(
            "/api/createUserFromInviteCode",
            json!({"inviteCode": invite["inviteCode"], "displayName": "admin"}),
        )
        .await;
    assert_eq!(
        error_tag(response).await,
        "DisplayNameAlreadyExistsInTheRoom"
    );

    // The same code still works with a fresh name.
    let response = app
        .post_json(
            "/api/createUserFromInviteCode",
            json!({"inviteCode": invite["inviteCode"], "displayName": "someone else"}),
        )
        .await;
    data(response).await;
}

#[tokio::test]
async fn participants_cannot_mint_invites_in_admin_invite_only_rooms() {
    let app = TestApp::new().await;
    let (_, admin, _) = create_room(&app, "room", "admin", true).await;
    let user = join_via_invite(&app, admin["token"].as_str().unwrap(), "user").await;

    let response = app
        .post_json_auth(
            "/api/createInviteCode",
            json!({}),
            user["token"].as_str().unwrap(),
        )
        .await;
    assert_eq!(
        error_tag(response).await,
        "UserIsNotAdminAndRoomIsAdminInviteOnly"
    );

    // Admins always may, even in admin-invite-only rooms.
    let response = app
        .post_json_auth(
            "/api/createInviteCode",
            json!({}),
            admin["token"].as_str().unwrap(),
        )
        .await;
    data(response).await;
}

#[tokio::test]
async fn participants_can_mint_invites_in_open_rooms() {
    let app = TestApp::new().await;
    let (_, admin, _) = create_room(&app, "room", "admin", false).await;
    let user = join_via_invite(&app, admin["token"].as_str().unwrap(), "user").await;

    let response = app
        .post_json_auth(
            "/api/createInviteCode",
            json!({}),
            user["token"].as_str().unwrap(),
        )
        .await;
    data(response).await;
}

#[tokio::test]
async fn remove_user_revokes_the_token_and_memberships() {
    let app = TestApp::new().await;
    let (_, admin, _) = create_room(&app, "room", "admin", true).await;
    let admin_token = admin["token"].as_str().unwrap();
    let user = join_via_invite(&app, admin_token, "user").await;
    let user_token = user["token"].as_str().unwrap();

    let response = app
        .post_json_auth(
            "/api/removeUser",
            json!({"userId": user["id"]}),
            admin_token,
        )
        .await;
    data(response).await;

    // The old token no longer resolves.
    let response = app.get_auth("/api/getChannels", user_token).await;
    assert_eq!(error_tag(response).await, "InvalidUserToken");

    // The user row and roster entry survive.
    let response = app.get_auth("/api/getUsers", admin_token).await;
    let users = data(response).await;
    assert_eq!(users.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn remove_user_is_scoped_to_the_admins_room() {
    let app = TestApp::new().await;
    let (_, admin_a, _) = create_room(&app, "a", "admin", false).await;
    let (_, admin_b, _) = create_room(&app, "b", "admin", false).await;

    let response = app
        .post_json_auth(
            "/api/removeUser",
            json!({"userId": admin_b["id"]}),
            admin_a["token"].as_str().unwrap(),
        )
        .await;
    assert_eq!(error_tag(response).await, "UserNotFoundInAdminsRoom");
}

#[tokio::test]
async fn set_user_role_promotes_and_demotes() {
    let app = TestApp::new().await;
    let (_, admin, _) = create_room(&app, "room", "admin", true).await;
    let admin_token = admin["token"].as_str().unwrap();
    let user = join_via_invite(&app, admin_token, "user").await;

    let response = app
        .post_json_auth(
            "/api/setUserRole",
            json!({"userId": user["id"], "role": "admin"}),
            admin_token,
        )
        .await;
    data(response).await;

    let response = app
        .get_auth(
            &format!("/api/getUser?userId={}", user["id"].as_str().unwrap()),
            admin_token,
        )
        .await;
    let fetched = data(response).await;
    assert_eq!(fetched["role"], "admin");

    // A participant cannot change roles.
    let demoted = join_via_invite(&app, admin_token, "other").await;
    let response = app
        .post_json_auth(
            "/api/setUserRole",
            json!({"userId": user["id"], "role": "participant"}),
            demoted["token"].as_str().unwrap(),
        )
        .await;
    assert_eq!(error_tag(response).await, "InvalidAdminTokenOrNonAdminUser");
}

#[tokio::test]
async fn update_user_applies_partial_changes() {
    let app = TestApp::new().await;
    let (_, admin, _) = create_room(&app, "room", "admin", true).await;
    let token = admin["token"].as_str().unwrap();

    let response = app
        .post_json_auth(
            "/api/updateUser",
            json!({"description": "hello there"}),
            token,
        )
        .await;
    data(response).await;

    let response = app
        .get_auth(
            &format!("/api/getUser?userId={}", admin["id"].as_str().unwrap()),
            token,
        )
        .await;
    let fetched = data(response).await;
    assert_eq!(fetched["displayName"], "admin");
    assert_eq!(fetched["description"], "hello there");
}

#[tokio::test]
async fn update_user_rejects_foreign_avatar() {
    let app = TestApp::new().await;
    let (_, admin, _) = create_room(&app, "room", "admin", true).await;

    let response = app
        .post_json_auth(
            "/api/updateUser",
            json!({"avatar": uuid::Uuid::new_v4()}),
            admin["token"].as_str().unwrap(),
        )
        .await;
    assert_eq!(
        error_tag(response).await,
        "InvalidOrNonImageAvatarAttachment"
    );
}
