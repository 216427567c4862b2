//! User Handlers
//!
//! Invite minting and consumption, roster queries, role changes, and user
//! removal.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::entities::Role;
use crate::domain::service::UserUpdate;
use crate::presentation::http::dto::{AuthorizedUserResponse, UserResponse};
use crate::presentation::http::extractors::{ok, ok_empty, ApiSuccess, AuthToken, ValidJson, ValidQuery};
use crate::shared::ChatError;
use crate::startup::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteCodeResponse {
    pub invite_code: Uuid,
}

pub async fn create_invite_code(
    State(state): State<AppState>,
    AuthToken(token): AuthToken,
) -> Result<Json<ApiSuccess<InviteCodeResponse>>, ChatError> {
    let invite_code = state.service.create_invite_code(&token).await?;
    Ok(ok(InviteCodeResponse { invite_code }))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    #[validate(length(min = 1))]
    pub invite_code: String,
    #[validate(length(min = 1))]
    pub display_name: String,
}

pub async fn create_user_from_invite_code(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<JoinRequest>,
) -> Result<Json<ApiSuccess<AuthorizedUserResponse>>, ChatError> {
    let user = state
        .service
        .create_user_from_invite_code(&body.invite_code, &body.display_name)
        .await?;
    Ok(ok(user.into()))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RemoveUserRequest {
    pub user_id: Uuid,
}

pub async fn remove_user(
    State(state): State<AppState>,
    AuthToken(token): AuthToken,
    ValidJson(body): ValidJson<RemoveUserRequest>,
) -> Result<Json<ApiSuccess<Option<()>>>, ChatError> {
    state.service.remove_user(&token, body.user_id).await?;
    Ok(ok_empty())
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub display_name: Option<String>,
    pub description: Option<String>,
    /// Attachment id; must be an image owned by the caller.
    pub avatar: Option<Uuid>,
}

pub async fn update_user(
    State(state): State<AppState>,
    AuthToken(token): AuthToken,
    ValidJson(body): ValidJson<UpdateUserRequest>,
) -> Result<Json<ApiSuccess<Option<()>>>, ChatError> {
    state
        .service
        .update_user(
            &token,
            UserUpdate {
                display_name: body.display_name,
                description: body.description,
                avatar_id: body.avatar,
            },
        )
        .await?;
    Ok(ok_empty())
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SetUserRoleRequest {
    pub user_id: Uuid,
    pub role: Role,
}

pub async fn set_user_role(
    State(state): State<AppState>,
    AuthToken(token): AuthToken,
    ValidJson(body): ValidJson<SetUserRoleRequest>,
) -> Result<Json<ApiSuccess<Option<()>>>, ChatError> {
    state
        .service
        .set_user_role(&token, body.user_id, body.role)
        .await?;
    Ok(ok_empty())
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GetUsersQuery {
    pub channel_id: Option<Uuid>,
}

pub async fn get_users(
    State(state): State<AppState>,
    AuthToken(token): AuthToken,
    ValidQuery(query): ValidQuery<GetUsersQuery>,
) -> Result<Json<ApiSuccess<Vec<UserResponse>>>, ChatError> {
    let users = state.service.get_users(&token, query.channel_id).await?;
    Ok(ok(users.into_iter().map(UserResponse::from).collect()))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GetUserQuery {
    pub user_id: Uuid,
}

pub async fn get_user(
    State(state): State<AppState>,
    AuthToken(token): AuthToken,
    ValidQuery(query): ValidQuery<GetUserQuery>,
) -> Result<Json<ApiSuccess<UserResponse>>, ChatError> {
    let user = state.service.get_user(&token, query.user_id).await?;
    Ok(ok(user.into()))
}
