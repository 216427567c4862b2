//! Channel Handlers

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::service::ChannelUpdate;
use crate::domain::Channel;
use crate::presentation::http::extractors::{ok, ok_empty, ApiSuccess, AuthToken, ValidJson, ValidQuery};
use crate::shared::ChatError;
use crate::startup::AppState;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateChannelRequest {
    #[validate(length(min = 1))]
    pub display_name: String,
    pub is_private: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelIdResponse {
    pub channel_id: Uuid,
}

pub async fn create_channel(
    State(state): State<AppState>,
    AuthToken(token): AuthToken,
    ValidJson(body): ValidJson<CreateChannelRequest>,
) -> Result<Json<ApiSuccess<ChannelIdResponse>>, ChatError> {
    let channel = state
        .service
        .create_channel(&token, &body.display_name, body.is_private)
        .await?;
    Ok(ok(ChannelIdResponse {
        channel_id: channel.id,
    }))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateChannelRequest {
    pub channel_id: Uuid,
    pub display_name: Option<String>,
    pub description: Option<String>,
}

pub async fn update_channel(
    State(state): State<AppState>,
    AuthToken(token): AuthToken,
    ValidJson(body): ValidJson<UpdateChannelRequest>,
) -> Result<Json<ApiSuccess<Option<()>>>, ChatError> {
    state
        .service
        .update_channel(
            &token,
            body.channel_id,
            ChannelUpdate {
                display_name: body.display_name,
                description: body.description,
            },
        )
        .await?;
    Ok(ok_empty())
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RemoveChannelRequest {
    pub channel_id: Uuid,
}

pub async fn remove_channel(
    State(state): State<AppState>,
    AuthToken(token): AuthToken,
    ValidJson(body): ValidJson<RemoveChannelRequest>,
) -> Result<Json<ApiSuccess<Option<()>>>, ChatError> {
    state.service.remove_channel(&token, body.channel_id).await?;
    Ok(ok_empty())
}

pub async fn get_channels(
    State(state): State<AppState>,
    AuthToken(token): AuthToken,
) -> Result<Json<ApiSuccess<Vec<Channel>>>, ChatError> {
    let channels = state.service.get_channels(&token).await?;
    Ok(ok(channels))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GetChannelQuery {
    pub channel_id: Uuid,
}

pub async fn get_channel(
    State(state): State<AppState>,
    AuthToken(token): AuthToken,
    ValidQuery(query): ValidQuery<GetChannelQuery>,
) -> Result<Json<ApiSuccess<Channel>>, ChatError> {
    let channel = state.service.get_channel(&token, query.channel_id).await?;
    Ok(ok(channel))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MembershipRequest {
    pub user_id: Uuid,
    pub channel_id: Uuid,
}

pub async fn add_user_to_channel(
    State(state): State<AppState>,
    AuthToken(token): AuthToken,
    ValidJson(body): ValidJson<MembershipRequest>,
) -> Result<Json<ApiSuccess<Option<()>>>, ChatError> {
    state
        .service
        .add_user_to_channel(&token, body.user_id, body.channel_id)
        .await?;
    Ok(ok_empty())
}

pub async fn remove_user_from_channel(
    State(state): State<AppState>,
    AuthToken(token): AuthToken,
    ValidJson(body): ValidJson<MembershipRequest>,
) -> Result<Json<ApiSuccess<Option<()>>>, ChatError> {
    state
        .service
        .remove_user_from_channel(&token, body.user_id, body.channel_id)
        .await?;
    Ok(ok_empty())
}
