//! Message Handlers

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::entities::{Message, MessageTarget};
use crate::domain::service::{MessageQuery, DEFAULT_MESSAGE_LIMIT};
use crate::presentation::http::extractors::{ok, ok_empty, ApiSuccess, AuthToken, ValidJson, ValidQuery};
use crate::shared::ChatError;
use crate::startup::AppState;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateMessageRequest {
    /// Raw content; the service sanitizes it.
    pub content: serde_json::Value,
    pub channel_id: Option<Uuid>,
    pub direct_message_user_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageIdResponse {
    pub message_id: i64,
}

pub async fn create_message(
    State(state): State<AppState>,
    AuthToken(token): AuthToken,
    ValidJson(body): ValidJson<CreateMessageRequest>,
) -> Result<Json<ApiSuccess<MessageIdResponse>>, ChatError> {
    let message_id = state
        .service
        .create_message(
            &token,
            &body.content,
            MessageTarget {
                channel_id: body.channel_id,
                direct_message_user_id: body.direct_message_user_id,
            },
        )
        .await?;
    Ok(ok(MessageIdResponse { message_id }))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RemoveMessageRequest {
    pub message_id: i64,
}

pub async fn remove_message(
    State(state): State<AppState>,
    AuthToken(token): AuthToken,
    ValidJson(body): ValidJson<RemoveMessageRequest>,
) -> Result<Json<ApiSuccess<Option<()>>>, ChatError> {
    state.service.remove_message(&token, body.message_id).await?;
    Ok(ok_empty())
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EditMessageRequest {
    pub message_id: i64,
    pub content: serde_json::Value,
}

pub async fn edit_message(
    State(state): State<AppState>,
    AuthToken(token): AuthToken,
    ValidJson(body): ValidJson<EditMessageRequest>,
) -> Result<Json<ApiSuccess<Option<()>>>, ChatError> {
    state
        .service
        .edit_message(&token, body.message_id, &body.content)
        .await?;
    Ok(ok_empty())
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GetMessagesQuery {
    pub channel_id: Option<Uuid>,
    pub direct_message_user_id: Option<Uuid>,
    /// Exclusive upper bound on message id.
    pub cursor: Option<i64>,
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<i64>,
}

pub async fn get_messages(
    State(state): State<AppState>,
    AuthToken(token): AuthToken,
    ValidQuery(query): ValidQuery<GetMessagesQuery>,
) -> Result<Json<ApiSuccess<Vec<Message>>>, ChatError> {
    let messages = state
        .service
        .get_messages(
            &token,
            MessageQuery {
                channel_id: query.channel_id,
                direct_message_user_id: query.direct_message_user_id,
                cursor: query.cursor,
                limit: query.limit.unwrap_or(DEFAULT_MESSAGE_LIMIT),
            },
        )
        .await?;
    Ok(ok(messages))
}
