//! Room Handlers

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::service::RoomUpdate;
use crate::domain::{Channel, Room};
use crate::presentation::http::dto::AuthorizedUserResponse;
use crate::presentation::http::extractors::{ok, ok_empty, ApiSuccess, AuthToken, ValidJson, ValidQuery};
use crate::shared::ChatError;
use crate::startup::AppState;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    #[validate(length(min = 1))]
    pub room_name: String,
    #[validate(length(min = 1))]
    pub admin_name: String,
    pub admin_invite_only: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomBootstrapResponse {
    pub room: Room,
    pub admin: AuthorizedUserResponse,
    pub general_channel: Channel,
}

pub async fn create_room_and_admin(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<CreateRoomRequest>,
) -> Result<Json<ApiSuccess<RoomBootstrapResponse>>, ChatError> {
    let bootstrap = state
        .service
        .create_room_and_admin(&body.room_name, &body.admin_name, body.admin_invite_only)
        .await?;

    Ok(ok(RoomBootstrapResponse {
        room: bootstrap.room,
        admin: bootstrap.admin.into(),
        general_channel: bootstrap.general_channel,
    }))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRoomRequest {
    #[validate(length(min = 1))]
    pub display_name: String,
    pub admin_invite_only: bool,
    pub description: Option<String>,
    pub logo_id: Option<Uuid>,
}

pub async fn update_room(
    State(state): State<AppState>,
    AuthToken(token): AuthToken,
    ValidJson(body): ValidJson<UpdateRoomRequest>,
) -> Result<Json<ApiSuccess<Option<()>>>, ChatError> {
    state
        .service
        .update_room(
            &token,
            RoomUpdate {
                display_name: body.display_name,
                admin_invite_only: body.admin_invite_only,
                description: body.description,
                logo_id: body.logo_id,
            },
        )
        .await?;

    Ok(ok_empty())
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GetRoomQuery {
    pub room_id: Uuid,
}

pub async fn get_room(
    State(state): State<AppState>,
    AuthToken(token): AuthToken,
    ValidQuery(query): ValidQuery<GetRoomQuery>,
) -> Result<Json<ApiSuccess<Room>>, ChatError> {
    let room = state.service.get_room(&token, query.room_id).await?;
    Ok(ok(room))
}
