//! Transfer Handlers
//!
//! Moving user identities between devices. Minting is deliberately
//! unauthenticated: supplying the tokens is the proof of control.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::presentation::http::dto::AuthorizedUserResponse;
use crate::presentation::http::extractors::{ok, ApiSuccess, ValidJson};
use crate::shared::ChatError;
use crate::startup::AppState;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransferRequest {
    pub user_tokens: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferCodeResponse {
    pub transfer_code: Uuid,
}

pub async fn create_transfer_bundle(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<CreateTransferRequest>,
) -> Result<Json<ApiSuccess<TransferCodeResponse>>, ChatError> {
    let transfer_code = state
        .service
        .create_transfer_bundle(&body.user_tokens)
        .await?;
    Ok(ok(TransferCodeResponse { transfer_code }))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RedeemTransferRequest {
    #[validate(length(min = 1))]
    pub transfer_code: String,
}

pub async fn get_transfer_bundle_from_code(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<RedeemTransferRequest>,
) -> Result<Json<ApiSuccess<Vec<AuthorizedUserResponse>>>, ChatError> {
    let users = state
        .service
        .get_transfer_bundle_from_code(&body.transfer_code)
        .await?;
    Ok(ok(users.into_iter().map(AuthorizedUserResponse::from).collect()))
}
