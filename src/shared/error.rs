//! Service Error Types
//!
//! Every service operation either returns its payload or exactly one of the
//! tags below. The `Display` output of each variant is the stable wire tag
//! that the HTTP edge writes into the response envelope, so variants must
//! never be renamed without a protocol bump.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Tagged service error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ChatError {
    // Authentication
    #[error("InvalidUserToken")]
    InvalidUserToken,
    #[error("InvalidAdminToken")]
    InvalidAdminToken,
    #[error("InvalidAdminTokenOrNonAdminUser")]
    InvalidAdminTokenOrNonAdminUser,
    #[error("InvalidToken")]
    InvalidToken,

    // Scope and visibility
    #[error("UserNotFoundInAdminsRoom")]
    UserNotFoundInAdminsRoom,
    #[error("ChannelNotFoundInUsersRoom")]
    ChannelNotFoundInUsersRoom,
    #[error("UserIsNotMemberOfPrivateChannel")]
    UserIsNotMemberOfPrivateChannel,
    #[error("RoomNotFound")]
    RoomNotFound,
    #[error("ChannelNotFound")]
    ChannelNotFound,
    #[error("UserNotFound")]
    UserNotFound,
    #[error("MessageNotFound")]
    MessageNotFound,
    #[error("AttachmentNotFound")]
    AttachmentNotFound,
    #[error("ChannelNotFoundOrNotPrivate")]
    ChannelNotFoundOrNotPrivate,

    // Policy
    #[error("UserIsNotAdminAndRoomIsAdminInviteOnly")]
    UserIsNotAdminAndRoomIsAdminInviteOnly,
    #[error("UserNotAuthorizedToDeleteThisMessage")]
    UserNotAuthorizedToDeleteThisMessage,
    #[error("UserNotAuthorizedToEditThisMessage")]
    UserNotAuthorizedToEditThisMessage,
    #[error("MessageCannotTargetBothAChannelAndADirectUser")]
    MessageCannotTargetBothAChannelAndADirectUser,
    #[error("EitherChannelIdOrDirectMessageUserIdMustBeProvided")]
    EitherChannelIdOrDirectMessageUserIdMustBeProvided,
    #[error("DisplayNameAlreadyExistsInTheRoom")]
    DisplayNameAlreadyExistsInTheRoom,

    // Content
    #[error("InvalidContentStructure")]
    InvalidContentStructure,
    #[error("InvalidTextContent")]
    InvalidTextContent,
    #[error("InvalidFacet")]
    InvalidFacet,
    #[error("InvalidEmbed")]
    InvalidEmbed,
    #[error("InvalidAttachmentIDs")]
    InvalidAttachmentIds,
    #[error("InvalidOrNonImageLogoAttachment")]
    InvalidOrNonImageLogoAttachment,
    #[error("InvalidOrNonImageAvatarAttachment")]
    InvalidOrNonImageAvatarAttachment,
    #[error("InvalidFileType")]
    InvalidFileType,

    // Credentials
    #[error("InvalidInviteCode")]
    InvalidInviteCode,
    #[error("InvalidOrExpiredTransferCode")]
    InvalidOrExpiredTransferCode,
    #[error("NoValidTokens")]
    NoValidTokens,

    // Storage failures, one per operation
    #[error("CouldNotCreateRoomAndAdmin")]
    CouldNotCreateRoomAndAdmin,
    #[error("CouldNotCreateInviteCode")]
    CouldNotCreateInviteCode,
    #[error("CouldNotCreateUserFromInviteCode")]
    CouldNotCreateUserFromInviteCode,
    #[error("CouldNotRemoveUser")]
    CouldNotRemoveUser,
    #[error("CouldNotCreateMessage")]
    CouldNotCreateMessage,
    #[error("CouldNotRemoveMessage")]
    CouldNotRemoveMessage,
    #[error("CouldNotEditMessage")]
    CouldNotEditMessage,
    #[error("CouldNotUpdateRoom")]
    CouldNotUpdateRoom,
    #[error("CouldNotUpdateUser")]
    CouldNotUpdateUser,
    #[error("CouldNotChangeUserRole")]
    CouldNotChangeUserRole,
    #[error("CouldNotGetMessages")]
    CouldNotGetMessages,
    #[error("CouldNotGetUsers")]
    CouldNotGetUsers,
    #[error("CouldNotRetrieveUserDetails")]
    CouldNotRetrieveUserDetails,
    #[error("CouldNotRetrieveChannels")]
    CouldNotRetrieveChannels,
    #[error("CouldNotCreateChannel")]
    CouldNotCreateChannel,
    #[error("CouldNotRemoveChannel")]
    CouldNotRemoveChannel,
    #[error("CouldNotUpdateChannel")]
    CouldNotUpdateChannel,
    #[error("CouldNotAddUserToChannel")]
    CouldNotAddUserToChannel,
    #[error("CouldNotRemoveUserFromChannel")]
    CouldNotRemoveUserFromChannel,
    #[error("CouldNotCreateTransferCode")]
    CouldNotCreateTransferCode,
    #[error("CouldNotFetchUserDataFromTransferCode")]
    CouldNotFetchUserDataFromTransferCode,
    #[error("CouldNotUploadAttachment")]
    CouldNotUploadAttachment,
    #[error("CouldNotRemoveAttachment")]
    CouldNotRemoveAttachment,
    #[error("CouldNotCreateTables")]
    CouldNotCreateTables,

    // Generic
    #[error("Invalid parameters")]
    InvalidParameters,
    #[error("Unknown server error")]
    UnknownServerError,
}

impl ChatError {
    /// The stable string tag carried in the response envelope.
    pub fn tag(&self) -> String {
        self.to_string()
    }
}

/// Error response envelope.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    #[serde(rename = "validationErrors")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_errors: Option<Vec<String>>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            validation_errors: None,
        }
    }
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let status = match self {
            ChatError::UnknownServerError => {
                tracing::error!("unexpected failure surfaced to client");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::BAD_REQUEST,
        };

        (status, Json(ErrorBody::new(self.tag()))).into_response()
    }
}
