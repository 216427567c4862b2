//! Route Configuration
//!
//! RPC-style surface under `/api`: mutating operations are POSTs named after
//! the service call, readers are GETs with query parameters, and attachment
//! deletion uses DELETE. Health probes live outside the API prefix.

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};

use super::handlers;
use crate::presentation::http::handlers::attachment::MAX_UPLOAD_BYTES;
use crate::startup::AppState;

/// Create the main API router.
pub fn create_router(state: AppState) -> Router {
    handlers::system::init_server_start();

    Router::new()
        .nest("/api", api_routes())
        // Health check endpoints
        .route("/health", get(handlers::system::health_check))
        .route("/health/live", get(handlers::system::liveness))
        .with_state(state)
}

/// Chat service operations.
fn api_routes() -> Router<AppState> {
    Router::new()
        // Rooms
        .route(
            "/createRoomAndAdmin",
            post(handlers::room::create_room_and_admin),
        )
        .route("/updateRoom", post(handlers::room::update_room))
        .route("/getRoom", get(handlers::room::get_room))
        // Users and invites
        .route(
            "/createInviteCode",
            post(handlers::user::create_invite_code),
        )
        .route(
            "/createUserFromInviteCode",
            post(handlers::user::create_user_from_invite_code),
        )
        .route("/removeUser", post(handlers::user::remove_user))
        .route("/updateUser", post(handlers::user::update_user))
        .route("/setUserRole", post(handlers::user::set_user_role))
        .route("/getUsers", get(handlers::user::get_users))
        .route("/getUser", get(handlers::user::get_user))
        // Transfers
        .route(
            "/createTransferBundle",
            post(handlers::transfer::create_transfer_bundle),
        )
        .route(
            "/getTransferBundleFromCode",
            post(handlers::transfer::get_transfer_bundle_from_code),
        )
        // Messages
        .route("/createMessage", post(handlers::message::create_message))
        .route("/removeMessage", post(handlers::message::remove_message))
        .route("/editMessage", post(handlers::message::edit_message))
        .route("/getMessages", get(handlers::message::get_messages))
        // Channels
        .route("/createChannel", post(handlers::channel::create_channel))
        .route("/updateChannel", post(handlers::channel::update_channel))
        .route("/removeChannel", post(handlers::channel::remove_channel))
        .route("/getChannels", get(handlers::channel::get_channels))
        .route("/getChannel", get(handlers::channel::get_channel))
        .route(
            "/addUserToChannel",
            post(handlers::channel::add_user_to_channel),
        )
        .route(
            "/removeUserFromChannel",
            post(handlers::channel::remove_user_from_channel),
        )
        // Attachments
        .route(
            "/uploadAttachment",
            post(handlers::attachment::upload_attachment)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route(
            "/removeAttachment",
            delete(handlers::attachment::remove_attachment),
        )
        // Lifecycle
        .route("/shutdown", post(handlers::system::shutdown))
}
