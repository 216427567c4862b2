//! The chat service contract.
//!
//! Both storage backends implement this trait; every caller, including the
//! HTTP edge and the test harnesses, goes through it. Each method resolves
//! the supplied token to a user before touching any other state, then runs
//! its scope checks against resolved ids only. Methods return the success
//! payload or exactly one [`ChatError`] tag; no partial commits.

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::domain::entities::{
    Attachment, Channel, Message, MessageTarget, NewAttachment, Role, Room, User,
};
use crate::shared::ChatError;

/// Everything `create_room_and_admin` commits atomically.
#[derive(Debug, Clone)]
pub struct RoomBootstrap {
    pub room: Room,
    /// First user, role admin, token included.
    pub admin: User,
    /// Public channel named "General", created by the admin.
    pub general_channel: Channel,
}

/// Fields applied by `update_room`.
#[derive(Debug, Clone)]
pub struct RoomUpdate {
    pub display_name: String,
    pub admin_invite_only: bool,
    pub description: Option<String>,
    /// Must reference an image-type attachment when set.
    pub logo_id: Option<Uuid>,
}

/// Fields applied by `update_user`. Absent fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub display_name: Option<String>,
    pub description: Option<String>,
    /// Must reference an image-type attachment owned by the caller when set.
    pub avatar_id: Option<Uuid>,
}

/// Fields applied by `update_channel`. Absent fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct ChannelUpdate {
    pub display_name: Option<String>,
    pub description: Option<String>,
}

/// Selector and paging window for `get_messages`.
///
/// Exactly one of `channel_id` / `direct_message_user_id` must be set.
/// `cursor` is an exclusive upper bound on message id; results come back in
/// strictly descending id order, at most `limit` of them.
#[derive(Debug, Clone, Copy)]
pub struct MessageQuery {
    pub channel_id: Option<Uuid>,
    pub direct_message_user_id: Option<Uuid>,
    pub cursor: Option<i64>,
    pub limit: i64,
}

/// Default page size when the caller does not specify a limit.
pub const DEFAULT_MESSAGE_LIMIT: i64 = 25;

/// Hard ceiling enforced at the edge.
pub const MAX_MESSAGE_LIMIT: i64 = 100;

/// The room/channel/message/membership state machine.
#[async_trait]
pub trait ChatService: Send + Sync {
    /// Create a room, its first admin (token included), and the public
    /// "General" channel, atomically.
    async fn create_room_and_admin(
        &self,
        room_name: &str,
        admin_name: &str,
        admin_invite_only: bool,
    ) -> Result<RoomBootstrap, ChatError>;

    async fn update_room(&self, admin_token: &str, update: RoomUpdate) -> Result<(), ChatError>;

    /// Only the caller's own room is retrievable.
    async fn get_room(&self, user_token: &str, room_id: Uuid) -> Result<Room, ChatError>;

    /// Mint a 24 h one-shot invite code scoped to the caller's room.
    async fn create_invite_code(&self, user_token: &str) -> Result<Uuid, ChatError>;

    /// Consume an invite code and create a participant. A display-name
    /// collision leaves the code unconsumed.
    async fn create_user_from_invite_code(
        &self,
        invite_code: &str,
        display_name: &str,
    ) -> Result<User, ChatError>;

    /// Wipe the user's private-channel memberships and rotate their token.
    /// Their messages are preserved.
    async fn remove_user(&self, admin_token: &str, user_id: Uuid) -> Result<(), ChatError>;

    async fn update_user(&self, user_token: &str, update: UserUpdate) -> Result<(), ChatError>;

    async fn set_user_role(
        &self,
        admin_token: &str,
        user_id: Uuid,
        role: Role,
    ) -> Result<(), ChatError>;

    /// The room roster, or the member list of a private channel in the
    /// caller's room when `channel_id` is given.
    async fn get_users(
        &self,
        user_token: &str,
        channel_id: Option<Uuid>,
    ) -> Result<Vec<User>, ChatError>;

    async fn get_user(&self, user_token: &str, user_id: Uuid) -> Result<User, ChatError>;

    /// Unauthenticated: supplying the tokens IS the proof of control. Every
    /// resolvable token contributes its user to the 1 h one-shot bundle.
    async fn create_transfer_bundle(&self, user_tokens: &[String]) -> Result<Uuid, ChatError>;

    /// One-shot redemption; returns the bundled users with tokens included.
    async fn get_transfer_bundle_from_code(
        &self,
        transfer_code: &str,
    ) -> Result<Vec<User>, ChatError>;

    /// Sanitize content, resolve attachment ids against the caller's
    /// attachments, and append. The returned id is strictly greater than any
    /// id previously returned by this backend.
    async fn create_message(
        &self,
        user_token: &str,
        content: &Value,
        target: MessageTarget,
    ) -> Result<i64, ChatError>;

    /// Author, or an admin in the author's room.
    async fn remove_message(&self, user_token: &str, message_id: i64) -> Result<(), ChatError>;

    /// Same authorization as removal; re-sanitizes and re-resolves
    /// attachments, then flags the message as edited.
    async fn edit_message(
        &self,
        user_token: &str,
        message_id: i64,
        content: &Value,
    ) -> Result<(), ChatError>;

    async fn get_messages(
        &self,
        user_token: &str,
        query: MessageQuery,
    ) -> Result<Vec<Message>, ChatError>;

    /// Admin only. Private channels auto-add the creating admin as a member.
    async fn create_channel(
        &self,
        admin_token: &str,
        display_name: &str,
        is_private: bool,
    ) -> Result<Channel, ChatError>;

    async fn update_channel(
        &self,
        admin_token: &str,
        channel_id: Uuid,
        update: ChannelUpdate,
    ) -> Result<(), ChatError>;

    /// Removes the channel and every message in it. Removing an id that does
    /// not exist in the admin's room succeeds as a no-op.
    async fn remove_channel(&self, admin_token: &str, channel_id: Uuid) -> Result<(), ChatError>;

    /// Public channels of the caller's room plus private channels the caller
    /// belongs to.
    async fn get_channels(&self, user_token: &str) -> Result<Vec<Channel>, ChatError>;

    async fn get_channel(&self, user_token: &str, channel_id: Uuid) -> Result<Channel, ChatError>;

    /// Channel must be private and in the admin's room. Adding an existing
    /// member is a no-op success.
    async fn add_user_to_channel(
        &self,
        admin_token: &str,
        user_id: Uuid,
        channel_id: Uuid,
    ) -> Result<(), ChatError>;

    async fn remove_user_from_channel(
        &self,
        admin_token: &str,
        user_id: Uuid,
        channel_id: Uuid,
    ) -> Result<(), ChatError>;

    /// Record uploaded media whose bytes are already on disk at
    /// `upload.path`.
    async fn upload_attachment(
        &self,
        user_token: &str,
        upload: NewAttachment,
    ) -> Result<Attachment, ChatError>;

    /// Caller must own the attachment. Deletes the record and unlinks the
    /// file if present.
    async fn remove_attachment(
        &self,
        user_token: &str,
        attachment_id: Uuid,
    ) -> Result<(), ChatError>;

    /// Release storage handles and stop background tasks. The in-memory
    /// backend performs a final snapshot save here.
    async fn close(&self) -> Result<(), ChatError>;
}

/// Tokens and codes are opaque 128-bit values on the wire; anything that does
/// not parse is simply an unknown credential.
pub fn parse_credential(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw.trim()).ok()
}
