//! PostgreSQL backend.
//!
//! Implements the full [`ChatService`] contract against a `PgPool`. Every
//! multi-row mutation runs inside `BEGIN … COMMIT`; any error path rolls the
//! transaction back and surfaces the operation's `CouldNot…` tag. Operations
//! are grouped one file per entity, mirroring the table layout.

mod attachments;
mod channels;
mod messages;
mod rooms;
mod users;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::content::Content;
use crate::domain::entities::{
    Attachment, AttachmentKind, Channel, Message, MessageTarget, NewAttachment, Role, Room, User,
};
use crate::domain::service::{parse_credential, ChannelUpdate, ChatService, MessageQuery, RoomBootstrap, RoomUpdate, UserUpdate};
use crate::infrastructure::credentials::CredentialRegistry;
use crate::shared::ChatError;

/// Chat service backed by PostgreSQL.
pub struct PostgresChatService {
    pool: PgPool,
    registry: Arc<CredentialRegistry>,
}

impl PostgresChatService {
    /// Wrap an existing pool. `create_tables` must have run already.
    pub fn new(pool: PgPool, registry: Arc<CredentialRegistry>) -> Self {
        CredentialRegistry::start_sweeper(&registry);
        Self { pool, registry }
    }

    pub(crate) fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub(crate) fn registry(&self) -> &CredentialRegistry {
        &self.registry
    }

    /// Resolve a raw token string to its user, if any.
    pub(crate) async fn user_by_token(&self, token: &str) -> Result<Option<User>, sqlx::Error> {
        let Some(token) = parse_credential(token) else {
            return Ok(None);
        };
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, room_id, created_at, token, display_name, description, avatar_id, role
            FROM users
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(UserRow::into_user))
    }

    /// Resolve a token and require the admin role.
    pub(crate) async fn admin_by_token(&self, token: &str) -> Result<Option<User>, sqlx::Error> {
        Ok(self
            .user_by_token(token)
            .await?
            .filter(|user| user.role.is_admin()))
    }

    /// Fetch a user by id within a specific room.
    pub(crate) async fn user_in_room(
        &self,
        user_id: Uuid,
        room_id: Uuid,
    ) -> Result<Option<User>, sqlx::Error> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, room_id, created_at, token, display_name, description, avatar_id, role
            FROM users
            WHERE id = $1 AND room_id = $2
            "#,
        )
        .bind(user_id)
        .bind(room_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(UserRow::into_user))
    }
}

/// Log a storage failure and collapse it to the operation's tag.
pub(crate) fn storage_error(op: &'static str, tag: ChatError) -> impl FnOnce(sqlx::Error) -> ChatError {
    move |err| {
        tracing::error!(op, error = %err, "storage failure");
        tag
    }
}

/// Row type for the `users` table.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct UserRow {
    id: Uuid,
    room_id: Uuid,
    created_at: DateTime<Utc>,
    token: Uuid,
    display_name: String,
    description: Option<String>,
    avatar_id: Option<Uuid>,
    role: String,
}

impl UserRow {
    pub(crate) fn into_user(self) -> User {
        User {
            id: self.id,
            room_id: self.room_id,
            created_at: self.created_at,
            token: self.token,
            display_name: self.display_name,
            description: self.description,
            avatar_id: self.avatar_id,
            // The CHECK constraint admits exactly these two values.
            role: Role::parse(&self.role).unwrap_or(Role::Participant),
        }
    }
}

/// Row type for the `rooms` table.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct RoomRow {
    id: Uuid,
    created_at: DateTime<Utc>,
    display_name: String,
    description: Option<String>,
    logo_id: Option<Uuid>,
    admin_invite_only: bool,
}

impl RoomRow {
    pub(crate) fn into_room(self) -> Room {
        Room {
            id: self.id,
            created_at: self.created_at,
            display_name: self.display_name,
            description: self.description,
            logo_id: self.logo_id,
            admin_invite_only: self.admin_invite_only,
        }
    }
}

/// Row type for the `channels` table.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ChannelRow {
    id: Uuid,
    room_id: Uuid,
    created_at: DateTime<Utc>,
    display_name: String,
    description: Option<String>,
    is_private: bool,
    created_by: Uuid,
}

impl ChannelRow {
    pub(crate) fn into_channel(self) -> Channel {
        Channel {
            id: self.id,
            room_id: self.room_id,
            created_at: self.created_at,
            display_name: self.display_name,
            description: self.description,
            is_private: self.is_private,
            created_by: self.created_by,
        }
    }
}

/// Row type for the `messages` table.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct MessageRow {
    id: i64,
    user_id: Uuid,
    created_at: DateTime<Utc>,
    content: sqlx::types::Json<Content>,
    channel_id: Option<Uuid>,
    direct_message_user_id: Option<Uuid>,
    edited: bool,
}

impl MessageRow {
    pub(crate) fn into_message(self) -> Message {
        Message {
            id: self.id,
            user_id: self.user_id,
            created_at: self.created_at,
            content: self.content.0,
            channel_id: self.channel_id,
            direct_message_user_id: self.direct_message_user_id,
            edited: self.edited,
        }
    }
}

/// Row type for the `attachments` table.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct AttachmentRow {
    id: Uuid,
    #[sqlx(rename = "type")]
    kind: String,
    user_id: Uuid,
    file_name: String,
    path: String,
    width: Option<i32>,
    height: Option<i32>,
    created_at: DateTime<Utc>,
}

impl AttachmentRow {
    pub(crate) fn into_attachment(self) -> Attachment {
        Attachment {
            id: self.id,
            kind: AttachmentKind::parse(&self.kind).unwrap_or(AttachmentKind::File),
            user_id: self.user_id,
            file_name: self.file_name,
            path: self.path,
            width: self.width,
            height: self.height,
            created_at: self.created_at,
        }
    }
}

#[async_trait]
impl ChatService for PostgresChatService {
    async fn create_room_and_admin(
        &self,
        room_name: &str,
        admin_name: &str,
        admin_invite_only: bool,
    ) -> Result<RoomBootstrap, ChatError> {
        self.create_room_and_admin(room_name, admin_name, admin_invite_only)
            .await
    }

    async fn update_room(&self, admin_token: &str, update: RoomUpdate) -> Result<(), ChatError> {
        self.update_room(admin_token, update).await
    }

    async fn get_room(&self, user_token: &str, room_id: Uuid) -> Result<Room, ChatError> {
        self.get_room(user_token, room_id).await
    }

    async fn create_invite_code(&self, user_token: &str) -> Result<Uuid, ChatError> {
        self.create_invite_code(user_token).await
    }

    async fn create_user_from_invite_code(
        &self,
        invite_code: &str,
        display_name: &str,
    ) -> Result<User, ChatError> {
        self.create_user_from_invite_code(invite_code, display_name)
            .await
    }

    async fn remove_user(&self, admin_token: &str, user_id: Uuid) -> Result<(), ChatError> {
        self.remove_user(admin_token, user_id).await
    }

    async fn update_user(&self, user_token: &str, update: UserUpdate) -> Result<(), ChatError> {
        self.update_user(user_token, update).await
    }

    async fn set_user_role(
        &self,
        admin_token: &str,
        user_id: Uuid,
        role: Role,
    ) -> Result<(), ChatError> {
        self.set_user_role(admin_token, user_id, role).await
    }

    async fn get_users(
        &self,
        user_token: &str,
        channel_id: Option<Uuid>,
    ) -> Result<Vec<User>, ChatError> {
        self.get_users(user_token, channel_id).await
    }

    async fn get_user(&self, user_token: &str, user_id: Uuid) -> Result<User, ChatError> {
        self.get_user(user_token, user_id).await
    }

    async fn create_transfer_bundle(&self, user_tokens: &[String]) -> Result<Uuid, ChatError> {
        self.create_transfer_bundle(user_tokens).await
    }

    async fn get_transfer_bundle_from_code(
        &self,
        transfer_code: &str,
    ) -> Result<Vec<User>, ChatError> {
        self.get_transfer_bundle_from_code(transfer_code).await
    }

    async fn create_message(
        &self,
        user_token: &str,
        content: &Value,
        target: MessageTarget,
    ) -> Result<i64, ChatError> {
        self.create_message(user_token, content, target).await
    }

    async fn remove_message(&self, user_token: &str, message_id: i64) -> Result<(), ChatError> {
        self.remove_message(user_token, message_id).await
    }

    async fn edit_message(
        &self,
        user_token: &str,
        message_id: i64,
        content: &Value,
    ) -> Result<(), ChatError> {
        self.edit_message(user_token, message_id, content).await
    }

    async fn get_messages(
        &self,
        user_token: &str,
        query: MessageQuery,
    ) -> Result<Vec<Message>, ChatError> {
        self.get_messages(user_token, query).await
    }

    async fn create_channel(
        &self,
        admin_token: &str,
        display_name: &str,
        is_private: bool,
    ) -> Result<Channel, ChatError> {
        self.create_channel(admin_token, display_name, is_private)
            .await
    }

    async fn update_channel(
        &self,
        admin_token: &str,
        channel_id: Uuid,
        update: ChannelUpdate,
    ) -> Result<(), ChatError> {
        self.update_channel(admin_token, channel_id, update).await
    }

    async fn remove_channel(&self, admin_token: &str, channel_id: Uuid) -> Result<(), ChatError> {
        self.remove_channel(admin_token, channel_id).await
    }

    async fn get_channels(&self, user_token: &str) -> Result<Vec<Channel>, ChatError> {
        self.get_channels(user_token).await
    }

    async fn get_channel(&self, user_token: &str, channel_id: Uuid) -> Result<Channel, ChatError> {
        self.get_channel(user_token, channel_id).await
    }

    async fn add_user_to_channel(
        &self,
        admin_token: &str,
        user_id: Uuid,
        channel_id: Uuid,
    ) -> Result<(), ChatError> {
        self.add_user_to_channel(admin_token, user_id, channel_id)
            .await
    }

    async fn remove_user_from_channel(
        &self,
        admin_token: &str,
        user_id: Uuid,
        channel_id: Uuid,
    ) -> Result<(), ChatError> {
        self.remove_user_from_channel(admin_token, user_id, channel_id)
            .await
    }

    async fn upload_attachment(
        &self,
        user_token: &str,
        upload: NewAttachment,
    ) -> Result<Attachment, ChatError> {
        self.upload_attachment(user_token, upload).await
    }

    async fn remove_attachment(
        &self,
        user_token: &str,
        attachment_id: Uuid,
    ) -> Result<(), ChatError> {
        self.remove_attachment(user_token, attachment_id).await
    }

    async fn close(&self) -> Result<(), ChatError> {
        self.registry.stop_sweeper();
        self.pool.close().await;
        Ok(())
    }
}
