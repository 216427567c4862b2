//! Message operations for the PostgreSQL backend.
//!
//! Keyset pagination over the BIGSERIAL id: `cursor` is an exclusive upper
//! bound and results always come back newest-first. Authorization for edit
//! and removal joins the author's user row, since messages themselves carry
//! no room column.

use sqlx::types::Json;
use uuid::Uuid;

use crate::domain::content::{sanitize, Content};
use crate::domain::entities::{Attachment, Message, MessageTarget, User};
use crate::domain::service::{MessageQuery, MAX_MESSAGE_LIMIT};
use crate::shared::ChatError;

use super::{storage_error, AttachmentRow, MessageRow, PostgresChatService};

/// A message's author and the author's room, for scope checks.
#[derive(Debug, sqlx::FromRow)]
struct OwnedMessageRow {
    user_id: Uuid,
    author_room_id: Uuid,
}

impl PostgresChatService {
    pub(crate) async fn create_message(
        &self,
        user_token: &str,
        content: &serde_json::Value,
        target: MessageTarget,
    ) -> Result<i64, ChatError> {
        let user = self
            .user_by_token(user_token)
            .await
            .map_err(storage_error("create_message", ChatError::CouldNotCreateMessage))?
            .ok_or(ChatError::InvalidUserToken)?;

        self.check_target(&user, target, ChatError::CouldNotCreateMessage)
            .await?;

        let content = self
            .resolve_content(&user, content, ChatError::CouldNotCreateMessage)
            .await?;

        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO messages (user_id, created_at, content, channel_id, direct_message_user_id, edited)
            VALUES ($1, NOW(), $2, $3, $4, FALSE)
            RETURNING id
            "#,
        )
        .bind(user.id)
        .bind(Json(&content))
        .bind(target.channel_id)
        .bind(target.direct_message_user_id)
        .fetch_one(self.pool())
        .await
        .map_err(storage_error("create_message", ChatError::CouldNotCreateMessage))?;

        Ok(id)
    }

    pub(crate) async fn remove_message(
        &self,
        user_token: &str,
        message_id: i64,
    ) -> Result<(), ChatError> {
        let user = self
            .user_by_token(user_token)
            .await
            .map_err(storage_error("remove_message", ChatError::CouldNotRemoveMessage))?
            .ok_or(ChatError::InvalidUserToken)?;

        let owned = self
            .owned_message(message_id)
            .await
            .map_err(storage_error("remove_message", ChatError::CouldNotRemoveMessage))?
            .ok_or(ChatError::MessageNotFound)?;

        if !may_touch(&user, &owned) {
            return Err(ChatError::UserNotAuthorizedToDeleteThisMessage);
        }

        sqlx::query("DELETE FROM messages WHERE id = $1")
            .bind(message_id)
            .execute(self.pool())
            .await
            .map_err(storage_error("remove_message", ChatError::CouldNotRemoveMessage))?;

        Ok(())
    }

    pub(crate) async fn edit_message(
        &self,
        user_token: &str,
        message_id: i64,
        content: &serde_json::Value,
    ) -> Result<(), ChatError> {
        let user = self
            .user_by_token(user_token)
            .await
            .map_err(storage_error("edit_message", ChatError::CouldNotEditMessage))?
            .ok_or(ChatError::InvalidUserToken)?;

        let owned = self
            .owned_message(message_id)
            .await
            .map_err(storage_error("edit_message", ChatError::CouldNotEditMessage))?
            .ok_or(ChatError::MessageNotFound)?;

        if !may_touch(&user, &owned) {
            return Err(ChatError::UserNotAuthorizedToEditThisMessage);
        }

        let content = self
            .resolve_content(&user, content, ChatError::CouldNotEditMessage)
            .await?;

        sqlx::query("UPDATE messages SET content = $2, edited = TRUE WHERE id = $1")
            .bind(message_id)
            .bind(Json(&content))
            .execute(self.pool())
            .await
            .map_err(storage_error("edit_message", ChatError::CouldNotEditMessage))?;

        Ok(())
    }

    pub(crate) async fn get_messages(
        &self,
        user_token: &str,
        query: MessageQuery,
    ) -> Result<Vec<Message>, ChatError> {
        let user = self
            .user_by_token(user_token)
            .await
            .map_err(storage_error("get_messages", ChatError::CouldNotGetMessages))?
            .ok_or(ChatError::InvalidUserToken)?;

        let target = MessageTarget {
            channel_id: query.channel_id,
            direct_message_user_id: query.direct_message_user_id,
        };
        self.check_target(&user, target, ChatError::CouldNotGetMessages)
            .await?;

        let limit = query.limit.clamp(1, MAX_MESSAGE_LIMIT);
        let cursor = query.cursor.unwrap_or(i64::MAX);

        let rows = if let Some(channel_id) = query.channel_id {
            sqlx::query_as::<_, MessageRow>(
                r#"
                SELECT m.id, m.user_id, m.created_at, m.content,
                       m.channel_id, m.direct_message_user_id, m.edited
                FROM messages m
                JOIN users u ON u.id = m.user_id
                WHERE m.channel_id = $1 AND m.id < $2
                ORDER BY m.id DESC
                LIMIT $3
                "#,
            )
            .bind(channel_id)
            .bind(cursor)
            .bind(limit)
            .fetch_all(self.pool())
            .await
        } else {
            // Both directions of the conversation between the two users.
            let other = query
                .direct_message_user_id
                .ok_or(ChatError::EitherChannelIdOrDirectMessageUserIdMustBeProvided)?;
            sqlx::query_as::<_, MessageRow>(
                r#"
                SELECT m.id, m.user_id, m.created_at, m.content,
                       m.channel_id, m.direct_message_user_id, m.edited
                FROM messages m
                JOIN users u ON u.id = m.user_id
                WHERE ((m.user_id = $1 AND m.direct_message_user_id = $2)
                    OR (m.user_id = $2 AND m.direct_message_user_id = $1))
                  AND m.id < $3
                ORDER BY m.id DESC
                LIMIT $4
                "#,
            )
            .bind(user.id)
            .bind(other)
            .bind(cursor)
            .bind(limit)
            .fetch_all(self.pool())
            .await
        }
        .map_err(storage_error("get_messages", ChatError::CouldNotGetMessages))?;

        Ok(rows.into_iter().map(MessageRow::into_message).collect())
    }

    /// Validate the channel/direct-message selector against the caller.
    async fn check_target(
        &self,
        user: &User,
        target: MessageTarget,
        failure: ChatError,
    ) -> Result<(), ChatError> {
        match (target.channel_id, target.direct_message_user_id) {
            (Some(_), Some(_)) => {
                return Err(ChatError::MessageCannotTargetBothAChannelAndADirectUser)
            }
            (None, None) => {
                return Err(ChatError::EitherChannelIdOrDirectMessageUserIdMustBeProvided)
            }
            (Some(channel_id), None) => {
                let channel = self
                    .channel_in_room(channel_id, user.room_id)
                    .await
                    .map_err(storage_error("check_target", failure))?
                    .ok_or(ChatError::ChannelNotFoundInUsersRoom)?;

                if channel.is_private
                    && !self
                        .is_channel_member(channel.id, user.id)
                        .await
                        .map_err(storage_error("check_target", failure))?
                {
                    return Err(ChatError::UserIsNotMemberOfPrivateChannel);
                }
            }
            (None, Some(other)) => {
                self.user_in_room(other, user.room_id)
                    .await
                    .map_err(storage_error("check_target", failure))?
                    .ok_or(ChatError::UserNotFound)?;
            }
        }

        Ok(())
    }

    /// Sanitize raw content and swap attachment ids for records owned by the
    /// caller.
    async fn resolve_content(
        &self,
        user: &User,
        raw: &serde_json::Value,
        failure: ChatError,
    ) -> Result<Content, ChatError> {
        let content = sanitize(raw)?;
        if content.attachment_ids.is_empty() {
            return Ok(content);
        }

        let rows = sqlx::query_as::<_, AttachmentRow>(
            r#"
            SELECT id, type, user_id, file_name, path, width, height, created_at
            FROM attachments
            WHERE id = ANY($1) AND user_id = $2
            "#,
        )
        .bind(&content.attachment_ids)
        .bind(user.id)
        .fetch_all(self.pool())
        .await
        .map_err(storage_error("resolve_content", failure))?;

        if rows.len() != content.attachment_ids.len() {
            return Err(ChatError::InvalidAttachmentIds);
        }

        let attachments: Vec<Attachment> =
            rows.into_iter().map(AttachmentRow::into_attachment).collect();
        Ok(content.with_attachments(attachments))
    }

    /// Fetch a message together with its author's room.
    async fn owned_message(&self, message_id: i64) -> Result<Option<OwnedMessageRow>, sqlx::Error> {
        sqlx::query_as::<_, OwnedMessageRow>(
            r#"
            SELECT m.user_id, u.room_id AS author_room_id
            FROM messages m
            JOIN users u ON u.id = m.user_id
            WHERE m.id = $1
            "#,
        )
        .bind(message_id)
        .fetch_optional(self.pool())
        .await
    }
}

/// Author, or an admin in the author's room.
fn may_touch(user: &User, message: &OwnedMessageRow) -> bool {
    message.user_id == user.id || (user.role.is_admin() && user.room_id == message.author_room_id)
}
