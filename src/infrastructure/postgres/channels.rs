//! Channel operations for the PostgreSQL backend.

use uuid::Uuid;

use crate::domain::entities::Channel;
use crate::domain::service::ChannelUpdate;
use crate::shared::ChatError;

use super::{storage_error, ChannelRow, PostgresChatService};

impl PostgresChatService {
    pub(crate) async fn create_channel(
        &self,
        admin_token: &str,
        display_name: &str,
        is_private: bool,
    ) -> Result<Channel, ChatError> {
        let admin = self
            .admin_by_token(admin_token)
            .await
            .map_err(storage_error("create_channel", ChatError::CouldNotCreateChannel))?
            .ok_or(ChatError::InvalidAdminTokenOrNonAdminUser)?;

        let channel = Channel::new(admin.room_id, display_name, is_private, admin.id);

        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(storage_error("create_channel", ChatError::CouldNotCreateChannel))?;

        sqlx::query(
            r#"
            INSERT INTO channels (id, room_id, created_at, display_name, description, is_private, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(channel.id)
        .bind(channel.room_id)
        .bind(channel.created_at)
        .bind(&channel.display_name)
        .bind(&channel.description)
        .bind(channel.is_private)
        .bind(channel.created_by)
        .execute(&mut *tx)
        .await
        .map_err(storage_error("create_channel", ChatError::CouldNotCreateChannel))?;

        if is_private {
            sqlx::query(
                "INSERT INTO private_channel_members (channel_id, user_id) VALUES ($1, $2)",
            )
            .bind(channel.id)
            .bind(admin.id)
            .execute(&mut *tx)
            .await
            .map_err(storage_error("create_channel", ChatError::CouldNotCreateChannel))?;
        }

        tx.commit()
            .await
            .map_err(storage_error("create_channel", ChatError::CouldNotCreateChannel))?;

        Ok(channel)
    }

    pub(crate) async fn update_channel(
        &self,
        admin_token: &str,
        channel_id: Uuid,
        update: ChannelUpdate,
    ) -> Result<(), ChatError> {
        let admin = self
            .admin_by_token(admin_token)
            .await
            .map_err(storage_error("update_channel", ChatError::CouldNotUpdateChannel))?
            .ok_or(ChatError::InvalidAdminTokenOrNonAdminUser)?;

        let result = sqlx::query(
            r#"
            UPDATE channels
            SET display_name = COALESCE($3, display_name),
                description = COALESCE($4, description)
            WHERE id = $1 AND room_id = $2
            "#,
        )
        .bind(channel_id)
        .bind(admin.room_id)
        .bind(&update.display_name)
        .bind(&update.description)
        .execute(self.pool())
        .await
        .map_err(storage_error("update_channel", ChatError::CouldNotUpdateChannel))?;

        if result.rows_affected() == 0 {
            return Err(ChatError::ChannelNotFound);
        }

        Ok(())
    }

    /// Channel removal cascades to its messages and membership rows. A
    /// missing channel in the admin's room is a no-op success.
    pub(crate) async fn remove_channel(
        &self,
        admin_token: &str,
        channel_id: Uuid,
    ) -> Result<(), ChatError> {
        let admin = self
            .admin_by_token(admin_token)
            .await
            .map_err(storage_error("remove_channel", ChatError::CouldNotRemoveChannel))?
            .ok_or(ChatError::InvalidAdminTokenOrNonAdminUser)?;

        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(storage_error("remove_channel", ChatError::CouldNotRemoveChannel))?;

        sqlx::query(
            r#"
            DELETE FROM messages
            WHERE channel_id IN (SELECT id FROM channels WHERE id = $1 AND room_id = $2)
            "#,
        )
        .bind(channel_id)
        .bind(admin.room_id)
        .execute(&mut *tx)
        .await
        .map_err(storage_error("remove_channel", ChatError::CouldNotRemoveChannel))?;

        sqlx::query(
            r#"
            DELETE FROM private_channel_members
            WHERE channel_id IN (SELECT id FROM channels WHERE id = $1 AND room_id = $2)
            "#,
        )
        .bind(channel_id)
        .bind(admin.room_id)
        .execute(&mut *tx)
        .await
        .map_err(storage_error("remove_channel", ChatError::CouldNotRemoveChannel))?;

        sqlx::query("DELETE FROM channels WHERE id = $1 AND room_id = $2")
            .bind(channel_id)
            .bind(admin.room_id)
            .execute(&mut *tx)
            .await
            .map_err(storage_error("remove_channel", ChatError::CouldNotRemoveChannel))?;

        tx.commit()
            .await
            .map_err(storage_error("remove_channel", ChatError::CouldNotRemoveChannel))?;

        Ok(())
    }

    /// Public channels of the caller's room plus the private channels the
    /// caller is a member of.
    pub(crate) async fn get_channels(&self, user_token: &str) -> Result<Vec<Channel>, ChatError> {
        let user = self
            .user_by_token(user_token)
            .await
            .map_err(storage_error("get_channels", ChatError::CouldNotRetrieveChannels))?
            .ok_or(ChatError::InvalidUserToken)?;

        let rows = sqlx::query_as::<_, ChannelRow>(
            r#"
            SELECT c.id, c.room_id, c.created_at, c.display_name, c.description,
                   c.is_private, c.created_by
            FROM channels c
            WHERE c.room_id = $1
              AND (NOT c.is_private OR EXISTS (
                  SELECT 1 FROM private_channel_members m
                  WHERE m.channel_id = c.id AND m.user_id = $2
              ))
            ORDER BY c.created_at, c.id
            "#,
        )
        .bind(user.room_id)
        .bind(user.id)
        .fetch_all(self.pool())
        .await
        .map_err(storage_error("get_channels", ChatError::CouldNotRetrieveChannels))?;

        Ok(rows.into_iter().map(ChannelRow::into_channel).collect())
    }

    pub(crate) async fn get_channel(
        &self,
        user_token: &str,
        channel_id: Uuid,
    ) -> Result<Channel, ChatError> {
        let user = self
            .user_by_token(user_token)
            .await
            .map_err(storage_error("get_channel", ChatError::CouldNotRetrieveChannels))?
            .ok_or(ChatError::InvalidUserToken)?;

        let channel = self
            .channel_in_room(channel_id, user.room_id)
            .await
            .map_err(storage_error("get_channel", ChatError::CouldNotRetrieveChannels))?
            .ok_or(ChatError::ChannelNotFound)?;

        if channel.is_private
            && !self
                .is_channel_member(channel.id, user.id)
                .await
                .map_err(storage_error("get_channel", ChatError::CouldNotRetrieveChannels))?
        {
            return Err(ChatError::ChannelNotFound);
        }

        Ok(channel)
    }

    pub(crate) async fn add_user_to_channel(
        &self,
        admin_token: &str,
        user_id: Uuid,
        channel_id: Uuid,
    ) -> Result<(), ChatError> {
        let admin = self
            .admin_by_token(admin_token)
            .await
            .map_err(storage_error("add_user_to_channel", ChatError::CouldNotAddUserToChannel))?
            .ok_or(ChatError::InvalidAdminTokenOrNonAdminUser)?;

        let channel = self
            .private_channel_in_room(channel_id, admin.room_id)
            .await
            .map_err(storage_error("add_user_to_channel", ChatError::CouldNotAddUserToChannel))?
            .ok_or(ChatError::ChannelNotFoundOrNotPrivate)?;

        self.user_in_room(user_id, admin.room_id)
            .await
            .map_err(storage_error("add_user_to_channel", ChatError::CouldNotAddUserToChannel))?
            .ok_or(ChatError::UserNotFoundInAdminsRoom)?;

        // Re-adding an existing member is a no-op success.
        sqlx::query(
            r#"
            INSERT INTO private_channel_members (channel_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(channel.id)
        .bind(user_id)
        .execute(self.pool())
        .await
        .map_err(storage_error("add_user_to_channel", ChatError::CouldNotAddUserToChannel))?;

        Ok(())
    }

    pub(crate) async fn remove_user_from_channel(
        &self,
        admin_token: &str,
        user_id: Uuid,
        channel_id: Uuid,
    ) -> Result<(), ChatError> {
        let admin = self
            .admin_by_token(admin_token)
            .await
            .map_err(storage_error(
                "remove_user_from_channel",
                ChatError::CouldNotRemoveUserFromChannel,
            ))?
            .ok_or(ChatError::InvalidAdminTokenOrNonAdminUser)?;

        let channel = self
            .private_channel_in_room(channel_id, admin.room_id)
            .await
            .map_err(storage_error(
                "remove_user_from_channel",
                ChatError::CouldNotRemoveUserFromChannel,
            ))?
            .ok_or(ChatError::ChannelNotFoundOrNotPrivate)?;

        sqlx::query("DELETE FROM private_channel_members WHERE channel_id = $1 AND user_id = $2")
            .bind(channel.id)
            .bind(user_id)
            .execute(self.pool())
            .await
            .map_err(storage_error(
                "remove_user_from_channel",
                ChatError::CouldNotRemoveUserFromChannel,
            ))?;

        Ok(())
    }

    /// Fetch a channel by id within a specific room.
    pub(crate) async fn channel_in_room(
        &self,
        channel_id: Uuid,
        room_id: Uuid,
    ) -> Result<Option<Channel>, sqlx::Error> {
        let row = sqlx::query_as::<_, ChannelRow>(
            r#"
            SELECT id, room_id, created_at, display_name, description, is_private, created_by
            FROM channels
            WHERE id = $1 AND room_id = $2
            "#,
        )
        .bind(channel_id)
        .bind(room_id)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(ChannelRow::into_channel))
    }

    /// Like [`Self::channel_in_room`] but only private channels.
    pub(crate) async fn private_channel_in_room(
        &self,
        channel_id: Uuid,
        room_id: Uuid,
    ) -> Result<Option<Channel>, sqlx::Error> {
        Ok(self
            .channel_in_room(channel_id, room_id)
            .await?
            .filter(|channel| channel.is_private))
    }

    pub(crate) async fn is_channel_member(
        &self,
        channel_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM private_channel_members WHERE channel_id = $1 AND user_id = $2",
        )
        .bind(channel_id)
        .bind(user_id)
        .fetch_one(self.pool())
        .await?;

        Ok(count > 0)
    }
}
