//! User, invite, and transfer operations for the PostgreSQL backend.

use uuid::Uuid;

use crate::domain::entities::{Role, User};
use crate::domain::service::{parse_credential, UserUpdate};
use crate::shared::ChatError;

use super::{storage_error, PostgresChatService, UserRow};

impl PostgresChatService {
    pub(crate) async fn create_invite_code(&self, user_token: &str) -> Result<Uuid, ChatError> {
        let user = self
            .user_by_token(user_token)
            .await
            .map_err(storage_error("create_invite_code", ChatError::CouldNotCreateInviteCode))?
            .ok_or(ChatError::UserNotFound)?;

        let admin_invite_only = sqlx::query_scalar::<_, bool>(
            "SELECT admin_invite_only FROM rooms WHERE id = $1",
        )
        .bind(user.room_id)
        .fetch_one(self.pool())
        .await
        .map_err(storage_error("create_invite_code", ChatError::CouldNotCreateInviteCode))?;

        if admin_invite_only && !user.role.is_admin() {
            return Err(ChatError::UserIsNotAdminAndRoomIsAdminInviteOnly);
        }

        Ok(self.registry().mint_invite(user.room_id))
    }

    pub(crate) async fn create_user_from_invite_code(
        &self,
        invite_code: &str,
        display_name: &str,
    ) -> Result<User, ChatError> {
        let code = parse_credential(invite_code).ok_or(ChatError::InvalidInviteCode)?;
        let room_id = self
            .registry()
            .peek_invite(code)
            .ok_or(ChatError::InvalidInviteCode)?;

        // Checked before consumption so a name collision leaves the code
        // usable for a retry.
        let taken = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM users WHERE room_id = $1 AND display_name = $2",
        )
        .bind(room_id)
        .bind(display_name)
        .fetch_one(self.pool())
        .await
        .map_err(storage_error(
            "create_user_from_invite_code",
            ChatError::CouldNotCreateUserFromInviteCode,
        ))?;
        if taken > 0 {
            return Err(ChatError::DisplayNameAlreadyExistsInTheRoom);
        }

        let user = User::new(room_id, display_name, Role::Participant);

        let mut tx = self.pool().begin().await.map_err(storage_error(
            "create_user_from_invite_code",
            ChatError::CouldNotCreateUserFromInviteCode,
        ))?;

        sqlx::query(
            r#"
            INSERT INTO users (id, room_id, created_at, token, display_name, description, avatar_id, role)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(user.id)
        .bind(user.room_id)
        .bind(user.created_at)
        .bind(user.token)
        .bind(&user.display_name)
        .bind(&user.description)
        .bind(user.avatar_id)
        .bind(user.role.as_str())
        .execute(&mut *tx)
        .await
        .map_err(storage_error(
            "create_user_from_invite_code",
            ChatError::CouldNotCreateUserFromInviteCode,
        ))?;

        // One-shot: a concurrent redeemer may have won between peek and here,
        // in which case the insert is rolled back.
        if self.registry().consume_invite(code).is_none() {
            return Err(ChatError::InvalidInviteCode);
        }

        tx.commit().await.map_err(storage_error(
            "create_user_from_invite_code",
            ChatError::CouldNotCreateUserFromInviteCode,
        ))?;

        tracing::info!(room_id = %room_id, user_id = %user.id, "user joined via invite");

        Ok(user)
    }

    pub(crate) async fn remove_user(
        &self,
        admin_token: &str,
        user_id: Uuid,
    ) -> Result<(), ChatError> {
        let admin = self
            .admin_by_token(admin_token)
            .await
            .map_err(storage_error("remove_user", ChatError::CouldNotRemoveUser))?
            .ok_or(ChatError::InvalidAdminTokenOrNonAdminUser)?;

        let target = self
            .user_in_room(user_id, admin.room_id)
            .await
            .map_err(storage_error("remove_user", ChatError::CouldNotRemoveUser))?
            .ok_or(ChatError::UserNotFoundInAdminsRoom)?;

        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(storage_error("remove_user", ChatError::CouldNotRemoveUser))?;

        sqlx::query("DELETE FROM private_channel_members WHERE user_id = $1")
            .bind(target.id)
            .execute(&mut *tx)
            .await
            .map_err(storage_error("remove_user", ChatError::CouldNotRemoveUser))?;

        // Rotating the token revokes the credential; the row and its message
        // authorship survive.
        sqlx::query("UPDATE users SET token = $2 WHERE id = $1")
            .bind(target.id)
            .bind(Uuid::new_v4())
            .execute(&mut *tx)
            .await
            .map_err(storage_error("remove_user", ChatError::CouldNotRemoveUser))?;

        tx.commit()
            .await
            .map_err(storage_error("remove_user", ChatError::CouldNotRemoveUser))?;

        Ok(())
    }

    pub(crate) async fn update_user(
        &self,
        user_token: &str,
        update: UserUpdate,
    ) -> Result<(), ChatError> {
        let user = self
            .user_by_token(user_token)
            .await
            .map_err(storage_error("update_user", ChatError::CouldNotUpdateUser))?
            .ok_or(ChatError::InvalidUserToken)?;

        if let Some(avatar_id) = update.avatar_id {
            self.require_image_attachment(avatar_id, Some(user.id))
                .await
                .map_err(storage_error("update_user", ChatError::CouldNotUpdateUser))?
                .then_some(())
                .ok_or(ChatError::InvalidOrNonImageAvatarAttachment)?;
        }

        sqlx::query(
            r#"
            UPDATE users
            SET display_name = COALESCE($2, display_name),
                description = COALESCE($3, description),
                avatar_id = COALESCE($4, avatar_id)
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&update.display_name)
        .bind(&update.description)
        .bind(update.avatar_id)
        .execute(self.pool())
        .await
        .map_err(storage_error("update_user", ChatError::CouldNotUpdateUser))?;

        Ok(())
    }

    pub(crate) async fn set_user_role(
        &self,
        admin_token: &str,
        user_id: Uuid,
        role: Role,
    ) -> Result<(), ChatError> {
        let admin = self
            .admin_by_token(admin_token)
            .await
            .map_err(storage_error("set_user_role", ChatError::CouldNotChangeUserRole))?
            .ok_or(ChatError::InvalidAdminTokenOrNonAdminUser)?;

        let result = sqlx::query("UPDATE users SET role = $3 WHERE id = $1 AND room_id = $2")
            .bind(user_id)
            .bind(admin.room_id)
            .bind(role.as_str())
            .execute(self.pool())
            .await
            .map_err(storage_error("set_user_role", ChatError::CouldNotChangeUserRole))?;

        if result.rows_affected() == 0 {
            return Err(ChatError::UserNotFoundInAdminsRoom);
        }

        Ok(())
    }

    pub(crate) async fn get_users(
        &self,
        user_token: &str,
        channel_id: Option<Uuid>,
    ) -> Result<Vec<User>, ChatError> {
        let user = self
            .user_by_token(user_token)
            .await
            .map_err(storage_error("get_users", ChatError::CouldNotGetUsers))?
            .ok_or(ChatError::InvalidUserToken)?;

        let Some(channel_id) = channel_id else {
            return self.room_roster(user.room_id).await;
        };

        let channel = self
            .channel_in_room(channel_id, user.room_id)
            .await
            .map_err(storage_error("get_users", ChatError::CouldNotGetUsers))?
            .ok_or(ChatError::ChannelNotFoundInUsersRoom)?;

        if !channel.is_private {
            // Everyone in the room belongs to a public channel.
            return self.room_roster(user.room_id).await;
        }

        if !self
            .is_channel_member(channel.id, user.id)
            .await
            .map_err(storage_error("get_users", ChatError::CouldNotGetUsers))?
        {
            return Err(ChatError::UserIsNotMemberOfPrivateChannel);
        }

        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT u.id, u.room_id, u.created_at, u.token, u.display_name,
                   u.description, u.avatar_id, u.role
            FROM users u
            JOIN private_channel_members m ON m.user_id = u.id
            WHERE m.channel_id = $1
            ORDER BY u.created_at, u.id
            "#,
        )
        .bind(channel.id)
        .fetch_all(self.pool())
        .await
        .map_err(storage_error("get_users", ChatError::CouldNotGetUsers))?;

        Ok(rows.into_iter().map(UserRow::into_user).collect())
    }

    /// Every user in a room, oldest first.
    async fn room_roster(&self, room_id: Uuid) -> Result<Vec<User>, ChatError> {
        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, room_id, created_at, token, display_name, description, avatar_id, role
            FROM users
            WHERE room_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(room_id)
        .fetch_all(self.pool())
        .await
        .map_err(storage_error("get_users", ChatError::CouldNotGetUsers))?;

        Ok(rows.into_iter().map(UserRow::into_user).collect())
    }

    pub(crate) async fn get_user(
        &self,
        user_token: &str,
        user_id: Uuid,
    ) -> Result<User, ChatError> {
        let caller = self
            .user_by_token(user_token)
            .await
            .map_err(storage_error("get_user", ChatError::CouldNotRetrieveUserDetails))?
            .ok_or(ChatError::InvalidUserToken)?;

        self.user_in_room(user_id, caller.room_id)
            .await
            .map_err(storage_error("get_user", ChatError::CouldNotRetrieveUserDetails))?
            .ok_or(ChatError::UserNotFound)
    }

    pub(crate) async fn create_transfer_bundle(
        &self,
        user_tokens: &[String],
    ) -> Result<Uuid, ChatError> {
        let tokens: Vec<Uuid> = user_tokens
            .iter()
            .filter_map(|raw| parse_credential(raw))
            .collect();

        let user_ids: Vec<Uuid> = if tokens.is_empty() {
            Vec::new()
        } else {
            sqlx::query_scalar::<_, Uuid>("SELECT id FROM users WHERE token = ANY($1)")
                .bind(&tokens)
                .fetch_all(self.pool())
                .await
                .map_err(storage_error(
                    "create_transfer_bundle",
                    ChatError::CouldNotCreateTransferCode,
                ))?
        };

        if user_ids.is_empty() {
            return Err(ChatError::NoValidTokens);
        }

        Ok(self.registry().mint_transfer(user_ids))
    }

    pub(crate) async fn get_transfer_bundle_from_code(
        &self,
        transfer_code: &str,
    ) -> Result<Vec<User>, ChatError> {
        let code =
            parse_credential(transfer_code).ok_or(ChatError::InvalidOrExpiredTransferCode)?;
        let user_ids = self
            .registry()
            .consume_transfer(code)
            .ok_or(ChatError::InvalidOrExpiredTransferCode)?;

        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, room_id, created_at, token, display_name, description, avatar_id, role
            FROM users
            WHERE id = ANY($1)
            ORDER BY created_at, id
            "#,
        )
        .bind(&user_ids)
        .fetch_all(self.pool())
        .await
        .map_err(storage_error(
            "get_transfer_bundle_from_code",
            ChatError::CouldNotFetchUserDataFromTransferCode,
        ))?;

        Ok(rows.into_iter().map(UserRow::into_user).collect())
    }
}
