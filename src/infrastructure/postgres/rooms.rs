//! Room operations for the PostgreSQL backend.

use uuid::Uuid;

use crate::domain::entities::{Channel, Role, Room, User};
use crate::domain::service::{RoomBootstrap, RoomUpdate};
use crate::shared::ChatError;

use super::{storage_error, PostgresChatService, RoomRow};

impl PostgresChatService {
    /// Create the room, its first admin, and the public "General" channel in
    /// one transaction.
    pub(crate) async fn create_room_and_admin(
        &self,
        room_name: &str,
        admin_name: &str,
        admin_invite_only: bool,
    ) -> Result<RoomBootstrap, ChatError> {
        let room = Room::new(room_name, admin_invite_only);
        let admin = User::new(room.id, admin_name, Role::Admin);
        let general_channel = Channel::new(room.id, "General", false, admin.id);

        let fail = storage_error("create_room_and_admin", ChatError::CouldNotCreateRoomAndAdmin);

        let mut tx = self.pool().begin().await.map_err(fail)?;

        let fail = storage_error("create_room_and_admin", ChatError::CouldNotCreateRoomAndAdmin);
        sqlx::query(
            r#"
            INSERT INTO rooms (id, created_at, display_name, description, logo_id, admin_invite_only)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(room.id)
        .bind(room.created_at)
        .bind(&room.display_name)
        .bind(&room.description)
        .bind(room.logo_id)
        .bind(room.admin_invite_only)
        .execute(&mut *tx)
        .await
        .map_err(fail)?;

        let fail = storage_error("create_room_and_admin", ChatError::CouldNotCreateRoomAndAdmin);
        sqlx::query(
            r#"
            INSERT INTO users (id, room_id, created_at, token, display_name, description, avatar_id, role)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(admin.id)
        .bind(admin.room_id)
        .bind(admin.created_at)
        .bind(admin.token)
        .bind(&admin.display_name)
        .bind(&admin.description)
        .bind(admin.avatar_id)
        .bind(admin.role.as_str())
        .execute(&mut *tx)
        .await
        .map_err(fail)?;

        let fail = storage_error("create_room_and_admin", ChatError::CouldNotCreateRoomAndAdmin);
        sqlx::query(
            r#"
            INSERT INTO channels (id, room_id, created_at, display_name, description, is_private, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(general_channel.id)
        .bind(general_channel.room_id)
        .bind(general_channel.created_at)
        .bind(&general_channel.display_name)
        .bind(&general_channel.description)
        .bind(general_channel.is_private)
        .bind(general_channel.created_by)
        .execute(&mut *tx)
        .await
        .map_err(fail)?;

        tx.commit()
            .await
            .map_err(storage_error("create_room_and_admin", ChatError::CouldNotCreateRoomAndAdmin))?;

        tracing::info!(room_id = %room.id, "room created");

        Ok(RoomBootstrap {
            room,
            admin,
            general_channel,
        })
    }

    pub(crate) async fn update_room(
        &self,
        admin_token: &str,
        update: RoomUpdate,
    ) -> Result<(), ChatError> {
        let admin = self
            .admin_by_token(admin_token)
            .await
            .map_err(storage_error("update_room", ChatError::CouldNotUpdateRoom))?
            .ok_or(ChatError::InvalidAdminToken)?;

        if let Some(logo_id) = update.logo_id {
            self.require_image_attachment(logo_id, None)
                .await
                .map_err(storage_error("update_room", ChatError::CouldNotUpdateRoom))?
                .then_some(())
                .ok_or(ChatError::InvalidOrNonImageLogoAttachment)?;
        }

        sqlx::query(
            r#"
            UPDATE rooms
            SET display_name = $2, admin_invite_only = $3, description = $4, logo_id = $5
            WHERE id = $1
            "#,
        )
        .bind(admin.room_id)
        .bind(&update.display_name)
        .bind(update.admin_invite_only)
        .bind(&update.description)
        .bind(update.logo_id)
        .execute(self.pool())
        .await
        .map_err(storage_error("update_room", ChatError::CouldNotUpdateRoom))?;

        Ok(())
    }

    pub(crate) async fn get_room(
        &self,
        user_token: &str,
        room_id: Uuid,
    ) -> Result<Room, ChatError> {
        let user = self
            .user_by_token(user_token)
            .await
            .map_err(storage_error("get_room", ChatError::UnknownServerError))?
            .ok_or(ChatError::InvalidUserToken)?;

        // A foreign room id is indistinguishable from a missing one.
        if user.room_id != room_id {
            return Err(ChatError::RoomNotFound);
        }

        let row = sqlx::query_as::<_, RoomRow>(
            r#"
            SELECT id, created_at, display_name, description, logo_id, admin_invite_only
            FROM rooms
            WHERE id = $1
            "#,
        )
        .bind(room_id)
        .fetch_optional(self.pool())
        .await
        .map_err(storage_error("get_room", ChatError::UnknownServerError))?;

        row.map(RoomRow::into_room).ok_or(ChatError::RoomNotFound)
    }

    /// True when the attachment exists, is image-typed, and (when `owner` is
    /// given) belongs to that user.
    pub(crate) async fn require_image_attachment(
        &self,
        attachment_id: Uuid,
        owner: Option<Uuid>,
    ) -> Result<bool, sqlx::Error> {
        let found = match owner {
            Some(user_id) => {
                sqlx::query_scalar::<_, i64>(
                    "SELECT COUNT(*) FROM attachments WHERE id = $1 AND type = 'image' AND user_id = $2",
                )
                .bind(attachment_id)
                .bind(user_id)
                .fetch_one(self.pool())
                .await?
            }
            None => {
                sqlx::query_scalar::<_, i64>(
                    "SELECT COUNT(*) FROM attachments WHERE id = $1 AND type = 'image'",
                )
                .bind(attachment_id)
                .fetch_one(self.pool())
                .await?
            }
        };

        Ok(found > 0)
    }
}
