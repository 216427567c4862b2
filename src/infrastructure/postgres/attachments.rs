//! Attachment operations for the PostgreSQL backend.

use uuid::Uuid;

use crate::domain::entities::{Attachment, NewAttachment};
use crate::shared::ChatError;

use super::{storage_error, AttachmentRow, PostgresChatService};

impl PostgresChatService {
    pub(crate) async fn upload_attachment(
        &self,
        user_token: &str,
        upload: NewAttachment,
    ) -> Result<Attachment, ChatError> {
        let user = self
            .user_by_token(user_token)
            .await
            .map_err(storage_error("upload_attachment", ChatError::CouldNotUploadAttachment))?
            .ok_or(ChatError::InvalidToken)?;

        let attachment = Attachment::from_upload(user.id, upload);

        sqlx::query(
            r#"
            INSERT INTO attachments (id, type, user_id, file_name, path, width, height, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(attachment.id)
        .bind(attachment.kind.as_str())
        .bind(attachment.user_id)
        .bind(&attachment.file_name)
        .bind(&attachment.path)
        .bind(attachment.width)
        .bind(attachment.height)
        .bind(attachment.created_at)
        .execute(self.pool())
        .await
        .map_err(storage_error("upload_attachment", ChatError::CouldNotUploadAttachment))?;

        Ok(attachment)
    }

    pub(crate) async fn remove_attachment(
        &self,
        user_token: &str,
        attachment_id: Uuid,
    ) -> Result<(), ChatError> {
        let user = self
            .user_by_token(user_token)
            .await
            .map_err(storage_error("remove_attachment", ChatError::CouldNotRemoveAttachment))?
            .ok_or(ChatError::InvalidToken)?;

        let row = sqlx::query_as::<_, AttachmentRow>(
            r#"
            SELECT id, type, user_id, file_name, path, width, height, created_at
            FROM attachments
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(attachment_id)
        .bind(user.id)
        .fetch_optional(self.pool())
        .await
        .map_err(storage_error("remove_attachment", ChatError::CouldNotRemoveAttachment))?;

        let attachment = row
            .map(AttachmentRow::into_attachment)
            .ok_or(ChatError::AttachmentNotFound)?;

        sqlx::query("DELETE FROM attachments WHERE id = $1")
            .bind(attachment.id)
            .execute(self.pool())
            .await
            .map_err(storage_error("remove_attachment", ChatError::CouldNotRemoveAttachment))?;

        // The record is authoritative; a missing file is not an error.
        if let Err(err) = tokio::fs::remove_file(&attachment.path).await {
            if err.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %attachment.path, error = %err, "could not unlink attachment file");
            }
        }

        Ok(())
    }
}
