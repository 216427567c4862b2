//! Attachment Handlers
//!
//! Multipart upload and deletion. The edge owns the bytes: it classifies the
//! MIME type, probes image dimensions, writes the file under the configured
//! directory, and unlinks it again if the service rejects the record.

use std::path::{Path, PathBuf};

use axum::extract::{Multipart, State};
use axum::Json;
use image::GenericImageView;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::domain::entities::{Attachment, AttachmentKind, NewAttachment};
use crate::presentation::http::extractors::{ok, ok_empty, ApiSuccess, AuthToken, ValidJson};
use crate::shared::ChatError;
use crate::startup::AppState;

/// Upload size ceiling: 50 MiB.
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

pub async fn upload_attachment(
    State(state): State<AppState>,
    AuthToken(token): AuthToken,
    mut multipart: Multipart,
) -> Result<Json<ApiSuccess<Attachment>>, ChatError> {
    let mut file_name: Option<String> = None;
    let mut content_type: Option<String> = None;
    let mut bytes: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ChatError::InvalidParameters)?
    {
        if field.name() == Some("file") {
            file_name = field.file_name().map(ToString::to_string);
            content_type = field.content_type().map(ToString::to_string);
            bytes = Some(
                field
                    .bytes()
                    .await
                    .map_err(|_| ChatError::InvalidParameters)?
                    .to_vec(),
            );
        }
    }

    let bytes = bytes.ok_or(ChatError::InvalidParameters)?;
    let file_name = file_name.unwrap_or_else(|| "upload".to_string());
    let mime = content_type.unwrap_or_default();

    let kind = AttachmentKind::from_mime(&mime).ok_or(ChatError::InvalidFileType)?;

    // Images get their dimensions probed; undecodable "images" are rejected.
    let (width, height) = match kind {
        AttachmentKind::Image => {
            let decoded =
                image::load_from_memory(&bytes).map_err(|_| ChatError::InvalidFileType)?;
            let (width, height) = decoded.dimensions();
            (Some(width as i32), Some(height as i32))
        }
        _ => (None, None),
    };

    let path = disk_path(&state.settings.media.upload_dir, &file_name);
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|err| {
            tracing::error!(error = %err, "could not create upload directory");
            ChatError::CouldNotUploadAttachment
        })?;
    }
    tokio::fs::write(&path, &bytes).await.map_err(|err| {
        tracing::error!(error = %err, "could not write uploaded file");
        ChatError::CouldNotUploadAttachment
    })?;

    let upload = NewAttachment {
        kind,
        file_name,
        path: path.to_string_lossy().into_owned(),
        width,
        height,
    };

    match state.service.upload_attachment(&token, upload).await {
        Ok(attachment) => Ok(ok(attachment)),
        Err(err) => {
            // The record never existed, so neither should the file.
            let _ = tokio::fs::remove_file(&path).await;
            Err(err)
        }
    }
}

/// Random-id destination preserving the original extension.
fn disk_path(upload_dir: &str, original_name: &str) -> PathBuf {
    let id = Uuid::new_v4();
    let name = match Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
    {
        Some(ext) => format!("{id}.{ext}"),
        None => id.to_string(),
    };
    Path::new(upload_dir).join(name)
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RemoveAttachmentRequest {
    pub attachment_id: Uuid,
}

pub async fn remove_attachment(
    State(state): State<AppState>,
    AuthToken(token): AuthToken,
    ValidJson(body): ValidJson<RemoveAttachmentRequest>,
) -> Result<Json<ApiSuccess<Option<()>>>, ChatError> {
    state
        .service
        .remove_attachment(&token, body.attachment_id)
        .await?;
    Ok(ok_empty())
}
