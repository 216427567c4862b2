//! Attachment entity.
//!
//! Records of uploaded media. The bytes live on disk at `path`; the service
//! only tracks metadata and unlinks the file when the record is removed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Broad media class, matching the `type` CHECK constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Image,
    Video,
    File,
}

impl AttachmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::File => "file",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "image" => Some(Self::Image),
            "video" => Some(Self::Video),
            "file" => Some(Self::File),
            _ => None,
        }
    }

    /// Classify a MIME type as reported by the upload edge.
    pub fn from_mime(mime: &str) -> Option<Self> {
        if mime.starts_with("image/") {
            Some(Self::Image)
        } else if mime.starts_with("video/") {
            Some(Self::Video)
        } else if mime.starts_with("application/") {
            Some(Self::File)
        } else {
            None
        }
    }
}

impl std::fmt::Display for AttachmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Uploaded media owned by a user.
///
/// Maps to the `attachments` table:
/// - id: UUID PRIMARY KEY
/// - type: TEXT NOT NULL CHECK (type IN ('image','video','file'))
/// - user_id: UUID NOT NULL REFERENCES users(id)
/// - file_name: TEXT NOT NULL
/// - path: TEXT NOT NULL
/// - width, height: INTEGER NULL (images only)
/// - created_at: TIMESTAMPTZ NOT NULL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: Uuid,

    #[serde(rename = "type")]
    pub kind: AttachmentKind,

    pub user_id: Uuid,

    /// Original file name as uploaded.
    pub file_name: String,

    /// Server-side location of the bytes; managed by the upload edge.
    pub path: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub width: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub height: Option<i32>,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

/// Upload parameters handed to the service once the bytes are on disk.
#[derive(Debug, Clone)]
pub struct NewAttachment {
    pub kind: AttachmentKind,
    pub file_name: String,
    pub path: String,
    pub width: Option<i32>,
    pub height: Option<i32>,
}

impl Attachment {
    pub fn from_upload(user_id: Uuid, upload: NewAttachment) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: upload.kind,
            user_id,
            file_name: upload.file_name,
            path: upload.path,
            width: upload.width,
            height: upload.height,
            created_at: crate::shared::time::now_millis(),
        }
    }
}
