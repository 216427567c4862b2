//! Message entity.
//!
//! Maps to the `messages` table. A message is bound to exactly one of a
//! channel or a direct-message counterpart, never both. Ids are assigned by
//! the backend and are strictly increasing, which makes them double as the
//! pagination cursor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::content::Content;

/// A message in a channel or a direct conversation.
///
/// Maps to the `messages` table:
/// - id: BIGSERIAL PRIMARY KEY
/// - user_id: UUID NOT NULL REFERENCES users(id)
/// - created_at: TIMESTAMPTZ NOT NULL
/// - content: JSONB NOT NULL
/// - channel_id: UUID NULL REFERENCES channels(id)
/// - direct_message_user_id: UUID NULL REFERENCES users(id)
/// - edited: BOOLEAN NOT NULL DEFAULT FALSE
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: i64,

    /// Author.
    pub user_id: Uuid,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,

    /// Sanitized content with attachment records resolved in.
    pub content: Content,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub channel_id: Option<Uuid>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub direct_message_user_id: Option<Uuid>,

    pub edited: bool,
}

/// Where a new message is addressed. Exactly one side must be present; the
/// service rejects both-or-neither before any storage work happens.
#[derive(Debug, Clone, Copy)]
pub struct MessageTarget {
    pub channel_id: Option<Uuid>,
    pub direct_message_user_id: Option<Uuid>,
}

impl Message {
    pub fn is_direct(&self) -> bool {
        self.direct_message_user_id.is_some()
    }
}
