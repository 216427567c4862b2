//! Channel entity.
//!
//! Maps to the `channels` table. Private channels carry an explicit member
//! set in `private_channel_members`; public channels are visible to the whole
//! room.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named conversation within a room.
///
/// Maps to the `channels` table:
/// - id: UUID PRIMARY KEY
/// - room_id: UUID NOT NULL REFERENCES rooms(id)
/// - created_at: TIMESTAMPTZ NOT NULL
/// - display_name: TEXT NOT NULL
/// - description: TEXT NULL
/// - is_private: BOOLEAN NOT NULL
/// - created_by: UUID NOT NULL REFERENCES users(id)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: Uuid,

    pub room_id: Uuid,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,

    pub display_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub description: Option<String>,

    pub is_private: bool,

    pub created_by: Uuid,
}

impl Channel {
    pub fn new(
        room_id: Uuid,
        display_name: impl Into<String>,
        is_private: bool,
        created_by: Uuid,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            room_id,
            created_at: crate::shared::time::now_millis(),
            display_name: display_name.into(),
            description: None,
            is_private,
            created_by,
        }
    }
}
