//! Room entity.
//!
//! A room is the tenant boundary: users, channels, and messages never cross
//! it. Maps to the `rooms` table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One tenant's chat world.
///
/// Maps to the `rooms` table:
/// - id: UUID PRIMARY KEY
/// - created_at: TIMESTAMPTZ NOT NULL
/// - display_name: TEXT NOT NULL
/// - description: TEXT NULL
/// - logo_id: UUID NULL REFERENCES attachments(id)
/// - admin_invite_only: BOOLEAN NOT NULL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: Uuid,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,

    pub display_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub description: Option<String>,

    /// Image attachment used as the room logo.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub logo_id: Option<Uuid>,

    /// When set, only admins may mint invite codes.
    pub admin_invite_only: bool,
}

impl Room {
    pub fn new(display_name: impl Into<String>, admin_invite_only: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: crate::shared::time::now_millis(),
            display_name: display_name.into(),
            description: None,
            logo_id: None,
            admin_invite_only,
        }
    }
}
