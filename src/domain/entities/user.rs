//! User entity and role.
//!
//! Maps to the `users` table. The token is the user's only credential; it is
//! rotated (never deleted) when an admin removes the user, which revokes the
//! old value while preserving message authorship.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role within a room, matching the `role` CHECK constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Participant,
}

impl Role {
    /// Database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Participant => "participant",
        }
    }

    /// Parse the database string representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Self::Admin),
            "participant" => Some(Self::Participant),
            _ => None,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A member of a room.
///
/// Maps to the `users` table:
/// - id: UUID PRIMARY KEY
/// - room_id: UUID NOT NULL REFERENCES rooms(id)
/// - created_at: TIMESTAMPTZ NOT NULL
/// - token: UUID NOT NULL UNIQUE
/// - display_name: TEXT NOT NULL
/// - description: TEXT NULL
/// - avatar_id: UUID NULL REFERENCES attachments(id)
/// - role: TEXT NOT NULL CHECK (role IN ('admin','participant'))
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,

    pub room_id: Uuid,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,

    /// Opaque credential. Handlers must strip this before returning a user
    /// to anyone other than its owner.
    pub token: Uuid,

    pub display_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub description: Option<String>,

    /// Image attachment owned by this user, shown as their avatar.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub avatar_id: Option<Uuid>,

    pub role: Role,
}

impl User {
    /// Mint a new user with a fresh id and token.
    pub fn new(room_id: Uuid, display_name: impl Into<String>, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            room_id,
            created_at: crate::shared::time::now_millis(),
            token: Uuid::new_v4(),
            display_name: display_name.into(),
            description: None,
            avatar_id: None,
            role,
        }
    }
}
