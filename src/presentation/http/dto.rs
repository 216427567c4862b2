//! Response DTOs
//!
//! Wire shapes for users. Tokens are credentials, so the default user shape
//! strips them; only the flows that prove control of an account (room
//! bootstrap, invite consumption, transfer redemption) use the
//! token-bearing variant. Other entities serialize directly.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::entities::{Role, User};

/// User as everyone else sees them: no token.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub room_id: Uuid,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_id: Option<Uuid>,
    pub role: Role,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            room_id: user.room_id,
            created_at: user.created_at,
            display_name: user.display_name,
            description: user.description,
            avatar_id: user.avatar_id,
            role: user.role,
        }
    }
}

/// User as their owner sees them: token included.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizedUserResponse {
    pub id: Uuid,
    pub room_id: Uuid,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    pub token: Uuid,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_id: Option<Uuid>,
    pub role: Role,
}

impl From<User> for AuthorizedUserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            room_id: user.room_id,
            created_at: user.created_at,
            token: user.token,
            display_name: user.display_name,
            description: user.description,
            avatar_id: user.avatar_id,
            role: user.role,
        }
    }
}
