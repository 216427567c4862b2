//! Authoritative in-memory state and its snapshot shape.
//!
//! `MemoryState` is the single source of truth for the in-memory backend:
//! one `RoomState` per room with indexed collections, a global token index
//! for cross-room token resolution, and one monotonic message-id counter so
//! ids stay strictly increasing backend-wide.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::{Attachment, Channel, Message, Room, User};
use crate::domain::service::parse_credential;

/// Where a token points.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TokenRef {
    pub room_id: Uuid,
    pub user_id: Uuid,
}

/// One room's collections, indexed by id.
#[derive(Debug)]
pub(crate) struct RoomState {
    pub room: Room,
    pub users: HashMap<Uuid, User>,
    pub channels: HashMap<Uuid, Channel>,
    /// Private-channel membership sets, keyed by channel id.
    pub members: HashMap<Uuid, HashSet<Uuid>>,
    /// Ordered by id, which doubles as the pagination cursor.
    pub messages: BTreeMap<i64, Message>,
    pub attachments: HashMap<Uuid, Attachment>,
}

impl RoomState {
    pub fn new(room: Room) -> Self {
        Self {
            room,
            users: HashMap::new(),
            channels: HashMap::new(),
            members: HashMap::new(),
            messages: BTreeMap::new(),
            attachments: HashMap::new(),
        }
    }
}

/// The whole backend state.
#[derive(Debug)]
pub(crate) struct MemoryState {
    pub rooms: HashMap<Uuid, RoomState>,
    pub tokens: HashMap<Uuid, TokenRef>,
    pub next_message_id: i64,
}

impl Default for MemoryState {
    fn default() -> Self {
        Self {
            rooms: HashMap::new(),
            tokens: HashMap::new(),
            // Ids count from 1, like the SQL backend's BIGSERIAL.
            next_message_id: 1,
        }
    }
}

impl MemoryState {
    /// Resolve a raw token string to its user.
    pub fn user_by_token(&self, token: &str) -> Option<User> {
        let token = parse_credential(token)?;
        let token_ref = self.tokens.get(&token)?;
        self.rooms
            .get(&token_ref.room_id)?
            .users
            .get(&token_ref.user_id)
            .cloned()
    }

    /// Resolve a token and require the admin role.
    pub fn admin_by_token(&self, token: &str) -> Option<User> {
        self.user_by_token(token)
            .filter(|user| user.role.is_admin())
    }

    /// Look up a user by id across all rooms (transfer bundles only).
    pub fn user_by_id(&self, user_id: Uuid) -> Option<User> {
        self.rooms
            .values()
            .find_map(|room| room.users.get(&user_id).cloned())
    }

    /// Claim the next message id.
    pub fn take_message_id(&mut self) -> i64 {
        let id = self.next_message_id;
        self.next_message_id += 1;
        id
    }

    pub fn insert_user(&mut self, user: User) {
        self.tokens.insert(
            user.token,
            TokenRef {
                room_id: user.room_id,
                user_id: user.id,
            },
        );
        if let Some(room) = self.rooms.get_mut(&user.room_id) {
            room.users.insert(user.id, user);
        }
    }

    /// Serialize every room for persistence.
    pub fn to_snapshot(&self) -> Vec<RoomSnapshot> {
        self.rooms
            .values()
            .map(|state| {
                let mut users: Vec<User> = state.users.values().cloned().collect();
                users.sort_by_key(|user| (user.created_at, user.id));

                let mut channels: Vec<ChannelSnapshot> = state
                    .channels
                    .values()
                    .map(|channel| ChannelSnapshot {
                        channel: channel.clone(),
                        user_ids: state
                            .members
                            .get(&channel.id)
                            .map(|set| {
                                let mut ids: Vec<Uuid> = set.iter().copied().collect();
                                ids.sort();
                                ids
                            })
                            .unwrap_or_default(),
                    })
                    .collect();
                channels.sort_by_key(|entry| (entry.channel.created_at, entry.channel.id));

                let mut attachments: Vec<Attachment> =
                    state.attachments.values().cloned().collect();
                attachments.sort_by_key(|attachment| (attachment.created_at, attachment.id));

                RoomSnapshot {
                    room: state.room.clone(),
                    users,
                    channels,
                    attachments,
                    messages: state.messages.values().cloned().collect(),
                    next_message_id: self.next_message_id,
                }
            })
            .collect()
    }

    /// Rebuild the full state, including the derived indexes, from a
    /// snapshot. The message-id counter restores to the highest per-room
    /// value so ids keep increasing across restarts.
    pub fn from_snapshot(rooms: Vec<RoomSnapshot>) -> Self {
        let mut state = MemoryState::default();

        for snapshot in rooms {
            state.next_message_id = state.next_message_id.max(snapshot.next_message_id);

            let mut room_state = RoomState::new(snapshot.room);

            for entry in snapshot.channels {
                if entry.channel.is_private {
                    room_state
                        .members
                        .insert(entry.channel.id, entry.user_ids.into_iter().collect());
                }
                room_state.channels.insert(entry.channel.id, entry.channel);
            }

            for attachment in snapshot.attachments {
                room_state.attachments.insert(attachment.id, attachment);
            }

            // Channel linkage is rederived from the messages themselves.
            for message in snapshot.messages {
                state.next_message_id = state.next_message_id.max(message.id + 1);
                room_state.messages.insert(message.id, message);
            }

            let room_id = room_state.room.id;
            state.rooms.insert(room_id, room_state);

            for user in snapshot.users {
                state.tokens.insert(
                    user.token,
                    TokenRef {
                        room_id,
                        user_id: user.id,
                    },
                );
                if let Some(room) = state.rooms.get_mut(&room_id) {
                    room.users.insert(user.id, user);
                }
            }
        }

        state
    }
}

/// Per-room persistence record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub room: Room,
    pub users: Vec<User>,
    pub channels: Vec<ChannelSnapshot>,
    pub attachments: Vec<Attachment>,
    pub messages: Vec<Message>,
    pub next_message_id: i64,
}

/// A channel together with its private-member ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSnapshot {
    pub channel: Channel,
    pub user_ids: Vec<Uuid>,
}
