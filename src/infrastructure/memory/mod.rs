//! In-memory backend.
//!
//! Single-process authoritative state behind one `RwLock`, with periodic
//! snapshot persistence through a pluggable [`SnapshotStore`]. Mutations are
//! serialized by the write guard, which is never held across external I/O;
//! that gives the same linearizable-per-operation behavior the SQL backend
//! gets from its transactions.

mod snapshot;
mod state;

pub use snapshot::{FileSnapshotStore, SnapshotStore};
pub use state::{ChannelSnapshot, RoomSnapshot};

use std::collections::HashSet;
use std::io;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::domain::content::{sanitize, Content};
use crate::domain::entities::{
    Attachment, Channel, Message, MessageTarget, NewAttachment, Role, Room, User,
};
use crate::domain::service::{
    parse_credential, ChannelUpdate, ChatService, MessageQuery, RoomBootstrap, RoomUpdate,
    UserUpdate, MAX_MESSAGE_LIMIT,
};
use crate::infrastructure::credentials::CredentialRegistry;
use crate::shared::ChatError;

use state::{MemoryState, RoomState, TokenRef};

/// Cadence of the background snapshot save.
const SAVE_PERIOD: Duration = Duration::from_secs(60);

/// Chat service holding all state in process memory.
pub struct MemoryChatService {
    state: RwLock<MemoryState>,
    registry: Arc<CredentialRegistry>,
    store: Arc<dyn SnapshotStore>,
    saver: StdMutex<Option<JoinHandle<()>>>,
}

impl MemoryChatService {
    /// Load the snapshot, rebuild indexes, and start the periodic save task.
    pub async fn open(
        store: Arc<dyn SnapshotStore>,
        registry: Arc<CredentialRegistry>,
    ) -> io::Result<Arc<Self>> {
        let rooms = store.load().await?;
        let state = MemoryState::from_snapshot(rooms);

        CredentialRegistry::start_sweeper(&registry);

        let service = Arc::new(Self {
            state: RwLock::new(state),
            registry,
            store,
            saver: StdMutex::new(None),
        });

        let weak = Arc::downgrade(&service);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(SAVE_PERIOD);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(service) = weak.upgrade() else { break };
                if let Err(err) = service.save().await {
                    tracing::error!(error = %err, "periodic snapshot save failed");
                }
            }
        });
        *service.saver.lock().expect("saver handle poisoned") = Some(handle);

        Ok(service)
    }

    /// Construct without persistence I/O, for tests and embedded use.
    pub fn with_store(store: Arc<dyn SnapshotStore>, registry: Arc<CredentialRegistry>) -> Self {
        Self {
            state: RwLock::new(MemoryState::default()),
            registry,
            store,
            saver: StdMutex::new(None),
        }
    }

    /// Snapshot the current state and hand it to the store. The state lock
    /// is released before the save awaits.
    pub async fn save(&self) -> io::Result<()> {
        let rooms = {
            let state = self.state.read().await;
            state.to_snapshot()
        };
        self.store.save(&rooms).await
    }
}

#[async_trait]
impl ChatService for MemoryChatService {
    async fn create_room_and_admin(
        &self,
        room_name: &str,
        admin_name: &str,
        admin_invite_only: bool,
    ) -> Result<RoomBootstrap, ChatError> {
        let room = Room::new(room_name, admin_invite_only);
        let admin = User::new(room.id, admin_name, Role::Admin);
        let general_channel = Channel::new(room.id, "General", false, admin.id);

        let mut state = self.state.write().await;
        let mut room_state = RoomState::new(room.clone());
        room_state
            .channels
            .insert(general_channel.id, general_channel.clone());
        state.rooms.insert(room.id, room_state);
        state.insert_user(admin.clone());

        tracing::info!(room_id = %room.id, "room created");

        Ok(RoomBootstrap {
            room,
            admin,
            general_channel,
        })
    }

    async fn update_room(&self, admin_token: &str, update: RoomUpdate) -> Result<(), ChatError> {
        let mut state = self.state.write().await;
        let admin = state
            .admin_by_token(admin_token)
            .ok_or(ChatError::InvalidAdminToken)?;

        let room_state = state
            .rooms
            .get_mut(&admin.room_id)
            .ok_or(ChatError::CouldNotUpdateRoom)?;

        if let Some(logo_id) = update.logo_id {
            let is_image = room_state
                .attachments
                .get(&logo_id)
                .is_some_and(|attachment| attachment.kind == crate::domain::AttachmentKind::Image);
            if !is_image {
                return Err(ChatError::InvalidOrNonImageLogoAttachment);
            }
        }

        room_state.room.display_name = update.display_name;
        room_state.room.admin_invite_only = update.admin_invite_only;
        room_state.room.description = update.description;
        room_state.room.logo_id = update.logo_id;

        Ok(())
    }

    async fn get_room(&self, user_token: &str, room_id: Uuid) -> Result<Room, ChatError> {
        let state = self.state.read().await;
        let user = state
            .user_by_token(user_token)
            .ok_or(ChatError::InvalidUserToken)?;

        if user.room_id != room_id {
            return Err(ChatError::RoomNotFound);
        }

        state
            .rooms
            .get(&room_id)
            .map(|room_state| room_state.room.clone())
            .ok_or(ChatError::RoomNotFound)
    }

    async fn create_invite_code(&self, user_token: &str) -> Result<Uuid, ChatError> {
        let state = self.state.read().await;
        let user = state
            .user_by_token(user_token)
            .ok_or(ChatError::UserNotFound)?;
        let room_state = state.rooms.get(&user.room_id).ok_or(ChatError::UserNotFound)?;

        if room_state.room.admin_invite_only && !user.role.is_admin() {
            return Err(ChatError::UserIsNotAdminAndRoomIsAdminInviteOnly);
        }

        Ok(self.registry.mint_invite(user.room_id))
    }

    async fn create_user_from_invite_code(
        &self,
        invite_code: &str,
        display_name: &str,
    ) -> Result<User, ChatError> {
        let code = parse_credential(invite_code).ok_or(ChatError::InvalidInviteCode)?;
        let room_id = self
            .registry
            .peek_invite(code)
            .ok_or(ChatError::InvalidInviteCode)?;

        let mut state = self.state.write().await;
        let room_state = state.rooms.get(&room_id).ok_or(ChatError::InvalidInviteCode)?;

        // A name collision must not burn the code.
        if room_state
            .users
            .values()
            .any(|user| user.display_name == display_name)
        {
            return Err(ChatError::DisplayNameAlreadyExistsInTheRoom);
        }

        // One-shot: a concurrent redeemer may have won since the peek.
        self.registry
            .consume_invite(code)
            .ok_or(ChatError::InvalidInviteCode)?;

        let user = User::new(room_id, display_name, Role::Participant);
        state.insert_user(user.clone());

        tracing::info!(room_id = %room_id, user_id = %user.id, "user joined via invite");

        Ok(user)
    }

    async fn remove_user(&self, admin_token: &str, user_id: Uuid) -> Result<(), ChatError> {
        let mut state = self.state.write().await;
        let admin = state
            .admin_by_token(admin_token)
            .ok_or(ChatError::InvalidAdminTokenOrNonAdminUser)?;

        let room_state = state
            .rooms
            .get_mut(&admin.room_id)
            .ok_or(ChatError::CouldNotRemoveUser)?;

        let old_token = room_state
            .users
            .get(&user_id)
            .map(|user| user.token)
            .ok_or(ChatError::UserNotFoundInAdminsRoom)?;

        for members in room_state.members.values_mut() {
            members.remove(&user_id);
        }

        // Rotating the token revokes the credential; the user row and their
        // messages survive.
        let fresh = Uuid::new_v4();
        if let Some(user) = room_state.users.get_mut(&user_id) {
            user.token = fresh;
        }
        state.tokens.remove(&old_token);
        state.tokens.insert(
            fresh,
            TokenRef {
                room_id: admin.room_id,
                user_id,
            },
        );

        Ok(())
    }

    async fn update_user(&self, user_token: &str, update: UserUpdate) -> Result<(), ChatError> {
        let mut state = self.state.write().await;
        let user = state
            .user_by_token(user_token)
            .ok_or(ChatError::InvalidUserToken)?;

        let room_state = state
            .rooms
            .get_mut(&user.room_id)
            .ok_or(ChatError::CouldNotUpdateUser)?;

        if let Some(avatar_id) = update.avatar_id {
            let owned_image = room_state.attachments.get(&avatar_id).is_some_and(|att| {
                att.user_id == user.id && att.kind == crate::domain::AttachmentKind::Image
            });
            if !owned_image {
                return Err(ChatError::InvalidOrNonImageAvatarAttachment);
            }
        }

        let entry = room_state
            .users
            .get_mut(&user.id)
            .ok_or(ChatError::CouldNotUpdateUser)?;
        if let Some(display_name) = update.display_name {
            entry.display_name = display_name;
        }
        if let Some(description) = update.description {
            entry.description = Some(description);
        }
        if let Some(avatar_id) = update.avatar_id {
            entry.avatar_id = Some(avatar_id);
        }

        Ok(())
    }

    async fn set_user_role(
        &self,
        admin_token: &str,
        user_id: Uuid,
        role: Role,
    ) -> Result<(), ChatError> {
        let mut state = self.state.write().await;
        let admin = state
            .admin_by_token(admin_token)
            .ok_or(ChatError::InvalidAdminTokenOrNonAdminUser)?;

        let user = state
            .rooms
            .get_mut(&admin.room_id)
            .and_then(|room_state| room_state.users.get_mut(&user_id))
            .ok_or(ChatError::UserNotFoundInAdminsRoom)?;
        user.role = role;

        Ok(())
    }

    async fn get_users(
        &self,
        user_token: &str,
        channel_id: Option<Uuid>,
    ) -> Result<Vec<User>, ChatError> {
        let state = self.state.read().await;
        let user = state
            .user_by_token(user_token)
            .ok_or(ChatError::InvalidUserToken)?;
        let room_state = state
            .rooms
            .get(&user.room_id)
            .ok_or(ChatError::CouldNotGetUsers)?;

        let roster = |room_state: &RoomState| {
            let mut users: Vec<User> = room_state.users.values().cloned().collect();
            users.sort_by_key(|entry| (entry.created_at, entry.id));
            users
        };

        let Some(channel_id) = channel_id else {
            return Ok(roster(room_state));
        };

        let channel = room_state
            .channels
            .get(&channel_id)
            .ok_or(ChatError::ChannelNotFoundInUsersRoom)?;

        if !channel.is_private {
            // Everyone in the room belongs to a public channel.
            return Ok(roster(room_state));
        }

        let members = room_state
            .members
            .get(&channel.id)
            .ok_or(ChatError::ChannelNotFoundInUsersRoom)?;
        if !members.contains(&user.id) {
            return Err(ChatError::UserIsNotMemberOfPrivateChannel);
        }

        let mut users: Vec<User> = members
            .iter()
            .filter_map(|member_id| room_state.users.get(member_id).cloned())
            .collect();
        users.sort_by_key(|entry| (entry.created_at, entry.id));
        Ok(users)
    }

    async fn get_user(&self, user_token: &str, user_id: Uuid) -> Result<User, ChatError> {
        let state = self.state.read().await;
        let caller = state
            .user_by_token(user_token)
            .ok_or(ChatError::InvalidUserToken)?;

        state
            .rooms
            .get(&caller.room_id)
            .and_then(|room_state| room_state.users.get(&user_id).cloned())
            .ok_or(ChatError::UserNotFound)
    }

    async fn create_transfer_bundle(&self, user_tokens: &[String]) -> Result<Uuid, ChatError> {
        let state = self.state.read().await;

        let mut user_ids: Vec<Uuid> = Vec::new();
        for raw in user_tokens {
            if let Some(user) = state.user_by_token(raw) {
                if !user_ids.contains(&user.id) {
                    user_ids.push(user.id);
                }
            }
        }

        if user_ids.is_empty() {
            return Err(ChatError::NoValidTokens);
        }

        Ok(self.registry.mint_transfer(user_ids))
    }

    async fn get_transfer_bundle_from_code(
        &self,
        transfer_code: &str,
    ) -> Result<Vec<User>, ChatError> {
        let code =
            parse_credential(transfer_code).ok_or(ChatError::InvalidOrExpiredTransferCode)?;
        let user_ids = self
            .registry
            .consume_transfer(code)
            .ok_or(ChatError::InvalidOrExpiredTransferCode)?;

        let state = self.state.read().await;
        Ok(user_ids
            .into_iter()
            .filter_map(|user_id| state.user_by_id(user_id))
            .collect())
    }

    async fn create_message(
        &self,
        user_token: &str,
        content: &Value,
        target: MessageTarget,
    ) -> Result<i64, ChatError> {
        let mut state = self.state.write().await;
        let user = state
            .user_by_token(user_token)
            .ok_or(ChatError::InvalidUserToken)?;

        check_target(&state, &user, target)?;
        let content = resolve_content(&state, &user, content)?;

        let id = state.take_message_id();
        let message = Message {
            id,
            user_id: user.id,
            created_at: crate::shared::time::now_millis(),
            content,
            channel_id: target.channel_id,
            direct_message_user_id: target.direct_message_user_id,
            edited: false,
        };

        state
            .rooms
            .get_mut(&user.room_id)
            .ok_or(ChatError::CouldNotCreateMessage)?
            .messages
            .insert(id, message);

        Ok(id)
    }

    async fn remove_message(&self, user_token: &str, message_id: i64) -> Result<(), ChatError> {
        let mut state = self.state.write().await;
        let user = state
            .user_by_token(user_token)
            .ok_or(ChatError::InvalidUserToken)?;

        let room_state = state
            .rooms
            .get_mut(&user.room_id)
            .ok_or(ChatError::CouldNotRemoveMessage)?;

        let message = room_state
            .messages
            .get(&message_id)
            .ok_or(ChatError::MessageNotFound)?;

        // The message lives in the author's room, so sharing a room with the
        // caller is already established.
        if message.user_id != user.id && !user.role.is_admin() {
            return Err(ChatError::UserNotAuthorizedToDeleteThisMessage);
        }

        room_state.messages.remove(&message_id);
        Ok(())
    }

    async fn edit_message(
        &self,
        user_token: &str,
        message_id: i64,
        content: &Value,
    ) -> Result<(), ChatError> {
        let mut state = self.state.write().await;
        let user = state
            .user_by_token(user_token)
            .ok_or(ChatError::InvalidUserToken)?;

        let authorized = {
            let room_state = state
                .rooms
                .get(&user.room_id)
                .ok_or(ChatError::CouldNotEditMessage)?;
            let message = room_state
                .messages
                .get(&message_id)
                .ok_or(ChatError::MessageNotFound)?;
            message.user_id == user.id || user.role.is_admin()
        };
        if !authorized {
            return Err(ChatError::UserNotAuthorizedToEditThisMessage);
        }

        let content = resolve_content(&state, &user, content)?;

        let room_state = state
            .rooms
            .get_mut(&user.room_id)
            .ok_or(ChatError::CouldNotEditMessage)?;
        let message = room_state
            .messages
            .get_mut(&message_id)
            .ok_or(ChatError::MessageNotFound)?;
        message.content = content;
        message.edited = true;

        Ok(())
    }

    async fn get_messages(
        &self,
        user_token: &str,
        query: MessageQuery,
    ) -> Result<Vec<Message>, ChatError> {
        let state = self.state.read().await;
        let user = state
            .user_by_token(user_token)
            .ok_or(ChatError::InvalidUserToken)?;

        let target = MessageTarget {
            channel_id: query.channel_id,
            direct_message_user_id: query.direct_message_user_id,
        };
        check_target(&state, &user, target)?;

        let room_state = state
            .rooms
            .get(&user.room_id)
            .ok_or(ChatError::CouldNotGetMessages)?;

        let limit = query.limit.clamp(1, MAX_MESSAGE_LIMIT) as usize;
        let cursor = query.cursor.unwrap_or(i64::MAX);

        let selected: Vec<Message> = room_state
            .messages
            .range(..cursor)
            .rev()
            .filter(|(_, message)| match query.channel_id {
                Some(channel_id) => message.channel_id == Some(channel_id),
                None => {
                    let other = query.direct_message_user_id;
                    (message.user_id == user.id && message.direct_message_user_id == other)
                        || (Some(message.user_id) == other
                            && message.direct_message_user_id == Some(user.id))
                }
            })
            .take(limit)
            .map(|(_, message)| message.clone())
            .collect();

        Ok(selected)
    }

    async fn create_channel(
        &self,
        admin_token: &str,
        display_name: &str,
        is_private: bool,
    ) -> Result<Channel, ChatError> {
        let mut state = self.state.write().await;
        let admin = state
            .admin_by_token(admin_token)
            .ok_or(ChatError::InvalidAdminTokenOrNonAdminUser)?;

        let channel = Channel::new(admin.room_id, display_name, is_private, admin.id);

        let room_state = state
            .rooms
            .get_mut(&admin.room_id)
            .ok_or(ChatError::CouldNotCreateChannel)?;
        room_state.channels.insert(channel.id, channel.clone());
        if is_private {
            room_state
                .members
                .insert(channel.id, HashSet::from([admin.id]));
        }

        Ok(channel)
    }

    async fn update_channel(
        &self,
        admin_token: &str,
        channel_id: Uuid,
        update: ChannelUpdate,
    ) -> Result<(), ChatError> {
        let mut state = self.state.write().await;
        let admin = state
            .admin_by_token(admin_token)
            .ok_or(ChatError::InvalidAdminTokenOrNonAdminUser)?;

        let channel = state
            .rooms
            .get_mut(&admin.room_id)
            .and_then(|room_state| room_state.channels.get_mut(&channel_id))
            .ok_or(ChatError::ChannelNotFound)?;

        if let Some(display_name) = update.display_name {
            channel.display_name = display_name;
        }
        if let Some(description) = update.description {
            channel.description = Some(description);
        }

        Ok(())
    }

    async fn remove_channel(&self, admin_token: &str, channel_id: Uuid) -> Result<(), ChatError> {
        let mut state = self.state.write().await;
        let admin = state
            .admin_by_token(admin_token)
            .ok_or(ChatError::InvalidAdminTokenOrNonAdminUser)?;

        let room_state = state
            .rooms
            .get_mut(&admin.room_id)
            .ok_or(ChatError::CouldNotRemoveChannel)?;

        // Unknown id in the admin's room is a no-op success.
        if room_state.channels.remove(&channel_id).is_some() {
            room_state.members.remove(&channel_id);
            room_state
                .messages
                .retain(|_, message| message.channel_id != Some(channel_id));
        }

        Ok(())
    }

    async fn get_channels(&self, user_token: &str) -> Result<Vec<Channel>, ChatError> {
        let state = self.state.read().await;
        let user = state
            .user_by_token(user_token)
            .ok_or(ChatError::InvalidUserToken)?;
        let room_state = state
            .rooms
            .get(&user.room_id)
            .ok_or(ChatError::CouldNotRetrieveChannels)?;

        let mut channels: Vec<Channel> = room_state
            .channels
            .values()
            .filter(|channel| {
                !channel.is_private
                    || room_state
                        .members
                        .get(&channel.id)
                        .is_some_and(|members| members.contains(&user.id))
            })
            .cloned()
            .collect();
        channels.sort_by_key(|channel| (channel.created_at, channel.id));

        Ok(channels)
    }

    async fn get_channel(&self, user_token: &str, channel_id: Uuid) -> Result<Channel, ChatError> {
        let state = self.state.read().await;
        let user = state
            .user_by_token(user_token)
            .ok_or(ChatError::InvalidUserToken)?;
        let room_state = state
            .rooms
            .get(&user.room_id)
            .ok_or(ChatError::CouldNotRetrieveChannels)?;

        let channel = room_state
            .channels
            .get(&channel_id)
            .ok_or(ChatError::ChannelNotFound)?;

        if channel.is_private
            && !room_state
                .members
                .get(&channel.id)
                .is_some_and(|members| members.contains(&user.id))
        {
            return Err(ChatError::ChannelNotFound);
        }

        Ok(channel.clone())
    }

    async fn add_user_to_channel(
        &self,
        admin_token: &str,
        user_id: Uuid,
        channel_id: Uuid,
    ) -> Result<(), ChatError> {
        let mut state = self.state.write().await;
        let admin = state
            .admin_by_token(admin_token)
            .ok_or(ChatError::InvalidAdminTokenOrNonAdminUser)?;

        let room_state = state
            .rooms
            .get_mut(&admin.room_id)
            .ok_or(ChatError::CouldNotAddUserToChannel)?;

        let is_private = room_state
            .channels
            .get(&channel_id)
            .map(|channel| channel.is_private)
            .ok_or(ChatError::ChannelNotFoundOrNotPrivate)?;
        if !is_private {
            return Err(ChatError::ChannelNotFoundOrNotPrivate);
        }

        if !room_state.users.contains_key(&user_id) {
            return Err(ChatError::UserNotFoundInAdminsRoom);
        }

        // Adding an existing member is a no-op success.
        room_state
            .members
            .entry(channel_id)
            .or_default()
            .insert(user_id);

        Ok(())
    }

    async fn remove_user_from_channel(
        &self,
        admin_token: &str,
        user_id: Uuid,
        channel_id: Uuid,
    ) -> Result<(), ChatError> {
        let mut state = self.state.write().await;
        let admin = state
            .admin_by_token(admin_token)
            .ok_or(ChatError::InvalidAdminTokenOrNonAdminUser)?;

        let room_state = state
            .rooms
            .get_mut(&admin.room_id)
            .ok_or(ChatError::CouldNotRemoveUserFromChannel)?;

        let is_private = room_state
            .channels
            .get(&channel_id)
            .map(|channel| channel.is_private)
            .ok_or(ChatError::ChannelNotFoundOrNotPrivate)?;
        if !is_private {
            return Err(ChatError::ChannelNotFoundOrNotPrivate);
        }

        if let Some(members) = room_state.members.get_mut(&channel_id) {
            members.remove(&user_id);
        }

        Ok(())
    }

    async fn upload_attachment(
        &self,
        user_token: &str,
        upload: NewAttachment,
    ) -> Result<Attachment, ChatError> {
        let mut state = self.state.write().await;
        let user = state
            .user_by_token(user_token)
            .ok_or(ChatError::InvalidToken)?;

        let attachment = Attachment::from_upload(user.id, upload);
        state
            .rooms
            .get_mut(&user.room_id)
            .ok_or(ChatError::CouldNotUploadAttachment)?
            .attachments
            .insert(attachment.id, attachment.clone());

        Ok(attachment)
    }

    async fn remove_attachment(
        &self,
        user_token: &str,
        attachment_id: Uuid,
    ) -> Result<(), ChatError> {
        let path = {
            let mut state = self.state.write().await;
            let user = state
                .user_by_token(user_token)
                .ok_or(ChatError::InvalidToken)?;

            let room_state = state
                .rooms
                .get_mut(&user.room_id)
                .ok_or(ChatError::CouldNotRemoveAttachment)?;

            let owned = room_state
                .attachments
                .get(&attachment_id)
                .is_some_and(|attachment| attachment.user_id == user.id);
            if !owned {
                return Err(ChatError::AttachmentNotFound);
            }

            room_state
                .attachments
                .remove(&attachment_id)
                .map(|attachment| attachment.path)
                .ok_or(ChatError::AttachmentNotFound)?
        };

        // Unlink outside the state lock; a missing file is not an error.
        if let Err(err) = tokio::fs::remove_file(&path).await {
            if err.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %path, error = %err, "could not unlink attachment file");
            }
        }

        Ok(())
    }

    async fn close(&self) -> Result<(), ChatError> {
        if let Some(handle) = self.saver.lock().expect("saver handle poisoned").take() {
            handle.abort();
        }
        self.registry.stop_sweeper();

        self.save().await.map_err(|err| {
            tracing::error!(error = %err, "final snapshot save failed");
            ChatError::UnknownServerError
        })?;

        tracing::info!("in-memory backend closed");
        Ok(())
    }
}

/// Validate the channel/direct-message selector against the caller.
fn check_target(state: &MemoryState, user: &User, target: MessageTarget) -> Result<(), ChatError> {
    let room_state = state
        .rooms
        .get(&user.room_id)
        .ok_or(ChatError::InvalidUserToken)?;

    match (target.channel_id, target.direct_message_user_id) {
        (Some(_), Some(_)) => Err(ChatError::MessageCannotTargetBothAChannelAndADirectUser),
        (None, None) => Err(ChatError::EitherChannelIdOrDirectMessageUserIdMustBeProvided),
        (Some(channel_id), None) => {
            let channel = room_state
                .channels
                .get(&channel_id)
                .ok_or(ChatError::ChannelNotFoundInUsersRoom)?;
            if channel.is_private
                && !room_state
                    .members
                    .get(&channel.id)
                    .is_some_and(|members| members.contains(&user.id))
            {
                return Err(ChatError::UserIsNotMemberOfPrivateChannel);
            }
            Ok(())
        }
        (None, Some(other)) => {
            if !room_state.users.contains_key(&other) {
                return Err(ChatError::UserNotFound);
            }
            Ok(())
        }
    }
}

/// Sanitize raw content and swap attachment ids for records owned by the
/// caller.
fn resolve_content(
    state: &MemoryState,
    user: &User,
    raw: &Value,
) -> Result<Content, ChatError> {
    let content = sanitize(raw)?;
    if content.attachment_ids.is_empty() {
        return Ok(content);
    }

    let room_state = state
        .rooms
        .get(&user.room_id)
        .ok_or(ChatError::InvalidAttachmentIds)?;

    let mut attachments = Vec::with_capacity(content.attachment_ids.len());
    for id in &content.attachment_ids {
        let attachment = room_state
            .attachments
            .get(id)
            .filter(|attachment| attachment.user_id == user.id)
            .ok_or(ChatError::InvalidAttachmentIds)?;
        attachments.push(attachment.clone());
    }

    Ok(content.with_attachments(attachments))
}

impl Drop for MemoryChatService {
    fn drop(&mut self) {
        if let Some(handle) = self.saver.lock().expect("saver handle poisoned").take() {
            handle.abort();
        }
    }
}
