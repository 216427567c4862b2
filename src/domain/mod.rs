//! Domain layer: entities, content sanitation, and the service contract.

pub mod content;
pub mod entities;
pub mod service;

pub use content::{sanitize, Content, Embed, ExternalEmbed, Facet, FacetKind, MessageEmbed};
pub use entities::{Attachment, AttachmentKind, Channel, Message, MessageTarget, NewAttachment, Role, Room, User};
pub use service::{ChatService, ChannelUpdate, MessageQuery, RoomBootstrap, RoomUpdate, UserUpdate};
