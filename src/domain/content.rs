//! Message content: canonical shape and the sanitizer that produces it.
//!
//! Content arrives from clients as arbitrary JSON. [`sanitize`] is the single
//! gate through which it becomes a [`Content`] value; it runs on every create
//! AND every edit, so stored shape is never trusted. The function is pure and
//! performs no I/O, which keeps it callable outside any transaction.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::entities::Attachment;
use crate::shared::ChatError;

/// Range annotation over the message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacetKind {
    Mention,
    Link,
    Code,
}

impl FacetKind {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "mention" => Some(Self::Mention),
            "link" => Some(Self::Link),
            "code" => Some(Self::Code),
            _ => None,
        }
    }
}

/// A validated annotation: `0 <= start < end <= text chars`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facet {
    #[serde(rename = "type")]
    pub kind: FacetKind,
    pub start: usize,
    pub end: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub value: Option<String>,
}

/// Reference to another message in the same room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEmbed {
    pub message_id: Uuid,
    pub room_id: Uuid,
}

/// External link preview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalEmbed {
    pub uri: String,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub thumb: Option<String>,
}

/// Either a message reference or an external preview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Embed {
    Message(MessageEmbed),
    External(ExternalEmbed),
}

/// Canonical validated content.
///
/// `attachment_ids` is the client-supplied input; the service resolves each
/// id to a full [`Attachment`] record at create/edit time and stores the
/// resolved list instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    pub text: String,

    pub facets: Vec<Facet>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub embed: Option<Embed>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    #[serde(default)]
    pub attachment_ids: Vec<Uuid>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl Content {
    /// Swap the id list for resolved attachment records.
    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachment_ids = Vec::new();
        self.attachments = attachments;
        self
    }
}

/// Validate untrusted JSON into canonical [`Content`].
pub fn sanitize(value: &Value) -> Result<Content, ChatError> {
    let input = value
        .as_object()
        .ok_or(ChatError::InvalidContentStructure)?;

    let text = match input.get("text") {
        Some(Value::String(s)) => s.clone(),
        _ => String::new(),
    };
    if text.is_empty() {
        return Err(ChatError::InvalidTextContent);
    }
    let text_len = text.chars().count();

    let mut facets = Vec::new();
    if let Some(Value::Array(raw)) = input.get("facets") {
        for item in raw {
            // Non-mapping elements are dropped, not rejected.
            let Some(map) = item.as_object() else { continue };
            facets.push(sanitize_facet(map, text_len)?);
        }
    }

    let embed = match input.get("embed") {
        None | Some(Value::Null) => None,
        Some(Value::Object(map)) => Some(sanitize_embed(map)?),
        Some(_) => return Err(ChatError::InvalidEmbed),
    };

    let mut attachment_ids = Vec::new();
    if let Some(Value::Array(raw)) = input.get("attachmentIds") {
        for item in raw {
            // Keep only UUID-formatted strings.
            if let Some(id) = item.as_str().and_then(|s| Uuid::parse_str(s).ok()) {
                attachment_ids.push(id);
            }
        }
    }

    Ok(Content {
        text,
        facets,
        embed,
        attachment_ids,
        attachments: Vec::new(),
    })
}

/// Coerce one facet object, keeping only string/number fields, then validate.
fn sanitize_facet(
    map: &serde_json::Map<String, Value>,
    text_len: usize,
) -> Result<Facet, ChatError> {
    let kind = map
        .get("type")
        .and_then(Value::as_str)
        .and_then(FacetKind::parse)
        .ok_or(ChatError::InvalidFacet)?;

    let start = map
        .get("start")
        .and_then(Value::as_f64)
        .ok_or(ChatError::InvalidFacet)?;
    let end = map
        .get("end")
        .and_then(Value::as_f64)
        .ok_or(ChatError::InvalidFacet)?;

    if start < 0.0 || start >= end || end > text_len as f64 {
        return Err(ChatError::InvalidFacet);
    }

    let value = match map.get("value") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => return Err(ChatError::InvalidFacet),
    };

    Ok(Facet {
        kind,
        start: start as usize,
        end: end as usize,
        value,
    })
}

/// Validate an embed object. Extra keys reject the embed outright.
fn sanitize_embed(map: &serde_json::Map<String, Value>) -> Result<Embed, ChatError> {
    let has = |k: &str| map.contains_key(k);

    if has("messageId") && has("roomId") {
        if map.len() != 2 {
            return Err(ChatError::InvalidEmbed);
        }
        let message_id = map
            .get("messageId")
            .and_then(Value::as_str)
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or(ChatError::InvalidEmbed)?;
        let room_id = map
            .get("roomId")
            .and_then(Value::as_str)
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or(ChatError::InvalidEmbed)?;
        return Ok(Embed::Message(MessageEmbed {
            message_id,
            room_id,
        }));
    }

    if has("uri") && has("title") && has("description") {
        let expected = if has("thumb") { 4 } else { 3 };
        if map.len() != expected {
            return Err(ChatError::InvalidEmbed);
        }
        let field = |k: &str| {
            map.get(k)
                .and_then(Value::as_str)
                .map(str::to_owned)
                .ok_or(ChatError::InvalidEmbed)
        };
        let thumb = match map.get("thumb") {
            None => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => return Err(ChatError::InvalidEmbed),
        };
        return Ok(Embed::External(ExternalEmbed {
            uri: field("uri")?,
            title: field("title")?,
            description: field("description")?,
            thumb,
        }));
    }

    Err(ChatError::InvalidEmbed)
}
