//! Core types for Cogbot — the chat platform objects the cogs reason about.
//!
//! These are deliberately small: only the fields the cogs read are modelled.
//! The platform crate converts raw API payloads into these types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

// ─────────────────────────────────────────────
// Users, guilds, channels
// ─────────────────────────────────────────────

/// A platform user (member or bot).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub bot: bool,
}

impl User {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            bot: false,
        }
    }

    /// Mention markup, e.g. `<@1234>`.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }
}

/// A guild ("server" / community).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildInfo {
    pub id: String,
    pub name: String,
}

/// A text channel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub guild_id: Option<String>,
}

impl ChannelInfo {
    /// Mention markup, e.g. `<#1234>`.
    pub fn mention(&self) -> String {
        channel_mention(&self.id)
    }
}

/// Mention markup for a channel id.
pub fn channel_mention(channel_id: &str) -> String {
    format!("<#{channel_id}>")
}

// ─────────────────────────────────────────────
// Emoji
// ─────────────────────────────────────────────

/// An emoji as used in reactions and message content.
///
/// Custom emoji are equal when their ids are; name and animation are
/// display details that partial payloads may leave out.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Emoji {
    /// A plain unicode emoji such as `✅`.
    Unicode(String),
    /// A guild custom emoji.
    Custom {
        id: String,
        name: String,
        #[serde(default)]
        animated: bool,
    },
}

impl Emoji {
    pub fn unicode(s: impl Into<String>) -> Self {
        Emoji::Unicode(s.into())
    }

    pub fn custom(id: impl Into<String>, name: impl Into<String>) -> Self {
        Emoji::Custom {
            id: id.into(),
            name: name.into(),
            animated: false,
        }
    }

    /// Build from the `{ id, name, animated }` fields the platform reports.
    pub fn from_parts(id: Option<&str>, name: &str, animated: bool) -> Self {
        match id {
            Some(id) if !id.is_empty() => Emoji::Custom {
                id: id.to_string(),
                name: name.to_string(),
                animated,
            },
            _ => Emoji::Unicode(name.to_string()),
        }
    }

    /// Name used when matching against configured emoji names.
    pub fn name(&self) -> &str {
        match self {
            Emoji::Unicode(s) => s,
            Emoji::Custom { name, .. } => name,
        }
    }
}

impl PartialEq for Emoji {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Emoji::Unicode(a), Emoji::Unicode(b)) => a == b,
            (Emoji::Custom { id: a, .. }, Emoji::Custom { id: b, .. }) => a == b,
            _ => false,
        }
    }
}

impl Eq for Emoji {}

impl Hash for Emoji {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Emoji::Unicode(s) => {
                0u8.hash(state);
                s.hash(state);
            }
            Emoji::Custom { id, .. } => {
                1u8.hash(state);
                id.hash(state);
            }
        }
    }
}

impl fmt::Display for Emoji {
    /// Renders the emoji the way it appears in message content.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Emoji::Unicode(s) => f.write_str(s),
            Emoji::Custom {
                id,
                name,
                animated: true,
            } => write!(f, "<a:{name}:{id}>"),
            Emoji::Custom { id, name, .. } => write!(f, "<:{name}:{id}>"),
        }
    }
}

// ─────────────────────────────────────────────
// Messages
// ─────────────────────────────────────────────

/// Aggregated reaction count on a message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionCount {
    pub emoji: Emoji,
    pub count: u32,
    /// Whether the bot itself is among the reactors.
    #[serde(default)]
    pub me: bool,
}

/// A message posted in a channel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub channel_id: String,
    #[serde(default)]
    pub guild_id: Option<String>,
    pub author: User,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub reactions: Vec<ReactionCount>,
}

impl Message {
    /// How many times `emoji` has been placed on this message.
    pub fn reaction_count(&self, emoji: &Emoji) -> u32 {
        self.reactions
            .iter()
            .find(|r| &r.emoji == emoji)
            .map(|r| r.count)
            .unwrap_or(0)
    }

    /// Link that jumps to this message, when it belongs to a guild.
    pub fn jump_url(&self) -> Option<String> {
        self.guild_id
            .as_deref()
            .map(|guild| crate::utils::message_link(guild, &self.channel_id, &self.id))
    }
}

// ─────────────────────────────────────────────
// Embeds
// ─────────────────────────────────────────────

/// Rich embed attached to an outgoing message (Discord embed object shape).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Embed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<EmbedImage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<EmbedAuthor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmbedImage {
    pub url: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmbedAuthor {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl Embed {
    /// Append an inline field.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline: true,
        });
        self
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
