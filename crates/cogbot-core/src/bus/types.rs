//! Bus event types — what the gateway reports to the cogs.

use crate::types::{ChannelInfo, Emoji, Message, User};

/// A reaction placed on a message.
///
/// The gateway only reports ids; handlers fetch the message itself when they
/// need its author or aggregated reaction counts.
#[derive(Clone, Debug, PartialEq)]
pub struct ReactionEvent {
    pub channel_id: String,
    pub message_id: String,
    /// `None` for reactions in direct messages.
    pub guild_id: Option<String>,
    /// Who placed the reaction.
    pub reactor: User,
    pub emoji: Emoji,
}

/// An event received from the chat platform.
#[derive(Clone, Debug, PartialEq)]
pub enum PlatformEvent {
    /// The session is established; carries the bot's own user.
    Ready { user: User },
    /// A message was posted.
    MessageCreated(Message),
    /// A reaction was added to a message.
    ReactionAdded(ReactionEvent),
    /// A channel was changed (e.g. renamed).
    ChannelUpdated(ChannelInfo),
}

impl PlatformEvent {
    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            PlatformEvent::Ready { .. } => "ready",
            PlatformEvent::MessageCreated(_) => "message_created",
            PlatformEvent::ReactionAdded(_) => "reaction_added",
            PlatformEvent::ChannelUpdated(_) => "channel_updated",
        }
    }
}
