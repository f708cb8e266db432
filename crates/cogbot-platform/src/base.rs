//! ChatPlatform trait — the abstract interface the cogs use to act on the
//! chat platform.
//!
//! Everything the cogs do to the outside world goes through this trait:
//! - reading channels, messages, guilds, and emoji
//! - sending messages and embeds
//! - renaming channels (help-channel status lives in the name)
//! - adding reactions and deleting messages

use async_trait::async_trait;
use cogbot_core::types::{ChannelInfo, Embed, Emoji, GuildInfo, Message, User};

use crate::error::PlatformError;

/// Result alias for platform calls.
pub type PlatformResult<T> = Result<T, PlatformError>;

/// Every chat platform backend implements this trait.
///
/// Lookups return `Ok(None)` when the object does not exist; every other
/// failure is an error.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// The bot's own user.
    async fn current_user(&self) -> PlatformResult<User>;

    /// Fetch a guild by id.
    async fn get_guild(&self, guild_id: &str) -> PlatformResult<Option<GuildInfo>>;

    /// List the custom emoji of a guild.
    async fn guild_emojis(&self, guild_id: &str) -> PlatformResult<Vec<Emoji>>;

    /// Fetch a channel by id.
    async fn get_channel(&self, channel_id: &str) -> PlatformResult<Option<ChannelInfo>>;

    /// Rename a channel, returning the updated channel.
    async fn rename_channel(&self, channel_id: &str, name: &str) -> PlatformResult<ChannelInfo>;

    /// Send a text message.
    async fn send_message(&self, channel_id: &str, content: &str) -> PlatformResult<Message>;

    /// Send a message carrying an embed.
    async fn send_embed(
        &self,
        channel_id: &str,
        content: &str,
        embed: &Embed,
    ) -> PlatformResult<Message>;

    /// Fetch a single message (including its reaction counts).
    async fn get_message(
        &self,
        channel_id: &str,
        message_id: &str,
    ) -> PlatformResult<Option<Message>>;

    /// Fetch up to `limit` most recent messages, newest first.
    async fn recent_messages(&self, channel_id: &str, limit: u8) -> PlatformResult<Vec<Message>>;

    /// React to a message as the bot.
    async fn add_reaction(
        &self,
        channel_id: &str,
        message_id: &str,
        emoji: &Emoji,
    ) -> PlatformResult<()>;

    /// Delete a message.
    async fn delete_message(&self, channel_id: &str, message_id: &str) -> PlatformResult<()>;

    /// The most recent message in a channel, if any.
    async fn latest_message(&self, channel_id: &str) -> PlatformResult<Option<Message>> {
        Ok(self.recent_messages(channel_id, 1).await?.into_iter().next())
    }

    /// Whether `message_id` is the most recent message in its channel.
    async fn is_latest_message(&self, channel_id: &str, message_id: &str) -> PlatformResult<bool> {
        Ok(self
            .latest_message(channel_id)
            .await?
            .is_some_and(|latest| latest.id == message_id))
    }
}
