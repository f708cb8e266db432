//! In-memory platform and clock for cog tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use cogbot_core::types::{ChannelInfo, Embed, Emoji, GuildInfo, Message, ReactionCount, User};
use cogbot_core::utils::Clock;
use cogbot_platform::{ChatPlatform, PlatformError, PlatformResult};

pub(crate) const BOT_ID: &str = "bot";
pub(crate) const GUILD_ID: &str = "g1";

/// Everything the mock has been asked to do.
#[derive(Default)]
pub(crate) struct MockState {
    pub guilds: HashMap<String, GuildInfo>,
    pub emojis: HashMap<String, Vec<Emoji>>,
    pub channels: HashMap<String, ChannelInfo>,
    /// Per channel, oldest first.
    pub messages: HashMap<String, Vec<Message>>,
    pub renames: Vec<(String, String)>,
    pub sent: Vec<(String, String)>,
    pub embeds: Vec<(String, String, Embed)>,
    pub reactions: Vec<(String, String, Emoji)>,
    pub deleted: Vec<(String, String)>,
    pub fail_renames: bool,
    /// Guild lookups that fail with a server error.
    pub fail_guilds: HashSet<String>,
    next_id: u64,
}

pub(crate) struct MockPlatform {
    pub user: User,
    state: Mutex<MockState>,
}

impl MockPlatform {
    pub fn new() -> Self {
        let mut state = MockState::default();
        state.guilds.insert(
            GUILD_ID.into(),
            GuildInfo {
                id: GUILD_ID.into(),
                name: "Commands".into(),
            },
        );
        Self {
            user: User {
                id: BOT_ID.into(),
                name: "cogbot".into(),
                bot: true,
            },
            state: Mutex::new(state),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub fn add_channel(&self, id: &str, name: &str) {
        self.state().channels.insert(
            id.into(),
            ChannelInfo {
                id: id.into(),
                name: name.into(),
                guild_id: Some(GUILD_ID.into()),
            },
        );
    }

    pub fn channel_name(&self, id: &str) -> String {
        self.state().channels[id].name.clone()
    }

    pub fn push_message(&self, message: Message) {
        self.state()
            .messages
            .entry(message.channel_id.clone())
            .or_default()
            .push(message);
    }

    /// Set the aggregated count of `emoji` on a stored message.
    pub fn set_reaction_count(
        &self,
        channel_id: &str,
        message_id: &str,
        emoji: &Emoji,
        count: u32,
    ) {
        let mut state = self.state();
        if let Some(msg) = state
            .messages
            .get_mut(channel_id)
            .and_then(|msgs| msgs.iter_mut().find(|m| m.id == message_id))
        {
            msg.reactions.retain(|r| &r.emoji != emoji);
            msg.reactions.push(ReactionCount {
                emoji: emoji.clone(),
                count,
                me: false,
            });
        }
    }

    pub fn sent_to(&self, channel_id: &str) -> Vec<String> {
        self.state()
            .sent
            .iter()
            .filter(|(c, _)| c == channel_id)
            .map(|(_, content)| content.clone())
            .collect()
    }
}

/// A guild message from `author_id` at `timestamp`.
pub(crate) fn message(
    id: &str,
    channel_id: &str,
    author_id: &str,
    content: &str,
    timestamp: DateTime<Utc>,
) -> Message {
    Message {
        id: id.into(),
        channel_id: channel_id.into(),
        guild_id: Some(GUILD_ID.into()),
        author: User {
            id: author_id.into(),
            name: author_id.into(),
            bot: author_id == BOT_ID,
        },
        content: content.into(),
        timestamp,
        reactions: Vec::new(),
    }
}

pub(crate) fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

/// A clock that only moves when told to.
#[derive(Clone)]
pub(crate) struct TestClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl TestClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    pub fn advance(&self, seconds: i64) {
        *self.now.lock().unwrap() += Duration::seconds(seconds);
    }

    pub fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }

    pub fn clock(&self) -> Clock {
        let now = self.now.clone();
        Arc::new(move || *now.lock().unwrap())
    }
}

#[async_trait]
impl ChatPlatform for MockPlatform {
    async fn current_user(&self) -> PlatformResult<User> {
        Ok(self.user.clone())
    }

    async fn get_guild(&self, guild_id: &str) -> PlatformResult<Option<GuildInfo>> {
        let state = self.state();
        if state.fail_guilds.contains(guild_id) {
            return Err(PlatformError::Status {
                method: "GET".into(),
                path: format!("/guilds/{guild_id}"),
                status: 502,
                body: "Bad Gateway".into(),
            });
        }
        Ok(state.guilds.get(guild_id).cloned())
    }

    async fn guild_emojis(&self, guild_id: &str) -> PlatformResult<Vec<Emoji>> {
        Ok(self.state().emojis.get(guild_id).cloned().unwrap_or_default())
    }

    async fn get_channel(&self, channel_id: &str) -> PlatformResult<Option<ChannelInfo>> {
        Ok(self.state().channels.get(channel_id).cloned())
    }

    async fn rename_channel(&self, channel_id: &str, name: &str) -> PlatformResult<ChannelInfo> {
        let mut state = self.state();
        if state.fail_renames {
            return Err(PlatformError::Status {
                method: "PATCH".into(),
                path: format!("/channels/{channel_id}"),
                status: 403,
                body: "Missing Permissions".into(),
            });
        }
        state.renames.push((channel_id.into(), name.into()));
        let channel = state
            .channels
            .get_mut(channel_id)
            .ok_or_else(|| PlatformError::Gateway(format!("unknown channel {channel_id}")))?;
        channel.name = name.into();
        Ok(channel.clone())
    }

    async fn send_message(&self, channel_id: &str, content: &str) -> PlatformResult<Message> {
        let mut state = self.state();
        state.next_id += 1;
        let msg = message(
            &format!("sent{}", state.next_id),
            channel_id,
            BOT_ID,
            content,
            t0(),
        );
        state.sent.push((channel_id.into(), content.into()));
        state
            .messages
            .entry(channel_id.into())
            .or_default()
            .push(msg.clone());
        Ok(msg)
    }

    async fn send_embed(
        &self,
        channel_id: &str,
        content: &str,
        embed: &Embed,
    ) -> PlatformResult<Message> {
        self.state()
            .embeds
            .push((channel_id.into(), content.into(), embed.clone()));
        Ok(message("embed", channel_id, BOT_ID, content, t0()))
    }

    async fn get_message(
        &self,
        channel_id: &str,
        message_id: &str,
    ) -> PlatformResult<Option<Message>> {
        Ok(self
            .state()
            .messages
            .get(channel_id)
            .and_then(|msgs| msgs.iter().find(|m| m.id == message_id).cloned()))
    }

    async fn recent_messages(&self, channel_id: &str, limit: u8) -> PlatformResult<Vec<Message>> {
        Ok(self
            .state()
            .messages
            .get(channel_id)
            .map(|msgs| msgs.iter().rev().take(limit as usize).cloned().collect())
            .unwrap_or_default())
    }

    async fn add_reaction(
        &self,
        channel_id: &str,
        message_id: &str,
        emoji: &Emoji,
    ) -> PlatformResult<()> {
        self.state()
            .reactions
            .push((channel_id.into(), message_id.into(), emoji.clone()));
        Ok(())
    }

    async fn delete_message(&self, channel_id: &str, message_id: &str) -> PlatformResult<()> {
        let mut state = self.state();
        if let Some(msgs) = state.messages.get_mut(channel_id) {
            msgs.retain(|m| m.id != message_id);
        }
        state.deleted.push((channel_id.into(), message_id.into()));
        Ok(())
    }
}
