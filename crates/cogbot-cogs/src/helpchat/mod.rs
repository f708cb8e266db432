//! Help-channel triage.
//!
//! Each configured guild gets a [`HelpChatServerState`] once the platform
//! reports ready. Messages and reactions are routed to the state of the
//! guild they happened in; DMs and the bot's own activity are ignored.

pub mod state;
pub mod status;

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, error, warn};

use cogbot_core::bus::ReactionEvent;
use cogbot_core::config::{HelpChatConfig, HelpChatServerConfig, ServerConfig};
use cogbot_core::types::{ChannelInfo, Message, User};
use cogbot_core::utils::Clock;
use cogbot_platform::ChatPlatform;

use crate::modlog::{ModLog, ModLogEntry};

pub use state::{HelpChatServerState, ManagedChannel};
pub use status::{ChannelStatus, StatusPrefixes};

pub struct HelpChat {
    platform: Arc<dyn ChatPlatform>,
    options: HelpChatConfig,
    servers: HashMap<String, ServerConfig>,
    clock: Clock,
    modlog: ModLog,
    /// guild id → state
    states: HashMap<String, HelpChatServerState>,
    bot_user: Option<User>,
}

impl HelpChat {
    pub fn new(
        platform: Arc<dyn ChatPlatform>,
        options: HelpChatConfig,
        servers: HashMap<String, ServerConfig>,
        clock: Clock,
    ) -> Self {
        Self {
            modlog: ModLog::new(platform.clone()),
            platform,
            options,
            servers,
            clock,
            states: HashMap::new(),
            bot_user: None,
        }
    }

    pub fn state(&self, guild_id: &str) -> Option<&HelpChatServerState> {
        self.states.get(guild_id)
    }

    pub fn modlog(&self) -> &ModLog {
        &self.modlog
    }

    fn is_bot(&self, user: &User) -> bool {
        self.bot_user.as_ref().is_some_and(|bot| bot.id == user.id)
    }

    /// Build per-guild state from configuration. Guilds the bot cannot see
    /// are skipped with a warning; a guild that fails to set up is logged and
    /// skipped without affecting the others.
    pub async fn on_ready(&mut self, bot_user: &User) {
        self.bot_user = Some(bot_user.clone());
        self.modlog.resolve(&self.servers).await;

        self.states.clear();
        let servers = self.options.servers.clone();
        for (guild_id, options) in servers {
            match self.setup_guild(&guild_id, &options, bot_user).await {
                Ok(Some(state)) => {
                    self.states.insert(guild_id, state);
                }
                Ok(None) => warn!(guild = %guild_id, "failed to resolve help chat guild"),
                Err(e) => error!(guild = %guild_id, error = %e, "failed to set up help chat guild"),
            }
        }
    }

    async fn setup_guild(
        &mut self,
        guild_id: &str,
        options: &HelpChatServerConfig,
        bot_user: &User,
    ) -> anyhow::Result<Option<HelpChatServerState>> {
        if self.platform.get_guild(guild_id).await?.is_none() {
            return Ok(None);
        }
        self.modlog.remember_guild(guild_id).await?;

        let state = HelpChatServerState::resolve(
            self.platform.clone(),
            guild_id,
            bot_user.clone(),
            options,
            self.clock.clone(),
        )
        .await?;
        Ok(Some(state))
    }

    pub async fn on_message(&mut self, message: &Message) -> anyhow::Result<Option<ModLogEntry>> {
        let Some(guild_id) = message.guild_id.as_deref() else {
            return Ok(None);
        };
        if self.is_bot(&message.author) {
            return Ok(None);
        }
        match self.states.get_mut(guild_id) {
            Some(state) => state.on_message(message, &self.modlog).await,
            None => Ok(None),
        }
    }

    /// Reaction events only carry ids, so the message is fetched to learn
    /// its author and reaction counts.
    pub async fn on_reaction_add(
        &mut self,
        reaction: &ReactionEvent,
    ) -> anyhow::Result<Vec<ModLogEntry>> {
        let Some(guild_id) = reaction.guild_id.as_deref() else {
            return Ok(Vec::new());
        };
        if self.is_bot(&reaction.reactor) {
            return Ok(Vec::new());
        }
        let Some(state) = self.states.get_mut(guild_id) else {
            return Ok(Vec::new());
        };

        let Some(mut message) = self
            .platform
            .get_message(&reaction.channel_id, &reaction.message_id)
            .await?
        else {
            debug!(message = %reaction.message_id, "reacted message is gone");
            return Ok(Vec::new());
        };
        message.guild_id.get_or_insert_with(|| guild_id.to_string());

        state.on_reaction(reaction, &message, &self.modlog).await
    }

    pub fn on_channel_updated(&mut self, channel: &ChannelInfo) {
        let Some(guild_id) = channel.guild_id.as_deref() else {
            return;
        };
        if let Some(state) = self.states.get_mut(guild_id) {
            state.on_channel_updated(&channel.id, &channel.name);
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
