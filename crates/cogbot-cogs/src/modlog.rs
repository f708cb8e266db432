//! Moderation log — a per-guild channel where cogs record what they did.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};

use cogbot_core::config::ServerConfig;
use cogbot_core::types::{Message, User};
use cogbot_core::utils::{message_link, truncate_string};
use cogbot_platform::ChatPlatform;

/// A recorded moderation action.
#[derive(Clone, Debug, PartialEq)]
pub struct ModLogEntry {
    pub guild_id: String,
    pub actor_id: String,
    pub content: String,
    /// The full line as posted to the log channel.
    pub line: String,
    /// Whether the line was posted (a log channel is configured).
    pub posted: bool,
}

pub struct ModLog {
    platform: Arc<dyn ChatPlatform>,
    /// guild id → log channel id
    log_channels: HashMap<String, String>,
    /// guild id → display name
    guild_names: HashMap<String, String>,
}

impl ModLog {
    pub fn new(platform: Arc<dyn ChatPlatform>) -> Self {
        Self {
            platform,
            log_channels: HashMap::new(),
            guild_names: HashMap::new(),
        }
    }

    /// Resolve the configured log channels and guild names.
    ///
    /// Channels that cannot be found are skipped with a warning; that guild
    /// then only gets tracing records.
    /// Resolve the log channel of every configured guild. A guild that fails
    /// to resolve is logged and left without a log channel.
    pub async fn resolve(&mut self, servers: &HashMap<String, ServerConfig>) {
        self.log_channels.clear();
        for (guild_id, server) in servers {
            if let Err(e) = self.resolve_guild(guild_id, server).await {
                error!(guild = %guild_id, error = %e, "failed to resolve mod log settings");
            }
        }
    }

    async fn resolve_guild(&mut self, guild_id: &str, server: &ServerConfig) -> anyhow::Result<()> {
        self.remember_guild(guild_id).await?;

        let Some(channel_id) = server.log_channel.as_deref() else {
            return Ok(());
        };
        match self
            .platform
            .get_channel(channel_id)
            .await
            .with_context(|| format!("failed to fetch log channel {channel_id}"))?
        {
            Some(channel) => {
                info!(guild = %guild_id, channel = %channel.name, "mod log channel resolved");
                self.log_channels.insert(guild_id.to_string(), channel.id);
            }
            None => {
                warn!(guild = %guild_id, channel = %channel_id, "failed to resolve log channel");
            }
        }
        Ok(())
    }

    /// Cache the display name of a guild for log lines.
    pub async fn remember_guild(&mut self, guild_id: &str) -> anyhow::Result<()> {
        if self.guild_names.contains_key(guild_id) {
            return Ok(());
        }
        if let Some(guild) = self.platform.get_guild(guild_id).await? {
            self.guild_names.insert(guild.id, guild.name);
        }
        Ok(())
    }

    pub fn log_channel(&self, guild_id: &str) -> Option<&str> {
        self.log_channels.get(guild_id).map(String::as_str)
    }

    /// Record an action taken by `actor`, optionally pointing at `message`.
    pub async fn mod_log(
        &self,
        guild_id: &str,
        actor: &User,
        content: &str,
        message: Option<&Message>,
        icon: &str,
    ) -> anyhow::Result<ModLogEntry> {
        let guild_name = self
            .guild_names
            .get(guild_id)
            .map(String::as_str)
            .unwrap_or(guild_id);

        let mut line = format!("{icon} [{guild_name}/{}] {content}", actor.name);
        if let Some(msg) = message {
            line.push('\n');
            line.push_str(&message_link(guild_id, &msg.channel_id, &msg.id));
        }

        info!(
            guild = %guild_name,
            actor = %actor.name,
            content = %truncate_string(content, 200),
            "mod log"
        );

        let posted = match self.log_channel(guild_id) {
            Some(channel_id) => {
                self.platform
                    .send_message(channel_id, &line)
                    .await
                    .with_context(|| format!("failed to post to log channel {channel_id}"))?;
                true
            }
            None => false,
        };

        Ok(ModLogEntry {
            guild_id: guild_id.to_string(),
            actor_id: actor.id.clone(),
            content: content.to_string(),
            line,
            posted,
        })
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
