//! Configuration schema.
//!
//! Hierarchy: `Config` → `DiscordConfig`, per-guild `ServerConfig`,
//! `HelpChatConfig`, `FeedConfig`, `JiraConfig`, `CommandsConfig`.
//!
//! JSON on disk uses **camelCase** keys; Rust uses snake_case.
//! We use `#[serde(rename_all = "camelCase")]` to handle the conversion.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Discord REST API base URL.
pub const DEFAULT_DISCORD_API_BASE: &str = "https://discord.com/api/v10";

/// Default Gateway WebSocket URL.
pub const DEFAULT_GATEWAY_URL: &str = "wss://gateway.discord.gg/?v=10&encoding=json";

// ─────────────────────────────────────────────
// Root Config
// ─────────────────────────────────────────────

/// Root configuration — loaded from `~/.cogbot/config.json` + env vars.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub discord: DiscordConfig,
    /// Per-guild bot settings, keyed by guild id.
    pub servers: HashMap<String, ServerConfig>,
    pub helpchat: HelpChatConfig,
    pub feed: FeedConfig,
    pub jira: JiraConfig,
    pub commands: CommandsConfig,
}

// ─────────────────────────────────────────────
// Discord
// ─────────────────────────────────────────────

/// Discord connection settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiscordConfig {
    /// Bot token from the Discord Developer Portal.
    pub token: String,
    /// REST API base URL.
    pub api_base: String,
    /// Gateway WebSocket URL.
    pub gateway_url: String,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_base: DEFAULT_DISCORD_API_BASE.to_string(),
            gateway_url: DEFAULT_GATEWAY_URL.to_string(),
        }
    }
}

impl DiscordConfig {
    /// Whether a bot token is configured.
    pub fn is_configured(&self) -> bool {
        !self.token.is_empty()
    }
}

/// Per-guild settings shared by all cogs.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    /// Channel that receives moderation log entries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_channel: Option<String>,
}

// ─────────────────────────────────────────────
// Help chat
// ─────────────────────────────────────────────

/// Help-channel triage settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HelpChatConfig {
    /// Per-guild triage settings, keyed by guild id.
    pub servers: HashMap<String, HelpChatServerConfig>,
}

/// Triage settings for one guild.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HelpChatServerConfig {
    /// Managed help channels, in preference order.
    pub channels: Vec<String>,
    /// Redirect notice when a free channel exists.
    /// Placeholders: `{author}`, `{reactor}`, `{from_channel}`, `{to_channel}`.
    pub message_with_channel: String,
    /// Redirect notice when no channel is free.
    /// Placeholders: `{author}`, `{reactor}`, `{from_channel}`.
    pub message_without_channel: String,
    /// Inactivity after which a busy channel turns stale.
    pub seconds_until_stale: u64,
    /// Minimum time between staleness sweeps.
    pub seconds_to_poll: u64,
    /// Emoji (unicode or guild emoji name) that requests a relocation.
    pub relocate_emoji: String,
    /// Emoji (unicode or guild emoji name) that marks a channel resolved.
    pub resolve_emoji: String,
    pub free_prefix: String,
    pub busy_prefix: String,
    pub stale_prefix: String,
    /// Whether placing the resolve emoji on the latest message frees the channel.
    pub resolve_with_reaction: bool,
}

impl Default for HelpChatServerConfig {
    fn default() -> Self {
        Self {
            channels: Vec::new(),
            message_with_channel: "{author}, {reactor} thinks your question fits better in \
                {to_channel}, which is free right now."
                .to_string(),
            message_without_channel: "{author}, {reactor} thinks your question fits better in \
                another help channel, but none are free. Hang tight in {from_channel}."
                .to_string(),
            seconds_until_stale: 3600,
            seconds_to_poll: 600,
            relocate_emoji: "🛴".to_string(),
            resolve_emoji: "✅".to_string(),
            free_prefix: "✅".to_string(),
            busy_prefix: "💬".to_string(),
            stale_prefix: "⏰".to_string(),
            resolve_with_reaction: false,
        }
    }
}

// ─────────────────────────────────────────────
// Feed
// ─────────────────────────────────────────────

/// Feed notifier settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeedConfig {
    /// Seconds between polls of all subscriptions.
    pub polling_interval: u64,
    /// Subscriptions keyed by channel id, then by feed name.
    pub subscriptions: HashMap<String, BTreeMap<String, FeedSubscriptionConfig>>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            polling_interval: 60,
            subscriptions: HashMap::new(),
        }
    }
}

/// One feed subscription.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeedSubscriptionConfig {
    pub url: String,
    /// Look-back window in seconds for the first poll.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recency: Option<u64>,
}

// ─────────────────────────────────────────────
// Jira
// ─────────────────────────────────────────────

/// Issue-tracker lookup settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JiraConfig {
    pub base_url: String,
    /// Project key prefixed to numeric report ids.
    pub project_key: String,
}

impl Default for JiraConfig {
    fn default() -> Self {
        Self {
            base_url: "https://bugs.mojang.com".to_string(),
            project_key: "MC".to_string(),
        }
    }
}

// ─────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────

/// Text command settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommandsConfig {
    pub prefix: String,
    /// User ids allowed to run management commands (feed).
    pub managers: Vec<String>,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            prefix: "!".to_string(),
            managers: Vec::new(),
        }
    }
}

impl CommandsConfig {
    pub fn is_manager(&self, user_id: &str) -> bool {
        self.managers.iter().any(|m| m == user_id)
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
