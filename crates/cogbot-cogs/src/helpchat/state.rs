//! Per-guild triage state: the managed channels and the transitions between
//! free, busy, and stale.

use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use regex::{Captures, Regex};
use tracing::{debug, info, warn};

use cogbot_core::bus::ReactionEvent;
use cogbot_core::config::HelpChatServerConfig;
use cogbot_core::types::{channel_mention, Emoji, Message, User};
use cogbot_core::utils::Clock;
use cogbot_platform::ChatPlatform;

use super::status::{ChannelStatus, StatusPrefixes};
use crate::modlog::{ModLog, ModLogEntry};

const RELOCATE_ICON: &str = ":arrow_right:";
const RESOLVE_ICON: &str = ":white_check_mark:";

/// A help channel under triage, with its last known name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManagedChannel {
    pub id: String,
    pub name: String,
}

pub struct HelpChatServerState {
    guild_id: String,
    platform: Arc<dyn ChatPlatform>,
    bot_user: User,
    /// In configured order; the first free one receives relocations.
    channels: Vec<ManagedChannel>,
    prefixes: StatusPrefixes,
    message_with_channel: String,
    message_without_channel: String,
    stale_after: Duration,
    poll_every: Duration,
    relocate_emoji: Emoji,
    resolve_emoji: Emoji,
    resolve_with_reaction: bool,
    last_polled: DateTime<Utc>,
    clock: Clock,
}

impl HelpChatServerState {
    /// Build the state for `guild_id`, resolving channels and emoji against
    /// the platform.
    ///
    /// Channels that do not exist are dropped and emoji names that match no
    /// guild emoji are used as literal unicode, both with a warning.
    pub async fn resolve(
        platform: Arc<dyn ChatPlatform>,
        guild_id: &str,
        bot_user: User,
        options: &HelpChatServerConfig,
        clock: Clock,
    ) -> anyhow::Result<Self> {
        let mut channels = Vec::with_capacity(options.channels.len());
        for channel_id in &options.channels {
            let found = platform
                .get_channel(channel_id)
                .await
                .with_context(|| format!("failed to fetch help channel {channel_id}"))?;
            match found {
                Some(channel) => channels.push(ManagedChannel {
                    id: channel.id,
                    name: channel.name,
                }),
                None => warn!(
                    guild = %guild_id,
                    channel = %channel_id,
                    "failed to resolve help channel"
                ),
            }
        }

        let guild_emojis = platform
            .guild_emojis(guild_id)
            .await
            .with_context(|| format!("failed to list emoji of guild {guild_id}"))?;
        let relocate_emoji = lookup_emoji(guild_id, &guild_emojis, &options.relocate_emoji);
        let resolve_emoji = lookup_emoji(guild_id, &guild_emojis, &options.resolve_emoji);

        info!(
            guild = %guild_id,
            channels = channels.len(),
            relocate = %relocate_emoji,
            resolve = %resolve_emoji,
            "help chat ready"
        );

        Ok(Self {
            guild_id: guild_id.to_string(),
            platform,
            bot_user,
            channels,
            prefixes: StatusPrefixes::new(
                options.free_prefix.as_str(),
                options.busy_prefix.as_str(),
                options.stale_prefix.as_str(),
            ),
            message_with_channel: options.message_with_channel.clone(),
            message_without_channel: options.message_without_channel.clone(),
            stale_after: seconds(options.seconds_until_stale),
            poll_every: seconds(options.seconds_to_poll),
            relocate_emoji,
            resolve_emoji,
            resolve_with_reaction: options.resolve_with_reaction,
            last_polled: clock(),
            clock,
        })
    }

    pub fn channels(&self) -> &[ManagedChannel] {
        &self.channels
    }

    pub fn last_polled(&self) -> DateTime<Utc> {
        self.last_polled
    }

    fn index_of(&self, channel_id: &str) -> Option<usize> {
        self.channels.iter().position(|c| c.id == channel_id)
    }

    pub fn is_managed(&self, channel_id: &str) -> bool {
        self.index_of(channel_id).is_some()
    }

    /// Status of a managed channel. Names without a known prefix count as free.
    pub fn status(&self, channel_id: &str) -> Option<ChannelStatus> {
        self.index_of(channel_id)
            .map(|idx| self.status_at(idx))
    }

    fn status_at(&self, idx: usize) -> ChannelStatus {
        self.prefixes
            .status_of(&self.channels[idx].name)
            .unwrap_or(ChannelStatus::Free)
    }

    /// The first free channel, in configured order.
    pub fn free_channel(&self) -> Option<&ManagedChannel> {
        (0..self.channels.len())
            .find(|&idx| self.status_at(idx) == ChannelStatus::Free)
            .map(|idx| &self.channels[idx])
    }

    // ─────────────────────────────────────────────
    // Transitions
    // ─────────────────────────────────────────────

    /// Move a managed channel to `target`. Returns whether a rename happened.
    ///
    /// The cached name only changes once the platform accepted the rename.
    async fn mark_channel(&mut self, idx: usize, target: ChannelStatus) -> anyhow::Result<bool> {
        let current = self.status_at(idx);
        if current == target {
            return Ok(false);
        }

        let channel = &self.channels[idx];
        let new_name = self.prefixes.render(&channel.name, target);
        if new_name == channel.name {
            return Ok(false);
        }

        let renamed = self
            .platform
            .rename_channel(&channel.id, &new_name)
            .await
            .with_context(|| format!("failed to rename channel {} to {new_name}", channel.id))?;

        info!(
            guild = %self.guild_id,
            channel = %renamed.id,
            from = %current,
            to = %target,
            name = %renamed.name,
            "help channel marked"
        );
        self.channels[idx].name = renamed.name;
        Ok(true)
    }

    /// Record a name change reported by the platform.
    pub fn on_channel_updated(&mut self, channel_id: &str, name: &str) -> bool {
        match self.index_of(channel_id) {
            Some(idx) if self.channels[idx].name != name => {
                debug!(channel = %channel_id, name = %name, "help channel name refreshed");
                self.channels[idx].name = name.to_string();
                true
            }
            _ => false,
        }
    }

    // ─────────────────────────────────────────────
    // Events
    // ─────────────────────────────────────────────

    /// A message was posted in this guild.
    ///
    /// In a managed channel the resolve marker frees the channel; anything
    /// else makes it busy. A sweep may follow.
    pub async fn on_message(
        &mut self,
        message: &Message,
        modlog: &ModLog,
    ) -> anyhow::Result<Option<ModLogEntry>> {
        let mut entry = None;

        if let Some(idx) = self.index_of(&message.channel_id) {
            if is_resolve_marker(&message.content, &self.resolve_emoji) {
                if self.mark_channel(idx, ChannelStatus::Free).await? {
                    let content = format!("resolved {}", channel_mention(&message.channel_id));
                    let author = &message.author;
                    entry = Some(
                        modlog
                            .mod_log(&self.guild_id, author, &content, Some(message), RESOLVE_ICON)
                            .await?,
                    );
                }
            } else {
                self.mark_channel(idx, ChannelStatus::Busy).await?;
            }
        }

        self.maybe_poll_channels().await?;
        Ok(entry)
    }

    /// A reaction was added to `message` in this guild.
    ///
    /// Only the first relocate reaction on a human's message triggers a
    /// relocation; later ones are ignored.
    pub async fn on_reaction(
        &mut self,
        reaction: &ReactionEvent,
        message: &Message,
        modlog: &ModLog,
    ) -> anyhow::Result<Vec<ModLogEntry>> {
        let mut entries = Vec::new();
        let reactor = &reaction.reactor;

        if reaction.emoji == self.relocate_emoji
            && message.reaction_count(&reaction.emoji) == 1
            && message.author.id != self.bot_user.id
        {
            entries.push(self.redirect(message, reactor, modlog).await?);
            self.platform
                .add_reaction(&message.channel_id, &message.id, &self.relocate_emoji)
                .await?;
        }

        if self.resolve_with_reaction && reaction.emoji == self.resolve_emoji {
            if let Some(idx) = self.index_of(&message.channel_id) {
                if self
                    .platform
                    .is_latest_message(&message.channel_id, &message.id)
                    .await?
                    && self.mark_channel(idx, ChannelStatus::Free).await?
                {
                    self.platform
                        .add_reaction(&message.channel_id, &message.id, &self.resolve_emoji)
                        .await?;
                    let content = format!("resolved {}", channel_mention(&message.channel_id));
                    entries.push(
                        modlog
                            .mod_log(&self.guild_id, reactor, &content, Some(message), RESOLVE_ICON)
                            .await?,
                    );
                }
            }
        }

        self.maybe_poll_channels().await?;
        Ok(entries)
    }

    /// Point the author of `message` at a free help channel.
    pub async fn redirect(
        &self,
        message: &Message,
        reactor: &User,
        modlog: &ModLog,
    ) -> anyhow::Result<ModLogEntry> {
        let author = &message.author;
        let from_channel = self.channel_arg(&message.channel_id);
        let to_channel = self
            .free_channel()
            .map(|c| TemplateArg::new(channel_mention(&c.id), self.prefixes.base_name(&c.name)));

        let mut log_content =
            format!("relocated {} from {}", author.mention(), from_channel.mention);
        if let Some(to) = &to_channel {
            log_content.push_str(&format!(" to {}", to.mention));
        }
        let entry = modlog
            .mod_log(&self.guild_id, reactor, &log_content, Some(message), RELOCATE_ICON)
            .await?;

        let template = if to_channel.is_some() {
            &self.message_with_channel
        } else {
            &self.message_without_channel
        };
        let author_arg = TemplateArg::new(author.mention(), author.name.as_str());
        let reactor_arg = TemplateArg::new(reactor.mention(), reactor.name.as_str());
        let response = render_template(template, |key| match key {
            "author" => Some(&author_arg),
            "reactor" => Some(&reactor_arg),
            "from_channel" => Some(&from_channel),
            "to_channel" => to_channel.as_ref(),
            _ => None,
        });

        self.platform
            .send_message(&message.channel_id, &response)
            .await
            .with_context(|| {
                format!("failed to send relocation notice to {}", message.channel_id)
            })?;
        Ok(entry)
    }

    fn channel_arg(&self, channel_id: &str) -> TemplateArg {
        let name = self
            .index_of(channel_id)
            .map(|idx| self.prefixes.base_name(&self.channels[idx].name).to_string())
            .unwrap_or_else(|| channel_mention(channel_id));
        TemplateArg::new(channel_mention(channel_id), name)
    }

    // ─────────────────────────────────────────────
    // Staleness sweep
    // ─────────────────────────────────────────────

    /// Sweep only when the poll interval has elapsed since the last sweep.
    pub async fn maybe_poll_channels(&mut self) -> anyhow::Result<bool> {
        let now = (self.clock)();
        if now >= self.last_polled + self.poll_every {
            self.last_polled = now;
            self.poll_channels().await?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Mark busy channels stale when their latest message is too old.
    pub async fn poll_channels(&mut self) -> anyhow::Result<()> {
        debug!(guild = %self.guild_id, "polling help channels");
        for idx in 0..self.channels.len() {
            if self.status_at(idx) != ChannelStatus::Busy {
                continue;
            }

            let channel_id = self.channels[idx].id.clone();
            let Some(latest) = self
                .platform
                .latest_message(&channel_id)
                .await
                .with_context(|| format!("failed to fetch latest message of {channel_id}"))?
            else {
                debug!(channel = %channel_id, "busy channel has no messages");
                continue;
            };

            let now = (self.clock)();
            if now > latest.timestamp + self.stale_after {
                self.mark_channel(idx, ChannelStatus::Stale).await?;
            }
        }
        Ok(())
    }
}

/// Whether `content` is exactly the resolve emoji.
///
/// Custom emoji match on id whatever their animation flag, since the
/// client writes `<a:name:id>` for animated ones.
fn is_resolve_marker(content: &str, resolve: &Emoji) -> bool {
    match resolve {
        Emoji::Unicode(s) => content == s,
        Emoji::Custom { id, name, .. } => {
            let inner = content
                .strip_prefix("<a:")
                .or_else(|| content.strip_prefix("<:"))
                .and_then(|rest| rest.strip_suffix('>'));
            inner == Some(format!("{name}:{id}").as_str())
        }
    }
}

fn seconds(secs: u64) -> Duration {
    Duration::seconds(secs.min(MAX_SECONDS) as i64)
}

/// Upper bound for configured intervals (about a century).
const MAX_SECONDS: u64 = 100 * 365 * 24 * 60 * 60;

/// Resolve a configured emoji: a guild emoji by name, else the literal.
fn lookup_emoji(guild_id: &str, guild_emojis: &[Emoji], configured: &str) -> Emoji {
    if let Some(found) = guild_emojis
        .iter()
        .find(|e| matches!(e, Emoji::Custom { .. }) && e.name() == configured)
    {
        return found.clone();
    }
    let looks_like_name = !configured.is_empty()
        && configured.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if looks_like_name {
        warn!(
            guild = %guild_id,
            emoji = %configured,
            "failed to resolve emoji, using it literally"
        );
    }
    Emoji::unicode(configured)
}

// ─────────────────────────────────────────────
// Notice templates
// ─────────────────────────────────────────────

/// A value for a `{key}` placeholder. `{key}` and `{key.mention}` render the
/// mention, `{key.name}` the plain name.
struct TemplateArg {
    mention: String,
    name: String,
}

impl TemplateArg {
    fn new(mention: String, name: impl Into<String>) -> Self {
        Self {
            mention,
            name: name.into(),
        }
    }
}

fn render_template<'a>(template: &str, lookup: impl Fn(&str) -> Option<&'a TemplateArg>) -> String {
    // Literal pattern; compiling it cannot fail.
    let Ok(re) = Regex::new(r"\{(\w+)(?:\.(\w+))?\}") else {
        return template.to_string();
    };
    re.replace_all(template, |caps: &Captures| {
        let arg = lookup(&caps[1]);
        match (arg, caps.get(2).map(|m| m.as_str())) {
            (Some(arg), None | Some("mention")) => arg.mention.clone(),
            (Some(arg), Some("name")) => arg.name.clone(),
            _ => caps[0].to_string(),
        }
    })
    .into_owned()
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
