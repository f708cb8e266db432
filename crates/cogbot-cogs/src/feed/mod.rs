//! Feed notifier — posts fresh entries of subscribed feeds into channels.

pub mod fetch;
pub mod subscription;

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use tokio::sync::{Mutex, Notify};
use tracing::{error, info, warn};

use cogbot_core::config::FeedConfig;
use cogbot_core::types::{Emoji, Message};
use cogbot_core::utils::{truncate_string, Clock};
use cogbot_platform::ChatPlatform;

use crate::commands::FeedCommand;

pub use fetch::{parse_feed, FeedFetcher, HttpFeedFetcher};
pub use subscription::{FeedDocument, FeedEntry, FeedSubscription};

/// Recent messages checked for an entry's title before posting it.
const RECENT_CHECK_LIMIT: u8 = 2;

/// Recent messages scanned for duplicate posts after an update.
const DUPLICATE_SCAN_LIMIT: u8 = 10;

const REACT_SUCCESS: &str = "✅";
const REACT_NEUTRAL: &str = "🤷";
const REACT_FAILURE: &str = "❌";

/// channel id → feed name → subscription
type Subscriptions = BTreeMap<String, BTreeMap<String, FeedSubscription>>;

pub struct Feed {
    platform: Arc<dyn ChatPlatform>,
    fetcher: Arc<dyn FeedFetcher>,
    options: FeedConfig,
    clock: Clock,
    bot_user_id: Option<String>,
    subscriptions: Subscriptions,
}

impl Feed {
    pub fn new(
        platform: Arc<dyn ChatPlatform>,
        fetcher: Arc<dyn FeedFetcher>,
        options: FeedConfig,
        clock: Clock,
    ) -> Self {
        Self {
            platform,
            fetcher,
            options,
            clock,
            bot_user_id: None,
            subscriptions: BTreeMap::new(),
        }
    }

    pub fn polling_interval(&self) -> Duration {
        Duration::from_secs(self.options.polling_interval.max(1))
    }

    pub fn subscriptions(&self) -> &BTreeMap<String, BTreeMap<String, FeedSubscription>> {
        &self.subscriptions
    }

    pub fn on_ready(&mut self, bot_user_id: &str) {
        info!("ready event received, resetting feed subscriptions");
        self.bot_user_id = Some(bot_user_id.to_string());
        self.reset();
    }

    /// Drop all subscriptions and rebuild them from configuration.
    pub fn reset(&mut self) {
        self.subscriptions.clear();
        let configured = self.options.subscriptions.clone();
        info!(channels = configured.len(), "initializing feed subscriptions");
        for (channel_id, feeds) in configured {
            for (name, feed) in feeds {
                if !self.add_feed(&channel_id, &name, &feed.url, feed.recency) {
                    warn!(channel = %channel_id, feed = %name, "duplicate feed in config");
                }
            }
        }
    }

    /// Subscribe `channel_id` to a feed. Returns false if the name is taken.
    pub fn add_feed(
        &mut self,
        channel_id: &str,
        name: &str,
        url: &str,
        recency: Option<u64>,
    ) -> bool {
        let subs = self.subscriptions.entry(channel_id.to_string()).or_default();
        if subs.contains_key(name) {
            return false;
        }
        info!(channel = %channel_id, feed = %name, url = %url, "subscribing to feed");
        let sub = FeedSubscription::new(name, url, recency, (self.clock)());
        subs.insert(name.to_string(), sub);
        true
    }

    /// Unsubscribe. Returns false if there was no such feed.
    pub fn remove_feed(&mut self, channel_id: &str, name: &str) -> bool {
        let Some(subs) = self.subscriptions.get_mut(channel_id) else {
            return false;
        };
        match subs.remove(name) {
            Some(sub) => {
                info!(
                    channel = %channel_id,
                    feed = %name,
                    url = %sub.url,
                    "unsubscribing from feed"
                );
                true
            }
            None => false,
        }
    }

    /// Human-readable listing of a channel's feeds.
    pub fn list_feeds(&self, channel_id: &str) -> String {
        match self.subscriptions.get(channel_id).filter(|s| !s.is_empty()) {
            Some(subs) => {
                let lines: Vec<String> = subs
                    .iter()
                    .map(|(name, sub)| format!("  - {name}: {}", sub.url))
                    .collect();
                format!("Subscribed feeds:\n{}", lines.join("\n"))
            }
            None => "No subscribed feeds.".to_string(),
        }
    }

    /// Post fresh entries of one feed, then delete duplicated bot posts.
    /// Returns the number of entries posted.
    pub async fn update_feed(&mut self, channel_id: &str, name: &str) -> anyhow::Result<usize> {
        let Some(sub) = self
            .subscriptions
            .get_mut(channel_id)
            .and_then(|subs| subs.get_mut(name))
        else {
            bail!("no feed named {name} in channel {channel_id}");
        };

        let recent: Vec<String> = self
            .platform
            .recent_messages(channel_id, RECENT_CHECK_LIMIT)
            .await?
            .into_iter()
            .map(|m| m.content)
            .collect();

        let document = self.fetcher.fetch(&sub.url).await?;
        let fresh = sub.fresh_entries(document);
        let mut posted = 0;
        if !fresh.is_empty() {
            info!(feed = %name, count = fresh.len(), url = %sub.url, "found new feed posts");
        }
        for entry in fresh {
            let title = entry.title.as_deref().unwrap_or_default();
            if !title.is_empty() && recent.iter().any(|content| content.contains(title)) {
                info!(feed = %name, title = %title, "skipping stale feed update");
                continue;
            }
            info!(feed = %name, title = %truncate_string(title, 80), "posting feed update");
            self.platform
                .send_message(channel_id, &entry.render())
                .await
                .with_context(|| format!("failed to post update for feed {name}"))?;
            posted += 1;
        }

        self.delete_duplicates(channel_id, name).await?;
        Ok(posted)
    }

    /// Delete bot posts that repeat an older message, oldest first.
    async fn delete_duplicates(&self, channel_id: &str, name: &str) -> anyhow::Result<()> {
        let Some(bot_id) = self.bot_user_id.as_deref() else {
            return Ok(());
        };
        let mut messages: Vec<Message> = self
            .platform
            .recent_messages(channel_id, DUPLICATE_SCAN_LIMIT)
            .await?;
        messages.reverse();

        let mut seen = HashSet::new();
        for message in messages {
            if message.author.id == bot_id && seen.contains(&message.content) {
                let title = message.content.lines().next().unwrap_or_default();
                warn!(feed = %name, title = %title, "deleting duplicated feed post");
                self.platform.delete_message(channel_id, &message.id).await?;
            } else {
                seen.insert(message.content);
            }
        }
        Ok(())
    }

    /// Update the named feeds of one channel, stopping at the first failure.
    pub async fn update_feeds(&mut self, channel_id: &str, names: &[String]) -> anyhow::Result<()> {
        for name in names {
            self.update_feed(channel_id, name).await?;
        }
        Ok(())
    }

    /// Every subscribed `(channel id, feed name)` pair.
    pub fn targets(&self) -> Vec<(String, String)> {
        self.subscriptions
            .iter()
            .flat_map(|(channel, subs)| {
                subs.keys().map(move |name| (channel.clone(), name.clone()))
            })
            .collect()
    }

    /// Update every feed of every channel. Failures are logged per feed.
    pub async fn update_all_feeds(&mut self) {
        for (channel_id, name) in self.targets() {
            self.update_logged(&channel_id, &name).await;
        }
    }

    async fn update_logged(&mut self, channel_id: &str, name: &str) {
        if let Err(e) = self.update_feed(channel_id, name).await {
            error!(channel = %channel_id, feed = %name, error = %e, "failed to update feed");
        }
    }

    // ─────────────────────────────────────────────
    // Commands
    // ─────────────────────────────────────────────

    /// Run a `feed` command issued by `message`, answering with a reaction
    /// or a listing in the same channel.
    pub async fn run_command(
        &mut self,
        message: &Message,
        command: &FeedCommand,
    ) -> anyhow::Result<()> {
        let channel_id = message.channel_id.as_str();
        let reaction = match command {
            FeedCommand::List => {
                let listing = self.list_feeds(channel_id);
                self.platform.send_message(channel_id, &listing).await?;
                return Ok(());
            }
            FeedCommand::Add { name, url, recency } => {
                if url::Url::parse(url).is_err() {
                    warn!(feed = %name, url = %url, "refusing feed with invalid url");
                    REACT_FAILURE
                } else if self.add_feed(channel_id, name, url, *recency) {
                    REACT_SUCCESS
                } else {
                    REACT_NEUTRAL
                }
            }
            FeedCommand::Remove { name } => {
                if self.remove_feed(channel_id, name) {
                    REACT_SUCCESS
                } else {
                    REACT_NEUTRAL
                }
            }
            FeedCommand::Update { names } => {
                let names = if names.is_empty() {
                    self.subscriptions
                        .get(channel_id)
                        .map(|subs| subs.keys().cloned().collect())
                        .unwrap_or_default()
                } else {
                    names.clone()
                };
                match self.update_feeds(channel_id, &names).await {
                    Ok(()) => REACT_SUCCESS,
                    Err(e) => {
                        error!(channel = %channel_id, error = %e, "feed update command failed");
                        REACT_FAILURE
                    }
                }
            }
            FeedCommand::Reset => {
                self.reset();
                REACT_SUCCESS
            }
        };

        self.platform
            .add_reaction(channel_id, &message.id, &Emoji::unicode(reaction))
            .await?;
        Ok(())
    }
}

// ─────────────────────────────────────────────
// FeedPoller
// ─────────────────────────────────────────────

/// Periodically updates all feeds until stopped.
pub struct FeedPoller {
    feed: Arc<Mutex<Feed>>,
    interval: Duration,
    shutdown: Arc<Notify>,
}

impl FeedPoller {
    pub fn new(feed: Arc<Mutex<Feed>>, interval: Duration) -> Self {
        Self {
            feed,
            interval,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Poll loop. Returns when `stop()` is called.
    pub async fn run(&self) -> anyhow::Result<()> {
        info!(interval_s = self.interval.as_secs(), "feed poller started");
        loop {
            self.poll_once().await;

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = self.shutdown.notified() => {
                    info!("feed poller shutting down");
                    return Ok(());
                }
            }
        }
    }

    /// Update every feed once, taking the lock per feed so commands and
    /// ready handling are not held up for a whole pass.
    pub async fn poll_once(&self) {
        let targets = self.feed.lock().await.targets();
        for (channel_id, name) in targets {
            let mut feed = self.feed.lock().await;
            // removed by a command since the snapshot
            if !feed
                .subscriptions()
                .get(&channel_id)
                .is_some_and(|subs| subs.contains_key(&name))
            {
                continue;
            }
            feed.update_logged(&channel_id, &name).await;
        }
    }

    pub fn stop(&self) {
        info!("stopping feed poller");
        // Stores a permit when the loop is busy updating.
        self.shutdown.notify_one();
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
