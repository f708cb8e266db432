//! The bot loop: consumes platform events and dispatches them to the cogs.
//!
//! Events are handled one at a time, so cog state needs no locking except
//! for the feed cog, which the poller task shares.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use cogbot_core::bus::{EventBus, PlatformEvent};
use cogbot_core::config::{CommandsConfig, Config};
use cogbot_core::types::{Message, User};
use cogbot_core::utils::Clock;
use cogbot_platform::ChatPlatform;

use crate::commands::Command;
use crate::feed::{Feed, FeedFetcher};
use crate::helpchat::HelpChat;
use crate::jira::Jira;

pub struct Bot {
    platform: Arc<dyn ChatPlatform>,
    commands: CommandsConfig,
    helpchat: HelpChat,
    feed: Arc<Mutex<Feed>>,
    jira: Jira,
    bot_user: Option<User>,
}

impl Bot {
    pub fn new(
        platform: Arc<dyn ChatPlatform>,
        config: &Config,
        fetcher: Arc<dyn FeedFetcher>,
        clock: Clock,
    ) -> anyhow::Result<Self> {
        let helpchat = HelpChat::new(
            platform.clone(),
            config.helpchat.clone(),
            config.servers.clone(),
            clock.clone(),
        );
        let feed = Feed::new(platform.clone(), fetcher, config.feed.clone(), clock);
        Ok(Self {
            platform,
            commands: config.commands.clone(),
            helpchat,
            feed: Arc::new(Mutex::new(feed)),
            jira: Jira::new(&config.jira)?,
            bot_user: None,
        })
    }

    /// The feed cog, for sharing with a [`FeedPoller`](crate::feed::FeedPoller).
    pub fn feed(&self) -> Arc<Mutex<Feed>> {
        self.feed.clone()
    }

    pub fn helpchat(&self) -> &HelpChat {
        &self.helpchat
    }

    /// Consume events until the bus closes. Handler errors are logged and
    /// do not stop the loop.
    pub async fn run(&mut self, bus: &EventBus) {
        info!("bot loop started");
        while let Some(event) = bus.consume().await {
            let kind = event.kind();
            if let Err(e) = self.handle(event).await {
                error!(event = kind, error = %e, "event handler failed");
            }
        }
        info!("event bus closed, bot loop exiting");
    }

    pub async fn handle(&mut self, event: PlatformEvent) -> anyhow::Result<()> {
        match event {
            PlatformEvent::Ready { user } => {
                info!(user = %user.name, "bot ready");
                self.bot_user = Some(user.clone());
                self.feed.lock().await.on_ready(&user.id);
                self.helpchat.on_ready(&user).await;
                Ok(())
            }
            PlatformEvent::MessageCreated(message) => self.on_message(&message).await,
            PlatformEvent::ReactionAdded(reaction) => {
                self.helpchat.on_reaction_add(&reaction).await?;
                Ok(())
            }
            PlatformEvent::ChannelUpdated(channel) => {
                self.helpchat.on_channel_updated(&channel);
                Ok(())
            }
        }
    }

    async fn on_message(&mut self, message: &Message) -> anyhow::Result<()> {
        if message.guild_id.is_none() {
            return Ok(());
        }
        if self
            .bot_user
            .as_ref()
            .is_some_and(|bot| bot.id == message.author.id)
        {
            return Ok(());
        }

        if !message.author.bot {
            if let Err(e) = self.run_command(message).await {
                error!(channel = %message.channel_id, error = %e, "command failed");
            }
        }

        self.helpchat.on_message(message).await?;
        Ok(())
    }

    async fn run_command(&mut self, message: &Message) -> anyhow::Result<()> {
        let command = match Command::parse(&self.commands.prefix, &message.content) {
            Ok(Some(command)) => command,
            Ok(None) => return Ok(()),
            Err(e) => {
                self.platform
                    .send_message(&message.channel_id, &e.to_string())
                    .await?;
                return Ok(());
            }
        };

        if command.requires_manager() && !self.commands.is_manager(&message.author.id) {
            warn!(user = %message.author.name, "manager command refused");
            return Ok(());
        }

        debug!(command = ?command, user = %message.author.name, "running command");
        match command {
            Command::Jira { query } => {
                self.jira
                    .respond(self.platform.as_ref(), &message.channel_id, &query)
                    .await
            }
            Command::Feed(feed_command) => {
                self.feed
                    .lock()
                    .await
                    .run_command(message, &feed_command)
                    .await
            }
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
