//! Run command — wires the Discord connection, event bus and cogs together.
//!
//! Startup sequence:
//! 1. Load config
//! 2. Create REST client and event bus
//! 3. Create gateway, bot (cogs) and feed poller
//! 4. Run: `tokio::select!` of gateway + bot loop + poller
//! 5. Handle Ctrl+C for graceful shutdown

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::{error, info};

use cogbot_cogs::feed::HttpFeedFetcher;
use cogbot_cogs::{Bot, FeedPoller};
use cogbot_core::bus::EventBus;
use cogbot_core::config::{get_config_path, load_config};
use cogbot_core::utils::system_clock;
use cogbot_platform::discord::{DiscordGateway, DiscordRest};
use cogbot_platform::ChatPlatform;

use crate::helpers;

/// Run the bot until Ctrl+C.
pub async fn run(config_path: Option<PathBuf>) -> Result<()> {
    helpers::print_banner();

    // 1. Load config
    let config = load_config(config_path.as_deref());
    if !config.discord.is_configured() {
        let path = config_path.unwrap_or_else(get_config_path);
        bail!(
            "no Discord token configured; set discord.token in {} or COGBOT_DISCORD__TOKEN",
            path.display()
        );
    }

    // 2. REST client + bus
    let platform: Arc<dyn ChatPlatform> = Arc::new(
        DiscordRest::new(&config.discord.token, &config.discord.api_base)
            .context("failed to create discord client")?,
    );
    let bus = Arc::new(EventBus::new(100));

    // 3. Gateway, cogs, poller
    let gateway = DiscordGateway::new(
        &config.discord.token,
        &config.discord.gateway_url,
        bus.clone(),
    )
    .context("failed to create discord gateway")?;

    let fetcher = Arc::new(HttpFeedFetcher::new()?);
    let mut bot = Bot::new(platform, &config, fetcher, system_clock())?;
    let poller = FeedPoller::new(
        bot.feed(),
        Duration::from_secs(config.feed.polling_interval.max(1)),
    );

    let feed_count: usize = config.feed.subscriptions.values().map(|s| s.len()).sum();
    info!(
        helpchat_guilds = config.helpchat.servers.len(),
        feeds = feed_count,
        "cogbot starting"
    );
    println!("  Help chat: {} guild(s)", config.helpchat.servers.len());
    println!(
        "  Feeds:     {} subscription(s), polled every {}s",
        feed_count, config.feed.polling_interval
    );
    println!("  Commands:  prefix '{}'", config.commands.prefix);
    println!();
    println!("  Ctrl+C to stop");
    println!();

    // 4. Run everything concurrently until something exits or Ctrl+C
    tokio::select! {
        result = gateway.run() => {
            if let Err(e) = result {
                error!(error = %e, "discord gateway error");
            }
        }
        _ = bot.run(&bus) => {
            info!("bot loop exited");
        }
        result = poller.run() => {
            if let Err(e) = result {
                error!(error = %e, "feed poller error");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            println!();
            println!("  Shutting down...");
            info!("received Ctrl+C, shutting down");
            poller.stop();
            gateway.stop();
        }
    }

    println!("  Cogbot stopped. Goodbye!");
    Ok(())
}
