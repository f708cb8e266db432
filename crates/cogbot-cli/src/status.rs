//! `cogbot status` — show configuration status.

use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use cogbot_core::config::{get_config_path, load_config, Config};

/// Run the status command.
pub fn run(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path);
    let config_path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(get_config_path);

    println!();
    println!("{}", "🤖 Cogbot Status".cyan().bold());
    println!();

    println!(
        "  {:<18} {} {}",
        "Config:".bold(),
        config_path.display(),
        if config_path.exists() {
            "✓".green().to_string()
        } else {
            "(not found)".red().to_string()
        }
    );

    let token = if config.discord.is_configured() {
        format!("{} (token set)", "✓".green())
    } else {
        format!("{}", "· not configured".dimmed())
    };
    println!("  {:<18} {}", "Discord:".bold(), token);
    println!(
        "  {:<18} {}",
        "Command prefix:".bold(),
        config.commands.prefix
    );
    println!(
        "  {:<18} {}",
        "Managers:".bold(),
        config.commands.managers.len()
    );

    println!();
    println!("  {}", "Help chat:".bold());
    for line in helpchat_lines(&config) {
        println!("    {line}");
    }

    println!();
    println!("  {}", "Feeds:".bold());
    for line in feed_lines(&config) {
        println!("    {line}");
    }

    println!();
    println!(
        "  {:<18} {} ({})",
        "Jira:".bold(),
        config.jira.base_url,
        config.jira.project_key
    );
    println!();

    Ok(())
}

fn helpchat_lines(config: &Config) -> Vec<String> {
    if config.helpchat.servers.is_empty() {
        return vec![format!("{}", "· no guilds configured".dimmed())];
    }
    let mut guilds: Vec<_> = config.helpchat.servers.iter().collect();
    guilds.sort_by(|a, b| a.0.cmp(b.0));
    guilds
        .into_iter()
        .map(|(guild, server)| {
            format!(
                "{:<20} {} channel(s), stale after {}s",
                guild,
                server.channels.len(),
                server.seconds_until_stale
            )
        })
        .collect()
}

fn feed_lines(config: &Config) -> Vec<String> {
    if config.feed.subscriptions.is_empty() {
        return vec![format!("{}", "· no subscriptions".dimmed())];
    }
    let mut channels: Vec<_> = config.feed.subscriptions.iter().collect();
    channels.sort_by(|a, b| a.0.cmp(b.0));
    channels
        .into_iter()
        .flat_map(|(channel, feeds)| {
            feeds
                .iter()
                .map(move |(name, sub)| format!("#{channel} {name}: {}", sub.url))
        })
        .collect()
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use cogbot_core::config::{FeedSubscriptionConfig, HelpChatServerConfig};

    #[test]
    fn lists_helpchat_guilds_sorted() {
        let mut config = Config::default();
        for guild in ["2", "1"] {
            config.helpchat.servers.insert(
                guild.into(),
                HelpChatServerConfig {
                    channels: vec!["a".into(), "b".into()],
                    ..Default::default()
                },
            );
        }
        let lines = helpchat_lines(&config);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("1 "));
        assert!(lines[0].ends_with("2 channel(s), stale after 3600s"));
    }

    #[test]
    fn lists_feed_subscriptions() {
        let mut config = Config::default();
        config.feed.subscriptions.entry("c1".into()).or_default().insert(
            "news".into(),
            FeedSubscriptionConfig {
                url: "https://example.com/feed".into(),
                recency: None,
            },
        );
        assert_eq!(
            feed_lines(&config),
            vec!["#c1 news: https://example.com/feed"]
        );
    }
}
