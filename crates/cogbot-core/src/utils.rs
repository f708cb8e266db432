//! Utility helpers — path resolution, clocks, message links.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};

/// Base URL for message jump links.
const MESSAGE_LINK_BASE: &str = "https://discord.com/channels";

/// Source of "now" for time-driven logic (staleness, feed freshness).
///
/// Cogs take a `Clock` instead of calling `Utc::now()` directly so tests
/// can drive time by hand.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// The wall clock.
pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

/// Get the Cogbot data directory (e.g. `~/.cogbot/`).
pub fn get_data_path() -> PathBuf {
    let home = home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.join(".cogbot")
}

/// Link that jumps to a message in a guild channel.
pub fn message_link(guild_id: &str, channel_id: &str, message_id: &str) -> String {
    format!("{MESSAGE_LINK_BASE}/{guild_id}/{channel_id}/{message_id}")
}

/// Truncate a string to `max_len` characters, adding "..." if truncated.
/// Unicode-safe.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

/// Helper to get home directory.
fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| std::env::var("USERPROFILE").ok().map(PathBuf::from))
}
