//! Cogbot Cogs — the bot's extensions and the loop that drives them.
//!
//! - **helpchat**: help-channel triage (free / busy / stale)
//! - **feed**: posts fresh feed entries into subscribed channels
//! - **jira**: issue-tracker report lookup
//! - **modlog**: per-guild moderation log
//! - **commands** / **bot**: prefix commands and event dispatch

pub mod bot;
pub mod commands;
pub mod feed;
pub mod helpchat;
pub mod jira;
pub mod modlog;

#[cfg(test)]
pub(crate) mod testing;

pub use bot::Bot;
pub use feed::{Feed, FeedPoller};
pub use helpchat::HelpChat;
pub use jira::Jira;
pub use modlog::{ModLog, ModLogEntry};
