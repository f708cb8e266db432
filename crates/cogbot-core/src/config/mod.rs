//! Configuration system — schema, loading, and env var overrides.
//!
//! # Usage
//! ```no_run
//! use cogbot_core::config;
//!
//! let cfg = config::load_config(None);
//! println!("Command prefix: {}", cfg.commands.prefix);
//! ```

pub mod loader;
pub mod schema;

// Re-export key types
pub use loader::{get_config_path, load_config, save_config};
pub use schema::{
    CommandsConfig, Config, DiscordConfig, FeedConfig, FeedSubscriptionConfig, HelpChatConfig,
    HelpChatServerConfig, JiraConfig, ServerConfig,
};
