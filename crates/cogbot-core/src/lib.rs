//! Cogbot Core — shared types, event bus, configuration, and utilities.
//!
//! - **types**: platform-neutral users, channels, messages, emoji, embeds
//! - **bus**: `EventBus` carrying `PlatformEvent`s from the gateway to the bot loop
//! - **config**: JSON config schema, loader, and env var overrides
//! - **utils**: data paths, clocks, message links

pub mod bus;
pub mod config;
pub mod types;
pub mod utils;
