//! Discord backend — raw Gateway WebSocket + REST API.
//!
//! No Discord library: the gateway publishes dispatches onto the event bus
//! and [`DiscordRest`] implements [`ChatPlatform`](crate::base::ChatPlatform)
//! for everything the cogs send.

pub mod gateway;
pub(crate) mod model;
pub mod rest;

pub use gateway::DiscordGateway;
pub use rest::{split_message, DiscordRest};

/// Discord message length limit.
pub const DISCORD_MAX_LEN: usize = 2000;
