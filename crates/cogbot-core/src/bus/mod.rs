//! Event bus — platform events flowing from the gateway to the bot loop.

pub mod queue;
pub mod types;

pub use queue::EventBus;
pub use types::{PlatformEvent, ReactionEvent};
