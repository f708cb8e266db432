//! Cogbot Platform — chat platform integrations.
//!
//! This crate provides:
//! - **base**: The `ChatPlatform` trait every backend implements
//! - **error**: `PlatformError`, shared by all backends
//!
//! Backends are feature-gated modules; Discord is the only one today.

pub mod base;
pub mod error;

#[cfg(feature = "discord")]
pub mod discord;

pub use base::{ChatPlatform, PlatformResult};
pub use error::PlatformError;
