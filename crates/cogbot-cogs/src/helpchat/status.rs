//! Channel status and its encoding as a channel-name prefix.

use std::fmt;

/// Triage status of a help channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChannelStatus {
    /// Nobody is being helped; the channel can take a new question.
    Free,
    /// A conversation is in progress.
    Busy,
    /// Busy, but quiet for longer than the staleness threshold.
    Stale,
}

impl ChannelStatus {
    pub const ALL: [ChannelStatus; 3] = [
        ChannelStatus::Free,
        ChannelStatus::Busy,
        ChannelStatus::Stale,
    ];
}

impl fmt::Display for ChannelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChannelStatus::Free => "free",
            ChannelStatus::Busy => "busy",
            ChannelStatus::Stale => "stale",
        };
        f.write_str(s)
    }
}

/// The name prefixes that carry a channel's status.
///
/// A managed channel's name is `prefix + base name`; the base name never
/// changes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusPrefixes {
    pub free: String,
    pub busy: String,
    pub stale: String,
}

impl StatusPrefixes {
    pub fn new(free: impl Into<String>, busy: impl Into<String>, stale: impl Into<String>) -> Self {
        Self {
            free: free.into(),
            busy: busy.into(),
            stale: stale.into(),
        }
    }

    pub fn prefix(&self, status: ChannelStatus) -> &str {
        match status {
            ChannelStatus::Free => &self.free,
            ChannelStatus::Busy => &self.busy,
            ChannelStatus::Stale => &self.stale,
        }
    }

    /// Status encoded in `name`, checking Free, Busy, then Stale.
    /// `None` when the name carries no known prefix.
    pub fn status_of(&self, name: &str) -> Option<ChannelStatus> {
        ChannelStatus::ALL.into_iter().find(|&status| {
            let prefix = self.prefix(status);
            !prefix.is_empty() && name.starts_with(prefix)
        })
    }

    /// `name` with its status prefix stripped.
    pub fn base_name<'a>(&self, name: &'a str) -> &'a str {
        match self.status_of(name) {
            Some(status) => &name[self.prefix(status).len()..],
            None => name,
        }
    }

    /// The name `name` should carry when in `status`.
    pub fn render(&self, name: &str, status: ChannelStatus) -> String {
        format!("{}{}", self.prefix(status), self.base_name(name))
    }
}

impl Default for StatusPrefixes {
    fn default() -> Self {
        Self::new("✅", "💬", "⏰")
    }
}
