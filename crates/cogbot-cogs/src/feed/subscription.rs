//! Feed subscriptions and entry freshness.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use tracing::warn;

/// Upper bound for a subscription's look-back window (about ten years).
const MAX_LOOK_BACK_SECONDS: u64 = 10 * 365 * 24 * 60 * 60;

/// A feed as seen by the notifier, independent of its wire format.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeedDocument {
    /// When the feed as a whole was last updated.
    pub updated: Option<DateTime<Utc>>,
    pub entries: Vec<FeedEntry>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeedEntry {
    pub id: Option<String>,
    pub title: Option<String>,
    pub link: Option<String>,
    /// Published time, or updated time when the feed gives no published time.
    pub timestamp: Option<DateTime<Utc>>,
}

impl FeedEntry {
    /// Text to post: the bold title followed by the link.
    pub fn render(&self) -> String {
        let link = self.link.as_deref().unwrap_or_default();
        match self.title.as_deref().filter(|t| !t.is_empty()) {
            Some(title) => format!("**{title}**\n{link}"),
            None => link.to_string(),
        }
    }
}

/// One named feed posted into one channel.
#[derive(Clone, Debug)]
pub struct FeedSubscription {
    pub name: String,
    pub url: String,
    /// Look-back window in seconds for the first poll.
    pub recency: Option<u64>,
    last_datetime: DateTime<Utc>,
    last_titles: HashSet<String>,
    last_ids: HashSet<String>,
}

impl FeedSubscription {
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        recency: Option<u64>,
        now: DateTime<Utc>,
    ) -> Self {
        let look_back = recency
            .filter(|&r| r > 0)
            .map(|r| Duration::seconds(r.min(MAX_LOOK_BACK_SECONDS) as i64))
            .unwrap_or_else(Duration::zero);
        Self {
            name: name.into(),
            url: url.into(),
            recency,
            last_datetime: now - look_back,
            last_titles: HashSet::new(),
            last_ids: HashSet::new(),
        }
    }

    pub fn last_datetime(&self) -> DateTime<Utc> {
        self.last_datetime
    }

    /// Entries of `document` not seen before.
    ///
    /// Entries are only considered when the feed itself was updated since the
    /// last check. An entry is fresh when it is newer than the last check and
    /// neither its title nor its id was seen in this or the previous batch.
    /// A feed with no update time is ignored and leaves the records alone.
    pub fn fresh_entries(&mut self, document: FeedDocument) -> Vec<FeedEntry> {
        let Some(feed_updated) = document
            .updated
            .or_else(|| document.entries.iter().filter_map(|e| e.timestamp).max())
        else {
            warn!(feed = %self.name, url = %self.url, "feed has no update time");
            return Vec::new();
        };

        let mut next_titles = HashSet::new();
        let mut next_ids = HashSet::new();
        let mut fresh = Vec::new();

        if feed_updated > self.last_datetime {
            for entry in document.entries {
                let Some(timestamp) = entry.timestamp else {
                    continue;
                };
                let seen_title = entry
                    .title
                    .as_ref()
                    .is_some_and(|t| next_titles.contains(t) || self.last_titles.contains(t));
                let seen_id = entry
                    .id
                    .as_ref()
                    .is_some_and(|id| next_ids.contains(id) || self.last_ids.contains(id));

                if timestamp > self.last_datetime && !seen_title && !seen_id {
                    if let Some(title) = &entry.title {
                        next_titles.insert(title.clone());
                    }
                    if let Some(id) = &entry.id {
                        next_ids.insert(id.clone());
                    }
                    fresh.push(entry);
                }
            }
        }

        self.last_datetime = feed_updated;
        self.last_titles = next_titles;
        self.last_ids = next_ids;
        fresh
    }
}
