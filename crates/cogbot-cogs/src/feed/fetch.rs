//! Fetching and parsing feeds (RSS, Atom, JSON Feed).

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use tracing::debug;

use super::subscription::{FeedDocument, FeedEntry};

/// Where feed documents come from.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> anyhow::Result<FeedDocument>;
}

/// Fetches feeds over HTTP.
pub struct HttpFeedFetcher {
    http: reqwest::Client,
}

impl HttpFeedFetcher {
    pub fn new() -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("cogbot/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build feed http client")?;
        Ok(Self { http })
    }
}

#[async_trait]
impl FeedFetcher for HttpFeedFetcher {
    async fn fetch(&self, url: &str) -> anyhow::Result<FeedDocument> {
        debug!(url = %url, "fetching feed");
        let body = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("failed to request feed {url}"))?
            .error_for_status()
            .with_context(|| format!("feed {url} returned an error status"))?
            .bytes()
            .await
            .with_context(|| format!("failed to read feed {url}"))?;
        parse_feed(&body).with_context(|| format!("failed to parse feed at {url}"))
    }
}

/// Parse a feed body into a [`FeedDocument`].
pub fn parse_feed(body: &[u8]) -> anyhow::Result<FeedDocument> {
    let feed = feed_rs::parser::parse(body)?;
    let entries = feed
        .entries
        .into_iter()
        .map(|entry| FeedEntry {
            id: Some(entry.id).filter(|id| !id.is_empty()),
            title: entry.title.map(|t| t.content.trim().to_string()),
            link: entry.links.into_iter().next().map(|l| l.href),
            timestamp: entry.published.or(entry.updated),
        })
        .collect();
    Ok(FeedDocument {
        updated: feed.updated,
        entries,
    })
}
